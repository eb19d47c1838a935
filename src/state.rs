//! Package names and the per-file facts later passes read.

use std::collections::HashMap;

pub const TARO_PACKAGE: &str = "@tarojs/taro";
pub const TARO_H5_PACKAGE: &str = "@tarojs/taro-h5";
pub const REDUX_PACKAGE: &str = "@tarojs/redux";
pub const REDUX_H5_PACKAGE: &str = "@tarojs/redux-h5";
pub const MOBX_PACKAGE: &str = "@tarojs/mobx";
pub const MOBX_H5_PACKAGE: &str = "@tarojs/mobx-h5";
pub const ROUTER_PACKAGE: &str = "@tarojs/router";
pub const COMPONENTS_PACKAGE: &str = "@tarojs/components";
pub const NERV_PACKAGE: &str = "nervjs";
pub const REACT_PACKAGE: &str = "react";

pub const DEFAULT_TARO_NAME: &str = "Taro";
pub const NERV_NAME: &str = "Nerv";
pub const PROVIDER_NAME: &str = "Provider";
pub const SET_STORE_NAME: &str = "setStore";

/// Lifecycle and structural shapes observed on the component class.
///
/// Flags are plain booleans, so a repeated member name simply sets the flag again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleFlags {
    pub has_constructor: bool,
    pub has_will_mount: bool,
    pub has_did_mount: bool,
    pub has_did_show: bool,
    pub has_did_hide: bool,
    pub has_will_unmount: bool,
    pub has_on_page_scroll: bool,
    pub has_on_reach_bottom: bool,
    pub has_on_pull_down_refresh: bool,
    pub has_state: bool,
}

impl LifecycleFlags {
    pub fn observe(&mut self, member: &str) {
        match member {
            "constructor" => self.has_constructor = true,
            "componentWillMount" => self.has_will_mount = true,
            "componentDidMount" => self.has_did_mount = true,
            "componentDidShow" => self.has_did_show = true,
            "componentDidHide" => self.has_did_hide = true,
            "componentWillUnmount" => self.has_will_unmount = true,
            "onPageScroll" => self.has_on_page_scroll = true,
            "onReachBottom" => self.has_on_reach_bottom = true,
            "onPullDownRefresh" => self.has_on_pull_down_refresh = true,
            "state" => self.has_state = true,
            _ => {}
        }
    }
}

/// Local names bound by the file's imports.
#[derive(Debug, Clone, Default)]
pub struct ImportBindings {
    /// Default import of the base runtime, e.g. `Taro`.
    pub taro_default: Option<String>,
    /// Named base-runtime imports: local alias -> imported API name.
    pub taro_apis: HashMap<String, String>,
    /// Component library imports: local alias -> component name.
    pub components: HashMap<String, String>,
    /// Local name of the store `Provider`, entry files only.
    pub provider: Option<String>,
    /// Local default name of the rendering library, once it is imported.
    pub nerv: Option<String>,
}

impl ImportBindings {
    pub fn taro_name(&self) -> &str {
        self.taro_default.as_deref().unwrap_or(DEFAULT_TARO_NAME)
    }

    pub fn nerv_name(&self) -> &str {
        self.nerv.as_deref().unwrap_or(NERV_NAME)
    }

    /// Canonical component name for a markup tag, if imported from the component library.
    pub fn component_for(&self, tag: &str) -> Option<&str> {
        self.components.get(tag).map(String::as_str)
    }

    pub fn taro_api_for(&self, local: &str) -> Option<&str> {
        self.taro_apis.get(local).map(String::as_str)
    }
}
