//! Plain data harvested from `config` fields and handed between passes.

use crate::config::add_leading_slash;
use crate::imports::relative_specifier;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;

lazy_static! {
    /// Path segments that carry no information in a chunk name.
    static ref GENERIC_SEGMENT: Regex = Regex::new(r"(?i)^(pages|\.)$").unwrap();
}

/// One client-side route, derived from a registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    /// Leading-slash absolute route path, e.g. `/pages/index/index`.
    pub path: String,
    /// Module specifier for the lazy loader, e.g. `./pages/index/index`.
    pub module: String,
    /// Code-splitting hint; empty when every segment is generic.
    pub chunk_name: String,
    pub is_index: bool,
}

impl RouteDescriptor {
    pub fn new(page: &str, is_index: bool) -> Self {
        let path = add_leading_slash(page);
        let module = format!(".{path}");
        let chunk_name = chunk_name_for(&module);
        Self {
            path,
            module,
            chunk_name,
            is_index,
        }
    }

    /// Point the loader at the page module as seen from `entry_dir`.
    pub fn rebase(&mut self, entry_dir: &Path, source_dir: &Path) {
        let target = source_dir.join(self.path.trim_start_matches('/'));
        self.module = relative_specifier(entry_dir, &target);
    }

    /// The `import(...)` argument, with the chunk hint comment when there is one.
    pub fn loader_argument(&self) -> String {
        let module = serde_json::to_string(&self.module).unwrap_or_default();
        if self.chunk_name.is_empty() {
            module
        } else {
            format!("/* webpackChunkName: \"{}\" */ {}", self.chunk_name, module)
        }
    }
}

pub fn chunk_name_for(module: &str) -> String {
    module
        .split('/')
        .filter(|segment| !GENERIC_SEGMENT.is_match(segment))
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TabBarPosition {
    Top,
    #[default]
    Bottom,
}

impl TabBarPosition {
    /// `"top"` is the only value that moves the bar; anything else is bottom.
    pub fn from_config(value: Option<&str>) -> Self {
        match value {
            Some("top") => TabBarPosition::Top,
            _ => TabBarPosition::Bottom,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabBarItem {
    pub page_path: Option<String>,
    pub icon_path: Option<String>,
    pub selected_icon_path: Option<String>,
}

/// Summary of a harvested `tabBar` object. The object itself stays in the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabBarDescriptor {
    pub position: TabBarPosition,
    pub list: Vec<TabBarItem>,
}

/// Page-level `config` fields other than `pages` and `tabBar`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOptions {
    pub fields: Map<String, Value>,
}

impl PageOptions {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Source text for the reach-bottom threshold; `undefined` when unset.
    pub fn reach_bottom_distance_js(&self) -> String {
        match self.get("onReachBottomDistance") {
            Some(value) => value.to_string(),
            None => "undefined".to_string(),
        }
    }
}
