//! Project configuration for the H5 transformer.
//!
//! Read once from a JSON project file and shared read-only with every
//! per-file transform.
//!
//! ```json
//! {
//!   "sourceRoot": "src",
//!   "outputRoot": ".temp",
//!   "entry": "app",
//!   "designWidth": 750,
//!   "deviceRatio": { "640": 1.17, "750": 1, "828": 0.905 },
//!   "router": { "mode": "browser", "basename": "/shop/", "customRoutes": {} },
//!   "alias": { "@/components": "src/components" }
//! }
//! ```

use crate::error::{Result, TransformError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DESIGN_WIDTH: u32 = 750;
/// Project file looked up in the project root when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "h5.config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterMode {
    #[default]
    Hash,
    Browser,
}

impl RouterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RouterMode::Hash => "hash",
            RouterMode::Browser => "browser",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouterConfig {
    pub mode: RouterMode,
    /// Raw base path as written by the user. Use [`TransformConfig::basename`].
    pub basename: Option<String>,
    pub custom_routes: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformConfig {
    /// Directory holding the project file; relative roots resolve against it.
    #[serde(skip)]
    pub project_root: PathBuf,

    pub source_root: PathBuf,
    pub output_root: PathBuf,
    /// File stem of the application entry inside `source_root`.
    pub entry: String,
    pub router: RouterConfig,
    pub design_width: u32,
    pub device_ratio: Option<Map<String, Value>>,
    pub alias: BTreeMap<String, String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            source_root: PathBuf::from("src"),
            output_root: PathBuf::from(".temp"),
            entry: "app".to_string(),
            router: RouterConfig::default(),
            design_width: DEFAULT_DESIGN_WIDTH,
            device_ratio: None,
            alias: BTreeMap::new(),
        }
    }
}

impl TransformConfig {
    /// Load from a JSON project file. The file's directory becomes the project root.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| TransformError::Io(path.to_path_buf(), e))?;
        let mut config = Self::from_json(&content)?;
        config.project_root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| TransformError::Config(e.to_string()))
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    pub fn source_dir(&self) -> PathBuf {
        self.project_root.join(&self.source_root)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.project_root.join(&self.output_root)
    }

    /// Router base path: leading slash, no trailing slash, `/` when unset.
    pub fn basename(&self) -> String {
        let raw = self.router.basename.as_deref().unwrap_or("/");
        let trimmed = raw.strip_suffix('/').unwrap_or(raw);
        add_leading_slash(trimmed)
    }

    pub fn custom_routes_json(&self) -> String {
        Value::Object(self.router.custom_routes.clone()).to_string()
    }

    /// Argument object for `initPxTransform`.
    pub fn px_transform_json(&self) -> String {
        let mut map = Map::new();
        map.insert("designWidth".to_string(), Value::from(self.design_width));
        if let Some(ratio) = &self.device_ratio {
            map.insert("deviceRatio".to_string(), Value::Object(ratio.clone()));
        }
        Value::Object(map).to_string()
    }
}

pub fn add_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
