//! # H5 Compiler Native
//!
//! Structural transformer from a Taro mini-app source tree to an H5 single
//! page app. Each script file is parsed with oxc, rewritten in place and
//! printed back:
//!
//! 1. **Imports**: aliases and relative modules resolved, cross-platform
//!    packages swapped for their H5 builds, unused specifiers dropped.
//! 2. **Classes**: constructor-assigned fields hoisted back to class fields.
//! 3. **Entry**: the app class renders the router; bootstrap statements
//!    (pixel scaling, history, API mounting) follow the imports.
//! 4. **Pages**: lifecycle anchors plus scroll, reach-bottom and pull-down
//!    wiring; ref capture and instance arguments for imperative APIs.
//!
//! The [`registry::PageRegistry`] filled by the entry is the only state
//! carried between files; [`orchestrator::Orchestrator`] owns it.

#[cfg(feature = "napi")]
use napi_derive::napi;

pub mod cache;
pub mod capability;
pub mod component;
pub mod config;
pub mod config_extract;
pub mod descriptor;
pub mod entry;
pub mod error;
pub mod imports;
pub mod logger;
pub mod normalize;
pub mod orchestrator;
pub mod page;
pub mod registry;
pub mod snippet;
pub mod state;
pub mod transform;
pub mod typestrip;
pub mod visitor;

#[cfg(test)]
mod entry_tests;

pub use config::TransformConfig;
pub use error::{Result, TransformError};
pub use imports::{FsProbe, MemoryProbe, ModuleProbe};
pub use registry::PageRegistry;
pub use transform::{transform_source, FileKind};

#[cfg(feature = "napi")]
#[napi(object)]
pub struct TransformOutput {
    pub code: String,
    /// Registry after the transform; refilled when `kind` is `"entry"`.
    pub pages: Vec<String>,
}

#[cfg(feature = "napi")]
#[napi]
pub fn transform_source_native(
    source: String,
    file_path: String,
    kind: String,
    config_json: Option<String>,
    pages: Option<Vec<String>>,
) -> napi::Result<TransformOutput> {
    let config = match config_json {
        Some(json) => TransformConfig::from_json(&json),
        None => Ok(TransformConfig::default()),
    }
    .map_err(|e| napi::Error::from_reason(format!("[{}] {}", e.code(), e)))?;
    let kind = match kind.as_str() {
        "entry" => FileKind::Entry,
        "page" => FileKind::Page,
        _ => FileKind::Normal,
    };
    let mut registry = PageRegistry::new();
    for page in pages.unwrap_or_default() {
        registry.register(&page);
    }
    let code = transform_source(
        &source,
        std::path::Path::new(&file_path),
        kind,
        &config,
        &mut registry,
        &FsProbe,
    )
    .map_err(|e| napi::Error::from_reason(format!("[{}] {}", e.code(), e)))?;
    Ok(TransformOutput {
        code,
        pages: registry.pages().to_vec(),
    })
}
