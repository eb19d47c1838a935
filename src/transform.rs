//! Per-file transform pipeline.
//!
//! parse → type lowering (typed sources) → dead imports → import rewriting →
//! class normalization → entry assembly or page/component augmentation →
//! print. Each call owns its arena; the page registry is the only state that
//! outlives it.

use crate::config::TransformConfig;
use crate::entry::{assemble_entry, resolve_chunk_placeholders};
use crate::error::{Result, TransformError};
use crate::imports::{rewrite_imports, strip_unused_imports, ImportContext, ModuleProbe};
use crate::normalize::normalize_component_classes;
use crate::page::augment_module;
use crate::registry::PageRegistry;
use crate::snippet::Snippets;
use crate::typestrip::{source_type_for, strip_types};
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a script file is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// The application entry.
    Entry,
    /// A file registered through the app's `pages` list.
    Page,
    /// Any other script.
    Normal,
}

/// Transform one script file.
///
/// Entry files reset `registry` and refill it; other files only read it.
pub fn transform_source(
    source: &str,
    path: &Path,
    kind: FileKind,
    config: &TransformConfig,
    registry: &mut PageRegistry,
    probe: &dyn ModuleProbe,
) -> Result<String> {
    let allocator = Allocator::default();
    let source_type = source_type_for(path);
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() || ret.panicked {
        return Err(TransformError::Parse {
            file: path.display().to_string(),
            messages: ret.errors.iter().map(|e| e.to_string()).collect(),
        });
    }
    let mut program = ret.program;

    if source_type.is_typescript() {
        strip_types(&allocator, path, &mut program)?;
    }

    strip_unused_imports(&mut program);
    let ctx = ImportContext {
        file_path: path,
        config,
        probe,
        is_entry: kind == FileKind::Entry,
    };
    let mut bindings = rewrite_imports(&allocator, &mut program, &ctx)?;
    normalize_component_classes(&allocator, &mut program, bindings.taro_default.as_deref())?;

    let snippets = Snippets::new(&allocator);
    let routes = match kind {
        FileKind::Entry => {
            let mut routes = assemble_entry(&snippets, &mut program, &mut bindings, config, registry)?;
            let entry_dir = path.parent().unwrap_or(Path::new(""));
            let source_dir = config.source_dir();
            for route in &mut routes {
                route.rebase(entry_dir, &source_dir);
            }
            routes
        }
        FileKind::Page | FileKind::Normal => {
            augment_module(
                &snippets,
                &mut program,
                &mut bindings,
                config,
                registry,
                kind == FileKind::Page,
            )?;
            Vec::new()
        }
    };

    let code = Codegen::new().build(&program).code;
    Ok(resolve_chunk_placeholders(&code, &routes))
}
