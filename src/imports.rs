//! Import Resolver & Rewriter
//!
//! Rewrites module specifiers for the browser build:
//! path aliases, relative module resolution by probing the filesystem,
//! and substitution of the cross-platform packages by their H5 equivalents.
//! While rewriting it records which local names the runtime packages are
//! bound to; every later pass reads those bindings.

use crate::config::TransformConfig;
use crate::error::{Result, TransformError};
use crate::snippet::{set_string_literal, Snippets};
use crate::state::*;
use crate::visitor::ReferenceCollector;
use oxc_allocator::{Allocator, Vec as ArenaVec};
use oxc_ast::ast::*;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

pub const SCRIPT_EXTENSIONS: [&str; 4] = ["js", "jsx", "ts", "tsx"];

/// Imports that survive dead-import elimination even when nothing references them.
/// Later synthesis passes add uses of these that are invisible beforehand.
pub const PROTECTED_IMPORTS: [&str; 4] = [TARO_PACKAGE, TARO_H5_PACKAGE, REACT_PACKAGE, NERV_PACKAGE];

/// Answers "does this file exist" during module resolution.
pub trait ModuleProbe {
    fn is_file(&self, path: &Path) -> bool;
}

/// Probes the real filesystem.
pub struct FsProbe;

impl ModuleProbe for FsProbe {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// A fixed set of paths, for transforms that never touch the disk.
#[derive(Default)]
pub struct MemoryProbe {
    files: HashSet<PathBuf>,
}

impl MemoryProbe {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: files.into_iter().map(|p| normalize_path(&p.into())).collect(),
        }
    }
}

impl ModuleProbe for MemoryProbe {
    fn is_file(&self, path: &Path) -> bool {
        self.files.contains(&normalize_path(path))
    }
}

pub struct ImportContext<'c> {
    pub file_path: &'c Path,
    pub config: &'c TransformConfig,
    pub probe: &'c dyn ModuleProbe,
    pub is_entry: bool,
}

impl ImportContext<'_> {
    fn file_dir(&self) -> PathBuf {
        self.file_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Rewrite an aliased specifier into a path relative to the importing file.
    /// The longest matching alias key wins.
    fn resolve_alias(&self, value: &str) -> Option<String> {
        let (key, target) = self
            .config
            .alias
            .iter()
            .filter(|(key, _)| {
                value == key.as_str()
                    || value
                        .strip_prefix(key.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(key, _)| key.len())?;
        let rest = value[key.len()..].trim_start_matches('/');
        let mut absolute = self.config.project_root.join(target);
        if !rest.is_empty() {
            absolute = absolute.join(rest);
        }
        Some(relative_specifier(&self.file_dir(), &absolute))
    }

    /// Resolve a relative specifier to a concrete module, extension dropped.
    fn resolve_relative(&self, value: &str) -> Option<String> {
        let extension = Path::new(value).extension().and_then(|e| e.to_str());
        if extension.is_some_and(|ext| !SCRIPT_EXTENSIONS.contains(&ext)) {
            return None;
        }
        let absolute = normalize_path(&self.file_dir().join(value));
        let stem = match extension {
            Some(_) => absolute.with_extension(""),
            None => absolute,
        };
        let found = resolve_script_path(self.probe, &stem)?;
        Some(relative_specifier(&self.file_dir(), &found.with_extension("")))
    }
}

/// Probe `<base>.{js,jsx,ts,tsx}` then `<base>/index.{js,jsx,ts,tsx}`.
pub fn resolve_script_path(probe: &dyn ModuleProbe, base: &Path) -> Option<PathBuf> {
    let file_name = base.file_name()?.to_string_lossy().to_string();
    let direct = SCRIPT_EXTENSIONS
        .iter()
        .map(|ext| base.with_file_name(format!("{file_name}.{ext}")));
    let index = SCRIPT_EXTENSIONS
        .iter()
        .map(|ext| base.join(format!("index.{ext}")));
    direct.chain(index).find(|candidate| probe.is_file(candidate))
}

/// Lexically resolve `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `./x` or `../x` specifier from `from_dir` to `to`, always `/`-separated.
pub fn relative_specifier(from_dir: &Path, to: &Path) -> String {
    let to = normalize_path(to);
    let from = normalize_path(from_dir);
    let relative = pathdiff::diff_paths(&to, &from).unwrap_or(to);
    let relative = relative.to_string_lossy().replace('\\', "/");
    if relative.starts_with("../") || relative == ".." {
        relative
    } else {
        format!("./{relative}")
    }
}

fn is_npm_package(value: &str) -> bool {
    !(value.starts_with('.') || value.starts_with('/'))
}

fn specifier_local_name<'b>(specifier: &'b ImportDeclarationSpecifier<'_>) -> &'b str {
    match specifier {
        ImportDeclarationSpecifier::ImportSpecifier(s) => s.local.name.as_str(),
        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => s.local.name.as_str(),
        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => s.local.name.as_str(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Rewriting
// ═══════════════════════════════════════════════════════════════════════════════

/// Rewrite every import declaration in place and return the recorded bindings.
pub fn rewrite_imports<'a>(
    allocator: &'a Allocator,
    program: &mut Program<'a>,
    ctx: &ImportContext<'_>,
) -> Result<ImportBindings> {
    let snippets = Snippets::new(allocator);
    let mut bindings = ImportBindings::default();
    let mut dropped = Vec::new();

    for (index, stmt) in program.body.iter_mut().enumerate() {
        let Statement::ImportDeclaration(decl) = stmt else {
            continue;
        };
        let mut value = decl.source.value.to_string();
        if let Some(resolved) = ctx.resolve_alias(&value) {
            set_string_literal(allocator, &mut decl.source, &resolved);
            value = resolved;
        }

        if !is_npm_package(&value) {
            if ctx.is_entry && value.starts_with('.') && value.split('/').any(|s| s == "pages") {
                // Pages are loaded by the router.
                dropped.push(index);
            } else if let Some(resolved) = ctx.resolve_relative(&value) {
                set_string_literal(allocator, &mut decl.source, &resolved);
            }
            continue;
        }

        match value.as_str() {
            TARO_PACKAGE | TARO_H5_PACKAGE => {
                set_string_literal(allocator, &mut decl.source, TARO_H5_PACKAGE);
                record_taro_bindings(decl, &mut bindings);
            }
            REDUX_PACKAGE | REDUX_H5_PACKAGE => {
                set_string_literal(allocator, &mut decl.source, REDUX_H5_PACKAGE);
                if ctx.is_entry {
                    bindings.provider = Some(ensure_provider_specifier(&snippets, decl)?);
                }
            }
            MOBX_PACKAGE | MOBX_H5_PACKAGE => {
                set_string_literal(allocator, &mut decl.source, MOBX_H5_PACKAGE);
                if ctx.is_entry {
                    bindings.provider = Some(ensure_provider_specifier(&snippets, decl)?);
                }
            }
            COMPONENTS_PACKAGE => {
                for specifier in decl.specifiers.iter().flatten() {
                    if let ImportDeclarationSpecifier::ImportSpecifier(s) = specifier {
                        bindings
                            .components
                            .insert(s.local.name.to_string(), s.imported.name().to_string());
                    }
                }
            }
            NERV_PACKAGE => {
                bindings.nerv = Some(ensure_default_specifier(&snippets, decl, NERV_NAME)?);
            }
            _ => {}
        }
    }

    for index in dropped.into_iter().rev() {
        program.body.remove(index);
    }
    Ok(bindings)
}

fn record_taro_bindings(decl: &ImportDeclaration<'_>, bindings: &mut ImportBindings) {
    for specifier in decl.specifiers.iter().flatten() {
        match specifier {
            ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                bindings.taro_default = Some(s.local.name.to_string());
            }
            ImportDeclarationSpecifier::ImportSpecifier(s) => {
                bindings
                    .taro_apis
                    .insert(s.local.name.to_string(), s.imported.name().to_string());
            }
            ImportDeclarationSpecifier::ImportNamespaceSpecifier(_) => {}
        }
    }
}

/// Return the local name of the `Provider` specifier, adding one if missing.
fn ensure_provider_specifier<'a>(
    snippets: &Snippets<'a>,
    decl: &mut ImportDeclaration<'a>,
) -> Result<String> {
    let existing = decl.specifiers.iter().flatten().find_map(|specifier| match specifier {
        ImportDeclarationSpecifier::ImportSpecifier(s) if s.imported.name().as_str() == PROVIDER_NAME => {
            Some(s.local.name.to_string())
        }
        _ => None,
    });
    if let Some(local) = existing {
        return Ok(local);
    }
    let specifier = specifier_from(snippets, &format!("import {{ {PROVIDER_NAME} }} from 'x'"))?;
    push_specifier(snippets.allocator(), decl, specifier, false);
    Ok(PROVIDER_NAME.to_string())
}

/// Local name of the declaration's default import, adding `name` when there is none.
fn ensure_default_specifier<'a>(
    snippets: &Snippets<'a>,
    decl: &mut ImportDeclaration<'a>,
    name: &str,
) -> Result<String> {
    let existing = decl.specifiers.iter().flatten().find_map(|s| match s {
        ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => Some(default.local.name.to_string()),
        _ => None,
    });
    if let Some(local) = existing {
        return Ok(local);
    }
    let specifier = specifier_from(snippets, &format!("import {name} from 'x'"))?;
    push_specifier(snippets.allocator(), decl, specifier, true);
    Ok(name.to_string())
}

fn specifier_from<'a>(
    snippets: &Snippets<'a>,
    code: &str,
) -> Result<ImportDeclarationSpecifier<'a>> {
    if let Statement::ImportDeclaration(decl) = snippets.statement(code)? {
        if let Some(specifier) = decl.unbox().specifiers.and_then(|mut s| s.pop()) {
            return Ok(specifier);
        }
    }
    Err(TransformError::Synthesis {
        template: code.to_string(),
        messages: vec!["expected an import specifier".to_string()],
    })
}

fn push_specifier<'a>(
    allocator: &'a Allocator,
    decl: &mut ImportDeclaration<'a>,
    specifier: ImportDeclarationSpecifier<'a>,
    front: bool,
) {
    let specifiers = decl
        .specifiers
        .get_or_insert_with(|| ArenaVec::new_in(allocator));
    if front {
        specifiers.insert(0, specifier);
    } else {
        specifiers.push(specifier);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Dead-import elimination
// ═══════════════════════════════════════════════════════════════════════════════

/// Drop specifiers nothing references, and declarations left without any.
///
/// Side-effect imports (`import './a.css'`) and [`PROTECTED_IMPORTS`] are kept.
pub fn strip_unused_imports(program: &mut Program<'_>) {
    let references = ReferenceCollector::collect(program).names;
    let mut emptied = Vec::new();
    for (index, stmt) in program.body.iter_mut().enumerate() {
        let Statement::ImportDeclaration(decl) = stmt else {
            continue;
        };
        if PROTECTED_IMPORTS.contains(&decl.source.value.as_str()) {
            continue;
        }
        let Some(specifiers) = decl.specifiers.as_mut() else {
            continue;
        };
        if specifiers.is_empty() {
            continue;
        }
        specifiers.retain(|s| references.contains(specifier_local_name(s)));
        if specifiers.is_empty() {
            emptied.push(index);
        }
    }
    for index in emptied.into_iter().rev() {
        program.body.remove(index);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Ensuring imports
// ═══════════════════════════════════════════════════════════════════════════════

pub fn last_import_index(program: &Program<'_>) -> Option<usize> {
    program
        .body
        .iter()
        .rposition(|stmt| matches!(stmt, Statement::ImportDeclaration(_)))
}

pub fn has_import_from(program: &Program<'_>, source: &str) -> bool {
    program.body.iter().any(|stmt| {
        matches!(stmt, Statement::ImportDeclaration(decl) if decl.source.value.as_str() == source)
    })
}

/// Make `name` importable from `source`: extend an existing declaration, or
/// add one after the last import.
pub fn ensure_named_import<'a>(
    snippets: &Snippets<'a>,
    program: &mut Program<'a>,
    name: &str,
    source: &str,
) -> Result<()> {
    for stmt in program.body.iter_mut() {
        let Statement::ImportDeclaration(decl) = stmt else {
            continue;
        };
        if decl.source.value.as_str() != source {
            continue;
        }
        let present = decl.specifiers.iter().flatten().any(|s| match s {
            ImportDeclarationSpecifier::ImportSpecifier(s) => s.imported.name().as_str() == name,
            _ => false,
        });
        if !present {
            let specifier = specifier_from(snippets, &format!("import {{ {name} }} from 'x'"))?;
            push_specifier(snippets.allocator(), decl, specifier, false);
        }
        return Ok(());
    }
    let import = snippets.statement(&format!("import {{ {name} }} from '{source}'"))?;
    let at = last_import_index(program).map_or(0, |i| i + 1);
    program.body.insert(at, import);
    Ok(())
}

/// `import Nerv from 'nervjs'`, for files that use markup without importing a renderer.
pub fn nerv_import<'a>(snippets: &Snippets<'a>) -> Result<Statement<'a>> {
    snippets.statement(&format!("import {NERV_NAME} from '{NERV_PACKAGE}'"))
}

/// Local name of the base-runtime default import, adding `import Taro from '@tarojs/taro-h5'` if absent.
pub fn ensure_taro_default<'a>(
    snippets: &Snippets<'a>,
    program: &mut Program<'a>,
    bindings: &mut ImportBindings,
) -> Result<String> {
    if let Some(name) = &bindings.taro_default {
        return Ok(name.clone());
    }
    for stmt in program.body.iter_mut() {
        if let Statement::ImportDeclaration(decl) = stmt {
            if decl.source.value.as_str() == TARO_H5_PACKAGE {
                ensure_default_specifier(snippets, decl, DEFAULT_TARO_NAME)?;
                bindings.taro_default = Some(DEFAULT_TARO_NAME.to_string());
                return Ok(DEFAULT_TARO_NAME.to_string());
            }
        }
    }
    let import = snippets.statement(&format!(
        "import {DEFAULT_TARO_NAME} from '{TARO_H5_PACKAGE}'"
    ))?;
    program.body.insert(0, import);
    bindings.taro_default = Some(DEFAULT_TARO_NAME.to_string());
    Ok(DEFAULT_TARO_NAME.to_string())
}
