//! Orchestrator
//!
//! Mirrors the source tree into the output tree: script files go through
//! [`transform_source`], everything else is copied byte-for-byte. A full
//! build processes the entry first so the page registry is complete before
//! any page is classified.

use crate::cache::OutputCache;
use crate::config::TransformConfig;
use crate::error::{Result, TransformError};
use crate::imports::{resolve_script_path, FsProbe, SCRIPT_EXTENSIONS};
use crate::log;
use crate::registry::PageRegistry;
use crate::transform::{transform_source, FileKind};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const OUTPUT_SCRIPT_EXTENSION: &str = "js";

/// What happened to one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Transformed,
    Copied,
    /// The output already held the same bytes.
    Unchanged,
}

#[derive(Debug, Default)]
pub struct BuildSummary {
    pub transformed: usize,
    pub copied: usize,
    pub unchanged: usize,
    /// Stale outputs deleted because their source is gone.
    pub pruned: usize,
    pub failed: Vec<(PathBuf, TransformError)>,
}

impl BuildSummary {
    fn record(&mut self, path: &Path, outcome: Result<FileOutcome>) {
        match outcome {
            Ok(FileOutcome::Transformed) => self.transformed += 1,
            Ok(FileOutcome::Copied) => self.copied += 1,
            Ok(FileOutcome::Unchanged) => self.unchanged += 1,
            Err(err) => self.failed.push((path.to_path_buf(), err)),
        }
    }
}

pub fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
}

/// Dot-files and editor leftovers never take part in a build.
pub fn is_ignored(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.starts_with('.') || name.ends_with('~')
}

pub struct Orchestrator {
    config: TransformConfig,
    registry: PageRegistry,
    cache: OutputCache,
}

impl Orchestrator {
    pub fn new(config: TransformConfig) -> Self {
        Self {
            config,
            registry: PageRegistry::new(),
            cache: OutputCache::new(),
        }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    pub fn registry(&self) -> &PageRegistry {
        &self.registry
    }

    /// The entry script on disk, probing the configured entry name with each script extension.
    pub fn entry_path(&self) -> Option<PathBuf> {
        resolve_script_path(&FsProbe, &self.config.source_dir().join(&self.config.entry))
    }

    /// Source-relative path without extension, `/`-separated.
    fn module_id(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(self.config.source_dir()).ok()?;
        let parts: Vec<String> = relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        Some(parts.join("/"))
    }

    /// The entry is recognized by its resolved location, pages by module id.
    pub fn classify(&self, path: &Path) -> FileKind {
        if self.entry_path().as_deref() == Some(path) {
            return FileKind::Entry;
        }
        match self.module_id(path) {
            Some(id) if self.registry.contains(&id) => FileKind::Page,
            _ => FileKind::Normal,
        }
    }

    /// Mirrored output location; script extensions become `.js`.
    pub fn output_path(&self, path: &Path) -> PathBuf {
        let relative = path
            .strip_prefix(self.config.source_dir())
            .unwrap_or(path);
        let target = self.config.output_dir().join(relative);
        if is_script(path) {
            target.with_extension(OUTPUT_SCRIPT_EXTENSION)
        } else {
            target
        }
    }

    /// Transform or copy one file. Nothing is written unless the whole file succeeded.
    pub fn process_file(&mut self, path: &Path) -> Result<FileOutcome> {
        let output = self.output_path(path);
        let bytes = fs::read(path).map_err(|e| TransformError::Io(path.to_path_buf(), e))?;
        if !is_script(path) {
            let written = self.cache.write(&output, &bytes)?;
            return Ok(if written { FileOutcome::Copied } else { FileOutcome::Unchanged });
        }

        let source = String::from_utf8_lossy(&bytes);
        let kind = self.classify(path);
        let code = transform_source(&source, path, kind, &self.config, &mut self.registry, &FsProbe)?;
        let written = self.cache.write(&output, code.as_bytes())?;
        Ok(if written { FileOutcome::Transformed } else { FileOutcome::Unchanged })
    }

    /// Full build: entry first, then every other file under the source root.
    /// Outputs no source produced this time are pruned afterwards.
    ///
    /// The entry transform resets the registry before refilling it; without an
    /// entry the registry is simply cleared.
    pub fn build(&mut self) -> BuildSummary {
        let mut summary = BuildSummary::default();
        let mut produced = HashSet::new();

        let entry = self.entry_path();
        match &entry {
            Some(entry) => {
                let outcome = self.process_file(entry);
                self.report(entry, &outcome);
                if outcome.is_ok() {
                    produced.insert(self.output_path(entry));
                }
                summary.record(entry, outcome);
                log!("build"; "{} pages registered", self.registry.len());
            }
            None => {
                self.registry.reset();
                log!("build"; "no entry `{}` under {}", self.config.entry, self.config.source_dir().display());
            }
        }

        let files: Vec<PathBuf> = WalkDir::new(self.config.source_dir())
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_ignored(e.path()))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|path| Some(path) != entry.as_ref())
            .collect();
        for path in files {
            let outcome = self.process_file(&path);
            self.report(&path, &outcome);
            if outcome.is_ok() {
                produced.insert(self.output_path(&path));
            }
            summary.record(&path, outcome);
        }

        self.prune(&produced, &mut summary);

        log!(
            "build";
            "{} transformed, {} copied, {} unchanged, {} pruned, {} failed",
            summary.transformed,
            summary.copied,
            summary.unchanged,
            summary.pruned,
            summary.failed.len()
        );
        summary
    }

    /// Never runs when the output tree contains the sources.
    fn prune(&mut self, produced: &HashSet<PathBuf>, summary: &mut BuildSummary) {
        let output_dir = self.config.output_dir();
        if self.config.source_dir().starts_with(&output_dir) {
            return;
        }
        match self.cache.prune(&output_dir, produced) {
            Ok(removed) => {
                for path in &removed {
                    log!("build"; "removed {}", self.display(path));
                }
                summary.pruned = removed.len();
            }
            Err(err) => {
                log!("error"; "{}: [{}] {}", self.display(&output_dir), err.code(), err);
                summary.failed.push((output_dir, err));
            }
        }
    }

    /// React to one watched path. Deleted sources, files or directories, lose their output.
    ///
    /// Successful outcomes are logged here; errors are left to the caller.
    pub fn apply_change(&mut self, path: &Path) -> Result<Option<FileOutcome>> {
        if is_ignored(path) || path.is_dir() {
            return Ok(None);
        }
        if !path.exists() {
            let output = self.output_path(path);
            if self.cache.remove(&output)? {
                log!("watch"; "removed {}", self.display(&output));
            }
            return Ok(None);
        }
        let outcome = self.process_file(path);
        if outcome.is_ok() {
            self.report(path, &outcome);
        }
        outcome.map(Some)
    }

    fn report(&self, path: &Path, outcome: &Result<FileOutcome>) {
        match outcome {
            Ok(FileOutcome::Transformed) => log!("build"; "{}", self.display(path)),
            Ok(FileOutcome::Copied) => log!("copy"; "{}", self.display(path)),
            Ok(FileOutcome::Unchanged) => {}
            Err(err) => log!("error"; "{}: [{}] {}", self.display(path), err.code(), err),
        }
    }

    fn display(&self, path: &Path) -> String {
        path.strip_prefix(&self.config.project_root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}
