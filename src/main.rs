//! `h5c`: builds a mini-app source tree into an H5 single-page app.

mod watch;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use h5_compiler_native::config::{TransformConfig, DEFAULT_CONFIG_FILE};
use h5_compiler_native::log;
use h5_compiler_native::orchestrator::Orchestrator;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transform the whole source tree into the output directory
    Build {
        /// Keep running and rebuild files as they change
        #[arg(short, long)]
        watch: bool,

        /// Project file (default: h5.config.json in the project root)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Project root directory
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
}

fn load_config(config: Option<PathBuf>, root: Option<PathBuf>) -> Result<TransformConfig> {
    let base = root.clone().unwrap_or_else(|| PathBuf::from("."));
    let config_path = config
        .map(|path| if path.is_absolute() { path } else { base.join(path) })
        .unwrap_or_else(|| base.join(DEFAULT_CONFIG_FILE));

    let mut loaded = if config_path.is_file() {
        TransformConfig::from_path(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?
    } else {
        log!("build"; "{} not found, using defaults", config_path.display());
        TransformConfig::default()
    };
    if let Some(root) = root {
        loaded = loaded.with_project_root(root);
    }
    let project_root = loaded
        .project_root
        .canonicalize()
        .with_context(|| format!("project root {} does not exist", loaded.project_root.display()))?;
    Ok(loaded.with_project_root(project_root))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Build { watch, config, root } => {
            let config = load_config(config, root)?;
            let mut orchestrator = Orchestrator::new(config);
            let summary = orchestrator.build();
            if watch {
                watch::watch(&mut orchestrator)?;
            } else if !summary.failed.is_empty() {
                bail!("{} file(s) failed to build", summary.failed.len());
            }
        }
    }
    Ok(())
}
