//! `cfgtree` -- inspect a configuration table tree on disk.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cfgtree_data::{LoaderConfig, load_tree};

mod summary;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "cfgtree")]
#[command(about = "Load and inspect typed configuration table trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every table and print a summary of the tree.
    Check {
        #[command(flatten)]
        source: Source,
    },
    /// Print one table, re-encoded as JSON.
    Dump {
        /// Dotted table path, e.g. `ns.a2`.
        table: String,

        #[command(flatten)]
        source: Source,

        /// Single-line output.
        #[arg(long)]
        compact: bool,
    },
}

/// Either a config file, or a manifest plus data root.
#[derive(Args)]
struct Source {
    /// Loader config (TOML).
    #[arg(long, conflicts_with_all = ["manifest", "root"])]
    config: Option<PathBuf>,

    /// Shape manifest (RON, TOML or JSON).
    #[arg(long, requires = "root")]
    manifest: Option<PathBuf>,

    /// Data directory of the root namespace.
    #[arg(long, requires = "manifest")]
    root: Option<PathBuf>,

    /// Load sibling tables in parallel.
    #[arg(long)]
    parallel: bool,
}

impl Source {
    fn into_config(self) -> Result<LoaderConfig> {
        let mut config = match (self.config, self.manifest, self.root) {
            (Some(path), _, _) => LoaderConfig::load(&path)
                .with_context(|| format!("reading config {}", path.display()))?,
            (None, Some(manifest), Some(root)) => LoaderConfig {
                root,
                manifest,
                parallel: false,
                timeout_ms: None,
            },
            _ => bail!("pass --config, or both --manifest and --root"),
        };
        config.parallel |= self.parallel;
        tracing::debug!(
            root = %config.root.display(),
            manifest = %config.manifest.display(),
            parallel = config.parallel,
            "resolved loader config"
        );
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Check { source } => {
            let config = source.into_config()?;
            let tree = load_tree(&config)
                .with_context(|| format!("loading {}", config.root.display()))?;
            print!("{}", summary::render_summary(&tree));
        }
        Commands::Dump {
            table,
            source,
            compact,
        } => {
            let config = source.into_config()?;
            let tree = load_tree(&config)
                .with_context(|| format!("loading {}", config.root.display()))?;
            let Some(erased) = tree.lookup_erased(&table) else {
                bail!("no table '{table}' in {}", config.manifest.display());
            };
            let json = erased.to_json()?;
            let text = if compact {
                serde_json::to_string(&json)?
            } else {
                serde_json::to_string_pretty(&json)?
            };
            println!("{text}");
        }
    }

    Ok(())
}
