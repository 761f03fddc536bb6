//! treecache CLI - inspect evaluation cache files

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use treecache::config::{self, CacheConfig};
use treecache::ui::{self, ChildRow, Icons};
use treecache::{AttrDb, Cache, Cursor, Fingerprint, SymbolTable};

#[derive(Parser)]
#[command(name = "treecache")]
#[command(version)]
#[command(about = "Inspect persistent evaluation caches")]
#[command(long_about = r#"
treecache stores evaluated attribute trees in one SQLite file per input
fingerprint. These commands read such files without evaluating anything.

Example usage:
  treecache fingerprint ./flake.lock
  treecache stats --fingerprint <HEX>
  treecache get --fingerprint <HEX> packages.x86_64-linux.hello
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct CacheArgs {
    /// Fingerprint of the cached input, as hex
    #[arg(short, long)]
    fingerprint: String,

    /// Directory holding cache files (overrides the config)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Emit JSON instead of tables
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the fingerprint of a file
    Fingerprint {
        /// File to hash
        file: PathBuf,
    },

    /// Print the cache file used for a fingerprint
    Path {
        /// Fingerprint, as hex
        #[arg(short, long)]
        fingerprint: String,

        /// Directory holding cache files (overrides the config)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// Show row counts per type
    Stats {
        #[command(flatten)]
        cache: CacheArgs,
    },

    /// Show the cached value at an attribute path
    Get {
        #[command(flatten)]
        cache: CacheArgs,

        /// Dot-separated attribute path
        attr_path: String,
    },

    /// List the cached children of a node
    Ls {
        #[command(flatten)]
        cache: CacheArgs,

        /// Dot-separated attribute path (defaults to the root)
        #[arg(default_value = "")]
        attr_path: String,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Fingerprint { file } => {
            let fingerprint = Fingerprint::of_file(&file)?;
            println!("{}", fingerprint);
        }

        Commands::Path { fingerprint, cache_dir } => {
            let fingerprint: Fingerprint = fingerprint.parse()?;
            let config = with_cache_dir(config, cache_dir);
            println!("{}", config.cache_file(&fingerprint).display());
        }

        Commands::Stats { cache } => {
            let json = cache.json;
            let (path, cache) = open_existing(config, cache)?;
            let stats = cache.stats();
            warn_if_degraded(&cache);

            if json {
                let data = serde_json::json!({
                    "path": path,
                    "stats": stats,
                    "total": stats.total(),
                });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                ui::header(Icons::DATABASE, &path.display().to_string());
                ui::section("Rows by type");
                println!("{}", ui::stats_table(&stats));
            }
        }

        Commands::Get { cache, attr_path } => {
            let json = cache.json;
            let (_, cache) = open_existing(config, cache)?;
            let found = find(&cache, &attr_path)?;
            warn_if_degraded(&cache);

            match (found, json) {
                (Some(cursor), true) => {
                    let data = serde_json::json!({
                        "path": attr_path,
                        "id": cursor.id(),
                        "value": cursor.cached_value(),
                    });
                    println!("{}", serde_json::to_string_pretty(&data)?);
                }
                (None, true) => {
                    let data = serde_json::json!({ "path": attr_path, "value": null });
                    println!("{}", serde_json::to_string_pretty(&data)?);
                }
                (Some(cursor), false) => {
                    let value = cursor.cached_value();
                    ui::info("id", &cursor.id().to_string());
                    println!(
                        "{} {} = {}",
                        Icons::KEY,
                        attr_path.bold(),
                        value.to_string().style(ui::theme().for_type(value.attr_type()))
                    );
                    if let treecache::AttrValue::String { context, .. } = value {
                        for (path, name) in context {
                            ui::summary_row("context:", &format!("{} ({})", path, name));
                        }
                    }
                }
                (None, false) => ui::miss(&format!("{} is not cached", attr_path)),
            }
        }

        Commands::Ls { cache, attr_path } => {
            let json = cache.json;
            let (_, cache) = open_existing(config, cache)?;
            let Some(node) = find(&cache, &attr_path)? else {
                ui::miss(&format!("{} is not cached", display_path(&attr_path)));
                return Ok(());
            };

            let mut rows = Vec::new();
            let mut children = Vec::new();
            for name in node.cached_children() {
                let symbol = cache.symbols().create(&name);
                if let Some(child) = node.maybe_get_attr(symbol)? {
                    let value = child.cached_value().clone();
                    rows.push(ChildRow {
                        name: name.clone(),
                        ty: value.attr_type().to_string(),
                        value: value.to_string(),
                    });
                    children.push(serde_json::json!({ "name": name, "value": value }));
                }
            }
            warn_if_degraded(&cache);

            if json {
                let data = serde_json::json!({ "path": attr_path, "children": children });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else if rows.is_empty() {
                ui::miss(&format!("{} has no cached children", display_path(&attr_path)));
            } else {
                ui::header(Icons::TREE, &display_path(&attr_path));
                println!("{}", ui::children_table(rows));
            }
        }
    }

    Ok(())
}

fn with_cache_dir(mut config: CacheConfig, cache_dir: Option<PathBuf>) -> CacheConfig {
    if cache_dir.is_some() {
        config.cache_dir = cache_dir;
    }
    config
}

/// Open the cache file for a fingerprint read-only, without creating one
fn open_existing(config: CacheConfig, args: CacheArgs) -> anyhow::Result<(PathBuf, Arc<Cache>)> {
    let fingerprint: Fingerprint = args.fingerprint.parse()?;
    let config = with_cache_dir(config, args.cache_dir);
    let path = config.cache_file(&fingerprint);
    ensure_exists(&path)?;

    let db = AttrDb::open_read_only(&path, Arc::new(SymbolTable::new()))?;
    Ok((path, Cache::from_db(db)))
}

/// A storage error while reading turns every later lookup into a miss
fn warn_if_degraded(cache: &Cache) {
    if !cache.is_enabled() {
        ui::warn("cache file could not be read; results are incomplete");
    }
}

fn ensure_exists(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("no cache file at {}", path.display());
    }
    Ok(())
}

fn find(cache: &Arc<Cache>, attr_path: &str) -> anyhow::Result<Option<Cursor>> {
    let path = cache.symbols().create_path(attr_path);
    let Some(root) = cache.find_root()? else {
        return Ok(None);
    };
    Ok(root.find_along_attr_path(&path)?)
}

fn display_path(attr_path: &str) -> String {
    if attr_path.is_empty() {
        "<root>".to_string()
    } else {
        attr_path.to_string()
    }
}
