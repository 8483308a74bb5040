use crate::config::{AppConfig, Overrides};
use crate::hot_reload::watch_schema;
use crate::router::Router;
use crate::routes::build_routes;
use crate::server::{AppService, HttpServer, ServerHandle};
use crate::store::Store;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// Command-line interface for tablegate
#[derive(Parser, Debug)]
#[command(name = "tablegate")]
#[command(about = "REST API over an existing SQLite database", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reflect a database and serve it over HTTP
    Serve {
        /// SQLite database file; it must already exist
        #[arg(short, long, env = "TABLEGATE_DATABASE")]
        database: Option<PathBuf>,

        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address and port to bind (default 0.0.0.0:8080)
        #[arg(long)]
        addr: Option<String>,

        /// Prefix for the table routes, e.g. /api
        #[arg(long)]
        base_path: Option<String>,

        /// Rows per page when `?page=` is given
        #[arg(long)]
        page_size: Option<u32>,

        /// Reload routes when the database schema changes
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
    /// Print the reflected tables and the routes that would be served
    Inspect {
        #[arg(short, long)]
        database: PathBuf,

        #[arg(long, default_value = "")]
        base_path: String,
    },
}

/// Parse the process arguments and run the chosen command
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve {
            database,
            config,
            addr,
            base_path,
            page_size,
            watch,
        } => {
            let file_config = match &config {
                Some(path) => AppConfig::load(path)?,
                None => AppConfig::default(),
            };
            let config = file_config.with_overrides(Overrides {
                database,
                addr,
                base_path,
                page_size,
                watch,
            });
            config.validate()?;
            let handle = start_server(&config)?;
            info!(addr = %handle.addr(), "tablegate listening");
            wait_for_shutdown(handle)
        }
        Commands::Inspect { database, base_path } => inspect(&database, &base_path),
    }
}

/// Open the database, build the service and start listening.
///
/// With `watch` set the schema watcher is attached to the returned service.
pub fn start_server(config: &AppConfig) -> Result<ServerHandle> {
    let db_path = config
        .database
        .as_deref()
        .ok_or_else(|| anyhow!("no database configured"))?;
    let store = Store::open(db_path, config.busy_timeout(), config.page_size)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    let mut service = AppService::new(Arc::new(store), &config.base_path, config.stack_size)
        .context("failed to reflect database schema")?;

    if config.watch {
        let watcher = watch_schema(db_path, service.clone()).context("failed to watch database")?;
        service.watcher = Some(Arc::new(Mutex::new(watcher)));
    }

    let handle = HttpServer(service)
        .start(config.addr.as_str())
        .with_context(|| format!("failed to bind {}", config.addr))?;
    Ok(handle)
}

fn inspect(database: &Path, base_path: &str) -> Result<()> {
    let store = Store::open(database, Duration::from_millis(0), crate::store::DEFAULT_PAGE_SIZE)
        .with_context(|| format!("failed to open database {}", database.display()))?;
    let schema = store.reflect()?;
    println!("[schema] version={} tables={}", schema.version, schema.tables.len());
    for table in &schema.tables {
        let key = if table.synthetic_key {
            format!("({}) synthetic", table.primary_key.join(","))
        } else {
            table.primary_key.join(",")
        };
        println!("[table] {} -> /{} key={key}", table.name, table.resource_name);
        for fk in &table.foreign_keys {
            println!("  [fk] {} -> {}.{}", fk.column, fk.ref_table, fk.ref_column);
        }
    }
    let routes = build_routes(&schema, base_path);
    Router::new(routes).dump_routes();
    Ok(())
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutting down");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> Result<()> {
    handle
        .join()
        .map_err(|e| anyhow!("server coroutine panicked: {e:?}"))
}
