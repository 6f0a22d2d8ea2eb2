//! The blog server.
//!
//! ```bash
//! # Built-in defaults: MySQL on 127.0.0.1:3306, listening on 127.0.0.1:9000
//! quill
//!
//! # Override file, and create the tables before serving
//! quill --config config_override.toml --init-schema
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use quill::blog::{self, App};
use quill::config::Config;
use quill::orm::Db;
use quill::Server;

/// quill blog server
#[derive(Parser, Debug)]
#[command(name = "quill", version, about = "Serve the quill blog")]
struct Args {
    /// TOML file merged over the built-in configuration
    #[arg(short, long, value_name = "FILE", env = "QUILL_CONFIG")]
    config: Option<PathBuf>,

    /// Create the blog tables before serving
    #[arg(long)]
    init_schema: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("loading configuration")?;

    init_logging(config.debug);

    let schemas = blog::models::declare_all();
    let db = Db::connect(&config.database).await.context("connecting to the database")?;

    if args.init_schema {
        for schema in schemas {
            db.execute(&schema.create_table_sql(), &[], true)
                .await
                .with_context(|| format!("creating table `{}`", schema.table()))?;
            info!("created table `{}`", schema.table());
        }
    }

    let app = App { db: db.clone(), session: config.session.clone() };
    let served = Server::bind(config.server.addr()?).serve(blog::routes(app)).await;
    db.close().await;
    served.context("serving")
}

fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "quill=debug" } else { "quill=info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
