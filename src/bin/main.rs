//! geosift CLI - query spatial tables with a polygon
//!
//! Usage:
//!   geosift tables
//!   geosift layers
//!   geosift bindings
//!   geosift query <polygon.geojson|-> [--format summary|geojson|render]
//!   geosift serve [--port <port>]
//!
//! Examples:
//!   geosift --connection gis bindings
//!   geosift query area.geojson --format geojson > hits.geojson
//!   cat area.geojson | geosift --schema planning query -

use clap::{Parser, Subcommand, ValueEnum};
use geosift::config::{ConnectionConfig, Settings};
use geosift::executor::WorkerExecutor;
use geosift::render::{feature_collection, render_all};
use geosift::session::{CycleReport, Session};
use geosift::worker::WorkerClient;
use geosift::Dialect;
use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "geosift")]
#[command(about = "geosift - find features from every spatial table inside a polygon")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $GEOSIFT_CONFIG, ./geosift.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Named connection from the config file
    #[arg(long, global = true)]
    connection: Option<String>,

    /// Schema to scan for geometry tables
    #[arg(long, global = true)]
    schema: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables exposing the geometry column
    Tables,

    /// List layer metadata records
    Layers,

    /// Show which layer each table is bound to
    Bindings,

    /// Run one polygon query
    Query {
        /// GeoJSON polygon file, or - for stdin
        polygon: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },

    /// Serve the HTTP API for the map front end
    #[cfg(feature = "ui")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Per-table counts and the result message
    Summary,
    /// GeoJSON FeatureCollection
    Geojson,
    /// Render items for a map widget
    Render,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("geosift=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let session = open_session(&cli).await?;

    match cli.command {
        Commands::Tables => cmd_tables(&session).await,
        Commands::Layers => cmd_layers(&session).await,
        Commands::Bindings => cmd_bindings(&session).await,
        Commands::Query { polygon, format } => cmd_query(&session, &polygon, format).await,
        #[cfg(feature = "ui")]
        Commands::Serve { port } => {
            geosift::web::serve(Arc::new(session), port).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Resolve settings and connection, spawn the worker, and build a session.
async fn open_session(cli: &Cli) -> Result<Session, Box<dyn Error>> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };

    let (driver, connection_string, schema) = match &cli.connection {
        Some(name) => {
            let conn = settings.get_connection(name)?;
            (
                conn.driver_type()?,
                conn.resolved_connection_string()?,
                settings.schema_for(conn),
            )
        }
        None => match settings.default_connection() {
            Some((_, conn)) => (
                conn.driver_type()?,
                conn.resolved_connection_string()?,
                settings.schema_for(conn),
            ),
            None => {
                let conn = ConnectionConfig::from_env()?;
                (
                    conn.driver,
                    conn.to_connection_string(),
                    settings.discovery.schema.clone(),
                )
            }
        },
    };
    settings.discovery.schema = cli.schema.clone().unwrap_or(schema);

    let client = WorkerClient::spawn_with_settings(&settings).await?;
    let executor = WorkerExecutor::new(
        Arc::new(client),
        driver.as_str(),
        connection_string,
        settings.worker.retry.clone(),
    );

    Ok(Session::from_settings(
        Arc::new(executor),
        Dialect::from(driver),
        &settings,
    ))
}

async fn cmd_tables(session: &Session) -> Result<ExitCode, Box<dyn Error>> {
    let discovery = session.discover().await?;
    for table in &discovery.tables {
        println!("{}", table);
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_layers(session: &Session) -> Result<ExitCode, Box<dyn Error>> {
    let discovery = session.discover().await?;
    for layer in &discovery.layers {
        let srid = layer
            .srid
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let style = if layer.style.is_explicit() {
            "styled"
        } else {
            "no explicit style"
        };
        println!("{:<40} {:>6}  {}", layer.layer_name, srid, style);
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_bindings(session: &Session) -> Result<ExitCode, Box<dyn Error>> {
    let discovery = session.discover().await?;
    for binding in &discovery.bindings {
        println!(
            "{:<32} -> {:<32} {:>6}  {}",
            binding.table.name, binding.layer.layer_name, binding.srid, binding.kind
        );
    }
    for gap in &discovery.gaps {
        println!("unbound: {}", gap);
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_query(
    session: &Session,
    polygon: &Path,
    format: OutputFormat,
) -> Result<ExitCode, Box<dyn Error>> {
    let text = read_input(polygon)?;
    let report = match session.submit_text(&text).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };

    match format {
        OutputFormat::Summary => print_summary(&report),
        OutputFormat::Geojson => {
            println!(
                "{}",
                serde_json::to_string_pretty(&feature_collection(&report.features))?
            );
        }
        OutputFormat::Render => {
            println!(
                "{}",
                serde_json::to_string_pretty(&render_all(&report.features))?
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_summary(report: &CycleReport) {
    for (table, rows) in &report.row_counts {
        println!("{:<32} {:>8}", table, rows);
    }
    for failure in &report.failures {
        println!("{:<32} {:>8}  {}", failure.table, "failed", failure.error);
    }
    if report.skipped_geometries > 0 {
        println!("skipped geometries: {}", report.skipped_geometries);
    }
    println!();
    println!("{}", report.message());
}

fn read_input(path: &Path) -> Result<String, Box<dyn Error>> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading file '{}': {}", path.display(), e).into())
}
