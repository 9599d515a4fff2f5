//! Trellis CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Static dependency graphs for JavaScript/TypeScript projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the graph for one entrypoint and write the snapshot
    Analyze {
        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Entrypoint, relative to the root or absolute
        #[arg(long)]
        entry: PathBuf,

        /// Write the snapshot here instead of <root>/.trellis/graph.json
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Start the HTTP/WebSocket server
    Serve {
        /// Config file
        #[arg(short, long, default_value = trellis_server::CONFIG_FILE)]
        config: PathBuf,

        /// Host to bind to (overrides config and TRELLIS_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and TRELLIS_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Open the graph endpoint in a browser once listening
        #[arg(short, long)]
        open: bool,
    },
    /// Watch a project and print change records as JSON lines
    Watch {
        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "trellis={level},trellis_core={level},trellis_indexer={level},trellis_watcher={level},trellis_server={level}",
            level = log_level
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze { root, entry, out } => commands::analyze(root, entry, out).await,
        Commands::Serve {
            config,
            host,
            port,
            open,
        } => commands::serve(config, host, port, open).await,
        Commands::Watch { root } => commands::watch(root).await,
        Commands::Version => {
            println!("Trellis v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
