//! Medgraph — medical research automation over HTTP

use clap::{Parser, Subcommand};
use medgraph_core::Config;
use medgraph_gateway::{start_gateway, ExtendedConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "medgraph", about = "Medgraph — evidence research pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        #[arg(short, long, default_value = "8080")]
        port: u16,
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
        /// Override the on-disk graph file
        #[arg(long)]
        graph_file: Option<PathBuf>,
        /// Override the local object store fallback directory
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Show version
    Version,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medgraph=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve {
            port,
            bind,
            graph_file,
            data_dir,
        }) => {
            init_tracing();

            let mut config = Config::from_env();
            if let Some(graph_file) = graph_file {
                config.graph_file = graph_file;
            }
            if let Some(data_dir) = data_dir {
                config.object_store.fallback_dir = data_dir;
            }

            start_gateway(ExtendedConfig { port, bind, config }).await?;
        }

        Some(Commands::Version) => {
            println!("medgraph v{}", env!("CARGO_PKG_VERSION"));
        }

        // No subcommand = serve with defaults
        None => {
            init_tracing();

            start_gateway(ExtendedConfig {
                config: Config::from_env(),
                ..Default::default()
            })
            .await?;
        }
    }

    Ok(())
}
