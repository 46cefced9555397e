//! docframe CLI - live component frames for documentation sites.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "docframe")]
#[command(about = "Live component frames for documentation sites")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to docframe.toml config file
    #[arg(short, long, default_value = "docframe.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a docframe project in the current directory
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Install the client bundle into the built site
    Build {
        /// Site directory (defaults to config or "site")
        #[arg(short, long)]
        site_dir: Option<PathBuf>,
    },

    /// Preview the site with live frames
    Serve {
        /// Port the site is served on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Port of the frame server (defaults to config or 5000)
        #[arg(long)]
        dev_port: Option<u16>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Run only the frame server
    Frame {
        /// Host to bind to (defaults to config or "localhost")
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to config or 5000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check that every example is documented and runs
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&commands::project_root(&cli.config), yes)?;
        }
        Commands::Build { site_dir } => {
            commands::build::run(&cli.config, site_dir)?;
        }
        Commands::Serve {
            port,
            dev_port,
            no_open,
        } => {
            commands::serve::run(&cli.config, port, dev_port, !no_open).await?;
        }
        Commands::Frame { host, port } => {
            commands::frame::run(&cli.config, host, port).await?;
        }
        Commands::Check => {
            commands::check::run(&cli.config)?;
        }
    }

    Ok(())
}
