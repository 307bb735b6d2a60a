//! Kiln CLI - static site asset pipeline with live reload.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kiln_pipeline::Category;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Static site asset pipeline with live reload")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to kiln.toml config file
    #[arg(short, long, default_value = "kiln.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete the output directory
    Clean,

    /// Render pages through their layouts
    Html,

    /// Compile, prefix and minify stylesheets
    Css,

    /// Bundle and minify scripts
    Js,

    /// Optimize images
    Images,

    /// Copy fonts
    Fonts,

    /// Clean, then run every task
    Build,

    /// Build, serve the output and rebuild on change (default)
    Watch {
        /// Port to listen on (defaults to config or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Scaffold a starter project in the current directory
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    // Execute command
    let command = cli.command.unwrap_or(Commands::Watch {
        port: None,
        no_open: false,
    });

    match command {
        Commands::Clean => commands::task::clean(&cli.config).await?,
        Commands::Html => commands::task::run(&cli.config, Category::Html).await?,
        Commands::Css => commands::task::run(&cli.config, Category::Css).await?,
        Commands::Js => commands::task::run(&cli.config, Category::Js).await?,
        Commands::Images => commands::task::run(&cli.config, Category::Images).await?,
        Commands::Fonts => commands::task::run(&cli.config, Category::Fonts).await?,
        Commands::Build => commands::build::run(&cli.config).await?,
        Commands::Watch { port, no_open } => {
            commands::watch::run(&cli.config, port, !no_open).await?;
        }
        Commands::Init { yes } => commands::init::run(&cli.config, yes).await?,
    }

    Ok(())
}
