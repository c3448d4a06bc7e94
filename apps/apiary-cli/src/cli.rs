use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "apiary")]
#[command(about = "Inspect and reset the local tab, history, and favorites stores")]
#[command(version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "PATH", env = "APIARY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Application whose stores to open
    #[arg(long, global = true, value_name = "NAME")]
    pub app: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Log filter used when `RUST_LOG` is not set
    pub fn default_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the store names and files of an application
    Namespace {
        /// Application name as shown in the workbench
        #[arg(value_name = "APP")]
        application: String,
    },
    /// Open tabs
    Tabs {
        #[command(subcommand)]
        action: Action,
    },
    /// Call history
    History {
        #[command(subcommand)]
        action: Action,
    },
    /// Favorited endpoints
    Favorites {
        #[command(subcommand)]
        action: Action,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Print every record as JSON
    List,
    /// Delete every record
    Clear,
}
