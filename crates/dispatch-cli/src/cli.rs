use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dispatch_core::OrderStatus;

#[derive(Parser)]
#[command(name = "dispatch")]
#[command(about = "Author and submit supplier dispatch orders", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true, env = "DISPATCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a draft file without submitting it
    Validate {
        /// Draft file (TOML)
        draft: PathBuf,

        /// Print violations as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate, store and upload a draft
    Submit {
        /// Draft file (TOML)
        draft: PathBuf,

        /// Overwrite this existing order instead of creating one
        #[arg(long)]
        order: Option<String>,
    },

    /// Inspect stored orders
    #[command(subcommand)]
    Orders(OrderCommands),

    /// Upload the images a previous submission could not
    Retry {
        /// Order ID
        order: String,

        /// Draft file the order was submitted from
        draft: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum OrderCommands {
    /// List all orders
    List,

    /// Show order details
    Show {
        /// Order ID
        order: String,

        /// Print the stored order as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change an order's status
    Status {
        /// Order ID
        order: String,

        /// pending, approved, dispatched, received or cancelled
        status: OrderStatus,
    },
}
