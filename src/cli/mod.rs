pub mod prompt;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "wanderlog", about = "Travel itinerary planner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    Whoami,
    Trips {
        #[command(subcommand)]
        command: TripCommands,
    },
    Activity {
        #[command(subcommand)]
        command: ActivityCommands,
    },
    Docs {
        #[command(subcommand)]
        command: DocCommands,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Doctor,
}

#[derive(Debug, Subcommand)]
pub enum TripCommands {
    List,
    Show {
        id: i64,
        #[arg(long)]
        day: Option<usize>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    New {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        destination: String,
        /// YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        end: Option<String>,
    },
    Map {
        id: i64,
        #[arg(long)]
        day: Option<usize>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ActivityCommands {
    Add {
        #[arg(long)]
        trip: i64,
        /// 1-based day of the trip
        #[arg(long)]
        day: usize,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long = "type", default_value = "attraction")]
        activity_type: String,
        #[arg(long, default_value = "")]
        location: String,
        /// HH:MM or RFC 3339
        #[arg(long, default_value = "")]
        start: String,
        /// HH:MM or RFC 3339
        #[arg(long, default_value = "")]
        end: String,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        cost: f64,
        #[arg(long, default_value = "IDR")]
        currency: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    Delete {
        id: i64,
        #[arg(long)]
        trip: i64,
    },
}

#[derive(Debug, Subcommand)]
pub enum DocCommands {
    Upload {
        #[arg(long)]
        trip: i64,
        path: PathBuf,
        #[arg(long)]
        mime: Option<String>,
    },
    List {
        #[arg(long)]
        trip: i64,
    },
    Delete {
        id: String,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    Export {
        id: String,
        destination: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
