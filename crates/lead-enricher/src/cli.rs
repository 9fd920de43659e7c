use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lea_core::OutputFormat;

#[derive(Parser)]
#[command(name = "lea")]
#[command(about = "Lead Enricher: find, research and draft outreach for prospective clients")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the generative API key
    Key {
        #[command(subcommand)]
        cmd: KeyCommands,
    },

    /// Run and browse lead searches
    Search {
        #[command(subcommand)]
        cmd: SearchCommands,
    },

    /// Show/manage configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Validate and store an API key
    Set {
        /// API key; read from stdin if omitted
        key: Option<String>,
    },

    /// Forget the stored API key
    Clear,

    /// Show whether a usable key is stored (masked)
    Status,
}

#[derive(Subcommand)]
pub enum SearchCommands {
    /// Start a new search and enrich every lead it finds
    New {
        /// What your business offers (at least 10 characters)
        #[arg(long = "service")]
        service_description: String,

        /// Geographic area to search (at least 3 characters)
        #[arg(long = "area")]
        target_area: String,

        /// Kind of business to target (at least 5 characters)
        #[arg(long = "audience")]
        target_audience: String,

        /// Your website, used for context and tone
        #[arg(long = "url")]
        service_url: Option<String>,

        /// Plain text or markdown file appended to the service description
        #[arg(long = "attach", value_name = "FILE")]
        attachments: Vec<PathBuf>,
    },

    /// List saved searches, most recent first
    List,

    /// Show a saved search (ULID or prefix)
    Show { id: String },

    /// Continue enriching unfinished leads of a saved search
    Resume { id: String },

    /// Delete a saved search
    Delete { id: String },

    /// Print a lead's email draft ready to paste
    Email {
        /// Search ULID or prefix
        id: String,
        /// Lead id or name
        lead: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a commented default config file
    Init,

    /// Print the config file location
    Path,
}
