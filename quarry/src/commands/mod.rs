//! Command-line surface.

mod artifacts;
mod catalog;
mod select;

use crate::setup::App;
use anyhow::Result;
use clap::{Parser, Subcommand};
use quarry_lib::Identifier;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "quarry", version, about = "Mod catalog, dependency selection and artifact cache")]
pub struct Cli {
    /// Data directory (overrides QUARRY_DATA_DIR)
    #[clap(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[clap(long, short, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the data directory and store, importing the base manifest if configured
    Init,

    /// List catalog mods and their versions
    List {
        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Import a manifest from a URL or file
    Import {
        /// http(s) URL or path of the manifest
        source: String,
    },

    /// Download a version's artifact into the cache (latest version if none given)
    Fetch { id: Identifier },

    /// Print the hash of a cached artifact
    Hash { id: Identifier },

    /// Hash the compiled entries of a cached artifact
    Analyze { id: Identifier },

    /// Apply selection toggles in order and print the resulting set
    ///
    /// Each toggle is an id, optionally suffixed with `=off` to deselect.
    Select {
        #[clap(required = true)]
        toggles: Vec<String>,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },
}

impl Command {
    pub async fn execute(self, app: &mut App) -> Result<()> {
        match self {
            Command::Init => catalog::execute_init(app),
            Command::List { json } => catalog::execute_list(app, json),
            Command::Import { source } => catalog::execute_import(app, &source).await,
            Command::Fetch { id } => artifacts::execute_fetch(app, &id).await,
            Command::Hash { id } => artifacts::execute_hash(app, &id),
            Command::Analyze { id } => artifacts::execute_analyze(app, &id),
            Command::Select { toggles, json } => select::execute_select(app, &toggles, json),
        }
    }
}
