use std::path::PathBuf;

use campus_business::EntityKind;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "campus")]
#[command(about = "Manage files attached to campus entities", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show timing/latency information
    #[arg(long, global = true)]
    pub timing: bool,

    /// Enable verbose debug output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the files stored for an entity
    Files {
        /// Entity type: activity, news, document, procedure, reform
        entity: EntityKind,

        /// Entity ID
        id: String,
    },
    /// Create an entity or edit its files
    Upload(UploadArgs),
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// Entity type: activity, news, document, procedure, reform
    pub entity: EntityKind,

    /// Edit this entity instead of creating a new one
    #[arg(long)]
    pub id: Option<String>,

    /// Attach files
    #[arg(long, short = 'f')]
    pub file: Vec<PathBuf>,

    /// Remove a stored file by ID
    #[arg(long)]
    pub remove: Vec<String>,

    /// Primary file: `existing:<ID>` or `new:<N>` (N counts staged files from 0)
    #[arg(long)]
    pub primary: Option<PrimaryArg>,

    /// Extra form field sent with the files
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// Print what would be sent without calling the API
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryArg {
    Existing(String),
    New(usize),
}

impl std::str::FromStr for PrimaryArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("existing", id)) if !id.is_empty() => Ok(Self::Existing(id.to_owned())),
            Some(("new", index)) => index
                .parse()
                .map(Self::New)
                .map_err(|_| format!("invalid staged file index `{index}`")),
            _ => Err(format!("expected `existing:<ID>` or `new:<N>`, got `{s}`")),
        }
    }
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{s}`")),
    }
}
