use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;
use strata_library::update::Changes;
use strata_media::Coordinates;
use time::PrimitiveDateTime;

#[derive(Debug, Parser)]
#[command(name = "strata", version)]
#[command(about = "Organize photos, videos, audio and text into a dated library")]
pub struct Cli {
    /// Log debug output, regardless of RUST_LOG
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Copy (or move) every file of a source tree into the library
    Import(ImportArgs),
    /// Change embedded metadata of library files and re-file them
    Update(UpdateArgs),
    /// Show how many hashes have how many source files
    Analyze {
        /// Manifest to analyze
        manifest: PathBuf,
    },
    /// Combine several manifests into one
    Merge {
        /// Where to write the combined manifest
        #[arg(short, long)]
        output: PathBuf,
        /// Indent the written manifest
        #[arg(long)]
        indent: bool,
        /// Manifests to combine, in order
        #[arg(required = true)]
        manifests: Vec<PathBuf>,
    },
    /// Print every manifest entry whose library file is named NAME
    Find {
        manifest: PathBuf,
        name: String,
    },
    /// Rebuild the hash database from every file below a directory
    GenerateDb {
        /// Directory to record
        directory: PathBuf,
    },
    /// Check every file recorded in the hash database
    Verify,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Import configuration (JSON)
    #[arg(short, long, env = "STRATA_CONFIG")]
    pub config: PathBuf,
    /// Import from this directory instead of the configured source
    #[arg(short, long)]
    pub source: Option<PathBuf>,
    /// Manifest recording every imported file
    #[arg(short, long)]
    pub manifest: PathBuf,
    /// Indent the written manifest
    #[arg(long)]
    pub indent_manifest: bool,
    /// Write a timestamped copy instead of replacing the manifest
    #[arg(long)]
    pub no_overwrite_manifest: bool,
    /// Place files whose content is already in the manifest anyway
    #[arg(long)]
    pub allow_duplicates: bool,
    /// Move files instead of copying them
    #[arg(long = "move")]
    pub move_files: bool,
    /// Work out where everything would go without touching any file
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("changes").required(true).multiple(true).args(["album", "location", "time", "title"])))]
pub struct UpdateArgs {
    /// Import configuration (JSON); its target is the library being updated
    #[arg(short, long, env = "STRATA_CONFIG")]
    pub config: PathBuf,
    #[arg(long)]
    pub album: Option<String>,
    /// Position as `latitude,longitude`, in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub location: Option<Coordinates>,
    /// Capture time as `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`
    #[arg(long, value_parser = parse_time)]
    pub time: Option<PrimitiveDateTime>,
    #[arg(long)]
    pub title: Option<String>,
    /// Files or directories to update
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

impl UpdateArgs {
    pub fn changes(&self) -> Changes {
        Changes {
            album: self.album.clone(),
            location: self.location,
            time: self.time,
            title: self.title.clone(),
        }
    }
}

fn parse_time(value: &str) -> Result<PrimitiveDateTime, String> {
    Changes::parse_time(value).map_err(|_| format!("`{value}` is not `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`"))
}
