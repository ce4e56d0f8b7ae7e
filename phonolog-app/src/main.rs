//! Phonolog terminal application entry point.
//!
//! Startup order matters: the stale-reference cleanup pass must run against
//! the journal file before any command reads the store.

mod commands;
mod settings;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use phonolog_core::{clean_stale_audio_refs, Difficulty, JsonFileStore};
use settings::{default_settings_path, load_settings};
use tracing::info;

/// Personal vocabulary and pronunciation journal.
#[derive(Parser, Debug)]
#[command(name = "phonolog", version, about, long_about = None)]
struct Cli {
    /// Override the journal file location
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a word to the journal
    Add {
        word: String,
        /// easy, medium or hard
        #[arg(long)]
        difficulty: Option<Difficulty>,
        #[arg(long)]
        notes: Option<String>,
        /// Tag label (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Fetch IPA, audio and meanings from the dictionary
        #[arg(long)]
        lookup: bool,
    },
    /// List journal entries
    List {
        #[arg(long)]
        difficulty: Option<Difficulty>,
        #[arg(long)]
        tag: Option<String>,
        /// Substring match on the word
        #[arg(long)]
        search: Option<String>,
    },
    /// Update difficulty, notes or tags of an entry
    Update {
        /// Entry id or exact word
        id: String,
        #[arg(long)]
        difficulty: Option<Difficulty>,
        #[arg(long)]
        notes: Option<String>,
        /// Replacement tag label (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Remove an entry
    Remove {
        /// Entry id or exact word
        id: String,
    },
    /// Look up pronunciation data without saving anything
    Lookup { word: String },
    /// Suggest words for a partial query
    Suggest { query: String },
    /// Record your own pronunciation for an entry
    Record {
        /// Entry id or exact word
        id: String,
        /// Input device name (see `phonolog devices`)
        #[arg(long)]
        device: Option<String>,
    },
    /// List audio input devices
    Devices,
    /// Write a stored user recording to a WAV file
    ExportAudio {
        /// Entry id or exact word
        id: String,
        #[arg(long, value_name = "PATH")]
        out: PathBuf,
    },
    /// Show or change persisted settings
    Config {
        /// Preferred input device name
        #[arg(long)]
        device: Option<String>,
        /// Difficulty assigned to new entries
        #[arg(long)]
        default_difficulty: Option<Difficulty>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "phonolog=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let settings_path = default_settings_path();
    let mut app_settings = load_settings(&settings_path);

    let store_path = cli
        .store
        .clone()
        .or_else(|| app_settings.store_path.clone())
        .unwrap_or_else(JsonFileStore::default_store_path);

    // Repair journals written by the old session-scoped recording scheme
    // before anything reads the store.
    let cleaned = clean_stale_audio_refs(&store_path);
    if cleaned > 0 {
        info!(cleaned, "repaired stale user audio references");
    }

    let store = match JsonFileStore::new(store_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Add {
            word,
            difficulty,
            notes,
            tags,
            lookup,
        } => commands::add(&store, &app_settings, word, difficulty, notes, tags, lookup).await,
        Commands::List {
            difficulty,
            tag,
            search,
        } => commands::list(&store, difficulty, tag, search),
        Commands::Update {
            id,
            difficulty,
            notes,
            tags,
        } => commands::update(&store, id, difficulty, notes, tags),
        Commands::Remove { id } => commands::remove(&store, id),
        Commands::Lookup { word } => commands::lookup(word).await,
        Commands::Suggest { query } => commands::suggest_words(query).await,
        Commands::Record { id, device } => {
            commands::record(&store, &app_settings, id, device).await
        }
        Commands::Devices => commands::devices(),
        Commands::ExportAudio { id, out } => commands::export_audio(&store, id, out),
        Commands::Config {
            device,
            default_difficulty,
        } => commands::config(&settings_path, &mut app_settings, device, default_difficulty),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
