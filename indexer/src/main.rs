use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use songdex_core::document::{parse_json, parse_jsonl};
use songdex_core::persist::{load_index, save_index, Format};
use songdex_core::{Document, FieldDescriptor, IdfVariant, IndexBuilder, IndexConfig, Language, QueryEngine};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

use std::fs::File;
use std::io::{BufReader, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "songdex")]
#[command(about = "Build and query multilingual song indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from a JSON array (or JSON Lines) of songs
    Build {
        /// Input songs file (.json or .jsonl)
        input: PathBuf,
        /// Output index file
        output: PathBuf,
        /// JSON config file; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        /// Stemming languages, comma-separated ISO 639-1 codes
        #[arg(long, value_delimiter = ',')]
        languages: Option<Vec<Language>>,
        /// Indexed field as NAME=BOOST; repeat in field order
        #[arg(long = "field")]
        fields: Vec<FieldDescriptor>,
        /// Drop common words of the configured languages
        #[arg(long, default_value_t = false)]
        stop_words: bool,
        #[arg(long, value_enum)]
        idf: Option<IdfArg>,
        /// Worker threads (1 builds sequentially)
        #[arg(long)]
        threads: Option<usize>,
        /// Output format; defaults to json for .json outputs, binary otherwise
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Rank songs in an index against a query
    Search {
        index: PathBuf,
        query: String,
        /// Maximum number of hits (at least 1)
        #[arg(long, default_value = "10")]
        limit: NonZeroUsize,
        /// Songs file (.json or .jsonl) the index was built from, to print names with the hits
        #[arg(long)]
        songs: Option<PathBuf>,
    },
    /// Print an index's metadata, schema and analysis settings
    Inspect { index: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum IdfArg {
    /// ln(N / (1 + df))
    Standard,
    /// ln(1 + N / (1 + df))
    Smoothed,
}

impl From<IdfArg> for IdfVariant {
    fn from(arg: IdfArg) -> Self {
        match arg {
            IdfArg::Standard => IdfVariant::Standard,
            IdfArg::Smoothed => IdfVariant::Smoothed,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Binary,
    Json,
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Binary => Format::Binary,
            FormatArg::Json => Format::Json,
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, config, languages, fields, stop_words, idf, threads, format } => {
            let mut cfg = match config {
                Some(path) => IndexConfig::from_json_file(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => IndexConfig::default(),
            };
            if let Some(languages) = languages {
                cfg.languages = languages;
            }
            if !fields.is_empty() {
                cfg.fields = fields;
            }
            cfg.stop_words |= stop_words;
            if let Some(idf) = idf {
                cfg.idf = idf.into();
            }
            if threads.is_some() {
                cfg.threads = threads;
            }
            let format = format.map(Format::from).unwrap_or_else(|| Format::from_path(&output));
            build_index(&input, &output, &cfg, format)
        }
        Commands::Search { index, query, limit, songs } => search_index(&index, &query, limit, songs.as_deref()),
        Commands::Inspect { index } => inspect_index(&index),
    }
}

fn read_documents(input: &Path) -> Result<Vec<Document>> {
    let f = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let reader = BufReader::new(f);
    let docs = if input.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        parse_jsonl(reader)
    } else {
        parse_json(reader)
    };
    docs.with_context(|| format!("reading songs from {}", input.display()))
}

fn build_index(input: &Path, output: &Path, config: &IndexConfig, format: Format) -> Result<()> {
    let docs = read_documents(input)?;
    tracing::info!(num_docs = docs.len(), input = %input.display(), "ingested documents");

    let builder = IndexBuilder::new(config)?;
    let snapshot = builder.build(&docs)?;
    save_index(output, &snapshot, format)?;

    tracing::info!(output = %output.display(), "index build complete");
    Ok(())
}

fn search_index(index: &Path, query: &str, limit: NonZeroUsize, songs: Option<&Path>) -> Result<()> {
    let snapshot = load_index(index).with_context(|| format!("loading index {}", index.display()))?;
    let engine = QueryEngine::for_snapshot(&snapshot)?;
    let hits = engine.search(query, Some(limit.get()));

    let songs = songs.map(read_documents).transpose()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for hit in hits {
        let mut line = serde_json::to_value(&hit)?;
        if let Some(songs) = &songs {
            line["name"] = song_name(songs, hit.doc_id as usize);
        }
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// DocIds are input ordinals, so the songs file lines up with the index by position.
fn song_name(songs: &[Document], doc_id: usize) -> Value {
    songs
        .get(doc_id)
        .and_then(|song| song.field("name"))
        .map(|name| Value::String(name.to_string()))
        .unwrap_or(Value::Null)
}

fn inspect_index(index: &Path) -> Result<()> {
    let snapshot = load_index(index).with_context(|| format!("loading index {}", index.display()))?;
    let summary = serde_json::json!({
        "meta": snapshot.meta,
        "fields": snapshot.schema.fields(),
        "analysis": snapshot.analysis,
        "idf": snapshot.idf,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
