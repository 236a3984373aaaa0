//! CLI argument structs for all subcommands.

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

/// Arguments shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Storage root holding `indexes/` (default: $IMGSEARCH_STORAGE, then the platform data dir)
    #[arg(long, global = true)]
    pub storage: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace (RUST_LOG overrides)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// How text is pulled out of images
    #[arg(long, global = true, value_enum, default_value_t = ExtractorKind::Tesseract)]
    pub extractor: ExtractorKind,

    /// Path to the tesseract executable
    #[arg(long, global = true, default_value = "tesseract")]
    pub tesseract: PathBuf,

    /// Directory with tesseract language data
    #[arg(long, global = true)]
    pub tessdata: Option<PathBuf>,

    /// OCR language
    #[arg(long, global = true, default_value = "eng")]
    pub lang: String,

    /// Suffix of pre-extracted text files for `--extractor sidecar`
    #[arg(long, global = true, default_value = ".txt")]
    pub sidecar_suffix: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    /// Run the tesseract command-line tool
    Tesseract,
    /// Read `<image><suffix>` text files written by another tool
    Sidecar,
}

#[derive(Parser, Debug)]
pub struct IndexArgs {
    /// Folder of images to index
    pub dir: PathBuf,

    /// Re-extract every image, even unchanged ones
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Indexed folder to search
    pub dir: PathBuf,

    /// Free text; empty or `*` lists every image
    #[arg(default_value = "*")]
    pub query: String,

    /// Maximum number of results
    #[arg(short = 'n', long, default_value = "2000")]
    pub max_results: usize,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Show a snippet of the matching text under each result
    #[arg(long)]
    pub show_text: bool,
}

#[derive(Parser, Debug)]
pub struct TextArgs {
    /// Image path, as it was indexed
    pub image: PathBuf,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Folder to inspect
    pub dir: PathBuf,
}

#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Folder to keep indexed
    pub dir: PathBuf,

    /// Quiet period after the last change before re-indexing
    #[arg(long, default_value_t = imgsearch::DEFAULT_DEBOUNCE_MS)]
    pub debounce_ms: u64,
}
