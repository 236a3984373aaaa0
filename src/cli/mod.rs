//! CLI layer: argument parsing, command dispatch, and subcommand implementations.

pub mod args;
mod info;

pub use args::*;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use imgsearch::{
    absolute_path_string, default_storage_root, parse_query, snippet, watch_folder, CancelToken,
    FolderIndex, IndexManager, IndexWorker, LatestProgress, Query, SearchError, SidecarExtractor,
    Storage, TesseractExtractor, UpdateReport,
};

/// Width of text shown around a match with `--show-text`.
const SNIPPET_WIDTH: usize = 60;

// ─── CLI ─────────────────────────────────────────────────────────────

/// Offline image text search: index folders of scanned images and search their text
#[derive(Parser, Debug)]
#[command(name = "imgsearch", version, about, after_help = "\
Run 'imgsearch <COMMAND> --help' for detailed options and examples.\n\
Indexes are kept per folder and updated incrementally: only new or changed images are re-read.")]
pub(crate) struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Create or update the index of a folder
    Index(IndexArgs),

    /// Search an indexed folder
    Search(SearchArgs),

    /// Print the extracted text stored for one image
    Text(TextArgs),

    /// Show the index state of a folder
    Status(StatusArgs),

    /// List all folder indexes
    Info(InfoArgs),

    /// Keep a folder's index up to date while files change (Ctrl-C to stop)
    Watch(WatchArgs),
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    let cli = Cli::parse();
    init_logging(&cli.global);

    let result = build_manager(&cli.global).and_then(|manager| match cli.command {
        Commands::Index(args) => cmd_index(manager, args),
        Commands::Search(args) => cmd_search(&manager, args),
        Commands::Text(args) => cmd_text(&manager, args),
        Commands::Status(args) => {
            info::cmd_status(&manager, &args.dir);
            Ok(())
        }
        Commands::Info(args) => {
            if args.json {
                println!("{:#}", info::cmd_info_json(&manager));
            } else {
                info::cmd_info(&manager);
            }
            Ok(())
        }
        Commands::Watch(args) => cmd_watch(manager, args),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&global.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if global.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_manager(global: &GlobalArgs) -> Result<IndexManager, SearchError> {
    let root = global.storage.clone().unwrap_or_else(default_storage_root);
    let storage = Storage::new(root)?;
    let manager = match global.extractor {
        ExtractorKind::Tesseract => {
            let mut tesseract = TesseractExtractor::new(&global.tesseract).with_lang(&global.lang);
            if let Some(ref dir) = global.tessdata {
                tesseract = tesseract.with_tessdata(dir);
            }
            IndexManager::new(storage, tesseract)
        }
        ExtractorKind::Sidecar => {
            IndexManager::new(storage, SidecarExtractor::with_suffix(&global.sidecar_suffix))
        }
    };
    info!(storage = %manager.storage().root().display(), extractor = ?global.extractor, "Storage ready");
    Ok(manager)
}

/// Cancel token tripped by Ctrl-C.
fn ctrlc_token() -> CancelToken {
    let token = CancelToken::new();
    let handler_token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nStopping after the current image...");
        handler_token.cancel();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }
    token
}

fn print_report(report: &UpdateReport) {
    eprintln!(
        "Indexed {} image(s), removed {}, {} failed, {} total in folder ({:.1}s)",
        report.indexed_count(),
        report.removed.len(),
        report.failed_count(),
        report.total_files,
        report.elapsed.as_secs_f64()
    );
}

// ─── Commands ───────────────────────────────────────────────────────

fn cmd_index(manager: IndexManager, args: IndexArgs) -> Result<(), SearchError> {
    let worker = IndexWorker::start(Arc::new(manager))?;
    let cancel = ctrlc_token();
    let job = worker.submit_with_cancel(&args.dir, args.force, cancel)?;

    let mut last_line = String::new();
    let result = job.wait_with(|p: &LatestProgress| {
        let line = format!("[{:>3}%] {}", p.percent, p.message.as_deref().unwrap_or(""));
        if line != last_line {
            eprint!("\r\x1b[2K{}", line);
            last_line = line;
        }
    });
    if !last_line.is_empty() {
        eprintln!();
    }
    let report = result?;
    print_report(&report);
    for outcome in &report.outcomes {
        if let imgsearch::FileOutcome::ExtractionFailed { path, message } = outcome {
            eprintln!("  failed: {} ({})", path, message);
        }
    }
    worker.shutdown();
    Ok(())
}

fn cmd_search(manager: &IndexManager, args: SearchArgs) -> Result<(), SearchError> {
    if !manager.is_indexed(&args.dir) {
        eprintln!("Folder is not indexed yet. Run 'imgsearch index {}' first.", args.dir.display());
    }
    let start = Instant::now();
    let results = manager.search(&args.dir, &args.query, args.max_results)?;
    let elapsed = start.elapsed();

    // For `*` the snippet is the start of the text.
    let query = parse_query(&args.query).ok();
    // One snapshot load serves every result's snippet.
    let texts = if args.show_text { manager.store_for(&args.dir).load()? } else { None };
    let snippet_for = |path: &str| snippet_from(texts.as_ref(), query.as_ref(), path);

    if args.json {
        let items: Vec<serde_json::Value> = results
            .iter()
            .map(|path| {
                let mut item = serde_json::json!({ "path": path });
                if args.show_text {
                    item["snippet"] = serde_json::json!(snippet_for(path.as_str()));
                }
                item
            })
            .collect();
        println!(
            "{:#}",
            serde_json::json!({
                "query": args.query,
                "count": results.len(),
                "results": items,
            })
        );
        return Ok(());
    }

    for path in &results {
        println!("{}", path);
        if args.show_text {
            if let Some(s) = snippet_for(path.as_str()) {
                println!("    {}", s);
            }
        }
    }
    eprintln!("{} result(s) in {:.1}ms", results.len(), elapsed.as_secs_f64() * 1000.0);
    Ok(())
}

/// Snippet of the stored text of `path` in an already loaded folder index.
fn snippet_from(index: Option<&FolderIndex>, query: Option<&Query>, path: &str) -> Option<String> {
    let doc = index?.get(path)?;
    snippet(&doc.text, query?, SNIPPET_WIDTH)
}

fn cmd_text(manager: &IndexManager, args: TextArgs) -> Result<(), SearchError> {
    let path = absolute_path_string(&args.image);
    match manager.get_extracted_text_for_path(&path) {
        Some(text) => {
            println!("{}", text);
            Ok(())
        }
        None => Err(SearchError::InvalidArgs(format!("No indexed text for {}", path))),
    }
}

fn cmd_watch(manager: IndexManager, args: WatchArgs) -> Result<(), SearchError> {
    let dir: &Path = &args.dir;
    let worker = IndexWorker::start(Arc::new(manager))?;
    let stop = ctrlc_token();

    eprintln!("Bringing index up to date...");
    match worker.submit_with_cancel(dir, false, stop.clone())?.wait() {
        Ok(report) => print_report(&report),
        Err(SearchError::Cancelled) => return Ok(()),
        Err(e) => return Err(e),
    }

    eprintln!("Watching {} (Ctrl-C to stop)", dir.display());
    watch_folder(&worker, dir, args.debounce_ms, &stop, |result| match result {
        Ok(report) => print_report(&report),
        Err(SearchError::Cancelled) => {}
        Err(e) => eprintln!("Update failed: {}", e),
    })?;
    worker.shutdown();
    Ok(())
}
