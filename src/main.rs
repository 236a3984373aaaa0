//! Offline image text search.
//!
//! Binary crate entry point. All CLI logic is in the `cli` module; indexing
//! and search live in the `imgsearch` library.

// mimalloc returns freed pages to the OS, keeping long watch sessions lean.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod cli;

fn main() {
    cli::run();
}
