//! Spotify Shuffle Playlist CLI Library
//!
//! This library rebuilds a single "shuffle" playlist from everything the user
//! cares about on Spotify: selected playlists, liked songs, the most popular
//! tracks of selected followed artists and every saved album. The collected
//! tracks are deduplicated, shuffled and written back to the target playlist.
//!
//! # Modules
//!
//! - `api` - HTTP API endpoints for the local callback server
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `engine` - Retrying executor, pagination, aggregation set and batch writer
//! - `error` - Error types shared by the engine and its collaborators
//! - `management` - Token cache and triage preference storage
//! - `orchestrator` - The single-pass shuffle run
//! - `prompt` - Line-oriented yes/no operator prompt
//! - `reconcile` - Triage and the per-source track collectors
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Spotify Web API client implementation
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use shufflecli::{config, cli};
//!
//! #[tokio::main]
//! async fn main() -> shufflecli::Res<()> {
//!     config::load_env().await?;
//!     // Use CLI functions...
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod management;
pub mod orchestrator;
pub mod prompt;
pub mod reconcile;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Used by the CLI glue and configuration code where the concrete error
/// type does not matter to the caller. The engine itself uses the typed
/// errors from [`error`].
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Starting shuffle run...");
/// info!("Found {} playlists", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only the CLI layer uses this. Library code returns errors instead so a
/// failing source or page never takes the whole process down.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable issues: rate limit backoffs, dropped pages, sources
/// that failed while the run carries on.
///
/// # Example
///
/// ```
/// warning!("Rate limited on playlist items, retrying in {}s", secs);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
