//! timetrack - a personal command-line time tracker
//!
//! This library provides the core functionality for timetrack, including:
//! - The task registry: start/stop state machine and session history
//! - The tag index and tag-based filtering
//! - Configuration, database connection and migrations
//! - Snapshot persistence of the registry
//! - CLI command parsing, execution and output formatting
//!
//! # Example
//!
//! ```no_run
//! use timetrack::cli::run;
//!
//! fn main() {
//!     if let Err(e) = run() {
//!         eprintln!("Error: {}", e);
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod config;
pub mod logging;
pub mod db;
pub mod error;
pub mod models;
pub mod repo;
pub mod cli;
pub mod filter;
