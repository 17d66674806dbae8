//! Logger setup
//!
//! Verbosity comes from `RUST_LOG` (default `warn`). Records go to stderr
//! unless a log location is configured, in which case they are appended to
//! that file.

use crate::config::Config;
use env_logger::{Builder, Env, Target};
use std::fs::OpenOptions;

pub fn init(config: &Config) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));

    if let Some(path) = &config.log_location {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Warning: cannot open log file {}: {}", path.display(), e),
        }
    }

    // A logger may already be installed when running inside tests
    let _ = builder.try_init();
}
