// Error handling utilities for consistent error messages and exit codes

use crate::error::TrackerError;
use std::process;

/// Exit code for invalid input and missing tasks
pub const EXIT_USER_ERROR: i32 = 1;
/// Exit code for storage failures and registry corruption
pub const EXIT_INTERNAL_ERROR: i32 = 2;

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, missing resources, etc.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(EXIT_USER_ERROR);
}

/// Exit with an internal error (exit code >1)
/// Internal errors are for unexpected system failures, database corruption, etc.
pub fn internal_error(message: &str) -> ! {
    eprintln!("Internal error: {}", message);
    process::exit(EXIT_INTERNAL_ERROR);
}

/// Exit code for an error returned by a command.
///
/// Recoverable tracker errors are the user's; anything else (I/O, SQLite,
/// a corrupt registry) is internal.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<TrackerError>() {
        Some(e) if !e.is_fatal() => EXIT_USER_ERROR,
        _ => EXIT_INTERNAL_ERROR,
    }
}

/// Print an error returned by a command and exit with the matching code
pub fn report_and_exit(error: &anyhow::Error) -> ! {
    let code = exit_code_for(error);
    if code == EXIT_USER_ERROR {
        user_error(&error.to_string());
    }

    let mut message = error.to_string();
    let mut chain = error.chain().skip(1).peekable();
    if chain.peek().is_some() {
        message.push_str("\n\nCaused by:");
        for (indent, cause) in chain.enumerate() {
            message.push_str(&format!("\n{:indent$}  {}", "", cause, indent = indent + 1));
        }
    }
    internal_error(&message);
}
