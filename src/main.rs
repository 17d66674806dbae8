use timetrack::cli::{report_and_exit, run};

fn main() {
    // Colours need virtual terminal processing on Windows consoles
    let _ = enable_ansi_support::enable_ansi_support();

    if let Err(e) = run() {
        report_and_exit(&e);
    }
}
