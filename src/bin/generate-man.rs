//! Writes the timetrack man page to stdout, or to the directory given as
//! the first argument.

use clap::CommandFactory;
use clap_mangen::Man;
use std::path::PathBuf;
use timetrack::cli::Cli;

fn main() -> std::io::Result<()> {
    let cmd = Cli::command();
    let man = Man::new(cmd);

    match std::env::args().nth(1) {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            std::fs::create_dir_all(&dir)?;
            let path = dir.join("timetrack.1");
            let mut file = std::fs::File::create(&path)?;
            man.render(&mut file)?;
            eprintln!("Wrote {}", path.display());
        }
        None => man.render(&mut std::io::stdout())?,
    }
    Ok(())
}
