use clap::{Parser, Subcommand};
use rusqlite::Connection;
use crate::config::Config;
use crate::db::DbConnection;
use crate::error::TrackerError;
use crate::filter::{parse_tags, Combinator};
use crate::models::{AggregateRow, EntryStatus, Tag, TaskRecord, Title, Transition};
use crate::repo::RegistryRepo;
use crate::cli::abbrev;
use crate::cli::error::user_error;
use crate::cli::output::{format_duration, format_tag_counts, format_task_table, TableOptions};
use anyhow::{Context, Result};
use log::{debug, info};

#[derive(Parser)]
#[command(name = "timetrack")]
#[command(about = "Track the time you spend on your tasks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start timing a task, stopping the one currently running
    Start {
        /// Tags to attach (e.g., --tag "#work #urgent")
        #[arg(short, long = "tag", value_name = "TAGS")]
        tags: Vec<String>,
        /// Task title
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// Stop timing the running task
    Stop,
    /// Resume the running or most recently stopped task
    Resume,
    /// Remove a task and its history
    Remove {
        /// Remove every task
        #[arg(long, conflicts_with = "title")]
        all: bool,
        /// Task title
        title: Vec<String>,
    },
    /// List tasks with their durations
    List {
        /// Only show tasks with these tags (e.g., --tag "#work #home")
        #[arg(short, long = "tag", value_name = "TAGS")]
        tags: Vec<String>,
        /// Match tasks with any of the tags instead of all of them
        #[arg(long)]
        any: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Tag management commands
    Tag {
        #[command(subcommand)]
        subcommand: TagCommands,
    },
}

#[derive(Subcommand)]
pub enum TagCommands {
    /// Attach a tag to a task
    Add {
        /// Tag (e.g., #work)
        tag: String,
        /// Task title
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// Remove a tag from every task, or from one task if a title is given
    Remove {
        /// Tag (e.g., #work)
        tag: String,
        /// Task title
        title: Vec<String>,
    },
    /// List tags and how many tasks carry them
    List,
}

pub fn run() -> Result<()> {
    let config = Config::load()?;
    crate::logging::init(&config);
    debug!("using data location {}", config.data_location.display());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = match abbrev::expand_command_abbreviations(args) {
        Ok(expanded) => expanded,
        Err(e) => user_error(&e),
    };

    let clap_args = std::iter::once("timetrack".to_string())
        .chain(args)
        .collect::<Vec<_>>();
    let cli = match Cli::try_parse_from(clap_args) {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version are printed to stdout and are not failures
            e.print()?;
            if e.use_stderr() {
                std::process::exit(crate::cli::error::EXIT_USER_ERROR);
            }
            return Ok(());
        }
    };

    let conn = DbConnection::connect(&config)
        .context("Failed to connect to database")?;
    handle_command(&conn, cli)
}

fn handle_command(conn: &Connection, cli: Cli) -> Result<()> {
    match cli.command {
        None => handle_current(conn),
        Some(Commands::Start { tags, title }) => handle_start(conn, title, tags),
        Some(Commands::Stop) => handle_stop(conn),
        Some(Commands::Resume) => handle_resume(conn),
        Some(Commands::Remove { all, title }) => handle_remove(conn, title, all),
        Some(Commands::List { tags, any, json }) => handle_list(conn, tags, any, json),
        Some(Commands::Tag { subcommand }) => match subcommand {
            TagCommands::Add { tag, title } => handle_tag_add(conn, tag, title),
            TagCommands::Remove { tag, title } => handle_tag_remove(conn, tag, title),
            TagCommands::List => handle_tag_list(conn),
        },
    }
}

fn parse_title(args: &[String]) -> Title {
    Title::from_args(args).unwrap_or_else(|e| user_error(&e.to_string()))
}

fn parse_tag(raw: &str) -> Tag {
    Tag::parse(raw).unwrap_or_else(|e| user_error(&e.to_string()))
}

fn print_transition(transition: &Transition) {
    match transition {
        Transition::Started { title, stopped, created } => {
            if let Some(previous) = stopped {
                println!("Stopped '{}'", previous);
            }
            if *created {
                println!("Started new task '{}'", title);
            } else {
                println!("Started '{}'", title);
            }
        }
        Transition::Stopped { title } => println!("Stopped '{}'", title),
        Transition::AlreadyActive { title } => println!("'{}' is already running", title),
        Transition::NothingToStop => println!("No task is running"),
        Transition::NothingToResume => println!("No task to resume"),
    }
}

/// Show the running task (`timetrack` with no command)
fn handle_current(conn: &Connection) -> Result<()> {
    let registry = RegistryRepo::load_registry(conn)?;

    if let Some(record) = registry.current() {
        print!("{}", format_task_table(&[record.aggregate_row()], TableOptions::detect()));
        return Ok(());
    }

    if registry.is_empty() {
        println!("No tasks yet. Start your first one with: timetrack start <title>");
        return Ok(());
    }

    println!("No tasks are running. Start one with: timetrack start <title>");
    if let Some(last) = registry.resume_target() {
        println!("Last active: '{}' (continue with: timetrack resume)", last);
    }
    Ok(())
}

fn handle_start(conn: &Connection, title_args: Vec<String>, tag_args: Vec<String>) -> Result<()> {
    let title = parse_title(&title_args);
    let tags = parse_tags(&tag_args).unwrap_or_else(|e| user_error(&e.to_string()));

    let transition = RegistryRepo::update(conn, |registry| {
        let transition = registry.insert_entry(&title, EntryStatus::Active)?;
        for tag in &tags {
            registry.add_tag(tag, &title)?;
        }
        Ok(transition)
    })?;

    info!("start '{}': {:?}", title, transition);
    print_transition(&transition);
    if !tags.is_empty() {
        let names: Vec<&str> = tags.iter().map(Tag::as_str).collect();
        println!("Tagged '{}' with {}", title, names.join(" "));
    }
    Ok(())
}

fn handle_stop(conn: &Connection) -> Result<()> {
    let (transition, total) = RegistryRepo::update(conn, |registry| {
        let transition = registry.stop_active()?;
        let total = match &transition {
            Transition::Stopped { title } => registry.get(title).map(TaskRecord::total_duration),
            _ => None,
        };
        Ok((transition, total))
    })?;

    info!("stop: {:?}", transition);
    match (&transition, total) {
        (Transition::Stopped { title }, Some(total)) => {
            println!("Stopped '{}' (total {})", title, format_duration(total));
        }
        (Transition::NothingToStop, _) => user_error("No task is running"),
        _ => print_transition(&transition),
    }
    Ok(())
}

fn handle_resume(conn: &Connection) -> Result<()> {
    let transition = RegistryRepo::update(conn, |registry| Ok(registry.resume()?))?;

    info!("resume: {:?}", transition);
    if transition == Transition::NothingToResume {
        user_error("No task to resume. Start one with: timetrack start <title>");
    }
    print_transition(&transition);
    Ok(())
}

fn handle_remove(conn: &Connection, title_args: Vec<String>, all: bool) -> Result<()> {
    if all {
        let removed = RegistryRepo::update(conn, |registry| Ok(registry.remove_all()))?;
        println!("Removed {} task{}", removed, if removed == 1 { "" } else { "s" });
        return Ok(());
    }

    if title_args.is_empty() {
        user_error("Provide a task title to remove, or --all to remove every task");
    }
    let title = parse_title(&title_args);

    let record = RegistryRepo::update(conn, |registry| {
        registry
            .remove_by_title(&title)
            .ok_or_else(|| TrackerError::NotFound(title.clone()).into())
    })?;
    println!("Removed '{}' ({} tracked)", record.title, format_duration(record.total_duration()));
    Ok(())
}

fn handle_list(conn: &Connection, tag_args: Vec<String>, any: bool, json: bool) -> Result<()> {
    let tags = parse_tags(&tag_args).unwrap_or_else(|e| user_error(&e.to_string()));
    let combinator = if any { Combinator::Any } else { Combinator::All };

    let registry = RegistryRepo::load_registry(conn)?;
    let mut records = registry.filter(&tags, combinator);

    // Keep the running task at the bottom, closest to the prompt
    let current = registry.current_active();
    records.sort_by_key(|record| Some(&record.title) == current);

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if registry.is_empty() {
        println!("No tasks yet. Start your first one with: timetrack start <title>");
    } else if records.is_empty() {
        println!("No matching tasks.");
    } else {
        let rows: Vec<AggregateRow> = records.iter().map(|r| r.aggregate_row()).collect();
        print!("{}", format_task_table(&rows, TableOptions::detect()));
    }
    Ok(())
}

fn handle_tag_add(conn: &Connection, tag: String, title_args: Vec<String>) -> Result<()> {
    let tag = parse_tag(&tag);
    let title = parse_title(&title_args);

    let added = RegistryRepo::update(conn, |registry| Ok(registry.add_tag(&tag, &title)?))?;
    if added {
        println!("Tagged '{}' with {}", title, tag);
    } else {
        println!("'{}' is already tagged {}", title, tag);
    }
    Ok(())
}

fn handle_tag_remove(conn: &Connection, tag: String, title_args: Vec<String>) -> Result<()> {
    let tag = parse_tag(&tag);

    if !title_args.is_empty() {
        let title = parse_title(&title_args);
        let removed = RegistryRepo::update(conn, |registry| Ok(registry.untag(&tag, &title)?))?;
        if removed {
            println!("Removed {} from '{}'", tag, title);
        } else {
            println!("'{}' is not tagged {}", title, tag);
        }
        return Ok(());
    }

    let affected = RegistryRepo::update(conn, |registry| Ok(registry.remove_tag(&tag)))?;
    if affected.is_empty() {
        println!("No task is tagged {}", tag);
    } else {
        println!(
            "Removed {} from {} task{}",
            tag,
            affected.len(),
            if affected.len() == 1 { "" } else { "s" }
        );
    }
    Ok(())
}

fn handle_tag_list(conn: &Connection) -> Result<()> {
    let registry = RegistryRepo::load_registry(conn)?;
    let counts = registry.tag_counts();
    if counts.is_empty() {
        println!("No tags yet. Add one with: timetrack tag add <tag> <title>");
    } else {
        print!("{}", format_tag_counts(&counts));
    }
    Ok(())
}
