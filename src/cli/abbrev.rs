// Command abbreviation matching for the timetrack CLI

/// Find all commands that start with the given prefix (case-insensitive)
pub fn find_matching_commands<'a>(prefix: &str, commands: &'a [&str]) -> Vec<&'a str> {
    let prefix_lower = prefix.to_lowercase();
    commands.iter()
        .filter(|cmd| cmd.to_lowercase().starts_with(&prefix_lower))
        .copied()
        .collect()
}

/// Find a unique command match for the given prefix
/// Returns Ok(command) if exactly one match, Err(matches) if ambiguous, Err(empty) if no match
/// Exact matches take precedence over prefix matches
pub fn find_unique_command<'a>(prefix: &str, commands: &'a [&str]) -> Result<&'a str, Vec<&'a str>> {
    let prefix_lower = prefix.to_lowercase();
    for cmd in commands {
        if cmd.to_lowercase() == prefix_lower {
            return Ok(*cmd);
        }
    }

    let matches = find_matching_commands(prefix, commands);

    if matches.len() == 1 {
        Ok(matches[0])
    } else {
        Err(matches)
    }
}

/// Top-level commands
pub const TOP_LEVEL_COMMANDS: &[&str] = &[
    "start", "stop", "resume", "remove", "list", "tag", "help"
];

/// Tag subcommands
pub const TAG_COMMANDS: &[&str] = &[
    "add", "remove", "list"
];

/// Get subcommands for a given top-level command
pub fn get_subcommands(command: &str) -> Option<&'static [&'static str]> {
    match command {
        "tag" => Some(TAG_COMMANDS),
        _ => None,
    }
}

fn expand_one(arg: &str, commands: &[&str], kind: &str) -> Result<String, String> {
    match find_unique_command(arg, commands) {
        Ok(full) => Ok(full.to_string()),
        // No match: leave it for clap to report
        Err(matches) if matches.is_empty() => Ok(arg.to_string()),
        Err(matches) => Err(format!(
            "Ambiguous {} '{}'. Did you mean one of: {}?",
            kind,
            arg,
            matches.join(", ")
        )),
    }
}

/// Expand command abbreviations in argument list
/// Only the command (and its subcommand) are expanded; task titles pass through.
pub fn expand_command_abbreviations(mut args: Vec<String>) -> Result<Vec<String>, String> {
    let Some(first) = args.first() else {
        return Ok(args);
    };
    if first.starts_with('-') {
        return Ok(args);
    }

    let command = expand_one(first, TOP_LEVEL_COMMANDS, "command")?;
    if let Some(subcommands) = get_subcommands(&command) {
        let expanded = match args.get(1) {
            Some(next) if !next.starts_with('-') => Some(expand_one(next, subcommands, "subcommand")?),
            _ => None,
        };
        if let Some(subcommand) = expanded {
            args[1] = subcommand;
        }
    }
    args[0] = command;
    Ok(args)
}
