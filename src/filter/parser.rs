//! Tag list parser for command line input
//!
//! Tags may be written with or without a leading `#` and may be packed into a
//! single argument:
//!
//! ```text
//! --tag "#work #Urgent"   ->  #work, #urgent
//! --tag work,home         ->  #work, #home
//! --tag '#a#b'            ->  #a, #b
//! ```

use crate::error::Result;
use crate::models::Tag;

/// Parse one command line value into tags, preserving order and dropping repeats
pub fn parse_tag_list(raw: &str) -> Result<Vec<Tag>> {
    let mut tags: Vec<Tag> = Vec::new();
    for word in raw.split(|c: char| c == '#' || c == ',' || c.is_whitespace()) {
        if word.is_empty() {
            continue;
        }
        let tag = Tag::parse(word)?;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

/// Parse every `--tag` value given on the command line
pub fn parse_tags(values: &[String]) -> Result<Vec<Tag>> {
    let mut tags: Vec<Tag> = Vec::new();
    for value in values {
        for tag in parse_tag_list(value)? {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    Ok(tags)
}
