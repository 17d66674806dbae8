pub mod evaluator;
pub mod parser;

pub use evaluator::{filter_tasks, Combinator};
pub use parser::{parse_tag_list, parse_tags};
