//! Streaming page title parsing.
//!
//! Turns a free-text page title such as `"Frieren - Season 2 Episode 8"` into
//! a structured guess that the catalog resolver can search for.

mod elements;
mod parser;

pub use elements::{MediaKind, ParsedTitle};
pub use parser::{parse, ParseError};
