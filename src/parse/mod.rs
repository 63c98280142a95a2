//! Parsing of variant records, including the breakend ALT mini-grammar.

pub mod bnd;
pub mod records;
