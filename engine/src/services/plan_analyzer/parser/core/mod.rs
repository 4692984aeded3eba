//! Core parsing components shared by the operator parsers

pub mod expression;
pub mod value_parser;

pub use value_parser::ValueParser;
