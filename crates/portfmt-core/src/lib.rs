//! Tokeniser, parser, and emitter for the port Makefile dialect.
//!
//! This crate implements components A, B, C, and G of the system: the
//! raw-line buffer, the token model, the tokeniser, and the emitter. It
//! depends on [`portfmt_rules`] for the read-only domain table and on
//! [`portfmt_base`] for spans, errors, interning, and the arena. The edit
//! pipeline and merge engine that mutate the token sequence between
//! tokenising and emitting live in the separate `portfmt-edit` crate.

mod buffer;
mod emit;
mod lexer;
mod parser;
mod token;
mod value;
mod wrap;

pub use buffer::RawLines;
pub use emit::{emit, Behavior, OutputMode, Settings};
pub use lexer::{Tokenizer, TokenizerOutput};
pub use parser::Parser;
pub use token::{
    ConditionalHandle, ConditionalType, DomainHandle, Modifier, TargetHandle, Token, TokenKind,
    VariableHandle,
};
pub use value::{tokenize_value, ValueTokens};
pub use wrap::{command_complexity, pad_to_column, wrap_command_words, wrap_values};
