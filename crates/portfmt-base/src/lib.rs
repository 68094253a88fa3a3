//! Foundational primitives shared by every portfmt crate.
//!
//! This crate has no knowledge of Makefile syntax. It only provides the
//! vocabulary the rest of the workspace builds on: line ranges, a closed
//! error type, string interning, and an arena for mutable domain handles.

mod arena;
mod error;
mod intern;
mod span;

pub use arena::{Arena, Id};
pub use error::{Error, Result};
pub use intern::{Interner, Symbol, SymbolEq};
pub use span::LineRange;
