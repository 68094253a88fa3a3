//! The domain rule table for the port Makefile dialect.
//!
//! This crate has no dependency on the tokeniser or parser: every function
//! here is a pure lookup over a variable, target, or command-word name. The
//! core crate treats it as a read-only collaborator (see the `core`
//! crate's `Parser`, which borrows a [`table`] implementation for the
//! lifetime of a parse).

pub mod blocks;
pub mod table;

pub use blocks::Block;
pub use table::{
    compare_order, compare_tokens, ignore_wrap_col, indent_goalcol, is_comment, is_known_target,
    is_options_helper, is_special_target, leave_unformatted, leave_unsorted, print_as_newlines,
    skip_dedup, skip_goalcol, target_command_should_wrap, target_command_wrap_after_each_token,
    variable_order_block, OptionsHelper, OptionsHelperKind,
};
