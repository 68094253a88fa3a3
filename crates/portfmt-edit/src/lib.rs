//! The edit pipeline and merge engine: components E and F of the system.
//!
//! Operates on a [`portfmt_core::Parser`]'s token sequence after tokenising
//! and before emitting. [`pipeline::run_mandatory_passes`] always runs;
//! [`optional`] and [`merge`] are invoked by callers (the CLI, an editor
//! plugin) on demand.

pub mod merge;
pub mod optional;
pub mod passes;
pub mod pipeline;

pub use merge::{merge, MergeBehavior};
pub use optional::{
    bump_revision, kakoune_select_object_on_line, lint_clones, lint_order, output_unknown_variables,
    output_variable_value, set_version, BumpTarget, LintStatus,
};
pub use pipeline::{run_mandatory_passes, Pass, PipelineOptions};
