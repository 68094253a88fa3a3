//! Ordered, instrumented application of the mandatory edit passes.
//!
//! Grounded on the teacher's documented pipeline-of-stages architecture: a
//! fixed `Vec` of named stages, each instrumented with a `tracing` span, run
//! strictly in order over the output of its predecessor.

use portfmt_base::Result;
use portfmt_core::{Parser, Token};
use tracing::{debug, info_span, warn};

use crate::passes;

/// One named transformation over the token sequence. Takes the parser (for
/// domain lookups and arena mutation through its `mark_*` methods) and the
/// current tokens, and returns the next sequence or a typed error.
pub type Pass = fn(&mut Parser, Vec<Token>, &PipelineOptions) -> Result<Vec<Token>>;

/// Options threaded through the mandatory passes that the settings bitset
/// (not the pipeline itself) controls.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// When set, `sanitize-eol-comments` is skipped: trailing comments stay
    /// inline rather than being hoisted above their variable.
    pub keep_eol_comments: bool,
}

/// The six mandatory passes, in the order spec'd: later passes assume
/// earlier ones already ran (e.g. `dedup-tokens` assumes
/// `sanitize-eol-comments` already hoisted non-decorative trailing
/// comments, so any inline comment it still sees is decorative and a safe
/// dedup-list terminator).
const MANDATORY_PASSES: &[(&str, Pass)] = &[
    ("sanitize-comments", passes::sanitize_comments),
    ("sanitize-eol-comments", passes::sanitize_eol_comments),
    ("collapse-adjacent-variables", passes::collapse_adjacent_variables),
    ("sanitize-append-modifier", passes::sanitize_append_modifier),
    ("dedup-tokens", passes::dedup_tokens),
    ("remove-consecutive-empty-lines", passes::remove_consecutive_empty_lines),
];

/// Runs every mandatory pass over `parser`'s token sequence, in order,
/// compacting deleted tokens at each pass boundary. Stops at the first
/// pass that returns an error, leaving the parser's tokens exactly as they
/// were before that pass ran (spec §7: "a pass that returns a typed error
/// leaves the token stream unchanged").
pub fn run_mandatory_passes(parser: &mut Parser, options: &PipelineOptions) -> Result<()> {
    for (name, pass) in MANDATORY_PASSES {
        let span = info_span!("edit_pass", pass = *name);
        let _enter = span.enter();
        let before = parser.tokens().to_vec();
        match pass(parser, before.clone(), options) {
            Ok(tokens) => {
                parser.set_tokens(tokens);
                parser.compact();
                debug!(pass = *name, "pass committed");
            }
            Err(err) => {
                warn!(pass = *name, error = %err, "pass failed, leaving tokens unchanged");
                parser.set_tokens(before);
                return Err(err);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mandatory_passes_run_in_spec_order() {
        let names: Vec<&str> = MANDATORY_PASSES.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec![
                "sanitize-comments",
                "sanitize-eol-comments",
                "collapse-adjacent-variables",
                "sanitize-append-modifier",
                "dedup-tokens",
                "remove-consecutive-empty-lines",
            ]
        );
    }

    #[test]
    fn run_mandatory_passes_is_idempotent() {
        let mut parser = Parser::parse("USES=\tpython python\nPORTNAME=foo\nPORTNAME+=bar\n").unwrap();
        run_mandatory_passes(&mut parser, &PipelineOptions::default()).unwrap();
        let once = parser.tokens().to_vec();
        run_mandatory_passes(&mut parser, &PipelineOptions::default()).unwrap();
        let twice = parser.tokens().to_vec();
        assert_eq!(once.len(), twice.len());
    }
}
