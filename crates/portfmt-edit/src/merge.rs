//! The merge engine: composes a second, already-parsed token stream (the
//! sub-parser) into a primary parser, honouring assignment-modifier
//! semantics and searching for a canonical insertion point for variables
//! the primary does not yet have.

use std::cmp::Ordering;

use portfmt_base::{Error, LineRange, Result};
use portfmt_core::{Modifier, Parser, Token, TokenKind};

/// The recognised merge-behavior flags (spec §4.4).
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeBehavior {
    /// Treat a `!=` (shell-expand) variable in the sub-parser as a request
    /// to delete the matching primary variable, rather than skipping it.
    pub shell_is_delete: bool,
    /// Treat a `?=` variable in the sub-parser as an `=` for merge
    /// purposes, rather than skipping it.
    pub optional_like_assign: bool,
    /// Skip sub-parser variables that are nested inside a conditional.
    pub ignore_variables_in_conditionals: bool,
    /// Append after the *last* occurrence of a variable's group rather
    /// than the first.
    pub after_last_in_group: bool,
    /// Carry comment tokens adjacent to merged source variables along with
    /// them; otherwise they are dropped.
    pub comments: bool,
}

/// Merges every eligible variable from `sub` into `primary`, per variable:
/// skip, delete, insert, or merge into an existing occurrence. Each
/// rewrite marks its tokens edited so the emitter regenerates rather than
/// quotes original lines.
pub fn merge(primary: &mut Parser, sub: &Parser, behavior: MergeBehavior) -> Result<()> {
    for (sub_id, name) in sub.enumerate_variables() {
        if behavior.ignore_variables_in_conditionals {
            if let Some((_, idx)) = sub.find_variable(&name) {
                if sub.enclosing_conditional_depth(idx) > 0 {
                    continue;
                }
            }
        }

        let modifier = sub.variable_modifier(sub_id);
        let effective_modifier = match modifier {
            Modifier::Shell if !behavior.shell_is_delete => continue,
            Modifier::Optional if !behavior.optional_like_assign => continue,
            Modifier::Optional => Modifier::Assign,
            Modifier::Expand => Modifier::Assign,
            other => other,
        };

        let values: Vec<String> = sub.variable_values(sub_id).into_iter().map(str::to_string).collect();

        match primary.find_variable(&name) {
            None => {
                let (at, blank_line_before) = find_insertion_index(primary, &name);
                let insert_at = if blank_line_before {
                    let range = LineRange::single(primary.raw().len() + 1);
                    primary.tokens_mut().insert(at, Token::new(TokenKind::Comment, range).with_payload(""));
                    at + 1
                } else {
                    at
                };
                primary.insert_variable(insert_at, &name, effective_modifier, values);
            }
            Some((primary_id, _)) => {
                if behavior.optional_like_assign && has_ambiguous_optional_assign(primary, &name) {
                    return Err(Error::InvalidArgument {
                        message: format!(
                            "{name} has both '=' and '?=' assignments in the primary file; refusing to guess which one merge should treat as canonical"
                        ),
                    });
                }
                match effective_modifier {
                    Modifier::Shell => {
                        for (id, n) in primary.enumerate_variables() {
                            if n == name {
                                primary.mark_variable_deleted(id);
                            }
                        }
                    }
                    Modifier::Append => {
                        let target_id = if behavior.after_last_in_group {
                            primary
                                .enumerate_variables()
                                .into_iter()
                                .filter(|(_, n)| *n == name)
                                .last()
                                .map(|(id, _)| id)
                        } else {
                            Some(primary_id)
                        };
                        if let Some(target_id) = target_id {
                            let mut existing: Vec<String> =
                                primary.variable_values(target_id).into_iter().map(str::to_string).collect();
                            existing.extend(values);
                            primary.replace_variable_values(target_id, existing);
                        }
                    }
                    _ => {
                        primary.replace_variable_values(primary_id, values);
                    }
                }
            }
        }
    }
    Ok(())
}

fn has_ambiguous_optional_assign(primary: &Parser, name: &str) -> bool {
    let mut saw_assign = false;
    let mut saw_optional = false;
    for (id, n) in primary.enumerate_variables() {
        if n != name {
            continue;
        }
        match primary.variable_modifier(id) {
            Modifier::Assign => saw_assign = true,
            Modifier::Optional => saw_optional = true,
            _ => {}
        }
    }
    saw_assign && saw_optional
}

/// Finds the token index to insert a new variable named `name` at, and
/// whether a blank comment line must precede it (spec §4.4 step 3).
///
/// Search order: the last primary variable in the same canonical block
/// that sorts before `name`; failing that, the last primary variable
/// anywhere that sorts before `name` (prefixing a blank line if its block
/// differs); failing that, the top of the file, after any leading-comment
/// preamble.
pub fn find_insertion_index(primary: &Parser, name: &str) -> (usize, bool) {
    let (block, _) = portfmt_rules::variable_order_block(name);
    let vars = primary.enumerate_variables();

    let mut same_block_end: Option<usize> = None;
    for (id, vname) in &vars {
        let (vblock, _) = portfmt_rules::variable_order_block(vname);
        if vblock == block && portfmt_rules::compare_order(vname, name) == Ordering::Less {
            if let Some((_, end)) = primary.variable_token_range(*id) {
                same_block_end = Some(end);
            }
        }
    }
    if let Some(end) = same_block_end {
        return (end + 1, false);
    }

    let mut global_end: Option<(usize, portfmt_rules::Block)> = None;
    for (id, vname) in &vars {
        let (vblock, _) = portfmt_rules::variable_order_block(vname);
        if portfmt_rules::compare_order(vname, name) == Ordering::Less {
            if let Some((_, end)) = primary.variable_token_range(*id) {
                global_end = Some((end, vblock));
            }
        }
    }
    if let Some((end, prev_block)) = global_end {
        return (end + 1, prev_block != block);
    }

    let tokens = primary.tokens();
    let mut idx = 0;
    while idx < tokens.len() && tokens[idx].kind == TokenKind::Comment {
        idx += 1;
    }
    (idx, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_new_variable_into_empty_file() {
        let mut primary = Parser::parse("").unwrap();
        let sub = Parser::parse("PORTNAME=foo\n").unwrap();
        merge(&mut primary, &sub, MergeBehavior::default()).unwrap();
        let (id, _) = primary.find_variable("PORTNAME").unwrap();
        assert_eq!(primary.variable_values(id), vec!["foo"]);
    }

    #[test]
    fn insert_orders_after_same_block_peer() {
        let mut primary = Parser::parse("PORTNAME=foo\n").unwrap();
        let sub = Parser::parse("PORTVERSION=1.0\n").unwrap();
        merge(&mut primary, &sub, MergeBehavior::default()).unwrap();
        let names: Vec<String> = primary.enumerate_variables().into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["PORTNAME".to_string(), "PORTVERSION".to_string()]);
    }

    #[test]
    fn assign_replaces_existing_values() {
        let mut primary = Parser::parse("PORTVERSION=1.0\n").unwrap();
        let sub = Parser::parse("PORTVERSION=2.0\n").unwrap();
        merge(&mut primary, &sub, MergeBehavior::default()).unwrap();
        let (id, _) = primary.find_variable("PORTVERSION").unwrap();
        assert_eq!(primary.variable_values(id), vec!["2.0"]);
    }

    #[test]
    fn append_adds_to_first_occurrence_by_default() {
        let mut primary = Parser::parse("USES=python\n").unwrap();
        let sub = Parser::parse("USES+=ssl\n").unwrap();
        merge(&mut primary, &sub, MergeBehavior::default()).unwrap();
        let (id, _) = primary.find_variable("USES").unwrap();
        assert_eq!(primary.variable_values(id), vec!["python", "ssl"]);
    }

    #[test]
    fn shell_is_skipped_unless_behavior_enables_it() {
        let mut primary = Parser::parse("PORTNAME=foo\n").unwrap();
        let sub = Parser::parse("PORTNAME!=echo bar\n").unwrap();
        merge(&mut primary, &sub, MergeBehavior::default()).unwrap();
        let (id, _) = primary.find_variable("PORTNAME").unwrap();
        assert_eq!(primary.variable_values(id), vec!["foo"]);
    }

    #[test]
    fn shell_is_delete_marks_variable_deleted() {
        let mut primary = Parser::parse("PORTNAME=foo\n").unwrap();
        let sub = Parser::parse("PORTNAME!=echo bar\n").unwrap();
        let behavior = MergeBehavior {
            shell_is_delete: true,
            ..MergeBehavior::default()
        };
        merge(&mut primary, &sub, behavior).unwrap();
        primary.compact();
        assert!(primary.find_variable("PORTNAME").is_none());
    }

    #[test]
    fn optional_skipped_by_default() {
        let mut primary = Parser::parse("").unwrap();
        let sub = Parser::parse("PORTNAME?=foo\n").unwrap();
        merge(&mut primary, &sub, MergeBehavior::default()).unwrap();
        assert!(primary.find_variable("PORTNAME").is_none());
    }

    #[test]
    fn ambiguous_optional_assign_in_primary_refuses() {
        let mut primary = Parser::parse("PORTNAME=foo\nPORTNAME?=bar\n").unwrap();
        let sub = Parser::parse("PORTNAME?=baz\n").unwrap();
        let behavior = MergeBehavior {
            optional_like_assign: true,
            ..MergeBehavior::default()
        };
        let err = merge(&mut primary, &sub, behavior).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }
}
