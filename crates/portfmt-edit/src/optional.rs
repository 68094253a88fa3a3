//! Optional passes: invoked by callers on demand rather than run
//! unconditionally by [`crate::pipeline::run_mandatory_passes`].

use portfmt_base::{Error, LineRange, Result};
use portfmt_core::{Modifier, Parser};
use regex::Regex;

/// The two variables [`bump_revision`] knows how to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpTarget {
    PortRevision,
    PortEpoch,
}

impl BumpTarget {
    fn name(self) -> &'static str {
        match self {
            BumpTarget::PortRevision => "PORTREVISION",
            BumpTarget::PortEpoch => "PORTEPOCH",
        }
    }
}

fn parse_int(value: &str, range: LineRange) -> Result<i64> {
    value.trim().parse::<i64>().map_err(|_| Error::ExpectedInt {
        value: value.to_string(),
        range,
    })
}

/// Increments `varname` (or inserts it at 1 if absent), preserving any
/// trailing comment. For a non-slave port (no `MASTERDIR`), the existing
/// assignment is deleted first so a later merge pass can re-place it
/// canonically. Bumping `PORTEPOCH` also zeroes `PORTREVISION` as a side
/// effect.
pub fn bump_revision(parser: &mut Parser, target: BumpTarget) -> Result<()> {
    let is_slave_port = parser.find_variable("MASTERDIR").is_some();
    bump_one(parser, target.name(), is_slave_port)?;
    if target == BumpTarget::PortEpoch {
        zero_or_delete(parser, "PORTREVISION", is_slave_port)?;
    }
    Ok(())
}

fn bump_one(parser: &mut Parser, name: &str, is_slave_port: bool) -> Result<()> {
    match parser.find_variable(name) {
        None => {
            parser.insert_variable(parser.tokens().len(), name, Modifier::Assign, vec!["1".to_string()]);
        }
        Some((id, _)) => {
            let range = LineRange::single(id_line(parser, id));
            let current = parser
                .variable_values(id)
                .into_iter()
                .find(|v| !v.starts_with('#'))
                .unwrap_or("0")
                .to_string();
            let next = parse_int(&current, range)? + 1;
            if is_slave_port {
                let mut values = parser.variable_values(id).into_iter().map(str::to_string).collect::<Vec<_>>();
                if let Some(first) = values.first_mut() {
                    *first = next.to_string();
                } else {
                    values.push(next.to_string());
                }
                parser.replace_variable_values(id, values);
            } else {
                parser.mark_variable_deleted(id);
                parser.compact();
                parser.insert_variable(parser.tokens().len(), name, Modifier::Assign, vec![next.to_string()]);
            }
        }
    }
    Ok(())
}

fn id_line(parser: &Parser, id: portfmt_base::Id<portfmt_core::VariableHandle>) -> usize {
    parser
        .variable_token_range(id)
        .map(|(start, _)| parser.tokens()[start].range.start)
        .unwrap_or(1)
}

/// Sets `PORTREVISION` to zero (assign) if it currently carries the
/// `Optional` modifier, otherwise deletes it outright (`Shell`-style
/// removal performed by the merge engine's `SHELL_IS_DELETE` convention is
/// not available here, so we delete directly).
fn zero_or_delete(parser: &mut Parser, name: &str, is_slave_port: bool) -> Result<()> {
    match parser.find_variable(name) {
        None => {}
        Some((id, _)) => {
            if parser.variable_modifier(id) == Modifier::Optional {
                parser.replace_variable_values(id, vec!["0".to_string()]);
            } else if !is_slave_port {
                parser.mark_variable_deleted(id);
                parser.compact();
            }
        }
    }
    Ok(())
}

/// Writes `newver` to `DISTVERSION` (if present) or `PORTVERSION`
/// otherwise, and zeroes any existing `PORTREVISION` / `PORTEPOCH`.
pub fn set_version(parser: &mut Parser, newver: &str) -> Result<()> {
    let target_name = if parser.find_variable("DISTVERSION").is_some() {
        "DISTVERSION"
    } else {
        "PORTVERSION"
    };
    match parser.find_variable(target_name) {
        Some((id, _)) => parser.replace_variable_values(id, vec![newver.to_string()]),
        None => {
            parser.insert_variable(parser.tokens().len(), target_name, Modifier::Assign, vec![newver.to_string()]);
        }
    }
    for zeroed in ["PORTREVISION", "PORTEPOCH"] {
        if let Some((id, _)) = parser.find_variable(zeroed) {
            parser.replace_variable_values(id, vec!["0".to_string()]);
        }
    }
    Ok(())
}

/// Emits the raw value tokens of every variable whose name matches
/// `name_pattern`, one value per line, in declaration order.
pub fn output_variable_value(parser: &Parser, name_pattern: &str) -> Result<String> {
    let re = Regex::new(name_pattern).map_err(|e| Error::InvalidRegexp { message: e.to_string() })?;
    let mut out = String::new();
    for (id, name) in parser.enumerate_variables() {
        if !re.is_match(&name) {
            continue;
        }
        for value in parser.variable_values(id) {
            if value.starts_with('#') {
                continue;
            }
            out.push_str(value);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Emits every assigned variable whose `variable_order_block` is
/// `Unknown`, plus any variable name implied by a `_VARS` /
/// `_VARS_OFF` options-helper's values (`OPT_VARS=NAME=value` implies
/// `NAME`).
pub fn output_unknown_variables(parser: &Parser) -> Vec<String> {
    let mut names = Vec::new();
    for (id, name) in parser.enumerate_variables() {
        let (block, _) = portfmt_rules::variable_order_block(&name);
        if block == portfmt_rules::Block::Unknown {
            names.push(name.clone());
        }
        if let Some(helper) = portfmt_rules::is_options_helper(&name) {
            if matches!(helper.helper, portfmt_rules::OptionsHelperKind::Vars | portfmt_rules::OptionsHelperKind::VarsOff) {
                for value in parser.variable_values(id) {
                    if let Some((implied, _)) = value.split_once('=') {
                        names.push(implied.to_string());
                    }
                }
            }
        }
    }
    names.sort();
    names.dedup();
    names
}

/// The overall status `lint_order` / `lint_clones` return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintStatus {
    Ok,
    DiffsFound,
}

/// Computes the diff between the file's variable ordering and the
/// canonical ordering (block-first, then declaration position within
/// block), along with the same for declared targets. Returns a
/// human-readable report; colour is suppressed when `no_color` is set.
pub fn lint_order(parser: &Parser, no_color: bool) -> (LintStatus, String) {
    let vars = parser.enumerate_variables();
    let mut canonical: Vec<(usize, String)> = vars.iter().map(|(_, n)| n.clone()).enumerate().collect();
    canonical.sort_by(|(ia, a), (ib, b)| {
        portfmt_rules::compare_order(a, b).then_with(|| ia.cmp(ib))
    });
    let actual: Vec<String> = vars.iter().map(|(_, n)| n.clone()).collect();
    let canonical_names: Vec<String> = canonical.into_iter().map(|(_, n)| n).collect();

    if actual == canonical_names {
        return (LintStatus::Ok, String::new());
    }

    let mut report = String::new();
    for (actual_name, canonical_name) in actual.iter().zip(canonical_names.iter()) {
        if actual_name == canonical_name {
            continue;
        }
        if no_color {
            report.push_str(&format!("{actual_name} should come after/before {canonical_name}\n"));
        } else {
            report.push_str(&format!("\x1b[33m{actual_name}\x1b[0m should sort near \x1b[36m{canonical_name}\x1b[0m\n"));
        }
    }
    (LintStatus::DiffsFound, report)
}

/// Reports every variable name with more than one `VariableStart` in the
/// token stream (duplicate declarations, not dedup'able append chains).
pub fn lint_clones(parser: &Parser) -> Vec<String> {
    use std::collections::HashMap;
    let mut counts: HashMap<String, usize> = HashMap::new();
    for (_, name) in parser.enumerate_variables() {
        *counts.entry(name).or_insert(0) += 1;
    }
    let mut clones: Vec<String> = counts.into_iter().filter(|(_, n)| *n > 1).map(|(name, _)| name).collect();
    clones.sort();
    clones
}

/// Emits a Kakoune `select` command for the variable or target block
/// containing `line` (1-based), or `None` if no block covers it.
pub fn kakoune_select_object_on_line(parser: &Parser, line: usize) -> Option<String> {
    let tokens = parser.tokens();
    for (id, _) in parser.enumerate_variables() {
        if let Some((start, end)) = parser.variable_token_range(id) {
            let first = tokens[start].range.start;
            let last = tokens[end - 1].range.end;
            if (first..last).contains(&line) {
                return Some(format!("select {first}.1,{last}.1"));
            }
        }
    }
    for (id, _) in parser.enumerate_targets() {
        if let Some((start, end)) = parser.target_token_range(id) {
            let first = tokens[start].range.start;
            let last = tokens[end].range.end;
            if (first..last).contains(&line) {
                return Some(format!("select {first}.1,{last}.1"));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_revision_increments_preserving_comment() {
        let mut parser = Parser::parse("MASTERDIR=foo\nPORTREVISION=2 # comment\n").unwrap();
        bump_revision(&mut parser, BumpTarget::PortRevision).unwrap();
        let (id, _) = parser.find_variable("PORTREVISION").unwrap();
        let values = parser.variable_values(id);
        assert_eq!(values[0], "3");
        assert_eq!(values.last(), Some(&"# comment"));
    }

    #[test]
    fn bump_revision_inserts_one_when_absent() {
        let mut parser = Parser::parse("PORTNAME=foo\n").unwrap();
        bump_revision(&mut parser, BumpTarget::PortRevision).unwrap();
        let (id, _) = parser.find_variable("PORTREVISION").unwrap();
        assert_eq!(parser.variable_values(id), vec!["1"]);
    }

    #[test]
    fn bump_revision_non_integer_value_errors() {
        let mut parser = Parser::parse("MASTERDIR=foo\nPORTREVISION=notanumber\n").unwrap();
        let err = bump_revision(&mut parser, BumpTarget::PortRevision).unwrap_err();
        assert!(matches!(err, Error::ExpectedInt { .. }));
    }

    #[test]
    fn bump_revision_monotonicity_over_repeated_calls() {
        let mut parser = Parser::parse("MASTERDIR=foo\n").unwrap();
        for expected in 1..=3 {
            bump_revision(&mut parser, BumpTarget::PortRevision).unwrap();
            let (id, _) = parser.find_variable("PORTREVISION").unwrap();
            assert_eq!(parser.variable_values(id)[0], expected.to_string());
        }
    }

    #[test]
    fn bump_epoch_zeroes_optional_portrevision() {
        let mut parser = Parser::parse("MASTERDIR=foo\nPORTREVISION?=5\n").unwrap();
        bump_revision(&mut parser, BumpTarget::PortEpoch).unwrap();
        let (id, _) = parser.find_variable("PORTREVISION").unwrap();
        assert_eq!(parser.variable_values(id), vec!["0"]);
    }

    #[test]
    fn set_version_zeroes_revision_and_epoch() {
        let mut parser = Parser::parse("PORTVERSION=1.0\nPORTREVISION=4\n").unwrap();
        set_version(&mut parser, "2.0").unwrap();
        let (pv, _) = parser.find_variable("PORTVERSION").unwrap();
        assert_eq!(parser.variable_values(pv), vec!["2.0"]);
        let (pr, _) = parser.find_variable("PORTREVISION").unwrap();
        assert_eq!(parser.variable_values(pr), vec!["0"]);
    }

    #[test]
    fn output_variable_value_matches_by_regex() {
        let parser = Parser::parse("PORTNAME=foo\nPORTVERSION=1.0\n").unwrap();
        let out = output_variable_value(&parser, "^PORT(NAME|VERSION)$").unwrap();
        assert_eq!(out, "foo\n1.0\n");
    }

    #[test]
    fn output_unknown_variables_reports_unrecognised_names() {
        let parser = Parser::parse("TOTALLY_MADE_UP=xyz\n").unwrap();
        let unknown = output_unknown_variables(&parser);
        assert_eq!(unknown, vec!["TOTALLY_MADE_UP".to_string()]);
    }

    #[test]
    fn lint_order_ok_when_canonically_ordered() {
        let parser = Parser::parse("PORTNAME=foo\nPORTVERSION=1.0\n").unwrap();
        let (status, report) = lint_order(&parser, true);
        assert_eq!(status, LintStatus::Ok);
        assert!(report.is_empty());
    }

    #[test]
    fn lint_order_detects_out_of_order_variables() {
        let parser = Parser::parse("PORTVERSION=1.0\nPORTNAME=foo\n").unwrap();
        let (status, report) = lint_order(&parser, true);
        assert_eq!(status, LintStatus::DiffsFound);
        assert!(!report.is_empty());
    }

    #[test]
    fn lint_clones_reports_duplicate_declarations() {
        let parser = Parser::parse("PORTNAME=foo\nPORTNAME=bar\n").unwrap();
        let clones = lint_clones(&parser);
        assert_eq!(clones, vec!["PORTNAME".to_string()]);
    }
}
