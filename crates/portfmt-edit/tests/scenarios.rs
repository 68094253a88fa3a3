//! Integration tests covering the concrete edit-pipeline scenarios and
//! the dedup/merge/bump universal invariants.

use portfmt_core::{emit, OutputMode, Parser, Settings};
use portfmt_edit::{bump_revision, merge, pipeline, BumpTarget, MergeBehavior, PipelineOptions};

fn run_mandatory(text: &str) -> Parser {
    let mut parser = Parser::parse(text).unwrap();
    pipeline::run_mandatory_passes(&mut parser, &PipelineOptions::default()).unwrap();
    parser
}

fn reformat(parser: &Parser) -> String {
    emit(parser, OutputMode::Reformat, &Settings::default()).unwrap()
}

#[test]
fn dedup_shadows_uses_values_sharing_a_colon_prefixed_key() {
    let parser = run_mandatory("USES=\tpython compiler:c++11-lang compiler:c++14-lang\n");
    assert_eq!(reformat(&parser), "USES=\tpython compiler:c++11-lang\n");
}

#[test]
fn collapse_adjacent_merges_append_into_one_value_list() {
    let parser = run_mandatory("PORTNAME=foo\nPORTNAME+=bar\n");
    let (id, _) = parser.find_variable("PORTNAME").unwrap();
    assert_eq!(parser.variable_values(id), vec!["foo", "bar"]);
    assert_eq!(parser.enumerate_variables().len(), 1);
}

#[test]
fn dedup_collapses_repeated_plain_value() {
    let parser = run_mandatory("LICENSE=BSD3CLAUSE BSD3CLAUSE\n");
    assert_eq!(reformat(&parser), "LICENSE=\tBSD3CLAUSE\n");
}

#[test]
fn value_comment_between_two_blocks_prevents_collapse() {
    let parser = run_mandatory("PORTNAME=foo # anchor\nPORTNAME+=bar\n");
    assert_eq!(parser.enumerate_variables().len(), 2);
}

#[test]
fn sanitize_append_rewrites_only_the_first_pre_framework_occurrence() {
    let parser = run_mandatory("A+=x\nA+=y\n");
    let names: Vec<_> = parser.enumerate_variables().into_iter().map(|(id, _)| parser.variable_modifier(id)).collect();
    assert_eq!(names[0], portfmt_core::Modifier::Assign);
    assert_eq!(names[1], portfmt_core::Modifier::Append);
}

#[test]
fn bump_revision_preserves_trailing_comment() {
    let mut parser = Parser::parse("MASTERDIR=x\nPORTREVISION=2 # comment\n").unwrap();
    bump_revision(&mut parser, BumpTarget::PortRevision).unwrap();
    let (id, _) = parser.find_variable("PORTREVISION").unwrap();
    let values = parser.variable_values(id);
    assert_eq!(values[0], "3");
    assert_eq!(values.last(), Some(&"# comment"));
}

#[test]
fn bump_revision_inserts_one_in_canonical_block_when_absent() {
    let mut parser = Parser::parse("PORTNAME=foo\n").unwrap();
    bump_revision(&mut parser, BumpTarget::PortRevision).unwrap();
    pipeline::run_mandatory_passes(&mut parser, &PipelineOptions::default()).unwrap();
    let (id, _) = parser.find_variable("PORTREVISION").unwrap();
    assert_eq!(parser.variable_values(id), vec!["1"]);
}

#[test]
fn dedup_preserves_first_occurrence_order_for_non_skip_dedup_variables() {
    let parser = run_mandatory("DEPENDS=b a c a b\n");
    let (id, _) = parser.find_variable("DEPENDS").unwrap();
    assert_eq!(parser.variable_values(id), vec!["b", "a", "c"]);
}

#[test]
fn merging_a_parser_into_itself_is_neutral_on_reformat() {
    let text = "PORTNAME=foo\nPORTVERSION=1.0\n";
    let mut primary = Parser::parse(text).unwrap();
    let sub = Parser::parse(text).unwrap();
    let before = reformat(&primary);
    merge::merge(&mut primary, &sub, MergeBehavior::default()).unwrap();
    let after = reformat(&primary);
    assert_eq!(before, after);
}

#[test]
fn bump_revision_is_monotonic_over_repeated_application() {
    let mut parser = Parser::parse("MASTERDIR=x\n").unwrap();
    for expected in 1..=5 {
        bump_revision(&mut parser, BumpTarget::PortRevision).unwrap();
        let (id, _) = parser.find_variable("PORTREVISION").unwrap();
        assert_eq!(parser.variable_values(id)[0], expected.to_string());
    }
}
