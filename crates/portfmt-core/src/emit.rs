//! The emitter: renders a parsed, possibly-edited token sequence back to
//! text in one of four modes (spec §4.5).

use portfmt_base::{Error, Id, Result};

use crate::parser::Parser;
use crate::token::{DomainHandle, Token, TokenKind, VariableHandle};
use crate::wrap::{command_complexity, pad_to_column, wrap_command_words, wrap_values};

/// The four output modes the emitter supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Passes through original lines in range order; no alignment.
    Raw,
    /// The primary output mode: column-aligned, sorted, wrapped.
    Reformat,
    /// Unified diff between the raw buffer and one of the other modes.
    Diff,
    /// One line per token, for debugging and test oracles.
    Dump,
}

/// The recognised behavior flags (spec §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct Behavior {
    pub collapse_adjacent: bool,
    pub dedup_tokens: bool,
    pub format_target_commands: bool,
    /// When set, disables the `sanitize-eol-comments` pass so trailing
    /// comments stay inline instead of being hoisted to their own line.
    pub keep_eol_comments: bool,
    pub dump_tokens: bool,
    pub output_edited: bool,
    pub output_inplace: bool,
    pub output_no_color: bool,
    pub output_rawlines: bool,
    pub output_reformat: bool,
    pub sanitize_append: bool,
    pub unsorted_variables: bool,
    pub always_sort_variables: bool,
    pub diff_mode: bool,
}

/// The settings record controlling emission (spec §6).
#[derive(Debug, Clone)]
pub struct Settings {
    pub wrapcol: usize,
    pub target_command_format_wrapcol: usize,
    pub target_command_format_threshold: usize,
    pub diff_context: usize,
    pub filename: String,
    pub behavior: Behavior,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            wrapcol: 80,
            target_command_format_wrapcol: 65,
            target_command_format_threshold: 8,
            diff_context: 3,
            filename: "/dev/stdin".to_string(),
            behavior: Behavior {
                collapse_adjacent: true,
                dedup_tokens: true,
                format_target_commands: false,
                keep_eol_comments: false,
                output_reformat: true,
                ..Behavior::default()
            },
        }
    }
}

/// Renders `parser` according to `mode` and `settings`.
pub fn emit(parser: &Parser, mode: OutputMode, settings: &Settings) -> Result<String> {
    match mode {
        OutputMode::Raw => Ok(render_raw(parser)),
        OutputMode::Reformat => render_reformat(parser, settings),
        OutputMode::Dump => Ok(render_dump(parser)),
        OutputMode::Diff => render_diff(parser, settings),
    }
}

fn render_raw(parser: &Parser) -> String {
    let mut out = String::new();
    for (_, line) in parser.raw().iter() {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn render_dump(parser: &Parser) -> String {
    let mut out = String::new();
    for token in parser.tokens() {
        let name = domain_name(parser, token);
        let data = token.payload.as_deref().unwrap_or("");
        out.push_str(&format!(
            "{:<20} {:<8} {:<20} {}\n",
            token.kind.as_str(),
            token.range.to_string(),
            name,
            data
        ));
    }
    out
}

fn domain_name(parser: &Parser, token: &Token) -> String {
    match token.handle {
        Some(DomainHandle::Variable(id)) => parser
            .interner()
            .resolve(parser.variables().get(id).name)
            .to_string(),
        Some(DomainHandle::Target(id)) => parser
            .targets()
            .get(id)
            .names
            .iter()
            .map(|s| parser.interner().resolve(*s))
            .collect::<Vec<_>>()
            .join(" "),
        Some(DomainHandle::Conditional(_)) | None => String::new(),
    }
}

fn render_diff(parser: &Parser, settings: &Settings) -> Result<String> {
    let rendered = if settings.behavior.output_rawlines {
        render_raw(parser)
    } else {
        render_reformat(parser, settings)?
    };
    let original = render_raw(parser);
    let diff = similar::TextDiff::from_lines(&original, &rendered);
    let mut patch = String::new();
    patch.push_str(&format!("--- {}\n", settings.filename));
    patch.push_str(&format!("+++ {}\n", settings.filename));
    let mut any_changes = false;
    for group in diff.grouped_ops(settings.diff_context) {
        for op in &group {
            for change in diff.iter_changes(op) {
                any_changes = true;
                let sign = match change.tag() {
                    similar::ChangeTag::Delete => "-",
                    similar::ChangeTag::Insert => "+",
                    similar::ChangeTag::Equal => " ",
                };
                let colored = if settings.behavior.output_no_color {
                    format!("{sign}{change}")
                } else {
                    match change.tag() {
                        similar::ChangeTag::Delete => format!("\x1b[31m{sign}{change}\x1b[0m"),
                        similar::ChangeTag::Insert => format!("\x1b[32m{sign}{change}\x1b[0m"),
                        similar::ChangeTag::Equal => format!("{sign}{change}"),
                    }
                };
                patch.push_str(&colored);
            }
        }
    }
    if any_changes {
        return Err(Error::DifferencesFound);
    }
    Ok(patch)
}

fn render_reformat(parser: &Parser, settings: &Settings) -> Result<String> {
    if parser.is_category_makefile() {
        return Ok(render_category_makefile(parser));
    }

    let mut tokens: Vec<Token> = parser.tokens().to_vec();
    propagate_goalcol(&mut tokens, parser);

    let mut out = String::new();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i].kind {
            TokenKind::Comment => {
                out.push_str(tokens[i].payload.as_deref().unwrap_or(""));
                out.push('\n');
                i += 1;
            }
            TokenKind::VariableStart => {
                let (rendered, next) = render_variable(parser, &tokens, i, settings);
                out.push_str(&rendered);
                i = next;
            }
            TokenKind::TargetStart => {
                let (rendered, next) = render_target(parser, &tokens, i, settings);
                out.push_str(&rendered);
                i = next;
            }
            TokenKind::ConditionalStart => {
                let (rendered, next) = render_conditional(parser, &tokens, i);
                out.push_str(&rendered);
                i = next;
            }
            _ => i += 1,
        }
    }
    Ok(out)
}

fn render_category_makefile(parser: &Parser) -> String {
    let mut out = String::new();
    if let Some((id, _)) = parser.find_variable("COMMENT") {
        let values = parser.variable_values(id);
        out.push_str(&format!("COMMENT=\t{}\n\n", values.join(" ")));
    }
    let mut values: Vec<String> = parser
        .enumerate_variables()
        .into_iter()
        .filter(|(_, name)| name == "SUBDIR")
        .flat_map(|(id, _)| parser.variable_values(id).into_iter().map(str::to_string))
        .collect();
    values.sort();
    for value in values {
        out.push_str(&format!("SUBDIR +=\t{value}\n"));
    }
    out.push_str("\n.include <bsd.port.subdir.mk>\n");
    out
}

fn propagate_goalcol(tokens: &mut [Token], parser: &Parser) {
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].kind != TokenKind::VariableStart {
            i += 1;
            continue;
        }
        let run_start = i;
        let mut j = i;
        let mut var_ids: Vec<Id<VariableHandle>> = Vec::new();
        while j < tokens.len() {
            match tokens[j].kind {
                TokenKind::VariableStart => {
                    if let Some(DomainHandle::Variable(id)) = tokens[j].handle {
                        var_ids.push(id);
                    }
                    j += 1;
                }
                TokenKind::VariableToken | TokenKind::VariableEnd | TokenKind::Comment => j += 1,
                _ => break,
            }
        }
        let run_end = j;

        let mut max_indent = 0usize;
        for &id in &var_ids {
            let name = parser.interner().resolve(parser.variables().get(id).name);
            if !portfmt_rules::skip_goalcol(name) {
                max_indent = max_indent.max(portfmt_rules::indent_goalcol(name));
            }
        }

        for token in tokens[run_start..run_end].iter_mut() {
            if token.kind != TokenKind::VariableToken {
                continue;
            }
            if let Some(DomainHandle::Variable(id)) = token.handle {
                let name = parser.interner().resolve(parser.variables().get(id).name);
                token.goalcol = if portfmt_rules::skip_goalcol(name) {
                    portfmt_rules::indent_goalcol(name)
                } else {
                    max_indent
                };
            }
        }
        i = run_end;
    }
}

fn render_variable(
    parser: &Parser,
    tokens: &[Token],
    start: usize,
    settings: &Settings,
) -> (String, usize) {
    let id = match tokens[start].handle {
        Some(DomainHandle::Variable(id)) => id,
        _ => unreachable!("VariableStart always carries a variable handle"),
    };
    let name = parser.interner().resolve(parser.variables().get(id).name).to_string();
    let modifier = parser.variables().get(id).modifier;

    let mut values: Vec<String> = Vec::new();
    let mut trailing_comment: Option<String> = None;
    let mut goalcol = 16usize;
    let mut i = start + 1;
    while tokens[i].kind == TokenKind::VariableToken {
        let payload = tokens[i].payload.clone().unwrap_or_default();
        if payload.starts_with('#') {
            trailing_comment = Some(payload);
        } else {
            values.push(payload);
        }
        if tokens[i].goalcol > 0 {
            goalcol = tokens[i].goalcol;
        }
        i += 1;
    }
    debug_assert_eq!(tokens[i].kind, TokenKind::VariableEnd);
    let next = i + 1;

    let sort = if settings.behavior.unsorted_variables {
        false
    } else if settings.behavior.always_sort_variables {
        true
    } else {
        !portfmt_rules::leave_unsorted(&name)
    };
    if sort {
        values.sort_by(|a, b| portfmt_rules::compare_tokens(&name, a, b));
    }
    let values: Vec<String> = values.iter().map(|v| rewrite_opt_use_value(&name, v)).collect();

    let mut out = String::new();
    let header = format!("{name}{}", modifier.as_str());
    let pad = pad_to_column(&header, goalcol);
    out.push_str(&header);
    out.push_str(&pad);

    if portfmt_rules::leave_unformatted(&name) {
        out.push_str(&values.join(" "));
        if let Some(comment) = &trailing_comment {
            out.push(' ');
            out.push_str(comment);
        }
        out.push('\n');
        return (out, next);
    }

    let budget = settings.wrapcol.saturating_sub(goalcol).saturating_sub(2).max(1);
    let one_per_line = portfmt_rules::print_as_newlines(&name);
    let single_line = !one_per_line
        && (portfmt_rules::ignore_wrap_col(&name)
            || values.iter().map(|v| v.len() + 1).sum::<usize>() <= budget);

    if single_line {
        out.push_str(&values.join(" "));
        if let Some(comment) = &trailing_comment {
            out.push(' ');
            out.push_str(comment);
        }
        out.push('\n');
        return (out, next);
    }

    let lines = wrap_values(&values, budget, one_per_line);
    let indent = "\t".repeat((goalcol / 8).max(1));
    for (idx, line_values) in lines.iter().enumerate() {
        if idx > 0 {
            out.push_str(&indent);
        }
        out.push_str(&line_values.join(" "));
        if idx + 1 < lines.len() {
            out.push_str(" \\\n");
        }
    }
    if let Some(comment) = &trailing_comment {
        out.push(' ');
        out.push_str(comment);
    }
    out.push('\n');
    (out, next)
}

/// Sorts the comma list of `OPT_USE=VALUE,VALUE,…`-shaped values.
fn rewrite_opt_use_value(var: &str, value: &str) -> String {
    let is_use_family = portfmt_rules::is_options_helper(var)
        .map(|h| {
            matches!(
                h.helper,
                portfmt_rules::OptionsHelperKind::Use | portfmt_rules::OptionsHelperKind::UseOff
            )
        })
        .unwrap_or(false)
        || var == "USE_GITHUB";
    if !is_use_family {
        return value.to_string();
    }
    match value.split_once('=') {
        Some((prefix, suffix)) if prefix.chars().all(|c| c.is_ascii_uppercase() || c == '_') => {
            let mut parts: Vec<&str> = suffix.split(',').collect();
            parts.sort();
            format!("{prefix}={}", parts.join(","))
        }
        _ => value.to_string(),
    }
}

fn render_target(
    parser: &Parser,
    tokens: &[Token],
    start: usize,
    settings: &Settings,
) -> (String, usize) {
    let id = match tokens[start].handle {
        Some(DomainHandle::Target(id)) => id,
        _ => unreachable!("TargetStart always carries a target handle"),
    };
    let names: Vec<String> = parser
        .targets()
        .get(id)
        .names
        .iter()
        .map(|s| parser.interner().resolve(*s).to_string())
        .collect();
    let deps = tokens[start].payload.clone().unwrap_or_default();

    let mut out = format!("{}: {}\n", names.join(" "), deps.trim());
    let mut i = start + 1;
    while i < tokens.len() && tokens[i].kind != TokenKind::TargetEnd {
        if tokens[i].kind == TokenKind::TargetCommandStart {
            let (rendered, next) = render_target_command(tokens, i, settings);
            out.push_str(&rendered);
            i = next;
        } else {
            i += 1;
        }
    }
    let next = if i < tokens.len() { i + 1 } else { i };
    (out, next)
}

fn render_target_command(tokens: &[Token], start: usize, settings: &Settings) -> (String, usize) {
    let mut words: Vec<String> = Vec::new();
    let mut i = start + 1;
    while tokens[i].kind == TokenKind::TargetCommandToken {
        words.push(tokens[i].payload.clone().unwrap_or_default());
        i += 1;
    }
    debug_assert_eq!(tokens[i].kind, TokenKind::TargetCommandEnd);
    let next = i + 1;

    let full = words.join(" ");
    let edited = tokens[start].edited;
    let complexity = command_complexity(&full);
    if !settings.behavior.format_target_commands
        && complexity > settings.target_command_format_threshold
        && !edited
    {
        return (format!("\t{full}\n"), next);
    }

    let after_each = words
        .first()
        .map(|w| portfmt_rules::target_command_wrap_after_each_token(w))
        .unwrap_or(false);
    let segments = wrap_command_words(
        &words,
        settings.target_command_format_wrapcol,
        after_each,
        portfmt_rules::target_command_should_wrap,
    );

    let mut out = String::new();
    for (idx, seg) in segments.iter().enumerate() {
        out.push('\t');
        if idx > 0 {
            out.push('\t');
        }
        out.push_str(&seg.join(" "));
        if idx + 1 < segments.len() {
            out.push_str(" \\\n");
        }
    }
    out.push('\n');
    (out, next)
}

fn render_conditional(parser: &Parser, tokens: &[Token], start: usize) -> (String, usize) {
    let id = match tokens[start].handle {
        Some(DomainHandle::Conditional(id)) => id,
        _ => unreachable!("ConditionalStart always carries a conditional handle"),
    };
    let kind = parser.conditionals().get(id).kind;
    let mut words: Vec<String> = Vec::new();
    let mut i = start + 1;
    while tokens[i].kind == TokenKind::ConditionalToken {
        words.push(tokens[i].payload.clone().unwrap_or_default());
        i += 1;
    }
    debug_assert_eq!(tokens[i].kind, TokenKind::ConditionalEnd);
    let next = i + 1;

    let keyword = conditional_keyword(kind);
    let line = if words.is_empty() {
        format!("{keyword}\n")
    } else {
        format!("{keyword} {}\n", words.join(" "))
    };
    (line, next)
}

fn conditional_keyword(kind: crate::token::ConditionalType) -> &'static str {
    use crate::token::ConditionalType::*;
    match kind {
        If => ".if",
        Ifdef => ".ifdef",
        Ifmake => ".ifmake",
        Ifndef => ".ifndef",
        Ifnmake => ".ifnmake",
        Elif => ".elif",
        Elifdef => ".elifdef",
        Elifmake => ".elifmake",
        Elifndef => ".elifndef",
        Else => ".else",
        Endif => ".endif",
        For => ".for",
        Endfor => ".endfor",
        Include | IncludePosix => ".include",
        SInclude => ".sinclude",
        Undef => ".undef",
        Export => ".export",
        ExportEnv => ".export-env",
        ExportLiteral => ".export-literal",
        Unexport => ".unexport",
        UnexportEnv => ".unexport-env",
        Error => ".error",
        Warning => ".warning",
        Info => ".info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_mode_reproduces_input_line_for_line() {
        let text = "PORTNAME=foo\nPORTVERSION=1.0\n";
        let parser = Parser::parse(text).unwrap();
        let out = emit(&parser, OutputMode::Raw, &Settings::default()).unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn reformat_aligns_to_goalcol_sixteen() {
        let parser = Parser::parse("PORTNAME=foo\nPORTVERSION=1.0\n").unwrap();
        let out = emit(&parser, OutputMode::Reformat, &Settings::default()).unwrap();
        assert_eq!(out, "PORTNAME=\tfoo\nPORTVERSION=\t1.0\n");
    }

    #[test]
    fn reformat_dedupes_nothing_by_itself_but_sorts() {
        let parser = Parser::parse("LICENSE=MIT BSD3CLAUSE\n").unwrap();
        let out = emit(&parser, OutputMode::Reformat, &Settings::default()).unwrap();
        assert_eq!(out, "LICENSE=\tBSD3CLAUSE MIT\n");
    }

    #[test]
    fn dump_mode_emits_one_line_per_token() {
        let parser = Parser::parse("PORTNAME=foo\n").unwrap();
        let out = render_dump(&parser);
        assert_eq!(out.lines().count(), 3);
        assert!(out.lines().next().unwrap().starts_with("VARIABLE_START"));
    }

    #[test]
    fn diff_mode_reports_no_differences_for_unedited_rawlines_output() {
        let text = "PORTNAME=foo\n";
        let parser = Parser::parse(text).unwrap();
        let mut settings = Settings::default();
        settings.behavior.output_rawlines = true;
        let out = emit(&parser, OutputMode::Diff, &settings).unwrap();
        assert!(out.contains("---"));
    }

    #[test]
    fn diff_mode_errors_when_reformat_changes_text() {
        let text = "PORTNAME=foo\n";
        let parser = Parser::parse(text).unwrap();
        let settings = Settings::default();
        let err = emit(&parser, OutputMode::Diff, &settings).unwrap_err();
        assert_eq!(err, Error::DifferencesFound);
    }

    #[test]
    fn uses_keeps_first_occurrence_order_and_single_tab_goalcol() {
        let parser = Parser::parse("USES=\tpython compiler:c++11-lang\n").unwrap();
        let out = emit(&parser, OutputMode::Reformat, &Settings::default()).unwrap();
        assert_eq!(out, "USES=\tpython compiler:c++11-lang\n");
    }

    #[test]
    fn category_makefile_layout() {
        let text = "COMMENT=\tThings\nSUBDIR += zzz\nSUBDIR += aaa\n.include <bsd.port.subdir.mk>\n";
        let parser = Parser::parse(text).unwrap();
        let out = emit(&parser, OutputMode::Reformat, &Settings::default()).unwrap();
        assert!(out.starts_with("COMMENT=\tThings\n"));
        let aaa_pos = out.find("aaa").unwrap();
        let zzz_pos = out.find("zzz").unwrap();
        assert!(aaa_pos < zzz_pos);
    }
}
