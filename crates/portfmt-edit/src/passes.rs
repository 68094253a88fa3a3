//! The six mandatory edit passes (spec §4.3), run in order by
//! [`crate::pipeline::run_mandatory_passes`].

use std::collections::HashSet;

use portfmt_base::{Result, Symbol};
use portfmt_core::{DomainHandle, Modifier, Parser, Token, TokenKind};

use crate::pipeline::PipelineOptions;

/// Inside target bodies, strips trailing whitespace from comment tokens and
/// marks them edited.
pub fn sanitize_comments(
    _parser: &mut Parser,
    mut tokens: Vec<Token>,
    _opts: &PipelineOptions,
) -> Result<Vec<Token>> {
    let mut depth = 0usize;
    for token in tokens.iter_mut() {
        match token.kind {
            TokenKind::TargetStart => depth += 1,
            TokenKind::TargetEnd => depth = depth.saturating_sub(1),
            TokenKind::Comment if depth > 0 => {
                if let Some(payload) = &token.payload {
                    let trimmed = payload.trim_end();
                    if trimmed.len() != payload.len() {
                        let trimmed = trimmed.to_string();
                        token.payload = Some(trimmed);
                        token.mark_edited();
                    }
                }
            }
            _ => {}
        }
    }
    Ok(tokens)
}

fn is_decorative_comment(payload: &str) -> bool {
    matches!(payload.trim(), "#" | "# empty" | "# none" | "#none")
}

/// Hoists a non-decorative end-of-line comment on a variable's value list
/// above the assignment, as its own comment line, so value sorting never
/// reorders it. Decorative comments (`#`, `# empty`, `# none`, `#none`)
/// are left inline.
pub fn sanitize_eol_comments(
    _parser: &mut Parser,
    tokens: Vec<Token>,
    opts: &PipelineOptions,
) -> Result<Vec<Token>> {
    if opts.keep_eol_comments {
        return Ok(tokens);
    }
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].kind != TokenKind::VariableStart {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        }
        let start = i;
        let mut end = start + 1;
        while tokens[end].kind == TokenKind::VariableToken {
            end += 1;
        }
        // tokens[end] is the VariableEnd.
        let comment_idx = if end > start + 1 {
            let last_value = end - 1;
            match tokens[last_value].payload.as_deref() {
                Some(payload) if payload.starts_with('#') && !is_decorative_comment(payload) => {
                    Some(last_value)
                }
                _ => None,
            }
        } else {
            None
        };
        if let Some(idx) = comment_idx {
            let mut hoisted = Token::new(TokenKind::Comment, tokens[idx].range);
            hoisted.payload = tokens[idx].payload.clone();
            // Distinguishes a hoisted anchor from an ordinary freestanding
            // comment line, so collapse-adjacent-variables knows not to
            // merge the variable it now precedes into its successor.
            hoisted.mark_edited();
            out.push(hoisted);
            for (offset, token) in tokens[start..=end].iter().enumerate() {
                if start + offset == idx {
                    continue;
                }
                out.push(token.clone());
            }
        } else {
            out.extend(tokens[start..=end].iter().cloned());
        }
        i = end + 1;
    }
    Ok(out)
}

fn variable_name(parser: &Parser, token: &Token) -> Option<Symbol> {
    match token.handle {
        Some(DomainHandle::Variable(id)) => Some(parser.variables().get(id).name),
        _ => None,
    }
}

fn variable_block_bounds(tokens: &[Token], start: usize) -> usize {
    let mut j = start + 1;
    while tokens[j].kind == TokenKind::VariableToken {
        j += 1;
    }
    j
}

/// Collapses two successive assignments to the same variable, when both
/// modifiers are drawn from `{=, +=, ?=}`, into one block: the first
/// `VariableStart` and the last `VariableEnd` survive, with every value
/// token concatenated between them. `!=` and `:=` never collapse (they are
/// side-effecting). Two blocks separated by a hoisted anchor comment (see
/// `sanitize_eol_comments`) are left alone even though they remain
/// token-adjacent, since merging would misattribute the comment to the
/// combined value list. A run of `+=` blocks with no real assignment for
/// that name anywhere before it is also left alone: `sanitize_append_modifier`
/// promotes only the first such occurrence to `=`, so every occurrence must
/// still be addressable as its own block when that pass runs next.
pub fn collapse_adjacent_variables(
    parser: &mut Parser,
    tokens: Vec<Token>,
    _opts: &PipelineOptions,
) -> Result<Vec<Token>> {
    let modifier_of = |token: &Token| -> Option<Modifier> {
        match token.handle {
            Some(DomainHandle::Variable(id)) => Some(parser.variable_modifier(id)),
            _ => None,
        }
    };
    let collapsible = |token: &Token| -> bool {
        matches!(modifier_of(token), Some(Modifier::Assign | Modifier::Append | Modifier::Optional))
    };

    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut assigned_before: HashSet<Symbol> = HashSet::new();
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].kind != TokenKind::VariableStart {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        }
        let name = variable_name(parser, &tokens[i]);
        let end = variable_block_bounds(&tokens, i);
        let start_token = tokens[i].clone();
        let mut values: Vec<Token> = tokens[i + 1..end].to_vec();
        let mut last_end_token = tokens[end].clone();

        let modifier = modifier_of(&tokens[i]);
        let starts_bare_append_chain = modifier == Some(Modifier::Append)
            && !name.map(|n| assigned_before.contains(&n)).unwrap_or(false);
        let preceded_by_hoisted_anchor =
            i > 0 && tokens[i - 1].kind == TokenKind::Comment && tokens[i - 1].edited;

        if collapsible(&tokens[i]) && !starts_bare_append_chain && !preceded_by_hoisted_anchor {
            let mut next = end + 1;
            while next < tokens.len()
                && tokens[next].kind == TokenKind::VariableStart
                && variable_name(parser, &tokens[next]) == name
                && collapsible(&tokens[next])
            {
                let next_end = variable_block_bounds(&tokens, next);
                values.extend(tokens[next + 1..next_end].iter().cloned());
                last_end_token = tokens[next_end].clone();
                next = next_end + 1;
            }
            i = next;
        } else {
            i = end + 1;
        }

        if let (Some(n), Some(Modifier::Assign | Modifier::Optional)) = (name, modifier) {
            assigned_before.insert(n);
        }

        out.push(start_token);
        out.extend(values);
        out.push(last_end_token);
    }
    Ok(out)
}

const FLAG_FAMILY: &[&str] = &["CFLAGS", "CXXFLAGS", "LDFLAGS", "RUSTFLAGS"];

fn is_framework_include(payload: &str) -> bool {
    payload.contains("bsd.port") && payload.contains(".mk")
}

/// Before the port framework inclusion, the first occurrence of a variable
/// owns its modifier: if that first occurrence is `+=` and there was no
/// earlier `=` for the same name, it is rewritten to `=`. The flag-family
/// variables (`CFLAGS`, `CXXFLAGS`, `LDFLAGS`, `RUSTFLAGS`) are exempt,
/// since appending to inherited build flags is meaningful even on first
/// occurrence.
pub fn sanitize_append_modifier(
    parser: &mut Parser,
    mut tokens: Vec<Token>,
    _opts: &PipelineOptions,
) -> Result<Vec<Token>> {
    let mut seen: HashSet<Symbol> = HashSet::new();
    let mut before_framework = true;
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].kind == TokenKind::ConditionalToken {
            if let Some(payload) = &tokens[i].payload {
                if is_framework_include(payload) {
                    before_framework = false;
                }
            }
        }
        if tokens[i].kind == TokenKind::VariableStart {
            if let Some(DomainHandle::Variable(id)) = tokens[i].handle {
                let name_sym = parser.variables().get(id).name;
                let name = parser.interner().resolve(name_sym).to_string();
                let modifier = parser.variable_modifier(id);
                let first_occurrence = seen.insert(name_sym);
                if before_framework
                    && first_occurrence
                    && modifier == Modifier::Append
                    && !FLAG_FAMILY.contains(&name.as_str())
                {
                    parser.variables_mut().get_mut(id).modifier = Modifier::Assign;
                    parser.mark_variable_edited(id);
                    tokens[i].mark_edited();
                }
            }
        }
        i += 1;
    }
    Ok(tokens)
}

fn is_uses_family(name: &str) -> bool {
    if name == "USES" {
        return true;
    }
    portfmt_rules::is_options_helper(name)
        .map(|h| {
            matches!(
                h.helper,
                portfmt_rules::OptionsHelperKind::Uses | portfmt_rules::OptionsHelperKind::UsesOff
            )
        })
        .unwrap_or(false)
}

/// Within one variable's value list, removes duplicate values, preserving
/// the order of first occurrence. `USES` (and its options-helper cousins)
/// dedups on the text before the first `:`, so `compiler:c++11-lang`
/// shadows a later `compiler:c++14-lang`. Variables covered by
/// `skip_dedup` are left untouched; once a value-comment is reached the
/// remainder of the list is kept verbatim.
pub fn dedup_tokens(
    parser: &mut Parser,
    tokens: Vec<Token>,
    _opts: &PipelineOptions,
) -> Result<Vec<Token>> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].kind != TokenKind::VariableStart {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        }
        let Some(DomainHandle::Variable(id)) = tokens[i].handle else {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        };
        let name_sym = parser.variables().get(id).name;
        let name = parser.interner().resolve(name_sym).to_string();
        out.push(tokens[i].clone());
        i += 1;

        if portfmt_rules::skip_dedup(&name) {
            while tokens[i].kind == TokenKind::VariableToken {
                out.push(tokens[i].clone());
                i += 1;
            }
            out.push(tokens[i].clone());
            i += 1;
            continue;
        }

        let key_by_prefix = is_uses_family(&name);
        let mut seen_keys: HashSet<String> = HashSet::new();
        let mut hit_comment = false;
        let mut removed_any = false;
        while tokens[i].kind == TokenKind::VariableToken {
            let payload = tokens[i].payload.clone().unwrap_or_default();
            if !hit_comment && payload.starts_with('#') {
                hit_comment = true;
            }
            if hit_comment {
                out.push(tokens[i].clone());
                i += 1;
                continue;
            }
            let key = if key_by_prefix {
                payload.split_once(':').map(|(k, _)| k.to_string()).unwrap_or_else(|| payload.clone())
            } else {
                payload.clone()
            };
            if seen_keys.insert(key) {
                out.push(tokens[i].clone());
            } else {
                removed_any = true;
            }
            i += 1;
        }
        if removed_any {
            parser.mark_variable_edited(id);
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    Ok(out)
}

/// Collapses runs of more than one consecutive blank comment token down to
/// one.
pub fn remove_consecutive_empty_lines(
    _parser: &mut Parser,
    tokens: Vec<Token>,
    _opts: &PipelineOptions,
) -> Result<Vec<Token>> {
    let is_blank =
        |t: &Token| t.kind == TokenKind::Comment && t.payload.as_deref().unwrap_or("").trim().is_empty();
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut prev_blank = false;
    for token in tokens {
        let blank = is_blank(&token);
        if blank && prev_blank {
            continue;
        }
        prev_blank = blank;
        out.push(token);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineOptions;

    fn run(pass: crate::pipeline::Pass, text: &str) -> (Parser, Vec<Token>) {
        let mut parser = Parser::parse(text).unwrap();
        let tokens = parser.tokens().to_vec();
        let out = pass(&mut parser, tokens, &PipelineOptions::default()).unwrap();
        (parser, out)
    }

    #[test]
    fn collapse_adjacent_merges_two_assignments() {
        let (_parser, tokens) = run(collapse_adjacent_variables, "PORTNAME=foo\nPORTNAME+=bar\n");
        let starts = tokens.iter().filter(|t| t.kind == TokenKind::VariableStart).count();
        assert_eq!(starts, 1);
        let values: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::VariableToken)
            .filter_map(|t| t.payload.as_deref())
            .collect();
        assert_eq!(values, vec!["foo", "bar"]);
    }

    #[test]
    fn collapse_adjacent_never_collapses_shell_or_expand() {
        let (_parser, tokens) = run(collapse_adjacent_variables, "A!=foo\nA+=bar\n");
        let starts = tokens.iter().filter(|t| t.kind == TokenKind::VariableStart).count();
        assert_eq!(starts, 2);
    }

    #[test]
    fn collapse_adjacent_leaves_a_bare_append_chain_unmerged() {
        let (_parser, tokens) = run(collapse_adjacent_variables, "A+=x\nA+=y\n");
        let starts = tokens.iter().filter(|t| t.kind == TokenKind::VariableStart).count();
        assert_eq!(starts, 2);
    }

    #[test]
    fn collapse_adjacent_refuses_to_merge_across_a_hoisted_anchor() {
        let (mut parser, tokens) =
            run(sanitize_eol_comments, "PORTNAME=foo # anchor\nPORTNAME+=bar\n");
        let tokens = collapse_adjacent_variables(&mut parser, tokens, &PipelineOptions::default()).unwrap();
        let starts = tokens.iter().filter(|t| t.kind == TokenKind::VariableStart).count();
        assert_eq!(starts, 2);
    }

    #[test]
    fn dedup_removes_repeated_value() {
        let (_parser, tokens) = run(dedup_tokens, "LICENSE=BSD3CLAUSE BSD3CLAUSE\n");
        let values: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::VariableToken)
            .filter_map(|t| t.payload.as_deref())
            .collect();
        assert_eq!(values, vec!["BSD3CLAUSE"]);
    }

    #[test]
    fn dedup_uses_keys_on_prefix_before_colon() {
        let (_parser, tokens) =
            run(dedup_tokens, "USES= python compiler:c++11-lang compiler:c++14-lang\n");
        let values: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::VariableToken)
            .filter_map(|t| t.payload.as_deref())
            .collect();
        assert_eq!(values, vec!["python", "compiler:c++11-lang"]);
    }

    #[test]
    fn dedup_skips_variables_marked_skip_dedup() {
        let (_parser, tokens) = run(dedup_tokens, "GH_TUPLE=a a\n");
        let values: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::VariableToken)
            .filter_map(|t| t.payload.as_deref())
            .collect();
        assert_eq!(values, vec!["a", "a"]);
    }

    #[test]
    fn sanitize_append_rewrites_first_bare_append() {
        let (parser, tokens) = run(sanitize_append_modifier, "A+=x\nA+=y\n");
        let first_start = tokens.iter().find(|t| t.kind == TokenKind::VariableStart).unwrap();
        let Some(DomainHandle::Variable(id)) = first_start.handle else {
            panic!("expected variable handle")
        };
        assert_eq!(parser.variable_modifier(id), Modifier::Assign);
    }

    #[test]
    fn sanitize_append_exempts_flag_family() {
        let (parser, tokens) = run(sanitize_append_modifier, "CFLAGS+=x\n");
        let first_start = tokens.iter().find(|t| t.kind == TokenKind::VariableStart).unwrap();
        let Some(DomainHandle::Variable(id)) = first_start.handle else {
            panic!("expected variable handle")
        };
        assert_eq!(parser.variable_modifier(id), Modifier::Append);
    }

    #[test]
    fn sanitize_eol_comments_hoists_non_decorative_comment() {
        let (_parser, tokens) = run(sanitize_eol_comments, "PORTNAME=foo # a real comment\n");
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].payload.as_deref(), Some("# a real comment"));
    }

    #[test]
    fn sanitize_eol_comments_leaves_decorative_comment_inline() {
        let (_parser, tokens) = run(sanitize_eol_comments, "PORTNAME=foo #\n");
        assert_eq!(tokens[0].kind, TokenKind::VariableStart);
    }

    #[test]
    fn remove_consecutive_empty_lines_collapses_blanks() {
        let (_parser, tokens) = run(remove_consecutive_empty_lines, "\n\n\nPORTNAME=foo\n");
        let blanks = tokens
            .iter()
            .take_while(|t| t.kind == TokenKind::Comment)
            .count();
        assert_eq!(blanks, 1);
    }
}
