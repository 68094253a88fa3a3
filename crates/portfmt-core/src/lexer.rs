//! The tokeniser: a line-folding finite-state machine that turns raw text
//! into the token sequence, interning domain names as it goes.

use portfmt_base::{Arena, Id, Interner, LineRange};
use portfmt_base::{Error, Result};

use crate::buffer::RawLines;
use crate::token::{
    ConditionalHandle, ConditionalType, DomainHandle, Modifier, TargetHandle, Token, TokenKind,
    VariableHandle,
};
use crate::value::{tokenize_value, ESCAPED_BACKSLASH_SENTINEL};

struct FoldState {
    start_line: usize,
    buffer: String,
}

/// Converts raw source text into a token sequence. Call [`Tokenizer::feed`]
/// once per raw line, then [`Tokenizer::finish`] to flush any pending
/// continuation; the tokeniser is "sticky" on error, matching the parser
/// it feeds (spec §7).
pub struct Tokenizer {
    raw: RawLines,
    line_no: usize,
    folding: Option<FoldState>,
    in_target: bool,
    current_target: Option<Id<TargetHandle>>,
    cond_depth: usize,
    tokens: Vec<Token>,
    variables: Arena<VariableHandle>,
    conditionals: Arena<ConditionalHandle>,
    targets: Arena<TargetHandle>,
    interner: Interner,
    error: Option<Error>,
}

/// Everything a finished [`Tokenizer`] hands off to the parser.
pub struct TokenizerOutput {
    pub raw: RawLines,
    pub tokens: Vec<Token>,
    pub variables: Arena<VariableHandle>,
    pub conditionals: Arena<ConditionalHandle>,
    pub targets: Arena<TargetHandle>,
    pub interner: Interner,
}

impl Tokenizer {
    /// Creates an empty tokeniser.
    pub fn new() -> Self {
        Tokenizer {
            raw: RawLines::default(),
            line_no: 0,
            folding: None,
            in_target: false,
            current_target: None,
            cond_depth: 0,
            tokens: Vec::new(),
            variables: Arena::new(),
            conditionals: Arena::new(),
            targets: Arena::new(),
            interner: Interner::new(),
            error: None,
        }
    }

    /// Feeds one raw source line (no trailing newline). Preserves
    /// continuation state across calls.
    pub fn feed(&mut self, line: &str) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.line_no += 1;
        self.raw.push(line.to_string());
        let result = self.feed_inner(line);
        if let Err(e) = &result {
            self.error = Some(e.clone());
        }
        result
    }

    /// Flushes any pending continuation and closes an open target body.
    pub fn finish(mut self) -> Result<TokenizerOutput> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if let Some(state) = self.folding.take() {
            let range = LineRange::new(state.start_line, self.line_no + 1);
            let buffer = state.buffer;
            if let Err(e) = self.dispatch(&buffer, range) {
                return Err(e);
            }
        }
        if self.in_target {
            self.close_target(LineRange::single(self.line_no + 1));
        }
        Ok(TokenizerOutput {
            raw: self.raw,
            tokens: self.tokens,
            variables: self.variables,
            conditionals: self.conditionals,
            targets: self.targets,
            interner: self.interner,
        })
    }

    fn feed_inner(&mut self, line: &str) -> Result<()> {
        let (folded, continues) = fold_continuation(line);
        match &mut self.folding {
            Some(state) => state.buffer.push_str(&collapse_leading_ws(&folded)),
            None => {
                self.folding = Some(FoldState {
                    start_line: self.line_no,
                    buffer: folded,
                });
            }
        }
        if continues {
            return Ok(());
        }
        let state = self.folding.take().expect("just set above");
        let range = LineRange::new(state.start_line, self.line_no + 1);
        self.dispatch(&state.buffer, range)
    }

    fn dispatch(&mut self, text: &str, range: LineRange) -> Result<()> {
        if is_blank_or_comment(text) {
            self.emit_comment(text, range);
            return Ok(());
        }
        let trimmed = text.trim_start();

        if self.in_target {
            if trimmed.starts_with('.') {
                return self.emit_directive(trimmed, range);
            }
            if let Some((name, modifier, value)) = try_variable(trimmed) {
                self.close_target(LineRange::single(range.start));
                return self.emit_variable(name, modifier, value, range);
            }
            if let Some((names, rest)) = try_target(trimmed) {
                self.close_target(LineRange::single(range.start));
                return self.emit_target_start(&names, rest, range);
            }
            return self.emit_target_command(text, range);
        }

        if trimmed.starts_with('.') {
            return self.emit_directive(trimmed, range);
        }
        if let Some((names, rest)) = try_target(trimmed) {
            return self.emit_target_start(&names, rest, range);
        }
        if let Some((name, modifier, value)) = try_variable(trimmed) {
            return self.emit_variable(name, modifier, value, range);
        }

        // Lenient fallback: stray text that matches none of the known
        // shapes is preserved as a comment rather than failing the parse.
        self.emit_comment(text, range);
        Ok(())
    }

    fn emit_comment(&mut self, text: &str, range: LineRange) {
        self.tokens
            .push(Token::new(TokenKind::Comment, range).with_payload(text));
    }

    fn emit_variable(&mut self, name: &str, modifier: Modifier, value: &str, range: LineRange) -> Result<()> {
        let sym = self.interner.intern(name);
        let id = self.variables.alloc(VariableHandle {
            name: sym,
            modifier,
            edited: false,
            deleted: false,
        });
        let handle = DomainHandle::Variable(id);
        self.tokens
            .push(Token::new(TokenKind::VariableStart, range).with_handle(handle));

        let parsed = tokenize_value(value);
        for word in parsed.words {
            self.tokens.push(
                Token::new(TokenKind::VariableToken, range)
                    .with_payload(word)
                    .with_handle(handle),
            );
        }
        if let Some(comment) = parsed.comment {
            self.tokens.push(
                Token::new(TokenKind::VariableToken, range)
                    .with_payload(comment)
                    .with_handle(handle),
            );
        }
        self.tokens
            .push(Token::new(TokenKind::VariableEnd, range).with_handle(handle));
        Ok(())
    }

    fn emit_target_start(&mut self, names: &[&str], rest: &str, range: LineRange) -> Result<()> {
        let syms = names.iter().map(|n| self.interner.intern(n)).collect();
        let id = self.targets.alloc(TargetHandle {
            names: syms,
            edited: false,
            deleted: false,
        });
        self.tokens.push(
            Token::new(TokenKind::TargetStart, range)
                .with_payload(rest.trim())
                .with_handle(DomainHandle::Target(id)),
        );
        self.in_target = true;
        self.current_target = Some(id);
        Ok(())
    }

    fn emit_target_command(&mut self, text: &str, range: LineRange) -> Result<()> {
        let id = match self.current_target {
            Some(id) => id,
            None => {
                return Err(Error::UnhandledTokenType {
                    kind: "target-command-outside-target".to_string(),
                    range,
                })
            }
        };
        let handle = DomainHandle::Target(id);
        let body = text.trim_start_matches('\t').trim_start();
        self.tokens
            .push(Token::new(TokenKind::TargetCommandStart, range).with_handle(handle));
        let parsed = tokenize_value(body);
        for word in parsed.words {
            self.tokens.push(
                Token::new(TokenKind::TargetCommandToken, range)
                    .with_payload(word)
                    .with_handle(handle),
            );
        }
        if let Some(comment) = parsed.comment {
            self.tokens.push(
                Token::new(TokenKind::TargetCommandToken, range)
                    .with_payload(comment)
                    .with_handle(handle),
            );
        }
        self.tokens
            .push(Token::new(TokenKind::TargetCommandEnd, range).with_handle(handle));
        Ok(())
    }

    fn emit_directive(&mut self, trimmed: &str, range: LineRange) -> Result<()> {
        let word_end = trimmed
            .find(|c: char| c.is_whitespace())
            .unwrap_or(trimmed.len());
        let word = &trimmed[..word_end];
        let rest = trimmed[word_end..].trim_start();
        let kind = parse_directive_kind(&word.to_ascii_lowercase(), rest).ok_or_else(|| {
            Error::UnhandledTokenType {
                kind: word.to_string(),
                range,
            }
        })?;

        if kind.closes_block() {
            self.cond_depth = self.cond_depth.saturating_sub(1);
        }
        let depth = self.cond_depth;
        let id = self.conditionals.alloc(ConditionalHandle { kind, depth });
        let handle = DomainHandle::Conditional(id);

        self.tokens
            .push(Token::new(TokenKind::ConditionalStart, range).with_handle(handle));
        let parsed = tokenize_value(rest);
        for word in parsed.words {
            self.tokens.push(
                Token::new(TokenKind::ConditionalToken, range)
                    .with_payload(word)
                    .with_handle(handle),
            );
        }
        self.tokens
            .push(Token::new(TokenKind::ConditionalEnd, range).with_handle(handle));

        if kind.opens_block() {
            self.cond_depth += 1;
        }
        Ok(())
    }

    fn close_target(&mut self, range: LineRange) {
        if let Some(id) = self.current_target.take() {
            self.tokens
                .push(Token::new(TokenKind::TargetEnd, range).with_handle(DomainHandle::Target(id)));
        }
        self.in_target = false;
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Folds one physical line, returning `(text, is_continuation)`. A line
/// ending in an odd number of backslashes continues; the continuation
/// backslash is replaced per the rules in spec §4.1.
fn fold_continuation(line: &str) -> (String, bool) {
    let trailing_backslashes = line.chars().rev().take_while(|&c| c == '\\').count();
    if trailing_backslashes % 2 == 0 {
        return (line.to_string(), false);
    }
    let body = &line[..line.len() - 1];
    let chars: Vec<char> = body.chars().collect();
    let n = chars.len();
    let replacement = if n >= 1 && chars[n - 1] == '$' && !(n >= 2 && chars[n - 2] == '$') {
        ESCAPED_BACKSLASH_SENTINEL.to_string()
    } else if n >= 1 && !chars[n - 1].is_whitespace() {
        " ".to_string()
    } else {
        String::new()
    };
    (format!("{body}{replacement}"), true)
}

/// Collapses the leading whitespace of a continued line to a single space.
fn collapse_leading_ws(s: &str) -> String {
    let trimmed = s.trim_start_matches([' ', '\t']);
    if trimmed.len() == s.len() {
        s.to_string()
    } else {
        format!(" {trimmed}")
    }
}

fn is_blank_or_comment(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

fn name_end(text: &str) -> usize {
    let mut end = 0;
    for (i, c) in text.char_indices() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Tries to parse `text` as `NAME[+!?:]?=value`. Whitespace between the
/// name and the operator is tolerated.
fn try_variable(text: &str) -> Option<(&str, Modifier, &str)> {
    let name_len = name_end(text);
    if name_len == 0 {
        return None;
    }
    let name = &text[..name_len];
    let rest = text[name_len..].trim_start();
    for op in ["+=", "!=", "?=", ":=", "="] {
        if let Some(value) = rest.strip_prefix(op) {
            let modifier = Modifier::from_str(op).expect("op is a valid modifier token");
            return Some((name, modifier, value));
        }
    }
    None
}

/// Tries to parse `text` as a target header: one or more whitespace
/// separated names followed by `::`, `:`, or `!` (but not `:=`/`!=`,
/// which belong to [`try_variable`]).
fn try_target(text: &str) -> Option<(Vec<&str>, &str)> {
    let idx = text.find([':', '!'])?;
    let names_part = &text[..idx];
    let names: Vec<&str> = names_part.split_whitespace().collect();
    if names.is_empty() {
        return None;
    }
    let op_and_rest = &text[idx..];
    if let Some(rest) = op_and_rest.strip_prefix("::") {
        return Some((names, rest));
    }
    if let Some(rest) = op_and_rest.strip_prefix(':') {
        if rest.starts_with('=') {
            return None;
        }
        return Some((names, rest));
    }
    if let Some(rest) = op_and_rest.strip_prefix('!') {
        if rest.starts_with('=') {
            return None;
        }
        return Some((names, rest));
    }
    None
}

/// Maps a lowercased directive word and its argument text to a
/// [`ConditionalType`]. `.include`'s argument decides `Include` vs.
/// `IncludePosix` (a leading `<` marks a system include).
fn parse_directive_kind(word: &str, rest: &str) -> Option<ConditionalType> {
    use ConditionalType::*;
    Some(match word {
        ".if" => If,
        ".ifdef" => Ifdef,
        ".ifmake" => Ifmake,
        ".ifndef" => Ifndef,
        ".ifnmake" => Ifnmake,
        ".elif" => Elif,
        ".elifdef" => Elifdef,
        ".elifmake" => Elifmake,
        ".elifndef" => Elifndef,
        ".else" => Else,
        ".endif" => Endif,
        ".for" => For,
        ".endfor" => Endfor,
        ".include" => {
            if rest.trim_start().starts_with('<') {
                IncludePosix
            } else {
                Include
            }
        }
        ".sinclude" => SInclude,
        ".undef" => Undef,
        ".export" => Export,
        ".export-env" => ExportEnv,
        ".export-literal" => ExportLiteral,
        ".unexport" => Unexport,
        ".unexport-env" => UnexportEnv,
        ".error" => Error,
        ".warning" => Warning,
        ".info" => Info,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(lines: &[&str]) -> TokenizerOutput {
        let mut tok = Tokenizer::new();
        for line in lines {
            tok.feed(line).unwrap();
        }
        tok.finish().unwrap()
    }

    #[test]
    fn simple_variable_assignment() {
        let out = run(&["PORTNAME=foo"]);
        let kinds: Vec<_> = out.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::VariableStart,
                TokenKind::VariableToken,
                TokenKind::VariableEnd
            ]
        );
    }

    #[test]
    fn blank_line_is_comment() {
        let out = run(&[""]);
        assert_eq!(out.tokens.len(), 1);
        assert_eq!(out.tokens[0].kind, TokenKind::Comment);
    }

    #[test]
    fn continuation_joins_lines() {
        let out = run(&["USES= python \\", "\tssl"]);
        let words: Vec<&str> = out
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::VariableToken)
            .filter_map(|t| t.payload.as_deref())
            .collect();
        assert_eq!(words, vec!["python", "ssl"]);
        assert_eq!(out.tokens[0].range, LineRange::new(1, 3));
    }

    #[test]
    fn target_header_opens_target_body() {
        let out = run(&["all: foo", "\techo hi"]);
        let kinds: Vec<_> = out.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::TargetStart,
                TokenKind::TargetCommandStart,
                TokenKind::TargetCommandToken,
                TokenKind::TargetCommandToken,
                TokenKind::TargetCommandEnd,
                TokenKind::TargetEnd,
            ]
        );
    }

    #[test]
    fn variable_inside_target_body_closes_target() {
        let out = run(&["all: foo", "\techo hi", "PORTNAME=bar"]);
        let kinds: Vec<_> = out.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::TargetStart,
                TokenKind::TargetCommandStart,
                TokenKind::TargetCommandToken,
                TokenKind::TargetCommandToken,
                TokenKind::TargetCommandEnd,
                TokenKind::TargetEnd,
                TokenKind::VariableStart,
                TokenKind::VariableToken,
                TokenKind::VariableEnd,
            ]
        );
    }

    #[test]
    fn expand_modifier_not_confused_with_target() {
        let out = run(&["FOO:=bar"]);
        let handle = out.tokens[0].handle.unwrap();
        match handle {
            DomainHandle::Variable(id) => {
                assert_eq!(out.variables.get(id).modifier, Modifier::Expand);
            }
            _ => panic!("expected a variable handle"),
        }
    }

    #[test]
    fn directive_emits_start_tokens_end() {
        let out = run(&[".if defined(FOO)", ".endif"]);
        let kinds: Vec<_> = out.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::ConditionalStart,
                TokenKind::ConditionalToken,
                TokenKind::ConditionalEnd,
                TokenKind::ConditionalStart,
                TokenKind::ConditionalEnd,
            ]
        );
    }

    #[test]
    fn unknown_directive_is_an_error() {
        let mut tok = Tokenizer::new();
        tok.feed(".bogus foo").unwrap_err();
    }

    #[test]
    fn sticky_error_returns_same_error_again() {
        let mut tok = Tokenizer::new();
        let first = tok.feed(".bogus foo").unwrap_err();
        let second = tok.feed("PORTNAME=foo").unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn include_posix_vs_local() {
        let out = run(&[".include <bsd.port.mk>"]);
        let id = match out.tokens[0].handle.unwrap() {
            DomainHandle::Conditional(id) => id,
            _ => panic!("expected conditional"),
        };
        assert_eq!(out.conditionals.get(id).kind, ConditionalType::IncludePosix);
    }
}
