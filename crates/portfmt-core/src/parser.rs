//! The parser: owns the fully-tokenised sequence, the raw-line buffer, and
//! the domain-handle arenas, and exposes the query/mutation surface edit
//! passes are built on.

use portfmt_base::{Arena, Id, Interner, Result, SymbolEq};

use crate::buffer::RawLines;
use crate::lexer::Tokenizer;
use crate::token::{
    ConditionalHandle, DomainHandle, Modifier, TargetHandle, Token, TokenKind, VariableHandle,
};

/// Owns one parsed file: raw lines, the token sequence, and the domain
/// arenas the tokens reference. A `Parser` is single-threaded and not
/// reentrant (spec §5); each parse gets its own instance.
pub struct Parser {
    raw: RawLines,
    tokens: Vec<Token>,
    variables: Arena<VariableHandle>,
    conditionals: Arena<ConditionalHandle>,
    targets: Arena<TargetHandle>,
    interner: Interner,
}

impl Parser {
    /// Tokenises `text` in full and returns the resulting parser, or the
    /// first error the tokeniser raised.
    pub fn parse(text: &str) -> Result<Parser> {
        let mut tokenizer = Tokenizer::new();
        for line in text.lines() {
            tokenizer.feed(line)?;
        }
        let out = tokenizer.finish()?;
        Ok(Parser {
            raw: out.raw,
            tokens: out.tokens,
            variables: out.variables,
            conditionals: out.conditionals,
            targets: out.targets,
            interner: out.interner,
        })
    }

    /// Builds a parser directly from already-tokenised parts. Used by the
    /// merge engine to construct an empty primary around an existing raw
    /// buffer, and by tests.
    pub fn from_parts(
        raw: RawLines,
        tokens: Vec<Token>,
        variables: Arena<VariableHandle>,
        conditionals: Arena<ConditionalHandle>,
        targets: Arena<TargetHandle>,
        interner: Interner,
    ) -> Parser {
        Parser {
            raw,
            tokens,
            variables,
            conditionals,
            targets,
            interner,
        }
    }

    /// The raw-line buffer backing this parse.
    pub fn raw(&self) -> &RawLines {
        &self.raw
    }

    /// A mutable handle to the raw-line buffer, used when a pass
    /// synthesises wholly new source lines (e.g. the merge engine).
    pub fn raw_mut(&mut self) -> &mut RawLines {
        &mut self.raw
    }

    /// The token sequence, in source order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// A mutable handle to the token sequence, for edit passes.
    pub fn tokens_mut(&mut self) -> &mut Vec<Token> {
        &mut self.tokens
    }

    /// Replaces the whole token sequence. Every edit pass returns a
    /// (possibly-same) sequence (spec §4.3); this is how the pipeline
    /// commits a pass's output.
    pub fn set_tokens(&mut self, tokens: Vec<Token>) {
        self.tokens = tokens;
    }

    pub fn variables(&self) -> &Arena<VariableHandle> {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut Arena<VariableHandle> {
        &mut self.variables
    }

    pub fn conditionals(&self) -> &Arena<ConditionalHandle> {
        &self.conditionals
    }

    pub fn targets(&self) -> &Arena<TargetHandle> {
        &self.targets
    }

    pub fn targets_mut(&mut self) -> &mut Arena<TargetHandle> {
        &mut self.targets
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }

    /// Marks every token belonging to variable `id` as edited.
    pub fn mark_variable_edited(&mut self, id: Id<VariableHandle>) {
        self.variables.get_mut(id).edited = true;
        for token in self.tokens.iter_mut() {
            if matches!(token.handle, Some(DomainHandle::Variable(h)) if h == id) {
                token.mark_edited();
            }
        }
    }

    /// Marks every token belonging to variable `id` for deletion. The
    /// pipeline compacts deleted tokens out at the next pass boundary
    /// (spec §3's "Lifecycle").
    pub fn mark_variable_deleted(&mut self, id: Id<VariableHandle>) {
        self.variables.get_mut(id).deleted = true;
    }

    /// Marks every token belonging to target `id` for deletion.
    pub fn mark_target_deleted(&mut self, id: Id<TargetHandle>) {
        self.targets.get_mut(id).deleted = true;
    }

    /// Drops tokens whose domain handle has been marked deleted. Called at
    /// pipeline pass boundaries.
    pub fn compact(&mut self) {
        let variables = &self.variables;
        let targets = &self.targets;
        self.tokens.retain(|token| match token.handle {
            Some(DomainHandle::Variable(id)) => !variables.get(id).deleted,
            Some(DomainHandle::Target(id)) => !targets.get(id).deleted,
            _ => true,
        });
    }

    /// Finds the first variable with the given name, returning its handle
    /// id and the index of its `VariableStart` token.
    pub fn find_variable(&self, name: &str) -> Option<(Id<VariableHandle>, usize)> {
        for (i, token) in self.tokens.iter().enumerate() {
            if token.kind != TokenKind::VariableStart {
                continue;
            }
            if let Some(DomainHandle::Variable(id)) = token.handle {
                if self.variables.get(id).name.is(&self.interner, name) {
                    return Some((id, i));
                }
            }
        }
        None
    }

    /// Returns the value-token payloads belonging to variable `id`, in
    /// order, skipping the trailing comment token if present.
    pub fn variable_values(&self, id: Id<VariableHandle>) -> Vec<&str> {
        self.tokens
            .iter()
            .filter(|t| {
                t.kind == TokenKind::VariableToken
                    && matches!(t.handle, Some(DomainHandle::Variable(h)) if h == id)
            })
            .filter(|t| !t.payload.as_deref().is_some_and(|p| p.starts_with('#')))
            .filter_map(|t| t.payload.as_deref())
            .collect()
    }

    /// Returns the modifier a variable was declared with.
    pub fn variable_modifier(&self, id: Id<VariableHandle>) -> Modifier {
        self.variables.get(id).modifier
    }

    /// Returns every known variable name assigned in this file, each with
    /// its handle id, in declaration order. Used by `output-unknown-variables`
    /// and the merge engine's insertion-point search.
    pub fn enumerate_variables(&self) -> Vec<(Id<VariableHandle>, String)> {
        let mut seen = Vec::new();
        for token in &self.tokens {
            if token.kind != TokenKind::VariableStart {
                continue;
            }
            if let Some(DomainHandle::Variable(id)) = token.handle {
                let name = self.interner.resolve(self.variables.get(id).name).to_string();
                seen.push((id, name));
            }
        }
        seen
    }

    /// Returns every declared target name with its handle id, in
    /// declaration order.
    pub fn enumerate_targets(&self) -> Vec<(Id<TargetHandle>, Vec<String>)> {
        let mut seen = Vec::new();
        for token in &self.tokens {
            if token.kind != TokenKind::TargetStart {
                continue;
            }
            if let Some(DomainHandle::Target(id)) = token.handle {
                let names = self
                    .targets
                    .get(id)
                    .names
                    .iter()
                    .map(|s| self.interner.resolve(*s).to_string())
                    .collect();
                seen.push((id, names));
            }
        }
        seen
    }

    /// Returns the conditional-nesting depth enclosing the token at
    /// `index`, used by `IGNORE_VARIABLES_IN_CONDITIONALS`.
    pub fn enclosing_conditional_depth(&self, index: usize) -> usize {
        self.tokens[..=index.min(self.tokens.len().saturating_sub(1))]
            .iter()
            .rev()
            .find_map(|t| match t.handle {
                Some(DomainHandle::Conditional(id)) => Some(self.conditionals.get(id).depth),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Detects a category Makefile: one whose token stream includes an
    /// `.include <bsd.port.subdir.mk>` conditional.
    pub fn is_category_makefile(&self) -> bool {
        self.tokens.iter().any(|t| {
            t.kind == TokenKind::ConditionalToken
                && t.payload.as_deref() == Some("<bsd.port.subdir.mk>")
        })
    }

    /// Returns the index of variable `id`'s `VariableStart` and
    /// `VariableEnd` tokens, if its block is still present in the sequence.
    pub fn variable_token_range(&self, id: Id<VariableHandle>) -> Option<(usize, usize)> {
        let start = self.tokens.iter().position(|t| {
            t.kind == TokenKind::VariableStart && matches!(t.handle, Some(DomainHandle::Variable(h)) if h == id)
        })?;
        let mut end = start + 1;
        while self.tokens[end].kind == TokenKind::VariableToken {
            end += 1;
        }
        Some((start, end))
    }

    /// Returns the index of target `id`'s `TargetStart` and `TargetEnd`
    /// tokens (inclusive of any command block between them), if its block
    /// is still present in the sequence.
    pub fn target_token_range(&self, id: Id<TargetHandle>) -> Option<(usize, usize)> {
        let start = self.tokens.iter().position(|t| {
            t.kind == TokenKind::TargetStart && matches!(t.handle, Some(DomainHandle::Target(h)) if h == id)
        })?;
        let end = start
            + self.tokens[start..]
                .iter()
                .position(|t| t.kind == TokenKind::TargetEnd)?;
        Some((start, end))
    }

    /// Replaces variable `id`'s value tokens with `values`, preserving its
    /// trailing value-comment (if any) and marking every surviving token of
    /// the block edited.
    pub fn replace_variable_values(&mut self, id: Id<VariableHandle>, values: Vec<String>) {
        let Some((start, end)) = self.variable_token_range(id) else {
            return;
        };
        let trailing_comment = self.tokens[start + 1..end]
            .iter()
            .rev()
            .find(|t| t.payload.as_deref().is_some_and(|p| p.starts_with('#')))
            .and_then(|t| t.payload.clone());
        let range = self.tokens[start].range;
        let handle = DomainHandle::Variable(id);
        let mut new_tokens: Vec<Token> = values
            .into_iter()
            .map(|v| Token::new(TokenKind::VariableToken, range).with_payload(v).with_handle(handle))
            .map(|mut t| {
                t.mark_edited();
                t
            })
            .collect();
        if let Some(comment) = trailing_comment {
            let mut t = Token::new(TokenKind::VariableToken, range).with_payload(comment).with_handle(handle);
            t.mark_edited();
            new_tokens.push(t);
        }
        self.tokens.splice(start + 1..end, new_tokens);
        self.mark_variable_edited(id);
    }

    /// Inserts a brand-new variable assignment at token index `at`,
    /// allocating a fresh handle and returning it. Used by `bump-revision`,
    /// `set-version`, and the merge engine's insertion path.
    pub fn insert_variable(
        &mut self,
        at: usize,
        name: &str,
        modifier: Modifier,
        values: Vec<String>,
    ) -> Id<VariableHandle> {
        let sym = self.interner.intern(name);
        let id = self.variables.alloc(VariableHandle {
            name: sym,
            modifier,
            edited: true,
            deleted: false,
        });
        let handle = DomainHandle::Variable(id);
        let range = portfmt_base::LineRange::single(self.raw.len() + 1);
        let mut block = vec![Token::new(TokenKind::VariableStart, range).with_handle(handle)];
        for value in values {
            block.push(Token::new(TokenKind::VariableToken, range).with_payload(value).with_handle(handle));
        }
        block.push(Token::new(TokenKind::VariableEnd, range).with_handle(handle));
        for token in &mut block {
            token.mark_edited();
        }
        let at = at.min(self.tokens.len());
        for (offset, token) in block.into_iter().enumerate() {
            self.tokens.insert(at + offset, token);
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_file() {
        let parser = Parser::parse("PORTNAME=foo\nPORTVERSION=1.0\n").unwrap();
        assert_eq!(parser.tokens().len(), 6);
    }

    #[test]
    fn find_variable_locates_handle() {
        let parser = Parser::parse("PORTNAME=foo\n").unwrap();
        let (id, idx) = parser.find_variable("PORTNAME").unwrap();
        assert_eq!(idx, 0);
        assert_eq!(parser.variable_values(id), vec!["foo"]);
    }

    #[test]
    fn find_variable_missing_returns_none() {
        let parser = Parser::parse("PORTNAME=foo\n").unwrap();
        assert!(parser.find_variable("NOPE").is_none());
    }

    #[test]
    fn mark_variable_edited_sets_all_its_tokens() {
        let mut parser = Parser::parse("USES=python ssl\n").unwrap();
        let (id, _) = parser.find_variable("USES").unwrap();
        parser.mark_variable_edited(id);
        let edited_count = parser
            .tokens()
            .iter()
            .filter(|t| matches!(t.handle, Some(DomainHandle::Variable(h)) if h == id))
            .filter(|t| t.edited)
            .count();
        assert_eq!(edited_count, 4); // start + 2 values + end
    }

    #[test]
    fn mark_variable_deleted_then_compact_removes_tokens() {
        let mut parser = Parser::parse("PORTNAME=foo\nPORTVERSION=1.0\n").unwrap();
        let (id, _) = parser.find_variable("PORTNAME").unwrap();
        parser.mark_variable_deleted(id);
        parser.compact();
        assert!(parser.find_variable("PORTNAME").is_none());
        assert!(parser.find_variable("PORTVERSION").is_some());
    }

    #[test]
    fn enumerate_variables_preserves_declaration_order() {
        let parser = Parser::parse("B=1\nA=2\n").unwrap();
        let names: Vec<String> = parser
            .enumerate_variables()
            .into_iter()
            .map(|(_, n)| n)
            .collect();
        assert_eq!(names, vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn is_category_makefile_detects_subdir_include() {
        let parser = Parser::parse(".include <bsd.port.subdir.mk>\n").unwrap();
        assert!(parser.is_category_makefile());
    }

    #[test]
    fn is_category_makefile_false_otherwise() {
        let parser = Parser::parse("PORTNAME=foo\n").unwrap();
        assert!(!parser.is_category_makefile());
    }

    #[test]
    fn replace_variable_values_keeps_trailing_comment() {
        let mut parser = Parser::parse("PORTREVISION=2 # comment\n").unwrap();
        let (id, _) = parser.find_variable("PORTREVISION").unwrap();
        parser.replace_variable_values(id, vec!["3".to_string()]);
        let values = parser.variable_values(id);
        assert_eq!(values, vec!["3"]);
        let (start, end) = parser.variable_token_range(id).unwrap();
        assert_eq!(parser.tokens()[end - 1].payload.as_deref(), Some("# comment"));
        assert!(parser.tokens()[start].edited || parser.variables().get(id).edited);
    }

    #[test]
    fn insert_variable_allocates_fresh_handle_and_tokens() {
        let mut parser = Parser::parse("PORTNAME=foo\n").unwrap();
        let id = parser.insert_variable(3, "PORTREVISION", Modifier::Assign, vec!["1".to_string()]);
        assert_eq!(parser.variable_values(id), vec!["1"]);
        assert_eq!(parser.variable_modifier(id), Modifier::Assign);
    }
}
