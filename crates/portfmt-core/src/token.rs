//! The token model: the tagged records the tokeniser produces and the edit
//! pipeline mutates.

use portfmt_base::{Id, LineRange, Symbol};

/// The assignment operator a variable was declared with.
///
/// Two [`VariableHandle`]s compare equal iff their names are equal; the
/// modifier is an independent attribute carried alongside the name, not
/// part of identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// `=`
    Assign,
    /// `+=`
    Append,
    /// `?=`
    Optional,
    /// `:=`
    Expand,
    /// `!=`
    Shell,
}

impl Modifier {
    /// Parses the operator text following a variable name.
    pub fn from_str(s: &str) -> Option<Modifier> {
        match s {
            "=" => Some(Modifier::Assign),
            "+=" => Some(Modifier::Append),
            "?=" => Some(Modifier::Optional),
            ":=" => Some(Modifier::Expand),
            "!=" => Some(Modifier::Shell),
            _ => None,
        }
    }

    /// Renders the operator text.
    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Assign => "=",
            Modifier::Append => "+=",
            Modifier::Optional => "?=",
            Modifier::Expand => ":=",
            Modifier::Shell => "!=",
        }
    }
}

/// A handle identifying one logical variable assignment.
///
/// Owned by the parser's variable arena; tokens refer to it by [`Id`].
/// Equality is by name only, so passes that need to recognise "the same
/// variable regardless of modifier" can compare handles directly.
#[derive(Debug, Clone)]
pub struct VariableHandle {
    /// The interned variable name.
    pub name: Symbol,
    /// The assignment operator this occurrence used.
    pub modifier: Modifier,
    /// Set once an edit pass has rewritten this variable's tokens; the
    /// emitter must synthesise new text rather than quote the original
    /// range.
    pub edited: bool,
    /// Set once a pass has logically removed this variable; its tokens
    /// remain in the arena (other tokens may still reference the handle)
    /// but are skipped at emission and compacted at the next pass
    /// boundary.
    pub deleted: bool,
}

impl PartialEq for VariableHandle {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for VariableHandle {}

/// The directive kind a [`ConditionalHandle`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionalType {
    If,
    Ifdef,
    Ifmake,
    Ifndef,
    Ifnmake,
    Elif,
    Elifdef,
    Elifmake,
    Elifndef,
    Else,
    Endif,
    For,
    Endfor,
    Include,
    /// A system include (`.include <...>` rather than `.include "..."`).
    IncludePosix,
    SInclude,
    Undef,
    Export,
    ExportEnv,
    ExportLiteral,
    Unexport,
    UnexportEnv,
    Error,
    Warning,
    Info,
}

impl ConditionalType {
    /// Returns `true` for directives that open a new nesting level
    /// (`.if`-family and `.for`), requiring a matching `Endif`/`Endfor`.
    pub fn opens_block(self) -> bool {
        matches!(
            self,
            ConditionalType::If
                | ConditionalType::Ifdef
                | ConditionalType::Ifmake
                | ConditionalType::Ifndef
                | ConditionalType::Ifnmake
                | ConditionalType::For
        )
    }

    /// Returns `true` for directives that close a nesting level.
    pub fn closes_block(self) -> bool {
        matches!(self, ConditionalType::Endif | ConditionalType::Endfor)
    }
}

/// A handle identifying one `.`-directive occurrence.
#[derive(Debug, Clone)]
pub struct ConditionalHandle {
    /// The directive kind.
    pub kind: ConditionalType,
    /// Nesting depth at the point this directive appears (0 at top level).
    pub depth: usize,
}

/// A handle identifying one target rule header (`name: deps` or
/// `name:: deps` or `name! deps`).
#[derive(Debug, Clone)]
pub struct TargetHandle {
    /// One or more target names sharing this rule (interned).
    pub names: Vec<Symbol>,
    /// Set once an edit pass has rewritten this target's tokens.
    pub edited: bool,
    /// Set once a pass has logically removed this target.
    pub deleted: bool,
}

/// The tagged kind of one [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A blank line, or a line whose first non-blank character is `#`.
    Comment,
    ConditionalStart,
    ConditionalToken,
    ConditionalEnd,
    VariableStart,
    VariableToken,
    VariableEnd,
    TargetStart,
    TargetCommandStart,
    TargetCommandToken,
    TargetCommandEnd,
    TargetEnd,
}

impl TokenKind {
    /// Renders the kind the way the token-dump mode names it (spec §6).
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Comment => "COMMENT",
            TokenKind::ConditionalStart => "CONDITIONAL_START",
            TokenKind::ConditionalToken => "CONDITIONAL_TOKEN",
            TokenKind::ConditionalEnd => "CONDITIONAL_END",
            TokenKind::VariableStart => "VARIABLE_START",
            TokenKind::VariableToken => "VARIABLE_TOKEN",
            TokenKind::VariableEnd => "VARIABLE_END",
            TokenKind::TargetStart => "TARGET_START",
            TokenKind::TargetCommandStart => "TARGET_COMMAND_START",
            TokenKind::TargetCommandToken => "TARGET_COMMAND_TOKEN",
            TokenKind::TargetCommandEnd => "TARGET_COMMAND_END",
            TokenKind::TargetEnd => "TARGET_END",
        }
    }
}

/// A domain handle a token may carry, identifying which arena to look the
/// handle up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainHandle {
    Variable(Id<VariableHandle>),
    Conditional(Id<ConditionalHandle>),
    Target(Id<TargetHandle>),
}

/// One entry in the token sequence.
///
/// Every token carries its kind, the source range it came from, an
/// optional payload string (raw text for comments/values/conditional
/// content/command words), an optional domain handle, a goal column
/// (`0` meaning "not yet computed"), and the `edited` flag that tells the
/// emitter whether to quote the original lines or synthesise new text.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub range: LineRange,
    pub payload: Option<String>,
    pub handle: Option<DomainHandle>,
    pub goalcol: usize,
    pub edited: bool,
}

impl Token {
    /// Creates a token with no payload, handle, or goal column set.
    pub fn new(kind: TokenKind, range: LineRange) -> Self {
        Token {
            kind,
            range,
            payload: None,
            handle: None,
            goalcol: 0,
            edited: false,
        }
    }

    /// Builder-style setter for the payload string.
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Builder-style setter for the domain handle.
    pub fn with_handle(mut self, handle: DomainHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Marks this token as edited, so the emitter regenerates its text
    /// rather than quoting the original lines.
    pub fn mark_edited(&mut self) {
        self.edited = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_round_trips_through_str() {
        for m in [
            Modifier::Assign,
            Modifier::Append,
            Modifier::Optional,
            Modifier::Expand,
            Modifier::Shell,
        ] {
            assert_eq!(Modifier::from_str(m.as_str()), Some(m));
        }
    }

    #[test]
    fn modifier_from_str_rejects_unknown() {
        assert_eq!(Modifier::from_str("=="), None);
    }

    #[test]
    fn conditional_type_open_close() {
        assert!(ConditionalType::If.opens_block());
        assert!(ConditionalType::For.opens_block());
        assert!(!ConditionalType::Else.opens_block());
        assert!(ConditionalType::Endif.closes_block());
    }

    #[test]
    fn token_builder_sets_payload_and_handle() {
        let token = Token::new(TokenKind::Comment, LineRange::single(1)).with_payload("# hi");
        assert_eq!(token.payload.as_deref(), Some("# hi"));
        assert!(!token.edited);
    }

    #[test]
    fn mark_edited_sets_flag() {
        let mut token = Token::new(TokenKind::VariableToken, LineRange::single(1));
        token.mark_edited();
        assert!(token.edited);
    }
}
