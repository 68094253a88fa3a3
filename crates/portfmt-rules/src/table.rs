//! The read-only domain rule table.
//!
//! Every function here is a pure function of a variable or target name (or,
//! for [`compare_tokens`], of a name plus two value strings). Nothing in
//! this module performs I/O or holds mutable state; the lookup tables
//! themselves are built once, lazily, on first use.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::blocks::Block;

/// The helper kind recognised in an options-helper variable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsHelperKind {
    Vars,
    VarsOff,
    Use,
    UseOff,
    CFlags,
    CFlagsOff,
    CxxFlags,
    CxxFlagsOff,
    LdFlags,
    LdFlagsOff,
    ConfigureOn,
    ConfigureOff,
    ConfigureEnv,
    ConfigureEnvOff,
    CMakeOn,
    CMakeOff,
    MesonOn,
    MesonOff,
    MakeEnv,
    MakeEnvOff,
    MakeArgs,
    MakeArgsOff,
    BuildDepends,
    BuildDependsOff,
    RunDepends,
    RunDependsOff,
    LibDepends,
    LibDependsOff,
    Uses,
    UsesOff,
    ExtraPatches,
    ExtraPatchesOff,
    Implies,
    Prevents,
    Desc,
}

/// The decomposition of an options-helper variable name, e.g.
/// `DOCS_VARS_OFF` decomposes into option `DOCS`, helper `VarsOff`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsHelper {
    /// The option name this variable is conditional on.
    pub option: String,
    /// The kind of helper this variable contributes.
    pub helper: OptionsHelperKind,
    /// Reserved for dialect-specific trailing qualifiers; always `None` in
    /// the current rule set.
    pub suffix: Option<String>,
}

// Longest suffix first, so `_VARS_OFF` is tried before `_VARS`.
const HELPER_SUFFIXES: &[(&str, OptionsHelperKind)] = &[
    ("_VARS_OFF", OptionsHelperKind::VarsOff),
    ("_VARS", OptionsHelperKind::Vars),
    ("_USE_OFF", OptionsHelperKind::UseOff),
    ("_USE", OptionsHelperKind::Use),
    ("_CFLAGS_OFF", OptionsHelperKind::CFlagsOff),
    ("_CFLAGS", OptionsHelperKind::CFlags),
    ("_CXXFLAGS_OFF", OptionsHelperKind::CxxFlagsOff),
    ("_CXXFLAGS", OptionsHelperKind::CxxFlags),
    ("_LDFLAGS_OFF", OptionsHelperKind::LdFlagsOff),
    ("_LDFLAGS", OptionsHelperKind::LdFlags),
    ("_CONFIGURE_ON", OptionsHelperKind::ConfigureOn),
    ("_CONFIGURE_OFF", OptionsHelperKind::ConfigureOff),
    ("_CONFIGURE_ENV_OFF", OptionsHelperKind::ConfigureEnvOff),
    ("_CONFIGURE_ENV", OptionsHelperKind::ConfigureEnv),
    ("_CMAKE_ON", OptionsHelperKind::CMakeOn),
    ("_CMAKE_OFF", OptionsHelperKind::CMakeOff),
    ("_MESON_ON", OptionsHelperKind::MesonOn),
    ("_MESON_OFF", OptionsHelperKind::MesonOff),
    ("_MAKE_ENV_OFF", OptionsHelperKind::MakeEnvOff),
    ("_MAKE_ENV", OptionsHelperKind::MakeEnv),
    ("_MAKE_ARGS_OFF", OptionsHelperKind::MakeArgsOff),
    ("_MAKE_ARGS", OptionsHelperKind::MakeArgs),
    ("_BUILD_DEPENDS_OFF", OptionsHelperKind::BuildDependsOff),
    ("_BUILD_DEPENDS", OptionsHelperKind::BuildDepends),
    ("_RUN_DEPENDS_OFF", OptionsHelperKind::RunDependsOff),
    ("_RUN_DEPENDS", OptionsHelperKind::RunDepends),
    ("_LIB_DEPENDS_OFF", OptionsHelperKind::LibDependsOff),
    ("_LIB_DEPENDS", OptionsHelperKind::LibDepends),
    ("_USES_OFF", OptionsHelperKind::UsesOff),
    ("_USES", OptionsHelperKind::Uses),
    ("_EXTRA_PATCHES_OFF", OptionsHelperKind::ExtraPatchesOff),
    ("_EXTRA_PATCHES", OptionsHelperKind::ExtraPatches),
    ("_IMPLIES", OptionsHelperKind::Implies),
    ("_PREVENTS", OptionsHelperKind::Prevents),
    ("_DESC", OptionsHelperKind::Desc),
];

/// Decomposes an options-helper variable name, e.g. `DOCS_VARS_OFF` into
/// option `DOCS`, helper [`OptionsHelperKind::VarsOff`].
///
/// Returns `None` for names that do not end in a recognised helper suffix,
/// or whose remaining option part is empty.
pub fn is_options_helper(name: &str) -> Option<OptionsHelper> {
    for (suffix, kind) in HELPER_SUFFIXES {
        if let Some(option) = name.strip_suffix(suffix) {
            if option.is_empty() {
                continue;
            }
            return Some(OptionsHelper {
                option: option.to_string(),
                helper: *kind,
                suffix: None,
            });
        }
    }
    None
}

static SPECIAL_TARGETS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "all",
        "beforefetch",
        "afterfetch",
        "beforebuild",
        "afterbuild",
        "beforeinstall",
        "afterinstall",
        "beforedeinstall",
        "afterdeinstall",
        "beforepatch",
        "afterpatch",
        "pre-fetch",
        "pre-extract",
        "pre-patch",
        "pre-configure",
        "pre-build",
        "pre-install",
        "pre-package",
        "post-fetch",
        "post-extract",
        "post-patch",
        "post-configure",
        "post-build",
        "post-install",
        "post-package",
        "do-fetch",
        "do-extract",
        "do-patch",
        "do-configure",
        "do-build",
        "do-install",
        "do-package",
        "clean",
        "install",
        "package",
        "deinstall",
        "describe",
        "fetch",
        "extract",
        "patch",
        "configure",
        "build",
    ]
    .into_iter()
    .collect()
});

static KNOWN_TARGETS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let mut set: HashSet<&'static str> = SPECIAL_TARGETS.iter().copied().collect();
    set.extend([
        "checksum",
        "makesum",
        "distclean",
        "reinstall",
        "showconfig",
        "config",
        "config-recursive",
        "test",
        "check",
    ]);
    set
});

static VARIABLE_BLOCKS: Lazy<HashMap<&'static str, Block>> = Lazy::new(|| {
    use Block::*;
    [
        ("PORTNAME", PortName),
        ("PORTVERSION", PortName),
        ("DISTVERSIONPREFIX", PortName),
        ("DISTVERSION", PortName),
        ("DISTVERSIONSUFFIX", PortName),
        ("PKGNAMEPREFIX", Categories),
        ("PKGNAMESUFFIX", Categories),
        ("PORTREVISION", PortRevision),
        ("PORTEPOCH", PortRevision),
        ("CATEGORIES", Categories),
        ("MASTER_SITES", Categories),
        ("MASTER_SITE_SUBDIR", Categories),
        ("DISTNAME", Categories),
        ("DISTFILES", Categories),
        ("EXTRACT_SUFX", Categories),
        ("MAINTAINER", Maintainer),
        ("COMMENT", Maintainer),
        ("LICENSE", Licensing),
        ("LICENSE_COMB", Licensing),
        ("LICENSE_FILE", Licensing),
        ("LICENSE_NAME", Licensing),
        ("LICENSE_PERMS", Licensing),
        ("LICENSE_DISTFILES", Licensing),
        ("BROKEN", Broken),
        ("DEPRECATED", Broken),
        ("EXPIRATION_DATE", Broken),
        ("FORBIDDEN", Broken),
        ("IGNORE", Broken),
        ("ONLY_FOR_ARCHS", Broken),
        ("ONLY_FOR_ARCHS_REASON", Broken),
        ("NOT_FOR_ARCHS", Broken),
        ("NOT_FOR_ARCHS_REASON", Broken),
        ("BUILD_DEPENDS", Depends),
        ("RUN_DEPENDS", Depends),
        ("LIB_DEPENDS", Depends),
        ("TEST_DEPENDS", Depends),
        ("PATCH_DEPENDS", Depends),
        ("FETCH_DEPENDS", Depends),
        ("EXTRACT_DEPENDS", Depends),
        ("CONFLICTS", Depends),
        ("CONFLICTS_BUILD", Depends),
        ("CONFLICTS_INSTALL", Depends),
        ("FLAVORS", Flavors),
        ("FLAVOR", Flavors),
        ("USES", Uses),
        ("USE_GITHUB", ShebangFix),
        ("USE_GITLAB", ShebangFix),
        ("GH_ACCOUNT", ShebangFix),
        ("GH_PROJECT", ShebangFix),
        ("GH_TAGNAME", ShebangFix),
        ("USE_APACHE", Apache),
        ("CARGO_USE_GITHUB", Cargo),
        ("CRAN_DEPENDS", Cran),
        ("USE_ELIXIR", Elixir),
        ("USE_EMACS", Emacs),
        ("USE_ERLANG", Erlang),
        ("GO_PKGNAME", Go),
        ("USE_KDE", Kde),
        ("USE_LINUX", Linux),
        ("MAKE_JOBS_UNSAFE", Makefile),
        ("MESON_BUILD_DIR", Meson),
        ("CMAKE_BUILD_TYPE", Cmake),
        ("QMAKE_ARGS", Qmake),
        ("GNU_CONFIGURE", Configure),
        ("CONFIGURE_ARGS", Configure),
        ("CONFIGURE_ENV", Configure),
        ("CONFIGURE_SCRIPT", Configure),
        ("USE_QT", Qt),
        ("USE_SDL", Sdl),
        ("USE_PERL5", Perl5),
        ("USES_PYTHON", Python),
        ("PYTHON_PKGNAMEPREFIX", Python),
        ("PYDISTUTILS_PKGNAME", Python),
        ("MAKE_ENV", Standard),
        ("MAKE_ARGS", Standard),
        ("ALL_TARGET", Standard),
        ("INSTALL_TARGET", Standard),
        ("OPTIONS_DEFINE", Options),
        ("OPTIONS_DEFAULT", Options),
        ("OPTIONS_GROUP", Options),
        ("OPTIONS_SINGLE", Options),
        ("OPTIONS_MULTI", Options),
        ("OPTIONS_RADIO", Options),
        ("OPTIONS_SUB", Options),
        ("NO_ARCH", Wrkdir),
        ("NO_BUILD", Wrkdir),
        ("WRKSRC", Wrkdir),
        ("WRKSRC_SUBDIR", Wrkdir),
        ("EXTRACT_ONLY", Wrkdir),
        ("USERS", Users),
        ("GROUPS", Users),
        ("SUB_FILES", SubFiles),
        ("SUB_LIST", SubFiles),
        ("DESKTOP_ENTRIES", Plist),
        ("PLIST_FILES", Plist),
        ("PLIST_DIRS", Plist),
        ("PORTDOCS", Plist),
        ("PORTEXAMPLES", Plist),
    ]
    .into_iter()
    .collect()
});

/// USES values that would make an otherwise-unknown variable recognised,
/// surfaced by the linter as a hint (spec §4.2, `variable_order_block`).
static UNKNOWN_USES_HINTS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    [
        ("CARGO_CRATES", &["cargo"][..]),
        ("GO_MODULE", &["go"][..]),
        ("USE_GNOME", &["gnome"][..]),
        ("USE_QT", &["qt"][..]),
        ("CMAKE_ARGS", &["cmake"][..]),
        ("MESON_ARGS", &["meson"][..]),
    ]
    .into_iter()
    .collect()
});

static UNSORTED_VARIABLES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "CARGO_CRATES",
        "GH_TUPLE",
        "DISTFILES",
        "PLIST_FILES",
        "SUB_FILES",
        "SUB_LIST",
        "USE_GITHUB",
    ]
    .into_iter()
    .collect()
});

static UNFORMATTED_VARIABLES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["DESCR", "PORTDOCS"].into_iter().collect());

static NEWLINE_VARIABLES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["CARGO_CRATES", "GH_TUPLE", "DESKTOP_ENTRIES"].into_iter().collect());

static IGNORE_WRAP_COL_VARIABLES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["PLIST_FILES", "LICENSE_FILE", "MAKE_ENV"].into_iter().collect());

static SKIP_GOALCOL_VARIABLES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["CARGO_CRATES", "GH_TUPLE", "DESKTOP_ENTRIES"].into_iter().collect());

static SKIP_DEDUP_VARIABLES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["CARGO_CRATES", "GH_TUPLE", "SUB_LIST"].into_iter().collect());

/// Returns `true` if `name` is a target whose commands belong to a fixed
/// pre/post/do phase of the port build lifecycle.
pub fn is_special_target(name: &str) -> bool {
    SPECIAL_TARGETS.contains(name)
}

/// Returns `true` if `name` is any target the rule table recognises,
/// special or not.
pub fn is_known_target(name: &str) -> bool {
    KNOWN_TARGETS.contains(name)
}

/// Returns `true` if `text` is a decorative value-position comment
/// (`#`, `# empty`, `# none`, `#none`) that does not carry real content and
/// so must not block value sorting.
pub fn is_comment(text: &str) -> bool {
    let trimmed = text.trim();
    matches!(trimmed, "#" | "# empty" | "# none" | "#none")
}

/// Returns the canonical ordering block for `name`, plus — only when the
/// block is [`Block::Unknown`] — the set of `USES=` values that would make
/// the variable recognised.
pub fn variable_order_block(name: &str) -> (Block, Option<&'static [&'static str]>) {
    match VARIABLE_BLOCKS.get(name) {
        Some(block) => (*block, None),
        None => (Block::Unknown, UNKNOWN_USES_HINTS.get(name).copied()),
    }
}

/// Returns `true` if `var`'s value list must never be sorted.
///
/// `USES` (and its `<opt>_USES`/`<opt>_USES_OFF` options-helper variants)
/// is keyed on the substring before the first `:` for dedup purposes but
/// otherwise keeps first-occurrence order: `compiler:c++11-lang` after
/// `python` means "prefer the C++11 compiler", and reordering it ahead of
/// `python` would silently change which substitution wins.
pub fn leave_unsorted(var: &str) -> bool {
    UNSORTED_VARIABLES.contains(var)
        || var == "USES"
        || is_options_helper(var).map(|h| matches!(h.helper, OptionsHelperKind::Uses | OptionsHelperKind::UsesOff)) == Some(true)
}

/// Returns `true` if `var`'s value list must be emitted exactly as written,
/// with no wrapping or alignment applied at all.
pub fn leave_unformatted(var: &str) -> bool {
    UNFORMATTED_VARIABLES.contains(var)
}

/// Returns `true` if each of `var`'s values must occupy its own
/// continuation line rather than being packed to the wrap column.
pub fn print_as_newlines(var: &str) -> bool {
    NEWLINE_VARIABLES.contains(var)
}

/// Returns `true` if `var` must be rendered on one line regardless of the
/// configured wrap column.
pub fn ignore_wrap_col(var: &str) -> bool {
    IGNORE_WRAP_COL_VARIABLES.contains(var)
}

/// Returns `true` if `var` must use its own indent rather than
/// participating in its run's goal-column maximum.
pub fn skip_goalcol(var: &str) -> bool {
    SKIP_GOALCOL_VARIABLES.contains(var)
}

/// Returns `true` if `var`'s value list must not be deduplicated.
pub fn skip_dedup(var: &str) -> bool {
    SKIP_DEDUP_VARIABLES.contains(var)
}

/// Returns the indentation column `var`'s values should align to
/// (before clamping to the group minimum of 16).
pub fn indent_goalcol(var: &str) -> usize {
    // Tab-stop alignment: name, modifier, then round up to the next
    // multiple of 8 that leaves room for at least one tab.
    let width = var.len() + 1; // +1 for the modifier character
    ((width / 8) + 1) * 8
}

/// Compares two value tokens belonging to `var`, honouring any
/// variable-specific ordering (dependency lines sort by origin path,
/// `USES` arguments sort by the text before the first `:`, everything
/// else sorts lexically).
pub fn compare_tokens(var: &str, a: &str, b: &str) -> Ordering {
    if var == "USES" || is_options_helper(var).map(|h| h.helper == OptionsHelperKind::Uses) == Some(true) {
        let key = |s: &str| s.split(':').next().unwrap_or(s).to_string();
        return key(a).cmp(&key(b));
    }
    match var {
        "RUN_DEPENDS" | "BUILD_DEPENDS" | "LIB_DEPENDS" | "TEST_DEPENDS" => {
            // Dependency lines look like `prog:origin`; sort by the origin.
            let key = |s: &str| s.splitn(2, ':').nth(1).unwrap_or(s).to_string();
            key(a).cmp(&key(b))
        }
        _ => a.cmp(b),
    }
}

/// Orders two variable names the way a well-formed file orders them:
/// block first, then alphabetically (case-insensitive) within the block.
pub fn compare_order(a: &str, b: &str) -> Ordering {
    let (block_a, _) = variable_order_block(a);
    let (block_b, _) = variable_order_block(b);
    block_a
        .compare(block_b)
        .then_with(|| a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()))
}

const WRAP_TRIGGER_WORDS: &[&str] = &["&&", "||", "|", ";"];

/// Returns `true` if `word` forces a line break before or after it when
/// wrapping a target command.
pub fn target_command_should_wrap(word: &str) -> bool {
    WRAP_TRIGGER_WORDS.contains(&word)
}

const WRAP_AFTER_EACH_TOKEN_COMMANDS: &[&str] = &["${REINPLACE_CMD}", "${FIND}", "${INSTALL_DATA}"];

/// Returns `true` if every argument of `cmd` forces a wrap point after it,
/// rather than only the trigger words.
pub fn target_command_wrap_after_each_token(cmd: &str) -> bool {
    WRAP_AFTER_EACH_TOKEN_COMMANDS.contains(&cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_targets_recognised() {
        assert!(is_special_target("pre-configure"));
        assert!(is_special_target("do-build"));
        assert!(!is_special_target("frobnicate"));
    }

    #[test]
    fn known_targets_superset_of_special() {
        assert!(is_known_target("pre-configure"));
        assert!(is_known_target("makesum"));
        assert!(!is_known_target("frobnicate"));
    }

    #[test]
    fn decorative_comments_recognised() {
        assert!(is_comment("#"));
        assert!(is_comment("# empty"));
        assert!(is_comment("#none"));
        assert!(!is_comment("# real comment"));
    }

    #[test]
    fn options_helper_decomposes_name() {
        let helper = is_options_helper("DOCS_VARS_OFF").unwrap();
        assert_eq!(helper.option, "DOCS");
        assert_eq!(helper.helper, OptionsHelperKind::VarsOff);
    }

    #[test]
    fn options_helper_prefers_longest_suffix() {
        let helper = is_options_helper("X11_USE_OFF").unwrap();
        assert_eq!(helper.helper, OptionsHelperKind::UseOff);
        assert_ne!(helper.helper, OptionsHelperKind::Use);
    }

    #[test]
    fn options_helper_rejects_non_helper_names() {
        assert!(is_options_helper("PORTNAME").is_none());
    }

    #[test]
    fn options_helper_rejects_empty_option() {
        assert!(is_options_helper("_VARS").is_none());
    }

    #[test]
    fn variable_order_block_known_variable() {
        let (block, hint) = variable_order_block("PORTNAME");
        assert_eq!(block, Block::PortName);
        assert!(hint.is_none());
    }

    #[test]
    fn variable_order_block_unknown_with_hint() {
        let (block, hint) = variable_order_block("CARGO_CRATES");
        assert_eq!(block, Block::Unknown);
        assert_eq!(hint, Some(&["cargo"][..]));
    }

    #[test]
    fn variable_order_block_unknown_without_hint() {
        let (block, hint) = variable_order_block("TOTALLY_MADE_UP");
        assert_eq!(block, Block::Unknown);
        assert!(hint.is_none());
    }

    #[test]
    fn compare_tokens_uses_sorts_on_prefix() {
        assert_eq!(
            compare_tokens("USES", "compiler:c++11-lang", "compiler:c++14-lang"),
            Ordering::Equal
        );
    }

    #[test]
    fn compare_tokens_default_is_lexical() {
        assert_eq!(compare_tokens("SOME_VAR", "a", "b"), Ordering::Less);
    }

    #[test]
    fn leave_unsorted_covers_uses_and_its_options_helpers() {
        assert!(leave_unsorted("USES"));
        assert!(leave_unsorted("DOCS_USES"));
        assert!(leave_unsorted("DOCS_USES_OFF"));
        assert!(!leave_unsorted("PORTNAME"));
    }

    #[test]
    fn compare_order_sorts_by_block_then_name() {
        assert_eq!(compare_order("PORTNAME", "MAINTAINER"), Ordering::Less);
        assert_eq!(compare_order("maintainer", "MAINTAINER"), Ordering::Equal);
    }

    #[test]
    fn target_command_wrap_triggers() {
        assert!(target_command_should_wrap("&&"));
        assert!(target_command_should_wrap(";"));
        assert!(!target_command_should_wrap("echo"));
    }
}
