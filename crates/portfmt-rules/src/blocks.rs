//! Ordering blocks: named buckets of variables that must appear together
//! and in a fixed relative order in a well-formed port Makefile.

/// A canonical bucket a variable belongs to, used to order it among its
/// peers. Variants are listed in the order blocks appear in a well-formed
/// file; [`Block::compare_order`] relies on [`Block`]'s derived
/// [`Ord`] matching declaration order, so new blocks must be inserted at
/// the position they occupy in the canonical layout, not appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Block {
    /// `PORTNAME`, `PORTVERSION`, `DISTVERSIONPREFIX`, ...
    PortName,
    /// `PORTREVISION`, `PORTEPOCH`.
    PortRevision,
    /// `CATEGORIES`, `MASTER_SITES`, `PKGNAMEPREFIX`, `DISTNAME`.
    Categories,
    /// `MAINTAINER`, `COMMENT`.
    Maintainer,
    /// `LICENSE`, `LICENSE_COMB`, `LICENSE_FILE`.
    Licensing,
    /// `BROKEN`, `DEPRECATED`, `EXPIRATION_DATE`, `FORBIDDEN`.
    Broken,
    /// `RUN_DEPENDS`, `BUILD_DEPENDS`, `LIB_DEPENDS`, `TEST_DEPENDS`.
    Depends,
    /// `FLAVORS`, `FLAVOR`.
    Flavors,
    /// Flavor-conditional helper variables (`<flavor>_PKGNAMESUFFIX`, ...).
    FlavorsHelper,
    /// `USES`.
    Uses,
    /// Language/framework-specific blocks activated by a `USES=` value
    /// (`CARGO_*`, `GO_*`, `PYTHON_*`, `USE_GNOME`, `USE_QT`, ...).
    ShebangFix,
    Apache,
    Cargo,
    Cran,
    Elixir,
    Emacs,
    Erlang,
    Gnome,
    Go,
    Kde,
    Linux,
    Makefile,
    Meson,
    Cmake,
    Qmake,
    Configure,
    Qt,
    Sdl,
    Perl5,
    Python,
    /// `MAKE_ENV`, `MAKE_ARGS`, `CONFIGURE_ARGS`, `CONFIGURE_ENV`.
    Standard,
    /// `OPTIONS_DEFINE`, `OPTIONS_DEFAULT`, `OPTIONS_GROUP`, `*_DESC`.
    Options,
    /// Option-conditional `<OPT>_USES`, `<OPT>_VARS`, ...
    OptionsHelper,
    /// `NO_ARCH`, `NO_BUILD`, `WRKSRC`, `WRKSRC_SUBDIR`, `EXTRACT_*`.
    Wrkdir,
    /// `USERS`, `GROUPS`.
    Users,
    /// `SUB_FILES`, `SUB_LIST`.
    SubFiles,
    /// `DESKTOP_ENTRIES`, `PLIST_FILES`, `PLIST_DIRS`, `PORTDOCS`.
    Plist,
    /// Variables with no declared block. Surfaced by `output-unknown-variables`.
    Unknown,
}

impl Block {
    /// Orders two blocks the way the canonical file layout does.
    pub fn compare(self, other: Block) -> std::cmp::Ordering {
        self.cmp(&other)
    }
}
