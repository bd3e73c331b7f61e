//! Classification of fully qualified ref names.

use bstr::{BStr, ByteSlice};

/// Prefix of branch refs.
pub const BRANCH_PREFIX: &str = "refs/heads/";
/// Prefix of tag refs.
pub const TAG_PREFIX: &str = "refs/tags/";

/// The kind of ref an update targets, derived from its name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RefKind {
    /// A ref below `refs/heads/`.
    Branch,
    /// A ref below `refs/tags/`.
    Tag,
    /// Any other ref, like `refs/notes/*` or `HEAD`.
    Unknown,
}

impl RefKind {
    /// Classify `name` and return the kind along with the name stripped of the kind prefix.
    ///
    /// For [`RefKind::Unknown`] the short name is `name` itself.
    pub fn classify(name: &BStr) -> (Self, &BStr) {
        if let Some(short) = name.strip_prefix(BRANCH_PREFIX.as_bytes()) {
            (RefKind::Branch, short.as_bstr())
        } else if let Some(short) = name.strip_prefix(TAG_PREFIX.as_bytes()) {
            (RefKind::Tag, short.as_bstr())
        } else {
            (RefKind::Unknown, name)
        }
    }

    /// The prefix that is stripped to obtain short names of this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            RefKind::Branch => BRANCH_PREFIX,
            RefKind::Tag => TAG_PREFIX,
            RefKind::Unknown => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &[u8]) -> (RefKind, &BStr) {
        RefKind::classify(name.as_bstr())
    }

    #[test]
    fn classify_by_prefix() {
        assert_eq!(classify(b"refs/heads/x"), (RefKind::Branch, b"x".as_bstr()));
        assert_eq!(
            classify(b"refs/heads/feature/nested"),
            (RefKind::Branch, b"feature/nested".as_bstr())
        );
        assert_eq!(classify(b"refs/tags/v1"), (RefKind::Tag, b"v1".as_bstr()));
        assert_eq!(classify(b"refs/notes/foo"), (RefKind::Unknown, b"refs/notes/foo".as_bstr()));
        assert_eq!(classify(b"HEAD"), (RefKind::Unknown, b"HEAD".as_bstr()));
    }

    #[test]
    fn names_need_not_be_utf8() {
        assert_eq!(classify(b"refs/heads/caf\xe9"), (RefKind::Branch, b"caf\xe9".as_bstr()));
    }

    #[test]
    fn prefix_must_match_completely() {
        assert_eq!(classify(b"refs/headsx/main").0, RefKind::Unknown);
        assert_eq!(classify(b"refs/tag/v1").0, RefKind::Unknown);
    }
}
