// Parsing of the update list a pre-receive hook receives on stdin.
//
// Each line has the form
//   "<old-oid> <new-oid> <refname>"
// where either oid may be the all-zero sentinel to signal that the ref
// does not exist before or after the push.

use crate::protocol::refname::RefKind;
use crate::Error;
use bstr::{BStr, BString, ByteSlice};
use gix_hash::ObjectId;

/// The operation a single update performs, derived from which side is the null sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Operation {
    /// The ref does not exist yet.
    Create,
    /// The ref exists and is moved to another commit.
    Update,
    /// The ref exists and is removed.
    Delete,
}

impl Operation {
    /// Classify an update by its old and new ids.
    ///
    /// A null `old` always means [`Operation::Create`], even if `new` is null as well.
    pub fn classify(old: &ObjectId, new: &ObjectId) -> Self {
        if old.is_null() {
            Operation::Create
        } else if new.is_null() {
            Operation::Delete
        } else {
            Operation::Update
        }
    }
}

/// One requested change to one ref.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RefUpdate {
    old: ObjectId,
    new: ObjectId,
    name: BString,
    kind: RefKind,
    merge_base: Option<ObjectId>,
    new_commits: Option<Vec<ObjectId>>,
}

impl RefUpdate {
    /// Create an update of the ref `name` from `old` to `new`.
    pub fn new(old: ObjectId, new: ObjectId, name: impl Into<BString>) -> Self {
        let name = name.into();
        let (kind, _) = RefKind::classify(name.as_bstr());
        RefUpdate {
            old,
            new,
            name,
            kind,
            merge_base: None,
            new_commits: None,
        }
    }

    /// The id the ref points to before the push, null if it doesn't exist.
    pub fn old(&self) -> &ObjectId {
        &self.old
    }

    /// The id the ref points to after the push, null if it is deleted.
    pub fn new_id(&self) -> &ObjectId {
        &self.new
    }

    /// The fully qualified ref name, like `refs/heads/main`.
    ///
    /// Ref names are bytes and need not be valid UTF-8.
    pub fn name(&self) -> &BStr {
        self.name.as_bstr()
    }

    /// The kind of ref, derived from its name.
    pub fn kind(&self) -> RefKind {
        self.kind
    }

    /// The ref name without its kind prefix, or the full name for unknown kinds.
    pub fn short_name(&self) -> &BStr {
        self.name[self.kind.prefix().len()..].as_bstr()
    }

    /// The operation this update performs.
    pub fn operation(&self) -> Operation {
        Operation::classify(&self.old, &self.new)
    }

    /// The merge base of `old` and `new`, available for updates once merge bases were resolved.
    pub fn merge_base(&self) -> Option<&ObjectId> {
        self.merge_base.as_ref()
    }

    /// Commits reachable from `new` but from no existing ref, most recent first.
    ///
    /// Available for creates and updates once new commits were discovered.
    pub fn new_commits(&self) -> Option<&[ObjectId]> {
        self.new_commits.as_deref()
    }

    /// Return `true` if this update moves a ref to a descendant of its previous value.
    ///
    /// Only updates with a resolved merge base can be fast-forwards.
    pub fn is_fast_forward(&self) -> bool {
        self.operation() == Operation::Update && self.merge_base == Some(self.old)
    }

    pub(crate) fn set_merge_base(&mut self, id: ObjectId) {
        debug_assert_eq!(self.operation(), Operation::Update, "merge-bases only exist for updates");
        debug_assert!(self.merge_base.is_none(), "merge-base is written once");
        self.merge_base = Some(id);
    }

    pub(crate) fn set_new_commits(&mut self, commits: Vec<ObjectId>) {
        debug_assert_ne!(self.operation(), Operation::Delete, "deletions introduce no commits");
        debug_assert!(self.new_commits.is_none(), "new commits are written once");
        self.new_commits = Some(commits);
    }
}

/// The batch of updates of a single push, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateList {
    updates: Vec<RefUpdate>,
}

impl UpdateList {
    pub fn new() -> Self {
        Self { updates: Vec::new() }
    }

    pub fn push(&mut self, update: RefUpdate) {
        self.updates.push(update);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RefUpdate> {
        self.updates.iter()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn as_slice(&self) -> &[RefUpdate] {
        &self.updates
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [RefUpdate] {
        &mut self.updates
    }

    pub fn into_vec(self) -> Vec<RefUpdate> {
        self.updates
    }

    /// Parse the update list from `input`, one update per `\n`.
    ///
    /// The input is taken as bytes as ref names may not be valid UTF-8.
    /// Empty lines are skipped. Any malformed line fails the whole parse, and
    /// the error carries the offending line.
    pub fn parse_from_text(input: impl AsRef<[u8]>) -> Result<Self, Error> {
        let mut list = UpdateList::new();
        for raw_line in input.as_ref().lines() {
            let line = raw_line.trim_end_with(|c| c == '\r').as_bstr();
            if line.trim().is_empty() {
                continue;
            }
            list.push(parse_line(line)?);
        }
        Ok(list)
    }
}

impl<'a> IntoIterator for &'a UpdateList {
    type Item = &'a RefUpdate;
    type IntoIter = std::slice::Iter<'a, RefUpdate>;

    fn into_iter(self) -> Self::IntoIter {
        self.updates.iter()
    }
}

/// Parse a single `<old> <new> <refname>` line.
fn parse_line(line: &BStr) -> Result<RefUpdate, Error> {
    let tokens: Vec<&[u8]> = line.fields().collect();
    let [old_hex, new_hex, name] = tokens[..] else {
        return Err(Error::parse(
            line,
            format!("expected 3 fields '<old> <new> <ref>', got {}", tokens.len()),
        ));
    };

    let old = ObjectId::from_hex(old_hex)
        .map_err(|e| Error::parse(line, format!("invalid old id '{}': {e}", old_hex.as_bstr())))?;
    let new = ObjectId::from_hex(new_hex)
        .map_err(|e| Error::parse(line, format!("invalid new id '{}': {e}", new_hex.as_bstr())))?;

    if old.is_null() && new.is_null() {
        return Err(Error::parse(line, "both old and new id are null"));
    }

    Ok(RefUpdate::new(old, new, name))
}
