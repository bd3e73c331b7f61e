//! Protection against pushes that discard published history.
//!
//! A change is dangerous if it deletes a branch or moves a branch to a commit
//! that does not descend from its previous value. Tags are exempt: moving or
//! deleting them is considered easy to recover from.

use crate::protocol::{Operation, RefKind, RefUpdate, SHORT_ID_LEN};
use bstr::{BStr, BString, ByteSlice};

/// The notice appended to every rejection, telling users how to get a dangerous change through.
pub const PERMIT_NOTICE: &str = "Dangerous change protection is enabled for this repository. \
To push this change anyway, set 'preReceive.allowDangerousChanges = true' in the repository \
configuration, push again, and then turn the protection back on.";

/// The rejection of a push because of its first dangerous update.
///
/// The message is meant for the pushing client and ends with [`PERMIT_NOTICE`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error(
        "DANGEROUS CHANGE: The change you're attempting to push deletes the branch '{branch}'. \
         Deleting a branch discards its published history.\n\n{notice}",
        notice = PERMIT_NOTICE
    )]
    Deletion { branch: BString },
    /// `new` does not descend from `old`. Both ids are abbreviated.
    #[error(
        "DANGEROUS CHANGE: The change you're attempting to push updates the branch '{branch}' \
         from '{old}' to '{new}', but this is not a fast-forward. \
         Pushing it would discard published history.\n\n{notice}",
        notice = PERMIT_NOTICE
    )]
    NonFastForward { branch: BString, old: String, new: String },
}

impl Rejection {
    /// The short name of the offending branch.
    pub fn branch(&self) -> &BStr {
        match self {
            Rejection::Deletion { branch } | Rejection::NonFastForward { branch, .. } => branch.as_bstr(),
        }
    }
}

/// Rejects branch deletions and non-fast-forward branch updates unless dangerous changes are allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DangerousChangePolicy {
    allow_dangerous_changes: bool,
}

impl DangerousChangePolicy {
    /// Create a policy, which does nothing if `allow_dangerous_changes` is set.
    pub fn new(allow_dangerous_changes: bool) -> Self {
        DangerousChangePolicy {
            allow_dangerous_changes,
        }
    }

    /// Check `updates` in order and return the rejection of the first dangerous one.
    ///
    /// Updates must have their merge-bases resolved; an update without one counts
    /// as a non-fast-forward.
    pub fn check(&self, updates: &[RefUpdate]) -> Result<(), Rejection> {
        if self.allow_dangerous_changes {
            return Ok(());
        }
        updates.iter().try_for_each(evaluate)
    }
}

/// Evaluate a single update against the protection rules.
fn evaluate(update: &RefUpdate) -> Result<(), Rejection> {
    if update.kind() != RefKind::Branch {
        return Ok(());
    }
    match update.operation() {
        Operation::Create => Ok(()),
        Operation::Update if update.is_fast_forward() => Ok(()),
        Operation::Update => Err(Rejection::NonFastForward {
            branch: update.short_name().to_owned(),
            old: update.old().to_hex_with_len(SHORT_ID_LEN).to_string(),
            new: update.new_id().to_hex_with_len(SHORT_ID_LEN).to_string(),
        }),
        Operation::Delete => Err(Rejection::Deletion {
            branch: update.short_name().to_owned(),
        }),
    }
}
