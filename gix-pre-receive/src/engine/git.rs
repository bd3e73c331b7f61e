use super::{Invocation, Pipeline};
use crate::history::{discover_new_commits, resolve_merge_bases};
use crate::policy::DangerousChangePolicy;
use crate::protocol::{RefUpdate, UpdateList};
use crate::Error;

/// Checks pushes to git repositories.
///
/// The phases run strictly one after another:
/// 1. parse the update list,
/// 2. resolve merge-bases of updated refs,
/// 3. apply the [`DangerousChangePolicy`],
/// 4. discover the commits each update introduces.
///
/// New commits are only discovered for pushes that passed the policy, as input
/// for content checks to come.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitPipeline;

impl Pipeline for GitPipeline {
    fn run(&self, invocation: &Invocation<'_>) -> Result<Vec<RefUpdate>, Error> {
        let mut list = {
            let _span = tracing::info_span!("parse").entered();
            UpdateList::parse_from_text(&invocation.input)?
        };
        tracing::debug!(updates = list.len(), "parsed update list");

        resolve_merge_bases(&mut list, invocation.repository)?;

        {
            let _span = tracing::info_span!("policy").entered();
            DangerousChangePolicy::new(invocation.config.allow_dangerous_changes).check(list.as_slice())?;
        }

        discover_new_commits(&mut list, invocation.repository)?;
        Ok(list.into_vec())
    }
}
