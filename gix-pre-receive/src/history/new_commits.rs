use crate::parallel::{in_parallel_bounded, MAX_IN_FLIGHT};
use crate::protocol::{Operation, UpdateList};
use crate::repository::Repository;
use crate::Error;

/// Discover the commits each non-deleting update in `list` introduces to the repository.
///
/// The commits of each update are stored in the order the repository produced them.
/// If any query fails, nothing is written back and the error is returned.
pub fn discover_new_commits(list: &mut UpdateList, repo: &dyn Repository) -> Result<(), Error> {
    let _span = tracing::info_span!("new_commits", updates = list.len()).entered();
    let indices: Vec<usize> = list
        .iter()
        .enumerate()
        .filter_map(|(idx, update)| (update.operation() != Operation::Delete).then_some(idx))
        .collect();
    if indices.is_empty() {
        return Ok(());
    }

    let updates = list.as_slice();
    let commits = in_parallel_bounded(&indices, MAX_IN_FLIGHT, |&idx| repo.new_commits(updates[idx].new_id()))?;

    let updates = list.as_mut_slice();
    for (idx, commits) in indices.into_iter().zip(commits) {
        tracing::debug!(name = %updates[idx].name(), count = commits.len(), "discovered new commits");
        updates[idx].set_new_commits(commits);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository;
    use gix_hash::ObjectId;
    use std::sync::Mutex;

    fn oid(c: char) -> ObjectId {
        ObjectId::from_hex(c.to_string().repeat(40).as_bytes()).expect("valid hex")
    }

    /// Claims each tip introduces itself and its fixed parent `1111…`.
    #[derive(Default)]
    struct Fake {
        tips: Mutex<Vec<ObjectId>>,
    }

    impl Repository for Fake {
        fn merge_base(&self, _a: &ObjectId, _b: &ObjectId) -> Result<ObjectId, repository::Error> {
            unreachable!("not used by this phase")
        }

        fn new_commits(&self, tip: &ObjectId) -> Result<Vec<ObjectId>, repository::Error> {
            self.tips.lock().unwrap().push(*tip);
            Ok(vec![*tip, oid('1')])
        }
    }

    #[test]
    fn deletions_are_skipped_and_order_is_kept() {
        let mut list = UpdateList::parse_from_text(&format!(
            "{zero} {a} refs/heads/new\n{b} {zero} refs/heads/old\n{c} {d} refs/tags/v1\n",
            zero = oid('0'),
            a = oid('a'),
            b = oid('b'),
            c = oid('c'),
            d = oid('d'),
        ))
        .unwrap();
        let repo = Fake::default();
        discover_new_commits(&mut list, &repo).unwrap();

        let mut tips = repo.tips.into_inner().unwrap();
        tips.sort();
        assert_eq!(tips, vec![oid('a'), oid('d')]);

        let commits: Vec<_> = list.iter().map(|u| u.new_commits().map(<[_]>::to_vec)).collect();
        assert_eq!(
            commits,
            vec![Some(vec![oid('a'), oid('1')]), None, Some(vec![oid('d'), oid('1')])]
        );
    }
}
