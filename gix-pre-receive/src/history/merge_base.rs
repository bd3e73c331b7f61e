use crate::parallel::{in_parallel_bounded, MAX_IN_FLIGHT};
use crate::protocol::{Operation, UpdateList};
use crate::repository::Repository;
use crate::Error;

/// Resolve the merge-base of `old` and `new` for every update in `list`.
///
/// Creates and deletes have no meaningful merge-base and cause no query. If any
/// query fails, nothing is written back and the error is returned.
pub fn resolve_merge_bases(list: &mut UpdateList, repo: &dyn Repository) -> Result<(), Error> {
    let _span = tracing::info_span!("merge_base", updates = list.len()).entered();
    let indices: Vec<usize> = list
        .iter()
        .enumerate()
        .filter_map(|(idx, update)| (update.operation() == Operation::Update).then_some(idx))
        .collect();
    if indices.is_empty() {
        return Ok(());
    }

    let updates = list.as_slice();
    let bases = in_parallel_bounded(&indices, MAX_IN_FLIGHT, |&idx| {
        let update = &updates[idx];
        repo.merge_base(update.old(), update.new_id())
    })?;

    let updates = list.as_mut_slice();
    for (idx, base) in indices.into_iter().zip(bases) {
        tracing::debug!(
            name = %updates[idx].name(),
            merge_base = %base,
            fast_forward = base == *updates[idx].old(),
            "resolved merge-base"
        );
        updates[idx].set_merge_base(base);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository;
    use gix_hash::ObjectId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn oid(c: char) -> ObjectId {
        ObjectId::from_hex(c.to_string().repeat(40).as_bytes()).expect("valid hex")
    }

    /// Answers merge-base queries with the old id, making every update a fast-forward.
    #[derive(Default)]
    struct Fake {
        merge_base_calls: AtomicUsize,
        fail_on: Option<ObjectId>,
    }

    impl Repository for Fake {
        fn merge_base(&self, a: &ObjectId, _b: &ObjectId) -> Result<ObjectId, repository::Error> {
            self.merge_base_calls.fetch_add(1, Ordering::SeqCst);
            if Some(*a) == self.fail_on {
                return Err(repository::Error::Failed {
                    command: "git merge-base".into(),
                    status: "exit status: 1".into(),
                    stderr: String::new(),
                });
            }
            Ok(*a)
        }

        fn new_commits(&self, _tip: &ObjectId) -> Result<Vec<ObjectId>, repository::Error> {
            unreachable!("not used by this phase")
        }
    }

    fn list() -> UpdateList {
        UpdateList::parse_from_text(&format!(
            "{zero} {a} refs/heads/new\n{b} {c} refs/heads/main\n{d} {zero} refs/heads/old\n{e} {f} refs/tags/v1\n",
            zero = oid('0'),
            a = oid('a'),
            b = oid('b'),
            c = oid('c'),
            d = oid('d'),
            e = oid('e'),
            f = oid('f'),
        ))
        .unwrap()
    }

    #[test]
    fn only_updates_are_resolved() {
        let repo = Fake::default();
        let mut list = list();
        resolve_merge_bases(&mut list, &repo).unwrap();

        assert_eq!(repo.merge_base_calls.load(Ordering::SeqCst), 2);
        let bases: Vec<_> = list.iter().map(|u| u.merge_base().copied()).collect();
        assert_eq!(bases, vec![None, Some(oid('b')), None, Some(oid('e'))]);
    }

    #[test]
    fn a_failing_query_leaves_the_batch_untouched() {
        let repo = Fake {
            fail_on: Some(oid('e')),
            ..Default::default()
        };
        let mut list = list();
        let err = resolve_merge_bases(&mut list, &repo).unwrap_err();
        assert!(matches!(err, Error::Subprocess(_)), "{err:?}");
        assert!(list.iter().all(|u| u.merge_base().is_none()));
    }
}
