//! A worker-limited task pool for independent, blocking jobs.
//!
//! Jobs are indexed by their position in the input. Results are placed at the
//! same index regardless of the order in which they complete, so the output is
//! deterministic even though scheduling is not.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;

/// The maximum number of history queries running at the same time.
pub const MAX_IN_FLIGHT: usize = 8;

/// Call `f` for each of `inputs` on at most `limit` threads and return the results in input order.
///
/// The first error stops workers from picking up further inputs; jobs that are
/// already running finish, and then that error is returned. A `limit` of 0 is treated as 1.
pub fn in_parallel_bounded<I, T, E, F>(inputs: &[I], limit: usize, f: F) -> Result<Vec<T>, E>
where
    I: Sync,
    T: Send,
    E: Send,
    F: Fn(&I) -> Result<T, E> + Sync,
{
    if inputs.is_empty() {
        return Ok(Vec::new());
    }
    let workers = limit.max(1).min(inputs.len());
    let next = AtomicUsize::new(0);
    let abort = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let (result_tx, result_rx) = mpsc::channel::<(usize, Result<T, E>)>();
        for _ in 0..workers {
            let result_tx = result_tx.clone();
            let (next, abort, f) = (&next, &abort, &f);
            scope.spawn(move || {
                while !abort.load(Ordering::Relaxed) {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    let Some(input) = inputs.get(idx) else { break };
                    let res = f(input);
                    if res.is_err() {
                        abort.store(true, Ordering::Relaxed);
                    }
                    if result_tx.send((idx, res)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut out: Vec<Option<T>> = std::iter::repeat_with(|| None).take(inputs.len()).collect();
        let mut first_err = None;
        for (idx, res) in result_rx {
            match res {
                Ok(value) => out[idx] = Some(value),
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(out.into_iter().flatten().collect()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn results_are_in_input_order() {
        let inputs: Vec<u64> = (0..20).collect();
        let out = in_parallel_bounded(&inputs, 4, |n| {
            // Later inputs finish first.
            std::thread::sleep(Duration::from_millis(20 - n));
            Ok::<_, ()>(n * 2)
        })
        .unwrap();
        assert_eq!(out, inputs.iter().map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn never_exceeds_the_limit() {
        let in_flight = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);
        let inputs = vec![(); 20];
        in_parallel_bounded(&inputs, MAX_IN_FLIGHT, |_| {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_seen.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(10));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, ()>(())
        })
        .unwrap();
        let max_seen = max_seen.load(Ordering::SeqCst);
        assert!(max_seen <= MAX_IN_FLIGHT, "{max_seen} jobs ran at once");
        assert!(max_seen >= 1);
    }

    #[test]
    fn first_error_stops_scheduling() {
        let started = AtomicUsize::new(0);
        let inputs: Vec<usize> = (0..100).collect();
        let err = in_parallel_bounded(&inputs, 1, |n| {
            started.fetch_add(1, Ordering::SeqCst);
            if *n == 3 {
                Err(format!("job {n} failed"))
            } else {
                Ok(*n)
            }
        })
        .unwrap_err();
        assert_eq!(err, "job 3 failed");
        assert_eq!(started.load(Ordering::SeqCst), 4, "a single worker stops right after the failure");
    }

    #[test]
    fn empty_input_spawns_nothing() {
        let out = in_parallel_bounded(&Vec::<u8>::new(), MAX_IN_FLIGHT, |_| -> Result<u8, ()> {
            unreachable!("no input")
        })
        .unwrap();
        assert!(out.is_empty());
    }
}
