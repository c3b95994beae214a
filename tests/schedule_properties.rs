//! Property-based tests for schedules and schedule-driven retry

use proptest::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use undertow::{run_sync, Effect, Exit, Schedule};

fn failing_until(attempts: &Arc<AtomicU32>, failures: u32) -> Effect<u32, u32> {
    let attempts = attempts.clone();
    Effect::suspend(move || {
        let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= failures {
            Effect::fail(n)
        } else {
            Effect::succeed(n)
        }
    })
}

proptest! {
    #[test]
    fn prop_recurs_allows_k_plus_one_attempts(k in 0u32..50) {
        let attempts = Arc::new(AtomicU32::new(0));
        let exit = run_sync(failing_until(&attempts, u32::MAX).retry(Schedule::recurs(k)));

        prop_assert_eq!(exit, Exit::Fail(k + 1));
        prop_assert_eq!(attempts.load(Ordering::SeqCst), k + 1);
    }

    #[test]
    fn prop_retry_stops_at_first_success(k in 0u32..30, failures in 0u32..30) {
        prop_assume!(failures <= k);
        let attempts = Arc::new(AtomicU32::new(0));
        let exit = run_sync(failing_until(&attempts, failures).retry(Schedule::recurs(k)));

        prop_assert_eq!(exit, Exit::Success(failures + 1));
        prop_assert_eq!(attempts.load(Ordering::SeqCst), failures + 1);
    }

    #[test]
    fn prop_repeat_runs_k_plus_one_times(k in 0u32..50) {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = runs.clone();
        let effect: Effect<u32> = Effect::sync(move || counter.fetch_add(1, Ordering::SeqCst) + 1);

        prop_assert_eq!(run_sync(effect.repeat(Schedule::recurs(k))), Exit::Success(k + 1));
    }

    #[test]
    fn prop_recurs_yields_k_zero_delays(k in 0u32..200) {
        let delays = Schedule::recurs(k).delays(1_000);
        prop_assert_eq!(delays.len(), k as usize);
        prop_assert!(delays.iter().all(|d| d.is_zero()));
    }

    #[test]
    fn prop_union_continues_while_either_does(a in 0u32..50, b in 0u32..50) {
        let schedule = Schedule::recurs(a).union(Schedule::recurs(b));
        prop_assert_eq!(schedule.delays(1_000).len(), a.max(b) as usize);
    }

    #[test]
    fn prop_intersect_continues_while_both_do(a in 0u32..50, b in 0u32..50) {
        let schedule = Schedule::recurs(a).intersect(Schedule::recurs(b));
        prop_assert_eq!(schedule.delays(1_000).len(), a.min(b) as usize);
    }

    #[test]
    fn prop_union_takes_shorter_delay(short in 1u64..100, extra in 0u64..100, k in 1u32..20) {
        let fast = Schedule::spaced(Duration::from_millis(short));
        let slow = Schedule::spaced(Duration::from_millis(short + extra));
        let delays = fast.union(slow).with_max_retries(k).delays(1_000);

        prop_assert_eq!(delays.len(), k as usize);
        prop_assert!(delays.iter().all(|d| *d == Duration::from_millis(short)));
    }

    #[test]
    fn prop_intersect_takes_longer_delay(short in 1u64..100, extra in 0u64..100, k in 1u32..20) {
        let fast = Schedule::spaced(Duration::from_millis(short));
        let slow = Schedule::spaced(Duration::from_millis(short + extra));
        let delays = fast.intersect(slow).with_max_retries(k).delays(1_000);

        prop_assert!(delays.iter().all(|d| *d == Duration::from_millis(short + extra)));
    }

    #[test]
    fn prop_exponential_is_non_decreasing(base in 1u64..1_000, n in 1usize..20) {
        let delays = Schedule::exponential(Duration::from_millis(base)).delays(n);

        prop_assert_eq!(delays.len(), n);
        prop_assert_eq!(delays[0], Duration::from_millis(base));
        prop_assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn prop_max_delay_caps_every_delay(base in 1u64..100, cap in 1u64..1_000) {
        let cap = Duration::from_millis(cap);
        let delays = Schedule::exponential(Duration::from_millis(base))
            .with_max_delay(cap)
            .delays(40);

        prop_assert_eq!(delays.len(), 40);
        prop_assert!(delays.iter().all(|d| *d <= cap));
    }

    #[test]
    fn prop_bounded_schedules_stop(k in 0u32..100) {
        let schedule = Schedule::fibonacci(Duration::from_millis(1)).with_max_retries(k);
        prop_assert!(schedule.is_bounded());
        prop_assert_eq!(schedule.delays(10_000).len(), k as usize);
    }
}
