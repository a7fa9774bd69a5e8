//! Timing of parallel acquisition and cancellation under a paused clock.
//!
//! Every test runs with `start_paused = true`, so sleeps advance virtual
//! time instantly and the journal's timestamps are exact.

use std::time::Duration;

use sluice::testing::Journal;
use sluice::{assert_acquire_error, fail, from_async, pure, ExitCase, Resource};
use tokio::time::Instant;

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn sorted(mut events: Vec<String>) -> Vec<String> {
    events.sort();
    events
}

/// A resource whose acquire step takes `acquire` seconds and whose release
/// takes `release` seconds.
fn slow(journal: &Journal, name: &'static str, acquire: u64, release: u64) -> Resource<&'static str, String> {
    let (on_acquire, on_release) = (journal.clone(), journal.clone());
    Resource::make(
        from_async(move |_: &()| async move {
            tokio::time::sleep(secs(acquire)).await;
            on_acquire.record(format!("acquired {}", name));
            Ok::<_, String>(name)
        }),
        move |name| async move {
            on_release.record(format!("releasing {}", name));
            tokio::time::sleep(secs(release)).await;
            on_release.record(format!("released {}", name));
            Ok(())
        },
    )
}

/// A resource that waits `delay` seconds and then fails to acquire.
fn failing_after(delay: u64, message: &'static str) -> Resource<&'static str, String> {
    Resource::make(
        from_async(move |_: &()| async move {
            tokio::time::sleep(secs(delay)).await;
            Err::<&'static str, _>(message.to_string())
        }),
        |_| async { Ok(()) },
    )
}

// ============================================================================
// Concurrent acquisition and release
// ============================================================================

#[tokio::test(start_paused = true)]
async fn par_zip_acquires_and_releases_both_sides_at_once() {
    let journal = Journal::new();
    let both = slow(&journal, "a", 1, 1).par_zip(slow(&journal, "b", 1, 1));

    let result = both
        .use_(&(), |pair| {
            from_async(move |_: &()| async move {
                tokio::time::sleep(secs(1)).await;
                Ok::<_, String>(pair)
            })
        })
        .await;

    assert_eq!(result, Ok(("a", "b")));
    assert_eq!(sorted(journal.events_at(1)), vec!["acquired a", "acquired b"]);
    assert_eq!(sorted(journal.events_at(2)), vec!["releasing a", "releasing b"]);
    assert_eq!(sorted(journal.events_at(3)), vec!["released a", "released b"]);
    assert!(journal.events_at(4).is_empty());
}

#[tokio::test(start_paused = true)]
async fn par_zip_total_time_is_the_slowest_side() {
    let journal = Journal::new();
    let start = Instant::now();

    let all = slow(&journal, "a", 1, 0).par_zip3(slow(&journal, "b", 3, 0), slow(&journal, "c", 2, 0));
    let result = all.use_(&(), |triple| pure(triple)).await;

    assert_eq!(result, Ok(("a", "b", "c")));
    assert_eq!(start.elapsed(), secs(3));
    assert_eq!(journal.count("released"), 3);
}

// ============================================================================
// Asymmetric failure
// ============================================================================

#[tokio::test(start_paused = true)]
async fn failure_waits_for_uninterruptible_sibling_then_releases_both() {
    let journal = Journal::new();
    let start = Instant::now();

    let left = slow(&journal, "left", 3, 1);
    let right = slow(&journal, "right", 1, 1)
        .flat_map(|_| failing_after(1, "second acquisition failed"));

    let result = left.par_zip(right).use_(&(), |_| pure(())).await;

    assert_acquire_error!(result, "second acquisition failed".to_string());
    assert_eq!(journal.events_at(1), vec!["acquired right"]);
    assert!(journal.events_at(2).is_empty(), "left still acquiring at t=2");
    assert_eq!(journal.at("acquired left"), Some(secs(3)));
    assert_eq!(journal.at("releasing left"), Some(secs(3)));
    assert_eq!(journal.at("releasing right"), Some(secs(3)));
    assert_eq!(sorted(journal.events_at(4)), vec!["released left", "released right"]);
    assert_eq!(start.elapsed(), secs(4), "error surfaces after release completes");
}

#[tokio::test(start_paused = true)]
async fn failure_interrupts_interruptible_sibling() {
    let journal = Journal::new();
    let start = Instant::now();

    let left = journal.lifted_after::<String, ()>("left", secs(3));
    let right = slow(&journal, "right", 1, 1)
        .flat_map(|_| failing_after(1, "second acquisition failed"));

    let result = left.par_zip(right).use_(&(), |_| pure(())).await;

    assert_acquire_error!(result, "second acquisition failed".to_string());
    assert_eq!(journal.count("finish"), 0, "left never completes");
    assert_eq!(journal.at("releasing right"), Some(secs(2)));
    assert_eq!(start.elapsed(), secs(3));
}

// ============================================================================
// Cancelling `use_`
// ============================================================================

#[tokio::test(start_paused = true)]
async fn cancel_during_acquisition_waits_then_releases() {
    let journal = Journal::new();
    let resource = slow(&journal, "db", 3, 0);

    let outcome = tokio::time::timeout(secs(1), resource.use_(&(), |_| pure(()))).await;
    assert!(outcome.is_err(), "caller gave up at t=1");

    tokio::time::sleep(secs(5)).await;
    assert_eq!(journal.at("acquired db"), Some(secs(3)));
    assert_eq!(journal.at("released db"), Some(secs(3)));
}

#[tokio::test(start_paused = true)]
async fn aborting_the_caller_interrupts_lifted_acquisition() {
    let journal = Journal::new();
    let resource = journal.lifted_after::<String, ()>("warmup", secs(5));
    let handle = tokio::spawn(resource.use_(&(), |_| pure(())));

    tokio::time::sleep(secs(1)).await;
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    tokio::time::sleep(secs(10)).await;
    assert_eq!(journal.count("finish"), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_body_interrupts_and_releases() {
    let journal = Journal::new();
    let record = journal.clone();
    let resource: Resource<(), String> = Resource::make_case(pure(()), move |_, case: ExitCase| async move {
        record.record(format!("released after {}", case));
        Ok(())
    });

    let outcome = tokio::time::timeout(
        secs(2),
        resource.use_(&(), |_| {
            from_async(|_: &()| async {
                tokio::time::sleep(secs(10)).await;
                Ok::<_, String>(())
            })
        }),
    )
    .await;
    assert!(outcome.is_err());

    tokio::time::sleep(secs(1)).await;
    assert_eq!(journal.events(), vec!["released after canceled"]);
    assert_eq!(journal.at("released after canceled"), Some(secs(2)));
}

#[tokio::test(start_paused = true)]
async fn cancelled_parent_cancels_both_parallel_sides() {
    let journal = Journal::new();
    let both = slow(&journal, "made", 2, 0).par_zip(journal.lifted_after::<String, ()>("lifted", secs(5)));

    let outcome = tokio::time::timeout(secs(1), both.use_(&(), |_| pure(()))).await;
    assert!(outcome.is_err());

    tokio::time::sleep(secs(10)).await;
    assert_eq!(journal.at("released made"), Some(secs(2)));
    assert_eq!(journal.count("finish"), 0);
}

#[tokio::test(start_paused = true)]
async fn allocated_cancelled_while_acquiring_releases_in_background() {
    let journal = Journal::new();
    let resource = slow(&journal, "conn", 2, 0);

    let outcome = tokio::time::timeout(secs(1), resource.allocated(&())).await;
    assert!(outcome.is_err());

    tokio::time::sleep(secs(5)).await;
    assert_eq!(journal.at("acquired conn"), Some(secs(2)));
    assert_eq!(journal.at("released conn"), Some(secs(2)));
    assert_eq!(journal.count("released"), 1);
}

#[tokio::test(start_paused = true)]
async fn immediate_failure_never_starts_the_sibling_acquire() {
    let journal = Journal::new();
    let start = Instant::now();

    let refused: Resource<&'static str, String> =
        Resource::make(fail("boom".to_string()), |_| async { Ok(()) });
    let result = refused
        .par_zip(slow(&journal, "late", 3, 1))
        .use_(&(), |_| pure(()))
        .await;

    assert_acquire_error!(result, "boom".to_string());
    assert_eq!(start.elapsed(), secs(0));
    assert_eq!(journal.count("acquired"), 0);
}

#[tokio::test(start_paused = true)]
async fn interruptible_step_after_cancel_is_skipped() {
    let journal = Journal::new();
    let chain = slow(&journal, "first", 1, 0)
        .flat_map({
            let journal = journal.clone();
            move |_| journal.lifted_after::<String, ()>("second", secs(3))
        });

    let result = tokio::time::timeout(secs(2), chain.use_(&(), |_| pure(()))).await;
    assert!(result.is_err());

    tokio::time::sleep(secs(5)).await;
    assert_eq!(journal.count("finish"), 0);
    assert_eq!(journal.at("released first"), Some(secs(2)));
}

#[tokio::test]
async fn nested_parallel_failure_cancels_pending_side() {
    let journal = Journal::new();
    let both = journal
        .tracked::<String, ()>("a")
        .par_zip(Resource::eval(from_async(|_: &()| async {
            futures::future::pending::<()>().await;
            Ok::<(), String>(())
        })));
    let failing = failing_after(0, "boom").map(|_| ());

    // the failing side cancels the pending one, and its own error wins
    let result = both.map(|_| ()).par_zip(failing).use_(&(), |_| pure(())).await;
    assert_acquire_error!(result, "boom".to_string());
    assert_eq!(journal.released(), vec!["a"]);
}
