//! Integration tests for the runtime entry points.

use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::oneshot;
use undertow::{
    assert_die, assert_success, run_async, run_exit, run_promise, run_sync, service_tag, Cause,
    Context, DefectKind, Effect, Exit, Layer, Runtime, RuntimeConfig,
};

service_tag!(Greeting => String);
service_tag!(Punctuation => char);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

#[test]
fn run_sync_returns_exit() {
    let effect: Effect<i32, String> = Effect::sync(|| 6 * 7);
    assert_eq!(run_sync(effect), Exit::Success(42));
}

#[test]
fn runtime_context_is_visible_to_effects() {
    let runtime = Runtime::with_context(Context::single::<Greeting>("hello".to_string()));
    let effect: Effect<String> = Effect::service::<Greeting>().map(|g| format!("{}, world", g));

    assert_success!(runtime.run_sync(effect), "hello, world".to_string());
}

#[test]
fn provided_service_shadows_runtime_context() {
    let runtime = Runtime::with_context(Context::single::<Greeting>("outer".to_string()));
    let effect: Effect<String> =
        Effect::service::<Greeting>().provide_service::<Greeting>("inner".to_string());

    assert_success!(runtime.run_sync(effect), "inner".to_string());
}

#[test]
fn repeated_runs_leave_runtime_context_unchanged() {
    let ctx = Context::single::<Greeting>("outer".to_string());
    let runtime = Runtime::with_context(ctx.clone());

    let inner: Effect<String> = Effect::service::<Greeting>()
        .provide_service::<Greeting>("inner".to_string());
    let program: Effect<String> = inner
        .zip_with(Effect::service::<Greeting>(), |inner, outer| format!("{}/{}", inner, outer))
        .zip_with(Effect::service::<Punctuation>(), |s, p| format!("{}{}", s, p))
        .provide_infallible(Layer::succeed::<Punctuation>('!'));

    let first = runtime.run_sync(program.clone());
    let second = runtime.run_sync(program);

    assert_eq!(first, Exit::Success("inner/outer!".to_string()));
    assert_eq!(first, second);
    assert!(runtime.context().ptr_eq(&ctx));
    assert_eq!(runtime.context().len(), 1);
    assert_eq!(runtime.context().get::<Greeting>(), Some("outer".to_string()));
    assert_eq!(runtime.context().get::<Punctuation>(), None);
}

#[test]
fn sync_run_blocks_on_sleep() {
    let effect: Effect<()> = Effect::sleep(Duration::from_millis(20));
    let start = std::time::Instant::now();

    assert_success!(run_sync(effect));
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn sync_run_skips_sleep_when_delays_disabled() {
    let effect: Effect<()> = Effect::sleep(Duration::from_secs(3600));
    let runtime = Runtime::new().config(RuntimeConfig::new().honor_delays(false));

    assert_success!(runtime.run_sync(effect));
}

#[tokio::test]
async fn run_promise_resolves_value_or_cause() {
    let ok: Effect<i32, String> = Effect::promise(|| async { 7 });
    assert_eq!(run_promise(ok).await, Ok(7));

    let failed: Effect<i32, String> = Effect::fail("nope".to_string());
    assert_eq!(run_promise(failed).await, Err(Cause::Fail("nope".to_string())));

    let died: Effect<i32, String> = Effect::die("bug");
    let cause = run_promise(died).await.unwrap_err();
    assert_eq!(cause.defect().map(|d| d.message()), Some("bug"));
}

#[tokio::test]
async fn run_exit_can_be_spawned() {
    let effect: Effect<u64> = Effect::sleep(Duration::from_millis(5)).as_value(3);
    let task = tokio::spawn(run_exit(effect));
    assert_eq!(task.await.unwrap(), Exit::Success(3));
}

#[tokio::test]
async fn run_async_delivers_outcome_to_callback() {
    init_tracing();
    let (tx, rx) = oneshot::channel();
    let effect: Effect<String, String> =
        Effect::promise(|| async { "from fiber".to_string() });

    let handle = run_async(effect, move |exit| {
        let _ = tx.send(exit);
    });

    assert_eq!(rx.await.unwrap(), Exit::Success("from fiber".to_string()));
    handle.join().await;
}

#[tokio::test]
async fn cancel_reports_interruption_once() {
    init_tracing();
    let (tx, rx) = oneshot::channel();
    let effect: Effect<()> = Effect::sleep(Duration::from_secs(3600));

    let handle = run_async(effect, move |exit| {
        let _ = tx.send(exit);
    });
    handle.cancel();
    handle.cancel();

    assert_die!(rx.await.unwrap(), DefectKind::Interrupted);
    handle.join().await;
}

#[tokio::test]
async fn cancel_after_completion_does_nothing() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let effect: Effect<i32> = Effect::succeed(1);

    let handle = run_async(effect, move |exit| {
        let _ = tx.send(exit);
    });
    assert_eq!(rx.recv().await, Some(Exit::Success(1)));

    handle.cancel();
    assert!(handle.is_finished() || rx.recv().await.is_none());
}

#[tokio::test]
async fn cancelled_fiber_drops_pending_resume() {
    init_tracing();
    let (tx, rx) = mpsc::channel();
    let effect: Effect<i32, String> = Effect::async_effect(move |resume| {
        let _ = tx.send(resume);
    });

    let handle = run_async(effect, |_| {});
    let resume = tokio::task::spawn_blocking(move || rx.recv().unwrap())
        .await
        .unwrap();
    assert!(!resume.is_canceled());

    handle.cancel();
    handle.join().await;
    assert!(resume.is_canceled());
}

#[test]
fn run_async_without_tokio_dies_immediately() {
    let (tx, rx) = mpsc::channel();
    let effect: Effect<i32> = Effect::succeed(1);

    let handle = run_async(effect, move |exit| {
        let _ = tx.send(exit);
    });

    assert!(handle.is_finished());
    assert_die!(rx.recv().unwrap(), DefectKind::AsyncInSyncRun);
}

#[test]
fn blocking_async_from_sync_code() {
    let effect: Effect<i32, String> = Effect::promise(|| async { 5 }).map(|x| x * 2);
    assert_eq!(tokio_test::block_on(run_exit(effect)), Exit::Success(10));
}
