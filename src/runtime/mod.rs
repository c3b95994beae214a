//! Running effect descriptions.
//!
//! A [`Runtime`] pairs a default [`Context`] with a [`RuntimeConfig`]. The
//! free functions [`run_sync`], [`run_exit`], [`run_promise`] and
//! [`run_async`] use `Runtime::default()`.
//!
//! # Entry points
//!
//! | Entry point | Mode | Returns |
//! |-------------|------|---------|
//! | `run_sync` | sync | `Exit<A, E>` |
//! | `run_exit` | async | `Exit<A, E>` |
//! | `run_promise` | async | `Result<A, Cause<E>>` |
//! | `run_async` | async, spawned | [`FiberHandle`]; outcome via callback |
//!
//! A sync run that reaches an async callback, a promise, a timeout, or any
//! other node that can only complete later dies with
//! [`DefectKind::AsyncInSyncRun`](crate::DefectKind::AsyncInSyncRun).
//! Async runs need a tokio runtime with timers enabled.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tracing::Instrument;

use crate::context::Context;
use crate::effect::node::typed_exit;
use crate::effect::Effect;
use crate::exit::{Cause, Defect, DefectKind, Exit};

mod fiber;
pub(crate) mod interpreter;

pub use fiber::{FiberHandle, Resume};

use fiber::{deliver, Callback, CallbackSlot};
use interpreter::{run_blocking, run_node, Mode, Settings};

/// Runtime settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuntimeConfig {
    /// Wait out schedule delays and `sleep`. When `false`, every delay
    /// completes immediately.
    pub honor_delays: bool,
}

impl RuntimeConfig {
    /// The default configuration.
    pub fn new() -> Self {
        RuntimeConfig { honor_delays: true }
    }

    /// Set whether delays are honored.
    pub fn honor_delays(mut self, honor: bool) -> Self {
        self.honor_delays = honor;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig::new()
    }
}

/// Runs effects against a default context.
///
/// # Example
///
/// ```rust
/// use undertow::{service_tag, Context, Effect, Exit, Runtime};
///
/// service_tag!(Multiplier => i32);
///
/// let runtime = Runtime::with_context(Context::single::<Multiplier>(3));
/// let effect: Effect<i32> = Effect::service::<Multiplier>().map(|m| m * 14);
/// assert_eq!(runtime.run_sync(effect), Exit::Success(42));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Runtime {
    context: Context,
    config: RuntimeConfig,
}

impl Runtime {
    /// A runtime with an empty context and default configuration.
    pub fn new() -> Self {
        Runtime::default()
    }

    /// A runtime whose runs see `context`.
    pub fn with_context(context: Context) -> Self {
        Runtime {
            context,
            config: RuntimeConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// The default context.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The configuration.
    pub fn runtime_config(&self) -> RuntimeConfig {
        self.config
    }

    /// Run `effect` on the calling thread.
    pub fn run_sync<A, E>(&self, effect: Effect<A, E>) -> Exit<A, E>
    where
        A: Send + 'static,
        E: Send + 'static,
    {
        typed_exit(run_blocking(effect.into_node(), self.context.clone(), self.config))
    }

    /// Run `effect` asynchronously, returning its full outcome.
    ///
    /// The returned future owns everything it needs; it can be spawned.
    pub fn run_exit<A, E>(&self, effect: Effect<A, E>) -> impl Future<Output = Exit<A, E>> + Send + 'static
    where
        A: Send + 'static,
        E: Send + 'static,
    {
        let run = run_node(
            effect.into_node(),
            self.context.clone(),
            Settings::new(Mode::Async, self.config),
        );
        async move { typed_exit(run.await) }
    }

    /// Run `effect` asynchronously, resolving to its value or its cause.
    pub fn run_promise<A, E>(
        &self,
        effect: Effect<A, E>,
    ) -> impl Future<Output = Result<A, Cause<E>>> + Send + 'static
    where
        A: Send + 'static,
        E: Send + 'static,
    {
        let run = self.run_exit(effect);
        async move { run.await.into_result() }
    }

    /// Spawn `effect` on the current tokio runtime.
    ///
    /// `on_exit` is invoked exactly once: with the outcome, or with an
    /// `Interrupted` defect if the fiber is cancelled first. Outside a tokio
    /// runtime it is invoked immediately with an `AsyncInSyncRun` defect.
    pub fn run_async<A, E, F>(&self, effect: Effect<A, E>, on_exit: F) -> FiberHandle
    where
        A: Send + 'static,
        E: Send + 'static,
        F: FnOnce(Exit<A, E>) + Send + 'static,
    {
        let callback: Callback<A, E> = Box::new(on_exit);
        let slot: CallbackSlot<A, E> = Arc::new(Mutex::new(Some(callback)));

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                deliver(
                    &slot,
                    Exit::Die(Defect::with_kind(
                        DefectKind::AsyncInSyncRun,
                        "run_async requires a tokio runtime",
                    )),
                );
                return FiberHandle::completed();
            }
        };

        let run = self.run_exit(effect);
        let task_slot = slot.clone();
        let task = handle.spawn(
            async move {
                tracing::debug!("fiber started");
                let exit = run.await;
                tracing::debug!(success = exit.is_success(), "fiber completed");
                deliver(&task_slot, exit);
            }
            .instrument(tracing::debug_span!("fiber")),
        );
        FiberHandle::spawned(task, move || deliver(&slot, Exit::Die(Defect::interrupted())))
    }
}

/// Run `effect` on the calling thread with the default runtime.
///
/// # Example
///
/// ```rust
/// use undertow::{run_sync, Effect, Exit};
///
/// let effect: Effect<i32, String> = Effect::sync(|| 6 * 7);
/// assert_eq!(run_sync(effect), Exit::Success(42));
/// ```
pub fn run_sync<A, E>(effect: Effect<A, E>) -> Exit<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    Runtime::default().run_sync(effect)
}

/// Run `effect` asynchronously with the default runtime.
pub fn run_exit<A, E>(effect: Effect<A, E>) -> impl Future<Output = Exit<A, E>> + Send + 'static
where
    A: Send + 'static,
    E: Send + 'static,
{
    Runtime::default().run_exit(effect)
}

/// Run `effect` asynchronously with the default runtime, resolving to its
/// value or its cause.
///
/// ```rust
/// use undertow::{run_promise, Cause, Effect};
///
/// # tokio_test::block_on(async {
/// let effect: Effect<i32, String> = Effect::fail("nope".to_string());
/// assert_eq!(run_promise(effect).await, Err(Cause::Fail("nope".to_string())));
/// # });
/// ```
pub fn run_promise<A, E>(effect: Effect<A, E>) -> impl Future<Output = Result<A, Cause<E>>> + Send + 'static
where
    A: Send + 'static,
    E: Send + 'static,
{
    Runtime::default().run_promise(effect)
}

/// Spawn `effect` with the default runtime. See [`Runtime::run_async`].
pub fn run_async<A, E, F>(effect: Effect<A, E>, on_exit: F) -> FiberHandle
where
    A: Send + 'static,
    E: Send + 'static,
    F: FnOnce(Exit<A, E>) + Send + 'static,
{
    Runtime::default().run_async(effect, on_exit)
}
