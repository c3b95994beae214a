//! Fiber handles and async resume handles.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use futures::channel::oneshot;
use tokio::task::JoinHandle;

use crate::effect::node::{erase_exit, Resumed};
use crate::effect::Effect;
use crate::exit::{Defect, Exit};

pub(crate) type Callback<A, E> = Box<dyn FnOnce(Exit<A, E>) + Send>;
pub(crate) type CallbackSlot<A, E> = Arc<Mutex<Option<Callback<A, E>>>>;

/// Invoke the stored callback if it has not run yet.
pub(crate) fn deliver<A, E>(slot: &CallbackSlot<A, E>, exit: Exit<A, E>) {
    let callback = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(callback) = callback {
        callback(exit);
    }
}

/// A running effect started by [`run_async`](crate::run_async).
///
/// Dropping the handle does not stop the fiber.
pub struct FiberHandle {
    task: Option<JoinHandle<()>>,
    interrupt: Arc<dyn Fn() + Send + Sync>,
}

impl FiberHandle {
    pub(crate) fn spawned(task: JoinHandle<()>, interrupt: impl Fn() + Send + Sync + 'static) -> Self {
        FiberHandle {
            task: Some(task),
            interrupt: Arc::new(interrupt),
        }
    }

    /// A handle for a fiber that completed before it could start.
    pub(crate) fn completed() -> Self {
        FiberHandle {
            task: None,
            interrupt: Arc::new(|| {}),
        }
    }

    /// Interrupt the fiber.
    ///
    /// If the fiber has not completed yet, its callback is invoked with a
    /// [`DefectKind::Interrupted`](crate::DefectKind::Interrupted) defect.
    /// Cancelling a finished fiber does nothing.
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
        (self.interrupt)();
    }

    /// Returns `true` once the fiber's task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the fiber's task to stop.
    pub async fn join(self) {
        if let Some(task) = self.task {
            // An aborted task reports a cancellation error; the callback has
            // already seen the interruption.
            let _ = task.await;
        }
    }
}

impl fmt::Debug for FiberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiberHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Completes an [`Effect::async_effect`] from outside the runtime.
///
/// Every method consumes the handle, so an effect can be resumed at most
/// once.
pub struct Resume<A, E> {
    tx: oneshot::Sender<Resumed>,
    _marker: PhantomData<fn(A, E)>,
}

impl<A, E> Resume<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn new(tx: oneshot::Sender<Resumed>) -> Self {
        Resume {
            tx,
            _marker: PhantomData,
        }
    }

    /// Complete with a value.
    pub fn succeed(self, value: A) {
        self.complete(Exit::Success(value));
    }

    /// Complete with an expected failure.
    pub fn fail(self, error: E) {
        self.complete(Exit::Fail(error));
    }

    /// Complete with a defect.
    pub fn die(self, defect: impl Into<Defect>) {
        self.complete(Exit::Die(defect.into()));
    }

    /// Complete with an outcome.
    pub fn complete(self, exit: Exit<A, E>) {
        self.send(Resumed::Exit(erase_exit(exit)));
    }

    /// Continue by running `effect` in the suspended fiber.
    pub fn resume(self, effect: Effect<A, E>) {
        self.send(Resumed::Effect(effect.into_node()));
    }

    /// Returns `true` if the waiting fiber is gone.
    pub fn is_canceled(&self) -> bool {
        self.tx.is_canceled()
    }

    fn send(self, resumed: Resumed) {
        if self.tx.send(resumed).is_err() {
            tracing::debug!("resumed an async effect after its fiber stopped");
        }
    }
}

impl<A, E> fmt::Debug for Resume<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resume")
            .field("canceled", &self.tx.is_canceled())
            .finish()
    }
}
