//! Primitive effect constructors.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;

use crate::context::{Context, Tag};
use crate::exit::{Defect, Exit};
use crate::runtime::Resume;

use super::node::{Node, RawExit, Resumed, Value};
use super::Effect;

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// An effect that always succeeds with `value`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_sync, Effect, Exit};
    ///
    /// let effect: Effect<i32, String> = Effect::succeed(42);
    /// assert_eq!(run_sync(effect), Exit::Success(42));
    /// ```
    pub fn succeed(value: A) -> Self
    where
        A: Clone + Sync,
    {
        Effect::from_node(Node::exit(move || Exit::Success(Box::new(value.clone()))))
    }

    /// An effect that always fails with `error`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_sync, Effect, Exit};
    ///
    /// let effect: Effect<i32, &str> = Effect::fail("boom");
    /// assert_eq!(run_sync(effect), Exit::Fail("boom"));
    /// ```
    pub fn fail(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Effect::from_node(Node::exit(move || Exit::Fail(Box::new(error.clone()))))
    }

    /// An effect that always dies with the given defect.
    pub fn die(defect: impl Into<Defect>) -> Self {
        let defect = defect.into();
        Effect::from_node(Node::exit(move || Exit::Die(defect.clone())))
    }

    /// Run `f` each time the effect is executed.
    ///
    /// A panic inside `f` becomes a [`DefectKind::Panic`](crate::DefectKind::Panic)
    /// defect, never an expected failure.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Effect::from_node(Node::exit(move || Exit::Success(Box::new(f()))))
    }

    /// Succeed with the value produced by `f` on each run.
    ///
    /// Unlike [`Effect::succeed`], the value need not be `Clone`.
    pub fn succeed_with<F>(f: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Effect::sync(f)
    }

    /// Run a fallible computation, mapping its error through `catch`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_sync, Effect, Exit};
    ///
    /// let parse = Effect::try_sync(|| "12x".parse::<i32>(), |e| e.to_string());
    /// assert!(matches!(run_sync(parse), Exit::Fail(_)));
    /// ```
    pub fn try_sync<F, X, C>(f: F, catch: C) -> Self
    where
        F: Fn() -> Result<A, X> + Send + Sync + 'static,
        C: Fn(X) -> E + Send + Sync + 'static,
    {
        Effect::from_node(Node::exit(move || match f() {
            Ok(a) => Exit::Success(Box::new(a)),
            Err(x) => Exit::Fail(Box::new(catch(x))),
        }))
    }

    /// Lift a `Result` into an effect.
    pub fn from_result(result: Result<A, E>) -> Self
    where
        A: Clone + Sync,
        E: Clone + Sync,
    {
        match result {
            Ok(a) => Effect::succeed(a),
            Err(e) => Effect::fail(e),
        }
    }

    /// Lift an `Option`, failing with `on_none()` when it is empty.
    pub fn from_option<F>(option: Option<A>, on_none: F) -> Self
    where
        A: Clone + Sync,
        F: Fn() -> E + Send + Sync + 'static,
    {
        Effect::from_node(Node::exit(move || match &option {
            Some(a) => Exit::Success(Box::new(a.clone())),
            None => Exit::Fail(Box::new(on_none())),
        }))
    }

    /// Build the effect to run each time this one is executed.
    ///
    /// Use it to defer construction until run time, or to make an effect
    /// whose shape depends on mutable state.
    pub fn suspend<F>(f: F) -> Self
    where
        F: Fn() -> Effect<A, E> + Send + Sync + 'static,
    {
        Effect::from_node(Arc::new(Node::Suspend(Arc::new(move || f().into_node()))))
    }

    /// Bridge a callback-style API.
    ///
    /// `register` receives a [`Resume`] handle each time the effect runs.
    /// Consuming the handle completes the effect; dropping it unused makes the
    /// effect die with [`DefectKind::ResumeDropped`](crate::DefectKind::ResumeDropped).
    /// Async effects can only complete under an async run.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_promise, Effect};
    ///
    /// # tokio_test::block_on(async {
    /// let effect: Effect<i32, String> = Effect::async_effect(|resume| {
    ///     std::thread::spawn(move || resume.succeed(7));
    /// });
    /// assert_eq!(run_promise(effect).await, Ok(7));
    /// # });
    /// ```
    pub fn async_effect<F>(register: F) -> Self
    where
        F: Fn(Resume<A, E>) + Send + Sync + 'static,
    {
        Effect::from_node(Arc::new(Node::Async(Arc::new(
            move |tx: oneshot::Sender<Resumed>| register(Resume::new(tx)),
        ))))
    }

    /// Wait for a future created by `f` each time the effect runs.
    ///
    /// A panic while polling becomes a defect.
    pub fn promise<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = A> + Send + 'static,
    {
        Effect::from_node(Arc::new(Node::Promise(Arc::new(move || {
            let fut = f();
            Box::pin(async move { Exit::Success(Box::new(fut.await) as Value) })
        }))))
    }

    /// Wait for a fallible future, mapping its error through `catch`.
    pub fn try_promise<F, Fut, X, C>(f: F, catch: C) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<A, X>> + Send + 'static,
        C: Fn(X) -> E + Send + Sync + 'static,
    {
        let catch = Arc::new(catch);
        Effect::from_node(Arc::new(Node::Promise(Arc::new(move || {
            let fut = f();
            let catch = catch.clone();
            Box::pin(async move {
                let exit: RawExit = match fut.await {
                    Ok(a) => Exit::Success(Box::new(a)),
                    Err(x) => Exit::Fail(Box::new(catch(x))),
                };
                exit
            })
        }))))
    }

    /// Read the service registered under `T` from the running context.
    ///
    /// Dies with [`DefectKind::MissingService`](crate::DefectKind::MissingService)
    /// if nothing provided it.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_sync, service_tag, Effect, Exit};
    ///
    /// service_tag!(Greeting => String);
    ///
    /// let hello: Effect<String> = Effect::service::<Greeting>().map(|g| format!("{}!", g));
    /// let provided = hello.provide_service::<Greeting>("hi".to_string());
    /// assert_eq!(run_sync(provided), Exit::Success("hi!".to_string()));
    /// ```
    pub fn service<T>() -> Self
    where
        T: Tag<Service = A>,
    {
        Effect::from_node(Arc::new(Node::Service(
            T::key(),
            Arc::new(|ctx: &Context| ctx.get::<T>().map(|service| Box::new(service) as Value)),
        )))
    }
}

impl<E: Send + 'static> Effect<(), E> {
    /// Wait for `duration`.
    ///
    /// Under a sync run this blocks the calling thread when the runtime honors
    /// delays, and returns at once otherwise.
    pub fn sleep(duration: Duration) -> Self {
        Effect::from_node(Arc::new(Node::Sleep(duration)))
    }

    /// An effect that succeeds with `()`.
    pub fn unit_value() -> Self {
        Effect::succeed(())
    }
}
