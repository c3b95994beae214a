//! Generator-style composition.
//!
//! [`Effect::gen`] runs an `async` block with a [`Gen`] handle. Each
//! `cx.bind(effect).await?` runs a sub-effect in the current context and
//! hands back its value; a failure or defect leaves the block through `?` as a
//! [`Halt`] and becomes the outcome of the whole effect.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::{Context, Tag};
use crate::exit::{Cause, Defect, Exit};
use crate::runtime::interpreter::{run_node, Settings};

use super::node::{downcast, Node, RawExit, Value};
use super::Effect;

/// Where a generator body runs: the context and run mode of its fiber.
#[derive(Clone)]
pub(crate) struct GenScope {
    pub(crate) env: Context,
    pub(crate) settings: Settings,
}

/// Handle passed to a generator body.
pub struct Gen<E> {
    scope: GenScope,
    _marker: PhantomData<fn() -> E>,
}

impl<E> fmt::Debug for Gen<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gen").field("context", &self.scope.env).finish()
    }
}

impl<E: Send + 'static> Gen<E> {
    /// Run `effect` and return its value, or a [`Halt`] to propagate with `?`.
    pub async fn bind<A: Send + 'static>(&self, effect: Effect<A, E>) -> Result<A, Halt<E>> {
        match run_node(effect.into_node(), self.scope.env.clone(), self.scope.settings).await {
            Exit::Success(value) => downcast::<A>(value).map_err(Halt::die),
            Exit::Fail(error) => Err(match downcast::<E>(error) {
                Ok(e) => Halt::fail(e),
                Err(defect) => Halt::die(defect),
            }),
            Exit::Die(defect) => Err(Halt::die(defect)),
        }
    }

    /// Read a service from the running context.
    pub fn service<T: Tag>(&self) -> Result<T::Service, Halt<E>> {
        self.scope
            .env
            .get::<T>()
            .ok_or_else(|| Halt::die(Defect::missing_service(T::NAME)))
    }

    /// The running context.
    pub fn context(&self) -> &Context {
        &self.scope.env
    }
}

/// Early exit from a generator body.
#[derive(Debug, Clone, PartialEq)]
pub struct Halt<E> {
    cause: Cause<E>,
}

impl<E> Halt<E> {
    /// Stop with an expected failure.
    pub fn fail(error: E) -> Self {
        Halt {
            cause: Cause::Fail(error),
        }
    }

    /// Stop with a defect.
    pub fn die(defect: impl Into<Defect>) -> Self {
        Halt {
            cause: Cause::Die(defect.into()),
        }
    }

    /// The reason for stopping.
    pub fn cause(&self) -> &Cause<E> {
        &self.cause
    }

    /// Consume the halt, returning its cause.
    pub fn into_cause(self) -> Cause<E> {
        self.cause
    }
}

impl<E> From<E> for Halt<E> {
    fn from(error: E) -> Self {
        Halt::fail(error)
    }
}

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Build an effect from an `async` body with access to a [`Gen`] handle.
    ///
    /// The body is invoked anew on every run. A panic inside it becomes a
    /// defect.
    pub fn gen<F, Fut>(body: F) -> Self
    where
        F: Fn(Gen<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<A, Halt<E>>> + Send + 'static,
    {
        Effect::from_node(Arc::new(Node::Gen(Arc::new(move |scope: GenScope| {
            let fut = body(Gen {
                scope,
                _marker: PhantomData,
            });
            Box::pin(async move {
                let exit: RawExit = match fut.await {
                    Ok(a) => Exit::Success(Box::new(a) as Value),
                    Err(halt) => match halt.cause {
                        Cause::Fail(e) => Exit::Fail(Box::new(e)),
                        Cause::Die(defect) => Exit::Die(defect),
                    },
                };
                exit
            })
        }))))
    }
}
