//! Layers: recipes that build services
//!
//! A [`Layer`] describes how to produce one or more services, possibly from
//! other services. Layers compose:
//!
//! - [`Layer::provide`] feeds one layer's outputs into another's build
//! - [`Layer::provide_merge`] does the same and keeps both sets of outputs
//! - [`Layer::merge`] combines independent layers
//! - [`Layer::graph`] orders a set of layers by their declared requirements
//!
//! Building a layer is itself an effect ([`Layer::build`]). Within one build,
//! a layer reached through several paths runs once and every consumer sees
//! the same services. Separate builds share nothing.
//!
//! # Example
//!
//! ```
//! use undertow::{run_sync, service_tag, Effect, Exit, Layer};
//!
//! #[derive(Clone)]
//! pub struct Config {
//!     pub log_level: String,
//! }
//!
//! #[derive(Clone)]
//! pub struct Logger {
//!     pub prefix: String,
//! }
//!
//! service_tag!(ConfigTag => Config);
//! service_tag!(LoggerTag => Logger);
//!
//! let config: Layer = Layer::succeed::<ConfigTag>(Config { log_level: "INFO".into() });
//! let logger: Layer = Layer::effect::<LoggerTag>(
//!     Effect::service::<ConfigTag>().map(|c| Logger { prefix: format!("[{}]", c.log_level) }),
//! )
//! .depends_on::<ConfigTag>();
//!
//! let program: Effect<String> = Effect::service::<LoggerTag>().map(|l| l.prefix);
//! let exit = run_sync(program.provide(logger.provide(config)));
//! assert_eq!(exit, Exit::Success("[INFO]".to_string()));
//! ```

use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::{Context, ServiceBox, ServiceKey, Tag};
use crate::effect::node::{cont, Cont, Node, Step};
use crate::effect::Effect;
use crate::error::ConstructionError;

mod build;
mod graph;


#[derive(Clone)]
pub(crate) enum LayerKind {
    Build {
        key: ServiceKey,
        effect: Arc<Node>,
    },
    Context(Context),
    Provide {
        downstream: Arc<LayerInner>,
        upstream: Arc<LayerInner>,
        keep_upstream: bool,
    },
    Merge(Arc<LayerInner>, Arc<LayerInner>),
    Sequence(Vec<Arc<LayerInner>>),
    MapError {
        inner: Arc<LayerInner>,
        on_failure: Cont,
    },
}

pub(crate) struct LayerInner {
    pub(crate) kind: LayerKind,
    pub(crate) outputs: Vec<ServiceKey>,
    pub(crate) requires: Vec<ServiceKey>,
}

impl LayerInner {
    pub(crate) fn output_names(&self) -> Vec<&'static str> {
        self.outputs.iter().map(ServiceKey::name).collect()
    }
}

/// A recipe for building services, failing with `E`.
///
/// Cloning a layer is cheap; clones are the same layer for sharing purposes.
pub struct Layer<E = Infallible> {
    pub(crate) inner: Arc<LayerInner>,
    _marker: PhantomData<fn() -> E>,
}

fn union(left: &[ServiceKey], right: &[ServiceKey]) -> Vec<ServiceKey> {
    let mut keys = left.to_vec();
    for key in right {
        if !keys.contains(key) {
            keys.push(*key);
        }
    }
    keys
}

fn difference(keys: &[ServiceKey], remove: &[ServiceKey]) -> Vec<ServiceKey> {
    keys.iter().filter(|key| !remove.contains(key)).copied().collect()
}

impl<E: Send + 'static> Layer<E> {
    pub(crate) fn from_kind(kind: LayerKind, outputs: Vec<ServiceKey>, requires: Vec<ServiceKey>) -> Self {
        Layer {
            inner: Arc::new(LayerInner {
                kind,
                outputs,
                requires,
            }),
            _marker: PhantomData,
        }
    }

    /// Build the service for `T` by running `effect`.
    ///
    /// The effect may read other services; declare them with
    /// [`Layer::depends_on`] so that [`Layer::graph`] can order the build.
    pub fn effect<T: Tag>(effect: Effect<T::Service, E>) -> Self {
        let effect = effect.map(|service| Arc::new(service) as ServiceBox);
        Layer::from_kind(
            LayerKind::Build {
                key: T::key(),
                effect: effect.into_node(),
            },
            vec![T::key()],
            Vec::new(),
        )
    }

    /// Build the service for `T` by calling `f`.
    pub fn sync<T, F>(f: F) -> Self
    where
        T: Tag,
        F: Fn() -> T::Service + Send + Sync + 'static,
    {
        Layer::effect::<T>(Effect::sync(f))
    }

    /// A layer that always provides `service` under `T`.
    pub fn succeed<T: Tag>(service: T::Service) -> Self {
        Layer::context(Context::single::<T>(service))
    }

    /// A layer that provides every service in `context`.
    pub fn context(context: Context) -> Self {
        let outputs = context.keys().collect();
        Layer::from_kind(LayerKind::Context(context), outputs, Vec::new())
    }

    /// A layer that provides nothing.
    pub fn empty() -> Self {
        Layer::context(Context::empty())
    }

    /// Declare that building this layer reads the service for `T`.
    pub fn depends_on<T: Tag>(self) -> Self {
        let requires = union(&self.inner.requires, &[T::key()]);
        Layer::from_kind(self.inner.kind.clone(), self.inner.outputs.clone(), requires)
    }

    /// Feed the outputs of `upstream` into this layer's build.
    ///
    /// The result provides this layer's outputs only.
    pub fn provide(self, upstream: Layer<E>) -> Self {
        self.provide_with(upstream, false)
    }

    /// Like [`Layer::provide`], but the result also provides the outputs of
    /// `upstream`.
    pub fn provide_merge(self, upstream: Layer<E>) -> Self {
        self.provide_with(upstream, true)
    }

    fn provide_with(self, upstream: Layer<E>, keep_upstream: bool) -> Self {
        let outputs = if keep_upstream {
            union(&upstream.inner.outputs, &self.inner.outputs)
        } else {
            self.inner.outputs.clone()
        };
        let requires = union(
            &upstream.inner.requires,
            &difference(&self.inner.requires, &upstream.inner.outputs),
        );
        Layer::from_kind(
            LayerKind::Provide {
                downstream: self.inner,
                upstream: upstream.inner,
                keep_upstream,
            },
            outputs,
            requires,
        )
    }

    /// Combine two independent layers.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::DuplicateService`] if both layers provide
    /// the same service.
    pub fn merge(self, other: Layer<E>) -> Result<Self, ConstructionError> {
        if let Some(key) = self.inner.outputs.iter().find(|key| other.inner.outputs.contains(key)) {
            return Err(ConstructionError::DuplicateService {
                service: key.name(),
            });
        }
        let outputs = union(&self.inner.outputs, &other.inner.outputs);
        let requires = union(&self.inner.requires, &other.inner.requires);
        Ok(Layer::from_kind(
            LayerKind::Merge(self.inner, other.inner),
            outputs,
            requires,
        ))
    }

    /// Transform the error produced by a failed build.
    pub fn map_error<E2, F>(self, f: F) -> Layer<E2>
    where
        E2: Send + 'static,
        F: Fn(E) -> E2 + Send + Sync + 'static,
    {
        let outputs = self.inner.outputs.clone();
        let requires = self.inner.requires.clone();
        Layer::from_kind(
            LayerKind::MapError {
                inner: self.inner,
                on_failure: cont(move |e: E| Step::fail(f(e))),
            },
            outputs,
            requires,
        )
    }

    /// The services this layer provides.
    pub fn outputs(&self) -> &[ServiceKey] {
        &self.inner.outputs
    }

    /// The services this layer declares it needs.
    pub fn requirements(&self) -> &[ServiceKey] {
        &self.inner.requires
    }

    /// An effect that builds the layer and succeeds with its services.
    ///
    /// Every run of the returned effect is a separate build.
    pub fn build(&self) -> Effect<Context, E> {
        Effect::from_node(build::resolve(&self.inner))
    }
}

impl<E: Send + 'static> Default for Layer<E> {
    fn default() -> Self {
        Layer::empty()
    }
}

impl Layer<Infallible> {
    /// View a layer that cannot fail as one with error type `E2`.
    pub fn widen_error<E2: Send + 'static>(self) -> Layer<E2> {
        Layer {
            inner: self.inner,
            _marker: PhantomData,
        }
    }
}

impl<E> Clone for Layer<E> {
    fn clone(&self) -> Self {
        Layer {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Layer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let requires: Vec<&'static str> = self.inner.requires.iter().map(ServiceKey::name).collect();
        f.debug_struct("Layer")
            .field("outputs", &self.inner.output_names())
            .field("requires", &requires)
            .finish()
    }
}
