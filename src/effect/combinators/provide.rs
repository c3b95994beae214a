//! Supplying services to an effect.

use std::convert::Infallible;
use std::sync::Arc;

use crate::context::{Context, Tag};
use crate::effect::node::{cont, Node, Step};
use crate::effect::Effect;
use crate::layer::Layer;

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Run the effect with `service` registered under `T`.
    ///
    /// The service is visible to this effect only. It shadows any entry for
    /// `T` in the outer context while the effect runs.
    pub fn provide_service<T: Tag>(self, service: T::Service) -> Self {
        self.provide_context(Context::single::<T>(service))
    }

    /// Run the effect with every service in `context` added to the outer
    /// context.
    pub fn provide_context(self, context: Context) -> Self {
        Effect::from_node(Arc::new(Node::Provide(self.node, context)))
    }

    /// Build `layer`, then run the effect with the services it produced.
    ///
    /// The layer is built once per run of the returned effect. A layer
    /// failure aborts the run and is converted into `E`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_sync, service_tag, Effect, Exit, Layer};
    ///
    /// service_tag!(Port => u16);
    ///
    /// let port: Layer = Layer::succeed::<Port>(8080);
    /// let program: Effect<u16> = Effect::service::<Port>().map(|p| p + 1);
    /// assert_eq!(run_sync(program.provide(port)), Exit::Success(8081));
    /// ```
    ///
    /// An inline `Layer::succeed` leaves the layer's error type open; annotate
    /// it (`Layer::<Infallible>::succeed`) or use [`Effect::provide_infallible`].
    pub fn provide<LE>(self, layer: Layer<LE>) -> Self
    where
        LE: Into<E> + Send + 'static,
    {
        let source = self.node;
        let built = layer.build().map_error(|e: LE| -> E { e.into() }).into_node();
        Effect::from_node(Node::flat_map(
            built,
            cont(move |context: Context| {
                Step::Next(Arc::new(Node::Provide(source.clone(), context)))
            }),
        ))
    }

    /// Run the effect with the services built by a layer that cannot fail.
    ///
    /// ```rust
    /// use undertow::{run_sync, service_tag, Effect, Exit, Layer};
    ///
    /// service_tag!(Port => u16);
    ///
    /// let program: Effect<u16, String> = Effect::service::<Port>();
    /// let exit = run_sync(program.provide_infallible(Layer::succeed::<Port>(80)));
    /// assert_eq!(exit, Exit::Success(80));
    /// ```
    pub fn provide_infallible(self, layer: Layer<Infallible>) -> Self {
        self.provide(layer.widen_error::<E>())
    }
}
