//! Dependency-ordered layer sets.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::ServiceKey;
use crate::error::ConstructionError;

use super::{union, Layer, LayerInner, LayerKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Active,
    Done,
}

struct Resolver<'a> {
    layers: &'a [Arc<LayerInner>],
    providers: HashMap<ServiceKey, usize>,
    marks: Vec<Mark>,
    path: Vec<usize>,
    order: Vec<usize>,
}

fn label(layer: &LayerInner) -> &'static str {
    layer.outputs.first().map_or("<empty layer>", ServiceKey::name)
}

impl Resolver<'_> {
    fn visit(&mut self, index: usize) -> Result<(), ConstructionError> {
        match self.marks[index] {
            Mark::Done => return Ok(()),
            Mark::Active => {
                let start = self.path.iter().position(|&i| i == index).unwrap_or(0);
                let mut services: Vec<&'static str> = self.path[start..]
                    .iter()
                    .map(|&i| label(&self.layers[i]))
                    .collect();
                services.push(label(&self.layers[index]));
                return Err(ConstructionError::LayerCycle { services });
            }
            Mark::Unvisited => {}
        }

        self.marks[index] = Mark::Active;
        self.path.push(index);
        let layers = self.layers;
        for key in &layers[index].requires {
            if let Some(&provider) = self.providers.get(key) {
                self.visit(provider)?;
            }
        }
        self.path.pop();
        self.marks[index] = Mark::Done;
        self.order.push(index);
        Ok(())
    }
}

impl<E: Send + 'static> Layer<E> {
    /// Combine layers that may depend on each other.
    ///
    /// Each layer's declared requirements ([`Layer::depends_on`]) that another
    /// layer in the set provides are built first and fed into it.
    /// Requirements nobody in the set provides stay requirements of the
    /// result.
    ///
    /// # Errors
    ///
    /// - [`ConstructionError::DuplicateProvider`] if two layers provide the
    ///   same service
    /// - [`ConstructionError::LayerCycle`] if the requirements form a cycle
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_sync, service_tag, Effect, Exit, Layer};
    ///
    /// service_tag!(Base => u32);
    /// service_tag!(Doubled => u32);
    ///
    /// let doubled: Layer = Layer::effect::<Doubled>(Effect::service::<Base>().map(|b| b * 2))
    ///     .depends_on::<Base>();
    /// let base: Layer = Layer::succeed::<Base>(21);
    ///
    /// // Listed out of order on purpose.
    /// let app = Layer::graph([doubled, base]).unwrap();
    /// let program: Effect<u32> = Effect::service::<Doubled>();
    /// assert_eq!(run_sync(program.provide(app)), Exit::Success(42));
    /// ```
    pub fn graph<I>(layers: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = Layer<E>>,
    {
        let layers: Vec<Arc<LayerInner>> = layers.into_iter().map(|layer| layer.inner).collect();

        let mut providers = HashMap::new();
        for (index, layer) in layers.iter().enumerate() {
            for key in &layer.outputs {
                if providers.insert(*key, index).is_some() {
                    return Err(ConstructionError::DuplicateProvider {
                        service: key.name(),
                    });
                }
            }
        }

        let mut resolver = Resolver {
            layers: &layers,
            providers,
            marks: vec![Mark::Unvisited; layers.len()],
            path: Vec::new(),
            order: Vec::with_capacity(layers.len()),
        };
        for index in 0..layers.len() {
            resolver.visit(index)?;
        }

        let mut outputs = Vec::new();
        let mut requires = Vec::new();
        for layer in &layers {
            outputs = union(&outputs, &layer.outputs);
            let external: Vec<ServiceKey> = layer
                .requires
                .iter()
                .filter(|key| !resolver.providers.contains_key(*key))
                .copied()
                .collect();
            requires = union(&requires, &external);
        }

        let ordered = resolver
            .order
            .iter()
            .map(|&index| layers[index].clone())
            .collect();
        Ok(Layer::from_kind(LayerKind::Sequence(ordered), outputs, requires))
    }
}
