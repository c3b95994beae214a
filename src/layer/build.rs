//! Memoized layer construction.
//!
//! One resolution owns one memo table keyed by layer identity. A layer
//! reached twice within a resolution builds once; the second consumer gets
//! the stored context.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::context::{Context, ServiceBox};
use crate::effect::node::{cont, Node, Step};
use crate::exit::Exit;

use super::{LayerInner, LayerKind};

type Memo = Arc<Mutex<HashMap<usize, Context>>>;

fn identity(layer: &Arc<LayerInner>) -> usize {
    Arc::as_ptr(layer) as usize
}

fn lookup(memo: &Memo, id: usize) -> Option<Context> {
    memo.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .cloned()
}

fn store(memo: &Memo, id: usize, context: Context) {
    memo.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(id, context);
}

fn context_node(context: Context) -> Arc<Node> {
    Node::exit(move || Exit::Success(Box::new(context.clone())))
}

/// A node that builds `layer` with a fresh memo table on every run.
pub(super) fn resolve(layer: &Arc<LayerInner>) -> Arc<Node> {
    let layer = layer.clone();
    Arc::new(Node::Suspend(Arc::new(move || {
        let memo = Memo::default();
        shared(&layer, &memo)
    })))
}

fn shared(layer: &Arc<LayerInner>, memo: &Memo) -> Arc<Node> {
    let id = identity(layer);
    let layer = layer.clone();
    let memo = memo.clone();
    Arc::new(Node::Suspend(Arc::new(move || {
        if let Some(context) = lookup(&memo, id) {
            tracing::debug!(services = ?layer.output_names(), "layer memo hit");
            return context_node(context);
        }
        let table = memo.clone();
        Node::flat_map(
            fresh(&layer, &memo),
            cont(move |context: Context| {
                store(&table, id, context.clone());
                Step::succeed(context)
            }),
        )
    })))
}

fn fresh(layer: &Arc<LayerInner>, memo: &Memo) -> Arc<Node> {
    match &layer.kind {
        LayerKind::Build { key, effect } => {
            let key = *key;
            tracing::debug!(service = key.name(), "building layer");
            Node::flat_map(
                effect.clone(),
                cont(move |service: ServiceBox| {
                    Step::succeed(Context::empty().insert_erased(key, service))
                }),
            )
        }
        LayerKind::Context(context) => context_node(context.clone()),
        LayerKind::Provide {
            downstream,
            upstream,
            keep_upstream,
        } => {
            let downstream = downstream.clone();
            let keep_upstream = *keep_upstream;
            let table = memo.clone();
            Node::flat_map(
                shared(upstream, memo),
                cont(move |upstream: Context| {
                    let built = Arc::new(Node::Provide(
                        shared(&downstream, &table),
                        upstream.clone(),
                    ));
                    if !keep_upstream {
                        return Step::Next(built);
                    }
                    Step::Next(Node::flat_map(
                        built,
                        cont(move |downstream: Context| Step::succeed(upstream.merge(&downstream))),
                    ))
                }),
            )
        }
        LayerKind::Merge(left, right) => {
            let right = right.clone();
            let table = memo.clone();
            Node::flat_map(
                shared(left, memo),
                cont(move |left: Context| {
                    Step::Next(Node::flat_map(
                        shared(&right, &table),
                        cont(move |right: Context| Step::succeed(left.merge(&right))),
                    ))
                }),
            )
        }
        LayerKind::Sequence(layers) => {
            layers
                .iter()
                .fold(context_node(Context::empty()), |acc, layer| {
                    let layer = layer.clone();
                    let table = memo.clone();
                    Node::flat_map(
                        acc,
                        cont(move |built: Context| {
                            let next = Arc::new(Node::Provide(
                                shared(&layer, &table),
                                built.clone(),
                            ));
                            Step::Next(Node::flat_map(
                                next,
                                cont(move |output: Context| Step::succeed(built.merge(&output))),
                            ))
                        }),
                    )
                })
        }
        LayerKind::MapError { inner, on_failure } => {
            Node::on_failure(shared(inner, memo), on_failure.clone())
        }
    }
}
