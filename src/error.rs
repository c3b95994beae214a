//! Construction-time errors
//!
//! These are reported by the function that builds the offending structure,
//! before any effect runs.

use std::fmt;

/// An invalid effect or layer structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// Two merged layers both produce the same service
    DuplicateService {
        /// Name of the duplicated tag
        service: &'static str,
    },
    /// Two layers in a graph both provide the same service
    DuplicateProvider {
        /// Name of the duplicated tag
        service: &'static str,
    },
    /// The layers of a graph depend on each other in a cycle
    LayerCycle {
        /// Services on the cycle, in dependency order
        services: Vec<&'static str>,
    },
    /// A combinator that needs at least one input received none
    EmptyInput {
        /// Name of the combinator
        combinator: &'static str,
    },
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructionError::DuplicateService { service } => {
                write!(f, "service {} is produced by both merged layers", service)
            }
            ConstructionError::DuplicateProvider { service } => {
                write!(f, "service {} has more than one provider in the graph", service)
            }
            ConstructionError::LayerCycle { services } => {
                write!(f, "layer dependency cycle: {}", services.join(" -> "))
            }
            ConstructionError::EmptyInput { combinator } => {
                write!(f, "{} requires at least one effect", combinator)
            }
        }
    }
}

impl std::error::Error for ConstructionError {}
