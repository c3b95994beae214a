//! Service tags and the `Context` registry
//!
//! A [`Tag`] is a zero-sized type that acts both as the lookup key for a
//! service and as a witness of the service's type. A [`Context`] maps tags to
//! service instances.
//!
//! Contexts are immutable: every `add` or `merge` returns a new context and
//! leaves the original untouched, so a context handed to the runtime can be
//! shared by concurrently running effects without locking.
//!
//! # Examples
//!
//! ```
//! use undertow::context::{Context, Tag};
//!
//! #[derive(Clone)]
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! struct GreeterTag;
//! impl Tag for GreeterTag {
//!     type Service = Greeter;
//!     const NAME: &'static str = "Greeter";
//! }
//!
//! let ctx = Context::empty().add::<GreeterTag>(Greeter { greeting: "hello".into() });
//! assert_eq!(ctx.get::<GreeterTag>().map(|g| g.greeting), Some("hello".to_string()));
//! ```
//!
//! The [`service_tag!`](crate::service_tag) macro writes the tag boilerplate:
//!
//! ```
//! use undertow::service_tag;
//! use undertow::context::Context;
//!
//! service_tag!(pub Port => u16);
//!
//! let ctx = Context::empty().add::<Port>(8080);
//! assert_eq!(ctx.get::<Port>(), Some(8080));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A compile-time identifier bound to a service shape.
pub trait Tag: 'static {
    /// The service stored under this tag.
    type Service: Clone + Send + Sync + 'static;

    /// Human-readable name used in diagnostics.
    const NAME: &'static str;

    /// The runtime key for this tag.
    fn key() -> ServiceKey {
        ServiceKey::of::<Self>()
    }
}

/// Runtime identity of a [`Tag`].
///
/// Keys compare by the tag's `TypeId`; the name is carried for messages only.
#[derive(Clone, Copy)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    /// The key of tag `T`.
    pub fn of<T: Tag + ?Sized>() -> Self {
        ServiceKey {
            id: TypeId::of::<T>(),
            name: T::NAME,
        }
    }

    /// The tag name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceKey({})", self.name)
    }
}

pub(crate) type ServiceBox = Arc<dyn Any + Send + Sync>;

/// An immutable registry of services keyed by [`Tag`].
#[derive(Clone, Default)]
pub struct Context {
    services: Arc<HashMap<ServiceKey, ServiceBox>>,
}

impl Context {
    /// A context with no services.
    pub fn empty() -> Self {
        Context::default()
    }

    /// A context holding a single service.
    pub fn single<T: Tag>(service: T::Service) -> Self {
        Context::empty().add::<T>(service)
    }

    /// Return a new context that also holds `service` under `T`.
    ///
    /// An existing entry for `T` is replaced in the returned context only.
    pub fn add<T: Tag>(&self, service: T::Service) -> Self {
        self.insert_erased(T::key(), Arc::new(service))
    }

    pub(crate) fn insert_erased(&self, key: ServiceKey, service: ServiceBox) -> Self {
        let mut services = (*self.services).clone();
        services.insert(key, service);
        Context {
            services: Arc::new(services),
        }
    }

    /// Look up the service registered under `T`.
    pub fn get<T: Tag>(&self) -> Option<T::Service> {
        self.services
            .get(&T::key())
            .and_then(|service| service.downcast_ref::<T::Service>())
            .cloned()
    }

    /// Returns `true` if a service is registered under `T`.
    pub fn contains<T: Tag>(&self) -> bool {
        self.contains_key(&T::key())
    }

    /// Returns `true` if a service is registered under `key`.
    pub fn contains_key(&self, key: &ServiceKey) -> bool {
        self.services.contains_key(key)
    }

    /// All keys present in this context.
    pub fn keys(&self) -> impl Iterator<Item = ServiceKey> + '_ {
        self.services.keys().copied()
    }

    /// Number of services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if no services are registered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Return a context holding both sets of services. `other` wins on conflicts.
    pub fn merge(&self, other: &Context) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut services = (*self.services).clone();
        for (key, service) in other.services.iter() {
            services.insert(*key, service.clone());
        }
        Context {
            services: Arc::new(services),
        }
    }

    /// Returns `true` if both handles point at the same underlying registry.
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.services, &other.services)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&'static str> = self.keys().map(|k| k.name()).collect();
        names.sort_unstable();
        f.debug_struct("Context").field("services", &names).finish()
    }
}

/// Declare a zero-sized [`Tag`] type for a service.
///
/// ```
/// use undertow::service_tag;
///
/// #[derive(Clone)]
/// pub struct Clock;
///
/// service_tag!(
///     /// Wall clock access.
///     pub ClockTag => Clock
/// );
/// ```
#[macro_export]
macro_rules! service_tag {
    ($(#[$meta:meta])* $vis:vis $name:ident => $service:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis struct $name;

        impl $crate::context::Tag for $name {
            type Service = $service;
            const NAME: &'static str = stringify!($name);
        }
    };
}
