//! Identifiers used as keys for every registration and resolution. A [ServiceId] names a
//! registrable capability: a type, optionally qualified by a [ServiceKey].

use crate::scan::AssemblyRef;
use std::any::{type_name, TypeId};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// Runtime handle of a type - either a concrete implementation or a `dyn Trait` capability.
/// Equality and hashing only consider the [TypeId]; the name is carried for diagnostics and
/// naming conventions.
#[derive(Clone, Copy, Debug)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
}

impl TypeRef {
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type name, as reported by [type_name].
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without module path, generic arguments, `dyn` prefix or additional bounds, e.g.
    /// `OrderService` for `dyn app::orders::OrderService + Send + Sync`.
    pub fn simple_name(&self) -> &'static str {
        let name = self.name.strip_prefix("dyn ").unwrap_or(self.name);
        let name = name.split(" + ").next().unwrap_or(name);
        let name = name.find('<').map(|index| &name[..index]).unwrap_or(name);
        name.rsplit("::").next().unwrap_or(name)
    }

    /// The crate this type is defined in.
    pub fn assembly(&self) -> AssemblyRef {
        let name = self.name.strip_prefix("dyn ").unwrap_or(self.name);
        AssemblyRef::new(name.split("::").next().unwrap_or(name))
    }
}

impl PartialEq for TypeRef {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Key distinguishing multiple registrations of the same capability type.
#[derive(Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum ServiceKey {
    Name(Cow<'static, str>),
    Index(i64),
}

impl ServiceKey {
    /// Keys have to carry a value - an empty name is considered a missing key.
    pub fn is_empty(&self) -> bool {
        matches!(self, ServiceKey::Name(name) if name.is_empty())
    }
}

impl From<&'static str> for ServiceKey {
    fn from(value: &'static str) -> Self {
        ServiceKey::Name(Cow::Borrowed(value))
    }
}

impl From<String> for ServiceKey {
    fn from(value: String) -> Self {
        ServiceKey::Name(Cow::Owned(value))
    }
}

impl From<i64> for ServiceKey {
    fn from(value: i64) -> Self {
        ServiceKey::Index(value)
    }
}

impl Display for ServiceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceKey::Name(name) => f.write_str(name),
            ServiceKey::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Capability identifier: two identifiers are equal when their types match and either both have
/// no key, or both keys are equal.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ServiceId {
    service_type: TypeRef,
    key: Option<ServiceKey>,
}

impl ServiceId {
    #[inline]
    pub fn new(service_type: TypeRef) -> Self {
        Self {
            service_type,
            key: None,
        }
    }

    #[inline]
    pub fn with_key(key: ServiceKey, service_type: TypeRef) -> Self {
        Self {
            service_type,
            key: Some(key),
        }
    }

    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeRef::of::<T>())
    }

    #[inline]
    pub fn keyed<T: ?Sized + 'static>(key: impl Into<ServiceKey>) -> Self {
        Self::with_key(key.into(), TypeRef::of::<T>())
    }

    #[inline]
    pub fn service_type(&self) -> TypeRef {
        self.service_type
    }

    #[inline]
    pub fn key(&self) -> Option<&ServiceKey> {
        self.key.as_ref()
    }

    /// Identifier of another type registered under the same key as this one.
    #[inline]
    pub fn sibling(&self, service_type: TypeRef) -> Self {
        Self {
            service_type,
            key: self.key.clone(),
        }
    }
}

impl Display for ServiceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{} [{}]", self.service_type, key),
            None => write!(f, "{}", self.service_type),
        }
    }
}
