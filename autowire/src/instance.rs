//! Type-erased service instances and the name-keyed arguments handed to
//! constructors and methods.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

type AnyArc = Arc<dyn Any + Send + Sync>;

/// A live object produced by the container.
///
/// The object itself is stored behind an `Arc`, so clones of an `Instance`
/// refer to the same object. When the instance is served for an abstract
/// identifier it may also carry an interface view, which is the same object
/// upcast to a trait object.
#[derive(Clone)]
pub struct Instance {
  type_name: Arc<str>,
  value: AnyArc,
  view: Option<AnyArc>,
}

/// The value returned for a non-instantiable type when the container is
/// configured to hand back the type's identity instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeIdentity(pub String);

impl Instance {
  /// Wraps `value` and records `type_name` as its reported type.
  pub fn new<T: Any + Send + Sync>(type_name: impl Into<Arc<str>>, value: T) -> Self {
    Self::from_arc(type_name, Arc::new(value))
  }

  pub fn from_arc<T: Any + Send + Sync>(type_name: impl Into<Arc<str>>, value: Arc<T>) -> Self {
    Self {
      type_name: type_name.into(),
      value,
      view: None,
    }
  }

  /// Wraps a plain value, reporting its Rust type name.
  pub fn from_value<T: Any + Send + Sync>(value: T) -> Self {
    Self::new(type_name::<T>(), value)
  }

  /// Wraps an already upcast trait object. The trait object is both the value
  /// and the interface view of the instance.
  pub fn from_trait<I: ?Sized + Send + Sync + 'static>(
    type_name: impl Into<Arc<str>>,
    value: Arc<I>,
  ) -> Self {
    let erased: AnyArc = Arc::new(value);
    Self {
      type_name: type_name.into(),
      value: erased.clone(),
      view: Some(erased),
    }
  }

  pub(crate) fn identity(type_name: &str) -> Self {
    Self::new(type_name, TypeIdentity(type_name.to_owned()))
  }

  pub(crate) fn with_view(mut self, view: AnyArc) -> Self {
    self.view = Some(view);
    self
  }

  /// The reported type of the object.
  pub fn type_name(&self) -> &str {
    &self.type_name
  }

  pub fn is<T: Any>(&self) -> bool {
    self.value.is::<T>()
  }

  /// Returns the object as its concrete type.
  pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.value.clone().downcast::<T>().ok()
  }

  /// Returns the object as a trait object, looking at the interface view first.
  pub fn as_trait<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
    self
      .view
      .iter()
      .chain(std::iter::once(&self.value))
      .find_map(|candidate| candidate.downcast_ref::<Arc<I>>().cloned())
  }

  /// Reference equality of the underlying objects.
  pub fn ptr_eq(&self, other: &Instance) -> bool {
    Arc::ptr_eq(&self.value, &other.value)
  }
}

impl fmt::Debug for Instance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Instance")
      .field("type_name", &self.type_name)
      .field("has_view", &self.view.is_some())
      .finish()
  }
}

/// Name-keyed arguments for a constructor or method call, kept in
/// declaration order. A `None` entry is a required parameter nobody supplied.
#[derive(Clone, Debug, Default)]
pub struct Arguments {
  values: IndexMap<String, Option<Instance>>,
}

impl Arguments {
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn with_capacity(capacity: usize) -> Self {
    Self {
      values: IndexMap::with_capacity(capacity),
    }
  }

  /// Adds an instance under `name`.
  pub fn with(mut self, name: impl Into<String>, value: Instance) -> Self {
    self.values.insert(name.into(), Some(value));
    self
  }

  /// Adds a plain value under `name`.
  pub fn with_value<T: Any + Send + Sync>(self, name: impl Into<String>, value: T) -> Self {
    self.with(name, Instance::from_value(value))
  }

  pub fn insert(&mut self, name: impl Into<String>, value: Option<Instance>) {
    self.values.insert(name.into(), value);
  }

  pub(crate) fn take(&mut self, name: &str) -> Option<Option<Instance>> {
    self.values.shift_remove(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.values.contains_key(name)
  }

  /// The instance supplied for `name`, if any.
  pub fn get(&self, name: &str) -> Option<&Instance> {
    self.values.get(name).and_then(Option::as_ref)
  }

  fn present(&self, name: &str) -> Result<&Instance> {
    self
      .get(name)
      .ok_or_else(|| Error::MissingArgument(name.to_owned()))
  }

  /// Returns argument `name` as its concrete type.
  pub fn require<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
    self
      .present(name)?
      .downcast::<T>()
      .ok_or_else(|| Error::ArgumentType {
        name: name.to_owned(),
        expected: type_name::<T>(),
      })
  }

  /// Returns argument `name` as a trait object.
  pub fn require_trait<I: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<I>> {
    self
      .present(name)?
      .as_trait::<I>()
      .ok_or_else(|| Error::ArgumentType {
        name: name.to_owned(),
        expected: type_name::<I>(),
      })
  }

  /// Returns a copy of a plain value argument.
  pub fn value<T: Any + Send + Sync + Clone>(&self, name: &str) -> Result<T> {
    self.require::<T>(name).map(|v| (*v).clone())
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.values.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Instance>)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  trait Shape: Send + Sync {
    fn sides(&self) -> u32;
  }
  struct Square;
  impl Shape for Square {
    fn sides(&self) -> u32 {
      4
    }
  }

  #[test]
  fn test_clones_share_the_object() {
    let a = Instance::new("Square", Square);
    let b = a.clone();
    let c = Instance::new("Square", Square);

    assert!(a.ptr_eq(&b));
    assert!(!a.ptr_eq(&c));
    assert_eq!(a.type_name(), "Square");
  }

  #[test]
  fn test_view_keeps_concrete_access() {
    let square = Arc::new(Square);
    let view: Arc<dyn Shape> = square.clone();
    let instance = Instance::from_arc("Square", square).with_view(Arc::new(view));

    assert_eq!(instance.as_trait::<dyn Shape>().unwrap().sides(), 4);
    assert!(instance.downcast::<Square>().is_some());
  }

  #[test]
  fn test_trait_instance() {
    let instance = Instance::from_trait::<dyn Shape>("Square", Arc::new(Square));
    assert_eq!(instance.as_trait::<dyn Shape>().unwrap().sides(), 4);
    assert!(instance.downcast::<Square>().is_none());
  }

  #[test]
  fn test_argument_accessors() {
    let mut args = Arguments::new().with_value("port", 25u16);
    args.insert("host", None);

    assert_eq!(args.value::<u16>("port").unwrap(), 25);
    assert!(matches!(args.require::<u16>("host"), Err(Error::MissingArgument(n)) if n == "host"));
    assert!(matches!(args.value::<String>("port"), Err(Error::ArgumentType { .. })));
    assert_eq!(args.names().collect::<Vec<_>>(), vec!["port", "host"]);
  }
}
