//! Resolution plans for constructor and method parameters.

use crate::container::Container;
use crate::error::{Error, Result};
use crate::instance::{Arguments, Instance};
use crate::introspect::{ParamList, ParameterType, TypeDescriptor};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

/// The callable a signature belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Callable {
  Constructor,
  Method(String),
}

/// How one parameter gets its value.
#[derive(Debug, Clone)]
pub enum Slot {
  /// Resolve this service identifier through the container.
  Service(String),
  /// Use this literal default.
  Default(Instance),
  /// Nothing known; the caller has to supply it.
  Required,
}

/// The memoized resolution plan of one constructor or method, in
/// declaration order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSignature {
  slots: Vec<(String, Slot)>,
}

impl ResolvedSignature {
  fn plan(params: &ParamList) -> Self {
    let slots = params
      .iter()
      .map(|param| {
        let slot = match &param.ty {
          ParameterType::Service(service) => Slot::Service(service.clone()),
          ParameterType::Value { default: Some(value) } => Slot::Default(value.clone()),
          ParameterType::Value { default: None } => Slot::Required,
        };
        (param.name.clone(), slot)
      })
      .collect();
    Self { slots }
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Slot)> {
    self.slots.iter().map(|(name, slot)| (name.as_str(), slot))
  }

  pub fn slot(&self, name: &str) -> Option<&Slot> {
    self
      .slots
      .iter()
      .find(|(candidate, _)| candidate == name)
      .map(|(_, slot)| slot)
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }
}

#[derive(Default)]
pub(crate) struct DependencyResolver {
  signatures: DashMap<(String, Callable), Arc<ResolvedSignature>>,
}

impl DependencyResolver {
  /// Returns the plan for `callable` of `descriptor`, computing it on first use.
  pub(crate) fn resolve_signature(
    &self,
    descriptor: &TypeDescriptor,
    callable: &Callable,
  ) -> Result<Arc<ResolvedSignature>> {
    let key = (descriptor.name().to_owned(), callable.clone());
    if let Some(cached) = self.signatures.get(&key) {
      return Ok(cached.value().clone());
    }

    let params = match callable {
      Callable::Constructor => descriptor
        .constructor()
        .map(|ctor| ctor.params())
        .ok_or_else(|| Error::UnknownMethod {
          type_name: descriptor.name().to_owned(),
          method: "constructor".to_owned(),
        })?,
      Callable::Method(method) => descriptor
        .method(method)
        .map(|m| m.params())
        .ok_or_else(|| Error::UnknownMethod {
          type_name: descriptor.name().to_owned(),
          method: method.clone(),
        })?,
    };

    let signature = Arc::new(ResolvedSignature::plan(params));
    trace!(type_name = descriptor.name(), ?callable, ?signature, "resolved signature");
    Ok(self.signatures.entry(key).or_insert(signature).value().clone())
  }

  /// Supplies a value for every parameter of `signature`.
  ///
  /// Overrides win over the plan for parameters of the same name and are not
  /// resolved. An override naming no declared parameter is an error.
  pub(crate) fn instantiate_arguments(
    &self,
    container: &Container,
    consumer: &TypeDescriptor,
    signature: &ResolvedSignature,
    mut overrides: Arguments,
  ) -> Result<Arguments> {
    let mut args = Arguments::with_capacity(signature.len());

    for (name, slot) in signature.iter() {
      if let Some(value) = overrides.take(name) {
        args.insert(name, value);
        continue;
      }
      let value = match slot {
        Slot::Service(service) => Some(self.resolve_dependency(container, service, consumer)?),
        Slot::Default(value) => Some(value.clone()),
        Slot::Required => None,
      };
      args.insert(name, value);
    }

    match overrides.names().next() {
      Some(unexpected) => Err(Error::UnexpectedArgument(unexpected.to_owned())),
      None => Ok(args),
    }
  }

  fn resolve_dependency(
    &self,
    container: &Container,
    service: &str,
    consumer: &TypeDescriptor,
  ) -> Result<Instance> {
    let key = if container.is_abstract(service) {
      container.contextual_key(service, consumer)
    } else {
      service.to_owned()
    };
    trace!(consumer = consumer.name(), service, %key, "resolving dependency");
    container.make(&key)
  }

  pub(crate) fn forget(&self, type_name: &str) {
    self.signatures.retain(|(name, _), _| name != type_name);
  }

  pub(crate) fn is_cached(&self, type_name: &str, callable: &Callable) -> bool {
    self
      .signatures
      .contains_key(&(type_name.to_owned(), callable.clone()))
  }

  pub(crate) fn clear(&self) {
    self.signatures.clear();
  }
}
