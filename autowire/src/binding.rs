//! Producers registered for service identifiers.

use crate::container::Container;
use crate::error::Result;
use crate::instance::Instance;
use crate::keys::KeyMap;
use crate::reflection::ReflectionCache;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub(crate) type FactoryFn = Arc<dyn Fn(&Container) -> Result<Instance> + Send + Sync>;

/// What the container does to obtain a service.
#[derive(Clone)]
pub enum Producer {
  /// Called with the container every time a fresh instance is needed.
  Factory(FactoryFn),
  /// Handed out as-is.
  Instance(Instance),
  /// A type name that is constructed (or resolved, if it has its own binding).
  Type(String),
}

impl Producer {
  pub fn factory(factory: impl Fn(&Container) -> Result<Instance> + Send + Sync + 'static) -> Self {
    Producer::Factory(Arc::new(factory))
  }

  pub fn instance(instance: Instance) -> Self {
    Producer::Instance(instance)
  }

  pub fn type_name(name: impl Into<String>) -> Self {
    Producer::Type(name.into())
  }

  pub fn as_type_name(&self) -> Option<&str> {
    match self {
      Producer::Type(name) => Some(name),
      _ => None,
    }
  }
}

impl From<&str> for Producer {
  fn from(name: &str) -> Self {
    Producer::Type(name.to_owned())
  }
}

impl From<String> for Producer {
  fn from(name: String) -> Self {
    Producer::Type(name)
  }
}

impl From<Instance> for Producer {
  fn from(instance: Instance) -> Self {
    Producer::Instance(instance)
  }
}

impl fmt::Debug for Producer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Producer::Factory(_) => f.write_str("Factory(..)"),
      Producer::Instance(instance) => write!(f, "Instance({})", instance.type_name()),
      Producer::Type(name) => write!(f, "Type({name})"),
    }
  }
}

/// The composite key of a contextual override.
pub(crate) fn contextual_key(abstract_id: &str, consumer: &str) -> String {
  format!("{abstract_id}|{consumer}")
}

/// The abstract identifier a (possibly composite) key serves.
pub(crate) fn base_identifier(key: &str) -> &str {
  key.split_once('|').map_or(key, |(base, _)| base)
}

/// Bindings, contextual overrides and singleton flags.
#[derive(Default)]
pub(crate) struct BindingRegistry {
  bindings: IndexMap<String, Producer>,
  shared: HashSet<String>,
  last_binding: Vec<String>,
}

impl BindingRegistry {
  /// Registers `producer` for `identifier` and returns the identifier the
  /// producer ended up stored under.
  ///
  /// A key-style identifier (neither a known type nor an alias yet) bound to a
  /// type name becomes an alias of that type, and the type name is bound in
  /// its place. An existing alias key binds its canonical identifier. An
  /// abstract identifier bound with a consumer is stored as a contextual
  /// override and leaves the default binding untouched.
  pub(crate) fn bind(
    &mut self,
    keys: &mut KeyMap,
    types: &ReflectionCache,
    identifier: &str,
    producer: Producer,
    consumer: Option<&str>,
  ) -> String {
    let mut identifier = identifier.to_owned();

    if keys.has_key(&identifier) {
      identifier = keys.resolve(&identifier).to_owned();
    } else if let Some(target) = producer.as_type_name() {
      if target != identifier && !types.is_known(&identifier) {
        debug!(key = %identifier, target, "binding key as alias");
        keys.set_alias(&identifier, target);
        identifier = target.to_owned();
      }
    }

    if let Some(consumer) = consumer {
      if types.is_abstract(&identifier) {
        let key = contextual_key(&identifier, keys.resolve(consumer));
        debug!(%key, ?producer, "contextual binding");
        self.bindings.insert(key.clone(), producer);
        return key;
      }
    }

    debug!(%identifier, ?producer, "binding");
    self.bindings.insert(identifier.clone(), producer);
    self.last_binding = vec![identifier.clone()];
    identifier
  }

  pub(crate) fn get(&self, identifier: &str) -> Option<&Producer> {
    self.bindings.get(identifier)
  }

  pub(crate) fn contains(&self, identifier: &str) -> bool {
    self.bindings.contains_key(identifier)
  }

  /// The key to resolve `abstract_id` under on behalf of a consumer: a
  /// contextual override for the consumer's full or short name if one exists,
  /// otherwise the abstract identifier itself.
  pub(crate) fn lookup_key(&self, abstract_id: &str, consumer: &str, consumer_short: &str) -> String {
    [consumer, consumer_short]
      .iter()
      .map(|c| contextual_key(abstract_id, c))
      .find(|key| self.bindings.contains_key(key))
      .unwrap_or_else(|| abstract_id.to_owned())
  }

  /// Drops the binding of `identifier`, its contextual overrides and its
  /// singleton flag.
  pub(crate) fn remove(&mut self, identifier: &str) -> Option<Producer> {
    let prefix = format!("{identifier}|");
    self.bindings.retain(|key, _| !key.starts_with(&prefix));
    self.shared.remove(identifier);
    self.last_binding.retain(|id| id != identifier);
    self.bindings.shift_remove(identifier)
  }

  pub(crate) fn mark_shared(&mut self, identifier: &str) {
    self.shared.insert(identifier.to_owned());
  }

  pub(crate) fn is_shared(&self, identifier: &str) -> bool {
    self.shared.contains(identifier)
  }

  pub(crate) fn set_last_binding(&mut self, identifiers: Vec<String>) {
    self.last_binding = identifiers;
  }

  pub(crate) fn last_binding(&self) -> &[String] {
    &self.last_binding
  }

  /// Takes the most recently bound concrete identifier, if any.
  pub(crate) fn take_last_concrete(&mut self, types: &ReflectionCache) -> Option<String> {
    let found = self
      .last_binding
      .iter()
      .rev()
      .find(|id| !types.is_abstract(id))
      .cloned();
    if found.is_some() {
      self.last_binding.clear();
    }
    found
  }

  pub(crate) fn all(&self) -> &IndexMap<String, Producer> {
    &self.bindings
  }

  pub(crate) fn clear(&mut self) {
    self.bindings.clear();
    self.shared.clear();
    self.last_binding.clear();
  }
}
