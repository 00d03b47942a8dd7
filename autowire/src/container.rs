//! The main `Container` struct and its associated methods.

use crate::binding::{base_identifier, BindingRegistry, Producer};
use crate::config::{ContainerConfig, UnbuildablePolicy};
use crate::core::{next_container_id, ResolutionGuard};
use crate::error::{Error, Result};
use crate::instance::{Arguments, Instance};
use crate::introspect::{TypeDescriptor, TypeIntrospector, TypeRegistry};
use crate::keys::KeyMap;
use crate::reflection::ReflectionCache;
use crate::resolver::{Callable, DependencyResolver, ResolvedSignature};
use crate::singleton::SingletonCache;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::any::{type_name, Any};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

/// Aliases and bindings, guarded together.
#[derive(Default)]
struct Registry {
  keys: KeyMap,
  bindings: BindingRegistry,
}

/// What [`Container::invoke`] calls a method on.
#[derive(Debug, Clone)]
pub enum Target {
  /// An existing object.
  Instance(Instance),
  /// A service identifier, resolved with [`Container::make`] first.
  Type(String),
}

impl From<Instance> for Target {
  fn from(instance: Instance) -> Self {
    Target::Instance(instance)
  }
}

impl From<&Instance> for Target {
  fn from(instance: &Instance) -> Self {
    Target::Instance(instance.clone())
  }
}

impl From<&str> for Target {
  fn from(identifier: &str) -> Self {
    Target::Type(identifier.to_owned())
  }
}

impl From<String> for Target {
  fn from(identifier: String) -> Self {
    Target::Type(identifier)
  }
}

/// The service container.
///
/// Maps service identifiers (type names, interface names or short keys) to
/// producers and builds object graphs by resolving constructor parameters
/// through the container. It is thread-safe; registration methods take
/// `&self` and can be chained.
pub struct Container {
  id: usize,
  unbuildable: UnbuildablePolicy,
  registry: RwLock<Registry>,
  singletons: SingletonCache,
  reflection: ReflectionCache,
  resolver: DependencyResolver,
}

impl std::fmt::Debug for Container {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Container")
      .field("id", &self.id)
      .field("unbuildable", &self.unbuildable)
      .finish_non_exhaustive()
  }
}

impl Default for Container {
  fn default() -> Self {
    Self::new(TypeRegistry::new())
  }
}

impl Container {
  /// Creates an empty container that learns about types from `introspector`.
  pub fn new(introspector: impl TypeIntrospector + 'static) -> Self {
    Self {
      id: next_container_id(),
      unbuildable: UnbuildablePolicy::default(),
      registry: RwLock::new(Registry::default()),
      singletons: SingletonCache::default(),
      reflection: ReflectionCache::new(Arc::new(introspector)),
      resolver: DependencyResolver::default(),
    }
  }

  /// Creates a container and applies `config`'s policy, aliases and shared flags.
  pub fn with_config(
    introspector: impl TypeIntrospector + 'static,
    config: ContainerConfig,
  ) -> Result<Self> {
    let mut container = Self::new(introspector);
    container.unbuildable = config.unbuildable;
    container.set_aliases(config.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    container.mark_shared(config.shared.iter().map(String::as_str));
    Ok(container)
  }

  pub fn from_config_file(introspector: impl TypeIntrospector + 'static, path: &Path) -> Result<Self> {
    Self::with_config(introspector, ContainerConfig::from_file(path)?)
  }

  pub fn unbuildable_policy(&self) -> UnbuildablePolicy {
    self.unbuildable
  }

  // --- Registration ---

  /// Registers `producer` for `identifier`.
  pub fn bind(&self, identifier: &str, producer: impl Into<Producer>) -> &Self {
    let mut registry = self.registry.write();
    let Registry { keys, bindings } = &mut *registry;
    bindings.bind(keys, &self.reflection, identifier, producer.into(), None);
    self
  }

  /// Registers `producer` for the abstract `identifier`, used only when
  /// `consumer` is the type asking for it. On a concrete identifier this is a
  /// plain [`bind`](Self::bind).
  pub fn bind_contextual(&self, identifier: &str, producer: impl Into<Producer>, consumer: &str) -> &Self {
    let mut registry = self.registry.write();
    let Registry { keys, bindings } = &mut *registry;
    bindings.bind(keys, &self.reflection, identifier, producer.into(), Some(consumer));
    self
  }

  /// Binds every pair, optionally flagging all of them as shared.
  pub fn register_many<I, K, P>(&self, entries: I, shared: bool) -> &Self
  where
    I: IntoIterator<Item = (K, P)>,
    K: AsRef<str>,
    P: Into<Producer>,
  {
    let stored = {
      let mut registry = self.registry.write();
      let Registry { keys, bindings } = &mut *registry;
      let stored: Vec<String> = entries
        .into_iter()
        .map(|(identifier, producer)| {
          bindings.bind(keys, &self.reflection, identifier.as_ref(), producer.into(), None)
        })
        .collect();
      bindings.set_last_binding(Vec::clone(&stored));
      stored
    };

    if shared {
      self.mark_shared(stored.iter().map(String::as_str));
    }
    self
  }

  /// Flags identifiers as singletons.
  pub fn mark_shared<'a>(&self, identifiers: impl IntoIterator<Item = &'a str>) -> &Self {
    let mut registry = self.registry.write();
    let Registry { keys, bindings } = &mut *registry;
    for identifier in identifiers {
      let canonical = keys.resolve(identifier);
      debug!(identifier = canonical, "marking shared");
      bindings.mark_shared(canonical);
    }
    self
  }

  /// Flags the most recently bound concrete identifier as a singleton.
  /// Abstract identifiers are never flagged this way.
  pub fn mark_last_shared(&self) -> &Self {
    let mut registry = self.registry.write();
    if let Some(identifier) = registry.bindings.take_last_concrete(&self.reflection) {
      debug!(%identifier, "marking last binding shared");
      registry.bindings.mark_shared(&identifier);
    }
    self
  }

  // --- Aliases ---

  /// Maps `key` to `identifier`. Fails if `key` names a known type.
  pub fn set_alias(&self, key: &str, identifier: &str) -> Result<()> {
    if self.reflection.is_known(key) {
      return Err(Error::AliasConflict(key.to_owned()));
    }
    self.registry.write().keys.set_alias(key, identifier);
    Ok(())
  }

  pub fn set_aliases<'a>(&self, aliases: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<()> {
    aliases
      .into_iter()
      .try_for_each(|(key, identifier)| self.set_alias(key, identifier))
  }

  /// The identifier `key` maps to, if it is an alias.
  pub fn get_alias(&self, key: &str) -> Option<String> {
    self.registry.read().keys.get(key).map(str::to_owned)
  }

  /// The first alias key that maps to `identifier`.
  pub fn alias_for(&self, identifier: &str) -> Option<String> {
    self
      .registry
      .read()
      .keys
      .reverse_lookup(identifier)
      .map(str::to_owned)
  }

  pub fn aliases(&self) -> IndexMap<String, String> {
    self.registry.read().keys.all().clone()
  }

  /// Aliases the most recently bound identifier(s).
  ///
  /// A single key aliases the last identifier bound. Several keys are paired
  /// in order with the identifiers of the last [`register_many`](Self::register_many).
  /// Only identifiers naming a known class (concrete or abstract, not an
  /// interface) take an alias; the rest are skipped without consuming a key.
  /// Nothing is aliased if any key collides with a known type name.
  pub fn alias_last_binding<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Result<&Self> {
    let keys: Vec<&str> = keys.into_iter().collect();
    let last = self.registry.read().bindings.last_binding().to_vec();
    let is_class = |identifier: &String| {
      self
        .reflection
        .describe(identifier)
        .is_some_and(|descriptor| !descriptor.is_interface())
    };

    let pairs: Vec<(&str, &String)> = match keys.as_slice() {
      [key] => last
        .last()
        .filter(|identifier| is_class(identifier))
        .map(|identifier| vec![(*key, identifier)])
        .unwrap_or_default(),
      _ => keys
        .iter()
        .copied()
        .zip(last.iter().filter(|identifier| is_class(identifier)))
        .collect(),
    };

    if let Some((key, _)) = pairs.iter().find(|(key, _)| self.reflection.is_known(key)) {
      return Err(Error::AliasConflict((*key).to_owned()));
    }

    let mut registry = self.registry.write();
    for (key, identifier) in pairs {
      debug!(key, %identifier, "aliasing last binding");
      registry.keys.set_alias(key, identifier);
    }
    Ok(self)
  }

  // --- Inspection ---

  /// Whether `identifier` (or the identifier it aliases) is bound or has a
  /// cached singleton.
  pub fn has(&self, identifier: &str) -> bool {
    let canonical = self.canonical(identifier);
    self.registry.read().bindings.contains(&canonical) || self.singletons.contains(&canonical)
  }

  /// Whether `identifier` is flagged as a singleton.
  pub fn is_shared(&self, identifier: &str) -> bool {
    let registry = self.registry.read();
    registry.bindings.is_shared(registry.keys.resolve(identifier))
  }

  /// A snapshot of all bindings, contextual overrides included.
  pub fn bindings(&self) -> IndexMap<String, Producer> {
    self.registry.read().bindings.all().clone()
  }

  /// The descriptor of `type_name`, from the reflection cache.
  pub fn describe(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
    self.reflection.describe(type_name)
  }

  /// The resolution plan of a constructor or method of `type_name`, computed
  /// once and then served from the cache.
  pub fn signature(&self, type_name: &str, callable: &Callable) -> Result<Arc<ResolvedSignature>> {
    let descriptor = self
      .reflection
      .describe(type_name)
      .ok_or_else(|| Error::UnknownType(type_name.to_owned()))?;
    self.resolver.resolve_signature(&descriptor, callable)
  }

  // --- Removal ---

  /// Removes `identifier` with its contextual overrides, singleton flag,
  /// cached instance, resolved signatures and type descriptor.
  pub fn remove(&self, identifier: &str) {
    let (canonical, evicted) = {
      let mut registry = self.registry.write();
      let canonical = registry.keys.resolve(identifier).to_owned();
      registry.bindings.remove(&canonical);
      let evicted = self.singletons.invalidate(&canonical);
      (canonical, evicted)
    };
    // Released outside the lock so a Drop impl may use the container.
    drop(evicted);
    self.resolver.forget(&canonical);
    self.reflection.forget(&canonical);
    debug!(identifier = %canonical, "removed");
  }

  /// Returns the container to its initial empty state.
  ///
  /// Cached singletons are dropped while the container is locked; their
  /// `Drop` impls must not call back into it.
  pub fn reset(&self) {
    let mut registry = self.registry.write();
    registry.keys.clear();
    registry.bindings.clear();
    self.singletons.clear();
    self.resolver.clear();
    self.reflection.clear();
    debug!("container reset");
  }

  // --- Resolution ---

  /// Resolves `identifier` to an instance.
  ///
  /// Shared identifiers are produced once and cached; anything else is
  /// produced fresh on every call.
  pub fn make(&self, identifier: &str) -> Result<Instance> {
    let canonical = self.canonical(identifier);
    let _guard = ResolutionGuard::enter(self.id, &canonical)?;

    let result = if self.registry.read().bindings.is_shared(&canonical) {
      self.singletons.get_or_create(&canonical, || self.build(&canonical))
    } else {
      self.build(&canonical)
    };
    result.map_err(|e| self.classify(identifier, &canonical, e))
  }

  /// Resolves `identifier` with singleton semantics, flagged or not.
  pub fn shared(&self, identifier: &str) -> Result<Instance> {
    let canonical = self.canonical(identifier);
    let _guard = ResolutionGuard::enter(self.id, &canonical)?;

    self
      .singletons
      .get_or_create(&canonical, || self.build(&canonical))
      .map_err(|e| self.classify(identifier, &canonical, e))
  }

  /// Resolves `identifier` and downcasts it to `T`.
  pub fn make_as<T: Any + Send + Sync>(&self, identifier: &str) -> Result<Arc<T>> {
    self
      .make(identifier)?
      .downcast::<T>()
      .ok_or_else(|| Error::TypeMismatch {
        identifier: identifier.to_owned(),
        expected: type_name::<T>(),
      })
  }

  /// Resolves `identifier` as the trait object `I`.
  pub fn make_trait<I: ?Sized + Send + Sync + 'static>(&self, identifier: &str) -> Result<Arc<I>> {
    self
      .make(identifier)?
      .as_trait::<I>()
      .ok_or_else(|| Error::TypeMismatch {
        identifier: identifier.to_owned(),
        expected: type_name::<I>(),
      })
  }

  /// Builds `type_name` directly, bypassing its binding and singleton flag.
  ///
  /// `params` override resolved constructor arguments of the same name. A
  /// type that cannot be instantiated is resolved through its binding if it
  /// has one, and otherwise follows the [`UnbuildablePolicy`].
  pub fn construct(&self, type_name: &str, params: Arguments) -> Result<Instance> {
    let descriptor = self
      .reflection
      .describe(type_name)
      .ok_or_else(|| Error::UnknownType(type_name.to_owned()))?;

    if !descriptor.is_instantiable() {
      if self.registry.read().bindings.contains(type_name) {
        return self.make(type_name);
      }
      return match self.unbuildable {
        UnbuildablePolicy::ReturnIdentity => {
          trace!(type_name, "not instantiable, returning identity");
          Ok(Instance::identity(type_name))
        }
        UnbuildablePolicy::NotFound => Err(Error::NotFound(type_name.to_owned())),
      };
    }

    let signature = self.resolver.resolve_signature(&descriptor, &Callable::Constructor)?;
    let args = self
      .resolver
      .instantiate_arguments(self, &descriptor, &signature, params)?;
    trace!(type_name, args = args.len(), "constructing");

    match descriptor.constructor() {
      Some(constructor) => constructor.call(&args),
      None => Err(Error::UnknownType(type_name.to_owned())),
    }
  }

  /// Calls `method` on `target`, resolving its service-typed parameters.
  ///
  /// Caller-supplied `params` take precedence over resolved values.
  pub fn invoke(&self, target: impl Into<Target>, method: &str, params: Arguments) -> Result<Option<Instance>> {
    let instance = match target.into() {
      Target::Instance(instance) => instance,
      Target::Type(identifier) => self.make(&identifier)?,
    };

    self
      .invoke_on(&instance, method, params)
      .map_err(|e| e.while_invoking(instance.type_name(), method))
  }

  fn invoke_on(&self, instance: &Instance, method: &str, params: Arguments) -> Result<Option<Instance>> {
    let descriptor = self
      .reflection
      .describe(instance.type_name())
      .ok_or_else(|| Error::UnknownType(instance.type_name().to_owned()))?;
    let callable = descriptor.method(method).ok_or_else(|| Error::UnknownMethod {
      type_name: descriptor.name().to_owned(),
      method: method.to_owned(),
    })?;

    let signature = self
      .resolver
      .resolve_signature(&descriptor, &Callable::Method(method.to_owned()))?;
    let args = self
      .resolver
      .instantiate_arguments(self, &descriptor, &signature, params)?;
    trace!(type_name = instance.type_name(), method, "invoking");
    callable.call(instance, &args)
  }

  // --- Internals ---

  fn canonical(&self, identifier: &str) -> String {
    self.registry.read().keys.resolve(identifier).to_owned()
  }

  /// Produces a fresh instance for a canonical identifier.
  fn build(&self, identifier: &str) -> Result<Instance> {
    let producer = self.registry.read().bindings.get(identifier).cloned();

    let instance = match producer {
      Some(Producer::Factory(factory)) => factory(self)?,
      Some(Producer::Instance(instance)) => instance,
      Some(Producer::Type(target)) if target != identifier && self.is_bound(&target) => {
        self.make(&target)?
      }
      Some(Producer::Type(target)) => self.construct(&target, Arguments::new())?,
      None if self.reflection.is_known(identifier) => self.construct(identifier, Arguments::new())?,
      None => return Err(Error::NotFound(identifier.to_owned())),
    };

    Ok(self.present_as(identifier, instance))
  }

  /// Attaches the interface view when `key` serves an abstract identifier.
  fn present_as(&self, key: &str, instance: Instance) -> Instance {
    let service = base_identifier(key);
    if !self.reflection.is_abstract(service) {
      return instance;
    }
    match self
      .reflection
      .describe(instance.type_name())
      .and_then(|concrete| concrete.upcast(&instance, service))
    {
      Some(view) => instance.with_view(view),
      None => instance,
    }
  }

  fn is_bound(&self, identifier: &str) -> bool {
    self.registry.read().bindings.contains(identifier)
  }

  /// Keeps a not-found for the requested identifier as such and wraps
  /// everything else as a construction failure.
  fn classify(&self, requested: &str, canonical: &str, error: Error) -> Error {
    match error {
      Error::NotFound(missing) if missing == canonical => Error::NotFound(requested.to_owned()),
      other => other.while_constructing(canonical),
    }
  }

  pub(crate) fn is_abstract(&self, identifier: &str) -> bool {
    self.reflection.is_abstract(identifier)
  }

  /// The key to resolve the abstract `service` under when `consumer` asks for it.
  pub(crate) fn contextual_key(&self, service: &str, consumer: &TypeDescriptor) -> String {
    self
      .registry
      .read()
      .bindings
      .lookup_key(service, consumer.name(), consumer.short_name())
  }

  #[cfg(test)]
  pub(crate) fn signature_cached(&self, type_name: &str) -> bool {
    self.resolver.is_cached(type_name, &Callable::Constructor)
  }

  #[cfg(test)]
  pub(crate) fn descriptor_cached(&self, type_name: &str) -> bool {
    self.reflection.is_cached(type_name)
  }
}
