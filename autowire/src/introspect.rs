//! Structural type metadata consumed by the container.
//!
//! The container never inspects Rust types itself. Everything it knows about a
//! service type (whether it can be built, which parameters its constructor and
//! methods declare, which interfaces it can be served as) comes from a
//! [`TypeIntrospector`]. [`TypeRegistry`] is a metadata table that satisfies the
//! capability and is filled at startup.

use crate::error::{Error, Result};
use crate::instance::{Arguments, Instance};
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Produces structural metadata for a type name.
///
/// Implementations must not call back into a container.
pub trait TypeIntrospector: Send + Sync {
  fn introspect(&self, type_name: &str) -> Option<TypeDescriptor>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
  Concrete,
  Abstract,
  Interface,
  /// Known but not constructible, e.g. a namespace of free functions.
  Static,
}

/// What a declared parameter is typed as.
#[derive(Clone)]
pub enum ParameterType {
  /// Typed with a class or interface that the container should resolve.
  Service(String),
  /// Untyped, or typed with something the container cannot build.
  Value { default: Option<Instance> },
}

#[derive(Clone)]
pub struct Parameter {
  pub name: String,
  pub ty: ParameterType,
}

impl fmt::Debug for Parameter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.ty {
      ParameterType::Service(service) => write!(f, "{}: {}", self.name, service),
      ParameterType::Value { default: Some(d) } => write!(f, "{} = <{}>", self.name, d.type_name()),
      ParameterType::Value { default: None } => write!(f, "{}", self.name),
    }
  }
}

/// Builder for a constructor or method parameter list.
#[derive(Clone, Debug, Default)]
pub struct ParamList {
  params: Vec<Parameter>,
}

impl ParamList {
  pub fn new() -> Self {
    Self::default()
  }

  /// A parameter typed with the class or interface `service`.
  pub fn inject(mut self, name: impl Into<String>, service: impl Into<String>) -> Self {
    self.params.push(Parameter {
      name: name.into(),
      ty: ParameterType::Service(service.into()),
    });
    self
  }

  /// An untyped parameter the caller must supply.
  pub fn param(mut self, name: impl Into<String>) -> Self {
    self.params.push(Parameter {
      name: name.into(),
      ty: ParameterType::Value { default: None },
    });
    self
  }

  /// A parameter with a literal default value.
  pub fn param_default<T: Any + Send + Sync>(mut self, name: impl Into<String>, default: T) -> Self {
    self.params.push(Parameter {
      name: name.into(),
      ty: ParameterType::Value {
        default: Some(Instance::from_value(default)),
      },
    });
    self
  }

  pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
    self.params.iter()
  }

  pub fn len(&self) -> usize {
    self.params.len()
  }

  pub fn is_empty(&self) -> bool {
    self.params.is_empty()
  }
}

type ConstructFn = Arc<dyn Fn(&Arguments) -> Result<Instance> + Send + Sync>;
type InvokeFn = Arc<dyn Fn(&Instance, &Arguments) -> Result<Option<Instance>> + Send + Sync>;
type UpcastFn = Arc<dyn Fn(&Instance) -> Option<Arc<dyn Any + Send + Sync>> + Send + Sync>;

#[derive(Clone)]
pub struct Constructor {
  params: ParamList,
  build: ConstructFn,
}

impl Constructor {
  pub fn params(&self) -> &ParamList {
    &self.params
  }

  pub fn call(&self, args: &Arguments) -> Result<Instance> {
    (self.build)(args)
  }
}

#[derive(Clone)]
pub struct Method {
  params: ParamList,
  invoke: InvokeFn,
}

impl Method {
  pub fn params(&self) -> &ParamList {
    &self.params
  }

  pub fn call(&self, receiver: &Instance, args: &Arguments) -> Result<Option<Instance>> {
    (self.invoke)(receiver, args)
  }
}

/// Structural facts about one type.
#[derive(Clone)]
pub struct TypeDescriptor {
  name: String,
  short_name: String,
  kind: TypeKind,
  constructor: Option<Constructor>,
  methods: HashMap<String, Method>,
  upcasts: HashMap<String, UpcastFn>,
}

impl TypeDescriptor {
  pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
    let name = name.into();
    Self {
      short_name: short_name(&name).to_owned(),
      name,
      kind,
      constructor: None,
      methods: HashMap::new(),
      upcasts: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// The last path segment of the name.
  pub fn short_name(&self) -> &str {
    &self.short_name
  }

  pub fn kind(&self) -> TypeKind {
    self.kind
  }

  pub fn is_abstract(&self) -> bool {
    matches!(self.kind, TypeKind::Abstract | TypeKind::Interface)
  }

  pub fn is_interface(&self) -> bool {
    self.kind == TypeKind::Interface
  }

  pub fn is_instantiable(&self) -> bool {
    self.kind == TypeKind::Concrete && self.constructor.is_some()
  }

  pub fn constructor(&self) -> Option<&Constructor> {
    self.constructor.as_ref()
  }

  pub fn method(&self, name: &str) -> Option<&Method> {
    self.methods.get(name)
  }

  /// Produces the interface view of `instance` for `interface`, if this type
  /// declared that it implements it.
  pub fn upcast(&self, instance: &Instance, interface: &str) -> Option<Arc<dyn Any + Send + Sync>> {
    self.upcasts.get(interface).and_then(|cast| cast(instance))
  }

  pub fn set_constructor(
    &mut self,
    params: ParamList,
    build: impl Fn(&Arguments) -> Result<Instance> + Send + Sync + 'static,
  ) {
    self.constructor = Some(Constructor {
      params,
      build: Arc::new(build),
    });
  }

  pub fn add_method(
    &mut self,
    name: impl Into<String>,
    params: ParamList,
    invoke: impl Fn(&Instance, &Arguments) -> Result<Option<Instance>> + Send + Sync + 'static,
  ) {
    self.methods.insert(
      name.into(),
      Method {
        params,
        invoke: Arc::new(invoke),
      },
    );
  }
}

impl fmt::Debug for TypeDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut methods: Vec<_> = self.methods.keys().collect();
    methods.sort();
    f.debug_struct("TypeDescriptor")
      .field("name", &self.name)
      .field("kind", &self.kind)
      .field("constructor", &self.constructor.as_ref().map(|c| &c.params))
      .field("methods", &methods)
      .finish()
  }
}

/// The segment after the last `.`, `::` or `\` separator.
pub fn short_name(name: &str) -> &str {
  let cut = [".", "::", "\\"]
    .iter()
    .filter_map(|sep| name.rfind(sep).map(|at| at + sep.len()))
    .max()
    .unwrap_or(0);
  &name[cut..]
}

/// A metadata table of types, filled at startup.
///
/// ```
/// use fibre_autowire::{ParamList, TypeRegistry};
/// use std::sync::Arc;
///
/// trait Transport: Send + Sync {}
/// struct SmtpTransport;
/// impl Transport for SmtpTransport {}
///
/// struct Mailer {
///   transport: Arc<dyn Transport>,
/// }
///
/// let types = TypeRegistry::new()
///   .interface("App.Transport")
///   .class::<SmtpTransport>("App.SmtpTransport", |class| {
///     class
///       .implements::<dyn Transport>("App.Transport", |t| t as Arc<dyn Transport>)
///       .constructor(ParamList::new(), |_| Ok(SmtpTransport))
///   })
///   .class::<Mailer>("App.Mailer", |class| {
///     class.constructor(ParamList::new().inject("transport", "App.Transport"), |args| {
///       Ok(Mailer { transport: args.require_trait::<dyn Transport>("transport")? })
///     })
///   });
/// ```
#[derive(Default)]
pub struct TypeRegistry {
  types: HashMap<String, TypeDescriptor>,
}

impl TypeRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn interface(self, name: &str) -> Self {
    self.insert(TypeDescriptor::new(name, TypeKind::Interface))
  }

  pub fn abstract_class(self, name: &str) -> Self {
    self.insert(TypeDescriptor::new(name, TypeKind::Abstract))
  }

  pub fn static_type(self, name: &str) -> Self {
    self.insert(TypeDescriptor::new(name, TypeKind::Static))
  }

  /// Registers the concrete type `T` under `name`.
  pub fn class<T: Any + Send + Sync>(
    self,
    name: &str,
    configure: impl FnOnce(ClassBuilder<T>) -> ClassBuilder<T>,
  ) -> Self {
    let builder = configure(ClassBuilder::new(name));
    self.insert(builder.descriptor)
  }

  /// Registers a prepared descriptor, replacing any previous one of that name.
  pub fn insert(mut self, descriptor: TypeDescriptor) -> Self {
    self.types.insert(descriptor.name.clone(), descriptor);
    self
  }

  pub fn len(&self) -> usize {
    self.types.len()
  }

  pub fn is_empty(&self) -> bool {
    self.types.is_empty()
  }
}

impl TypeIntrospector for TypeRegistry {
  fn introspect(&self, type_name: &str) -> Option<TypeDescriptor> {
    self.types.get(type_name).cloned()
  }
}

impl<I: TypeIntrospector + ?Sized> TypeIntrospector for Arc<I> {
  fn introspect(&self, type_name: &str) -> Option<TypeDescriptor> {
    (**self).introspect(type_name)
  }
}

/// Describes one concrete type `T` for a [`TypeRegistry`].
pub struct ClassBuilder<T> {
  descriptor: TypeDescriptor,
  _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
  fn new(name: &str) -> Self {
    Self {
      descriptor: TypeDescriptor::new(name, TypeKind::Concrete),
      _marker: std::marker::PhantomData,
    }
  }

  pub fn constructor(
    mut self,
    params: ParamList,
    build: impl Fn(&Arguments) -> Result<T> + Send + Sync + 'static,
  ) -> Self {
    let name: Arc<str> = Arc::from(self.descriptor.name.as_str());
    self
      .descriptor
      .set_constructor(params, move |args| build(args).map(|value| Instance::new(name.clone(), value)));
    self
  }

  pub fn method(
    mut self,
    name: &str,
    params: ParamList,
    invoke: impl Fn(&T, &Arguments) -> Result<Option<Instance>> + Send + Sync + 'static,
  ) -> Self {
    self.descriptor.add_method(name, params, move |receiver, args| {
      let this = receiver
        .downcast::<T>()
        .ok_or_else(|| Error::ArgumentType {
          name: "self".to_owned(),
          expected: type_name::<T>(),
        })?;
      invoke(&*this, args)
    });
    self
  }

  /// Declares that `T` can be served as the trait object `I` for the
  /// abstract identifier `interface`.
  pub fn implements<I: ?Sized + Send + Sync + 'static>(
    mut self,
    interface: &str,
    cast: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
  ) -> Self {
    let upcast: UpcastFn = Arc::new(move |instance: &Instance| {
      instance
        .downcast::<T>()
        .map(|concrete| Arc::new(cast(concrete)) as Arc<dyn Any + Send + Sync>)
    });
    self.descriptor.upcasts.insert(interface.to_owned(), upcast);
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  trait Greeter: Send + Sync {
    fn greet(&self) -> String;
  }
  struct English {
    name: String,
  }
  impl Greeter for English {
    fn greet(&self) -> String {
      format!("Hello, {}!", self.name)
    }
  }

  fn registry() -> TypeRegistry {
    TypeRegistry::new()
      .interface("App.Greeter")
      .abstract_class("App.BaseGreeter")
      .static_type("App.Helpers")
      .class::<English>("App.Greeting.English", |class| {
        class
          .implements::<dyn Greeter>("App.Greeter", |g| g as Arc<dyn Greeter>)
          .constructor(ParamList::new().param_default("name", String::from("world")), |args| {
            Ok(English {
              name: args.value::<String>("name")?,
            })
          })
          .method("greet", ParamList::new(), |this, _| {
            Ok(Some(Instance::from_value(this.greet())))
          })
      })
  }

  #[test]
  fn test_short_name() {
    assert_eq!(short_name("App.Logging.FileLogger"), "FileLogger");
    assert_eq!(short_name("app::logging::FileLogger"), "FileLogger");
    assert_eq!(short_name("App\\Logging\\FileLogger"), "FileLogger");
    assert_eq!(short_name("FileLogger"), "FileLogger");
  }

  #[test]
  fn test_kinds() {
    let types = registry();

    let greeter = types.introspect("App.Greeter").unwrap();
    assert!(greeter.is_abstract() && greeter.is_interface());
    assert!(!greeter.is_instantiable());

    let base = types.introspect("App.BaseGreeter").unwrap();
    assert!(base.is_abstract() && !base.is_interface());

    let helpers = types.introspect("App.Helpers").unwrap();
    assert!(!helpers.is_abstract() && !helpers.is_instantiable());

    let english = types.introspect("App.Greeting.English").unwrap();
    assert!(english.is_instantiable());
    assert_eq!(english.short_name(), "English");
    assert!(types.introspect("App.Missing").is_none());
  }

  #[test]
  fn test_constructor_method_and_upcast() {
    let english = registry().introspect("App.Greeting.English").unwrap();
    let ctor = english.constructor().unwrap();
    let instance = ctor
      .call(&Arguments::new().with_value("name", String::from("Ada")))
      .unwrap();
    assert_eq!(instance.type_name(), "App.Greeting.English");

    let greeting = english
      .method("greet")
      .unwrap()
      .call(&instance, &Arguments::new())
      .unwrap()
      .unwrap();
    assert_eq!(*greeting.downcast::<String>().unwrap(), "Hello, Ada!");

    let view = english.upcast(&instance, "App.Greeter").unwrap();
    let greeter = instance.with_view(view).as_trait::<dyn Greeter>().unwrap();
    assert_eq!(greeter.greet(), "Hello, Ada!");
  }

  #[test]
  fn test_method_rejects_foreign_receiver() {
    let english = registry().introspect("App.Greeting.English").unwrap();
    let err = english
      .method("greet")
      .unwrap()
      .call(&Instance::from_value(1u8), &Arguments::new())
      .unwrap_err();
    assert!(matches!(err, Error::ArgumentType { ref name, .. } if name == "self"));
  }
}
