//! # Fibre Autowire
//!
//! A string-keyed, autowiring service container for Rust.
//!
//! Services are requested by identifier: a type name, an interface name or a
//! short alias key. The container maps the identifier to a producer (a type to
//! construct, a factory, or a ready instance) and builds the object graph by
//! resolving every service-typed constructor parameter through itself.
//!
//! ## Core Concepts
//!
//! - **Container**: the registry of bindings, aliases and singletons.
//! - **TypeIntrospector**: where the container learns what a type is and what
//!   its constructor and methods take. [`TypeRegistry`] is a ready-made table.
//! - **Contextual bindings**: an abstract identifier can resolve differently
//!   for one consumer type.
//! - **Shared services**: flagged identifiers are produced once and cached.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_autowire::{Container, ParamList, TypeRegistry};
//! use std::sync::Arc;
//!
//! trait Transport: Send + Sync {
//!   fn name(&self) -> &'static str;
//! }
//!
//! struct SmtpTransport;
//! impl Transport for SmtpTransport {
//!   fn name(&self) -> &'static str {
//!     "smtp"
//!   }
//! }
//!
//! struct Mailer {
//!   transport: Arc<dyn Transport>,
//! }
//!
//! let types = TypeRegistry::new()
//!   .interface("App.Transport")
//!   .class::<SmtpTransport>("App.SmtpTransport", |class| {
//!     class
//!       .implements::<dyn Transport>("App.Transport", |t| t as Arc<dyn Transport>)
//!       .constructor(ParamList::new(), |_| Ok(SmtpTransport))
//!   })
//!   .class::<Mailer>("App.Mailer", |class| {
//!     class.constructor(ParamList::new().inject("transport", "App.Transport"), |args| {
//!       Ok(Mailer { transport: args.require_trait::<dyn Transport>("transport")? })
//!     })
//!   });
//!
//! let container = Container::new(types);
//! container.bind("App.Transport", "App.SmtpTransport");
//!
//! let mailer = container.make_as::<Mailer>("App.Mailer").unwrap();
//! assert_eq!(mailer.transport.name(), "smtp");
//! ```

mod access;
mod binding;
mod config;
mod container;
mod core;
mod error;
pub mod global;
mod instance;
mod introspect;
mod keys;
mod macros;
mod reflection;
mod resolver;
mod singleton;

pub use access::ServiceAccess;
pub use binding::Producer;
pub use config::{find_config_file, ContainerConfig, UnbuildablePolicy};
pub use container::{Container, Target};
pub use error::{Error, Result};
pub use instance::{Arguments, Instance, TypeIdentity};
pub use introspect::{
  short_name, ClassBuilder, Constructor, Method, ParamList, Parameter, ParameterType, TypeDescriptor,
  TypeIntrospector, TypeKind, TypeRegistry,
};
pub use resolver::{Callable, ResolvedSignature, Slot};
