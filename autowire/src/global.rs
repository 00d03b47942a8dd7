//! An optional "current container" for call sites that cannot be handed one.
//!
//! Nothing inside the crate reads this; the container's algorithms work on
//! explicit instances only.

use crate::container::Container;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

static CURRENT: Lazy<RwLock<Option<Arc<Container>>>> = Lazy::new(|| RwLock::new(None));

/// Installs `container` as the current container, returning the previous one.
///
/// # Examples
///
/// ```
/// use fibre_autowire::{global, Container, Instance, Producer};
/// use std::sync::Arc;
///
/// let container = Arc::new(Container::default());
/// container.bind("greeting", Producer::instance(Instance::from_value("hello")));
/// global::set_current(container);
///
/// let greeting = global::current().unwrap().make_as::<&str>("greeting").unwrap();
/// assert_eq!(*greeting, "hello");
/// ```
pub fn set_current(container: Arc<Container>) -> Option<Arc<Container>> {
  CURRENT.write().replace(container)
}

/// The current container, if one was installed.
pub fn current() -> Option<Arc<Container>> {
  CURRENT.read().clone()
}

/// Uninstalls the current container.
pub fn clear_current() -> Option<Arc<Container>> {
  CURRENT.write().take()
}
