//! Tests for the resolution macros and the current-container slot.
//!
//! The current container is process-wide, so everything that installs one
//! lives in a single test.

use fibre_autowire::{
  global, maybe_resolve, resolve, resolve_from, Container, Error, Instance, ParamList, TypeRegistry,
};
use std::sync::Arc;

// --- Test Fixtures ---

trait Greeter: Send + Sync {
  fn greet(&self) -> String;
}

struct English;
impl Greeter for English {
  fn greet(&self) -> String {
    "Hello!".to_string()
  }
}

fn container() -> Container {
  let types = TypeRegistry::new()
    .interface("App.Greeter")
    .class::<English>("App.English", |class| {
      class
        .implements::<dyn Greeter>("App.Greeter", |g| g as Arc<dyn Greeter>)
        .constructor(ParamList::new(), |_| Ok(English))
    });
  let container = Container::new(types);
  container
    .bind("App.Greeter", "App.English")
    .bind("answer", Instance::from_value(42u32));
  container
}

#[test]
fn test_current_container_macros() {
  // Nothing installed yet.
  assert!(maybe_resolve!(u32, "answer").is_none());

  let first = Arc::new(container());
  assert!(global::set_current(first.clone()).is_none());

  assert_eq!(*resolve!(u32, "answer"), 42);
  assert_eq!(resolve!(trait Greeter, "App.Greeter").greet(), "Hello!");
  assert_eq!(maybe_resolve!(u32, "answer").as_deref(), Some(&42));
  assert!(maybe_resolve!(u32, "missing").is_none());
  assert!(maybe_resolve!(trait Greeter, "answer").is_none());

  let panicked = std::panic::catch_unwind(|| resolve!(String, "answer"));
  assert!(panicked.is_err());

  // Replacing hands back the previous container.
  let previous = global::set_current(Arc::new(container())).unwrap();
  assert!(Arc::ptr_eq(&previous, &first));

  assert!(global::clear_current().is_some());
  assert!(global::current().is_none());
}

#[test]
fn test_resolve_from_explicit_container() {
  let container = container();

  assert_eq!(*resolve_from!(container, u32, "answer").unwrap(), 42);
  assert_eq!(
    resolve_from!(container, trait Greeter, "App.Greeter")
      .unwrap()
      .greet(),
    "Hello!"
  );
  assert!(matches!(
    resolve_from!(container, u32, "missing"),
    Err(Error::NotFound(_))
  ));
}
