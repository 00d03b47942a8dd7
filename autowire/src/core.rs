//! Core, non-public bookkeeping for in-flight resolutions.

use crate::error::{Error, Result};
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_CONTAINER_ID: AtomicUsize = AtomicUsize::new(1);

pub(crate) fn next_container_id() -> usize {
  NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed)
}

thread_local! {
  // Identifiers currently being resolved on this thread, tagged with the
  // container they belong to, in resolution order.
  static RESOLVING_STACK: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// An RAII guard that detects circular dependencies.
///
/// Entering pushes an identifier onto the thread-local resolution stack and
/// fails if that identifier is already being resolved by the same container.
/// Dropping the guard pops it again.
pub(crate) struct ResolutionGuard {
  container: usize,
  identifier: String,
}

impl ResolutionGuard {
  pub(crate) fn enter(container: usize, identifier: &str) -> Result<Self> {
    RESOLVING_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      let active = stack
        .iter()
        .position(|(owner, id)| *owner == container && id == identifier);
      if let Some(start) = active {
        let mut chain: Vec<String> = stack[start..]
          .iter()
          .filter(|(owner, _)| *owner == container)
          .map(|(_, id)| id.clone())
          .collect();
        chain.push(identifier.to_owned());
        return Err(Error::CyclicDependency { chain });
      }
      stack.push((container, identifier.to_owned()));
      Ok(())
    })?;

    Ok(Self {
      container,
      identifier: identifier.to_owned(),
    })
  }
}

impl Drop for ResolutionGuard {
  fn drop(&mut self) {
    RESOLVING_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      if let Some(at) = stack
        .iter()
        .rposition(|(owner, id)| *owner == self.container && *id == self.identifier)
      {
        stack.remove(at);
      }
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_reentry_is_a_cycle() {
    let container = next_container_id();
    let _a = ResolutionGuard::enter(container, "A").unwrap();
    let _b = ResolutionGuard::enter(container, "B").unwrap();

    match ResolutionGuard::enter(container, "A") {
      Err(Error::CyclicDependency { chain }) => assert_eq!(chain, vec!["A", "B", "A"]),
      _ => panic!("expected a cycle"),
    }
  }

  #[test]
  fn test_guard_releases_on_drop() {
    let container = next_container_id();
    {
      let _a = ResolutionGuard::enter(container, "A").unwrap();
    }
    assert!(ResolutionGuard::enter(container, "A").is_ok());
  }

  #[test]
  fn test_containers_do_not_share_stacks() {
    let first = next_container_id();
    let second = next_container_id();
    let _a = ResolutionGuard::enter(first, "A").unwrap();

    assert!(ResolutionGuard::enter(second, "A").is_ok());
  }
}
