//! Subscript-style access to a container.

use crate::binding::Producer;
use crate::container::Container;
use crate::error::Result;
use crate::instance::Instance;

/// Map-like access: reading makes, writing binds, and existence checks and
/// deletion follow [`Container::has`] and [`Container::remove`].
pub trait ServiceAccess {
  fn get(&self, identifier: &str) -> Result<Instance>;
  fn set(&self, identifier: &str, producer: Producer);
  fn contains(&self, identifier: &str) -> bool;
  fn unset(&self, identifier: &str);
}

impl ServiceAccess for Container {
  fn get(&self, identifier: &str) -> Result<Instance> {
    self.make(identifier)
  }

  fn set(&self, identifier: &str, producer: Producer) {
    self.bind(identifier, producer);
  }

  fn contains(&self, identifier: &str) -> bool {
    self.has(identifier)
  }

  fn unset(&self, identifier: &str) {
    self.remove(identifier);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_subscript_round_trip() {
    let container = Container::default();
    let access: &dyn ServiceAccess = &container;

    access.set("answer", Producer::instance(Instance::from_value(42u8)));
    assert!(access.contains("answer"));
    assert_eq!(*access.get("answer").unwrap().downcast::<u8>().unwrap(), 42);

    access.unset("answer");
    assert!(!access.contains("answer"));
    assert!(access.get("answer").is_err());
  }
}
