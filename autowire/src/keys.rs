//! Short keys mapped to canonical service identifiers.

use indexmap::IndexMap;

/// Bounds alias chain walks so a loop of aliases cannot spin forever.
const MAX_ALIAS_HOPS: usize = 32;

/// Maps alias keys to canonical identifiers, in insertion order.
#[derive(Debug, Default)]
pub(crate) struct KeyMap {
  keys: IndexMap<String, String>,
}

impl KeyMap {
  pub(crate) fn set_alias(&mut self, key: &str, identifier: &str) {
    self.keys.insert(key.to_owned(), identifier.to_owned());
  }

  /// The canonical identifier for `key`, or `key` itself when it is no alias.
  ///
  /// Chains of aliases are followed, up to [`MAX_ALIAS_HOPS`] steps.
  pub(crate) fn resolve<'a>(&'a self, key: &'a str) -> &'a str {
    let mut current = key;
    for _ in 0..MAX_ALIAS_HOPS {
      match self.keys.get(current) {
        Some(next) if next != current => current = next.as_str(),
        _ => break,
      }
    }
    current
  }

  pub(crate) fn get(&self, key: &str) -> Option<&str> {
    self.keys.get(key).map(String::as_str)
  }

  pub(crate) fn has_key(&self, key: &str) -> bool {
    self.keys.contains_key(key)
  }

  /// The first key registered for `identifier`.
  pub(crate) fn reverse_lookup(&self, identifier: &str) -> Option<&str> {
    self
      .keys
      .iter()
      .find(|(_, target)| target.as_str() == identifier)
      .map(|(key, _)| key.as_str())
  }

  pub(crate) fn all(&self) -> &IndexMap<String, String> {
    &self.keys
  }

  pub(crate) fn clear(&mut self) {
    self.keys.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resolve_falls_back_to_identity() {
    let mut keys = KeyMap::default();
    keys.set_alias("db", "Infra.Database");

    assert_eq!(keys.resolve("db"), "Infra.Database");
    assert_eq!(keys.resolve("Infra.Database"), "Infra.Database");
    assert_eq!(keys.resolve("cache"), "cache");
    assert_eq!(keys.get("cache"), None);
  }

  #[test]
  fn test_reverse_lookup_returns_first_key() {
    let mut keys = KeyMap::default();
    keys.set_alias("log", "App.FileLogger");
    keys.set_alias("logger", "App.FileLogger");

    assert_eq!(keys.reverse_lookup("App.FileLogger"), Some("log"));
    assert_eq!(keys.reverse_lookup("App.Other"), None);
  }

  #[test]
  fn test_resetting_an_alias_retargets_it() {
    let mut keys = KeyMap::default();
    keys.set_alias("log", "App.FileLogger");
    keys.set_alias("log", "App.ConsoleLogger");

    assert_eq!(keys.resolve("log"), "App.ConsoleLogger");
    assert_eq!(keys.all().len(), 1);

    keys.clear();
    assert!(!keys.has_key("log"));
  }

  #[test]
  fn test_resolve_follows_alias_chains() {
    let mut keys = KeyMap::default();
    keys.set_alias("db", "Infra.Database");
    keys.set_alias("Infra.Database", "App.ConcreteDb");

    assert_eq!(keys.resolve("db"), "App.ConcreteDb");
    assert_eq!(keys.get("db"), Some("Infra.Database"));
  }

  #[test]
  fn test_alias_loop_terminates() {
    let mut keys = KeyMap::default();
    keys.set_alias("ping", "pong");
    keys.set_alias("pong", "ping");

    let resolved = keys.resolve("ping");
    assert!(resolved == "ping" || resolved == "pong");
  }
}
