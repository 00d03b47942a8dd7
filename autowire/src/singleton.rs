//! Shared instances, produced at most once per identifier.

use crate::error::{Error, Result};
use crate::instance::Instance;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Which thread is producing which identifier, and which identifier each
/// blocked thread is waiting for.
#[derive(Default)]
struct BuildGraph {
  building: HashMap<String, ThreadId>,
  waiting: HashMap<ThreadId, String>,
}

impl BuildGraph {
  /// If `me` blocking on `wanted` (built by `owner`) would close a loop of
  /// threads waiting on each other, returns the identifiers along that loop.
  fn wait_cycle(&self, me: ThreadId, wanted: &str, owner: ThreadId) -> Option<Vec<String>> {
    let mut path = vec![wanted.to_owned()];
    let mut thread = owner;
    // Each thread waits on at most one identifier, so the walk is bounded.
    for _ in 0..=self.waiting.len() {
      let next = self.waiting.get(&thread)?;
      path.push(next.clone());
      let next_owner = *self.building.get(next)?;
      if next_owner == me {
        let mut chain = vec![next.clone()];
        chain.extend(path);
        return Some(chain);
      }
      thread = next_owner;
    }
    None
  }
}

#[derive(Default)]
pub(crate) struct SingletonCache {
  cells: DashMap<String, Arc<OnceCell<Instance>>>,
  graph: Mutex<BuildGraph>,
  finished: Condvar,
}

/// Releases a build claim and wakes waiters, even if the producer panics.
struct BuildClaim<'a> {
  cache: &'a SingletonCache,
  identifier: &'a str,
}

impl Drop for BuildClaim<'_> {
  fn drop(&mut self) {
    self.cache.graph.lock().building.remove(self.identifier);
    self.cache.finished.notify_all();
  }
}

impl SingletonCache {
  pub(crate) fn get(&self, identifier: &str) -> Option<Instance> {
    self
      .cells
      .get(identifier)
      .and_then(|cell| cell.value().get().cloned())
  }

  pub(crate) fn contains(&self, identifier: &str) -> bool {
    self.get(identifier).is_some()
  }

  /// Returns the cached instance, or runs `factory` and caches its result.
  ///
  /// Concurrent callers for the same identifier wait for the one running
  /// factory. A failed factory leaves the cell empty and the next waiter
  /// builds instead. Waiting that would deadlock, because the builder is
  /// itself waiting on something this thread is building, fails with
  /// [`Error::CyclicDependency`].
  pub(crate) fn get_or_create(
    &self,
    identifier: &str,
    factory: impl FnOnce() -> Result<Instance>,
  ) -> Result<Instance> {
    // Clone the cell out so the map shard is not locked while the factory
    // resolves further services.
    let cell = self
      .cells
      .entry(identifier.to_owned())
      .or_insert_with(|| Arc::new(OnceCell::new()))
      .value()
      .clone();
    if let Some(instance) = cell.get() {
      return Ok(instance.clone());
    }

    let me = thread::current().id();
    let mut graph = self.graph.lock();
    loop {
      if let Some(instance) = cell.get() {
        return Ok(instance.clone());
      }
      match graph.building.get(identifier).copied() {
        None => {
          graph.building.insert(identifier.to_owned(), me);
          break;
        }
        Some(owner) if owner == me => {
          return Err(Error::CyclicDependency {
            chain: vec![identifier.to_owned(), identifier.to_owned()],
          });
        }
        Some(owner) => {
          if let Some(chain) = graph.wait_cycle(me, identifier, owner) {
            return Err(Error::CyclicDependency { chain });
          }
          graph.waiting.insert(me, identifier.to_owned());
          self.finished.wait(&mut graph);
          graph.waiting.remove(&me);
        }
      }
    }
    drop(graph);

    let _claim = BuildClaim {
      cache: self,
      identifier,
    };
    let instance = factory()?;
    Ok(cell.get_or_init(|| instance).clone())
  }

  pub(crate) fn invalidate(&self, identifier: &str) -> Option<Instance> {
    self
      .cells
      .remove(identifier)
      .and_then(|(_, cell)| cell.get().cloned())
  }

  pub(crate) fn clear(&self) {
    self.cells.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Barrier;

  #[test]
  fn test_factory_runs_once() {
    let cache = SingletonCache::default();
    let calls = AtomicUsize::new(0);
    let make = || {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok(Instance::from_value(7u32))
    };

    let first = cache.get_or_create("seven", make).unwrap();
    let second = cache.get_or_create("seven", make).unwrap();

    assert!(first.ptr_eq(&second));
    assert!(cache.get("seven").unwrap().ptr_eq(&first));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_failed_factory_is_retried() {
    let cache = SingletonCache::default();

    let err = cache
      .get_or_create("flaky", || Err(Error::custom("boom")))
      .unwrap_err();
    assert_eq!(err.to_string(), "boom");
    assert!(!cache.contains("flaky"));

    assert!(cache
      .get_or_create("flaky", || Ok(Instance::from_value(1u8)))
      .is_ok());
    assert!(cache.contains("flaky"));
  }

  #[test]
  fn test_invalidate_drops_instance() {
    let cache = SingletonCache::default();
    let first = cache
      .get_or_create("svc", || Ok(Instance::from_value(1u8)))
      .unwrap();

    assert!(cache.invalidate("svc").unwrap().ptr_eq(&first));
    assert!(cache.get("svc").is_none());

    let second = cache
      .get_or_create("svc", || Ok(Instance::from_value(1u8)))
      .unwrap();
    assert!(!second.ptr_eq(&first));
  }

  #[test]
  fn test_concurrent_first_access() {
    let cache = SingletonCache::default();
    let calls = AtomicUsize::new(0);

    thread::scope(|s| {
      for _ in 0..16 {
        s.spawn(|| {
          cache
            .get_or_create("pool", || {
              calls.fetch_add(1, Ordering::SeqCst);
              thread::sleep(std::time::Duration::from_millis(20));
              Ok(Instance::from_value(0u64))
            })
            .unwrap();
        });
      }
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.graph.lock().building.is_empty());
  }

  #[test]
  fn test_cross_thread_wait_cycle_fails_instead_of_blocking() {
    let cache = SingletonCache::default();
    // Both threads hold their build claim before either asks for the other.
    let both_building = Barrier::new(2);

    let (one, two) = thread::scope(|s| {
      let one = s.spawn(|| {
        cache.get_or_create("a", || {
          both_building.wait();
          cache.get_or_create("b", || Ok(Instance::from_value("b from one")))
        })
      });
      let two = s.spawn(|| {
        cache.get_or_create("b", || {
          both_building.wait();
          cache.get_or_create("a", || Ok(Instance::from_value("a from two")))
        })
      });
      (one.join().unwrap(), two.join().unwrap())
    });

    // Whichever thread would have closed the loop fails; the other then
    // builds the released identifier itself.
    let outcomes = [&one, &two];
    let cycles: Vec<_> = outcomes
      .iter()
      .filter_map(|r| match r {
        Err(Error::CyclicDependency { chain }) => Some(chain.clone()),
        _ => None,
      })
      .collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].len(), 3);
    assert_eq!(cycles[0].first(), cycles[0].last());
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);

    let graph = cache.graph.lock();
    assert!(graph.building.is_empty() && graph.waiting.is_empty());
  }
}
