//! Memoized type descriptors.

use crate::introspect::{TypeDescriptor, TypeIntrospector};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

/// Caches the descriptor of each type the first time it is asked for.
///
/// Unknown names are not cached, only descriptors that exist.
pub(crate) struct ReflectionCache {
  introspector: Arc<dyn TypeIntrospector>,
  descriptors: DashMap<String, Arc<TypeDescriptor>>,
}

impl ReflectionCache {
  pub(crate) fn new(introspector: Arc<dyn TypeIntrospector>) -> Self {
    Self {
      introspector,
      descriptors: DashMap::new(),
    }
  }

  pub(crate) fn describe(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
    if let Some(cached) = self.descriptors.get(type_name) {
      return Some(cached.value().clone());
    }

    trace!(type_name, "introspecting type");
    let descriptor = Arc::new(self.introspector.introspect(type_name)?);
    // A concurrent describe may have won the race; keep whichever landed first.
    let entry = self
      .descriptors
      .entry(type_name.to_owned())
      .or_insert(descriptor);
    Some(entry.value().clone())
  }

  pub(crate) fn is_known(&self, type_name: &str) -> bool {
    self.describe(type_name).is_some()
  }

  pub(crate) fn is_abstract(&self, type_name: &str) -> bool {
    self
      .describe(type_name)
      .map_or(false, |descriptor| descriptor.is_abstract())
  }

  pub(crate) fn is_cached(&self, type_name: &str) -> bool {
    self.descriptors.contains_key(type_name)
  }

  pub(crate) fn forget(&self, type_name: &str) {
    self.descriptors.remove(type_name);
  }

  pub(crate) fn clear(&self) {
    self.descriptors.clear();
  }
}
