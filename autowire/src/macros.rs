//! Public macros for ergonomic service resolution.

/// Resolves a service from the current container.
///
/// # Panics
///
/// Panics if no current container is installed or the service cannot be
/// resolved as the requested type. For a non-panicking version, use
/// [`maybe_resolve!`].
///
/// # Examples
///
/// ```
/// use fibre_autowire::{global, resolve, Container, Instance, Producer};
/// use std::sync::Arc;
///
/// let container = Arc::new(Container::default());
/// container.bind("answer", Producer::instance(Instance::from_value(42u32)));
/// global::set_current(container);
///
/// let answer = resolve!(u32, "answer");
/// assert_eq!(*answer, 42);
/// ```
#[macro_export]
macro_rules! resolve {
    // resolve!(trait MyTrait, "identifier")
    (trait $trait_ident:ident, $id:expr) => {
        $crate::global::current()
            .ok_or_else(|| $crate::Error::custom("no current container is installed"))
            .and_then(|container| container.make_trait::<dyn $trait_ident>($id))
            .unwrap_or_else(|err| {
                panic!(
                    "Failed to resolve required trait service '{}': {}",
                    $id, err
                )
            })
    };

    // resolve!(MyService, "identifier")
    ($type:ty, $id:expr) => {
        $crate::global::current()
            .ok_or_else(|| $crate::Error::custom("no current container is installed"))
            .and_then(|container| container.make_as::<$type>($id))
            .unwrap_or_else(|err| {
                panic!("Failed to resolve required service '{}': {}", $id, err)
            })
    };
}

/// Like [`resolve!`], but returns `None` instead of panicking.
#[macro_export]
macro_rules! maybe_resolve {
    (trait $trait_ident:ident, $id:expr) => {
        $crate::global::current()
            .and_then(|container| container.make_trait::<dyn $trait_ident>($id).ok())
    };

    ($type:ty, $id:expr) => {
        $crate::global::current().and_then(|container| container.make_as::<$type>($id).ok())
    };
}

/// Resolves a service from an explicit container, returning a `Result`.
///
/// ```
/// use fibre_autowire::{resolve_from, Container, Instance, Producer};
///
/// let container = Container::default();
/// container.bind("name", Producer::instance(Instance::from_value(String::from("fibre"))));
///
/// let name = resolve_from!(container, String, "name").unwrap();
/// assert_eq!(*name, "fibre");
/// ```
#[macro_export]
macro_rules! resolve_from {
    ($container:expr, trait $trait_ident:ident, $id:expr) => {
        $container.make_trait::<dyn $trait_ident>($id)
    };

    ($container:expr, $type:ty, $id:expr) => {
        $container.make_as::<$type>($id)
    };
}
