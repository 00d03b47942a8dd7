use thiserror::Error;

/// The main error type for the `fibre_autowire` library.
#[derive(Debug, Error)]
pub enum Error {
  #[error("No service with [{0}] name or key is registered.")]
  NotFound(String),

  #[error("Failed to construct [{identifier}]: {source}")]
  ConstructionFailed {
    identifier: String,
    #[source]
    source: Box<Error>,
  },

  #[error("Failed to invoke [{target}::{method}]: {source}")]
  InvocationFailed {
    target: String,
    method: String,
    #[source]
    source: Box<Error>,
  },

  #[error("Circular dependency detected: {}", chain.join(" -> "))]
  CyclicDependency { chain: Vec<String> },

  #[error("Type [{0}] is not known to the type introspector")]
  UnknownType(String),

  #[error("Type [{type_name}] has no method [{method}]")]
  UnknownMethod { type_name: String, method: String },

  #[error("Missing required argument [{0}]")]
  MissingArgument(String),

  #[error("Unexpected argument [{0}]")]
  UnexpectedArgument(String),

  #[error("Argument [{name}] is not a {expected}")]
  ArgumentType { name: String, expected: &'static str },

  #[error("Service [{identifier}] does not resolve to a {expected}")]
  TypeMismatch {
    identifier: String,
    expected: &'static str,
  },

  #[error("Alias [{0}] collides with a known type name")]
  AliasConflict(String),

  #[error("{0}")]
  Custom(String),

  #[error("Configuration file not found: {0}")]
  ConfigNotFound(String),

  #[error("Failed to read configuration file: {0}")]
  ConfigRead(#[from] std::io::Error),

  #[error("Failed to parse configuration: {0}")]
  ConfigParse(String),

  #[error("Invalid configuration value for '{field}': {message}")]
  InvalidConfigValue { field: String, message: String },
}

impl Error {
  /// Builds an error for a producer or constructor that failed on its own terms.
  pub fn custom(message: impl std::fmt::Display) -> Self {
    Error::Custom(message.to_string())
  }

  /// Wraps `self` as a construction failure of `identifier`.
  ///
  /// Errors that already describe a failed graph (construction failures and
  /// cycles) are returned unchanged so the outermost cause is not buried.
  pub(crate) fn while_constructing(self, identifier: &str) -> Self {
    match self {
      e @ (Error::ConstructionFailed { .. } | Error::CyclicDependency { .. }) => e,
      other => Error::ConstructionFailed {
        identifier: identifier.to_owned(),
        source: Box::new(other),
      },
    }
  }

  pub(crate) fn while_invoking(self, target: &str, method: &str) -> Self {
    match self {
      e @ (Error::ConstructionFailed { .. } | Error::CyclicDependency { .. }) => e,
      other => Error::InvocationFailed {
        target: target.to_owned(),
        method: method.to_owned(),
        source: Box::new(other),
      },
    }
  }

  /// Returns the innermost error of a wrapped failure.
  pub fn root_cause(&self) -> &Error {
    match self {
      Error::ConstructionFailed { source, .. } | Error::InvocationFailed { source, .. } => {
        source.root_cause()
      }
      other => other,
    }
  }
}

/// A specialized `Result` type for `fibre_autowire` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_wrapping_keeps_outermost_failure() {
    let inner = Error::MissingArgument("port".into()).while_constructing("App.Smtp");
    let outer = inner.while_constructing("App.Mailer");

    match &outer {
      Error::ConstructionFailed { identifier, .. } => assert_eq!(identifier, "App.Smtp"),
      other => panic!("unexpected error: {other:?}"),
    }
    assert!(matches!(outer.root_cause(), Error::MissingArgument(name) if name == "port"));
  }

  #[test]
  fn test_cycles_are_never_wrapped() {
    let err = Error::CyclicDependency {
      chain: vec!["A".into(), "B".into(), "A".into()],
    }
    .while_invoking("A", "run");

    assert_eq!(err.to_string(), "Circular dependency detected: A -> B -> A");
  }

  #[test]
  fn test_invocation_failure_message_names_target() {
    let err = Error::UnexpectedArgument("extra".into()).while_invoking("App.Mailer", "send");

    assert_eq!(
      err.to_string(),
      "Failed to invoke [App.Mailer::send]: Unexpected argument [extra]"
    );
  }
}
