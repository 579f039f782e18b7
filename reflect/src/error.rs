use dynexpr_diagnostic::Diagnostic;

/// Caller misuse of the registration API: a null name, a null type, or a
/// mismatch between declared parameters and the arguments supplied at
/// invocation time.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ConfigurationError {
  pub message: String,
  pub diagnostic: Diagnostic,
}

impl ConfigurationError {
  pub fn new(message: impl Into<String>, diagnostic: Diagnostic) -> Self {
    let message = message.into();
    Self { message, diagnostic }
  }
}

/// A dynamic-member lookup failed at invocation time on an instance that
/// had previously type-checked as dynamic-capable. Carries the original
/// binder error from the host's `DynamicMembers` implementation.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct DynamicBindingError {
  pub message: String,
  pub diagnostic: Diagnostic,
}

impl DynamicBindingError {
  pub fn new(message: impl Into<String>, diagnostic: Diagnostic) -> Self {
    let message = message.into();
    Self { message, diagnostic }
  }
}

/// Opaque failure raised from inside a host-supplied method or extension
/// method implementation. `dynexpr`'s `InvocationError` wraps this without
/// altering it, so the original host-level failure propagates unchanged.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HostInvocationError(pub String);

impl HostInvocationError {
  pub fn new(message: impl Into<String>) -> Self {
    Self(message.into())
  }
}
