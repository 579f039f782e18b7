use std::any::Any;
use std::sync::Arc;

use crate::error::DynamicBindingError;

/// An opaque runtime value crossing the reflection boundary. `dynexpr`'s
/// own `Value` is the concrete type on the other side of this `Any`; the
/// reflection layer never needs to know its shape.
pub type DynValue = Arc<dyn Any + Send + Sync>;

/// Capability for host objects that expose an ad-hoc property bag in
/// addition to (or instead of) statically-declared members. Member name
/// matching here is always case-sensitive, regardless of the
/// interpreter's case-sensitivity setting — this is a deliberate
/// asymmetry, not an oversight.
pub trait DynamicMembers: Send + Sync {
  /// Probes whether `name` names a dynamic member on this instance,
  /// without retrieving its value.
  fn has_member(&self, name: &str) -> bool;

  /// Retrieves the current value of the dynamic member `name`.
  fn get_member(&self, name: &str) -> Result<DynValue, DynamicBindingError>;

  /// Invokes the dynamic member `name` as a callable with `arguments`.
  fn invoke_member(&self, name: &str, arguments: &[DynValue]) -> Result<DynValue, DynamicBindingError>;

  /// Enumerates every dynamic member name currently exposed. Used by the
  /// identifier detector and IDE-style tooling, not by the binder itself.
  fn member_names(&self) -> Vec<String>;
}
