use std::sync::Arc;

use crate::{dynamic::DynValue, dynamic::DynamicMembers, error::HostInvocationError};

/// A registered host type, reached only through this handle. The core
/// never inspects a host type beyond calling these methods.
pub type TypeHandle = Arc<dyn HostTypeInfo>;

/// One member a host type exposes: a field, a property, a method, an
/// event, or a nested type. Enumerated by `HostTypeInfo::members`.
#[derive(Debug, Clone)]
pub enum MemberInfo {
  Field { name: String, ty: TypeHandle },
  Property { name: String, ty: TypeHandle },
  Method(MethodSignature),
  Event { name: String, ty: TypeHandle },
  NestedType { name: String, ty: TypeHandle },
}

impl MemberInfo {
  pub fn name(&self) -> &str {
    match self {
      MemberInfo::Field { name, .. } => name,
      MemberInfo::Property { name, .. } => name,
      MemberInfo::Method(signature) => &signature.name,
      MemberInfo::Event { name, .. } => name,
      MemberInfo::NestedType { name, .. } => name,
    }
  }
}

/// The shape of a resolved method or extension method: its name, its
/// parameter types in declaration order, its return type, and whether its
/// final parameter is variadic.
#[derive(Debug, Clone)]
pub struct MethodSignature {
  pub name: String,
  pub parameters: Vec<TypeHandle>,
  pub return_type: TypeHandle,
  pub is_variadic: bool,
}

/// Whether one type converts to another without a cast (`Implicit`) or
/// only with an explicit `as`/cast expression (`Explicit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
  Implicit,
  Explicit,
}

/// Failure resolving an overload against a candidate name and argument
/// types: either nothing applies, or more than one candidate is equally
/// good and the binder cannot break the tie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverloadError {
  NoApplicableOverload,
  AmbiguousOverload,
}

/// The reflection adapter the core consults instead of touching host
/// reflection directly. A host type opts in by implementing this trait
/// once; the binder never knows the concrete host type beneath it.
pub trait HostTypeInfo: std::fmt::Debug + Send + Sync {
  /// The type's own display name, for diagnostics.
  fn type_name(&self) -> &str;

  /// Lists the members matching `name`, honouring public accessibility
  /// and the supplied case-sensitivity flag. More than one result means
  /// an overloaded method group.
  fn members(&self, name: &str, case_sensitive: bool) -> Vec<MemberInfo>;

  /// Resolves a method call against `name` and the compile-time types of
  /// the call's arguments, picking the best applicable overload by
  /// standard conversion-cost ordering (exact match > widening > implicit
  /// user conversion > variadic).
  fn resolve_method(
    &self,
    name: &str,
    case_sensitive: bool,
    argument_types: &[TypeHandle],
  ) -> Result<MethodSignature, OverloadError>;

  /// Whether a value of this type can be used where `target` is
  /// expected, and if so, whether the conversion is implicit or
  /// requires an explicit cast.
  fn assignability(&self, target: &TypeHandle) -> Option<Conversion>;

  /// Whether instances of this type additionally expose dynamic members
  /// (an ad-hoc property bag) via `DynamicMembers`. Static resolution
  /// always takes precedence over a dynamic member of the same name.
  fn is_dynamic_capable(&self) -> bool {
    false
  }

  /// Extension methods this type contributes to the registry at the
  /// moment it is registered. Most host types contribute none; a type
  /// that groups related helpers (the way a host math/string module
  /// would) overrides this instead of registering each method by hand.
  fn extension_methods(&self) -> Vec<crate::registry::ExtensionMethod> {
    Vec::new()
  }

  /// Reads a previously-resolved member off a live instance.
  fn get_member(&self, receiver: &DynValue, member: &MemberInfo) -> Result<DynValue, HostInvocationError>;

  /// Writes a value through a previously-resolved member. Types with no
  /// mutable members can leave this at its default.
  fn set_member(
    &self,
    _receiver: &DynValue,
    member: &MemberInfo,
    _value: DynValue,
  ) -> Result<(), HostInvocationError> {
    Err(HostInvocationError::new(format!(
      "member `{}` is not assignable",
      member.name()
    )))
  }

  /// Invokes a previously-resolved method against a live instance.
  fn invoke_method(
    &self,
    receiver: &DynValue,
    signature: &MethodSignature,
    arguments: &[DynValue],
  ) -> Result<DynValue, HostInvocationError>;

  /// Narrows a receiver that already tested `is_dynamic_capable` into the
  /// ad-hoc member surface a compiler consults for a `DynamicGet`/
  /// `DynamicCall` node. A type returning `true` from `is_dynamic_capable`
  /// must override this; the default is only reachable through a bug in
  /// the binder (it already only emits a dynamic node after confirming
  /// the capability).
  fn as_dynamic<'v>(&self, _receiver: &'v DynValue) -> Option<&'v dyn DynamicMembers> {
    None
  }
}
