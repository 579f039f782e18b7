//! Abstracts the host's reflection surface behind a handful of small
//! traits, and holds the registry of types, identifiers and extension
//! methods a parse binds names against.

pub mod builtins;
pub mod dynamic;
pub mod error;
pub mod registry;
pub mod type_info;

pub use builtins::{
  numeric_result_kind, primitive_kind_of, PrimitiveKind, PrimitiveType, Value, PRIMITIVE_ALIASES,
};
pub use dynamic::{DynValue, DynamicMembers};
pub use error::{ConfigurationError, DynamicBindingError, HostInvocationError};
pub use registry::{
  AssignmentPolicy, ExtensionMethod, HostCallable, Identifier, IdentifierBinding, ParserSettings,
  ReferenceType, RegistryOptions,
};
pub use type_info::{Conversion, HostTypeInfo, MemberInfo, MethodSignature, OverloadError, TypeHandle};
