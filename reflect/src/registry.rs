use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use dynexpr_diagnostic::{Diagnostic, DiagnosticCode};
use dynexpr_lexer::token::types::TokenType;

use crate::{
  builtins::{PrimitiveKind, PrimitiveType, PRIMITIVE_ALIASES},
  dynamic::DynValue,
  error::{ConfigurationError, HostInvocationError},
  type_info::{MethodSignature, TypeHandle},
};

/// A host-supplied function backing an extension method or a registered
/// function identifier. Takes an optional receiver (`None` for a free
/// function) plus the bound argument values.
pub type HostCallable =
  Arc<dyn Fn(Option<&DynValue>, &[DynValue]) -> Result<DynValue, HostInvocationError> + Send + Sync>;

/// A registered type: its public alias, the host type handle behind it,
/// and the extension methods attached to it. Immutable once registered.
#[derive(Clone)]
pub struct ReferenceType {
  pub alias: String,
  pub handle: TypeHandle,
}

impl ReferenceType {
  pub fn new(alias: impl Into<String>, handle: TypeHandle) -> Self {
    Self {
      alias: alias.into(),
      handle,
    }
  }
}

impl std::fmt::Debug for ReferenceType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ReferenceType").field("alias", &self.alias).finish()
  }
}

/// A static method attached to a registered type, applicable to any
/// receiver whose type conforms to `signature`'s first parameter.
/// Searched only when instance-method resolution against the receiver
/// type fails.
#[derive(Clone)]
pub struct ExtensionMethod {
  pub name: String,
  pub signature: MethodSignature,
  pub implementation: HostCallable,
}

impl std::fmt::Debug for ExtensionMethod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ExtensionMethod").field("name", &self.name).finish()
  }
}

/// What a registered identifier is bound to: a fixed value, a mutable
/// cell a host can update between evaluations, or a callable function
/// value.
#[derive(Clone)]
pub enum IdentifierBinding {
  Constant(DynValue),
  Variable(Arc<RwLock<DynValue>>),
  Function(HostCallable),
}

/// A registered name and what it resolves to: either a value (constant
/// or variable cell) or a function, along with its declared type. Last
/// registration for a given name wins.
#[derive(Clone)]
pub struct Identifier {
  pub name: String,
  pub declared_type: TypeHandle,
  pub binding: IdentifierBinding,
}

impl Identifier {
  pub fn new(name: impl Into<String>, declared_type: TypeHandle, binding: IdentifierBinding) -> Self {
    Self {
      name: name.into(),
      declared_type,
      binding,
    }
  }
}

impl std::fmt::Debug for Identifier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Identifier").field("name", &self.name).finish()
  }
}

/// Whether assignment expressions are accepted by the parser at all, and
/// if so, which operator spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentPolicy {
  None,
  EqualOnly,
}

/// Case-sensitivity and seeding options requested at registry
/// construction. Each seed group is a batch registration and carries no
/// special semantics afterwards.
///
/// `seed_literal_keywords` exists for parity with the host contract,
/// which treats `true`/`false`/`null` as seedable literal identifiers,
/// but is a no-op here: this port's lexer already recognises those three
/// as dedicated literal tokens (`TokenType::True/False/Null`), so there
/// is no registry entry left for this group to seed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryOptions {
  pub case_insensitive: bool,
  pub seed_primitives: bool,
  pub seed_literal_keywords: bool,
}

/// The type & symbol registry a parse binds names against: known types,
/// known identifiers, and the aggregated extension methods discovered on
/// registered types. Configure-then-freeze: registration happens before
/// any `parse`/`eval` call, never concurrently with one.
pub struct ParserSettings {
  case_insensitive: bool,
  assignment_policy: AssignmentPolicy,
  types: HashMap<String, ReferenceType>,
  identifiers: HashMap<String, Identifier>,
  extension_methods: Vec<ExtensionMethod>,
}

impl ParserSettings {
  pub fn new(options: RegistryOptions) -> Self {
    let mut settings = Self {
      case_insensitive: options.case_insensitive,
      assignment_policy: AssignmentPolicy::None,
      types: HashMap::new(),
      identifiers: HashMap::new(),
      extension_methods: Vec::new(),
    };

    if options.seed_primitives {
      settings.seed_primitives();
    }

    settings
  }

  /// Batch-registers every primitive alias (`int`, `string`, `object`,
  /// ...) plus `null`'s own type. A fresh registry has none of these
  /// registered yet, so this can never fail with a duplicate-alias error.
  fn seed_primitives(&mut self) {
    for (alias, kind) in PRIMITIVE_ALIASES {
      self
        .register_type(alias, PrimitiveType::handle(*kind))
        .expect("primitive aliases are seeded into an empty registry");
    }
    self
      .register_type("null", PrimitiveType::handle(PrimitiveKind::Null))
      .expect("primitive aliases are seeded into an empty registry");
  }

  pub fn case_insensitive(&self) -> bool {
    self.case_insensitive
  }

  pub fn assignment_policy(&self) -> AssignmentPolicy {
    self.assignment_policy
  }

  pub fn set_assignment_policy(&mut self, policy: AssignmentPolicy) {
    self.assignment_policy = policy;
  }

  /// Canonicalises a name the way every registration and lookup does:
  /// lower-cased under a case-insensitive registry, verbatim otherwise.
  pub fn canonicalize(&self, name: &str) -> String {
    if self.case_insensitive {
      name.to_lowercase()
    } else {
      name.to_string()
    }
  }

  pub fn register_type(&mut self, alias: &str, handle: TypeHandle) -> Result<(), ConfigurationError> {
    if alias.is_empty() {
      return Err(ConfigurationError::new(
        "type alias must not be empty",
        Diagnostic::new(DiagnosticCode::NullName, "type alias must not be empty"),
      ));
    }

    if handle.type_name().is_empty() {
      return Err(ConfigurationError::new(
        "host type must report a non-empty type name",
        Diagnostic::new(DiagnosticCode::NullType, "host type must report a non-empty type name"),
      ));
    }

    let key = self.canonicalize(alias);
    if self.types.contains_key(&key) {
      return Err(ConfigurationError::new(
        format!("type alias `{}` is already registered", alias),
        Diagnostic::new(
          DiagnosticCode::DuplicateTypeAlias,
          format!("type alias `{}` is already registered", alias),
        ),
      ));
    }

    self.extension_methods.extend(discover_extension_methods(&handle));
    self.types.insert(key, ReferenceType::new(alias, handle));
    Ok(())
  }

  pub fn register_identifier(
    &mut self,
    name: &str,
    declared_type: TypeHandle,
    binding: IdentifierBinding,
  ) -> Result<(), ConfigurationError> {
    if name.is_empty() {
      return Err(ConfigurationError::new(
        "identifier name must not be empty",
        Diagnostic::new(DiagnosticCode::NullName, "identifier name must not be empty"),
      ));
    }

    if TokenType::is_reserved_word(name) {
      return Err(ConfigurationError::new(
        format!("`{}` is a reserved word and cannot be registered as an identifier", name),
        Diagnostic::new(
          DiagnosticCode::ReservedWordMisuse,
          format!("`{}` is a reserved word", name),
        ),
      ));
    }

    if declared_type.type_name().is_empty() {
      return Err(ConfigurationError::new(
        "identifier's declared type must report a non-empty type name",
        Diagnostic::new(
          DiagnosticCode::NullType,
          "identifier's declared type must report a non-empty type name",
        ),
      ));
    }

    let key = self.canonicalize(name);
    self
      .identifiers
      .insert(key, Identifier::new(name, declared_type, binding));
    Ok(())
  }

  pub fn lookup_type(&self, name: &str) -> Option<&ReferenceType> {
    self.types.get(&self.canonicalize(name))
  }

  pub fn lookup_identifier(&self, name: &str) -> Option<&Identifier> {
    self.identifiers.get(&self.canonicalize(name))
  }

  pub fn register_extension_method(&mut self, method: ExtensionMethod) {
    self.extension_methods.push(method);
  }

  /// Extension methods whose first parameter the receiver type conforms
  /// to, searched only after instance-method resolution against the
  /// receiver fails.
  pub fn extension_methods_for(&self, receiver: &TypeHandle) -> Vec<&ExtensionMethod> {
    self
      .extension_methods
      .iter()
      .filter(|method| {
        method
          .signature
          .parameters
          .first()
          .map_or(false, |first| receiver.assignability(first).is_some())
      })
      .collect()
  }
}

fn discover_extension_methods(handle: &TypeHandle) -> Vec<ExtensionMethod> {
  handle.extension_methods()
}
