//! The "well-known types" seed data: primitive aliases and the concrete
//! `Value` representation the tree-walking evaluator in `dynexpr` produces
//! for anything that isn't an opaque host object. This is seed data fed
//! into the registry, not part of the reflection contract itself — but
//! something has to implement `HostTypeInfo` for `int`, `string`, `bool`
//! and friends, and this is the natural place for it to live alongside
//! the trait it implements.

use std::fmt;
use std::sync::Arc;

use crate::{
  dynamic::DynValue,
  error::HostInvocationError,
  type_info::{Conversion, HostTypeInfo, MemberInfo, MethodSignature, OverloadError, TypeHandle},
};

/// The concrete value every constant, every primitive-typed result, and
/// every parameter of a primitive type carries. Host-registered instances
/// never appear here directly — they travel as opaque `DynValue`s reached
/// only through the `HostTypeInfo` they were registered under — except
/// `Value::Host`, which is the primitive layer's way of carrying one
/// across a boundary (e.g. as an element of a cast or conditional) without
/// knowing its shape.
#[derive(Clone)]
pub enum Value {
  Null,
  Bool(bool),
  I32(i32),
  I64(i64),
  U32(u32),
  U64(u64),
  F32(f32),
  F64(f64),
  Decimal(f64),
  Char(char),
  Str(Arc<str>),
  Host(DynValue),
}

impl Value {
  pub fn str(s: impl Into<Arc<str>>) -> Self {
    Value::Str(s.into())
  }

  pub fn into_dyn(self) -> DynValue {
    Arc::new(self)
  }

  pub fn from_dyn(value: &DynValue) -> Option<&Value> {
    value.downcast_ref::<Value>()
  }

  /// Truthiness for `&&`/`||`/conditional/`??` short-circuiting. Only
  /// `Bool` genuinely participates; everything else is truthy unless it's
  /// `Null`, matching the host contract that booleans are the only type
  /// the parser accepts directly as a condition.
  pub fn is_truthy(&self) -> bool {
    match self {
      Value::Bool(b) => *b,
      Value::Null => false,
      _ => true,
    }
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => write!(f, "Null"),
      Value::Bool(b) => write!(f, "Bool({b})"),
      Value::I32(v) => write!(f, "I32({v})"),
      Value::I64(v) => write!(f, "I64({v})"),
      Value::U32(v) => write!(f, "U32({v})"),
      Value::U64(v) => write!(f, "U64({v})"),
      Value::F32(v) => write!(f, "F32({v})"),
      Value::F64(v) => write!(f, "F64({v})"),
      Value::Decimal(v) => write!(f, "Decimal({v})"),
      Value::Char(v) => write!(f, "Char({v:?})"),
      Value::Str(v) => write!(f, "Str({v:?})"),
      Value::Host(_) => write!(f, "Host(<opaque>)"),
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => write!(f, "null"),
      Value::Bool(v) => write!(f, "{v}"),
      Value::I32(v) => write!(f, "{v}"),
      Value::I64(v) => write!(f, "{v}"),
      Value::U32(v) => write!(f, "{v}"),
      Value::U64(v) => write!(f, "{v}"),
      Value::F32(v) => write!(f, "{v}"),
      Value::F64(v) => write!(f, "{v}"),
      Value::Decimal(v) => write!(f, "{v}"),
      Value::Char(v) => write!(f, "{v}"),
      Value::Str(v) => write!(f, "{v}"),
      Value::Host(_) => write!(f, "<object>"),
    }
  }
}

/// Which primitive a `PrimitiveType` handle names. `Object` is the "top"
/// host-object type: the static result type of `DynamicGet`/`DynamicCall`
/// nodes, and the type every other type — primitive or host — implicitly
/// converts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
  Object,
  Null,
  Bool,
  I32,
  I64,
  U32,
  U64,
  F32,
  F64,
  Decimal,
  Char,
  Str,
}

impl PrimitiveKind {
  pub fn name(&self) -> &'static str {
    match self {
      PrimitiveKind::Object => "object",
      PrimitiveKind::Null => "null",
      PrimitiveKind::Bool => "bool",
      PrimitiveKind::I32 => "int",
      PrimitiveKind::I64 => "long",
      PrimitiveKind::U32 => "uint",
      PrimitiveKind::U64 => "ulong",
      PrimitiveKind::F32 => "float",
      PrimitiveKind::F64 => "double",
      PrimitiveKind::Decimal => "decimal",
      PrimitiveKind::Char => "char",
      PrimitiveKind::Str => "string",
    }
  }

  pub fn is_numeric(&self) -> bool {
    matches!(
      self,
      PrimitiveKind::I32
        | PrimitiveKind::I64
        | PrimitiveKind::U32
        | PrimitiveKind::U64
        | PrimitiveKind::F32
        | PrimitiveKind::F64
        | PrimitiveKind::Decimal
        | PrimitiveKind::Char
    )
  }
}

/// Rank used by [`numeric_result_kind`] to pick the wider of two numeric
/// kinds; `None` for anything that doesn't participate in arithmetic.
fn numeric_rank(kind: PrimitiveKind) -> Option<u8> {
  use PrimitiveKind::*;
  match kind {
    Char => Some(0),
    I32 => Some(1),
    U32 => Some(2),
    I64 => Some(3),
    U64 => Some(4),
    F32 => Some(5),
    F64 => Some(6),
    Decimal => Some(7),
    _ => None,
  }
}

/// The result kind of a binary arithmetic operator applied to two numeric
/// operand kinds, following the widening table above: the wider of the two
/// wins, `char` never survives as a result kind (it widens to `int`), and
/// mixing a signed and unsigned 32-bit kind widens to `long` to avoid a
/// silent sign reinterpretation. `None` if either kind isn't numeric.
pub fn numeric_result_kind(a: PrimitiveKind, b: PrimitiveKind) -> Option<PrimitiveKind> {
  use PrimitiveKind::*;
  let (ra, rb) = (numeric_rank(a)?, numeric_rank(b)?);

  if (a == U32 && b == I32) || (a == I32 && b == U32) {
    return Some(I64);
  }

  let winner = if ra >= rb { a } else { b };
  Some(if winner == Char { I32 } else { winner })
}

/// A primitive, built-in type: `int`, `long`, `uint`, `ulong`, `float`,
/// `double`, `decimal`, `bool`, `char`, `string`, `object`, or the type of
/// the `null` literal. Registered under its alias the same way a host
/// type would be, via `ParserSettings::register_type` — primitives carry
/// no special status in the registry once seeded.
#[derive(Debug)]
pub struct PrimitiveType {
  kind: PrimitiveKind,
}

impl PrimitiveType {
  pub fn handle(kind: PrimitiveKind) -> TypeHandle {
    Arc::new(Self { kind })
  }

  pub fn kind(&self) -> PrimitiveKind {
    self.kind
  }
}

/// Implicit widening table for the numeric tower, standard C-family
/// rules: `char` and the narrower integer kinds widen to wider integers
/// and any floating kind; every numeric kind widens to `decimal`.
/// Anything not listed here is an explicit-only conversion (narrowing,
/// or between unrelated kinds).
fn implicit_numeric_target(from: PrimitiveKind, to: PrimitiveKind) -> bool {
  use PrimitiveKind::*;
  matches!(
    (from, to),
    (Char, I32)
      | (Char, I64)
      | (Char, U32)
      | (Char, U64)
      | (Char, F32)
      | (Char, F64)
      | (Char, Decimal)
      | (I32, I64)
      | (I32, F32)
      | (I32, F64)
      | (I32, Decimal)
      | (U32, I64)
      | (U32, U64)
      | (U32, F32)
      | (U32, F64)
      | (U32, Decimal)
      | (I64, F64)
      | (I64, Decimal)
      | (U64, F64)
      | (U64, Decimal)
      | (F32, F64)
      | (F32, Decimal)
  )
}

impl HostTypeInfo for PrimitiveType {
  fn type_name(&self) -> &str {
    self.kind.name()
  }

  fn members(&self, name: &str, case_sensitive: bool) -> Vec<MemberInfo> {
    let matches = |candidate: &str| {
      if case_sensitive {
        candidate == name
      } else {
        candidate.eq_ignore_ascii_case(name)
      }
    };

    let mut members = Vec::new();
    if matches("ToString") {
      members.push(MemberInfo::Method(MethodSignature {
        name: "ToString".to_string(),
        parameters: Vec::new(),
        return_type: PrimitiveType::handle(PrimitiveKind::Str),
        is_variadic: false,
      }));
    }
    if self.kind == PrimitiveKind::Str && matches("Length") {
      members.push(MemberInfo::Property {
        name: "Length".to_string(),
        ty: PrimitiveType::handle(PrimitiveKind::I32),
      });
    }
    members
  }

  fn resolve_method(
    &self,
    name: &str,
    case_sensitive: bool,
    argument_types: &[TypeHandle],
  ) -> Result<MethodSignature, OverloadError> {
    let matches = if case_sensitive {
      name == "ToString"
    } else {
      name.eq_ignore_ascii_case("ToString")
    };

    if matches && argument_types.is_empty() {
      return Ok(MethodSignature {
        name: "ToString".to_string(),
        parameters: Vec::new(),
        return_type: PrimitiveType::handle(PrimitiveKind::Str),
        is_variadic: false,
      });
    }

    Err(OverloadError::NoApplicableOverload)
  }

  fn assignability(&self, target: &TypeHandle) -> Option<Conversion> {
    let Some(target_kind) = primitive_kind_of(target.type_name()) else {
      return None;
    };

    if target_kind == PrimitiveKind::Object {
      return Some(Conversion::Implicit);
    }

    if target_kind == self.kind {
      return Some(Conversion::Implicit);
    }

    if self.kind == PrimitiveKind::Null {
      return Some(Conversion::Implicit);
    }

    if self.kind.is_numeric() && target_kind.is_numeric() {
      return if implicit_numeric_target(self.kind, target_kind) {
        Some(Conversion::Implicit)
      } else {
        Some(Conversion::Explicit)
      };
    }

    None
  }

  fn get_member(&self, receiver: &DynValue, member: &MemberInfo) -> Result<DynValue, HostInvocationError> {
    let value = Value::from_dyn(receiver)
      .ok_or_else(|| HostInvocationError::new("receiver is not a primitive value"))?;

    match member {
      MemberInfo::Property { name, .. } if name == "Length" => match value {
        Value::Str(s) => Ok(Value::I32(s.chars().count() as i32).into_dyn()),
        _ => Err(HostInvocationError::new("`Length` is only defined on `string`")),
      },
      _ => Err(HostInvocationError::new(format!("no such member `{}`", member.name()))),
    }
  }

  fn invoke_method(
    &self,
    receiver: &DynValue,
    signature: &MethodSignature,
    arguments: &[DynValue],
  ) -> Result<DynValue, HostInvocationError> {
    let value = Value::from_dyn(receiver)
      .ok_or_else(|| HostInvocationError::new("receiver is not a primitive value"))?;

    if signature.name == "ToString" && arguments.is_empty() {
      return Ok(Value::str(value.to_string()).into_dyn());
    }

    Err(HostInvocationError::new(format!("no such method `{}`", signature.name)))
  }
}

/// Every primitive alias, for `RegistryOptions`' primitive-seeding group.
pub const PRIMITIVE_ALIASES: &[(&str, PrimitiveKind)] = &[
  ("object", PrimitiveKind::Object),
  ("bool", PrimitiveKind::Bool),
  ("int", PrimitiveKind::I32),
  ("long", PrimitiveKind::I64),
  ("uint", PrimitiveKind::U32),
  ("ulong", PrimitiveKind::U64),
  ("float", PrimitiveKind::F32),
  ("double", PrimitiveKind::F64),
  ("decimal", PrimitiveKind::Decimal),
  ("char", PrimitiveKind::Char),
  ("string", PrimitiveKind::Str),
];

/// Maps a primitive's `type_name()` back to its `PrimitiveKind`, the only
/// way `PrimitiveType::assignability` can recognise another primitive
/// handle without a downcast (`HostTypeInfo` is a trait object boundary;
/// the registry never exposes concrete types across it). Exported so the
/// binder can classify a `TypeHandle` as numeric/bool/etc. without a
/// downcast either.
pub fn primitive_kind_of(name: &str) -> Option<PrimitiveKind> {
  PRIMITIVE_ALIASES
    .iter()
    .chain(std::iter::once(&("null", PrimitiveKind::Null)))
    .find(|(alias, _)| *alias == name)
    .map(|(_, kind)| *kind)
}
