//! The tree-walking evaluator: one function per node kind. Failures here
//! are plain `Result`s rather than diagnostics accumulated through a
//! shared engine — a runtime failure is not caught anywhere inside this
//! module, it surfaces directly to the caller.

use std::collections::HashMap;
use std::sync::Arc;

use dynexpr_diagnostic::{Diagnostic, DiagnosticCode};
use dynexpr_parser::ast::{BinaryOp, CallTarget, CastKind, Expr, ExprKind, LambdaExpr, UnaryOp};
use dynexpr_reflect::{
  primitive_kind_of, DynValue, DynamicMembers, HostInvocationError, IdentifierBinding, PrimitiveKind, Value,
};

use crate::error::InvocationError;

/// Bindings captured by a lambda literal for its own parameters, chained
/// to any lambda it was itself nested inside — an environment chain like
/// any scope-walking interpreter uses, but immutable (lambda parameters
/// are bound once, at call time, never reassigned) so it can be shared
/// via `Arc` across threads instead of needing a `RefCell`.
pub(crate) struct LambdaBindings {
  values: HashMap<String, DynValue>,
  enclosing: Option<Arc<LambdaBindings>>,
}

impl LambdaBindings {
  fn get(&self, name: &str) -> Option<DynValue> {
    if let Some(value) = self.values.get(name) {
      return Some(value.clone());
    }
    self.enclosing.as_ref().and_then(|parent| parent.get(name))
  }
}

/// A lambda literal, compiled to a value a host can invoke the same way
/// it invokes a registered function identifier. Produced whenever
/// evaluation reaches an `ExprKind::Lambda` node; captures the top-level
/// parameter bindings and any enclosing lambda's bindings by reference so
/// a closure built deep inside a call tree still sees its lexical scope.
pub struct CompiledLambda {
  parameter_names: Vec<String>,
  body: Arc<Expr>,
  arguments: Arc<[DynValue]>,
  enclosing: Option<Arc<LambdaBindings>>,
}

impl CompiledLambda {
  /// Invokes the lambda with `arguments` bound positionally to its
  /// parameter names. The error type matches `HostCallable`'s — from a
  /// host's perspective a `CompiledLambda` it receives as an argument is
  /// just another callable, indistinguishable from one it supplied itself.
  pub fn call(&self, arguments: &[DynValue]) -> Result<DynValue, HostInvocationError> {
    if arguments.len() != self.parameter_names.len() {
      return Err(HostInvocationError::new(format!(
        "lambda expects {} argument(s), found {}",
        self.parameter_names.len(),
        arguments.len()
      )));
    }

    let bindings = Arc::new(LambdaBindings {
      values: self
        .parameter_names
        .iter()
        .cloned()
        .zip(arguments.iter().cloned())
        .collect(),
      enclosing: self.enclosing.clone(),
    });

    eval(&self.body, &self.arguments, Some(&bindings))
      .map_err(|err| HostInvocationError::new(err.diagnostic.message))
  }

  pub fn arity(&self) -> usize {
    self.parameter_names.len()
  }
}

/// Evaluates `expr` against the positional `arguments` a `Lambda` was
/// invoked with, and the innermost lambda scope in effect (if `expr` sits
/// inside a lambda body). Returns the raw `DynValue` the node produced —
/// a `Value` for anything primitive, or an opaque host value for
/// anything that crossed the reflection boundary.
pub(crate) fn eval(
  expr: &Expr,
  arguments: &[DynValue],
  lambda: Option<&Arc<LambdaBindings>>,
) -> Result<DynValue, InvocationError> {
  match &expr.kind {
    ExprKind::Constant(value) => Ok(value.clone()),

    ExprKind::ParamRef(index) => arguments.get(*index).cloned().ok_or_else(|| {
      InvocationError::new(Diagnostic::new(
        DiagnosticCode::ParameterArgumentCountMismatch,
        format!("no argument bound for parameter {}", index),
      ))
    }),

    ExprKind::LambdaParam(name) => lambda
      .and_then(|bindings| bindings.get(name))
      .ok_or_else(|| {
        InvocationError::new(Diagnostic::new(
          DiagnosticCode::InvocationFailed,
          format!("lambda parameter `{}` is not bound", name),
        ))
      }),

    ExprKind::TypeRef(ty) => Ok(Value::Host(Arc::new(ty.clone())).into_dyn()),

    ExprKind::Identifier { name, binding } => eval_identifier(name, binding),

    ExprKind::Member { receiver, member } => {
      let receiver_value = eval(receiver, arguments, lambda)?;
      Ok(receiver.ty.get_member(&receiver_value, member)?)
    },

    ExprKind::Call {
      receiver,
      target,
      arguments: call_args,
    } => eval_call(receiver.as_deref(), target, call_args, arguments, lambda),

    ExprKind::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, &expr.ty, arguments, lambda),

    ExprKind::Unary { op, operand } => eval_unary(*op, operand, &expr.ty, arguments, lambda),

    ExprKind::Conditional {
      condition,
      then_branch,
      else_branch,
    } => {
      let condition = eval(condition, arguments, lambda)?;
      let condition = as_value(&condition)?;
      if condition.is_truthy() {
        eval(then_branch, arguments, lambda)
      } else {
        eval(else_branch, arguments, lambda)
      }
    },

    ExprKind::Cast { operand, target_type, kind } => {
      let value = eval(operand, arguments, lambda)?;
      match kind {
        // Converting to `object` or to a host type is an identity
        // passthrough — assignability was already checked statically,
        // and there is no narrower runtime representation to move to.
        CastKind::Convert { .. } => match primitive_kind_of(target_type.type_name()) {
          Some(PrimitiveKind::Object) | None => Ok(value),
          Some(_) => convert_value(as_value(&value)?, target_type),
        },
        // A primitive runtime value is tested against its own kind; a
        // host value has no runtime type tag to inspect, so the test
        // falls back to the static assignability the binder computed
        // between the operand's declared type and the target.
        CastKind::TypeTest => {
          let result = match Value::from_dyn(&value) {
            Some(v) => type_test(v, target_type),
            None => operand.ty.assignability(target_type).is_some(),
          };
          Ok(Value::Bool(result).into_dyn())
        },
      }
    },

    ExprKind::Lambda(lambda_expr) => Ok(compile_lambda(lambda_expr, arguments, lambda)),

    ExprKind::DynamicGet { receiver, name } => {
      let receiver_value = eval(receiver, arguments, lambda)?;
      let dynamic = receiver.ty.as_dynamic(&receiver_value).ok_or_else(|| {
        InvocationError::new(Diagnostic::new(
          DiagnosticCode::InvocationFailed,
          format!("type `{}` advertised dynamic members but did not provide them", receiver.ty.type_name()),
        ))
      })?;
      if !dynamic.has_member(name) {
        return Err(dynamic_member_not_found(dynamic, name));
      }
      Ok(dynamic.get_member(name)?)
    },

    ExprKind::DynamicCall { receiver, name, arguments: call_args } => {
      let receiver_value = eval(receiver, arguments, lambda)?;
      let dynamic = receiver.ty.as_dynamic(&receiver_value).ok_or_else(|| {
        InvocationError::new(Diagnostic::new(
          DiagnosticCode::InvocationFailed,
          format!("type `{}` advertised dynamic members but did not provide them", receiver.ty.type_name()),
        ))
      })?;
      if !dynamic.has_member(name) {
        return Err(dynamic_member_not_found(dynamic, name));
      }
      let args = eval_all(call_args, arguments, lambda)?;
      Ok(dynamic.invoke_member(name, &args)?)
    },

    ExprKind::Assign { target, value } => {
      let value = eval(value, arguments, lambda)?;
      assign(target, value.clone(), arguments, lambda)?;
      Ok(value)
    },
  }
}

/// A dynamic lookup the binder allowed through (static resolution failed,
/// the type is dynamic-capable) but whose name the host's instance
/// doesn't actually recognise — either genuinely missing, or present
/// under different casing (dynamic-member matching is always
/// case-sensitive, regardless of the interpreter's own setting).
fn dynamic_member_not_found(dynamic: &dyn DynamicMembers, name: &str) -> InvocationError {
  if let Some(actual) = dynamic.member_names().into_iter().find(|candidate| candidate.eq_ignore_ascii_case(name)) {
    return InvocationError::new(Diagnostic::new(
      DiagnosticCode::DynamicMemberCaseMismatch,
      format!("no dynamic member named `{}`; found `{}` with different casing", name, actual),
    ));
  }

  InvocationError::new(Diagnostic::new(
    DiagnosticCode::DynamicMemberNotFound,
    format!("no dynamic member named `{}`", name),
  ))
}

fn eval_all(
  exprs: &[Expr],
  arguments: &[DynValue],
  lambda: Option<&Arc<LambdaBindings>>,
) -> Result<Vec<DynValue>, InvocationError> {
  exprs.iter().map(|expr| eval(expr, arguments, lambda)).collect()
}

fn eval_identifier(name: &str, binding: &IdentifierBinding) -> Result<DynValue, InvocationError> {
  match binding {
    IdentifierBinding::Constant(value) => Ok(value.clone()),
    IdentifierBinding::Variable(cell) => {
      let guard = cell.read().map_err(|_| {
        InvocationError::new(Diagnostic::new(
          DiagnosticCode::InvocationFailed,
          format!("identifier `{}` is poisoned", name),
        ))
      })?;
      Ok(guard.clone())
    },
    IdentifierBinding::Function(_) => Err(InvocationError::new(Diagnostic::new(
      DiagnosticCode::InvocationFailed,
      format!("identifier `{}` names a function and must be called, not read as a value", name),
    ))),
  }
}

fn eval_call(
  receiver: Option<&Expr>,
  target: &CallTarget,
  call_args: &[Expr],
  arguments: &[DynValue],
  lambda: Option<&Arc<LambdaBindings>>,
) -> Result<DynValue, InvocationError> {
  let args = eval_all(call_args, arguments, lambda)?;

  match target {
    CallTarget::Method(signature) => {
      let receiver_expr = receiver.expect("a Method call target always carries a receiver");
      let receiver_value = eval(receiver_expr, arguments, lambda)?;
      Ok(receiver_expr.ty.invoke_method(&receiver_value, signature, &args)?)
    },
    CallTarget::Extension(extension) => {
      let receiver_expr = receiver.expect("an Extension call target always carries a receiver");
      let receiver_value = eval(receiver_expr, arguments, lambda)?;
      Ok((extension.implementation)(Some(&receiver_value), &args)?)
    },
    CallTarget::Indexer { get, .. } => {
      let receiver_expr = receiver.expect("an Indexer call target always carries a receiver");
      let receiver_value = eval(receiver_expr, arguments, lambda)?;
      Ok(receiver_expr.ty.invoke_method(&receiver_value, get, &args)?)
    },
    CallTarget::Function(callable) => Ok(callable(None, &args)?),
  }
}

/// Writes `value` through an l-value the binder already validated
/// (`ensure_lvalue`): a parameter slot has no runtime storage to write
/// back into (parameters are positional call arguments, not mutable
/// cells), so only members, indexers, and variable identifiers are
/// actually reachable here.
fn assign(
  target: &Expr,
  value: DynValue,
  arguments: &[DynValue],
  lambda: Option<&Arc<LambdaBindings>>,
) -> Result<(), InvocationError> {
  match &target.kind {
    ExprKind::Member { receiver, member } => {
      let receiver_value = eval(receiver, arguments, lambda)?;
      receiver.ty.set_member(&receiver_value, member, value)?;
      Ok(())
    },
    ExprKind::Call {
      receiver: Some(receiver),
      target: CallTarget::Indexer { set: Some(set), .. },
      arguments: index_args,
    } => {
      let receiver_value = eval(receiver, arguments, lambda)?;
      let mut index_values = eval_all(index_args, arguments, lambda)?;
      index_values.push(value);
      receiver.ty.invoke_method(&receiver_value, set, &index_values)?;
      Ok(())
    },
    ExprKind::Identifier {
      binding: IdentifierBinding::Variable(cell),
      name,
    } => {
      let mut guard = cell.write().map_err(|_| {
        InvocationError::new(Diagnostic::new(
          DiagnosticCode::InvocationFailed,
          format!("identifier `{}` is poisoned", name),
        ))
      })?;
      *guard = value;
      Ok(())
    },
    _ => unreachable!("ensure_lvalue already restricted assignment targets to member/indexer/variable"),
  }
}

fn compile_lambda(
  lambda_expr: &LambdaExpr,
  arguments: &[DynValue],
  enclosing: Option<&Arc<LambdaBindings>>,
) -> DynValue {
  let compiled = CompiledLambda {
    parameter_names: lambda_expr.parameters.iter().map(|(name, _)| name.clone()).collect(),
    body: Arc::new((*lambda_expr.body).clone()),
    arguments: Arc::from(arguments.to_vec()),
    enclosing: enclosing.cloned(),
  };
  Arc::new(compiled)
}

fn as_value(value: &DynValue) -> Result<&Value, InvocationError> {
  Value::from_dyn(value).ok_or_else(|| {
    InvocationError::new(Diagnostic::new(
      DiagnosticCode::InvocationFailed,
      "expected a primitive value, found an opaque host value",
    ))
  })
}

/// Like `as_value`, but for the one place a raw host value is a legal
/// operand: equality. A registered host identifier evaluates to a bare
/// `DynValue` that never downcasts to `Value`, so it's wrapped as
/// `Value::Host` instead of rejected.
fn as_comparable(value: &DynValue) -> Value {
  match Value::from_dyn(value) {
    Some(v) => v.clone(),
    None => Value::Host(value.clone()),
  }
}

fn kind_of(value: &Value) -> Option<PrimitiveKind> {
  match value {
    Value::Null => Some(PrimitiveKind::Null),
    Value::Bool(_) => Some(PrimitiveKind::Bool),
    Value::I32(_) => Some(PrimitiveKind::I32),
    Value::I64(_) => Some(PrimitiveKind::I64),
    Value::U32(_) => Some(PrimitiveKind::U32),
    Value::U64(_) => Some(PrimitiveKind::U64),
    Value::F32(_) => Some(PrimitiveKind::F32),
    Value::F64(_) => Some(PrimitiveKind::F64),
    Value::Decimal(_) => Some(PrimitiveKind::Decimal),
    Value::Char(_) => Some(PrimitiveKind::Char),
    Value::Str(_) => Some(PrimitiveKind::Str),
    Value::Host(_) => None,
  }
}

fn as_i64(value: &Value) -> Option<i64> {
  match value {
    Value::I32(v) => Some(*v as i64),
    Value::I64(v) => Some(*v),
    Value::U32(v) => Some(*v as i64),
    Value::U64(v) => i64::try_from(*v).ok(),
    Value::Char(v) => Some(*v as i64),
    _ => None,
  }
}

fn as_u64(value: &Value) -> Option<u64> {
  match value {
    Value::I32(v) => u64::try_from(*v).ok(),
    Value::I64(v) => u64::try_from(*v).ok(),
    Value::U32(v) => Some(*v as u64),
    Value::U64(v) => Some(*v),
    Value::Char(v) => Some(*v as u64),
    _ => None,
  }
}

fn as_f64(value: &Value) -> Option<f64> {
  match value {
    Value::I32(v) => Some(*v as f64),
    Value::I64(v) => Some(*v as f64),
    Value::U32(v) => Some(*v as f64),
    Value::U64(v) => Some(*v as f64),
    Value::F32(v) => Some(*v as f64),
    Value::F64(v) => Some(*v),
    Value::Decimal(v) => Some(*v),
    Value::Char(v) => Some(*v as u32 as f64),
    _ => None,
  }
}

fn eval_binary(
  op: BinaryOp,
  lhs_expr: &Expr,
  rhs_expr: &Expr,
  result_ty: &dynexpr_reflect::TypeHandle,
  arguments: &[DynValue],
  lambda: Option<&Arc<LambdaBindings>>,
) -> Result<DynValue, InvocationError> {
  // Short-circuiting operators evaluate the right-hand side conditionally,
  // so they read their operands before the rest of the match below does.
  if op == BinaryOp::And || op == BinaryOp::Or {
    let lhs = eval(lhs_expr, arguments, lambda)?;
    let lhs_truthy = as_value(&lhs)?.is_truthy();
    return match (op, lhs_truthy) {
      (BinaryOp::Or, true) => Ok(Value::Bool(true).into_dyn()),
      (BinaryOp::And, false) => Ok(Value::Bool(false).into_dyn()),
      _ => {
        let rhs = eval(rhs_expr, arguments, lambda)?;
        Ok(Value::Bool(as_value(&rhs)?.is_truthy()).into_dyn())
      },
    };
  }

  if op == BinaryOp::NullCoalesce {
    let lhs = eval(lhs_expr, arguments, lambda)?;
    return if as_value(&lhs)?.is_null() {
      eval(rhs_expr, arguments, lambda)
    } else {
      Ok(lhs)
    };
  }

  let lhs = eval(lhs_expr, arguments, lambda)?;
  let rhs = eval(rhs_expr, arguments, lambda)?;

  // `==`/`!=` are the only operators a host/reference operand can reach
  // here (the binder only lets a host type through equality's
  // reference-compatibility carve-out), so only they need the looser
  // conversion that tolerates an opaque value on either side.
  if op == BinaryOp::Eq || op == BinaryOp::NotEq {
    let lhs_value = as_comparable(&lhs);
    let rhs_value = as_comparable(&rhs);
    let equal = values_equal(&lhs_value, &rhs_value);
    return Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }).into_dyn());
  }

  let lhs_value = as_value(&lhs)?;
  let rhs_value = as_value(&rhs)?;

  match op {
    BinaryOp::Eq | BinaryOp::NotEq => unreachable!("handled above"),
    BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
      let a = as_f64(lhs_value).ok_or_else(|| operand_type_error(op))?;
      let b = as_f64(rhs_value).ok_or_else(|| operand_type_error(op))?;
      let result = match op {
        BinaryOp::Lt => a < b,
        BinaryOp::LtEq => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::GtEq => a >= b,
        _ => unreachable!(),
      };
      Ok(Value::Bool(result).into_dyn())
    },
    BinaryOp::Add if matches!(lhs_value, Value::Str(_)) || matches!(rhs_value, Value::Str(_)) => {
      Ok(Value::str(format!("{}{}", lhs_value, rhs_value)).into_dyn())
    },
    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
      eval_arithmetic(op, lhs_value, rhs_value, result_ty)
    },
    BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => eval_bitwise(op, lhs_value, rhs_value, result_ty),
    BinaryOp::Shl | BinaryOp::Shr => eval_shift(op, lhs_value, rhs_value, result_ty),
    BinaryOp::And | BinaryOp::Or | BinaryOp::NullCoalesce => unreachable!("handled above"),
  }
}

fn operand_type_error(op: BinaryOp) -> InvocationError {
  InvocationError::new(Diagnostic::new(
    DiagnosticCode::InvocationFailed,
    format!("operator `{}` requires numeric operands", op),
  ))
}

fn values_equal(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Null, Value::Null) => true,
    (Value::Bool(a), Value::Bool(b)) => a == b,
    (Value::Str(a), Value::Str(b)) => a == b,
    (Value::Char(a), Value::Char(b)) => a == b,
    (Value::Host(a), Value::Host(b)) => Arc::ptr_eq(a, b),
    (Value::Host(_), Value::Null) | (Value::Null, Value::Host(_)) => false,
    _ => match (as_f64(a), as_f64(b)) {
      (Some(a), Some(b)) => a == b,
      _ => false,
    },
  }
}

fn result_kind(ty: &dynexpr_reflect::TypeHandle) -> Result<PrimitiveKind, InvocationError> {
  primitive_kind_of(ty.type_name()).ok_or_else(|| {
    InvocationError::new(Diagnostic::new(
      DiagnosticCode::InvocationFailed,
      format!("operator result type `{}` is not a primitive", ty.type_name()),
    ))
  })
}

fn eval_arithmetic(
  op: BinaryOp,
  lhs: &Value,
  rhs: &Value,
  result_ty: &dynexpr_reflect::TypeHandle,
) -> Result<DynValue, InvocationError> {
  use PrimitiveKind::*;

  match result_kind(result_ty)? {
    F32 | F64 | Decimal => {
      let a = as_f64(lhs).ok_or_else(|| operand_type_error(op))?;
      let b = as_f64(rhs).ok_or_else(|| operand_type_error(op))?;
      if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0.0 {
        return Err(InvocationError::division_by_zero());
      }
      let r = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => unreachable!(),
      };
      Ok(match result_kind(result_ty)? {
        F32 => Value::F32(r as f32),
        F64 => Value::F64(r),
        Decimal => Value::Decimal(r),
        _ => unreachable!(),
      }
      .into_dyn())
    },
    U32 | U64 => {
      let a = as_u64(lhs).ok_or_else(|| operand_type_error(op))?;
      let b = as_u64(rhs).ok_or_else(|| operand_type_error(op))?;
      if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0 {
        return Err(InvocationError::division_by_zero());
      }
      let r = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => unreachable!(),
      };
      Ok(if result_kind(result_ty)? == U32 {
        Value::U32(r as u32)
      } else {
        Value::U64(r)
      }
      .into_dyn())
    },
    I32 | I64 => {
      let a = as_i64(lhs).ok_or_else(|| operand_type_error(op))?;
      let b = as_i64(rhs).ok_or_else(|| operand_type_error(op))?;
      if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0 {
        return Err(InvocationError::division_by_zero());
      }
      let r = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => unreachable!(),
      };
      Ok(if result_kind(result_ty)? == I32 { Value::I32(r as i32) } else { Value::I64(r) }.into_dyn())
    },
    _ => Err(operand_type_error(op)),
  }
}

fn eval_bitwise(
  op: BinaryOp,
  lhs: &Value,
  rhs: &Value,
  result_ty: &dynexpr_reflect::TypeHandle,
) -> Result<DynValue, InvocationError> {
  if let (Value::Bool(a), Value::Bool(b)) = (lhs, rhs) {
    let r = match op {
      BinaryOp::BitAnd => a & b,
      BinaryOp::BitOr => a | b,
      BinaryOp::BitXor => a ^ b,
      _ => unreachable!(),
    };
    return Ok(Value::Bool(r).into_dyn());
  }

  use PrimitiveKind::*;
  match result_kind(result_ty)? {
    U32 | U64 => {
      let a = as_u64(lhs).ok_or_else(|| operand_type_error(op))?;
      let b = as_u64(rhs).ok_or_else(|| operand_type_error(op))?;
      let r = match op {
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        _ => unreachable!(),
      };
      Ok(if result_kind(result_ty)? == U32 { Value::U32(r as u32) } else { Value::U64(r) }.into_dyn())
    },
    I32 | I64 => {
      let a = as_i64(lhs).ok_or_else(|| operand_type_error(op))?;
      let b = as_i64(rhs).ok_or_else(|| operand_type_error(op))?;
      let r = match op {
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        _ => unreachable!(),
      };
      Ok(if result_kind(result_ty)? == I32 { Value::I32(r as i32) } else { Value::I64(r) }.into_dyn())
    },
    _ => Err(operand_type_error(op)),
  }
}

fn eval_shift(
  op: BinaryOp,
  lhs: &Value,
  rhs: &Value,
  result_ty: &dynexpr_reflect::TypeHandle,
) -> Result<DynValue, InvocationError> {
  use PrimitiveKind::*;
  let shift = as_u64(rhs).ok_or_else(|| operand_type_error(op))? as u32 & 63;

  match result_kind(result_ty)? {
    U64 => {
      let a = as_u64(lhs).ok_or_else(|| operand_type_error(op))?;
      let r = if op == BinaryOp::Shl { a.wrapping_shl(shift) } else { a.wrapping_shr(shift) };
      Ok(Value::U64(r).into_dyn())
    },
    U32 => {
      let a = as_u64(lhs).ok_or_else(|| operand_type_error(op))? as u32;
      let r = if op == BinaryOp::Shl { a.wrapping_shl(shift) } else { a.wrapping_shr(shift) };
      Ok(Value::U32(r).into_dyn())
    },
    I64 => {
      let a = as_i64(lhs).ok_or_else(|| operand_type_error(op))?;
      let r = if op == BinaryOp::Shl { a.wrapping_shl(shift) } else { a.wrapping_shr(shift) };
      Ok(Value::I64(r).into_dyn())
    },
    I32 => {
      let a = as_i64(lhs).ok_or_else(|| operand_type_error(op))? as i32;
      let r = if op == BinaryOp::Shl { a.wrapping_shl(shift) } else { a.wrapping_shr(shift) };
      Ok(Value::I32(r).into_dyn())
    },
    _ => Err(operand_type_error(op)),
  }
}

fn eval_unary(
  op: UnaryOp,
  operand_expr: &Expr,
  result_ty: &dynexpr_reflect::TypeHandle,
  arguments: &[DynValue],
  lambda: Option<&Arc<LambdaBindings>>,
) -> Result<DynValue, InvocationError> {
  let operand = eval(operand_expr, arguments, lambda)?;
  let value = as_value(&operand)?;

  match op {
    UnaryOp::Not => {
      let Value::Bool(b) = value else {
        return Err(InvocationError::new(Diagnostic::new(
          DiagnosticCode::InvocationFailed,
          "unary `!` requires a bool operand",
        )));
      };
      Ok(Value::Bool(!b).into_dyn())
    },
    UnaryOp::Neg => match result_kind(result_ty)? {
      PrimitiveKind::F32 => Ok(Value::F32(-as_f64(value).ok_or_else(|| operand_type_error_unary(op))? as f32).into_dyn()),
      PrimitiveKind::F64 => Ok(Value::F64(-as_f64(value).ok_or_else(|| operand_type_error_unary(op))?).into_dyn()),
      PrimitiveKind::Decimal => {
        Ok(Value::Decimal(-as_f64(value).ok_or_else(|| operand_type_error_unary(op))?).into_dyn())
      },
      PrimitiveKind::I64 => Ok(Value::I64(-as_i64(value).ok_or_else(|| operand_type_error_unary(op))?).into_dyn()),
      PrimitiveKind::I32 => Ok(Value::I32(-(as_i64(value).ok_or_else(|| operand_type_error_unary(op))? as i32)).into_dyn()),
      _ => Err(operand_type_error_unary(op)),
    },
    UnaryOp::BitNot => match result_kind(result_ty)? {
      PrimitiveKind::U64 => Ok(Value::U64(!as_u64(value).ok_or_else(|| operand_type_error_unary(op))?).into_dyn()),
      PrimitiveKind::U32 => Ok(Value::U32(!(as_u64(value).ok_or_else(|| operand_type_error_unary(op))? as u32)).into_dyn()),
      PrimitiveKind::I64 => Ok(Value::I64(!as_i64(value).ok_or_else(|| operand_type_error_unary(op))?).into_dyn()),
      PrimitiveKind::I32 => Ok(Value::I32(!(as_i64(value).ok_or_else(|| operand_type_error_unary(op))? as i32)).into_dyn()),
      _ => Err(operand_type_error_unary(op)),
    },
  }
}

fn operand_type_error_unary(op: UnaryOp) -> InvocationError {
  InvocationError::new(Diagnostic::new(
    DiagnosticCode::InvocationFailed,
    format!("unary `{}` requires a numeric operand", op),
  ))
}

/// Converts `value` to the primitive kind `target` names. Only called once
/// the caller has already ruled out `object` and host-type targets, both
/// of which pass the operand through unchanged rather than converting it.
fn convert_value(value: &Value, target: &dynexpr_reflect::TypeHandle) -> Result<DynValue, InvocationError> {
  let target_kind = primitive_kind_of(target.type_name())
    .expect("caller only calls convert_value with a primitive, non-object target");

  use PrimitiveKind::*;
  let converted = match target_kind {
    Bool => match value {
      Value::Bool(b) => Value::Bool(*b),
      _ => return Err(conversion_error(value, target_kind)),
    },
    I32 => Value::I32(as_i64(value).ok_or_else(|| conversion_error(value, target_kind))? as i32),
    I64 => Value::I64(as_i64(value).ok_or_else(|| conversion_error(value, target_kind))?),
    U32 => Value::U32(as_u64(value).ok_or_else(|| conversion_error(value, target_kind))? as u32),
    U64 => Value::U64(as_u64(value).ok_or_else(|| conversion_error(value, target_kind))?),
    F32 => Value::F32(as_f64(value).ok_or_else(|| conversion_error(value, target_kind))? as f32),
    F64 => Value::F64(as_f64(value).ok_or_else(|| conversion_error(value, target_kind))?),
    Decimal => Value::Decimal(as_f64(value).ok_or_else(|| conversion_error(value, target_kind))?),
    Char => match value {
      Value::Char(c) => Value::Char(*c),
      _ => return Err(conversion_error(value, target_kind)),
    },
    Str => Value::str(value.to_string()),
    Null => Value::Null,
    Object => unreachable!("handled above"),
  };

  Ok(converted.into_dyn())
}

fn conversion_error(value: &Value, target: PrimitiveKind) -> InvocationError {
  InvocationError::new(Diagnostic::new(
    DiagnosticCode::InvocationFailed,
    format!("cannot convert `{}` to `{}`", kind_of(value).map(|k| k.name()).unwrap_or("object"), target.name()),
  ))
}

fn type_test(value: &Value, target: &dynexpr_reflect::TypeHandle) -> bool {
  match (kind_of(value), primitive_kind_of(target.type_name())) {
    (Some(actual), Some(expected)) => actual == expected || expected == PrimitiveKind::Object,
    _ => false,
  }
}
