//! The `Lambda` artifact a parse produces: a bound expression tree plus
//! enough bookkeeping to invoke it repeatedly without re-parsing.

use std::sync::Arc;

use dynexpr_parser::args::{Parameter, ParserArguments};
use dynexpr_parser::ast::Expr;
use dynexpr_reflect::{DynValue, TypeHandle, Value};
use uuid::Uuid;

use crate::error::InvocationError;
use crate::invoker::eval;

/// A compiled, reusable piece of text: the typed tree `dynexpr_parser`
/// produced, its declared parameters, and the subset of them the tree
/// actually references. Cheap to invoke repeatedly — nothing here is
/// re-parsed or re-bound between calls.
pub struct Lambda {
  tree: Expr,
  declared_parameters: Vec<Parameter>,
  used_parameters: Vec<Parameter>,
  used_types: Vec<String>,
  used_identifiers: Vec<String>,
  correlation_id: Uuid,
  source: String,
}

impl Lambda {
  pub(crate) fn new(tree: Expr, declared_parameters: Vec<Parameter>, args: ParserArguments<'_>) -> Self {
    let used_parameters = args.used_parameters().into_iter().cloned().collect();
    let used_types = args.used_types().iter().cloned().collect();
    let used_identifiers = args.used_identifiers().iter().cloned().collect();
    Self {
      tree,
      declared_parameters,
      used_parameters,
      used_types,
      used_identifiers,
      correlation_id: args.correlation_id,
      source: args.text.to_string(),
    }
  }

  /// The static result type the binder settled on for this tree's root.
  pub fn return_type(&self) -> &TypeHandle {
    &self.tree.ty
  }

  /// Declared parameters this tree actually references, in declaration
  /// order — always a subset of `declared_parameters`.
  pub fn used_parameters(&self) -> &[Parameter] {
    &self.used_parameters
  }

  pub fn declared_parameters(&self) -> &[Parameter] {
    &self.declared_parameters
  }

  pub fn used_types(&self) -> &[String] {
    &self.used_types
  }

  pub fn used_identifiers(&self) -> &[String] {
    &self.used_identifiers
  }

  pub fn correlation_id(&self) -> Uuid {
    self.correlation_id
  }

  pub fn source(&self) -> &str {
    &self.source
  }

  /// Invokes the compiled tree against `arguments`, bound positionally to
  /// `declared_parameters`. The argument slice must be the same length and
  /// in the same order the `Lambda` was parsed with — not just the used
  /// subset — since `ExprKind::ParamRef` indexes into it directly.
  pub fn invoke(&self, arguments: &[DynValue]) -> Result<Value, InvocationError> {
    if arguments.len() != self.declared_parameters.len() {
      return Err(InvocationError::argument_count_mismatch(
        self.declared_parameters.len(),
        arguments.len(),
      ));
    }

    let result = eval(&self.tree, arguments, None)?;
    Value::from_dyn(&result).cloned().ok_or_else(|| {
      InvocationError::new(dynexpr_diagnostic::Diagnostic::new(
        dynexpr_diagnostic::DiagnosticCode::InvocationFailed,
        "result crossed the reflection boundary as an opaque host value; use invoke_typed",
      ))
    })
  }

  /// Same as [`Lambda::invoke`], but for a tree whose root evaluates to a
  /// host value (e.g. a member access returning a registered type) rather
  /// than a primitive — downcasts the opaque result to `T` instead of
  /// requiring it fit inside `Value`.
  pub fn invoke_typed<T: Send + Sync + 'static>(&self, arguments: &[DynValue]) -> Result<Arc<T>, InvocationError> {
    if arguments.len() != self.declared_parameters.len() {
      return Err(InvocationError::argument_count_mismatch(
        self.declared_parameters.len(),
        arguments.len(),
      ));
    }

    let result = eval(&self.tree, arguments, None)?;
    let unwrapped = match Value::from_dyn(&result) {
      Some(Value::Host(inner)) => inner.clone(),
      _ => result.clone(),
    };
    unwrapped.downcast::<T>().map_err(|_| {
      InvocationError::new(dynexpr_diagnostic::Diagnostic::new(
        dynexpr_diagnostic::DiagnosticCode::InvocationFailed,
        format!("result is not an instance of `{}`", std::any::type_name::<T>()),
      ))
    })
  }
}
