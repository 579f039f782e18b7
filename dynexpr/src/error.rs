//! The two failure kinds a built `Lambda` can raise once execution starts,
//! plus `EvalError`, the union `Interpreter::eval` returns. Parse-time
//! failures are never recovered inside the core, and runtime failures are
//! not caught either — both simply propagate to the caller.

use dynexpr_diagnostic::{Diagnostic, DiagnosticCode};
use dynexpr_parser::error::ParseError;
use dynexpr_reflect::{DynamicBindingError, HostInvocationError};

/// Failure during execution of a compiled callable: a division by zero, a
/// parameter/argument count mismatch discovered at invocation time, a
/// dynamic-member lookup that failed case-sensitively, or a host-level
/// exception bubbling up from a method/extension/function call. The
/// original host error is never altered, only wrapped, so the original
/// exception propagates unchanged.
#[derive(Debug, thiserror::Error)]
#[error("{}", diagnostic.message)]
pub struct InvocationError {
  pub diagnostic: Diagnostic,
}

impl InvocationError {
  pub fn new(diagnostic: Diagnostic) -> Self {
    Self { diagnostic }
  }

  pub fn division_by_zero() -> Self {
    Self::new(Diagnostic::new(DiagnosticCode::DivisionByZero, "division by zero"))
  }

  pub fn argument_count_mismatch(expected: usize, found: usize) -> Self {
    Self::new(Diagnostic::new(
      DiagnosticCode::ParameterArgumentCountMismatch,
      format!("expected {} argument(s), found {}", expected, found),
    ))
  }
}

impl From<HostInvocationError> for InvocationError {
  fn from(err: HostInvocationError) -> Self {
    Self::new(Diagnostic::new(DiagnosticCode::InvocationFailed, err.0))
  }
}

impl From<DynamicBindingError> for InvocationError {
  fn from(err: DynamicBindingError) -> Self {
    Self::new(err.diagnostic)
  }
}

/// `Interpreter::eval`'s result type: either the text never bound
/// (`ParseError`) or it bound but failed while running
/// (`InvocationError`). The two are kept distinct rather than flattened
/// into one enum-of-messages so a caller can tell a caller mistake from a
/// user-code failure apart without inspecting the message.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
  #[error(transparent)]
  Parse(#[from] ParseError),
  #[error(transparent)]
  Invocation(#[from] InvocationError),
}
