//! An embeddable, host-driven expression interpreter: parses a small
//! C-family expression language against a reflection adapter supplied by
//! the host, binds every name against it in the same pass, and compiles
//! the result into a reusable `Lambda` a host can invoke repeatedly
//! without re-parsing.
//!
//! ```ignore
//! use dynexpr::{Interpreter, InterpreterOptions};
//!
//! let interpreter = Interpreter::new(InterpreterOptions::standard());
//! let value = interpreter.eval("1 + 2 * 3", None, &[])?;
//! ```

mod error;
mod interpreter;
mod invoker;
mod lambda;
mod options;

pub use dynexpr_diagnostic::{Diagnostic, DiagnosticCode, DiagnosticFormatter, Label, LabelStyle, Severity, Span};
pub use dynexpr_parser::args::Parameter;
pub use dynexpr_parser::detect::IdentifiersInfo;
pub use dynexpr_parser::error::ParseError;
pub use dynexpr_reflect::{
  AssignmentPolicy, ConfigurationError, Conversion, DynValue, DynamicBindingError, DynamicMembers,
  HostInvocationError, HostTypeInfo, IdentifierBinding, MemberInfo, MethodSignature, OverloadError,
  PrimitiveKind, TypeHandle, Value,
};
pub use dynexpr_visitors::{ReflectionGuard, Visitor, VisitorPipeline};

pub use error::{EvalError, InvocationError};
pub use interpreter::Interpreter;
pub use invoker::CompiledLambda;
pub use lambda::Lambda;
pub use options::InterpreterOptions;
