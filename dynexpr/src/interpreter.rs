//! The `Interpreter` facade: the single entry point a host constructs,
//! configures, and then calls `parse`/`eval`/`detect` against repeatedly.
//! Configure-then-freeze, same as the registry it wraps — registration
//! calls are expected to happen up front, never interleaved with parses.

use dynexpr_diagnostic::{Diagnostic, DiagnosticCode};
use dynexpr_parser::args::Parameter;
use dynexpr_parser::detect::{self, IdentifiersInfo};
use dynexpr_parser::error::ParseError;
use dynexpr_reflect::{
  AssignmentPolicy, ConfigurationError, IdentifierBinding, ParserSettings, TypeHandle, Value,
};
use dynexpr_visitors::{Visitor, VisitorPipeline};

use crate::error::EvalError;
use crate::lambda::Lambda;
use crate::options::InterpreterOptions;

/// A configured parser/evaluator for one family of expressions. Holds the
/// type & identifier registry and the visitor pipeline a `parse` runs
/// through; owns no per-call state, so a single `Interpreter` is meant to
/// be built once (typically at startup) and shared across every
/// subsequent `parse`/`eval` call.
pub struct Interpreter {
  settings: ParserSettings,
  visitors: VisitorPipeline,
}

impl Interpreter {
  pub fn new(options: InterpreterOptions) -> Self {
    Self {
      settings: ParserSettings::new(options.registry_options()),
      visitors: VisitorPipeline::with_defaults(),
    }
  }

  /// Registers a host type under `alias`, so expressions can reference it
  /// by name and resolve members/methods against it through `ty`.
  pub fn register_type(&mut self, alias: &str, ty: TypeHandle) -> Result<(), ConfigurationError> {
    self.settings.register_type(alias, ty)
  }

  /// Registers a named value or function an expression can reference
  /// bare, without it being a declared call parameter.
  pub fn register_identifier(
    &mut self,
    name: &str,
    declared_type: TypeHandle,
    binding: IdentifierBinding,
  ) -> Result<(), ConfigurationError> {
    self.settings.register_identifier(name, declared_type, binding)
  }

  pub fn set_assignment_policy(&mut self, policy: AssignmentPolicy) {
    self.settings.set_assignment_policy(policy);
  }

  /// Adds a visitor to the end of the pipeline (or replaces an existing
  /// one with the same name, keeping its original position).
  pub fn add_visitor(&mut self, visitor: Box<dyn Visitor>) {
    self.visitors.add(visitor);
  }

  /// Removes the built-in reflection guard, letting expressions reach
  /// `$type`/`GetType`-style members on any type that exposes them.
  pub fn enable_reflection(&mut self) {
    self.visitors.remove("reflection-guard");
  }

  #[tracing::instrument(level = "trace", skip(self, text, params), fields(correlation_id = tracing::field::Empty))]
  pub fn parse(
    &self,
    text: &str,
    expected_type: Option<TypeHandle>,
    params: &[Parameter],
  ) -> Result<Lambda, ParseError> {
    let (tree, args) = dynexpr_parser::parse(text, &self.settings, expected_type, params)?;
    tracing::Span::current().record("correlation_id", tracing::field::display(args.correlation_id));
    let tree = self.visitors.run(tree)?;
    Ok(Lambda::new(tree, params.to_vec(), args))
  }

  /// Parses `text` and immediately invokes it with no bound parameters —
  /// the shorthand a host reaches for when `text` is a closed expression
  /// rather than a template over `params`.
  #[tracing::instrument(level = "trace", skip(self, text, params), fields(correlation_id = tracing::field::Empty))]
  pub fn eval(
    &self,
    text: &str,
    expected_type: Option<TypeHandle>,
    params: &[Parameter],
  ) -> Result<Value, EvalError> {
    let lambda = self.parse(text, expected_type, params)?;
    tracing::Span::current().record("correlation_id", tracing::field::display(lambda.correlation_id()));
    let arguments = params
      .iter()
      .map(|param| {
        param.value.clone().ok_or_else(|| {
          EvalError::Invocation(crate::error::InvocationError::new(Diagnostic::new(
            DiagnosticCode::ParameterArgumentCountMismatch,
            format!("parameter `{}` has no bound value for eval", param.name),
          )))
        })
      })
      .collect::<Result<Vec<_>, _>>()?;
    Ok(lambda.invoke(&arguments)?)
  }

  /// Classifies every bare identifier in `text` without building an
  /// expression tree — a pre-flight pass a host can use to discover which
  /// names it would need to supply as parameters.
  pub fn detect(&self, text: &str) -> IdentifiersInfo {
    detect::detect(text, &self.settings)
  }
}
