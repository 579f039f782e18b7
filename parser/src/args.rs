use std::collections::HashSet;

use dynexpr_reflect::{DynValue, TypeHandle};
use uuid::Uuid;

/// One parameter a caller declares for a parse: its name, its declared
/// type, and — for `eval` rather than `parse` — the value bound to it.
/// Lifetime spans a single parse or invocation; the caller owns it.
#[derive(Clone)]
pub struct Parameter {
  pub name: String,
  pub ty: TypeHandle,
  pub value: Option<DynValue>,
}

impl Parameter {
  pub fn new(name: impl Into<String>, ty: TypeHandle) -> Self {
    Self {
      name: name.into(),
      ty,
      value: None,
    }
  }

  pub fn with_value(mut self, value: DynValue) -> Self {
    self.value = Some(value);
    self
  }
}

/// Per-parse state threaded through every binder method: the source
/// text, the expected result type, the declared parameters, and the
/// accumulators that let the resulting `Lambda` report exactly which
/// parameters/types/identifiers it actually referenced.
///
/// Carries a `Uuid` so a host's `tracing` spans for one `parse`/`eval`
/// call can be correlated end to end, independent of how many nested
/// binder calls it takes.
pub struct ParserArguments<'a> {
  pub text: &'a str,
  pub expected_type: Option<TypeHandle>,
  pub declared_parameters: &'a [Parameter],
  pub correlation_id: Uuid,
  used_parameters: HashSet<usize>,
  used_types: HashSet<String>,
  used_identifiers: HashSet<String>,
}

impl<'a> ParserArguments<'a> {
  pub fn new(text: &'a str, expected_type: Option<TypeHandle>, declared_parameters: &'a [Parameter]) -> Self {
    Self {
      text,
      expected_type,
      declared_parameters,
      correlation_id: Uuid::now_v7(),
      used_parameters: HashSet::new(),
      used_types: HashSet::new(),
      used_identifiers: HashSet::new(),
    }
  }

  pub fn mark_parameter_used(&mut self, index: usize) {
    self.used_parameters.insert(index);
  }

  pub fn mark_type_used(&mut self, alias: &str) {
    self.used_types.insert(alias.to_string());
  }

  pub fn mark_identifier_used(&mut self, name: &str) {
    self.used_identifiers.insert(name.to_string());
  }

  pub fn used_parameters(&self) -> Vec<&Parameter> {
    let mut indices: Vec<_> = self.used_parameters.iter().copied().collect();
    indices.sort_unstable();
    indices
      .into_iter()
      .filter_map(|index| self.declared_parameters.get(index))
      .collect()
  }

  pub fn used_types(&self) -> &HashSet<String> {
    &self.used_types
  }

  pub fn used_identifiers(&self) -> &HashSet<String> {
    &self.used_identifiers
  }
}
