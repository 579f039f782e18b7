//! Construction-time options for an [`crate::Interpreter`], mirroring
//! [`RegistryOptions`] one level up: the same case-sensitivity and seeding
//! choices, plus nothing else, since an `Interpreter` has no state beyond
//! the registry it wraps until a host starts registering types.

use dynexpr_reflect::RegistryOptions;

/// Options accepted by [`crate::Interpreter::new`]. A thin wrapper around
/// [`RegistryOptions`] rather than a re-declaration of the same three
/// fields, so the two stay in lockstep if the registry ever grows a new
/// seed group.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpreterOptions {
  pub case_insensitive: bool,
  pub seed_primitives: bool,
  pub seed_literal_keywords: bool,
}

impl InterpreterOptions {
  /// The options a host reaches for by default: case-sensitive, with the
  /// primitive type aliases and literal keywords seeded so `int`, `string`,
  /// `true`/`false`/`null` resolve without any registration calls.
  pub fn standard() -> Self {
    Self {
      case_insensitive: false,
      seed_primitives: true,
      seed_literal_keywords: true,
    }
  }

  pub(crate) fn registry_options(self) -> RegistryOptions {
    RegistryOptions {
      case_insensitive: self.case_insensitive,
      seed_primitives: self.seed_primitives,
      seed_literal_keywords: self.seed_literal_keywords,
    }
  }
}
