use dynexpr_diagnostic::Diagnostic;

use crate::token::Token;

pub mod token;
mod utils;

/// Turns an expression's source text into a token stream. Bytes, not
/// chars, are the unit of position: `offset` on every token and every
/// diagnostic is a byte index into the original text, per the host
/// contract for `ParseError`.
pub struct Lexer<'a> {
  source: &'a str,
  chars: Vec<(usize, char)>,
  tokens: Vec<Token>,
  line: usize,
  column: usize,
  start: usize,
  current: usize,
}

impl<'a> Lexer<'a> {
  pub fn new(source: &'a str) -> Self {
    Self {
      source,
      chars: source.char_indices().collect(),
      tokens: Vec::new(),
      line: 1,
      column: 1,
      start: 0,
      current: 0,
    }
  }

  /// Scans the whole source and returns its token stream, ending with an
  /// `Eof` token. The first lexical error aborts the scan: this core does
  /// not recover and keep scanning past a bad token.
  pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
    self.scan_tokens()?;
    Ok(self.tokens)
  }
}
