/// Every punctuator, keyword and literal kind the token source can
/// produce. Mirrors the C-family operator set the parser expects:
/// arithmetic, comparison, logical, bitwise, member access, indexing,
/// grouping, conditional, null-coalesce, type tests and assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
  // Grouping / indexing / separators
  LeftParen,
  RightParen,
  LeftBracket,
  RightBracket,
  Comma,
  Dot,
  Colon,
  Question,
  QuestionQuestion,
  FatArrow,

  // Arithmetic
  Plus,
  Minus,
  Star,
  Slash,
  Percent,

  // Comparison / assignment
  Bang,
  BangEqual,
  Equal,
  EqualEqual,
  Greater,
  GreaterEqual,
  Less,
  LessEqual,

  // Logical
  AmpAmp,
  PipePipe,

  // Bitwise
  Amp,
  Pipe,
  Caret,
  Tilde,
  Shl,
  Shr,

  // Literals
  Identifier,
  IntegerLiteral,
  RealLiteral,
  StringLiteral,
  CharLiteral,

  // Keywords
  True,
  False,
  Null,
  As,
  Is,
  Typeof,
  Default,

  Eof,
}

impl TokenType {
  /// Maps a scanned identifier lexeme to its keyword token, if it names
  /// one of the reserved words. Everything else is a plain identifier.
  pub fn keyword(lexeme: &str) -> Option<TokenType> {
    match lexeme {
      "true" => Some(TokenType::True),
      "false" => Some(TokenType::False),
      "null" => Some(TokenType::Null),
      "as" => Some(TokenType::As),
      "is" => Some(TokenType::Is),
      "typeof" => Some(TokenType::Typeof),
      "default" => Some(TokenType::Default),
      _ => None,
    }
  }

  pub fn is_reserved_word(lexeme: &str) -> bool {
    Self::keyword(lexeme).is_some()
  }
}

/// Integer literal width, selected by an optional type suffix
/// (`u`, `l`, `ul`/`lu`); unsuffixed literals default to `I32`
/// unless the value overflows it, in which case the binder widens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerWidth {
  I32,
  I64,
  U32,
  U64,
}

/// Real literal width, selected by an optional type suffix
/// (`f` single, `m` decimal); unsuffixed literals default to `F64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealWidth {
  F32,
  F64,
  Decimal,
}

/// The literal value carried alongside a token, already decoded from its
/// source text (escapes resolved, suffix parsed). Non-literal tokens
/// carry `Literal::None`.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
  None,
  Integer { value: i128, width: IntegerWidth },
  Real { value: f64, width: RealWidth },
  Str(String),
  Char(char),
  Bool(bool),
  Null,
}

impl std::fmt::Display for Literal {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Literal::None => write!(f, "none"),
      Literal::Integer { value, .. } => write!(f, "{}", value),
      Literal::Real { value, .. } => write!(f, "{}", value),
      Literal::Str(s) => write!(f, "{:?}", s),
      Literal::Char(c) => write!(f, "{:?}", c),
      Literal::Bool(b) => write!(f, "{}", b),
      Literal::Null => write!(f, "null"),
    }
  }
}
