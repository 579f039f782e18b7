#[cfg(test)]
mod lexer_tests {

  use dynexpr_lexer::{token::types::TokenType, Lexer};

  fn token_types(source: &str) -> Vec<TokenType> {
    Lexer::new(source)
      .tokenize()
      .unwrap()
      .into_iter()
      .map(|token| token.token_type)
      .collect()
  }

  #[test]
  fn scans_arithmetic_and_grouping() {
    let types = token_types("(1 + 2) * 3");
    assert_eq!(
      types,
      vec![
        TokenType::LeftParen,
        TokenType::IntegerLiteral,
        TokenType::Plus,
        TokenType::IntegerLiteral,
        TokenType::RightParen,
        TokenType::Star,
        TokenType::IntegerLiteral,
        TokenType::Eof,
      ]
    );
  }

  #[test]
  fn maximal_munch_prefers_longer_operators() {
    let types = token_types("a ?? b >> c <= d");
    assert_eq!(
      types,
      vec![
        TokenType::Identifier,
        TokenType::QuestionQuestion,
        TokenType::Identifier,
        TokenType::Shr,
        TokenType::Identifier,
        TokenType::LessEqual,
        TokenType::Identifier,
        TokenType::Eof,
      ]
    );
  }

  #[test]
  fn recognises_reserved_words_distinct_from_identifiers() {
    let types = token_types("true false null as is typeof default other");
    assert_eq!(
      types,
      vec![
        TokenType::True,
        TokenType::False,
        TokenType::Null,
        TokenType::As,
        TokenType::Is,
        TokenType::Typeof,
        TokenType::Default,
        TokenType::Identifier,
        TokenType::Eof,
      ]
    );
  }

  #[test]
  fn integer_suffix_selects_width() {
    use dynexpr_lexer::token::types::{IntegerWidth, Literal};

    let tokens = Lexer::new("42 42u 42l 42ul").tokenize().unwrap();
    let widths: Vec<IntegerWidth> = tokens
      .iter()
      .filter_map(|t| match &t.literal {
        Literal::Integer { width, .. } => Some(*width),
        _ => None,
      })
      .collect();

    assert_eq!(
      widths,
      vec![
        IntegerWidth::I32,
        IntegerWidth::U32,
        IntegerWidth::I64,
        IntegerWidth::U64,
      ]
    );
  }

  #[test]
  fn real_literal_with_leading_dot() {
    use dynexpr_lexer::token::types::Literal;

    let tokens = Lexer::new(".5").tokenize().unwrap();
    match &tokens[0].literal {
      Literal::Real { value, .. } => assert_eq!(*value, 0.5),
      other => panic!("expected a real literal, got {:?}", other),
    }
  }

  #[test]
  fn string_literal_resolves_escapes() {
    use dynexpr_lexer::token::types::Literal;

    let tokens = Lexer::new(r#""line\nA""#).tokenize().unwrap();
    match &tokens[0].literal {
      Literal::Str(value) => assert_eq!(value, "line\nA"),
      other => panic!("expected a string literal, got {:?}", other),
    }
  }

  #[test]
  fn unterminated_string_surfaces_a_diagnostic_with_byte_offset() {
    let err = Lexer::new("\"abc").tokenize().unwrap_err();
    assert_eq!(err.primary_offset(), Some(0));
  }

  #[test]
  fn unknown_character_is_a_lex_error() {
    let err = Lexer::new("a $ b").tokenize().unwrap_err();
    assert_eq!(err.primary_offset(), Some(2));
  }
}
