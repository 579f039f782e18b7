use dynexpr_lexer::{
  token::types::TokenType,
  Lexer,
};
use dynexpr_reflect::ParserSettings;

/// Output of a pre-parse classification pass: every bare identifier in
/// the text sorted into a known identifier, a known type alias, or an
/// unknown name the caller would have to supply as a parameter. Plain
/// value — membership/call chains are not validated.
#[derive(Debug, Clone, Default)]
pub struct IdentifiersInfo {
  pub identifiers: Vec<String>,
  pub types: Vec<String>,
  pub unknown_identifiers: Vec<String>,
}

/// Best-effort pass that tokenizes `text` and classifies every bare
/// identifier token without building an expression tree or consulting
/// the reflection adapter. A malformed token stream simply yields
/// whatever was classified before the lexer gave up.
pub fn detect(text: &str, settings: &ParserSettings) -> IdentifiersInfo {
  let tokens = match Lexer::new(text).tokenize() {
    Ok(tokens) => tokens,
    Err(_) => return IdentifiersInfo::default(),
  };

  let mut info = IdentifiersInfo::default();
  let mut previous_was_dot = false;

  for token in &tokens {
    if token.token_type != TokenType::Identifier {
      previous_was_dot = token.token_type == TokenType::Dot;
      continue;
    }

    if previous_was_dot {
      // A member name, not a bare reference — not classified.
      previous_was_dot = false;
      continue;
    }

    let name = token.lexeme.as_str();
    if settings.lookup_identifier(name).is_some() {
      push_unique(&mut info.identifiers, name);
    } else if settings.lookup_type(name).is_some() {
      push_unique(&mut info.types, name);
    } else {
      push_unique(&mut info.unknown_identifiers, name);
    }
  }

  info
}

fn push_unique(list: &mut Vec<String>, name: &str) {
  if !list.iter().any(|existing| existing == name) {
    list.push(name.to_string());
  }
}
