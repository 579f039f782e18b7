//! Recursive-descent parser and semantic binder. As the token stream is
//! consumed it binds names against a [`ParserSettings`] registry and
//! produces a fully-typed [`ast::Expr`] tree in the same pass — there is
//! no separate untyped-AST stage.
//!
//! Precedence ladder, low to high: assignment, conditional `?:`,
//! null-coalesce, logical-or, logical-and, bitwise-or, bitwise-xor,
//! bitwise-and, equality, relational/`is`/`as`, shift, additive,
//! multiplicative, unary, cast, postfix, primary — one method per level,
//! the same `parse_addition` → `parse_multiplication` → `parse_unary` →
//! `parse_primary` chain shape, generalized to the full ladder.

pub mod args;
pub mod ast;
pub mod detect;
pub mod error;

use dynexpr_diagnostic::{Diagnostic, DiagnosticCode, Label, Span};
use dynexpr_lexer::{
  token::types::{IntegerWidth, Literal as TokenLiteral, RealWidth, TokenType},
  token::Token,
  Lexer,
};
use dynexpr_reflect::{
  numeric_result_kind, primitive_kind_of, AssignmentPolicy, Conversion, DynValue, ExtensionMethod,
  HostTypeInfo, IdentifierBinding, MemberInfo, MethodSignature, OverloadError, ParserSettings,
  PrimitiveKind, PrimitiveType, TypeHandle, Value,
};

use crate::{
  args::{Parameter, ParserArguments},
  ast::{BinaryOp, CallTarget, CastKind, Expr, ExprKind, LambdaExpr, UnaryOp},
  error::ParseError,
};

/// Parses `text` to completion: lexes it, binds every name it contains
/// against `settings`, and — if `expected_type` is given — inserts an
/// implicit conversion to it at the root. Returns the bound tree plus the
/// accumulators recording exactly which parameters/types/identifiers were
/// referenced, for the caller to fold into a `Lambda` artifact.
pub fn parse<'p>(
  text: &'p str,
  settings: &ParserSettings,
  expected_type: Option<TypeHandle>,
  declared_parameters: &'p [Parameter],
) -> Result<(Expr, ParserArguments<'p>), ParseError> {
  let tokens = Lexer::new(text).tokenize().map_err(ParseError::from)?;
  let mut parser = Parser {
    tokens,
    current: 0,
    settings,
    lambda_scopes: Vec::new(),
  };
  let mut args = ParserArguments::new(text, expected_type.clone(), declared_parameters);

  let mut expr = parser.parse_assignment(&mut args)?;
  parser.expect_eof()?;

  if let Some(expected) = &expected_type {
    let at = parser.peek().clone();
    expr = parser.convert_to(expr, expected, &at)?;
  }

  Ok((expr, args))
}

struct Parser<'s> {
  tokens: Vec<Token>,
  current: usize,
  settings: &'s ParserSettings,
  /// Innermost-last stack of lambda parameter names currently in scope,
  /// consulted before declared parameters/identifiers so a nested
  /// `x => ...` shadows an outer binding of the same name.
  lambda_scopes: Vec<Vec<String>>,
}

impl<'s> Parser<'s> {
  // ---- token-stream primitives -----------------------------------------

  fn peek(&self) -> &Token {
    &self.tokens[self.current]
  }

  fn peek_at(&self, offset: usize) -> Option<&Token> {
    self.tokens.get(self.current + offset)
  }

  fn check(&self, token_type: TokenType) -> bool {
    self.peek().token_type == token_type
  }

  fn advance(&mut self) -> Token {
    let token = self.tokens[self.current].clone();
    if self.current + 1 < self.tokens.len() {
      self.current += 1;
    }
    token
  }

  fn match_tok(&mut self, token_type: TokenType) -> bool {
    if self.check(token_type) {
      self.advance();
      true
    } else {
      false
    }
  }

  fn expect(&mut self, token_type: TokenType, code: DiagnosticCode, message: &str) -> Result<Token, ParseError> {
    if self.check(token_type) {
      Ok(self.advance())
    } else if self.check(TokenType::Eof) {
      // The input ran out before the expected token rather than some
      // other token standing in its place — a distinct failure from
      // whatever specific code the caller passed in for a wrong token.
      Err(self.error_at_current(DiagnosticCode::UnexpectedEof, "unexpected end of input"))
    } else {
      Err(self.error_at_current(code, message))
    }
  }

  fn expect_eof(&mut self) -> Result<(), ParseError> {
    if self.check(TokenType::Eof) {
      Ok(())
    } else {
      Err(self.error_at_current(
        DiagnosticCode::UnexpectedToken,
        "unexpected trailing tokens after expression",
      ))
    }
  }

  // ---- diagnostics --------------------------------------------------------

  fn error_at(&self, token: &Token, code: DiagnosticCode, message: impl Into<String>) -> ParseError {
    let message = message.into();
    ParseError::new(Diagnostic::new(code, message).with_label(Label::primary(
      Span::new(token.offset, token.line, token.column, token.lexeme.len().max(1)),
      None,
    )))
  }

  fn error_at_current(&self, code: DiagnosticCode, message: &str) -> ParseError {
    let token = self.peek().clone();
    self.error_at(&token, code, message.to_string())
  }

  fn type_mismatch(&self, token: &Token, message: impl Into<String>) -> ParseError {
    self.error_at(token, DiagnosticCode::TypeMismatch, message)
  }

  // ---- name resolution ----------------------------------------------------

  fn resolve_identifier(&mut self, token: &Token, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let name = token.lexeme.as_str();

    for scope in self.lambda_scopes.iter().rev() {
      if scope.iter().any(|p| p == name) {
        self.advance();
        return Ok(Expr::new(
          ExprKind::LambdaParam(name.to_string()),
          PrimitiveType::handle(PrimitiveKind::Object),
        ));
      }
    }

    if let Some(index) = args.declared_parameters.iter().position(|p| p.name == name) {
      self.advance();
      args.mark_parameter_used(index);
      let ty = args.declared_parameters[index].ty.clone();
      return Ok(Expr::new(ExprKind::ParamRef(index), ty));
    }

    if let Some(identifier) = self.settings.lookup_identifier(name) {
      self.advance();
      args.mark_identifier_used(&identifier.name);
      return Ok(Expr::new(
        ExprKind::Identifier {
          name: identifier.name.clone(),
          binding: identifier.binding.clone(),
        },
        identifier.declared_type.clone(),
      ));
    }

    if let Some(reference_type) = self.settings.lookup_type(name) {
      self.advance();
      args.mark_type_used(&reference_type.alias);
      let handle = reference_type.handle.clone();
      return Ok(Expr::new(ExprKind::TypeRef(handle.clone()), handle));
    }

    Err(self.error_at(
      token,
      DiagnosticCode::UnknownIdentifier,
      format!("unknown identifier `{}`", name),
    ))
  }

  fn parse_type_reference(&mut self, args: &mut ParserArguments<'_>) -> Result<TypeHandle, ParseError> {
    let token = self.expect(
      TokenType::Identifier,
      DiagnosticCode::ExpectedIdentifier,
      "expected a type name",
    )?;

    match self.settings.lookup_type(&token.lexeme) {
      Some(reference_type) => {
        args.mark_type_used(&reference_type.alias);
        Ok(reference_type.handle.clone())
      },
      None => Err(self.error_at(
        &token,
        DiagnosticCode::UnknownIdentifier,
        format!("unknown type `{}`", token.lexeme),
      )),
    }
  }

  // ---- precedence ladder ---------------------------------------------------

  fn parse_assignment(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let lhs = self.parse_conditional(args)?;

    if self.check(TokenType::Equal) {
      let eq_token = self.peek().clone();

      if self.settings.assignment_policy() == AssignmentPolicy::None {
        return Err(self.error_at(
          &eq_token,
          DiagnosticCode::AssignmentDisabled,
          "assignment is disabled for this interpreter",
        ));
      }

      self.ensure_lvalue(&lhs, &eq_token)?;
      self.advance();

      let rhs = self.parse_assignment(args)?;
      let rhs = self.convert_to(rhs, &lhs.ty, &eq_token)?;
      let ty = lhs.ty.clone();
      return Ok(Expr::new(
        ExprKind::Assign {
          target: Box::new(lhs),
          value: Box::new(rhs),
        },
        ty,
      ));
    }

    Ok(lhs)
  }

  fn ensure_lvalue(&self, expr: &Expr, at: &Token) -> Result<(), ParseError> {
    match &expr.kind {
      // A declared parameter is a positional call argument, not a mutable
      // cell — there is no runtime storage to write an assignment back
      // into, so it is rejected here rather than accepted and silently
      // dropped by the evaluator.
      ExprKind::ParamRef(_) => Err(self.error_at(
        at,
        DiagnosticCode::InvalidAssignmentTarget,
        "cannot assign to a declared parameter",
      )),
      ExprKind::Member { .. } => Ok(()),
      ExprKind::Call {
        target: CallTarget::Indexer { set: Some(_), .. },
        ..
      } => Ok(()),
      ExprKind::Identifier {
        binding: IdentifierBinding::Variable(_),
        ..
      } => Ok(()),
      ExprKind::Identifier { .. } => Err(self.error_at(
        at,
        DiagnosticCode::AssignmentToConstant,
        "cannot assign to a constant identifier",
      )),
      _ => Err(self.error_at(
        at,
        DiagnosticCode::InvalidAssignmentTarget,
        "assignment target must be a parameter, member, indexer, or variable identifier",
      )),
    }
  }

  fn parse_conditional(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let condition = self.parse_null_coalesce(args)?;

    if self.check(TokenType::Question) {
      let q_token = self.advance();
      self.require_bool(&condition, &q_token)?;

      let then_branch = self.parse_assignment(args)?;
      self.expect(TokenType::Colon, DiagnosticCode::UnexpectedToken, "expected ':' in conditional expression")?;
      let else_branch = self.parse_assignment(args)?;

      let ty = self.common_type(&then_branch.ty, &else_branch.ty, &q_token)?;
      return Ok(Expr::new(
        ExprKind::Conditional {
          condition: Box::new(condition),
          then_branch: Box::new(then_branch),
          else_branch: Box::new(else_branch),
        },
        ty,
      ));
    }

    Ok(condition)
  }

  fn parse_null_coalesce(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let mut lhs = self.parse_logical_or(args)?;

    while self.check(TokenType::QuestionQuestion) {
      let op = self.advance();
      let rhs = self.parse_logical_or(args)?;
      let ty = self.common_type(&lhs.ty, &rhs.ty, &op)?;
      lhs = Expr::new(
        ExprKind::Binary {
          op: BinaryOp::NullCoalesce,
          lhs: Box::new(lhs),
          rhs: Box::new(rhs),
        },
        ty,
      );
    }

    Ok(lhs)
  }

  fn parse_logical_or(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let mut lhs = self.parse_logical_and(args)?;

    while self.check(TokenType::PipePipe) {
      let op = self.advance();
      self.require_bool(&lhs, &op)?;
      let rhs = self.parse_logical_and(args)?;
      self.require_bool(&rhs, &op)?;
      lhs = Expr::new(
        ExprKind::Binary {
          op: BinaryOp::Or,
          lhs: Box::new(lhs),
          rhs: Box::new(rhs),
        },
        PrimitiveType::handle(PrimitiveKind::Bool),
      );
    }

    Ok(lhs)
  }

  fn parse_logical_and(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let mut lhs = self.parse_bitwise_or(args)?;

    while self.check(TokenType::AmpAmp) {
      let op = self.advance();
      self.require_bool(&lhs, &op)?;
      let rhs = self.parse_bitwise_or(args)?;
      self.require_bool(&rhs, &op)?;
      lhs = Expr::new(
        ExprKind::Binary {
          op: BinaryOp::And,
          lhs: Box::new(lhs),
          rhs: Box::new(rhs),
        },
        PrimitiveType::handle(PrimitiveKind::Bool),
      );
    }

    Ok(lhs)
  }

  fn parse_bitwise_or(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let mut lhs = self.parse_bitwise_xor(args)?;

    while self.check(TokenType::Pipe) {
      let op = self.advance();
      let rhs = self.parse_bitwise_xor(args)?;
      let ty = self.bitwise_result(&lhs, &rhs, &op)?;
      lhs = Expr::new(
        ExprKind::Binary {
          op: BinaryOp::BitOr,
          lhs: Box::new(lhs),
          rhs: Box::new(rhs),
        },
        ty,
      );
    }

    Ok(lhs)
  }

  fn parse_bitwise_xor(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let mut lhs = self.parse_bitwise_and(args)?;

    while self.check(TokenType::Caret) {
      let op = self.advance();
      let rhs = self.parse_bitwise_and(args)?;
      let ty = self.bitwise_result(&lhs, &rhs, &op)?;
      lhs = Expr::new(
        ExprKind::Binary {
          op: BinaryOp::BitXor,
          lhs: Box::new(lhs),
          rhs: Box::new(rhs),
        },
        ty,
      );
    }

    Ok(lhs)
  }

  fn parse_bitwise_and(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let mut lhs = self.parse_equality(args)?;

    while self.check(TokenType::Amp) {
      let op = self.advance();
      let rhs = self.parse_equality(args)?;
      let ty = self.bitwise_result(&lhs, &rhs, &op)?;
      lhs = Expr::new(
        ExprKind::Binary {
          op: BinaryOp::BitAnd,
          lhs: Box::new(lhs),
          rhs: Box::new(rhs),
        },
        ty,
      );
    }

    Ok(lhs)
  }

  fn bitwise_result(&self, lhs: &Expr, rhs: &Expr, at: &Token) -> Result<TypeHandle, ParseError> {
    match (kind_of(&lhs.ty), kind_of(&rhs.ty)) {
      (Some(PrimitiveKind::Bool), Some(PrimitiveKind::Bool)) => Ok(PrimitiveType::handle(PrimitiveKind::Bool)),
      (Some(a), Some(b)) if is_integer_kind(a) && is_integer_kind(b) => numeric_result_kind(a, b)
        .map(PrimitiveType::handle)
        .ok_or_else(|| self.type_mismatch(at, "incompatible operand types")),
      _ => Err(self.type_mismatch(at, "bitwise operators require two integers or two booleans")),
    }
  }

  fn parse_equality(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let mut lhs = self.parse_relational(args)?;

    loop {
      let op_kind = match self.peek().token_type {
        TokenType::EqualEqual => BinaryOp::Eq,
        TokenType::BangEqual => BinaryOp::NotEq,
        _ => break,
      };
      let op = self.advance();
      let rhs = self.parse_relational(args)?;
      self.check_equality_operands(&lhs, &rhs, &op)?;
      lhs = Expr::new(
        ExprKind::Binary {
          op: op_kind,
          lhs: Box::new(lhs),
          rhs: Box::new(rhs),
        },
        PrimitiveType::handle(PrimitiveKind::Bool),
      );
    }

    Ok(lhs)
  }

  fn check_equality_operands(&self, lhs: &Expr, rhs: &Expr, at: &Token) -> Result<(), ParseError> {
    if let (Some(a), Some(b)) = (kind_of(&lhs.ty), kind_of(&rhs.ty)) {
      if (a.is_numeric() && b.is_numeric()) || (a == PrimitiveKind::Bool && b == PrimitiveKind::Bool) {
        return Ok(());
      }
    }

    if lhs.ty.assignability(&rhs.ty).is_some() || rhs.ty.assignability(&lhs.ty).is_some() {
      return Ok(());
    }

    // `null` is reference-compatible with any host/reference type: a
    // primitive on the other side still has to go through the checks
    // above (`1 == null` isn't reference equality), but a bare host type
    // has no primitive kind at all, so it's accepted here as the
    // reference-equality case standard C-family rules carve out.
    let is_null = |ty: &TypeHandle| kind_of(ty) == Some(PrimitiveKind::Null);
    let is_reference = |ty: &TypeHandle| kind_of(ty).is_none();
    if (is_null(&lhs.ty) && is_reference(&rhs.ty)) || (is_null(&rhs.ty) && is_reference(&lhs.ty)) {
      return Ok(());
    }

    Err(self.type_mismatch(
      at,
      format!("cannot compare `{}` and `{}`", lhs.ty.type_name(), rhs.ty.type_name()),
    ))
  }

  fn parse_relational(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let mut lhs = self.parse_shift(args)?;

    loop {
      match self.peek().token_type {
        TokenType::Less | TokenType::LessEqual | TokenType::Greater | TokenType::GreaterEqual => {
          let op_kind = match self.peek().token_type {
            TokenType::Less => BinaryOp::Lt,
            TokenType::LessEqual => BinaryOp::LtEq,
            TokenType::Greater => BinaryOp::Gt,
            _ => BinaryOp::GtEq,
          };
          let op = self.advance();
          let rhs = self.parse_shift(args)?;
          self.require_numeric_both(&lhs, &rhs, &op)?;
          lhs = Expr::new(
            ExprKind::Binary {
              op: op_kind,
              lhs: Box::new(lhs),
              rhs: Box::new(rhs),
            },
            PrimitiveType::handle(PrimitiveKind::Bool),
          );
        },
        TokenType::Is => {
          self.advance();
          let target = self.parse_type_reference(args)?;
          lhs = Expr::new(
            ExprKind::Cast {
              operand: Box::new(lhs),
              target_type: target,
              kind: CastKind::TypeTest,
            },
            PrimitiveType::handle(PrimitiveKind::Bool),
          );
        },
        TokenType::As => {
          self.advance();
          let target = self.parse_type_reference(args)?;
          let ty = target.clone();
          lhs = Expr::new(
            ExprKind::Cast {
              operand: Box::new(lhs),
              target_type: target,
              kind: CastKind::Convert { explicit: false },
            },
            ty,
          );
        },
        _ => break,
      }
    }

    Ok(lhs)
  }

  fn require_numeric_both(&self, lhs: &Expr, rhs: &Expr, at: &Token) -> Result<(), ParseError> {
    match (kind_of(&lhs.ty), kind_of(&rhs.ty)) {
      (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => Ok(()),
      _ => Err(self.type_mismatch(at, "relational operators require numeric operands")),
    }
  }

  fn parse_shift(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let mut lhs = self.parse_additive(args)?;

    loop {
      let op_kind = match self.peek().token_type {
        TokenType::Shl => BinaryOp::Shl,
        TokenType::Shr => BinaryOp::Shr,
        _ => break,
      };
      let op = self.advance();
      let rhs = self.parse_additive(args)?;

      let lk = kind_of(&lhs.ty)
        .filter(|k| is_integer_kind(*k))
        .ok_or_else(|| self.type_mismatch(&op, "shift operators require integer operands"))?;
      kind_of(&rhs.ty)
        .filter(|k| is_integer_kind(*k))
        .ok_or_else(|| self.type_mismatch(&op, "shift operators require integer operands"))?;

      let ty = PrimitiveType::handle(if lk == PrimitiveKind::Char { PrimitiveKind::I32 } else { lk });
      lhs = Expr::new(
        ExprKind::Binary {
          op: op_kind,
          lhs: Box::new(lhs),
          rhs: Box::new(rhs),
        },
        ty,
      );
    }

    Ok(lhs)
  }

  fn parse_additive(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let mut lhs = self.parse_multiplicative(args)?;

    loop {
      let op_kind = match self.peek().token_type {
        TokenType::Plus => BinaryOp::Add,
        TokenType::Minus => BinaryOp::Sub,
        _ => break,
      };
      let op = self.advance();
      let rhs = self.parse_multiplicative(args)?;

      let ty = if op_kind == BinaryOp::Add && (is_str(&lhs.ty) || is_str(&rhs.ty)) {
        PrimitiveType::handle(PrimitiveKind::Str)
      } else {
        self.binary_numeric_result(&lhs, &rhs, &op)?
      };

      lhs = Expr::new(
        ExprKind::Binary {
          op: op_kind,
          lhs: Box::new(lhs),
          rhs: Box::new(rhs),
        },
        ty,
      );
    }

    Ok(lhs)
  }

  fn parse_multiplicative(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let mut lhs = self.parse_unary(args)?;

    loop {
      let op_kind = match self.peek().token_type {
        TokenType::Star => BinaryOp::Mul,
        TokenType::Slash => BinaryOp::Div,
        TokenType::Percent => BinaryOp::Mod,
        _ => break,
      };
      let op = self.advance();
      let rhs = self.parse_unary(args)?;
      let ty = self.binary_numeric_result(&lhs, &rhs, &op)?;
      lhs = Expr::new(
        ExprKind::Binary {
          op: op_kind,
          lhs: Box::new(lhs),
          rhs: Box::new(rhs),
        },
        ty,
      );
    }

    Ok(lhs)
  }

  fn binary_numeric_result(&self, lhs: &Expr, rhs: &Expr, at: &Token) -> Result<TypeHandle, ParseError> {
    match (kind_of(&lhs.ty), kind_of(&rhs.ty)) {
      (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => numeric_result_kind(a, b)
        .map(PrimitiveType::handle)
        .ok_or_else(|| self.type_mismatch(at, "incompatible numeric operand types")),
      _ => Err(self.type_mismatch(at, "operator requires numeric operands")),
    }
  }

  fn parse_unary(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    match self.peek().token_type {
      TokenType::Minus => {
        let op = self.advance();
        let operand = self.parse_unary(args)?;
        let kind = kind_of(&operand.ty)
          .filter(|k| k.is_numeric())
          .ok_or_else(|| self.type_mismatch(&op, "unary `-` requires a numeric operand"))?;
        let ty = PrimitiveType::handle(if kind == PrimitiveKind::Char { PrimitiveKind::I32 } else { kind });
        Ok(Expr::new(
          ExprKind::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(operand),
          },
          ty,
        ))
      },
      TokenType::Bang => {
        let op = self.advance();
        let operand = self.parse_unary(args)?;
        self.require_bool(&operand, &op)?;
        Ok(Expr::new(
          ExprKind::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
          },
          PrimitiveType::handle(PrimitiveKind::Bool),
        ))
      },
      TokenType::Tilde => {
        let op = self.advance();
        let operand = self.parse_unary(args)?;
        let kind = kind_of(&operand.ty)
          .filter(|k| is_integer_kind(*k))
          .ok_or_else(|| self.type_mismatch(&op, "unary `~` requires an integer operand"))?;
        Ok(Expr::new(
          ExprKind::Unary {
            op: UnaryOp::BitNot,
            operand: Box::new(operand),
          },
          PrimitiveType::handle(kind),
        ))
      },
      _ => self.parse_cast(args),
    }
  }

  fn require_bool(&self, expr: &Expr, at: &Token) -> Result<(), ParseError> {
    if is_bool(&expr.ty) {
      Ok(())
    } else {
      Err(self.type_mismatch(at, format!("expected a `bool` operand, found `{}`", expr.ty.type_name())))
    }
  }

  fn common_type(&self, a: &TypeHandle, b: &TypeHandle, at: &Token) -> Result<TypeHandle, ParseError> {
    if a.type_name() == b.type_name() {
      return Ok(a.clone());
    }
    if a.assignability(b) == Some(Conversion::Implicit) {
      return Ok(b.clone());
    }
    if b.assignability(a) == Some(Conversion::Implicit) {
      return Ok(a.clone());
    }
    Err(self.error_at(
      at,
      DiagnosticCode::ConditionalBranchMismatch,
      format!("branches have incompatible types `{}` and `{}`", a.type_name(), b.type_name()),
    ))
  }

  /// A parenthesised type followed by a unary expression is a cast;
  /// otherwise `(` starts a grouped expression. Disambiguated by a fixed
  /// lookahead: `(`, a known type name, `)`, then a token that can start
  /// a unary operand.
  fn parse_cast(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    if self.check(TokenType::LeftParen) && self.looks_like_cast() {
      self.advance();
      let target = self.parse_type_reference(args)?;
      self.expect(TokenType::RightParen, DiagnosticCode::MissingClosingParen, "expected ')' after cast type")?;
      let operand = self.parse_unary(args)?;
      return Ok(Expr::new(
        ExprKind::Cast {
          operand: Box::new(operand),
          target_type: target.clone(),
          kind: CastKind::Convert { explicit: true },
        },
        target,
      ));
    }

    self.parse_postfix(args)
  }

  fn looks_like_cast(&self) -> bool {
    let Some(type_token) = self.peek_at(1) else { return false };
    if type_token.token_type != TokenType::Identifier {
      return false;
    }
    if self.settings.lookup_type(&type_token.lexeme).is_none() {
      return false;
    }
    let Some(close) = self.peek_at(2) else { return false };
    if close.token_type != TokenType::RightParen {
      return false;
    }
    let Some(follow) = self.peek_at(3) else { return false };
    matches!(
      follow.token_type,
      TokenType::Identifier
        | TokenType::IntegerLiteral
        | TokenType::RealLiteral
        | TokenType::StringLiteral
        | TokenType::CharLiteral
        | TokenType::LeftParen
        | TokenType::Minus
        | TokenType::Bang
        | TokenType::Tilde
        | TokenType::True
        | TokenType::False
        | TokenType::Null
        | TokenType::Typeof
        | TokenType::Default
    )
  }

  // ---- postfix: member access, calls, indexing -----------------------------

  fn parse_postfix(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let mut expr = self.parse_primary(args)?;

    loop {
      match self.peek().token_type {
        TokenType::Dot => {
          self.advance();
          let name_token = self.expect(
            TokenType::Identifier,
            DiagnosticCode::ExpectedIdentifier,
            "expected a member name after '.'",
          )?;

          if self.check(TokenType::LeftParen) {
            self.advance();
            let arguments = self.parse_argument_list(args)?;
            expr = self.resolve_call(expr, &name_token, arguments)?;
          } else {
            expr = self.resolve_member(expr, &name_token)?;
          }
        },
        TokenType::LeftBracket => {
          self.advance();
          let bracket = self.tokens[self.current.saturating_sub(1)].clone();
          let index = self.parse_assignment(args)?;
          self.expect(TokenType::RightBracket, DiagnosticCode::MissingClosingBracket, "expected ']'")?;
          expr = self.resolve_indexer(expr, index, &bracket)?;
        },
        TokenType::LeftParen
          if matches!(
            expr.kind,
            ExprKind::Identifier {
              binding: IdentifierBinding::Function(_),
              ..
            }
          ) =>
        {
          self.advance();
          let arguments = self.parse_argument_list(args)?;
          expr = self.resolve_direct_call(expr, arguments);
        },
        _ => break,
      }
    }

    Ok(expr)
  }

  fn parse_argument_list(&mut self, args: &mut ParserArguments<'_>) -> Result<Vec<Expr>, ParseError> {
    let mut arguments = Vec::new();

    if !self.check(TokenType::RightParen) {
      loop {
        arguments.push(self.parse_assignment(args)?);
        if !self.match_tok(TokenType::Comma) {
          break;
        }
      }
    }

    self.expect(
      TokenType::RightParen,
      DiagnosticCode::MissingClosingParen,
      "expected ')' to close argument list",
    )?;
    Ok(arguments)
  }

  /// `e.x`: static member resolution first; a dynamic member of the same
  /// name is only consulted when no static member exists at all. Static
  /// precedence is absolute, per spec — an ambiguous static match is a
  /// binder error, never a silent fall-through to the dynamic surface.
  fn resolve_member(&mut self, receiver: Expr, name_token: &Token) -> Result<Expr, ParseError> {
    let case_sensitive = !self.settings.case_insensitive();
    let members = receiver.ty.members(&name_token.lexeme, case_sensitive);
    let non_methods: Vec<&MemberInfo> = members.iter().filter(|m| !matches!(m, MemberInfo::Method(_))).collect();

    if non_methods.len() == 1 {
      let member = non_methods[0].clone();
      let ty = member_type(&member);
      return Ok(Expr::new(
        ExprKind::Member {
          receiver: Box::new(receiver),
          member,
        },
        ty,
      ));
    }

    if non_methods.len() > 1 {
      return Err(self.error_at(
        name_token,
        DiagnosticCode::AmbiguousOverload,
        format!("member `{}` is ambiguous on type `{}`", name_token.lexeme, receiver.ty.type_name()),
      ));
    }

    if receiver.ty.is_dynamic_capable() {
      // The dynamic surface is consulted at runtime against whatever
      // value actually shows up there; the only static type a nested
      // dynamic chain (`a.b.c`) can usefully carry forward is the
      // receiver's own, so `a.b.c` re-probes the same dynamic capability
      // `a.b` was reached through rather than collapsing to `object`.
      let ty = receiver.ty.clone();
      return Ok(Expr::new(
        ExprKind::DynamicGet {
          receiver: Box::new(receiver),
          name: name_token.lexeme.clone(),
        },
        ty,
      ));
    }

    Err(self.error_at(
      name_token,
      DiagnosticCode::UnknownIdentifier,
      format!("no member named `{}` on type `{}`", name_token.lexeme, receiver.ty.type_name()),
    ))
  }

  /// `e.f(args)`: static overload resolution, then extension methods
  /// applicable to `e`'s type, then dynamic invocation — in that order,
  /// stopping at the first that applies.
  fn resolve_call(&mut self, receiver: Expr, name_token: &Token, arguments: Vec<Expr>) -> Result<Expr, ParseError> {
    let case_sensitive = !self.settings.case_insensitive();
    let arg_types: Vec<TypeHandle> = arguments.iter().map(|a| a.ty.clone()).collect();

    match receiver.ty.resolve_method(&name_token.lexeme, case_sensitive, &arg_types) {
      Ok(signature) => {
        let ty = signature.return_type.clone();
        let arguments = self.convert_arguments(arguments, &signature.parameters, name_token)?;
        return Ok(Expr::new(
          ExprKind::Call {
            receiver: Some(Box::new(receiver)),
            target: CallTarget::Method(signature),
            arguments,
          },
          ty,
        ));
      },
      Err(OverloadError::AmbiguousOverload) => {
        return Err(self.error_at(
          name_token,
          DiagnosticCode::AmbiguousOverload,
          format!("call to `{}` is ambiguous", name_token.lexeme),
        ));
      },
      Err(OverloadError::NoApplicableOverload) => {},
    }

    if let Some(extension) = self.find_extension_method(&receiver.ty, &name_token.lexeme, &arg_types, case_sensitive) {
      let ty = extension.signature.return_type.clone();
      let rest_params = &extension.signature.parameters[1..];
      let arguments = self.convert_arguments(arguments, rest_params, name_token)?;
      return Ok(Expr::new(
        ExprKind::Call {
          receiver: Some(Box::new(receiver)),
          target: CallTarget::Extension(extension),
          arguments,
        },
        ty,
      ));
    }

    if receiver.ty.is_dynamic_capable() {
      let ty = receiver.ty.clone();
      return Ok(Expr::new(
        ExprKind::DynamicCall {
          receiver: Box::new(receiver),
          name: name_token.lexeme.clone(),
          arguments,
        },
        ty,
      ));
    }

    Err(self.error_at(
      name_token,
      DiagnosticCode::NoApplicableOverload,
      format!("no method `{}` applicable on type `{}`", name_token.lexeme, receiver.ty.type_name()),
    ))
  }

  fn find_extension_method(
    &self,
    receiver_ty: &TypeHandle,
    name: &str,
    arg_types: &[TypeHandle],
    case_sensitive: bool,
  ) -> Option<ExtensionMethod> {
    for candidate in self.settings.extension_methods_for(receiver_ty) {
      let name_matches = if case_sensitive {
        candidate.name == name
      } else {
        candidate.name.eq_ignore_ascii_case(name)
      };
      if !name_matches {
        continue;
      }

      let rest = &candidate.signature.parameters[1..];
      if rest.len() != arg_types.len() {
        continue;
      }

      let applicable = rest
        .iter()
        .zip(arg_types.iter())
        .all(|(param, arg)| arg.type_name() == param.type_name() || arg.assignability(param).is_some());

      if applicable {
        return Some(candidate.clone());
      }
    }
    None
  }

  /// A direct call through a registered function identifier
  /// (`myFunc(1, 2)`), reached because `parse_primary` already resolved
  /// `myFunc` to an `Identifier` bound to a host callable.
  fn resolve_direct_call(&mut self, callee: Expr, arguments: Vec<Expr>) -> Expr {
    let ExprKind::Identifier {
      binding: IdentifierBinding::Function(callable),
      ..
    } = callee.kind
    else {
      unreachable!("resolve_direct_call is only reached for a Function-bound identifier");
    };

    Expr::new(
      ExprKind::Call {
        receiver: None,
        target: CallTarget::Function(callable),
        arguments,
      },
      PrimitiveType::handle(PrimitiveKind::Object),
    )
  }

  /// `e[i]`: resolved against accessor methods named by the host's
  /// compiled-indexer convention (`get_Item`/`set_Item`), the same names
  /// a C-family host runtime would compile a `this[...]` indexer down to.
  fn resolve_indexer(&mut self, receiver: Expr, index: Expr, at: &Token) -> Result<Expr, ParseError> {
    let case_sensitive = !self.settings.case_insensitive();
    let index_ty = index.ty.clone();

    match receiver.ty.resolve_method("get_Item", case_sensitive, std::slice::from_ref(&index_ty)) {
      Ok(get) => {
        let ty = get.return_type.clone();
        let set = receiver
          .ty
          .resolve_method("set_Item", case_sensitive, &[index_ty, ty.clone()])
          .ok();
        Ok(Expr::new(
          ExprKind::Call {
            receiver: Some(Box::new(receiver)),
            target: CallTarget::Indexer { get, set },
            arguments: vec![index],
          },
          ty,
        ))
      },
      Err(_) => Err(self.error_at(
        at,
        DiagnosticCode::NoApplicableOverload,
        format!("type `{}` has no indexer applicable to `{}`", receiver.ty.type_name(), index.ty.type_name()),
      )),
    }
  }

  fn convert_arguments(
    &self,
    arguments: Vec<Expr>,
    parameters: &[TypeHandle],
    at: &Token,
  ) -> Result<Vec<Expr>, ParseError> {
    if arguments.len() != parameters.len() {
      return Err(self.error_at(
        at,
        DiagnosticCode::ParameterArgumentCountMismatch,
        format!("expected {} argument(s), found {}", parameters.len(), arguments.len()),
      ));
    }

    arguments
      .into_iter()
      .zip(parameters.iter())
      .map(|(arg, param)| self.convert_to(arg, param, at))
      .collect()
  }

  fn convert_to(&self, expr: Expr, target: &TypeHandle, at: &Token) -> Result<Expr, ParseError> {
    if expr.ty.type_name() == target.type_name() {
      return Ok(expr);
    }

    match expr.ty.assignability(target) {
      Some(Conversion::Implicit) => Ok(Expr::new(
        ExprKind::Cast {
          operand: Box::new(expr),
          target_type: target.clone(),
          kind: CastKind::Convert { explicit: false },
        },
        target.clone(),
      )),
      _ => Err(self.type_mismatch(
        at,
        format!("cannot convert `{}` to `{}`", expr.ty.type_name(), target.type_name()),
      )),
    }
  }

  // ---- primary --------------------------------------------------------------

  fn parse_primary(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    if self.check(TokenType::Identifier) && matches!(self.peek_at(1).map(|t| t.token_type), Some(TokenType::FatArrow)) {
      return self.parse_lambda_single(args);
    }
    if self.check(TokenType::LeftParen) && self.looks_like_lambda_params() {
      return self.parse_lambda_multi(args);
    }

    let token = self.peek().clone();

    match token.token_type {
      TokenType::IntegerLiteral => {
        self.advance();
        self.integer_constant(&token)
      },
      TokenType::RealLiteral => {
        self.advance();
        self.real_constant(&token)
      },
      TokenType::StringLiteral => {
        self.advance();
        let TokenLiteral::Str(value) = token.literal else { unreachable!() };
        Ok(Expr::new(
          ExprKind::Constant(Value::str(value).into_dyn()),
          PrimitiveType::handle(PrimitiveKind::Str),
        ))
      },
      TokenType::CharLiteral => {
        self.advance();
        let TokenLiteral::Char(value) = token.literal else { unreachable!() };
        Ok(Expr::new(
          ExprKind::Constant(Value::Char(value).into_dyn()),
          PrimitiveType::handle(PrimitiveKind::Char),
        ))
      },
      TokenType::True | TokenType::False => {
        self.advance();
        let TokenLiteral::Bool(value) = token.literal else { unreachable!() };
        Ok(Expr::new(
          ExprKind::Constant(Value::Bool(value).into_dyn()),
          PrimitiveType::handle(PrimitiveKind::Bool),
        ))
      },
      TokenType::Null => {
        self.advance();
        Ok(Expr::new(
          ExprKind::Constant(Value::Null.into_dyn()),
          PrimitiveType::handle(PrimitiveKind::Null),
        ))
      },
      TokenType::LeftParen => {
        self.advance();
        let inner = self.parse_assignment(args)?;
        self.expect(TokenType::RightParen, DiagnosticCode::MissingClosingParen, "expected ')'")?;
        Ok(inner)
      },
      TokenType::Identifier => self.resolve_identifier(&token, args),
      TokenType::Default => self.parse_default(args),
      TokenType::Typeof => self.parse_typeof(args),
      _ => Err(self.error_at(&token, DiagnosticCode::ExpectedExpression, "expected an expression")),
    }
  }

  fn integer_constant(&self, token: &Token) -> Result<Expr, ParseError> {
    let TokenLiteral::Integer { value, width } = token.literal else {
      unreachable!()
    };

    let overflow = || self.error_at(token, DiagnosticCode::InvalidNumberLiteral, "integer literal out of range");

    let (dyn_value, kind) = match width {
      IntegerWidth::I32 => {
        if let Ok(v) = i32::try_from(value) {
          (Value::I32(v), PrimitiveKind::I32)
        } else if let Ok(v) = i64::try_from(value) {
          (Value::I64(v), PrimitiveKind::I64)
        } else if let Ok(v) = u64::try_from(value) {
          (Value::U64(v), PrimitiveKind::U64)
        } else {
          return Err(overflow());
        }
      },
      IntegerWidth::I64 => (Value::I64(i64::try_from(value).map_err(|_| overflow())?), PrimitiveKind::I64),
      IntegerWidth::U32 => (Value::U32(u32::try_from(value).map_err(|_| overflow())?), PrimitiveKind::U32),
      IntegerWidth::U64 => (Value::U64(u64::try_from(value).map_err(|_| overflow())?), PrimitiveKind::U64),
    };

    Ok(Expr::new(ExprKind::Constant(dyn_value.into_dyn()), PrimitiveType::handle(kind)))
  }

  fn real_constant(&self, token: &Token) -> Result<Expr, ParseError> {
    let TokenLiteral::Real { value, width } = token.literal else {
      unreachable!()
    };

    let (dyn_value, kind) = match width {
      RealWidth::F32 => (Value::F32(value as f32), PrimitiveKind::F32),
      RealWidth::F64 => (Value::F64(value), PrimitiveKind::F64),
      RealWidth::Decimal => (Value::Decimal(value), PrimitiveKind::Decimal),
    };

    Ok(Expr::new(ExprKind::Constant(dyn_value.into_dyn()), PrimitiveType::handle(kind)))
  }

  /// `default(Type)`: the type's zero/empty value. Left unblocked by the
  /// reflection-disabling visitor (it is a value producer, not an
  /// introspection entry point) unlike `typeof`.
  fn parse_default(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    self.advance();
    self.expect(TokenType::LeftParen, DiagnosticCode::UnexpectedToken, "expected '(' after 'default'")?;
    let ty = self.parse_type_reference(args)?;
    self.expect(
      TokenType::RightParen,
      DiagnosticCode::MissingClosingParen,
      "expected ')' to close 'default(...)'",
    )?;
    let value = default_value_for(&ty);
    Ok(Expr::new(ExprKind::Constant(value), ty))
  }

  /// `typeof(Type)`: represented as a member access to a synthetic
  /// `$type` member, the introspection entry point the default
  /// reflection-disabling visitor blocks.
  fn parse_typeof(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    self.advance();
    self.expect(TokenType::LeftParen, DiagnosticCode::UnexpectedToken, "expected '(' after 'typeof'")?;
    let ty = self.parse_type_reference(args)?;
    self.expect(
      TokenType::RightParen,
      DiagnosticCode::MissingClosingParen,
      "expected ')' to close 'typeof(...)'",
    )?;

    let receiver = Expr::new(ExprKind::TypeRef(ty.clone()), ty);
    let member = MemberInfo::Property {
      name: "$type".to_string(),
      ty: PrimitiveType::handle(PrimitiveKind::Object),
    };
    Ok(Expr::new(
      ExprKind::Member {
        receiver: Box::new(receiver),
        member,
      },
      PrimitiveType::handle(PrimitiveKind::Object),
    ))
  }

  // ---- lambda literals --------------------------------------------------------

  fn looks_like_lambda_params(&self) -> bool {
    let mut i = self.current + 1;
    loop {
      match self.tokens.get(i).map(|t| t.token_type) {
        Some(TokenType::RightParen) => {
          return matches!(self.tokens.get(i + 1).map(|t| t.token_type), Some(TokenType::FatArrow));
        },
        Some(TokenType::Identifier) | Some(TokenType::Comma) => i += 1,
        _ => return false,
      }
    }
  }

  fn parse_lambda_single(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    let name_token = self.advance();
    self.advance(); // '=>'

    self.lambda_scopes.push(vec![name_token.lexeme.clone()]);
    let body = self.parse_assignment(args);
    self.lambda_scopes.pop();
    let body = body?;

    let lambda = LambdaExpr {
      parameters: vec![(name_token.lexeme, PrimitiveType::handle(PrimitiveKind::Object))],
      body: Box::new(body),
    };
    Ok(Expr::new(ExprKind::Lambda(lambda), PrimitiveType::handle(PrimitiveKind::Object)))
  }

  fn parse_lambda_multi(&mut self, args: &mut ParserArguments<'_>) -> Result<Expr, ParseError> {
    self.advance(); // '('
    let mut names = Vec::new();

    if !self.check(TokenType::RightParen) {
      loop {
        let token = self.expect(
          TokenType::Identifier,
          DiagnosticCode::ExpectedIdentifier,
          "expected a lambda parameter name",
        )?;
        names.push(token.lexeme);
        if !self.match_tok(TokenType::Comma) {
          break;
        }
      }
    }

    self.expect(TokenType::RightParen, DiagnosticCode::MissingClosingParen, "expected ')'")?;
    self.expect(
      TokenType::FatArrow,
      DiagnosticCode::UnexpectedToken,
      "expected '=>' after lambda parameter list",
    )?;

    self.lambda_scopes.push(names.clone());
    let body = self.parse_assignment(args);
    self.lambda_scopes.pop();
    let body = body?;

    let parameters = names
      .into_iter()
      .map(|name| (name, PrimitiveType::handle(PrimitiveKind::Object)))
      .collect();
    Ok(Expr::new(
      ExprKind::Lambda(LambdaExpr {
        parameters,
        body: Box::new(body),
      }),
      PrimitiveType::handle(PrimitiveKind::Object),
    ))
  }
}

fn kind_of(ty: &TypeHandle) -> Option<PrimitiveKind> {
  primitive_kind_of(ty.type_name())
}

fn is_bool(ty: &TypeHandle) -> bool {
  kind_of(ty) == Some(PrimitiveKind::Bool)
}

fn is_str(ty: &TypeHandle) -> bool {
  kind_of(ty) == Some(PrimitiveKind::Str)
}

fn is_integer_kind(kind: PrimitiveKind) -> bool {
  matches!(kind, PrimitiveKind::I32 | PrimitiveKind::I64 | PrimitiveKind::U32 | PrimitiveKind::U64 | PrimitiveKind::Char)
}

fn member_type(member: &MemberInfo) -> TypeHandle {
  match member {
    MemberInfo::Field { ty, .. } => ty.clone(),
    MemberInfo::Property { ty, .. } => ty.clone(),
    MemberInfo::Event { ty, .. } => ty.clone(),
    MemberInfo::NestedType { ty, .. } => ty.clone(),
    MemberInfo::Method(signature) => signature.return_type.clone(),
  }
}

fn default_value_for(ty: &TypeHandle) -> DynValue {
  match primitive_kind_of(ty.type_name()) {
    Some(PrimitiveKind::Bool) => Value::Bool(false).into_dyn(),
    Some(PrimitiveKind::I32) => Value::I32(0).into_dyn(),
    Some(PrimitiveKind::I64) => Value::I64(0).into_dyn(),
    Some(PrimitiveKind::U32) => Value::U32(0).into_dyn(),
    Some(PrimitiveKind::U64) => Value::U64(0).into_dyn(),
    Some(PrimitiveKind::F32) => Value::F32(0.0).into_dyn(),
    Some(PrimitiveKind::F64) => Value::F64(0.0).into_dyn(),
    Some(PrimitiveKind::Decimal) => Value::Decimal(0.0).into_dyn(),
    Some(PrimitiveKind::Char) => Value::Char('\0').into_dyn(),
    _ => Value::Null.into_dyn(),
  }
}
