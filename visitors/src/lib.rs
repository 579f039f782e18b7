//! The ordered, de-duplicated pipeline of tree-to-tree rewrites and
//! validations a parse runs through after binding and before compilation.
//! Grounded on the pack's AST-visitor convention
//! (`ori_ir::visitor::Visitor` + its `walk_*` free functions): a trait
//! with one method per concern, and a standalone recursive walker so a
//! visitor only has to look at the node kinds it cares about.
//!
//! Unlike a read-only traversal visitor, a pipeline entry here can fail
//! the parse outright — that's the whole point of the built-in
//! reflection guard.

mod reflection_guard;

use dynexpr_parser::ast::{Expr, ExprKind};
use dynexpr_parser::error::ParseError;

pub use reflection_guard::ReflectionGuard;

/// A single pass over the bound expression tree. Visitors run in
/// insertion order and may veto the parse; none of the built-in
/// visitors rewrite the tree today, but the trait allows it (a visitor
/// returns the tree to keep, which may differ from the one it was
/// given).
pub trait Visitor: Send + Sync {
  /// Stable name, used for pipeline de-duplication and for removing a
  /// specific built-in (`enable_reflection` removes `"reflection-guard"`).
  fn name(&self) -> &'static str;

  /// Inspects (and may rewrite) `expr`. Returning `Err` aborts the parse.
  fn visit(&self, expr: Expr) -> Result<Expr, ParseError>;
}

/// The ordered set of visitors a parse runs through. Two visitors with
/// the same `name()` collapse to one entry — the one added last wins,
/// matching the registry's own "last write wins" convention.
pub struct VisitorPipeline {
  visitors: Vec<Box<dyn Visitor>>,
}

impl VisitorPipeline {
  pub fn new() -> Self {
    Self { visitors: Vec::new() }
  }

  /// The pipeline every fresh `Interpreter` starts with: just the
  /// reflection guard. `Interpreter::enable_reflection` removes it;
  /// nothing else is on by default.
  pub fn with_defaults() -> Self {
    let mut pipeline = Self::new();
    pipeline.add(Box::new(ReflectionGuard));
    pipeline
  }

  pub fn add(&mut self, visitor: Box<dyn Visitor>) {
    let name = visitor.name();
    self.visitors.retain(|existing| existing.name() != name);
    self.visitors.push(visitor);
  }

  pub fn remove(&mut self, name: &str) {
    self.visitors.retain(|existing| existing.name() != name);
  }

  pub fn contains(&self, name: &str) -> bool {
    self.visitors.iter().any(|existing| existing.name() == name)
  }

  /// Runs every visitor over `expr` in insertion order, threading its
  /// (possibly rewritten) result into the next one. The first visitor
  /// that errors aborts the whole pass.
  pub fn run(&self, mut expr: Expr) -> Result<Expr, ParseError> {
    for visitor in &self.visitors {
      expr = visitor.visit(expr)?;
    }
    Ok(expr)
  }
}

impl Default for VisitorPipeline {
  fn default() -> Self {
    Self::with_defaults()
  }
}

/// Depth-first, left-to-right walk over every child of `expr`, calling
/// `f` on each node reached (not including `expr` itself — callers visit
/// the root before or after walking, as their pass requires).
pub fn walk_children(expr: &Expr, f: &mut impl FnMut(&Expr)) {
  match &expr.kind {
    ExprKind::Constant(_)
    | ExprKind::ParamRef(_)
    | ExprKind::Identifier { .. }
    | ExprKind::LambdaParam(_)
    | ExprKind::TypeRef(_) => {},

    ExprKind::Member { receiver, .. } => {
      f(receiver);
      walk_children(receiver, f);
    },
    ExprKind::Call { receiver, arguments, .. } => {
      if let Some(receiver) = receiver {
        f(receiver);
        walk_children(receiver, f);
      }
      for argument in arguments {
        f(argument);
        walk_children(argument, f);
      }
    },
    ExprKind::Binary { lhs, rhs, .. } => {
      f(lhs);
      walk_children(lhs, f);
      f(rhs);
      walk_children(rhs, f);
    },
    ExprKind::Unary { operand, .. } => {
      f(operand);
      walk_children(operand, f);
    },
    ExprKind::Conditional {
      condition,
      then_branch,
      else_branch,
    } => {
      f(condition);
      walk_children(condition, f);
      f(then_branch);
      walk_children(then_branch, f);
      f(else_branch);
      walk_children(else_branch, f);
    },
    ExprKind::Cast { operand, .. } => {
      f(operand);
      walk_children(operand, f);
    },
    ExprKind::Lambda(lambda) => {
      f(&lambda.body);
      walk_children(&lambda.body, f);
    },
    ExprKind::DynamicGet { receiver, .. } => {
      f(receiver);
      walk_children(receiver, f);
    },
    ExprKind::DynamicCall { receiver, arguments, .. } => {
      f(receiver);
      walk_children(receiver, f);
      for argument in arguments {
        f(argument);
        walk_children(argument, f);
      }
    },
    ExprKind::Assign { target, value } => {
      f(target);
      walk_children(target, f);
      f(value);
      walk_children(value, f);
    },
  }
}
