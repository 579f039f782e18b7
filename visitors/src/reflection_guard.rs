use dynexpr_diagnostic::{Diagnostic, DiagnosticCode};
use dynexpr_parser::ast::{CallTarget, Expr, ExprKind};
use dynexpr_parser::error::ParseError;

use crate::{walk_children, Visitor};

/// Member and method names that reach a host runtime's introspection
/// surface: `typeof(...)` (lowered to a `$type` member access, see
/// `dynexpr_parser`'s `parse_typeof`), `GetType()`, and the handful of
/// names a C-family host would expose for walking the assembly/member
/// graph. Matched case-insensitively, independent of the interpreter's
/// own case-sensitivity setting — this blocklist is a security boundary,
/// not a name-resolution rule.
const BLOCKED_NAMES: &[&str] = &[
  "$type",
  "gettype",
  "assembly",
  "getassemblies",
  "getmembers",
  "getmethods",
  "getproperties",
  "getfields",
  "memberinfo",
  "methodinfo",
  "propertyinfo",
  "fieldinfo",
  "invokemember",
];

fn is_blocked(name: &str) -> bool {
  BLOCKED_NAMES.iter().any(|blocked| name.eq_ignore_ascii_case(blocked))
}

/// The default visitor every fresh `Interpreter` carries: fails the
/// parse if the bound tree reaches any node naming a blocked
/// introspection member or method. `Interpreter::enable_reflection`
/// removes this visitor by name (`"reflection-guard"`) rather than
/// flipping an internal flag, so a host can equally well swap in a
/// stricter or looser custom replacement.
pub struct ReflectionGuard;

impl ReflectionGuard {
  fn check(expr: &Expr) -> Result<(), ParseError> {
    let blocked_name = match &expr.kind {
      ExprKind::Member { member, .. } if is_blocked(member.name()) => Some(member.name().to_string()),
      ExprKind::Call {
        target: CallTarget::Method(signature),
        ..
      } if is_blocked(&signature.name) => Some(signature.name.clone()),
      ExprKind::DynamicGet { name, .. } | ExprKind::DynamicCall { name, .. } if is_blocked(name) => {
        Some(name.clone())
      },
      _ => None,
    };

    if let Some(name) = blocked_name {
      return Err(ParseError::new(Diagnostic::new(
        DiagnosticCode::ReflectionAccessBlocked,
        format!("expression reaches the host's reflection surface through `{}`", name),
      )));
    }

    Ok(())
  }
}

impl Visitor for ReflectionGuard {
  fn name(&self) -> &'static str {
    "reflection-guard"
  }

  fn visit(&self, expr: Expr) -> Result<Expr, ParseError> {
    Self::check(&expr)?;

    let mut error = None;
    walk_children(&expr, &mut |node| {
      if error.is_none() {
        if let Err(e) = Self::check(node) {
          error = Some(e);
        }
      }
    });

    match error {
      Some(e) => Err(e),
      None => Ok(expr),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use dynexpr_parser::ast::{Expr, ExprKind};
  use dynexpr_reflect::{PrimitiveKind, PrimitiveType, Value};

  use super::*;

  #[test]
  fn allows_an_ordinary_tree() {
    let expr = Expr::new(
      ExprKind::Constant(Value::I32(1).into_dyn()),
      PrimitiveType::handle(PrimitiveKind::I32),
    );
    assert!(ReflectionGuard.visit(expr).is_ok());
  }

  #[test]
  fn blocks_a_typeof_shaped_member() {
    use dynexpr_reflect::MemberInfo;

    let receiver = Expr::new(
      ExprKind::TypeRef(PrimitiveType::handle(PrimitiveKind::I32)),
      PrimitiveType::handle(PrimitiveKind::I32),
    );
    let expr = Expr::new(
      ExprKind::Member {
        receiver: Box::new(receiver),
        member: MemberInfo::Property {
          name: "$type".to_string(),
          ty: PrimitiveType::handle(PrimitiveKind::Object),
        },
      },
      PrimitiveType::handle(PrimitiveKind::Object),
    );

    let err = ReflectionGuard.visit(expr).unwrap_err();
    assert!(err.diagnostic.message.contains("$type"));
  }

  #[test]
  fn blocks_a_nested_gettype_call() {
    use dynexpr_reflect::MethodSignature;

    let receiver = Expr::new(
      ExprKind::Constant(Value::Str(Arc::from("hi")).into_dyn()),
      PrimitiveType::handle(PrimitiveKind::Str),
    );
    let call = Expr::new(
      ExprKind::Call {
        receiver: Some(Box::new(receiver)),
        target: CallTarget::Method(MethodSignature {
          name: "GetType".to_string(),
          parameters: Vec::new(),
          return_type: PrimitiveType::handle(PrimitiveKind::Object),
          is_variadic: false,
        }),
        arguments: Vec::new(),
      },
      PrimitiveType::handle(PrimitiveKind::Object),
    );

    let wrapper = Expr::new(
      ExprKind::Unary {
        op: dynexpr_parser::ast::UnaryOp::Not,
        operand: Box::new(Expr::new(
          ExprKind::Binary {
            op: dynexpr_parser::ast::BinaryOp::Eq,
            lhs: Box::new(call),
            rhs: Box::new(Expr::new(
              ExprKind::Constant(Value::Null.into_dyn()),
              PrimitiveType::handle(PrimitiveKind::Null),
            )),
          },
          PrimitiveType::handle(PrimitiveKind::Bool),
        )),
      },
      PrimitiveType::handle(PrimitiveKind::Bool),
    );

    assert!(ReflectionGuard.visit(wrapper).is_err());
  }
}
