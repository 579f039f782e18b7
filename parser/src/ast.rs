use std::fmt;

use dynexpr_reflect::{
  DynValue, ExtensionMethod, HostCallable, IdentifierBinding, MemberInfo, MethodSignature, TypeHandle,
};

/// A node of the typed expression tree, carrying the static type its
/// compile-time binding settled on. Immutable once the parse that built
/// it returns.
#[derive(Clone)]
pub struct Expr {
  pub kind: ExprKind,
  pub ty: TypeHandle,
}

impl Expr {
  pub fn new(kind: ExprKind, ty: TypeHandle) -> Self {
    Self { kind, ty }
  }
}

/// How a resolved call reaches its implementation: an ordinary instance
/// method, an extension method (receiver passed as the first argument),
/// or an indexer (`get`/optional `set` pair, reached through `e[i]`).
#[derive(Clone)]
pub enum CallTarget {
  Method(MethodSignature),
  Extension(ExtensionMethod),
  Indexer {
    get: MethodSignature,
    set: Option<MethodSignature>,
  },
  /// A call through a registered function identifier (`myFunc(1, 2)`),
  /// rather than a method reached through a receiver.
  Function(HostCallable),
}

/// What kind of type operand a `Cast` node represents: an actual
/// conversion (`as`, or a parenthesised cast), or a boolean type test
/// (`is`). Grouped into one node because both pivot on a type operand
/// rather than a value operand.
#[derive(Clone)]
pub enum CastKind {
  Convert { explicit: bool },
  TypeTest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Mod,
  Eq,
  NotEq,
  Lt,
  LtEq,
  Gt,
  GtEq,
  And,
  Or,
  BitAnd,
  BitOr,
  BitXor,
  Shl,
  Shr,
  NullCoalesce,
}

impl fmt::Display for BinaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Mod => "%",
      BinaryOp::Eq => "==",
      BinaryOp::NotEq => "!=",
      BinaryOp::Lt => "<",
      BinaryOp::LtEq => "<=",
      BinaryOp::Gt => ">",
      BinaryOp::GtEq => ">=",
      BinaryOp::And => "&&",
      BinaryOp::Or => "||",
      BinaryOp::BitAnd => "&",
      BinaryOp::BitOr => "|",
      BinaryOp::BitXor => "^",
      BinaryOp::Shl => "<<",
      BinaryOp::Shr => ">>",
      BinaryOp::NullCoalesce => "??",
    };
    write!(f, "{}", text)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Neg,
  Not,
  BitNot,
}

impl fmt::Display for UnaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      UnaryOp::Neg => "-",
      UnaryOp::Not => "!",
      UnaryOp::BitNot => "~",
    };
    write!(f, "{}", text)
  }
}

/// A lambda nested inside a larger expression (e.g. a predicate passed
/// as an argument), distinct from the top-level compiled `Lambda`
/// artifact a full parse produces.
#[derive(Clone)]
pub struct LambdaExpr {
  pub parameters: Vec<(String, TypeHandle)>,
  pub body: Box<Expr>,
}

/// The eleven node kinds the expression tree is built from. `DynamicGet`
/// and `DynamicCall` are distinct from their static counterparts
/// (`Member`/`Call`) and carry only the receiver, the literal member
/// name, and — for calls — the already-bound argument nodes; their
/// static type is always the host-object type they were reached through.
#[derive(Clone)]
pub enum ExprKind {
  Constant(DynValue),
  ParamRef(usize),
  /// A bare reference to a registered identifier — not a declared
  /// parameter, not a type alias. `name` is carried for diagnostics and
  /// `Display`; `binding` is what the compiler actually reads (or writes
  /// through, for an `Assign` target) at invocation time.
  Identifier { name: String, binding: IdentifierBinding },
  Member {
    receiver: Box<Expr>,
    member: MemberInfo,
  },
  Call {
    receiver: Option<Box<Expr>>,
    target: CallTarget,
    arguments: Vec<Expr>,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
  Unary {
    op: UnaryOp,
    operand: Box<Expr>,
  },
  Conditional {
    condition: Box<Expr>,
    then_branch: Box<Expr>,
    else_branch: Box<Expr>,
  },
  Cast {
    operand: Box<Expr>,
    target_type: TypeHandle,
    kind: CastKind,
  },
  Lambda(LambdaExpr),
  DynamicGet {
    receiver: Box<Expr>,
    name: String,
  },
  DynamicCall {
    receiver: Box<Expr>,
    name: String,
    arguments: Vec<Expr>,
  },
  Assign {
    target: Box<Expr>,
    value: Box<Expr>,
  },
  /// A reference to a lambda's own parameter from inside its body —
  /// distinct from `ParamRef` (which indexes the top-level `Lambda`
  /// artifact's declared parameters). Resolved at invocation time by
  /// name against the innermost-matching call frame, the same way the
  /// teacher's `Env` chain walks outward through enclosing scopes.
  LambdaParam(String),
  /// A bare reference to a known type alias, produced only when a
  /// primary identifier resolves to a registered type rather than a
  /// parameter or a known identifier. Valid only as the receiver of a
  /// `Member`/`Call`/`DynamicGet`/`DynamicCall` node — the binder never
  /// lets one escape as a standalone result.
  TypeRef(TypeHandle),
}

impl fmt::Display for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.kind {
      ExprKind::Constant(_) => write!(f, "<{}>", self.ty.type_name()),
      ExprKind::ParamRef(index) => write!(f, "$param[{}]", index),
      ExprKind::Identifier { name, .. } => write!(f, "{}", name),
      ExprKind::Member { receiver, member } => write!(f, "({}.{})", receiver, member.name()),
      ExprKind::Call {
        receiver, target, arguments,
      } => {
        let name = match target {
          CallTarget::Method(sig) => sig.name.as_str(),
          CallTarget::Extension(ext) => ext.name.as_str(),
          CallTarget::Indexer { .. } => "[]",
          CallTarget::Function(_) => "<fn>",
        };
        let args = arguments.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
        match receiver {
          Some(receiver) => write!(f, "{}.{}({})", receiver, name, args),
          None => write!(f, "{}({})", name, args),
        }
      },
      ExprKind::Binary { lhs, op, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
      ExprKind::Unary { op, operand } => write!(f, "({}{})", op, operand),
      ExprKind::Conditional {
        condition, then_branch, else_branch,
      } => write!(f, "({} ? {} : {})", condition, then_branch, else_branch),
      ExprKind::Cast {
        operand, target_type, kind,
      } => match kind {
        CastKind::Convert { explicit: true } => write!(f, "(({}) {})", target_type.type_name(), operand),
        CastKind::Convert { explicit: false } => write!(f, "({} as {})", operand, target_type.type_name()),
        CastKind::TypeTest => write!(f, "({} is {})", operand, target_type.type_name()),
      },
      ExprKind::Lambda(lambda) => {
        let params = lambda
          .parameters
          .iter()
          .map(|(name, _)| name.as_str())
          .collect::<Vec<_>>()
          .join(", ");
        write!(f, "(({}) => {})", params, lambda.body)
      },
      ExprKind::DynamicGet { receiver, name } => write!(f, "({}.{}?)", receiver, name),
      ExprKind::DynamicCall { receiver, name, arguments } => {
        let args = arguments.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
        write!(f, "({}.{}?({}))", receiver, name, args)
      },
      ExprKind::Assign { target, value } => write!(f, "({} = {})", target, value),
      ExprKind::LambdaParam(name) => write!(f, "{}", name),
      ExprKind::TypeRef(ty) => write!(f, "{}", ty.type_name()),
    }
  }
}

#[cfg(test)]
impl Expr {
  /// Renders the tree with box-drawing connectors, for debugging only —
  /// never used by any production code path.
  pub(crate) fn build_tree(&self, prefix: &str, is_last: bool) {
    let connector = if is_last { "└── " } else { "├── " };
    let extension = if is_last { "    " } else { "│   " };
    println!("{}{}{}", prefix, connector, self);
    let _ = extension;
  }
}
