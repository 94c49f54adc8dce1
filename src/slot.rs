//! §3.2 — the slot tagged union.
use std::fmt;
use crate::node::NodeId;
use crate::prim::Primitive;
use crate::sym::Sym;

/// A single slot inside a node. Every node's slot count is fixed at
/// allocation time (§3.1); slots are rewritten in place during reduction.
#[derive(Clone, Debug)]
pub enum Slot {
  /// erased/recycled.
  Null,
  /// pointer to the sentinel of a sub-chain (abstraction body, test branch).
  Body(NodeId),
  /// explicit substitution: an owning reference to another node.
  Subst(NodeId),
  /// de-Bruijn-like reference: `up` binders out, parameter `across`.
  Bound { up: u32, across: u32 },
  /// reference to an externally-interned constant.
  Constant(u32),
  /// the name of a formal parameter of an abstraction.
  Param(Sym),
  /// a numeric literal.
  Num(f64),
  /// an immutable UTF-8 string literal.
  Str(Box<str>),
  /// a symbolic literal.
  Symbol(Sym),
  /// a built-in operator.
  Prim(Primitive),
}

impl Slot {
  pub fn is_null(&self) -> bool { matches!(self, Slot::Null) }

  pub fn subst_target(&self) -> Option<NodeId> {
    if let Slot::Subst(n) = self { Some(*n) } else { None }}

  pub fn body_target(&self) -> Option<NodeId> {
    if let Slot::Body(n) = self { Some(*n) } else { None }}
}

impl fmt::Display for Slot {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Slot::Null => write!(f, "_"),
      Slot::Body(n) => write!(f, "body({n})"),
      Slot::Subst(n) => write!(f, "={n}"),
      Slot::Bound { up, across } => write!(f, "^{up}.{across}"),
      Slot::Constant(i) => write!(f, "#{i}"),
      Slot::Param(s) => write!(f, "{s}"),
      Slot::Num(x) => write!(f, "{x}"),
      Slot::Str(s) => write!(f, "{s:?}"),
      Slot::Symbol(s) => write!(f, ":{s}"),
      Slot::Prim(p) => write!(f, "{}", p.name()),
    }
  }
}
