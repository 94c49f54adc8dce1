//! §4.3 — the primitive engine: a flat table of built-in operators plus the
//! dispatch that fires once every argument is a concrete value. Grounded on
//! `examples/tangentstorm-bex/src/simp.rs` (small `fn(..)->Option<T>`
//! simplifiers returning `None` when no rule applies — exactly the
//! "irreducible" contract here) and `ops.rs` (a flat table of named
//! operators).
use std::fmt;

use crate::node::{Graph, NodeId, Variety};
use crate::slot::Slot;
use crate::sym::Sym;

/// How many concrete arguments a primitive consumes before it may fire.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Syntax { Atom, Unary, Binary, Nary }

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Primitive {
  Add, Sub, Mul, Div,
  Eq, Ne, Lt, Le, Gt, Ge,
  And, Or, Xor, Not,
  IsIntegral,
  Concat,
  Cell, Fill, At, Find, Fuse, IsCell, NElems,
  Car, Cdr, IsNil, IsPair,
  Undefined, Panic,
}

impl Primitive {
  pub fn name(&self) -> &'static str {
    use Primitive::*;
    match self {
      Add => "+", Sub => "-", Mul => "*", Div => "/",
      Eq => "=", Ne => "!=", Lt => "<", Le => "<=", Gt => ">", Ge => ">=",
      And => "and", Or => "or", Xor => "xor", Not => "not",
      IsIntegral => "is_integral",
      Concat => "concat",
      Cell => "cell", Fill => "fill", At => "at", Find => "find",
      Fuse => "fuse", IsCell => "is_cell", NElems => "nelems",
      Car => "car", Cdr => "cdr", IsNil => "is_nil", IsPair => "is_pair",
      Undefined => "undefined", Panic => "panic",
    }
  }

  pub fn syntax(&self) -> Syntax {
    use Primitive::*;
    match self {
      Undefined => Syntax::Atom,
      Not | IsIntegral | IsCell | NElems | Car | Cdr | IsNil | IsPair => Syntax::Unary,
      Add | Sub | Mul | Div | Eq | Ne | Lt | Le | Gt | Ge
        | And | Or | Xor | Concat | At | Find | Fuse => Syntax::Binary,
      Cell | Fill | Panic => Syntax::Nary,
    }
  }
}

impl fmt::Display for Primitive {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.name()) }}

/// What a node resolves to, once SUBST chains and administrative rename
/// nodes (§4.3: "bypassing single-slot VAR nodes") are stripped away.
#[derive(Clone, Debug, PartialEq)]
pub enum Concrete {
  Num(f64),
  Str(String),
  Symbol(Sym),
  /// a CELL node's element node ids, in order.
  Cell(Vec<NodeId>),
}

/// Outcome of a primitive firing against its resolved arguments.
pub enum Fired {
  Num(f64),
  Str(String),
  Symbol(Sym),
  /// construct a fresh CELL node whose slots alias the given nodes.
  NewCell(Vec<NodeId>),
  /// the result is simply an existing node (e.g. `car`/`at`/`find`-miss).
  Alias(NodeId),
  /// wrong operand kinds: the redex is left in place (§4.3, §7 Irreducible).
  Irreducible,
}

/// Follow `n`'s SUBST chain (bypassing administrative unary VAR/SUBST
/// nodes) until a concrete value or non-SUBST node is reached, and
/// classify it. Returns `None` if `n` is not a concrete value (still a
/// redex, a bound variable, etc).
pub fn resolve_concrete(graph: &Graph, mut n: NodeId) -> Option<Concrete> {
  loop {
    let node = graph.heap.get(n);
    if node.variety == Variety::Var && node.slots.len() == 1 {
      if let Slot::Subst(t) = &node.slots[0] { n = *t; continue; }
      return None;
    }
    return match (&node.variety, node.slots.first()) {
      (Variety::Val, Some(Slot::Num(x))) => Some(Concrete::Num(*x)),
      (Variety::Val, Some(Slot::Str(s))) => Some(Concrete::Str(s.to_string())),
      (Variety::Val, Some(Slot::Symbol(s))) => Some(Concrete::Symbol(*s)),
      (Variety::Cell, _) => Some(Concrete::Cell(
        node.slots.iter().filter_map(|s| s.subst_target()).collect())),
      _ => None,
    };
  }
}

fn num(c: &Concrete) -> Option<f64> { if let Concrete::Num(n) = c { Some(*n) } else { None } }
fn truthy(x: f64) -> bool { x != 0.0 }
fn from_bool(b: bool) -> Fired { Fired::Num(if b { 1.0 } else { 0.0 }) }

impl Primitive {
  /// Apply this primitive to its resolved arguments. `arg_ids` are the
  /// original node ids (needed for the structural cell/list ops, which
  /// alias or fuse existing nodes rather than computing a scalar).
  pub fn apply(&self, args: &[Concrete], arg_ids: &[NodeId]) -> Fired {
    use Primitive::*;
    match self {
      Add => binop(args, |a, b| Fired::Num(a + b)),
      Sub => binop(args, |a, b| Fired::Num(a - b)),
      Mul => binop(args, |a, b| Fired::Num(a * b)),
      Div => binop(args, |a, b| Fired::Num(a / b)),

      Eq => eq_cmp(args, |o| o == std::cmp::Ordering::Equal, |a, b| a == b),
      Ne => eq_cmp(args, |o| o != std::cmp::Ordering::Equal, |a, b| a != b),
      Lt => binop(args, |a, b| from_bool(a < b)),
      Le => binop(args, |a, b| from_bool(a <= b)),
      Gt => binop(args, |a, b| from_bool(a > b)),
      Ge => binop(args, |a, b| from_bool(a >= b)),

      And => binop(args, |a, b| from_bool(truthy(a) && truthy(b))),
      Or => binop(args, |a, b| from_bool(truthy(a) || truthy(b))),
      Xor => binop(args, |a, b| from_bool(truthy(a) != truthy(b))),
      Not => match args.first().and_then(num) {
        Some(a) => from_bool(!truthy(a)), None => Fired::Irreducible },

      IsIntegral => match args.first().and_then(num) {
        Some(a) => from_bool(a.fract() == 0.0), None => Fired::Irreducible },

      Concat => match (args.first(), args.get(1)) {
        (Some(Concrete::Str(a)), Some(Concrete::Str(b))) => Fired::Str(format!("{a}{b}")),
        _ => Fired::Irreducible },

      // Structural ops: operate on the original node ids, not their
      // resolved scalar content.
      Cell => Fired::NewCell(arg_ids.to_vec()),

      Fill => match (args.first().and_then(num), arg_ids.get(1)) {
        (Some(n), Some(&v)) if n >= 0.0 && n.fract() == 0.0 =>
          Fired::NewCell(std::iter::repeat(v).take(n as usize).collect()),
        _ => Fired::Irreducible },

      At => match (args.first(), args.get(1).and_then(num)) {
        (Some(Concrete::Cell(elems)), Some(i)) if i >= 0.0 && (i as usize) < elems.len() =>
          Fired::Alias(elems[i as usize]),
        _ => Fired::Irreducible },

      Find => match (args.first(), arg_ids.get(1)) {
        (Some(Concrete::Cell(elems)), Some(needle)) =>
          Fired::Num(elems.iter().position(|e| e == needle).map(|i| i as f64).unwrap_or(-1.0)),
        _ => Fired::Irreducible },

      Fuse => match (args.first(), args.get(1)) {
        (Some(Concrete::Cell(a)), Some(Concrete::Cell(b))) =>
          Fired::NewCell(a.iter().chain(b.iter()).copied().collect()),
        _ => Fired::Irreducible },

      IsCell => from_bool(matches!(args.first(), Some(Concrete::Cell(_)))),
      NElems => match args.first() {
        Some(Concrete::Cell(v)) => Fired::Num(v.len() as f64), _ => Fired::Irreducible },

      Car => match args.first() {
        Some(Concrete::Cell(v)) if v.len() == 2 => Fired::Alias(v[0]),
        _ => Fired::Irreducible },
      Cdr => match args.first() {
        Some(Concrete::Cell(v)) if v.len() == 2 => Fired::Alias(v[1]),
        _ => Fired::Irreducible },
      IsNil => from_bool(matches!(args.first(), Some(Concrete::Cell(v)) if v.is_empty())),
      IsPair => from_bool(matches!(args.first(), Some(Concrete::Cell(v)) if v.len() == 2)),

      Undefined => Fired::Irreducible,
      Panic => panic!("primitive `panic` invoked during reduction"),
    }
  }
}

fn binop(args: &[Concrete], f: impl Fn(f64, f64) -> Fired) -> Fired {
  match (args.first().and_then(num), args.get(1).and_then(num)) {
    (Some(a), Some(b)) => f(a, b),
    _ => Fired::Irreducible,
  }
}

fn eq_cmp(args: &[Concrete], numpred: impl Fn(std::cmp::Ordering) -> bool, strpred: impl Fn(&str, &str) -> bool) -> Fired {
  match (args.first(), args.get(1)) {
    (Some(Concrete::Num(a)), Some(Concrete::Num(b))) => {
      match a.partial_cmp(b) { Some(o) => from_bool(numpred(o)), None => Fired::Num(f64::NAN) }}
    (Some(Concrete::Str(a)), Some(Concrete::Str(b))) => from_bool(strpred(a, b)),
    (Some(Concrete::Symbol(a)), Some(Concrete::Symbol(b))) => from_bool(a == b),
    _ => Fired::Irreducible,
  }
}
