//! §6 — the external readback contract: turning a normal-form node back
//! into the host language's booleans, naturals, and signed integers, all
//! encoded as nested ABS per the Church convention.
//!
//! No direct analogue in the teacher (bex has no lambda-encoding readback);
//! built fresh in the crate's own idiom. Internally these walk the graph
//! with `Option`-returning, non-panicking helpers (following the shape of
//! `examples/tangentstorm-bex/src/simp.rs`'s small pure functions), but the
//! public entry points surface a miss as `ReduceError::ReadbackMiss` (§7)
//! through the crate's shared `ReduceResult`, not a bare `None`.
use crate::error::{ReduceError, ReduceResult};
use crate::node::{Graph, NodeId, Variety};
use crate::prim::{resolve_concrete, Concrete};
use crate::slot::Slot;

/// `\t f. t` / `\t f. f` — a single two-param ABS selecting its first or
/// second parameter (§6: "a two-nested ABS whose body is a BOUND(0,0)/
/// BOUND(0,1)" — the two params of one binder, not two separate binders).
pub fn read_bool(graph: &Graph, root: NodeId) -> ReduceResult<bool> {
  read_bool_opt(graph, root).ok_or(ReduceError::ReadbackMiss)
}

fn read_bool_opt(graph: &Graph, root: NodeId) -> Option<bool> {
  let (body, _) = unwrap_abs(graph, root, 2)?;
  match bound_ref(graph, sole_node(graph, body)?)? {
    (0, 0) => Some(true),
    (0, 1) => Some(false),
    _ => None,
  }
}

/// `\f x. f (f (... (f x)))` — a Church numeral; counts the nesting of `f`.
pub fn read_nat(graph: &Graph, root: NodeId) -> ReduceResult<u64> {
  read_nat_opt(graph, root).ok_or(ReduceError::ReadbackMiss)
}

fn read_nat_opt(graph: &Graph, root: NodeId) -> Option<u64> {
  let (body, _) = unwrap_abs(graph, root, 2)?;
  count_applications(graph, sole_node(graph, body)?)
}

/// A three-param ABS (`sign`, `f`, `x`); body is the plain Church-nat spine
/// for non-negative values, or `sign` applied to that spine when negative
/// (§6: "optional leading application by BOUND(0,2) indicating negation").
pub fn read_signed_int(graph: &Graph, root: NodeId) -> ReduceResult<i64> {
  read_signed_int_opt(graph, root).ok_or(ReduceError::ReadbackMiss)
}

fn read_signed_int_opt(graph: &Graph, root: NodeId) -> Option<i64> {
  let (body, _) = unwrap_abs(graph, root, 3)?;
  let head = sole_node(graph, body)?;
  if let Some(n) = count_applications(graph, head) {
    return Some(n as i64);
  }
  let n = graph.heap.get(follow_subst(graph, head));
  if n.variety != Variety::App || n.nslots() != 2 { return None; }
  let sign = n.slots[0].subst_target()?;
  if bound_ref(graph, sign) != Some((0, 2)) { return None; }
  let magnitude_spine = n.slots[1].subst_target()?;
  let magnitude = count_applications(graph, magnitude_spine)?;
  Some(-(magnitude as i64))
}

/// Resolve `root` if it's an ABS with exactly `params` parameters; returns
/// its body sentinel and parameter count.
fn unwrap_abs(graph: &Graph, root: NodeId, params: usize) -> Option<(NodeId, usize)> {
  let resolved = follow_subst(graph, root);
  let n = graph.heap.get(resolved);
  if n.variety != Variety::Abs { return None; }
  if params != 0 && n.nslots() - 1 != params { return None; }
  let body = n.slots[0].body_target()?;
  Some((body, n.nslots() - 1))
}

/// A readback body must contain exactly one node (§6: normal form chains
/// hold a single expression).
fn sole_node(graph: &Graph, sentinel: NodeId) -> Option<NodeId> {
  let nodes = graph.chain_nodes(sentinel);
  if nodes.len() == 1 { Some(nodes[0]) } else { None }
}

fn follow_subst(graph: &Graph, mut n: NodeId) -> NodeId {
  loop {
    let node = graph.heap.get(n);
    if node.variety == Variety::Var && node.slots.len() == 1 {
      if let Slot::Subst(t) = node.slots[0] { n = t; continue; }
    }
    return n;
  }
}

fn bound_ref(graph: &Graph, n: NodeId) -> Option<(u32, u32)> {
  let resolved = follow_subst(graph, n);
  match graph.heap.get(resolved).slots.first() {
    Some(Slot::Bound { up, across }) => Some((*up, *across)),
    _ => None,
  }
}

/// Count how many times `f` (BOUND(0,1)) wraps `x` (BOUND(0,0)) in an APP
/// spine `f (f (f x))`, per §6's naming: "BOUND(0,0) = x, BOUND(0,1) = f".
fn count_applications(graph: &Graph, node: NodeId) -> Option<u64> {
  let resolved = follow_subst(graph, node);
  if let Some((up, across)) = bound_ref(graph, resolved) {
    if up == 0 && across == 0 { return Some(0); } // bare `x`
    return None;
  }
  let n = graph.heap.get(resolved);
  if n.variety != Variety::App || n.nslots() != 2 { return None; }
  let f = n.slots[0].subst_target()?;
  if bound_ref(graph, f) != Some((0, 1)) { return None; }
  let arg = n.slots[1].subst_target()?;
  count_applications(graph, arg).map(|k| k + 1)
}

/// Read a concrete value straight off a normal-form node without going
/// through the lambda encodings (used for `+`/primitive results).
pub fn read_concrete(graph: &Graph, root: NodeId) -> ReduceResult<Concrete> {
  resolve_concrete(graph, root).ok_or(ReduceError::ReadbackMiss)
}
