//! §4.2 — the beta engine. Given a redex node (APP, LET, or TEST whose
//! predicate has resolved to a boolean) and the abstraction it targets,
//! eliminates the binder by substituting its arguments into its body, either
//! copying the body (when the abstraction may still have other users) or
//! mutating it in place (when this is its last use).
//!
//! Grounded on `examples/tangentstorm-bex/src/wip.rs`'s transient old→new
//! memo (here realized as an `FxHashMap<NodeId, NodeId>`, per §9.1) and on
//! the copy/no-copy split in `bdd.rs::ITE::norm` ("construct fresh node vs.
//! reuse the existing one" decided by a refcount/uniqueness check).
//!
//! See DESIGN.md Open Question 4 for the BOUND-index shift rule used here:
//! a `cutoff` counter, incremented on every nested `Body` the copy walk
//! descends into, replaces the literal `delta`-based formula in spec.md.
use fxhash::FxHashMap;

use crate::node::{Graph, NodeId};
use crate::slot::Slot;

/// One parameter's replacement: either an existing node to alias (most
/// arguments arrive this way, wrapped in a `Subst`) or `None` if the
/// argument slot was never filled (arity mismatch — a `FatalBug`, per §7,
/// not handled here; callers must ensure `args.len() == params`).
pub struct Redex {
  /// the node being eliminated (APP/LET/TEST-branch-taken).
  pub redex: NodeId,
  /// the abstraction (ABS/FIX) — or, for LET/zeta, the LET node itself.
  pub abstraction: NodeId,
  /// argument node ids, one per formal parameter, in order.
  pub args: Vec<NodeId>,
}

/// Substitute `args` into `body` (the abstraction's own chain), producing a
/// fresh copy. Used when the abstraction's `nref` indicates other users
/// still need its unsubstituted form.
pub fn beta_copy(graph: &mut Graph, body: NodeId, redex_depth: u32, args: &[NodeId]) -> NodeId {
  let mut memo: FxHashMap<NodeId, NodeId> = FxHashMap::default();
  copy_chain(graph, body, redex_depth, 0, args, &mut memo)
}

/// Copy an entire chain (sentinel-bracketed) at cutoff level `cutoff`,
/// substituting `args` for `Bound{up: cutoff, ..}` references, and return
/// the new chain's sentinel id.
fn copy_chain(
  graph: &mut Graph, old_sentinel: NodeId, redex_depth: u32, cutoff: u32,
  args: &[NodeId], memo: &mut FxHashMap<NodeId, NodeId>,
) -> NodeId {
  let new_depth = redex_depth + cutoff;
  let new_sentinel = graph.new_chain(new_depth);
  for old in graph.chain_nodes(old_sentinel) {
    let new_id = copy_node(graph, old, redex_depth, cutoff, args, memo);
    graph.link_before(new_sentinel, new_id);
  }
  new_sentinel
}

/// Copy one node, substituting its slots per the cutoff rule, and record
/// `old -> new` in `memo` so later `Subst` references to shared structure
/// (e.g. two occurrences of the same bound variable) alias the single copy.
fn copy_node(
  graph: &mut Graph, old: NodeId, redex_depth: u32, cutoff: u32,
  args: &[NodeId], memo: &mut FxHashMap<NodeId, NodeId>,
) -> NodeId {
  if let Some(&existing) = memo.get(&old) { graph.incref(existing); return existing; }

  let (variety, old_depth, old_slots) = {
    let n = graph.heap.get(old);
    (n.variety, n.depth, n.slots.clone())
  };
  let new_depth = redex_depth + cutoff;
  let placeholder = graph.heap.alloc(crate::node::Node::new(variety, new_depth, old_slots.len()));
  memo.insert(old, placeholder);

  let new_slots: Vec<Slot> = old_slots.into_iter().map(|s| match s {
    Slot::Bound { up, across } if up < cutoff => Slot::Bound { up, across },
    Slot::Bound { up, across } if up == cutoff => {
      let target = args[across as usize];
      graph.incref(target);
      Slot::Subst(target)
    }
    Slot::Bound { up, across } => Slot::Bound { up: up - 1, across },
    Slot::Body(sub) => Slot::Body(copy_chain(graph, sub, redex_depth, cutoff + 1, args, memo)),
    Slot::Subst(t) => { graph.incref(t); Slot::Subst(t) }
    other => other,
  }).collect();

  {
    let n = graph.heap.get_mut(placeholder);
    n.slots = new_slots;
    n.depth = new_depth;
    n.isfresh = true;
  }
  placeholder
}

/// Substitute `args` into `body` in place: no copy, the chain's own nodes
/// are mutated. Valid only when the abstraction has exactly one user (the
/// redex itself) — callers must check `nref == 1` (or, for LET/zeta, that
/// no argument targets the LET node itself — the no-self-reference
/// precondition recorded in DESIGN.md Open Question 2).
pub fn beta_nocopy(graph: &mut Graph, body: NodeId, redex_depth: u32, args: &[NodeId]) {
  mutate_chain(graph, body, redex_depth, 0, args);
}

fn mutate_chain(graph: &mut Graph, sentinel: NodeId, redex_depth: u32, cutoff: u32, args: &[NodeId]) {
  let new_depth = redex_depth + cutoff;
  graph.heap.get_mut(sentinel).depth = new_depth;
  for id in graph.chain_nodes(sentinel) {
    mutate_node(graph, id, redex_depth, cutoff, args);
  }
}

fn mutate_node(graph: &mut Graph, id: NodeId, redex_depth: u32, cutoff: u32, args: &[NodeId]) {
  let new_depth = redex_depth + cutoff;
  let old_slots = graph.heap.get(id).slots.clone();
  let mut new_slots = Vec::with_capacity(old_slots.len());
  for s in old_slots {
    new_slots.push(match s {
      Slot::Bound { up, across } if up < cutoff => Slot::Bound { up, across },
      Slot::Bound { up, across } if up == cutoff => {
        let target = args[across as usize];
        graph.incref(target);
        Slot::Subst(target)
      }
      Slot::Bound { up, across } => Slot::Bound { up: up - 1, across },
      Slot::Body(sub) => { mutate_chain(graph, sub, redex_depth, cutoff + 1, args); Slot::Body(sub) }
      other => other,
    });
  }
  let n = graph.heap.get_mut(id);
  n.slots = new_slots;
  n.depth = new_depth;
}

/// §4.2's "eager wipe" optimization (DESIGN.md Open Question 3): an argument
/// that dropped to zero references as a side effect of substitution (the
/// parameter it was bound to was never used in the body) is reclaimed
/// immediately rather than waiting for the next L-to-R sweep — §4.4.2:
/// "Arguments that were freshly wrapped and gained no references are
/// immediately freed", not restricted to ABS/FIX arguments. A bare `Num`/
/// `Str`/`Symbol`/`Cell` argument is freed outright; an `Abs`/`Fix`/`Test`/
/// `Let` argument also reclaims any BODY sub-chains it owns, recursively,
/// since a node's BODY slots are exclusively its own (the same ownership
/// `reduce::discard_subtree` assumes for a discarded TEST branch). A Cell's
/// own elements are referenced via SUBST, not BODY, so they're left alone —
/// they may still be aliased elsewhere. Non-observable: it only changes
/// *when* storage is reclaimed, never the graph's logical shape.
pub fn eager_wipe_dead_abs(graph: &mut Graph, candidate: NodeId) {
  if !graph.heap.is_live(candidate) { return; }
  if graph.heap.get(candidate).nref != 0 { return; }
  free_owned(graph, candidate);
}

fn free_owned(graph: &mut Graph, id: NodeId) {
  let bodies: Vec<NodeId> = graph.heap.get(id).slots.iter().filter_map(Slot::body_target).collect();
  graph.heap.deref(id);
  graph.heap.free(id);
  for body in bodies {
    for n in graph.chain_nodes(body) {
      free_owned(graph, n);
    }
    graph.heap.free(body);
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::sym::Sym;

  /// `(\x.x) A` copies `A` into the (trivial) body in place of `BOUND(0,0)`.
  #[test]
  fn beta_substitutes_bound_zero_with_sole_arg() {
    let mut g = Graph::new();
    let (abs, body) = g.new_abs(0, &[Sym::new(0)]);
    let bv = g.new_bound_var(1, 0, 0);
    g.push(body, bv);
    let a = g.new_num(0, 42.0);

    let new_body = beta_copy(&mut g, body, 0, &[a]);
    let nodes = g.chain_nodes(new_body);
    assert_eq!(nodes.len(), 1);
    assert!(matches!(g.heap.get(nodes[0]).slots[0], Slot::Subst(t) if t == a));
    let _ = abs;
  }

  /// `(\x y.y) A B` — substituting the second parameter leaves the first
  /// BOUND reference for the unused parameter untouched had it been used.
  #[test]
  fn beta_picks_correct_parameter_by_across() {
    let mut g = Graph::new();
    let (_abs, body) = g.new_abs(0, &[Sym::new(0), Sym::new(1)]);
    let bv0 = g.new_bound_var(1, 0, 0);
    let bv1 = g.new_bound_var(1, 0, 1);
    g.push(body, bv0);
    g.push(body, bv1);
    let a = g.new_num(0, 1.0);
    let b = g.new_num(0, 2.0);

    let new_body = beta_copy(&mut g, body, 0, &[a, b]);
    let nodes = g.chain_nodes(new_body);
    assert!(matches!(g.heap.get(nodes[0]).slots[0], Slot::Subst(t) if t == a));
    assert!(matches!(g.heap.get(nodes[1]).slots[0], Slot::Subst(t) if t == b));
  }

  /// a BOUND referring one level further out than the eliminated binder
  /// loses exactly one level (`up - 1`), never touching `across`.
  #[test]
  fn beta_shifts_outer_bound_down_by_one() {
    let mut g = Graph::new();
    let (_abs, body) = g.new_abs(0, &[Sym::new(0)]);
    let escaping = g.new_bound_var(1, 1, 3);
    g.push(body, escaping);
    let a = g.new_num(0, 0.0);

    let new_body = beta_copy(&mut g, body, 0, &[a]);
    let nodes = g.chain_nodes(new_body);
    assert!(matches!(g.heap.get(nodes[0]).slots[0], Slot::Bound { up: 0, across: 3 }));
  }

  /// nested ABS bodies see an incremented cutoff, so a BOUND pointing at
  /// the *inner* binder (up == 0 relative to the inner body) is left alone.
  #[test]
  fn beta_leaves_inner_binder_references_untouched() {
    let mut g = Graph::new();
    let (_outer, outer_body) = g.new_abs(0, &[Sym::new(0)]);
    let (inner, inner_body) = g.new_abs(1, &[Sym::new(1)]);
    g.push(outer_body, inner);
    let inner_ref = g.new_bound_var(2, 0, 0);
    g.push(inner_body, inner_ref);
    let a = g.new_num(0, 9.0);

    let new_outer_body = beta_copy(&mut g, outer_body, 0, &[a]);
    let outer_nodes = g.chain_nodes(new_outer_body);
    let new_inner = outer_nodes[0];
    let new_inner_body = g.heap.get(new_inner).slots[0].body_target().unwrap();
    let inner_nodes = g.chain_nodes(new_inner_body);
    assert!(matches!(g.heap.get(inner_nodes[0]).slots[0], Slot::Bound { up: 0, across: 0 }));
  }
}
