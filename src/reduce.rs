//! §4.4 — the reducer state machine: a two-direction sweep driving a chain
//! (and, in `Mode::Deep`, every binder body reachable from it) to normal
//! form.
//!
//! Grounded on `examples/tangentstorm-bex/src/wip.rs`'s `Work`/`WorkState`
//! pattern (a single `loop { match state { ... } }` owning all mutable
//! reduction state, no recursion) per §9.2's explicit instruction that
//! chain lengths are not stack-bounded.
use crate::beta::{beta_copy, beta_nocopy, eager_wipe_dead_abs};
use crate::node::{Graph, NodeId, Variety};
use crate::prim::{resolve_concrete, Fired};
use crate::slot::Slot;

/// How many R-to-L/L-to-R transitions between heap-pressure checks (§4.4.5).
const GC_INTERVAL: u64 = 256;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
  /// recurse into every ABS/FIX/TEST body; yields a full normal form.
  Deep,
  /// stop at the top-level chain; yields surface (head) normal form.
  Surface,
}

/// a saved return address for resuming the caller's L-to-R sweep after
/// `enter_abs`/`enter_test` finishes with a nested body.
enum Resume {
  ExitAbs,
  /// the consequent body was just entered; `alt` is visited next.
  ExitTestConsequent { alt: NodeId },
  ExitTestAlternative,
}

struct Frame {
  /// the caller's chain and depth, to resume `EvalLr` in.
  sentinel: NodeId,
  depth: u32,
  /// the node to resume the caller's L-to-R sweep at once this body (and,
  /// for `ExitTestConsequent`, the alternative body too) finishes.
  resume_at: NodeId,
  resume: Resume,
}

enum State {
  EnterBody { sentinel: NodeId, depth: u32 },
  EvalRl { head: NodeId, sentinel: NodeId, depth: u32 },
  Reverse { sentinel: NodeId, depth: u32 },
  EvalLr { head: NodeId, sentinel: NodeId, depth: u32 },
  Done,
}

/// Drive `sentinel`'s chain (and, in `Mode::Deep`, everything reachable
/// from it) to normal form. Returns the same sentinel id: nodes are
/// mutated and spliced in place, never relocated.
pub fn reduce(graph: &mut Graph, sentinel: NodeId, mode: Mode) -> NodeId {
  let mut outer: Vec<Frame> = Vec::new();
  let depth0 = graph.heap.get(sentinel).depth;
  let mut state = State::EnterBody { sentinel, depth: depth0 };
  let mut steps: u64 = 0;

  loop {
    steps += 1;
    if steps % GC_INTERVAL == 0 && graph.heap.pressure() > graph.heap.threshold() {
      full_gc(graph, sentinel);
    }
    state = match state {
      State::EnterBody { sentinel, depth } => {
        // a chain entered fresh (never yet the site of a firing) has no
        // SUBST registered in its sentinel's own slot 0 yet; without it a
        // chain already in normal form would read every node's `nref` as
        // zero and have the L-to-R sweep collect it as garbage.
        graph.resync_head(sentinel);
        let head = graph.heap.get(sentinel).prev;
        State::EvalRl { head, sentinel, depth }
      }

      State::EvalRl { head, sentinel, depth } => {
        if head == sentinel {
          State::Reverse { sentinel, depth }
        } else {
          eval_rl_step(graph, head, sentinel, depth)
        }
      }

      State::Reverse { sentinel, depth } => {
        let head = graph.heap.get(sentinel).next;
        State::EvalLr { head, sentinel, depth }
      }

      State::EvalLr { head, sentinel, depth } => {
        if head == sentinel {
          match outer.pop() {
            Some(frame) => resume(graph, frame, &mut outer),
            None => State::Done,
          }
        } else {
          eval_lr_step(graph, head, sentinel, depth, mode, &mut outer)
        }
      }

      State::Done => return sentinel,
    };
  }
}

/// one step of the right-to-left sweep (§4.4.2): `move_left`, `rename`,
/// `beta`, `zeta`, `prim`, `test` all live here.
fn eval_rl_step(graph: &mut Graph, head: NodeId, sentinel: NodeId, depth: u32) -> State {
  let variety = graph.heap.get(head).variety;

  if variety == Variety::Let {
    let new_head = fire_zeta(graph, head, sentinel, depth);
    return State::EvalRl { head: new_head, sentinel, depth };
  }

  if let Some(leftmost) = graph.heap.get(head).slots.first().cloned() {
    if let Slot::Subst(target) = leftmost {
      match graph.heap.get(target).variety {
        Variety::Abs | Variety::Fix => {
          let new_head = fire_beta(graph, head, target, sentinel, depth);
          return State::EvalRl { head: new_head, sentinel, depth };
        }
        Variety::Val => {
          if matches!(graph.heap.get(target).slots.first(), Some(Slot::Prim(_))) {
            let new_head = fire_prim(graph, head, target, sentinel);
            return State::EvalRl { head: new_head, sentinel, depth };
          }
        }
        _ => {}
      }
    }
  }

  if variety == Variety::Test {
    let pred = graph.heap.get(head).slots[0].subst_target();
    if let Some(p) = pred {
      if let Some(crate::prim::Concrete::Num(_)) = resolve_concrete(graph, p) {
        let new_head = fire_test(graph, head, sentinel, depth);
        return State::EvalRl { head: new_head, sentinel, depth };
      }
    }
  }

  if variety == Variety::Var && graph.heap.get(head).slots.len() == 1 {
    if let Slot::Subst(target) = graph.heap.get(head).slots[0] {
      let prev = graph.heap.get(head).prev;
      fire_rename(graph, head, target, sentinel);
      return State::EvalRl { head: prev, sentinel, depth };
    }
  }

  // move_left
  let prev = graph.heap.get(head).prev;
  State::EvalRl { head: prev, sentinel, depth }
}

/// Splice a freshly produced chain's contents into `sentinel` at the
/// position currently held by `redex`, then free the redex. Any other node
/// that still held a `Subst(redex)` reference (a sibling expression sharing
/// this computation, e.g. a TEST's predicate or a LET-bound use-site) is
/// repointed at the rightmost spliced-in node first, so firing a shared
/// redex never leaves a dangling reference. Returns the rightmost of the
/// newly-inserted nodes (or, if empty, `redex`'s old left neighbor) — the
/// new sweep head, per §4.4.2's post-condition.
fn splice_and_free_redex(graph: &mut Graph, sentinel: NodeId, redex: NodeId, new_chain: NodeId) -> NodeId {
  let insertion_point = graph.heap.get(redex).next;
  let left_neighbor = graph.heap.get(redex).prev;
  graph.unlink(redex);
  let nodes = graph.chain_nodes(new_chain);
  for n in &nodes {
    graph.link_before(insertion_point, *n);
  }
  if let Some(&rep) = nodes.last() {
    redirect_backref(graph, redex, rep);
    graph.heap.get_mut(redex).nref = 0;
  }
  graph.heap.deref(redex);
  graph.heap.free(redex);
  graph.heap.free(new_chain);
  graph.resync_head(sentinel);
  nodes.last().copied().unwrap_or(left_neighbor)
}

fn fire_beta(graph: &mut Graph, redex: NodeId, abstraction: NodeId, sentinel: NodeId, depth: u32) -> NodeId {
  let nparams = graph.heap.get(abstraction).nslots() - 1;
  let nargs = graph.heap.get(redex).nslots() - 1;
  if nargs != nparams {
    panic!("FatalType: arity mismatch applying abstraction {abstraction} ({nparams} params, {nargs} args)");
  }
  let args: Vec<NodeId> = graph.heap.get(redex).slots[1..=nparams]
    .iter()
    .map(|s| s.subst_target().expect("beta argument slot must be SUBST"))
    .collect();
  let body = graph.heap.get(abstraction).slots[0].body_target()
    .expect("FatalBug: abstraction missing body slot");

  let nref = graph.heap.get(abstraction).nref;
  let new_chain = if nref <= 1 {
    beta_nocopy(graph, body, depth, &args);
    // the body is being moved out from under `abstraction`; null its BODY
    // slot so a later collect of the now-dead abstraction node doesn't
    // walk into an already-freed chain.
    graph.heap.get_mut(abstraction).slots[0] = Slot::Null;
    body
  } else {
    beta_copy(graph, body, depth, &args)
  };

  let new_head = splice_and_free_redex(graph, sentinel, redex, new_chain);
  for a in args {
    eager_wipe_dead_abs(graph, a);
  }
  new_head
}

/// LET is a self-referencing abstraction (DESIGN.md Open Question 2):
/// its own tail slots are the initializers, its body the bound chain.
fn fire_zeta(graph: &mut Graph, let_node: NodeId, sentinel: NodeId, depth: u32) -> NodeId {
  let args: Vec<NodeId> = graph.heap.get(let_node).slots[1..]
    .iter()
    .map(|s| s.subst_target().expect("LET initializer slot must be SUBST"))
    .collect();
  debug_assert!(!args.contains(&let_node), "LET initializer references the LET node itself");
  let body = graph.heap.get(let_node).slots[0].body_target()
    .expect("FatalBug: LET missing body slot");

  beta_nocopy(graph, body, depth, &args);
  splice_and_free_redex(graph, sentinel, let_node, body)
}

fn fire_prim(graph: &mut Graph, redex: NodeId, prim_node: NodeId, sentinel: NodeId) -> NodeId {
  let p = match graph.heap.get(prim_node).slots.first() {
    Some(Slot::Prim(p)) => *p,
    _ => unreachable!(),
  };
  let arg_ids: Vec<NodeId> = graph.heap.get(redex).slots[1..]
    .iter()
    .filter_map(|s| s.subst_target())
    .collect();
  let resolved: Option<Vec<crate::prim::Concrete>> = arg_ids.iter()
    .map(|&a| resolve_concrete(graph, a))
    .collect();
  let Some(concretes) = resolved else {
    // arguments not ready yet: leave the redex in place (move_left).
    let prev = graph.heap.get(redex).prev;
    return prev;
  };

  let depth = graph.heap.get(redex).depth;
  let fired = p.apply(&concretes, &arg_ids);
  let (replacement, is_alias) = match fired {
    Fired::Irreducible => {
      let prev = graph.heap.get(redex).prev;
      return prev;
    }
    Fired::Num(x) => (graph.new_num(depth, x), false),
    Fired::Str(s) => (graph.new_string(depth, &s), false),
    Fired::Symbol(s) => (graph.new_symbol(depth, s), false),
    Fired::NewCell(elems) => {
      let slots = elems.into_iter().map(Slot::Subst).collect();
      (graph.new_cell(depth, slots), false)
    }
    Fired::Alias(id) => { graph.incref(id); (id, true) }
  };

  let insertion_point = graph.heap.get(redex).next;
  graph.unlink(redex);
  // an aliased node (car/cdr/at) is an *existing* node that may already be
  // linked into some chain (e.g. a cell element that's also a let-bound
  // value in its own right); unlink it from there first, or splicing it in
  // here would leave its old neighbors pointing at a node that no longer
  // points back (§3.4's `n.next.prev == n` invariant). `isfresh` tells the
  // two cases apart: a node never yet linked has meaningless default
  // `prev`/`next` (they alias node 0, the root sentinel), so unlinking it
  // unconditionally would instead corrupt the root chain.
  if is_alias && !graph.heap.get(replacement).isfresh {
    graph.unlink(replacement);
  }
  graph.link_before(insertion_point, replacement);
  redirect_backref(graph, redex, replacement);
  graph.heap.get_mut(redex).nref = 0;
  graph.heap.deref(redex);
  graph.heap.free(redex);
  graph.resync_head(sentinel);
  replacement
}

fn fire_test(graph: &mut Graph, test_node: NodeId, sentinel: NodeId, _depth: u32) -> NodeId {
  let pred_target = graph.heap.get(test_node).slots[0].subst_target().unwrap();
  let truthy = match resolve_concrete(graph, pred_target) {
    Some(crate::prim::Concrete::Num(x)) => x != 0.0,
    _ => unreachable!("eval_rl_step only dispatches here once the predicate resolved"),
  };
  let cons = graph.heap.get(test_node).slots[1].body_target().unwrap();
  let alt = graph.heap.get(test_node).slots[2].body_target().unwrap();
  let (chosen, discarded) = if truthy { (cons, alt) } else { (alt, cons) };
  discard_subtree(graph, discarded);
  splice_and_free_redex(graph, sentinel, test_node, chosen)
}

fn fire_rename(graph: &mut Graph, var_node: NodeId, target: NodeId, sentinel: NodeId) {
  trace!("rename {var_node} -> {target}");
  redirect_backref(graph, var_node, target);
  graph.heap.get_mut(var_node).nref = 0;
  graph.unlink(var_node);
  graph.heap.deref(var_node);
  graph.heap.free(var_node);
  graph.resync_head(sentinel);
}

/// Find every slot referencing `old` via `Subst` (a redex may be shared —
/// e.g. two use-sites of the same LET binding, or a TEST predicate shared
/// with an outer expression) and repoint each at `new`, rebalancing
/// refcounts. Scans every chain reachable from the graph's root, including
/// each sentinel's own head-tracking slot; correct but not cheap — callers
/// only reach this on a firing, never on the hot move-left path.
fn redirect_backref(graph: &mut Graph, old: NodeId, new: NodeId) {
  for s in reachable_sentinels(graph, graph.root) {
    if matches!(graph.heap.get(s).slots[0], Slot::Subst(t) if t == old) {
      graph.heap.get_mut(s).slots[0] = Slot::Subst(new);
      graph.incref(new);
    }
    for n in graph.chain_nodes(s) {
      let nslots = graph.heap.get(n).nslots();
      for i in 0..nslots {
        if matches!(graph.heap.get(n).slots[i], Slot::Subst(t) if t == old) {
          graph.heap.get_mut(n).slots[i] = Slot::Subst(new);
          graph.incref(new);
        }
      }
    }
  }
}

/// Free an entire chain (and any nested bodies) that's been structurally
/// discarded (the unchosen TEST branch) — no external references remain,
/// so every node in it is collectible regardless of its own `nref`.
fn discard_subtree(graph: &mut Graph, sentinel: NodeId) {
  for n in graph.chain_nodes(sentinel) {
    for s in graph.heap.get(n).slots.clone() {
      if let Slot::Body(sub) = s { discard_subtree(graph, sub); }
    }
    graph.heap.deref(n);
    graph.heap.free(n);
  }
  graph.heap.free(sentinel);
}

/// one step of the left-to-right sweep (§4.4.3): `collect`, `enter_abs`,
/// `enter_test`, `move_right`.
fn eval_lr_step(
  graph: &mut Graph, head: NodeId, sentinel: NodeId, depth: u32, mode: Mode, outer: &mut Vec<Frame>,
) -> State {
  if graph.heap.get(head).nref == 0 && graph.heap.get(head).variety != Variety::Sentinel {
    let next = graph.heap.get(head).next;
    graph.unlink(head);
    graph.heap.deref(head);
    graph.heap.free(head);
    graph.resync_head(sentinel);
    return State::EvalLr { head: next, sentinel, depth };
  }

  let variety = graph.heap.get(head).variety;
  if mode == Mode::Deep && matches!(variety, Variety::Abs | Variety::Fix) {
    let body = graph.heap.get(head).slots[0].body_target().unwrap();
    let next = graph.heap.get(head).next;
    outer.push(Frame { sentinel, depth, resume_at: next, resume: Resume::ExitAbs });
    let body_depth = graph.heap.get(body).depth;
    return State::EnterBody { sentinel: body, depth: body_depth };
  }

  if mode == Mode::Deep && variety == Variety::Test {
    let cons = graph.heap.get(head).slots[1].body_target().unwrap();
    let alt = graph.heap.get(head).slots[2].body_target().unwrap();
    let next = graph.heap.get(head).next;
    outer.push(Frame {
      sentinel, depth, resume_at: next,
      resume: Resume::ExitTestConsequent { alt },
    });
    let cons_depth = graph.heap.get(cons).depth;
    return State::EnterBody { sentinel: cons, depth: cons_depth };
  }

  let next = graph.heap.get(head).next;
  State::EvalLr { head: next, sentinel, depth }
}

/// After `enter_abs`/`enter_test` finishes a nested body, resume the
/// caller's L-to-R sweep at its saved position (`exit_abs`/`exit_test`).
fn resume(graph: &Graph, frame: Frame, outer: &mut Vec<Frame>) -> State {
  match frame.resume {
    Resume::ExitAbs => State::EvalLr { head: frame.resume_at, sentinel: frame.sentinel, depth: frame.depth },
    Resume::ExitTestConsequent { alt } => {
      // push a fresh frame so the alternative's completion resumes here.
      let alt_depth = graph.heap.get(alt).depth;
      outer.push(Frame {
        sentinel: frame.sentinel, depth: frame.depth,
        resume_at: frame.resume_at, resume: Resume::ExitTestAlternative,
      });
      State::EnterBody { sentinel: alt, depth: alt_depth }
    }
    Resume::ExitTestAlternative => State::EvalLr { head: frame.resume_at, sentinel: frame.sentinel, depth: frame.depth },
  }
}

/// Walk every chain reachable from `root` and collect zero-refcount nodes
/// (§4.4.5's pressure-triggered full sweep), then recalibrate.
fn full_gc(graph: &mut Graph, root: NodeId) {
  let before = graph.heap.live_count();
  debug!("full_gc: pressure {:.2} over threshold {:.2}, {before} live nodes", graph.heap.pressure(), graph.heap.threshold());
  let sentinels = reachable_sentinels(graph, root);
  for s in sentinels {
    let mut cur = graph.heap.get(s).next;
    while cur != s {
      let next = graph.heap.get(cur).next;
      if graph.heap.get(cur).nref == 0 {
        graph.unlink(cur);
        graph.heap.deref(cur);
        graph.heap.free(cur);
      }
      cur = next;
    }
    graph.resync_head(s);
  }
  graph.heap.calibrate();
  let after = graph.heap.live_count();
  if after == before {
    warn!("full_gc: swept 0 of {before} live nodes, pressure will trip again immediately");
  } else {
    debug!("full_gc: collected {} nodes ({before} -> {after})", before - after);
  }
}

fn reachable_sentinels(graph: &Graph, root: NodeId) -> Vec<NodeId> {
  let mut out = vec![root];
  let mut stack = vec![root];
  let mut seen = std::collections::HashSet::new();
  seen.insert(root);
  while let Some(s) = stack.pop() {
    for n in graph.chain_nodes(s) {
      for slot in &graph.heap.get(n).slots {
        if let Slot::Body(sub) = slot {
          if seen.insert(*sub) {
            out.push(*sub);
            stack.push(*sub);
          }
        }
      }
    }
  }
  out
}
