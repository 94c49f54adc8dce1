//! §4.5 invariant checks and §6 diagnostics. Grounded on
//! `examples/tangentstorm-bex/src/bdd.rs::BddBase::print_stats` (a small
//! stats-printing method over counters) and bex's habit of gating expensive
//! consistency walks behind `debug_assert!`/test builds rather than always
//! running them.
use crate::node::{Graph, NodeId, Variety};
use crate::slot::Slot;

/// Counters returned by [`eval_stats`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EvalStats {
  pub live_nodes: usize,
  pub slab_len: usize,
  pub pressure: f64,
}

pub fn eval_stats(graph: &Graph) -> EvalStats {
  EvalStats {
    live_nodes: graph.heap.live_count(),
    slab_len: graph.heap.slab_len(),
    pressure: graph.heap.pressure(),
  }
}

pub fn heap_stats(graph: &Graph) -> (usize, usize) {
  (graph.heap.live_count(), graph.heap.slab_len())
}

/// One line per node, in chain order: `n3: App[=n1, =n2] nref=2`.
pub fn list_chain(graph: &Graph, sentinel: NodeId) -> Vec<String> {
  graph.chain_nodes(sentinel).into_iter().map(|id| {
    let n = graph.heap.get(id);
    let slots: Vec<String> = n.slots.iter().map(|s| s.to_string()).collect();
    format!("{id}: {:?}[{}] nref={}", n.variety, slots.join(", "), n.nref)
  }).collect()
}

pub fn print_chain(graph: &Graph, sentinel: NodeId) {
  for line in list_chain(graph, sentinel) {
    debug!("{line}");
  }
}

/// §4.5 / §7.1 — walk every chain reachable from `root` and verify the
/// reference-count and redex-free invariants hold. Panics (`FatalBug`) on
/// the first violation found; intended for `debug_assert!(check_invariants(...))`
/// call sites, not the hot reduction path.
pub fn check_invariants(graph: &Graph, root: NodeId) -> bool {
  let mut expected: fxhash::FxHashMap<NodeId, u32> = fxhash::FxHashMap::default();
  let mut stack = vec![root];
  let mut seen = fxhash::FxHashSet::default();
  while let Some(s) = stack.pop() {
    if !seen.insert(s) { continue; }
    for n in graph.chain_nodes(s) {
      for slot in &graph.heap.get(n).slots {
        match slot {
          Slot::Subst(t) => { *expected.entry(*t).or_insert(0) += 1; }
          Slot::Body(sub) => stack.push(*sub),
          _ => {}
        }
      }
    }
  }

  for (&id, &want) in &expected {
    let got = graph.heap.get(id).nref;
    assert_eq!(got, want, "FatalBug: nref mismatch on {id}: stored {got}, counted {want}");
  }

  for s in &seen {
    for n in graph.chain_nodes(*s) {
      let node = graph.heap.get(n);
      if node.variety != Variety::Sentinel {
        assert!(node.nref >= 1, "FatalBug: dangling zero-ref non-sentinel node {n}");
      }
      assert!(
        !(node.variety == Variety::Var && node.slots.len() == 1 && matches!(node.slots[0], Slot::Subst(_))),
        "FatalBug: un-renamed administrative VAR node {n} survived to normal form",
      );
      assert!(node.variety != Variety::Let, "FatalBug: LET node {n} survived to normal form");
    }
  }
  true
}
