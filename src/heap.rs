//! §4.1 — the node heap. A slab of variable-length node records plus a
//! freelist bucketed by slot count, grounded on the dense-index storage in
//! `examples/tangentstorm-bex/src/vhl.rs::HiLoCache` (no pointer chasing,
//! no relocation, addresses stable once allocated) but single-threaded: no
//! `boxcar`/`dashmap` is needed since there is exactly one writer.
use fxhash::FxHashMap;

use crate::node::{Node, NodeId};

pub struct Heap {
  slab: Vec<Option<Node>>,
  free_by_len: FxHashMap<usize, Vec<NodeId>>,
  alloc_seq: u64,
  /// running estimate of live nodes, used by `pressure()`.
  live: usize,
  /// size of the slab the last time `calibrate()` ran.
  baseline: usize,
}

/// Above this fraction of the baseline, the reducer is advised to run a GC
/// sweep (§4.4.5). Not otherwise load-bearing; tunable.
pub const DEFAULT_THRESHOLD: f64 = 0.75;

impl Heap {
  pub fn new() -> Self {
    Heap { slab: Vec::new(), free_by_len: FxHashMap::default(), alloc_seq: 0, live: 0, baseline: 1 }
  }

  pub fn alloc(&mut self, node: Node) -> NodeId {
    self.alloc_seq += 1;
    let nslots = node.nslots();
    if let Some(bucket) = self.free_by_len.get_mut(&nslots) {
      if let Some(id) = bucket.pop() {
        self.slab[id.0 as usize] = Some(node);
        self.live += 1;
        return id;
      }
    }
    let id = NodeId(self.slab.len() as u32);
    self.slab.push(Some(node));
    self.live += 1;
    id
  }

  /// Return storage to the pool. The caller must have already decremented
  /// references via `deref`.
  pub fn free(&mut self, id: NodeId) {
    let nslots = self.slab[id.0 as usize].as_ref().expect("double free").nslots();
    self.slab[id.0 as usize] = None;
    self.free_by_len.entry(nslots).or_default().push(id);
    self.live = self.live.saturating_sub(1);
  }

  /// For each SUBST slot in `node`, decrement the target's `nref`.
  pub fn deref(&mut self, id: NodeId) {
    let targets: Vec<NodeId> = self.get(id).slots.iter()
      .filter_map(|s| s.subst_target())
      .collect();
    for t in targets {
      let n = self.get_mut(t);
      debug_assert!(n.nref > 0, "deref({id}) would drive {t}'s nref below zero");
      n.nref = n.nref.saturating_sub(1);
    }
  }

  pub fn get(&self, id: NodeId) -> &Node {
    self.slab[id.0 as usize].as_ref().expect("use of freed node")
  }

  pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
    self.slab[id.0 as usize].as_mut().expect("use of freed node")
  }

  pub fn is_live(&self, id: NodeId) -> bool {
    (id.0 as usize) < self.slab.len() && self.slab[id.0 as usize].is_some()
  }

  /// 0..1 estimate of live-heap / total-heap.
  pub fn pressure(&self) -> f64 {
    if self.baseline == 0 { return 0.0; }
    self.live as f64 / self.baseline as f64
  }

  pub fn threshold(&self) -> f64 { DEFAULT_THRESHOLD }

  /// Called after a GC to reset the pressure baseline.
  pub fn calibrate(&mut self) {
    self.baseline = self.live.max(1);
  }

  pub fn live_count(&self) -> usize { self.live }
  pub fn slab_len(&self) -> usize { self.slab.len() }
}

impl Default for Heap { fn default() -> Self { Self::new() } }
