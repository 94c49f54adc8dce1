//! §7 — the error model. `FatalBug`/`FatalResource`/`FatalType` are not
//! values here: they're `panic!`/`assert!` call sites scattered through
//! `reduce.rs`/`beta.rs`, following `examples/tangentstorm-bex`'s own split
//! of "invariant violation" (panic) from "this rule doesn't apply right
//! now" (`Option`/`Result`). `ReduceError` covers only the latter, non-fatal
//! kind.
use std::fmt;

/// A non-fatal outcome: the caller asked for something that the graph, in
/// its current state, cannot produce — not a bug, just "no".
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReduceError {
  /// §4.4 — the sweep reached a fixed point with no available redex; the
  /// chain is already in normal form (or the step budget ran out first).
  Irreducible,
  /// §6 — the normal-form node doesn't match the encoding a reader expects
  /// (e.g. `read_bool` on something that isn't a two-param ABS).
  ReadbackMiss,
}

impl fmt::Display for ReduceError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      ReduceError::Irreducible => write!(f, "no redex available"),
      ReduceError::ReadbackMiss => write!(f, "normal form doesn't match the expected encoding"),
    }
  }
}

impl std::error::Error for ReduceError {}

pub type ReduceResult<T> = Result<T, ReduceError>;
