//! A graph-reduction engine for a lambda-calculus abstract machine: nodes
//! with explicit substitution and reference-counted sharing, reduced by a
//! two-direction sweep over doubly-linked chains rather than tree rewriting.

#![allow(clippy::many_single_char_names)]

#[macro_use] extern crate log;
extern crate fxhash;

/// Interned symbol table, used for parameter and free-variable names.
pub mod sym;
/// The slot tagged union (§3.2): every node's fixed-size tail of fields.
pub mod slot;
/// The node heap: a slab allocator bucketed by slot count (§4.1).
pub mod heap;
/// The node record and the doubly-linked chain it lives in (§3.1/§3.3/§3.4).
pub mod node;
/// Built-in operators and their dispatch (§4.3).
pub mod prim;
/// The beta/zeta substitution engine, copying or in-place (§4.2).
pub mod beta;
/// The two-direction reduction sweep that drives a chain to normal form (§4.4).
pub mod reduce;
/// Invariant checks and chain-printing diagnostics (§4.5).
pub mod diag;
/// Reading normal-form nodes back into host values (§6).
pub mod readback;
/// The non-fatal error model (§7); fatal kinds are panics, not values.
pub mod error;

pub use error::{ReduceError, ReduceResult};
pub use node::{Graph, Node, NodeId, Variety};
pub use reduce::{reduce, Mode};
pub use slot::Slot;
pub use sym::Sym;
