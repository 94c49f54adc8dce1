//! Opaque symbol tokens.
//!
//! The real symbol interner (mapping source identifiers to these tokens) is
//! an external collaborator, out of scope for this crate (see spec §1). A
//! `Sym` is nothing more than the small integer such an interner would hand
//! back; equality is by token, exactly as spec.md §2.1 requires.
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Sym(pub u32);

impl Sym {
  pub const fn new(id: u32) -> Self { Sym(id) }
  pub fn id(self) -> u32 { self.0 }
}

impl fmt::Display for Sym {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "sym#{}", self.0) }}

impl fmt::Debug for Sym {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self) }}
