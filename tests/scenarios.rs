//! §8.3 worked scenarios, built directly against the `Graph` constructors
//! (there's no parser in this crate — programs are graphs from the start)
//! and driven to normal form through `reduce::reduce`.

use redex::node::{Graph, Variety};
use redex::prim::Primitive;
use redex::reduce::{reduce, Mode};
use redex::slot::Slot;
use redex::sym::Sym;
use redex::{diag, readback};

fn sole_num(g: &Graph, sentinel: redex::node::NodeId) -> f64 {
  let nodes = g.chain_nodes(sentinel);
  assert_eq!(nodes.len(), 1, "expected a single normal-form node, got {nodes:?}");
  match g.heap.get(nodes[0]).slots.first() {
    Some(Slot::Num(x)) => *x,
    other => panic!("expected NUM, got {other:?}"),
  }
}

#[test]
fn identity_applied_to_a_value_reduces_to_it() {
  let mut g = Graph::new();
  let (abs, body) = g.new_abs(0, &[Sym::new(0)]);
  let bv = g.new_bound_var(1, 0, 0);
  g.push(body, bv);
  let a = g.new_num(0, 7.0);
  let call = g.new_app(0, Slot::Subst(abs), vec![Slot::Subst(a)]);
  g.push(g.root, call);

  let root = reduce(&mut g, g.root, Mode::Deep);
  assert_eq!(sole_num(&g, root), 7.0);
  assert!(diag::check_invariants(&g, root));
}

/// §8.3 scenario 2: `(λx y. y) A B ⟹ B`, with `A` (never referenced by the
/// body, since it only projects `y`) freed eagerly once substitution drops
/// its refcount to zero — not just waiting for the next L-to-R sweep.
#[test]
fn const_projection_picks_the_second_argument() {
  let mut g = Graph::new();
  let (abs, body) = g.new_abs(0, &[Sym::new(0), Sym::new(1)]);
  let bv = g.new_bound_var(1, 0, 1);
  g.push(body, bv);
  let a = g.new_num(0, 1.0);
  let b = g.new_num(0, 2.0);
  let call = g.new_app(0, Slot::Subst(abs), vec![Slot::Subst(a), Slot::Subst(b)]);
  g.push(g.root, call);

  let root = reduce(&mut g, g.root, Mode::Deep);
  assert_eq!(sole_num(&g, root), 2.0);
  assert!(!g.heap.is_live(a), "A's node should be eagerly freed once its refcount reaches zero");
}

#[test]
fn test_node_picks_the_consequent_on_truthy_predicate() {
  let mut g = Graph::new();
  let pred = g.new_num(0, 1.0);
  let (test, cons, alt) = g.new_test(0, Slot::Subst(pred));
  let c = g.new_num(1, 42.0);
  let a = g.new_num(1, 99.0);
  g.push(cons, c);
  g.push(alt, a);
  g.push(g.root, test);

  let root = reduce(&mut g, g.root, Mode::Deep);
  assert_eq!(sole_num(&g, root), 42.0);
}

#[test]
fn test_node_picks_the_alternative_on_falsy_predicate() {
  let mut g = Graph::new();
  let pred = g.new_num(0, 0.0);
  let (test, cons, alt) = g.new_test(0, Slot::Subst(pred));
  let c = g.new_num(1, 42.0);
  let a = g.new_num(1, 99.0);
  g.push(cons, c);
  g.push(alt, a);
  g.push(g.root, test);

  let root = reduce(&mut g, g.root, Mode::Deep);
  assert_eq!(sole_num(&g, root), 99.0);
}

#[test]
fn primitive_addition_fires_once_both_args_are_concrete() {
  let mut g = Graph::new();
  let add = g.new_prim(0, Primitive::Add);
  let a = g.new_num(0, 2.0);
  let b = g.new_num(0, 3.0);
  let call = g.new_app(0, Slot::Subst(add), vec![Slot::Subst(a), Slot::Subst(b)]);
  g.push(g.root, call);

  let root = reduce(&mut g, g.root, Mode::Deep);
  assert_eq!(sole_num(&g, root), 5.0);
}

#[test]
fn car_aliases_the_cells_first_element() {
  let mut g = Graph::new();
  let car = g.new_prim(0, Primitive::Car);
  let x = g.new_num(0, 11.0);
  let y = g.new_num(0, 22.0);
  let cell = g.new_cell(0, vec![Slot::Subst(x), Slot::Subst(y)]);
  let call = g.new_app(0, Slot::Subst(car), vec![Slot::Subst(cell)]);
  g.push(g.root, call);

  let root = reduce(&mut g, g.root, Mode::Deep);
  assert_eq!(sole_num(&g, root), 11.0);
}

/// `car` on an element that's *also* linked directly into the top-level
/// chain (not merely referenced through the cell) — the aliased node
/// already has a chain position of its own, so splicing it in as `car`'s
/// result must unlink it from that old position first, or the old
/// neighbors are left pointing at a node that no longer points back.
#[test]
fn car_unlinks_an_aliased_node_from_its_existing_chain_position() {
  let mut g = Graph::new();
  let car = g.new_prim(0, Primitive::Car);
  let x = g.new_num(0, 11.0);
  let y = g.new_num(0, 22.0);
  let cell = g.new_cell(0, vec![Slot::Subst(x), Slot::Subst(y)]);
  let call = g.new_app(0, Slot::Subst(car), vec![Slot::Subst(cell)]);
  g.push(g.root, x);
  g.push(g.root, call);

  let root = reduce(&mut g, g.root, Mode::Deep);
  let nodes = g.chain_nodes(root);
  assert_eq!(nodes.len(), 1, "x's standalone chain slot and car's aliased result should collapse to the one shared node, got {nodes:?}");
  assert_eq!(sole_num(&g, root), 11.0);
  assert!(diag::check_invariants(&g, root));
}

/// `at(cell(10,20,30), 2) ⟹ 30` — `at` also returns via `Fired::Alias`.
#[test]
fn at_picks_the_indexed_element() {
  let mut g = Graph::new();
  let at = g.new_prim(0, Primitive::At);
  let a = g.new_num(0, 10.0);
  let b = g.new_num(0, 20.0);
  let c = g.new_num(0, 30.0);
  let cell = g.new_cell(0, vec![Slot::Subst(a), Slot::Subst(b), Slot::Subst(c)]);
  let idx = g.new_num(0, 2.0);
  let call = g.new_app(0, Slot::Subst(at), vec![Slot::Subst(cell), Slot::Subst(idx)]);
  g.push(g.root, call);

  let root = reduce(&mut g, g.root, Mode::Deep);
  assert_eq!(sole_num(&g, root), 30.0);
}

/// `Y (λh n. IF (= n 0) 1 (× n (h (− n 1)))) 5 ⟹ NUM 120` (§8.3 item 5),
/// expressed directly with a FIX node in the self-passing style: applying
/// FIX supplies both the recursive binding `h` (aliased to the FIX node
/// itself) and the real argument `n` in one firing, and every recursive
/// call re-supplies `h` as its own first argument.
#[test]
fn factorial_via_fix_self_application_yields_120() {
  // uncomment to watch the sweep fire redex-by-redex:
  // use simplelog::*; TermLogger::init(LevelFilter::Trace, Config::default()).unwrap();
  let mut g = Graph::new();
  let eq = g.new_prim(0, Primitive::Eq);
  let mul = g.new_prim(0, Primitive::Mul);
  let sub = g.new_prim(0, Primitive::Sub);

  let (fix, fix_body) = g.new_fix(0, &[Sym::new(0), Sym::new(1)]); // h, n

  // pred = (= n 0), a sibling of `test` in fix_body so the R-to-L sweep
  // can fire it on its own before the TEST above it resolves.
  let zero = g.new_num(1, 0.0);
  let pred = g.new_app(1, Slot::Subst(eq), vec![Slot::Bound { up: 0, across: 1 }, Slot::Subst(zero)]);
  g.push(fix_body, pred);

  let (test, cons, alt) = g.new_test(1, Slot::Subst(pred));
  g.push(fix_body, test);

  let one_for_cons = g.new_num(2, 1.0);
  g.push(cons, one_for_cons);

  // alt = (* n (h h (- n 1))) — one Body nesting deeper than fix_body, so
  // references to h/n here cross one extra binder boundary (up: 1).
  let one_for_sub = g.new_num(2, 1.0);
  let n_minus_1 = g.new_app(2, Slot::Subst(sub), vec![
    Slot::Bound { up: 1, across: 1 },
    Slot::Subst(one_for_sub),
  ]);
  let recurse = g.new_app(2, Slot::Bound { up: 1, across: 0 }, vec![
    Slot::Bound { up: 1, across: 0 },
    Slot::Subst(n_minus_1),
  ]);
  let product = g.new_app(2, Slot::Subst(mul), vec![
    Slot::Bound { up: 1, across: 1 },
    Slot::Subst(recurse),
  ]);
  g.push(alt, product);

  let five = g.new_num(0, 5.0);
  let call = g.new_app(0, Slot::Subst(fix), vec![Slot::Subst(fix), Slot::Subst(five)]);
  g.push(g.root, call);

  let root = reduce(&mut g, g.root, Mode::Deep);
  assert_eq!(sole_num(&g, root), 120.0);
}

/// Church numeral `4` applied to a `succ` closure and `0` cascades through
/// four nested beta/prim firings to the concrete value `4` — exercising
/// sharing (every occurrence of `f` aliases the same `succ` closure) and
/// the redex-result backreference fixup that sharing depends on.
#[test]
fn church_four_applied_to_succ_and_zero_yields_four() {
  let mut g = Graph::new();
  let add = g.new_prim(0, Primitive::Add);

  let (succ, succ_body) = g.new_abs(0, &[Sym::new(0)]);
  let one = g.new_num(1, 1.0);
  let succ_app = g.new_app(1, Slot::Subst(add), vec![Slot::Bound { up: 0, across: 0 }, Slot::Subst(one)]);
  g.push(succ_body, succ_app);

  let (church4, body) = g.new_abs(0, &[Sym::new(0), Sym::new(1)]); // f, x
  let app1 = g.new_app(1, Slot::Bound { up: 0, across: 0 }, vec![Slot::Bound { up: 0, across: 1 }]);
  g.push(body, app1);
  let app2 = g.new_app(1, Slot::Bound { up: 0, across: 0 }, vec![Slot::Subst(app1)]);
  g.push(body, app2);
  let app3 = g.new_app(1, Slot::Bound { up: 0, across: 0 }, vec![Slot::Subst(app2)]);
  g.push(body, app3);
  let app4 = g.new_app(1, Slot::Bound { up: 0, across: 0 }, vec![Slot::Subst(app3)]);
  g.push(body, app4);

  let zero = g.new_num(0, 0.0);
  let call = g.new_app(0, Slot::Subst(church4), vec![Slot::Subst(succ), Slot::Subst(zero)]);
  g.push(g.root, call);

  let root = reduce(&mut g, g.root, Mode::Deep);
  assert_eq!(sole_num(&g, root), 4.0);
}

#[test]
fn church_true_reads_back_through_full_round_trip() {
  let mut g = Graph::new();
  let (abs, body) = g.new_abs(0, &[Sym::new(0), Sym::new(1)]);
  let bv = g.new_bound_var(1, 0, 0);
  g.push(body, bv);
  assert_eq!(readback::read_bool(&g, abs), Ok(true));
  assert_eq!(g.heap.get(abs).variety, Variety::Abs);
}
