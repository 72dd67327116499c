// Taint (spec.md §4.K): a pluggable, sticky error-flag propagation graph.
//
// Per SPEC_FULL.md §9/4.K, the C original's parent/child pointer graph
// becomes a single shared arena (`Rc<RefCell<Graph>>`) with edges stored
// as indices rather than `Weak<T>` pointers into individually-owned
// nodes — equivalent cycle-safety, simpler in safe Rust.

use std::cell::RefCell;
use std::rc::Rc;

struct Graph {
	tainted: Vec<bool>,
	edges: Vec<Vec<usize>>,
}

/// A handle into the shared taint graph. Cloning a `Taint` handle does
/// *not* clone the node it refers to; use `Taint::clone_node` for that
/// (the `taint_clone` operation of spec.md §4.K).
#[derive(Clone)]
pub struct Taint {
	graph: Rc<RefCell<Graph>>,
	id: usize,
}

impl Taint {
	pub fn create() -> Taint {
		let graph = Rc::new(RefCell::new(Graph { tainted: vec![false], edges: vec![Vec::new()] }));
		Taint { graph, id: 0 }
	}

	fn new_node(&self) -> Taint {
		let mut g = self.graph.borrow_mut();
		let id = g.tainted.len();
		g.tainted.push(false);
		g.edges.push(Vec::new());
		Taint { graph: self.graph.clone(), id }
	}

	/// Returns a node that is already an outgoing propagation target of
	/// `self`, so a tainted source stays tainted for the clone.
	pub fn clone_node(&self) -> Taint {
		let new = self.new_node();
		self.propagate_to(&new);
		new
	}

	pub fn is_tainted(&self) -> bool {
		self.graph.borrow().tainted[self.id]
	}

	/// Marks this node, and every node reachable through outgoing edges,
	/// tainted. Fixed-point traversal; safe on graphs with cycles.
	pub fn set(&self) {
		let mut g = self.graph.borrow_mut();
		if g.tainted[self.id] {
			return;
		}
		let mut stack = vec![self.id];
		while let Some(n) = stack.pop() {
			if !g.tainted[n] {
				g.tainted[n] = true;
				stack.extend(g.edges[n].iter().copied());
			}
		}
	}

	/// Adds an edge `self -> dst`. If `self` is already tainted, `dst`
	/// is tainted immediately.
	pub fn propagate_to(&self, dst: &Taint) {
		assert!(Rc::ptr_eq(&self.graph, &dst.graph), "taint nodes from different graphs");
		let already_tainted = {
			let mut g = self.graph.borrow_mut();
			g.edges[self.id].push(dst.id);
			g.tainted[self.id]
		};
		if already_tainted {
			dst.set();
		}
	}

	/// Returns whether this node was ever tainted. The node's storage
	/// is not actually reclaimed (the graph is shared); this mirrors
	/// the "was tainted?" return value of `taint_destroy`.
	pub fn destroy(self) -> bool {
		self.is_tainted()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn fresh_node_is_clean() {
		let t = Taint::create();
		assert!(!t.is_tainted());
	}

	#[test]
	fn taint_propagates_along_edges() {
		let r1 = Taint::create();
		let r2 = r1.clone_node();
		let r3 = r2.new_node();
		r2.propagate_to(&r3);

		r1.set();
		assert!(r1.is_tainted());
		assert!(r2.is_tainted());
		assert!(r3.is_tainted());
	}

	#[test]
	fn taint_handles_cycles() {
		let a = Taint::create();
		let b = a.new_node();
		a.propagate_to(&b);
		b.propagate_to(&a);

		b.set();
		assert!(a.is_tainted());
		assert!(b.is_tainted());
	}

	#[test]
	fn destroy_reports_had_error() {
		let t = Taint::create();
		assert!(!t.clone().destroy());
		let t2 = Taint::create();
		t2.set();
		assert!(t2.destroy());
	}
}
