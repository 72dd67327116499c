// Augmented Balanced Tree (spec.md §4.F): a generic order-statistic BST
// using AA-tree (Arne Andersson tree) rebalancing, parameterized by an
// optional key comparator and a `reaugment` callback that recomputes a
// subtree aggregate bottom-up after any structural change.
//
// Per SPEC_FULL.md §9, the C original's cyclic parent pointers become an
// arena (`Pool<RefCell<Node<T>>>`) indexed by a `NodeId` handle; each node
// is independently `RefCell`-guarded so `reaugment` can borrow a node's
// two children immutably while mutating the node itself, without any
// unsafe aliasing.

use crate::pool::Pool;
use std::cell::{Ref, RefCell, RefMut};
use std::cmp::Ordering;

pub type NodeId = usize;

struct Node<T> {
	data: T,
	level: u8,
	left: Option<NodeId>,
	right: Option<NodeId>,
	parent: Option<NodeId>,
}

type Comparator<T> = Box<dyn Fn(&T, &T) -> Ordering>;
type Reaugment<T> = Box<dyn FnMut(&mut T, Option<&T>, Option<&T>)>;

/// A generic augmented balanced tree over payload type `T`.
///
/// Construct with [`Abt::new_ordered`] for `find`/`insert`/`delete` by
/// comparator, or [`Abt::new_sequenced`] for `insert_before`/
/// `insert_after`/`delete` by explicit neighbor (spec.md §4.F).
pub struct Abt<T> {
	pool: Pool<RefCell<Node<T>>>,
	root: Option<NodeId>,
	comparator: Option<Comparator<T>>,
	reaugment: Reaugment<T>,
}

impl<T> Abt<T> {
	pub fn new_ordered<C, R>(comparator: C, reaugment: R) -> Abt<T>
	where
		C: Fn(&T, &T) -> Ordering + 'static,
		R: FnMut(&mut T, Option<&T>, Option<&T>) + 'static,
	{
		Abt { pool: Pool::new(), root: None, comparator: Some(Box::new(comparator)), reaugment: Box::new(reaugment) }
	}

	pub fn new_sequenced<R>(reaugment: R) -> Abt<T>
	where
		R: FnMut(&mut T, Option<&T>, Option<&T>) + 'static,
	{
		Abt { pool: Pool::new(), root: None, comparator: None, reaugment: Box::new(reaugment) }
	}

	pub fn is_empty(&self) -> bool {
		self.root.is_none()
	}

	pub fn len(&self) -> usize {
		self.pool.len()
	}

	pub fn root(&self) -> Option<NodeId> {
		self.root
	}

	pub fn data(&self, id: NodeId) -> Ref<'_, T> {
		Ref::map(self.node(id).borrow(), |n| &n.data)
	}

	pub fn data_mut(&self, id: NodeId) -> RefMut<'_, T> {
		RefMut::map(self.node(id).borrow_mut(), |n| &mut n.data)
	}

	pub fn left_child(&self, id: NodeId) -> Option<NodeId> {
		self.node(id).borrow().left
	}

	pub fn right_child(&self, id: NodeId) -> Option<NodeId> {
		self.node(id).borrow().right
	}

	fn node(&self, id: NodeId) -> &RefCell<Node<T>> {
		self.pool.get(id)
	}

	fn level(&self, id: Option<NodeId>) -> u8 {
		id.map_or(0, |n| self.node(n).borrow().level)
	}

	fn set_left(&mut self, parent: NodeId, child: Option<NodeId>) {
		self.node(parent).borrow_mut().left = child;
		if let Some(c) = child {
			self.node(c).borrow_mut().parent = Some(parent);
		}
	}

	fn set_right(&mut self, parent: NodeId, child: Option<NodeId>) {
		self.node(parent).borrow_mut().right = child;
		if let Some(c) = child {
			self.node(c).borrow_mut().parent = Some(parent);
		}
	}

	/// Reattaches `new_child` (possibly none, for an emptied subtree) into
	/// whichever side of `parent` used to hold `old_child_id`, or
	/// replaces the tree root if `parent` is none.
	fn attach_to_parent(&mut self, parent: Option<NodeId>, old_child_id: NodeId, new_child: Option<NodeId>) {
		match parent {
			None => {
				self.root = new_child;
				if let Some(c) = new_child {
					self.node(c).borrow_mut().parent = None;
				}
			}
			Some(p) => {
				let is_left = self.node(p).borrow().left == Some(old_child_id);
				if is_left {
					self.set_left(p, new_child);
				} else {
					self.set_right(p, new_child);
				}
			}
		}
	}

	fn reaugment_node(&mut self, id: NodeId) {
		let (left, right) = {
			let n = self.node(id).borrow();
			(n.left, n.right)
		};
		let left_ref = left.map(|l| self.node(l).borrow());
		let right_ref = right.map(|r| self.node(r).borrow());
		let mut node = self.node(id).borrow_mut();
		(self.reaugment)(&mut node.data, left_ref.as_deref().map(|n| &n.data), right_ref.as_deref().map(|n| &n.data));
	}

	/// AA-tree "skew": if `node`'s left child shares its level, rotates
	/// right so the left child becomes the subtree root. Always
	/// reaugments `node` (and the new root, if rotated) since its
	/// children's aggregates may have changed even without a rotation.
	fn maybe_skew(&mut self, node: NodeId) -> NodeId {
		let left = self.node(node).borrow().left;
		if let Some(l) = left {
			if self.node(l).borrow().level == self.node(node).borrow().level {
				let lr = self.node(l).borrow().right;
				self.set_left(node, lr);
				self.set_right(l, Some(node));
				self.reaugment_node(node);
				self.reaugment_node(l);
				return l;
			}
		}
		self.reaugment_node(node);
		node
	}

	/// AA-tree "split": if `node`'s right-right grandchild shares its
	/// level, rotates left and bumps the new root's level.
	fn maybe_split(&mut self, node: NodeId) -> NodeId {
		let right = self.node(node).borrow().right;
		if let Some(r) = right {
			let rr = self.node(r).borrow().right;
			if let Some(rr) = rr {
				if self.node(rr).borrow().level == self.node(node).borrow().level {
					let rl = self.node(r).borrow().left;
					self.set_right(node, rl);
					self.set_left(r, Some(node));
					self.node(r).borrow_mut().level += 1;
					self.reaugment_node(node);
					self.reaugment_node(r);
					return r;
				}
			}
		}
		self.reaugment_node(node);
		node
	}

	fn fixup_insert(&mut self, node: NodeId) -> NodeId {
		let node = self.maybe_skew(node);
		self.maybe_split(node)
	}

	fn fixup_delete(&mut self, node: NodeId) -> NodeId {
		// Decrease this node's level to match its children, per Andersson's
		// deletion algorithm.
		let should_be = self.level(self.node(node).borrow().left).min(self.level(self.node(node).borrow().right)) + 1;
		if should_be < self.node(node).borrow().level {
			self.node(node).borrow_mut().level = should_be;
			if let Some(r) = self.node(node).borrow().right {
				if self.node(r).borrow().level > should_be {
					self.node(r).borrow_mut().level = should_be;
				}
			}
		}

		let node = self.maybe_skew(node);
		if let Some(r) = self.node(node).borrow().right {
			let new_r = self.maybe_skew(r);
			self.set_right(node, Some(new_r));
			if let Some(rr) = self.node(new_r).borrow().right {
				let new_rr = self.maybe_skew(rr);
				self.set_right(new_r, Some(new_rr));
			}
		}
		let node = self.maybe_split(node);
		if let Some(r) = self.node(node).borrow().right {
			let new_r = self.maybe_split(r);
			self.set_right(node, Some(new_r));
		}
		node
	}

	/// Walks from `start` to the root, applying `fixup` at each level and
	/// relinking the (possibly rotated) new subtree root into its
	/// parent's child slot.
	fn propagate_up<F: Fn(&mut Self, NodeId) -> NodeId>(&mut self, start: Option<NodeId>, fixup: F) {
		let mut cur = start;
		while let Some(c) = cur {
			let parent = self.node(c).borrow().parent;
			let new_root = fixup(self, c);
			self.attach_to_parent(parent, c, Some(new_root));
			cur = parent;
		}
	}

	/// Re-propagates aggregates from `id` up to the root without
	/// rebalancing, for use after an external mutation changed only a
	/// node's aggregate inputs (the `abt_reaugmented` operation of
	/// spec.md §4.F, used by e.g. `Tower::resize`).
	pub fn reaugmented(&mut self, id: NodeId) {
		let mut cur = Some(id);
		while let Some(c) = cur {
			self.reaugment_node(c);
			cur = self.node(c).borrow().parent;
		}
	}

	fn alloc_leaf(&mut self, data: T) -> NodeId {
		let id = self.pool.alloc(RefCell::new(Node { data, level: 1, left: None, right: None, parent: None }));
		self.reaugment_node(id);
		id
	}

	fn leftmost(&self, mut id: NodeId) -> NodeId {
		loop {
			match self.node(id).borrow().left {
				Some(l) => id = l,
				None => return id,
			}
		}
	}

	fn rightmost(&self, mut id: NodeId) -> NodeId {
		loop {
			match self.node(id).borrow().right {
				Some(r) => id = r,
				None => return id,
			}
		}
	}

	pub fn first(&self) -> Option<NodeId> {
		self.root.map(|r| self.leftmost(r))
	}

	pub fn last(&self) -> Option<NodeId> {
		self.root.map(|r| self.rightmost(r))
	}

	pub fn next(&self, id: NodeId) -> Option<NodeId> {
		if let Some(r) = self.node(id).borrow().right {
			return Some(self.leftmost(r));
		}
		let mut cur = id;
		loop {
			let parent = self.node(cur).borrow().parent?;
			if self.node(parent).borrow().left == Some(cur) {
				return Some(parent);
			}
			cur = parent;
		}
	}

	pub fn prev(&self, id: NodeId) -> Option<NodeId> {
		if let Some(l) = self.node(id).borrow().left {
			return Some(self.rightmost(l));
		}
		let mut cur = id;
		loop {
			let parent = self.node(cur).borrow().parent?;
			if self.node(parent).borrow().right == Some(cur) {
				return Some(parent);
			}
			cur = parent;
		}
	}

	/// Ordered-mode lookup. Panics if constructed via `new_sequenced`.
	pub fn find(&self, key: &T) -> Option<NodeId> {
		let cmp = self.comparator.as_ref().expect("find() requires an ordered Abt");
		let mut cur = self.root;
		while let Some(c) = cur {
			match cmp(key, &self.node(c).borrow().data) {
				Ordering::Equal => return Some(c),
				Ordering::Less => cur = self.node(c).borrow().left,
				Ordering::Greater => cur = self.node(c).borrow().right,
			}
		}
		None
	}

	/// Ordered-mode insert. Returns `Ok(new_id)` on success, or
	/// `Err(existing_id)` if a node comparing equal already exists (the
	/// duplicate is not an error per spec.md §7 — the caller decides).
	pub fn insert(&mut self, data: T) -> Result<NodeId, NodeId> {
		assert!(self.comparator.is_some(), "insert() requires an ordered Abt");
		if self.root.is_none() {
			let id = self.alloc_leaf(data);
			self.root = Some(id);
			return Ok(id);
		}

		let cmp = self.comparator.as_ref().unwrap();
		let mut cur = self.root.unwrap();
		loop {
			let ord = cmp(&data, &self.node(cur).borrow().data);
			let next = match ord {
				Ordering::Equal => return Err(cur),
				Ordering::Less => self.node(cur).borrow().left,
				Ordering::Greater => self.node(cur).borrow().right,
			};
			match next {
				Some(n) => cur = n,
				None => {
					let id = self.alloc_leaf(data);
					if ord == Ordering::Less {
						self.set_left(cur, Some(id));
					} else {
						self.set_right(cur, Some(id));
					}
					self.propagate_up(Some(cur), Self::fixup_insert);
					return Ok(id);
				}
			}
		}
	}

	/// Sequenced-mode insert: places `data` immediately before `at` in
	/// in-order sequence, or at the end if `at` is `None`.
	pub fn insert_before(&mut self, at: Option<NodeId>, data: T) -> NodeId {
		assert!(self.comparator.is_none(), "insert_before() requires a sequenced Abt");
		match (self.root, at) {
			(None, _) => {
				let id = self.alloc_leaf(data);
				self.root = Some(id);
				id
			}
			(Some(_), None) => {
				let last = self.last().unwrap();
				let id = self.alloc_leaf(data);
				self.set_right(last, Some(id));
				self.propagate_up(Some(last), Self::fixup_insert);
				id
			}
			(Some(_), Some(at)) => {
				let left = self.node(at).borrow().left;
				match left {
					None => {
						let id = self.alloc_leaf(data);
						self.set_left(at, Some(id));
						self.propagate_up(Some(at), Self::fixup_insert);
						id
					}
					Some(l) => {
						let pred = self.rightmost(l);
						let id = self.alloc_leaf(data);
						self.set_right(pred, Some(id));
						self.propagate_up(Some(pred), Self::fixup_insert);
						id
					}
				}
			}
		}
	}

	/// Sequenced-mode insert: places `data` immediately after `at`, or
	/// at the start if `at` is `None`.
	pub fn insert_after(&mut self, at: Option<NodeId>, data: T) -> NodeId {
		assert!(self.comparator.is_none(), "insert_after() requires a sequenced Abt");
		match (self.root, at) {
			(None, _) => {
				let id = self.alloc_leaf(data);
				self.root = Some(id);
				id
			}
			(Some(_), None) => {
				let first = self.first().unwrap();
				let id = self.alloc_leaf(data);
				self.set_left(first, Some(id));
				self.propagate_up(Some(first), Self::fixup_insert);
				id
			}
			(Some(_), Some(at)) => {
				let right = self.node(at).borrow().right;
				match right {
					None => {
						let id = self.alloc_leaf(data);
						self.set_right(at, Some(id));
						self.propagate_up(Some(at), Self::fixup_insert);
						id
					}
					Some(r) => {
						let succ = self.leftmost(r);
						let id = self.alloc_leaf(data);
						self.set_left(succ, Some(id));
						self.propagate_up(Some(succ), Self::fixup_insert);
						id
					}
				}
			}
		}
	}

	/// Removes `id` from the tree and returns its payload. `id` must not
	/// be used again afterward.
	pub fn delete(&mut self, id: NodeId) -> T {
		let (left, right, parent) = {
			let n = self.node(id).borrow();
			(n.left, n.right, n.parent)
		};

		let fixup_start = if let (Some(left), Some(right)) = (left, right) {
			let succ = self.leftmost(right);
			let succ_parent = self.node(succ).borrow().parent.unwrap();
			let fixup_start;
			if succ_parent == id {
				fixup_start = Some(succ);
			} else {
				let succ_right = self.node(succ).borrow().right;
				self.set_left(succ_parent, succ_right);
				self.set_right(succ, Some(right));
				fixup_start = Some(succ_parent);
			}
			self.set_left(succ, Some(left));
			let id_level = self.node(id).borrow().level;
			self.node(succ).borrow_mut().level = id_level;
			self.attach_to_parent(parent, id, Some(succ));
			fixup_start
		} else {
			let child = left.or(right);
			self.attach_to_parent(parent, id, child);
			parent
		};

		let cell = self.pool.free(id);
		self.propagate_up(fixup_start, Self::fixup_delete);
		cell.into_inner().data
	}

	/// Visits every node's data in ascending order. Intended for tests
	/// and debugging, not the hot path.
	pub fn iter(&self) -> AbtIter<'_, T> {
		AbtIter { tree: self, cur: self.first() }
	}
}

pub struct AbtIter<'a, T> {
	tree: &'a Abt<T>,
	cur: Option<NodeId>,
}

impl<'a, T> Iterator for AbtIter<'a, T> {
	type Item = NodeId;
	fn next(&mut self) -> Option<NodeId> {
		let cur = self.cur?;
		self.cur = self.tree.next(cur);
		Some(cur)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn counting_tree() -> Abt<(i32, u32)> {
		// (key, subtree_count)
		Abt::new_ordered(
			|a: &(i32, u32), b: &(i32, u32)| a.0.cmp(&b.0),
			|node: &mut (i32, u32), l: Option<&(i32, u32)>, r: Option<&(i32, u32)>| {
				node.1 = 1 + l.map_or(0, |n| n.1) + r.map_or(0, |n| n.1);
			},
		)
	}

	fn check_levels<T>(tree: &Abt<T>) {
		for id in tree.iter() {
			let node = tree.node(id).borrow();
			let lvl = node.level;
			if let Some(l) = node.left {
				assert!(tree.node(l).borrow().level < lvl, "left child level invariant violated");
			}
			if let Some(r) = node.right {
				let rlvl = tree.node(r).borrow().level;
				assert!(rlvl <= lvl, "right child level invariant violated");
				if let Some(rr) = tree.node(r).borrow().right {
					assert!(tree.node(rr).borrow().level < lvl, "right-right grandchild level invariant violated");
				}
			}
		}
	}

	#[test]
	fn ordered_insert_find_and_order() {
		let mut t = counting_tree();
		let mut ids = vec![];
		for k in [5, 3, 8, 1, 4, 7, 9, 2, 6, 0] {
			ids.push(t.insert((k, 0)).unwrap());
		}
		check_levels(&t);
		assert_eq!(t.len(), 10);
		let in_order: Vec<i32> = t.iter().map(|id| t.data(id).0).collect();
		assert_eq!(in_order, (0..10).collect::<Vec<_>>());
		for k in 0..10 {
			let found = t.find(&(k, 0)).unwrap();
			assert_eq!(t.data(found).0, k);
		}
		assert!(t.find(&(42, 0)).is_none());
	}

	#[test]
	fn duplicate_insert_returns_existing() {
		let mut t = counting_tree();
		let first = t.insert((1, 0)).unwrap();
		let dup = t.insert((1, 0));
		assert_eq!(dup, Err(first));
	}

	#[test]
	fn aggregate_matches_subtree_count() {
		let mut t = counting_tree();
		for k in 0..31 {
			t.insert((k, 0)).unwrap();
		}
		let root = t.root().unwrap();
		assert_eq!(t.data(root).1, 31);
	}

	#[test]
	fn delete_preserves_order_and_levels() {
		let mut t = counting_tree();
		let mut ids = vec![];
		for k in 0..20 {
			ids.push(t.insert((k, 0)).unwrap());
		}
		// Delete every third element.
		for i in (0..20).step_by(3) {
			t.delete(ids[i]);
		}
		check_levels(&t);
		let remaining: Vec<i32> = t.iter().map(|id| t.data(id).0).collect();
		let expected: Vec<i32> = (0..20).filter(|k| k % 3 != 0).collect();
		assert_eq!(remaining, expected);
		let root = t.root().unwrap();
		assert_eq!(t.data(root).1 as usize, remaining.len());
	}

	#[test]
	fn sequenced_insert_before_and_after() {
		let mut t: Abt<i32> = Abt::new_sequenced(|_: &mut i32, _, _| {});
		let b = t.insert_before(None, 1);
		let c = t.insert_before(None, 3);
		let _a = t.insert_before(Some(b), 0);
		let _d = t.insert_after(Some(c), 4);
		let _bb = t.insert_after(Some(b), 2);
		let order: Vec<i32> = t.iter().map(|id| *t.data(id)).collect();
		assert_eq!(order, vec![0, 1, 2, 3, 4]);
	}

	#[test]
	fn sequenced_delete_keeps_remaining_order() {
		let mut t: Abt<i32> = Abt::new_sequenced(|_: &mut i32, _, _| {});
		let ids: Vec<_> = (0..15).map(|i| t.insert_before(None, i)).collect();
		t.delete(ids[7]);
		t.delete(ids[0]);
		t.delete(ids[14]);
		let order: Vec<i32> = t.iter().map(|id| *t.data(id)).collect();
		let expected: Vec<i32> = (0..15).filter(|&i| i != 7 && i != 0 && i != 14).collect();
		assert_eq!(order, expected);
	}

	#[test]
	fn prev_and_last_are_consistent_with_next_and_first() {
		let mut t = counting_tree();
		for k in 0..10 {
			t.insert((k, 0)).unwrap();
		}
		let mut id = t.last().unwrap();
		let mut collected = vec![t.data(id).0];
		while let Some(p) = t.prev(id) {
			collected.push(t.data(p).0);
			id = p;
		}
		collected.reverse();
		assert_eq!(collected, (0..10).collect::<Vec<_>>());
	}
}
