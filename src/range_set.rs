// Range Set (spec.md §4.E): a set of disjoint, non-adjacent-merging
// half-open `u64` intervals, backed by `src/abt.rs` in ordered mode
// (keyed by interval start) per SPEC_FULL.md §4.E. Used as a free-space
// allocator by `src/case_tempfile.rs`.
//
// `allocate` treats the set as a pool of *free* regions: it always takes
// the very first range by position, carving up to `size` off its front
// regardless of whether that range is big enough to satisfy the whole
// request (`range-set-test.c::test_allocate`); `allocate_fully` instead
// scans for the first range at least `size` wide and fails if none
// exists (`test_allocate_fully`). This is the free-list role `range-set`
// plays in the original `case_tmpfile.c` allocator.

use crate::abt::Abt;
use std::cell::Cell;
use std::cmp::Ordering;

#[derive(Clone, Copy)]
struct Range {
	start: u64,
	end: u64,
	max_end: u64,
}

pub struct RangeSet {
	tree: Abt<Range>,
	/// One-range scan cache, invalidated on any mutation.
	cache: Cell<Option<(u64, u64)>>,
}

impl RangeSet {
	pub fn new() -> RangeSet {
		RangeSet {
			tree: Abt::new_ordered(
				|a: &Range, b: &Range| a.start.cmp(&b.start),
				|node: &mut Range, left: Option<&Range>, right: Option<&Range>| {
					node.max_end = node.end.max(left.map_or(0, |l| l.max_end)).max(right.map_or(0, |r| r.max_end));
				},
			),
			cache: Cell::new(None),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.tree.is_empty()
	}

	fn invalidate(&self) {
		self.cache.set(None);
	}

	fn ranges(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
		self.tree.iter().map(move |id| {
			let r = self.tree.data(id);
			(r.start, r.end)
		})
	}

	pub fn contains(&self, point: u64) -> bool {
		if let Some((s, e)) = self.cache.get() {
			if point >= s && point < e {
				return true;
			}
		}
		for (s, e) in self.ranges() {
			if point < s {
				break;
			}
			if point < e {
				self.cache.set(Some((s, e)));
				return true;
			}
		}
		false
	}

	/// Marks `[start, end)` as in the set, merging with any overlapping
	/// or adjacent existing ranges.
	pub fn set1(&mut self, start: u64, end: u64) {
		assert!(start < end);
		let mut merged_start = start;
		let mut merged_end = end;
		let mut to_remove = Vec::new();
		for id in self.tree.iter() {
			let (s, e) = {
				let r = self.tree.data(id);
				(r.start, r.end)
			};
			if s <= merged_end && e >= merged_start {
				merged_start = merged_start.min(s);
				merged_end = merged_end.max(e);
				to_remove.push(id);
			}
		}
		for id in to_remove {
			self.tree.delete(id);
		}
		self.tree.insert(Range { start: merged_start, end: merged_end, max_end: merged_end }).unwrap_or_else(|_| panic!("merged range cannot collide"));
		self.invalidate();
	}

	/// Removes `[start, end)` from the set, trimming or splitting any
	/// ranges it overlaps.
	pub fn set0(&mut self, start: u64, end: u64) {
		assert!(start < end);
		let mut to_remove = Vec::new();
		let mut to_add = Vec::new();
		for id in self.tree.iter() {
			let (s, e) = {
				let r = self.tree.data(id);
				(r.start, r.end)
			};
			if s < end && e > start {
				to_remove.push(id);
				if s < start {
					to_add.push((s, start));
				}
				if e > end {
					to_add.push((end, e));
				}
			}
		}
		for id in to_remove {
			self.tree.delete(id);
		}
		for (s, e) in to_add {
			self.tree.insert(Range { start: s, end: e, max_end: e }).ok();
		}
		self.invalidate();
	}

	/// Returns the first set range intersecting or following `start`.
	pub fn scan(&self, start: u64) -> Option<(u64, u64)> {
		for (s, e) in self.ranges() {
			if e > start {
				return Some((s.max(start), e));
			}
		}
		None
	}

	/// Takes the first (lowest-start) free range, carves up to `size` off
	/// its front, and returns the allocated `(start, width)`; `width` is
	/// `size` only if the range was that wide, else the whole range.
	pub fn allocate(&mut self, size: u64) -> Option<(u64, u64)> {
		let (start, end) = self.ranges().next()?;
		let width = size.min(end - start);
		self.set0(start, start + width);
		Some((start, width))
	}

	/// Like `allocate`, but fails unless some range is at least `size`
	/// wide; carves exactly `size` from the front of the first such range.
	pub fn allocate_fully(&mut self, size: u64) -> Option<u64> {
		let (start, _) = self.ranges().find(|&(s, e)| e - s >= size)?;
		self.set0(start, start + size);
		Some(start)
	}
}

impl Default for RangeSet {
	fn default() -> Self {
		RangeSet::new()
	}
}

impl Clone for RangeSet {
	fn clone(&self) -> RangeSet {
		let mut out = RangeSet::new();
		for (s, e) in self.ranges() {
			out.tree.insert(Range { start: s, end: e, max_end: e }).ok();
		}
		out
	}
}

impl PartialEq for RangeSet {
	fn eq(&self, other: &RangeSet) -> bool {
		self.ranges().eq(other.ranges())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn set1_merges_overlapping_and_adjacent_ranges() {
		let mut rs = RangeSet::new();
		rs.set1(0, 2);
		rs.set1(3, 5);
		rs.set1(5, 7);
		rs.set1(1, 4);
		assert_eq!(rs.ranges().collect::<Vec<_>>(), vec![(0, 7)]);
	}

	#[test]
	fn set0_splits_and_trims() {
		let mut rs = RangeSet::new();
		rs.set1(0, 10);
		rs.set0(3, 6);
		assert_eq!(rs.ranges().collect::<Vec<_>>(), vec![(0, 3), (6, 10)]);
		assert!(!rs.contains(4));
		assert!(rs.contains(1));
		assert!(rs.contains(8));
	}

	#[test]
	fn allocate_always_takes_first_range_trimmed_to_request() {
		let mut rs = RangeSet::new();
		rs.set1(0, 4);
		rs.set1(10, 20);
		let (start, width) = rs.allocate(4).unwrap();
		assert_eq!((start, width), (0, 4));
		assert!(!rs.contains(0));
		assert_eq!(rs.ranges().collect::<Vec<_>>(), vec![(10, 20)]);

		// Request larger than the first range: allocation is trimmed down
		// to whatever the first range actually holds, not the next range.
		let mut rs2 = RangeSet::new();
		rs2.set1(0, 3);
		rs2.set1(10, 20);
		let (start, width) = rs2.allocate(5).unwrap();
		assert_eq!((start, width), (0, 3));
		assert_eq!(rs2.ranges().collect::<Vec<_>>(), vec![(10, 20)]);
	}

	#[test]
	fn allocate_fully_skips_ranges_too_narrow_to_satisfy_the_request() {
		let mut rs = RangeSet::new();
		rs.set1(0, 3);
		rs.set1(10, 20);
		// The first range (width 3) can't satisfy a request of 5; the
		// second (width 10) can, so allocation lands there.
		let start = rs.allocate_fully(5).unwrap();
		assert_eq!(start, 10);
		assert_eq!(rs.ranges().collect::<Vec<_>>(), vec![(0, 3), (15, 20)]);
	}

	#[test]
	fn allocate_fully_fails_when_no_range_is_wide_enough() {
		let mut rs = RangeSet::new();
		rs.set1(0, 3);
		rs.set1(10, 14);
		assert!(rs.allocate_fully(5).is_none());
		assert_eq!(rs.ranges().collect::<Vec<_>>(), vec![(0, 3), (10, 14)]);
	}

	#[test]
	fn scan_finds_next_range_at_or_after_point() {
		let mut rs = RangeSet::new();
		rs.set1(5, 10);
		rs.set1(20, 30);
		assert_eq!(rs.scan(0), Some((5, 10)));
		assert_eq!(rs.scan(7), Some((7, 10)));
		assert_eq!(rs.scan(15), Some((20, 30)));
		assert_eq!(rs.scan(30), None);
	}

	#[test]
	fn clone_produces_independent_equal_copy() {
		let mut rs = RangeSet::new();
		rs.set1(0, 5);
		rs.set1(10, 15);
		let mut cloned = rs.clone();
		assert_eq!(rs, cloned);
		cloned.set1(5, 10);
		assert_ne!(rs, cloned);
	}
}
