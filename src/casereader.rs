// Casereader (spec.md §4.I): the pull-model read side of the case
// pipeline. The C original's `casereader_class` vtable becomes an
// object-safe `CaseSource` trait per spec.md §9; `CaseReader` is the
// taint-owning handle callers hold, mirroring the casereader/
// underlying-reader split of the C original.

use crate::case::Case;
use crate::error::Result;
use crate::taint::Taint;

/// The pull-model source a `CaseReader` pulls from. Implemented by each
/// stock reader (`src/reader/*.rs`) and by adapters such as
/// `src/case_source.rs`'s push-to-pull bridge.
pub trait CaseSource {
	/// Returns the next case, or `None` at end of stream.
	fn read(&mut self) -> Result<Option<Case>>;
	/// Number of values in each case this source produces.
	fn value_cnt(&self) -> usize;
	fn taint(&self) -> &Taint;
}

/// The handle callers hold. Wraps a boxed `CaseSource`, exposing a
/// single-case lookahead buffer for `peek`.
pub struct CaseReader {
	source: Box<dyn CaseSource>,
	taint: Taint,
	lookahead: Option<Case>,
}

impl CaseReader {
	pub fn new(source: Box<dyn CaseSource>) -> CaseReader {
		let taint = source.taint().clone();
		CaseReader { source, taint, lookahead: None }
	}

	pub fn value_cnt(&self) -> usize {
		self.source.value_cnt()
	}

	pub fn taint(&self) -> &Taint {
		&self.taint
	}

	pub fn is_tainted(&self) -> bool {
		self.taint.is_tainted()
	}

	pub fn read(&mut self) -> Result<Option<Case>> {
		if let Some(case) = self.lookahead.take() {
			return Ok(Some(case));
		}
		self.source.read()
	}

	/// Returns the next case without consuming it.
	pub fn peek(&mut self) -> Result<Option<&Case>> {
		if self.lookahead.is_none() {
			self.lookahead = self.source.read()?;
		}
		Ok(self.lookahead.as_ref())
	}

	/// Drains every remaining case into a `Vec`, in order.
	pub fn read_all(mut self) -> Result<Vec<Case>> {
		let mut out = Vec::new();
		while let Some(case) = self.read()? {
			out.push(case);
		}
		Ok(out)
	}

	/// Produces an independent cursor over the cases remaining in this
	/// reader, leaving `self` itself still readable from the same point.
	/// The underlying source can only be pulled from once, so both
	/// cursors are materialized through a buffer of the drained cases —
	/// the documented fallback for readers with no cheaper clone
	/// (spec.md §4.I's optional `clone` operation). The clone's taint
	/// node is a propagation target of `self`'s, so tainting `self`
	/// later still taints the clone (and anything built on top of it).
	pub fn clone_reader(&mut self) -> Result<CaseReader> {
		let value_cnt = self.value_cnt();
		let mut cases = Vec::new();
		if let Some(case) = self.lookahead.take() {
			cases.push(case);
		}
		while let Some(case) = self.source.read()? {
			cases.push(case);
		}
		let other_taint = self.taint.clone_node();
		self.source = Box::new(ClonedSource { cases: cases.clone().into_iter(), value_cnt, taint: self.taint.clone() });
		Ok(CaseReader::new(Box::new(ClonedSource { cases: cases.into_iter(), value_cnt, taint: other_taint })))
	}
}

/// A `CaseSource` over a materialized buffer of cases with a taint node
/// supplied by the caller, rather than a fresh one — used by
/// `CaseReader::clone_reader` so both resulting cursors stay wired into
/// the original reader's taint propagation.
struct ClonedSource {
	cases: std::vec::IntoIter<Case>,
	value_cnt: usize,
	taint: Taint,
}

impl CaseSource for ClonedSource {
	fn read(&mut self) -> Result<Option<Case>> {
		Ok(self.cases.next())
	}

	fn value_cnt(&self) -> usize {
		self.value_cnt
	}

	fn taint(&self) -> &Taint {
		&self.taint
	}
}

/// A `CaseSource` over an already-materialized `Vec<Case>`, used to hand
/// back in-memory sort results and in tests.
pub struct VecSource {
	cases: std::vec::IntoIter<Case>,
	value_cnt: usize,
	taint: Taint,
}

impl VecSource {
	pub fn new(cases: Vec<Case>, value_cnt: usize) -> VecSource {
		VecSource { cases: cases.into_iter(), value_cnt, taint: Taint::create() }
	}
}

impl CaseSource for VecSource {
	fn read(&mut self) -> Result<Option<Case>> {
		Ok(self.cases.next())
	}

	fn value_cnt(&self) -> usize {
		self.value_cnt
	}

	fn taint(&self) -> &Taint {
		&self.taint
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::case::Value;

	#[test]
	fn peek_does_not_consume() {
		let cases = vec![Case::from_values(vec![Value::numeric(1.0)]), Case::from_values(vec![Value::numeric(2.0)])];
		let mut r = CaseReader::new(Box::new(VecSource::new(cases, 1)));
		assert_eq!(r.peek().unwrap().unwrap().num(0), 1.0);
		assert_eq!(r.read().unwrap().unwrap().num(0), 1.0);
		assert_eq!(r.read().unwrap().unwrap().num(0), 2.0);
		assert!(r.read().unwrap().is_none());
	}

	#[test]
	fn read_all_drains_in_order() {
		let cases = vec![Case::from_values(vec![Value::numeric(1.0)]), Case::from_values(vec![Value::numeric(2.0)]), Case::from_values(vec![Value::numeric(3.0)])];
		let r = CaseReader::new(Box::new(VecSource::new(cases, 1)));
		let all = r.read_all().unwrap();
		assert_eq!(all.iter().map(|c| c.num(0)).collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
	}

	#[test]
	fn clone_reader_yields_independent_cursor_over_same_remaining_cases() {
		let cases = vec![Case::from_values(vec![Value::numeric(1.0)]), Case::from_values(vec![Value::numeric(2.0)])];
		let mut r1 = CaseReader::new(Box::new(VecSource::new(cases, 1)));
		let r2 = r1.clone_reader().unwrap();
		let out1: Vec<f64> = r1.read_all().unwrap().iter().map(|c| c.num(0)).collect();
		let out2: Vec<f64> = r2.read_all().unwrap().iter().map(|c| c.num(0)).collect();
		assert_eq!(out1, vec![1.0, 2.0]);
		assert_eq!(out2, vec![1.0, 2.0]);
	}

	#[test]
	fn s6_taint_propagates_from_original_through_clone_and_filter() {
		use crate::reader::filter::Filter;

		let cases = vec![Case::from_values(vec![Value::numeric(1.0)]), Case::from_values(vec![Value::numeric(2.0)])];
		let mut r1 = CaseReader::new(Box::new(VecSource::new(cases, 1)));
		let r2 = r1.clone_reader().unwrap();
		let r2_taint = r2.taint().clone();
		let r3 = CaseReader::new(Box::new(Filter::new(r2, |_| true)));

		assert!(!r1.is_tainted());
		assert!(!r2_taint.is_tainted());
		assert!(!r3.is_tainted());

		r1.taint().set();

		assert!(r1.is_tainted());
		assert!(r2_taint.is_tainted());
		assert!(r3.is_tainted());
	}
}
