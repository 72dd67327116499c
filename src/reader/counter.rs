// Stock reader: forwards every case unchanged; its side effect is
// advancing a caller-supplied shared counter once per case read
// (spec.md §4.I), the same shared-handle shape `Filter`'s one-shot
// warning flag uses.

use crate::case::Case;
use crate::casereader::{CaseReader, CaseSource};
use crate::error::Result;
use crate::taint::Taint;
use std::cell::Cell;
use std::rc::Rc;

pub struct Counter {
	source: CaseReader,
	count: Rc<Cell<u64>>,
	taint: Taint,
}

impl Counter {
	pub fn new(source: CaseReader, count: Rc<Cell<u64>>) -> Counter {
		let taint = source.taint().clone_node();
		Counter { source, count, taint }
	}
}

impl CaseSource for Counter {
	fn read(&mut self) -> Result<Option<Case>> {
		match self.source.read()? {
			Some(case) => {
				self.count.set(self.count.get() + 1);
				Ok(Some(case))
			}
			None => Ok(None),
		}
	}

	fn value_cnt(&self) -> usize {
		self.source.value_cnt()
	}

	fn taint(&self) -> &Taint {
		&self.taint
	}
}
