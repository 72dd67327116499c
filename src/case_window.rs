// Case Window (spec.md §4.C): a FIFO queue of cases that starts in
// memory (`src/deque.rs`'s `Deque<Case>`, the teacher's `Deque` idiom)
// and rotates to an on-disk `src/case_tempfile.rs` once it grows past
// the workspace's memory budget, following `casewindow_to_disk`'s
// drain-and-swap algorithm from `casewindow.c`.

use crate::case::Case;
use crate::case_tempfile::CaseTempfile;
use crate::deque::Deque;
use crate::error::Result;
use crate::options::Workspace;
use crate::taint::Taint;

enum Storage {
	Memory(Deque<Case>),
	Disk { tempfile: CaseTempfile, tail_row: u64, head_row: u64 },
}

pub struct CaseWindow {
	storage: Storage,
	widths: Vec<i32>,
	max_memory_cases: u64,
	taint: Taint,
}

impl CaseWindow {
	pub fn new(widths: Vec<i32>, workspace: &Workspace) -> CaseWindow {
		let max_memory_cases = workspace.max_memory_cases(widths.len()) as u64;
		CaseWindow { storage: Storage::Memory(Deque::new()), widths, max_memory_cases: max_memory_cases.max(1), taint: Taint::create() }
	}

	pub fn taint(&self) -> &Taint {
		&self.taint
	}

	pub fn case_cnt(&self) -> u64 {
		match &self.storage {
			Storage::Memory(d) => d.len() as u64,
			Storage::Disk { head_row, tail_row, .. } => head_row - tail_row,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.case_cnt() == 0
	}

	fn rotate_to_disk(&mut self) -> Result<()> {
		let placeholder = Storage::Memory(Deque::new());
		let old = std::mem::replace(&mut self.storage, placeholder);
		if let Storage::Memory(mut d) = old {
			let mut tempfile = CaseTempfile::new(self.widths.clone(), self.taint.clone())?;
			let mut row = 0u64;
			while let Some(c) = d.pop_front() {
				tempfile.put(row, &c)?;
				row += 1;
			}
			log::debug!(target: "caseproc", "case window rotated {} cases to disk", row);
			self.storage = Storage::Disk { tempfile, tail_row: 0, head_row: row };
		} else {
			self.storage = old;
		}
		Ok(())
	}

	/// Appends `case` as the newest element.
	pub fn push_head(&mut self, case: Case) -> Result<()> {
		match &mut self.storage {
			Storage::Memory(d) => {
				d.push_back(case);
				if d.len() as u64 > self.max_memory_cases {
					self.rotate_to_disk()?;
				}
			}
			Storage::Disk { tempfile, head_row, .. } => {
				tempfile.put(*head_row, &case)?;
				*head_row += 1;
			}
		}
		Ok(())
	}

	/// Removes and returns the oldest element, if any.
	pub fn pop_tail(&mut self) -> Result<Option<Case>> {
		match &mut self.storage {
			Storage::Memory(d) => Ok(d.pop_front()),
			Storage::Disk { tempfile, tail_row, head_row } => {
				if *tail_row >= *head_row {
					return Ok(None);
				}
				let case = tempfile.get(*tail_row)?;
				*tail_row += 1;
				Ok(Some(case))
			}
		}
	}

	/// Peeks the case `idx` slots from the tail (0 = oldest). Panics if
	/// `idx` is out of range, per spec.md §9's resolution of the
	/// `casewindow_get_case` out-of-range question (a caller protocol
	/// error, matching the C original's own `assert`).
	pub fn get_case(&self, idx: u64) -> Result<Case> {
		assert!(idx < self.case_cnt(), "case window get_case index out of range");
		match &self.storage {
			Storage::Memory(d) => Ok(d.get(idx as usize).unwrap().clone()),
			Storage::Disk { tempfile, tail_row, .. } => tempfile.get(tail_row + idx),
		}
	}
}
