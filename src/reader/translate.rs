// Stock reader: applies a transform to every case pulled from an
// underlying source (spec.md §4.I), e.g. recoding or computing derived
// variables inline in the pipeline.

use crate::case::Case;
use crate::casereader::{CaseReader, CaseSource};
use crate::error::Result;
use crate::taint::Taint;

pub struct Translate {
	source: CaseReader,
	value_cnt: usize,
	transform: Box<dyn FnMut(Case) -> Case>,
	taint: Taint,
}

impl Translate {
	pub fn new(source: CaseReader, output_value_cnt: usize, transform: impl FnMut(Case) -> Case + 'static) -> Translate {
		let taint = source.taint().clone_node();
		Translate { source, value_cnt: output_value_cnt, transform: Box::new(transform), taint }
	}
}

impl CaseSource for Translate {
	fn read(&mut self) -> Result<Option<Case>> {
		match self.source.read()? {
			Some(case) => Ok(Some((self.transform)(case))),
			None => Ok(None),
		}
	}

	fn value_cnt(&self) -> usize {
		self.value_cnt
	}

	fn taint(&self) -> &Taint {
		&self.taint
	}
}
