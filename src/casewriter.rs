// Casewriter (spec.md §4.I): the push-model write side of the case
// pipeline, the mirror image of `src/casereader.rs`.

use crate::case::Case;
use crate::error::Result;
use crate::taint::Taint;

pub trait CaseSink {
	fn write(&mut self, case: Case) -> Result<()>;
	fn taint(&self) -> &Taint;
	/// Flushes any buffered state. Default no-op; sinks that stage data
	/// (e.g. `src/writer/window_sink.rs`) override this.
	fn close(&mut self) -> Result<()> {
		Ok(())
	}
}

pub struct CaseWriter {
	sink: Box<dyn CaseSink>,
	taint: Taint,
}

impl CaseWriter {
	pub fn new(sink: Box<dyn CaseSink>) -> CaseWriter {
		let taint = sink.taint().clone();
		CaseWriter { sink, taint }
	}

	pub fn taint(&self) -> &Taint {
		&self.taint
	}

	pub fn is_tainted(&self) -> bool {
		self.taint.is_tainted()
	}

	pub fn write(&mut self, case: Case) -> Result<()> {
		self.sink.write(case)
	}

	pub fn close(mut self) -> Result<()> {
		self.sink.close()
	}
}

/// A `CaseSink` that appends to a `Vec<Case>`, for tests and small
/// in-memory pipelines.
pub struct VecSink {
	pub cases: Vec<Case>,
	taint: Taint,
}

impl VecSink {
	pub fn new() -> VecSink {
		VecSink { cases: Vec::new(), taint: Taint::create() }
	}
}

impl Default for VecSink {
	fn default() -> Self {
		VecSink::new()
	}
}

impl CaseSink for VecSink {
	fn write(&mut self, case: Case) -> Result<()> {
		self.cases.push(case);
		Ok(())
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
	fn vec_sink_collects_in_order() {
		let mut w = CaseWriter::new(Box::new(VecSink::new()));
		w.write(Case::from_values(vec![Value::numeric(1.0)])).unwrap();
		w.write(Case::from_values(vec![Value::numeric(2.0)])).unwrap();
		assert!(!w.is_tainted());
	}
}
