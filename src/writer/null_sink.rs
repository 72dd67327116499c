// Stock writer: discards every case, only counting them. Used when a
// pipeline stage's side effects (not its output) are what matters, or
// in tests that only care how many cases passed through.

use crate::case::Case;
use crate::casewriter::CaseSink;
use crate::error::Result;
use crate::taint::Taint;

pub struct NullSink {
	count: u64,
	taint: Taint,
}

impl NullSink {
	pub fn new() -> NullSink {
		NullSink { count: 0, taint: Taint::create() }
	}

	pub fn count(&self) -> u64 {
		self.count
	}
}

impl Default for NullSink {
	fn default() -> Self {
		NullSink::new()
	}
}

impl CaseSink for NullSink {
	fn write(&mut self, _case: Case) -> Result<()> {
		self.count += 1;
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
	fn counts_without_retaining_cases() {
		let mut sink = NullSink::new();
		for i in 0..7 {
			sink.write(Case::from_values(vec![Value::numeric(i as f64)])).unwrap();
		}
		assert_eq!(sink.count(), 7);
	}
}
