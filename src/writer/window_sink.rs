// Stock writer: collects cases into a `src/case_window.rs`, then hands
// back a `CaseSource` over the same data — the standard way a pipeline
// stage materializes its output for a later pass (spec.md §4.I).

use crate::case::Case;
use crate::case_window::CaseWindow;
use crate::casereader::CaseSource;
use crate::casewriter::CaseSink;
use crate::error::Result;
use crate::options::Workspace;
use crate::taint::Taint;

pub struct WindowSink {
	window: CaseWindow,
	value_cnt: usize,
}

impl WindowSink {
	pub fn new(widths: Vec<i32>, workspace: &Workspace) -> WindowSink {
		let value_cnt = widths.len();
		WindowSink { window: CaseWindow::new(widths, workspace), value_cnt }
	}

	/// Consumes the sink and returns a `CaseSource` that reads back
	/// everything written, oldest first.
	pub fn into_source(self) -> WindowSource {
		WindowSource { window: self.window, value_cnt: self.value_cnt }
	}
}

impl CaseSink for WindowSink {
	fn write(&mut self, case: Case) -> Result<()> {
		self.window.push_head(case)
	}

	fn taint(&self) -> &Taint {
		self.window.taint()
	}
}

pub struct WindowSource {
	window: CaseWindow,
	value_cnt: usize,
}

impl CaseSource for WindowSource {
	fn read(&mut self) -> Result<Option<Case>> {
		self.window.pop_tail()
	}

	fn value_cnt(&self) -> usize {
		self.value_cnt
	}

	fn taint(&self) -> &Taint {
		self.window.taint()
	}
}
