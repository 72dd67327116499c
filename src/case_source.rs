// Push-model case source boundary (spec.md §6), modeling the
// `count()`/`read(write_case, aux)`/`destroy()` interface a producer
// drives cases *into*, as opposed to `CaseSource`'s pull model. Used to
// adapt callers that already have a push-style data feed (a streaming
// parser, an external iterator driven by someone else's loop) into the
// standard pull-based pipeline.

use crate::case::Case;
use crate::case_window::CaseWindow;
use crate::casereader::{CaseReader, CaseSource};
use crate::error::Result;
use crate::options::Workspace;
use crate::taint::Taint;

/// A case producer driven by pushing, not pulling: the caller hands
/// cases to `push_source_to_reader`, one at a time, rather than being
/// asked for the next one.
pub trait PushCaseSource {
	/// Number of cases this source will produce, if known in advance.
	fn count(&self) -> Option<u64>;

	/// Number of values in each case this source produces.
	fn value_cnt(&self) -> usize;

	/// Produces the next case, or `None` once exhausted.
	fn read(&mut self) -> Result<Option<Case>>;
}

/// Drains a `PushCaseSource` into a standard `CaseReader`, buffering
/// through an internal `CaseWindow` exactly the way `casereader.c`
/// adapts a push-model data source into the casereader vtable.
pub fn push_source_to_reader(mut source: impl PushCaseSource + 'static, workspace: &Workspace) -> Result<CaseReader> {
	// Widths default to numeric (0); a source producing string columns
	// needs a variant of this adapter that also exposes per-column widths.
	let value_cnt = source.value_cnt();
	let mut window = CaseWindow::new(vec![0; value_cnt], workspace);
	while let Some(case) = source.read()? {
		window.push_head(case)?;
	}
	Ok(CaseReader::new(Box::new(WindowAdapter { window, value_cnt })))
}

struct WindowAdapter {
	window: CaseWindow,
	value_cnt: usize,
}

impl CaseSource for WindowAdapter {
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
