// Diagnostic reporting boundary (spec.md §6), grounded in
// `src/message.c`'s `msg()` severity classes and error-count tracking
// from original_source. No concrete reporter that prints or formats is
// provided here; callers wire `DiagnosticReporter` to whatever logging
// or UI layer they have.

/// Severity classes, named directly after `src/message.c`'s `MSG_CLASS`
/// enumerators: syntax error/warning, semantic error/warning, and the
/// two "this ran out of resources partway through" classes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Severity {
	/// Syntax error: the input could not be parsed at all.
	SE,
	/// Syntax warning.
	SW,
	/// Syntax-level "this message terminates the run" class.
	SM,
	/// Semantic/runtime error.
	ME,
	/// Semantic/runtime warning.
	MW,
	/// Semantic-level "this message terminates the run" class.
	MM,
}

impl Severity {
	/// Whether this class counts toward the "abort past configured cap"
	/// policy's error tally, as opposed to its warning tally.
	pub fn is_error(self) -> bool {
		matches!(self, Severity::SE | Severity::ME | Severity::SM | Severity::MM)
	}
}

/// Receives diagnostics produced while processing cases. Implementors
/// decide how (or whether) to surface `report` calls; this crate only
/// needs somewhere to send them.
pub trait DiagnosticReporter {
	fn report(&mut self, severity: Severity, text: &str);
}

/// Default `DiagnosticReporter` that just counts errors and warnings,
/// mirroring `msg()`'s running `error_count`/`warning_count` used to
/// decide when a run should abort.
#[derive(Default)]
pub struct CountingReporter {
	error_count: u64,
	warning_count: u64,
}

impl CountingReporter {
	pub fn new() -> CountingReporter {
		CountingReporter::default()
	}

	pub fn error_count(&self) -> u64 {
		self.error_count
	}

	pub fn warning_count(&self) -> u64 {
		self.warning_count
	}
}

impl DiagnosticReporter for CountingReporter {
	fn report(&mut self, severity: Severity, text: &str) {
		if severity.is_error() {
			self.error_count += 1;
		} else {
			self.warning_count += 1;
		}
		log::debug!(target: "caseproc", "{:?}: {}", severity, text);
	}
}
