// Read-only boundary traits toward the variable/dictionary layer that
// owns metadata (names, labels, measurement levels) outside this crate's
// scope (spec.md §1 Non-goals). Case-processing code only ever needs a
// variable's width, its slot index into a `Case`, and how to classify a
// value as missing for it, so that's all `VariableLike` exposes.

use crate::case::Value;
use crate::reader::filter::MissingClass;

/// A single variable as seen by the case-processing core. No concrete
/// implementation lives in this crate; callers adapt their own
/// dictionary's variable type to this trait.
pub trait VariableLike {
	/// 0 for numeric, >0 for a string of that many bytes, matching the
	/// `Case`/`Value` width convention used throughout this crate.
	fn width(&self) -> i32;

	/// Index of this variable's value within a `Case`.
	fn case_index(&self) -> usize;

	/// Classifies `value` for this variable, or `None` if it isn't
	/// missing. System-missing is intrinsic to the value itself;
	/// user-missing depends on the variable's configured missing-value
	/// set, which this trait delegates to the implementor.
	fn classify_missing(&self, value: &Value) -> Option<MissingClass>;
}

/// Read-only view over an ordered collection of variables, enough for
/// case-processing stages that need to resolve a variable by name or
/// iterate in dictionary order.
pub trait Dictionary {
	type Variable: VariableLike;

	fn variable_cnt(&self) -> usize;
	fn variable(&self, index: usize) -> &Self::Variable;
	fn variable_by_name(&self, name: &str) -> Option<&Self::Variable>;

	/// Number of slots a `Case` drawn from this dictionary must have.
	fn value_cnt(&self) -> usize;
}
