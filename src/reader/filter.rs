// Stock reader: drops cases that fail a predicate (spec.md §4.I),
// grounded in `casereader-filter.c`. Optionally copies excluded cases to
// a side `CaseSink` ("exclude writer" in the C original) and supports a
// one-shot warning fired the first time a case is excluded, via a
// shared flag — the weight-filter and missing-value-filter
// specializations below both build on this.

use crate::case::{Case, Value};
use crate::casereader::{CaseReader, CaseSource};
use crate::casewriter::CaseSink;
use crate::error::Result;
use crate::taint::Taint;
use std::cell::Cell;
use std::rc::Rc;

pub struct Filter {
	source: CaseReader,
	predicate: Box<dyn FnMut(&Case) -> bool>,
	exclude_sink: Option<Box<dyn CaseSink>>,
	on_exclude: Option<Rc<Cell<bool>>>,
	taint: Taint,
}

impl Filter {
	/// Keeps cases for which `predicate` returns `true`.
	pub fn new(source: CaseReader, predicate: impl FnMut(&Case) -> bool + 'static) -> Filter {
		let taint = source.taint().clone_node();
		Filter { source, predicate: Box::new(predicate), exclude_sink: None, on_exclude: None, taint }
	}

	pub fn with_exclude_sink(mut self, sink: Box<dyn CaseSink>) -> Filter {
		self.exclude_sink = Some(sink);
		self
	}

	/// Fires `warn` the first time (and only the first time) a case is
	/// excluded, matching the one-shot warning flag pattern of
	/// `casereader-filter.c`'s weight filter.
	pub fn with_one_shot_warning(mut self, warn: Rc<Cell<bool>>) -> Filter {
		self.on_exclude = Some(warn);
		self
	}
}

impl CaseSource for Filter {
	fn read(&mut self) -> Result<Option<Case>> {
		loop {
			match self.source.read()? {
				None => return Ok(None),
				Some(case) => {
					if (self.predicate)(&case) {
						return Ok(Some(case));
					}
					if let Some(flag) = &self.on_exclude {
						if !flag.get() {
							flag.set(true);
						}
					}
					if let Some(sink) = &mut self.exclude_sink {
						sink.write(case)?;
					}
				}
			}
		}
	}

	fn value_cnt(&self) -> usize {
		self.source.value_cnt()
	}

	fn taint(&self) -> &Taint {
		&self.taint
	}
}

/// Drops cases whose weight variable (spec.md's weighting convention:
/// a designated numeric column) is missing, zero, or negative, per
/// spec.md §9's resolved missing-value precedence: per-class flags on
/// the variable take precedence over a global default.
pub fn weight_filter(source: CaseReader, weight_index: usize, warn_once: Rc<Cell<bool>>) -> Filter {
	Filter::new(source, move |case: &Case| {
		let w = case.num(weight_index);
		!crate::case::is_sysmis(w) && w > 0.0
	})
	.with_one_shot_warning(warn_once)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MissingClass {
	Any,
	User,
	System,
	Never,
}

/// Per-variable missing-value filtering. `classify` maps a column's
/// value to the class of missingness it represents (if any); `include`
/// lists which classes are *kept* for that column (per-variable flags
/// take precedence over any caller-supplied global default, which is
/// simply not consulted once a per-column `include` set is given).
pub fn missing_filter(source: CaseReader, column: usize, is_user_missing: impl Fn(&Value) -> bool + 'static, include: Vec<MissingClass>) -> Filter {
	Filter::new(source, move |case: &Case| {
		let v = case.get(column);
		let class = if v.is_numeric_missing() {
			Some(MissingClass::System)
		} else if is_user_missing(v) {
			Some(MissingClass::User)
		} else {
			None
		};
		match class {
			None => true,
			Some(c) => include.contains(&c) || include.contains(&MissingClass::Any),
		}
	})
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::casereader::VecSource;

	#[test]
	fn keeps_only_cases_matching_predicate() {
		let cases = (0..5).map(|i| Case::from_values(vec![Value::numeric(i as f64)])).collect();
		let reader = CaseReader::new(Box::new(VecSource::new(cases, 1)));
		let filter = Filter::new(reader, |c| c.num(0) >= 2.0);
		let mut reader = CaseReader::new(Box::new(filter));
		let kept: Vec<f64> = reader.read_all().unwrap().iter().map(|c| c.num(0)).collect();
		assert_eq!(kept, vec![2.0, 3.0, 4.0]);
	}

	#[test]
	fn one_shot_warning_fires_exactly_once() {
		let cases = vec![Case::from_values(vec![Value::numeric(-1.0)]), Case::from_values(vec![Value::numeric(-1.0)]), Case::from_values(vec![Value::numeric(1.0)])];
		let reader = CaseReader::new(Box::new(VecSource::new(cases, 1)));
		let warn = Rc::new(Cell::new(false));
		let filter = weight_filter(reader, 0, warn.clone());
		let mut reader = CaseReader::new(Box::new(filter));
		let kept = reader.read_all().unwrap();
		assert_eq!(kept.len(), 1);
		assert!(warn.get());
	}

	#[test]
	fn missing_filter_respects_per_class_include() {
		let cases = vec![Case::from_values(vec![Value::numeric(crate::case::sysmis())]), Case::from_values(vec![Value::numeric(9.0)]), Case::from_values(vec![Value::numeric(1.0)])];
		let reader = CaseReader::new(Box::new(VecSource::new(cases, 1)));
		let filter = missing_filter(reader, 0, |v| v.as_numeric() == 9.0, vec![MissingClass::User]);
		let mut reader = CaseReader::new(Box::new(filter));
		let kept: Vec<f64> = reader.read_all().unwrap().iter().map(|c| c.num(0)).collect();
		assert_eq!(kept, vec![9.0, 1.0]);
	}
}
