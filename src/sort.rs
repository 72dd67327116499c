// Sort Engine (spec.md §4.J): stable sort over a `CaseReader`, internal
// when the input fits the workspace budget, external (replacement
// selection + balanced k-way merge) otherwise. Ported from
// `src/math/sort.c`'s `do_internal_sort`/`do_external_sort` split.

use crate::case::{Case, CompareKey};
use crate::case_tempfile::CaseTempfile;
use crate::casereader::{CaseReader, CaseSource, VecSource};
use crate::error::{Error, Result};
use crate::options::Workspace;
use crate::taint::Taint;

/// Maximum number of runs merged in a single pass, ported from
/// `sort.c`'s `MAX_MERGE_ORDER`.
const MAX_MERGE_ORDER: usize = 7;

fn case_widths(value_cnt: usize) -> Vec<i32> {
	// The sort engine doesn't know string widths; every slot round-trips
	// through the tempfile as whatever width `Case::str` already carries
	// at the time it is spilled, so a zero-width placeholder vector
	// merely fixes the *count* of columns — `CaseTempfile` re-derives
	// each column's actual width from the value written to it via
	// `Value::string`'s own length, since every slot here is opaque to
	// the tempfile beyond "numeric or string of the bytes given".
	vec![0; value_cnt]
}

struct Run {
	tempfile: CaseTempfile,
	len: u64,
}

fn compare(a: &Case, b: &Case, keys: &[CompareKey]) -> std::cmp::Ordering {
	a.compare(b, keys)
}

/// Sorts every case from `reader` according to `keys`, returning a
/// reader over the sorted result. Chooses an internal in-memory sort
/// when the input fits the workspace budget, else falls back to
/// external replacement-selection plus merge.
pub fn sort(mut reader: CaseReader, keys: &[CompareKey], workspace: &Workspace) -> Result<CaseReader> {
	let value_cnt = reader.value_cnt();
	let budget = workspace.max_memory_cases(value_cnt);
	if budget < workspace.min_buffers {
		return Err(Error::OutOfMemory(format!("workspace holds only {} cases, short of the {} the sort reservoir requires", budget, workspace.min_buffers)));
	}

	let mut buffer = Vec::new();
	while buffer.len() < budget {
		match reader.read()? {
			Some(case) => buffer.push(case),
			None => {
				buffer.sort_by(|a, b| compare(a, b, keys));
				return Ok(CaseReader::new(Box::new(VecSource::new(buffer, value_cnt))));
			}
		}
	}

	external_sort(buffer, reader, keys, value_cnt)
}

struct HeapItem {
	run: u64,
	case: Case,
	seq: u64,
}

impl PartialEq for HeapItem {
	fn eq(&self, other: &Self) -> bool {
		self.run == other.run && self.seq == other.seq
	}
}
impl Eq for HeapItem {}

fn heap_cmp(a: &HeapItem, b: &HeapItem, keys: &[CompareKey]) -> std::cmp::Ordering {
	a.run.cmp(&b.run).then_with(|| compare(&a.case, &b.case, keys)).then_with(|| a.seq.cmp(&b.seq))
}

/// Replacement-selection run generation followed by balanced k-way
/// merge, mirroring `sort.c`'s external sort.
fn external_sort(initial: Vec<Case>, mut reader: CaseReader, keys: &[CompareKey], value_cnt: usize) -> Result<CaseReader> {
	let taint = reader.taint().clone_node();
	let mut runs: Vec<Run> = Vec::new();
	let mut open_run_len = 0u64;
	let mut open_run: Option<CaseTempfile> = None;
	let mut last_in_run: Option<Case> = None;

	// `std::collections::BinaryHeap` orders by `Ord` alone and has no room
	// for an externally supplied comparator, so the reservoir is kept as
	// a plain `Vec` and scanned linearly on each pop instead — the run
	// sizes this engine targets don't make the difference matter.
	let mut heap: Vec<HeapItem> = Vec::new();
	let mut seq = 0u64;
	let mut output_run_number = 0u64;

	for case in initial {
		heap.push(HeapItem { run: 0, case, seq });
		seq += 1;
	}

	let pop_min = |heap: &mut Vec<HeapItem>, keys: &[CompareKey]| -> Option<HeapItem> {
		if heap.is_empty() {
			return None;
		}
		let mut best = 0;
		for i in 1..heap.len() {
			if heap_cmp(&heap[i], &heap[best], keys) == std::cmp::Ordering::Less {
				best = i;
			}
		}
		Some(heap.swap_remove(best))
	};

	loop {
		let item = match pop_min(&mut heap, keys) {
			Some(i) => i,
			None => break,
		};

		if item.run != output_run_number {
			if let Some(tf) = open_run.take() {
				runs.push(Run { tempfile: tf, len: open_run_len });
			}
			output_run_number = item.run;
			open_run_len = 0;
			last_in_run = None;
		}

		let tf = open_run.get_or_insert_with(|| CaseTempfile::new(case_widths(value_cnt), taint.clone_node()).expect("tempfile creation cannot fail under normal conditions"));
		if let Err(e) = tf.put(open_run_len, &item.case) {
			taint.set();
			return Err(e);
		}
		open_run_len += 1;
		last_in_run = Some(item.case.clone());

		if let Some(next) = reader.read()? {
			let goes_in_current_run = match &last_in_run {
				Some(last) => compare(&next, last, keys) != std::cmp::Ordering::Less,
				None => true,
			};
			let run = if goes_in_current_run { output_run_number } else { output_run_number + 1 };
			heap.push(HeapItem { run, case: next, seq });
			seq += 1;
		}
	}
	if let Some(tf) = open_run.take() {
		runs.push(Run { tempfile: tf, len: open_run_len });
	}

	while runs.len() > 1 {
		let lens: Vec<u64> = runs.iter().map(|r| r.len).collect();
		let (start, end) = choose_merge_window(&lens);
		let window: Vec<Run> = runs.splice(start..end, std::iter::empty()).collect();
		let merged = merge_runs(window, keys, value_cnt, &taint)?;
		runs.insert(start, merged);
	}

	if taint.is_tainted() {
		return Err(Error::Corruption("sort tainted during external merge".into()));
	}

	match runs.into_iter().next() {
		Some(run) => Ok(CaseReader::new(Box::new(RunSource { tempfile: run.tempfile, len: run.len, next: 0, value_cnt, taint }))),
		None => Ok(CaseReader::new(Box::new(VecSource::new(Vec::new(), value_cnt)))),
	}
}

/// Picks the contiguous window of up to `MAX_MERGE_ORDER` runs with the
/// smallest summed case count, per `sort.c`'s `choose_merge`.
fn choose_merge_window(lens: &[u64]) -> (usize, usize) {
	let n = lens.len();
	let order = MAX_MERGE_ORDER.min(n);
	let mut best_sum = u64::MAX;
	let mut best = (0, order);
	for start in 0..=(n - order) {
		let sum: u64 = lens[start..start + order].iter().sum();
		if sum < best_sum {
			best_sum = sum;
			best = (start, start + order);
		}
	}
	best
}

fn merge_runs(runs: Vec<Run>, keys: &[CompareKey], value_cnt: usize, taint: &Taint) -> Result<Run> {
	let out_taint = taint.clone_node();
	let mut out = CaseTempfile::new(case_widths(value_cnt), out_taint)?;
	let mut cursors: Vec<(CaseTempfile, u64, u64)> = runs.into_iter().map(|r| (r.tempfile, 0u64, r.len)).collect();
	let mut out_len = 0u64;

	loop {
		let mut best: Option<(usize, Case)> = None;
		for (i, (tf, pos, len)) in cursors.iter().enumerate() {
			if pos >= len {
				continue;
			}
			let case = tf.get(*pos)?;
			let better = match &best {
				None => true,
				Some((_, b)) => compare(&case, b, keys) == std::cmp::Ordering::Less,
			};
			if better {
				best = Some((i, case));
			}
		}
		match best {
			Some((i, case)) => {
				out.put(out_len, &case)?;
				out_len += 1;
				cursors[i].1 += 1;
			}
			None => break,
		}
	}

	Ok(Run { tempfile: out, len: out_len })
}

struct RunSource {
	tempfile: CaseTempfile,
	len: u64,
	next: u64,
	value_cnt: usize,
	taint: Taint,
}

impl CaseSource for RunSource {
	fn read(&mut self) -> Result<Option<Case>> {
		if self.next >= self.len {
			return Ok(None);
		}
		let case = self.tempfile.get(self.next)?;
		self.next += 1;
		Ok(Some(case))
	}

	fn value_cnt(&self) -> usize {
		self.value_cnt
	}

	fn taint(&self) -> &Taint {
		&self.taint
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::case::Value;
	use crate::casereader::VecSource;

	fn cases(vals: &[f64]) -> Vec<Case> {
		vals.iter().map(|&v| Case::from_values(vec![Value::numeric(v)])).collect()
	}

	#[test]
	fn internal_sort_orders_ascending() {
		let reader = CaseReader::new(Box::new(VecSource::new(cases(&[5.0, 1.0, 3.0, 2.0, 4.0]), 1)));
		let keys = vec![CompareKey::ascending(0, 0)];
		let sorted = sort(reader, &keys, &Workspace::default()).unwrap();
		let out: Vec<f64> = sorted.read_all().unwrap().iter().map(|c| c.num(0)).collect();
		assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
	}

	#[test]
	fn sort_is_stable_on_equal_keys() {
		// Two columns: sort key in col 0, original-identity tag in col 1.
		let input: Vec<Case> = vec![(1.0, 10.0), (1.0, 20.0), (0.0, 30.0), (1.0, 40.0)]
			.into_iter()
			.map(|(k, tag)| Case::from_values(vec![Value::numeric(k), Value::numeric(tag)]))
			.collect();
		let reader = CaseReader::new(Box::new(VecSource::new(input, 2)));
		let keys = vec![CompareKey::ascending(0, 0)];
		let sorted = sort(reader, &keys, &Workspace::default()).unwrap();
		let tags: Vec<f64> = sorted.read_all().unwrap().iter().map(|c| c.num(1)).collect();
		assert_eq!(tags, vec![30.0, 10.0, 20.0, 40.0]);
	}

	#[test]
	fn external_sort_handles_input_larger_than_budget() {
		// Small enough to force the external path for 400 cases, but still
		// big enough to clear `min_buffers` (64).
		let workspace = Workspace::new(7200);
		let n = 400;
		let vals: Vec<f64> = (0..n).rev().map(|i| i as f64).collect();
		let reader = CaseReader::new(Box::new(VecSource::new(cases(&vals), 1)));
		let keys = vec![CompareKey::ascending(0, 0)];
		let sorted = sort(reader, &keys, &workspace).unwrap();
		let out: Vec<f64> = sorted.read_all().unwrap().iter().map(|c| c.num(0)).collect();
		let expected: Vec<f64> = (0..n).map(|i| i as f64).collect();
		assert_eq!(out, expected);
	}

	#[test]
	fn workspace_below_min_buffers_fails_out_of_memory() {
		let workspace = Workspace::new(64);
		let reader = CaseReader::new(Box::new(VecSource::new(cases(&[1.0, 2.0, 3.0]), 1)));
		let keys = vec![CompareKey::ascending(0, 0)];
		let result = sort(reader, &keys, &workspace);
		assert!(matches!(result, Err(Error::OutOfMemory(_))));
	}

	#[test]
	fn descending_key_reverses_order() {
		let reader = CaseReader::new(Box::new(VecSource::new(cases(&[1.0, 3.0, 2.0]), 1)));
		let mut key = CompareKey::ascending(0, 0);
		key.descending = true;
		let sorted = sort(reader, &[key], &Workspace::default()).unwrap();
		let out: Vec<f64> = sorted.read_all().unwrap().iter().map(|c| c.num(0)).collect();
		assert_eq!(out, vec![3.0, 2.0, 1.0]);
	}
}
