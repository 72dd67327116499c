// Process-wide configuration, threaded explicitly instead of the global
// `settings_get_workspace_cases()` / `get_workspace()` calls of the C
// original (see SPEC_FULL.md §2).

/// Bytes available for in-memory buffering before a component spills to
/// disk. Used by the sort engine's reservoir sizing and by the datasheet's
/// row cache.
#[derive(Clone, Copy, Debug)]
pub struct Workspace {
	pub bytes: usize,
	/// Minimum number of cases the sort engine's reservoir must hold;
	/// below this the external sort fails outright (spec.md §4.J).
	pub min_buffers: usize,
	/// Default `max_in_core_cases` for a `CaseWindow` when the caller
	/// doesn't specify one explicitly.
	pub default_max_in_core_cases: u64,
}

impl Workspace {
	pub const fn new(bytes: usize) -> Workspace {
		Workspace { bytes, min_buffers: 64, default_max_in_core_cases: 64 }
	}

	/// Number of cases of `value_cnt` slots (plus per-case bookkeeping
	/// overhead) that fit within this workspace. Mirrors
	/// `sort.c: allocate_cases`'s `approx_case_cost` calculation.
	pub fn max_memory_cases(&self, value_cnt: usize) -> usize {
		let approx_case_cost = std::mem::size_of::<f64>() * value_cnt.max(1)
			+ std::mem::size_of::<usize>() * 4
			+ 32;
		(self.bytes / approx_case_cost).max(1)
	}
}

impl Default for Workspace {
	fn default() -> Workspace {
		// 64 MiB, a reasonable default for an embedded analysis engine.
		Workspace::new(64 * 1024 * 1024)
	}
}
