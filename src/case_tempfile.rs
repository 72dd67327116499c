// Case Tempfile (spec.md §4.B): fixed-width random-access on-disk case
// storage, backing the disk half of `src/case_window.rs` and
// `src/datasheet.rs`. Grounded in the teacher's `ValueTable`
// (`table.rs`): `read_at`/`write_at` via `FileExt` on Unix, `seek_read`/
// `seek_write` on Windows, and grow-by-`set_len` on overflow.
//
// Each record is a flat concatenation of per-column slots: a numeric
// column (`width <= 0`, the PSPP convention for "not a string") is 8
// bytes of `f64::to_le_bytes`; a string column of declared byte `width`
// is that many raw bytes, already padded by the caller (spec.md's
// "no structural metadata" — the tempfile itself only knows the layout
// it was constructed with).

use crate::case::{Case, Value};
use crate::error::Result;
use crate::taint::Taint;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(unix)]
use std::os::unix::fs::FileExt;

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique_path() -> PathBuf {
	let n = COUNTER.fetch_add(1, Ordering::Relaxed);
	let mut p = std::env::temp_dir();
	p.push(format!("caseproc-case-tmpfile-{}-{}", std::process::id(), n));
	p
}

pub struct CaseTempfile {
	file: File,
	path: PathBuf,
	/// Per-column width: `<= 0` for numeric, else a string byte width.
	widths: Vec<i32>,
	record_size: u64,
	case_cnt: u64,
	taint: Taint,
}

impl CaseTempfile {
	pub fn new(widths: Vec<i32>, taint: Taint) -> Result<CaseTempfile> {
		let record_size: u64 = widths.iter().map(|&w| if w <= 0 { 8 } else { w as u64 }).sum();
		let path = unique_path();
		let file = OpenOptions::new().read(true).write(true).create(true).truncate(true).open(&path)?;
		Ok(CaseTempfile { file, path, widths, record_size, case_cnt: 0, taint })
	}

	pub fn case_cnt(&self) -> u64 {
		self.case_cnt
	}

	pub fn record_size(&self) -> u64 {
		self.record_size
	}

	pub fn column_cnt(&self) -> usize {
		self.widths.len()
	}

	fn grow(&mut self, new_case_cnt: u64) -> Result<()> {
		if new_case_cnt > self.case_cnt {
			if let Err(e) = self.file.set_len(new_case_cnt * self.record_size) {
				self.taint.set();
				return Err(e.into());
			}
			self.case_cnt = new_case_cnt;
		}
		Ok(())
	}

	#[cfg(unix)]
	fn pread(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
		self.file.read_exact_at(buf, offset)
	}

	#[cfg(unix)]
	fn pwrite(&self, buf: &[u8], offset: u64) -> io::Result<()> {
		self.file.write_all_at(buf, offset)
	}

	#[cfg(windows)]
	fn pread(&self, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
		use std::os::windows::fs::FileExt;
		while !buf.is_empty() {
			match self.file.seek_read(buf, offset) {
				Ok(0) => return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short read of case tempfile")),
				Ok(n) => {
					buf = &mut buf[n..];
					offset += n as u64;
				}
				Err(e) => return Err(e),
			}
		}
		Ok(())
	}

	#[cfg(windows)]
	fn pwrite(&self, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
		use std::os::windows::fs::FileExt;
		while !buf.is_empty() {
			let n = self.file.seek_write(buf, offset)?;
			buf = &buf[n..];
			offset += n as u64;
		}
		Ok(())
	}

	fn column_offset(&self, col: usize) -> u64 {
		self.widths[..col].iter().map(|&w| if w <= 0 { 8 } else { w as u64 }).sum()
	}

	fn encode_value(buf: &mut Vec<u8>, value: &Value, width: i32) {
		if width <= 0 {
			buf.extend_from_slice(&value.as_numeric().to_le_bytes());
		} else {
			let bytes = value.as_bytes();
			let w = width as usize;
			let take = bytes.len().min(w);
			buf.extend_from_slice(&bytes[..take]);
			buf.extend(std::iter::repeat(b' ').take(w - take));
		}
	}

	fn encode(&self, case: &Case) -> Vec<u8> {
		let mut buf = Vec::with_capacity(self.record_size as usize);
		for (i, &w) in self.widths.iter().enumerate() {
			Self::encode_value(&mut buf, case.get(i), w);
		}
		buf
	}

	fn decode(&self, buf: &[u8]) -> Case {
		let mut values = Vec::with_capacity(self.widths.len());
		let mut pos = 0usize;
		for &w in &self.widths {
			if w <= 0 {
				let mut bytes = [0u8; 8];
				bytes.copy_from_slice(&buf[pos..pos + 8]);
				values.push(Value::numeric(f64::from_le_bytes(bytes)));
				pos += 8;
			} else {
				let w = w as usize;
				values.push(Value::string(&buf[pos..pos + w], w));
				pos += w;
			}
		}
		Case::from_values(values)
	}

	/// Writes `case` to `row`, growing the file if `row` is past the
	/// current end.
	pub fn put(&mut self, row: u64, case: &Case) -> Result<()> {
		if row >= self.case_cnt {
			self.grow(row + 1)?;
		}
		let buf = self.encode(case);
		let offset = row * self.record_size;
		if let Err(e) = self.pwrite(&buf, offset) {
			self.taint.set();
			return Err(e.into());
		}
		Ok(())
	}

	/// Writes only `vals` into the column range `[start_col, start_col +
	/// vals.len())` of `row`, leaving the rest of the row's existing bytes
	/// untouched. Grows the file if `row` is past the current end.
	pub fn put_values(&mut self, row: u64, start_col: usize, vals: &[Value]) -> Result<()> {
		if row >= self.case_cnt {
			self.grow(row + 1)?;
		}
		let mut buf = Vec::new();
		for (i, v) in vals.iter().enumerate() {
			Self::encode_value(&mut buf, v, self.widths[start_col + i]);
		}
		let offset = row * self.record_size + self.column_offset(start_col);
		if let Err(e) = self.pwrite(&buf, offset) {
			self.taint.set();
			return Err(e.into());
		}
		Ok(())
	}

	pub fn taint(&self) -> &Taint {
		&self.taint
	}

	/// Reads the case at `row`. Panics if `row` is out of range — a
	/// caller protocol error per spec.md §7.
	pub fn get(&self, row: u64) -> Result<Case> {
		assert!(row < self.case_cnt, "case tempfile read out of range");
		let mut buf = vec![0u8; self.record_size as usize];
		if let Err(e) = self.pread(&mut buf, row * self.record_size) {
			self.taint.set();
			return Err(e.into());
		}
		Ok(self.decode(&buf))
	}
}

impl Drop for CaseTempfile {
	fn drop(&mut self) {
		let _ = std::fs::remove_file(&self.path);
	}
}
