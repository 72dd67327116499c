// Error and Result types shared by every module in the case-processing core.

use std::fmt;

#[derive(Debug)]
pub enum Error {
	Io(std::io::Error),
	/// On-disk or in-memory structure found in an unexpected state.
	Corruption(String),
	/// A recoverable allocation failure, e.g. the sort engine's reservoir
	/// could not reach `min_buffers` within the configured workspace.
	OutOfMemory(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::Io(e) => write!(f, "I/O error: {}", e),
			Error::Corruption(s) => write!(f, "corruption: {}", s),
			Error::OutOfMemory(s) => write!(f, "out of memory: {}", s),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<std::io::Error> for Error {
	fn from(e: std::io::Error) -> Error {
		Error::Io(e)
	}
}
