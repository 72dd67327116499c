pub mod counter;
pub mod filter;
pub mod translate;
