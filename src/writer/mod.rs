pub mod null_sink;
pub mod window_sink;
