mod decode_impl;
pub mod decoder_thread;
pub mod handler;
pub mod processor;
pub mod progress;

pub use decode_impl::cmd_decode;
