pub mod client;
pub mod codec;
pub mod error;

pub use client::JudgeClient;
pub use error::{ClientError, CodecError};
