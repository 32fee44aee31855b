pub mod commands;
pub mod decoder;
pub mod message;
pub mod status;

pub use commands::{Command, SUPPORTED_ACTIONS};
pub use decoder::{DecoderState, FrameDecoder};
pub use message::StatusMessage;
pub use status::StatusSnapshot;
