pub mod entity;
pub mod redaction;
pub mod transcript;
pub mod whisper;

pub use entity::*;
pub use redaction::*;
pub use transcript::*;
pub use whisper::*;
