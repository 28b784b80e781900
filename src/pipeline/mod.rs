pub mod filter;
pub mod redactor;

pub use filter::{filter_entities, validate_filter};
pub use redactor::{AudioRedactor, CancelToken, RedactionConfig};
