pub mod index;
pub mod resolver;

pub use index::{MatcherConfig, OffsetIndex, OffsetMatcher, TolerantMatcher, WordSpan};
pub use resolver::resolve_timestamps;
