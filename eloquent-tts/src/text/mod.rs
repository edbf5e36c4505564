//! Text preparation: markup rewriting and clause segmentation

pub mod preprocess;
pub mod segmenter;

pub use preprocess::preprocess;
pub use segmenter::{segment, ClauseSpan, PunctuationClass, Segments};
