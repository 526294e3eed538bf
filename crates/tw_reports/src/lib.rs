//! Weekly aggregation and report rendering.
//!
//! [`Aggregator`] folds a slice of articles into a [`tw_core::WeeklyReport`]
//! with no ambient inputs, so the same corpus and window always produce an
//! identical report. Rendering lives in [`render`] and is equally pure.

pub mod aggregate;
pub mod render;

pub use aggregate::Aggregator;
pub use render::{fallback_narrative, narrative_digest, render_markdown};
