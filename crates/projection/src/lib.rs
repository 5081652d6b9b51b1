//! tokenlens numeric core
//!
//! Everything between "the model gave us vectors" and "the client gets plot
//! geometry" lives here: squashing per-token embeddings down to three
//! dimensions, rescaling the result so the scatter plot is neither a speck
//! nor a wall, and sharpening attention matrices so they are actually
//! readable as a heatmap.
//!
//! The reduction picks its strategy from the sample count. With enough
//! tokens we run a neighborhood-preserving stochastic embedding; tiny
//! inputs (one to three tokens) fall back to a plain variance-maximizing
//! projection so a two-word request still renders instead of crashing.
//!
//! All entry points are pure functions over plain slices. No state, no
//! I/O, nothing shared between calls.

pub mod attention;
pub mod error;
pub mod normalize;
pub mod reduce;

pub use crate::attention::blend_attention;
pub use crate::error::ProjectionError;
pub use crate::normalize::{axis_ranges, rescale_in_place, sanitize_in_place, MAX_COORD};
pub use crate::reduce::{perplexity_for, reduce_to_3d, Point3};
