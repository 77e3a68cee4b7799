//! Shared types used throughout the crate.
//!
//! - [`Error`] / [`Result`] - error handling
//! - [`Range2d`] / [`Range3d`] and glam re-exports
//! - [`compute_dimensions`] - lookup-texture sizing

mod dimensions;
mod error;
mod math;

pub use dimensions::*;
pub use error::*;
pub use math::*;
