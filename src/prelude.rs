//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use tematica::prelude::*;
//! ```

pub use crate::error::{Result, TematicaError};
pub use crate::math::MathMode;
pub use crate::topics::{DocumentResult, OnlineLda, OnlineLdaConfig};
