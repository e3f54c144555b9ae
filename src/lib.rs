//! Tematica: streaming topic discovery in pure Rust.
//!
//! Tematica implements online variational Bayes for Latent Dirichlet
//! Allocation as a streaming learner over a fixed-size, hash-addressed
//! term-topic weight table. Documents arrive as bags of weighted term
//! hashes; each minibatch nudges the topic-term posterior toward its
//! stochastic natural-gradient target, while per-row decay is applied
//! lazily so untouched rows cost nothing.
//!
//! # Quick Start
//!
//! ```
//! use tematica::prelude::*;
//!
//! let config = OnlineLdaConfig {
//!     topics: 5,
//!     table_bits: 10,
//!     ..Default::default()
//! };
//! let mut lda = OnlineLda::new(config).unwrap();
//!
//! // A document is a bag of (term_hash, weight) features.
//! let released = lda.accept(&[(3, 2.0), (17, 1.0)]);
//! for doc in released.iter().chain(lda.end_pass().iter()) {
//!     assert_eq!(doc.gamma.len(), 5);
//! }
//! lda.end_examples();
//! ```
//!
//! # Modules
//!
//! - [`math`]: digamma / log-gamma / exp kernels in three accuracy modes
//! - [`topics`]: the streaming learner, weight table, and model persistence
//! - [`error`]: crate error types

pub mod error;
pub mod math;
pub mod prelude;
pub mod topics;

pub use error::{Result, TematicaError};
pub use math::MathMode;
pub use topics::{DocumentResult, OnlineLda, OnlineLdaConfig};
