//! Hash-addressed term-topic weight table.
//!
//! The table is one contiguous float buffer of `W` rows, `W` a power of
//! two, addressed by masking a term hash. Each row packs the topic
//! pseudocounts, the row's last-synchronised counter, and per-minibatch
//! scratch side by side so per-term work stays cache-local:
//!
//! ```text
//! [ lambda_0 .. lambda_{K-1} | t_last | u_0 .. u_{K-1} | pad ]
//! ```
//!
//! with row width `stride = next_pow2(2K + 1)`.

use std::io::{Read, Write};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, TematicaError};

/// Smallest power of two greater than or equal to `x`.
pub(crate) fn next_pow2(x: usize) -> usize {
    let mut i = 0;
    let mut x = x.saturating_sub(1);
    while x > 0 {
        x >>= 1;
        i += 1;
    }
    1 << i
}

#[derive(Debug, Clone)]
pub(crate) struct TopicTable {
    weights: Vec<f32>,
    topics: usize,
    num_rows: usize,
    stride: usize,
    mask: u32,
}

impl TopicTable {
    /// Allocate a `2^table_bits`-row table and draw the initial topic
    /// pseudocounts, `lambda = (-ln u + 1) * 200 D / (K W)` with
    /// `u ~ U(0,1)`, from a seeded generator. Every row starts
    /// synchronised at `initial_t`.
    pub(crate) fn seeded(
        topics: usize,
        table_bits: u8,
        corpus_size: f32,
        initial_t: f64,
        seed: u64,
    ) -> Self {
        let num_rows = 1usize << table_bits;
        let stride = next_pow2(2 * topics + 1);
        let mut table = Self {
            weights: vec![0.0; num_rows * stride],
            topics,
            num_rows,
            stride,
            mask: (num_rows - 1) as u32,
        };

        let mut rng = StdRng::seed_from_u64(seed);
        let scale = corpus_size / topics as f32 / num_rows as f32 * 200.0;
        for w in 0..num_rows {
            let base = w * stride;
            for k in 0..topics {
                let u: f32 = rng.gen_range(f32::EPSILON..1.0);
                table.weights[base + k] = (-u.ln() + 1.0) * scale;
            }
            table.weights[base + topics] = initial_t as f32;
        }
        table
    }

    pub(crate) fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Row index for a term hash.
    pub(crate) fn row_of(&self, hash: u32) -> usize {
        (hash & self.mask) as usize
    }

    pub(crate) fn lambda(&self, row: usize) -> &[f32] {
        let base = row * self.stride;
        &self.weights[base..base + self.topics]
    }

    pub(crate) fn lambda_mut(&mut self, row: usize) -> &mut [f32] {
        let base = row * self.stride;
        &mut self.weights[base..base + self.topics]
    }

    pub(crate) fn t_last(&self, row: usize) -> f32 {
        self.weights[row * self.stride + self.topics]
    }

    pub(crate) fn set_t_last(&mut self, row: usize, t: f32) {
        self.weights[row * self.stride + self.topics] = t;
    }

    /// Per-minibatch expElogbeta scratch for a row.
    pub(crate) fn u(&self, row: usize) -> &[f32] {
        let base = row * self.stride + self.topics + 1;
        &self.weights[base..base + self.topics]
    }

    /// Split borrow of one row's pseudocounts and scratch.
    pub(crate) fn lambda_u_mut(&mut self, row: usize) -> (&mut [f32], &mut [f32]) {
        let base = row * self.stride;
        let (head, tail) = self.weights[base..base + self.stride].split_at_mut(self.topics + 1);
        (&mut head[..self.topics], &mut tail[..self.topics])
    }

    /// Write every row as `w` followed by `lambda(w, k) + rho` for each
    /// topic: binary is little-endian u32 + K f32, text is the same values
    /// space-joined, one line per row.
    ///
    /// Rows are dumped as stored; bringing them current first (via
    /// `end_examples`) is the caller's responsibility.
    pub(crate) fn save_rows<W: Write>(&self, out: &mut W, rho: f32, text: bool) -> Result<()> {
        let wrap = |e: std::io::Error| TematicaError::io_error("writing model row", &e);
        for w in 0..self.num_rows {
            if text {
                write!(out, "{w} ").map_err(wrap)?;
                for &l in self.lambda(w) {
                    write!(out, "{:.6} ", l + rho).map_err(wrap)?;
                }
                writeln!(out).map_err(wrap)?;
            } else {
                out.write_all(&(w as u32).to_le_bytes()).map_err(wrap)?;
                for &l in self.lambda(w) {
                    out.write_all(&(l + rho).to_le_bytes()).map_err(wrap)?;
                }
            }
        }
        Ok(())
    }

    /// Read back a binary dump produced by [`Self::save_rows`], restoring
    /// `lambda = stored - rho` and marking every row synchronised at
    /// `t_reset`.
    pub(crate) fn load_rows<R: Read>(&mut self, input: &mut R, rho: f32, t_reset: f32) -> Result<()> {
        let mut buf4 = [0u8; 4];
        for w in 0..self.num_rows {
            input
                .read_exact(&mut buf4)
                .map_err(|e| TematicaError::io_error("reading model row index", &e))?;
            let idx = u32::from_le_bytes(buf4);
            if idx as usize != w {
                return Err(TematicaError::model_format(
                    w,
                    format!("index {idx} found, expected {w}"),
                ));
            }
            for k in 0..self.topics {
                input
                    .read_exact(&mut buf4)
                    .map_err(|e| TematicaError::io_error("reading model row", &e))?;
                let stored = f32::from_le_bytes(buf4);
                self.lambda_mut(w)[k] = (stored - rho).max(0.0);
            }
            self.set_t_last(w, t_reset);
        }
        Ok(())
    }
}
