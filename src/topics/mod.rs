//! Streaming topic discovery with online variational Bayes.
//!
//! This module implements stochastic variational inference for Latent
//! Dirichlet Allocation over a hash-addressed term-topic table. Documents
//! are accepted one at a time as bags of `(term_hash, weight)` features;
//! once a minibatch has accumulated, the learner runs the per-document
//! fixed-point loop against a consistent snapshot of the topic geometry
//! and then pulls the table toward the stochastic natural-gradient target.
//!
//! Global decay is lazy: instead of shrinking every row by `1 - eta` each
//! step, a log-prefix-sum of step factors is kept and a row is only
//! brought current when a minibatch actually touches it (see
//! [`decay::DecayLevels`]).
//!
//! # References
//!
//! - [Hoffman et al. 2010] "Online Learning for Latent Dirichlet
//!   Allocation" - the stochastic natural-gradient update and the
//!   per-document variational loop.
//! - [Blei et al. 2003] "Latent Dirichlet Allocation" - the underlying
//!   model and the variational bound.

pub(crate) mod decay;
pub(crate) mod table;

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TematicaError};
use crate::math::{self, MathMode};

use decay::DecayLevels;
use table::TopicTable;

/// Configuration for the online LDA learner.
///
/// # Example
///
/// ```
/// use tematica::prelude::*;
///
/// let config = OnlineLdaConfig {
///     topics: 20,
///     minibatch: 256,
///     table_bits: 8,
///     math_mode: MathMode::Precise,
///     ..Default::default()
/// };
/// let lda = OnlineLda::new(config).unwrap();
/// assert_eq!(lda.config().topics, 20);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineLdaConfig {
    /// Number of topics (K, at least 1)
    pub topics: usize,
    /// Dirichlet prior on per-document topic weights
    pub alpha: f32,
    /// Dirichlet prior on topic-term distributions
    pub rho: f32,
    /// Assumed corpus size scaling the stochastic gradient
    pub corpus_size: f32,
    /// Convergence threshold of the per-document loop
    pub epsilon: f32,
    /// Documents accumulated before one table update
    pub minibatch: usize,
    /// Kernel family for digamma / log-gamma / exp / pow
    pub math_mode: MathMode,
    /// Base learning rate (clamped to 1 with a warning if larger)
    pub learning_rate: f32,
    /// Decay schedule exponent: step size is `learning_rate * t^-power_t`
    pub power_t: f32,
    /// Starting value of the example counter
    pub initial_t: f64,
    /// The table holds `2^table_bits` rows
    pub table_bits: u8,
    /// Seed for the initial topic pseudocounts
    pub seed: u64,
}

impl Default for OnlineLdaConfig {
    fn default() -> Self {
        Self {
            topics: 1,
            alpha: 0.1,
            rho: 0.1,
            corpus_size: 10000.0,
            epsilon: 1e-3,
            minibatch: 1,
            math_mode: MathMode::Simd,
            learning_rate: 0.5,
            power_t: 0.5,
            initial_t: 0.0,
            table_bits: 16,
            seed: 42,
        }
    }
}

/// Outcome for one document, released when its minibatch is processed.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentResult {
    /// Final per-topic posterior pseudocounts (length K)
    pub gamma: Vec<f32>,
    /// Per-word estimate of the document's variational-bound contribution;
    /// a (noisy) held-out likelihood proxy, 0.0 for empty documents
    pub score: f32,
}

/// One occurrence of a term in a pending document.
#[derive(Debug, Clone, Copy)]
struct IndexedFeature {
    document: u32,
    hash: u32,
    value: f32,
}

/// Online variational Bayes learner for LDA.
///
/// Documents stream in through [`Self::accept`]; every completed minibatch
/// updates the topic-term table and releases the batch's
/// [`DocumentResult`]s. [`Self::end_pass`] flushes a partial batch and
/// [`Self::end_examples`] brings every table row current, which must
/// happen before [`Self::save_model`] for the dump to reflect effective
/// values.
#[derive(Debug)]
pub struct OnlineLda {
    config: OnlineLdaConfig,
    table: TopicTable,
    decay: DecayLevels,
    example_t: f64,

    total_lambda: Vec<f32>,
    total_lambda_init: bool,
    total_new: Vec<f32>,
    digammas: Vec<f32>,

    // Per-minibatch buffers; capacity grows to max(K, K * minibatch).
    v: Vec<f32>,
    gamma_new: Vec<f32>,
    gamma_old: Vec<f32>,
    elogtheta: Vec<f32>,

    sorted_features: Vec<IndexedFeature>,
    examples: Vec<Vec<(u32, f32)>>,
    doc_lengths: Vec<f32>,

    total_loss: f64,
    examples_seen: u64,
}

impl OnlineLda {
    /// Create a learner, validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TematicaError::InvalidConfig`] when a parameter is outside
    /// its valid domain. A learning rate above 1 is clamped with a warning
    /// rather than rejected.
    pub fn new(mut config: OnlineLdaConfig) -> Result<Self> {
        if config.topics == 0 {
            return Err(TematicaError::invalid_config(
                "topics",
                config.topics,
                "topic count must be at least 1",
            ));
        }
        if config.minibatch == 0 {
            return Err(TematicaError::invalid_config(
                "minibatch",
                config.minibatch,
                "minibatch size must be at least 1",
            ));
        }
        for (param, value) in [
            ("alpha", config.alpha),
            ("rho", config.rho),
            ("corpus_size", config.corpus_size),
            ("epsilon", config.epsilon),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(TematicaError::invalid_config(
                    param,
                    value,
                    "must be a positive finite number",
                ));
            }
        }
        if config.table_bits == 0 || config.table_bits > 30 {
            return Err(TematicaError::invalid_config(
                "table_bits",
                config.table_bits,
                "must be between 1 and 30",
            ));
        }
        if config.learning_rate > 1.0 {
            eprintln!(
                "Warning: learning rate {} is too high, clamping to 1",
                config.learning_rate
            );
            config.learning_rate = 1.0;
        }

        let table = TopicTable::seeded(
            config.topics,
            config.table_bits,
            config.corpus_size,
            config.initial_t,
            config.seed,
        );
        let decay = DecayLevels::new(config.initial_t);
        let v = vec![0.0; config.topics * config.minibatch];
        let example_t = config.initial_t;

        Ok(Self {
            config,
            table,
            decay,
            example_t,
            total_lambda: Vec::new(),
            total_lambda_init: false,
            total_new: Vec::new(),
            digammas: Vec::new(),
            v,
            gamma_new: Vec::new(),
            gamma_old: Vec::new(),
            elogtheta: Vec::new(),
            sorted_features: Vec::new(),
            examples: Vec::new(),
            doc_lengths: Vec::new(),
            total_loss: 0.0,
            examples_seen: 0,
        })
    }

    /// Queue one document, a bag of `(term_hash, weight)` features with
    /// positive weights. Returns the released results when this document
    /// completes a minibatch, an empty vector otherwise.
    pub fn accept(&mut self, features: &[(u32, f32)]) -> Vec<DocumentResult> {
        let document = self.examples.len() as u32;
        let mut length = 0.0;
        for &(hash, value) in features {
            self.sorted_features.push(IndexedFeature {
                document,
                hash,
                value,
            });
            length += value;
        }
        self.doc_lengths.push(length);
        self.examples.push(features.to_vec());

        if self.examples.len() == self.config.minibatch {
            self.learn_batch()
        } else {
            Vec::new()
        }
    }

    /// Flush a partial minibatch at the end of an input pass.
    pub fn end_pass(&mut self) -> Vec<DocumentResult> {
        if self.examples.is_empty() {
            Vec::new()
        } else {
            self.learn_batch()
        }
    }

    /// Bring every table row current with the decay history.
    ///
    /// Idempotent: rows are re-synchronised to the current counter, so a
    /// second call multiplies by exactly 1.
    pub fn end_examples(&mut self) {
        let Self {
            table,
            decay,
            example_t,
            ..
        } = self;
        let last = decay.last();
        for w in 0..table.num_rows() {
            let factor = decay.factor(last, table.t_last(w));
            table.set_t_last(w, *example_t as f32);
            for l in table.lambda_mut(w) {
                *l *= factor;
            }
        }
    }

    /// Persist the weight table (binary or text rows).
    ///
    /// Rows are written as stored; call [`Self::end_examples`] first so the
    /// dump reflects effective values.
    ///
    /// # Errors
    ///
    /// Returns an error when the writer fails.
    pub fn save_model<W: Write>(&self, out: &mut W, text: bool) -> Result<()> {
        self.table.save_rows(out, self.config.rho, text)
    }

    /// Restore a binary dump written by [`Self::save_model`].
    ///
    /// Loaded rows are marked synchronised at the current example counter;
    /// the running topic totals are recomputed on the next minibatch.
    ///
    /// # Errors
    ///
    /// Returns an error when the reader fails or the dump does not match
    /// the expected row layout.
    pub fn load_model<R: Read>(&mut self, input: &mut R) -> Result<()> {
        self.table
            .load_rows(input, self.config.rho, self.example_t as f32)?;
        self.total_lambda_init = false;
        Ok(())
    }

    /// The validated configuration.
    #[must_use]
    pub fn config(&self) -> &OnlineLdaConfig {
        &self.config
    }

    /// Sum of `-score` over non-empty released documents.
    #[must_use]
    pub fn total_loss(&self) -> f64 {
        self.total_loss
    }

    /// Number of documents released so far.
    #[must_use]
    pub fn examples_seen(&self) -> u64 {
        self.examples_seen
    }

    /// Documents queued for the current minibatch.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.examples.len()
    }

    /// Process the pending minibatch and release its documents.
    fn learn_batch(&mut self) -> Vec<DocumentResult> {
        let k = self.config.topics;
        let batch_size = self.examples.len();

        if self.sorted_features.is_empty() {
            // Every pending document is featureless (a broken upstream can
            // produce this). Release them with a prior-only prediction and
            // no loss; the table and decay history stay untouched.
            self.examples_seen += batch_size as u64;
            self.examples.clear();
            self.doc_lengths.clear();
            return (0..batch_size)
                .map(|_| DocumentResult {
                    gamma: vec![self.config.alpha; k],
                    score: 0.0,
                })
                .collect();
        }

        if !self.total_lambda_init {
            self.total_lambda.clear();
            self.total_lambda.resize(k, 0.0);
            for w in 0..self.table.num_rows() {
                for (kk, &l) in self.table.lambda(w).iter().enumerate() {
                    self.total_lambda[kk] += l;
                }
            }
            self.total_lambda_init = true;
        }

        self.example_t += 1.0;
        self.total_new.clear();
        self.total_new.resize(k, 0.0);

        self.sorted_features
            .sort_unstable_by_key(|f| (f.hash, f.document));

        let mut eta = self.config.learning_rate
            * math::powf(
                self.config.math_mode,
                self.example_t as f32,
                -self.config.power_t,
            );
        eta = eta.min(1.0);
        let minuseta = 1.0 - eta;
        eta *= self.config.corpus_size / batch_size as f32;
        self.decay.push(minuseta.ln());

        let additional = self.table.num_rows() as f32 * self.config.rho;
        self.digammas.clear();
        for kk in 0..k {
            self.digammas.push(math::digamma(
                self.config.math_mode,
                self.total_lambda[kk] + additional,
            ));
        }

        // First pass: bring each touched row current and materialise its
        // expElogbeta snapshot. Duplicate hashes coalesce, so a row is
        // decayed at most once per minibatch.
        {
            let Self {
                sorted_features,
                table,
                decay,
                digammas,
                config,
                example_t,
                ..
            } = self;
            let prev_level = decay.previous();
            let mut last_hash = None;
            for s in sorted_features.iter() {
                if last_hash == Some(s.hash) {
                    continue;
                }
                last_hash = Some(s.hash);
                let row = table.row_of(s.hash);
                let factor = decay.factor(prev_level, table.t_last(row));
                table.set_t_last(row, *example_t as f32);
                let (lambda, u) = table.lambda_u_mut(row);
                for kk in 0..k {
                    lambda[kk] *= factor;
                    u[kk] = lambda[kk] + config.rho;
                }
                math::expdigammify_2(config.math_mode, u, digammas);
            }
        }

        // Per-document inference against the snapshot.
        self.v.resize(k * batch_size, 0.0);
        let mut results = Vec::with_capacity(batch_size);
        {
            let Self {
                table,
                examples,
                doc_lengths,
                v,
                gamma_new,
                gamma_old,
                elogtheta,
                config,
                total_loss,
                ..
            } = self;
            for d in 0..batch_size {
                let score = lda_loop(
                    config,
                    table,
                    &examples[d],
                    &mut v[d * k..(d + 1) * k],
                    gamma_new,
                    gamma_old,
                    elogtheta,
                );
                if doc_lengths[d] > 0.0 {
                    *total_loss -= f64::from(score);
                }
                results.push(DocumentResult {
                    gamma: gamma_new.clone(),
                    score,
                });
            }
        }

        // Second pass: one shrink per distinct term, then the scaled
        // natural-gradient contribution of every occurrence.
        {
            let Self {
                sorted_features,
                table,
                total_new,
                v,
                ..
            } = self;
            let n = sorted_features.len();
            let mut i = 0;
            while i < n {
                let hash = sorted_features[i].hash;
                let mut next = i + 1;
                while next < n && sorted_features[next].hash == hash {
                    next += 1;
                }

                let row = table.row_of(hash);
                let (lambda, u) = table.lambda_u_mut(row);
                for l in lambda.iter_mut() {
                    *l *= minuseta;
                }

                for s in &sorted_features[i..next] {
                    let vd = &v[s.document as usize * k..][..k];
                    let c_w = eta * find_cw(u, vd) * s.value;
                    for kk in 0..k {
                        let add = u[kk] * vd[kk] * c_w;
                        total_new[kk] += add;
                        lambda[kk] += add;
                    }
                }
                i = next;
            }
        }

        for kk in 0..k {
            self.total_lambda[kk] = minuseta * self.total_lambda[kk] + self.total_new[kk];
        }

        self.examples_seen += batch_size as u64;
        self.sorted_features.clear();
        self.examples.clear();
        self.doc_lengths.clear();
        results
    }
}

#[inline]
fn find_cw(u: &[f32], v: &[f32]) -> f32 {
    1.0 / u.iter().zip(v).map(|(a, b)| a * b).sum::<f32>()
}

fn average_diff(old: &[f32], new: &[f32]) -> f32 {
    let sum: f32 = old.iter().zip(new).map(|(o, n)| (o - n).abs()).sum();
    let normalizer: f32 = new.iter().sum();
    sum / normalizer
}

/// `E_q[log p(theta)] - E_q[log q(theta)]` for one document's gamma.
fn theta_kl(mode: MathMode, alpha: f32, gamma: &[f32], elogtheta: &mut Vec<f32>) -> f32 {
    let k = gamma.len();
    elogtheta.clear();
    let mut gammasum = 0.0;
    for &g in gamma {
        elogtheta.push(math::digamma(mode, g));
        gammasum += g;
    }
    let digammasum = math::digamma(mode, gammasum);

    let mut kl = -(k as f32) * math::log_gamma(mode, alpha);
    kl += math::log_gamma(mode, alpha * k as f32) - math::log_gamma(mode, gammasum);
    for kk in 0..k {
        elogtheta[kk] -= digammasum;
        kl += (alpha - gamma[kk]) * elogtheta[kk];
        kl += math::log_gamma(mode, gamma[kk]);
    }
    kl
}

/// Fixed-point iteration on one document's gamma against the current
/// topic snapshot.
///
/// Returns the part of the variational bound that does not involve the
/// topic-term parameters, divided by the document's total feature mass: a
/// possibly very noisy estimate of held-out likelihood. The final gamma is
/// left in `gamma_new` and the document's expElogtheta in `v`.
fn lda_loop(
    config: &OnlineLdaConfig,
    table: &TopicTable,
    features: &[(u32, f32)],
    v: &mut [f32],
    gamma_new: &mut Vec<f32>,
    gamma_old: &mut Vec<f32>,
    elogtheta: &mut Vec<f32>,
) -> f32 {
    let k = config.topics;
    let mode = config.math_mode;

    gamma_new.clear();
    gamma_new.resize(k, 1.0);
    gamma_old.clear();
    gamma_old.resize(k, 0.0);

    let mut score;
    let mut doc_length;
    loop {
        v.copy_from_slice(gamma_new);
        math::expdigammify(mode, v);

        gamma_old.copy_from_slice(gamma_new);
        for g in gamma_new.iter_mut() {
            *g = 0.0;
        }
        score = 0.0_f32;
        doc_length = 0.0_f32;

        for &(hash, x) in features {
            let u = table.u(table.row_of(hash));
            let c_w = find_cw(u, v);
            let xc_w = c_w * x;
            score -= x * c_w.ln();
            for kk in 0..k {
                gamma_new[kk] += xc_w * u[kk];
            }
            doc_length += x;
        }
        for kk in 0..k {
            gamma_new[kk] = gamma_new[kk] * v[kk] + config.alpha;
        }

        if average_diff(gamma_old, gamma_new) <= config.epsilon {
            break;
        }
    }

    score += theta_kl(mode, config.alpha, gamma_new, elogtheta);
    if doc_length > 0.0 {
        score / doc_length
    } else {
        0.0
    }
}



#[cfg(test)]
#[path = "topics_contract_falsify.rs"]
mod topics_contract_falsify;
