//! Online LDA Contract Falsification Tests
//!
//! Popperian falsification of the streaming learner's claims:
//!   - Released predictions are length-K, finite, and carry the prior mass
//!   - Per-word scores are finite for documents with positive mass
//!   - The decay history is a non-increasing prefix sum
//!   - Every accepted document is released exactly once
//!   - Replays are bit-identical
//!   - Bringing the table current twice is a no-op
//!
//! References:
//!   - Hoffman, M., Blei, D., Bach, F. (2010). Online Learning for
//!     Latent Dirichlet Allocation. NIPS.

use proptest::prelude::*;

use super::*;

const TOPICS: usize = 3;

fn small_learner(minibatch: usize) -> OnlineLda {
    OnlineLda::new(OnlineLdaConfig {
        topics: TOPICS,
        minibatch,
        table_bits: 6,
        ..Default::default()
    })
    .expect("valid config")
}

fn doc_strategy() -> impl Strategy<Value = Vec<(u32, f32)>> {
    prop::collection::vec((0u32..1000, 0.5f32..10.0), 0..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    // ========================================================================
    // FALSIFY-OVB-001: predictions are well-formed
    // ========================================================================

    #[test]
    fn falsify_ovb_001_prop_predictions_well_formed(
        docs in prop::collection::vec(doc_strategy(), 1..8),
    ) {
        let mut lda = small_learner(2);
        let mut released = Vec::new();
        for doc in &docs {
            released.extend(lda.accept(doc));
        }
        released.extend(lda.end_pass());

        for (d, result) in released.iter().enumerate() {
            prop_assert_eq!(result.gamma.len(), TOPICS);
            for &g in &result.gamma {
                prop_assert!(
                    g.is_finite() && g >= 0.1,
                    "FALSIFIED OVB-001: doc {} gamma {} below prior mass",
                    d, g
                );
            }
            prop_assert!(
                result.score.is_finite(),
                "FALSIFIED OVB-001: doc {} score {} not finite",
                d, result.score
            );
        }
    }

    // ========================================================================
    // FALSIFY-OVB-002: decay history is a non-increasing prefix sum
    // ========================================================================

    #[test]
    fn falsify_ovb_002_prop_decay_history_monotone(
        docs in prop::collection::vec(doc_strategy(), 1..10),
    ) {
        let mut lda = small_learner(1);
        for doc in &docs {
            lda.accept(doc);
        }
        let levels = lda.decay.as_slice();
        for i in 1..levels.len() {
            prop_assert!(
                levels[i] <= levels[i - 1],
                "FALSIFIED OVB-002: decay level rose at step {}: {} > {}",
                i, levels[i], levels[i - 1]
            );
        }
    }

    // ========================================================================
    // FALSIFY-OVB-003: accepted documents are released exactly once
    // ========================================================================

    #[test]
    fn falsify_ovb_003_prop_release_is_exhaustive(
        docs in prop::collection::vec(doc_strategy(), 1..12),
        minibatch in 1usize..5,
    ) {
        let mut lda = small_learner(minibatch);
        let mut released = 0usize;
        for doc in &docs {
            released += lda.accept(doc).len();
        }
        released += lda.end_pass().len();

        prop_assert_eq!(
            released, docs.len(),
            "FALSIFIED OVB-003: {} docs accepted, {} released", docs.len(), released
        );
        prop_assert_eq!(lda.examples_seen(), docs.len() as u64);
        prop_assert_eq!(lda.pending(), 0);
    }

    // ========================================================================
    // FALSIFY-OVB-004: replays are bit-identical
    // ========================================================================

    #[test]
    fn falsify_ovb_004_prop_replay_determinism(
        docs in prop::collection::vec(doc_strategy(), 1..6),
    ) {
        let run = |docs: &[Vec<(u32, f32)>]| {
            let mut lda = small_learner(2);
            let mut gammas = Vec::new();
            for doc in docs {
                for result in lda.accept(doc) {
                    gammas.extend(result.gamma.iter().map(|g| g.to_bits()));
                }
            }
            for result in lda.end_pass() {
                gammas.extend(result.gamma.iter().map(|g| g.to_bits()));
            }
            gammas
        };
        prop_assert_eq!(run(&docs), run(&docs), "FALSIFIED OVB-004: replay diverged");
    }

    // ========================================================================
    // FALSIFY-OVB-005: end_examples is idempotent
    // ========================================================================

    #[test]
    fn falsify_ovb_005_prop_end_examples_idempotent(
        docs in prop::collection::vec(doc_strategy(), 1..6),
    ) {
        let mut lda = small_learner(1);
        for doc in &docs {
            lda.accept(doc);
        }
        lda.end_examples();
        let mut first = Vec::new();
        lda.save_model(&mut first, false).unwrap();
        lda.end_examples();
        let mut second = Vec::new();
        lda.save_model(&mut second, false).unwrap();
        prop_assert_eq!(first, second, "FALSIFIED OVB-005: second end_examples moved rows");
    }
}
