//! `proptest`-driven versions of the `spec.md` §8 invariants that quantify
//! over `(n, R, q)`: pair symmetry and skip disjointness over the pure
//! locality oracle, and locality equivalence (R ranks vs. 1 rank) and norm
//! preservation over small random gate sequences.

use proptest::collection::vec as prop_vec;
use proptest::prelude::*;
use qdist::{Amplitude, Environment, MultiQubit, Real};

/// Valid `(chunk_size, target_qubit)` pairs for the locality oracle: a
/// power-of-two chunk size up to `2^6`, and a target qubit whose half-block
/// (`2^target`) does not exceed `2^8`, so `chunk_pair_id`'s arithmetic stays
/// in range for every `chunk_id` the strategy produces.
fn chunk_size_and_target() -> impl Strategy<Value = (usize, u32)> {
    (0u32..=6).prop_flat_map(|log_chunk| {
        let chunk_size = 1usize << log_chunk;
        (Just(chunk_size), 0u32..=8)
    })
}

proptest! {
    #[test]
    fn pair_symmetry_holds_for_any_valid_chunk_and_target((chunk_size, target) in chunk_size_and_target(), raw_chunk_id in 0usize..64) {
        use qdist::locality::{chunk_is_upper, chunk_pair_id, half_block_fits_in_chunk};
        prop_assume!(!half_block_fits_in_chunk(chunk_size, target));
        let k = (1usize << target) / chunk_size;
        // Keep chunk_id within a range wide enough that chunk_id +/- k stays
        // in bounds on both sides.
        let chunk_id = raw_chunk_id % 64 + k;
        let is_upper = chunk_is_upper(chunk_id, chunk_size, target);
        let pair = chunk_pair_id(is_upper, chunk_id, chunk_size, target);
        prop_assert_eq!(pair.abs_diff(chunk_id), k);
        let pair_is_upper = chunk_is_upper(pair, chunk_size, target);
        prop_assert_ne!(is_upper, pair_is_upper);
        let back = chunk_pair_id(pair_is_upper, pair, chunk_size, target);
        prop_assert_eq!(back, chunk_id);
    }

    #[test]
    fn skip_disjointness_is_always_exactly_half((chunk_size, target) in chunk_size_and_target()) {
        use qdist::locality::{half_block_fits_in_chunk, is_chunk_to_skip_in_find_p_zero};
        prop_assume!(!half_block_fits_in_chunk(chunk_size, target));
        let num_chunks = 1usize << (target + 2);
        let skipped = (0..num_chunks).filter(|&c| is_chunk_to_skip_in_find_p_zero(c, chunk_size, target)).count();
        prop_assert_eq!(skipped, num_chunks / 2);
    }
}

#[derive(Debug, Clone, Copy)]
enum GateCall {
    Hadamard(usize),
    SigmaX(usize),
    SigmaY(usize),
    ControlledNot(usize, usize),
}

fn apply(q: &mut MultiQubit, call: GateCall) -> Result<(), qdist::QDistError> {
    match call {
        GateCall::Hadamard(t) => q.hadamard(t),
        GateCall::SigmaX(t) => q.sigma_x(t),
        GateCall::SigmaY(t) => q.sigma_y(t),
        GateCall::ControlledNot(c, t) => q.controlled_not(c, t),
    }
}

fn gate_sequence(num_qubits: usize) -> impl Strategy<Value = Vec<GateCall>> {
    let single = (0..num_qubits).prop_flat_map(move |t| {
        prop_oneof![Just(GateCall::Hadamard(t)), Just(GateCall::SigmaX(t)), Just(GateCall::SigmaY(t)),]
    });
    let pair = (0..num_qubits).prop_flat_map(move |c| (Just(c), (0..num_qubits)).prop_filter("control != target", move |&(c, t)| c != t).prop_map(|(c, t)| GateCall::ControlledNot(c, t)));
    prop_vec(prop_oneof![single, pair], 1..6)
}

fn run_sequence(num_qubits: usize, num_ranks: usize, gates: Vec<GateCall>) -> Vec<(f64, f64)> {
    let gates_for_closure = gates.clone();
    Environment::run_distributed(num_ranks, move |env| {
        env.initialize()?;
        let mut q = MultiQubit::new(env, num_qubits)?;
        for &call in &gates_for_closure {
            apply(&mut q, call)?;
        }
        let dim = 1usize << num_qubits;
        let state: Vec<(f64, f64)> = (0..dim).map(|i| q.amplitude_at(i).map(|a| (a.re, a.im))).collect::<Result<_, _>>()?;
        env.finalize()?;
        Ok(state)
    })
    .unwrap()
    .into_iter()
    .next()
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn locality_equivalence_across_rank_counts(gates in gate_sequence(3)) {
        let single_rank = run_sequence(3, 1, gates.clone());
        for &r in &[2usize, 4] {
            let multi_rank = run_sequence(3, r, gates.clone());
            for (a, b) in single_rank.iter().zip(&multi_rank) {
                prop_assert!((a.0 - b.0).abs() < 1e-6);
                prop_assert!((a.1 - b.1).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn norm_is_preserved_after_any_gate_sequence(gates in gate_sequence(3), num_ranks in prop_oneof![Just(1usize), Just(2), Just(4), Just(8)]) {
        let state = run_sequence(3, num_ranks, gates);
        let norm_sqr: f64 = state.iter().map(|(re, im)| re * re + im * im).sum();
        prop_assert!((norm_sqr - 1.0).abs() < 1e-6);
    }
}

/// Gathers every global amplitude, going through every rank's broadcast.
fn gather(q: &MultiQubit, dim: usize) -> Vec<(f64, f64)> {
    (0..dim).map(|i| q.amplitude_at(i).unwrap()).map(|a| (a.re as f64, a.im as f64)).collect()
}

fn assert_states_close(a: &[(f64, f64)], b: &[(f64, f64)], eps: f64) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert!((x.0 - y.0).abs() < eps, "re mismatch: {x:?} vs {y:?}");
        assert!((x.1 - y.1).abs() < eps, "im mismatch: {x:?} vs {y:?}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// `sigmaX` applied twice to the same qubit restores the state exactly
    /// (`spec.md` §8): X is its own inverse.
    #[test]
    fn sigma_x_twice_is_identity(target in 0usize..3, num_ranks in prop_oneof![Just(1usize), Just(2), Just(4), Just(8)]) {
        let dim = 8usize;
        let (before, after) = Environment::run_distributed(num_ranks, move |env| {
            env.initialize()?;
            let mut q = MultiQubit::new(env, 3)?;
            let before = gather(&q, dim);
            q.sigma_x(target)?;
            q.sigma_x(target)?;
            let after = gather(&q, dim);
            env.finalize()?;
            Ok((before, after))
        })
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
        assert_states_close(&before, &after, 1e-9);
    }

    /// `hadamard` applied twice to the same qubit restores the state within
    /// `ε` (`spec.md` §8): H is its own inverse up to floating error.
    #[test]
    fn hadamard_twice_is_identity_within_eps(target in 0usize..3, num_ranks in prop_oneof![Just(1usize), Just(2), Just(4), Just(8)]) {
        let dim = 8usize;
        let (before, after) = Environment::run_distributed(num_ranks, move |env| {
            env.initialize()?;
            let mut q = MultiQubit::new(env, 3)?;
            let before = gather(&q, dim);
            q.hadamard(target)?;
            q.hadamard(target)?;
            let after = gather(&q, dim);
            env.finalize()?;
            Ok((before, after))
        })
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
        assert_states_close(&before, &after, 1e-6);
    }

    /// `compactUnitary(alpha, beta)` followed by `compactUnitary(alpha*,
    /// -beta)` is the identity within `ε` (`spec.md` §8): the second call is
    /// the first's matrix inverse in compact form.
    #[test]
    fn compact_unitary_inverse_is_identity_within_eps(
        target in 0usize..3,
        theta in 0.0f64..std::f64::consts::FRAC_PI_2,
        phi in 0.0f64..std::f64::consts::TAU,
        num_ranks in prop_oneof![Just(1usize), Just(2), Just(4), Just(8)],
    ) {
        let dim = 8usize;
        let alpha = Amplitude::new(theta.cos() as Real, 0.0);
        let beta = Amplitude::new((theta.sin() * phi.cos()) as Real, (theta.sin() * phi.sin()) as Real);
        let (before, after) = Environment::run_distributed(num_ranks, move |env| {
            env.initialize()?;
            let mut q = MultiQubit::new(env, 3)?;
            let before = gather(&q, dim);
            q.compact_unitary(target, alpha, beta)?;
            q.compact_unitary(target, alpha.conj(), -beta)?;
            let after = gather(&q, dim);
            env.finalize()?;
            Ok((before, after))
        })
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
        assert_states_close(&before, &after, 1e-6);
    }
}
