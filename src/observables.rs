//! Probability and collapse observables (`spec.md` §4.5, §4.6).

use crate::core::{QDistError, StateVector};
use crate::env::Environment;
use crate::locality;
use crate::precision::Real;
use crate::validate::{self, PROBABILITY_EPSILON};

/// Kahan-compensated sum of `|amplitude|^2` over every local index whose
/// `measure_qubit` bit equals 0, within `(real, imag)`.
///
/// `spec.md` §4.5 requires compensated summation for the local partial sum
/// (floating error accumulates across up to `2^30` terms per chunk) but only
/// a plain sum for the cross-rank reduction, since each rank contributes a
/// single already-compensated term.
fn local_p_zero_kahan(real: &[Real], imag: &[Real], measure_qubit: u32) -> Real {
    let mask = 1usize << measure_qubit;
    let mut sum: Real = 0.0;
    let mut compensation: Real = 0.0;
    for i in 0..real.len() {
        if i & mask != 0 {
            continue;
        }
        let term = real[i] * real[i] + imag[i] * imag[i];
        let y = term - compensation;
        let t = sum + y;
        compensation = (t - sum) - y;
        sum = t;
    }
    sum
}

/// `findProbabilityOfOutcome(state, measureQubit, outcome)`: the total
/// probability, across every rank, that `measureQubit` reads `outcome`.
pub(crate) fn find_probability_of_outcome(env: &Environment, state: &StateVector, num_qubits: usize, measure_qubit: usize, outcome: u8) -> Result<Real, QDistError> {
    validate::check_qubit_range(measure_qubit, num_qubits).map_err(|e| env.report_and_abort("findProbabilityOfOutcome", e))?;
    validate::check_outcome(outcome).map_err(|e| env.report_and_abort("findProbabilityOfOutcome", e))?;
    let target = measure_qubit as u32;
    let chunk_size = state.chunk_size();
    let local_p_zero = if locality::half_block_fits_in_chunk(chunk_size, target) {
        local_p_zero_kahan(state.real(), state.imag(), target)
    } else if locality::is_chunk_to_skip_in_find_p_zero(state.chunk_id(), chunk_size, target) {
        0.0
    } else {
        // The whole chunk is the "qubit=0" half of its block.
        let mut sum: Real = 0.0;
        let mut compensation: Real = 0.0;
        for i in 0..chunk_size {
            let term = state.real()[i] * state.real()[i] + state.imag()[i] * state.imag()[i];
            let y = term - compensation;
            let t = sum + y;
            compensation = (t - sum) - y;
            sum = t;
        }
        sum
    };
    let p_zero = env.reduce_sum(local_p_zero)?;
    Ok(if outcome == 0 { p_zero } else { 1.0 - p_zero })
}

/// `collapseToOutcome(state, measureQubit, outcome)`: projects onto
/// `outcome` and renormalizes, failing if the outcome's probability is
/// negligible (`spec.md` §4.6).
pub(crate) fn collapse_to_outcome(env: &Environment, state: &mut StateVector, num_qubits: usize, measure_qubit: usize, outcome: u8) -> Result<Real, QDistError> {
    let probability = find_probability_of_outcome(env, state, num_qubits, measure_qubit, outcome)?;
    if probability < PROBABILITY_EPSILON as f64 as Real {
        let err = QDistError::NegligibleProbability {
            probability: probability as f64,
            epsilon: PROBABILITY_EPSILON as f64,
        };
        return Err(env.report_and_abort("collapseToOutcome", err));
    }
    let target = measure_qubit as u32;
    let chunk_size = state.chunk_size();
    let norm = probability.sqrt();
    let mask = 1usize << target;
    if locality::half_block_fits_in_chunk(chunk_size, target) {
        let (real, imag) = state.real_imag_mut();
        for i in 0..real.len() {
            let bit_is_outcome = ((i & mask != 0) as u8) == outcome;
            if bit_is_outcome {
                real[i] /= norm;
                imag[i] /= norm;
            } else {
                real[i] = 0.0;
                imag[i] = 0.0;
            }
        }
        return Ok(probability);
    }
    let is_upper = locality::chunk_is_upper(state.chunk_id(), chunk_size, target);
    let this_chunk_bit = if is_upper { 0u8 } else { 1u8 };
    if this_chunk_bit == outcome {
        let (real, imag) = state.real_imag_mut();
        for i in 0..real.len() {
            real[i] /= norm;
            imag[i] /= norm;
        }
    } else {
        state.real_mut().fill(0.0);
        state.imag_mut().fill(0.0);
    }
    Ok(probability)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StateVector;

    #[test]
    fn equal_superposition_has_half_probability_each_way() {
        let s = std::f64::consts::FRAC_1_SQRT_2 as Real;
        Environment::run_distributed(1, move |env| {
            env.initialize()?;
            let mut state = StateVector::zeroed(0, 2);
            state.set(0, s, 0.0);
            state.set(1, s, 0.0);
            let p0 = find_probability_of_outcome(env, &state, 1, 0, 0)?;
            let p1 = find_probability_of_outcome(env, &state, 1, 0, 1)?;
            assert!((p0 - 0.5).abs() < 1e-9);
            assert!((p1 - 0.5).abs() < 1e-9);
            env.finalize()?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn collapse_on_basis_state_is_idempotent_and_normalized() {
        Environment::run_distributed(1, |env| {
            env.initialize()?;
            let mut state = StateVector::zeroed(0, 2);
            state.set(1, 1.0, 0.0);
            let p = collapse_to_outcome(env, &mut state, 1, 0, 1)?;
            assert!((p - 1.0).abs() < 1e-9);
            assert_eq!(state.real(), &[0.0, 1.0]);
            env.finalize()?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn collapse_on_negligible_outcome_is_rejected() {
        Environment::run_distributed(1, |env| {
            env.initialize()?;
            let mut state = StateVector::zeroed(0, 2);
            state.set(1, 1.0, 0.0);
            let result = collapse_to_outcome(env, &mut state, 1, 0, 0);
            let negligible_code = QDistError::NegligibleProbability { probability: 0.0, epsilon: 0.0 }.code();
            assert!(matches!(result, Err(QDistError::Aborted { code, .. }) if code == negligible_code));
            env.finalize()?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn probability_is_consistent_across_two_ranks() {
        // n=2 qubits, R=2 ranks, chunk_size=2: rank 0 holds global indices
        // [0,1] (qubit1=0), rank 1 holds [2,3] (qubit1=1). Index 0 in each
        // rank's local chunk carries amplitude 1/sqrt(2), splitting
        // probability evenly across qubit1's two outcomes without needing
        // an exchange.
        let s = std::f64::consts::FRAC_1_SQRT_2 as Real;
        let results = Environment::run_distributed(2, move |env| {
            env.initialize()?;
            let mut state = StateVector::zeroed(env.rank(), 2);
            state.set(0, s, 0.0);
            let p0 = find_probability_of_outcome(env, &state, 2, 1, 0)?;
            env.finalize()?;
            Ok(p0)
        })
        .unwrap();
        for p in results {
            assert!((p - 0.5).abs() < 1e-9);
        }
    }
}
