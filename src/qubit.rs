//! `MultiQubit`: the public handle to one rank's view of a partitioned
//! n-qubit state (`spec.md` §2, §5).

use crate::core::amplitude::{Amplitude, CompactUnitary, UnitaryMatrix};
use crate::core::{QDistError, StateVector};
use crate::env::Environment;
use crate::gates::{self, PhaseGateType};
use crate::observables;
use crate::precision::Real;
use crate::validate;

/// One rank's share of a partitioned `n`-qubit state vector, plus the
/// handle needed to exchange with peers for gates whose block straddles a
/// chunk boundary.
///
/// Lives through three informal states that `spec.md` §2 calls out but
/// that this type does not reify as an enum, since Rust's ownership already
/// enforces the transitions that matter: *constructed* (all amplitude in
/// `|0...0>`, produced by [`MultiQubit::new`]), *evolving* (any sequence of
/// gate calls), and *collapsed* (after [`MultiQubit::collapse_to_outcome`]
/// succeeds, every amplitude outside the measured subspace is exactly
/// zero). Nothing prevents further gate calls after a collapse; doing so is
/// well-defined, just rarely what a caller wants.
pub struct MultiQubit<'env> {
    env: &'env Environment,
    state: StateVector,
    num_qubits: usize,
}

impl<'env> MultiQubit<'env> {
    /// `createMultiQubit(numQubits)`: allocates this rank's chunk and
    /// initializes the global state to `|0...0>` (amplitude 1 at global
    /// index 0, rank 0's chunk).
    pub fn new(env: &'env Environment, num_qubits: usize) -> Result<Self, QDistError> {
        validate::check_partitioning(num_qubits, env.num_ranks()).map_err(|e| env.report_and_abort("createMultiQubit", e))?;
        let dim = 1usize << num_qubits;
        let chunk_size = dim / env.num_ranks();
        let mut state = StateVector::zeroed(env.rank(), chunk_size);
        if env.rank() == 0 {
            state.set(0, 1.0, 0.0);
        }
        Ok(Self { env, state, num_qubits })
    }

    /// The number of qubits in this state.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// This rank's id within the owning environment.
    pub fn rank(&self) -> usize {
        self.env.rank()
    }

    /// Read-only access to this rank's chunk, for diagnostics and tests.
    pub fn local_state(&self) -> &StateVector {
        &self.state
    }

    /// `compactUnitary(target, alpha, beta)`.
    pub fn compact_unitary(&mut self, target: usize, alpha: Amplitude, beta: Amplitude) -> Result<(), QDistError> {
        gates::compact_unitary(self.env, &mut self.state, self.num_qubits, target, CompactUnitary::new(alpha, beta))
    }

    /// `unitary(target, u)`.
    pub fn unitary(&mut self, target: usize, u: UnitaryMatrix) -> Result<(), QDistError> {
        gates::unitary(self.env, &mut self.state, self.num_qubits, target, u)
    }

    /// `controlledCompactUnitary(control, target, alpha, beta)`.
    pub fn controlled_compact_unitary(&mut self, control: usize, target: usize, alpha: Amplitude, beta: Amplitude) -> Result<(), QDistError> {
        gates::controlled_compact_unitary(self.env, &mut self.state, self.num_qubits, control, target, CompactUnitary::new(alpha, beta))
    }

    /// `controlledUnitary(control, target, u)`.
    pub fn controlled_unitary(&mut self, control: usize, target: usize, u: UnitaryMatrix) -> Result<(), QDistError> {
        gates::controlled_unitary(self.env, &mut self.state, self.num_qubits, control, target, u)
    }

    /// `multiControlledUnitary(controlMask, target, u)`.
    pub fn multi_controlled_unitary(&mut self, control_mask: u64, target: usize, u: UnitaryMatrix) -> Result<(), QDistError> {
        gates::multi_controlled_unitary(self.env, &mut self.state, self.num_qubits, control_mask, target, u)
    }

    /// `sigmaX(target)`.
    pub fn sigma_x(&mut self, target: usize) -> Result<(), QDistError> {
        gates::sigma_x(self.env, &mut self.state, self.num_qubits, target)
    }

    /// `sigmaY(target)`.
    pub fn sigma_y(&mut self, target: usize) -> Result<(), QDistError> {
        gates::sigma_y(self.env, &mut self.state, self.num_qubits, target)
    }

    /// `hadamard(target)`.
    pub fn hadamard(&mut self, target: usize) -> Result<(), QDistError> {
        gates::hadamard(self.env, &mut self.state, self.num_qubits, target)
    }

    /// `phaseGate(target, type)`.
    pub fn phase_gate(&mut self, target: usize, gate_type: PhaseGateType) -> Result<(), QDistError> {
        gates::phase_gate(self.env, &mut self.state, self.num_qubits, target, gate_type)
    }

    /// `controlledNot(control, target)`.
    pub fn controlled_not(&mut self, control: usize, target: usize) -> Result<(), QDistError> {
        gates::controlled_not(self.env, &mut self.state, self.num_qubits, control, target)
    }

    /// `findProbabilityOfOutcome(measureQubit, outcome)`.
    pub fn find_probability_of_outcome(&self, measure_qubit: usize, outcome: u8) -> Result<Real, QDistError> {
        observables::find_probability_of_outcome(self.env, &self.state, self.num_qubits, measure_qubit, outcome)
    }

    /// `collapseToOutcome(measureQubit, outcome)`: returns the
    /// pre-collapse probability of `outcome`.
    pub fn collapse_to_outcome(&mut self, measure_qubit: usize, outcome: u8) -> Result<Real, QDistError> {
        observables::collapse_to_outcome(self.env, &mut self.state, self.num_qubits, measure_qubit, outcome)
    }

    /// Checks `index` against this state's global dimension, routing a
    /// failure through the collective-abort path the way every other
    /// argument-domain check does.
    fn check_amp_index(&self, function_name: &str, index: usize) -> Result<(), QDistError> {
        let dim = self.state.chunk_size() * self.env.num_ranks();
        if index >= dim {
            let err = QDistError::QubitOutOfRange { index, num_qubits: self.num_qubits };
            return Err(self.env.report_and_abort(function_name, err));
        }
        Ok(())
    }

    /// `getRealAmpEl(index)`: the real part of the amplitude at global
    /// `index`, broadcast from its owning rank so every rank observes the
    /// same value.
    pub fn get_real_amp_el(&self, index: usize) -> Result<Real, QDistError> {
        self.check_amp_index("getRealAmpEl", index)?;
        let chunk_size = self.state.chunk_size();
        let owning_rank = index / chunk_size;
        let local_index = index % chunk_size;
        let mut re = if self.env.rank() == owning_rank { self.state.real()[local_index] } else { 0.0 };
        self.env.broadcast(owning_rank, &mut re)?;
        Ok(re)
    }

    /// `getImagAmpEl(index)`: the imaginary part of the amplitude at global
    /// `index`, broadcast from its owning rank so every rank observes the
    /// same value.
    pub fn get_imag_amp_el(&self, index: usize) -> Result<Real, QDistError> {
        self.check_amp_index("getImagAmpEl", index)?;
        let chunk_size = self.state.chunk_size();
        let owning_rank = index / chunk_size;
        let local_index = index % chunk_size;
        let mut im = if self.env.rank() == owning_rank { self.state.imag()[local_index] } else { 0.0 };
        self.env.broadcast(owning_rank, &mut im)?;
        Ok(im)
    }

    /// Convenience combining [`MultiQubit::get_real_amp_el`] and
    /// [`MultiQubit::get_imag_amp_el`] into one [`Amplitude`], for callers
    /// (tests, scenario assertions) that always want both parts together.
    /// Performs both broadcasts; a caller that only needs one part should
    /// call the single-part getter instead.
    pub fn amplitude_at(&self, index: usize) -> Result<Amplitude, QDistError> {
        let re = self.get_real_amp_el(index)?;
        let im = self.get_imag_amp_el(index)?;
        Ok(Amplitude::new(re, im))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_initializes_to_zero_ket() {
        Environment::run_distributed(2, |env| {
            env.initialize()?;
            let q = MultiQubit::new(env, 2)?;
            let amp0 = q.amplitude_at(0)?;
            let amp1 = q.amplitude_at(1)?;
            assert_eq!(amp0, Amplitude::new(1.0, 0.0));
            assert_eq!(amp1, Amplitude::new(0.0, 0.0));
            env.finalize()?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn rejects_rank_count_not_dividing_dimension() {
        Environment::run_distributed(4, |env| {
            let result = MultiQubit::new(env, 1);
            let partitioning_code = QDistError::InvalidPartitioning { num_qubits: 0, num_ranks: 0, reason: String::new() }.code();
            assert!(matches!(result, Err(QDistError::Aborted { code, .. }) if code == partitioning_code));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn bell_pair_gives_equal_outcome_probabilities_across_ranks() {
        let results = Environment::run_distributed(2, |env| {
            env.initialize()?;
            let mut q = MultiQubit::new(env, 2)?;
            q.hadamard(0)?;
            q.controlled_not(0, 1)?;
            let p0 = q.find_probability_of_outcome(1, 0)?;
            env.finalize()?;
            Ok(p0)
        })
        .unwrap();
        for p in results {
            assert!((p - 0.5).abs() < 1e-9);
        }
    }
}
