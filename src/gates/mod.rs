//! Gate dispatch: locality-aware routing from a named operation to its
//! local or distributed kernel (`spec.md` §4.4).

mod kernels;

use crate::core::amplitude::{Amplitude, CompactUnitary, UnitaryMatrix};
use crate::core::{QDistError, StateVector};
use crate::env::Environment;
use crate::exchange;
use crate::locality;
use crate::precision::Real;
use crate::validate;

/// The named phase gates `spec.md` groups under `phaseGate(state, target,
/// type)`: a fixed rotation applied to the "target=1" half of the state,
/// never requiring a rank exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseGateType {
    /// `diag(1, -1)`.
    SigmaZ,
    /// `diag(1, i)`.
    S,
    /// `diag(1, e^{i*pi/4})`.
    T,
}

impl PhaseGateType {
    fn phase(self) -> Amplitude {
        match self {
            PhaseGateType::SigmaZ => Amplitude::new(-1.0, 0.0),
            PhaseGateType::S => Amplitude::new(0.0, 1.0),
            PhaseGateType::T => {
                let angle = std::f64::consts::FRAC_PI_4 as Real;
                Amplitude::new(angle.cos(), angle.sin())
            }
        }
    }
}

/// Runs `local_fn` if the block for `target` fits in this chunk; otherwise
/// exchanges with the pair rank and runs `distributed_fn` (`spec.md` §4.4's
/// six-step dispatch template, with steps 1-2 and 4 here and steps 3/5/6
/// delegated to the two closures).
fn dispatch_single_qubit<L, D>(env: &Environment, state: &mut StateVector, target: usize, local_fn: L, distributed_fn: D) -> Result<(), QDistError>
where
    L: FnOnce(&mut [Real], &mut [Real]),
    D: FnOnce(&mut [Real], &mut [Real], &[Real], &[Real], bool),
{
    let target = target as u32;
    let chunk_size = state.chunk_size();
    if locality::half_block_fits_in_chunk(chunk_size, target) {
        let (local_re, local_im) = state.real_imag_mut();
        local_fn(local_re, local_im);
        return Ok(());
    }
    let is_upper = locality::chunk_is_upper(state.chunk_id(), chunk_size, target);
    let peer = locality::chunk_pair_id(is_upper, state.chunk_id(), chunk_size, target);
    exchange::exchange_with_peer(env, state, peer)?;
    let (local_re, local_im, pair_re, pair_im) = state.local_mut_and_pair();
    distributed_fn(local_re, local_im, pair_re, pair_im, is_upper);
    Ok(())
}

/// `rot1`/`rot2` for the distributed kernel: `(u[0][0], u[0][1])` when this
/// chunk is upper, `(u[1][0], u[1][1])` when lower (`spec.md` §4.4 step 5).
fn rotation_pair(u: UnitaryMatrix, is_upper: bool) -> (Amplitude, Amplitude) {
    if is_upper {
        (u[0][0], u[0][1])
    } else {
        (u[1][0], u[1][1])
    }
}

fn apply_unitary(env: &Environment, state: &mut StateVector, target: usize, u: UnitaryMatrix) -> Result<(), QDistError> {
    let kernel = kernels::default_kernel();
    dispatch_single_qubit(
        env,
        state,
        target,
        |real, imag| kernel.apply_unitary_local(real, imag, target as u32, u),
        |local_re, local_im, pair_re, pair_im, is_upper| {
            let (rot1, rot2) = rotation_pair(u, is_upper);
            kernels::apply_unitary_distributed(local_re, local_im, pair_re, pair_im, is_upper, rot1, rot2);
        },
    )
}

fn apply_controlled_unitary(env: &Environment, state: &mut StateVector, control: usize, target: usize, u: UnitaryMatrix) -> Result<(), QDistError> {
    let chunk_size = state.chunk_size();
    let chunk_base = state.chunk_id() * chunk_size;
    dispatch_single_qubit(
        env,
        state,
        target,
        |real, imag| kernels::apply_controlled_unitary_local(real, imag, target as u32, control as u32, chunk_base, u),
        |local_re, local_im, pair_re, pair_im, is_upper| {
            let (rot1, rot2) = rotation_pair(u, is_upper);
            kernels::apply_controlled_unitary_distributed(local_re, local_im, pair_re, pair_im, is_upper, control as u32, chunk_base, rot1, rot2);
        },
    )
}

fn apply_multi_controlled_unitary(env: &Environment, state: &mut StateVector, mask: u64, target: usize, u: UnitaryMatrix) -> Result<(), QDistError> {
    let chunk_size = state.chunk_size();
    let chunk_base = state.chunk_id() * chunk_size;
    dispatch_single_qubit(
        env,
        state,
        target,
        |real, imag| kernels::apply_multi_controlled_unitary_local(real, imag, target as u32, mask, chunk_base, u),
        |local_re, local_im, pair_re, pair_im, is_upper| {
            let (rot1, rot2) = rotation_pair(u, is_upper);
            kernels::apply_multi_controlled_unitary_distributed(local_re, local_im, pair_re, pair_im, is_upper, mask, chunk_base, rot1, rot2);
        },
    )
}

/// `compactUnitary(state, target, alpha, beta)`.
pub(crate) fn compact_unitary(env: &Environment, state: &mut StateVector, num_qubits: usize, target: usize, coeffs: CompactUnitary) -> Result<(), QDistError> {
    validate::check_qubit_range(target, num_qubits).map_err(|e| env.report_and_abort("compactUnitary", e))?;
    validate::check_compact_normalized(&coeffs).map_err(|e| env.report_and_abort("compactUnitary", e))?;
    apply_unitary(env, state, target, coeffs.to_matrix())
}

/// `unitary(state, target, u)`.
pub(crate) fn unitary(env: &Environment, state: &mut StateVector, num_qubits: usize, target: usize, u: UnitaryMatrix) -> Result<(), QDistError> {
    validate::check_qubit_range(target, num_qubits).map_err(|e| env.report_and_abort("unitary", e))?;
    validate::check_unitary(&u).map_err(|e| env.report_and_abort("unitary", e))?;
    apply_unitary(env, state, target, u)
}

/// `controlledCompactUnitary(state, control, target, alpha, beta)`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn controlled_compact_unitary(
    env: &Environment,
    state: &mut StateVector,
    num_qubits: usize,
    control: usize,
    target: usize,
    coeffs: CompactUnitary,
) -> Result<(), QDistError> {
    validate::check_qubit_range(control, num_qubits).map_err(|e| env.report_and_abort("controlledCompactUnitary", e))?;
    validate::check_qubit_range(target, num_qubits).map_err(|e| env.report_and_abort("controlledCompactUnitary", e))?;
    validate::check_control_ne_target(control, target).map_err(|e| env.report_and_abort("controlledCompactUnitary", e))?;
    validate::check_compact_normalized(&coeffs).map_err(|e| env.report_and_abort("controlledCompactUnitary", e))?;
    apply_controlled_unitary(env, state, control, target, coeffs.to_matrix())
}

/// `controlledUnitary(state, control, target, u)`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn controlled_unitary(
    env: &Environment,
    state: &mut StateVector,
    num_qubits: usize,
    control: usize,
    target: usize,
    u: UnitaryMatrix,
) -> Result<(), QDistError> {
    validate::check_qubit_range(control, num_qubits).map_err(|e| env.report_and_abort("controlledUnitary", e))?;
    validate::check_qubit_range(target, num_qubits).map_err(|e| env.report_and_abort("controlledUnitary", e))?;
    validate::check_control_ne_target(control, target).map_err(|e| env.report_and_abort("controlledUnitary", e))?;
    validate::check_unitary(&u).map_err(|e| env.report_and_abort("controlledUnitary", e))?;
    apply_controlled_unitary(env, state, control, target, u)
}

/// `multiControlledUnitary(state, controlMask, target, u)`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn multi_controlled_unitary(
    env: &Environment,
    state: &mut StateVector,
    num_qubits: usize,
    control_mask: u64,
    target: usize,
    u: UnitaryMatrix,
) -> Result<(), QDistError> {
    validate::check_qubit_range(target, num_qubits).map_err(|e| env.report_and_abort("multiControlledUnitary", e))?;
    validate::check_control_mask(control_mask, target, num_qubits).map_err(|e| env.report_and_abort("multiControlledUnitary", e))?;
    validate::check_unitary(&u).map_err(|e| env.report_and_abort("multiControlledUnitary", e))?;
    apply_multi_controlled_unitary(env, state, control_mask, target, u)
}

/// `sigmaX(state, target)`: the Pauli-X gate, dispatched through the
/// coefficient-free swap kernel (`spec.md` §4.4).
pub(crate) fn sigma_x(env: &Environment, state: &mut StateVector, num_qubits: usize, target: usize) -> Result<(), QDistError> {
    validate::check_qubit_range(target, num_qubits).map_err(|e| env.report_and_abort("sigmaX", e))?;
    dispatch_single_qubit(
        env,
        state,
        target,
        |real, imag| kernels::apply_sigma_x_local(real, imag, target as u32),
        |local_re, local_im, pair_re, pair_im, _is_upper| kernels::apply_sigma_x_distributed(local_re, local_im, pair_re, pair_im),
    )
}

/// `sigmaY(state, target)`: the Pauli-Y gate, using the fixed `±i`
/// distributed rotation.
pub(crate) fn sigma_y(env: &Environment, state: &mut StateVector, num_qubits: usize, target: usize) -> Result<(), QDistError> {
    validate::check_qubit_range(target, num_qubits).map_err(|e| env.report_and_abort("sigmaY", e))?;
    let y: UnitaryMatrix = [
        [Amplitude::new(0.0, 0.0), Amplitude::new(0.0, -1.0)],
        [Amplitude::new(0.0, 1.0), Amplitude::new(0.0, 0.0)],
    ];
    let kernel = kernels::default_kernel();
    dispatch_single_qubit(
        env,
        state,
        target,
        |real, imag| kernel.apply_unitary_local(real, imag, target as u32, y),
        |local_re, local_im, pair_re, pair_im, is_upper| kernels::apply_sigma_y_distributed(local_re, local_im, pair_re, pair_im, is_upper),
    )
}

/// `hadamard(state, target)`.
pub(crate) fn hadamard(env: &Environment, state: &mut StateVector, num_qubits: usize, target: usize) -> Result<(), QDistError> {
    validate::check_qubit_range(target, num_qubits).map_err(|e| env.report_and_abort("hadamard", e))?;
    let s = std::f64::consts::FRAC_1_SQRT_2 as Real;
    let h: UnitaryMatrix = [
        [Amplitude::new(s, 0.0), Amplitude::new(s, 0.0)],
        [Amplitude::new(s, 0.0), Amplitude::new(-s, 0.0)],
    ];
    apply_unitary(env, state, target, h)
}

/// `phaseGate(state, target, type)`: never exchanges, since the gate is
/// diagonal in the computational basis (`spec.md` §4.4). `env` is used only
/// to route a validation failure through the collective-abort path; no
/// collective or pairwise operation is performed on the success path.
pub(crate) fn phase_gate(env: &Environment, state: &mut StateVector, num_qubits: usize, target: usize, gate_type: PhaseGateType) -> Result<(), QDistError> {
    validate::check_qubit_range(target, num_qubits).map_err(|e| env.report_and_abort("phaseGate", e))?;
    let phase = gate_type.phase();
    let target_bit = target as u32;
    let chunk_size = state.chunk_size();
    if locality::half_block_fits_in_chunk(chunk_size, target_bit) {
        let (local_re, local_im) = state.real_imag_mut();
        kernels::apply_phase_local(local_re, local_im, target_bit, phase);
        return Ok(());
    }
    let is_upper = locality::chunk_is_upper(state.chunk_id(), chunk_size, target_bit);
    if !is_upper {
        let (local_re, local_im) = state.real_imag_mut();
        kernels::apply_phase_whole_chunk(local_re, local_im, phase);
    }
    Ok(())
}

/// `controlledNot(state, control, target)`.
pub(crate) fn controlled_not(env: &Environment, state: &mut StateVector, num_qubits: usize, control: usize, target: usize) -> Result<(), QDistError> {
    validate::check_qubit_range(control, num_qubits).map_err(|e| env.report_and_abort("controlledNot", e))?;
    validate::check_qubit_range(target, num_qubits).map_err(|e| env.report_and_abort("controlledNot", e))?;
    validate::check_control_ne_target(control, target).map_err(|e| env.report_and_abort("controlledNot", e))?;
    let chunk_size = state.chunk_size();
    let chunk_base = state.chunk_id() * chunk_size;
    dispatch_single_qubit(
        env,
        state,
        target,
        |real, imag| kernels::apply_controlled_not_local(real, imag, target as u32, control as u32, chunk_base),
        |local_re, local_im, pair_re, pair_im, _is_upper| kernels::apply_controlled_not_distributed(local_re, local_im, pair_re, pair_im, control as u32, chunk_base),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StateVector;

    fn single_rank_state(n: u32, basis_index: usize) -> StateVector {
        let mut state = StateVector::zeroed(0, 1 << n);
        state.set(basis_index, 1.0, 0.0);
        state
    }

    fn run<F>(body: F)
    where
        F: Fn(&Environment, &mut StateVector) -> Result<(), QDistError> + Send + Sync + 'static,
    {
        Environment::run_distributed(1, move |env| {
            env.initialize()?;
            let mut state = single_rank_state(1, 0);
            body(env, &mut state)?;
            env.finalize()?;
            assert!((state.real()[0].powi(2) + state.imag()[0].powi(2) + state.real()[1].powi(2) + state.imag()[1].powi(2) - 1.0).abs() < 1e-9);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn hadamard_on_single_rank_preserves_norm() {
        run(|env, state| hadamard(env, state, 1, 0));
    }

    #[test]
    fn sigma_x_on_single_rank_flips_basis_state() {
        Environment::run_distributed(1, |env| {
            env.initialize()?;
            let mut state = single_rank_state(1, 0);
            sigma_x(env, &mut state, 1, 0)?;
            assert_eq!(state.real(), &[0.0, 1.0]);
            env.finalize()?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn controlled_not_is_noop_when_control_is_zero() {
        Environment::run_distributed(1, |env| {
            env.initialize()?;
            let mut state = single_rank_state(2, 0b00);
            controlled_not(env, &mut state, 2, 1, 0)?;
            assert_eq!(state.real(), &[1.0, 0.0, 0.0, 0.0]);
            env.finalize()?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn controlled_not_flips_target_when_control_is_one() {
        Environment::run_distributed(1, |env| {
            env.initialize()?;
            let mut state = single_rank_state(2, 0b10);
            controlled_not(env, &mut state, 2, 1, 0)?;
            assert_eq!(state.real(), &[0.0, 0.0, 0.0, 1.0]);
            env.finalize()?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn phase_gate_s_multiplies_target_one_amplitude_by_i() {
        Environment::run_distributed(1, |env| {
            env.initialize()?;
            let mut state = single_rank_state(1, 1);
            phase_gate(env, &mut state, 1, 0, PhaseGateType::S)?;
            assert_eq!((state.real()[1], state.imag()[1]), (0.0, 1.0));
            env.finalize()?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn multi_controlled_unitary_rejects_mask_at_exclusive_bound() {
        Environment::run_distributed(1, |env| {
            env.initialize()?;
            let mut state = single_rank_state(3, 0);
            let x: UnitaryMatrix = [
                [Amplitude::new(0.0, 0.0), Amplitude::new(1.0, 0.0)],
                [Amplitude::new(1.0, 0.0), Amplitude::new(0.0, 0.0)],
            ];
            let result = multi_controlled_unitary(env, &mut state, 3, 0b111, 0, x);
            assert!(matches!(result, Err(QDistError::Aborted { code, .. }) if code == QDistError::InvalidControlMask { mask: 0, reason: String::new() }.code()));
            env.finalize()?;
            Ok(())
        })
        .unwrap();
    }
}
