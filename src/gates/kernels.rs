//! The per-chunk arithmetic kernels: in-place updates of a contiguous
//! amplitude segment given a target bit, optional control bits, and either
//! a matched local pair or a received pair buffer.
//!
//! `spec.md` §1 treats these loops as external collaborators ("the serial
//! arithmetic kernels ... are pure loops, possibly thread- or
//! GPU-parallelized"); this crate ships the one concrete sequential
//! implementation plus an optional `rayon`-parallel one behind
//! `backend-threaded`, and leaves a GPU kernel undefined. The index
//! arithmetic below is grounded on the teacher's
//! `SimulationEngine::apply_single_qdu_gate` bit-splitting loop
//! (`examples/kn0sys-onq/src/simulation/engine.rs`), generalized from a
//! single in-process state vector to one rank's chunk.

use crate::core::amplitude::{Amplitude, UnitaryMatrix};
use crate::precision::Real;

#[cfg(feature = "backend-threaded")]
use rayon::prelude::*;

/// The seam between the gate dispatcher and the per-chunk arithmetic loop
/// that applies a single-qubit unitary to a fully local block. `spec.md`
/// §1 treats the underlying loop as an external collaborator,
/// "possibly thread- or GPU-parallelized"; this trait is that interface.
/// [`SequentialKernel`] is the one implementation every build carries;
/// [`ThreadedKernel`] is the `rayon`-backed alternative selected by the
/// `backend-threaded` feature.
pub(crate) trait Kernel: Send + Sync {
    /// Applies `u` to every `(i0, i1)` pair in a fully local block, in
    /// place.
    fn apply_unitary_local(&self, real: &mut [Real], imag: &mut [Real], target: u32, u: UnitaryMatrix);
}

/// The plain sequential kernel, used whenever `backend-threaded` is not
/// enabled and as the baseline every test in this crate runs against.
pub(crate) struct SequentialKernel;

impl Kernel for SequentialKernel {
    fn apply_unitary_local(&self, real: &mut [Real], imag: &mut [Real], target: u32, u: UnitaryMatrix) {
        apply_unitary_local(real, imag, target, u)
    }
}

/// A `rayon`-parallel kernel for chunks large enough that splitting the
/// pair loop across threads outweighs its overhead. Selected in place of
/// [`SequentialKernel`] when `backend-threaded` is enabled.
#[cfg(feature = "backend-threaded")]
pub(crate) struct ThreadedKernel;

#[cfg(feature = "backend-threaded")]
impl Kernel for ThreadedKernel {
    fn apply_unitary_local(&self, real: &mut [Real], imag: &mut [Real], target: u32, u: UnitaryMatrix) {
        apply_unitary_local_threaded(real, imag, target, u)
    }
}

/// The active [`Kernel`] for this build: [`ThreadedKernel`] under
/// `backend-threaded`, [`SequentialKernel`] otherwise.
#[cfg(feature = "backend-threaded")]
pub(crate) fn default_kernel() -> &'static dyn Kernel {
    &ThreadedKernel
}

/// The active [`Kernel`] for this build: [`ThreadedKernel`] under
/// `backend-threaded`, [`SequentialKernel`] otherwise.
#[cfg(not(feature = "backend-threaded"))]
pub(crate) fn default_kernel() -> &'static dyn Kernel {
    &SequentialKernel
}

/// A per-chunk kernel offloaded to an accelerator. Declared as the seam
/// `spec.md` §1 names ("a GPU kernel is declared as a trait but not
/// implemented") for a future `backend-accelerator` implementation; no
/// type in this crate implements it yet.
#[allow(dead_code)]
pub(crate) trait AcceleratorKernel: Kernel {}

/// Splits `0..dim/2` into the index pairs `(i0, i1)` that a single-qubit
/// gate on `target` pairs, where `i1 = i0 | (1 << target)`.
#[inline]
fn pair_indices(dim: usize, target: u32) -> impl Iterator<Item = (usize, usize)> + Clone {
    let k_mask = 1usize << target;
    let lower_mask = k_mask - 1;
    (0..dim / 2).map(move |i| {
        let i0 = ((i & !lower_mask) << 1) | (i & lower_mask);
        (i0, i0 | k_mask)
    })
}

/// Applies full 2x2 matrix `u` to every `(i0, i1)` pair in a fully local
/// block, in place.
pub(crate) fn apply_unitary_local(real: &mut [Real], imag: &mut [Real], target: u32, u: UnitaryMatrix) {
    for (i0, i1) in pair_indices(real.len(), target) {
        let psi0 = Amplitude::new(real[i0], imag[i0]);
        let psi1 = Amplitude::new(real[i1], imag[i1]);
        let new0 = u[0][0] * psi0 + u[0][1] * psi1;
        let new1 = u[1][0] * psi0 + u[1][1] * psi1;
        real[i0] = new0.re;
        imag[i0] = new0.im;
        real[i1] = new1.re;
        imag[i1] = new1.im;
    }
}

/// As [`apply_unitary_local`], but skips any pair whose `control` bit
/// (taken from the pair's global index, `chunk_base + i0`) is not set.
pub(crate) fn apply_controlled_unitary_local(
    real: &mut [Real],
    imag: &mut [Real],
    target: u32,
    control: u32,
    chunk_base: usize,
    u: UnitaryMatrix,
) {
    let control_mask = 1usize << control;
    for (i0, i1) in pair_indices(real.len(), target) {
        if (chunk_base + i0) & control_mask == 0 {
            continue;
        }
        let psi0 = Amplitude::new(real[i0], imag[i0]);
        let psi1 = Amplitude::new(real[i1], imag[i1]);
        let new0 = u[0][0] * psi0 + u[0][1] * psi1;
        let new1 = u[1][0] * psi0 + u[1][1] * psi1;
        real[i0] = new0.re;
        imag[i0] = new0.im;
        real[i1] = new1.re;
        imag[i1] = new1.im;
    }
}

/// As [`apply_unitary_local`], but skips any pair whose global index does
/// not have every bit in `mask` set.
pub(crate) fn apply_multi_controlled_unitary_local(
    real: &mut [Real],
    imag: &mut [Real],
    target: u32,
    mask: u64,
    chunk_base: usize,
    u: UnitaryMatrix,
) {
    for (i0, i1) in pair_indices(real.len(), target) {
        if (chunk_base + i0) as u64 & mask != mask {
            continue;
        }
        let psi0 = Amplitude::new(real[i0], imag[i0]);
        let psi1 = Amplitude::new(real[i1], imag[i1]);
        let new0 = u[0][0] * psi0 + u[0][1] * psi1;
        let new1 = u[1][0] * psi0 + u[1][1] * psi1;
        real[i0] = new0.re;
        imag[i0] = new0.im;
        real[i1] = new1.re;
        imag[i1] = new1.im;
    }
}

/// Distributed kernel: writes `local = rot1*upper + rot2*lower` in place,
/// where `(upper, lower)` is `(local, pair)` if `is_upper`, else `(pair,
/// local)` (`spec.md` §4.4 step 6 buffer ordering).
pub(crate) fn apply_unitary_distributed(
    local_re: &mut [Real],
    local_im: &mut [Real],
    pair_re: &[Real],
    pair_im: &[Real],
    is_upper: bool,
    rot1: Amplitude,
    rot2: Amplitude,
) {
    for i in 0..local_re.len() {
        let local_amp = Amplitude::new(local_re[i], local_im[i]);
        let pair_amp = Amplitude::new(pair_re[i], pair_im[i]);
        let new_amp = if is_upper { rot1 * local_amp + rot2 * pair_amp } else { rot1 * pair_amp + rot2 * local_amp };
        local_re[i] = new_amp.re;
        local_im[i] = new_amp.im;
    }
}

/// As [`apply_unitary_distributed`], but leaves `local[i]` untouched
/// whenever `control`'s bit is clear in this rank's global index for `i`.
pub(crate) fn apply_controlled_unitary_distributed(
    local_re: &mut [Real],
    local_im: &mut [Real],
    pair_re: &[Real],
    pair_im: &[Real],
    is_upper: bool,
    control: u32,
    chunk_base: usize,
    rot1: Amplitude,
    rot2: Amplitude,
) {
    let control_mask = 1usize << control;
    for i in 0..local_re.len() {
        if (chunk_base + i) & control_mask == 0 {
            continue;
        }
        let local_amp = Amplitude::new(local_re[i], local_im[i]);
        let pair_amp = Amplitude::new(pair_re[i], pair_im[i]);
        let new_amp = if is_upper { rot1 * local_amp + rot2 * pair_amp } else { rot1 * pair_amp + rot2 * local_amp };
        local_re[i] = new_amp.re;
        local_im[i] = new_amp.im;
    }
}

/// As [`apply_unitary_distributed`], gated on every bit of `mask`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_multi_controlled_unitary_distributed(
    local_re: &mut [Real],
    local_im: &mut [Real],
    pair_re: &[Real],
    pair_im: &[Real],
    is_upper: bool,
    mask: u64,
    chunk_base: usize,
    rot1: Amplitude,
    rot2: Amplitude,
) {
    for i in 0..local_re.len() {
        if (chunk_base + i) as u64 & mask != mask {
            continue;
        }
        let local_amp = Amplitude::new(local_re[i], local_im[i]);
        let pair_amp = Amplitude::new(pair_re[i], pair_im[i]);
        let new_amp = if is_upper { rot1 * local_amp + rot2 * pair_amp } else { rot1 * pair_amp + rot2 * local_amp };
        local_re[i] = new_amp.re;
        local_im[i] = new_amp.im;
    }
}

/// `sigmaX`'s local kernel: swaps each `(i0, i1)` pair. No coefficient
/// multiplication is needed (`spec.md` §4.4: "sigmaX, controlledNot need no
/// coefficient rewriting").
pub(crate) fn apply_sigma_x_local(real: &mut [Real], imag: &mut [Real], target: u32) {
    for (i0, i1) in pair_indices(real.len(), target) {
        real.swap(i0, i1);
        imag.swap(i0, i1);
    }
}

/// `sigmaX`'s distributed kernel: the entire local chunk is overwritten by
/// the pair buffer, unconditionally.
pub(crate) fn apply_sigma_x_distributed(local_re: &mut [Real], local_im: &mut [Real], pair_re: &[Real], pair_im: &[Real]) {
    local_re.copy_from_slice(pair_re);
    local_im.copy_from_slice(pair_im);
}

/// `controlledNot`'s local kernel: swaps `(i0, i1)` only where `control`'s
/// bit is set.
pub(crate) fn apply_controlled_not_local(real: &mut [Real], imag: &mut [Real], target: u32, control: u32, chunk_base: usize) {
    let control_mask = 1usize << control;
    for (i0, i1) in pair_indices(real.len(), target) {
        if (chunk_base + i0) & control_mask == 0 {
            continue;
        }
        real.swap(i0, i1);
        imag.swap(i0, i1);
    }
}

/// `controlledNot`'s distributed kernel: overwrites `local[i]` with
/// `pair[i]` only where `control`'s bit is set in this rank's global index
/// for `i`.
pub(crate) fn apply_controlled_not_distributed(
    local_re: &mut [Real],
    local_im: &mut [Real],
    pair_re: &[Real],
    pair_im: &[Real],
    control: u32,
    chunk_base: usize,
) {
    let control_mask = 1usize << control;
    for i in 0..local_re.len() {
        if (chunk_base + i) & control_mask == 0 {
            continue;
        }
        local_re[i] = pair_re[i];
        local_im[i] = pair_im[i];
    }
}

/// `sigmaY`'s distributed kernel: `local[i] = -i * pair[i]` on the upper
/// half, `+i * pair[i]` on the lower half (`spec.md` §4.4: "sigmaY requires
/// isUpper to be passed to the distributed kernel so it applies the
/// correct sign of i").
pub(crate) fn apply_sigma_y_distributed(local_re: &mut [Real], local_im: &mut [Real], pair_re: &[Real], pair_im: &[Real], is_upper: bool) {
    let sign: Real = if is_upper { -1.0 } else { 1.0 };
    for i in 0..local_re.len() {
        // sign * i * (pair_re + i*pair_im) = sign * (-pair_im + i*pair_re)
        local_re[i] = -sign * pair_im[i];
        local_im[i] = sign * pair_re[i];
    }
}

/// `phaseGate`'s local kernel: multiplies every amplitude with `target`'s
/// bit set by `phase`, leaving the rest untouched.
pub(crate) fn apply_phase_local(real: &mut [Real], imag: &mut [Real], target: u32, phase: Amplitude) {
    let mask = 1usize << target;
    for i in 0..real.len() {
        if i & mask == 0 {
            continue;
        }
        let amp = Amplitude::new(real[i], imag[i]) * phase;
        real[i] = amp.re;
        imag[i] = amp.im;
    }
}

/// `phaseGate`'s distributed kernel for a chunk wholly in the "target=1"
/// half of its block: multiplies every local amplitude by `phase`
/// (`spec.md` §4.4: "if the chunk is upper, it is a no-op; if lower, it
/// applies a diagonal factor locally").
pub(crate) fn apply_phase_whole_chunk(real: &mut [Real], imag: &mut [Real], phase: Amplitude) {
    for i in 0..real.len() {
        let amp = Amplitude::new(real[i], imag[i]) * phase;
        real[i] = amp.re;
        imag[i] = amp.im;
    }
}

/// Thread-parallel counterpart of [`apply_unitary_local`], spawned via
/// `rayon`'s chunked iteration when `backend-threaded` is enabled.
/// `spec.md` treats this backend as an external, build-time-selected
/// collaborator; this is the one concrete implementation the core ships.
#[cfg(feature = "backend-threaded")]
pub(crate) fn apply_unitary_local_threaded(real: &mut [Real], imag: &mut [Real], target: u32, u: UnitaryMatrix) {
    let pairs: Vec<(usize, usize)> = pair_indices(real.len(), target).collect();
    let mut outputs: Vec<(Real, Real, Real, Real)> = pairs
        .par_iter()
        .map(|&(i0, i1)| {
            let psi0 = Amplitude::new(real[i0], imag[i0]);
            let psi1 = Amplitude::new(real[i1], imag[i1]);
            let new0 = u[0][0] * psi0 + u[0][1] * psi1;
            let new1 = u[1][0] * psi0 + u[1][1] * psi1;
            (new0.re, new0.im, new1.re, new1.im)
        })
        .collect();
    for ((i0, i1), (r0, im0, r1, im1)) in pairs.into_iter().zip(outputs.drain(..)) {
        real[i0] = r0;
        imag[i0] = im0;
        real[i1] = r1;
        imag[i1] = im1;
    }
}
