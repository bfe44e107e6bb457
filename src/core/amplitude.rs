//! The complex amplitude type (`spec.md` §3).

use crate::precision::Real;
use num_complex::Complex;

/// A single complex amplitude, real and imaginary parts at the build's
/// selected [`Real`] precision.
pub type Amplitude = Complex<Real>;

/// A 2x2 unitary coefficient matrix in full form (`spec.md` §3).
pub type UnitaryMatrix = [[Amplitude; 2]; 2];

/// A unitary expressed in compact `(alpha, beta)` form, representing
/// `[[alpha, -beta*], [beta, alpha*]]`, with `|alpha|^2 + |beta|^2 = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompactUnitary {
    /// The `alpha` coefficient.
    pub alpha: Amplitude,
    /// The `beta` coefficient.
    pub beta: Amplitude,
}

impl CompactUnitary {
    /// Builds a compact unitary from its two coefficients, without
    /// validating normalization. Use [`MultiQubit::compact_unitary`] for the
    /// validated public entry point.
    ///
    /// [`MultiQubit::compact_unitary`]: crate::qubit::MultiQubit::compact_unitary
    pub fn new(alpha: Amplitude, beta: Amplitude) -> Self {
        Self { alpha, beta }
    }

    /// `|alpha|^2 + |beta|^2`, which must equal 1 within tolerance.
    pub fn norm_sqr(&self) -> Real {
        self.alpha.norm_sqr() + self.beta.norm_sqr()
    }

    /// Expands to the full 2x2 matrix `[[alpha, -beta*], [beta, alpha*]]`.
    pub fn to_matrix(self) -> UnitaryMatrix {
        [
            [self.alpha, -self.beta.conj()],
            [self.beta, self.alpha.conj()],
        ]
    }
}
