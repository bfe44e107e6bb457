//! The partitioned state container (`spec.md` §3).

use crate::precision::Real;

/// One rank's contiguous chunk of the global amplitude vector, plus the
/// equally-sized pair buffer used as the receive side of peer exchanges.
///
/// Real and imaginary components are stored as parallel arrays, matching
/// the layout an underlying serial kernel expects to index directly
/// (`spec.md` §3: "Real and imaginary components are stored as two
/// parallel arrays of C scalars").
#[derive(Debug, Clone)]
pub struct StateVector {
    /// This rank's `chunkId`, i.e. `r` in `[r*C, (r+1)*C)`.
    chunk_id: usize,
    /// The chunk size `C = 2^n / R`.
    chunk_size: usize,
    real: Vec<Real>,
    imag: Vec<Real>,
    pair_real: Vec<Real>,
    pair_imag: Vec<Real>,
}

impl StateVector {
    /// Allocates a chunk of `chunk_size` amplitudes (plus pair buffer) for
    /// `chunk_id`, initialized to all-zero.
    pub(crate) fn zeroed(chunk_id: usize, chunk_size: usize) -> Self {
        Self {
            chunk_id,
            chunk_size,
            real: vec![0.0; chunk_size],
            imag: vec![0.0; chunk_size],
            pair_real: vec![0.0; chunk_size],
            pair_imag: vec![0.0; chunk_size],
        }
    }

    /// This rank's chunk id.
    pub fn chunk_id(&self) -> usize {
        self.chunk_id
    }

    /// The chunk size `C`.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Read-only access to the local real-part array.
    pub fn real(&self) -> &[Real] {
        &self.real
    }

    /// Read-only access to the local imaginary-part array.
    pub fn imag(&self) -> &[Real] {
        &self.imag
    }

    /// Mutable access to the local real-part array.
    pub fn real_mut(&mut self) -> &mut [Real] {
        &mut self.real
    }

    /// Mutable access to the local imaginary-part array.
    pub fn imag_mut(&mut self) -> &mut [Real] {
        &mut self.imag
    }

    /// Read-only access to the pair buffer's real-part array (the receive
    /// side of the most recent exchange).
    pub fn pair_real(&self) -> &[Real] {
        &self.pair_real
    }

    /// Read-only access to the pair buffer's imaginary-part array.
    pub fn pair_imag(&self) -> &[Real] {
        &self.pair_imag
    }

    /// Mutable access to the pair buffer's real-part array, written only by
    /// the exchange protocol.
    pub(crate) fn pair_real_mut(&mut self) -> &mut [Real] {
        &mut self.pair_real
    }

    /// Mutable access to the pair buffer's imaginary-part array.
    pub(crate) fn pair_imag_mut(&mut self) -> &mut [Real] {
        &mut self.pair_imag
    }

    /// Sets amplitude `local_index` within this chunk to `(re, im)`.
    pub(crate) fn set(&mut self, local_index: usize, re: Real, im: Real) {
        self.real[local_index] = re;
        self.imag[local_index] = im;
    }

    /// The global index of this chunk's local index `local_index`.
    pub fn global_index(&self, local_index: usize) -> usize {
        self.chunk_id * self.chunk_size + local_index
    }

    /// Splits into the local real array and the pair buffer's real array,
    /// borrowed simultaneously, for the exchange protocol to send one and
    /// fill the other.
    pub(crate) fn real_and_pair_mut(&mut self) -> (&[Real], &mut [Real]) {
        (&self.real, &mut self.pair_real)
    }

    /// Splits into the local imaginary array and the pair buffer's
    /// imaginary array.
    pub(crate) fn imag_and_pair_mut(&mut self) -> (&[Real], &mut [Real]) {
        (&self.imag, &mut self.pair_imag)
    }

    /// Splits into the local real/imag arrays (mutable, as the kernel's
    /// output) and the pair buffer's real/imag arrays (read-only), for the
    /// distributed kernels that write into the local chunk while reading
    /// both halves of the block.
    pub(crate) fn local_mut_and_pair(&mut self) -> (&mut [Real], &mut [Real], &[Real], &[Real]) {
        (&mut self.real, &mut self.imag, &self.pair_real, &self.pair_imag)
    }

    /// Splits into the local real and imaginary arrays, borrowed
    /// simultaneously, for kernels that take both as separate `&mut`
    /// parameters.
    pub(crate) fn real_imag_mut(&mut self) -> (&mut [Real], &mut [Real]) {
        (&mut self.real, &mut self.imag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_chunk_has_expected_shape() {
        let sv = StateVector::zeroed(1, 4);
        assert_eq!(sv.chunk_size(), 4);
        assert_eq!(sv.real().len(), 4);
        assert_eq!(sv.pair_real().len(), 4);
        assert_eq!(sv.global_index(2), 6);
    }
}
