//! The locality oracle: pure functions over `(chunk size, target qubit)`
//! that decide whether a gate's required block fits inside one chunk, and
//! if not, which half this chunk holds and which peer rank holds the other
//! half (`spec.md` §4.2).
//!
//! Every function here is a pure arithmetic predicate with no I/O, so they
//! are property-tested directly (see `tests/invariants.rs`) rather than
//! through the distributed dispatcher.

/// `true` iff the block for target qubit `q` (size `2 * 2^q`) fits wholly
/// inside a chunk of size `chunk_size`, i.e. every pair `(i, i ^ 2^q)`
/// needed by a single-qubit gate on `q` is local.
#[inline]
pub fn half_block_fits_in_chunk(chunk_size: usize, target_qubit: u32) -> bool {
    chunk_size > (1usize << target_qubit)
}

/// `true` iff `chunk_id`'s chunk is the *upper* half (target bit 0) of its
/// block for target qubit `q`.
///
/// Only meaningful (and only called) when
/// [`half_block_fits_in_chunk`] is `false` for the same `(chunk_size, q)` —
/// otherwise the whole block, both halves, is local and there is no "this
/// chunk's half" to speak of.
#[inline]
pub fn chunk_is_upper(chunk_id: usize, chunk_size: usize, target_qubit: u32) -> bool {
    let block_size = 2usize << target_qubit;
    let first_index = chunk_id * chunk_size;
    (first_index % block_size) < (1usize << target_qubit)
}

/// The rank holding the other half of `chunk_id`'s block for target qubit
/// `q`: `chunk_id + k` if this chunk is upper, `chunk_id - k` if lower,
/// where `k = 2^q / chunk_size`.
#[inline]
pub fn chunk_pair_id(is_upper: bool, chunk_id: usize, chunk_size: usize, target_qubit: u32) -> usize {
    let k = (1usize << target_qubit) / chunk_size;
    if is_upper {
        chunk_id + k
    } else {
        chunk_id - k
    }
}

/// Nonzero (i.e. `true`) iff `chunk_id`'s chunk sits wholly in the
/// "qubit=1" portion of its block for `measure_qubit`, meaning it
/// contributes zero to `P(measure_qubit = 0)`.
///
/// Only meaningful when the block is larger than the chunk
/// (`!half_block_fits_in_chunk`); a chunk that straddles a full block
/// contributes via the plain local summation path instead.
#[inline]
pub fn is_chunk_to_skip_in_find_p_zero(chunk_id: usize, chunk_size: usize, measure_qubit: u32) -> bool {
    !chunk_is_upper(chunk_id, chunk_size, measure_qubit)
}
