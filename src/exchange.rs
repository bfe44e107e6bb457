//! The pairwise rank-exchange protocol (`spec.md` §4.3).
//!
//! Exchanges this rank's entire state vector (real array, then imaginary
//! array) with a peer's, placing the peer's data in this rank's pair
//! buffer. Each array is split into messages of at most
//! [`MAX_MESSAGE_ELEMENTS`](crate::precision::MAX_MESSAGE_ELEMENTS)
//! elements (and never more than the chunk size) to bound peak transport
//! buffering, matching the per-precision message cap discipline.

use crate::core::{QDistError, StateVector};
use crate::env::Environment;
use crate::precision::{Real, MAX_MESSAGE_ELEMENTS};

/// Exchanges one array (`send`/`recv` of equal length) with `peer`, in
/// chunks of at most [`MAX_MESSAGE_ELEMENTS`] elements.
fn exchange_array(env: &Environment, peer: usize, send: &[Real], recv: &mut [Real]) -> Result<(), QDistError> {
    debug_assert_eq!(send.len(), recv.len());
    if send.is_empty() {
        return Ok(());
    }
    let message_cap = MAX_MESSAGE_ELEMENTS.min(send.len());
    let mut offset = 0;
    while offset < send.len() {
        let len = message_cap.min(send.len() - offset);
        env.transport().send_recv(peer, &send[offset..offset + len], &mut recv[offset..offset + len])?;
        offset += len;
    }
    Ok(())
}

/// Exchanges `state`'s entire chunk with `peer`, real array first, then
/// imaginary, as two separate send/receive rounds (`spec.md` §4.3: "The
/// real and imaginary arrays are exchanged in separate send-receive rounds
/// to bound peak transport buffering").
pub(crate) fn exchange_with_peer(env: &Environment, state: &mut StateVector, peer: usize) -> Result<(), QDistError> {
    let (real, pair_real) = state.real_and_pair_mut();
    exchange_array(env, peer, real, pair_real)?;
    let (imag, pair_imag) = state.imag_and_pair_mut();
    exchange_array(env, peer, imag, pair_imag)?;
    Ok(())
}
