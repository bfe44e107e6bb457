//! Compile-time scalar precision selection (`spec.md` §2.1, §6).
//!
//! Exactly one of the `precision-single` / `precision-double` /
//! `precision-quad` features is expected to be active; `precision-double` is
//! the crate default. All amplitudes, probabilities, and reductions use
//! [`Real`] uniformly.

#[cfg(all(feature = "precision-single", feature = "precision-quad"))]
compile_error!("enable at most one of precision-single / precision-quad (double is the implicit fallback)");

#[cfg(feature = "precision-single")]
/// The real scalar type selected at build time.
pub type Real = f32;

#[cfg(not(any(feature = "precision-single", feature = "precision-quad")))]
/// The real scalar type selected at build time.
pub type Real = f64;

#[cfg(feature = "precision-quad")]
/// The real scalar type selected at build time.
///
/// No quadruple-precision float type is available without an external crate
/// outside this codebase's dependency lineage (see `DESIGN.md`), so
/// `precision-quad` runs `f64` arithmetic under the quad-precision
/// byte-size and message-cap accounting below. This keeps the message
/// chunking discipline in `exchange` testable independent of the
/// underlying float width.
pub type Real = f64;

/// Size in bytes of one [`Real`] scalar, used to size per-precision message
/// caps (`spec.md` §4.3).
pub const SCALAR_BYTES: usize = {
    #[cfg(feature = "precision-single")]
    {
        4
    }
    #[cfg(feature = "precision-quad")]
    {
        16
    }
    #[cfg(not(any(feature = "precision-single", feature = "precision-quad")))]
    {
        8
    }
};

/// Maximum number of scalar elements carried by a single exchange message,
/// derived from a 2 GiB per-message transport limit (`spec.md` §9).
pub const MAX_MESSAGE_ELEMENTS: usize = {
    #[cfg(feature = "precision-single")]
    {
        1 << 29
    }
    #[cfg(feature = "precision-quad")]
    {
        1 << 27
    }
    #[cfg(not(any(feature = "precision-single", feature = "precision-quad")))]
    {
        1 << 28
    }
};
