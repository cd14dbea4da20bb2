//! Cryptographic core for the Salvium wallet: Ed25519/X25519 arithmetic,
//! Elligator2 hash-to-point, Pedersen commitments, CLSAG/TCLSAG ring
//! signatures, Bulletproofs+ range proofs, and the legacy-CryptoNote and
//! CARROT output derivations.
//!
//! Canonical encodings: scalars are 32 LE bytes in [0, L); points are
//! compressed Edwards y with the x sign in bit 255. All decoding from
//! untrusted bytes returns [`CryptoError`] rather than panicking.

pub mod bulletproofs_plus;
pub mod carrot;
pub mod carrot_scan;
pub mod clsag;
pub mod curve;
pub mod derive;
pub mod error;
pub mod field;
pub mod hash;
pub mod hash2point;
pub mod pedersen;
pub mod subaddress;
pub mod tclsag;
pub mod x25519;

pub use curve25519_dalek::edwards::EdwardsPoint;
pub use curve25519_dalek::scalar::Scalar;

pub use error::CryptoError;
pub use hash::{blake2b, blake2b_keyed, keccak256, sha256};
pub use hash2point::hash_to_point;
