//! Foundation types for the Basalt ledger object store.
//!
//! Every other Basalt crate depends on `basalt-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Content-addressed identifier (BLAKE3 digest of an
//!   object's payload)
//! - [`TypeError`] — Parse and conversion failures

pub mod error;
pub mod hash;

pub use error::TypeError;
pub use hash::ObjectId;
