//! Snapshot module - Deep, identity-preserving cloning.
//!
//! A clone has the same shape as its source: aliased nodes stay aliased,
//! cycles stay cycles, and every clone carries its source's identity.
//! Functions are dropped and computed properties become plain data.

mod cloner;

pub use cloner::*;
