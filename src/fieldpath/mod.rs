//! Field path module - Locations of nodes inside an object graph.
//!
//! Paths name a node by the property names and array indices walked from a
//! root. They are used in conflict reports and as merge write targets.

mod find;
mod path;

pub use find::*;
pub use path::*;
