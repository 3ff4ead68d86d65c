//! # Graph Snapshot Diff
//!
//! Identity-correlated snapshots, diffs and merges of in-memory object
//! graphs.
//!
//! Taking a snapshot stamps every object and array of a model with a stable
//! identity and returns a detached copy. Diffing the snapshot against the
//! live model later correlates nodes by identity, not by position, so moved
//! and aliased nodes are still recognized. Cycles are supported throughout.
//!
//! ## Modules
//!
//! - [`value`] - Reference-semantics object graph with JSON/YAML import and export
//! - [`identity`] - Identity tokens and the sources that allocate them
//! - [`plugin`] - Value-like and reference-like extension points
//! - [`snapshot`] - Deep, identity-preserving cloning
//! - [`fieldpath`] - Paths locating a node inside a graph
//! - [`diff`] - Object and array diffs with dirty checks and reconstruction
//! - [`merge`] - Writing values back into a model with alias retargeting

pub mod checker;
pub mod diff;
pub mod error;
pub mod fieldpath;
pub mod identity;
pub mod merge;
pub mod plugin;
pub mod snapshot;
pub mod value;

pub use checker::{Checker, CheckerBuilder};
pub use diff::{ArrayDiff, Diff, DiffRef, DiffState, DiffValue, Era, ObjectDiff, PropertyDiff};
pub use error::{Error, IdentityConflict, Result};
pub use fieldpath::{Path, PathElement};
pub use identity::{Counter, Identity, IdentitySource};
pub use merge::Merger;
pub use plugin::{Plugin, ReferenceLike, Registry, ValueLike};
pub use value::{Array, Class, Composite, Object, Value};
