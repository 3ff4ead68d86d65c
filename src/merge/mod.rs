//! Merge module - Writing values back into a live model.
//!
//! Assigning a node through a [`Merger`] retargets every alias of that
//! node in the host model, so a model that references one logical entity
//! from several places stays consistent.

mod merger;


pub use merger::*;
