//! Value module - In-memory representation of object graphs.
//!
//! Objects and arrays are shared, mutable nodes; aliasing and cycles are
//! allowed. Every composite node has a hidden identity slot that is not part
//! of its properties.

mod json;
mod object;
mod value;

pub use json::*;
pub use object::*;
pub use value::*;
