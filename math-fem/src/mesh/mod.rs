//! Triangle meshes and adaptive refinement
//!
//! This module provides the plain [`TriangleMesh`], structured generators,
//! the adaptive [`Tritree`] and marking strategies for driving it.

mod generators;
mod marking;
mod tritree;
mod types;

pub use generators::*;
pub use marking::*;
pub use tritree::*;
pub use types::*;
