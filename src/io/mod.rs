//! File format loaders.
//!
//! - OBJ meshes (positions, vertex colors, per-face texture coordinates)
//! - plain-text multi-camera calibration

mod calib;
mod obj;

pub use calib::load_calibration;
pub use obj::{load_obj, LoadError, ObjMesh};
