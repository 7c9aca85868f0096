mod matrix;
mod routines;

pub use matrix::SquareMatrix;
pub use routines::{cross_2, lerp, resample_linear};
