mod data;
mod spectrum;

pub use data::SpectralData;
pub(crate) use data::MAIN_GROUP;
pub use spectrum::{SpectralShape, Spectrum};
