pub mod archive_loader;
pub mod boundaries;
pub mod clip;
pub mod color_ramp;
pub mod credentials;
pub mod etl;
pub mod feature_service;
pub mod inspect;
pub mod regulations;
pub mod tiles;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::model::JobReport;
pub use crate::domain::ports::{Job, ObjectStore, RasterToolkit};
pub use crate::utils::error::Result;
