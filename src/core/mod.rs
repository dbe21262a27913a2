//! Core building blocks: pipeline parameters, canvas standardization and
//! role handling (`processing`), and background segmentation. These are
//! internal primitives consumed by the high-level `api` module.
pub mod params;
pub mod processing;
pub mod segmentation;
