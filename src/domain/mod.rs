//! Domain module containing core types and trait definitions

pub mod data_volume;
pub mod ports;

pub use data_volume::DataVolume;
pub use ports::*;
