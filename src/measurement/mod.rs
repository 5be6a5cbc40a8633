//! Measurement module
//!
//! Metric mass/volume units and exact decimal conversion between them.

pub mod converter;
pub mod units;

pub use converter::{
    convert, convert_mass, convert_rounded, convert_volume, format_amount, parse_amount, AmountError,
    ConversionError,
};
pub use units::{MassUnit, Unit, UnitType, VolumeUnit};
