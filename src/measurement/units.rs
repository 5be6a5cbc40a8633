//! Unit types and conversion tables
//!
//! Metric mass and volume units with their exact decimal ratios to the
//! base unit of each type (gram, milliliter).

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Measurement category of an ingredient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    /// Weighed ingredients, base unit gram
    Mass,
    /// Measured by volume, base unit milliliter
    Volume,
}

impl UnitType {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mass" => Some(UnitType::Mass),
            "volume" => Some(UnitType::Volume),
            _ => None,
        }
    }

    /// Convert to database string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            UnitType::Mass => "mass",
            UnitType::Volume => "volume",
        }
    }

    /// Unit selected by default for new ingredients of this type
    pub fn default_unit(&self) -> Unit {
        match self {
            UnitType::Mass => Unit::Mass(MassUnit::G),
            UnitType::Volume => Unit::Volume(VolumeUnit::ML),
        }
    }

    /// All units of this type, smallest first
    pub fn units(&self) -> Vec<Unit> {
        match self {
            UnitType::Mass => MassUnit::ALL.iter().copied().map(Unit::Mass).collect(),
            UnitType::Volume => VolumeUnit::ALL.iter().copied().map(Unit::Volume).collect(),
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

/// SI mass units, ordered smallest to largest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MassUnit {
    #[serde(rename = "mg")]
    Mg,
    #[serde(rename = "cg")]
    Cg,
    #[serde(rename = "dg")]
    Dg,
    #[serde(rename = "g")]
    G,
    #[serde(rename = "dag")]
    Dag,
    #[serde(rename = "hg")]
    Hg,
    #[serde(rename = "kg")]
    Kg,
    #[serde(rename = "t")]
    T,
}

impl MassUnit {
    pub const ALL: [MassUnit; 8] = [
        MassUnit::Mg,
        MassUnit::Cg,
        MassUnit::Dg,
        MassUnit::G,
        MassUnit::Dag,
        MassUnit::Hg,
        MassUnit::Kg,
        MassUnit::T,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            MassUnit::Mg => "mg",
            MassUnit::Cg => "cg",
            MassUnit::Dg => "dg",
            MassUnit::G => "g",
            MassUnit::Dag => "dag",
            MassUnit::Hg => "hg",
            MassUnit::Kg => "kg",
            MassUnit::T => "t",
        }
    }

    /// Parse an exact (case-sensitive) unit symbol
    pub fn from_symbol(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|u| u.symbol() == s.trim())
    }

    /// How many of this unit make one gram
    pub fn per_gram(&self) -> Decimal {
        match self {
            MassUnit::Mg => Decimal::new(1000, 0),
            MassUnit::Cg => Decimal::new(100, 0),
            MassUnit::Dg => Decimal::new(10, 0),
            MassUnit::G => Decimal::ONE,
            MassUnit::Dag => Decimal::new(1, 1),
            MassUnit::Hg => Decimal::new(1, 2),
            MassUnit::Kg => Decimal::new(1, 3),
            MassUnit::T => Decimal::new(1, 6),
        }
    }
}

/// SI volume units, ordered smallest to largest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VolumeUnit {
    #[serde(rename = "mL")]
    ML,
    #[serde(rename = "cL")]
    CL,
    #[serde(rename = "dL")]
    DL,
    #[serde(rename = "L")]
    L,
    #[serde(rename = "daL")]
    DaL,
    #[serde(rename = "hL")]
    HL,
    #[serde(rename = "kL")]
    KL,
}

impl VolumeUnit {
    pub const ALL: [VolumeUnit; 7] = [
        VolumeUnit::ML,
        VolumeUnit::CL,
        VolumeUnit::DL,
        VolumeUnit::L,
        VolumeUnit::DaL,
        VolumeUnit::HL,
        VolumeUnit::KL,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            VolumeUnit::ML => "mL",
            VolumeUnit::CL => "cL",
            VolumeUnit::DL => "dL",
            VolumeUnit::L => "L",
            VolumeUnit::DaL => "daL",
            VolumeUnit::HL => "hL",
            VolumeUnit::KL => "kL",
        }
    }

    /// Parse an exact (case-sensitive) unit symbol
    pub fn from_symbol(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|u| u.symbol() == s.trim())
    }

    /// How many of this unit make one milliliter
    pub fn per_milliliter(&self) -> Decimal {
        match self {
            VolumeUnit::ML => Decimal::ONE,
            VolumeUnit::CL => Decimal::new(1, 1),
            VolumeUnit::DL => Decimal::new(1, 2),
            VolumeUnit::L => Decimal::new(1, 3),
            VolumeUnit::DaL => Decimal::new(1, 4),
            VolumeUnit::HL => Decimal::new(1, 5),
            VolumeUnit::KL => Decimal::new(1, 6),
        }
    }
}

/// A unit tagged with its type
///
/// Serializes as its bare symbol; symbols never collide between types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Unit {
    Mass(MassUnit),
    Volume(VolumeUnit),
}

impl Unit {
    pub fn unit_type(&self) -> UnitType {
        match self {
            Unit::Mass(_) => UnitType::Mass,
            Unit::Volume(_) => UnitType::Volume,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Mass(u) => u.symbol(),
            Unit::Volume(u) => u.symbol(),
        }
    }

    /// Parse any known symbol
    pub fn parse(symbol: &str) -> Option<Self> {
        MassUnit::from_symbol(symbol)
            .map(Unit::Mass)
            .or_else(|| VolumeUnit::from_symbol(symbol).map(Unit::Volume))
    }

    /// Parse a symbol that must belong to `unit_type`
    pub fn parse_for(unit_type: UnitType, symbol: &str) -> Option<Self> {
        match unit_type {
            UnitType::Mass => MassUnit::from_symbol(symbol).map(Unit::Mass),
            UnitType::Volume => VolumeUnit::from_symbol(symbol).map(Unit::Volume),
        }
    }

    /// How many of this unit make one base unit of its type
    pub fn per_base_unit(&self) -> Decimal {
        match self {
            Unit::Mass(u) => u.per_gram(),
            Unit::Volume(u) => u.per_milliliter(),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.symbol())
    }
}

impl From<MassUnit> for Unit {
    fn from(u: MassUnit) -> Self {
        Unit::Mass(u)
    }
}

impl From<VolumeUnit> for Unit {
    fn from(u: VolumeUnit) -> Self {
        Unit::Volume(u)
    }
}
