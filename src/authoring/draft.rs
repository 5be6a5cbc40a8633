//! Formula drafts
//!
//! Drafts hold form text exactly as entered. Converting a draft validates
//! every field and produces [`FormulaData`] ready for the store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::measurement::{format_amount, parse_amount, AmountError, MassUnit, Unit, UnitType, VolumeUnit};
use crate::models::{BaseIngredient, Formula, FormulaData, OtherIngredient};
use crate::ordering::{move_item, OrderingError};

/// Invalid draft input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthoringError {
    #[error("Formula name is required")]
    EmptyFormulaName,

    #[error("Base ingredient name is required")]
    EmptyBaseIngredientName,

    #[error("Ingredient {row} has no name")]
    EmptyIngredientName { row: usize },

    #[error("Invalid {field}: '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("Ingredient {row} has a negative ratio")]
    NegativeRatio { row: usize },

    #[error("Ingredient {row} has a negative amount")]
    NegativeAmount { row: usize },

    #[error("Base ingredient amount must be greater than 0 to derive ratios, got {base_amount}")]
    InvalidRatioInput { base_amount: Decimal },

    #[error("Ratio of ingredient {row} is too large")]
    RatioOverflow { row: usize },

    #[error("No ingredient row {row}")]
    NoSuchRow { row: usize },

    #[error(transparent)]
    Ordering(#[from] OrderingError),
}

/// Unit type plus the unit remembered for each type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSelection {
    pub unit_type: UnitType,
    pub mass_unit: MassUnit,
    pub volume_unit: VolumeUnit,
}

impl Default for UnitSelection {
    fn default() -> Self {
        Self {
            unit_type: UnitType::Mass,
            mass_unit: MassUnit::G,
            volume_unit: VolumeUnit::ML,
        }
    }
}

impl UnitSelection {
    /// Selection showing `unit`; the other type keeps its default
    pub fn from_unit(unit: Unit) -> Self {
        let mut selection = Self::default();
        match unit {
            Unit::Mass(u) => {
                selection.unit_type = UnitType::Mass;
                selection.mass_unit = u;
            }
            Unit::Volume(u) => {
                selection.unit_type = UnitType::Volume;
                selection.volume_unit = u;
            }
        }
        selection
    }

    /// The unit matching the chosen type
    pub fn selected(&self) -> Unit {
        match self.unit_type {
            UnitType::Mass => Unit::Mass(self.mass_unit),
            UnitType::Volume => Unit::Volume(self.volume_unit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatioRow {
    pub name: String,
    pub ratio: String,
    pub units: UnitSelection,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AmountRow {
    pub name: String,
    pub amount: String,
    pub units: UnitSelection,
}

/// A formula entered as ratios to the base ingredient
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatioDraft {
    pub name: String,
    #[serde(default)]
    pub note: String,
    pub base_name: String,
    #[serde(default)]
    pub base_units: UnitSelection,
    /// Carried from the formula being edited; new drafts have none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_amount: Option<Decimal>,
    #[serde(default)]
    pub rows: Vec<RatioRow>,
}

/// A formula entered as absolute amounts; ratios are derived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountDraft {
    pub name: String,
    #[serde(default)]
    pub note: String,
    pub base_name: String,
    pub base_amount: String,
    #[serde(default)]
    pub base_units: UnitSelection,
    #[serde(default)]
    pub rows: Vec<AmountRow>,
}

impl Default for AmountDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            note: String::new(),
            base_name: String::new(),
            base_amount: "0".to_string(),
            base_units: UnitSelection::default(),
            rows: Vec::new(),
        }
    }
}

/// Either creation mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FormulaDraft {
    ByRatio(RatioDraft),
    ByAmount(AmountDraft),
}

fn required_name(name: &str, err: AuthoringError) -> Result<String, AuthoringError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(err);
    }
    Ok(name.to_string())
}

/// Parse a number field; `negative` builds the error for values below zero
fn parse_field(
    text: &str,
    field: impl FnOnce() -> String,
    negative: AuthoringError,
) -> Result<Decimal, AuthoringError> {
    parse_amount(text).map_err(|e| match e {
        AmountError::Negative(_) => negative,
        AmountError::Empty | AmountError::NotANumber(_) => AuthoringError::InvalidNumber {
            field: field(),
            value: text.to_string(),
        },
    })
}

fn remove_row<T>(rows: &mut Vec<T>, row: usize) -> Result<T, AuthoringError> {
    if row >= rows.len() {
        return Err(AuthoringError::NoSuchRow { row });
    }
    Ok(rows.remove(row))
}

impl RatioDraft {
    /// Prefill from an existing formula
    pub fn from_formula(formula: &Formula) -> Self {
        Self {
            name: formula.name.clone(),
            note: formula.note.clone(),
            base_name: formula.base_ingredient.name.clone(),
            base_units: UnitSelection::from_unit(formula.base_ingredient.base_unit),
            default_amount: formula.base_ingredient.default_amount,
            rows: formula
                .other_ingredients
                .iter()
                .map(|i| RatioRow {
                    name: i.name.clone(),
                    ratio: format_amount(i.ratio),
                    units: UnitSelection::from_unit(i.base_unit),
                })
                .collect(),
        }
    }

    pub fn add_row(&mut self) {
        self.rows.push(RatioRow {
            ratio: "0".to_string(),
            ..RatioRow::default()
        });
    }

    pub fn remove_row(&mut self, row: usize) -> Result<RatioRow, AuthoringError> {
        remove_row(&mut self.rows, row)
    }

    pub fn move_row(&mut self, from: usize, to: usize) -> Result<(), AuthoringError> {
        Ok(move_item(&mut self.rows, from, to)?)
    }

    pub fn to_formula_data(&self) -> Result<FormulaData, AuthoringError> {
        let name = required_name(&self.name, AuthoringError::EmptyFormulaName)?;
        let base_name = required_name(&self.base_name, AuthoringError::EmptyBaseIngredientName)?;

        let other_ingredients = self
            .rows
            .iter()
            .enumerate()
            .map(|(row, r)| {
                let name = required_name(&r.name, AuthoringError::EmptyIngredientName { row })?;
                let ratio = parse_field(
                    &r.ratio,
                    || format!("ratio of ingredient {}", row),
                    AuthoringError::NegativeRatio { row },
                )?;
                Ok(OtherIngredient::new(name, ratio, r.units.selected()))
            })
            .collect::<Result<Vec<_>, AuthoringError>>()?;

        Ok(FormulaData {
            name,
            base_ingredient: BaseIngredient::new(base_name, self.base_units.selected(), self.default_amount),
            other_ingredients,
            note: self.note.clone(),
        })
    }
}

impl AmountDraft {
    /// Prefill from an existing formula, scaled to its default amount (or 1)
    pub fn from_formula(formula: &Formula) -> Self {
        let base_amount = formula.base_ingredient.default_amount.unwrap_or(Decimal::ONE);
        Self {
            name: formula.name.clone(),
            note: formula.note.clone(),
            base_name: formula.base_ingredient.name.clone(),
            base_amount: format_amount(base_amount),
            base_units: UnitSelection::from_unit(formula.base_ingredient.base_unit),
            rows: formula
                .other_ingredients
                .iter()
                .map(|i| AmountRow {
                    name: i.name.clone(),
                    amount: format_amount(base_amount.saturating_mul(i.ratio)),
                    units: UnitSelection::from_unit(i.base_unit),
                })
                .collect(),
        }
    }

    pub fn add_row(&mut self) {
        self.rows.push(AmountRow {
            amount: "0".to_string(),
            ..AmountRow::default()
        });
    }

    pub fn remove_row(&mut self, row: usize) -> Result<AmountRow, AuthoringError> {
        remove_row(&mut self.rows, row)
    }

    pub fn move_row(&mut self, from: usize, to: usize) -> Result<(), AuthoringError> {
        Ok(move_item(&mut self.rows, from, to)?)
    }

    /// Validate and derive each ratio as amount / base amount
    pub fn to_formula_data(&self) -> Result<FormulaData, AuthoringError> {
        let name = required_name(&self.name, AuthoringError::EmptyFormulaName)?;
        let base_name = required_name(&self.base_name, AuthoringError::EmptyBaseIngredientName)?;

        let base_amount = parse_amount(&self.base_amount).map_err(|e| match e {
            AmountError::Negative(base_amount) => AuthoringError::InvalidRatioInput { base_amount },
            AmountError::Empty | AmountError::NotANumber(_) => AuthoringError::InvalidNumber {
                field: "base ingredient amount".to_string(),
                value: self.base_amount.clone(),
            },
        })?;
        if base_amount <= Decimal::ZERO {
            return Err(AuthoringError::InvalidRatioInput { base_amount });
        }

        let other_ingredients = self
            .rows
            .iter()
            .enumerate()
            .map(|(row, r)| {
                let name = required_name(&r.name, AuthoringError::EmptyIngredientName { row })?;
                let amount = parse_field(
                    &r.amount,
                    || format!("amount of ingredient {}", row),
                    AuthoringError::NegativeAmount { row },
                )?;
                let ratio = amount
                    .checked_div(base_amount)
                    .ok_or(AuthoringError::RatioOverflow { row })?;
                Ok(OtherIngredient::new(name, ratio, r.units.selected()))
            })
            .collect::<Result<Vec<_>, AuthoringError>>()?;

        Ok(FormulaData {
            name,
            base_ingredient: BaseIngredient::new(base_name, self.base_units.selected(), Some(base_amount)),
            other_ingredients,
            note: self.note.clone(),
        })
    }
}

impl FormulaDraft {
    /// Draft for editing: by amount when the formula remembers a default amount
    pub fn for_edit(formula: &Formula) -> Self {
        match formula.base_ingredient.default_amount {
            Some(_) => FormulaDraft::ByAmount(AmountDraft::from_formula(formula)),
            None => FormulaDraft::ByRatio(RatioDraft::from_formula(formula)),
        }
    }

    pub fn to_formula_data(&self) -> Result<FormulaData, AuthoringError> {
        match self {
            FormulaDraft::ByRatio(draft) => draft.to_formula_data(),
            FormulaDraft::ByAmount(draft) => draft.to_formula_data(),
        }
    }
}
