//! Live amounts, edits and engine errors

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::measurement::{format_amount, ConversionError, Unit, UnitType};

/// An amount as currently displayed for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LiveAmount {
    pub amount: Decimal,
    pub unit: Unit,
}

impl LiveAmount {
    pub fn new(amount: Decimal, unit: Unit) -> Self {
        Self { amount, unit }
    }

    /// Amount text without trailing zeros
    pub fn display(&self) -> String {
        format_amount(self.amount)
    }
}

/// One user edit to the live detail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailChange {
    /// New base amount, in the base ingredient's current display unit
    BaseAmount(Decimal),
    BaseUnit(Unit),
    /// New amount for other ingredient `index`, in its current display unit
    OtherAmount { index: usize, amount: Decimal },
    OtherUnit { index: usize, unit: Unit },
    /// New total, in the total's current display unit
    TotalAmount(Decimal),
    TotalUnit(Unit),
}

/// A rejected edit; the detail keeps its previous state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("No ingredient at index {0}")]
    NoSuchIngredient(usize),

    #[error("Unit {unit} is not a {expected} unit")]
    UnitTypeMismatch { unit: Unit, expected: UnitType },

    #[error("Formula mixes mass and volume ingredients, so it has no total")]
    NoTotal,

    #[error("Ingredient {0} has a ratio of 0; the base amount cannot be derived from it")]
    ZeroRatio(usize),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("Arithmetic overflow while scaling the formula")]
    Overflow,
}

pub(crate) fn checked_mul(a: Decimal, b: Decimal) -> Result<Decimal, CalcError> {
    a.checked_mul(b).ok_or(CalcError::Overflow)
}

pub(crate) fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal, CalcError> {
    a.checked_add(b).ok_or(CalcError::Overflow)
}

pub(crate) fn checked_div(a: Decimal, b: Decimal) -> Result<Decimal, CalcError> {
    a.checked_div(b).ok_or(CalcError::Overflow)
}

pub(crate) fn non_negative(amount: Decimal) -> Result<Decimal, CalcError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(CalcError::NegativeAmount(amount));
    }
    Ok(amount)
}

pub(crate) fn unit_of_type(unit: Unit, expected: UnitType) -> Result<Unit, CalcError> {
    if unit.unit_type() != expected {
        return Err(CalcError::UnitTypeMismatch { unit, expected });
    }
    Ok(unit)
}
