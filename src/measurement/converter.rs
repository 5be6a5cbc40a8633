//! Unit conversion functions
//!
//! All arithmetic is done on `Decimal`. [`convert`] is exact: a result that
//! would need more than 28 decimal places is an error, so converting there
//! and back always gives the original amount. [`convert_rounded`] is for
//! amounts that are already rounded quotients.

use rust_decimal::Decimal;
use thiserror::Error;

use super::units::{MassUnit, Unit, VolumeUnit};

/// Conversion failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("Amount {amount} {from} is too large to express in {to}")]
    Overflow {
        amount: Decimal,
        from: &'static str,
        to: &'static str,
    },

    #[error("Amount {amount} {from} needs more than 28 decimal places in {to}")]
    PrecisionLoss {
        amount: Decimal,
        from: &'static str,
        to: &'static str,
    },
}

/// Rejected amount text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Amount is empty")]
    Empty,

    #[error("'{0}' is not a decimal number")]
    NotANumber(String),

    #[error("Amount cannot be negative: {0}")]
    Negative(Decimal),
}

/// One conversion through a per-base-unit table
#[derive(Debug, Clone, Copy)]
struct TableStep {
    from_per_base: Decimal,
    to_per_base: Decimal,
    from: &'static str,
    to: &'static str,
}

impl TableStep {
    fn mass(from: MassUnit, to: MassUnit) -> Self {
        Self {
            from_per_base: from.per_gram(),
            to_per_base: to.per_gram(),
            from: from.symbol(),
            to: to.symbol(),
        }
    }

    fn volume(from: VolumeUnit, to: VolumeUnit) -> Self {
        Self {
            from_per_base: from.per_milliliter(),
            to_per_base: to.per_milliliter(),
            from: from.symbol(),
            to: to.symbol(),
        }
    }

    /// `amount / per[from] * per[to]`; digits past the 28th decimal place are rounded
    fn rounded(&self, amount: Decimal) -> Result<Decimal, ConversionError> {
        if self.from == self.to {
            return Ok(amount);
        }
        amount
            .checked_div(self.from_per_base)
            .and_then(|in_base| in_base.checked_mul(self.to_per_base))
            .ok_or(ConversionError::Overflow {
                amount,
                from: self.from,
                to: self.to,
            })
    }

    /// Like [`Self::rounded`], but fails instead of dropping digits
    fn exact(&self, amount: Decimal) -> Result<Decimal, ConversionError> {
        let converted = self.rounded(amount)?;

        // Every factor is a power of ten, so the way back is exact unless
        // the forward result was rounded.
        let back = converted
            .checked_div(self.to_per_base)
            .and_then(|in_base| in_base.checked_mul(self.from_per_base));
        if self.from != self.to && back != Some(amount) {
            return Err(ConversionError::PrecisionLoss {
                amount,
                from: self.from,
                to: self.to,
            });
        }

        Ok(converted)
    }
}

/// Convert a mass amount between units
pub fn convert_mass(
    amount: Decimal,
    from: MassUnit,
    to: MassUnit,
) -> Result<Decimal, ConversionError> {
    TableStep::mass(from, to).exact(amount)
}

/// Convert a volume amount between units
pub fn convert_volume(
    amount: Decimal,
    from: VolumeUnit,
    to: VolumeUnit,
) -> Result<Decimal, ConversionError> {
    TableStep::volume(from, to).exact(amount)
}

fn table_step(from: Unit, to: Unit) -> TableStep {
    match (from, to) {
        (Unit::Mass(f), Unit::Mass(t)) => TableStep::mass(f, t),
        (Unit::Volume(f), Unit::Volume(t)) => TableStep::volume(f, t),
        _ => panic!(
            "cannot convert between {} ({}) and {} ({})",
            from,
            from.unit_type(),
            to,
            to.unit_type()
        ),
    }
}

/// Convert an amount between two units of the same type
///
/// # Panics
/// If `from` and `to` belong to different unit types. Callers must only
/// pair units taken from the same ingredient.
pub fn convert(amount: Decimal, from: Unit, to: Unit) -> Result<Decimal, ConversionError> {
    table_step(from, to).exact(amount)
}

/// Convert an amount, rounding to 28 decimal places instead of failing
///
/// # Panics
/// Same as [`convert`].
pub fn convert_rounded(amount: Decimal, from: Unit, to: Unit) -> Result<Decimal, ConversionError> {
    table_step(from, to).rounded(amount)
}

/// Parse a user-entered amount
pub fn parse_amount(text: &str) -> Result<Decimal, AmountError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let value = trimmed
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| AmountError::NotANumber(trimmed.to_string()))?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(AmountError::Negative(value));
    }

    Ok(value)
}

/// Render an amount without trailing zeros
pub fn format_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mass_conversions() {
        assert_eq!(convert_mass(dec!(1), MassUnit::Kg, MassUnit::G).unwrap(), dec!(1000));
        assert_eq!(convert_mass(dec!(250), MassUnit::G, MassUnit::Kg).unwrap(), dec!(0.25));
        assert_eq!(convert_mass(dec!(5), MassUnit::Mg, MassUnit::Cg).unwrap(), dec!(0.5));
        assert_eq!(convert_mass(dec!(2), MassUnit::T, MassUnit::Kg).unwrap(), dec!(2000));
    }

    #[test]
    fn test_volume_conversions() {
        assert_eq!(convert_volume(dec!(1), VolumeUnit::L, VolumeUnit::ML).unwrap(), dec!(1000));
        assert_eq!(convert_volume(dec!(330), VolumeUnit::ML, VolumeUnit::CL).unwrap(), dec!(33));
        assert_eq!(convert_volume(dec!(3), VolumeUnit::DL, VolumeUnit::L).unwrap(), dec!(0.3));
        assert_eq!(convert_volume(dec!(1), VolumeUnit::KL, VolumeUnit::HL).unwrap(), dec!(10));
    }

    #[test]
    fn test_round_trip_is_exact() {
        let amounts = [dec!(0), dec!(1), dec!(0.1), dec!(123.456), dec!(99999.00001)];
        for amount in amounts {
            for from in MassUnit::ALL {
                for to in MassUnit::ALL {
                    let there = convert_mass(amount, from, to).unwrap();
                    assert_eq!(convert_mass(there, to, from).unwrap(), amount);
                }
            }
            for from in VolumeUnit::ALL {
                for to in VolumeUnit::ALL {
                    let there = convert_volume(amount, from, to).unwrap();
                    assert_eq!(convert_volume(there, to, from).unwrap(), amount);
                }
            }
        }
    }

    #[test]
    fn test_convert_dispatches_by_type() {
        let grams = convert(dec!(1.5), Unit::Mass(MassUnit::Kg), Unit::Mass(MassUnit::G)).unwrap();
        assert_eq!(grams, dec!(1500));
        let ml = convert(dec!(2), Unit::Volume(VolumeUnit::L), Unit::Volume(VolumeUnit::ML)).unwrap();
        assert_eq!(ml, dec!(2000));
    }

    #[test]
    #[should_panic(expected = "cannot convert")]
    fn test_convert_mismatched_types_panics() {
        let _ = convert(dec!(1), Unit::Mass(MassUnit::G), Unit::Volume(VolumeUnit::ML));
    }

    #[test]
    fn test_overflow_is_reported() {
        let err = convert_mass(Decimal::MAX, MassUnit::T, MassUnit::Mg).unwrap_err();
        assert!(matches!(err, ConversionError::Overflow { .. }));
    }

    #[test]
    fn test_lost_digits_are_reported() {
        let tiny = dec!(0.0000000000000000000000001);
        let err = convert_mass(tiny, MassUnit::Mg, MassUnit::T).unwrap_err();
        assert!(matches!(err, ConversionError::PrecisionLoss { .. }));

        let long = dec!(0.1234567890123456789012345678);
        let err = convert_volume(long, VolumeUnit::ML, VolumeUnit::L).unwrap_err();
        assert!(matches!(err, ConversionError::PrecisionLoss { .. }));
        assert_eq!(convert_volume(long, VolumeUnit::L, VolumeUnit::ML).unwrap(), dec!(123.4567890123456789012345678));

        let rounded = convert_rounded(tiny, Unit::Mass(MassUnit::Mg), Unit::Mass(MassUnit::T)).unwrap();
        assert_eq!(rounded, Decimal::ZERO);
    }

    #[test]
    fn test_round_trip_holds_at_the_edges() {
        let amounts = [
            dec!(0.0000000000000000000000000001),
            dec!(0.0000000000000000000000001),
            dec!(0.1234567890123456789012345678),
            dec!(12345678901234567890.12345678),
            Decimal::MAX,
        ];
        let mut converted = 0;
        for amount in amounts {
            for from in MassUnit::ALL {
                for to in MassUnit::ALL {
                    if let Ok(there) = convert_mass(amount, from, to) {
                        assert_eq!(convert_mass(there, to, from).unwrap(), amount);
                        converted += 1;
                    }
                }
            }
            for from in VolumeUnit::ALL {
                for to in VolumeUnit::ALL {
                    if let Ok(there) = convert_volume(amount, from, to) {
                        assert_eq!(convert_volume(there, to, from).unwrap(), amount);
                        converted += 1;
                    }
                }
            }
        }
        assert!(converted > amounts.len() * 2);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 300 ").unwrap(), dec!(300));
        assert_eq!(parse_amount("0.6").unwrap(), dec!(0.6));
        assert_eq!(parse_amount("1e3").unwrap(), dec!(1000));
        assert_eq!(parse_amount("").unwrap_err(), AmountError::Empty);
        assert!(matches!(parse_amount("abc"), Err(AmountError::NotANumber(_))));
        assert!(matches!(parse_amount("-2"), Err(AmountError::Negative(_))));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec!(180.0)), "180");
        assert_eq!(format_amount(dec!(0.250)), "0.25");
        assert_eq!(format_amount(dec!(0)), "0");
    }
}
