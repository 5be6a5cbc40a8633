//! Unit Tools

use rust_decimal::Decimal;
use serde::Serialize;

use crate::measurement::{convert, parse_amount, Unit, UnitType};

/// Response for convert_amount
#[derive(Debug, Serialize)]
pub struct ConvertAmountResponse {
    pub amount: Decimal,
    pub from: Unit,
    pub converted: Decimal,
    pub to: Unit,
    pub unit_type: UnitType,
}

/// Units of one type, for selectors
#[derive(Debug, Serialize)]
pub struct UnitGroup {
    pub unit_type: UnitType,
    pub default_unit: Unit,
    pub units: Vec<Unit>,
}

/// Convert an amount between two units of the same type
pub fn convert_amount(amount: &str, from: &str, to: &str) -> Result<ConvertAmountResponse, String> {
    let amount = parse_amount(amount).map_err(|e| format!("Invalid amount: {}", e))?;
    let from_unit = Unit::parse(from.trim()).ok_or_else(|| format!("Unknown unit: '{}'", from))?;
    let to_unit = Unit::parse(to.trim()).ok_or_else(|| format!("Unknown unit: '{}'", to))?;

    if from_unit.unit_type() != to_unit.unit_type() {
        return Err(format!(
            "Cannot convert {} ({}) to {} ({})",
            from_unit,
            from_unit.unit_type(),
            to_unit,
            to_unit.unit_type()
        ));
    }

    let converted = convert(amount, from_unit, to_unit).map_err(|e| e.to_string())?;

    Ok(ConvertAmountResponse {
        amount,
        from: from_unit,
        converted,
        to: to_unit,
        unit_type: from_unit.unit_type(),
    })
}

/// Every supported unit grouped by type
pub fn list_units() -> Vec<UnitGroup> {
    [UnitType::Mass, UnitType::Volume]
        .into_iter()
        .map(|unit_type| UnitGroup {
            unit_type,
            default_unit: unit_type.default_unit(),
            units: unit_type.units(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_convert_amount() {
        let litre = convert_amount("1", "L", "mL").unwrap();
        assert_eq!(litre.converted, dec!(1000));
        assert_eq!(litre.unit_type, UnitType::Volume);

        let kilo = convert_amount("1", "kg", "g").unwrap();
        assert_eq!(kilo.converted, dec!(1000));

        assert_eq!(convert_amount("250", "mg", "g").unwrap().converted, dec!(0.25));
    }

    #[test]
    fn test_convert_amount_rejects_bad_input() {
        assert!(convert_amount("1", "kg", "mL").unwrap_err().contains("Cannot convert"));
        assert!(convert_amount("1", "cup", "mL").is_err());
        assert!(convert_amount("x", "g", "kg").is_err());
        let err = convert_amount("0.0000000000000000000000001", "mg", "t").unwrap_err();
        assert!(err.contains("28 decimal places"));
        // symbols are case-sensitive
        assert!(convert_amount("1", "ml", "L").is_err());
    }

    #[test]
    fn test_list_units() {
        let groups = list_units();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].units.len(), 8);
        assert_eq!(groups[1].units.len(), 7);
        assert_eq!(groups[1].default_unit.symbol(), "mL");
    }
}
