//! Formula detail reconciliation
//!
//! Holds one live amount per ingredient (plus the total for all-mass
//! formulas) and recomputes every derived field after a single edit.
//!
//! Every recompute starts from the edited value alone: it is converted to
//! the edited ingredient's base unit, turned into a base ingredient amount
//! through the stored ratio, and fanned back out to each other field in its
//! current display unit. The edited field itself keeps the exact value that
//! was entered. Derived amounts are often rounded quotients already, so
//! conversions here round past the 28th decimal place instead of failing.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::measurement::{convert_rounded, format_amount, Unit, UnitType};
use crate::models::{Formula, SavedResult};
use super::amount::{
    checked_add, checked_div, checked_mul, non_negative, unit_of_type, CalcError, DetailChange,
    LiveAmount,
};

/// Live amounts for one formula
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaDetail {
    formula: Formula,
    base: LiveAmount,
    others: Vec<LiveAmount>,
    total: Option<LiveAmount>,
}

/// One displayed row
#[derive(Debug, Clone, Serialize)]
pub struct DetailRow {
    pub name: String,
    pub amount: String,
    pub unit: Unit,
    pub unit_type: UnitType,
    /// Ratio to the base ingredient; absent for the total row
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<String>,
}

/// Serializable snapshot of a detail
#[derive(Debug, Clone, Serialize)]
pub struct DetailView {
    pub formula_id: i64,
    pub formula_name: String,
    pub note: String,
    pub base: DetailRow,
    pub others: Vec<DetailRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<DetailRow>,
}

impl FormulaDetail {
    /// Initialize from a saved result, else the formula's default amount, else zero
    pub fn new(formula: Formula, initial_result: Option<&SavedResult>) -> Result<Self, CalcError> {
        let scale = initial_result
            .map(|r| r.base_ingredient_amount)
            .or(formula.base_ingredient.default_amount)
            .unwrap_or(Decimal::ZERO);
        Self::with_scale(formula, scale)
    }

    /// Initialize with a base amount in the base ingredient's base unit
    pub fn with_scale(formula: Formula, scale: Decimal) -> Result<Self, CalcError> {
        let scale = non_negative(scale)?;
        let base_unit = formula.base_ingredient.base_unit;

        let others = formula
            .other_ingredients
            .iter()
            .map(|i| Ok(LiveAmount::new(checked_mul(scale, i.ratio)?, i.base_unit)))
            .collect::<Result<Vec<_>, CalcError>>()?;

        let total = if formula.all_mass() {
            let amount = if scale.is_zero() {
                Decimal::ZERO
            } else {
                let mut sum = scale;
                for live in &others {
                    sum = checked_add(sum, convert_rounded(live.amount, live.unit, base_unit)?)?;
                }
                sum
            };
            Some(LiveAmount::new(amount, base_unit))
        } else {
            None
        };

        Ok(Self {
            formula,
            base: LiveAmount::new(scale, base_unit),
            others,
            total,
        })
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn base(&self) -> LiveAmount {
        self.base
    }

    pub fn others(&self) -> &[LiveAmount] {
        &self.others
    }

    pub fn other(&self, index: usize) -> Option<LiveAmount> {
        self.others.get(index).copied()
    }

    pub fn total(&self) -> Option<LiveAmount> {
        self.total
    }

    /// Compute the state that follows `change`, leaving `self` untouched
    pub fn reconcile(&self, change: DetailChange) -> Result<Self, CalcError> {
        let base_base_unit = self.formula.base_ingredient.base_unit;
        let mut next = self.clone();

        match change {
            DetailChange::BaseAmount(value) => {
                let value = non_negative(value)?;
                let base_amount = convert_rounded(value, self.base.unit, base_base_unit)?;
                next.base.amount = value;
                next.fan_out(base_amount, None)?;
            }
            DetailChange::BaseUnit(unit) => {
                let unit = unit_of_type(unit, self.formula.base_ingredient.unit_type)?;
                next.base = LiveAmount::new(convert_rounded(self.base.amount, self.base.unit, unit)?, unit);
            }
            DetailChange::OtherAmount { index, amount } => {
                let value = non_negative(amount)?;
                let ingredient = self
                    .formula
                    .other_ingredients
                    .get(index)
                    .ok_or(CalcError::NoSuchIngredient(index))?;
                if ingredient.ratio.is_zero() {
                    return Err(CalcError::ZeroRatio(index));
                }

                let in_base_unit = convert_rounded(value, self.others[index].unit, ingredient.base_unit)?;
                let base_amount = checked_div(in_base_unit, ingredient.ratio)?;
                next.base.amount = convert_rounded(base_amount, base_base_unit, self.base.unit)?;
                next.fan_out(base_amount, Some((index, value, in_base_unit)))?;
            }
            DetailChange::OtherUnit { index, unit } => {
                let ingredient = self
                    .formula
                    .other_ingredients
                    .get(index)
                    .ok_or(CalcError::NoSuchIngredient(index))?;
                let unit = unit_of_type(unit, ingredient.unit_type)?;
                let live = self.others[index];
                next.others[index] = LiveAmount::new(convert_rounded(live.amount, live.unit, unit)?, unit);
            }
            DetailChange::TotalAmount(value) => {
                let value = non_negative(value)?;
                let total = self.total.ok_or(CalcError::NoTotal)?;

                // Total produced by one base unit of the base ingredient
                let mut total_ratio = convert_rounded(Decimal::ONE, base_base_unit, total.unit)?;
                for ingredient in &self.formula.other_ingredients {
                    let per_unit = convert_rounded(Decimal::ONE, ingredient.base_unit, total.unit)?;
                    total_ratio = checked_add(total_ratio, checked_mul(per_unit, ingredient.ratio)?)?;
                }

                let base_amount = checked_div(value, total_ratio)?;
                next.base.amount = convert_rounded(base_amount, base_base_unit, self.base.unit)?;
                next.fan_out(base_amount, None)?;
                next.total = Some(LiveAmount::new(value, total.unit));
            }
            DetailChange::TotalUnit(unit) => {
                let total = self.total.ok_or(CalcError::NoTotal)?;
                let unit = unit_of_type(unit, UnitType::Mass)?;
                next.total = Some(LiveAmount::new(convert_rounded(total.amount, total.unit, unit)?, unit));
            }
        }

        Ok(next)
    }

    /// Apply an edit in place; on error the state is unchanged
    pub fn apply(&mut self, change: DetailChange) -> Result<(), CalcError> {
        let next = self.reconcile(change)?;
        tracing::debug!(formula_id = self.formula.id, ?change, "reconciled formula detail");
        *self = next;
        Ok(())
    }

    /// Recompute every other ingredient and the total from a base amount in base unit
    ///
    /// `edited` carries (index, entered value, value in base unit) for an
    /// ingredient that must keep the entered value.
    fn fan_out(
        &mut self,
        base_amount: Decimal,
        edited: Option<(usize, Decimal, Decimal)>,
    ) -> Result<(), CalcError> {
        let mut in_base_units = Vec::with_capacity(self.others.len());

        for (i, (ingredient, live)) in self
            .formula
            .other_ingredients
            .iter()
            .zip(self.others.iter_mut())
            .enumerate()
        {
            match edited {
                Some((index, value, in_base_unit)) if index == i => {
                    live.amount = value;
                    in_base_units.push((in_base_unit, ingredient.base_unit));
                }
                _ => {
                    let in_base_unit = checked_mul(base_amount, ingredient.ratio)?;
                    live.amount = convert_rounded(in_base_unit, ingredient.base_unit, live.unit)?;
                    in_base_units.push((in_base_unit, ingredient.base_unit));
                }
            }
        }

        if let Some(total) = self.total {
            let mut sum = convert_rounded(base_amount, self.formula.base_ingredient.base_unit, total.unit)?;
            for (amount, unit) in in_base_units {
                sum = checked_add(sum, convert_rounded(amount, unit, total.unit)?)?;
            }
            self.total = Some(LiveAmount::new(sum, total.unit));
        }

        Ok(())
    }

    /// Base amount to persist as a saved result, in the base ingredient's base unit
    pub fn saved_amount(&self) -> Result<Decimal, CalcError> {
        Ok(convert_rounded(
            self.base.amount,
            self.base.unit,
            self.formula.base_ingredient.base_unit,
        )?)
    }

    pub fn view(&self) -> DetailView {
        let base = &self.formula.base_ingredient;
        DetailView {
            formula_id: self.formula.id,
            formula_name: self.formula.name.clone(),
            note: self.formula.note.clone(),
            base: DetailRow {
                name: base.name.clone(),
                amount: self.base.display(),
                unit: self.base.unit,
                unit_type: base.unit_type,
                ratio: Some("1".to_string()),
            },
            others: self
                .formula
                .other_ingredients
                .iter()
                .zip(&self.others)
                .map(|(ingredient, live)| DetailRow {
                    name: ingredient.name.clone(),
                    amount: live.display(),
                    unit: live.unit,
                    unit_type: ingredient.unit_type,
                    ratio: Some(format_amount(ingredient.ratio)),
                })
                .collect(),
            total: self.total.map(|total| DetailRow {
                name: "Total".to_string(),
                amount: total.display(),
                unit: total.unit,
                unit_type: UnitType::Mass,
                ratio: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::{MassUnit, VolumeUnit};
    use crate::models::{BaseIngredient, OtherIngredient};
    use rust_decimal_macros::dec;

    const G: Unit = Unit::Mass(MassUnit::G);
    const KG: Unit = Unit::Mass(MassUnit::Kg);
    const MG: Unit = Unit::Mass(MassUnit::Mg);
    const ML: Unit = Unit::Volume(VolumeUnit::ML);
    const L: Unit = Unit::Volume(VolumeUnit::L);

    fn formula(default_amount: Option<Decimal>, others: Vec<OtherIngredient>) -> Formula {
        Formula {
            id: 1,
            name: "Test".to_string(),
            base_ingredient: BaseIngredient::new("Flour", G, default_amount),
            other_ingredients: others,
            note: String::new(),
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn flour_water() -> Formula {
        formula(Some(dec!(300)), vec![OtherIngredient::new("Water", dec!(0.6), G)])
    }

    fn bread() -> Formula {
        formula(
            Some(dec!(500)),
            vec![
                OtherIngredient::new("Water", dec!(0.7), G),
                OtherIngredient::new("Salt", dec!(0.02), G),
                OtherIngredient::new("Yeast", dec!(0.01), G),
            ],
        )
    }

    fn saved(amount: Decimal) -> SavedResult {
        SavedResult {
            id: 9,
            formula_id: 1,
            base_ingredient_amount: amount,
            created_at: "2024-01-02T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_initial_state_from_default_amount() {
        let detail = FormulaDetail::new(flour_water(), None).unwrap();
        let view = detail.view();

        assert_eq!(view.base.amount, "300");
        assert_eq!(view.base.unit, G);
        assert_eq!(view.others[0].amount, "180");
        assert_eq!(view.others[0].unit, G);
        let total = view.total.unwrap();
        assert_eq!(total.amount, "480");
        assert_eq!(total.unit, G);
    }

    #[test]
    fn test_edit_total_rescales_everything() {
        let mut detail = FormulaDetail::new(flour_water(), None).unwrap();
        detail.apply(DetailChange::TotalAmount(dec!(960))).unwrap();

        assert_eq!(detail.base().display(), "600");
        assert_eq!(detail.other(0).unwrap().display(), "360");
        assert_eq!(detail.total().unwrap().amount, dec!(960));
    }

    #[test]
    fn test_saved_result_overrides_default() {
        let detail = FormulaDetail::new(flour_water(), Some(&saved(dec!(1000)))).unwrap();
        assert_eq!(detail.base().amount, dec!(1000));
        assert_eq!(detail.other(0).unwrap().amount, dec!(600));
        assert_eq!(detail.total().unwrap().amount, dec!(1600));
    }

    #[test]
    fn test_no_default_starts_at_zero() {
        let detail = FormulaDetail::new(formula(None, bread().other_ingredients), None).unwrap();
        assert!(detail.base().amount.is_zero());
        assert!(detail.others().iter().all(|o| o.amount.is_zero()));
        assert_eq!(detail.total().unwrap().display(), "0");
    }

    #[test]
    fn test_base_amount_sets_exact_ratios() {
        let mut detail = FormulaDetail::new(bread(), None).unwrap();
        detail.apply(DetailChange::OtherUnit { index: 0, unit: KG }).unwrap();
        detail.apply(DetailChange::OtherUnit { index: 1, unit: MG }).unwrap();
        detail.apply(DetailChange::BaseUnit(KG)).unwrap();

        detail.apply(DetailChange::BaseAmount(dec!(1.25))).unwrap();

        assert_eq!(detail.base().amount, dec!(1.25));
        assert_eq!(detail.base().unit, KG);
        let b = dec!(1250);
        for (ingredient, live) in detail.formula().other_ingredients.iter().zip(detail.others()) {
            let in_base_unit = convert_rounded(live.amount, live.unit, ingredient.base_unit).unwrap();
            assert_eq!(in_base_unit, b * ingredient.ratio);
        }
        assert_eq!(detail.other(0).unwrap().unit, KG);
        assert_eq!(detail.other(0).unwrap().display(), "0.875");
        assert_eq!(detail.other(1).unwrap().display(), "25000");
        assert_eq!(detail.total().unwrap().display(), "2162.5");
    }

    #[test]
    fn test_repeating_quotient_in_larger_unit() {
        let mut detail = FormulaDetail::new(flour_water(), None).unwrap();
        detail.apply(DetailChange::BaseUnit(KG)).unwrap();

        // 100 / 0.6 does not terminate, so the base in kg is rounded
        detail.apply(DetailChange::OtherAmount { index: 0, amount: dec!(100) }).unwrap();

        assert_eq!(detail.other(0).unwrap().amount, dec!(100));
        assert_eq!(detail.base().unit, KG);
        assert!(detail.base().display().starts_with("0.1666666666"));
    }

    #[test]
    fn test_base_unit_change_only_touches_base() {
        let mut detail = FormulaDetail::new(bread(), None).unwrap();
        let before = detail.clone();

        detail.apply(DetailChange::BaseUnit(KG)).unwrap();

        assert_eq!(detail.base(), LiveAmount::new(dec!(0.5), KG));
        assert_eq!(detail.others(), before.others());
        assert_eq!(detail.total(), before.total());
    }

    #[test]
    fn test_other_unit_change_only_touches_that_ingredient() {
        let mut detail = FormulaDetail::new(bread(), None).unwrap();
        let before = detail.clone();

        detail.apply(DetailChange::OtherUnit { index: 1, unit: MG }).unwrap();

        assert_eq!(detail.other(1).unwrap(), LiveAmount::new(dec!(10000), MG));
        assert_eq!(detail.base(), before.base());
        assert_eq!(detail.other(0), before.other(0));
        assert_eq!(detail.other(2), before.other(2));
        assert_eq!(detail.total(), before.total());
    }

    #[test]
    fn test_other_amount_drives_base_and_siblings() {
        let mut detail = FormulaDetail::new(bread(), None).unwrap();
        detail.apply(DetailChange::BaseUnit(KG)).unwrap();
        detail.apply(DetailChange::OtherUnit { index: 0, unit: KG }).unwrap();

        detail.apply(DetailChange::OtherAmount { index: 0, amount: dec!(0.14) }).unwrap();

        assert_eq!(detail.other(0).unwrap(), LiveAmount::new(dec!(0.14), KG));
        assert_eq!(detail.base().display(), "0.2");
        assert_eq!(detail.base().unit, KG);
        assert_eq!(detail.other(1).unwrap().display(), "4");
        assert_eq!(detail.other(2).unwrap().display(), "2");
        assert_eq!(detail.total().unwrap().display(), "346");
    }

    #[test]
    fn test_edited_value_is_not_round_tripped() {
        let mut detail = FormulaDetail::new(
            formula(Some(dec!(300)), vec![OtherIngredient::new("Starter", dec!(0.3), G)]),
            None,
        )
        .unwrap();

        detail.apply(DetailChange::OtherAmount { index: 0, amount: dec!(100) }).unwrap();

        // 100 / 0.3 does not terminate, but the edited field keeps exactly 100
        assert_eq!(detail.other(0).unwrap().amount, dec!(100));
        assert!(detail.base().amount > dec!(333.33));
        assert!(detail.base().amount < dec!(333.34));
    }

    #[test]
    fn test_zero_ratio_is_rejected() {
        let mut detail = FormulaDetail::new(
            formula(Some(dec!(100)), vec![OtherIngredient::new("Optional seeds", dec!(0), G)]),
            None,
        )
        .unwrap();
        let before = detail.clone();

        let err = detail
            .apply(DetailChange::OtherAmount { index: 0, amount: dec!(5) })
            .unwrap_err();

        assert_eq!(err, CalcError::ZeroRatio(0));
        assert_eq!(detail, before);
    }

    #[test]
    fn test_total_unit_change() {
        let mut detail = FormulaDetail::new(flour_water(), None).unwrap();
        detail.apply(DetailChange::TotalUnit(KG)).unwrap();
        assert_eq!(detail.total().unwrap(), LiveAmount::new(dec!(0.48), KG));

        detail.apply(DetailChange::TotalAmount(dec!(1.6))).unwrap();
        assert_eq!(detail.base().display(), "1000");
        assert_eq!(detail.other(0).unwrap().display(), "600");
        assert_eq!(detail.total().unwrap(), LiveAmount::new(dec!(1.6), KG));
    }

    #[test]
    fn test_mixed_units_have_no_total() {
        let mixed = formula(
            Some(dec!(200)),
            vec![
                OtherIngredient::new("Milk", dec!(0.5), ML),
                OtherIngredient::new("Sugar", dec!(0.25), G),
            ],
        );
        let mut detail = FormulaDetail::new(mixed, None).unwrap();

        assert!(detail.total().is_none());
        assert!(detail.view().total.is_none());
        assert_eq!(
            detail.apply(DetailChange::TotalAmount(dec!(10))).unwrap_err(),
            CalcError::NoTotal
        );
        assert_eq!(detail.apply(DetailChange::TotalUnit(KG)).unwrap_err(), CalcError::NoTotal);

        detail.apply(DetailChange::OtherUnit { index: 0, unit: L }).unwrap();
        assert_eq!(detail.other(0).unwrap(), LiveAmount::new(dec!(0.1), L));

        detail.apply(DetailChange::OtherAmount { index: 0, amount: dec!(0.25) }).unwrap();
        assert_eq!(detail.base().display(), "500");
        assert_eq!(detail.other(1).unwrap().display(), "125");
    }

    #[test]
    fn test_unit_type_mismatch_is_rejected() {
        let mut detail = FormulaDetail::new(flour_water(), None).unwrap();

        assert_eq!(
            detail.apply(DetailChange::BaseUnit(ML)).unwrap_err(),
            CalcError::UnitTypeMismatch { unit: ML, expected: UnitType::Mass }
        );
        assert!(matches!(
            detail.apply(DetailChange::OtherUnit { index: 0, unit: L }),
            Err(CalcError::UnitTypeMismatch { .. })
        ));
        assert!(matches!(
            detail.apply(DetailChange::TotalUnit(ML)),
            Err(CalcError::UnitTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_index_and_negative_amounts() {
        let mut detail = FormulaDetail::new(flour_water(), None).unwrap();

        assert_eq!(
            detail.apply(DetailChange::OtherAmount { index: 3, amount: dec!(1) }).unwrap_err(),
            CalcError::NoSuchIngredient(3)
        );
        assert_eq!(
            detail.apply(DetailChange::BaseAmount(dec!(-1))).unwrap_err(),
            CalcError::NegativeAmount(dec!(-1))
        );
        assert!(FormulaDetail::with_scale(flour_water(), dec!(-5)).is_err());
    }

    #[test]
    fn test_saved_amount_is_in_base_unit() {
        let mut detail = FormulaDetail::new(flour_water(), None).unwrap();
        detail.apply(DetailChange::BaseUnit(KG)).unwrap();
        detail.apply(DetailChange::BaseAmount(dec!(0.75))).unwrap();

        assert_eq!(detail.saved_amount().unwrap(), dec!(750));

        let reloaded = FormulaDetail::new(flour_water(), Some(&saved(dec!(750)))).unwrap();
        assert_eq!(reloaded.other(0).unwrap().display(), "450");
    }

    #[test]
    fn test_repeated_edits_do_not_drift() {
        let mut detail = FormulaDetail::new(bread(), None).unwrap();
        for unit in [KG, MG, G, KG, G] {
            detail.apply(DetailChange::BaseUnit(unit)).unwrap();
            detail.apply(DetailChange::OtherUnit { index: 0, unit }).unwrap();
        }
        detail.apply(DetailChange::BaseAmount(dec!(500))).unwrap();

        assert_eq!(detail.other(0).unwrap().amount, dec!(350));
        assert_eq!(detail.total().unwrap().amount, dec!(865));
    }
}
