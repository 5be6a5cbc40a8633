//! Formula Tools
//!
//! Create, read, edit and delete formulas from drafts.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::authoring::{FormulaDraft, RatioDraft};
use crate::db::{Database, DbError};
use crate::measurement::{parse_amount, Unit};
use crate::models::{Formula, FormulaSort, SavedResult};
use super::results::{PinnedResult, SavedResultEntry};

/// Number of formulas shown on the home summary
const RECENT_FORMULA_LIMIT: usize = 5;

/// Formula summary for listing
#[derive(Debug, Serialize)]
pub struct FormulaSummary {
    pub id: i64,
    pub name: String,
    pub base_ingredient: String,
    pub base_unit: Unit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_amount: Option<Decimal>,
    pub ingredient_count: usize,
    pub all_mass: bool,
    pub created_at: String,
}

impl From<&Formula> for FormulaSummary {
    fn from(formula: &Formula) -> Self {
        Self {
            id: formula.id,
            name: formula.name.clone(),
            base_ingredient: formula.base_ingredient.name.clone(),
            base_unit: formula.base_ingredient.base_unit,
            default_amount: formula.base_ingredient.default_amount,
            ingredient_count: formula.other_ingredients.len() + 1,
            all_mass: formula.all_mass(),
            created_at: formula.created_at.clone(),
        }
    }
}

/// Full formula with its saved results
#[derive(Debug, Serialize)]
pub struct FormulaDetailResponse {
    pub formula: Formula,
    pub all_mass: bool,
    pub saved_results: Vec<SavedResultEntry>,
}

/// Response for list_formulas
#[derive(Debug, Serialize)]
pub struct ListFormulasResponse {
    pub formulas: Vec<FormulaSummary>,
    pub count: usize,
    pub sort: FormulaSort,
}

/// Response for edit_formula
#[derive(Debug, Serialize)]
pub struct EditFormulaResponse {
    pub formula: Formula,
    pub deleted_saved_results: usize,
}

/// Response for delete_formula
#[derive(Debug, Serialize)]
pub struct DeleteFormulaResponse {
    pub success: bool,
    pub deleted_id: i64,
    pub deleted_saved_results: usize,
}

/// Overview shown when a session starts
#[derive(Debug, Serialize)]
pub struct HomeSummary {
    pub formula_count: i64,
    pub recent_formulas: Vec<FormulaSummary>,
    pub pinned_results: Vec<PinnedResult>,
}

fn not_found_message(e: DbError, action: &str) -> String {
    match e {
        DbError::FormulaNotFound(id) => format!("Formula {} not found", id),
        e => format!("Failed to {}: {}", action, e),
    }
}

/// Create a formula from a draft
pub fn create_formula(db: &Database, draft: &FormulaDraft) -> Result<Formula, String> {
    let data = draft.to_formula_data().map_err(|e| {
        tracing::warn!(error = %e, "rejected formula draft");
        e.to_string()
    })?;

    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let formula = Formula::create(&mut conn, &data)
        .map_err(|e| format!("Failed to create formula: {}", e))?;

    tracing::info!(
        formula_id = formula.id,
        name = %formula.name,
        ingredients = formula.other_ingredients.len(),
        "created formula"
    );
    Ok(formula)
}

/// Get a formula with its saved results
pub fn get_formula(db: &Database, id: i64) -> Result<Option<FormulaDetailResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let formula = Formula::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get formula: {}", e))?;

    match formula {
        Some(formula) => {
            let saved_results = SavedResult::list_for_formula(&conn, id)
                .map_err(|e| format!("Failed to get saved results: {}", e))?
                .into_iter()
                .map(|r| SavedResultEntry::new(r, &formula))
                .collect();

            Ok(Some(FormulaDetailResponse {
                all_mass: formula.all_mass(),
                formula,
                saved_results,
            }))
        }
        None => Ok(None),
    }
}

/// List formulas
pub fn list_formulas(db: &Database, sort_by: &str, sort_order: &str) -> Result<ListFormulasResponse, String> {
    let sort = FormulaSort::from_strs(sort_by, sort_order);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let formulas = Formula::list(&conn, sort)
        .map_err(|e| format!("Failed to list formulas: {}", e))?;

    let summaries: Vec<FormulaSummary> = formulas.iter().map(FormulaSummary::from).collect();

    Ok(ListFormulasResponse {
        count: summaries.len(),
        formulas: summaries,
        sort,
    })
}

/// Prefilled draft for editing a formula
pub fn get_edit_draft(db: &Database, id: i64) -> Result<Option<FormulaDraft>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let formula = Formula::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get formula: {}", e))?;

    Ok(formula.as_ref().map(FormulaDraft::for_edit))
}

/// Replace a formula from a draft; its saved results are deleted
pub fn edit_formula(db: &Database, id: i64, draft: &FormulaDraft) -> Result<EditFormulaResponse, String> {
    let data = draft.to_formula_data().map_err(|e| {
        tracing::warn!(formula_id = id, error = %e, "rejected formula draft");
        e.to_string()
    })?;

    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let (formula, deleted_saved_results) = Formula::replace(&mut conn, id, &data)
        .map_err(|e| not_found_message(e, "edit formula"))?;

    tracing::info!(formula_id = id, deleted_saved_results, "edited formula");
    Ok(EditFormulaResponse {
        formula,
        deleted_saved_results,
    })
}

/// Replace a formula from a ratio draft
///
/// Ratios carry no base amount, so the formula keeps its stored default
/// amount unless `default_amount` is given.
pub fn edit_formula_by_ratio(
    db: &Database,
    id: i64,
    mut draft: RatioDraft,
    default_amount: Option<&str>,
) -> Result<EditFormulaResponse, String> {
    draft.default_amount = match default_amount {
        Some(text) => Some(parse_amount(text).map_err(|e| format!("Invalid default amount: {}", e))?),
        None => {
            let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
            Formula::get_by_id(&conn, id)
                .map_err(|e| format!("Failed to get formula: {}", e))?
                .ok_or_else(|| format!("Formula {} not found", id))?
                .base_ingredient
                .default_amount
        }
    };

    edit_formula(db, id, &FormulaDraft::ByRatio(draft))
}

/// Delete a formula and its saved results
pub fn delete_formula(db: &Database, id: i64) -> Result<DeleteFormulaResponse, String> {
    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted_saved_results =
        Formula::delete(&mut conn, id).map_err(|e| not_found_message(e, "delete formula"))?;

    tracing::info!(formula_id = id, deleted_saved_results, "deleted formula");
    Ok(DeleteFormulaResponse {
        success: true,
        deleted_id: id,
        deleted_saved_results,
    })
}

/// Formula count, newest formulas and every saved result
pub fn home_summary(db: &Database) -> Result<HomeSummary, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let formula_count = Formula::count(&conn)
        .map_err(|e| format!("Failed to count formulas: {}", e))?;

    let recent_formulas = Formula::list(&conn, FormulaSort::default())
        .map_err(|e| format!("Failed to list formulas: {}", e))?
        .iter()
        .take(RECENT_FORMULA_LIMIT)
        .map(FormulaSummary::from)
        .collect();

    let pinned_results = SavedResult::list_all_with_formula(&conn)
        .map_err(|e| format!("Failed to list saved results: {}", e))?
        .into_iter()
        .map(PinnedResult::from)
        .collect();

    Ok(HomeSummary {
        formula_count,
        recent_formulas,
        pinned_results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authoring::{AmountDraft, AmountRow, RatioDraft, RatioRow, UnitSelection};
    use crate::db::migrations::run_migrations;
    use crate::tools::results::save_result;
    use rust_decimal_macros::dec;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(run_migrations).unwrap();
        db
    }

    fn by_amount(name: &str, base: &str, water: &str) -> FormulaDraft {
        FormulaDraft::ByAmount(AmountDraft {
            name: name.to_string(),
            base_name: "Flour".to_string(),
            base_amount: base.to_string(),
            rows: vec![AmountRow {
                name: "Water".to_string(),
                amount: water.to_string(),
                units: UnitSelection::default(),
            }],
            ..AmountDraft::default()
        })
    }

    #[test]
    fn test_create_by_amount_stores_ratio() {
        let db = test_db();
        let formula = create_formula(&db, &by_amount("Lean dough", "300", "180")).unwrap();

        let detail = get_formula(&db, formula.id).unwrap().unwrap();
        assert_eq!(detail.formula.other_ingredients[0].ratio, dec!(0.6));
        assert_eq!(detail.formula.base_ingredient.default_amount, Some(dec!(300)));
        assert!(detail.all_mass);
        assert!(detail.saved_results.is_empty());
    }

    #[test]
    fn test_invalid_draft_is_rejected_without_writing() {
        let db = test_db();
        let err = create_formula(&db, &by_amount("Broken", "0", "180")).unwrap_err();
        assert!(err.contains("greater than 0"));

        let listed = list_formulas(&db, "name", "asc").unwrap();
        assert_eq!(listed.count, 1);
    }

    #[test]
    fn test_list_includes_seeded_sample() {
        let db = test_db();
        create_formula(&db, &by_amount("Baguette", "1000", "700")).unwrap();

        let listed = list_formulas(&db, "name", "asc").unwrap();
        let names: Vec<_> = listed.formulas.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Baguette", "Sandwich bread"]);
        assert_eq!(listed.formulas[1].ingredient_count, 7);
    }

    #[test]
    fn test_edit_removes_saved_results() {
        let db = test_db();
        let formula = create_formula(&db, &by_amount("Pizza", "500", "325")).unwrap();
        save_result(&db, formula.id, "750").unwrap();
        save_result(&db, formula.id, "1000").unwrap();

        let draft = FormulaDraft::ByRatio(RatioDraft {
            name: "Pizza".to_string(),
            base_name: "Flour".to_string(),
            rows: vec![RatioRow {
                name: "Water".to_string(),
                ratio: "0.7".to_string(),
                units: UnitSelection::default(),
            }],
            ..RatioDraft::default()
        });
        let edited = edit_formula(&db, formula.id, &draft).unwrap();

        assert_eq!(edited.deleted_saved_results, 2);
        assert_eq!(edited.formula.other_ingredients[0].ratio, dec!(0.7));
        let detail = get_formula(&db, formula.id).unwrap().unwrap();
        assert!(detail.saved_results.is_empty());
    }

    #[test]
    fn test_ratio_edit_keeps_default_amount() {
        let db = test_db();
        let formula = create_formula(&db, &by_amount("Pizza", "500", "325")).unwrap();

        let draft = RatioDraft {
            name: "Pizza".to_string(),
            base_name: "Flour".to_string(),
            rows: vec![RatioRow {
                name: "Water".to_string(),
                ratio: "0.7".to_string(),
                units: UnitSelection::default(),
            }],
            ..RatioDraft::default()
        };

        let kept = edit_formula_by_ratio(&db, formula.id, draft.clone(), None).unwrap();
        assert_eq!(kept.formula.base_ingredient.default_amount, Some(dec!(500)));
        assert_eq!(kept.formula.other_ingredients[0].ratio, dec!(0.7));

        let given = edit_formula_by_ratio(&db, formula.id, draft.clone(), Some("250")).unwrap();
        assert_eq!(given.formula.base_ingredient.default_amount, Some(dec!(250)));

        assert!(edit_formula_by_ratio(&db, formula.id, draft.clone(), Some("-1")).is_err());
        assert_eq!(
            edit_formula_by_ratio(&db, 404, draft, None).unwrap_err(),
            "Formula 404 not found"
        );
    }

    #[test]
    fn test_edit_missing_formula() {
        let db = test_db();
        let err = edit_formula(&db, 404, &by_amount("Ghost", "1", "1")).unwrap_err();
        assert_eq!(err, "Formula 404 not found");
    }

    #[test]
    fn test_edit_draft_round_trips() {
        let db = test_db();
        let formula = create_formula(&db, &by_amount("Rolls", "400", "260")).unwrap();

        let draft = get_edit_draft(&db, formula.id).unwrap().unwrap();
        assert!(matches!(draft, FormulaDraft::ByAmount(_)));

        let edited = edit_formula(&db, formula.id, &draft).unwrap();
        assert_eq!(edited.formula.data(), formula.data());
        assert!(get_edit_draft(&db, 999).unwrap().is_none());
    }

    #[test]
    fn test_delete_formula() {
        let db = test_db();
        let formula = create_formula(&db, &by_amount("Pizza", "500", "325")).unwrap();
        save_result(&db, formula.id, "750").unwrap();

        let deleted = delete_formula(&db, formula.id).unwrap();
        assert!(deleted.success);
        assert_eq!(deleted.deleted_saved_results, 1);
        assert!(get_formula(&db, formula.id).unwrap().is_none());

        assert!(delete_formula(&db, formula.id).is_err());
        assert!(save_result(&db, formula.id, "1").is_err());
    }

    #[test]
    fn test_home_summary() {
        let db = test_db();
        let formula = create_formula(&db, &by_amount("Pizza", "500", "325")).unwrap();
        save_result(&db, formula.id, "750").unwrap();

        let summary = home_summary(&db).unwrap();
        assert_eq!(summary.formula_count, 2);
        assert_eq!(summary.recent_formulas[0].id, formula.id);
        assert_eq!(summary.pinned_results.len(), 1);
        assert_eq!(summary.pinned_results[0].formula_name, "Pizza");
    }
}
