//! Saved Result Tools
//!
//! A saved result stores only the base ingredient amount; responses add
//! the unit and formula context needed to read it.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{Database, DbError};
use crate::measurement::{parse_amount, Unit};
use crate::models::{Formula, SavedResult, SavedResultWithFormula};

/// One saved result of a known formula
#[derive(Debug, Serialize)]
pub struct SavedResultEntry {
    pub id: i64,
    pub base_ingredient_amount: Decimal,
    pub base_unit: Unit,
    pub created_at: String,
}

impl SavedResultEntry {
    pub fn new(result: SavedResult, formula: &Formula) -> Self {
        Self {
            id: result.id,
            base_ingredient_amount: result.base_ingredient_amount,
            base_unit: formula.base_ingredient.base_unit,
            created_at: result.created_at,
        }
    }
}

/// A saved result listed across all formulas
#[derive(Debug, Serialize)]
pub struct PinnedResult {
    pub id: i64,
    pub formula_id: i64,
    pub formula_name: String,
    pub base_ingredient: String,
    pub base_ingredient_amount: Decimal,
    pub base_unit: Unit,
    pub created_at: String,
}

impl From<SavedResultWithFormula> for PinnedResult {
    fn from(joined: SavedResultWithFormula) -> Self {
        let SavedResultWithFormula { result, formula } = joined;
        Self {
            id: result.id,
            formula_id: formula.id,
            formula_name: formula.name,
            base_ingredient: formula.base_ingredient.name,
            base_ingredient_amount: result.base_ingredient_amount,
            base_unit: formula.base_ingredient.base_unit,
            created_at: result.created_at,
        }
    }
}

/// Response for list_saved_results
#[derive(Debug, Serialize)]
pub struct ListSavedResultsResponse {
    pub formula_id: i64,
    pub formula_name: String,
    pub results: Vec<SavedResultEntry>,
    pub count: usize,
}

/// Response for list_pinned_results
#[derive(Debug, Serialize)]
pub struct ListPinnedResultsResponse {
    pub results: Vec<PinnedResult>,
    pub count: usize,
}

/// Response for delete_saved_result
#[derive(Debug, Serialize)]
pub struct DeleteSavedResultResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Save a base amount (in the base ingredient's base unit) for a formula
pub fn save_result(db: &Database, formula_id: i64, base_ingredient_amount: &str) -> Result<SavedResult, String> {
    let amount = parse_amount(base_ingredient_amount)
        .map_err(|e| format!("Invalid base_ingredient_amount: {}", e))?;

    save_amount(db, formula_id, amount)
}

/// Save an already validated base amount
pub fn save_amount(db: &Database, formula_id: i64, amount: Decimal) -> Result<SavedResult, String> {
    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let saved = SavedResult::create(&mut conn, formula_id, amount).map_err(|e| match e {
        DbError::FormulaNotFound(id) => format!("Formula {} not found", id),
        e => format!("Failed to save result: {}", e),
    })?;

    tracing::info!(formula_id, result_id = saved.id, amount = %amount, "saved result");
    Ok(saved)
}

/// Saved results of one formula, newest first
pub fn list_saved_results(db: &Database, formula_id: i64) -> Result<ListSavedResultsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let formula = Formula::get_by_id(&conn, formula_id)
        .map_err(|e| format!("Failed to get formula: {}", e))?
        .ok_or_else(|| format!("Formula {} not found", formula_id))?;

    let results: Vec<SavedResultEntry> = SavedResult::list_for_formula(&conn, formula_id)
        .map_err(|e| format!("Failed to list saved results: {}", e))?
        .into_iter()
        .map(|r| SavedResultEntry::new(r, &formula))
        .collect();

    Ok(ListSavedResultsResponse {
        formula_id,
        formula_name: formula.name,
        count: results.len(),
        results,
    })
}

/// Every saved result with its formula, newest first
pub fn list_pinned_results(db: &Database) -> Result<ListPinnedResultsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let results: Vec<PinnedResult> = SavedResult::list_all_with_formula(&conn)
        .map_err(|e| format!("Failed to list saved results: {}", e))?
        .into_iter()
        .map(PinnedResult::from)
        .collect();

    Ok(ListPinnedResultsResponse {
        count: results.len(),
        results,
    })
}

/// Delete a saved result
pub fn delete_saved_result(db: &Database, id: i64) -> Result<DeleteSavedResultResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = SavedResult::delete(&conn, id)
        .map_err(|e| format!("Failed to delete saved result: {}", e))?;

    if !deleted {
        return Err(format!("Saved result {} not found", id));
    }

    tracing::info!(result_id = id, "deleted saved result");
    Ok(DeleteSavedResultResponse {
        success: true,
        deleted_id: id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use rust_decimal_macros::dec;

    fn test_db() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(run_migrations).unwrap();
        let sample_id = db
            .with_conn(|conn| Ok(Formula::list(conn, Default::default())?[0].id))
            .unwrap();
        (db, sample_id)
    }

    #[test]
    fn test_save_and_list() {
        let (db, id) = test_db();
        save_result(&db, id, "500").unwrap();
        save_result(&db, id, " 1.5e3 ").unwrap();

        let listed = list_saved_results(&db, id).unwrap();
        assert_eq!(listed.formula_name, "Sandwich bread");
        assert_eq!(listed.count, 2);
        assert_eq!(listed.results[0].base_ingredient_amount, dec!(1500));
        assert_eq!(listed.results[0].base_unit.symbol(), "g");
        assert_eq!(listed.results[1].base_ingredient_amount, dec!(500));
    }

    #[test]
    fn test_save_rejects_bad_amounts() {
        let (db, id) = test_db();
        assert!(save_result(&db, id, "").is_err());
        assert!(save_result(&db, id, "-3").is_err());
        assert!(save_result(&db, id, "abc").is_err());
        assert_eq!(list_saved_results(&db, id).unwrap().count, 0);
    }

    #[test]
    fn test_save_for_missing_formula() {
        let (db, _) = test_db();
        assert_eq!(save_result(&db, 999, "10").unwrap_err(), "Formula 999 not found");
        assert_eq!(list_pinned_results(&db).unwrap().count, 0);
        assert!(list_saved_results(&db, 999).is_err());
    }

    #[test]
    fn test_pinned_results_and_delete() {
        let (db, id) = test_db();
        let first = save_result(&db, id, "300").unwrap();
        let second = save_result(&db, id, "600").unwrap();

        let pinned = list_pinned_results(&db).unwrap();
        assert_eq!(pinned.count, 2);
        assert_eq!(pinned.results[0].id, second.id);
        assert_eq!(pinned.results[0].base_ingredient, "White flour (13% protein)");

        delete_saved_result(&db, first.id).unwrap();
        assert!(delete_saved_result(&db, first.id).is_err());
        assert_eq!(list_pinned_results(&db).unwrap().count, 1);
    }
}
