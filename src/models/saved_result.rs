//! Saved result model
//!
//! A snapshot of a formula's base ingredient amount. Every other amount at
//! that point can be re-derived through the formula's ratios.

use std::collections::HashMap;

use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::columns;
use super::Formula;

/// A saved scale for a formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedResult {
    pub id: i64,
    pub formula_id: i64,
    /// Expressed in the base ingredient's base unit
    pub base_ingredient_amount: Decimal,
    pub created_at: String,
}

/// A saved result joined with the formula it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct SavedResultWithFormula {
    pub result: SavedResult,
    pub formula: Formula,
}

impl SavedResult {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            formula_id: row.get("formula_id")?,
            base_ingredient_amount: columns::decimal(row, "base_ingredient_amount")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Save a result for an existing formula
    pub fn create(conn: &mut Connection, formula_id: i64, base_ingredient_amount: Decimal) -> DbResult<Self> {
        let tx = conn.transaction()?;

        if !Formula::exists(&tx, formula_id)? {
            return Err(DbError::FormulaNotFound(formula_id));
        }

        tx.execute(
            r#"
            INSERT INTO saved_results (formula_id, base_ingredient_amount, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![
                formula_id,
                base_ingredient_amount.to_string(),
                columns::now_timestamp(),
            ],
        )?;

        let id = tx.last_insert_rowid();
        tx.commit()?;

        Self::get_by_id(conn, id)?
            .ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get a saved result by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM saved_results WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(saved) => Ok(Some(saved)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Saved results of one formula, newest first
    pub fn list_for_formula(conn: &Connection, formula_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM saved_results WHERE formula_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;

        let results = stmt
            .query_map([formula_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(results)
    }

    /// Every saved result with its formula, newest first
    pub fn list_all_with_formula(conn: &Connection) -> DbResult<Vec<SavedResultWithFormula>> {
        // Read inside one transaction so results and formulas come from the same snapshot
        let tx = conn.unchecked_transaction()?;

        let results = {
            let mut stmt = tx.prepare("SELECT * FROM saved_results ORDER BY created_at DESC, id DESC")?;
            let rows = stmt
                .query_map([], Self::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut formulas: HashMap<i64, Formula> = HashMap::new();
        let mut joined = Vec::with_capacity(results.len());

        for result in results {
            let formula = match formulas.get(&result.formula_id) {
                Some(formula) => formula.clone(),
                None => {
                    let formula = Formula::get_by_id(&tx, result.formula_id)?.ok_or_else(|| {
                        DbError::InvalidData(format!(
                            "saved result {} references missing formula {}",
                            result.id, result.formula_id
                        ))
                    })?;
                    formulas.insert(formula.id, formula.clone());
                    formula
                }
            };
            joined.push(SavedResultWithFormula { result, formula });
        }

        tx.finish()?;
        Ok(joined)
    }

    /// Delete a saved result
    /// Returns Ok(true) if deleted, Ok(false) if not found
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM saved_results WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Delete every saved result of a formula; used inside formula transactions
    pub fn delete_for_formula(conn: &Connection, formula_id: i64) -> DbResult<usize> {
        let rows = conn.execute("DELETE FROM saved_results WHERE formula_id = ?1", [formula_id])?;
        Ok(rows)
    }

    /// Count saved results of a formula
    pub fn count_for_formula(conn: &Connection, formula_id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM saved_results WHERE formula_id = ?1",
            [formula_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::measurement::{MassUnit, Unit};
    use crate::models::{BaseIngredient, FormulaData, OtherIngredient};
    use rust_decimal_macros::dec;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn.execute("DELETE FROM formulas", []).unwrap();
        conn
    }

    fn pizza(conn: &mut Connection) -> Formula {
        let data = FormulaData {
            name: "Pizza".to_string(),
            base_ingredient: BaseIngredient::new("Flour", Unit::Mass(MassUnit::G), None),
            other_ingredients: vec![OtherIngredient::new("Water", dec!(0.65), Unit::Mass(MassUnit::G))],
            note: String::new(),
        };
        Formula::create(conn, &data).unwrap()
    }

    #[test]
    fn test_create_and_list_newest_first() {
        let mut conn = test_conn();
        let formula = pizza(&mut conn);

        let first = SavedResult::create(&mut conn, formula.id, dec!(250)).unwrap();
        let second = SavedResult::create(&mut conn, formula.id, dec!(1000.5)).unwrap();

        let listed = SavedResult::list_for_formula(&conn, formula.id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[0].base_ingredient_amount, dec!(1000.5));
        assert_eq!(listed[1].id, first.id);
    }

    #[test]
    fn test_create_for_missing_formula_writes_nothing() {
        let mut conn = test_conn();
        let err = SavedResult::create(&mut conn, 77, dec!(10)).unwrap_err();
        assert!(matches!(err, DbError::FormulaNotFound(77)));

        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM saved_results", [], |row| row.get(0))
            .unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn test_delete() {
        let mut conn = test_conn();
        let formula = pizza(&mut conn);
        let saved = SavedResult::create(&mut conn, formula.id, dec!(250)).unwrap();

        assert!(SavedResult::delete(&conn, saved.id).unwrap());
        assert!(!SavedResult::delete(&conn, saved.id).unwrap());
        assert!(SavedResult::get_by_id(&conn, saved.id).unwrap().is_none());
    }

    #[test]
    fn test_list_all_with_formula() {
        let mut conn = test_conn();
        let a = pizza(&mut conn);
        let b = pizza(&mut conn);

        SavedResult::create(&mut conn, a.id, dec!(1)).unwrap();
        SavedResult::create(&mut conn, b.id, dec!(2)).unwrap();
        SavedResult::create(&mut conn, a.id, dec!(3)).unwrap();

        let all = SavedResult::list_all_with_formula(&conn).unwrap();
        let amounts: Vec<_> = all.iter().map(|r| r.result.base_ingredient_amount).collect();
        assert_eq!(amounts, [dec!(3), dec!(2), dec!(1)]);
        assert_eq!(all[0].formula.id, a.id);
        assert_eq!(all[1].formula.id, b.id);
        assert_eq!(all[0].formula.other_ingredients.len(), 1);
    }
}
