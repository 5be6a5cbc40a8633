//! Formula model
//!
//! A base ingredient plus ordered other ingredients, each with a fixed
//! ratio to the base.

use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::measurement::{Unit, UnitType};
use super::columns;
use super::SavedResult;

/// The ingredient every ratio is relative to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseIngredient {
    pub name: String,
    pub unit_type: UnitType,
    pub base_unit: Unit,
    /// Amount last used to derive ratios; absent when authored by ratio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_amount: Option<Decimal>,
}

impl BaseIngredient {
    pub fn new(name: impl Into<String>, base_unit: Unit, default_amount: Option<Decimal>) -> Self {
        Self {
            name: name.into(),
            unit_type: base_unit.unit_type(),
            base_unit,
            default_amount,
        }
    }
}

/// A non-base ingredient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherIngredient {
    pub name: String,
    /// Amount of this ingredient / amount of the base, each in its own base unit
    pub ratio: Decimal,
    pub unit_type: UnitType,
    pub base_unit: Unit,
}

impl OtherIngredient {
    pub fn new(name: impl Into<String>, ratio: Decimal, base_unit: Unit) -> Self {
        Self {
            name: name.into(),
            ratio,
            unit_type: base_unit.unit_type(),
            base_unit,
        }
    }
}

/// Formula content without store-assigned fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaData {
    pub name: String,
    pub base_ingredient: BaseIngredient,
    pub other_ingredients: Vec<OtherIngredient>,
    #[serde(default)]
    pub note: String,
}

/// A stored formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub id: i64,
    pub name: String,
    pub base_ingredient: BaseIngredient,
    pub other_ingredients: Vec<OtherIngredient>,
    pub note: String,
    pub created_at: String,
}

/// Column a formula list is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaSortKey {
    CreatedAt,
    Name,
}

/// Iteration direction over the sort index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Ordering for formula listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaSort {
    pub key: FormulaSortKey,
    pub direction: SortDirection,
}

impl Default for FormulaSort {
    fn default() -> Self {
        Self {
            key: FormulaSortKey::CreatedAt,
            direction: SortDirection::Descending,
        }
    }
}

impl FormulaSort {
    /// Parse loose sort parameters; unknown values fall back to name / ascending
    pub fn from_strs(sort_by: &str, sort_order: &str) -> Self {
        let key = match sort_by.to_lowercase().as_str() {
            "created_at" | "createdat" | "created" => FormulaSortKey::CreatedAt,
            _ => FormulaSortKey::Name,
        };
        let direction = match sort_order.to_lowercase().as_str() {
            "desc" | "descending" | "prev" => SortDirection::Descending,
            _ => SortDirection::Ascending,
        };
        Self { key, direction }
    }

    fn order_by(&self) -> &'static str {
        match (self.key, self.direction) {
            (FormulaSortKey::CreatedAt, SortDirection::Ascending) => "created_at ASC, id ASC",
            (FormulaSortKey::CreatedAt, SortDirection::Descending) => "created_at DESC, id DESC",
            (FormulaSortKey::Name, SortDirection::Ascending) => "name ASC, id ASC",
            (FormulaSortKey::Name, SortDirection::Descending) => "name DESC, id DESC",
        }
    }
}

impl Formula {
    /// Create a Formula (without other ingredients) from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let base_unit = columns::unit(row, "base_unit_type", "base_unit")?;
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            base_ingredient: BaseIngredient {
                name: row.get("base_name")?,
                unit_type: base_unit.unit_type(),
                base_unit,
                default_amount: columns::optional_decimal(row, "base_default_amount")?,
            },
            other_ingredients: Vec::new(),
            note: row.get("note")?,
            created_at: row.get("created_at")?,
        })
    }

    fn ingredient_from_row(row: &Row) -> rusqlite::Result<OtherIngredient> {
        let base_unit = columns::unit(row, "unit_type", "base_unit")?;
        Ok(OtherIngredient {
            name: row.get("name")?,
            ratio: columns::decimal(row, "ratio")?,
            unit_type: base_unit.unit_type(),
            base_unit,
        })
    }

    /// True when every ingredient, base included, is measured by mass
    pub fn all_mass(&self) -> bool {
        self.base_ingredient.unit_type == UnitType::Mass
            && self
                .other_ingredients
                .iter()
                .all(|i| i.unit_type == UnitType::Mass)
    }

    /// Content of this formula without store-assigned fields
    pub fn data(&self) -> FormulaData {
        FormulaData {
            name: self.name.clone(),
            base_ingredient: self.base_ingredient.clone(),
            other_ingredients: self.other_ingredients.clone(),
            note: self.note.clone(),
        }
    }

    fn load_ingredients(conn: &Connection, formula_id: i64) -> DbResult<Vec<OtherIngredient>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM formula_ingredients WHERE formula_id = ?1 ORDER BY position",
        )?;

        let ingredients = stmt
            .query_map([formula_id], Self::ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ingredients)
    }

    fn insert_ingredients(
        conn: &Connection,
        formula_id: i64,
        ingredients: &[OtherIngredient],
    ) -> DbResult<()> {
        let mut stmt = conn.prepare(
            r#"
            INSERT INTO formula_ingredients (formula_id, position, name, ratio, unit_type, base_unit)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )?;

        for (position, ingredient) in ingredients.iter().enumerate() {
            stmt.execute(params![
                formula_id,
                position as i64,
                ingredient.name,
                ingredient.ratio.to_string(),
                ingredient.base_unit.unit_type().to_db_str(),
                ingredient.base_unit.symbol(),
            ])?;
        }

        Ok(())
    }

    /// Insert a new formula with its ingredients
    pub fn create(conn: &mut Connection, data: &FormulaData) -> DbResult<Self> {
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO formulas (name, note, base_name, base_unit_type, base_unit, base_default_amount, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                data.name,
                data.note,
                data.base_ingredient.name,
                data.base_ingredient.base_unit.unit_type().to_db_str(),
                data.base_ingredient.base_unit.symbol(),
                data.base_ingredient.default_amount.map(|d| d.to_string()),
                columns::now_timestamp(),
            ],
        )?;

        let id = tx.last_insert_rowid();
        Self::insert_ingredients(&tx, id, &data.other_ingredients)?;
        tx.commit()?;

        Self::get_by_id(conn, id)?.ok_or(DbError::FormulaNotFound(id))
    }

    /// Get a formula by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM formulas WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(mut formula) => {
                formula.other_ingredients = Self::load_ingredients(conn, id)?;
                Ok(Some(formula))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether a formula ID is present
    pub fn exists(conn: &Connection, id: i64) -> DbResult<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM formulas WHERE id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List all formulas in the requested order
    pub fn list(conn: &Connection, sort: FormulaSort) -> DbResult<Vec<Self>> {
        let sql = format!("SELECT * FROM formulas ORDER BY {}", sort.order_by());
        let mut stmt = conn.prepare(&sql)?;

        let mut formulas = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        for formula in &mut formulas {
            formula.other_ingredients = Self::load_ingredients(conn, formula.id)?;
        }

        Ok(formulas)
    }

    /// Replace a formula's content
    ///
    /// Saved results are derived from the old ratios, so they are deleted in
    /// the same transaction. `created_at` is reset to now. Returns the new
    /// formula and the number of saved results removed.
    pub fn replace(conn: &mut Connection, id: i64, data: &FormulaData) -> DbResult<(Self, usize)> {
        let tx = conn.transaction()?;

        if !Self::exists(&tx, id)? {
            return Err(DbError::FormulaNotFound(id));
        }

        let deleted_results = SavedResult::delete_for_formula(&tx, id)?;

        tx.execute(
            r#"
            UPDATE formulas SET
                name = ?1,
                note = ?2,
                base_name = ?3,
                base_unit_type = ?4,
                base_unit = ?5,
                base_default_amount = ?6,
                created_at = ?7
            WHERE id = ?8
            "#,
            params![
                data.name,
                data.note,
                data.base_ingredient.name,
                data.base_ingredient.base_unit.unit_type().to_db_str(),
                data.base_ingredient.base_unit.symbol(),
                data.base_ingredient.default_amount.map(|d| d.to_string()),
                columns::now_timestamp(),
                id,
            ],
        )?;

        tx.execute("DELETE FROM formula_ingredients WHERE formula_id = ?1", [id])?;
        Self::insert_ingredients(&tx, id, &data.other_ingredients)?;
        tx.commit()?;

        let formula = Self::get_by_id(conn, id)?.ok_or(DbError::FormulaNotFound(id))?;
        Ok((formula, deleted_results))
    }

    /// Delete a formula together with its saved results, returning how many results went with it
    pub fn delete(conn: &mut Connection, id: i64) -> DbResult<usize> {
        let tx = conn.transaction()?;

        if !Self::exists(&tx, id)? {
            return Err(DbError::FormulaNotFound(id));
        }

        let deleted_results = SavedResult::delete_for_formula(&tx, id)?;
        tx.execute("DELETE FROM formula_ingredients WHERE formula_id = ?1", [id])?;
        tx.execute("DELETE FROM formulas WHERE id = ?1", [id])?;
        tx.commit()?;

        Ok(deleted_results)
    }

    /// Count formulas
    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM formulas", [], |row| row.get(0))?;
        Ok(count)
    }
}
