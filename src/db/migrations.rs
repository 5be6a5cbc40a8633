//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("applied schema migration v1");
    }

    Ok(())
}

/// Migration v1: Initial schema plus a sample formula
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        BEGIN;

        -- ============================================
        -- FORMULAS
        -- One base ingredient per formula, stored inline
        -- ============================================
        CREATE TABLE formulas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            note TEXT NOT NULL DEFAULT '',

            base_name TEXT NOT NULL,
            base_unit_type TEXT NOT NULL CHECK(base_unit_type IN ('mass', 'volume')),
            base_unit TEXT NOT NULL,             -- unit symbol, e.g. "g", "mL"
            base_default_amount TEXT,            -- decimal string, NULL when authored by ratio

            created_at TEXT NOT NULL             -- RFC 3339, millisecond precision
        );

        CREATE INDEX idx_formulas_name ON formulas(name);
        CREATE INDEX idx_formulas_created_at ON formulas(created_at);

        -- ============================================
        -- FORMULA INGREDIENTS
        -- Ordered non-base ingredients with fixed ratios
        -- ============================================
        CREATE TABLE formula_ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            formula_id INTEGER NOT NULL REFERENCES formulas(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            ratio TEXT NOT NULL,                 -- decimal string, amount / base amount
            unit_type TEXT NOT NULL CHECK(unit_type IN ('mass', 'volume')),
            base_unit TEXT NOT NULL,

            UNIQUE(formula_id, position)
        );

        CREATE INDEX idx_formula_ingredients_formula ON formula_ingredients(formula_id);

        -- ============================================
        -- SAVED RESULTS
        -- Base ingredient amount snapshots
        -- ============================================
        CREATE TABLE saved_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            formula_id INTEGER NOT NULL REFERENCES formulas(id) ON DELETE CASCADE,
            base_ingredient_amount TEXT NOT NULL, -- decimal string, in the base ingredient's base unit
            created_at TEXT NOT NULL
        );

        CREATE INDEX idx_saved_results_formula ON saved_results(formula_id);
        CREATE INDEX idx_saved_results_created_at ON saved_results(created_at);

        -- ============================================
        -- SAMPLE
        -- ============================================
        INSERT INTO formulas (name, note, base_name, base_unit_type, base_unit, base_default_amount, created_at)
        VALUES ('Sandwich bread', 'A basic white sandwich.', 'White flour (13% protein)', 'mass', 'g', '300',
                strftime('%Y-%m-%dT%H:%M:%fZ', 'now'));

        INSERT INTO formula_ingredients (formula_id, position, name, ratio, unit_type, base_unit)
        VALUES
            ((SELECT MAX(id) FROM formulas), 0, 'Water', '0.6', 'mass', 'g'),
            ((SELECT MAX(id) FROM formulas), 1, 'Butter', '0.06', 'mass', 'g'),
            ((SELECT MAX(id) FROM formulas), 2, 'Vinegar', '0.05', 'mass', 'g'),
            ((SELECT MAX(id) FROM formulas), 3, 'Sugar', '0.02', 'mass', 'g'),
            ((SELECT MAX(id) FROM formulas), 4, 'Salt', '0.01', 'mass', 'g'),
            ((SELECT MAX(id) FROM formulas), 5, 'Yeast', '0.01', 'mass', 'g');

        COMMIT;
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(needs_migration(&conn).is_ok());
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());
    }

    #[test]
    fn test_sample_formula_seeded() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let formulas: i64 = conn
            .query_row("SELECT COUNT(*) FROM formulas", [], |row| row.get(0))
            .unwrap();
        let ingredients: i64 = conn
            .query_row("SELECT COUNT(*) FROM formula_ingredients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(formulas, 1);
        assert_eq!(ingredients, 6);
    }
}
