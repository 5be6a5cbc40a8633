//! Status Tool
//!
//! Runtime status of the service and usage instructions for assistants.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::Database;
use crate::models::Formula;

/// Formula workflow instructions for AI assistants
pub const FORMULA_INSTRUCTIONS: &str = r#"
# Baker Ratio Calculator Instructions

A formula is one **base ingredient** plus any number of **other ingredients**.
Each other ingredient stores a fixed ratio:

    ratio = amount of ingredient / amount of base ingredient

Both amounts are taken in each ingredient's own base unit (the unit chosen
when the formula was written). Scaling a formula only ever changes the base
amount; every other amount is derived from it.

---

## Units

| Type   | Units (smallest to largest)          | Default |
|--------|--------------------------------------|---------|
| mass   | mg, cg, dg, g, dag, hg, kg, t        | g       |
| volume | mL, cL, dL, L, daL, hL, kL           | mL      |

Symbols are case-sensitive. Mass and volume never convert into each other.
Use `convert_amount` for a one-off conversion and `list_units` for selectors.

---

## Writing a Formula

**By ratio** (`create_formula_by_ratio`): give each ingredient its ratio
directly, e.g. water `0.65` for 65% hydration.

**By amount** (`create_formula_by_amount`): give a base amount and an amount
for every ingredient, in the units you weighed them in. Ratios are derived
exactly (300 g flour, 180 g water gives ratio 0.6) and the base amount is
remembered as the formula's default amount. The base amount must be greater
than 0.

Numbers are decimal strings (`"0.6"`, `"1.5e3"`). Negative values are
rejected. Every ingredient needs a name.

---

## Editing and Deleting

1. Call `get_formula_edit_draft` to get the current content as a draft.
   Formulas with a default amount come back as a by-amount draft.
2. Change the draft and send it to `edit_formula_by_ratio` or
   `edit_formula_by_amount`.

`edit_formula_by_ratio` keeps the formula's default amount unless you pass
`default_amount`.

**Editing a formula deletes all of its saved results** because they were
computed from the old ratios. Deleting a formula deletes its saved results
as well. Open detail sessions on an edited formula restart from its new
default amount; sessions on a deleted formula are closed.

---

## Scaling Live

1. `open_formula_detail` with a `formula_id` (and optionally a `result_id`
   to start from a saved result). The session starts at the saved amount,
   else the default amount, else 0.
2. `update_formula_detail` with one field at a time:
   - `base_amount` / `base_unit`
   - `other_amount` / `other_unit` (needs `index`, 0-based over other ingredients)
   - `total_amount` / `total_unit` (only when every ingredient is measured by mass)
   Amount edits rescale everything else. Unit edits only re-express that one field.
3. `save_formula_detail` stores the current base amount as a saved result.
4. `close_formula_detail` when done.

For a quick answer without a session use `scale_formula`.

---

## Saved Results

- `list_saved_results` for one formula, newest first
- `list_pinned_results` across all formulas, newest first
- `delete_saved_result` removes one
- `home_summary` shows formula count, newest formulas and pinned results
"#;

/// Runtime status of the service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub formula_count: Option<i64>,

    /// Live detail sessions held in memory
    pub open_detail_sessions: usize,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status
    pub fn get_status(&self, db: &Database, open_detail_sessions: usize) -> ServiceStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let formula_count = match db.with_conn(Formula::count) {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(error = %e, "could not count formulas for status");
                None
            }
        };

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        ServiceStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            formula_count,
            open_detail_sessions,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
