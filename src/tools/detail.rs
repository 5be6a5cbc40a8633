//! Formula Detail Session Tools
//!
//! A session keeps one live [`FormulaDetail`] between tool calls so a
//! client can edit one field at a time and read back every other amount.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::calculator::{DetailChange, DetailView, FormulaDetail};
use crate::db::Database;
use crate::measurement::{parse_amount, Unit};
use crate::models::{Formula, SavedResult};
use super::results::save_amount;

/// Response carrying the current state of a session
#[derive(Debug, Serialize)]
pub struct DetailSessionResponse {
    pub session_id: u64,
    /// Saved result the session was initialized from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_result_id: Option<i64>,
    pub detail: DetailView,
}

/// Response for save_formula_detail
#[derive(Debug, Serialize)]
pub struct SaveDetailResponse {
    pub session_id: u64,
    pub result: SavedResult,
}

/// Response for close_formula_detail
#[derive(Debug, Serialize)]
pub struct CloseDetailResponse {
    pub success: bool,
    pub session_id: u64,
}

/// Parse one field edit
///
/// `field` is one of base_amount, base_unit, other_amount, other_unit,
/// total_amount or total_unit; the other_* fields need `index`.
pub fn parse_change(field: &str, index: Option<usize>, value: &str) -> Result<DetailChange, String> {
    let amount = || parse_amount(value).map_err(|e| format!("Invalid amount: {}", e));
    let unit = || Unit::parse(value.trim()).ok_or_else(|| format!("Unknown unit: '{}'", value));
    let index = || index.ok_or_else(|| format!("Field '{}' requires an ingredient index", field));

    let change = match field.trim().to_lowercase().as_str() {
        "base_amount" => DetailChange::BaseAmount(amount()?),
        "base_unit" => DetailChange::BaseUnit(unit()?),
        "other_amount" => DetailChange::OtherAmount {
            index: index()?,
            amount: amount()?,
        },
        "other_unit" => DetailChange::OtherUnit {
            index: index()?,
            unit: unit()?,
        },
        "total_amount" => DetailChange::TotalAmount(amount()?),
        "total_unit" => DetailChange::TotalUnit(unit()?),
        other => return Err(format!("Unknown field: '{}'", other)),
    };

    Ok(change)
}

/// Load a formula and initialize its detail
///
/// A saved result that belongs to another formula is ignored.
fn load_detail(
    db: &Database,
    formula_id: i64,
    result_id: Option<i64>,
    scale: Option<Decimal>,
) -> Result<(FormulaDetail, Option<i64>), String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let formula = Formula::get_by_id(&conn, formula_id)
        .map_err(|e| format!("Failed to get formula: {}", e))?
        .ok_or_else(|| format!("Formula {} not found", formula_id))?;

    let initial_result = match result_id {
        Some(id) => {
            let result = SavedResult::get_by_id(&conn, id)
                .map_err(|e| format!("Failed to get saved result: {}", e))?;
            match result {
                Some(r) if r.formula_id == formula_id => Some(r),
                _ => {
                    tracing::warn!(formula_id, result_id = id, "saved result not found for formula, using default amount");
                    None
                }
            }
        }
        None => None,
    };

    let detail = match scale {
        Some(scale) => FormulaDetail::with_scale(formula, scale),
        None => FormulaDetail::new(formula, initial_result.as_ref()),
    }
    .map_err(|e| e.to_string())?;

    Ok((detail, initial_result.map(|r| r.id)))
}

/// Scale a formula without opening a session
pub fn scale_formula(db: &Database, formula_id: i64, base_amount: Option<&str>) -> Result<DetailView, String> {
    let scale = base_amount
        .map(|text| parse_amount(text).map_err(|e| format!("Invalid base amount: {}", e)))
        .transpose()?;

    let (detail, _) = load_detail(db, formula_id, None, scale)?;
    Ok(detail.view())
}

/// Open live detail sessions
#[derive(Debug, Default)]
pub struct DetailSessions {
    sessions: HashMap<u64, FormulaDetail>,
    next_id: u64,
}

impl DetailSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn session(&self, session_id: u64) -> Result<&FormulaDetail, String> {
        self.sessions
            .get(&session_id)
            .ok_or_else(|| format!("Detail session {} not found", session_id))
    }

    /// Open a session on a formula, optionally starting from a saved result
    pub fn open(
        &mut self,
        db: &Database,
        formula_id: i64,
        result_id: Option<i64>,
    ) -> Result<DetailSessionResponse, String> {
        let (detail, initial_result_id) = load_detail(db, formula_id, result_id, None)?;

        self.next_id += 1;
        let session_id = self.next_id;
        let view = detail.view();
        self.sessions.insert(session_id, detail);

        tracing::info!(session_id, formula_id, "opened formula detail");
        Ok(DetailSessionResponse {
            session_id,
            initial_result_id,
            detail: view,
        })
    }

    /// Current state of a session
    pub fn get(&self, session_id: u64) -> Result<DetailSessionResponse, String> {
        Ok(DetailSessionResponse {
            session_id,
            initial_result_id: None,
            detail: self.session(session_id)?.view(),
        })
    }

    /// Apply one edit; a rejected edit leaves the session unchanged
    pub fn update(
        &mut self,
        session_id: u64,
        field: &str,
        index: Option<usize>,
        value: &str,
    ) -> Result<DetailSessionResponse, String> {
        let change = parse_change(field, index, value)?;

        let detail = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| format!("Detail session {} not found", session_id))?;

        detail.apply(change).map_err(|e| {
            tracing::warn!(session_id, ?change, error = %e, "rejected detail edit");
            e.to_string()
        })?;

        Ok(DetailSessionResponse {
            session_id,
            initial_result_id: None,
            detail: detail.view(),
        })
    }

    /// Persist the session's base amount as a saved result
    ///
    /// Fails when the formula changed since the session was loaded, since the
    /// amount was worked out from the old ratios and base unit.
    pub fn save(&self, db: &Database, session_id: u64) -> Result<SaveDetailResponse, String> {
        let detail = self.session(session_id)?;
        let formula_id = detail.formula().id;

        let current = db
            .with_conn(|conn| Formula::get_by_id(conn, formula_id))
            .map_err(|e| format!("Failed to get formula: {}", e))?;
        match current {
            Some(formula) if formula == *detail.formula() => {}
            Some(_) => {
                tracing::warn!(session_id, formula_id, "refusing to save stale detail session");
                return Err(format!(
                    "Formula {} was edited after detail session {} was opened; reopen it",
                    formula_id, session_id
                ));
            }
            None => return Err(format!("Formula {} not found", formula_id)),
        }

        let amount = detail.saved_amount().map_err(|e| e.to_string())?;
        let result = save_amount(db, formula_id, amount)?;

        Ok(SaveDetailResponse { session_id, result })
    }

    /// Reload every session on a formula after it was edited, or close them
    /// if it was deleted. Reloaded sessions start over from the default amount.
    ///
    /// Returns the number of sessions touched.
    pub fn refresh_formula(&mut self, db: &Database, formula_id: i64) -> Result<usize, String> {
        let ids: Vec<u64> = self
            .sessions
            .iter()
            .filter(|(_, detail)| detail.formula().id == formula_id)
            .map(|(id, _)| *id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let formula = db
            .with_conn(|conn| Formula::get_by_id(conn, formula_id))
            .map_err(|e| format!("Failed to get formula: {}", e))?;

        match formula {
            Some(formula) => {
                for id in &ids {
                    let detail = FormulaDetail::new(formula.clone(), None).map_err(|e| e.to_string())?;
                    self.sessions.insert(*id, detail);
                }
                tracing::info!(formula_id, sessions = ids.len(), "reloaded detail sessions of edited formula");
            }
            None => {
                for id in &ids {
                    self.sessions.remove(id);
                }
                tracing::info!(formula_id, sessions = ids.len(), "closed detail sessions of deleted formula");
            }
        }

        Ok(ids.len())
    }

    pub fn close(&mut self, session_id: u64) -> Result<CloseDetailResponse, String> {
        self.sessions
            .remove(&session_id)
            .ok_or_else(|| format!("Detail session {} not found", session_id))?;

        tracing::info!(session_id, "closed formula detail");
        Ok(CloseDetailResponse {
            success: true,
            session_id,
        })
    }
}
