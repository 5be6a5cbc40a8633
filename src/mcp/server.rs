//! MCP Server Implementation
//!
//! Exposes formula authoring, scaling and saved results as MCP tools.

use std::path::PathBuf;
use std::sync::{Arc, MutexGuard};

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::authoring::{AmountDraft, AmountRow, FormulaDraft, RatioDraft, RatioRow, UnitSelection};
use crate::db::Database;
use crate::measurement::Unit;
use crate::tools::detail::{self, DetailSessions};
use crate::tools::formulas;
use crate::tools::results;
use crate::tools::status::StatusTracker;
use crate::tools::units;

/// Baker Ratio MCP Service
#[derive(Clone)]
pub struct BakerRatioService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    tool_router: ToolRouter<BakerRatioService>,
    /// Live formula detail sessions; each tool call applies one edit under the lock
    sessions: Arc<std::sync::Mutex<DetailSessions>>,
}

impl BakerRatioService {
    pub fn new(database_path: PathBuf, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            database,
            tool_router: Self::tool_router(),
            sessions: Arc::new(std::sync::Mutex::new(DetailSessions::new())),
        }
    }

    fn sessions(&self) -> Result<MutexGuard<'_, DetailSessions>, McpError> {
        self.sessions
            .lock()
            .map_err(|_| McpError::internal_error("Detail sessions are unavailable", None))
    }

    /// Reload or close the detail sessions of a formula that was edited or deleted
    ///
    /// The store change has already committed, so a failure here is only
    /// logged; saving a stale session is refused anyway.
    fn refresh_sessions(&self, formula_id: i64) {
        let refreshed = self
            .sessions()
            .map_err(|e| e.message.to_string())
            .and_then(|mut sessions| sessions.refresh_formula(&self.database, formula_id));
        if let Err(e) = refreshed {
            tracing::warn!(formula_id, error = %e, "could not refresh detail sessions");
        }
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn tool_error(message: String) -> McpError {
    McpError::internal_error(message, None)
}

fn unit_selection(symbol: &str) -> Result<UnitSelection, String> {
    Unit::parse(symbol.trim())
        .map(UnitSelection::from_unit)
        .ok_or_else(|| format!("Unknown unit: '{}'", symbol))
}

fn default_unit() -> String { "g".to_string() }
fn default_sort_by() -> String { "created_at".to_string() }
fn default_sort_order() -> String { "desc".to_string() }

// ============================================================================
// Formula Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RatioIngredientParam {
    /// Ingredient name
    pub name: String,
    /// Ratio to the base ingredient as a decimal string, e.g. "0.65"
    pub ratio: String,
    /// Unit symbol, e.g. "g", "kg", "mL" (default g)
    #[serde(default = "default_unit")]
    pub unit: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RatioFormulaParams {
    /// Formula name
    pub name: String,
    /// Free-form note (optional)
    #[serde(default)]
    pub note: String,
    /// Base ingredient name, e.g. "Flour"
    pub base_name: String,
    /// Base ingredient unit symbol (default g)
    #[serde(default = "default_unit")]
    pub base_unit: String,
    /// Other ingredients in display order
    #[serde(default)]
    pub ingredients: Vec<RatioIngredientParam>,
}

impl RatioFormulaParams {
    fn into_draft(self) -> Result<FormulaDraft, String> {
        self.into_ratio_draft().map(FormulaDraft::ByRatio)
    }

    fn into_ratio_draft(self) -> Result<RatioDraft, String> {
        let rows = self
            .ingredients
            .into_iter()
            .map(|i| {
                Ok(RatioRow {
                    units: unit_selection(&i.unit)?,
                    name: i.name,
                    ratio: i.ratio,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok(RatioDraft {
            name: self.name,
            note: self.note,
            base_name: self.base_name,
            base_units: unit_selection(&self.base_unit)?,
            default_amount: None,
            rows,
        })
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AmountIngredientParam {
    /// Ingredient name
    pub name: String,
    /// Amount as a decimal string, in `unit`
    pub amount: String,
    /// Unit symbol (default g)
    #[serde(default = "default_unit")]
    pub unit: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AmountFormulaParams {
    /// Formula name
    pub name: String,
    /// Free-form note (optional)
    #[serde(default)]
    pub note: String,
    /// Base ingredient name
    pub base_name: String,
    /// Base ingredient amount as a decimal string; must be greater than 0
    pub base_amount: String,
    /// Base ingredient unit symbol (default g)
    #[serde(default = "default_unit")]
    pub base_unit: String,
    /// Other ingredients in display order
    #[serde(default)]
    pub ingredients: Vec<AmountIngredientParam>,
}

impl AmountFormulaParams {
    fn into_draft(self) -> Result<FormulaDraft, String> {
        let rows = self
            .ingredients
            .into_iter()
            .map(|i| {
                Ok(AmountRow {
                    units: unit_selection(&i.unit)?,
                    name: i.name,
                    amount: i.amount,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok(FormulaDraft::ByAmount(AmountDraft {
            name: self.name,
            note: self.note,
            base_name: self.base_name,
            base_amount: self.base_amount,
            base_units: unit_selection(&self.base_unit)?,
            rows,
        }))
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EditFormulaByRatioParams {
    /// Formula ID to replace
    pub id: i64,
    /// Default base amount as a decimal string (default: keep the formula's current one)
    pub default_amount: Option<String>,
    #[serde(flatten)]
    pub formula: RatioFormulaParams,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EditFormulaByAmountParams {
    /// Formula ID to replace
    pub id: i64,
    #[serde(flatten)]
    pub formula: AmountFormulaParams,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FormulaIdParams {
    /// Formula ID
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListFormulasParams {
    /// Sort by: name or created_at (default created_at)
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    /// Sort order: asc or desc (default desc)
    #[serde(default = "default_sort_order")]
    pub sort_order: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ScaleFormulaParams {
    /// Formula ID
    pub formula_id: i64,
    /// Base ingredient amount in its base unit (default: the formula's default amount)
    pub base_amount: Option<String>,
}

// ============================================================================
// Saved Result Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveResultParams {
    /// Formula ID
    pub formula_id: i64,
    /// Base ingredient amount in the base ingredient's base unit
    pub base_ingredient_amount: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListSavedResultsParams {
    /// Formula ID
    pub formula_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteSavedResultParams {
    /// Saved result ID to delete
    pub id: i64,
}

// ============================================================================
// Unit and Detail Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConvertAmountParams {
    /// Amount as a decimal string
    pub amount: String,
    /// Source unit symbol
    pub from: String,
    /// Target unit symbol of the same type
    pub to: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct OpenFormulaDetailParams {
    /// Formula ID
    pub formula_id: i64,
    /// Saved result to start from (optional)
    pub result_id: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateFormulaDetailParams {
    /// Session ID from open_formula_detail
    pub session_id: u64,
    /// One of: base_amount, base_unit, other_amount, other_unit, total_amount, total_unit
    pub field: String,
    /// 0-based other ingredient index, required for other_amount and other_unit
    pub index: Option<usize>,
    /// New amount (decimal string) or unit symbol
    pub value: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SessionIdParams {
    /// Session ID from open_formula_detail
    pub session_id: u64,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl BakerRatioService {
    // --- Status ---

    #[tool(description = "Get the current status of the Baker Ratio service including build info, database status, open detail sessions and process information")]
    async fn baker_status(&self) -> Result<CallToolResult, McpError> {
        let open_sessions = self.sessions()?.len();
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(&self.database, open_sessions);
        json_result(&status)
    }

    #[tool(description = "Get instructions for writing, scaling and saving baker's formulas. Call this when starting a session or when unsure how ratios and units work.")]
    fn formula_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::FORMULA_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(FORMULA_INSTRUCTIONS)]))
    }

    #[tool(description = "Overview: formula count, newest formulas and all saved results")]
    fn home_summary(&self) -> Result<CallToolResult, McpError> {
        let result = formulas::home_summary(&self.database).map_err(tool_error)?;
        json_result(&result)
    }

    // --- Formulas ---

    #[tool(description = "Create a formula from ratios to the base ingredient")]
    fn create_formula_by_ratio(&self, Parameters(p): Parameters<RatioFormulaParams>) -> Result<CallToolResult, McpError> {
        let draft = p.into_draft().map_err(tool_error)?;
        let result = formulas::create_formula(&self.database, &draft).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Create a formula from absolute amounts. Ratios are derived as amount / base amount and the base amount is kept as the default.")]
    fn create_formula_by_amount(&self, Parameters(p): Parameters<AmountFormulaParams>) -> Result<CallToolResult, McpError> {
        let draft = p.into_draft().map_err(tool_error)?;
        let result = formulas::create_formula(&self.database, &draft).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Get a formula with its ingredients, ratios and saved results")]
    fn get_formula(&self, Parameters(p): Parameters<FormulaIdParams>) -> Result<CallToolResult, McpError> {
        let result = formulas::get_formula(&self.database, p.id).map_err(tool_error)?;
        match result {
            Some(formula) => json_result(&formula),
            None => Ok(CallToolResult::success(vec![Content::text(format!(
                r#"{{"error": "Formula not found", "id": {}}}"#,
                p.id
            ))])),
        }
    }

    #[tool(description = "List formulas sorted by name or creation time")]
    fn list_formulas(&self, Parameters(p): Parameters<ListFormulasParams>) -> Result<CallToolResult, McpError> {
        let result = formulas::list_formulas(&self.database, &p.sort_by, &p.sort_order).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Get a prefilled draft for editing a formula: by amount when it has a default amount, by ratio otherwise")]
    fn get_formula_edit_draft(&self, Parameters(p): Parameters<FormulaIdParams>) -> Result<CallToolResult, McpError> {
        let draft = formulas::get_edit_draft(&self.database, p.id)
            .map_err(tool_error)?
            .ok_or_else(|| tool_error(format!("Formula {} not found", p.id)))?;
        json_result(&draft)
    }

    #[tool(description = "Replace a formula using ratios. WARNING: deletes all saved results of the formula.")]
    fn edit_formula_by_ratio(&self, Parameters(p): Parameters<EditFormulaByRatioParams>) -> Result<CallToolResult, McpError> {
        let draft = p.formula.into_ratio_draft().map_err(tool_error)?;
        let result = formulas::edit_formula_by_ratio(&self.database, p.id, draft, p.default_amount.as_deref())
            .map_err(tool_error)?;
        self.refresh_sessions(p.id);
        json_result(&result)
    }

    #[tool(description = "Replace a formula using absolute amounts. WARNING: deletes all saved results of the formula.")]
    fn edit_formula_by_amount(&self, Parameters(p): Parameters<EditFormulaByAmountParams>) -> Result<CallToolResult, McpError> {
        let draft = p.formula.into_draft().map_err(tool_error)?;
        let result = formulas::edit_formula(&self.database, p.id, &draft).map_err(tool_error)?;
        self.refresh_sessions(p.id);
        json_result(&result)
    }

    #[tool(description = "Delete a formula and all of its saved results")]
    fn delete_formula(&self, Parameters(p): Parameters<FormulaIdParams>) -> Result<CallToolResult, McpError> {
        let result = formulas::delete_formula(&self.database, p.id).map_err(tool_error)?;
        self.refresh_sessions(p.id);
        json_result(&result)
    }

    #[tool(description = "Scale a formula to a base amount and return every ingredient amount, without opening a session")]
    fn scale_formula(&self, Parameters(p): Parameters<ScaleFormulaParams>) -> Result<CallToolResult, McpError> {
        let result = detail::scale_formula(&self.database, p.formula_id, p.base_amount.as_deref())
            .map_err(tool_error)?;
        json_result(&result)
    }

    // --- Saved Results ---

    #[tool(description = "Save a base ingredient amount (in its base unit) as a result of a formula")]
    fn save_result(&self, Parameters(p): Parameters<SaveResultParams>) -> Result<CallToolResult, McpError> {
        let result = results::save_result(&self.database, p.formula_id, &p.base_ingredient_amount)
            .map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "List saved results of a formula, newest first")]
    fn list_saved_results(&self, Parameters(p): Parameters<ListSavedResultsParams>) -> Result<CallToolResult, McpError> {
        let result = results::list_saved_results(&self.database, p.formula_id).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "List saved results across all formulas, newest first")]
    fn list_pinned_results(&self) -> Result<CallToolResult, McpError> {
        let result = results::list_pinned_results(&self.database).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Delete a saved result")]
    fn delete_saved_result(&self, Parameters(p): Parameters<DeleteSavedResultParams>) -> Result<CallToolResult, McpError> {
        let result = results::delete_saved_result(&self.database, p.id).map_err(tool_error)?;
        json_result(&result)
    }

    // --- Units ---

    #[tool(description = "Convert an amount between two mass units or two volume units")]
    fn convert_amount(&self, Parameters(p): Parameters<ConvertAmountParams>) -> Result<CallToolResult, McpError> {
        let result = units::convert_amount(&p.amount, &p.from, &p.to).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "List supported units grouped by type, with the default unit of each type")]
    fn list_units(&self) -> Result<CallToolResult, McpError> {
        json_result(&units::list_units())
    }

    // --- Live Detail ---

    #[tool(description = "Open a live detail session on a formula, starting from a saved result, else the default amount, else 0")]
    fn open_formula_detail(&self, Parameters(p): Parameters<OpenFormulaDetailParams>) -> Result<CallToolResult, McpError> {
        let result = self
            .sessions()?
            .open(&self.database, p.formula_id, p.result_id)
            .map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Edit one field of a detail session and get every recomputed amount. Amount edits rescale the formula; unit edits re-express only that field.")]
    fn update_formula_detail(&self, Parameters(p): Parameters<UpdateFormulaDetailParams>) -> Result<CallToolResult, McpError> {
        let result = self
            .sessions()?
            .update(p.session_id, &p.field, p.index, &p.value)
            .map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Get the current amounts of a detail session")]
    fn get_formula_detail(&self, Parameters(p): Parameters<SessionIdParams>) -> Result<CallToolResult, McpError> {
        let result = self.sessions()?.get(p.session_id).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Save the current base amount of a detail session as a saved result")]
    fn save_formula_detail(&self, Parameters(p): Parameters<SessionIdParams>) -> Result<CallToolResult, McpError> {
        let result = self
            .sessions()?
            .save(&self.database, p.session_id)
            .map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Close a detail session")]
    fn close_formula_detail(&self, Parameters(p): Parameters<SessionIdParams>) -> Result<CallToolResult, McpError> {
        let result = self.sessions()?.close(p.session_id).map_err(tool_error)?;
        json_result(&result)
    }
}

#[tool_handler]
impl ServerHandler for BakerRatioService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "baker-ratio".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Baker Ratio Calculator".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Baker Ratio Calculator - baker's formulas as ratios to a base ingredient. \
                 IMPORTANT: Call formula_instructions before writing or scaling formulas. \
                 Formulas: create_formula_by_ratio/create_formula_by_amount, get_formula, list_formulas, \
                 get_formula_edit_draft, edit_formula_by_ratio/edit_formula_by_amount (deletes saved results), delete_formula. \
                 Scaling: scale_formula, or open/update/get/save/close_formula_detail for live edits. \
                 Results: save_result, list_saved_results, list_pinned_results, delete_saved_result. \
                 Units: convert_amount, list_units. Overview: home_summary, baker_status."
                    .into(),
            ),
        }
    }
}
