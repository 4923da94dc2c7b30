//! Aggregation & response building.
//!
//! Converts a dispatch table into the caller-facing shape. The merge of
//! multiple successful results is an external capability behind [`Merger`];
//! the default concatenates labelled per-worker lines and, when every part
//! parses as a `"<value> <unit>"` quantity in one unit, appends a total.
//!
//! Reply extraction is deliberately tolerant: token search only, and text
//! that matches nothing passes through untouched so format drift in one
//! worker never becomes a hard parse error.

use async_trait::async_trait;
use fanout_core::{RunId, RunState, TaskId, WorkerId};

use crate::error::SupervisorError;
use crate::table::DispatchTable;

/// The merged outcome of a completed (or deadline-forced) run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    pub run_id: RunId,
    /// Caller-facing response text.
    pub response: String,
    pub state: RunState,
    /// True when the run deadline forced aggregation before every task
    /// reached a terminal status.
    pub partial: bool,
    /// Order id extracted from a single-task action reply, when present.
    pub order_id: Option<String>,
    /// Failed tasks, annotated rather than silently merged.
    pub failures: Vec<TaskFailure>,
}

/// One terminally failed task, as surfaced to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFailure {
    pub task_id: TaskId,
    pub worker: WorkerId,
    pub error: String,
}

/// External merge capability for multi-task runs. The count and identity of
/// the inputs always match the set of succeeded tasks exactly.
#[async_trait]
pub trait Merger: Send + Sync {
    async fn merge(&self, parts: &[(WorkerId, String)]) -> String;
}

/// Default merger: one `worker : text` line per succeeded task, plus a
/// summed total when all parts are quantities in the same unit.
pub struct LineMerger;

#[async_trait]
impl Merger for LineMerger {
    async fn merge(&self, parts: &[(WorkerId, String)]) -> String {
        let mut lines: Vec<String> = parts
            .iter()
            .map(|(worker, text)| format!("{} : {}", worker, text.trim()))
            .collect();

        if let Some(total) = sum_quantities(parts) {
            lines.push(total);
        }

        lines.join("\n")
    }
}

/// Sum `"<value> <unit>"` parts sharing one unit; None if any part differs
/// or does not parse.
fn sum_quantities(parts: &[(WorkerId, String)]) -> Option<String> {
    if parts.len() < 2 {
        return None;
    }
    let mut total = 0.0;
    let mut unit: Option<String> = None;
    for (_, text) in parts {
        let (value, u) = parse_quantity(text)?;
        match &unit {
            Some(existing) if existing != &u => return None,
            Some(_) => {}
            None => unit = Some(u),
        }
        total += value;
    }
    unit.map(|u| format!("total : {total} {u}"))
}

/// Parse the `"<value> <unit>"` inventory convention. Returns None for
/// anything else; callers treat that as opaque text.
pub fn parse_quantity(text: &str) -> Option<(f64, String)> {
    let mut words = text.split_whitespace();
    let value: f64 = words.next()?.replace(',', "").parse().ok()?;
    let unit = words.next()?.to_string();
    // More than two words means this is prose, not a bare quantity.
    if words.next().is_some() {
        return None;
    }
    Some((value, unit))
}

/// Extract the `order_id: <id>` token line from an action reply. Case
/// insensitive; absent or malformed lines yield None, never an error.
pub fn extract_order_id(text: &str) -> Option<String> {
    for line in text.lines() {
        let lower = line.to_lowercase();
        if let Some(pos) = lower.find("order_id:") {
            let id = line[pos + "order_id:".len()..].trim();
            if !id.is_empty() {
                return Some(id.split_whitespace().next().unwrap_or(id).to_string());
            }
        }
    }
    None
}

/// Build the caller-facing result from a table whose tasks are terminal
/// (or, with `partial`, from whatever is terminal at the run deadline).
///
/// Failure semantics: a run where every task failed yields
/// `AllTasksFailed`, distinguishable from the zero-task `InvalidRequest`
/// rejected at submit time.
pub async fn build_response(
    table: &DispatchTable,
    merger: &dyn Merger,
    partial: bool,
) -> Result<AggregatedResult, SupervisorError> {
    if table.is_empty() {
        return Err(SupervisorError::InvalidRequest(
            "run contains no tasks".to_string(),
        ));
    }

    let succeeded = table.succeeded();
    let failed = table.failed();
    let unfinished = table.unfinished();

    let failures: Vec<TaskFailure> = failed
        .iter()
        .map(|t| TaskFailure {
            task_id: t.id.clone(),
            worker: t.target.worker().clone(),
            error: t
                .error
                .clone()
                .unwrap_or_else(|| "unknown failure".to_string()),
        })
        .collect();

    // Nothing succeeded and nothing is still running: explicit all-failed.
    if succeeded.is_empty() && unfinished.is_empty() {
        let detail = failures
            .iter()
            .map(|f| format!("{}: {}", f.worker, f.error))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(SupervisorError::AllTasksFailed(detail));
    }

    let mut response = if table.len() == 1 {
        // Unicast run: the task's result verbatim, no merging.
        succeeded
            .first()
            .and_then(|t| t.result.clone())
            .unwrap_or_default()
    } else {
        let parts: Vec<(WorkerId, String)> = succeeded
            .iter()
            .map(|t| {
                (
                    t.target.worker().clone(),
                    t.result.clone().unwrap_or_default(),
                )
            })
            .collect();
        merger.merge(&parts).await
    };

    // Annotate rather than silently drop what did not succeed.
    if table.len() > 1 {
        for f in &failures {
            if !response.is_empty() {
                response.push('\n');
            }
            response.push_str(&format!("{} : unavailable ({})", f.worker, f.error));
        }
    }
    for t in &unfinished {
        if !response.is_empty() {
            response.push('\n');
        }
        response.push_str(&format!("{} : incomplete (still in flight)", t.target.worker()));
    }

    let order_id = if table.len() == 1 {
        succeeded
            .first()
            .and_then(|t| t.result.as_deref())
            .and_then(extract_order_id)
    } else {
        None
    };

    Ok(AggregatedResult {
        run_id: table.run_id().clone(),
        response,
        state: RunState::Complete,
        partial: partial && !unfinished.is_empty(),
        order_id,
        failures,
    })
}
