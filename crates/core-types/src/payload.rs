//! Inbound payload handling for report submissions.
//!
//! Clients submit either `{ "form_data": { ...fields } }` (canonical) or the
//! same fields at the top level (compatibility shape). `normalize_payload`
//! picks the report object out of either shape, and `NewReport::try_from`
//! applies the field rules:
//!
//! - `fullName`, `orderId` and `issue` must be present and truthy
//!   (absent, `null`, `""`, `0` and `false` all count as missing).
//! - `fullName` and `issue` are text; numbers and booleans are converted.
//! - `orderId` is a positive integer; integer strings are accepted.
//! - `reportProblem` is optional text.

use crate::error::{FieldErrors, ReportError};
use crate::report::NewReport;
use serde_json::Value;

/// Wrapper key of the canonical request shape.
pub const FORM_DATA_KEY: &str = "form_data";

/// Fields that every report must carry, in wire naming.
pub const REQUIRED_FIELDS: [&str; 3] = ["fullName", "orderId", "issue"];

/// Returns the report object from a request body.
///
/// A truthy `form_data` member wins; otherwise the body itself is the report.
pub fn normalize_payload(body: &Value) -> Value {
    match body.get(FORM_DATA_KEY) {
        Some(wrapped) if is_truthy(wrapped) => wrapped.clone(),
        _ => body.clone(),
    }
}

/// JavaScript-style truthiness, which is what submitting clients rely on.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl TryFrom<&Value> for NewReport {
    type Error = ReportError;

    /// Validates a normalized payload (see `normalize_payload`).
    fn try_from(payload: &Value) -> Result<Self, Self::Error> {
        let field = |name: &str| payload.get(name).filter(|v| is_truthy(v));

        let missing: FieldErrors = REQUIRED_FIELDS
            .iter()
            .filter(|name| field(name).is_none())
            .map(|name| (name.to_string(), format!("Path `{name}` is required.")))
            .collect();
        if !missing.is_empty() {
            return Err(ReportError::MissingFields(missing));
        }

        let mut invalid = FieldErrors::new();
        let full_name = cast_text("fullName", field("fullName"), &mut invalid);
        let order_id = cast_order_id(field("orderId"), &mut invalid);
        let issue = cast_text("issue", field("issue"), &mut invalid);
        let report_problem = match payload.get("reportProblem") {
            None | Some(Value::Null) => None,
            value => cast_text("reportProblem", value, &mut invalid),
        };

        match (full_name, order_id, issue) {
            (Some(full_name), Some(order_id), Some(issue)) if invalid.is_empty() => Ok(NewReport {
                full_name,
                order_id,
                issue,
                report_problem,
            }),
            _ => Err(ReportError::InvalidFields(invalid)),
        }
    }
}

fn cast_text(name: &str, value: Option<&Value>, errors: &mut FieldErrors) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => {
            errors.insert(
                name,
                format!("Cast to string failed for value {other} at path `{name}`"),
            );
            None
        }
    }
}

fn cast_order_id(value: Option<&Value>, errors: &mut FieldErrors) -> Option<i64> {
    let value = value?;
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        Some(id) if id > 0 => Some(id),
        Some(_) => {
            errors.insert("orderId", "Path `orderId` must be a positive integer.");
            None
        }
        None => {
            errors.insert(
                "orderId",
                format!("Cast to Number failed for value {value} at path `orderId`"),
            );
            None
        }
    }
}
