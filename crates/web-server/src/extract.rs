//! Request body extraction for report submissions.

use crate::error::AppError;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    Form,
};
use serde_json::{Map, Value};

/// The raw submission as JSON, whatever content type it arrived in.
///
/// - `application/x-www-form-urlencoded`: fields become string members;
///   bracketed keys such as `form_data[fullName]` nest.
/// - anything else: parsed as JSON.
/// - an empty body becomes `{}`, so validation reports every field as missing.
#[derive(Debug)]
pub struct ReportBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for ReportBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|rejection| rejected(rejection.status(), rejection.body_text()))?;
            let mut object = Map::new();
            for (key, value) in fields {
                insert_form_field(&mut object, &key, value);
            }
            return Ok(Self(Value::Object(object)));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| rejected(rejection.status(), rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(Value::Object(Map::new())));
        }

        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| rejected(StatusCode::BAD_REQUEST, e.to_string()))
    }
}

fn rejected(status: StatusCode, message: String) -> AppError {
    AppError::BodyRejected { status, message }
}


/// Inserts `key=value`, expanding `a[b][c]` into nested objects.
/// A later field replaces an earlier value at the same path.
fn insert_form_field(object: &mut Map<String, Value>, key: &str, value: String) {
    let Some((head, rest)) = key
        .split_once('[')
        .filter(|(head, rest)| !head.is_empty() && rest.ends_with(']'))
    else {
        object.insert(key.to_string(), Value::String(value));
        return;
    };

    let mut node = object
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    for segment in rest[..rest.len() - 1].split("][") {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Some(children) = node.as_object_mut() else {
            return;
        };
        node = children.entry(segment.to_string()).or_insert(Value::Null);
    }
    *node = Value::String(value);
}
