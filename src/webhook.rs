//! Inbound webhook that turns external job payloads into content items.
//!
//! Accepts one JSON object or an array of objects. Keys are mapped through
//! `[webhook]` in the SEO config; new items are processed right away when
//! `auto_process` is on.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use metrics::counter;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::api::AppState;
use crate::config::WebhookConfig;
use crate::content::{ContentId, NewContentItem};
use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::processor::{ProcessOutcome, Trigger};

pub const TOKEN_HEADER: &str = "x-webhook-token";

#[derive(Debug, Serialize)]
pub struct CreatedItem {
    pub id: ContentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ProcessOutcome>,
}

#[derive(Debug, Serialize)]
pub struct RejectedItem {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct WebhookResponse {
    pub created: Vec<CreatedItem>,
    pub rejected: Vec<RejectedItem>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/jobs", post(handle_jobs_webhook))
}

/// Compare via SHA-256 digests so the check does not short-circuit on a shared prefix.
pub fn token_matches(expected: &str, provided: Option<&str>) -> bool {
    let Some(provided) = provided else {
        return false;
    };
    Sha256::digest(expected.as_bytes()) == Sha256::digest(provided.as_bytes())
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Map one payload object onto a new item. `Err` carries the rejection reason.
pub fn map_payload(obj: &Map<String, Value>, wh: &WebhookConfig) -> Result<NewContentItem, String> {
    let title = obj
        .get(&wh.title_key)
        .and_then(scalar_to_string)
        .unwrap_or_default();
    if title.is_empty() {
        return Err(format!("missing or empty '{}'", wh.title_key));
    }

    let body = obj
        .get(&wh.body_key)
        .and_then(scalar_to_string)
        .unwrap_or_default();

    let mut item = NewContentItem {
        kind: wh.content_type.clone(),
        title,
        body,
        ..Default::default()
    };
    for (key, field) in &wh.field_map {
        if let Some(v) = obj.get(key).and_then(scalar_to_string) {
            if !v.is_empty() {
                item.custom_fields.insert(field.clone(), v);
            }
        }
    }
    Ok(item)
}

/// Split a request body into payload objects; non-objects are reported by index.
pub fn payload_entries(body: &Value) -> Option<Vec<Result<&Map<String, Value>, usize>>> {
    match body {
        Value::Object(o) => Some(vec![Ok(o)]),
        Value::Array(arr) => Some(
            arr.iter()
                .enumerate()
                .map(|(i, v)| v.as_object().ok_or(i))
                .collect(),
        ),
        _ => None,
    }
}

async fn handle_jobs_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<WebhookResponse>, (StatusCode, String)> {
    let cfg = state.config();
    let wh = &cfg.webhook;
    if !wh.enabled {
        return Err((StatusCode::NOT_FOUND, "webhook disabled".to_string()));
    }
    if let Some(expected) = wh.token.as_deref() {
        let provided = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok());
        if !token_matches(expected, provided) {
            tracing::warn!(target: "webhook", "rejected webhook call with bad token");
            return Err((StatusCode::UNAUTHORIZED, "invalid webhook token".to_string()));
        }
    }

    let Some(entries) = payload_entries(&body) else {
        return Err((
            StatusCode::BAD_REQUEST,
            "expected a JSON object or array of objects".to_string(),
        ));
    };

    let store = state.store.as_ref();
    let sink = state.diagnostics.as_ref();
    let mut resp = WebhookResponse::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let obj = match entry {
            Ok(obj) => obj,
            Err(_) => {
                resp.rejected.push(RejectedItem {
                    index,
                    reason: "entry is not an object".to_string(),
                });
                continue;
            }
        };
        let new_item = match map_payload(obj, wh) {
            Ok(it) => it,
            Err(reason) => {
                resp.rejected.push(RejectedItem { index, reason });
                continue;
            }
        };

        let title = new_item.title.clone();
        let id = match store.insert(new_item).await {
            Ok(id) => id,
            Err(e) => {
                sink.record(
                    Diagnostic::new(Severity::Error, format!("webhook insert failed: {e:#}"))
                        .with("index", index),
                );
                resp.rejected.push(RejectedItem {
                    index,
                    reason: "storage error".to_string(),
                });
                continue;
            }
        };
        counter!("seo_webhook_items_total").increment(1);
        sink.record(Diagnostic::new(Severity::Info, "item created from webhook").item(id, title));

        let outcome = if wh.auto_process {
            state.hook.run(store, &cfg, sink, id, Trigger::manual()).await
        } else {
            None
        };
        resp.created.push(CreatedItem { id, outcome });
    }

    tracing::info!(
        target: "webhook",
        created = resp.created.len(),
        rejected = resp.rejected.len(),
        "webhook payload ingested"
    );
    Ok(Json(resp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wh() -> WebhookConfig {
        let mut wh = WebhookConfig {
            enabled: true,
            ..Default::default()
        };
        wh.field_map.insert("company".into(), "company_name".into());
        wh.field_map.insert("city".into(), "location".into());
        wh.field_map.insert("salary".into(), "salary".into());
        wh
    }

    #[test]
    fn maps_title_body_and_fields() {
        let v = json!({
            "title": " Backend Engineer ",
            "description": "<p>Join us.</p>",
            "company": "Acme",
            "city": "Jakarta",
            "salary": 12000000,
            "tags": ["rust"]
        });
        let it = map_payload(v.as_object().unwrap(), &wh()).unwrap();
        assert_eq!(it.kind, "job-listing");
        assert_eq!(it.title, "Backend Engineer");
        assert_eq!(it.body, "<p>Join us.</p>");
        assert_eq!(it.custom_fields.get("company_name").unwrap(), "Acme");
        assert_eq!(it.custom_fields.get("location").unwrap(), "Jakarta");
        assert_eq!(it.custom_fields.get("salary").unwrap(), "12000000");
        assert_eq!(it.custom_fields.len(), 3);
    }

    #[test]
    fn empty_title_is_rejected() {
        let v = json!({ "title": "  ", "company": "Acme" });
        let err = map_payload(v.as_object().unwrap(), &wh()).unwrap_err();
        assert!(err.contains("title"));
    }

    #[test]
    fn entries_accept_object_or_array() {
        assert_eq!(payload_entries(&json!({"title": "a"})).unwrap().len(), 1);
        let arr = json!([{"title": "a"}, 3, {"title": "b"}]);
        let entries = payload_entries(&arr).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[1].is_err());
        assert!(payload_entries(&json!("nope")).is_none());
    }

    #[test]
    fn token_comparison() {
        assert!(token_matches("s3cret", Some("s3cret")));
        assert!(!token_matches("s3cret", Some("s3cre")));
        assert!(!token_matches("s3cret", None));
    }
}
