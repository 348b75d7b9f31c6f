// src/config/seo.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_SEO_CONFIG_PATH: &str = "SEO_CONFIG_PATH";
pub const ENV_SEO_SITE_NAME: &str = "SEO_SITE_NAME";

pub const JOB_LISTING_TYPE: &str = "job-listing";
pub const FALLBACK_COMPANY: &str = "Unknown Company";
pub const FALLBACK_LOCATION: &str = "Unknown Location";

fn default_allowed_types() -> Vec<String> {
    vec![JOB_LISTING_TYPE.to_string()]
}
fn default_company_field() -> String {
    "company_name".to_string()
}
fn default_location_field() -> String {
    "location".to_string()
}
fn default_required_fields() -> Vec<String> {
    vec![default_company_field(), default_location_field()]
}
fn default_batch_size() -> usize {
    10
}
fn default_max_per_run() -> usize {
    50
}
fn default_interval_secs() -> u64 {
    3600
}
fn default_diagnostics_capacity() -> usize {
    500
}

/// Settings consumed by every SEO operation. Passed explicitly, never global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoConfig {
    /// Overrides the store's site display name when set.
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    #[serde(default = "default_required_fields")]
    pub required_fields: Vec<String>,
    #[serde(default = "default_company_field")]
    pub company_field: String,
    #[serde(default = "default_location_field")]
    pub location_field: String,
    /// Page size when the batch scans stored items.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum number of items processed by one batch run.
    #[serde(default = "default_max_per_run")]
    pub max_per_run: usize,
    #[serde(default = "default_interval_secs")]
    pub batch_interval_secs: u64,
    #[serde(default = "default_diagnostics_capacity")]
    pub diagnostics_capacity: usize,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl Default for SeoConfig {
    fn default() -> Self {
        Self {
            site_name: None,
            allowed_types: default_allowed_types(),
            required_fields: default_required_fields(),
            company_field: default_company_field(),
            location_field: default_location_field(),
            batch_size: default_batch_size(),
            max_per_run: default_max_per_run(),
            batch_interval_secs: default_interval_secs(),
            diagnostics_capacity: default_diagnostics_capacity(),
            webhook: WebhookConfig::default(),
        }
    }
}

fn default_title_key() -> String {
    "title".to_string()
}
fn default_body_key() -> String {
    "description".to_string()
}
fn default_webhook_type() -> String {
    JOB_LISTING_TYPE.to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Shared secret expected in `X-Webhook-Token`. No check when unset.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_webhook_type")]
    pub content_type: String,
    #[serde(default = "default_title_key")]
    pub title_key: String,
    #[serde(default = "default_body_key")]
    pub body_key: String,
    /// payload key -> custom field name
    #[serde(default)]
    pub field_map: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub auto_process: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: None,
            content_type: default_webhook_type(),
            title_key: default_title_key(),
            body_key: default_body_key(),
            field_map: BTreeMap::new(),
            auto_process: true,
        }
    }
}

impl SeoConfig {
    pub fn is_allowed_type(&self, kind: &str) -> bool {
        self.allowed_types.iter().any(|t| t == kind)
    }

    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading seo config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing seo config {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $SEO_CONFIG_PATH
    /// 2) config/seo.toml
    /// 3) config/seo.json
    /// 4) built-in defaults
    ///
    /// `$SEO_SITE_NAME` overrides `site_name` in every case.
    pub fn load_default() -> Result<Self> {
        let mut cfg = Self::load_file_default()?;
        if let Ok(name) = std::env::var(ENV_SEO_SITE_NAME) {
            let name = name.trim();
            if !name.is_empty() {
                cfg.site_name = Some(name.to_string());
            }
        }
        Ok(cfg)
    }

    fn load_file_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_SEO_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("SEO_CONFIG_PATH points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from("config/seo.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/seo.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    /// Trim list entries, drop blanks and duplicates, keep numeric limits usable.
    fn sanitize(&mut self) {
        self.allowed_types = clean_list(std::mem::take(&mut self.allowed_types));
        self.required_fields = clean_list(std::mem::take(&mut self.required_fields));
        if self.batch_size == 0 {
            self.batch_size = default_batch_size();
        }
        if self.batch_interval_secs == 0 {
            self.batch_interval_secs = default_interval_secs();
        }
        if self.diagnostics_capacity == 0 {
            self.diagnostics_capacity = default_diagnostics_capacity();
        }
        if let Some(name) = self.site_name.as_mut() {
            *name = name.trim().to_string();
        }
        if self.site_name.as_deref() == Some("") {
            self.site_name = None;
        }
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<SeoConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(s)?),
        "json" => Ok(serde_json::from_str(s)?),
        _ => {
            if let Ok(v) = serde_json::from_str(s) {
                return Ok(v);
            }
            toml::from_str(s).map_err(|e| anyhow!("unsupported seo config format: {e}"))
        }
    }
}

// Order of first appearance is kept; it is the order of the missing-field report.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_with_defaults_filled_in() {
        let toml = r#"
site_name = " NexJob "
allowed_types = ["job-listing", " post ", "", "post"]
required_fields = ["company_name", "location", "salary"]

[webhook]
enabled = true
token = "s3cret"
field_map = { company = "company_name", city = "location" }
"#;
        let mut cfg = parse_config(toml, "toml").unwrap();
        cfg.sanitize();
        assert_eq!(cfg.site_name.as_deref(), Some("NexJob"));
        assert_eq!(cfg.allowed_types, vec!["job-listing", "post"]);
        assert_eq!(cfg.required_fields.len(), 3);
        assert_eq!(cfg.batch_size, 10);
        assert_eq!(cfg.max_per_run, 50);
        assert!(cfg.webhook.enabled);
        assert!(cfg.webhook.auto_process);
        assert_eq!(cfg.webhook.title_key, "title");
        assert_eq!(
            cfg.webhook.field_map.get("city").map(String::as_str),
            Some("location")
        );
    }

    #[test]
    fn json_without_hint_is_detected() {
        let json = r#"{"allowed_types":["post"],"batch_size":0}"#;
        let mut cfg = parse_config(json, "").unwrap();
        cfg.sanitize();
        assert!(cfg.is_allowed_type("post"));
        assert!(!cfg.is_allowed_type("job-listing"));
        assert_eq!(cfg.batch_size, 10);
    }

    #[test]
    fn defaults_require_company_and_location() {
        let cfg = SeoConfig::default();
        assert_eq!(cfg.required_fields, vec!["company_name", "location"]);
        assert!(cfg.is_allowed_type(JOB_LISTING_TYPE));
        assert!(!cfg.webhook.enabled);
    }
}
