// Company Profile - fixed, schema-stable set of signal sections

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;

/// Profile section keys, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    Web,
    Seo,
    TechStack,
    Reviews,
    Social,
    Hiring,
    Ads,
}

impl SectionKey {
    pub const ALL: [SectionKey; 7] = [
        SectionKey::Web,
        SectionKey::Seo,
        SectionKey::TechStack,
        SectionKey::Reviews,
        SectionKey::Social,
        SectionKey::Hiring,
        SectionKey::Ads,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::Web => "web",
            SectionKey::Seo => "seo",
            SectionKey::TechStack => "tech_stack",
            SectionKey::Reviews => "reviews",
            SectionKey::Social => "social",
            SectionKey::Hiring => "hiring",
            SectionKey::Ads => "ads",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SectionKey::Web => "Web Presence",
            SectionKey::Seo => "SEO Diagnostics",
            SectionKey::TechStack => "Tech Stack Fingerprint",
            SectionKey::Reviews => "Customer Voice & Reviews",
            SectionKey::Social => "Social Footprint",
            SectionKey::Hiring => "Hiring & Org Signals",
            SectionKey::Ads => "Ads & Growth Motions",
        }
    }

    /// 1-based position in report order
    pub fn ordinal(&self) -> usize {
        Self::ALL.iter().position(|k| k == self).map_or(0, |i| i + 1)
    }

    /// Empty payload with every field of the section's schema
    pub fn default_data(&self) -> Value {
        match self {
            SectionKey::Web => json!({
                "url": null,
                "clean_text": "",
                "meta": { "title": null, "description": null, "h1": [], "h2": [] }
            }),
            SectionKey::Seo => json!({
                "meta_issues": [],
                "heading_issues": [],
                "keyword_summary": [],
                "internal_link_summary": []
            }),
            SectionKey::TechStack => json!({
                "frameworks": [],
                "analytics": [],
                "cms": null,
                "cdn": null,
                "other": []
            }),
            SectionKey::Reviews => json!({
                "sources": [],
                "summary": null,
                "top_complaints": [],
                "top_praises": []
            }),
            SectionKey::Social => json!({ "instagram": null, "youtube": null, "twitter": null }),
            SectionKey::Hiring => json!({ "open_roles": [], "inferred_focus": null }),
            SectionKey::Ads => json!({ "platforms": [], "themes": [] }),
        }
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        SectionKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DomainError::UnknownVariant {
                kind: "profile section",
                value: s.to_string(),
            })
    }
}

/// Whether a section's probe was skipped, ran and failed, or ran and returned data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Skipped,
    Errored,
    Present,
}

/// One profile section. Always carries the full schema in `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub presence: Presence,
    pub data: Value,
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn skipped(key: SectionKey) -> Self {
        Self {
            presence: Presence::Skipped,
            data: key.default_data(),
            error: None,
        }
    }

    pub fn errored(key: SectionKey, error: impl Into<String>) -> Self {
        Self {
            presence: Presence::Errored,
            data: key.default_data(),
            error: Some(error.into()),
        }
    }

    /// Probe returned data. The payload is laid over the section defaults so a
    /// partial payload still exposes every schema field.
    pub fn present(key: SectionKey, payload: Value) -> Self {
        let mut data = key.default_data();
        overlay(&mut data, payload);
        Self {
            presence: Presence::Present,
            data,
            error: None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.presence == Presence::Present
    }

    /// Look up a dotted path (`meta.title`) inside the section data
    pub fn field(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .filter(|p| !p.is_empty())
            .try_fold(&self.data, |value, part| value.get(part))
    }

    /// Present and the field holds a non-empty value
    pub fn observed(&self, path: &str) -> Option<&Value> {
        if !self.is_present() {
            return None;
        }
        self.field(path).filter(|v| is_nonempty(v))
    }

    pub fn str_field(&self, path: &str) -> Option<&str> {
        self.field(path)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn list_field(&self, path: &str) -> Vec<String> {
        self.field(path)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s.clone()),
                        Value::Null => None,
                        other => Some(other.to_string()),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Empty means null, blank string, empty array or empty object
pub fn is_nonempty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

fn overlay(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base), Value::Object(incoming)) => {
            for (key, value) in incoming {
                let nested = value.is_object() && base.get(&key).is_some_and(Value::is_object);
                if nested {
                    if let Some(slot) = base.get_mut(&key) {
                        overlay(slot, value);
                    }
                } else {
                    base.insert(key, value);
                }
            }
        }
        (base, incoming) => *base = incoming,
    }
}

/// Company identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub url: String,
}

/// Merged profile. Every section is a named field so none can be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub company: Company,
    pub web: ProbeResult,
    pub seo: ProbeResult,
    pub tech_stack: ProbeResult,
    pub reviews: ProbeResult,
    pub social: ProbeResult,
    pub hiring: ProbeResult,
    pub ads: ProbeResult,
}

impl CompanyProfile {
    /// Profile with every section skipped
    pub fn new(company: Company) -> Self {
        Self {
            company,
            web: ProbeResult::skipped(SectionKey::Web),
            seo: ProbeResult::skipped(SectionKey::Seo),
            tech_stack: ProbeResult::skipped(SectionKey::TechStack),
            reviews: ProbeResult::skipped(SectionKey::Reviews),
            social: ProbeResult::skipped(SectionKey::Social),
            hiring: ProbeResult::skipped(SectionKey::Hiring),
            ads: ProbeResult::skipped(SectionKey::Ads),
        }
    }

    pub fn section(&self, key: SectionKey) -> &ProbeResult {
        match key {
            SectionKey::Web => &self.web,
            SectionKey::Seo => &self.seo,
            SectionKey::TechStack => &self.tech_stack,
            SectionKey::Reviews => &self.reviews,
            SectionKey::Social => &self.social,
            SectionKey::Hiring => &self.hiring,
            SectionKey::Ads => &self.ads,
        }
    }

    pub fn section_mut(&mut self, key: SectionKey) -> &mut ProbeResult {
        match key {
            SectionKey::Web => &mut self.web,
            SectionKey::Seo => &mut self.seo,
            SectionKey::TechStack => &mut self.tech_stack,
            SectionKey::Reviews => &mut self.reviews,
            SectionKey::Social => &mut self.social,
            SectionKey::Hiring => &mut self.hiring,
            SectionKey::Ads => &mut self.ads,
        }
    }

    /// Sections in report order
    pub fn sections(&self) -> impl Iterator<Item = (SectionKey, &ProbeResult)> {
        SectionKey::ALL.into_iter().map(move |k| (k, self.section(k)))
    }

    /// Resolve `section.field.sub` into the owning section and the field path
    pub fn resolve(path: &str) -> Option<(SectionKey, &str)> {
        let (section, field) = path.split_once('.')?;
        let key = section.parse::<SectionKey>().ok()?;
        Some((key, field))
    }

    /// Count of sections with data
    pub fn present_count(&self) -> usize {
        self.sections().filter(|(_, s)| s.is_present()).count()
    }

    /// Sections as a JSON object keyed by section name (LLM prompt input)
    pub fn sections_json(&self) -> Value {
        let mut map = Map::new();
        for (key, section) in self.sections() {
            map.insert(
                key.as_str().to_string(),
                json!({
                    "presence": section.presence,
                    "data": section.data,
                    "error": section.error,
                }),
            );
        }
        Value::Object(map)
    }
}
