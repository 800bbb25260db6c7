// Profile Merger - folds probe outcomes into a schema-complete CompanyProfile

use crate::application::planner::ProbePlan;
use crate::domain::{Company, CompanyProfile, ProbeKind, ProbeResult, SectionKey, Target};
use crate::port::ProbeError;
use serde_json::Value;
use std::collections::HashMap;

/// Keys that never reach the profile
const STRIPPED_KEYS: &[&str] = &["ok", "error", "raw_html"];

/// What one dispatched probe produced
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Completed(Value),
    Failed(ProbeError),
}

impl ProbeOutcome {
    /// Payload of a completed probe (forwarded upstream to dependents)
    pub fn payload(&self) -> Option<&Value> {
        match self {
            ProbeOutcome::Completed(value) => Some(value),
            ProbeOutcome::Failed(_) => None,
        }
    }
}

/// Build the profile. Sections outside the plan are skipped, sections whose probe
/// failed or reported an error are errored, everything else is present.
pub fn merge(
    target: &Target,
    plan: &ProbePlan,
    outcomes: &HashMap<ProbeKind, ProbeOutcome>,
) -> CompanyProfile {
    let mut profile = CompanyProfile::new(Company {
        name: target.display_name(),
        url: target.url.clone(),
    });

    for key in SectionKey::ALL {
        let kind = ProbeKind::for_section(key);
        if !plan.is_enabled(kind) {
            continue;
        }
        *profile.section_mut(key) = match outcomes.get(&kind) {
            None => ProbeResult::errored(key, "probe did not report"),
            Some(ProbeOutcome::Failed(e)) => ProbeResult::errored(key, e.to_string()),
            Some(ProbeOutcome::Completed(payload)) => section_from_payload(key, payload),
        };
    }

    // No explicit name: prefer the page title over the bare host
    if target.name.is_none() {
        if let Some(title) = profile.web.str_field("meta.title") {
            profile.company.name = title.trim().to_string();
        }
    }

    profile
}

fn section_from_payload(key: SectionKey, payload: &Value) -> ProbeResult {
    let Some(object) = payload.as_object() else {
        return ProbeResult::errored(key, "malformed payload: expected a JSON object");
    };

    let reported = object
        .get("error")
        .and_then(Value::as_str)
        .filter(|e| !e.trim().is_empty());
    if object.get("ok") == Some(&Value::Bool(false)) || reported.is_some() {
        return ProbeResult::errored(key, reported.unwrap_or("probe reported failure"));
    }

    let mut cleaned = object.clone();
    for stripped in STRIPPED_KEYS {
        cleaned.remove(*stripped);
    }
    ProbeResult::present(key, Value::Object(cleaned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::planner::Planner;
    use crate::domain::Presence;
    use serde_json::json;

    fn target() -> Target {
        Target::new("https://www.acme.io/", None)
    }

    #[test]
    fn test_every_section_present_in_output() {
        let plan = Planner::default().plan(true, None);
        let profile = merge(&target(), &plan, &HashMap::new());

        // planned but unreported sections are errored, the rest skipped
        assert_eq!(profile.web.presence, Presence::Errored);
        assert_eq!(profile.seo.presence, Presence::Errored);
        assert_eq!(profile.reviews.presence, Presence::Skipped);
        assert_eq!(profile.sections().count(), SectionKey::ALL.len());
        assert_eq!(profile.company.name, "acme.io");
    }

    #[test]
    fn test_payload_interpretation() {
        let plan = Planner::default().plan(true, None);
        let mut outcomes = HashMap::new();
        outcomes.insert(
            ProbeKind::WebScrape,
            ProbeOutcome::Completed(json!({
                "ok": true,
                "raw_html": "<html></html>",
                "clean_text": "Pricing and plans",
                "meta": { "title": "Acme Analytics" }
            })),
        );
        outcomes.insert(
            ProbeKind::SeoProbe,
            ProbeOutcome::Completed(json!({ "ok": false, "error": "blocked by robots" })),
        );
        outcomes.insert(
            ProbeKind::TechStack,
            ProbeOutcome::Failed(ProbeError::Timeout(15_000)),
        );

        let profile = merge(&target(), &plan, &outcomes);

        assert_eq!(profile.web.presence, Presence::Present);
        assert!(profile.web.field("raw_html").is_none());
        assert!(profile.web.field("ok").is_none());
        assert_eq!(profile.web.str_field("clean_text"), Some("Pricing and plans"));
        assert_eq!(profile.company.name, "Acme Analytics");

        assert_eq!(profile.seo.presence, Presence::Errored);
        assert_eq!(profile.seo.error.as_deref(), Some("blocked by robots"));
        assert_eq!(profile.seo.field("meta_issues"), Some(&json!([])));

        assert_eq!(profile.tech_stack.presence, Presence::Errored);
        assert!(profile.tech_stack.error.as_ref().unwrap().contains("timed out"));
    }

    #[test]
    fn test_explicit_name_wins_over_title() {
        let plan = Planner::default().plan(true, None);
        let mut outcomes = HashMap::new();
        outcomes.insert(
            ProbeKind::WebScrape,
            ProbeOutcome::Completed(json!({ "meta": { "title": "Home | Acme" } })),
        );
        let target = Target::new("https://acme.io/", Some("Acme Inc".to_string()));
        assert_eq!(merge(&target, &plan, &outcomes).company.name, "Acme Inc");
    }

    #[test]
    fn test_non_object_payload_is_errored() {
        let plan = Planner::default().plan(true, None);
        let mut outcomes = HashMap::new();
        outcomes.insert(ProbeKind::WebScrape, ProbeOutcome::Completed(json!("oops")));
        let profile = merge(&target(), &plan, &outcomes);
        assert_eq!(profile.web.presence, Presence::Errored);
    }
}
