// Delta Engine - classifies tracked fields between two snapshots of a target

use crate::domain::{CompanyProfile, Delta, FieldChange, FieldDelta, Snapshot};
use crate::error::{AppError, Result};
use serde_json::Value;

const DAY_MS: f64 = 86_400_000.0;

pub const DEFAULT_TRACKED_FIELDS: &[&str] = &[
    "web.meta.title",
    "web.meta.description",
    "seo.meta_issues",
    "seo.heading_issues",
    "tech_stack.frameworks",
    "tech_stack.analytics",
    "tech_stack.cms",
    "tech_stack.cdn",
    "reviews.summary",
    "social.twitter",
    "social.instagram",
    "social.youtube",
    "hiring.open_roles",
    "ads.platforms",
];

pub fn default_tracked_fields() -> Vec<String> {
    DEFAULT_TRACKED_FIELDS.iter().map(|f| f.to_string()).collect()
}

/// Every tracked path must name a profile section and a field inside it
pub fn validate_tracked_fields(fields: &[String]) -> Result<()> {
    for field in fields {
        if CompanyProfile::resolve(field).is_none() {
            return Err(AppError::Config(format!(
                "tracked field '{}' does not name a profile section",
                field
            )));
        }
    }
    Ok(())
}

/// Diff `current` against `previous` over the tracked fields
pub fn compute_delta(previous: &Snapshot, current: &Snapshot, tracked: &[String]) -> Delta {
    let fields: Vec<FieldDelta> = tracked
        .iter()
        .map(|field| FieldDelta {
            field: field.clone(),
            change: classify(&previous.profile, &current.profile, field),
        })
        .collect();

    let stability = if fields.is_empty() {
        1.0
    } else {
        let unchanged = fields
            .iter()
            .filter(|f| f.change == FieldChange::Unchanged)
            .count();
        (unchanged as f64 / fields.len() as f64).clamp(0.0, 1.0)
    };

    Delta {
        baseline_at: previous.created_at,
        compared_at: current.created_at,
        elapsed_days: (current.created_at - previous.created_at).max(0) as f64 / DAY_MS,
        fields,
        stability,
    }
}

fn classify(previous: &CompanyProfile, current: &CompanyProfile, path: &str) -> FieldChange {
    match (observed(previous, path), observed(current, path)) {
        (None, None) => FieldChange::Unchanged,
        (None, Some(_)) => FieldChange::Emerged,
        (Some(_), None) => FieldChange::Lost,
        (Some(before), Some(after)) if before == after => FieldChange::Unchanged,
        (Some(_), Some(_)) => FieldChange::Changed,
    }
}

/// Observed value with list order normalized away
fn observed(profile: &CompanyProfile, path: &str) -> Option<Value> {
    let (key, field) = CompanyProfile::resolve(path)?;
    let value = profile.section(key).observed(field)?;
    Some(match value {
        Value::Array(items) => {
            let mut items = items.clone();
            items.sort_by_key(|v| v.to_string());
            Value::Array(items)
        }
        other => other.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Company, ProbeResult, SectionKey};
    use serde_json::json;

    fn snapshot(at: i64, tech: Option<Value>) -> Snapshot {
        let mut profile = CompanyProfile::new(Company {
            name: "Acme".to_string(),
            url: "https://acme.io/".to_string(),
        });
        if let Some(tech) = tech {
            profile.tech_stack = ProbeResult::present(SectionKey::TechStack, tech);
        }
        Snapshot {
            owner_key: "key-a".to_string(),
            target_url: "https://acme.io/".to_string(),
            profile,
            created_at: at,
        }
    }

    fn tracked(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_classification() {
        let prev = snapshot(0, Some(json!({ "frameworks": ["React"], "cms": "WordPress", "cdn": "Fastly" })));
        let curr = snapshot(
            2 * 86_400_000,
            Some(json!({ "frameworks": ["React"], "cms": "Webflow", "analytics": ["GA4"] })),
        );
        let fields = tracked(&[
            "tech_stack.frameworks",
            "tech_stack.cms",
            "tech_stack.analytics",
            "tech_stack.cdn",
        ]);

        let delta = compute_delta(&prev, &curr, &fields);
        assert_eq!(delta.change_of("tech_stack.frameworks"), Some(FieldChange::Unchanged));
        assert_eq!(delta.change_of("tech_stack.cms"), Some(FieldChange::Changed));
        assert_eq!(delta.change_of("tech_stack.analytics"), Some(FieldChange::Emerged));
        assert_eq!(delta.change_of("tech_stack.cdn"), Some(FieldChange::Lost));
        assert_eq!(delta.stability, 0.25);
        assert_eq!(delta.elapsed_days, 2.0);
        assert_eq!(delta.shifts().count(), 3);
    }

    #[test]
    fn test_identical_snapshots_are_stable() {
        let tech = json!({ "frameworks": ["React", "Next.js"] });
        let prev = snapshot(0, Some(tech.clone()));
        let curr = snapshot(1_000, Some(tech));
        let delta = compute_delta(&prev, &curr, &default_tracked_fields());
        assert_eq!(delta.stability, 1.0);
        assert_eq!(delta.stability_label(), "High");
    }

    #[test]
    fn test_list_order_is_not_a_change() {
        let prev = snapshot(0, Some(json!({ "frameworks": ["React", "Vue"] })));
        let curr = snapshot(1, Some(json!({ "frameworks": ["Vue", "React"] })));
        let delta = compute_delta(&prev, &curr, &tracked(&["tech_stack.frameworks"]));
        assert_eq!(delta.change_of("tech_stack.frameworks"), Some(FieldChange::Unchanged));
    }

    #[test]
    fn test_errored_section_counts_as_absent() {
        let prev = snapshot(0, Some(json!({ "cms": "WordPress" })));
        let mut curr = snapshot(1, None);
        curr.profile.tech_stack = ProbeResult::errored(SectionKey::TechStack, "timeout");
        let delta = compute_delta(&prev, &curr, &tracked(&["tech_stack.cms"]));
        assert_eq!(delta.change_of("tech_stack.cms"), Some(FieldChange::Lost));
    }

    #[test]
    fn test_no_tracked_fields_is_fully_stable() {
        let delta = compute_delta(&snapshot(0, None), &snapshot(1, None), &[]);
        assert_eq!(delta.stability, 1.0);
        assert!(delta.fields.is_empty());
    }

    #[test]
    fn test_tracked_field_validation() {
        assert!(validate_tracked_fields(&default_tracked_fields()).is_ok());
        assert!(validate_tracked_fields(&tracked(&["pricing.tiers"])).is_err());
        assert!(validate_tracked_fields(&tracked(&["web"])).is_err());
    }
}
