// Cohort matrix - per-target signals, cohort norms and outliers

use crate::application::constants::{
    COHORT_MAX_NOTES, COHORT_OUTLIER_MIN_DEVIATIONS, COHORT_OUTLIER_MIN_TARGETS,
};
use crate::domain::{
    CohortMatrix, CohortNorms, CohortOutlier, CompanyProfile, Job, JobStatus, OutlierDirection,
    ProbeResult, SectionKey, SeoHygiene, SocialVisibility, TargetSignals, TechConfidence,
};

const PRICING_MARKERS: &[&str] = &["pricing", "plans", "price"];
const DOCS_MARKERS: &[&str] = &["/docs", "/documentation", "api-docs", "developer", "documentation"];
const SOCIAL_FIELDS: &[&str] = &["twitter", "instagram", "youtube", "linkedin"];

/// Host without `www.`, used as the row label
pub fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| url.to_string())
}

/// Row for one cohort target. `job` is None when the job could not be read.
pub fn target_signals(url: &str, job: Option<&Job>) -> TargetSignals {
    let placeholder = |note: String| TargetSignals {
        url: url.to_string(),
        name: domain_of(url),
        job_id: job.map(|j| j.id.clone()),
        fetch_limits: vec![note],
        ..Default::default()
    };

    let Some(job) = job else {
        return placeholder("Job record unavailable".to_string());
    };
    match (&job.status, &job.result) {
        (JobStatus::Complete, Some(result)) => {
            let mut signals = profile_signals(url, &result.profile);
            signals.job_id = Some(job.id.clone());
            signals
        }
        (JobStatus::Failed, _) => placeholder(format!(
            "Job {} failed: {}",
            job.id,
            job.error.as_deref().unwrap_or("unknown error")
        )),
        _ => placeholder(format!("Job {} not complete", job.id)),
    }
}

fn profile_signals(url: &str, profile: &CompanyProfile) -> TargetSignals {
    let mut evidence = Vec::new();
    let mut limits = Vec::new();
    for (key, section) in profile.sections() {
        if let Some(error) = &section.error {
            limits.push(format!("{}: {}", label(key), error));
        }
    }

    let tech = &profile.tech_stack;
    let tech_confidence = tech_confidence(tech);
    let probable_cms = ["probable_cms", "cms"]
        .iter()
        .find_map(|f| tech.str_field(f))
        .map(str::to_string);
    evidence.extend(tech.list_field("evidence").into_iter().take(2));
    let frameworks = tech.list_field("frameworks");
    if !frameworks.is_empty() {
        evidence.push(format!("Frameworks: {}", frameworks.join(", ")));
    }

    let web_text = web_text(&profile.web);
    let pricing_visible = PRICING_MARKERS.iter().any(|m| web_text.contains(m));
    let docs_visible = DOCS_MARKERS.iter().any(|m| web_text.contains(m));
    if pricing_visible {
        evidence.push("Pricing language on the public site".to_string());
    }

    let seo = &profile.seo;
    let seo_hygiene = if !seo.is_present() {
        SeoHygiene::Unknown
    } else {
        match seo.list_field("meta_issues").len() + seo.list_field("heading_issues").len() {
            0 => SeoHygiene::Good,
            1..=3 => SeoHygiene::Fair,
            _ => SeoHygiene::Poor,
        }
    };

    let roles = profile.hiring.list_field("open_roles");
    if !roles.is_empty() {
        evidence.push(format!("{} open roles", roles.len()));
    }
    let platforms = profile.ads.list_field("platforms");
    if !platforms.is_empty() {
        evidence.push(format!("Ads on {}", platforms.join(", ")));
    }

    let social_handles = SOCIAL_FIELDS
        .iter()
        .filter(|f| profile.social.str_field(f).is_some())
        .count();

    evidence.truncate(COHORT_MAX_NOTES);
    limits.truncate(COHORT_MAX_NOTES);

    TargetSignals {
        url: url.to_string(),
        name: profile.company.name.clone(),
        job_id: None,
        tech_confidence,
        probable_cms,
        pricing_visible,
        docs_visible,
        jobs_visible: !roles.is_empty(),
        paid_ads_detected: !platforms.is_empty(),
        seo_hygiene,
        social_visibility: if social_handles > 0 {
            SocialVisibility::High
        } else {
            SocialVisibility::None
        },
        review_visibility: profile.reviews.str_field("summary").is_some(),
        evidence_snippets: evidence,
        fetch_limits: limits,
    }
}

fn label(key: SectionKey) -> &'static str {
    match key {
        SectionKey::Web => "Web",
        SectionKey::Seo => "SEO",
        SectionKey::TechStack => "Tech",
        SectionKey::Reviews => "Reviews",
        SectionKey::Social => "Social",
        SectionKey::Hiring => "Hiring",
        SectionKey::Ads => "Ads",
    }
}

/// Explicit confidence reported by the probe, else derived from what was fingerprinted
fn tech_confidence(tech: &ProbeResult) -> TechConfidence {
    if !tech.is_present() {
        return TechConfidence::None;
    }
    match tech.str_field("confidence").map(str::to_lowercase).as_deref() {
        Some("high") => return TechConfidence::High,
        Some("medium") => return TechConfidence::Medium,
        Some("low") => return TechConfidence::Low,
        _ => {}
    }
    let detected = tech.list_field("frameworks").len()
        + tech.list_field("analytics").len()
        + usize::from(tech.str_field("cms").is_some())
        + usize::from(tech.str_field("cdn").is_some());
    match detected {
        0 => TechConfidence::None,
        1 => TechConfidence::Low,
        2 => TechConfidence::Medium,
        _ => TechConfidence::High,
    }
}

fn web_text(web: &ProbeResult) -> String {
    let mut parts: Vec<String> = ["clean_text", "meta.title", "meta.description"]
        .iter()
        .filter_map(|f| web.str_field(f).map(str::to_string))
        .collect();
    parts.extend(web.list_field("links"));
    parts.join(" ").to_lowercase()
}

fn pct(count: usize, total: usize) -> f64 {
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}

pub fn compute_norms(targets: &[TargetSignals]) -> CohortNorms {
    let n = targets.len();
    if n == 0 {
        return CohortNorms::default();
    }
    let count = |pred: &dyn Fn(&TargetSignals) -> bool| targets.iter().filter(|&t| pred(t)).count();

    let pricing = count(&|t| t.pricing_visible);
    let docs = count(&|t| t.docs_visible);
    CohortNorms {
        total_targets: n,
        pricing_visible_count: pricing,
        docs_visible_count: docs,
        jobs_visible_count: count(&|t| t.jobs_visible),
        paid_ads_count: count(&|t| t.paid_ads_detected),
        seo_good_count: count(&|t| t.seo_hygiene == SeoHygiene::Good),
        social_high_count: count(&|t| t.social_visibility == SocialVisibility::High),
        review_visible_count: count(&|t| t.review_visibility),
        pricing_visible_pct: pct(pricing, n),
        docs_visible_pct: pct(docs, n),
    }
}

/// Targets deviating from the majority on at least two signals
pub fn find_outliers(targets: &[TargetSignals], norms: &CohortNorms) -> Vec<CohortOutlier> {
    let n = norms.total_targets;
    if n < COHORT_OUTLIER_MIN_TARGETS {
        return Vec::new();
    }
    let majority = |count: usize| count * 2 > n;
    let pricing = majority(norms.pricing_visible_count);
    let docs = majority(norms.docs_visible_count);
    let jobs = majority(norms.jobs_visible_count);
    let social = majority(norms.social_high_count);

    let mut outliers = Vec::new();
    for t in targets {
        let mut deviations = Vec::new();
        let (mut up, mut down) = (0, 0);
        let mut check = |norm_present: bool, has: bool, missing: &str, extra: &str| {
            if norm_present && !has {
                deviations.push(missing.to_string());
                down += 1;
            } else if !norm_present && has {
                deviations.push(extra.to_string());
                up += 1;
            }
        };

        check(pricing, t.pricing_visible, "No visible pricing (norm: visible)", "Visible pricing (norm: hidden)");
        check(docs, t.docs_visible, "No visible docs (norm: visible)", "Visible docs (norm: hidden)");
        check(jobs, t.jobs_visible, "No visible jobs (norm: visible)", "Visible jobs (norm: hidden)");
        check(
            social,
            t.social_visibility == SocialVisibility::High,
            "No social presence (norm: present)",
            "High social presence (norm: low)",
        );

        if deviations.len() >= COHORT_OUTLIER_MIN_DEVIATIONS {
            let direction = match up.cmp(&down) {
                std::cmp::Ordering::Greater => OutlierDirection::Above,
                std::cmp::Ordering::Less => OutlierDirection::Below,
                std::cmp::Ordering::Equal => OutlierDirection::Mixed,
            };
            outliers.push(CohortOutlier {
                url: t.url.clone(),
                deviations,
                direction,
            });
        }
    }
    outliers
}

/// Matrix over the cohort rows; anchor deviations come from the anchor's outlier entry
pub fn build_matrix(anchor_url: &str, targets: Vec<TargetSignals>) -> CohortMatrix {
    let norms = compute_norms(&targets);
    let outliers = find_outliers(&targets, &norms);
    let anchor_deviations = outliers
        .iter()
        .find(|o| o.url == anchor_url)
        .map(|o| o.deviations.clone())
        .unwrap_or_default();

    CohortMatrix {
        targets,
        norms,
        outliers,
        anchor_deviations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Company, JobPatch, JobResult, Report, ReportSource, ReportStyle, Target,
    };
    use serde_json::json;

    fn row(url: &str, pricing: bool, docs: bool, jobs: bool, social: bool) -> TargetSignals {
        TargetSignals {
            url: url.to_string(),
            name: domain_of(url),
            pricing_visible: pricing,
            docs_visible: docs,
            jobs_visible: jobs,
            social_visibility: if social {
                SocialVisibility::High
            } else {
                SocialVisibility::None
            },
            ..Default::default()
        }
    }

    fn completed_job(profile: CompanyProfile) -> Job {
        let mut job = Job::new(
            "job-1",
            "key-a",
            Target::new(profile.company.url.clone(), None),
            None,
            ReportStyle::Standard,
            0,
        );
        job.apply(&JobPatch::start(1)).unwrap();
        let report = Report::new("x", None, ReportStyle::Standard, ReportSource::Fallback);
        job.apply(&JobPatch::complete(
            JobResult {
                profile,
                report,
                delta: None,
            },
            2,
        ))
        .unwrap();
        job
    }

    #[test]
    fn test_profile_signals() {
        let mut profile = CompanyProfile::new(Company {
            name: "Acme".to_string(),
            url: "https://acme.io/".to_string(),
        });
        profile.web = ProbeResult::present(
            SectionKey::Web,
            json!({ "clean_text": "See our Pricing. Read the developer guide." }),
        );
        profile.seo = ProbeResult::present(
            SectionKey::Seo,
            json!({ "meta_issues": ["a", "b"], "heading_issues": ["c", "d"] }),
        );
        profile.tech_stack = ProbeResult::present(
            SectionKey::TechStack,
            json!({ "frameworks": ["React"], "cms": "WordPress" }),
        );
        profile.social = ProbeResult::present(SectionKey::Social, json!({ "twitter": "@acme" }));
        profile.hiring = ProbeResult::errored(SectionKey::Hiring, "timed out after 15000ms");

        let signals = target_signals("https://acme.io/", Some(&completed_job(profile)));
        assert!(signals.pricing_visible);
        assert!(signals.docs_visible);
        assert_eq!(signals.seo_hygiene, SeoHygiene::Poor);
        assert_eq!(signals.tech_confidence, TechConfidence::Medium);
        assert_eq!(signals.probable_cms.as_deref(), Some("WordPress"));
        assert_eq!(signals.social_visibility, SocialVisibility::High);
        assert!(!signals.jobs_visible);
        assert_eq!(signals.fetch_limits, vec!["Hiring: timed out after 15000ms".to_string()]);
        assert_eq!(signals.job_id.as_deref(), Some("job-1"));
    }

    #[test]
    fn test_seo_errored_is_unknown() {
        let mut profile = CompanyProfile::new(Company {
            name: "Acme".to_string(),
            url: "https://acme.io/".to_string(),
        });
        profile.seo = ProbeResult::errored(SectionKey::Seo, "503");
        let signals = target_signals("https://acme.io/", Some(&completed_job(profile)));
        assert_eq!(signals.seo_hygiene, SeoHygiene::Unknown);
        assert_eq!(signals.fetch_limits, vec!["SEO: 503".to_string()]);
    }

    #[test]
    fn test_incomplete_job_becomes_placeholder_row() {
        let job = Job::new(
            "job-9",
            "key-a",
            Target::new("https://peer.io/", None),
            None,
            ReportStyle::Standard,
            0,
        );
        let signals = target_signals("https://peer.io/", Some(&job));
        assert_eq!(signals.fetch_limits, vec!["Job job-9 not complete".to_string()]);
        assert_eq!(signals.name, "peer.io");
        assert!(!signals.pricing_visible);
    }

    #[test]
    fn test_norms_percentages() {
        let rows = vec![
            row("https://a.io/", true, false, false, false),
            row("https://b.io/", true, true, false, false),
            row("https://c.io/", false, false, false, false),
        ];
        let norms = compute_norms(&rows);
        assert_eq!(norms.total_targets, 3);
        assert_eq!(norms.pricing_visible_count, 2);
        assert_eq!(norms.pricing_visible_pct, 66.7);
        assert_eq!(norms.docs_visible_pct, 33.3);
    }

    #[test]
    fn test_outliers_need_two_deviations() {
        let rows = vec![
            row("https://a.io/", true, true, true, true),
            row("https://b.io/", true, true, true, true),
            row("https://c.io/", true, true, false, true),
            row("https://d.io/", false, false, false, false),
        ];
        let matrix = build_matrix("https://d.io/", rows);

        assert_eq!(matrix.outliers.len(), 1);
        let outlier = &matrix.outliers[0];
        assert_eq!(outlier.url, "https://d.io/");
        assert_eq!(outlier.direction, OutlierDirection::Below);
        assert_eq!(outlier.deviations.len(), 3);
        assert_eq!(matrix.anchor_deviations, outlier.deviations);
    }

    #[test]
    fn test_small_cohorts_have_no_outliers() {
        let rows = vec![
            row("https://a.io/", true, true, true, true),
            row("https://b.io/", false, false, false, false),
        ];
        let matrix = build_matrix("https://a.io/", rows);
        assert!(matrix.outliers.is_empty());
        assert!(matrix.anchor_deviations.is_empty());
    }

    #[test]
    fn test_above_norm_direction() {
        let rows = vec![
            row("https://a.io/", false, false, false, false),
            row("https://b.io/", false, false, false, false),
            row("https://c.io/", true, true, false, false),
        ];
        let matrix = build_matrix("https://a.io/", rows);
        assert_eq!(matrix.outliers.len(), 1);
        assert_eq!(matrix.outliers[0].direction, OutlierDirection::Above);
        assert!(matrix.anchor_deviations.is_empty());
    }
}
