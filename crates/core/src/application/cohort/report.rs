// Cohort comparative report (markdown)

use super::matrix::domain_of;
use crate::domain::{CohortMatrix, OutlierDirection};
use std::fmt::Write;

const CANNOT_VALIDATE: &[&str] = &[
    "Internal pricing or discount structures",
    "Actual revenue or growth metrics",
    "Product quality or customer satisfaction beyond public reviews",
    "Team size or organizational structure beyond job postings",
    "Technical architecture beyond public-facing stack",
    "Competitive positioning or market share",
];

fn mark(flag: bool) -> &'static str {
    if flag {
        "✓"
    } else {
        "-"
    }
}

fn direction(direction: OutlierDirection) -> &'static str {
    match direction {
        OutlierDirection::Above => "above",
        OutlierDirection::Below => "below",
        OutlierDirection::Mixed => "mixed",
    }
}

pub fn render(matrix: &CohortMatrix, anchor_url: &str) -> String {
    let norms = &matrix.norms;
    let n = norms.total_targets;
    let mut out = String::new();

    // writeln! into a String cannot fail
    let _ = writeln!(out, "# SaaS Cohort Comparative Analysis");
    let _ = writeln!(out, "_Anchor: {}_", anchor_url);
    let _ = writeln!(out, "_Cohort Size: {} targets_\n", n);

    let _ = writeln!(out, "## Cohort Norms");
    let _ = writeln!(
        out,
        "- **Pricing Visible**: {}/{} ({}%)",
        norms.pricing_visible_count, n, norms.pricing_visible_pct
    );
    let _ = writeln!(
        out,
        "- **Docs Visible**: {}/{} ({}%)",
        norms.docs_visible_count, n, norms.docs_visible_pct
    );
    let _ = writeln!(out, "- **Jobs Posted**: {}/{}", norms.jobs_visible_count, n);
    let _ = writeln!(out, "- **Paid Ads Active**: {}/{}", norms.paid_ads_count, n);
    let _ = writeln!(out, "- **SEO Good**: {}/{}", norms.seo_good_count, n);
    let _ = writeln!(out, "- **Social Presence (High)**: {}/{}", norms.social_high_count, n);
    let _ = writeln!(out, "- **Review Visibility**: {}/{}\n", norms.review_visible_count, n);

    let _ = writeln!(out, "## Outliers");
    if matrix.outliers.is_empty() {
        let _ = writeln!(out, "_No significant outliers detected._\n");
    } else {
        for outlier in &matrix.outliers {
            let _ = writeln!(out, "### {} ({})", outlier.url, direction(outlier.direction));
            for deviation in &outlier.deviations {
                let _ = writeln!(out, "- {}", deviation);
            }
            out.push('\n');
        }
    }

    if !matrix.anchor_deviations.is_empty() {
        let _ = writeln!(out, "## Anchor Deviations");
        let _ = writeln!(out, "The anchor ({}) differs from the cohort norm in:", anchor_url);
        for deviation in &matrix.anchor_deviations {
            let _ = writeln!(out, "- {}", deviation);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## Comparison Matrix");
    let _ = writeln!(out, "| Target | Tech | CMS | Pricing | Docs | Jobs | Ads | SEO | Social | Reviews |");
    let _ = writeln!(out, "|--------|------|-----|---------|------|------|-----|-----|--------|---------|");
    for t in &matrix.targets {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |",
            domain_of(&t.url),
            t.tech_confidence.as_str(),
            t.probable_cms.as_deref().unwrap_or("-"),
            mark(t.pricing_visible),
            mark(t.docs_visible),
            mark(t.jobs_visible),
            mark(t.paid_ads_detected),
            t.seo_hygiene.as_str(),
            t.social_visibility.as_str(),
            mark(t.review_visibility),
        );
    }
    out.push('\n');

    let limited: Vec<_> = matrix
        .targets
        .iter()
        .filter(|t| !t.fetch_limits.is_empty())
        .collect();
    if !limited.is_empty() {
        let _ = writeln!(out, "## Collection Limits");
        for t in limited {
            let _ = writeln!(out, "- {}: {}", domain_of(&t.url), t.fetch_limits.join("; "));
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## What Cannot Be Validated from Public Signals");
    let _ = writeln!(out, "The following aspects cannot be reliably inferred from OSINT:\n");
    for item in CANNOT_VALIDATE {
        let _ = writeln!(out, "- {}", item);
    }
    let _ = writeln!(
        out,
        "\n_Absence of signals should not be interpreted as sophistication or prestige._"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cohort::matrix::build_matrix;
    use crate::domain::{SocialVisibility, TargetSignals};

    fn row(url: &str, visible: bool) -> TargetSignals {
        TargetSignals {
            url: url.to_string(),
            pricing_visible: visible,
            docs_visible: visible,
            jobs_visible: visible,
            social_visibility: if visible {
                SocialVisibility::High
            } else {
                SocialVisibility::None
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_report_layout() {
        let mut lagging = row("https://www.lag.io/", false);
        lagging.fetch_limits = vec!["Job job-3 not complete".to_string()];
        let matrix = build_matrix(
            "https://www.lag.io/",
            vec![row("https://a.io/", true), row("https://b.io/", true), lagging],
        );
        let md = render(&matrix, "https://www.lag.io/");

        assert!(md.starts_with("# SaaS Cohort Comparative Analysis\n_Anchor: https://www.lag.io/_"));
        assert!(md.contains("_Cohort Size: 3 targets_"));
        assert!(md.contains("- **Pricing Visible**: 2/3 (66.7%)"));
        assert!(md.contains("### https://www.lag.io/ (below)"));
        assert!(md.contains("## Anchor Deviations"));
        assert!(md.contains("| lag.io | none | - | - | - | - | - | unknown | none | - |"));
        assert!(md.contains("| a.io | none | - | ✓ | ✓ | ✓ | - | unknown | high | - |"));
        assert!(md.contains("- lag.io: Job job-3 not complete"));
        assert!(md.contains("## What Cannot Be Validated from Public Signals"));
    }

    #[test]
    fn test_no_outliers_line() {
        let matrix = build_matrix("https://a.io/", vec![row("https://a.io/", true)]);
        let md = render(&matrix, "https://a.io/");
        assert!(md.contains("_No significant outliers detected._"));
        assert!(!md.contains("## Anchor Deviations"));
    }
}
