// Probe Planner - focus keywords and configuration decide which probes run

use crate::domain::{ProbeKind, SectionKey};
use std::collections::{BTreeSet, HashSet};

/// Enable rule for one probe
struct EnableRule {
    probe: ProbeKind,
    /// Enabled whenever a URL is known
    with_url: bool,
    /// Enabled when the focus mentions any of these
    keywords: &'static [&'static str],
}

const VOICE_KEYWORDS: &[&str] = &["review", "reviews", "brand", "reputation", "customer", "voice"];

const ENABLE_RULES: [EnableRule; 7] = [
    EnableRule {
        probe: ProbeKind::WebScrape,
        with_url: true,
        keywords: &[],
    },
    EnableRule {
        probe: ProbeKind::SeoProbe,
        with_url: true,
        keywords: &[],
    },
    EnableRule {
        probe: ProbeKind::TechStack,
        with_url: true,
        keywords: &[],
    },
    EnableRule {
        probe: ProbeKind::ReviewsSnapshot,
        with_url: false,
        keywords: VOICE_KEYWORDS,
    },
    EnableRule {
        probe: ProbeKind::SocialSnapshot,
        with_url: false,
        keywords: &[
            "social", "twitter", "instagram", "tiktok", "youtube", "community", "review", "reviews",
            "brand", "reputation", "customer", "voice",
        ],
    },
    EnableRule {
        probe: ProbeKind::CareersIntel,
        with_url: false,
        keywords: &["hiring", "hire", "recruit", "talent", "headcount", "org", "organization", "team"],
    },
    EnableRule {
        probe: ProbeKind::AdsSnapshot,
        with_url: false,
        keywords: &["ads", "advertising", "campaign", "cpc", "paid", "growth", "marketing"],
    },
];

/// Probes chosen for one job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbePlan {
    enabled: BTreeSet<ProbeKind>,
}

impl ProbePlan {
    pub fn is_enabled(&self, kind: ProbeKind) -> bool {
        self.enabled.contains(&kind)
    }

    pub fn enabled(&self) -> impl Iterator<Item = ProbeKind> + '_ {
        self.enabled.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }

    /// Sections whose probe will not run
    pub fn skipped_sections(&self) -> Vec<SectionKey> {
        SectionKey::ALL
            .into_iter()
            .filter(|s| !self.is_enabled(ProbeKind::for_section(*s)))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Planner {
    disabled: HashSet<ProbeKind>,
}

impl Planner {
    /// Probes in `disabled` never run, whatever the focus says
    pub fn new(disabled: impl IntoIterator<Item = ProbeKind>) -> Self {
        Self {
            disabled: disabled.into_iter().collect(),
        }
    }

    pub fn plan(&self, has_url: bool, focus: Option<&str>) -> ProbePlan {
        let terms = focus_terms(focus);
        let enabled = ENABLE_RULES
            .iter()
            .filter(|rule| {
                (rule.with_url && has_url) || rule.keywords.iter().any(|k| terms.contains(*k))
            })
            .map(|rule| rule.probe)
            .filter(|kind| !self.disabled.contains(kind))
            .collect();
        ProbePlan { enabled }
    }
}

/// Lowercased alphanumeric tokens of the focus text
fn focus_terms(focus: Option<&str>) -> HashSet<String> {
    focus
        .unwrap_or_default()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
