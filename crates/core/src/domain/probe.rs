// Probe capabilities - one external collaborator per profile section

use crate::domain::error::{DomainError, Result};
use crate::domain::profile::SectionKey;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    WebScrape,
    SeoProbe,
    TechStack,
    ReviewsSnapshot,
    SocialSnapshot,
    CareersIntel,
    AdsSnapshot,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 7] = [
        ProbeKind::WebScrape,
        ProbeKind::SeoProbe,
        ProbeKind::TechStack,
        ProbeKind::ReviewsSnapshot,
        ProbeKind::SocialSnapshot,
        ProbeKind::CareersIntel,
        ProbeKind::AdsSnapshot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::WebScrape => "web_scrape",
            ProbeKind::SeoProbe => "seo_probe",
            ProbeKind::TechStack => "tech_stack",
            ProbeKind::ReviewsSnapshot => "reviews_snapshot",
            ProbeKind::SocialSnapshot => "social_snapshot",
            ProbeKind::CareersIntel => "careers_intel",
            ProbeKind::AdsSnapshot => "ads_snapshot",
        }
    }

    /// Profile section this probe fills
    pub fn section(&self) -> SectionKey {
        match self {
            ProbeKind::WebScrape => SectionKey::Web,
            ProbeKind::SeoProbe => SectionKey::Seo,
            ProbeKind::TechStack => SectionKey::TechStack,
            ProbeKind::ReviewsSnapshot => SectionKey::Reviews,
            ProbeKind::SocialSnapshot => SectionKey::Social,
            ProbeKind::CareersIntel => SectionKey::Hiring,
            ProbeKind::AdsSnapshot => SectionKey::Ads,
        }
    }

    pub fn for_section(key: SectionKey) -> ProbeKind {
        match key {
            SectionKey::Web => ProbeKind::WebScrape,
            SectionKey::Seo => ProbeKind::SeoProbe,
            SectionKey::TechStack => ProbeKind::TechStack,
            SectionKey::Reviews => ProbeKind::ReviewsSnapshot,
            SectionKey::Social => ProbeKind::SocialSnapshot,
            SectionKey::Hiring => ProbeKind::CareersIntel,
            SectionKey::Ads => ProbeKind::AdsSnapshot,
        }
    }

    /// Consumes web_scrape output and starts only after it resolves
    pub fn depends_on_scrape(&self) -> bool {
        matches!(self, ProbeKind::SeoProbe | ProbeKind::TechStack)
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        ProbeKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DomainError::UnknownVariant {
                kind: "probe",
                value: s.to_string(),
            })
    }
}
