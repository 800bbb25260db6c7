// Cohort Domain Model - peer set analyzed side by side

use crate::domain::error::{DomainError, Result};
use crate::domain::job::{JobId, OwnerKey};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type CohortId = String;

/// Cohort lifecycle: awaiting_confirmation -> confirmed -> analyzing -> complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortStatus {
    AwaitingConfirmation,
    Confirmed,
    Analyzing,
    Complete,
}

impl CohortStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CohortStatus::AwaitingConfirmation => "awaiting_confirmation",
            CohortStatus::Confirmed => "confirmed",
            CohortStatus::Analyzing => "analyzing",
            CohortStatus::Complete => "complete",
        }
    }
}

impl std::fmt::Display for CohortStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CohortStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "awaiting_confirmation" => Ok(CohortStatus::AwaitingConfirmation),
            "confirmed" => Ok(CohortStatus::Confirmed),
            "analyzing" => Ok(CohortStatus::Analyzing),
            "complete" => Ok(CohortStatus::Complete),
            other => Err(DomainError::UnknownVariant {
                kind: "cohort status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateConfidence {
    #[default]
    Low,
    Medium,
}

/// Peer suggested by discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortCandidate {
    pub url: String,
    pub name: String,
    pub source: String,
    pub rationale: String,
    #[serde(default)]
    pub confidence: CandidateConfidence,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechConfidence {
    High,
    Medium,
    Low,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeoHygiene {
    Good,
    Fair,
    Poor,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialVisibility {
    High,
    Low,
    #[default]
    None,
}

macro_rules! bucket_label {
    ($ty:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }
    };
}

bucket_label!(TechConfidence { High => "high", Medium => "medium", Low => "low", None => "none" });
bucket_label!(SeoHygiene { Good => "good", Fair => "fair", Poor => "poor", Unknown => "unknown" });
bucket_label!(SocialVisibility { High => "high", Low => "low", None => "none" });

/// One comparison-matrix row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSignals {
    pub url: String,
    pub name: String,
    pub job_id: Option<JobId>,
    pub tech_confidence: TechConfidence,
    pub probable_cms: Option<String>,
    pub pricing_visible: bool,
    pub docs_visible: bool,
    pub jobs_visible: bool,
    pub paid_ads_detected: bool,
    pub seo_hygiene: SeoHygiene,
    pub social_visibility: SocialVisibility,
    pub review_visibility: bool,
    pub evidence_snippets: Vec<String>,
    pub fetch_limits: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortNorms {
    pub total_targets: usize,
    pub pricing_visible_count: usize,
    pub docs_visible_count: usize,
    pub jobs_visible_count: usize,
    pub paid_ads_count: usize,
    pub seo_good_count: usize,
    pub social_high_count: usize,
    pub review_visible_count: usize,
    pub pricing_visible_pct: f64,
    pub docs_visible_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierDirection {
    Above,
    Below,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortOutlier {
    pub url: String,
    pub deviations: Vec<String>,
    pub direction: OutlierDirection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortMatrix {
    pub targets: Vec<TargetSignals>,
    pub norms: CohortNorms,
    pub outliers: Vec<CohortOutlier>,
    pub anchor_deviations: Vec<String>,
}

/// Cohort Entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    pub id: CohortId,
    pub owner_key: OwnerKey,
    pub anchor_url: String,
    pub category_hint: Option<String>,
    pub status: CohortStatus,
    pub extracted_terms: Vec<String>,
    pub candidates: Vec<CohortCandidate>,
    pub confirmed_urls: Vec<String>,
    pub job_ids: Vec<JobId>,
    pub matrix: Option<CohortMatrix>,
    pub report_md: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Cohort {
    pub fn propose(
        id: impl Into<String>,
        owner_key: impl Into<String>,
        anchor_url: impl Into<String>,
        category_hint: Option<String>,
        extracted_terms: Vec<String>,
        candidates: Vec<CohortCandidate>,
        now_millis: i64,
    ) -> Self {
        Self {
            id: id.into(),
            owner_key: owner_key.into(),
            anchor_url: anchor_url.into(),
            category_hint,
            status: CohortStatus::AwaitingConfirmation,
            extracted_terms,
            candidates,
            confirmed_urls: Vec::new(),
            job_ids: Vec::new(),
            matrix: None,
            report_md: None,
            created_at: now_millis,
            updated_at: now_millis,
        }
    }

    fn expect_status(&self, expected: CohortStatus, to: CohortStatus) -> Result<()> {
        if self.status != expected {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    /// awaiting_confirmation -> confirmed. The anchor, when included, goes first.
    pub fn confirm(&mut self, urls: Vec<String>, include_anchor: bool, now_millis: i64) -> Result<()> {
        self.expect_status(CohortStatus::AwaitingConfirmation, CohortStatus::Confirmed)?;

        let mut confirmed: Vec<String> = Vec::with_capacity(urls.len() + 1);
        if include_anchor {
            confirmed.push(self.anchor_url.clone());
        }
        for url in urls {
            if !confirmed.contains(&url) {
                confirmed.push(url);
            }
        }
        if confirmed.is_empty() {
            return Err(DomainError::ValidationError(
                "cohort must contain at least one target".to_string(),
            ));
        }

        self.confirmed_urls = confirmed;
        self.status = CohortStatus::Confirmed;
        self.updated_at = now_millis;
        Ok(())
    }

    /// confirmed -> analyzing, before any job exists. Jobs are attached once admitted.
    pub fn claim_analysis(&mut self, now_millis: i64) -> Result<()> {
        self.expect_status(CohortStatus::Confirmed, CohortStatus::Analyzing)?;
        self.job_ids.clear();
        self.status = CohortStatus::Analyzing;
        self.updated_at = now_millis;
        Ok(())
    }

    /// One job id per confirmed URL, in the same order
    pub fn attach_jobs(&mut self, job_ids: Vec<JobId>, now_millis: i64) -> Result<()> {
        if self.status != CohortStatus::Analyzing || !self.job_ids.is_empty() {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: CohortStatus::Analyzing.to_string(),
            });
        }
        if job_ids.len() != self.confirmed_urls.len() {
            return Err(DomainError::ValidationError(format!(
                "expected {} job ids, got {}",
                self.confirmed_urls.len(),
                job_ids.len()
            )));
        }
        self.job_ids = job_ids;
        self.updated_at = now_millis;
        Ok(())
    }

    /// Analyzing, but the member jobs are not admitted yet
    pub fn is_claimed(&self) -> bool {
        self.status == CohortStatus::Analyzing && self.job_ids.is_empty()
    }

    /// analyzing -> complete
    pub fn complete(&mut self, matrix: CohortMatrix, report_md: String, now_millis: i64) -> Result<()> {
        self.expect_status(CohortStatus::Analyzing, CohortStatus::Complete)?;
        self.matrix = Some(matrix);
        self.report_md = Some(report_md);
        self.status = CohortStatus::Complete;
        self.updated_at = now_millis;
        Ok(())
    }
}
