// Synthesized Report

use crate::domain::error::{DomainError, Result};
use crate::domain::profile::SectionKey;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Voice of the synthesized report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStyle {
    #[default]
    Standard,
    RedTeam,
    Narrative,
    Investor,
    Founder,
}

impl ReportStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStyle::Standard => "standard",
            ReportStyle::RedTeam => "red_team",
            ReportStyle::Narrative => "narrative",
            ReportStyle::Investor => "investor",
            ReportStyle::Founder => "founder",
        }
    }

    /// Pick a style from free-text focus keywords; standard when nothing matches
    pub fn infer_from_focus(focus: Option<&str>) -> Self {
        let focus = focus.unwrap_or_default().to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| focus.contains(w));

        if has(&["red team", "red-team", "opfor", "attack surface", "adversarial"]) {
            ReportStyle::RedTeam
        } else if has(&["narrative", "article", "case study", "essay", "story"]) {
            ReportStyle::Narrative
        } else if has(&["investor", "due diligence", "diligence"]) {
            ReportStyle::Investor
        } else if has(&["founder", "playbook"]) {
            ReportStyle::Founder
        } else {
            ReportStyle::Standard
        }
    }
}

impl std::fmt::Display for ReportStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStyle {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "standard" => Ok(ReportStyle::Standard),
            "red_team" | "redteam" => Ok(ReportStyle::RedTeam),
            "narrative" => Ok(ReportStyle::Narrative),
            "investor" => Ok(ReportStyle::Investor),
            "founder" => Ok(ReportStyle::Founder),
            other => Err(DomainError::UnknownVariant {
                kind: "report style",
                value: other.to_string(),
            }),
        }
    }
}

/// Which path produced the report text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    Llm,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub key: SectionKey,
    pub title: String,
    pub body: String,
}

/// Report with one section per profile section, in profile order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub company_name: String,
    pub focus: Option<String>,
    pub style: ReportStyle,
    pub source: ReportSource,
    /// Strategic trajectory block, only present when a delta exists
    pub trajectory: Option<String>,
    pub sections: Vec<ReportSection>,
    pub addendum: Option<String>,
}

pub const DEFAULT_FOCUS: &str = "General OSINT & growth posture";

impl Report {
    pub fn new(
        company_name: impl Into<String>,
        focus: Option<String>,
        style: ReportStyle,
        source: ReportSource,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            focus,
            style,
            source,
            trajectory: None,
            sections: Vec::with_capacity(SectionKey::ALL.len()),
            addendum: None,
        }
    }

    pub fn push_section(&mut self, key: SectionKey, body: impl Into<String>) {
        self.sections.push(ReportSection {
            key,
            title: format!("{}. {}", key.ordinal(), key.title()),
            body: body.into(),
        });
    }

    pub fn section(&self, key: SectionKey) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.key == key)
    }

    /// Exactly one section per declared profile section, in declared order
    pub fn is_complete(&self) -> bool {
        self.sections.len() == SectionKey::ALL.len()
            && self
                .sections
                .iter()
                .zip(SectionKey::ALL)
                .all(|(s, k)| s.key == k && !s.body.trim().is_empty())
    }

    pub fn markdown(&self) -> String {
        let mut out = format!(
            "# OSINT Intelligence Report: {}\n\n_Focus: {}_\n\n",
            self.company_name,
            self.focus.as_deref().unwrap_or(DEFAULT_FOCUS)
        );

        if let Some(trajectory) = &self.trajectory {
            out.push_str(trajectory.trim_end());
            out.push_str("\n\n");
        }

        for section in &self.sections {
            out.push_str(&format!("## {}\n\n{}\n\n", section.title, section.body.trim()));
        }

        if let Some(addendum) = &self.addendum {
            out.push_str(&format!("## Red Team Addendum\n\n{}\n", addendum.trim()));
        }

        out
    }
}
