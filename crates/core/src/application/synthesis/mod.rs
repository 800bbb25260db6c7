// Report Synthesis - LLM first, deterministic fallback on any failure

pub mod fallback;
pub mod prompt;

use crate::domain::{CompanyProfile, Delta, Report, ReportSource, ReportStyle, SectionKey};
use crate::port::{LlmClient, SynthesisError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Always yields a complete report: the LLM path when it succeeds and
    /// covers every section, the fallback builder otherwise.
    pub async fn synthesize(
        &self,
        profile: &CompanyProfile,
        delta: Option<&Delta>,
        style: ReportStyle,
        focus: Option<&str>,
    ) -> Report {
        match self.try_llm(profile, delta, style, focus).await {
            Ok(report) => {
                info!(company = %profile.company.name, style = %style, "Report synthesized by LLM");
                report
            }
            Err(SynthesisError::Disabled) => fallback::build_report(profile, delta, style, focus),
            Err(e) => {
                warn!(
                    company = %profile.company.name,
                    error = %e,
                    "LLM synthesis failed, using deterministic report"
                );
                fallback::build_report(profile, delta, style, focus)
            }
        }
    }

    async fn try_llm(
        &self,
        profile: &CompanyProfile,
        delta: Option<&Delta>,
        style: ReportStyle,
        focus: Option<&str>,
    ) -> Result<Report, SynthesisError> {
        let request = prompt::build_request(profile, delta, style, focus)?;

        let text = tokio::time::timeout(self.timeout, self.llm.generate(&request))
            .await
            .map_err(|_| SynthesisError::Timeout(self.timeout.as_millis() as u64))??;

        let mut parsed = prompt::parse_response(&text)?;

        let mut report = Report::new(
            profile.company.name.clone(),
            focus.map(str::to_string),
            style,
            ReportSource::Llm,
        );
        report.trajectory = delta.map(fallback::trajectory_block);
        for key in SectionKey::ALL {
            let body = parsed
                .bodies
                .remove(&key)
                .ok_or_else(|| SynthesisError::MissingSection(key.as_str().to_string()))?;
            report.push_section(key, body);
        }

        if style == ReportStyle::RedTeam {
            report.addendum = Some(match parsed.addendum {
                Some(addendum) => addendum,
                None => fallback::build_report(profile, delta, style, focus)
                    .addendum
                    .unwrap_or_default(),
            });
        }
        Ok(report)
    }
}
