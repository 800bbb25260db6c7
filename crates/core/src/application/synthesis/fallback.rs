// Deterministic report builder used when the LLM path fails

use crate::domain::{
    CompanyProfile, Delta, Presence, ProbeResult, Report, ReportSource, ReportStyle, SectionKey,
};

/// Strategic trajectory block rendered above the sections when a delta exists
pub fn trajectory_block(delta: &Delta) -> String {
    let mut out = format!(
        "> **Strategic Trajectory (Last {} Days)**\n> * **Stability**: {} ({:.2})\n",
        delta.elapsed_days.round() as i64,
        delta.stability_label(),
        delta.stability
    );

    let shifts: Vec<_> = delta.shifts().collect();
    if shifts.is_empty() {
        out.push_str("> * No tracked field changed since the previous snapshot.\n");
    } else {
        out.push_str("> * **Shifts**:\n");
        for shift in shifts {
            out.push_str(&format!(">     * {}: {}\n", shift.field, shift.change.as_str()));
        }
    }
    out
}

/// Build a complete report from the profile alone
pub fn build_report(
    profile: &CompanyProfile,
    delta: Option<&Delta>,
    style: ReportStyle,
    focus: Option<&str>,
) -> Report {
    let mut report = Report::new(
        profile.company.name.clone(),
        focus.map(str::to_string),
        style,
        ReportSource::Fallback,
    );
    report.trajectory = delta.map(trajectory_block);

    for (key, section) in profile.sections() {
        let mut body = section_body(key, section);
        if let Some(coda) = style_coda(style, section.presence) {
            body.push_str("\n\n");
            body.push_str(coda);
        }
        report.push_section(key, body);
    }

    if style == ReportStyle::RedTeam {
        report.addendum = Some(red_team_addendum(profile));
    }
    report
}

fn section_body(key: SectionKey, section: &ProbeResult) -> String {
    match section.presence {
        Presence::Skipped => format!(
            "Not collected: the {} probe was outside the scope of this analysis.",
            key.title()
        ),
        Presence::Errored => format!(
            "Collection failed ({}). No conclusions are drawn from this section.",
            section.error.as_deref().unwrap_or("unknown error")
        ),
        Presence::Present => {
            let lines = observations(key, section);
            if lines.is_empty() {
                format!("The probe ran but found no {} signals.", key.title())
            } else {
                lines
                    .into_iter()
                    .map(|l| format!("- {}", l))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }
}

fn joined(items: &[String], limit: usize) -> String {
    let mut shown: Vec<&str> = items.iter().take(limit).map(String::as_str).collect();
    if items.len() > limit {
        shown.push("...");
    }
    shown.join(", ")
}

fn observations(key: SectionKey, s: &ProbeResult) -> Vec<String> {
    let mut lines = Vec::new();
    match key {
        SectionKey::Web => {
            if let Some(title) = s.str_field("meta.title") {
                lines.push(format!("Title: {}", title));
            }
            if let Some(description) = s.str_field("meta.description") {
                lines.push(format!("Description: {}", description));
            }
            let h1 = s.list_field("meta.h1");
            if !h1.is_empty() {
                lines.push(format!("Primary headings: {}", joined(&h1, 3)));
            }
            if let Some(text) = s.str_field("clean_text") {
                lines.push(format!("Homepage copy: {} words", text.split_whitespace().count()));
            }
        }
        SectionKey::Seo => {
            let meta = s.list_field("meta_issues");
            let headings = s.list_field("heading_issues");
            if meta.is_empty() && headings.is_empty() {
                lines.push("No meta or heading issues detected".to_string());
            } else {
                if !meta.is_empty() {
                    lines.push(format!("Meta issues ({}): {}", meta.len(), joined(&meta, 3)));
                }
                if !headings.is_empty() {
                    lines.push(format!(
                        "Heading issues ({}): {}",
                        headings.len(),
                        joined(&headings, 3)
                    ));
                }
            }
        }
        SectionKey::TechStack => {
            for (label, path) in [("Frameworks", "frameworks"), ("Analytics", "analytics"), ("Other", "other")] {
                let items = s.list_field(path);
                if !items.is_empty() {
                    lines.push(format!("{}: {}", label, joined(&items, 6)));
                }
            }
            if let Some(cms) = s.str_field("cms") {
                lines.push(format!("CMS: {}", cms));
            }
            if let Some(cdn) = s.str_field("cdn") {
                lines.push(format!("CDN: {}", cdn));
            }
        }
        SectionKey::Reviews => {
            if let Some(summary) = s.str_field("summary") {
                lines.push(format!("Summary: {}", summary));
            }
            let complaints = s.list_field("top_complaints");
            if !complaints.is_empty() {
                lines.push(format!("Top complaints: {}", joined(&complaints, 3)));
            }
            let praises = s.list_field("top_praises");
            if !praises.is_empty() {
                lines.push(format!("Top praises: {}", joined(&praises, 3)));
            }
        }
        SectionKey::Social => {
            for (label, path) in [("Twitter", "twitter"), ("Instagram", "instagram"), ("YouTube", "youtube")] {
                if let Some(handle) = s.str_field(path) {
                    lines.push(format!("{}: {}", label, handle));
                }
            }
        }
        SectionKey::Hiring => {
            let roles = s.list_field("open_roles");
            if !roles.is_empty() {
                lines.push(format!("{} open roles: {}", roles.len(), joined(&roles, 5)));
            }
            if let Some(focus) = s.str_field("inferred_focus") {
                lines.push(format!("Inferred focus: {}", focus));
            }
        }
        SectionKey::Ads => {
            let platforms = s.list_field("platforms");
            if !platforms.is_empty() {
                lines.push(format!("Active on: {}", joined(&platforms, 5)));
            }
            let themes = s.list_field("themes");
            if !themes.is_empty() {
                lines.push(format!("Themes: {}", joined(&themes, 5)));
            }
        }
    }
    lines
}

fn style_coda(style: ReportStyle, presence: Presence) -> Option<&'static str> {
    match (style, presence) {
        (ReportStyle::RedTeam, Presence::Present) => {
            Some("_Exposure: every signal above is visible to competitors and attackers alike._")
        }
        (ReportStyle::RedTeam, _) => {
            Some("_Exposure: unknown. Missing visibility is a gap to probe, not evidence of safety._")
        }
        (ReportStyle::Investor, Presence::Present) => {
            Some("_Diligence: verify these public signals against internal metrics._")
        }
        (ReportStyle::Founder, Presence::Present) => {
            Some("_Next step: decide whether this surface is a lever or a liability for the next quarter._")
        }
        _ => None,
    }
}

fn red_team_addendum(profile: &CompanyProfile) -> String {
    let gaps: Vec<&str> = profile
        .sections()
        .filter(|(_, s)| s.presence != Presence::Present)
        .map(|(k, _)| k.title())
        .collect();

    let mut out = String::from(
        "- **Attack Surface**: publicly observable signals above are the starting map. ",
    );
    if gaps.is_empty() {
        out.push_str("Every section returned data; prioritize the most detailed surfaces.\n");
    } else {
        out.push_str(&format!(
            "Blind spots in this collection: {}. Opacity is not security.\n",
            gaps.join(", ")
        ));
    }
    let tech = profile.tech_stack.list_field("frameworks").len()
        + profile.tech_stack.list_field("analytics").len();
    if tech > 0 {
        out.push_str(&format!(
            "- **Supply Chain**: {} third-party components fingerprinted from the public site.\n",
            tech
        ));
    }
    out
}
