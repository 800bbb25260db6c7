// Synthesis prompt construction and response parsing

use crate::domain::{CompanyProfile, Delta, ReportStyle, SectionKey, DEFAULT_FOCUS};
use crate::port::{LlmRequest, SynthesisError};
use serde_json::{json, Value};
use std::collections::HashMap;

const SYSTEM_PROMPT: &str = "You are an OSINT analyst. You only describe what the supplied \
public signals show. Sections marked skipped or errored carry no evidence: say so plainly and \
never invent data for them. Respond with a single JSON object and nothing else.";

fn voice(style: ReportStyle) -> &'static str {
    match style {
        ReportStyle::Standard => {
            "Write a neutral, analytic intelligence brief. Short paragraphs, compact bullets allowed."
        }
        ReportStyle::RedTeam => {
            "Write from an adversarial point of view: name the exposure each signal creates \
             and what an attacker or aggressive competitor would do with it. Clinical and concrete."
        }
        ReportStyle::Narrative => {
            "Write continuous long-form prose for experienced operators. Ground every claim \
             in a signal; no bullet lists."
        }
        ReportStyle::Investor => {
            "Write as a skeptical diligence analyst: market position, scalability, margin \
             threats and execution risk. Terse and metrics-driven."
        }
        ReportStyle::Founder => {
            "Speak directly to the founder with blunt, leverage-focused guidance for the \
             next 90 to 180 days."
        }
    }
}

/// Build the LLM request for one profile
pub fn build_request(
    profile: &CompanyProfile,
    delta: Option<&Delta>,
    style: ReportStyle,
    focus: Option<&str>,
) -> Result<LlmRequest, SynthesisError> {
    let keys: Vec<&str> = SectionKey::ALL.iter().map(SectionKey::as_str).collect();
    let mut shape = serde_json::Map::new();
    for key in SectionKey::ALL {
        shape.insert(key.as_str().to_string(), json!(format!("markdown for {}", key.title())));
    }
    if style == ReportStyle::RedTeam {
        shape.insert("addendum".to_string(), json!("markdown red team addendum"));
    }

    let input = json!({
        "company": profile.company,
        "focus": focus.unwrap_or(DEFAULT_FOCUS),
        "sections": profile.sections_json(),
        "delta": delta,
    });
    let input = serde_json::to_string_pretty(&input)
        .map_err(|e| SynthesisError::Malformed(e.to_string()))?;
    let shape = serde_json::to_string_pretty(&Value::Object(shape))
        .map_err(|e| SynthesisError::Malformed(e.to_string()))?;

    let prompt = format!(
        "{voice}\n\nProduce one non-empty markdown string for each of these keys, in this \
         order: {keys}.\nExpected response shape:\n{shape}\n\nSignals:\n{input}\n",
        voice = voice(style),
        keys = keys.join(", "),
    );

    Ok(LlmRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt,
        json_mode: true,
    })
}

/// Parsed LLM response: one body per section plus the optional addendum
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSections {
    pub bodies: HashMap<SectionKey, String>,
    pub addendum: Option<String>,
}

/// Extract the JSON object from a response and require every section
pub fn parse_response(text: &str) -> Result<ParsedSections, SynthesisError> {
    let start = text
        .find('{')
        .ok_or_else(|| SynthesisError::Malformed("no JSON object in response".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| SynthesisError::Malformed("unterminated JSON object".to_string()))?;

    let object: serde_json::Map<String, Value> = serde_json::from_str(&text[start..=end])
        .map_err(|e| SynthesisError::Malformed(e.to_string()))?;

    let mut bodies = HashMap::with_capacity(SectionKey::ALL.len());
    for key in SectionKey::ALL {
        let body = object
            .get(key.as_str())
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| SynthesisError::MissingSection(key.as_str().to_string()))?;
        bodies.insert(key, body.to_string());
    }

    let addendum = object
        .get("addendum")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    Ok(ParsedSections { bodies, addendum })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Company;

    fn full_response() -> String {
        let mut map = serde_json::Map::new();
        for key in SectionKey::ALL {
            map.insert(key.as_str().to_string(), json!(format!("LLM view of {}", key)));
        }
        Value::Object(map).to_string()
    }

    #[test]
    fn test_parse_tolerates_surrounding_text() {
        let text = format!("Sure! Here it is:\n```json\n{}\n```", full_response());
        let parsed = parse_response(&text).unwrap();
        assert_eq!(parsed.bodies.len(), 7);
        assert_eq!(parsed.bodies[&SectionKey::Ads], "LLM view of ads");
        assert!(parsed.addendum.is_none());
    }

    #[test]
    fn test_parse_requires_every_section() {
        let err = parse_response(r#"{"web": "ok", "seo": "  "}"#).unwrap_err();
        assert_eq!(err, SynthesisError::MissingSection("seo".to_string()));

        assert!(matches!(
            parse_response("no json here"),
            Err(SynthesisError::Malformed(_))
        ));
    }

    #[test]
    fn test_request_carries_sections_and_style() {
        let profile = CompanyProfile::new(Company {
            name: "Acme".to_string(),
            url: "https://acme.io/".to_string(),
        });
        let request = build_request(&profile, None, ReportStyle::RedTeam, Some("pricing")).unwrap();
        assert!(request.json_mode);
        assert!(request.prompt.contains("\"tech_stack\""));
        assert!(request.prompt.contains("addendum"));
        assert!(request.prompt.contains("adversarial"));
        assert!(request.prompt.contains("\"skipped\""));
    }

    #[test]
    fn test_request_without_focus_uses_default_focus() {
        let profile = CompanyProfile::new(Company {
            name: "Acme".to_string(),
            url: "https://acme.io/".to_string(),
        });
        let request = build_request(&profile, None, ReportStyle::Standard, None).unwrap();
        assert!(request.prompt.contains(&format!("\"focus\": \"{}\"", DEFAULT_FOCUS)));
        assert!(request.prompt.contains("neutral, analytic"));
        assert!(!request.prompt.contains("addendum"));
    }
}
