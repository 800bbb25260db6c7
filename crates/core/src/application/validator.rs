// Target Validator - rejects unsafe or malformed targets before anything is consumed

use crate::application::constants::MAX_URL_LENGTH;
use crate::error::{AppError, Result};
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

const INTERNAL_HOSTNAMES: &[&str] = &["metadata.google.internal", "metadata"];
const INTERNAL_SUFFIXES: &[&str] = &[".local", ".internal", ".localhost"];

/// Validate a raw target URL and return its normalized form
///
/// Rules, in order: http(s) scheme, no loopback/unspecified host, no private,
/// link-local or reserved address, no internal hostname.
pub fn validate_target(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::Validation("url is required".to_string()));
    }
    if raw.len() > MAX_URL_LENGTH {
        return Err(AppError::Validation(format!(
            "url exceeds {} characters",
            MAX_URL_LENGTH
        )));
    }

    let url = Url::parse(raw).map_err(|e| AppError::Validation(format!("malformed url: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Validation(format!(
            "scheme rule: '{}' is not http or https",
            url.scheme()
        )));
    }

    match url.host() {
        None => Err(AppError::Validation("url has no host".to_string())),
        Some(Host::Domain(domain)) => check_domain(domain),
        Some(Host::Ipv4(ip)) => check_ipv4(ip),
        Some(Host::Ipv6(ip)) => check_ipv6(ip),
    }?;

    Ok(url.to_string())
}

fn check_domain(domain: &str) -> Result<()> {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    if domain == "localhost" {
        return Err(loopback(&domain));
    }
    if INTERNAL_HOSTNAMES.contains(&domain.as_str())
        || INTERNAL_SUFFIXES.iter().any(|s| domain.ends_with(s))
    {
        return Err(AppError::Validation(format!(
            "internal hostname rule: '{}' is not a public host",
            domain
        )));
    }
    Ok(())
}

fn check_ipv4(ip: Ipv4Addr) -> Result<()> {
    if ip.is_loopback() || ip.is_unspecified() {
        return Err(loopback(&ip.to_string()));
    }
    let [a, b, ..] = ip.octets();
    let shared = a == 100 && (64..128).contains(&b); // 100.64.0.0/10
    let reserved = a >= 240; // 240.0.0.0/4 and broadcast
    if ip.is_private() || ip.is_link_local() || shared || reserved {
        return Err(private(&ip.to_string()));
    }
    Ok(())
}

fn check_ipv6(ip: Ipv6Addr) -> Result<()> {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return check_ipv4(mapped);
    }
    if ip.is_loopback() || ip.is_unspecified() {
        return Err(loopback(&ip.to_string()));
    }
    let first = ip.segments()[0];
    let unique_local = first & 0xfe00 == 0xfc00; // fc00::/7
    let link_local = first & 0xffc0 == 0xfe80; // fe80::/10
    if unique_local || link_local {
        return Err(private(&ip.to_string()));
    }
    Ok(())
}

fn loopback(host: &str) -> AppError {
    AppError::Validation(format!("loopback rule: '{}' points at this machine", host))
}

fn private(host: &str) -> AppError {
    AppError::Validation(format!(
        "private network rule: '{}' is not publicly routable",
        host
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(raw: &str) -> String {
        match validate_target(raw) {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected rejection for {}, got {:?}", raw, other),
        }
    }

    #[test]
    fn test_accepts_and_normalizes_public_urls() {
        assert_eq!(validate_target("https://Acme.IO").unwrap(), "https://acme.io/");
        assert_eq!(
            validate_target("  http://example.com/pricing?x=1 ").unwrap(),
            "http://example.com/pricing?x=1"
        );
        assert!(validate_target("https://8.8.8.8/").is_ok());
    }

    #[test]
    fn test_scheme_rule() {
        assert!(rejected("ftp://example.com/").contains("scheme"));
        assert!(rejected("file:///etc/passwd").contains("scheme"));
        assert!(rejected("example.com").contains("malformed"));
    }

    #[test]
    fn test_loopback_rule() {
        assert!(rejected("http://127.0.0.1/x").contains("loopback"));
        assert!(rejected("http://localhost:9/").contains("loopback"));
        assert!(rejected("http://[::1]/").contains("loopback"));
        assert!(rejected("http://0.0.0.0/").contains("loopback"));
        // numeric host forms are normalized by the parser
        assert!(rejected("http://2130706433/").contains("loopback"));
    }

    #[test]
    fn test_private_rule() {
        assert!(rejected("http://169.254.169.254/").contains("private"));
        assert!(rejected("http://10.1.2.3/").contains("private"));
        assert!(rejected("http://172.16.0.1/").contains("private"));
        assert!(rejected("http://192.168.1.1/").contains("private"));
        assert!(rejected("http://[fd00::1]/").contains("private"));
        assert!(rejected("http://[fe80::1]/").contains("private"));
        assert!(rejected("http://[::ffff:10.0.0.1]/").contains("private"));
        assert!(validate_target("http://172.32.0.1/").is_ok());
    }

    #[test]
    fn test_internal_hostname_rule() {
        assert!(rejected("http://metadata.google.internal/").contains("internal"));
        assert!(rejected("http://printer.local/").contains("internal"));
        assert!(rejected("http://api.localhost/").contains("internal"));
    }

    #[test]
    fn test_length_and_empty() {
        assert!(rejected("").contains("required"));
        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert!(rejected(&long).contains("exceeds"));
    }
}
