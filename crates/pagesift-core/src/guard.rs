//! Pre-flight SSRF guard.
//!
//! Classifies a candidate URL as fetchable or rejects it with a typed
//! [`AppError::Validation`]. Pure, no I/O; rules are evaluated in a fixed
//! fail-closed order and the first violation wins. The guard is re-run on
//! every fetch call; decisions are never cached.

use url::Url;

use crate::config::SecurityConfig;
use crate::error::AppError;

/// Reserved private IPv4 ranges, inclusive (start, end) octet bounds:
/// 10.0.0.0/8, 127.0.0.0/8, 169.254.0.0/16, 172.16.0.0/12, 192.168.0.0/16.
const PRIVATE_IPV4_RANGES: [([u8; 4], [u8; 4]); 5] = [
    ([10, 0, 0, 0], [10, 255, 255, 255]),
    ([127, 0, 0, 0], [127, 255, 255, 255]),
    ([169, 254, 0, 0], [169, 254, 255, 255]),
    ([172, 16, 0, 0], [172, 31, 255, 255]),
    ([192, 168, 0, 0], [192, 168, 255, 255]),
];

const LOOPBACK_HOSTS: [&str; 4] = ["localhost", "127.0.0.1", "0.0.0.0", "::1"];

/// A URL that passed every guard rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardDecision {
    pub origin: String,
    /// Lowercased hostname, IPv6 brackets stripped.
    pub host: String,
    pub scheme: String,
    pub href: String,
}

/// Evaluate a raw URL against the security policy.
pub fn evaluate(raw_url: &str, security: &SecurityConfig) -> Result<GuardDecision, AppError> {
    let parsed = Url::parse(raw_url).map_err(|e| {
        AppError::Validation(format!("source.url must be a valid absolute URL: {e}"))
    })?;

    let scheme = parsed.scheme().to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(AppError::Validation(format!(
            "scheme '{scheme}' is not supported (only http and https)"
        )));
    }
    if security.enforce_https && scheme != "https" {
        return Err(AppError::Validation(
            "only https URLs are allowed for this service".into(),
        ));
    }

    // IPv6 literals come back bracketed from the URL parser.
    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::Validation("URL has no host".into()))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_ascii_lowercase();

    if !security.allow_localhost && LOOPBACK_HOSTS.contains(&host.as_str()) {
        return Err(AppError::Validation(
            "loopback or localhost URLs are not allowed".into(),
        ));
    }

    if is_private_ipv4(&host) {
        return Err(AppError::Validation(
            "private network IPs are not allowed".into(),
        ));
    }

    if !security.blocked_hosts.is_empty() && host_matches_list(&host, &security.blocked_hosts) {
        return Err(AppError::Validation(format!(
            "host '{host}' is explicitly blocked"
        )));
    }

    if !security.allowed_hosts.is_empty() && !host_matches_list(&host, &security.allowed_hosts) {
        return Err(AppError::Validation(format!(
            "host '{host}' is not in the allowlist"
        )));
    }

    Ok(GuardDecision {
        origin: parsed.origin().ascii_serialization(),
        host,
        scheme,
        href: parsed.to_string(),
    })
}

/// True when the host looks like a dotted-quad IPv4 literal.
fn is_dotted_quad(host: &str) -> bool {
    let parts: Vec<&str> = host.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.len() <= 3 && p.bytes().all(|b| b.is_ascii_digit()))
}

/// True when a dotted-quad host falls in a reserved private range.
///
/// Fail-closed: any octet that does not parse or exceeds 255 is treated as
/// private, never public.
pub fn is_private_ipv4(host: &str) -> bool {
    if !is_dotted_quad(host) {
        return false;
    }
    let mut octets = [0u8; 4];
    for (i, part) in host.split('.').enumerate() {
        match part.parse::<u8>() {
            Ok(value) => octets[i] = value,
            Err(_) => return true,
        }
    }
    PRIVATE_IPV4_RANGES
        .iter()
        .any(|(start, end)| octets >= *start && octets <= *end)
}

/// True when `host` equals an entry or is a subdomain of one.
///
/// Matching is dot-anchored: `sub.example.com` matches `example.com`, but
/// `evilexample.com` does not.
pub fn host_matches_list(host: &str, list: &[String]) -> bool {
    list.iter()
        .any(|entry| host == entry || host.ends_with(&format!(".{entry}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissive() -> SecurityConfig {
        SecurityConfig {
            enforce_https: false,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn rejects_malformed_url() {
        let err = evaluate("not a url", &permissive()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_unsupported_scheme() {
        let err = evaluate("file:///etc/passwd", &permissive()).unwrap_err();
        assert!(err.to_string().contains("not supported"));

        let err = evaluate("ftp://example.com/file", &permissive()).unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn enforce_https_rejects_http() {
        let security = SecurityConfig::default();
        assert!(security.enforce_https);
        let err = evaluate("http://example.com", &security).unwrap_err();
        assert!(err.to_string().contains("https"));
        assert!(evaluate("https://example.com", &security).is_ok());
    }

    #[test]
    fn rejects_loopback_hosts() {
        for url in [
            "http://localhost/admin",
            "http://127.0.0.1/admin",
            "http://0.0.0.0/",
            "http://[::1]/",
        ] {
            let err = evaluate(url, &permissive()).unwrap_err();
            assert!(
                err.to_string().contains("loopback") || err.to_string().contains("private"),
                "expected rejection for {url}"
            );
        }
    }

    #[test]
    fn allow_localhost_opens_loopback() {
        let security = SecurityConfig {
            enforce_https: false,
            allow_localhost: true,
            ..SecurityConfig::default()
        };
        let decision = evaluate("http://localhost:8080/page", &security).unwrap();
        assert_eq!(decision.host, "localhost");
        assert_eq!(decision.scheme, "http");
    }

    #[test]
    fn rejects_all_private_ranges() {
        for host in [
            "10.0.0.1",
            "10.255.255.255",
            "127.0.0.2",
            "169.254.169.254",
            "172.16.0.1",
            "172.31.255.255",
            "192.168.1.1",
        ] {
            let err = evaluate(&format!("http://{host}/path"), &permissive()).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "host {host}");
        }
    }

    #[test]
    fn accepts_public_hosts() {
        for url in [
            "http://example.com/news",
            "http://8.8.8.8/",
            "http://172.32.0.1/",
            "http://sub.domain.example.org/a?b=c",
        ] {
            assert!(evaluate(url, &permissive()).is_ok(), "url {url}");
        }
    }

    #[test]
    fn private_check_is_fail_closed_on_malformed_octets() {
        // These never reach the parser as-is (the URL parser canonicalizes
        // IPv4-looking hosts), but the predicate itself must stay closed.
        assert!(is_private_ipv4("256.1.1.1"));
        assert!(is_private_ipv4("999.0.0.1"));
        assert!(!is_private_ipv4("not.an.ip.addr"));
        assert!(!is_private_ipv4("example.com"));
        assert!(!is_private_ipv4("8.8.8.8"));
        assert!(is_private_ipv4("192.168.0.1"));
    }

    #[test]
    fn host_list_matching_is_dot_anchored() {
        let list = vec!["example.com".to_string()];
        assert!(host_matches_list("example.com", &list));
        assert!(host_matches_list("sub.example.com", &list));
        assert!(!host_matches_list("evilexample.com", &list));
        assert!(!host_matches_list("example.com.evil.io", &list));
    }

    #[test]
    fn blocked_hosts_win_over_default_allow() {
        let security = SecurityConfig {
            enforce_https: false,
            blocked_hosts: vec!["blocked.org".to_string()],
            ..SecurityConfig::default()
        };
        assert!(evaluate("http://blocked.org/x", &security).is_err());
        assert!(evaluate("http://api.blocked.org/x", &security).is_err());
        assert!(evaluate("http://example.com/x", &security).is_ok());
    }

    #[test]
    fn allowlist_mode_overrides_default_allow() {
        let security = SecurityConfig {
            enforce_https: false,
            allowed_hosts: vec!["example.com".to_string()],
            ..SecurityConfig::default()
        };
        assert!(evaluate("http://example.com/x", &security).is_ok());
        assert!(evaluate("http://docs.example.com/x", &security).is_ok());
        assert!(evaluate("http://other.com/x", &security).is_err());
    }

    #[test]
    fn decision_carries_normalized_parts() {
        let decision = evaluate("HTTP://Example.COM/Path?q=1", &permissive()).unwrap();
        assert_eq!(decision.host, "example.com");
        assert_eq!(decision.scheme, "http");
        assert_eq!(decision.origin, "http://example.com");
        assert!(decision.href.contains("/Path?q=1"));
    }

    #[test]
    fn hex_and_decimal_ip_forms_are_canonicalized_and_rejected() {
        // The URL parser canonicalizes these to 127.0.0.1 / 192.168.0.1.
        assert!(evaluate("http://0x7f000001/", &permissive()).is_err());
        assert!(evaluate("http://2130706433/", &permissive()).is_err());
    }
}
