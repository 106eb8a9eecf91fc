//! Origin and domain normalization.
//!
//! Every origin comparison in the admission path goes through
//! [`normalize_origin`], so equivalent-but-differently-written origins
//! (`https://A.example.com/`, `a.example.com`, `https://a.example.com:443`)
//! compare equal. The canonical form is the bare lowercased `host[:port]`
//! with default ports, scheme, userinfo, path, query and fragment removed.

use crate::error::{Error, Result};

/// Normalize an origin or domain string to its canonical comparison form.
///
/// Accepts full origins (`https://app.example.com:8443/`), bare domains
/// (`app.example.com`) and anything in between. Returns an empty string for
/// inputs with no host component.
pub fn normalize_origin(origin: &str) -> String {
    let trimmed = origin.trim();

    // Strip the scheme if present.
    let rest = match trimmed.split_once("://") {
        Some((_, rest)) => rest,
        None => trimmed,
    };

    // Drop path, query and fragment.
    let host_port = rest.split(['/', '?', '#']).next().unwrap_or("");

    // Drop userinfo if present.
    let host_port = match host_port.rsplit_once('@') {
        Some((_, host)) => host,
        None => host_port,
    };

    let host_port = host_port.to_ascii_lowercase();

    // Drop default ports. The all-digits check keeps bare IPv6 hosts
    // (e.g. "[::1]") intact, since their trailing segment is not a port.
    match host_port.rsplit_once(':') {
        Some((host, port))
            if !host.is_empty()
                && !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit())
                && (port == "80" || port == "443") =>
        {
            host.to_string()
        }
        _ => host_port,
    }
}

/// Validate a domain string as submitted on the site-administration path.
///
/// Domains are stored bare (no scheme, no path); full origins are rejected
/// rather than silently rewritten so operators notice misconfigured input.
pub fn validate_domain(domain: &str) -> Result<()> {
    let trimmed = domain.trim();

    if trimmed.is_empty() {
        return Err(Error::InvalidDomain("domain must not be empty".to_string()));
    }
    if trimmed.contains("://") {
        return Err(Error::InvalidDomain(format!(
            "domain must not include a scheme: {trimmed}"
        )));
    }
    if trimmed.contains(['/', '?', '#', ' ']) {
        return Err(Error::InvalidDomain(format!(
            "domain must not include a path, query or whitespace: {trimmed}"
        )));
    }

    Ok(())
}
