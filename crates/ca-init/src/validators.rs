//! Format checks applied to flag values and prompt answers.
//!
//! Every validator has the same shape so that a flag value and the answer
//! to the prompt that replaces it go through the same check.

use std::net::IpAddr;

use once_cell::sync::Lazy;
use regex::Regex;

/// A format check returning a human-readable reason on failure.
pub type Validator = fn(&str) -> Result<(), String>;

static RESOURCE_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9-_]+$").unwrap_or_else(|_| unreachable!()));

static PROJECT_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]{4,28}[a-z0-9]$").unwrap_or_else(|_| unreachable!()));

static LOCATION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").unwrap_or_else(|_| unreachable!()));

static CA_POOL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,63}").unwrap_or_else(|_| unreachable!()));

static GCS_BUCKET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^$)|(^[a-z0-9._-]{3,222}$)").unwrap_or_else(|_| unreachable!()));

static AUTHORITY_RESOURCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^projects/[a-z][a-z0-9-]{4,28}[a-z0-9]/locations/[a-z0-9-]+/caPools/[a-zA-Z0-9-_]+/certificateAuthorities/[a-zA-Z0-9-_]+$",
    )
    .unwrap_or_else(|_| unreachable!())
});

static HTTPS_URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https://.+$").unwrap_or_else(|_| unreachable!()));

static FINGERPRINT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-fA-F0-9]{64}$").unwrap_or_else(|_| unreachable!()));

/// Regex for valid hostnames (RFC 1123), with an optional leading wildcard.
static HOSTNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\*\.)?[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?)*\.?$",
    )
    .unwrap_or_else(|_| unreachable!())
});

fn matches(regex: &Regex, value: &str) -> Result<(), String> {
    if regex.is_match(value) {
        Ok(())
    } else {
        Err(format!("{value} does not match the regular expression {}", regex.as_str()))
    }
}

/// Rejects empty and whitespace-only values.
pub fn not_empty(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err("value is empty".into())
    } else {
        Ok(())
    }
}

/// Cloud resource id.
pub fn resource_id(value: &str) -> Result<(), String> {
    matches(&RESOURCE_ID_REGEX, value)
}

/// Cloud project id.
pub fn project_id(value: &str) -> Result<(), String> {
    matches(&PROJECT_ID_REGEX, value)
}

/// Cloud region or location.
pub fn location(value: &str) -> Result<(), String> {
    matches(&LOCATION_REGEX, value)
}

/// CA pool name.
pub fn ca_pool(value: &str) -> Result<(), String> {
    matches(&CA_POOL_REGEX, value)
}

/// Storage bucket name; empty selects a managed bucket.
pub fn gcs_bucket(value: &str) -> Result<(), String> {
    matches(&GCS_BUCKET_REGEX, value)
}

/// Fully-qualified cloud certificate authority resource.
pub fn authority_resource(value: &str) -> Result<(), String> {
    matches(&AUTHORITY_RESOURCE_REGEX, value)
}

/// HTTPS URL of an upstream authority.
pub fn https_url(value: &str) -> Result<(), String> {
    matches(&HTTPS_URL_REGEX, value)
}

/// SHA-256 fingerprint in hex.
pub fn fingerprint(value: &str) -> Result<(), String> {
    matches(&FINGERPRINT_REGEX, value)
}

/// Comma or space separated DNS names and IP addresses.
pub fn dns_names(value: &str) -> Result<(), String> {
    let mut seen = false;
    for name in value.split([',', ' ']).map(str::trim).filter(|n| !n.is_empty()) {
        seen = true;
        if name.parse::<IpAddr>().is_err() && !HOSTNAME_REGEX.is_match(name) {
            return Err(format!("{name} is not a valid DNS name or IP address"));
        }
    }
    if seen {
        Ok(())
    } else {
        Err("value is empty".into())
    }
}

/// `host:port` or `:port`, where host may be a bracketed IPv6 address.
pub fn address(value: &str) -> Result<(), String> {
    let (host, port) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("{value} is not a valid address: missing port"))?;

    if port.parse::<u16>().is_err() {
        return Err(format!("{value} is not a valid address: invalid port {port}"));
    }

    let host = match host.strip_prefix('[') {
        Some(rest) => rest
            .strip_suffix(']')
            .ok_or_else(|| format!("{value} is not a valid address: unclosed bracket"))?,
        None if host.contains(':') => {
            return Err(format!("{value} is not a valid address: too many colons"));
        }
        None => host,
    };

    if host.is_empty() || host.parse::<IpAddr>().is_ok() || HOSTNAME_REGEX.is_match(host) {
        Ok(())
    } else {
        Err(format!("{value} is not a valid address: invalid host {host}"))
    }
}
