//! Validation Kit
//!
//! Stateless checks shared by every request handler. Each check either
//! passes or returns an [`Error::Validation`] whose `reason` is sent back to
//! the client. Length violations carry [`ValidationKind::Length`] (HTTP 403),
//! everything else [`ValidationKind::Semantic`] (HTTP 400).
//!
//! Per-field bounds come from [`FieldLimit`] tables declared next to the
//! request DTOs.

use crate::crd::{GoDuration, DEFAULT_BACKUP_TTL};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

// =============================================================================
// Patterns
// =============================================================================

/// Case-insensitive alphanumerics and hyphens
static OPTIONAL_STRING_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").unwrap());

/// Lowercase DNS label, dot-separated subdomains allowed
static DNS_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap()
});

static LABEL_KEY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9\-_./]+$").unwrap());

static LABEL_VALUE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9\-_.]*$").unwrap());

// =============================================================================
// Field Limits
// =============================================================================

/// Declared bounds of a request field.
///
/// `maximum` is a length bound for strings and a value bound for numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimit {
    /// Field name as it appears in error messages
    pub field: &'static str,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
}

impl FieldLimit {
    /// Field without bounds
    pub const fn named(field: &'static str) -> Self {
        Self {
            field,
            minimum: None,
            maximum: None,
        }
    }

    /// String field with a maximum length
    pub const fn max_len(field: &'static str, maximum: i64) -> Self {
        Self {
            field,
            minimum: None,
            maximum: Some(maximum),
        }
    }

    /// Numeric field with an inclusive range
    pub const fn range(field: &'static str, minimum: i64, maximum: i64) -> Self {
        Self {
            field,
            minimum: Some(minimum),
            maximum: Some(maximum),
        }
    }

    fn invalid(&self, value: impl std::fmt::Display) -> Error {
        Error::invalid(format!("Invalid {} : {}", self.field, value))
    }
}

/// Reject values longer than the field's declared maximum, counted in bytes
pub fn valid_length(limit: &FieldLimit, value: &str) -> Result<()> {
    match limit.maximum {
        Some(max) if value.len() as i64 > max => Err(Error::too_long(format!(
            "{} is too long, maximum length is {}.",
            limit.field, max
        ))),
        _ => Ok(()),
    }
}

// =============================================================================
// String Checks
// =============================================================================

/// Empty is valid; otherwise bounded and limited to `[A-Za-z0-9-]`
pub fn valid_optional_string(limit: &FieldLimit, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    valid_length(limit, value)?;
    if !OPTIONAL_STRING_REGEX.is_match(value) {
        return Err(limit.invalid(value));
    }
    Ok(())
}

/// Required lowercase DNS name, bounded by the field's maximum
pub fn valid_string(limit: &FieldLimit, value: &str) -> Result<()> {
    valid_length(limit, value)?;
    if !is_dns_name(value) {
        return Err(limit.invalid(value));
    }
    Ok(())
}

/// Lowercase DNS label form
pub fn is_dns_name(value: &str) -> bool {
    DNS_NAME_REGEX.is_match(value)
}

// =============================================================================
// Network Checks
// =============================================================================

/// Empty is valid; otherwise an IPv4 or IPv6 address
pub fn valid_optional_ip(limit: &FieldLimit, ip: &str) -> Result<()> {
    if ip.is_empty() || ip.parse::<IpAddr>().is_ok() {
        Ok(())
    } else {
        Err(limit.invalid(ip))
    }
}

/// Unset is valid; otherwise within the field's `minimum..=maximum`
pub fn valid_optional_port(limit: &FieldLimit, port: Option<i64>) -> Result<()> {
    let Some(port) = port else {
        return Ok(());
    };
    let min = limit.minimum.unwrap_or(1);
    let max = limit.maximum.unwrap_or(65535);
    if port < min || port > max {
        return Err(Error::invalid(format!(
            "Invalid {} : {}, must be between {} and {}.",
            limit.field, port, min, max
        )));
    }
    Ok(())
}

/// Non-empty `<address>/<prefix>` with the prefix bounded by the address family
pub fn valid_cidr(limit: &FieldLimit, cidr: &str) -> Result<()> {
    let Some((addr, prefix)) = cidr.split_once('/') else {
        return Err(limit.invalid(cidr));
    };
    let Ok(addr) = addr.parse::<IpAddr>() else {
        return Err(limit.invalid(cidr));
    };
    let bits = match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    let prefix_ok = !prefix.is_empty()
        && prefix.bytes().all(|b| b.is_ascii_digit())
        && prefix.parse::<u8>().is_ok_and(|p| p <= bits);
    if !prefix_ok {
        return Err(limit.invalid(cidr));
    }
    Ok(())
}

// =============================================================================
// Schedule and Duration Checks
// =============================================================================

/// Standard 5-field cron, or 6 fields with a leading seconds field
pub fn valid_cron(limit: &FieldLimit, expr: &str) -> Result<()> {
    let fields = expr.split_whitespace().count();
    if !(5..=6).contains(&fields) {
        return Err(limit.invalid(expr));
    }
    croner::Cron::new(expr)
        .with_seconds_optional()
        .parse()
        .map(|_| ())
        .map_err(|_| limit.invalid(expr))
}

/// Empty means the default TTL; otherwise a Go duration string
pub fn valid_ttl(limit: &FieldLimit, ttl: &str) -> Result<GoDuration> {
    if ttl.is_empty() {
        return Ok(DEFAULT_BACKUP_TTL);
    }
    ttl.parse::<GoDuration>().map_err(|e| match e {
        Error::DurationParse(msg) => Error::invalid(format!("Invalid {} : {}", limit.field, msg)),
        other => other,
    })
}

// =============================================================================
// Collection Checks
// =============================================================================

fn valid_namespace_list(field: &str, namespaces: &[String]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for ns in namespaces {
        if !is_dns_name(ns) {
            return Err(Error::invalid(format!("Invalid {} : {}", field, ns)));
        }
        if !seen.insert(ns.as_str()) {
            return Err(Error::invalid(format!(
                "Invalid {}, duplicated namespace {}.",
                field, ns
            )));
        }
    }
    Ok(())
}

/// Each namespace is a DNS label, lists hold no duplicates and are disjoint
pub fn valid_namespace_range(included: Option<&[String]>, excluded: Option<&[String]>) -> Result<()> {
    let included = included.unwrap_or_default();
    let excluded = excluded.unwrap_or_default();
    valid_namespace_list("IncludedNamespaces", included)?;
    valid_namespace_list("ExcludedNamespaces", excluded)?;

    let included: BTreeSet<&str> = included.iter().map(String::as_str).collect();
    if excluded.iter().any(|ns| included.contains(ns.as_str())) {
        return Err(Error::invalid(
            "Invalid ExcludedNamespaces, must not be overlapped with IncludedNamespaces.",
        ));
    }
    Ok(())
}

/// Snapshot data movement needs at least one location; returns the
/// locations deduplicated in first-seen order.
pub fn valid_volume_locations(enabled: bool, locations: Option<&[String]>) -> Result<Vec<String>> {
    let locations = locations.unwrap_or_default();
    if enabled && locations.is_empty() {
        return Err(Error::invalid(
            "Invalid VolumeSnapshotLocations, must not be empty when SnapshotMoveData is enabled.",
        ));
    }

    let mut seen = BTreeSet::new();
    let mut deduped = Vec::with_capacity(locations.len());
    for location in locations {
        if !is_dns_name(location) {
            return Err(Error::invalid(format!(
                "Invalid VolumeSnapshotLocations : {}",
                location
            )));
        }
        if seen.insert(location.as_str()) {
            deduped.push(location.clone());
        }
    }
    Ok(deduped)
}

/// `declared_size` is the number of pairs in the raw input; a smaller map
/// means keys were repeated.
pub fn valid_labels(
    declared_size: usize,
    labels: &BTreeMap<String, String>,
    key_limit: &FieldLimit,
    value_limit: &FieldLimit,
) -> Result<()> {
    if labels.len() < declared_size {
        return Err(Error::invalid(format!(
            "Invalid {}, duplicated keys.",
            key_limit.field
        )));
    }
    for (key, value) in labels {
        valid_length(key_limit, key)?;
        valid_length(value_limit, value)?;
        if !LABEL_KEY_REGEX.is_match(key) {
            return Err(key_limit.invalid(key));
        }
        if !LABEL_VALUE_REGEX.is_match(value) {
            return Err(value_limit.invalid(value));
        }
    }
    Ok(())
}
