//! Record identity for work orders
//!
//! Every write path (initial extraction, auto-merge, manual resolve, manual
//! override) derives the ledger key through [`record_key`], so the same
//! physical work order always lands on the same row.

/// Segment used when an input normalizes to nothing
pub const UNKNOWN_SEGMENT: &str = "unknown";

/// Public suffixes with two labels, so `mail.acme.co.uk` collapses to `acme.co.uk`
const TWO_LABEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "com.au", "net.au", "org.au", "co.nz", "co.jp",
    "com.br", "com.mx", "co.in", "co.za",
];

/// Derive the ledger key for an issuer and work-order number.
///
/// Total: never fails. Unusable input becomes the literal `unknown` segment so
/// identity derivation can never block a write.
pub fn record_key(issuer: &str, wo_number: &str) -> String {
    format!(
        "{}:{}",
        normalize_issuer(issuer),
        normalize_work_order(wo_number)
    )
}

/// Normalize an issuer. Email-like inputs collapse to their registrable domain.
pub fn normalize_issuer(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    match lowered.rsplit_once('@') {
        Some((_, domain)) => normalize_segment(&registrable_domain(domain)),
        None => normalize_segment(&lowered),
    }
}

pub fn normalize_work_order(raw: &str) -> String {
    normalize_segment(&raw.trim().to_lowercase())
}

/// Translate `.` to `_` and keep only `[a-z0-9_]`
fn normalize_segment(lowered: &str) -> String {
    let segment: String = lowered
        .chars()
        .map(|c| if c == '.' { '_' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();

    if segment.is_empty() {
        UNKNOWN_SEGMENT.to_string()
    } else {
        segment
    }
}

fn registrable_domain(domain: &str) -> String {
    let labels: Vec<&str> = domain
        .split('.')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .collect();

    if labels.len() <= 2 {
        return labels.join(".");
    }

    let last_two = labels[labels.len() - 2..].join(".");
    let keep = if TWO_LABEL_SUFFIXES.contains(&last_two.as_str()) {
        3
    } else {
        2
    };
    labels[labels.len() - keep..].join(".")
}
