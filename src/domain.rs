/* src/domain.rs */

/// Reduces a hostname to its registrable domain by keeping the last two
/// labels: `api.example.com` -> `example.com`. One trailing dot is removed
/// first. Names with two labels or fewer come back unchanged.
///
/// No public-suffix list is consulted, so `www.example.co.uk` becomes
/// `co.uk`.
pub fn normalize(hostname: &str) -> String {
    let hostname = hostname.strip_suffix('.').unwrap_or(hostname);
    let labels: Vec<&str> = hostname.split('.').collect();

    if labels.len() <= 2 {
        return hostname.to_string();
    }

    labels[labels.len() - 2..].join(".")
}
