#[must_use]
pub(super) fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[must_use]
pub(super) fn parse_u64_at_least(raw: Option<&str>, default_value: u64, min_value: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value >= min_value)
        .unwrap_or(default_value)
}

#[must_use]
pub(super) fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
