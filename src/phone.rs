/// Calling code assumed for every number; deployments are single-country.
pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Canonicalize a free-form phone number into `+<country><digits>`.
///
/// Non-digits and leading zeros are dropped and `country_code` is prepended
/// unless the digits already start with it. Never fails: garbage in gives a
/// plausible-looking number out, and numbers from other countries are
/// mis-prefixed.
pub fn normalize_with(raw: &str, country_code: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_start_matches('0');

    let formatted = if digits.starts_with(country_code) {
        format!("+{digits}")
    } else {
        format!("+{country_code}{digits}")
    };
    tracing::debug!(original = raw, formatted = %formatted, "normalized phone number");
    formatted
}
