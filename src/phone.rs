/// Canonicalize an outgoing destination number.
///
/// Surrounding whitespace is trimmed. Numbers already starting with `0`
/// (national) or `+` (international) are kept as-is, anything else gets a
/// leading `+`.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('0') || trimmed.starts_with('+') {
        trimmed.to_string()
    } else {
        format!("+{trimmed}")
    }
}
