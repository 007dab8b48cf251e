pub const TRUNCATION_MARKER: &str = "...";

/// Published instead of an empty body.
pub const EMPTY_CONTENT_FALLBACK: &str =
    "(Checked in on time today too; every word stayed in my heart, saved just for you.)";

/// Clamp `input` to `max_chars` characters, ending in the marker when cut.
/// The result never exceeds `max_chars`.
pub fn truncate_with_marker(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let marker_len = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_len {
        return TRUNCATION_MARKER.chars().take(max_chars).collect();
    }
    let mut out: String = input.chars().take(max_chars - marker_len).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Last stage before publishing: trim, clamp to `max_len`, never empty.
pub fn sanitize(text: &str, max_len: usize) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return truncate_with_marker(EMPTY_CONTENT_FALLBACK, max_len);
    }
    truncate_with_marker(trimmed, max_len)
}
