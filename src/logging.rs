/// Collapse a log value into a single `key=value` safe token.
pub fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if !ch.is_control() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn format_fields(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={}", sanitize_value(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Progress line on stderr. stdout is reserved for the command report.
pub fn info(stage: &str, fields: &[(&str, &str)]) {
    if fields.is_empty() {
        eprintln!("DIARY_INFO stage={}", sanitize_value(stage));
    } else {
        eprintln!(
            "DIARY_INFO stage={} {}",
            sanitize_value(stage),
            format_fields(fields)
        );
    }
}
