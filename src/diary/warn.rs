use crate::error::DiaryErrorCode;
use crate::logging::sanitize_value;

#[derive(Debug, Clone, Copy)]
pub struct WarnEvent<'a> {
    pub code: DiaryErrorCode,
    pub stage: &'a str,
    pub action: &'a str,
    pub date: &'a str,
    pub source: &'a str,
    pub retry: &'a str,
    pub reason: &'a str,
    pub err: &'a str,
}

pub fn render(event: &WarnEvent<'_>) -> String {
    format!(
        "DIARY_WARN code={} stage={} action={} date={} source={} retry={} reason={} err={}",
        event.code.as_str(),
        sanitize_value(event.stage),
        sanitize_value(event.action),
        sanitize_value(event.date),
        sanitize_value(event.source),
        sanitize_value(event.retry),
        sanitize_value(event.reason),
        sanitize_value(event.err),
    )
}

pub fn emit(event: WarnEvent<'_>) {
    eprintln!("{}", render(&event));
}

#[cfg(test)]
mod tests {
    use super::{WarnEvent, render};
    use crate::error::DiaryErrorCode;

    #[test]
    fn render_keeps_one_line_per_event() {
        let line = render(&WarnEvent {
            code: DiaryErrorCode::E004GenerationAttemptFailed,
            stage: "generate",
            action: "remote-attempt",
            date: "2025-01-01",
            source: "gemini:gemini-2.5-pro",
            retry: "next-candidate",
            reason: "status",
            err: "503 Service\nUnavailable",
        });
        assert!(line.starts_with("DIARY_WARN code=E004_GENERATION_ATTEMPT_FAILED"));
        assert!(line.contains("err=503_Service_Unavailable"));
        assert!(!line.contains('\n'));
    }
}
