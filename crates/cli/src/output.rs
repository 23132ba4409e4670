// Output rendering for the CLI.
//
// Reports go to stdout: human text on a TTY, JSON when piped or with `--json`.
// Errors and warnings go to stderr in the same format.

use std::io::{self, IsTerminal, Write};

use serde::Serialize;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    /// JSON if `--json` was passed or stdout is not a terminal.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, value, human_fn)
}

/// Render `value` to `writer`; `human_fn` is only called in human mode.
pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => writeln!(writer, "{}", human_fn(value)),
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Error => ANSI_RED,
            Self::Warning => ANSI_YELLOW,
        }
    }
}

pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    let stderr = io::stderr();
    let is_tty = stderr.is_terminal();
    let _ = write_notice(&mut stderr.lock(), format, Severity::Error, code, message, is_tty);
}

pub fn print_warning(format: OutputFormat, code: &str, message: &str) {
    let stderr = io::stderr();
    let is_tty = stderr.is_terminal();
    let _ = write_notice(&mut stderr.lock(), format, Severity::Warning, code, message, is_tty);
}

fn write_notice<W: Write>(
    writer: &mut W,
    format: OutputFormat,
    severity: Severity,
    code: &str,
    message: &str,
    is_tty: bool,
) -> io::Result<()> {
    match format {
        OutputFormat::Human if is_tty => {
            writeln!(writer, "{}{}:{ANSI_RESET} {message}", severity.color(), severity.label())
        }
        OutputFormat::Human => writeln!(writer, "{}: {message}", severity.label()),
        OutputFormat::Json => {
            let mut notice = serde_json::Map::new();
            notice.insert(
                severity.label().to_string(),
                serde_json::json!({ "code": code, "message": message }),
            );
            serde_json::to_writer(&mut *writer, &notice).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Summary {
        commits_created: u64,
        published: bool,
    }

    fn notice(format: OutputFormat, severity: Severity, is_tty: bool) -> String {
        let mut buf = Vec::new();
        write_notice(&mut buf, format, severity, "GIT_ERROR", "push rejected", is_tty).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn detect_tty_returns_human() {
        assert_eq!(OutputFormat::detect_from_terminal(true), OutputFormat::Human);
    }

    #[test]
    fn detect_pipe_returns_json() {
        assert_eq!(OutputFormat::detect_from_terminal(false), OutputFormat::Json);
    }

    #[test]
    fn json_flag_overrides_terminal() {
        assert_eq!(OutputFormat::detect(true), OutputFormat::Json);
    }

    #[test]
    fn human_output_uses_renderer() {
        let summary = Summary { commits_created: 2, published: true };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Human, &summary, |s| {
            format!("created {}", s.commits_created)
        })
        .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "created 2\n");
    }

    #[test]
    fn json_output_is_one_line_and_skips_renderer() {
        let summary = Summary { commits_created: 0, published: false };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Json, &summary, |_| {
            unreachable!("renderer is for human output only")
        })
        .unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert_eq!(output.lines().count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["commits_created"], 0);
        assert_eq!(parsed["published"], false);
    }

    #[test]
    fn human_notice_is_colored_only_on_tty() {
        let colored = notice(OutputFormat::Human, Severity::Error, true);
        assert!(colored.starts_with(ANSI_RED));
        assert!(colored.contains("push rejected"));

        assert_eq!(notice(OutputFormat::Human, Severity::Warning, false), "warning: push rejected\n");
    }

    #[test]
    fn json_notice_is_keyed_by_severity() {
        let output = notice(OutputFormat::Json, Severity::Error, false);
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["error"]["code"], "GIT_ERROR");
        assert_eq!(parsed["error"]["message"], "push rejected");

        let output = notice(OutputFormat::Json, Severity::Warning, true);
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["warning"]["code"], "GIT_ERROR");
    }
}
