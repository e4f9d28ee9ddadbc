//! Output parsers, one per linter family. Dispatched through [`ParserKind`]
//! rather than matched ad hoc per call site.

use lg_core::{Issue, Severity};
use serde_json::Value;

/// Which shape a linter's JSON output takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    /// Array-of-files with `messages[]` (eslint family).
    EslintLike,
    /// Array-of-findings with `path`/`message-id` (pylint family).
    PylintLike,
    /// Array-of-findings with `file`/`code` (shellcheck family).
    ShellcheckLike,
    /// `{file|path, line, column, rule|code, severity|level, message|description}`.
    Generic,
}

/// A parser that turns a linter's raw stdout into normalized issues.
pub trait IssueParser {
    /// Parse `output` into normalized issues. Returns `Err` if the shape
    /// doesn't match this parser's expectations at all.
    fn parse(&self, output: &str) -> Result<Vec<Issue>, String>;
}

impl ParserKind {
    /// Resolve this kind to its parser implementation.
    pub fn parser(self) -> Box<dyn IssueParser> {
        match self {
            ParserKind::EslintLike => Box::new(EslintParser),
            ParserKind::PylintLike => Box::new(PylintParser),
            ParserKind::ShellcheckLike => Box::new(ShellcheckParser),
            ParserKind::Generic => Box::new(GenericParser),
        }
    }
}

fn severity_from_level(level: i64) -> Severity {
    match level {
        2 => Severity::Error,
        1 => Severity::Warning,
        _ => Severity::Info,
    }
}

fn str_field<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| obj.get(k).and_then(Value::as_str))
}

fn u32_field(obj: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter()
        .find_map(|k| obj.get(k).and_then(Value::as_u64))
        .map(|v| v as u32)
}

struct EslintParser;

impl IssueParser for EslintParser {
    fn parse(&self, output: &str) -> Result<Vec<Issue>, String> {
        let files: Vec<Value> = serde_json::from_str(output).map_err(|e| e.to_string())?;
        let mut issues = Vec::new();
        for file in &files {
            let path = str_field(file, &["filePath"]).unwrap_or_default();
            let messages = file.get("messages").and_then(Value::as_array).cloned().unwrap_or_default();
            for msg in messages {
                let severity = severity_from_level(msg.get("severity").and_then(Value::as_i64).unwrap_or(1));
                let message = str_field(&msg, &["message"]).unwrap_or_default().to_string();
                let mut issue = Issue::new(path.to_string(), severity, message, "eslint".to_string());
                issue.line = u32_field(&msg, &["line"]);
                issue.column = u32_field(&msg, &["column"]);
                issue.rule = str_field(&msg, &["ruleId"]).map(str::to_string);
                issues.push(issue);
            }
        }
        Ok(issues)
    }
}

struct PylintParser;

impl IssueParser for PylintParser {
    fn parse(&self, output: &str) -> Result<Vec<Issue>, String> {
        let findings: Vec<Value> = serde_json::from_str(output).map_err(|e| e.to_string())?;
        let mut issues = Vec::new();
        for finding in &findings {
            let path = str_field(finding, &["path"]).unwrap_or_default().to_string();
            let severity = match str_field(finding, &["type"]) {
                Some("error") | Some("fatal") => Severity::Error,
                Some("warning") => Severity::Warning,
                _ => Severity::Info,
            };
            let message = str_field(finding, &["message"]).unwrap_or_default().to_string();
            let mut issue = Issue::new(path, severity, message, "pylint".to_string());
            issue.line = u32_field(finding, &["line"]);
            issue.column = u32_field(finding, &["column"]);
            issue.rule = str_field(finding, &["message-id", "symbol"]).map(str::to_string);
            issues.push(issue);
        }
        Ok(issues)
    }
}

struct ShellcheckParser;

impl IssueParser for ShellcheckParser {
    fn parse(&self, output: &str) -> Result<Vec<Issue>, String> {
        let findings: Vec<Value> = serde_json::from_str(output).map_err(|e| e.to_string())?;
        let mut issues = Vec::new();
        for finding in &findings {
            let path = str_field(finding, &["file"]).unwrap_or_default().to_string();
            let severity = match str_field(finding, &["level"]) {
                Some("error") => Severity::Error,
                Some("warning") => Severity::Warning,
                _ => Severity::Info,
            };
            let message = str_field(finding, &["message"]).unwrap_or_default().to_string();
            let code = finding.get("code").and_then(Value::as_u64).map(|c| format!("SC{c}"));
            let mut issue = Issue::new(path, severity, message, "shellcheck".to_string());
            issue.line = u32_field(finding, &["line"]);
            issue.column = u32_field(finding, &["column"]);
            issue.rule = code;
            issues.push(issue);
        }
        Ok(issues)
    }
}

struct GenericParser;

impl IssueParser for GenericParser {
    fn parse(&self, output: &str) -> Result<Vec<Issue>, String> {
        let value: Value = serde_json::from_str(output).map_err(|e| e.to_string())?;
        let entries: Vec<Value> = match value {
            Value::Array(items) => items,
            Value::Object(_) => vec![value],
            _ => return Err("expected a JSON array or object".to_string()),
        };

        let mut issues = Vec::new();
        for entry in &entries {
            let path = str_field(entry, &["file", "path"]).unwrap_or_default().to_string();
            let severity = match str_field(entry, &["severity", "level"]) {
                Some(s) if s.eq_ignore_ascii_case("error") => Severity::Error,
                Some(s) if s.eq_ignore_ascii_case("warning") => Severity::Warning,
                _ => Severity::Info,
            };
            let message = str_field(entry, &["message", "description"]).unwrap_or_default().to_string();
            let mut issue = Issue::new(path, severity, message, "generic".to_string());
            issue.line = u32_field(entry, &["line"]);
            issue.column = u32_field(entry, &["column"]);
            issue.rule = str_field(entry, &["rule", "code"]).map(str::to_string);
            issues.push(issue);
        }
        Ok(issues)
    }
}

/// Pick the best parser for `output`: the JSON family if output is
/// JSON-shaped and a JSON parser is configured, else the text parser.
pub fn parse_output(
    output: &str,
    json_parser: Option<ParserKind>,
    text_parser: Option<ParserKind>,
) -> Vec<Issue> {
    let trimmed = output.trim_start();
    let looks_json = trimmed.starts_with('{') || trimmed.starts_with('[');

    if looks_json {
        if let Some(kind) = json_parser {
            if let Ok(issues) = kind.parser().parse(output) {
                return issues;
            }
        }
    }

    if let Some(kind) = text_parser {
        if let Ok(issues) = kind.parser().parse(output) {
            return issues;
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eslint_parser_extracts_messages() {
        let output = r#"[{"filePath":"a.js","messages":[{"line":1,"column":2,"ruleId":"no-unused-vars","severity":2,"message":"x"}]}]"#;
        let issues = EslintParser.parse(output).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].file, "a.js");
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].rule.as_deref(), Some("no-unused-vars"));
    }

    #[test]
    fn pylint_parser_extracts_findings() {
        let output = r#"[{"path":"a.py","line":3,"column":1,"message-id":"C0114","type":"convention","message":"missing docstring"}]"#;
        let issues = PylintParser.parse(output).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Info);
        assert_eq!(issues[0].rule.as_deref(), Some("C0114"));
    }

    #[test]
    fn shellcheck_parser_formats_rule_as_sc_code() {
        let output = r#"[{"file":"a.sh","line":2,"column":1,"code":2034,"level":"warning","message":"unused var"}]"#;
        let issues = ShellcheckParser.parse(output).unwrap();
        assert_eq!(issues[0].rule.as_deref(), Some("SC2034"));
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn generic_parser_handles_file_or_path_keys() {
        let output = r#"[{"path":"a.rb","line":5,"severity":"error","message":"bad"}]"#;
        let issues = GenericParser.parse(output).unwrap();
        assert_eq!(issues[0].file, "a.rb");
        assert_eq!(issues[0].severity, Severity::Error);
    }

    #[test]
    fn parse_output_falls_back_to_text_parser_on_non_json() {
        let issues = parse_output("not json at all", Some(ParserKind::EslintLike), Some(ParserKind::Generic));
        assert!(issues.is_empty());
    }

    #[test]
    fn parse_output_prefers_json_parser_when_output_looks_json() {
        let output = r#"[{"filePath":"a.js","messages":[{"line":1,"severity":1,"message":"m"}]}]"#;
        let issues = parse_output(output, Some(ParserKind::EslintLike), Some(ParserKind::Generic));
        assert_eq!(issues.len(), 1);
    }
}
