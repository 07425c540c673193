use colored::Colorize;
use occonfig::{
    data::schema::ParsedSchema,
    validate::{Severity, ValidationError, validate},
};
use serde_json::Value;

use super::Context;

/// Validate the config file of the requested scope against `raw_schema`.
///
/// Syntax problems of a malformed file are reported first; the rest of the
/// checks run on the part that could be read.
pub fn run(ctx: &Context, raw_schema: &Value) -> anyhow::Result<String> {
    let snapshot = ctx.snapshot()?;
    let schema = ParsedSchema::parse(raw_schema);
    let mut errors: Vec<ValidationError> = snapshot
        .parse_errors
        .iter()
        .map(|e| ValidationError::error("", e.to_string()))
        .collect();
    errors.extend(validate(raw_schema, &snapshot.data, &schema, None));
    Ok(report(&errors, snapshot.data.len()))
}

pub fn report(errors: &[ValidationError], key_count: usize) -> String {
    if errors.is_empty() {
        let line = format!("✓ Config is valid ({key_count} {} set)", plural(key_count, "key"));
        return line.green().to_string();
    }

    let mut lines = vec![
        format!("✗ {} {} found:", errors.len(), plural(errors.len(), "issue"))
            .red()
            .to_string(),
    ];
    for error in errors {
        let tag = match error.severity {
            Severity::Warning => "[warn]".yellow(),
            Severity::Error => "[error]".red(),
        };
        let location = if error.path.is_empty() {
            String::new()
        } else {
            format!("{}: ", error.path)
        };
        lines.push(format!("  {tag} {location}{}", error.message));
    }
    lines.join("\n")
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{set, tests::Sandbox};
    use occonfig::data::schema::fallback_schema_document;

    #[test]
    fn test_report_lines() {
        colored::control::set_override(false);
        assert_eq!(report(&[], 1), "✓ Config is valid (1 key set)");
        assert_eq!(report(&[], 3), "✓ Config is valid (3 keys set)");

        let errors = [
            ValidationError::error("", "must be an object"),
            ValidationError::warning("server.port", "too low"),
        ];
        assert_eq!(
            report(&errors, 2),
            "✗ 2 issues found:\n  [error] must be an object\n  [warn] server.port: too low"
        );
    }

    #[test]
    fn test_reports_syntax_errors() {
        colored::control::set_override(false);
        let sandbox = Sandbox::new(Some("{\"theme\":\"nord\"\n\"model\":\"a/b\"}"));

        let out = run(&sandbox.ctx, &fallback_schema_document()).expect("validate");
        assert_eq!(
            out,
            "✗ 1 issue found:\n  [error] invalid JSONC at offset 16: expected `,` or `}`"
        );
    }

    #[test]
    fn test_privileged_port() {
        colored::control::set_override(false);
        let sandbox = Sandbox::new(Some("{}"));
        let ctx = &sandbox.ctx;
        let schema = fallback_schema_document();

        assert_eq!(
            run(ctx, &schema).expect("valid"),
            "✓ Config is valid (0 keys set)"
        );

        set(ctx, "server.port", "80").expect("set");
        let out = run(ctx, &schema).expect("validate");
        assert_eq!(
            out,
            "✗ 1 issue found:\n  [warn] server.port: Port 80 is < 1024 and requires root privileges"
        );
    }
}
