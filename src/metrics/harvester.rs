//! Extraction of the running harvester count from a log shipper's periodic
//! monitoring reports.
//!
//! Filebeat logs its internal metrics every 30 seconds. Depending on the version
//! and logging setup the report is either JSON (`"harvester":{"open_files":3,"running":3}`)
//! or a loose text rendering (`harvester { open_files: 3, running: 3 }`). Both are
//! accepted; the JSON form is tried first.

use crate::domain::Deadline;
use serde_json::Value;

const MONITORING: &str = "monitoring";
const HARVESTER: &str = "harvester";
const RUNNING: &str = "running";

pub trait LogWindow: Send + Sync {
    /// Returns at most `lines` of the most recent log lines of `unit`, oldest first.
    fn recent_lines(
        &self,
        unit: &str,
        lines: usize,
        deadline: Deadline,
    ) -> impl Future<Output = anyhow::Result<Vec<String>>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Found(f64),
    /// No monitoring report, or the report has no running harvester field.
    NotFound,
    /// The field exists but its value is not a number.
    Malformed(String),
}

enum LineKind<'l> {
    Monitoring(&'l str),
    Other,
}

fn classify(line: &str) -> LineKind<'_> {
    if line.contains(MONITORING) {
        LineKind::Monitoring(line)
    } else {
        LineKind::Other
    }
}

/// Extracts the running harvester count from the most recent monitoring report
/// in `lines`. Earlier reports are ignored.
pub fn extract_running_harvesters<S>(lines: &[S]) -> Extraction
where
    S: AsRef<str>,
{
    let report = lines
        .iter()
        .rev()
        .find_map(|line| match classify(line.as_ref()) {
            LineKind::Monitoring(report) => Some(report),
            LineKind::Other => None,
        });

    match report {
        None => Extraction::NotFound,
        Some(report) => match json_payload(report) {
            Some(doc) => from_json(&doc),
            None => from_text(report),
        },
    }
}

fn json_payload(line: &str) -> Option<Value> {
    let start = line.find('{')?;
    serde_json::from_str(&line[start..]).ok()
}

fn find_key<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|v| find_key(v, key))),
        Value::Array(items) => items.iter().find_map(|v| find_key(v, key)),
        _ => None,
    }
}

fn from_json(doc: &Value) -> Extraction {
    let Some(running) = find_key(doc, HARVESTER).and_then(|h| h.get(RUNNING)) else {
        return Extraction::NotFound;
    };

    match running {
        Value::Number(n) => n
            .as_f64()
            .map(Extraction::Found)
            .unwrap_or_else(|| Extraction::Malformed(n.to_string())),
        Value::String(s) => parse_token(s),
        other => Extraction::Malformed(other.to_string()),
    }
}

fn from_text(line: &str) -> Extraction {
    let Some(idx) = line.find(HARVESTER) else {
        return Extraction::NotFound;
    };

    let rest = &line[idx + HARVESTER.len()..];
    let scope = object_body(rest).unwrap_or(rest);

    match value_after_key(scope, RUNNING) {
        None => Extraction::NotFound,
        Some(value) => {
            let token = value
                .trim_start()
                .trim_start_matches('"')
                .split(|c: char| c == ',' || c == '}' || c == '"' || c.is_whitespace())
                .next()
                .unwrap_or("");

            parse_token(token)
        }
    }
}

/// Returns the text between the first `{` in `text` and its matching `}`, or the
/// rest of the text if the object is not closed.
fn object_body(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let body = &text[open + 1..];

    let mut depth = 0usize;
    for (idx, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(&body[..idx]),
            '}' => depth -= 1,
            _ => {}
        }
    }

    Some(body)
}

/// Finds `key` as a whole word followed by `:` (optionally quoted) and returns
/// the text after the colon.
fn value_after_key<'t>(text: &'t str, key: &str) -> Option<&'t str> {
    text.match_indices(key).find_map(|(idx, _)| {
        let boundary = text[..idx]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'));

        if !boundary {
            return None;
        }

        let after = text[idx + key.len()..].trim_start_matches('"').trim_start();
        after.strip_prefix(':')
    })
}

fn parse_token(token: &str) -> Extraction {
    let token = token.trim();
    match token.parse::<f64>() {
        Ok(value) => Extraction::Found(value),
        Err(_) => Extraction::Malformed(token.to_owned()),
    }
}

/// Reads the log window of `unit` and renders the running harvester count as a
/// metric value. Every failure is logged and reported as `0.0`.
pub async fn open_files<L>(journal: &L, unit: &str, lines: usize, deadline: Deadline) -> f64
where
    L: LogWindow,
{
    let window = match journal.recent_lines(unit, lines, deadline).await {
        Ok(window) => window,
        Err(error) => {
            tracing::warn!(unit, error = ?error, "Failed to read the monitoring log");
            return 0.0;
        }
    };

    match extract_running_harvesters(&window) {
        Extraction::Found(value) => value,
        Extraction::NotFound => {
            tracing::warn!(
                unit,
                lines = window.len(),
                "No harvester report found in the monitoring log, please check the process"
            );
            0.0
        }
        Extraction::Malformed(token) => {
            tracing::warn!(unit, %token, "Running harvester count is not a number");
            0.0
        }
    }
}
