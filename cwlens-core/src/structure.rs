use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

// Compile regexes once at startup for performance
static LEVEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(DEBUG|INFO|WARN|WARNING|ERROR|FATAL|CRITICAL)\b")
        .expect("Failed to compile log level regex")
});

static TIMESTAMP_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}",
        r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}",
        r"\d{2}/\d{2}/\d{4} \d{2}:\d{2}:\d{2}",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Failed to compile timestamp regex"))
    .collect()
});

static KEY_VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\w+=['"][^'"]*['"]|\w+=\S+"#).expect("Failed to compile key-value regex")
});

static KEY_CAPTURE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\w+)=['"]?([^'"\s]*)['"]?"#).expect("Failed to compile key capture regex")
});

/// Share of messages a format must exceed to be reported.
const FORMAT_THRESHOLD: f64 = 0.7;
const TOP_FIELDS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogFormat {
    #[serde(rename = "JSON")]
    Json,
    #[serde(rename = "XML")]
    Xml,
    #[serde(rename = "Key-Value Pairs")]
    KeyValue,
    #[serde(rename = "Plaintext/Unstructured")]
    Plaintext,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Json => "JSON",
            LogFormat::Xml => "XML",
            LogFormat::KeyValue => "Key-Value Pairs",
            LogFormat::Plaintext => "Plaintext/Unstructured",
        }
    }
}

fn parse_json_object(message: &str) -> Option<Map<String, Value>> {
    let trimmed = message.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

pub fn detect_format(messages: &[String]) -> LogFormat {
    let mut json_count = 0usize;
    let mut xml_count = 0usize;
    let mut key_value_count = 0usize;

    for message in messages {
        if parse_json_object(message).is_some() {
            json_count += 1;
            continue;
        }

        let trimmed = message.trim();
        if trimmed.starts_with('<') && trimmed.ends_with('>') {
            xml_count += 1;
            continue;
        }

        if KEY_VALUE_REGEX.is_match(message) {
            key_value_count += 1;
        }
    }

    let threshold = messages.len() as f64 * FORMAT_THRESHOLD;
    if json_count as f64 > threshold {
        LogFormat::Json
    } else if xml_count as f64 > threshold {
        LogFormat::Xml
    } else if key_value_count as f64 > threshold {
        LogFormat::KeyValue
    } else {
        LogFormat::Plaintext
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 10_000.0).round() / 100.0
}

/// Counts in first-seen order, so ties keep that order after sorting.
#[derive(Default)]
struct OrderedCounter {
    counts: Vec<(String, usize)>,
}

impl OrderedCounter {
    fn add(&mut self, key: &str) {
        match self.counts.iter_mut().find(|(k, _)| k == key) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((key.to_string(), 1)),
        }
    }

    fn len(&self) -> usize {
        self.counts.len()
    }

    fn most_common(&self, n: usize) -> Vec<(String, usize)> {
        let mut sorted = self.counts.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted.truncate(n);
        sorted
    }
}

/// Log levels and embedded timestamps found in the messages.
pub fn common_patterns(messages: &[String]) -> Value {
    let mut levels = OrderedCounter::default();
    let mut with_timestamp = 0usize;

    for message in messages {
        if let Some(level) = LEVEL_REGEX.find(message) {
            levels.add(level.as_str());
        }
        if TIMESTAMP_REGEXES.iter().any(|re| re.is_match(message)) {
            with_timestamp += 1;
        }
    }

    let log_levels: Map<String, Value> = levels
        .counts
        .into_iter()
        .map(|(level, count)| (level, json!(count)))
        .collect();

    json!({
        "logLevels": log_levels,
        "containsTimestamp": with_timestamp,
        "timestampPercentage": percentage(with_timestamp, messages.len()),
    })
}

pub fn field_analysis(messages: &[String], format: LogFormat) -> Value {
    let mut fields = OrderedCounter::default();

    match format {
        LogFormat::Json => {
            for map in messages.iter().filter_map(|m| parse_json_object(m)) {
                for key in map.keys() {
                    fields.add(key);
                }
            }
        }
        LogFormat::KeyValue => {
            for message in messages {
                for captures in KEY_CAPTURE_REGEX.captures_iter(message) {
                    if let Some(key) = captures.get(1) {
                        fields.add(key.as_str());
                    }
                }
            }
        }
        other => {
            return json!({
                "analysis": format!("Field analysis not applicable for {} format", other.as_str())
            });
        }
    }

    let common_fields: Vec<Value> = fields
        .most_common(TOP_FIELDS)
        .into_iter()
        .map(|(field, count)| {
            json!({
                "field": field,
                "occurrences": count,
                "percentage": percentage(count, messages.len()),
            })
        })
        .collect();

    json!({
        "commonFields": common_fields,
        "uniqueFields": fields.len(),
    })
}

/// Full structure report for a sample of messages from one log group.
pub fn analyze(log_group_name: &str, messages: &[String]) -> Value {
    let format = detect_format(messages);
    json!({
        "description": format!("Log structure analysis for '{}'", log_group_name),
        "sampleSize": messages.len(),
        "format": format,
        "commonPatterns": common_patterns(messages),
        "fieldAnalysis": field_analysis(messages, format),
    })
}
