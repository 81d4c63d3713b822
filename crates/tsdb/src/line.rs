//! Minimal InfluxDB line-protocol encoder.
//!
//! Only the subset the write path needs: measurement + tags + fields +
//! millisecond timestamp. Tag keys are all static identifiers here, so only
//! tag *values* get escaped.

use std::fmt::Write as _;

/// A single line-protocol point.
pub(crate) struct Line {
    measurement: &'static str,
    tags: Vec<(&'static str, String)>,
    fields: Vec<(&'static str, FieldValue)>,
    timestamp_ms: i64,
}

pub(crate) enum FieldValue {
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Line {
    pub(crate) fn new(measurement: &'static str, timestamp_ms: i64) -> Self {
        Self {
            measurement,
            tags: Vec::new(),
            fields: Vec::new(),
            timestamp_ms,
        }
    }

    pub(crate) fn tag(mut self, key: &'static str, value: &str) -> Self {
        self.tags.push((key, escape_tag_value(value)));
        self
    }

    pub(crate) fn float_field(mut self, key: &'static str, value: f64) -> Self {
        self.fields.push((key, FieldValue::Float(value)));
        self
    }

    pub(crate) fn int_field(mut self, key: &'static str, value: i64) -> Self {
        self.fields.push((key, FieldValue::Integer(value)));
        self
    }

    pub(crate) fn bool_field(mut self, key: &'static str, value: bool) -> Self {
        self.fields.push((key, FieldValue::Boolean(value)));
        self
    }

    /// Whether any field has been set. A line without fields is invalid
    /// line protocol and must be skipped by the caller.
    pub(crate) fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::from(self.measurement);
        for (key, value) in &self.tags {
            let _ = write!(out, ",{key}={value}");
        }
        out.push(' ');
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            match value {
                FieldValue::Float(v) => {
                    let _ = write!(out, "{key}={v}");
                }
                FieldValue::Integer(v) => {
                    let _ = write!(out, "{key}={v}i");
                }
                FieldValue::Boolean(v) => {
                    let _ = write!(out, "{key}={v}");
                }
            }
        }
        let _ = write!(out, " {}", self.timestamp_ms);
        out
    }
}

/// Escape the characters line protocol treats specially in tag values.
fn escape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ',' | ' ' | '=' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
