//! Document schema.
//!
//! Walks an untyped [`serde_json::Value`] and records every violation of the
//! [`ConfigDocument`](crate::ConfigDocument) shape. The walk never stops at the
//! first problem, so a single pass reports all offending paths.

use crate::error::{ErrorCode, ValidationError};
use crate::types::{ConditionType, Direction, LayoutType, Operator};
use serde_json::{Map, Value};

// Component trees have no depth limit; the walk grows its stack on demand
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

/// Name of a JSON value's kind, as used in error messages
fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(base: &str, segment: impl std::fmt::Display) -> String {
    if base.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", base, segment)
    }
}

/// Accumulates violations while walking a document
#[derive(Debug, Default)]
pub(crate) struct SchemaWalker {
    errors: Vec<ValidationError>,
}

impl SchemaWalker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    fn report(&mut self, path: &str, code: ErrorCode, message: String) {
        self.errors
            .push(ValidationError::new(path, message).with_code(code));
    }

    fn missing(&mut self, path: &str) {
        self.report(path, ErrorCode::InvalidType, "Required".to_string());
    }

    fn mismatch(&mut self, path: &str, expected: &str, value: &Value) {
        self.report(
            path,
            ErrorCode::InvalidType,
            format!("Expected {}, received {}", expected, kind(value)),
        );
    }

    /// Validate a whole configuration document
    pub(crate) fn document(&mut self, value: &Value) {
        let Some(obj) = self.object(value, "") else {
            return;
        };

        self.required_string(obj, "version", "");

        if let Some(metadata) = obj.get("metadata") {
            if let Some(meta) = self.object(metadata, "metadata") {
                for key in ["name", "description", "author"] {
                    self.optional_string(meta, key, "metadata");
                }
            }
        }

        match obj.get("components") {
            None => self.missing("components"),
            Some(components) => self.array(components, "components", |w, item, path| {
                w.component(item, path)
            }),
        }

        if let Some(layout) = obj.get("layout") {
            self.layout(layout, "layout");
        }

        if let Some(features) = obj.get("features") {
            self.array(features, "features", |w, item, path| w.feature(item, path));
        }

        if let Some(plugins) = obj.get("plugins") {
            self.array(plugins, "plugins", |w, item, path| w.plugin(item, path));
        }
    }

    /// Validate a component node and, recursively, its children
    pub(crate) fn component(&mut self, value: &Value, path: &str) {
        let Some(obj) = self.object(value, path) else {
            return;
        };

        self.required_string(obj, "id", path);
        self.required_string(obj, "type", path);

        if let Some(props) = obj.get("props") {
            self.object(props, &join(path, "props"));
        }

        if let Some(children) = obj.get("children") {
            self.array(children, &join(path, "children"), |w, item, path| {
                stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || w.component(item, path))
            });
        }

        if let Some(conditions) = obj.get("conditions") {
            self.array(conditions, &join(path, "conditions"), |w, item, path| {
                w.condition(item, path)
            });
        }

        if let Some(styles) = obj.get("styles") {
            let styles_path = join(path, "styles");
            if let Some(map) = self.object(styles, &styles_path) {
                for (key, value) in map {
                    self.scalar(value, &join(&styles_path, key));
                }
            }
        }

        if let Some(events) = obj.get("events") {
            self.array(events, &join(path, "events"), |w, item, path| {
                w.event(item, path)
            });
        }
    }

    pub(crate) fn condition(&mut self, value: &Value, path: &str) {
        let Some(obj) = self.object(value, path) else {
            return;
        };

        self.required_enum(obj, "type", path, &ConditionType::ALL);
        self.required_string(obj, "key", path);
        self.optional_enum(obj, "operator", path, &Operator::ALL);
        self.optional_string(obj, "evaluator", path);
    }

    fn event(&mut self, value: &Value, path: &str) {
        let Some(obj) = self.object(value, path) else {
            return;
        };

        self.required_string(obj, "type", path);
        self.required_string(obj, "handler", path);
        if let Some(payload) = obj.get("payload") {
            self.object(payload, &join(path, "payload"));
        }
    }

    fn layout(&mut self, value: &Value, path: &str) {
        let Some(obj) = self.object(value, path) else {
            return;
        };

        self.required_enum(obj, "type", path, &LayoutType::ALL);
        for key in ["columns", "rows", "gap", "padding", "margin"] {
            if let Some(v) = obj.get(key) {
                self.scalar(v, &join(path, key));
            }
        }
        self.optional_enum(obj, "direction", path, &Direction::ALL);
        self.optional_string(obj, "alignItems", path);
        self.optional_string(obj, "justifyContent", path);
    }

    pub(crate) fn feature(&mut self, value: &Value, path: &str) {
        let Some(obj) = self.object(value, path) else {
            return;
        };

        self.required_string(obj, "id", path);
        self.required_string(obj, "name", path);
        match obj.get("enabled") {
            None => self.missing(&join(path, "enabled")),
            Some(Value::Bool(_)) => {}
            Some(other) => self.mismatch(&join(path, "enabled"), "boolean", other),
        }

        if let Some(rollout) = obj.get("rollout") {
            let rollout_path = join(path, "rollout");
            if let Some(r) = self.object(rollout, &rollout_path) {
                if let Some(percentage) = r.get("percentage") {
                    self.number_in_range(percentage, &join(&rollout_path, "percentage"), 0.0, 100.0);
                }
                for key in ["userIds", "environments"] {
                    if let Some(list) = r.get(key) {
                        self.array(list, &join(&rollout_path, key), |w, item, path| {
                            if !item.is_string() {
                                w.mismatch(path, "string", item);
                            }
                        });
                    }
                }
            }
        }

        if let Some(metadata) = obj.get("metadata") {
            self.object(metadata, &join(path, "metadata"));
        }
    }

    fn plugin(&mut self, value: &Value, path: &str) {
        let Some(obj) = self.object(value, path) else {
            return;
        };

        self.required_string(obj, "id", path);
        self.required_string(obj, "type", path);
        if let Some(config) = obj.get("config") {
            self.object(config, &join(path, "config"));
        }
    }

    fn object<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            other => {
                self.mismatch(path, "object", other);
                None
            }
        }
    }

    fn array<F>(&mut self, value: &Value, path: &str, mut item: F)
    where
        F: FnMut(&mut Self, &Value, &str),
    {
        match value {
            Value::Array(items) => {
                for (index, element) in items.iter().enumerate() {
                    item(self, element, &join(path, index));
                }
            }
            other => self.mismatch(path, "array", other),
        }
    }

    fn scalar(&mut self, value: &Value, path: &str) {
        if !(value.is_string() || value.is_number()) {
            self.mismatch(path, "string or number", value);
        }
    }

    fn number_in_range(&mut self, value: &Value, path: &str, min: f64, max: f64) {
        let Some(n) = value.as_f64() else {
            self.mismatch(path, "number", value);
            return;
        };
        if n < min {
            self.report(
                path,
                ErrorCode::TooSmall,
                format!("Number must be greater than or equal to {}", min),
            );
        } else if n > max {
            self.report(
                path,
                ErrorCode::TooBig,
                format!("Number must be less than or equal to {}", max),
            );
        }
    }

    fn required_string(&mut self, obj: &Map<String, Value>, key: &str, base: &str) {
        let path = join(base, key);
        match obj.get(key) {
            None => self.missing(&path),
            Some(Value::String(_)) => {}
            Some(other) => self.mismatch(&path, "string", other),
        }
    }

    fn optional_string(&mut self, obj: &Map<String, Value>, key: &str, base: &str) {
        match obj.get(key) {
            None | Some(Value::String(_)) => {}
            Some(other) => self.mismatch(&join(base, key), "string", other),
        }
    }

    fn required_enum(&mut self, obj: &Map<String, Value>, key: &str, base: &str, allowed: &[&str]) {
        match obj.get(key) {
            None => self.missing(&join(base, key)),
            Some(value) => self.enum_value(value, &join(base, key), allowed),
        }
    }

    fn optional_enum(&mut self, obj: &Map<String, Value>, key: &str, base: &str, allowed: &[&str]) {
        if let Some(value) = obj.get(key) {
            self.enum_value(value, &join(base, key), allowed);
        }
    }

    fn enum_value(&mut self, value: &Value, path: &str, allowed: &[&str]) {
        let expected = allowed
            .iter()
            .map(|a| format!("'{}'", a))
            .collect::<Vec<_>>()
            .join(" | ");

        match value {
            Value::String(s) if allowed.contains(&s.as_str()) => {}
            Value::String(s) => self.report(
                path,
                ErrorCode::InvalidEnumValue,
                format!("Invalid enum value. Expected {}, received '{}'", expected, s),
            ),
            other => self.mismatch(path, &expected, other),
        }
    }
}
