//! Configuration document model.
//!
//! These types mirror the JSON shape accepted by [`ConfigValidator`](crate::ConfigValidator).
//! Field names serialize in camelCase and optional fields are omitted when
//! absent, so a parsed document stringifies back to the same structure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Opaque key/value bag used for props, payloads and metadata.
pub type ValueMap = Map<String, Value>;

/// Root configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    /// Document format version
    pub version: String,

    /// Descriptive metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ConfigMetadata>,

    /// Render tree roots, in declaration order
    pub components: Vec<ComponentNode>,

    /// Root layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutConfig>,

    /// Feature flag definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<FeatureDefinition>>,

    /// Plugin definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<PluginDefinition>>,
}

impl ConfigDocument {
    /// Create an empty document with the given version
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            metadata: None,
            components: Vec::new(),
            layout: None,
            features: None,
            plugins: None,
        }
    }

    /// Append a root component
    pub fn with_component(mut self, component: ComponentNode) -> Self {
        self.components.push(component);
        self
    }

    /// Append a feature definition
    pub fn with_feature(mut self, feature: FeatureDefinition) -> Self {
        self.features.get_or_insert_with(Vec::new).push(feature);
        self
    }

    /// Feature definitions, empty when the document declares none
    pub fn features(&self) -> &[FeatureDefinition] {
        self.features.as_deref().unwrap_or_default()
    }

    /// Depth-first, pre-order walk over every component in the tree
    pub fn walk(&self) -> Vec<&ComponentNode> {
        let mut out = Vec::new();
        for component in &self.components {
            component.collect(&mut out);
        }
        out
    }

    /// Find a component anywhere in the tree by id
    pub fn find_component(&self, id: &str) -> Option<&ComponentNode> {
        self.walk().into_iter().find(|c| c.id == id)
    }
}

/// Document metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// One node of the render tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentNode {
    pub id: String,

    /// Component type name, resolved by the renderer's registry
    #[serde(rename = "type")]
    pub component_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<ValueMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ComponentNode>>,

    /// Visibility gates; every condition must hold for the node to render
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<ConditionSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<BTreeMap<String, StyleValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<EventBinding>>,
}

impl ComponentNode {
    pub fn new(id: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component_type: component_type.into(),
            props: None,
            children: None,
            conditions: None,
            styles: None,
            events: None,
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: ComponentNode) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child);
        self
    }

    pub fn with_condition(mut self, condition: ConditionSpec) -> Self {
        self.conditions.get_or_insert_with(Vec::new).push(condition);
        self
    }

    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        self.styles
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_event(mut self, event: EventBinding) -> Self {
        self.events.get_or_insert_with(Vec::new).push(event);
        self
    }

    /// Children, empty for leaf nodes
    pub fn children(&self) -> &[ComponentNode] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Conditions, empty when the node is unconditional
    pub fn conditions(&self) -> &[ConditionSpec] {
        self.conditions.as_deref().unwrap_or_default()
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a ComponentNode>) {
        out.push(self);
        for child in self.children() {
            child.collect(out);
        }
    }
}

/// A string or numeric scalar (styles and layout dimensions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Number(Number),
    Text(String),
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for StyleValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

/// Kind of declarative gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionType {
    FeatureFlag,
    Permission,
    Environment,
    Custom,
}

impl ConditionType {
    pub const ALL: [&'static str; 4] = ["featureFlag", "permission", "environment", "custom"];
}

/// Comparison operator used by conditions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    #[default]
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Contains,
}

impl Operator {
    pub const ALL: [&'static str; 8] = ["eq", "ne", "gt", "gte", "lt", "lte", "in", "contains"];
}

/// Declarative gate attached to a component or permission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSpec {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,

    pub key: String,

    /// Defaults to [`Operator::Eq`] when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,

    /// Comparison operand; an explicit `null` is kept distinct from absence
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Name of an externally registered evaluator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<String>,
}

impl ConditionSpec {
    pub fn new(condition_type: ConditionType, key: impl Into<String>) -> Self {
        Self {
            condition_type,
            key: key.into(),
            operator: None,
            value: None,
            evaluator: None,
        }
    }

    /// Gate on a feature flag
    pub fn feature_flag(key: impl Into<String>) -> Self {
        Self::new(ConditionType::FeatureFlag, key)
    }

    /// Gate on a registered permission
    pub fn permission(key: impl Into<String>) -> Self {
        Self::new(ConditionType::Permission, key)
    }

    /// Compare the context environment against `value`
    pub fn environment(operator: Operator, value: impl Into<Value>) -> Self {
        Self::new(ConditionType::Environment, "environment")
            .with_operator(operator)
            .with_value(value)
    }

    /// Compare a custom context attribute against `value`
    pub fn custom(key: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::new(ConditionType::Custom, key)
            .with_operator(operator)
            .with_value(value)
    }

    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_evaluator(mut self, evaluator: impl Into<String>) -> Self {
        self.evaluator = Some(evaluator.into());
        self
    }

    /// Effective operator
    pub fn operator(&self) -> Operator {
        self.operator.unwrap_or_default()
    }

    /// Comparison operand, `null` when absent
    pub fn value(&self) -> &Value {
        self.value.as_ref().unwrap_or(&Value::Null)
    }
}

/// A field that is present, `null` included
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Event wiring passed through to the application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBinding {
    #[serde(rename = "type")]
    pub event_type: String,

    pub handler: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ValueMap>,
}

impl EventBinding {
    pub fn new(event_type: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            handler: handler.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: ValueMap) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Layout strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutType {
    Grid,
    Flex,
    Absolute,
    Relative,
}

impl LayoutType {
    pub const ALL: [&'static str; 4] = ["grid", "flex", "absolute", "relative"];
}

/// Flex direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Row,
    Column,
}

impl Direction {
    pub const ALL: [&'static str; 2] = ["row", "column"];
}

/// Root layout description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    #[serde(rename = "type")]
    pub layout_type: LayoutType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<StyleValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<StyleValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<StyleValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align_items: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justify_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<StyleValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<StyleValue>,
}

/// Feature flag definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDefinition {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout: Option<RolloutPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ValueMap>,
}

impl FeatureDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, enabled: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled,
            rollout: None,
            metadata: None,
        }
    }

    pub fn with_rollout(mut self, rollout: RolloutPolicy) -> Self {
        self.rollout = Some(rollout);
        self
    }
}

/// Gradual or targeted enablement policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutPolicy {
    /// Percentage of users admitted, 0 to 100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<String>>,
}

impl RolloutPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percentage(mut self, percentage: f64) -> Self {
        self.percentage = Some(percentage);
        self
    }

    pub fn user_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn environments<I, S>(mut self, environments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environments = Some(environments.into_iter().map(Into::into).collect());
        self
    }
}

/// Plugin declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub plugin_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ValueMap>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_case_round_trip() {
        let value = json!({
            "version": "1.0.0",
            "components": [],
            "layout": { "type": "flex", "alignItems": "center", "gap": 8 },
            "features": [{
                "id": "f",
                "name": "F",
                "enabled": true,
                "rollout": { "percentage": 25, "userIds": ["u1"] }
            }]
        });

        let doc: ConfigDocument = serde_json::from_value(value).unwrap();
        let layout = doc.layout.as_ref().unwrap();
        assert_eq!(layout.layout_type, LayoutType::Flex);
        assert_eq!(layout.align_items.as_deref(), Some("center"));
        assert_eq!(layout.gap, Some(StyleValue::Number(Number::from(8i64))));

        let rollout = doc.features()[0].rollout.as_ref().unwrap();
        assert_eq!(rollout.user_ids.as_deref(), Some(&["u1".to_string()][..]));

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["layout"]["alignItems"], "center");
        assert_eq!(back["features"][0]["rollout"]["userIds"][0], "u1");
        assert!(back.get("plugins").is_none());
    }

    #[test]
    fn test_condition_operator_defaults_to_eq() {
        let spec: ConditionSpec =
            serde_json::from_value(json!({ "type": "custom", "key": "tier", "value": "gold" }))
                .unwrap();
        assert_eq!(spec.operator, None);
        assert_eq!(spec.operator(), Operator::Eq);

        let out = serde_json::to_value(&spec).unwrap();
        assert!(out.get("operator").is_none());
    }

    #[test]
    fn test_walk_is_pre_order() {
        let doc = ConfigDocument::new("1.0.0")
            .with_component(
                ComponentNode::new("root", "div")
                    .with_child(ComponentNode::new("a", "span"))
                    .with_child(ComponentNode::new("b", "span").with_child(ComponentNode::new("c", "i"))),
            )
            .with_component(ComponentNode::new("footer", "footer"));

        let ids: Vec<_> = doc.walk().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "a", "b", "c", "footer"]);
        assert!(doc.find_component("c").is_some());
        assert!(doc.find_component("missing").is_none());
    }
}
