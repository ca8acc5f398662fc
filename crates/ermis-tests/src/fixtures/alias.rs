//! Alias request payloads and response models.
//!
//! Field names follow the ermis wire format, including the capitalised
//! `AllowedNodes` / `ForbiddenNodes` keys.

use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Hostgroup owned by the administrators' egroup.
pub const ADMIN_HOSTGROUP: &str = "aiermis";

/// Hostgroup the test accounts have no rights on.
pub const FOREIGN_HOSTGROUP: &str = "bi";

/// `best_hosts` value written by the update scenario.
pub const UPDATED_BEST_HOSTS: i64 = 32;

/// Alias name used by the malformed POST. Invalid on purpose (trailing `_`).
pub const MALFORMED_ALIAS_NAME: &str = "test-alias-behavs_";

/// Request body for creating or updating an alias.
#[derive(Debug, Clone, Serialize)]
pub struct AliasPayload {
    pub alias_name: String,
    pub behaviour: String,
    pub best_hosts: i64,
    pub external: String,
    pub metric: String,
    pub polling_interval: i64,
    pub statistics: String,
    pub clusters: String,
    pub tenant: String,
    pub hostgroup: String,

    #[serde(rename = "AllowedNodes", skip_serializing_if = "Option::is_none")]
    pub allowed_nodes: Option<Vec<String>>,

    #[serde(rename = "ForbiddenNodes", skip_serializing_if = "Option::is_none")]
    pub forbidden_nodes: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarms: Option<Vec<String>>,
}

impl AliasPayload {
    /// Payload with the suite's fixed defaults.
    pub fn defaults(alias_name: impl Into<String>, hostgroup: impl Into<String>) -> Self {
        Self {
            alias_name: alias_name.into(),
            behaviour: "mindless".to_string(),
            best_hosts: 2,
            external: "external".to_string(),
            metric: "minino".to_string(),
            polling_interval: 300,
            statistics: "none".to_string(),
            clusters: "none".to_string(),
            tenant: String::new(),
            hostgroup: hostgroup.into(),
            allowed_nodes: None,
            forbidden_nodes: None,
            alarms: None,
        }
    }

    pub fn with_best_hosts(mut self, best_hosts: i64) -> Self {
        self.best_hosts = best_hosts;
        self
    }

    /// Replace both node lists.
    pub fn with_nodes(mut self, allowed: Vec<String>, forbidden: Vec<String>) -> Self {
        self.allowed_nodes = Some(allowed);
        self.forbidden_nodes = Some(forbidden);
        self
    }

    pub fn with_alarms(mut self, alarms: Vec<String>) -> Self {
        self.alarms = Some(alarms);
        self
    }
}

/// A POST body with wrongly typed fields, which the API must reject.
pub fn malformed_payload() -> serde_json::Value {
    serde_json::json!({
        "alias_name": MALFORMED_ALIAS_NAME,
        "behaviour": "mindless",
        "best_hosts": "2sd",
        "external": "external",
        "metric": "minino",
        "polling_interval": "ad3f00",
        "statistics": "none",
        "clusters": "none",
        "tenant": "",
        "hostgroup": "",
    })
}

/// The other hostgroup of the admin/foreign pair.
///
/// Returns `None` for hostgroups outside the pair.
pub fn toggle_hostgroup(hostgroup: &str) -> Option<&'static str> {
    match hostgroup {
        ADMIN_HOSTGROUP => Some(FOREIGN_HOSTGROUP),
        FOREIGN_HOSTGROUP => Some(ADMIN_HOSTGROUP),
        _ => None,
    }
}

/// Role a scenario plays relative to the alias hostgroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostgroupRole {
    Admin,
    Unauthorized,
}

impl HostgroupRole {
    pub fn hostgroup(&self) -> &'static str {
        match self {
            HostgroupRole::Admin => ADMIN_HOSTGROUP,
            HostgroupRole::Unauthorized => FOREIGN_HOSTGROUP,
        }
    }
}

impl FromStr for HostgroupRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(HostgroupRole::Admin),
            "unauthorized" => Ok(HostgroupRole::Unauthorized),
            other => Err(format!("unknown hostgroup role '{}'", other)),
        }
    }
}

/// Response body of the alias endpoints.
///
/// `objects` is `null` when nothing matched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AliasList {
    #[serde(default)]
    pub objects: Option<Vec<AliasObject>>,
}

impl AliasList {
    /// True when at least one alias came back.
    pub fn is_present(&self) -> bool {
        self.objects.as_ref().is_some_and(|objects| !objects.is_empty())
    }

    pub fn into_first(self) -> Option<AliasObject> {
        self.objects.and_then(|objects| objects.into_iter().next())
    }
}

/// A single alias as returned by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AliasObject {
    #[serde(default)]
    pub alias_id: i64,

    pub alias_name: String,

    #[serde(default)]
    pub behaviour: String,

    #[serde(default)]
    pub best_hosts: i64,

    #[serde(default)]
    pub clusters: String,

    #[serde(rename = "AllowedNodes", default, deserialize_with = "string_or_list")]
    pub allowed_nodes: Vec<String>,

    #[serde(rename = "ForbiddenNodes", default, deserialize_with = "string_or_list")]
    pub forbidden_nodes: Vec<String>,

    #[serde(default, deserialize_with = "string_or_list")]
    pub cnames: Vec<String>,

    #[serde(default)]
    pub external: String,

    #[serde(default)]
    pub hostgroup: String,

    #[serde(default)]
    pub metric: String,

    #[serde(default)]
    pub polling_interval: i64,

    #[serde(default)]
    pub tenant: String,

    #[serde(default)]
    pub ttl: Option<i64>,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub statistics: String,

    #[serde(default)]
    pub resource_uri: String,

    #[serde(default)]
    pub pwned: bool,

    #[serde(default, deserialize_with = "string_or_list")]
    pub alarms: Vec<String>,
}

impl AliasObject {
    pub fn has_allowed_node(&self, node: &str) -> bool {
        self.allowed_nodes.iter().any(|entry| node_matches(entry, node))
    }

    pub fn has_forbidden_node(&self, node: &str) -> bool {
        self.forbidden_nodes.iter().any(|entry| node_matches(entry, node))
    }

    /// Node is listed as either allowed or forbidden.
    pub fn has_node(&self, node: &str) -> bool {
        self.has_allowed_node(node) || self.has_forbidden_node(node)
    }

    /// An alarm with the same type, recipient and parameter is configured.
    pub fn has_alarm(&self, expected: &str) -> bool {
        let expected = alarm_key(expected);
        self.alarms.iter().any(|alarm| alarm_key(alarm) == expected)
    }
}

/// Node entries come back as `name:load`.
fn node_matches(entry: &str, node: &str) -> bool {
    entry.split(':').next().map(str::trim) == Some(node)
}

/// Identity of an alarm: `name:recipient:parameter`.
///
/// Responses append `:active[:last_active]`, which must not take part in
/// comparisons.
pub fn alarm_key(alarm: &str) -> String {
    alarm.splitn(4, ':').take(3).collect::<Vec<_>>().join(":")
}

/// Older deployments return node lists as comma-separated strings.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        List(Vec<String>),
        Text(String),
    }

    Ok(match Option::<StringOrList>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(StringOrList::List(items)) => items,
        Some(StringOrList::Text(text)) => text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect(),
    })
}
