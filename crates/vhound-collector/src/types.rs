//! Data types exchanged with the source collaborator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to a managed object: its native type name and native id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Native type name, e.g. `VirtualMachine` or `ClusterComputeResource`.
    pub kind: String,
    /// Native managed-object id, e.g. `vm-42`.
    pub moid: String,
}

impl ObjectRef {
    pub fn new(kind: impl Into<String>, moid: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            moid: moid.into(),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.moid)
    }
}

/// A retrieved property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Ref(ObjectRef),
    List(Vec<PropValue>),
    Map(BTreeMap<String, PropValue>),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_ref_value(&self) -> Option<&ObjectRef> {
        match self {
            PropValue::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, PropValue>> {
        match self {
            PropValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// The value as a list of object references. A single reference is
    /// treated as a one-element list; anything else is empty.
    pub fn as_refs(&self) -> Vec<ObjectRef> {
        match self {
            PropValue::Ref(r) => vec![r.clone()],
            PropValue::List(items) => items
                .iter()
                .filter_map(|v| v.as_ref_value().cloned())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Convert into a JSON property value for the graph. References render
    /// as their native id; null stays null and is later sanitized to "".
    pub fn to_json(&self) -> Value {
        match self {
            PropValue::Null => Value::Null,
            PropValue::Bool(b) => Value::Bool(*b),
            PropValue::Int(n) => Value::from(*n),
            PropValue::Str(s) => Value::String(s.clone()),
            PropValue::Ref(r) => Value::String(r.moid.clone()),
            PropValue::List(items) => Value::Array(items.iter().map(PropValue::to_json).collect()),
            PropValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Property set retrieved for one object, keyed by the requested path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyBag(pub BTreeMap<String, PropValue>);

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, value: PropValue) {
        self.0.insert(path.into(), value);
    }

    /// Walk a dot-delimited path through nested maps.
    ///
    /// The first path segment may itself be a stored key containing dots
    /// (a nested path requested directly), so the longest stored prefix of
    /// `path` is tried first.
    pub fn lookup(&self, path: &str) -> Option<&PropValue> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }
        let mut rest = path;
        while let Some(split) = rest.rfind('.') {
            rest = &rest[..split];
            if let Some(value) = self.0.get(rest) {
                let mut current = value;
                for segment in path[rest.len() + 1..].split('.') {
                    current = current.as_map()?.get(segment)?;
                }
                return Some(current);
            }
        }
        None
    }

    pub fn string(&self, path: &str) -> Option<&str> {
        self.lookup(path).and_then(PropValue::as_str)
    }

    pub fn int(&self, path: &str) -> Option<i64> {
        self.lookup(path).and_then(PropValue::as_int)
    }

    pub fn boolean(&self, path: &str) -> Option<bool> {
        self.lookup(path).and_then(PropValue::as_bool)
    }

    pub fn refs(&self, path: &str) -> Vec<ObjectRef> {
        self.lookup(path).map(PropValue::as_refs).unwrap_or_default()
    }
}

/// A privilege definition, static per source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPrivilege {
    pub id: String,
    pub name: String,
    pub group: String,
}

/// A role definition, static per source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRole {
    pub id: i32,
    pub name: String,
    /// Privilege ids granted by the role, in the source's order.
    pub privileges: Vec<String>,
}

/// One permission assignment returned by the authorization manager.
/// Transient input: resolved into nodes and a permission edge, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionAssignment {
    pub principal: String,
    pub is_group: bool,
    pub role_id: i32,
    pub entity: Option<ObjectRef>,
    pub propagate: bool,
}

/// A principal string split into its domain and username fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPrincipal {
    pub domain: String,
    pub username: String,
}

impl ParsedPrincipal {
    /// Parse either textual form: `DOMAIN\user` splits on the first
    /// backslash; `user@domain` takes the suffix as domain; anything else
    /// is a bare username with an empty domain.
    pub fn parse(principal: &str) -> Self {
        if let Some((domain, username)) = principal.split_once('\\') {
            return Self {
                domain: domain.to_string(),
                username: username.to_string(),
            };
        }
        if let Some((username, domain)) = principal.split_once('@') {
            return Self {
                domain: domain.to_string(),
                username: username.to_string(),
            };
        }
        Self {
            domain: String::new(),
            username: principal.to_string(),
        }
    }
}
