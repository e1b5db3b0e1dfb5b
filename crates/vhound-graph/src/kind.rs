//! Node and edge label enumerations.
//!
//! Labels are a closed set so an unmapped inventory type fails at build time
//! instead of silently passing through as a free-form string. The rename
//! tables live in [`NodeKind::from_native`] and the `label` methods; they are
//! constant lookup data, never mutable state.

use serde::{Deserialize, Serialize};

/// Prefix applied to every node label in the output graph.
pub const NODE_LABEL_PREFIX: &str = "vCenter_";

/// Prefix applied to in-graph edge labels. Identity-bridge edges carry their
/// own full labels and are not prefixed.
pub const EDGE_LABEL_PREFIX: &str = "vCenter_";

/// Category of a node in the output graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    VCenter,
    RootFolder,
    Folder,
    Datacenter,
    Cluster,
    EsxiHost,
    ResourcePool,
    Vm,
    Datastore,
    Network,
    DvPortgroup,
    User,
    Group,
    Role,
    Privilege,
}

impl NodeKind {
    /// The un-prefixed display form of this kind.
    pub fn base_name(self) -> &'static str {
        match self {
            NodeKind::VCenter => "vCenter",
            NodeKind::RootFolder => "RootFolder",
            NodeKind::Folder => "Folder",
            NodeKind::Datacenter => "Datacenter",
            NodeKind::Cluster => "Cluster",
            NodeKind::EsxiHost => "ESXiHost",
            NodeKind::ResourcePool => "ResourcePool",
            NodeKind::Vm => "VM",
            NodeKind::Datastore => "Datastore",
            NodeKind::Network => "Network",
            NodeKind::DvPortgroup => "DVPortgroup",
            NodeKind::User => "User",
            NodeKind::Group => "Group",
            NodeKind::Role => "Role",
            NodeKind::Privilege => "Privilege",
        }
    }

    /// The fully formatted label recorded on nodes: prefix plus the cleaned
    /// base name. Every kind comparison in the store goes through this rule,
    /// so formatting differences can never produce a false "new" kind.
    pub fn label(self) -> String {
        format!("{}{}", NODE_LABEL_PREFIX, clean_label(self.base_name()))
    }

    /// Lowercase prefix used when constructing canonical entity ids.
    pub fn id_prefix(self) -> &'static str {
        match self {
            NodeKind::VCenter => "vcenter",
            NodeKind::RootFolder | NodeKind::Folder => "folder",
            NodeKind::Datacenter => "datacenter",
            NodeKind::Cluster => "cluster",
            NodeKind::EsxiHost => "esxi_host",
            NodeKind::ResourcePool => "resource_pool",
            NodeKind::Vm => "vm",
            NodeKind::Datastore => "datastore",
            NodeKind::Network | NodeKind::DvPortgroup => "network",
            NodeKind::User => "user",
            NodeKind::Group => "group",
            NodeKind::Role => "role",
            NodeKind::Privilege => "privilege",
        }
    }

    /// Map a native managed-object type name to a node kind.
    ///
    /// `ComputeResource` is intentionally absent: a compute-resource wrapper
    /// resolves to the host it contains, never to a node of its own.
    pub fn from_native(native_type: &str) -> Option<NodeKind> {
        match native_type {
            "Datacenter" => Some(NodeKind::Datacenter),
            "ClusterComputeResource" => Some(NodeKind::Cluster),
            "HostSystem" => Some(NodeKind::EsxiHost),
            "VirtualMachine" => Some(NodeKind::Vm),
            "Folder" => Some(NodeKind::Folder),
            "ResourcePool" => Some(NodeKind::ResourcePool),
            "Datastore" => Some(NodeKind::Datastore),
            "Network" | "OpaqueNetwork" => Some(NodeKind::Network),
            "DistributedVirtualPortgroup" => Some(NodeKind::DvPortgroup),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base_name())
    }
}

/// Category of an edge in the output graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Contains,
    Hosts,
    HasPermission,
    MemberOf,
    UsesDatastore,
    UsesNetwork,
    HasPrivilege,
    /// Identity bridge from a directory user to a vCenter user principal.
    SyncsToUser,
    /// Identity bridge from a directory group to a vCenter group principal.
    SyncsToGroup,
}

impl EdgeKind {
    /// The fully formatted label recorded on edges.
    ///
    /// Bridge edges name the target system in full and take no prefix; the
    /// consumer resolves their start endpoint against its own directory
    /// nodes, not against this graph's namespace.
    pub fn label(self) -> String {
        match self {
            EdgeKind::SyncsToUser => "SyncsTovCenterUser".to_string(),
            EdgeKind::SyncsToGroup => "SyncsTovCenterGroup".to_string(),
            other => format!("{}{}", EDGE_LABEL_PREFIX, clean_label(other.base_name())),
        }
    }

    fn base_name(self) -> &'static str {
        match self {
            EdgeKind::Contains => "Contains",
            EdgeKind::Hosts => "Hosts",
            EdgeKind::HasPermission => "HasPermission",
            EdgeKind::MemberOf => "MemberOf",
            EdgeKind::UsesDatastore => "UsesDatastore",
            EdgeKind::UsesNetwork => "UsesNetwork",
            EdgeKind::HasPrivilege => "HasPrivilege",
            EdgeKind::SyncsToUser => "SyncsToUser",
            EdgeKind::SyncsToGroup => "SyncsToGroup",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Replace characters the consumer's label grammar rejects.
fn clean_label(name: &str) -> String {
    name.replace(['.', '-', ' '], "_")
}
