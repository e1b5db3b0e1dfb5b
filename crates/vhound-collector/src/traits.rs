//! Capability traits for the source collaborator.
//!
//! The transport-level client is out of scope for the collector: it is a
//! collaborator exposing hierarchy traversal, property retrieval, the
//! authorization manager and the user directory. Each concern is its own
//! capability trait over a common base, so tests can fake exactly the
//! surface a resolver needs.

use async_trait::async_trait;

use crate::error::CollectorResult;
use crate::types::{AuthPrivilege, AuthRole, ObjectRef, PermissionAssignment, PropertyBag};

/// Base trait for all vCenter sources.
#[async_trait]
pub trait Source: Send + Sync {
    /// Hostname of this source, used as the middle component of every
    /// canonical entity id it produces.
    fn source_host(&self) -> &str;

    /// Verify the source is reachable and the session is valid.
    async fn test_connection(&self) -> CollectorResult<()>;

    /// Release the session. Called once after collection completes.
    async fn disconnect(&self) -> CollectorResult<()> {
        Ok(())
    }
}

/// Capability for hierarchy traversal and per-object property retrieval.
#[async_trait]
pub trait InventoryOps: Source {
    /// The inventory root folder reference.
    async fn root_folder(&self) -> CollectorResult<ObjectRef>;

    /// Retrieve the named property paths for one object.
    ///
    /// Paths may be nested (`summary.hardware`); the returned bag keys them
    /// exactly as requested.
    async fn retrieve(&self, obj: &ObjectRef, paths: &[&str]) -> CollectorResult<PropertyBag>;
}

/// Capability exposing the authorization manager.
#[async_trait]
pub trait AuthorizationOps: Source {
    /// The full privilege table, loaded once per source.
    async fn privilege_list(&self) -> CollectorResult<Vec<AuthPrivilege>>;

    /// The full role table, loaded once per source.
    async fn role_list(&self) -> CollectorResult<Vec<AuthRole>>;

    /// Every permission assignment defined on the source.
    async fn all_permissions(&self) -> CollectorResult<Vec<PermissionAssignment>>;
}

/// Capability exposing the user directory.
#[async_trait]
pub trait DirectoryOps: Source {
    /// The naming-service domains the directory knows about.
    async fn domain_list(&self) -> CollectorResult<Vec<String>>;

    /// Direct members of `group` in `domain`: users when `find_users`,
    /// groups otherwise. One level only, never transitive.
    async fn group_members(
        &self,
        group: &str,
        domain: &str,
        find_users: bool,
    ) -> CollectorResult<Vec<String>>;
}
