//! vhound Collector Library
//!
//! Turns one vCenter source into graph nodes and edges: inventory hierarchy
//! traversal, role/privilege loading, permission-assignment resolution and
//! one-level group-membership expansion.
//!
//! The transport is a collaborator behind capability traits ([`traits`]);
//! everything here is written against those traits and exercised with
//! in-memory fakes in tests.

pub mod collector;
pub mod error;
pub mod infrastructure;
pub mod membership;
pub mod permissions;
pub mod traits;
pub mod types;

pub use collector::collect_source;
pub use error::{CollectorError, CollectorResult};
pub use traits::{AuthorizationOps, DirectoryOps, InventoryOps, Source};
pub use types::{
    AuthPrivilege, AuthRole, ObjectRef, ParsedPrincipal, PermissionAssignment, PropValue,
    PropertyBag,
};
