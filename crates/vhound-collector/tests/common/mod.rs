//! Shared test fixture: an in-memory source implementing all capability
//! traits over fixture data.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;

use vhound_collector::error::{CollectorError, CollectorResult};
use vhound_collector::traits::{AuthorizationOps, DirectoryOps, InventoryOps, Source};
use vhound_collector::types::{
    AuthPrivilege, AuthRole, ObjectRef, PermissionAssignment, PropValue, PropertyBag,
};

#[derive(Default)]
pub struct FakeSource {
    pub host: String,
    pub root: Option<ObjectRef>,
    pub objects: HashMap<ObjectRef, PropertyBag>,
    pub privileges: Vec<AuthPrivilege>,
    pub roles: Vec<AuthRole>,
    pub permissions: Vec<PermissionAssignment>,
    pub domains: Vec<String>,
    /// (group, domain, find_users) -> member principals
    pub members: HashMap<(String, String, bool), Vec<String>>,
    /// (group, domain) pairs whose directory queries fail
    pub failing_queries: HashSet<(String, String)>,
}

impl FakeSource {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            ..Default::default()
        }
    }

    pub fn with_object(mut self, obj: ObjectRef, bag: PropertyBag) -> Self {
        self.objects.insert(obj, bag);
        self
    }

    pub fn with_root(mut self, root: ObjectRef) -> Self {
        self.root = Some(root);
        self
    }

    pub fn with_members(
        mut self,
        group: &str,
        domain: &str,
        find_users: bool,
        members: &[&str],
    ) -> Self {
        self.members.insert(
            (group.to_string(), domain.to_string(), find_users),
            members.iter().map(|m| (*m).to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl Source for FakeSource {
    fn source_host(&self) -> &str {
        &self.host
    }

    async fn test_connection(&self) -> CollectorResult<()> {
        Ok(())
    }
}

#[async_trait]
impl InventoryOps for FakeSource {
    async fn root_folder(&self) -> CollectorResult<ObjectRef> {
        self.root
            .clone()
            .ok_or_else(|| CollectorError::connection_failed("no root folder in fixture"))
    }

    async fn retrieve(&self, obj: &ObjectRef, paths: &[&str]) -> CollectorResult<PropertyBag> {
        let bag = self
            .objects
            .get(obj)
            .ok_or_else(|| CollectorError::partial(obj.to_string(), "object not in fixture"))?;
        let mut out = PropertyBag::new();
        for path in paths {
            if let Some(value) = bag.lookup(path) {
                out.insert(*path, value.clone());
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl AuthorizationOps for FakeSource {
    async fn privilege_list(&self) -> CollectorResult<Vec<AuthPrivilege>> {
        Ok(self.privileges.clone())
    }

    async fn role_list(&self) -> CollectorResult<Vec<AuthRole>> {
        Ok(self.roles.clone())
    }

    async fn all_permissions(&self) -> CollectorResult<Vec<PermissionAssignment>> {
        Ok(self.permissions.clone())
    }
}

#[async_trait]
impl DirectoryOps for FakeSource {
    async fn domain_list(&self) -> CollectorResult<Vec<String>> {
        Ok(self.domains.clone())
    }

    async fn group_members(
        &self,
        group: &str,
        domain: &str,
        find_users: bool,
    ) -> CollectorResult<Vec<String>> {
        if self
            .failing_queries
            .contains(&(group.to_string(), domain.to_string()))
        {
            return Err(CollectorError::DirectoryQuery {
                group: group.to_string(),
                domain: domain.to_string(),
                message: "simulated directory failure".to_string(),
            });
        }
        Ok(self
            .members
            .get(&(group.to_string(), domain.to_string(), find_users))
            .cloned()
            .unwrap_or_default())
    }
}

// Fixture construction helpers.

pub fn mor(kind: &str, moid: &str) -> ObjectRef {
    ObjectRef::new(kind, moid)
}

pub fn str_val(s: &str) -> PropValue {
    PropValue::Str(s.to_string())
}

pub fn ref_list(refs: &[ObjectRef]) -> PropValue {
    PropValue::List(refs.iter().cloned().map(PropValue::Ref).collect())
}

pub fn map_val(entries: Vec<(&str, PropValue)>) -> PropValue {
    PropValue::Map(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<BTreeMap<String, PropValue>>(),
    )
}

pub fn bag(entries: Vec<(&str, PropValue)>) -> PropertyBag {
    let mut bag = PropertyBag::new();
    for (k, v) in entries {
        bag.insert(k, v);
    }
    bag
}

pub fn assignment(
    principal: &str,
    is_group: bool,
    role_id: i32,
    entity: Option<ObjectRef>,
    propagate: bool,
) -> PermissionAssignment {
    PermissionAssignment {
        principal: principal.to_string(),
        is_group,
        role_id,
        entity,
        propagate,
    }
}

pub fn role(id: i32, name: &str, privileges: &[&str]) -> AuthRole {
    AuthRole {
        id,
        name: name.to_string(),
        privileges: privileges.iter().map(|p| (*p).to_string()).collect(),
    }
}

pub fn privilege(id: &str, name: &str, group: &str) -> AuthPrivilege {
    AuthPrivilege {
        id: id.to_string(),
        name: name.to_string(),
        group: group.to_string(),
    }
}
