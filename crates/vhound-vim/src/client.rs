//! vCenter SOAP client implementing the collector source traits.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use vhound_collector::traits::{AuthorizationOps, DirectoryOps, InventoryOps, Source};
use vhound_collector::types::{
    AuthPrivilege, AuthRole, ObjectRef, PermissionAssignment, PropValue, PropertyBag,
};
use vhound_collector::{CollectorError, CollectorResult};

use crate::config::VimConfig;
use crate::soap::{self, XmlNode};

const SOAP_ACTION: &str = "urn:vim25/8.0.0.0";

/// Well-known managed objects resolved once at login.
#[derive(Debug, Clone)]
struct ServiceContent {
    root_folder: ObjectRef,
    session_manager: ObjectRef,
    property_collector: ObjectRef,
    authorization_manager: Option<ObjectRef>,
    user_directory: Option<ObjectRef>,
}

/// Authenticated session against one vCenter SOAP endpoint. The session
/// cookie lives in the HTTP client's cookie store.
#[derive(Debug)]
pub struct VimClient {
    config: VimConfig,
    endpoint: String,
    http: Client,
    content: RwLock<Option<ServiceContent>>,
}

impl VimClient {
    /// Connect and log in to the configured vCenter.
    pub async fn connect(config: VimConfig) -> CollectorResult<Self> {
        let endpoint = config.sdk_url();
        Self::connect_with_endpoint(config, &endpoint).await
    }

    /// Connect against an explicit endpoint URL instead of the one derived
    /// from the config, e.g. through a gateway.
    pub async fn connect_with_endpoint(
        config: VimConfig,
        endpoint: &str,
    ) -> CollectorResult<Self> {
        config.validate()?;
        let http = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|err| {
                CollectorError::connection_failed_with_source("building http client", err)
            })?;

        let client = Self {
            config,
            endpoint: endpoint.to_string(),
            http,
            content: RwLock::new(None),
        };
        let content = client.retrieve_service_content().await?;
        client.login(&content).await?;
        *client.content.write().await = Some(content);
        Ok(client)
    }

    async fn retrieve_service_content(&self) -> CollectorResult<ServiceContent> {
        let body = r#"<RetrieveServiceContent xmlns="urn:vim25"><_this type="ServiceInstance">ServiceInstance</_this></RetrieveServiceContent>"#;
        let response = self.soap_call(body).await?;
        if let Some(message) = soap::fault_message(&response) {
            return Err(CollectorError::connection_failed(message));
        }
        let returnval = response
            .find("returnval")
            .ok_or_else(|| CollectorError::protocol("service content missing returnval"))?;

        Ok(ServiceContent {
            root_folder: required_ref(returnval, "rootFolder")?,
            session_manager: required_ref(returnval, "sessionManager")?,
            property_collector: required_ref(returnval, "propertyCollector")?,
            authorization_manager: optional_ref(returnval, "authorizationManager"),
            user_directory: optional_ref(returnval, "userDirectory"),
        })
    }

    async fn login(&self, content: &ServiceContent) -> CollectorResult<()> {
        let body = format!(
            r#"<Login xmlns="urn:vim25"><_this type="SessionManager">{}</_this><userName>{}</userName><password>{}</password></Login>"#,
            soap::xml_escape(&content.session_manager.moid),
            soap::xml_escape(&self.config.username),
            soap::xml_escape(&self.config.password),
        );
        let response = self.soap_call(&body).await?;
        if let Some(message) = soap::fault_message(&response) {
            warn!(host = %self.config.host, "login rejected: {message}");
            return Err(CollectorError::AuthenticationFailed {
                host: self.config.host.clone(),
                username: self.config.username.clone(),
            });
        }
        debug!(host = %self.config.host, "session established");
        Ok(())
    }

    async fn content(&self) -> CollectorResult<ServiceContent> {
        self.content
            .read()
            .await
            .clone()
            .ok_or_else(|| CollectorError::connection_failed("session not established"))
    }

    #[instrument(skip_all, fields(host = %self.config.host))]
    async fn soap_call(&self, body: &str) -> CollectorResult<XmlNode> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", SOAP_ACTION)
            .body(soap::envelope(body))
            .send()
            .await
            .map_err(|err| {
                CollectorError::connection_failed_with_source("soap request failed", err)
            })?;
        let text = response.text().await.map_err(|err| {
            CollectorError::connection_failed_with_source("reading soap response", err)
        })?;
        soap::parse_document(&text)
    }

    /// One `RetrievePropertiesEx` call, faults mapped to partial failures.
    async fn retrieve_properties(
        &self,
        obj: &ObjectRef,
        paths: &[&str],
    ) -> CollectorResult<PropertyBag> {
        let content = self.content().await?;
        let path_set: String = paths
            .iter()
            .map(|p| format!("<pathSet>{}</pathSet>", soap::xml_escape(p)))
            .collect();
        let body = format!(
            concat!(
                r#"<RetrievePropertiesEx xmlns="urn:vim25">"#,
                r#"<_this type="PropertyCollector">{pc}</_this>"#,
                "<specSet>",
                "<propSet><type>{kind}</type><all>false</all>{paths}</propSet>",
                r#"<objectSet><obj type="{kind}">{moid}</obj><skip>false</skip></objectSet>"#,
                "</specSet><options/></RetrievePropertiesEx>"
            ),
            pc = soap::xml_escape(&content.property_collector.moid),
            kind = soap::xml_escape(&obj.kind),
            moid = soap::xml_escape(&obj.moid),
            paths = path_set,
        );
        let response = self.soap_call(&body).await?;
        if let Some(message) = soap::fault_message(&response) {
            return Err(CollectorError::partial(obj.to_string(), message));
        }

        let mut bag = PropertyBag::new();
        let mut prop_sets = Vec::new();
        response.find_all("propSet", &mut prop_sets);
        for prop_set in prop_sets {
            let Some(name) = prop_set.children_named("name").next() else {
                continue;
            };
            if let Some(val) = prop_set.children_named("val").next() {
                bag.insert(name.text.clone(), soap::node_to_prop(val));
            }
        }
        Ok(bag)
    }
}

#[async_trait]
impl Source for VimClient {
    fn source_host(&self) -> &str {
        &self.config.host
    }

    async fn test_connection(&self) -> CollectorResult<()> {
        let body = r#"<CurrentTime xmlns="urn:vim25"><_this type="ServiceInstance">ServiceInstance</_this></CurrentTime>"#;
        let response = self.soap_call(body).await?;
        match soap::fault_message(&response) {
            Some(message) => Err(CollectorError::connection_failed(message)),
            None => Ok(()),
        }
    }

    async fn disconnect(&self) -> CollectorResult<()> {
        let content = self.content().await?;
        let body = format!(
            r#"<Logout xmlns="urn:vim25"><_this type="SessionManager">{}</_this></Logout>"#,
            soap::xml_escape(&content.session_manager.moid),
        );
        // A failed logout only leaks a server-side session that will expire.
        if let Err(err) = self.soap_call(&body).await {
            warn!(host = %self.config.host, error = %err, "logout failed");
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryOps for VimClient {
    async fn root_folder(&self) -> CollectorResult<ObjectRef> {
        Ok(self.content().await?.root_folder)
    }

    async fn retrieve(&self, obj: &ObjectRef, paths: &[&str]) -> CollectorResult<PropertyBag> {
        self.retrieve_properties(obj, paths).await
    }
}

#[async_trait]
impl AuthorizationOps for VimClient {
    async fn privilege_list(&self) -> CollectorResult<Vec<AuthPrivilege>> {
        let manager = self.authorization_manager().await?;
        let bag = self.retrieve_properties(&manager, &["privilegeList"]).await?;
        let mut privileges = Vec::new();
        for entry in list_entries(bag.lookup("privilegeList")) {
            let Some(map) = entry.as_map() else { continue };
            let Some(id) = map.get("privId").and_then(PropValue::as_str) else {
                continue;
            };
            privileges.push(AuthPrivilege {
                id: id.to_string(),
                name: map
                    .get("name")
                    .and_then(PropValue::as_str)
                    .unwrap_or(id)
                    .to_string(),
                group: map
                    .get("privGroupName")
                    .and_then(PropValue::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        Ok(privileges)
    }

    async fn role_list(&self) -> CollectorResult<Vec<AuthRole>> {
        let manager = self.authorization_manager().await?;
        let bag = self.retrieve_properties(&manager, &["roleList"]).await?;
        let mut roles = Vec::new();
        for entry in list_entries(bag.lookup("roleList")) {
            let Some(map) = entry.as_map() else { continue };
            let Some(id) = map.get("roleId").and_then(PropValue::as_int) else {
                continue;
            };
            roles.push(AuthRole {
                id: id as i32,
                name: map
                    .get("name")
                    .and_then(PropValue::as_str)
                    .unwrap_or_default()
                    .to_string(),
                privileges: string_list(map.get("privilege")),
            });
        }
        Ok(roles)
    }

    async fn all_permissions(&self) -> CollectorResult<Vec<PermissionAssignment>> {
        let manager = self.authorization_manager().await?;
        let body = format!(
            r#"<RetrieveAllPermissions xmlns="urn:vim25"><_this type="AuthorizationManager">{}</_this></RetrieveAllPermissions>"#,
            soap::xml_escape(&manager.moid),
        );
        let response = self.soap_call(&body).await?;
        if let Some(message) = soap::fault_message(&response) {
            return Err(CollectorError::protocol(message));
        }

        let mut entries = Vec::new();
        response.find_all("returnval", &mut entries);
        let mut assignments = Vec::new();
        for entry in entries {
            let value = soap::node_to_prop(entry);
            let Some(map) = value.as_map() else { continue };
            let Some(principal) = map.get("principal").and_then(PropValue::as_str) else {
                continue;
            };
            assignments.push(PermissionAssignment {
                principal: principal.to_string(),
                is_group: map
                    .get("group")
                    .and_then(PropValue::as_bool)
                    .unwrap_or(false),
                role_id: map
                    .get("roleId")
                    .and_then(PropValue::as_int)
                    .unwrap_or_default() as i32,
                entity: map.get("entity").and_then(PropValue::as_ref_value).cloned(),
                propagate: map
                    .get("propagate")
                    .and_then(PropValue::as_bool)
                    .unwrap_or(false),
            });
        }
        Ok(assignments)
    }
}

#[async_trait]
impl DirectoryOps for VimClient {
    async fn domain_list(&self) -> CollectorResult<Vec<String>> {
        let directory = self.user_directory().await?;
        let bag = self.retrieve_properties(&directory, &["domainList"]).await?;
        Ok(string_list(bag.lookup("domainList")))
    }

    async fn group_members(
        &self,
        group: &str,
        domain: &str,
        find_users: bool,
    ) -> CollectorResult<Vec<String>> {
        let directory = self.user_directory().await?;
        let body = format!(
            concat!(
                r#"<RetrieveUserGroups xmlns="urn:vim25">"#,
                r#"<_this type="UserDirectory">{moid}</_this>"#,
                "<domain>{domain}</domain>",
                "<searchStr></searchStr>",
                "<belongsToGroup>{group}</belongsToGroup>",
                "<exactMatch>false</exactMatch>",
                "<findUsers>{users}</findUsers>",
                "<findGroups>{groups}</findGroups>",
                "</RetrieveUserGroups>"
            ),
            moid = soap::xml_escape(&directory.moid),
            domain = soap::xml_escape(domain),
            group = soap::xml_escape(group),
            users = find_users,
            groups = !find_users,
        );
        let response = self.soap_call(&body).await?;
        if let Some(message) = soap::fault_message(&response) {
            return Err(CollectorError::DirectoryQuery {
                group: group.to_string(),
                domain: domain.to_string(),
                message,
            });
        }

        let mut entries = Vec::new();
        response.find_all("returnval", &mut entries);
        Ok(entries
            .iter()
            .filter_map(|entry| {
                entry
                    .children_named("principal")
                    .next()
                    .map(|p| p.text.clone())
            })
            .collect())
    }
}

impl VimClient {
    async fn authorization_manager(&self) -> CollectorResult<ObjectRef> {
        self.content().await?.authorization_manager.ok_or_else(|| {
            CollectorError::protocol("authorization manager unavailable on this source")
        })
    }

    async fn user_directory(&self) -> CollectorResult<ObjectRef> {
        self.content()
            .await?
            .user_directory
            .ok_or_else(|| CollectorError::protocol("user directory unavailable on this source"))
    }
}

fn required_ref(parent: &XmlNode, name: &str) -> CollectorResult<ObjectRef> {
    optional_ref(parent, name)
        .ok_or_else(|| CollectorError::protocol(format!("service content missing {name}")))
}

fn optional_ref(parent: &XmlNode, name: &str) -> Option<ObjectRef> {
    let node = parent.children_named(name).next()?;
    let kind = node.attr("type")?;
    if node.text.is_empty() {
        return None;
    }
    Some(ObjectRef::new(kind, node.text.clone()))
}

/// The elements of a list value; a lone map is treated as a one-entry list,
/// matching how single-element arrays decode.
fn list_entries(value: Option<&PropValue>) -> Vec<&PropValue> {
    match value {
        Some(PropValue::List(items)) => items.iter().collect(),
        Some(item @ PropValue::Map(_)) => vec![item],
        _ => Vec::new(),
    }
}

fn string_list(value: Option<&PropValue>) -> Vec<String> {
    match value {
        Some(PropValue::Str(s)) => vec![s.clone()],
        Some(PropValue::List(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
