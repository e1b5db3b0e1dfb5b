//! Inventory hierarchy traversal.
//!
//! Walks folders, datacenters, clusters, hosts, resource pools, VMs,
//! datastores and networks, feeding the graph store. The walk is an explicit
//! worklist of (object, parent canonical id) pairs rather than native
//! recursion, so arbitrarily deep folder nesting cannot exhaust the stack.
//!
//! Partial failure on one object logs a warning and skips that object's
//! node and edges; siblings proceed.

use std::collections::{BTreeSet, VecDeque};

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use vhound_graph::{entity_id, vcenter_id, EdgeKind, GraphStore, NodeKind, Properties};

use crate::error::CollectorResult;
use crate::traits::InventoryOps;
use crate::types::{ObjectRef, PropertyBag};

/// One pending traversal step, carrying the parent's canonical id.
enum WorkItem {
    /// Generic folder (top-level or VM folder): emits a node, contains
    /// datacenters, folders and virtual machines.
    Folder { obj: ObjectRef, parent: String },
    Datacenter { obj: ObjectRef, parent: String },
    /// A datacenter's host folder: not a node itself, its children are
    /// compute folders, clusters, compute resources or bare hosts.
    HostFolderChildren { obj: ObjectRef, parent: String },
    /// Folder inside the compute hierarchy: emits a node.
    ComputeFolder { obj: ObjectRef, parent: String },
    Cluster { obj: ObjectRef, parent: String },
    /// Standalone-host wrapper: resolves to its hosts, no node of its own.
    ComputeResource { obj: ObjectRef, parent: String },
    Host {
        obj: ObjectRef,
        parent: String,
        standalone: bool,
    },
    Vm { obj: ObjectRef, parent: String },
    ResourcePool { obj: ObjectRef },
    Datastore { obj: ObjectRef },
    Network { obj: ObjectRef },
}

/// Traverse the source's inventory into `store`.
pub async fn collect<S: InventoryOps + ?Sized>(
    source: &S,
    store: &mut GraphStore,
) -> CollectorResult<()> {
    let host = source.source_host().to_string();

    let vc_id = vcenter_id(&host);
    store.ensure_node(
        &[NodeKind::VCenter],
        &vc_id,
        Properties::from_iter([("name".to_string(), json!(host.clone()))]),
    );

    let root = source.root_folder().await?;
    let root_bag = source.retrieve(&root, &["name", "childEntity"]).await?;
    let root_id = entity_id(NodeKind::Folder, &host, &root.moid);
    store.ensure_node(
        &[NodeKind::RootFolder, NodeKind::Folder],
        &root_id,
        base_props(root_bag.string("name"), &root.moid),
    );
    store.add_edge(EdgeKind::Contains, &vc_id, &root_id, Properties::new());

    let mut work: VecDeque<WorkItem> = VecDeque::new();
    for child in root_bag.refs("childEntity") {
        match child.kind.as_str() {
            "Datacenter" => work.push_back(WorkItem::Datacenter {
                obj: child,
                parent: root_id.clone(),
            }),
            "Folder" => work.push_back(WorkItem::Folder {
                obj: child,
                parent: root_id.clone(),
            }),
            other => debug!(kind = other, "skipping unhandled root child"),
        }
    }

    let mut visited = 0usize;
    while let Some(item) = work.pop_front() {
        visited += 1;
        if let Err(err) = process(source, store, &host, item, &mut work).await {
            warn!(error = %err, "skipping object after partial collection failure");
        }
    }
    info!(host = %host, objects = visited, "infrastructure traversal complete");
    Ok(())
}

async fn process<S: InventoryOps + ?Sized>(
    source: &S,
    store: &mut GraphStore,
    host: &str,
    item: WorkItem,
    work: &mut VecDeque<WorkItem>,
) -> CollectorResult<()> {
    match item {
        WorkItem::Folder { obj, parent } => {
            let bag = source.retrieve(&obj, &["name", "childEntity"]).await?;
            let id = entity_id(NodeKind::Folder, host, &obj.moid);
            store.ensure_node(
                &[NodeKind::Folder],
                &id,
                base_props(bag.string("name"), &obj.moid),
            );
            store.add_edge(EdgeKind::Contains, &parent, &id, Properties::new());
            for child in bag.refs("childEntity") {
                match child.kind.as_str() {
                    "Datacenter" => work.push_back(WorkItem::Datacenter {
                        obj: child,
                        parent: id.clone(),
                    }),
                    "Folder" => work.push_back(WorkItem::Folder {
                        obj: child,
                        parent: id.clone(),
                    }),
                    "VirtualMachine" => work.push_back(WorkItem::Vm {
                        obj: child,
                        parent: id.clone(),
                    }),
                    _ => {}
                }
            }
        }

        WorkItem::Datacenter { obj, parent } => {
            let bag = source
                .retrieve(&obj, &["name", "hostFolder", "vmFolder", "datastore", "network"])
                .await?;
            let id = entity_id(NodeKind::Datacenter, host, &obj.moid);
            store.ensure_node(
                &[NodeKind::Datacenter],
                &id,
                base_props(bag.string("name"), &obj.moid),
            );
            store.add_edge(EdgeKind::Contains, &parent, &id, Properties::new());
            debug!(datacenter = bag.string("name").unwrap_or(&obj.moid), "processing datacenter");

            if let Some(host_folder) = bag.lookup("hostFolder").and_then(|v| v.as_ref_value()) {
                work.push_back(WorkItem::HostFolderChildren {
                    obj: host_folder.clone(),
                    parent: id.clone(),
                });
            }
            if let Some(vm_folder) = bag.lookup("vmFolder").and_then(|v| v.as_ref_value()) {
                work.push_back(WorkItem::Folder {
                    obj: vm_folder.clone(),
                    parent: id.clone(),
                });
            }
            for ds in bag.refs("datastore") {
                work.push_back(WorkItem::Datastore { obj: ds });
            }
            for net in bag.refs("network") {
                work.push_back(WorkItem::Network { obj: net });
            }
        }

        WorkItem::HostFolderChildren { obj, parent } => {
            let bag = source.retrieve(&obj, &["name", "childEntity"]).await?;
            for child in bag.refs("childEntity") {
                dispatch_compute_child(child, &parent, work);
            }
        }

        WorkItem::ComputeFolder { obj, parent } => {
            let bag = source.retrieve(&obj, &["name", "childEntity"]).await?;
            let id = entity_id(NodeKind::Folder, host, &obj.moid);
            store.ensure_node(
                &[NodeKind::Folder],
                &id,
                base_props(bag.string("name"), &obj.moid),
            );
            store.add_edge(EdgeKind::Contains, &parent, &id, Properties::new());
            for child in bag.refs("childEntity") {
                dispatch_compute_child(child, &id, work);
            }
        }

        WorkItem::Cluster { obj, parent } => {
            let bag = source
                .retrieve(
                    &obj,
                    &["name", "host", "datastore", "network", "resourcePool", "summary"],
                )
                .await?;
            let id = entity_id(NodeKind::Cluster, host, &obj.moid);
            let mut props = base_props(bag.string("name"), &obj.moid);
            for (key, path) in [
                ("totalCpu", "summary.totalCpu"),
                ("totalMemory", "summary.totalMemory"),
                ("numHosts", "summary.numHosts"),
                ("numCpuCores", "summary.numCpuCores"),
                ("numCpuThreads", "summary.numCpuThreads"),
                ("effectiveCpu", "summary.effectiveCpu"),
                ("effectiveMemory", "summary.effectiveMemory"),
            ] {
                if let Some(n) = bag.int(path) {
                    props.insert(key.to_string(), json!(n));
                }
            }
            store.ensure_node(&[NodeKind::Cluster], &id, props);
            store.add_edge(EdgeKind::Contains, &parent, &id, Properties::new());

            for h in bag.refs("host") {
                work.push_back(WorkItem::Host {
                    obj: h,
                    parent: id.clone(),
                    standalone: false,
                });
            }
            for ds in bag.refs("datastore") {
                work.push_back(WorkItem::Datastore { obj: ds });
            }
            for net in bag.refs("network") {
                work.push_back(WorkItem::Network { obj: net });
            }
            if let Some(pool) = bag.lookup("resourcePool").and_then(|v| v.as_ref_value()) {
                work.push_back(WorkItem::ResourcePool { obj: pool.clone() });
            }
        }

        WorkItem::ComputeResource { obj, parent } => {
            let bag = source.retrieve(&obj, &["host"]).await?;
            for h in bag.refs("host") {
                work.push_back(WorkItem::Host {
                    obj: h,
                    parent: parent.clone(),
                    standalone: true,
                });
            }
        }

        WorkItem::Host {
            obj,
            parent,
            standalone,
        } => {
            let bag = source
                .retrieve(&obj, &["name", "summary", "vm", "datastore", "network"])
                .await?;
            let id = entity_id(NodeKind::EsxiHost, host, &obj.moid);
            let mut props = base_props(bag.string("name"), &obj.moid);
            if standalone {
                props.insert("isStandalone".to_string(), json!(true));
            }
            for (key, path) in [
                ("vendor", "summary.hardware.vendor"),
                ("model", "summary.hardware.model"),
                ("cpuModel", "summary.hardware.cpuModel"),
                ("version", "summary.config.product.version"),
                ("build", "summary.config.product.build"),
                ("connectionState", "summary.runtime.connectionState"),
                ("powerState", "summary.runtime.powerState"),
            ] {
                if let Some(s) = bag.string(path) {
                    props.insert(key.to_string(), json!(s));
                }
            }
            // Core counts and memory are emitted as strings, matching the
            // established output format.
            for (key, path) in [
                ("numCpuCores", "summary.hardware.numCpuCores"),
                ("numCpuThreads", "summary.hardware.numCpuThreads"),
                ("memorySize", "summary.hardware.memorySize"),
            ] {
                if let Some(n) = bag.int(path) {
                    props.insert(key.to_string(), json!(n.to_string()));
                }
            }
            if let Some(n) = bag.int("summary.hardware.cpuMhz") {
                props.insert("cpuMhz".to_string(), json!(n));
            }
            if let Some(b) = bag.boolean("summary.runtime.inMaintenanceMode") {
                props.insert("inMaintenanceMode".to_string(), json!(b));
            }
            store.ensure_node(&[NodeKind::EsxiHost], &id, props);
            store.add_edge(EdgeKind::Contains, &parent, &id, Properties::new());

            for vm in bag.refs("vm") {
                work.push_back(WorkItem::Vm {
                    obj: vm,
                    parent: id.clone(),
                });
            }
            for ds in bag.refs("datastore") {
                work.push_back(WorkItem::Datastore { obj: ds });
            }
            for net in bag.refs("network") {
                work.push_back(WorkItem::Network { obj: net });
            }
        }

        WorkItem::Vm { obj, parent } => {
            let bag = source
                .retrieve(
                    &obj,
                    &["name", "config", "guest", "runtime", "summary", "datastore", "network"],
                )
                .await?;
            let id = entity_id(NodeKind::Vm, host, &obj.moid);
            let props = vm_properties(&bag, &obj);
            store.ensure_node(&[NodeKind::Vm], &id, props);
            store.add_edge(EdgeKind::Hosts, &parent, &id, Properties::new());

            for ds in bag.refs("datastore") {
                let ds_id = entity_id(NodeKind::Datastore, host, &ds.moid);
                work.push_back(WorkItem::Datastore { obj: ds });
                store.add_edge(EdgeKind::UsesDatastore, &id, ds_id, Properties::new());
            }
            for net in bag.refs("network") {
                let net_id = entity_id(NodeKind::Network, host, &net.moid);
                work.push_back(WorkItem::Network { obj: net });
                store.add_edge(EdgeKind::UsesNetwork, &id, net_id, Properties::new());
            }
        }

        WorkItem::ResourcePool { obj } => {
            let bag = source.retrieve(&obj, &["name", "resourcePool"]).await?;
            let id = entity_id(NodeKind::ResourcePool, host, &obj.moid);
            store.ensure_node(
                &[NodeKind::ResourcePool],
                &id,
                base_props(bag.string("name"), &obj.moid),
            );
            for child in bag.refs("resourcePool") {
                work.push_back(WorkItem::ResourcePool { obj: child });
            }
        }

        WorkItem::Datastore { obj } => {
            let bag = source.retrieve(&obj, &["name", "summary"]).await?;
            let id = entity_id(NodeKind::Datastore, host, &obj.moid);
            let mut props = base_props(bag.string("name"), &obj.moid);
            if let Some(s) = bag.string("summary.type") {
                props.insert("type".to_string(), json!(s));
            }
            for (key, path) in [
                ("capacity", "summary.capacity"),
                ("freeSpace", "summary.freeSpace"),
            ] {
                if let Some(n) = bag.int(path) {
                    props.insert(key.to_string(), json!(n.to_string()));
                }
            }
            if let Some(b) = bag.boolean("summary.accessible") {
                props.insert("accessible".to_string(), json!(b));
            }
            if let Some(s) = bag.string("summary.url") {
                props.insert("url".to_string(), json!(s));
            }
            store.ensure_node(&[NodeKind::Datastore], &id, props);
        }

        WorkItem::Network { obj } => {
            let bag = source.retrieve(&obj, &["name"]).await?;
            let kind = if obj.kind == "DistributedVirtualPortgroup" {
                NodeKind::DvPortgroup
            } else {
                NodeKind::Network
            };
            let id = entity_id(NodeKind::Network, host, &obj.moid);
            let mut props = base_props(bag.string("name"), &obj.moid);
            props.insert("type".to_string(), json!(obj.kind));
            props.insert("kind".to_string(), json!(kind.base_name()));
            store.ensure_node(&[kind], &id, props);
        }
    }
    Ok(())
}

fn dispatch_compute_child(child: ObjectRef, parent: &str, work: &mut VecDeque<WorkItem>) {
    match child.kind.as_str() {
        "Folder" => work.push_back(WorkItem::ComputeFolder {
            obj: child,
            parent: parent.to_string(),
        }),
        "ClusterComputeResource" => work.push_back(WorkItem::Cluster {
            obj: child,
            parent: parent.to_string(),
        }),
        "ComputeResource" => work.push_back(WorkItem::ComputeResource {
            obj: child,
            parent: parent.to_string(),
        }),
        "HostSystem" => work.push_back(WorkItem::Host {
            obj: child,
            parent: parent.to_string(),
            standalone: true,
        }),
        other => debug!(kind = other, "skipping unhandled compute child"),
    }
}

fn base_props(name: Option<&str>, moid: &str) -> Properties {
    Properties::from_iter([
        ("name".to_string(), json!(name.unwrap_or(moid))),
        ("moid".to_string(), json!(moid)),
    ])
}

fn vm_properties(bag: &PropertyBag, obj: &ObjectRef) -> Properties {
    let mut props = base_props(bag.string("name"), &obj.moid);

    for (key, path) in [
        ("guestFullName", "config.guestFullName"),
        ("guestId", "config.guestId"),
        ("version", "config.version"),
        ("uuid", "config.uuid"),
    ] {
        if let Some(s) = bag.string(path) {
            props.insert(key.to_string(), json!(s));
        }
    }
    if let Some(b) = bag.boolean("config.template") {
        props.insert("isTemplate".to_string(), json!(b));
    }
    if let Some(n) = bag.int("config.hardware.numCPU") {
        if n > 0 {
            props.insert("numCPU".to_string(), json!(n));
            if let Some(c) = bag.int("config.hardware.numCoresPerSocket") {
                props.insert("numCoresPerSocket".to_string(), json!(c));
            }
            if let Some(m) = bag.int("config.hardware.memoryMB") {
                props.insert("memoryMB".to_string(), json!(m));
            }
        }
    }

    if let Some(s) = bag.string("runtime.powerState") {
        props.insert("powerState".to_string(), json!(s));
        if let Some(c) = bag.string("runtime.connectionState") {
            props.insert("connectionState".to_string(), json!(c));
        }
        props.insert(
            "bootTime".to_string(),
            json!(bag.string("runtime.bootTime").unwrap_or("None")),
        );
    }

    if let Some(s) = bag.string("guest.toolsStatus") {
        props.insert("toolsStatus".to_string(), json!(s));
    }
    if let Some(s) = bag.string("guest.toolsVersion") {
        props.insert("toolsVersion".to_string(), json!(s));
    }
    if let Some(s) = bag.string("guest.hostName") {
        props.insert("hostName".to_string(), json!(s));
    }

    // Deterministic IP list: collect into a set, then emit sorted. Map
    // iteration order must never leak into the output.
    let mut ips: BTreeSet<String> = BTreeSet::new();
    if let Some(ip) = bag.string("guest.ipAddress") {
        if !ip.is_empty() {
            ips.insert(ip.to_string());
        }
    }
    if let Some(net) = bag.lookup("guest.net") {
        collect_nic_ips(net, &mut ips);
    }
    if !ips.is_empty() {
        let list: Vec<Value> = ips.into_iter().map(Value::String).collect();
        props.insert("ipAddresses".to_string(), Value::Array(list));
    }

    if let Some(committed) = bag.int("summary.storage.committed") {
        let uncommitted = bag.int("summary.storage.uncommitted").unwrap_or(0);
        props.insert(
            "storageCommitted".to_string(),
            json!(bytes_to_human(committed as f64)),
        );
        props.insert(
            "storageUncommitted".to_string(),
            json!(bytes_to_human(uncommitted as f64)),
        );
        props.insert(
            "storageTotalUsed".to_string(),
            json!(bytes_to_human((committed + uncommitted) as f64)),
        );
    }

    props
}

fn collect_nic_ips(value: &crate::types::PropValue, ips: &mut BTreeSet<String>) {
    use crate::types::PropValue;
    if let PropValue::List(nics) = value {
        for nic in nics {
            if let Some(map) = nic.as_map() {
                if let Some(addresses) = map.get("ipAddress") {
                    match addresses {
                        PropValue::Str(ip) => {
                            ips.insert(ip.clone());
                        }
                        PropValue::List(list) => {
                            for ip in list {
                                if let Some(s) = ip.as_str() {
                                    ips.insert(s.to_string());
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}

/// Human-readable byte figure, matching the established output format.
fn bytes_to_human(mut bytes: f64) -> String {
    if bytes == 0.0 {
        return "0 B".to_string();
    }
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if bytes < 1024.0 {
            return format!("{bytes:.1} {unit}");
        }
        bytes /= 1024.0;
    }
    format!("{bytes:.1} PB")
}
