//! Graph document file I/O.
//!
//! Files are written as pretty-printed UTF-8 JSON with a leading byte-order
//! mark, for consumers that expect signed UTF-8. The reader accepts files
//! with or without the mark.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{GraphError, GraphResult};
use crate::model::GraphDocument;
use crate::sanitize::sanitize_document;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Sanitize and write the document to `path`.
pub fn write_graph(doc: &GraphDocument, path: &Path) -> GraphResult<()> {
    let mut doc = doc.clone();
    sanitize_document(&mut doc);

    let json = serde_json::to_string_pretty(&doc)?;
    let mut bytes = Vec::with_capacity(UTF8_BOM.len() + json.len() + 1);
    bytes.extend_from_slice(UTF8_BOM);
    bytes.extend_from_slice(json.as_bytes());
    bytes.push(b'\n');

    fs::write(path, bytes).map_err(|source| GraphError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        nodes = doc.graph.nodes.len(),
        edges = doc.graph.edges.len(),
        "graph written"
    );
    Ok(())
}

/// Read a document previously written by [`write_graph`].
pub fn read_graph(path: &Path) -> GraphResult<GraphDocument> {
    let bytes = fs::read(path).map_err(|source| GraphError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let payload = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::NodeKind;
    use crate::model::Properties;
    use crate::store::GraphStore;
    use serde_json::{json, Value};

    #[test]
    fn written_file_starts_with_bom_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");

        let mut store = GraphStore::new();
        store.ensure_node(
            &[NodeKind::Vm],
            "vm:vc01:vm-1",
            Properties::from_iter([("name".to_string(), json!("web01"))]),
        );
        let doc = store.into_document();

        write_graph(&doc, &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], UTF8_BOM);

        let back = read_graph(&path).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn null_properties_are_sanitized_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");

        let mut store = GraphStore::new();
        store.ensure_node(
            &[NodeKind::Vm],
            "vm:vc01:vm-1",
            Properties::from_iter([("bootTime".to_string(), Value::Null)]),
        );
        write_graph(&store.into_document(), &path).unwrap();

        let back = read_graph(&path).unwrap();
        assert_eq!(back.graph.nodes[0].properties["bootTime"], json!(""));
    }

    #[test]
    fn reader_accepts_files_without_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.json");
        fs::write(&path, r#"{"graph":{"nodes":[],"edges":[]}}"#).unwrap();

        let doc = read_graph(&path).unwrap();
        assert!(doc.graph.nodes.is_empty());
    }
}
