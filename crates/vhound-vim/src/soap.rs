//! SOAP envelope construction and loose XML decoding.
//!
//! The VIM wire format is not mapped onto typed structs: responses are read
//! into a generic element tree and converted to [`PropValue`] on demand.
//! Managed object references carry a bare `type` attribute; typed scalars
//! carry an `xsi:type`; everything else is inferred from the text.

use quick_xml::events::Event;
use quick_xml::Reader;

use vhound_collector::types::{ObjectRef, PropValue};
use vhound_collector::{CollectorError, CollectorResult};

/// One parsed XML element.
#[derive(Debug, Clone, Default)]
pub(crate) struct XmlNode {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Attribute by exact key.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `xsi:type` attribute under any namespace prefix, with any
    /// `xsd:`-style prefix stripped from the value.
    pub fn xsi_type(&self) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.ends_with(":type"))
            .map(|(_, v)| v.rsplit(':').next().unwrap_or(v))
    }

    /// Direct children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First descendant with the given local name, depth-first.
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given local name, depth-first.
    pub fn find_all<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlNode>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.find_all(name, out);
        }
    }
}

/// Parse a full response document into a synthetic root node.
pub(crate) fn parse_document(xml: &str) -> CollectorResult<XmlNode> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = vec![XmlNode::default()];
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                stack.push(element(&start)?);
            }
            Ok(Event::Empty(start)) => {
                let node = element(&start)?;
                attach(&mut stack, node)?;
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| CollectorError::protocol("unbalanced xml end tag"))?;
                attach(&mut stack, node)?;
            }
            Ok(Event::Text(text)) => {
                let value = text
                    .unescape()
                    .map_err(|err| CollectorError::protocol(err.to_string()))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&value);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(CollectorError::protocol(err.to_string())),
        }
    }
    stack
        .pop()
        .filter(|_| stack.is_empty())
        .ok_or_else(|| CollectorError::protocol("unbalanced xml document"))
}

fn element(start: &quick_xml::events::BytesStart<'_>) -> CollectorResult<XmlNode> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| CollectorError::protocol(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| CollectorError::protocol(err.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(XmlNode {
        name,
        attrs,
        text: String::new(),
        children: Vec::new(),
    })
}

fn attach(stack: &mut Vec<XmlNode>, node: XmlNode) -> CollectorResult<()> {
    stack
        .last_mut()
        .ok_or_else(|| CollectorError::protocol("xml element outside document root"))?
        .children
        .push(node);
    Ok(())
}

/// The SOAP fault message, if the document is a fault.
pub(crate) fn fault_message(root: &XmlNode) -> Option<String> {
    root.find("faultstring").map(|node| node.text.clone())
}

/// Convert one element to a property value.
///
/// A bare `type` attribute plus text is a managed object reference. An
/// `ArrayOf*` `xsi:type` is a list of its children. Childless elements are
/// scalars typed by `xsi:type` when present, inferred from the text
/// otherwise. Anything else becomes a map, with repeated child names
/// collapsing into a list under that key.
pub(crate) fn node_to_prop(node: &XmlNode) -> PropValue {
    if let Some(kind) = node.attr("type") {
        if !node.text.is_empty() {
            return PropValue::Ref(ObjectRef::new(kind, node.text.clone()));
        }
    }

    if node.children.is_empty() {
        return scalar(node);
    }

    if node
        .xsi_type()
        .is_some_and(|t| t.starts_with("ArrayOf"))
    {
        return PropValue::List(node.children.iter().map(node_to_prop).collect());
    }

    let mut grouped: std::collections::BTreeMap<String, Vec<PropValue>> = Default::default();
    for child in &node.children {
        grouped
            .entry(child.name.clone())
            .or_default()
            .push(node_to_prop(child));
    }
    PropValue::Map(
        grouped
            .into_iter()
            .map(|(name, mut values)| {
                let value = if values.len() == 1 {
                    values.remove(0)
                } else {
                    PropValue::List(values)
                };
                (name, value)
            })
            .collect(),
    )
}

fn scalar(node: &XmlNode) -> PropValue {
    let text = node.text.as_str();
    match node.xsi_type() {
        Some("boolean") => PropValue::Bool(text == "true" || text == "1"),
        Some("byte" | "short" | "int" | "long") => text
            .parse::<i64>()
            .map(PropValue::Int)
            .unwrap_or_else(|_| PropValue::Str(text.to_string())),
        Some(_) => PropValue::Str(text.to_string()),
        None => {
            if text.is_empty() {
                PropValue::Null
            } else if text == "true" || text == "false" {
                PropValue::Bool(text == "true")
            } else if let Ok(n) = text.parse::<i64>() {
                PropValue::Int(n)
            } else {
                PropValue::Str(text.to_string())
            }
        }
    }
}

/// Wrap an operation body in the SOAP envelope.
pub(crate) fn envelope(body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/""#,
            r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#,
            r#" xmlns:xsd="http://www.w3.org/2001/XMLSchema">"#,
            "<soapenv:Body>{}</soapenv:Body></soapenv:Envelope>"
        ),
        body
    )
}

/// Escape text for inclusion in an element or attribute.
pub(crate) fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mor_with_type_attribute() {
        let root = parse_document(
            r#"<returnval type="Folder">group-d1</returnval>"#,
        )
        .unwrap();
        let value = node_to_prop(&root.children[0]);
        assert_eq!(
            value,
            PropValue::Ref(ObjectRef::new("Folder", "group-d1"))
        );
    }

    #[test]
    fn parses_typed_array_into_list() {
        let xml = r#"<val xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
            xsi:type="ArrayOfManagedObjectReference">
            <ManagedObjectReference type="HostSystem">host-9</ManagedObjectReference>
            <ManagedObjectReference type="HostSystem">host-10</ManagedObjectReference>
        </val>"#;
        let root = parse_document(xml).unwrap();
        let value = node_to_prop(&root.children[0]);
        assert_eq!(value.as_refs().len(), 2);
        assert_eq!(value.as_refs()[0].moid, "host-9");
    }

    #[test]
    fn parses_struct_into_nested_map() {
        let xml = r#"<val xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
            xsi:type="HostHardwareSummary">
            <vendor>Dell Inc.</vendor>
            <numCpuCores>32</numCpuCores>
            <inMaintenanceMode>false</inMaintenanceMode>
        </val>"#;
        let root = parse_document(xml).unwrap();
        let value = node_to_prop(&root.children[0]);
        let map = value.as_map().unwrap();
        assert_eq!(map.get("vendor"), Some(&PropValue::Str("Dell Inc.".into())));
        assert_eq!(map.get("numCpuCores"), Some(&PropValue::Int(32)));
        assert_eq!(map.get("inMaintenanceMode"), Some(&PropValue::Bool(false)));
    }

    #[test]
    fn repeated_child_names_collapse_into_a_list() {
        let xml = r#"<guest>
            <net><ipAddress>10.0.0.5</ipAddress></net>
            <net><ipAddress>10.0.0.6</ipAddress></net>
        </guest>"#;
        let root = parse_document(xml).unwrap();
        let value = node_to_prop(&root.children[0]);
        let map = value.as_map().unwrap();
        match map.get("net") {
            Some(PropValue::List(items)) => assert_eq!(items.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn typed_scalars_decode() {
        let xml = r#"<r xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
            <a xsi:type="xsd:boolean">true</a>
            <b xsi:type="xsd:long">274726912000</b>
            <c xsi:type="xsd:string">3001</c>
        </r>"#;
        let root = parse_document(xml).unwrap();
        let value = node_to_prop(&root.children[0]);
        let map = value.as_map().unwrap();
        assert_eq!(map.get("a"), Some(&PropValue::Bool(true)));
        assert_eq!(map.get("b"), Some(&PropValue::Int(274726912000)));
        assert_eq!(map.get("c"), Some(&PropValue::Str("3001".into())));
    }

    #[test]
    fn fault_message_is_extracted() {
        let xml = r#"<Envelope><Body><Fault>
            <faultcode>ServerFaultCode</faultcode>
            <faultstring>Cannot complete login</faultstring>
        </Fault></Body></Envelope>"#;
        let root = parse_document(xml).unwrap();
        assert_eq!(
            fault_message(&root).as_deref(),
            Some("Cannot complete login")
        );
    }

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(
            xml_escape(r#"a<b>&"c'"#),
            "a&lt;b&gt;&amp;&quot;c&apos;"
        );
    }
}
