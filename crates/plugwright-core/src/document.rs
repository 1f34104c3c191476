//! Structured document editing for native project files.
//!
//! XML manifests and resource files are parsed with `roxmltree` into an owned
//! tree, edited in place and serialized back. Whitespace text between elements
//! is kept so that an added-then-removed child leaves the document as it was.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PlugwrightError, Result};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name (`prefix:local` when namespaced)
    pub name: String,
    /// Attributes in document order, namespace declarations included
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self
                .attributes
                .push((name.to_string(), value.to_string())),
        }
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|(k, _)| k != name);
        self.attributes.len() != before
    }

    /// Concatenated text content of direct text children
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                XmlNode::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children with a single text node
    pub fn set_text(&mut self, text: &str) {
        self.children = vec![XmlNode::Text(text.to_string())];
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First child element named `name` whose `attr` equals `value`
    pub fn find_child(&self, name: &str, attr: &str, value: &str) -> Option<&XmlElement> {
        self.child_elements()
            .find(|e| e.name == name && e.attribute(attr) == Some(value))
    }

    pub fn find_child_mut(
        &mut self,
        name: &str,
        attr: &str,
        value: &str,
    ) -> Option<&mut XmlElement> {
        self.child_elements_mut()
            .find(|e| e.name == name && e.attribute(attr) == Some(value))
    }

    /// Same element name and identical values for every key attribute.
    /// An empty key compares every attribute of `pattern`.
    pub fn matches(&self, pattern: &XmlElement, key: &[String]) -> bool {
        if self.name != pattern.name {
            return false;
        }
        if key.is_empty() {
            return pattern
                .attributes
                .iter()
                .all(|(k, v)| self.attribute(k) == Some(v.as_str()));
        }
        key.iter()
            .all(|k| self.attribute(k) == pattern.attribute(k))
    }

    /// Append a child element, reusing the indentation of existing children
    pub fn add_child(&mut self, child: XmlElement) {
        let indent = self.children.iter().find_map(|n| match n {
            XmlNode::Text(t) if is_whitespace(t) && t.contains('\n') => Some(t.clone()),
            _ => None,
        });
        let insert_at = match self.children.last() {
            Some(XmlNode::Text(t)) if is_whitespace(t) => self.children.len() - 1,
            _ => self.children.len(),
        };

        let mut nodes = Vec::with_capacity(2);
        if let Some(indent) = indent {
            nodes.push(XmlNode::Text(indent));
        }
        nodes.push(XmlNode::Element(child));
        self.children.splice(insert_at..insert_at, nodes);
    }

    /// Remove every child matching `pattern` by `key`, together with the
    /// whitespace that precedes it. Returns the number removed.
    pub fn remove_children_matching(&mut self, pattern: &XmlElement, key: &[String]) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.children.len() {
            let is_match =
                matches!(&self.children[i], XmlNode::Element(e) if e.matches(pattern, key));
            if !is_match {
                i += 1;
                continue;
            }

            self.children.remove(i);
            if i > 0 && matches!(&self.children[i - 1], XmlNode::Text(t) if is_whitespace(t)) {
                self.children.remove(i - 1);
                i -= 1;
            }
            removed += 1;
        }
        removed
    }

    fn visit_path_mut(&mut self, segments: &[&str], f: &mut dyn FnMut(&mut XmlElement)) {
        let Some((first, rest)) = segments.split_first() else {
            f(self);
            return;
        };
        for child in self.child_elements_mut() {
            if segment_matches(first, &child.name) {
                child.visit_path_mut(rest, f);
            }
        }
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&escape(v, true));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str(" />");
            return;
        }
        out.push('>');
        for child in &self.children {
            write_node(child, out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// An XML document: comments before the root element, and the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub prolog: Vec<XmlNode>,
    pub root: XmlElement,
}

impl XmlDocument {
    pub fn parse(text: &str) -> std::result::Result<Self, roxmltree::Error> {
        let doc = roxmltree::Document::parse(text)?;
        let prolog = doc
            .root()
            .children()
            .take_while(|n| !n.is_element())
            .filter(|n| n.is_comment())
            .map(|n| XmlNode::Comment(n.text().unwrap_or_default().to_string()))
            .collect();

        Ok(Self {
            prolog,
            root: convert_element(doc.root_element()),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| PlugwrightError::XmlParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_xml_string())?;
        Ok(())
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::from(XML_DECLARATION);
        out.push('\n');
        for node in &self.prolog {
            write_node(node, &mut out);
            out.push('\n');
        }
        self.root.write_to(&mut out);
        out.push('\n');
        out
    }

    /// Resolve a slash-separated element path such as
    /// `manifest/application`. The first segment names the root; `*`
    /// matches any element and an empty path (or `/*`) is the root itself.
    pub fn find_path(&self, path: &str) -> Option<&XmlElement> {
        let segments = path_segments(path);
        let Some((first, rest)) = segments.split_first() else {
            return Some(&self.root);
        };
        if !segment_matches(first, &self.root.name) {
            return None;
        }
        let mut current = &self.root;
        for segment in rest {
            current = current
                .child_elements()
                .find(|e| segment_matches(segment, &e.name))?;
        }
        Some(current)
    }

    pub fn find_path_mut(&mut self, path: &str) -> Option<&mut XmlElement> {
        let segments = path_segments(path);
        let Some((first, rest)) = segments.split_first() else {
            return Some(&mut self.root);
        };
        if !segment_matches(first, &self.root.name) {
            return None;
        }
        let mut current = &mut self.root;
        for segment in rest {
            current = current
                .child_elements_mut()
                .find(|e| segment_matches(segment, &e.name))?;
        }
        Some(current)
    }

    /// Call `f` on every element at `path`
    pub fn for_each_at_path_mut(&mut self, path: &str, mut f: impl FnMut(&mut XmlElement)) {
        let segments = path_segments(path);
        let Some((first, rest)) = segments.split_first() else {
            f(&mut self.root);
            return;
        };
        if segment_matches(first, &self.root.name) {
            self.root.visit_path_mut(rest, &mut f);
        }
    }

    /// Add the patch's element under its parent unless an element with the
    /// same key attributes is already there. Returns whether the document
    /// changed.
    pub fn apply_patch(&mut self, patch: &DocumentPatch) -> Result<bool> {
        let pattern = patch.to_element();
        let parent = self
            .find_path_mut(&patch.parent)
            .ok_or_else(|| PlugwrightError::DocumentPatch {
                file: patch.file.clone(),
                message: format!("parent element '{}' not found", patch.parent),
            })?;

        if parent.child_elements().any(|e| e.matches(&pattern, &patch.key)) {
            return Ok(false);
        }
        parent.add_child(pattern);
        Ok(true)
    }

    /// Remove the patch's element, matched by the same key attributes used
    /// to add it. A missing parent removes nothing.
    pub fn revert_patch(&mut self, patch: &DocumentPatch) -> usize {
        let pattern = patch.to_element();
        match self.find_path_mut(&patch.parent) {
            Some(parent) => parent.remove_children_matching(&pattern, &patch.key),
            None => 0,
        }
    }
}

/// A keyed element insertion into a structured document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPatch {
    /// Document path relative to the platform project root
    pub file: PathBuf,
    /// Slash-separated path of the parent element
    pub parent: String,
    /// Name of the element to add
    pub element: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Attributes identifying the element; empty means all attributes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key: Vec<String>,
}

impl DocumentPatch {
    pub fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new(&self.element);
        for (k, v) in &self.attributes {
            element.set_attribute(k, v);
        }
        element
    }
}

fn convert_element(node: roxmltree::Node<'_, '_>) -> XmlElement {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    let mut attributes = Vec::new();
    for ns in node.namespaces() {
        if ns.name() == Some("xml") || inherited.contains(&(ns.name(), ns.uri())) {
            continue;
        }
        let key = match ns.name() {
            Some(prefix) => format!("xmlns:{}", prefix),
            None => "xmlns".to_string(),
        };
        attributes.push((key, ns.uri().to_string()));
    }
    for attr in node.attributes() {
        attributes.push((
            qualified_name(node, attr.namespace(), attr.name()),
            attr.value().to_string(),
        ));
    }

    let children = node
        .children()
        .filter_map(|child| {
            if child.is_element() {
                Some(XmlNode::Element(convert_element(child)))
            } else if child.is_text() {
                child.text().map(|t| XmlNode::Text(t.to_string()))
            } else if child.is_comment() {
                child.text().map(|t| XmlNode::Comment(t.to_string()))
            } else {
                None
            }
        })
        .collect();

    XmlElement {
        name: qualified_name(node, node.tag_name().namespace(), node.tag_name().name()),
        attributes,
        children,
    }
}

fn qualified_name(node: roxmltree::Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    match namespace.and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
        _ => local.to_string(),
    }
}

fn write_node(node: &XmlNode, out: &mut String) {
    match node {
        XmlNode::Element(e) => e.write_to(out),
        XmlNode::Text(t) => out.push_str(&escape(t, false)),
        XmlNode::Comment(c) => {
            out.push_str("<!--");
            out.push_str(c);
            out.push_str("-->");
        }
    }
}

fn escape(value: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn path_segments(path: &str) -> Vec<&str> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments == ["*"] {
        Vec::new()
    } else {
        segments
    }
}

fn segment_matches(segment: &str, name: &str) -> bool {
    segment == "*" || segment == name
}

fn is_whitespace(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example.hello" android:versionName="0.0.1">
    <application android:label="@string/app_name">
        <activity android:name="MainActivity" android:screenOrientation="unspecified" />
    </application>
</manifest>
"#;

    fn activity_patch() -> DocumentPatch {
        DocumentPatch {
            file: PathBuf::from("AndroidManifest.xml"),
            parent: "manifest/application".to_string(),
            element: "activity".to_string(),
            attributes: BTreeMap::from([
                ("android:name".to_string(), "CameraActivity".to_string()),
                ("android:label".to_string(), "Camera".to_string()),
            ]),
            key: vec!["android:name".to_string()],
        }
    }

    #[test]
    fn test_parse_keeps_namespace_prefixes() {
        let doc = XmlDocument::parse(MANIFEST).unwrap();
        assert_eq!(doc.root.name, "manifest");
        assert_eq!(
            doc.root.attribute("xmlns:android"),
            Some("http://schemas.android.com/apk/res/android")
        );
        assert_eq!(doc.root.attribute("android:versionName"), Some("0.0.1"));

        let activity = doc.find_path("manifest/application/activity").unwrap();
        assert_eq!(activity.attribute("android:name"), Some("MainActivity"));
    }

    #[test]
    fn test_serialize_reparses_to_same_tree() {
        let doc = XmlDocument::parse(MANIFEST).unwrap();
        let reparsed = XmlDocument::parse(&doc.to_xml_string()).unwrap();
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn test_apply_then_revert_restores_document() {
        let original = XmlDocument::parse(MANIFEST).unwrap();
        let mut doc = original.clone();

        assert!(doc.apply_patch(&activity_patch()).unwrap());
        assert_eq!(
            doc.find_path("manifest/application")
                .unwrap()
                .child_elements()
                .count(),
            2
        );

        assert_eq!(doc.revert_patch(&activity_patch()), 1);
        assert_eq!(doc, original);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut doc = XmlDocument::parse(MANIFEST).unwrap();
        assert!(doc.apply_patch(&activity_patch()).unwrap());
        assert!(!doc.apply_patch(&activity_patch()).unwrap());
    }

    #[test]
    fn test_revert_matches_by_key_not_position() {
        let mut doc = XmlDocument::parse(MANIFEST).unwrap();
        doc.apply_patch(&activity_patch()).unwrap();

        // Label changed after install; key attribute still identifies it
        doc.find_path_mut("manifest/application")
            .unwrap()
            .find_child_mut("activity", "android:name", "CameraActivity")
            .unwrap()
            .set_attribute("android:label", "Renamed");

        assert_eq!(doc.revert_patch(&activity_patch()), 1);
        let app = doc.find_path("manifest/application").unwrap();
        assert!(app
            .find_child("activity", "android:name", "MainActivity")
            .is_some());
        assert!(app
            .find_child("activity", "android:name", "CameraActivity")
            .is_none());
    }

    #[test]
    fn test_apply_missing_parent_fails() {
        let mut doc = XmlDocument::parse(MANIFEST).unwrap();
        let mut patch = activity_patch();
        patch.parent = "manifest/nothing".to_string();
        let err = doc.apply_patch(&patch).unwrap_err();
        assert!(matches!(err, PlugwrightError::DocumentPatch { .. }));
    }

    #[test]
    fn test_root_path_wildcard() {
        let doc = XmlDocument::parse("<widget><plugin name=\"a\" /></widget>").unwrap();
        assert_eq!(doc.find_path("/*").unwrap().name, "widget");
        assert_eq!(doc.find_path("").unwrap().name, "widget");
        assert!(doc.find_path("other").is_none());
    }

    #[test]
    fn test_set_and_remove_attribute() {
        let mut el = XmlElement::new("activity").with_attribute("a", "1");
        el.set_attribute("a", "2");
        el.set_attribute("b", "3");
        assert_eq!(el.attributes.len(), 2);
        assert_eq!(el.attribute("a"), Some("2"));
        assert!(el.remove_attribute("a"));
        assert!(!el.remove_attribute("a"));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut doc = XmlDocument::parse("<resources><string name=\"app_name\">x</string></resources>").unwrap();
        doc.root
            .find_child_mut("string", "name", "app_name")
            .unwrap()
            .set_text("Tom & Jerry <3");
        let xml = doc.to_xml_string();
        assert!(xml.contains("Tom &amp; Jerry &lt;3"));
        let reparsed = XmlDocument::parse(&xml).unwrap();
        assert_eq!(
            reparsed.root.find_child("string", "name", "app_name").unwrap().text(),
            "Tom & Jerry <3"
        );
    }
}
