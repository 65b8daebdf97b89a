//! Service definition model
//!
//! Deserialized form of an AWS-style service definition: metadata,
//! operations, and the shape graph the operations reference. The graph may
//! be cyclic through structure members; generators bound their traversal
//! with per-invocation memoization.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{Error, JsonValue, Result};

/// Shape kinds appearing in a service definition.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Structure,
    List,
    Map,
    String,
    Boolean,
    Integer,
    Long,
    Blob,
    Timestamp,
}

/// The part of an HTTP request or response in which a member travels.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Payload,
    Header,
    Headers,
    Uri,
    QueryString,
}

#[derive(Clone, Debug, Deserialize)]
pub struct XmlNamespace {
    pub uri: String,
}

/// A reference from a structure, list, or map to another shape.
#[derive(Clone, Debug, Deserialize)]
pub struct Member {
    pub shape: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(rename = "locationName", default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub streaming: bool,
    #[serde(rename = "xmlAttribute", default)]
    pub xml_attribute: bool,
    #[serde(rename = "xmlNamespace", default)]
    pub xml_namespace: Option<XmlNamespace>,
    #[serde(default)]
    pub documentation: Option<String>,
}

impl Member {
    /// wire name of the member: its locationName, falling back to the given member name
    pub fn wire_name<'n>(&'n self, member_name: &'n str) -> &'n str {
        self.location_name.as_deref().unwrap_or(member_name)
    }
}

/// A named node in the shape graph.
#[derive(Clone, Debug, Deserialize)]
pub struct Shape {
    #[serde(rename = "type")]
    pub shape_type: ShapeType,
    /// structure members, in definition order
    #[serde(default)]
    pub members: IndexMap<String, Member>,
    #[serde(default)]
    pub required: Vec<String>,
    /// distinguished payload member, at most one per structure
    #[serde(default)]
    pub payload: Option<String>,
    /// list element
    #[serde(default)]
    pub member: Option<Member>,
    /// map key and value
    #[serde(default)]
    pub key: Option<Member>,
    #[serde(default)]
    pub value: Option<Member>,
    #[serde(default)]
    pub documentation: Option<String>,
}

impl Shape {
    pub fn is_required(&self, member_name: &str) -> bool {
        self.required.iter().any(|r| r == member_name)
    }

    pub fn has_required_members(&self) -> bool {
        !self.required.is_empty()
    }

    /// list element member, or an error naming the shape
    pub fn list_member(&self, shape_name: &str) -> Result<&Member> {
        self.member
            .as_ref()
            .ok_or_else(|| Error::UnsupportedShape(shape_name.to_string(), "list without member".to_string()))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct HttpBinding {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(rename = "requestUri", default = "default_uri")]
    pub request_uri: String,
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_uri() -> String {
    "/".to_string()
}

impl Default for HttpBinding {
    fn default() -> Self {
        HttpBinding { method: default_method(), request_uri: default_uri() }
    }
}

/// Reference from an operation to its input or output shape.
#[derive(Clone, Debug, Deserialize)]
pub struct ShapeRef {
    pub shape: String,
    #[serde(rename = "resultWrapper", default)]
    pub result_wrapper: Option<String>,
}

/// One or many pagination result keys.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ResultKey {
    One(String),
    Many(Vec<String>),
}

/// Pagination descriptor. Only `result_key` drives code generation; the
/// token fields are recognized so real paginator documents deserialize.
#[derive(Clone, Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub result_key: Option<ResultKey>,
    #[serde(default)]
    pub input_token: Option<JsonValue>,
    #[serde(default)]
    pub output_token: Option<JsonValue>,
    #[serde(default)]
    pub limit_key: Option<String>,
    #[serde(default)]
    pub more_results: Option<String>,
}

impl Pagination {
    /// declared result keys in definition order; empty when absent
    pub fn result_keys(&self) -> Vec<&str> {
        match &self.result_key {
            Some(ResultKey::One(key)) => vec![key.as_str()],
            Some(ResultKey::Many(keys)) => keys.iter().map(|k| k.as_str()).collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub http: HttpBinding,
    #[serde(default)]
    pub input: Option<ShapeRef>,
    #[serde(default)]
    pub output: Option<ShapeRef>,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(rename = "documentationUrl", default)]
    pub documentation_url: Option<String>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Metadata {
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
    #[serde(rename = "endpointPrefix", default)]
    pub endpoint_prefix: Option<String>,
    #[serde(rename = "signatureVersion", default)]
    pub signature_version: Option<String>,
    #[serde(rename = "serviceFullName", default)]
    pub service_full_name: Option<String>,
    #[serde(rename = "serviceAbbreviation", default)]
    pub service_abbreviation: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
}

/// Read-only queries the generator makes against a service definition.
///
/// Absence of documentation is benign; absence of a referenced shape is
/// fatal and surfaces through [`resolve_shape`](ServiceDefinition::resolve_shape).
pub trait ServiceDefinition {
    fn operation(&self, name: &str) -> Option<&Operation>;
    fn shape(&self, name: &str) -> Option<&Shape>;
    /// all shape names, in definition order
    fn shape_names(&self) -> Vec<&str>;
    fn api_version(&self) -> &str;
    fn endpoint_prefix(&self) -> Option<&str>;
    fn signature_version(&self) -> Option<&str>;
    fn service_full_name(&self) -> Option<&str>;
    fn operation_documentation(&self, name: &str) -> Option<&str>;
    fn operation_pagination(&self, name: &str) -> Option<&Pagination>;
    /// documentation for one member of a shape, consulting the split docs
    /// model first and the member's inline documentation second
    fn parameter_documentation(
        &self,
        shape_name: &str,
        member_name: &str,
        member_shape: &str,
    ) -> Option<String>;
    /// documentation for a shape itself
    fn shape_documentation(&self, name: &str) -> Option<String>;

    /// shape lookup that treats absence as a schema error
    fn resolve_shape(&self, name: &str) -> Result<&Shape> {
        self.shape(name).ok_or_else(|| Error::MissingShape(name.to_string()))
    }
}

/// Split documentation model, the shape of an AWS `docs-2` document:
/// per-shape base documentation plus per-reference overrides.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DocsModel {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub operations: IndexMap<String, String>,
    #[serde(default)]
    pub shapes: IndexMap<String, ShapeDocs>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ShapeDocs {
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub refs: IndexMap<String, String>,
}

/// A service definition deserialized from its JSON document, optionally
/// paired with a split docs document.
#[derive(Debug, Deserialize)]
pub struct JsonServiceDefinition {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub operations: IndexMap<String, Operation>,
    #[serde(default)]
    pub shapes: IndexMap<String, Shape>,
    #[serde(skip)]
    pub docs: Option<DocsModel>,
}

impl JsonServiceDefinition {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("service definition: {}", e)))
    }

    /// attach a docs-2 style documentation document
    pub fn with_docs(mut self, json: &str) -> Result<Self> {
        let docs = serde_json::from_str(json).map_err(|e| Error::Config(format!("docs model: {}", e)))?;
        self.docs = Some(docs);
        Ok(self)
    }
}

impl ServiceDefinition for JsonServiceDefinition {
    fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    fn shape(&self, name: &str) -> Option<&Shape> {
        self.shapes.get(name)
    }

    fn shape_names(&self) -> Vec<&str> {
        self.shapes.keys().map(|k| k.as_str()).collect()
    }

    fn api_version(&self) -> &str {
        &self.metadata.api_version
    }

    fn endpoint_prefix(&self) -> Option<&str> {
        self.metadata.endpoint_prefix.as_deref()
    }

    fn signature_version(&self) -> Option<&str> {
        self.metadata.signature_version.as_deref()
    }

    fn service_full_name(&self) -> Option<&str> {
        self.metadata
            .service_abbreviation
            .as_deref()
            .or(self.metadata.service_full_name.as_deref())
    }

    fn operation_documentation(&self, name: &str) -> Option<&str> {
        if let Some(docs) = &self.docs {
            if let Some(text) = docs.operations.get(name) {
                return Some(text.as_str());
            }
        }
        self.operations.get(name).and_then(|op| op.documentation.as_deref())
    }

    fn operation_pagination(&self, name: &str) -> Option<&Pagination> {
        self.operations.get(name).and_then(|op| op.pagination.as_ref())
    }

    fn parameter_documentation(
        &self,
        shape_name: &str,
        member_name: &str,
        member_shape: &str,
    ) -> Option<String> {
        if let Some(docs) = &self.docs {
            if let Some(shape_docs) = docs.shapes.get(shape_name) {
                if let Some(text) = shape_docs.refs.get(member_name) {
                    return Some(text.clone());
                }
            }
            if let Some(target_docs) = docs.shapes.get(member_shape) {
                if let Some(text) = &target_docs.base {
                    return Some(text.clone());
                }
            }
        }
        self.shapes
            .get(shape_name)
            .and_then(|s| s.members.get(member_name))
            .and_then(|m| m.documentation.clone())
    }

    fn shape_documentation(&self, name: &str) -> Option<String> {
        if let Some(docs) = &self.docs {
            if let Some(shape_docs) = docs.shapes.get(name) {
                if let Some(text) = &shape_docs.base {
                    return Some(text.clone());
                }
            }
        }
        self.shapes.get(name).and_then(|s| s.documentation.clone())
    }
}
