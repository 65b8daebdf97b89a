//! Shape graph traversal
//!
//! Produces the per-member code fragments the input and result generators
//! splice into emitted classes: primary-constructor assignments,
//! validation statements, XML deserialization expressions, and the pruned
//! shape config handed to the runtime XML builder.
//!
//! Structure-typed members deserialize through the nested class's
//! `from_xml` constructor instead of inline expansion, so expressions stay
//! finite on cyclic graphs; container chains carry a visited set and a
//! self-referential list or map is a schema error.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;

use crate::{
    definition::{Member, ServiceDefinition, Shape, ShapeType},
    types::{class_name, field_name, TypeMapper},
    Error, JsonValue, Result,
};

pub(crate) struct ShapeWalker<'g> {
    def: &'g dyn ServiceDefinition,
    mapper: TypeMapper<'g>,
}

impl<'g> ShapeWalker<'g> {
    pub fn new(def: &'g dyn ServiceDefinition) -> Self {
        ShapeWalker { def, mapper: TypeMapper::new(def) }
    }

    /// Assignment from the raw input mapping into the emitted property,
    /// for the primary constructor. `scope` is the emitted receiver.
    pub fn constructor_init(&self, member_name: &str, member: &Member, scope: &str) -> Result<String> {
        let field = format!("{}.{}", scope, field_name(member_name));
        if member.streaming {
            return Ok(format!(
                "{} = params.get(\"{}\").map(Value::into_streaming).unwrap_or_default();",
                field, member_name
            ));
        }
        let shape = self.def.resolve_shape(&member.shape)?;
        let stmt = match shape.shape_type {
            ShapeType::Structure => format!(
                "{} = params.get(\"{}\").map(|value| Box::new({}::create(value.into())));",
                field,
                member_name,
                class_name(&member.shape)
            ),
            ShapeType::List => {
                let element = shape.list_member(&member.shape)?;
                let element_shape = self.def.resolve_shape(&element.shape)?;
                if element_shape.shape_type == ShapeType::Structure {
                    format!(
                        "{} = params.list(\"{}\").into_iter().map(|value| {}::create(value.into())).collect();",
                        field,
                        member_name,
                        class_name(&element.shape)
                    )
                } else {
                    format!("{} = params.typed_list(\"{}\");", field, member_name)
                }
            }
            ShapeType::Map => {
                let (_, value) = self.mapper.map_entries(&member.shape, shape)?;
                let value_shape = self.def.resolve_shape(&value.shape)?;
                if value_shape.shape_type == ShapeType::Structure {
                    format!(
                        "{} = params.map(\"{}\").into_iter().map(|(key, value)| (key, {}::create(value.into()))).collect();",
                        field,
                        member_name,
                        class_name(&value.shape)
                    )
                } else {
                    format!("{} = params.typed_map(\"{}\");", field, member_name)
                }
            }
            ShapeType::Timestamp => format!(
                "{} = params.get(\"{}\").map(|value| match value {{\n    Value::DateTime(when) => when,\n    other => DateTime::parse(&other.to_string()),\n}});",
                field, member_name
            ),
            ShapeType::Boolean => format!("{} = params.boolean(\"{}\");", field, member_name),
            ShapeType::Integer => format!("{} = params.integer(\"{}\");", field, member_name),
            ShapeType::Long => format!("{} = params.long(\"{}\");", field, member_name),
            ShapeType::Blob => format!("{} = params.blob(\"{}\");", field, member_name),
            ShapeType::String => format!("{} = params.string(\"{}\");", field, member_name),
        };
        Ok(stmt)
    }

    /// Validation statement for one member. Only structures and lists of
    /// structures recurse; everything else validates shallowly.
    pub fn validate_stmt(&self, member_name: &str, member: &Member) -> Result<Option<String>> {
        if member.streaming {
            return Ok(None);
        }
        let field = field_name(member_name);
        let shape = self.def.resolve_shape(&member.shape)?;
        Ok(match shape.shape_type {
            ShapeType::Structure => Some(format!(
                "if let Some(value) = &self.{} {{\n    value.validate()?;\n}}",
                field
            )),
            ShapeType::List => {
                let element = shape.list_member(&member.shape)?;
                let element_shape = self.def.resolve_shape(&element.shape)?;
                if element_shape.shape_type == ShapeType::Structure {
                    Some(format!(
                        "for value in &self.{} {{\n    value.validate()?;\n}}",
                        field
                    ))
                } else {
                    None
                }
            }
            _ => None,
        })
    }

    /// XML element access for a member: attribute indexing, the declared
    /// locationName, the member name, or the expression itself.
    fn xml_access(&self, current: &str, member_name: &str, member: &Member) -> String {
        if member.xml_attribute {
            format!("{}.attr(\"{}\")", current, member.wire_name(member_name))
        } else if let Some(location) = &member.location_name {
            format!("{}.child(\"{}\")", current, location)
        } else if !member_name.is_empty() {
            format!("{}.child(\"{}\")", current, member_name)
        } else {
            current.to_string()
        }
    }

    /// Expression deserializing one member out of `current`.
    pub fn parse_xml(&self, current: &str, member_name: &str, member: &Member) -> Result<String> {
        let access = self.xml_access(current, member_name, member);
        let mut visited = FxHashSet::default();
        self.parse_target(&access, &member.shape, &mut visited)
    }

    fn parse_target(
        &self,
        expr: &str,
        shape_name: &str,
        visited: &mut FxHashSet<String>,
    ) -> Result<String> {
        let shape = self.def.resolve_shape(shape_name)?;
        Ok(match shape.shape_type {
            ShapeType::Structure => format!("{}::from_xml(&{})", class_name(shape_name), expr),
            ShapeType::List => {
                if !visited.insert(shape_name.to_string()) {
                    return Err(Error::UnsupportedShape(
                        shape_name.to_string(),
                        "self-referential container".to_string(),
                    ));
                }
                let element = shape.list_member(shape_name)?;
                format!(
                    "{}.children().map(|node| {}).collect::<Vec<_>>()",
                    expr,
                    self.parse_target("node", &element.shape, visited)?
                )
            }
            ShapeType::Map => {
                if !visited.insert(shape_name.to_string()) {
                    return Err(Error::UnsupportedShape(
                        shape_name.to_string(),
                        "self-referential container".to_string(),
                    ));
                }
                let (key, value) = self.mapper.map_entries(shape_name, shape)?;
                let key_name = key
                    .location_name
                    .as_deref()
                    .ok_or_else(|| Error::MapKeyName(shape_name.to_string()))?;
                let value_expr = match &value.location_name {
                    Some(location) => format!("node.child(\"{}\")", location),
                    None => "node".to_string(),
                };
                format!(
                    "{}.children().map(|node| (node.child(\"{}\").text(), {})).collect::<std::collections::HashMap<_, _>>()",
                    expr,
                    key_name,
                    self.parse_target(&value_expr, &value.shape, visited)?
                )
            }
            scalar => format!("xml_value_or_null({}, \"{}\")", expr, xml_type_tag(scalar)),
        })
    }

    /// Statements populating every non-header member of a root structure
    /// from the parsed document expression `data`.
    pub fn parse_xml_root(&self, shape: &Shape) -> Result<String> {
        let mut statements = Vec::new();
        for (member_name, member) in shape.members.iter() {
            use crate::definition::Location;
            if matches!(member.location, Some(Location::Header) | Some(Location::Headers)) {
                continue;
            }
            let field = field_name(member_name);
            let target = self.def.resolve_shape(&member.shape)?;
            let stmt = if target.shape_type == ShapeType::Structure {
                let access = self.xml_access("data", member_name, member);
                format!(
                    "self.{} = data.has(\"{}\").then(|| Box::new({}::from_xml(&{})));",
                    field,
                    member.wire_name(member_name),
                    class_name(&member.shape),
                    access
                )
            } else {
                format!("self.{} = {};", field, self.parse_xml("data", member_name, member)?)
            };
            statements.push(stmt);
        }
        Ok(statements.join("\n"))
    }

    /// Pruned shape map for the runtime XML builder: every shape reachable
    /// from the payload through structure members and list elements, plus
    /// a synthetic `_root` entry naming the payload element.
    pub fn xml_config(&self, payload_member_name: &str, payload: &Member) -> Result<String> {
        let mut shapes: BTreeMap<String, JsonValue> = BTreeMap::new();
        let mut pending = vec![payload.shape.clone()];
        while let Some(name) = pending.pop() {
            if shapes.contains_key(&name) {
                continue;
            }
            let shape = self.def.resolve_shape(&name)?;
            let descriptor = match shape.shape_type {
                ShapeType::Structure => {
                    let mut members = BTreeMap::new();
                    for (member_name, member) in shape.members.iter() {
                        let mut entry = BTreeMap::new();
                        entry.insert("shape".to_string(), JsonValue::from(member.shape.clone()));
                        if let Some(location) = &member.location_name {
                            entry.insert("locationName".to_string(), JsonValue::from(location.clone()));
                        }
                        if member.xml_attribute {
                            entry.insert("xmlAttribute".to_string(), JsonValue::from(true));
                        }
                        members.insert(member_name.clone(), to_json(entry));
                        pending.push(member.shape.clone());
                    }
                    let mut descriptor = BTreeMap::new();
                    descriptor.insert("type".to_string(), JsonValue::from("structure"));
                    descriptor.insert("members".to_string(), to_json(members));
                    to_json(descriptor)
                }
                ShapeType::List => {
                    let element = shape.list_member(&name)?;
                    pending.push(element.shape.clone());
                    let mut member = BTreeMap::new();
                    member.insert("shape".to_string(), JsonValue::from(element.shape.clone()));
                    if let Some(location) = &element.location_name {
                        member.insert("locationName".to_string(), JsonValue::from(location.clone()));
                    }
                    let mut descriptor = BTreeMap::new();
                    descriptor.insert("type".to_string(), JsonValue::from("list"));
                    descriptor.insert("member".to_string(), to_json(member));
                    to_json(descriptor)
                }
                other => {
                    let mut descriptor = BTreeMap::new();
                    descriptor.insert("type".to_string(), JsonValue::from(type_tag(other)));
                    to_json(descriptor)
                }
            };
            shapes.insert(name, descriptor);
        }

        let mut root = BTreeMap::new();
        root.insert("type".to_string(), JsonValue::from(payload.shape.clone()));
        root.insert(
            "xmlName".to_string(),
            JsonValue::from(payload.wire_name(payload_member_name)),
        );
        root.insert(
            "uri".to_string(),
            JsonValue::from(payload.xml_namespace.as_ref().map(|ns| ns.uri.clone()).unwrap_or_default()),
        );
        shapes.insert("_root".to_string(), to_json(root));

        serde_json::to_string(&shapes).map_err(|e| Error::Io(e.to_string()))
    }
}

fn to_json(map: BTreeMap<String, JsonValue>) -> JsonValue {
    JsonValue::Object(map.into_iter().collect())
}

/// target-type tag passed to the runtime `xml_value_or_null` helper
fn xml_type_tag(shape_type: ShapeType) -> &'static str {
    match shape_type {
        ShapeType::Boolean => "bool",
        ShapeType::Integer => "i32",
        ShapeType::Long => "i64",
        ShapeType::Blob => "Vec<u8>",
        ShapeType::Timestamp => "DateTime",
        _ => "String",
    }
}

fn type_tag(shape_type: ShapeType) -> &'static str {
    match shape_type {
        ShapeType::Structure => "structure",
        ShapeType::List => "list",
        ShapeType::Map => "map",
        ShapeType::String => "string",
        ShapeType::Boolean => "boolean",
        ShapeType::Integer => "integer",
        ShapeType::Long => "long",
        ShapeType::Blob => "blob",
        ShapeType::Timestamp => "timestamp",
    }
}
