//! Input class generation
//!
//! Emits one class per structure reachable from an operation's input
//! shape. The root class is named after the operation and additionally
//! carries the request-part accessors; nested classes are named after
//! their shapes. A per-invocation memo keyed on shape name keeps cyclic
//! graphs finite.

use rustc_hash::FxHashSet;

use crate::{
    class::{ClassFile, Method, Property},
    config::GeneratorConfig,
    definition::{Location, Member, Operation, ServiceDefinition, Shape, ShapeType},
    docs,
    types::{class_name, field_name, TypeMapper},
    walker::ShapeWalker,
    Error, Result,
};

pub(crate) const GENERATED_HEAD: &str =
    "This file is generated automatically using service-codegen and the service definition";
pub(crate) const OVERWRITE_NOTE: &str =
    "Edits will be overwritten when the operation is regenerated";

pub(crate) struct InputGenerator<'g> {
    def: &'g dyn ServiceDefinition,
    config: &'g GeneratorConfig,
    walker: ShapeWalker<'g>,
    mapper: TypeMapper<'g>,
    emitted: FxHashSet<String>,
    classes: Vec<ClassFile>,
}

impl<'g> InputGenerator<'g> {
    pub fn new(def: &'g dyn ServiceDefinition, config: &'g GeneratorConfig) -> Self {
        InputGenerator {
            def,
            config,
            walker: ShapeWalker::new(def),
            mapper: TypeMapper::new(def),
            emitted: FxHashSet::default(),
            classes: Vec::new(),
        }
    }

    /// Input class tree for one operation, root class first.
    pub fn generate(mut self, op: &Operation) -> Result<Vec<ClassFile>> {
        let input_ref = op.input.as_ref().ok_or_else(|| Error::MissingInput(op.name.clone()))?;
        let shape = self.def.resolve_shape(&input_ref.shape)?;
        if shape.shape_type != ShapeType::Structure {
            return Err(Error::UnsupportedShape(
                input_ref.shape.clone(),
                "operation input must be a structure".to_string(),
            ));
        }
        let root = self.build_class(&class_name(&op.name), &input_ref.shape, shape, Some(op))?;
        self.classes.insert(0, root);
        Ok(self.classes)
    }

    /// Emit the class for a nested structure shape exactly once.
    fn ensure_nested(&mut self, shape_name: &str) -> Result<()> {
        if !self.emitted.insert(shape_name.to_string()) {
            return Ok(());
        }
        let shape = self.def.resolve_shape(shape_name)?;
        let class = self.build_class(&class_name(shape_name), shape_name, shape, None)?;
        self.classes.push(class);
        Ok(())
    }

    /// Walk container chains down to any structure shapes they carry.
    fn ensure_reachable(&mut self, member: &Member) -> Result<()> {
        let mut visited = FxHashSet::default();
        let mut current = member.shape.clone();
        loop {
            if !visited.insert(current.clone()) {
                return Err(Error::UnsupportedShape(current, "self-referential container".to_string()));
            }
            let shape = self.def.resolve_shape(&current)?;
            match shape.shape_type {
                ShapeType::Structure => return self.ensure_nested(&current),
                ShapeType::List => {
                    current = shape.list_member(&current)?.shape.clone();
                }
                ShapeType::Map => {
                    let (_, value) = self.mapper.map_entries(&current, shape)?;
                    current = value.shape.clone();
                }
                _ => return Ok(()),
            }
        }
    }

    fn build_class(
        &mut self,
        name: &str,
        shape_name: &str,
        shape: &Shape,
        op: Option<&Operation>,
    ) -> Result<ClassFile> {
        let mut class = ClassFile::new(self.config.input_namespace(), name);
        class.head.push(GENERATED_HEAD.to_string());
        class.head.push(OVERWRITE_NOTE.to_string());

        let mut imports = vec!["Arg", "MissingParameter", "Value", "ValueMap"];
        match op {
            Some(op) => class.doc.push(format!("Input for the `{}` operation.", op.name)),
            None => {
                if let Some(html) = self.def.shape_documentation(shape_name) {
                    class.doc = docs::block(&html)?;
                }
            }
        }

        let mut init_statements = Vec::new();
        let mut required_checks = Vec::new();
        let mut recurse_checks = Vec::new();
        let mut accessors = Vec::new();

        let members: Vec<(String, Member)> =
            shape.members.iter().map(|(n, m)| (n.clone(), m.clone())).collect();
        for (member_name, member) in &members {
            let target = self.def.resolve_shape(&member.shape)?;
            let field = field_name(member_name);
            let optional = !member.streaming
                && !matches!(target.shape_type, ShapeType::List | ShapeType::Map);
            let field_type = if member.streaming {
                imports.push("StreamingBody");
                "StreamingBody".to_string()
            } else {
                match target.shape_type {
                    ShapeType::Structure => format!("Option<Box<{}>>", class_name(&member.shape)),
                    ShapeType::List | ShapeType::Map => self.mapper.member_type(member)?,
                    ShapeType::Timestamp => {
                        imports.push("DateTime");
                        "Option<DateTime>".to_string()
                    }
                    _ => format!("Option<{}>", self.mapper.member_type(member)?),
                }
            };

            let doc = match self.def.parameter_documentation(shape_name, member_name, &member.shape) {
                Some(html) => docs::block(&html)?,
                None => Vec::new(),
            };
            class.properties.push(Property::new(field.clone(), field_type.clone(), doc));

            if !member.streaming {
                self.ensure_reachable(member)?;
            }

            init_statements.push(self.walker.constructor_init(member_name, member, "this")?);

            if optional && shape.is_required(member_name) {
                required_checks.push(format!(
                    "if self.{}.is_none() {{\n    return Err(MissingParameter::new(\"{}\", \"{}\"));\n}}",
                    field, member_name, name
                ));
            }
            if let Some(stmt) = self.walker.validate_stmt(member_name, member)? {
                recurse_checks.push(stmt);
            }

            accessors.extend(
                self.accessor_methods(shape_name, member_name, member, &field, &field_type, optional)?,
            );
        }

        class.add_method(Method::new(
            "create",
            vec!["Accepts a raw mapping or an already-typed value.".to_string()],
            format!("pub fn create(input: Arg<{}>) -> {}", name, name),
            format!(
                "match input {{\n    Arg::Typed(value) => value,\n    Arg::Raw(params) => {}::new(params),\n}}",
                name
            ),
        ));

        let new_body = if init_statements.is_empty() {
            format!("{}::default()", name)
        } else {
            format!(
                "let mut this = {}::default();\n{}\nthis",
                name,
                init_statements.join("\n")
            )
        };
        let params_arg = if init_statements.is_empty() { "_params" } else { "params" };
        class.add_method(Method::new(
            "new",
            vec!["Builds the value from a raw parameter mapping.".to_string()],
            format!("pub fn new({}: ValueMap) -> {}", params_arg, name),
            new_body,
        ));

        for method in accessors {
            class.add_method(method);
        }

        let mut validate_body = String::new();
        for check in required_checks.iter().chain(recurse_checks.iter()) {
            validate_body.push_str(check);
            validate_body.push('\n');
        }
        if validate_body.is_empty() {
            validate_body.push_str("// nothing to validate\n");
        }
        validate_body.push_str("Ok(())");
        class.add_method(Method::new(
            "validate",
            vec!["Ensures required members are present before dispatch.".to_string()],
            "pub fn validate(&self) -> Result<(), MissingParameter>",
            validate_body,
        ));

        if let Some(op) = op {
            self.request_methods(&mut class, op, &members)?;
        }

        imports.sort_unstable();
        imports.dedup();
        class.add_use(format!("{}::{{{}}}", self.config.runtime_crate, imports.join(", ")));
        Ok(class)
    }

    fn accessor_methods(
        &self,
        shape_name: &str,
        member_name: &str,
        member: &Member,
        field: &str,
        field_type: &str,
        optional: bool,
    ) -> Result<Vec<Method>> {
        let doc_type = self.mapper.doc_type(member)?;
        let mut getter_doc = vec![format!("Returns the `{}` member ({}).", member_name, doc_type)];
        if let Some(html) = self.def.parameter_documentation(shape_name, member_name, &member.shape) {
            let summary = docs::first_line(&html)?;
            if !summary.is_empty() {
                getter_doc.insert(0, summary);
            }
        }
        let getter = Method::new(
            format!("get_{}", field),
            getter_doc,
            format!("pub fn get_{}(&self) -> &{}", field, field_type),
            format!("&self.{}", field),
        );

        let target = self.def.resolve_shape(&member.shape)?;
        let (value_type, assign) = if member.streaming {
            ("StreamingBody".to_string(), format!("self.{} = value;", field))
        } else if optional {
            match target.shape_type {
                ShapeType::Structure => (
                    class_name(&member.shape),
                    format!("self.{} = Some(Box::new(value));", field),
                ),
                _ => {
                    let inner = field_type
                        .strip_prefix("Option<")
                        .and_then(|s| s.strip_suffix('>'))
                        .unwrap_or(field_type);
                    (inner.to_string(), format!("self.{} = Some(value);", field))
                }
            }
        } else {
            (field_type.to_string(), format!("self.{} = value;", field))
        };
        let setter = Method::new(
            format!("set_{}", field),
            vec![format!("Sets `{}` and returns self for chaining.", member_name)],
            format!("pub fn set_{}(mut self, value: {}) -> Self", field, value_type),
            format!("{}\nself", assign),
        );
        Ok(vec![getter, setter])
    }

    /// request-part accessors, emitted on the root input class only
    fn request_methods(
        &self,
        class: &mut ClassFile,
        op: &Operation,
        members: &[(String, Member)],
    ) -> Result<()> {
        class.add_method(self.part_map_method(
            "request_headers",
            "Header values carried by this input.",
            members,
            |location| matches!(location, Some(Location::Header)),
        )?);
        class.add_method(self.part_map_method(
            "request_query",
            "Query-string values carried by this input.",
            members,
            |location| matches!(location, Some(Location::QueryString)),
        )?);

        // payload body, seeded for the default form-urlencoded protocol
        let mut lines = vec![
            "let mut body = std::collections::HashMap::new();".to_string(),
            format!("body.insert(\"Action\".to_string(), Value::from(\"{}\"));", op.name),
            format!(
                "body.insert(\"Version\".to_string(), Value::from(\"{}\"));",
                self.def.api_version()
            ),
        ];
        for (member_name, member) in members {
            if !matches!(member.location, None | Some(Location::Payload)) {
                continue;
            }
            lines.push(self.insert_statement("body", member_name, member)?);
        }
        lines.push("body".to_string());
        class.add_method(Method::new(
            "request_body",
            vec!["Payload values carried by this input.".to_string()],
            "pub fn request_body(&self) -> std::collections::HashMap<String, Value>",
            lines.join("\n"),
        ));

        // URI template substitution
        let uri = &op.http.request_uri;
        let mut lines = Vec::new();
        for (member_name, member) in members {
            if !matches!(member.location, Some(Location::Uri)) {
                continue;
            }
            let key = member.wire_name(member_name);
            let field = field_name(member_name);
            let target = self.def.resolve_shape(&member.shape)?;
            let value_expr = if member.streaming
                || matches!(target.shape_type, ShapeType::List | ShapeType::Map)
            {
                format!("&Value::from(self.{}.clone()).to_string()", field)
            } else {
                format!("&self.{}.clone().map(|value| value.to_string()).unwrap_or_default()", field)
            };
            for token in [format!("{{{}}}", key), format!("{{{}+}}", key)] {
                if uri.contains(&token) {
                    lines.push(format!("uri = uri.replace(\"{}\", {});", token, value_expr));
                }
            }
        }
        let body = if lines.is_empty() {
            format!("String::from(\"{}\")", uri)
        } else {
            format!("let mut uri = String::from(\"{}\");\n{}\nuri", uri, lines.join("\n"))
        };
        class.add_method(Method::new(
            "request_uri",
            vec!["Request URI with template tokens substituted.".to_string()],
            "pub fn request_uri(&self) -> String",
            body,
        ));
        Ok(())
    }

    fn part_map_method<F>(
        &self,
        method: &str,
        doc: &str,
        members: &[(String, Member)],
        select: F,
    ) -> Result<Method>
    where
        F: Fn(Option<Location>) -> bool,
    {
        let mut lines = Vec::new();
        for (member_name, member) in members {
            if !select(member.location) {
                continue;
            }
            let key = member.wire_name(member_name);
            let field = field_name(member_name);
            let target = self.def.resolve_shape(&member.shape)?;
            if member.streaming || matches!(target.shape_type, ShapeType::List | ShapeType::Map) {
                lines.push(format!(
                    "map.insert(\"{}\".to_string(), Value::from(self.{}.clone()).to_string());",
                    key, field
                ));
            } else {
                lines.push(format!(
                    "if let Some(value) = &self.{} {{\n    map.insert(\"{}\".to_string(), value.to_string());\n}}",
                    field, key
                ));
            }
        }
        let body = if lines.is_empty() {
            "std::collections::HashMap::new()".to_string()
        } else {
            format!(
                "let mut map = std::collections::HashMap::new();\n{}\nmap",
                lines.join("\n")
            )
        };
        Ok(Method::new(
            method,
            vec![doc.to_string()],
            format!("pub fn {}(&self) -> std::collections::HashMap<String, String>", method),
            body,
        ))
    }

    /// insertion into the payload body map; wire name keys, non-null values
    fn insert_statement(&self, map: &str, member_name: &str, member: &Member) -> Result<String> {
        let key = member.wire_name(member_name);
        let field = field_name(member_name);
        let target = self.def.resolve_shape(&member.shape)?;
        Ok(if member.streaming {
            format!("{}.insert(\"{}\".to_string(), Value::from(self.{}.clone()));", map, key, field)
        } else {
            match target.shape_type {
                ShapeType::List | ShapeType::Map => format!(
                    "{}.insert(\"{}\".to_string(), Value::from(self.{}.clone()));",
                    map, key, field
                ),
                ShapeType::Structure => format!(
                    "if let Some(value) = &self.{} {{\n    {}.insert(\"{}\".to_string(), Value::from(value.as_ref().clone()));\n}}",
                    field, map, key
                ),
                _ => format!(
                    "if let Some(value) = &self.{} {{\n    {}.insert(\"{}\".to_string(), Value::from(value.clone()));\n}}",
                    field, map, key
                ),
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::definition::JsonServiceDefinition;

    const MODEL: &str = r#"{
        "metadata": { "apiVersion": "2012-08-10", "endpointPrefix": "echo" },
        "operations": {
            "Ping": {
                "name": "Ping",
                "http": { "method": "POST", "requestUri": "/" },
                "input": { "shape": "PingRequest" }
            },
            "Echo": {
                "name": "Echo",
                "http": { "method": "POST", "requestUri": "/" },
                "input": { "shape": "EchoRequest" }
            },
            "PutNode": {
                "name": "PutNode",
                "http": { "method": "PUT", "requestUri": "/{Bucket}/{Key+}" },
                "input": { "shape": "PutNodeRequest" }
            }
        },
        "shapes": {
            "PingRequest": { "type": "structure", "members": {} },
            "EchoRequest": {
                "type": "structure",
                "members": {
                    "Message": { "shape": "StringType" },
                    "Tags": { "shape": "TagMap" }
                },
                "required": [ "Message" ]
            },
            "PutNodeRequest": {
                "type": "structure",
                "members": {
                    "Bucket": { "shape": "StringType", "location": "uri", "locationName": "Bucket" },
                    "Key": { "shape": "StringType", "location": "uri", "locationName": "Key" },
                    "ContentType": { "shape": "StringType", "location": "header", "locationName": "Content-Type" },
                    "Marker": { "shape": "StringType", "location": "querystring", "locationName": "marker" },
                    "Node": { "shape": "Node" }
                },
                "required": [ "Bucket", "Node" ]
            },
            "Node": {
                "type": "structure",
                "members": {
                    "Child": { "shape": "Node" },
                    "Name": { "shape": "StringType" }
                }
            },
            "TagMap": {
                "type": "map",
                "key": { "shape": "StringType", "locationName": "Key" },
                "value": { "shape": "StringType", "locationName": "Value" }
            },
            "StringType": { "type": "string" }
        }
    }"#;

    fn generate(op: &str) -> Vec<ClassFile> {
        let def = JsonServiceDefinition::from_json(MODEL).unwrap();
        let config = crate::config::GeneratorConfig::new("echo");
        let gen = InputGenerator::new(&def, &config);
        gen.generate(def.operation(op).unwrap()).unwrap()
    }

    #[test]
    fn empty_input_emits_unit_class() {
        let classes = generate("Ping");
        assert_eq!(classes.len(), 1);
        let source = classes[0].render();
        assert!(source.contains("pub struct Ping;"));
        assert!(source.contains("pub fn new(_params: ValueMap) -> Ping"));
        assert!(source.contains("Ping::default()"));
        assert!(source.contains("// nothing to validate"));
    }

    #[test]
    fn required_member_gets_null_check() {
        let classes = generate("Echo");
        let source = classes[0].render();
        assert!(source.contains("message: Option<String>"));
        assert!(source.contains("tags: std::collections::HashMap<String, String>"));
        assert!(source.contains(
            "return Err(MissingParameter::new(\"Message\", \"Echo\"));"
        ));
        // map members do not validate deeply
        assert!(!source.contains("for value in &self.tags"));
        // body seeded with Action and Version
        assert!(source.contains("body.insert(\"Action\".to_string(), Value::from(\"Echo\"));"));
        assert!(source.contains("body.insert(\"Version\".to_string(), Value::from(\"2012-08-10\"));"));
    }

    #[test]
    fn cyclic_input_emits_each_shape_once() {
        let classes = generate("PutNode");
        let names: Vec<&str> = classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["PutNode", "Node"]);
        let node = classes[1].render();
        assert!(node.contains("child: Option<Box<Node>>"));
        assert!(node
            .contains("this.child = params.get(\"Child\").map(|value| Box::new(Node::create(value.into())));"));
    }

    #[test]
    fn request_parts_use_wire_names() {
        let classes = generate("PutNode");
        let source = classes[0].render();
        assert!(source.contains("let mut uri = String::from(\"/{Bucket}/{Key+}\");"));
        assert!(source.contains("uri = uri.replace(\"{Bucket}\""));
        assert!(source.contains("uri = uri.replace(\"{Key+}\""));
        assert!(source.contains("map.insert(\"Content-Type\".to_string(), value.to_string());"));
        assert!(source.contains("map.insert(\"marker\".to_string(), value.to_string());"));
        // header and query members stay out of the payload body
        assert!(!source.contains("body.insert(\"Content-Type\""));
        assert!(!source.contains("body.insert(\"marker\""));
        // required structure member validates recursively
        assert!(source.contains("return Err(MissingParameter::new(\"Node\", \"PutNode\"));"));
        assert!(source.contains("if let Some(value) = &self.node {"));
        assert!(source.contains("value.validate()?;"));
    }

    #[test]
    fn setters_chain() {
        let classes = generate("Echo");
        let source = classes[0].render();
        assert!(source.contains("pub fn set_message(mut self, value: String) -> Self"));
        assert!(source.contains("self.message = Some(value);"));
        assert!(source.contains("pub fn get_message(&self) -> &Option<String>"));
        assert!(source
            .contains("pub fn set_tags(mut self, value: std::collections::HashMap<String, String>) -> Self"));
    }
}
