//! Result class generation
//!
//! Emits one class per structure reachable from an operation's output
//! shape. The root class extends the runtime result base and populates
//! itself from an HTTP response in two phases, headers then body; nested
//! classes deserialize through `from_xml` named constructors. Paginated
//! operations additionally gain lazy iteration over their result keys.

use rustc_hash::FxHashSet;

use crate::{
    class::{ClassFile, Method, Property},
    config::GeneratorConfig,
    definition::{Location, Member, Operation, ServiceDefinition, Shape, ShapeType},
    docs,
    input_gen::{GENERATED_HEAD, OVERWRITE_NOTE},
    types::{class_name, field_name, TypeMapper},
    walker::ShapeWalker,
    Error, Result,
};

pub(crate) struct ResultGenerator<'g> {
    def: &'g dyn ServiceDefinition,
    config: &'g GeneratorConfig,
    walker: ShapeWalker<'g>,
    mapper: TypeMapper<'g>,
    emitted: FxHashSet<String>,
    classes: Vec<ClassFile>,
}

impl<'g> ResultGenerator<'g> {
    pub fn new(def: &'g dyn ServiceDefinition, config: &'g GeneratorConfig) -> Self {
        ResultGenerator {
            def,
            config,
            walker: ShapeWalker::new(def),
            mapper: TypeMapper::new(def),
            emitted: FxHashSet::default(),
            classes: Vec::new(),
        }
    }

    /// Result class tree for one operation, root class first. An
    /// operation without output produces no classes.
    pub fn generate(mut self, op: &Operation) -> Result<Vec<ClassFile>> {
        let output_ref = match &op.output {
            Some(output) => output,
            None => return Ok(Vec::new()),
        };
        let shape = self.def.resolve_shape(&output_ref.shape)?;
        if shape.shape_type != ShapeType::Structure {
            return Err(Error::UnsupportedShape(
                output_ref.shape.clone(),
                "operation output must be a structure".to_string(),
            ));
        }
        let root = self.build_root(op, &output_ref.shape, shape, output_ref.result_wrapper.as_deref())?;
        self.classes.insert(0, root);
        Ok(self.classes)
    }

    fn build_root(
        &mut self,
        op: &Operation,
        shape_name: &str,
        shape: &Shape,
        result_wrapper: Option<&str>,
    ) -> Result<ClassFile> {
        let name = format!("{}Result", class_name(&op.name));
        let mut class = ClassFile::new(self.config.result_namespace(), &name);
        class.head.push(GENERATED_HEAD.to_string());
        class.head.push(OVERWRITE_NOTE.to_string());
        class.doc.push(format!("Result of the `{}` operation.", op.name));
        class.base = Some("ServiceResult".to_string());

        let mut imports = vec![
            "HttpClient",
            "HttpResponse",
            "ServiceResult",
            "Value",
            "ValueMap",
            "XmlElement",
            "xml_value_or_null",
        ];

        let members: Vec<(String, Member)> =
            shape.members.iter().map(|(n, m)| (n.clone(), m.clone())).collect();
        let payload_member = shape.payload.clone();
        let streaming_payload = payload_member
            .as_deref()
            .and_then(|p| shape.members.get(p))
            .map(|m| m.streaming)
            .unwrap_or(false);

        let mut getters = Vec::new();
        for (member_name, member) in &members {
            let is_payload = payload_member.as_deref() == Some(member_name.as_str());
            let (field, field_type) =
                self.add_property(&mut class, shape_name, member_name, member, is_payload, &mut imports)?;
            getters.push(self.getter(shape_name, member_name, member, &field, &field_type)?);
        }

        // populate_result, assembled header phase then body phase
        let mut body = vec!["// TODO Verify correctness".to_string()];
        for (member_name, member) in &members {
            match member.location {
                Some(Location::Header) => {
                    body.push(self.header_statement(member_name, member, &mut imports)?);
                }
                Some(Location::Headers) => {
                    body.push(self.headers_statement(member_name, member));
                }
                _ => {}
            }
        }
        let mut uses_response = members
            .iter()
            .any(|(_, m)| matches!(m.location, Some(Location::Header) | Some(Location::Headers)));
        match &payload_member {
            Some(payload_name) => {
                let member = shape.members.get(payload_name).ok_or_else(|| {
                    Error::UnsupportedShape(op.name.clone(), format!("payload member {} missing", payload_name))
                })?;
                let field = field_name(payload_name);
                uses_response = true;
                if member.streaming {
                    imports.push("StreamableBody");
                    body.push(format!(
                        "self.{} = match http_client {{\n    Some(client) => StreamableBody::new(client.stream(response)),\n    None => StreamableBody::from(response.body()),\n}};",
                        field
                    ));
                } else {
                    body.push("let data = XmlElement::parse(response.body());".to_string());
                    body.push(format!(
                        "self.{} = Some(Box::new({}::from_xml(&data)));",
                        field,
                        class_name(&member.shape)
                    ));
                }
            }
            None => {
                let body_members: Vec<&(String, Member)> = members
                    .iter()
                    .filter(|(_, m)| {
                        !matches!(m.location, Some(Location::Header) | Some(Location::Headers))
                    })
                    .collect();
                if !body_members.is_empty() {
                    uses_response = true;
                    body.push("let data = XmlElement::parse(response.body());".to_string());
                    if let Some(wrapper) = result_wrapper {
                        body.push(format!("let data = data.child(\"{}\");", wrapper));
                    }
                    body.push(self.walker.parse_xml_root(shape)?);
                }
            }
        }
        let response_param = if uses_response { "response" } else { "_response" };
        let http_param = if streaming_payload { "http_client" } else { "_http_client" };
        class.add_method(Method::new(
            "populate_result",
            vec!["Populates this result from the service response.".to_string()],
            format!(
                "pub fn populate_result(&mut self, {}: &HttpResponse, {}: Option<&HttpClient>)",
                response_param, http_param
            ),
            body.join("\n"),
        ));

        for getter in getters {
            class.add_method(getter);
        }

        if let Some(pagination) = self.def.operation_pagination(&op.name) {
            let keys = pagination.result_keys();
            if keys.is_empty() {
                return Err(Error::PaginationKey(op.name.clone()));
            }
            self.add_pagination(&mut class, op, shape, &keys)?;
        }

        imports.sort_unstable();
        imports.dedup();
        class.add_use(format!("{}::{{{}}}", self.config.runtime_crate, imports.join(", ")));
        class.add_use("super::*");
        Ok(class)
    }

    /// Emit the class for a nested structure shape exactly once.
    fn ensure_nested(&mut self, shape_name: &str) -> Result<()> {
        if !self.emitted.insert(shape_name.to_string()) {
            return Ok(());
        }
        let shape = self.def.resolve_shape(shape_name)?;
        let class = self.build_nested(shape_name, shape)?;
        self.classes.push(class);
        Ok(())
    }

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
                ShapeType::List => current = shape.list_member(&current)?.shape.clone(),
                ShapeType::Map => {
                    let (_, value) = self.mapper.map_entries(&current, shape)?;
                    current = value.shape.clone();
                }
                _ => return Ok(()),
            }
        }
    }

    /// Nested value class: named constructors and getters, no validation
    /// and no request helpers.
    fn build_nested(&mut self, shape_name: &str, shape: &Shape) -> Result<ClassFile> {
        let name = class_name(shape_name);
        let mut class = ClassFile::new(self.config.result_namespace(), &name);
        class.head.push(GENERATED_HEAD.to_string());
        class.head.push(OVERWRITE_NOTE.to_string());
        if let Some(html) = self.def.shape_documentation(shape_name) {
            class.doc = docs::block(&html)?;
        }

        let mut imports = vec!["Arg", "Value", "ValueMap", "XmlElement", "xml_value_or_null"];

        let members: Vec<(String, Member)> =
            shape.members.iter().map(|(n, m)| (n.clone(), m.clone())).collect();
        let mut init_statements = Vec::new();
        let mut xml_pairs = Vec::new();
        let mut getters = Vec::new();
        for (member_name, member) in &members {
            let (field, field_type) =
                self.add_property(&mut class, shape_name, member_name, member, false, &mut imports)?;
            init_statements.push(self.walker.constructor_init(member_name, member, "this")?);
            xml_pairs.push(format!(
                "    (\"{}\".to_string(), Value::from({})),",
                member_name,
                self.walker.parse_xml("data", member_name, member)?
            ));
            getters.push(self.getter(shape_name, member_name, member, &field, &field_type)?);
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
            format!("let mut this = {}::default();\n{}\nthis", name, init_statements.join("\n"))
        };
        let params_arg = if init_statements.is_empty() { "_params" } else { "params" };
        class.add_method(Method::new(
            "new",
            vec!["Builds the value from a raw parameter mapping.".to_string()],
            format!("pub fn new({}: ValueMap) -> {}", params_arg, name),
            new_body,
        ));

        let from_xml_body = if xml_pairs.is_empty() {
            format!("let _ = data;\n{}::default()", name)
        } else {
            format!(
                "{}::new(ValueMap::from_pairs(vec![\n{}\n]))",
                name,
                xml_pairs.join("\n")
            )
        };
        class.add_method(Method::new(
            "from_xml",
            vec!["Builds the value from a parsed XML element.".to_string()],
            format!("pub fn from_xml(data: &XmlElement) -> {}", name),
            from_xml_body,
        ));

        for getter in getters {
            class.add_method(getter);
        }

        imports.sort_unstable();
        imports.dedup();
        class.add_use(format!("{}::{{{}}}", self.config.runtime_crate, imports.join(", ")));
        class.add_use("super::*");
        Ok(class)
    }

    fn add_property(
        &mut self,
        class: &mut ClassFile,
        shape_name: &str,
        member_name: &str,
        member: &Member,
        streaming_output: bool,
        imports: &mut Vec<&'static str>,
    ) -> Result<(String, String)> {
        let target = self.def.resolve_shape(&member.shape)?;
        let field = field_name(member_name);
        let field_type = if member.streaming {
            imports.push(if streaming_output { "StreamableBody" } else { "StreamingBody" });
            if streaming_output { "StreamableBody".to_string() } else { "StreamingBody".to_string() }
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
        Ok((field, field_type))
    }

    fn getter(
        &self,
        shape_name: &str,
        member_name: &str,
        member: &Member,
        field: &str,
        field_type: &str,
    ) -> Result<Method> {
        let doc_type = self.mapper.doc_type(member)?;
        let mut doc = vec![format!("Returns the `{}` member ({}).", member_name, doc_type)];
        if let Some(html) = self.def.parameter_documentation(shape_name, member_name, &member.shape) {
            let summary = docs::first_line(&html)?;
            if !summary.is_empty() {
                doc.insert(0, summary);
            }
        }
        Ok(Method::new(
            format!("get_{}", field),
            doc,
            format!("pub fn get_{}(&self) -> &{}", field, field_type),
            format!("&self.{}", field),
        ))
    }

    /// header phase: first value of the lower-cased wire name, coerced by
    /// target type
    fn header_statement(
        &self,
        member_name: &str,
        member: &Member,
        imports: &mut Vec<&'static str>,
    ) -> Result<String> {
        let field = field_name(member_name);
        let header = member.wire_name(member_name).to_lowercase();
        let target = self.def.resolve_shape(&member.shape)?;
        let coerce = match target.shape_type {
            ShapeType::Integer | ShapeType::Long => {
                imports.push("filter_integer");
                ".and_then(|value| filter_integer(value))".to_string()
            }
            ShapeType::Boolean => {
                imports.push("filter_boolean");
                ".and_then(|value| filter_boolean(value))".to_string()
            }
            ShapeType::Timestamp => {
                imports.push("DateTime");
                ".map(|value| DateTime::parse(value))".to_string()
            }
            _ => ".map(|value| value.to_string())".to_string(),
        };
        Ok(format!(
            "self.{} = response\n    .headers()\n    .get(\"{}\")\n    .and_then(|values| values.first())\n{};",
            field,
            header,
            format!("    {}", coerce)
        ))
    }

    /// headers phase: collect every header sharing the lower-cased prefix
    fn headers_statement(&self, member_name: &str, member: &Member) -> String {
        let field = field_name(member_name);
        let prefix = member.wire_name(member_name).to_lowercase();
        format!(
            "self.{} = response\n    .headers()\n    .iter()\n    .filter(|(name, _)| name.to_lowercase().starts_with(\"{}\"))\n    .map(|(name, values)| (name.clone(), values.first().cloned().unwrap_or_default()))\n    .collect();",
            field, prefix
        )
    }

    /// iterable-aggregate capability: rewritten result-key getters plus an
    /// IntoIterator impl yielding every key in definition order
    fn add_pagination(
        &mut self,
        class: &mut ClassFile,
        op: &Operation,
        shape: &Shape,
        keys: &[&str],
    ) -> Result<()> {
        class.implements.push("iterable-aggregate".to_string());

        let mut element_types = Vec::new();
        for key in keys {
            let member = shape.members.get(*key).ok_or_else(|| {
                Error::PaginationNotIterable(op.name.clone(), key.to_string())
            })?;
            let target = self.def.resolve_shape(&member.shape)?;
            if target.shape_type != ShapeType::List {
                return Err(Error::PaginationNotIterable(op.name.clone(), key.to_string()));
            }
            let element = target.list_member(&member.shape)?;
            let element_shape = self.def.resolve_shape(&element.shape)?;
            let element_type = match element_shape.shape_type {
                ShapeType::Structure => class_name(&element.shape),
                scalar => self.mapper.scalar_type(scalar),
            };
            if !element_types.contains(&element_type) {
                element_types.push(element_type);
            }
        }
        let union_doc = element_types.join("|");
        let item_type = if element_types.len() == 1 { element_types[0].clone() } else { "Value".to_string() };

        for key in keys {
            let field = field_name(key);
            class.remove_method(&format!("get_{}", field));
            class.add_method(Method::new(
                format!("get_{}", field),
                vec![format!(
                    "Returns `{}` from the current page only, or lazily from every page of results.",
                    key
                )],
                format!(
                    "pub fn get_{}(&self, current_page_only: bool) -> Box<dyn Iterator<Item = {}> + '_>",
                    field, item_type
                ),
                format!(
                    "if current_page_only {{\n    Box::new(self.{}.iter().cloned().map(Into::into))\n}} else {{\n    Box::new(self.clone().into_iter())\n}}",
                    field
                ),
            ));
        }

        let mut extend_lines = String::new();
        for key in keys {
            extend_lines.push_str(&format!(
                "        items.extend(self.{}.iter().cloned().map(Into::into));\n",
                field_name(key)
            ));
        }
        class.extra.push(format!(
            "impl IntoIterator for {name} {{\n    type Item = {item};\n    type IntoIter = std::vec::IntoIter<{item}>;\n\n    /// Yields `{union}` values across every result key and page.\n    fn into_iter(self) -> Self::IntoIter {{\n        let mut items = Vec::new();\n        loop {{\n{extend}            // TODO: fetch the next page before iteration resumes\n            break;\n        }}\n        items.into_iter()\n    }}\n}}",
            name = class.name,
            item = item_type,
            union = union_doc,
            extend = extend_lines,
        ));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::definition::JsonServiceDefinition;

    const MODEL: &str = r#"{
        "metadata": { "apiVersion": "2012-08-10" },
        "operations": {
            "Echo": {
                "name": "Echo",
                "http": { "method": "POST", "requestUri": "/" },
                "input": { "shape": "EchoRequest" },
                "output": { "shape": "EchoResponse", "resultWrapper": "EchoResult" }
            },
            "HeadObject": {
                "name": "HeadObject",
                "http": { "method": "HEAD", "requestUri": "/" },
                "input": { "shape": "EchoRequest" },
                "output": { "shape": "HeadObjectOutput" }
            },
            "GetObject": {
                "name": "GetObject",
                "http": { "method": "GET", "requestUri": "/" },
                "input": { "shape": "EchoRequest" },
                "output": { "shape": "GetObjectOutput" }
            },
            "ListItems": {
                "name": "ListItems",
                "http": { "method": "POST", "requestUri": "/" },
                "input": { "shape": "EchoRequest" },
                "output": { "shape": "ListItemsOutput" },
                "pagination": { "result_key": "Items" }
            },
            "BadPagination": {
                "name": "BadPagination",
                "http": { "method": "POST", "requestUri": "/" },
                "input": { "shape": "EchoRequest" },
                "output": { "shape": "EchoResponse" },
                "pagination": { "result_key": "Message" }
            }
        },
        "shapes": {
            "EchoRequest": { "type": "structure", "members": {} },
            "EchoResponse": {
                "type": "structure",
                "members": { "Message": { "shape": "StringType" } }
            },
            "HeadObjectOutput": {
                "type": "structure",
                "members": {
                    "RequestId": { "shape": "StringType", "location": "header", "locationName": "x-amz-request-id" },
                    "ContentLength": { "shape": "LongType", "location": "header", "locationName": "Content-Length" },
                    "Metadata": { "shape": "MetadataMap", "location": "headers", "locationName": "x-amz-meta-" }
                }
            },
            "GetObjectOutput": {
                "type": "structure",
                "members": {
                    "Body": { "shape": "BlobType", "streaming": true },
                    "ContentType": { "shape": "StringType", "location": "header", "locationName": "Content-Type" }
                },
                "payload": "Body"
            },
            "ListItemsOutput": {
                "type": "structure",
                "members": {
                    "Items": { "shape": "ItemList" },
                    "NextToken": { "shape": "StringType" }
                }
            },
            "ItemList": { "type": "list", "member": { "shape": "Item" } },
            "Item": {
                "type": "structure",
                "members": { "Id": { "shape": "StringType" } }
            },
            "MetadataMap": {
                "type": "map",
                "key": { "shape": "StringType", "locationName": "Key" },
                "value": { "shape": "StringType", "locationName": "Value" }
            },
            "StringType": { "type": "string" },
            "LongType": { "type": "long" },
            "BlobType": { "type": "blob" }
        }
    }"#;

    fn generate(op: &str) -> Result<Vec<ClassFile>> {
        let def = JsonServiceDefinition::from_json(MODEL).unwrap();
        let config = crate::config::GeneratorConfig::new("echo");
        let gen = ResultGenerator::new(&def, &config);
        gen.generate(def.operation(op).unwrap())
    }

    #[test]
    fn no_output_produces_no_classes() {
        let def = JsonServiceDefinition::from_json(MODEL).unwrap();
        let config = crate::config::GeneratorConfig::new("echo");
        let mut op = def.operation("Echo").unwrap().clone();
        op.output = None;
        let classes = ResultGenerator::new(&def, &config).generate(&op).unwrap();
        assert!(classes.is_empty());
    }

    #[test]
    fn root_extends_base_and_descends_result_wrapper() {
        let classes = generate("Echo").unwrap();
        let source = classes[0].render();
        assert_eq!(classes[0].name, "EchoResult");
        assert!(source.contains("base: ServiceResult,"));
        assert!(source.contains("impl std::ops::Deref for EchoResult {"));
        assert!(source.contains("// TODO Verify correctness"));
        assert!(source.contains("let data = XmlElement::parse(response.body());"));
        assert!(source.contains("let data = data.child(\"EchoResult\");"));
        assert!(source.contains("self.message = xml_value_or_null(data.child(\"Message\"), \"String\");"));
    }

    #[test]
    fn header_members_read_first_value_of_lowercased_name() {
        let classes = generate("HeadObject").unwrap();
        let source = classes[0].render();
        assert!(source.contains(".get(\"x-amz-request-id\")"));
        assert!(source.contains(".and_then(|values| values.first())"));
        assert!(source.contains(".map(|value| value.to_string())"));
        assert!(source.contains(".and_then(|value| filter_integer(value))"));
        assert!(source.contains(".starts_with(\"x-amz-meta-\")"));
        // header members stay out of the XML body phase
        assert!(!source.contains("XmlElement::parse"));
    }

    #[test]
    fn streaming_payload_wraps_response_stream() {
        let classes = generate("GetObject").unwrap();
        let source = classes[0].render();
        assert!(source.contains("body: StreamableBody,"));
        assert!(source.contains("Some(client) => StreamableBody::new(client.stream(response))"));
        assert!(source.contains("None => StreamableBody::from(response.body())"));
        assert!(source.contains("http_client: Option<&HttpClient>"));
    }

    #[test]
    fn nested_classes_get_named_constructors() {
        let classes = generate("ListItems").unwrap();
        let names: Vec<&str> = classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["ListItemsResult", "Item"]);
        let item = classes[1].render();
        assert!(item.contains("pub fn create(input: Arg<Item>) -> Item"));
        assert!(item.contains("pub fn from_xml(data: &XmlElement) -> Item"));
        assert!(item.contains("(\"Id\".to_string(), Value::from(xml_value_or_null(data.child(\"Id\"), \"String\")))"));
        // nested classes carry no validation or request helpers
        assert!(!item.contains("fn validate"));
        assert!(!item.contains("fn request_body"));
    }

    #[test]
    fn pagination_emits_iterable_aggregate() {
        let classes = generate("ListItems").unwrap();
        let root = &classes[0];
        assert!(root.implements.contains(&"iterable-aggregate".to_string()));
        let source = root.render();
        assert!(source.contains(
            "pub fn get_items(&self, current_page_only: bool) -> Box<dyn Iterator<Item = Item> + '_>"
        ));
        assert!(source.contains("impl IntoIterator for ListItemsResult {"));
        assert!(source.contains("type Item = Item;"));
        assert!(source.contains("/// Yields `Item` values across every result key and page."));
        assert!(source.contains("// TODO: fetch the next page before iteration resumes"));
        assert!(source.contains("break;"));
        // the plain getter was rewritten, not duplicated
        assert_eq!(source.matches("pub fn get_items(").count(), 1);
    }

    #[test]
    fn pagination_requires_a_list_result_key() {
        assert!(matches!(
            generate("BadPagination"),
            Err(Error::PaginationNotIterable(_, _))
        ));
    }
}
