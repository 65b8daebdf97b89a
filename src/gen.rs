//! Operation generation
//!
//! Top-level orchestrator: per operation, emit the input class tree, the
//! result class tree, and inject the operation method into the service
//! client class. Every class is staged in memory before anything is
//! written, so a schema error leaves no partial output behind.

use lexical_sort::natural_lexical_cmp;

use crate::{
    class::{ClassFile, Method, Property},
    config::GeneratorConfig,
    definition::{Operation, ServiceDefinition, ShapeType},
    docs,
    files::FileWriter,
    input_gen::{InputGenerator, GENERATED_HEAD},
    merge::ClassMerger,
    result_gen::ResultGenerator,
    strings::to_pascal_case,
    types::{class_name, method_name},
    walker::ShapeWalker,
    Error, Result,
};

pub struct Generator<'g> {
    def: &'g dyn ServiceDefinition,
    config: GeneratorConfig,
}

impl<'g> Generator<'g> {
    pub fn new(def: &'g dyn ServiceDefinition, config: GeneratorConfig) -> Self {
        Generator { def, config }
    }

    /// Name of the service client class, derived from the endpoint prefix
    /// unless configured explicitly.
    pub fn client_name(&self) -> String {
        match &self.config.client_name {
            Some(name) => name.clone(),
            None => {
                let base = self.def.endpoint_prefix().unwrap_or(&self.config.namespace);
                format!("{}Client", class_name(&to_pascal_case(base)))
            }
        }
    }

    /// Generate every named operation, in natural lexical order.
    pub fn generate_operations(&self, names: &[&str], files: &mut dyn FileWriter) -> Result<()> {
        let mut names: Vec<&str> = names.to_vec();
        names.sort_by(|a, b| natural_lexical_cmp(a, b));
        for name in names {
            self.generate_operation(name, files)?;
        }
        Ok(())
    }

    /// Generate one operation: input classes, result classes, and the
    /// client method.
    pub fn generate_operation(&self, name: &str, files: &mut dyn FileWriter) -> Result<()> {
        let op = self
            .def
            .operation(name)
            .ok_or_else(|| Error::OperationNotFound(name.to_string()))?;
        tracing::debug!(operation = name, "generating operation");

        let input_classes = InputGenerator::new(self.def, &self.config).generate(op)?;
        let result_classes = ResultGenerator::new(self.def, &self.config).generate(op)?;
        let client = self.client_class(op, files)?;

        for class in input_classes.iter().chain(result_classes.iter()) {
            files.write(class)?;
        }
        files.write(&client)?;
        tracing::debug!(
            operation = name,
            classes = input_classes.len() + result_classes.len() + 1,
            "operation generated"
        );
        Ok(())
    }

    /// Load or create the client class and inject the operation method and
    /// the service hooks.
    fn client_class(&self, op: &Operation, files: &dyn FileWriter) -> Result<ClassFile> {
        let client_name = self.client_name();
        let (mut client, created) =
            ClassMerger::load_or_create(files, &self.config.namespace, &client_name)?;
        if created {
            client.head.push(GENERATED_HEAD.to_string());
            client.head.push(
                "Hand-written methods on this client are preserved when operations are regenerated"
                    .to_string(),
            );
            let service = self
                .def
                .service_full_name()
                .map(|n| n.to_string())
                .unwrap_or_else(|| self.config.namespace.clone());
            client.doc.push(format!("A client for the {} API.", service));
            client.properties.push(Property::new("client", "Client", Vec::new()));
            client.add_method(Method::new(
                "new",
                vec!["Constructs a client backed by the given runtime client.".to_string()],
                "pub fn new(client: Client) -> Self",
                "Self { client }",
            ));
        }
        let runtime = &self.config.runtime_crate;
        client.add_use(format!("{}::Arg", runtime));
        client.add_use(format!("{}::Client", runtime));
        client.add_use(format!("{}::Error", runtime));
        client.add_use(format!("{}::ServiceResult", runtime));
        client.add_use("super::input::*");
        client.add_use("super::result::*");

        if let Some(prefix) = self.def.endpoint_prefix() {
            self.replace_hook(&mut client, "get_service_code", prefix);
        }
        if let Some(version) = self.def.signature_version() {
            self.replace_hook(&mut client, "get_signature_version", version);
        }

        let method = self.operation_method(op, &mut client)?;
        client.remove_method(&method.name);
        client.add_method(method);
        Ok(client)
    }

    /// create the hook method if absent; always refresh its body
    fn replace_hook(&self, client: &mut ClassFile, name: &str, literal: &str) {
        client.remove_method(name);
        client.add_method(Method::new(
            name,
            Vec::new(),
            format!("fn {}(&self) -> &'static str", name),
            format!("\"{}\"", literal),
        ));
    }

    fn operation_method(&self, op: &Operation, client: &mut ClassFile) -> Result<Method> {
        let input_ref = op.input.as_ref().ok_or_else(|| Error::MissingInput(op.name.clone()))?;
        let input_shape = self.def.resolve_shape(&input_ref.shape)?;
        let input_class = class_name(&op.name);
        let required = input_shape.has_required_members();

        // documentation: operation doc plus any reference link
        let mut doc = match self.def.operation_documentation(&op.name) {
            Some(html) => docs::block(html)?,
            None => vec![format!("Invokes the `{}` operation.", op.name)],
        };
        if let Some(url) = &op.documentation_url {
            doc.push(format!("@see {}", url));
        }

        let mut body = Vec::new();
        if required {
            body.push(format!("let input = {}::create(input);", input_class));
        } else {
            body.push(format!(
                "let input = {}::create(input.unwrap_or_default());",
                input_class
            ));
        }
        body.push("input.validate()?;".to_string());

        // payload assembly: streaming member, XML document, or the default
        // form mapping
        let payload_member = input_shape
            .payload
            .as_deref()
            .and_then(|p| input_shape.members.get(p).map(|m| (p, m)));
        match payload_member {
            Some((payload_name, member)) if member.streaming => {
                body.push(format!(
                    "let payload = input.get_{}();",
                    crate::types::field_name(payload_name)
                ));
            }
            Some((payload_name, member)) => {
                let target = self.def.resolve_shape(&member.shape)?;
                if target.shape_type != ShapeType::Structure {
                    return Err(Error::UnsupportedShape(
                        member.shape.clone(),
                        "payload member must be streaming or a structure".to_string(),
                    ));
                }
                let walker = ShapeWalker::new(self.def);
                let config = walker.xml_config(payload_name, member)?;
                client.add_use(format!("{}::XmlBuilder", self.config.runtime_crate));
                body.push(format!("let config = r#\"{}\"#;", config));
                body.push(format!(
                    "let payload = XmlBuilder::from_config(config).build(input.get_{}());",
                    crate::types::field_name(payload_name)
                ));
            }
            None => {
                body.push("let payload = input.request_body();".to_string());
            }
        }

        body.push(format!(
            "let response = self.client.get_response(\n    \"{}\",\n    payload,\n    input.request_headers(),\n    self.client.endpoint(&input.request_uri(), &input.request_query()),\n)?;",
            op.http.method
        ));

        // response wrapping; the client is handed over only for streaming
        // output payloads
        let (return_type, wrap) = match &op.output {
            Some(output_ref) => {
                let output_shape = self.def.resolve_shape(&output_ref.shape)?;
                let result_class = format!("{}Result", class_name(&op.name));
                let streaming_output = output_shape
                    .payload
                    .as_deref()
                    .and_then(|p| output_shape.members.get(p))
                    .map(|m| m.streaming)
                    .unwrap_or(false);
                let populate = if streaming_output {
                    "result.populate_result(&response, Some(&self.client));"
                } else {
                    "result.populate_result(&response, None);"
                };
                (
                    format!("Result<{}, Error>", result_class),
                    format!("let mut result = {}::default();\n{}\nOk(result)", result_class, populate),
                )
            }
            None => (
                "Result<ServiceResult, Error>".to_string(),
                "Ok(ServiceResult::from(response))".to_string(),
            ),
        };
        body.push(wrap);

        let input_param = if required {
            format!("input: Arg<{}>", input_class)
        } else {
            format!("input: Option<Arg<{}>>", input_class)
        };
        Ok(Method::new(
            method_name(&op.name),
            doc,
            format!(
                "pub fn {}(&self, {}) -> {}",
                method_name(&op.name),
                input_param,
                return_type
            ),
            body.join("\n"),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::definition::JsonServiceDefinition;
    use crate::files::MemFileWriter;

    const MODEL: &str = r#"{
        "metadata": {
            "apiVersion": "2012-08-10",
            "endpointPrefix": "email",
            "signatureVersion": "v4",
            "serviceFullName": "Echo Service"
        },
        "operations": {
            "Ping": {
                "name": "Ping",
                "http": { "method": "POST", "requestUri": "/" },
                "input": { "shape": "PingRequest" }
            },
            "Echo": {
                "name": "Echo",
                "http": { "method": "POST", "requestUri": "/" },
                "input": { "shape": "EchoRequest" },
                "output": { "shape": "EchoResponse" },
                "documentation": "<p>Echoes the message back.</p>"
            },
            "UploadObject": {
                "name": "UploadObject",
                "http": { "method": "PUT", "requestUri": "/{Key}" },
                "input": { "shape": "UploadObjectRequest" },
                "output": { "shape": "UploadObjectOutput" }
            },
            "PutTree": {
                "name": "PutTree",
                "http": { "method": "PUT", "requestUri": "/" },
                "input": { "shape": "PutTreeRequest" }
            },
            "ListItems": {
                "name": "ListItems",
                "http": { "method": "POST", "requestUri": "/" },
                "input": { "shape": "PingRequest" },
                "output": { "shape": "ListItemsOutput" },
                "pagination": { "result_key": "Items" }
            },
            "BadOp": {
                "name": "BadOp",
                "http": { "method": "POST", "requestUri": "/" },
                "input": { "shape": "Ghost" }
            }
        },
        "shapes": {
            "PingRequest": { "type": "structure", "members": {} },
            "EchoRequest": {
                "type": "structure",
                "members": { "Message": { "shape": "StringType" } },
                "required": [ "Message" ]
            },
            "EchoResponse": {
                "type": "structure",
                "members": { "Message": { "shape": "StringType" } }
            },
            "UploadObjectRequest": {
                "type": "structure",
                "members": {
                    "Key": { "shape": "StringType", "location": "uri", "locationName": "Key" },
                    "Body": { "shape": "BlobType", "streaming": true }
                },
                "payload": "Body",
                "required": [ "Key" ]
            },
            "UploadObjectOutput": {
                "type": "structure",
                "members": {
                    "ETag": { "shape": "StringType", "location": "header", "locationName": "ETag" }
                }
            },
            "PutTreeRequest": {
                "type": "structure",
                "members": {
                    "Data": { "shape": "Node", "locationName": "TreeDocument", "xmlNamespace": { "uri": "http://example.com/doc/2012-08-10/" } }
                },
                "payload": "Data"
            },
            "Node": {
                "type": "structure",
                "members": {
                    "Child": { "shape": "Node" },
                    "Name": { "shape": "StringType" }
                }
            },
            "ListItemsOutput": {
                "type": "structure",
                "members": { "Items": { "shape": "ItemList" } }
            },
            "ItemList": { "type": "list", "member": { "shape": "Item" } },
            "Item": {
                "type": "structure",
                "members": { "Id": { "shape": "StringType" } }
            },
            "StringType": { "type": "string" },
            "BlobType": { "type": "blob" }
        }
    }"#;

    fn generator(def: &JsonServiceDefinition) -> Generator {
        Generator::new(def, GeneratorConfig::new("email"))
    }

    #[test]
    fn no_input_operation() {
        let def = JsonServiceDefinition::from_json(MODEL).unwrap();
        let gen = generator(&def);
        let mut files = MemFileWriter::new();
        gen.generate_operation("Ping", &mut files).unwrap();

        let input = files.files.get("email::input::Ping").unwrap();
        assert!(input.contains("pub struct Ping;"));
        assert!(input.contains("// nothing to validate"));
        assert!(input.contains("body.insert(\"Action\".to_string(), Value::from(\"Ping\"));"));
        assert!(input.contains("body.insert(\"Version\".to_string(), Value::from(\"2012-08-10\"));"));

        let client = files.files.get("email::EmailClient").unwrap();
        assert!(client.contains("/// A client for the Echo Service API."));
        assert!(client.contains("pub fn ping(&self, input: Option<Arg<Ping>>) -> Result<ServiceResult, Error>"));
        assert!(client.contains("let input = Ping::create(input.unwrap_or_default());"));
        assert!(client.contains("let payload = input.request_body();"));
        assert!(client.contains("Ok(ServiceResult::from(response))"));
    }

    #[test]
    fn required_scalar_input() {
        let def = JsonServiceDefinition::from_json(MODEL).unwrap();
        let gen = generator(&def);
        let mut files = MemFileWriter::new();
        gen.generate_operation("Echo", &mut files).unwrap();

        let input = files.files.get("email::input::Echo").unwrap();
        assert!(input.contains("return Err(MissingParameter::new(\"Message\", \"Echo\"));"));

        let result = files.files.get("email::result::EchoResult").unwrap();
        assert!(result.contains("self.message = xml_value_or_null(data.child(\"Message\"), \"String\");"));

        let client = files.files.get("email::EmailClient").unwrap();
        assert!(client.contains("/// Echoes the message back."));
        assert!(client.contains("pub fn echo(&self, input: Arg<Echo>) -> Result<EchoResult, Error>"));
        assert!(client.contains("input.validate()?;"));
        assert!(client.contains("result.populate_result(&response, None);"));
    }

    #[test]
    fn service_hooks_are_injected_once() {
        let def = JsonServiceDefinition::from_json(MODEL).unwrap();
        let gen = generator(&def);
        let mut files = MemFileWriter::new();
        gen.generate_operation("Ping", &mut files).unwrap();
        gen.generate_operation("Echo", &mut files).unwrap();

        let client = files.files.get("email::EmailClient").unwrap();
        assert_eq!(client.matches("fn get_service_code(&self) -> &'static str").count(), 1);
        assert_eq!(client.matches("fn get_signature_version(&self) -> &'static str").count(), 1);
        assert!(client.contains("\"email\""));
        assert!(client.contains("\"v4\""));
        // both operations coexist
        assert!(client.contains("pub fn ping("));
        assert!(client.contains("pub fn echo("));
    }

    #[test]
    fn streaming_input_payload() {
        let def = JsonServiceDefinition::from_json(MODEL).unwrap();
        let gen = generator(&def);
        let mut files = MemFileWriter::new();
        gen.generate_operation("UploadObject", &mut files).unwrap();

        let input = files.files.get("email::input::UploadObject").unwrap();
        assert!(input.contains("body: StreamingBody,"));

        let client = files.files.get("email::EmailClient").unwrap();
        assert!(client.contains("let payload = input.get_body();"));
        assert!(!client.contains("XmlBuilder"));
    }

    #[test]
    fn structure_payload_uses_xml_builder() {
        let def = JsonServiceDefinition::from_json(MODEL).unwrap();
        let gen = generator(&def);
        let mut files = MemFileWriter::new();
        gen.generate_operation("PutTree", &mut files).unwrap();

        let client = files.files.get("email::EmailClient").unwrap();
        assert!(client.contains("let config = r#\"{"));
        assert!(client.contains("\"_root\""));
        assert!(client.contains("\"TreeDocument\""));
        assert!(client.contains("http://example.com/doc/2012-08-10/"));
        assert!(client.contains("let payload = XmlBuilder::from_config(config).build(input.get_data());"));
        // cyclic payload shape appears once in the pruned config
        let config_line = client.lines().find(|l| l.contains("let config")).unwrap();
        assert_eq!(config_line.matches("\"Node\":{").count(), 1);
    }

    #[test]
    fn paginated_operation() {
        let def = JsonServiceDefinition::from_json(MODEL).unwrap();
        let gen = generator(&def);
        let mut files = MemFileWriter::new();
        gen.generate_operation("ListItems", &mut files).unwrap();

        let result = files.files.get("email::result::ListItemsResult").unwrap();
        assert!(result.contains("pub fn get_items(&self, current_page_only: bool)"));
        assert!(result.contains("impl IntoIterator for ListItemsResult {"));
        assert!(files.files.contains_key("email::result::Item"));
    }

    #[test]
    fn regeneration_is_idempotent_and_preserves_hand_written_methods() {
        let def = JsonServiceDefinition::from_json(MODEL).unwrap();
        let gen = generator(&def);
        let mut files = MemFileWriter::new();
        gen.generate_operation("Echo", &mut files).unwrap();
        let first = files.files.clone();

        gen.generate_operation("Echo", &mut files).unwrap();
        assert_eq!(files.files, first);

        // hand edit: add a method to the client, then regenerate
        use crate::files::FileWriter;
        let source = files.files.get("email::EmailClient").unwrap().clone();
        let mut client = ClassMerger::parse("email", "EmailClient", &source).unwrap();
        client.add_method(Method::new(
            "hand_written",
            vec!["added by hand".to_string()],
            "pub fn hand_written(&self) -> bool",
            "true",
        ));
        files.write(&client).unwrap();

        gen.generate_operation("Echo", &mut files).unwrap();
        let merged = files.files.get("email::EmailClient").unwrap();
        assert!(merged.contains("pub fn hand_written(&self) -> bool"));
        assert!(merged.contains("added by hand"));
        assert_eq!(merged.matches("pub fn echo(").count(), 1);

        // input and result classes are rewritten identically
        assert_eq!(files.files.get("email::input::Echo"), first.get("email::input::Echo"));
        assert_eq!(
            files.files.get("email::result::EchoResult"),
            first.get("email::result::EchoResult")
        );
    }

    #[test]
    fn schema_errors_leave_no_partial_files() {
        let def = JsonServiceDefinition::from_json(MODEL).unwrap();
        let gen = generator(&def);
        let mut files = MemFileWriter::new();
        let err = gen.generate_operation("BadOp", &mut files).unwrap_err();
        assert!(err.is_schema_error());
        assert!(files.files.is_empty());

        assert!(matches!(
            gen.generate_operation("Nope", &mut files),
            Err(Error::OperationNotFound(_))
        ));
        assert!(files.files.is_empty());
    }

    #[test]
    fn operations_generate_in_lexical_order() {
        let def = JsonServiceDefinition::from_json(MODEL).unwrap();
        let gen = generator(&def);
        let mut files = MemFileWriter::new();
        gen.generate_operations(&["Ping", "Echo"], &mut files).unwrap();
        let client = files.files.get("email::EmailClient").unwrap();
        let echo_at = client.find("pub fn echo(").unwrap();
        let ping_at = client.find("pub fn ping(").unwrap();
        assert!(echo_at < ping_at);
    }
}
