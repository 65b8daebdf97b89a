//! Emitted class model
//!
//! Generators assemble a [`ClassFile`] in memory and render it to Rust
//! source as a last step. The layout is canonical: header comment,
//! imports, one struct, one `impl` block, then any trailing blocks. The
//! merger ([`crate::ClassMerger`]) parses the same layout back, so a
//! parse-then-render round trip is byte-stable.

use crate::writer::Writer;

pub const DERIVE_LINE: &str = "#[derive(Clone, Debug, Default)]";

/// A struct field of an emitted class.
#[derive(Clone, Debug)]
pub struct Property {
    pub name: String,
    pub type_name: String,
    pub doc: Vec<String>,
}

impl Property {
    pub fn new<S: Into<String>, T: Into<String>>(name: S, type_name: T, doc: Vec<String>) -> Self {
        Property { name: name.into(), type_name: type_name.into(), doc }
    }
}

/// A method of an emitted class. Freshly generated methods carry doc,
/// signature, and body; methods loaded from disk are kept verbatim.
#[derive(Clone, Debug)]
pub struct Method {
    pub name: String,
    pub doc: Vec<String>,
    /// everything between visibility and the opening brace,
    /// e.g. `pub fn create(input: Arg<Echo>) -> Self`
    pub signature: String,
    /// body lines with indentation relative to the body itself
    pub body: String,
    /// exact source of a method loaded from an existing file
    pub verbatim: Option<String>,
}

impl Method {
    pub fn new<N: Into<String>, S: Into<String>, B: Into<String>>(
        name: N,
        doc: Vec<String>,
        signature: S,
        body: B,
    ) -> Self {
        Method {
            name: name.into(),
            doc,
            signature: signature.into(),
            body: body.into(),
            verbatim: None,
        }
    }

    pub fn verbatim<N: Into<String>, S: Into<String>>(name: N, source: S) -> Self {
        Method {
            name: name.into(),
            doc: Vec::new(),
            signature: String::new(),
            body: String::new(),
            verbatim: Some(source.into()),
        }
    }

    fn render(&self, w: &mut Writer) {
        if let Some(source) = &self.verbatim {
            w.write(source.as_str());
            w.write(b"\n");
            return;
        }
        w.doc(1, &self.doc);
        w.line(1, &format!("{} {{", self.signature));
        for line in self.body.lines() {
            if line.is_empty() {
                w.blank();
            } else {
                w.line(2, line);
            }
        }
        w.line(1, "}");
    }
}

/// An emitted class: namespace, name, imports, fields, and methods,
/// plus the base type and capability tags of the abstract class model.
#[derive(Clone, Debug, Default)]
pub struct ClassFile {
    pub namespace: String,
    pub name: String,
    /// header comment lines, without the comment prefix
    pub head: Vec<String>,
    pub doc: Vec<String>,
    /// import paths; rendered sorted and deduplicated
    pub uses: Vec<String>,
    /// runtime base type; rendered as a leading field plus a Deref block
    pub base: Option<String>,
    /// capability tags, e.g. `iterable-aggregate`
    pub implements: Vec<String>,
    pub properties: Vec<Property>,
    /// exact struct block of a class loaded from an existing file
    pub struct_verbatim: Option<String>,
    pub methods: Vec<Method>,
    /// trailing blocks (trait impls, hand-written items), kept verbatim
    pub extra: Vec<String>,
}

impl ClassFile {
    pub fn new<N: Into<String>, C: Into<String>>(namespace: N, name: C) -> Self {
        ClassFile { namespace: namespace.into(), name: name.into(), ..Default::default() }
    }

    /// fully qualified name, e.g. `ses::input::Echo`
    pub fn fqn(&self) -> String {
        format!("{}::{}", self.namespace, self.name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name == name)
    }

    pub fn remove_method(&mut self, name: &str) {
        self.methods.retain(|m| m.name != name);
    }

    pub fn add_method(&mut self, method: Method) {
        self.methods.push(method);
    }

    pub fn add_use<S: Into<String>>(&mut self, path: S) {
        let path = path.into();
        if !self.uses.contains(&path) {
            self.uses.push(path);
        }
    }

    pub fn render(&self) -> String {
        let mut w = Writer::default();
        for line in &self.head {
            w.line(0, &format!("// {}", line));
        }
        if !self.head.is_empty() {
            w.blank();
        }

        let mut uses = self.uses.clone();
        uses.sort();
        uses.dedup();
        if !uses.is_empty() {
            w.line(0, "#[allow(unused_imports)]");
        }
        for path in &uses {
            w.line(0, &format!("use {};", path));
        }
        if !uses.is_empty() {
            w.blank();
        }

        w.doc(0, &self.doc);
        if let Some(block) = &self.struct_verbatim {
            w.write(block.as_str());
            w.write(b"\n");
        } else if self.properties.is_empty() && self.base.is_none() {
            w.line(0, DERIVE_LINE);
            w.line(0, &format!("pub struct {};", self.name));
        } else {
            w.line(0, DERIVE_LINE);
            w.line(0, &format!("pub struct {} {{", self.name));
            if let Some(base) = &self.base {
                w.line(1, &format!("base: {},", base));
            }
            for property in &self.properties {
                w.doc(1, &property.doc);
                w.line(1, &format!("{}: {},", property.name, property.type_name));
            }
            w.line(0, "}");
        }

        if !self.methods.is_empty() {
            w.blank();
            w.line(0, &format!("impl {} {{", self.name));
            for (i, method) in self.methods.iter().enumerate() {
                if i > 0 {
                    w.blank();
                }
                method.render(&mut w);
            }
            w.line(0, "}");
        }

        if let Some(base) = &self.base {
            w.blank();
            w.line(0, &format!("impl std::ops::Deref for {} {{", self.name));
            w.line(1, &format!("type Target = {};", base));
            w.blank();
            w.line(1, "fn deref(&self) -> &Self::Target {");
            w.line(2, "&self.base");
            w.line(1, "}");
            w.line(0, "}");
        }

        for block in &self.extra {
            w.blank();
            w.write(block.as_str());
            w.write(b"\n");
        }

        w.into_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn renders_canonical_layout() {
        let mut class = ClassFile::new("ses::input", "Echo");
        class.head.push("generated file".to_string());
        class.add_use("aws_core::Value");
        class.add_use("aws_core::Arg");
        class.add_use("aws_core::Arg"); // duplicate, dropped on render
        class.doc.push("Input for the Echo operation.".to_string());
        class.properties.push(Property::new(
            "message",
            "Option<String>",
            vec!["the text".to_string()],
        ));
        class.add_method(Method::new(
            "get_message",
            vec![],
            "pub fn get_message(&self) -> &Option<String>",
            "&self.message",
        ));

        let source = class.render();
        let expected = r#"// generated file

#[allow(unused_imports)]
use aws_core::Arg;
use aws_core::Value;

/// Input for the Echo operation.
#[derive(Clone, Debug, Default)]
pub struct Echo {
    /// the text
    message: Option<String>,
}

impl Echo {
    pub fn get_message(&self) -> &Option<String> {
        &self.message
    }
}
"#;
        assert_eq!(source, expected);
        assert_eq!(class.fqn(), "ses::input::Echo");
    }

    #[test]
    fn renders_base_as_deref() {
        let mut class = ClassFile::new("ses::result", "EchoResult");
        class.base = Some("aws_core::ServiceResult".to_string());
        class.add_method(Method::new("a", vec![], "pub fn a(&self)", ""));
        let source = class.render();
        assert!(source.contains("base: aws_core::ServiceResult,"));
        assert!(source.contains("impl std::ops::Deref for EchoResult {"));
        assert!(source.contains("type Target = aws_core::ServiceResult;"));
    }

    #[test]
    fn empty_class_is_a_unit_struct() {
        let class = ClassFile::new("ses::input", "Ping");
        assert!(class.render().contains("pub struct Ping;"));
    }

    #[test]
    fn method_mutation() {
        let mut class = ClassFile::new("ses", "Client");
        class.add_method(Method::new("ping", vec![], "pub fn ping(&self)", ""));
        assert!(class.has_method("ping"));
        class.remove_method("ping");
        assert!(!class.has_method("ping"));
    }
}
