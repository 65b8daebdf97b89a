//! Idempotent re-emission
//!
//! The client class outlives any single generation run and may carry
//! hand-written methods. Rather than a full language parse, the merger
//! reads the canonical emitted layout back into a [`ClassFile`]: header
//! comment, imports, struct block (verbatim), one `impl` block split into
//! per-method verbatim chunks, and trailing blocks. Everything the
//! generator does not explicitly touch survives a rewrite byte-for-byte.
//!
//! The brace scanner understands strings, raw strings, char literals, and
//! line comments, so method boundaries hold even when bodies embed `{`
//! in literals (URI templates, XML builder configs).

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    class::{ClassFile, Method},
    files::FileWriter,
    Error, Result,
};

lazy_static! {
    static ref STRUCT_NAME: Regex = Regex::new(r"pub struct (\w+)").unwrap();
    static ref FN_NAME: Regex = Regex::new(r"fn\s+(\w+)").unwrap();
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ScanState {
    Normal,
    Str,
    RawStr(usize),
}

/// brace depth delta of one line, tracking literal state across lines
fn scan_line(line: &str, state: &mut ScanState) -> i32 {
    let chars: Vec<char> = line.chars().collect();
    let mut delta = 0;
    let mut i = 0;
    while i < chars.len() {
        match *state {
            ScanState::Str => match chars[i] {
                '\\' => i += 1,
                '"' => *state = ScanState::Normal,
                _ => {}
            },
            ScanState::RawStr(hashes) => {
                if chars[i] == '"' && (0..hashes).all(|k| chars.get(i + 1 + k) == Some(&'#')) {
                    *state = ScanState::Normal;
                    i += hashes;
                }
            }
            ScanState::Normal => match chars[i] {
                '/' if chars.get(i + 1) == Some(&'/') => break,
                '{' => delta += 1,
                '}' => delta -= 1,
                '"' => *state = ScanState::Str,
                'r' => {
                    let mut j = i + 1;
                    let mut hashes = 0;
                    while chars.get(j) == Some(&'#') {
                        hashes += 1;
                        j += 1;
                    }
                    if chars.get(j) == Some(&'"') {
                        *state = ScanState::RawStr(hashes);
                        i = j;
                    }
                }
                '\'' => {
                    // char literal when it closes within a few chars; else a lifetime
                    if chars.get(i + 1) == Some(&'\\') {
                        if let Some(offset) = (2..6).find(|k| chars.get(i + k) == Some(&'\'')) {
                            i += offset;
                        }
                    } else if chars.get(i + 2) == Some(&'\'') {
                        i += 2;
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    delta
}

pub struct ClassMerger;

impl ClassMerger {
    /// Load an emitted class from the writer if present, otherwise start a
    /// fresh one. The second value is true when the class was created.
    pub fn load_or_create(
        files: &dyn FileWriter,
        namespace: &str,
        name: &str,
    ) -> Result<(ClassFile, bool)> {
        match files.read(&format!("{}::{}", namespace, name))? {
            Some(source) => Ok((Self::parse(namespace, name, &source)?, false)),
            None => Ok((ClassFile::new(namespace, name), true)),
        }
    }

    /// Parse canonically emitted source back into a mutable class.
    pub fn parse(namespace: &str, name: &str, source: &str) -> Result<ClassFile> {
        let mut class = ClassFile::new(namespace, name);
        let lines: Vec<&str> = source.lines().collect();
        let mut i = 0;

        // preamble: header comment, imports, class doc
        while i < lines.len() {
            let line = lines[i].trim_end();
            if let Some(doc) = line.strip_prefix("///") {
                class.doc.push(doc.trim_start().to_string());
            } else if let Some(comment) = line.strip_prefix("//") {
                class.head.push(comment.trim_start().to_string());
            } else if let Some(import) = line.strip_prefix("use ") {
                class.uses.push(import.trim_end_matches(';').to_string());
            } else if line == "#[allow(unused_imports)]" {
                // re-emitted with the import block on render
            } else if !line.is_empty() {
                break;
            }
            i += 1;
        }

        // struct block, kept verbatim
        let mut block: Vec<&str> = Vec::new();
        let mut state = ScanState::Normal;
        let mut depth = 0;
        let mut opened = false;
        while i < lines.len() {
            let line = lines[i];
            block.push(line);
            let delta = scan_line(line, &mut state);
            depth += delta;
            opened = opened || delta > 0;
            i += 1;
            let trimmed = line.trim();
            if trimmed.starts_with("pub struct") && trimmed.ends_with(';') {
                break;
            }
            if opened && depth == 0 {
                break;
            }
        }
        let struct_block = block.join("\n");
        match STRUCT_NAME.captures(&struct_block) {
            Some(caps) if &caps[1] == name => {}
            Some(caps) => {
                return Err(Error::Merge(
                    name.to_string(),
                    format!("file declares struct {}", &caps[1]),
                ))
            }
            None => {
                return Err(Error::Merge(name.to_string(), "no struct declaration found".to_string()))
            }
        }
        class.struct_verbatim = Some(struct_block);

        while i < lines.len() && lines[i].trim().is_empty() {
            i += 1;
        }

        // the class impl block, split into per-method chunks
        if i < lines.len() && lines[i].trim_end() == format!("impl {} {{", name) {
            i += 1;
            let mut state = ScanState::Normal;
            loop {
                while i < lines.len() && lines[i].trim().is_empty() {
                    i += 1;
                }
                if i >= lines.len() {
                    return Err(Error::Merge(name.to_string(), "unterminated impl block".to_string()));
                }
                if lines[i].trim_end() == "}" {
                    i += 1;
                    break;
                }
                let mut chunk: Vec<&str> = Vec::new();
                let mut depth = 0;
                let mut opened = false;
                while i < lines.len() {
                    let line = lines[i];
                    chunk.push(line);
                    let delta = scan_line(line, &mut state);
                    depth += delta;
                    opened = opened || delta > 0;
                    i += 1;
                    if opened && depth == 0 {
                        break;
                    }
                }
                let text = chunk.join("\n");
                let method_name = FN_NAME
                    .captures(&text)
                    .map(|caps| caps[1].to_string())
                    .unwrap_or_default();
                class.methods.push(Method::verbatim(method_name, text));
            }
        }

        // anything after the impl block: trailing items, kept verbatim and
        // grouped on blank lines at top level
        let mut state = ScanState::Normal;
        let mut depth = 0;
        let mut chunk: Vec<&str> = Vec::new();
        while i < lines.len() {
            let line = lines[i];
            if line.trim().is_empty() && depth == 0 {
                if !chunk.is_empty() {
                    class.extra.push(chunk.join("\n"));
                    chunk.clear();
                }
            } else {
                chunk.push(line);
                depth += scan_line(line, &mut state);
            }
            i += 1;
        }
        if !chunk.is_empty() {
            class.extra.push(chunk.join("\n"));
        }

        Ok(class)
    }
}
