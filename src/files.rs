//! Class persistence
//!
//! The generator produces [`ClassFile`] values; where they live on disk is
//! the writer's concern. `FsFileWriter` maps `ns::Name` to
//! `<base>/<ns path>/<snake(name)>.rs`; `MemFileWriter` backs tests.

use std::{collections::BTreeMap, path::PathBuf};

use crate::{class::ClassFile, strings::to_snake_case, Result};

pub trait FileWriter {
    /// persist one class, overwriting any previous file
    fn write(&mut self, class: &ClassFile) -> Result<()>;
    /// source of a previously written class, if present
    fn read(&self, fqn: &str) -> Result<Option<String>>;
    /// remove a class file; removing an absent class is not an error
    fn delete(&mut self, fqn: &str) -> Result<()>;
}

pub struct FsFileWriter {
    base: PathBuf,
}

impl FsFileWriter {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        FsFileWriter { base: base.into() }
    }

    fn path_for(&self, fqn: &str) -> PathBuf {
        let mut path = self.base.clone();
        let segments: Vec<&str> = fqn.split("::").collect();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            path.push(to_snake_case(segment));
        }
        if let Some(name) = segments.last() {
            path.push(format!("{}.rs", to_snake_case(name)));
        }
        path
    }
}

impl FileWriter for FsFileWriter {
    fn write(&mut self, class: &ClassFile) -> Result<()> {
        let path = self.path_for(&class.fqn());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, class.render())?;
        tracing::debug!(path = %path.display(), "wrote class");
        Ok(())
    }

    fn read(&self, fqn: &str) -> Result<Option<String>> {
        let path = self.path_for(fqn);
        match std::fs::read_to_string(&path) {
            Ok(source) => Ok(Some(source)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&mut self, fqn: &str) -> Result<()> {
        let path = self.path_for(fqn);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory writer keyed by fully qualified name.
#[derive(Default)]
pub struct MemFileWriter {
    pub files: BTreeMap<String, String>,
}

impl MemFileWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileWriter for MemFileWriter {
    fn write(&mut self, class: &ClassFile) -> Result<()> {
        self.files.insert(class.fqn(), class.render());
        Ok(())
    }

    fn read(&self, fqn: &str) -> Result<Option<String>> {
        Ok(self.files.get(fqn).cloned())
    }

    fn delete(&mut self, fqn: &str) -> Result<()> {
        self.files.remove(fqn);
        Ok(())
    }
}
