use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use log::debug;

use crate::error::TypeError;
use crate::file_entry::FileEntry;
use crate::name::validate_name;

/// A named node of the archived tree, owning its nested containers and
/// files.
///
/// Children are owned; there is no pointer back to the parent. Code that
/// walks a tree (the decoder's sinks, the encoder) keeps the ancestry on an
/// explicit stack and derives diagnostic paths such as `job42/sub` from it.
/// Names are not unique keys, siblings may share one.
#[derive(Clone, Debug, Default)]
pub struct Container {
    name: String,
    containers: Vec<Container>,
    files: Vec<FileEntry>,
}

impl Container {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            containers: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Append a file and return `self`, for building trees inline.
    #[must_use]
    pub fn with_file(mut self, file: FileEntry) -> Self {
        self.files.push(file);
        self
    }

    /// Append a nested container and return `self`.
    #[must_use]
    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }

    pub fn add_file(&mut self, file: FileEntry) {
        self.files.push(file);
    }

    pub fn add_container(&mut self, container: Container) {
        self.containers.push(container);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Number of files in the whole subtree.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.containers.iter().map(Container::file_count).sum::<usize>()
    }

    /// Number of containers below this one (the container itself excluded).
    pub fn container_count(&self) -> usize {
        self.containers.len()
            + self
                .containers
                .iter()
                .map(Container::container_count)
                .sum::<usize>()
    }

    /// Sum of the declared sizes of every file in the subtree.
    pub fn data_size(&self) -> u64 {
        self.files.iter().map(FileEntry::size).sum::<u64>()
            + self.containers.iter().map(Container::data_size).sum::<u64>()
    }

    /// Check every container and file name in the subtree for characters
    /// that would break the wire framing.
    ///
    /// # Errors
    ///
    /// Returns the first [`TypeError::InvalidName`] found, depth first.
    pub fn validate(&self) -> Result<(), TypeError> {
        validate_name(&self.name)?;
        for file in &self.files {
            validate_name(file.name())?;
        }
        self.containers.iter().try_for_each(Container::validate)
    }

    /// Whether `other` has the same names, nesting, mime types and file
    /// sizes, in the same order. File contents are not compared.
    pub fn same_structure(&self, other: &Container) -> bool {
        self.name == other.name
            && self.files.len() == other.files.len()
            && self.containers.len() == other.containers.len()
            && self.files.iter().zip(&other.files).all(|(a, b)| {
                a.name() == b.name() && a.mime_type() == b.mime_type() && a.size() == b.size()
            })
            && self
                .containers
                .iter()
                .zip(&other.containers)
                .all(|(a, b)| a.same_structure(b))
    }

    /// Indented rendering of the tree, nested containers before files.
    ///
    /// ```text
    /// job42/
    ///   sub/
    ///     b.bin (application/octet-stream, 3 bytes)
    ///   a.bin (application/octet-stream, 7 bytes)
    /// ```
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0);
        out.truncate(out.trim_end().len());
        out
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        let _ = writeln!(out, "{pad}{}/", self.name);
        for child in &self.containers {
            child.write_outline(out, depth + 1);
        }
        for file in &self.files {
            let _ = writeln!(
                out,
                "{pad}  {} ({}, {} bytes)",
                file.name(),
                file.mime_type(),
                file.size()
            );
        }
    }

    /// Describe a directory as a container tree.
    ///
    /// Sub-directories become nested containers and regular files become
    /// file entries of type `mime_type`; anything else is skipped. Entries
    /// are sorted by name. File contents are not read, only sized.
    ///
    /// # Errors
    ///
    /// - [`TypeError::NotADirectory`] if `path` is not a directory.
    /// - [`TypeError::InvalidName`] for names that are not UTF-8.
    /// - [`TypeError::Io`] for failures while walking.
    pub fn from_directory(path: impl AsRef<Path>, mime_type: &str) -> Result<Self, TypeError> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(TypeError::NotADirectory {
                path: path.display().to_string(),
            });
        }

        let absolute = path.canonicalize()?;
        let name = utf8_name(absolute.file_name().map(|n| n.to_os_string()), &absolute)?;
        let mut container = Container::new(name);

        let mut entries = fs::read_dir(&absolute)?.collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(fs::DirEntry::file_name);

        for entry in entries {
            let entry_path = entry.path();
            let metadata = fs::metadata(&entry_path)?;
            if metadata.is_dir() {
                container.add_container(Container::from_directory(&entry_path, mime_type)?);
            } else if metadata.is_file() {
                debug!("including {} in the container", entry_path.display());
                let file_name = utf8_name(Some(entry.file_name()), &entry_path)?;
                container.add_file(FileEntry::from_path(file_name, mime_type, &entry_path)?);
            } else {
                debug!(
                    "skipping {}: neither a file nor a directory",
                    entry_path.display()
                );
            }
        }

        Ok(container)
    }
}

fn utf8_name(name: Option<std::ffi::OsString>, path: &Path) -> Result<String, TypeError> {
    name.and_then(|n| n.into_string().ok())
        .ok_or_else(|| TypeError::InvalidName {
            name: path.display().to_string(),
            reason: "name is missing or not UTF-8",
        })
}
