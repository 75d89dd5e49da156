use std::io;

use cstream_types::{Container, FileEntry};
use log::debug;

use crate::sink::ContainerEventSink;

/// Builds an in-memory [`Container`] tree from decoder events.
///
/// Only structure is kept: names, nesting, mime types and the number of
/// bytes each file carried. The open containers live on a stack; a
/// container is linked under its parent when it closes, and the first
/// container opened becomes the root.
#[derive(Debug, Default)]
pub struct TreeBuildingSink {
    open: Vec<Container>,
    root: Option<Container>,
    file: Option<PendingFile>,
}

#[derive(Debug)]
struct PendingFile {
    name: String,
    mime_type: String,
    size: u64,
}

impl TreeBuildingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The root container, once it has been closed.
    pub fn root(&self) -> Option<&Container> {
        self.root.as_ref()
    }

    pub fn into_root(self) -> Option<Container> {
        self.root
    }

    /// Containers opened but not yet closed, outermost first, with the
    /// children received so far. After a failed decode this is the partial
    /// structure.
    pub fn open_containers(&self) -> &[Container] {
        &self.open
    }

    /// Slash-separated names of the currently open containers.
    pub fn path(&self) -> String {
        self.open
            .iter()
            .map(Container::name)
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.open.len()
    }
}

impl ContainerEventSink for TreeBuildingSink {
    fn start_container(&mut self, name: &str) -> io::Result<()> {
        debug!("found container {name}");
        self.open.push(Container::new(name));
        Ok(())
    }

    fn end_container(&mut self) -> io::Result<()> {
        let done = self
            .open
            .pop()
            .ok_or_else(|| io::Error::other("end_container without an open container"))?;
        match self.open.last_mut() {
            Some(parent) => parent.add_container(done),
            None => self.root = Some(done),
        }
        Ok(())
    }

    fn start_file(&mut self, name: &str, mime_type: &str) -> io::Result<()> {
        debug!("found file {name}");
        self.file = Some(PendingFile {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size: 0,
        });
        Ok(())
    }

    fn handle_data(&mut self, data: &[u8], _more_expected: bool) -> io::Result<usize> {
        if let Some(file) = self.file.as_mut() {
            file.size += data.len() as u64;
        }
        Ok(data.len())
    }

    fn end_file(&mut self) -> io::Result<()> {
        let file = self
            .file
            .take()
            .ok_or_else(|| io::Error::other("end_file without an open file"))?;
        let parent = self
            .open
            .last_mut()
            .ok_or_else(|| io::Error::other("file outside of any container"))?;
        parent.add_file(FileEntry::placeholder(file.name, file.mime_type, file.size));
        Ok(())
    }
}
