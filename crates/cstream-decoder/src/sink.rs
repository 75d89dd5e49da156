use std::io;

/// Receiver of the structural events produced by
/// [`StreamDecoder`](crate::StreamDecoder).
///
/// Every method has a no-op default, so an implementation only overrides
/// the events it cares about. Events always arrive well nested:
///
/// ```text
///   start_container("job42")
///     start_file("a.bin", ..)  handle_data(..)*  end_file()
///     start_container("sub")
///       start_file("b.bin", ..)  handle_data(..)*  end_file()
///     end_container()
///   end_container()
/// ```
///
/// Any error returned here aborts the decode as
/// [`DecodeError::Sink`](crate::DecodeError::Sink).
pub trait ContainerEventSink {
    /// A container's headers have been read.
    fn start_container(&mut self, _name: &str) -> io::Result<()> {
        Ok(())
    }

    /// The final delimiter of the innermost open container was read.
    fn end_container(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// A file part's headers have been read; its data follows.
    fn start_file(&mut self, _name: &str, _mime_type: &str) -> io::Result<()> {
        Ok(())
    }

    /// A run of the current file's bytes.
    ///
    /// Returns how many bytes were consumed from the front of `data`. The
    /// unconsumed tail is the leftover: the decoder keeps it and offers it
    /// again, followed by fresh bytes, on the next call. Leaving bytes
    /// behind is only allowed while `more_expected` is true; on the last
    /// call for a file everything must be consumed.
    fn handle_data(&mut self, data: &[u8], _more_expected: bool) -> io::Result<usize> {
        Ok(data.len())
    }

    /// All of the current file's bytes have been delivered.
    fn end_file(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: ContainerEventSink + ?Sized> ContainerEventSink for &mut S {
    fn start_container(&mut self, name: &str) -> io::Result<()> {
        (**self).start_container(name)
    }

    fn end_container(&mut self) -> io::Result<()> {
        (**self).end_container()
    }

    fn start_file(&mut self, name: &str, mime_type: &str) -> io::Result<()> {
        (**self).start_file(name, mime_type)
    }

    fn handle_data(&mut self, data: &[u8], more_expected: bool) -> io::Result<usize> {
        (**self).handle_data(data, more_expected)
    }

    fn end_file(&mut self) -> io::Result<()> {
        (**self).end_file()
    }
}

/// A sink that ignores everything, for validating a stream's framing.
impl ContainerEventSink for () {}
