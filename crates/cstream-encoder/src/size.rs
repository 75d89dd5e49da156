use cstream_types::Container;
use cstream_wire::template::{CONTAINER_HEADERS, DELIMITER, FILE_HEADERS, FINAL_DELIMITER};

/// Exact number of bytes [`StreamEncoder`](crate::StreamEncoder) emits for
/// `container`, computed without touching any file data.
///
/// ```text
/// size(C) = CONTAINER_HEADERS(C.name)
///         + Σ nested   DELIMITER + size(child)
///         + Σ files    DELIMITER + FILE_HEADERS(f.name, f.mime) + f.size
///         + FINAL_DELIMITER
/// ```
///
/// The result is typically sent ahead of the body as a content length, so
/// it has to match the emitted stream to the byte.
pub fn compute_total_size(container: &Container) -> u64 {
    let nested: u64 = container
        .containers()
        .iter()
        .map(|child| DELIMITER.fixed_len() + compute_total_size(child))
        .sum();
    let files: u64 = container
        .files()
        .iter()
        .map(|f| DELIMITER.fixed_len() + FILE_HEADERS.len(f.name(), f.mime_type()) + f.size())
        .sum();

    CONTAINER_HEADERS.len(container.name(), "") + nested + files + FINAL_DELIMITER.fixed_len()
}
