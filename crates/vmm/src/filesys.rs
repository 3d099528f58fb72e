//! The file-system seam used to read executable images.

/// An open file positioned by explicit offsets.
pub trait OpenFile {
    /// Reads up to `buf.len()` bytes starting at `offset`, returning the
    /// number of bytes actually read. A short count means the file ends
    /// before the requested range.
    fn read_at(&mut self, buf: &mut [u8], offset: usize) -> usize;
}

/// Opens executables by name.
pub trait FileSystem {
    /// The handle type for an open file.
    type File: OpenFile;

    /// Opens a file, or `None` if no such file exists.
    fn open(&self, name: &str) -> Option<Self::File>;
}
