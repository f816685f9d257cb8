use memmap::Mmap;
use std::fs::File;
use std::ops::Deref;

/// File extension every fsnail source file has to carry
pub const SOURCE_EXTENSION: &str = ".fsn";

/// Where the program text comes from
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// A path to a source file on disk
    File(String),
    /// Program text held in memory
    Text(String),
}

/// Raw bytes of a program, either memory mapped from disk or owned
#[derive(Debug)]
pub enum SourceBuf {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for SourceBuf {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        match self {
            SourceBuf::Mapped(map) => map,
            SourceBuf::Owned(bytes) => bytes,
        }
    }
}

impl SourceBuf {
    /// Maps the given file into memory. Empty files are not mapped, since a zero length mapping
    /// is rejected by the OS.
    pub fn map(file: &File) -> std::io::Result<SourceBuf> {
        if file.metadata()?.len() == 0 {
            return Ok(SourceBuf::Owned(vec![]));
        }
        let map = unsafe { Mmap::map(file)? };

        Ok(SourceBuf::Mapped(map))
    }
}

/// Checks the file naming convention, `name.fsn` with a non-empty name
pub fn has_source_extension(file_name: &str) -> bool {
    file_name.len() > SOURCE_EXTENSION.len() && file_name.ends_with(SOURCE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::{has_source_extension, SourceBuf};
    use std::fs::File;

    #[test]
    fn extension() {
        assert!(has_source_extension("hello.fsn"));
        assert!(has_source_extension("dir/a.fsn"));
        assert!(!has_source_extension(".fsn"));
        assert!(!has_source_extension("hello.fs"));
        assert!(!has_source_extension("hello.fsn.txt"));
    }

    #[test]
    fn map_file() -> std::io::Result<()> {
        let file = File::open("resources/arithmetic.fsn")?;
        let buf = SourceBuf::map(&file)?;
        assert!(buf.starts_with(b"-->"));

        Ok(())
    }

    #[test]
    fn map_empty_file() -> std::io::Result<()> {
        let file = File::open("resources/empty.fsn")?;
        let buf = SourceBuf::map(&file)?;
        assert!(buf.is_empty());

        Ok(())
    }
}
