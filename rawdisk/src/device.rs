// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;

use anyhow::Context;

/// An image file or device node opened by path.
pub struct Disk {
    pub file: File,
    pub size: u64,
}

impl Disk {
    pub fn open_read(path: &Path) -> anyhow::Result<Self> {
        let file = File::options()
            .read(true)
            .open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        Self::with_file(file, path)
    }

    /// Opens for read/write without truncating.
    pub fn open_rw(path: &Path) -> anyhow::Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("opening {} for writing", path.display()))?;
        Self::with_file(file, path)
    }

    /// Creates `path` when missing; an existing file keeps its size and content.
    pub fn open_or_create(path: &Path) -> anyhow::Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
        Self::with_file(file, path)
    }

    fn with_file(mut file: File, path: &Path) -> anyhow::Result<Self> {
        // Device nodes report a zero metadata length; seeking to the end works for both.
        let size = file
            .seek(SeekFrom::End(0))
            .with_context(|| format!("sizing {}", path.display()))?;
        file.rewind()?;
        crate::log_verbose!("{}: {} bytes", path.display(), size);
        Ok(Self { file, size })
    }

    pub fn io(&mut self) -> rawio::prelude::StdBlockIO<'_, File> {
        rawio::prelude::StdBlockIO::new(&mut self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawio::prelude::*;

    #[test]
    fn sizes_and_io() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.as_file().set_len(8192).unwrap();

        let mut disk = Disk::open_rw(tmp.path()).unwrap();
        assert_eq!(disk.size, 8192);
        disk.io().write_at(4096, &[7u8; 16]).unwrap();

        let mut disk = Disk::open_read(tmp.path()).unwrap();
        let mut buf = [0u8; 16];
        disk.io().read_at(4096, &mut buf).unwrap();
        assert_eq!(buf, [7u8; 16]);

        let missing = tmp.path().with_extension("new");
        let disk = Disk::open_or_create(&missing).unwrap();
        assert_eq!(disk.size, 0);
        std::fs::remove_file(missing).unwrap();
    }
}
