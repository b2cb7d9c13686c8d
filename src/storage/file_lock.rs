use std::fs::{File, OpenOptions};

use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::layout::ArchiveLayout;

/// Advisory cross-process lock over one archive directory.
///
/// Readers take it shared; build stages take it exclusive so a rebuild
/// cannot interleave with tools reading the same directory. Held for the
/// lifetime of the value, released on drop.
pub struct ArchiveLock {
    file: File,
    pub exclusive: bool,
}

impl ArchiveLock {
    pub fn shared(layout: &ArchiveLayout) -> Result<Self> {
        Self::acquire(layout, false)
    }

    pub fn exclusive(layout: &ArchiveLayout) -> Result<Self> {
        Self::acquire(layout, true)
    }

    fn acquire(layout: &ArchiveLayout, exclusive: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(layout.lock_path())?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;

            use libc::{LOCK_EX, LOCK_SH, flock};

            let operation = if exclusive { LOCK_EX } else { LOCK_SH };
            if unsafe { flock(file.as_raw_fd(), operation) } != 0 {
                return Err(Error::new(
                    ErrorKind::Io,
                    format!("failed to lock archive at {}", layout.base_dir.display()),
                ));
            }
        }

        Ok(ArchiveLock { file, exclusive })
    }
}

impl Drop for ArchiveLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;

            use libc::{LOCK_UN, flock};

            unsafe {
                flock(self.file.as_raw_fd(), LOCK_UN);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_locks_coexist() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path()).unwrap();

        let a = ArchiveLock::shared(&layout).unwrap();
        let b = ArchiveLock::shared(&layout).unwrap();
        assert!(!a.exclusive);
        assert!(!b.exclusive);
    }

    #[test]
    fn test_exclusive_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path()).unwrap();

        drop(ArchiveLock::exclusive(&layout).unwrap());
        let lock = ArchiveLock::exclusive(&layout).unwrap();
        assert!(lock.exclusive);
    }
}
