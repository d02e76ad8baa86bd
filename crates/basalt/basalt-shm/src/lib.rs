//! Named POSIX shared-memory objects, mapped read-write.
//!
//! `shm_open` yields the file descriptor, `memmap2` does the mapping. The
//! process that created an object is the only one that may unlink its name;
//! everyone else just detaches when their mapping drops.

use memmap2::MmapMut;
use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::fd::FromRawFd;

/// Longest name `shm_open` portably accepts, including the leading slash.
const NAME_MAX: usize = 255;

#[derive(Debug, thiserror::Error)]
pub enum ShmError {
    #[error("invalid shared memory name `{name}`: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("shm_open `{name}` failed")]
    Open {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("ftruncate `{name}` to {size} bytes failed")]
    Truncate {
        name: String,
        size: usize,
        #[source]
        source: io::Error,
    },

    #[error("fstat `{name}` failed")]
    Stat {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("mmap `{name}` failed")]
    Map {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("`{name}` has {actual} bytes, expected {expected}")]
    SizeMismatch {
        name: String,
        expected: usize,
        actual: u64,
    },

    #[error("shm_unlink `{name}` failed")]
    Unlink {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// A named POSIX shared-memory object mapped into this process.
///
/// Created objects remember that they own the kernel name: dropping one
/// without an explicit [`unlink`](ShmObject::unlink) still removes the name
/// as a best-effort backstop.
pub struct ShmObject {
    _file: File,
    map: MmapMut,
    name: String,
    owner: bool,
    unlinked: bool,
}

/// Names must look like `/some-name`: one leading slash, nothing else.
fn validate_name(name: &str) -> Result<CString, ShmError> {
    let invalid = |reason| ShmError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if !name.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    if name.len() == 1 {
        return Err(invalid("must not be empty after the '/'"));
    }
    if name[1..].contains('/') {
        return Err(invalid("must not contain further '/' characters"));
    }
    if name.len() > NAME_MAX {
        return Err(invalid("must be at most 255 bytes"));
    }

    CString::new(name).map_err(|_| invalid("must not contain NUL bytes"))
}

fn shm_open(cname: &CString, name: &str, oflag: libc::c_int) -> Result<File, ShmError> {
    // SAFETY: cname is a valid NUL-terminated string.
    let fd = unsafe { libc::shm_open(cname.as_ptr(), oflag, 0o600) };
    if fd == -1 {
        return Err(ShmError::Open {
            name: name.to_string(),
            source: io::Error::last_os_error(),
        });
    }
    // SAFETY: fd is a freshly opened descriptor we now own.
    Ok(unsafe { File::from_raw_fd(fd) })
}

impl ShmObject {
    /// Creates a new shared-memory object of `size` bytes and maps it.
    ///
    /// Fails if the name already exists (exclusive-create semantics). The
    /// kernel zero-fills the object, so callers may rely on an all-zero
    /// initial state. If sizing or mapping fails after the name was created,
    /// the half-built object is unlinked before the error is returned.
    pub fn create_excl(name: &str, size: usize) -> Result<Self, ShmError> {
        let cname = validate_name(name)?;
        let file = shm_open(&cname, name, libc::O_CREAT | libc::O_EXCL | libc::O_RDWR)?;

        if let Err(source) = file.set_len(size as u64) {
            let _ = Self::remove(name);
            return Err(ShmError::Truncate {
                name: name.to_string(),
                size,
                source,
            });
        }

        // SAFETY: the object was created exclusively and sized just above.
        let map = match unsafe { MmapMut::map_mut(&file) } {
            Ok(map) => map,
            Err(source) => {
                let _ = Self::remove(name);
                return Err(ShmError::Map {
                    name: name.to_string(),
                    source,
                });
            }
        };

        Ok(Self {
            _file: file,
            map,
            name: name.to_string(),
            owner: true,
            unlinked: false,
        })
    }

    /// Opens an existing shared-memory object and maps it read-write.
    ///
    /// The object must be exactly `expected_size` bytes; attaching to a
    /// differently sized object means the creator used another layout.
    pub fn open_rw(name: &str, expected_size: usize) -> Result<Self, ShmError> {
        let cname = validate_name(name)?;
        let file = shm_open(&cname, name, libc::O_RDWR)?;

        let meta = file.metadata().map_err(|source| ShmError::Stat {
            name: name.to_string(),
            source,
        })?;
        if meta.len() != expected_size as u64 {
            return Err(ShmError::SizeMismatch {
                name: name.to_string(),
                expected: expected_size,
                actual: meta.len(),
            });
        }

        // SAFETY: the object exists and has the expected size.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|source| ShmError::Map {
            name: name.to_string(),
            source,
        })?;

        Ok(Self {
            _file: file,
            map,
            name: name.to_string(),
            owner: false,
            unlinked: false,
        })
    }

    /// Return raw pointer to the start of the mapped region.
    ///
    /// All mutation behind this pointer must go through atomics; the mapping
    /// is shared with other processes.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.map.as_ptr()
    }

    /// Mutable raw pointer, for one-time initialization by the creator.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.map.as_mut_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.len() == 0
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Removes the kernel name so no further process can attach.
    ///
    /// Only meaningful for the creating process. A second call (or a call
    /// after someone else removed the name) reports the underlying ENOENT.
    pub fn unlink(&mut self) -> Result<(), ShmError> {
        self.unlinked = true;
        Self::remove(&self.name)
    }

    /// Unlinks a shared-memory name outside the lifecycle of any mapping.
    ///
    /// Intended for clearing names leaked by a crashed owner before creating
    /// a fresh object.
    pub fn remove(name: &str) -> Result<(), ShmError> {
        let cname = validate_name(name)?;
        // SAFETY: cname is a valid NUL-terminated string.
        if unsafe { libc::shm_unlink(cname.as_ptr()) } == -1 {
            return Err(ShmError::Unlink {
                name: name.to_string(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

impl Drop for ShmObject {
    fn drop(&mut self) {
        // The mapping and descriptor close themselves; the name is ours to
        // reap if teardown never ran.
        if self.owner && !self.unlinked {
            let _ = Self::remove(&self.name);
        }
    }
}

impl std::fmt::Debug for ShmObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShmObject")
            .field("name", &self.name)
            .field("len", &self.map.len())
            .field("owner", &self.owner)
            .finish()
    }
}
