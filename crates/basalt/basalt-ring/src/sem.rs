//! Named POSIX semaphores.
//!
//! Thin wrapper over `sem_open`/`sem_post`/`sem_timedwait`. The creating
//! process owns the kernel name and is the only one allowed to unlink it;
//! attached processes just close their handle.

use std::ffi::CString;
use std::io;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("semaphore `{name}`: {op} failed")]
pub struct SemError {
    name: String,
    op: &'static str,
    #[source]
    source: io::Error,
}

impl SemError {
    fn new(name: &str, op: &'static str) -> Self {
        Self {
            name: name.to_string(),
            op,
            source: io::Error::last_os_error(),
        }
    }
}

/// A handle to a named, process-shared counting semaphore.
pub(crate) struct NamedSemaphore {
    sem: *mut libc::sem_t,
    name: String,
    created: bool,
    unlinked: bool,
}

// SAFETY: the handle points at a kernel-managed object; every operation on
// it (post, wait, getvalue) is thread-safe by POSIX.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

fn cstring(name: &str, op: &'static str) -> Result<CString, SemError> {
    CString::new(name).map_err(|_| SemError {
        name: name.to_string(),
        op,
        source: io::Error::new(io::ErrorKind::InvalidInput, "name contains NUL"),
    })
}

impl NamedSemaphore {
    /// Creates a new semaphore with the given initial value.
    ///
    /// Fails if the name already exists (exclusive-create semantics).
    pub(crate) fn create(name: &str, initial: u32) -> Result<Self, SemError> {
        let cname = cstring(name, "sem_open")?;
        // SAFETY: cname is a valid NUL-terminated string; mode and initial
        // value are passed as the variadic arguments sem_open expects for
        // O_CREAT.
        let sem = unsafe {
            libc::sem_open(
                cname.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                libc::S_IRUSR | libc::S_IWUSR,
                initial,
            )
        };
        if sem == libc::SEM_FAILED {
            return Err(SemError::new(name, "sem_open"));
        }
        Ok(Self {
            sem,
            name: name.to_string(),
            created: true,
            unlinked: false,
        })
    }

    /// Opens a semaphore created by another process.
    pub(crate) fn open(name: &str) -> Result<Self, SemError> {
        let cname = cstring(name, "sem_open")?;
        // SAFETY: cname is a valid NUL-terminated string.
        let sem = unsafe { libc::sem_open(cname.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            return Err(SemError::new(name, "sem_open"));
        }
        Ok(Self {
            sem,
            name: name.to_string(),
            created: false,
            unlinked: false,
        })
    }

    /// Releases one permit, waking a blocked waiter if there is one.
    pub(crate) fn post(&self) -> Result<(), SemError> {
        // SAFETY: self.sem is a valid handle until close().
        if unsafe { libc::sem_post(self.sem) } == -1 {
            return Err(SemError::new(&self.name, "sem_post"));
        }
        Ok(())
    }

    /// Tries to acquire one permit, giving up after `slice`.
    ///
    /// Returns `Ok(true)` on acquisition and `Ok(false)` when the slice
    /// elapsed or the wait was interrupted by a signal; in both of the latter
    /// cases the caller is expected to recheck its cancellation conditions
    /// and call again.
    pub(crate) fn wait_timeout(&self, slice: Duration) -> Result<bool, SemError> {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: ts is a valid out-pointer. sem_timedwait takes an absolute
        // CLOCK_REALTIME deadline.
        if unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts) } == -1 {
            return Err(SemError::new(&self.name, "clock_gettime"));
        }
        ts.tv_sec += slice.as_secs() as libc::time_t;
        ts.tv_nsec += slice.subsec_nanos() as libc::c_long;
        if ts.tv_nsec >= 1_000_000_000 {
            ts.tv_sec += 1;
            ts.tv_nsec -= 1_000_000_000;
        }

        // SAFETY: self.sem is a valid handle until close().
        if unsafe { libc::sem_timedwait(self.sem, &ts) } == 0 {
            return Ok(true);
        }
        match io::Error::last_os_error().raw_os_error() {
            Some(libc::ETIMEDOUT) | Some(libc::EINTR) => Ok(false),
            _ => Err(SemError::new(&self.name, "sem_timedwait")),
        }
    }

    /// Current counter value, for diagnostics and invariant checks.
    pub(crate) fn value(&self) -> Result<i32, SemError> {
        let mut v: libc::c_int = 0;
        // SAFETY: self.sem is a valid handle; v is a valid out-pointer.
        if unsafe { libc::sem_getvalue(self.sem, &mut v) } == -1 {
            return Err(SemError::new(&self.name, "sem_getvalue"));
        }
        Ok(v)
    }

    /// Closes this process's handle. Safe to call once; Drop skips a handle
    /// that was already closed.
    pub(crate) fn close(&mut self) -> Result<(), SemError> {
        if self.sem == libc::SEM_FAILED {
            return Ok(());
        }
        // SAFETY: self.sem is a valid handle, invalidated right after.
        let rc = unsafe { libc::sem_close(self.sem) };
        self.sem = libc::SEM_FAILED;
        if rc == -1 {
            return Err(SemError::new(&self.name, "sem_close"));
        }
        Ok(())
    }

    /// Removes the kernel name. Only the creating process calls this.
    pub(crate) fn unlink(&mut self) -> Result<(), SemError> {
        self.unlinked = true;
        let cname = cstring(&self.name, "sem_unlink")?;
        // SAFETY: cname is a valid NUL-terminated string.
        if unsafe { libc::sem_unlink(cname.as_ptr()) } == -1 {
            return Err(SemError::new(&self.name, "sem_unlink"));
        }
        Ok(())
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        let _ = self.close();
        if self.created && !self.unlinked {
            let _ = self.unlink();
        }
    }
}

impl std::fmt::Debug for NamedSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedSemaphore")
            .field("name", &self.name)
            .field("created", &self.created)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name(tag: &str) -> String {
        format!("/basalt-sem-test-{tag}-{}", std::process::id())
    }

    #[test]
    fn counts_posts_and_waits() {
        let name = unique_name("count");
        let mut sem = NamedSemaphore::create(&name, 2).unwrap();
        assert_eq!(sem.value().unwrap(), 2);

        assert!(sem.wait_timeout(Duration::from_millis(10)).unwrap());
        assert!(sem.wait_timeout(Duration::from_millis(10)).unwrap());
        // Exhausted: the slice elapses without an acquisition.
        assert!(!sem.wait_timeout(Duration::from_millis(10)).unwrap());

        sem.post().unwrap();
        assert!(sem.wait_timeout(Duration::from_millis(10)).unwrap());

        sem.close().unwrap();
        sem.unlink().unwrap();
    }

    #[test]
    fn create_excl_refuses_existing() {
        let name = unique_name("excl");
        let _first = NamedSemaphore::create(&name, 0).unwrap();
        assert!(NamedSemaphore::create(&name, 0).is_err());
    }

    #[test]
    fn open_sees_created_value() {
        let name = unique_name("open");
        let _owner = NamedSemaphore::create(&name, 5).unwrap();
        let attached = NamedSemaphore::open(&name).unwrap();
        assert_eq!(attached.value().unwrap(), 5);
    }

    #[test]
    fn open_missing_fails() {
        assert!(NamedSemaphore::open(&unique_name("missing")).is_err());
    }
}
