//! Kernel object names for one channel.
//!
//! A channel occupies four names in the kernel namespace: the shared-memory
//! segment and the three semaphores. All four are derived from one validated
//! prefix so a supervisor and its generators only need to agree on a single
//! string.

/// Prefix used when no configuration overrides it.
pub const DEFAULT_PREFIX: &str = "basalt-3color";

#[derive(Debug, thiserror::Error)]
#[error("invalid channel name `{prefix}`: {reason}")]
pub struct NameError {
    prefix: String,
    reason: &'static str,
}

/// A validated channel name and the kernel names derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelName {
    prefix: String,
}

impl ChannelName {
    /// Validates a prefix. Only alphanumerics, `-` and `_` are accepted, so
    /// the derived names satisfy the `shm_open`/`sem_open` rules.
    pub fn new(prefix: &str) -> Result<Self, NameError> {
        let invalid = |reason| NameError {
            prefix: prefix.to_string(),
            reason,
        };

        if prefix.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if prefix.len() > 128 {
            return Err(invalid("must be at most 128 bytes"));
        }
        if !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(invalid(
                "must contain only ASCII alphanumerics, '-' and '_'",
            ));
        }

        Ok(Self {
            prefix: prefix.to_string(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Name of the shared-memory segment.
    pub fn segment(&self) -> String {
        format!("/{}.ring", self.prefix)
    }

    /// Name of the semaphore counting writable byte slots.
    pub fn free_slots(&self) -> String {
        format!("/{}.free", self.prefix)
    }

    /// Name of the semaphore counting readable byte slots.
    pub fn used_slots(&self) -> String {
        format!("/{}.used", self.prefix)
    }

    /// Name of the binary semaphore serializing producers.
    pub fn writer_turn(&self) -> String {
        format!("/{}.writer", self.prefix)
    }
}

impl Default for ChannelName {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_all_four_names() {
        let name = ChannelName::new("run7").unwrap();
        assert_eq!(name.segment(), "/run7.ring");
        assert_eq!(name.free_slots(), "/run7.free");
        assert_eq!(name.used_slots(), "/run7.used");
        assert_eq!(name.writer_turn(), "/run7.writer");
    }

    #[test]
    fn default_uses_fixed_prefix() {
        assert_eq!(ChannelName::default().prefix(), DEFAULT_PREFIX);
    }

    #[test]
    fn rejects_bad_prefixes() {
        for bad in ["", "has space", "has/slash", "dot.dot", &"x".repeat(129)] {
            assert!(ChannelName::new(bad).is_err(), "accepted {bad:?}");
        }
    }
}
