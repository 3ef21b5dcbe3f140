use crate::format::ArchiveFormat;
use crate::host::Host;
use crate::planner::WritePolicy;

/// Options for [`compress`](crate::compress).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompressOptions {
    /// Container format; inferred from the destination name when unset.
    pub format: Option<ArchiveFormat>,
    /// Compression level 0-9 for zip and gzip output.
    pub level: Option<u32>,
    /// Add to an existing archive instead of creating a new one.
    pub update: bool,
}

impl CompressOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: ArchiveFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.level = Some(level.min(9));
        self
    }

    pub fn update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }
}

/// Options for [`expand`](crate::expand).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Container format; inferred from the source name or content when unset.
    pub format: Option<ArchiveFormat>,
    pub policy: WritePolicy,
    pub host: Host,
}

impl ExpandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: ArchiveFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn overwrite(self) -> Self {
        self.policy(WritePolicy::Overwrite)
    }

    pub fn host(mut self, host: Host) -> Self {
        self.host = host;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_defaults() {
        let options = CompressOptions::default();
        assert_eq!(options.format, None);
        assert_eq!(options.level, None);
        assert!(!options.update);
    }

    #[test]
    fn compress_builder() {
        let options = CompressOptions::new()
            .format(ArchiveFormat::Tar)
            .level(42)
            .update(true);
        assert_eq!(options.format, Some(ArchiveFormat::Tar));
        assert_eq!(options.level, Some(9));
        assert!(options.update);
    }

    #[test]
    fn expand_builder() {
        let options = ExpandOptions::new()
            .format(ArchiveFormat::Zip)
            .overwrite()
            .host(Host::detached());
        assert_eq!(options.policy, WritePolicy::Overwrite);
        assert_eq!(options.host, Host::detached());
        assert_eq!(ExpandOptions::default().policy, WritePolicy::Expand);
    }
}
