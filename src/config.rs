//! Host configuration.

use crate::discovery::Architecture;
use crate::fourcc::{FourCC, VENDOR_ADOBE};

/// Default ceiling for the space reported to plugins (1 GiB).
pub const DEFAULT_MAX_BUFFER_SPACE: u64 = 1024 * 1024 * 1024;

/// Configuration shared by discovery and execution.
///
/// # Example
///
/// ```rust
/// use filterhost::config::HostConfig;
///
/// let config = HostConfig::default()
///     .with_recursive_scan(false)
///     .with_max_buffer_space(256 * 1024 * 1024);
/// assert!(!config.recursive_scan);
/// ```
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Signature this host answers to in required-host checks.
    pub host_signature: FourCC,
    /// Architecture used for compatibility checks. `None` means the
    /// architecture of the running process.
    pub architecture: Option<Architecture>,
    /// Ceiling for the available space reported by the buffer suite and
    /// the `maxSpace` field.
    pub max_buffer_space: u64,
    /// Whether catalog scans descend into subdirectories.
    pub recursive_scan: bool,
    /// File extensions (without dot, compared case-insensitively) treated as
    /// plugin modules.
    pub extensions: Vec<String>,
    /// Serial string reported through the property suite.
    pub serial_string: String,
    /// Host version reported through the property suite (major, minor, fix).
    pub host_version: (u16, u16, u16),
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            host_signature: VENDOR_ADOBE,
            architecture: None,
            max_buffer_space: DEFAULT_MAX_BUFFER_SPACE,
            recursive_scan: true,
            extensions: vec!["8bf".to_string()],
            serial_string: "0".to_string(),
            host_version: (1, 0, 0),
        }
    }
}

impl HostConfig {
    /// Override the host signature.
    pub fn with_host_signature(mut self, signature: FourCC) -> Self {
        self.host_signature = signature;
        self
    }

    /// Pretend to be a process of the given architecture.
    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = Some(architecture);
        self
    }

    /// Set the buffer space ceiling.
    pub fn with_max_buffer_space(mut self, bytes: u64) -> Self {
        self.max_buffer_space = bytes;
        self
    }

    /// Enable or disable recursive directory scans.
    pub fn with_recursive_scan(mut self, recursive: bool) -> Self {
        self.recursive_scan = recursive;
        self
    }

    /// Set the serial string.
    pub fn with_serial_string(mut self, serial: impl Into<String>) -> Self {
        self.serial_string = serial.into();
        self
    }

    /// Replace the plugin file extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the reported host version.
    pub fn with_host_version(mut self, major: u16, minor: u16, fix: u16) -> Self {
        self.host_version = (major, minor, fix);
        self
    }

    /// Architecture to check modules against.
    pub fn effective_architecture(&self) -> Architecture {
        self.architecture.unwrap_or_else(Architecture::current)
    }

    /// Whether `path` has one of the configured plugin extensions.
    pub fn is_plugin_file(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_plugin_extension_is_case_insensitive() {
        let config = HostConfig::default();
        assert!(config.is_plugin_file(Path::new("C:/Plugins/Blur.8BF")));
        assert!(!config.is_plugin_file(Path::new("blur.dll")));
    }

    #[test]
    fn test_architecture_override() {
        let config = HostConfig::default().with_architecture(Architecture::Arm64);
        assert_eq!(config.effective_architecture(), Architecture::Arm64);
    }

    #[test]
    fn test_custom_extensions() {
        let config = HostConfig::default().with_extensions(["8bf", "8li"]);
        assert!(config.is_plugin_file(Path::new("lens.8LI")));
        assert!(!config.is_plugin_file(Path::new("lens")));
    }
}
