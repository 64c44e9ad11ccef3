//! Standard locations for viewer configuration

use std::path::PathBuf;

/// Directory holding viewer configuration
///
/// Returns: `~/.config/cortex-viewer` (platform config dir)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cortex-viewer")
}

/// Path of a config file inside [`default_config_dir`]
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_name() {
        assert!(default_config_dir().ends_with("cortex-viewer"));
    }

    #[test]
    fn test_config_path_includes_filename() {
        let path = default_config_path("config.yaml");
        assert!(path.ends_with("cortex-viewer/config.yaml"));
    }
}
