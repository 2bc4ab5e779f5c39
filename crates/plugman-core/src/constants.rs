/// Application name
pub const APP_NAME: &str = "plugman";

/// Current system version plugins are checked against by default
pub const SYSTEM_VERSION: &str = "0.1.0";

/// Default plugins directory
pub const DEFAULT_PLUGINS_DIR: &str = "plugins";

/// Default aggregate config file for all plugins
pub const DEFAULT_CONFIG_PATH: &str = "plugins/config.json";

/// Manifest file names probed inside each plugin directory, in order
pub const MANIFEST_FILE_NAMES: &[&str] = &["plugin.json", "plugin.yaml", "plugin.yml"];
