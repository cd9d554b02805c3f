use std::time::Duration;

pub const APP_NAME: &str = "hubsync";

/// Version segment that asks for the newest published version of a group.
pub const LATEST: &str = "latest";

/// File extension of an installed package archive.
pub const PACKAGE_EXT: &str = "var";

/// Environment variable overriding the default packages directory.
pub const PACKAGES_DIR_ENV: &str = "HUBSYNC_PACKAGES_DIR";

pub const SETTINGS_FILENAME: &str = "settings.json";

/// Manifest file read when a manifest locator points at a directory.
pub const MANIFEST_FILENAME: &str = "meta.json";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for each individual wait while preparing a batch.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Prompt text marker for the network-permission dialog that is never auto-accepted.
pub const NETWORK_PROMPT_MARKER: &str = "allow network access";
