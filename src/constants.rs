//! Application-wide constants
//!
//! This module contains the magic strings and default key names used throughout
//! the application, providing a single source of truth for constant values.

/// Tool configuration location
pub mod config {
    /// Directory under the user's config dir
    pub const APP_DIR: &str = "true-stretch";

    /// Config filename inside APP_DIR
    pub const FILENAME: &str = "config.toml";
}

/// Game config layout (VALORANT on Windows)
pub mod game {
    /// Path segments below the local app data dir
    pub const CONFIG_SUBDIRS: [&str; 3] = ["VALORANT", "Saved", "Config"];

    /// Client folder holding the root settings file
    pub const WINDOWS_CLIENT_DIR: &str = "WindowsClient";

    /// Per-user platform folder
    pub const WINDOWS_DIR: &str = "Windows";

    /// Settings file carrying resolution, fullscreen and HDR state
    pub const SETTINGS_FILE: &str = "GameUserSettings.ini";

    /// File naming the last logged-in account
    pub const MACHINE_FILE: &str = "RiotLocalMachine.ini";

    /// Key inside MACHINE_FILE
    pub const LAST_KNOWN_USER_KEY: &str = "LastKnownUser";
}

/// Default key names and values written for a true stretch
pub mod keys {
    pub const RESOLUTION_WIDTH: [&str; 2] = ["ResolutionSizeX", "LastUserConfirmedResolutionSizeX"];
    pub const RESOLUTION_HEIGHT: [&str; 2] = ["ResolutionSizeY", "LastUserConfirmedResolutionSizeY"];

    pub const FULLSCREEN_MODE: &str = "FullscreenMode";

    /// Fullscreen enum value that does not preserve aspect on its own
    pub const FULLSCREEN_VALUE: &str = "2";

    pub const HDR_OUTPUT: &str = "bUseHDRDisplayOutput";
    pub const HDR_DISABLED_VALUE: &str = "False";

    pub const ASPECT_FILL: [&str; 2] = ["bShouldLetterbox", "bLastConfirmedShouldLetterbox"];

    /// Letterbox flags must be off for the image to fill the screen
    pub const ASPECT_FILL_VALUE: &str = "False";
}

/// Backup naming
pub mod backup {
    /// Suffix appended to the full filename (GameUserSettings.ini.bak)
    pub const SUFFIX: &str = "bak";
}
