//! Discovery of the game's settings files
//!
//! Layout under `%LOCALAPPDATA%\VALORANT\Saved\Config`:
//! - `WindowsClient/GameUserSettings.ini` (root settings, must exist)
//! - `WindowsClient/RiotLocalMachine.ini` (names the last account)
//! - `<account>-<region>/{WindowsClient,Windows}/GameUserSettings.ini`

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::constants::game;
use crate::document::ConfigDocument;

/// A settings file to patch, with a short label for reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFile {
    pub path: PathBuf,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct GameConfigLayout {
    base: PathBuf,
}

impl GameConfigLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Use `root` if given, otherwise the platform's local app data dir
    pub fn discover(root: Option<&Path>) -> Result<Self> {
        if let Some(root) = root {
            return Ok(Self::new(root));
        }

        let mut base = dirs::data_local_dir()
            .context("Couldn't resolve the local app data directory (%LOCALAPPDATA%). Are you on Windows?")?;
        base.extend(game::CONFIG_SUBDIRS);
        Ok(Self::new(base))
    }

    pub fn client_dir(&self) -> PathBuf {
        self.base.join(game::WINDOWS_CLIENT_DIR)
    }

    /// Root settings file; holds the state checked against native
    pub fn primary_settings(&self) -> PathBuf {
        self.client_dir().join(game::SETTINGS_FILE)
    }

    /// Account id recorded by the launcher, if any
    pub fn last_known_user(&self) -> Option<String> {
        let path = self.client_dir().join(game::MACHINE_FILE);
        let contents = match fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No machine file");
                return None;
            }
        };

        let doc = ConfigDocument::parse(&contents);
        let user = doc.get_value(game::LAST_KNOWN_USER_KEY)?;
        if user.is_empty() || !user.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            warn!(value = %user, "Ignoring malformed {}", game::LAST_KNOWN_USER_KEY);
            return None;
        }
        Some(user.to_string())
    }

    /// Folder named `<user>-...`, preferring ones that contain the platform subfolders
    pub fn find_user_folder(&self, user: &str) -> Option<PathBuf> {
        let prefix = format!("{}-", user.to_lowercase());
        let entries = fs::read_dir(&self.base)
            .inspect_err(|e| warn!(base = %self.base.display(), error = %e, "Can't list config dir"))
            .ok()?;

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().to_lowercase().starts_with(&prefix))
                    .unwrap_or(false)
            })
            .collect();
        candidates.sort();

        let score = |p: &PathBuf| {
            [game::WINDOWS_DIR, game::WINDOWS_CLIENT_DIR]
                .iter()
                .filter(|sub| p.join(sub).is_dir())
                .count()
        };

        // First candidate wins ties
        let mut best: Option<(usize, PathBuf)> = None;
        for candidate in candidates {
            let s = score(&candidate);
            if best.as_ref().is_none_or(|(b, _)| s > *b) {
                best = Some((s, candidate));
            }
        }
        best.map(|(_, path)| path)
    }

    /// Settings files to patch: root first, then the user folder's copies
    pub fn targets(&self) -> Result<Vec<TargetFile>> {
        let primary = self.primary_settings();
        if !primary.is_file() {
            bail!(
                "Missing {} in {}. Launch the game once (native Fullscreen + Fill), then close it.",
                game::SETTINGS_FILE,
                self.client_dir().display()
            );
        }

        let mut targets = vec![TargetFile {
            path: primary,
            label: format!("Root {}/{}", game::WINDOWS_CLIENT_DIR, game::SETTINGS_FILE),
        }];

        let user = self.last_known_user();
        let user_dir = user.as_deref().and_then(|u| self.find_user_folder(u));
        info!(
            base = %self.base.display(),
            last_known_user = user.as_deref().unwrap_or("??"),
            user_folder = ?user_dir,
            "Resolved game config layout"
        );

        if let Some(dir) = user_dir {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            for sub in [game::WINDOWS_CLIENT_DIR, game::WINDOWS_DIR] {
                targets.push(TargetFile {
                    path: dir.join(sub).join(game::SETTINGS_FILE),
                    label: format!("{name}/{sub}/{}", game::SETTINGS_FILE),
                });
            }
        } else {
            warn!("User folder not found, only the root settings file will be updated");
        }

        Ok(targets)
    }
}
