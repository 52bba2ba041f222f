use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use tempfile::NamedTempFile;

use sidekick_live::{DEFAULT_PLUGIN_ID, EventNames};

pub const SETTINGS_DIRECTORY_NAME: &str = "sidekick";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarSettings {
    /// Plugin id the websocket event names are scoped to.
    #[serde(default = "default_plugin_id")]
    pub plugin_id: String,
    /// Bot picked last time; new sessions start on it while it is still in the roster.
    #[serde(default)]
    pub default_bot: Option<String>,
}

impl Default for SidebarSettings {
    fn default() -> Self {
        Self {
            plugin_id: default_plugin_id(),
            default_bot: None,
        }
    }
}

impl SidebarSettings {
    pub fn normalized(mut self) -> Self {
        let plugin_id = self.plugin_id.trim();
        self.plugin_id = if plugin_id.is_empty() {
            default_plugin_id()
        } else {
            plugin_id.to_string()
        };
        self.default_bot = self.default_bot.as_deref().and_then(non_blank);
        self
    }

    pub fn event_names(&self) -> EventNames {
        EventNames::for_plugin(&self.plugin_id)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to read sidebar settings at {path:?} on `{stage}`: {source}"))]
    Load {
        stage: &'static str,
        path: PathBuf,
        source: Box<figment::Error>,
    },
    #[snafu(display("failed to encode sidebar settings on `{stage}`: {source}"))]
    Encode {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write sidebar settings near {path:?} on `{stage}`: {source}"))]
    Write {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to replace sidebar settings at {path:?} on `{stage}`: {source}"))]
    Replace {
        stage: &'static str,
        path: PathBuf,
        source: tempfile::PersistError,
    },
}

/// Sidebar settings file plus the copy the running sidebar reads from.
pub struct SettingsStore {
    path: PathBuf,
    current: ArcSwap<SidebarSettings>,
}

impl SettingsStore {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(SETTINGS_DIRECTORY_NAME)
            .join(SETTINGS_FILE_NAME)
    }

    /// Opens the file at `path`. A missing or unreadable file starts from defaults.
    pub fn open(path: PathBuf) -> Self {
        let settings = match read_settings(&path) {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                tracing::info!(path = ?path, "no sidebar settings yet; using defaults");
                SidebarSettings::default()
            }
            Err(error) => {
                tracing::warn!(error = %error, "ignoring unreadable sidebar settings");
                SidebarSettings::default()
            }
        };
        Self {
            path,
            current: ArcSwap::from_pointee(settings),
        }
    }

    pub fn open_default() -> Self {
        Self::open(Self::default_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> Arc<SidebarSettings> {
        self.current.load_full()
    }

    /// Records the bot the user switched to so the next session opens on it.
    ///
    /// The in-memory copy only changes once the file has been replaced.
    pub fn remember_default_bot(&self, username: &str) -> Result<Arc<SidebarSettings>, SettingsError> {
        let current = self.current.load_full();
        let default_bot = non_blank(username);
        if current.default_bot == default_bot {
            return Ok(current);
        }

        let next = Arc::new(SidebarSettings {
            default_bot,
            ..(*current).clone()
        });
        write_settings(&self.path, &next)?;
        self.current.store(Arc::clone(&next));
        tracing::info!(default_bot = ?next.default_bot, path = ?self.path, "remembered default bot");
        Ok(next)
    }
}

fn read_settings(path: &Path) -> Result<Option<SidebarSettings>, SettingsError> {
    if !path.exists() {
        return Ok(None);
    }
    Figment::from(Serialized::defaults(SidebarSettings::default()))
        .merge(Json::file(path))
        .extract::<SidebarSettings>()
        .map(|settings| Some(settings.normalized()))
        .map_err(Box::new)
        .context(LoadSnafu {
            stage: "extract-sidebar-settings",
            path: path.to_path_buf(),
        })
}

/// Writes into a sibling temp file and swaps it in, so readers never see half a file.
fn write_settings(path: &Path, settings: &SidebarSettings) -> Result<(), SettingsError> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(directory).context(WriteSnafu {
        stage: "create-settings-directory",
        path: directory.to_path_buf(),
    })?;

    let bytes = serde_json::to_vec_pretty(settings).context(EncodeSnafu {
        stage: "encode-sidebar-settings",
    })?;
    let mut staged = NamedTempFile::new_in(directory).context(WriteSnafu {
        stage: "create-staged-settings",
        path: directory.to_path_buf(),
    })?;
    staged.write_all(&bytes).context(WriteSnafu {
        stage: "write-staged-settings",
        path: staged.path().to_path_buf(),
    })?;
    staged.persist(path).context(ReplaceSnafu {
        stage: "persist-sidebar-settings",
        path: path.to_path_buf(),
    })?;
    Ok(())
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn default_plugin_id() -> String {
    DEFAULT_PLUGIN_ID.to_string()
}
