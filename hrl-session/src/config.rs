use hrl_core::{DisplayMode, HrlError, HrlResult};
use hrl_devices::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a session config file.
pub const CONFIG_PATH_ENV: &str = "HRL_CONFIG_PATH";

/// Everything a session needs to know at open time.
///
/// Device slots are plain strings so that a config file can name a device
/// this build does not know; such a slot simply stays empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// `gpu` or `datapixx`.
    pub graphics: Option<String>,
    /// `keyboard` or `responsepixx`.
    pub inputs: Option<String>,
    /// `optical` or `minolta`.
    pub photometer: Option<String>,
    pub photometer_port: PathBuf,

    pub width: u32,
    pub height: u32,
    pub background: f32,
    pub fullscreen: bool,
    pub double_buffer: bool,
    pub screen: u32,
    pub lut: Option<PathBuf>,

    /// Design matrix to read trials from.
    pub design: Option<PathBuf>,
    /// Result matrix to append to. Requires `result_headers`.
    pub results: Option<PathBuf>,
    pub result_headers: Option<Vec<String>>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let mode = DisplayMode::default();
        Self {
            graphics: Some("gpu".to_string()),
            inputs: Some("keyboard".to_string()),
            photometer: None,
            photometer_port: PathBuf::from(DEFAULT_PORT),
            width: mode.width,
            height: mode.height,
            background: mode.background,
            fullscreen: mode.fullscreen,
            double_buffer: mode.double_buffer,
            screen: mode.screen,
            lut: None,
            design: None,
            results: None,
            result_headers: None,
        }
    }
}

impl SessionConfig {
    /// A config with every device slot empty, for bookkeeping-only sessions.
    pub fn files_only() -> Self {
        Self {
            graphics: None,
            inputs: None,
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> HrlResult<Self> {
        toml::from_str(content).map_err(|e| HrlError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> HrlResult<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded session config");
        Ok(config)
    }

    /// Loads the file named by `HRL_CONFIG_PATH`, if it is set.
    pub fn from_env() -> HrlResult<Option<Self>> {
        match env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path)).map(Some),
            None => Ok(None),
        }
    }

    pub fn to_toml_string(&self) -> HrlResult<String> {
        toml::to_string_pretty(self).map_err(|e| HrlError::Config(e.to_string()))
    }

    pub fn display_mode(&self) -> DisplayMode {
        DisplayMode {
            width: self.width,
            height: self.height,
            background: self.background,
            fullscreen: self.fullscreen,
            double_buffer: self.double_buffer,
            screen: self.screen,
        }
    }

    pub fn with_design(mut self, path: impl Into<PathBuf>) -> Self {
        self.design = Some(path.into());
        self
    }

    pub fn with_results<S: Into<String>>(
        mut self,
        path: impl Into<PathBuf>,
        headers: impl IntoIterator<Item = S>,
    ) -> Self {
        self.results = Some(path.into());
        self.result_headers = Some(headers.into_iter().map(Into::into).collect());
        self
    }

    /// Fails when the config cannot possibly open, before touching hardware.
    pub fn validate(&self) -> HrlResult<()> {
        if self.results.is_some() && self.result_headers.is_none() {
            return Err(HrlError::MissingResultHeaders);
        }
        if !(0.0..=1.0).contains(&self.background) {
            return Err(HrlError::LuminanceOutOfRange(self.background));
        }
        if self.width == 0 || self.height == 0 {
            return Err(HrlError::Config(format!(
                "screen size {}x{} is empty",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_plain_desktop_setup() {
        let config = SessionConfig::default();
        assert_eq!(config.graphics.as_deref(), Some("gpu"));
        assert_eq!(config.inputs.as_deref(), Some("keyboard"));
        assert_eq!(config.photometer, None);
        assert_eq!((config.width, config.height), (1024, 768));
        assert!(config.double_buffer);
        assert_eq!(config.photometer_port, PathBuf::from("/dev/ttyUSB0"));
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config = SessionConfig::from_toml_str(
            r#"
            graphics = "datapixx"
            inputs = "responsepixx"
            background = 0.5
            results = "out.txt"
            result_headers = ["Trial", "Response"]
            "#,
        )
        .unwrap();
        assert_eq!(config.graphics.as_deref(), Some("datapixx"));
        assert_eq!(config.background, 0.5);
        assert_eq!(config.width, 1024);
        assert_eq!(
            config.result_headers,
            Some(vec!["Trial".to_string(), "Response".to_string()])
        );
        config.validate().unwrap();
    }

    #[test]
    fn toml_round_trip() {
        let config = SessionConfig::default().with_results("r.txt", ["A", "B"]);
        let text = config.to_toml_string().unwrap();
        assert_eq!(SessionConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn result_path_needs_headers() {
        let config = SessionConfig {
            results: Some("r.txt".into()),
            ..SessionConfig::files_only()
        };
        assert!(matches!(
            config.validate(),
            Err(HrlError::MissingResultHeaders)
        ));
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(matches!(
            SessionConfig::from_toml_str("width = \"wide\""),
            Err(HrlError::Config(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        fs::write(&path, "photometer = \"minolta\"\n").unwrap();
        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.photometer.as_deref(), Some("minolta"));
    }
}
