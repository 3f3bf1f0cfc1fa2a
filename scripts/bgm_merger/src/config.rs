//! 合并器配置（`merger.toml`）。
//!
//! ```toml
//! bgm_folders = ["BGM", "SE"]
//! music_threshold_seconds = 30.0
//! line_ending = "crlf"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::types::{LineEnding, MergeError};

fn default_music_threshold_seconds() -> f64 {
    30.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MergerConfig {
    /// 按顺序搜索音频文件的目录
    #[serde(default)]
    pub bgm_folders: Vec<PathBuf>,
    /// 时长不小于该值（秒）的音频视为音乐，否则视为音效
    #[serde(default = "default_music_threshold_seconds")]
    pub music_threshold_seconds: f64,
    /// 输出脚本使用的换行符
    #[serde(default)]
    pub line_ending: LineEnding,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            bgm_folders: Vec::new(),
            music_threshold_seconds: default_music_threshold_seconds(),
            line_ending: LineEnding::default(),
        }
    }
}

impl MergerConfig {
    /// 读取并校验 TOML 配置文件。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MergeError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, MergeError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        if !self.music_threshold_seconds.is_finite() || self.music_threshold_seconds < 0.0 {
            return Err(MergeError::InvalidConfig(format!(
                "music_threshold_seconds 必须是非负的有限数，当前为 {}",
                self.music_threshold_seconds
            )));
        }
        Ok(())
    }
}
