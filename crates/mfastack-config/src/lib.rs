pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 設定ファイル名
pub const SETTINGS_FILE: &str = "settings.yaml";

/// mfastackの設定ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("mfastack");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// ユーザー設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 出力形式（json / yaml）
    pub format: String,
    /// ステージ未指定時に使うステージ
    pub default_stage: Option<String>,
    /// テンプレートの Description（スタック定義側が優先）
    pub description: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            default_stage: None,
            description: None,
        }
    }
}

impl Settings {
    /// 設定を読み込む
    ///
    /// 1. 環境変数 MFASTACK_SETTINGS_PATH (直接パス指定)
    /// 2. ~/.config/mfastack/settings.yaml
    ///
    /// ファイルが存在しない場合はデフォルト値を返す
    pub fn load() -> Result<Self> {
        Self::load_from(&settings_path()?)
    }

    /// 指定パスから読み込む
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "設定ファイルなし、デフォルト値を使用");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        // 空ファイルは null としてパースされる
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings = serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "設定ファイルを読み込みました");
        Ok(settings)
    }
}

/// 設定ファイルのパス
pub fn settings_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("MFASTACK_SETTINGS_PATH") {
        return Ok(PathBuf::from(path));
    }
    Ok(get_config_dir()?.join(SETTINGS_FILE))
}
