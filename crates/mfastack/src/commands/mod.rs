pub mod diff;
pub mod graph;
pub mod init;
pub mod synth;
pub mod validate;

use anyhow::Context;
use colored::Colorize;
use mfastack_config::{ConfigError, Settings};
use mfastack_core::{StackDefinition, Variant};

/// スタック定義の取得元（プロジェクト or プリセット）
pub struct Source {
    pub stage: Option<String>,
    pub preset: Option<String>,
}

impl Source {
    pub fn new(stage: Option<String>, preset: Option<String>) -> Self {
        Self { stage, preset }
    }

    /// スタック定義をロード
    ///
    /// ステージ未指定時は settings.yaml の default_stage を使う
    pub fn load(&self, settings: &Settings) -> anyhow::Result<StackDefinition> {
        let mut stack = match &self.preset {
            Some(preset) => {
                let variant = Variant::parse(preset)?;
                eprintln!("{} {}", "プリセット:".dimmed(), variant.as_str().cyan());
                variant.definition()?
            }
            None => {
                let stage = self.stage.as_deref().or(settings.default_stage.as_deref());
                let project = mfastack_core::load_project(stage)?;
                eprintln!(
                    "{} {}",
                    "プロジェクトルート:".dimmed(),
                    project.root.display().to_string().cyan()
                );
                if let Some(stage) = &project.stage {
                    eprintln!("{} {}", "ステージ:".dimmed(), stage.cyan());
                }
                project.stack
            }
        };

        if stack.is_empty() {
            eprintln!("{}", "⚠ リソースが1つも定義されていません".yellow());
        }
        if stack.description.is_none() {
            stack.description = settings.description.clone();
        }
        Ok(stack)
    }
}

/// ユーザー設定を読み込む
///
/// 設定ディレクトリ自体が存在しない環境ではデフォルト値を使う
pub fn load_settings() -> anyhow::Result<Settings> {
    match Settings::load() {
        Err(ConfigError::ConfigDirNotFound) => Ok(Settings::default()),
        other => other.context("設定ファイルの読み込みに失敗しました"),
    }
}
