//! テンプレート展開機能
//!
//! Teraを使用してKDLファイルのテンプレート展開を行います。
//!
//! 確認メッセージのプレースホルダー（`{####}` や `{##Verify Email##}`）は
//! Teraのコメント構文 `{# ... #}` と衝突するため、展開前に退避し展開後に戻します。

use crate::error::{Result, StackError};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use tera::{Context, Tera};
use tracing::{debug, info};

/// 展開対象にする環境変数のプレフィックス
pub const ALLOWED_ENV_PREFIXES: &[&str] = &["MFASTACK_", "CI_"];

/// ファイルあたりの推定バイト数（容量事前確保用）
const ESTIMATED_BYTES_PER_FILE: usize = 500;

/// プレースホルダー退避用の目印
const PLACEHOLDER_SENTINEL: &str = "__MFASTACK_PLACEHOLDER_";

/// 変数コンテキスト
pub type Variables = BTreeMap<String, serde_json::Value>;

/// テンプレートプロセッサ
pub struct TemplateProcessor {
    tera: Tera,
    context: Context,
}

impl TemplateProcessor {
    /// 新しいテンプレートプロセッサを作成
    pub fn new() -> Self {
        Self {
            tera: Tera::default(),
            context: Context::new(),
        }
    }

    /// 変数を追加
    pub fn add_variable(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.context.insert(key.into(), &value);
    }

    /// 複数の変数を追加
    pub fn add_variables(&mut self, variables: Variables) {
        for (key, value) in variables {
            self.context.insert(key, &value);
        }
    }

    /// 環境変数を追加
    ///
    /// MFASTACK_* と CI_* のみを取り込む
    #[tracing::instrument(skip(self))]
    pub fn add_env_variables(&mut self) {
        let mut count = 0;

        for (key, value) in std::env::vars() {
            if ALLOWED_ENV_PREFIXES
                .iter()
                .any(|prefix| key.starts_with(prefix))
            {
                debug!(key = %key, "Adding environment variable");
                self.context.insert(key, &serde_json::Value::String(value));
                count += 1;
            }
        }

        info!(
            env_var_count = count,
            "Added filtered environment variables"
        );
    }

    /// .env ファイルから変数を読み込んで追加
    ///
    /// .env ファイルの変数はプレフィックス制限なしで全て読み込まれます。
    #[tracing::instrument(skip(self))]
    pub fn add_env_file_variables(&mut self, env_file_path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(env_file_path).map_err(|e| StackError::IoError {
            path: env_file_path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut count = 0;
        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").unwrap_or(line);
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = strip_quotes(value.trim());

                debug!(key = %key, "Adding variable from .env file");
                self.context
                    .insert(key, &serde_json::Value::String(value.to_string()));
                count += 1;
            }
        }

        info!(
            env_file = %env_file_path.display(),
            variable_count = count,
            "Loaded variables from .env file"
        );

        Ok(())
    }

    /// 文字列をテンプレートとして展開
    pub fn render_str(&mut self, template: &str) -> Result<String> {
        let (protected, placeholders) = protect_placeholders(template)?;
        let rendered = self
            .tera
            .render_str(&protected, &self.context)
            .map_err(|e| StackError::TemplateRenderError(extract_tera_error_detail(&e)))?;
        Ok(restore_placeholders(rendered, &placeholders))
    }

    /// ファイルを読み込んでテンプレート展開
    pub fn render_file(&mut self, path: &Path) -> Result<String> {
        let content = std::fs::read_to_string(path).map_err(|e| StackError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        self.render_str(&content).map_err(|e| match e {
            StackError::TemplateRenderError(message) => StackError::TemplateError {
                file: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// 複数のファイルを順に展開して結合
    pub fn render_files(&mut self, paths: &[impl AsRef<Path>]) -> Result<String> {
        let mut result = String::with_capacity(paths.len() * ESTIMATED_BYTES_PER_FILE);

        for path in paths {
            let rendered = self.render_file(path.as_ref())?;
            result.push_str(&rendered);
            result.push('\n');
        }

        Ok(result)
    }
}

impl Default for TemplateProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// プレースホルダーを目印に置き換える
fn protect_placeholders(template: &str) -> Result<(String, Vec<String>)> {
    // `{####}` と `{##Verify Email##}` の両方に一致
    let re = Regex::new(r"\{##[^#{}]*##\}")
        .map_err(|e| StackError::InvalidConfig(format!("正規表現のコンパイルエラー: {}", e)))?;
    let mut placeholders = Vec::new();
    let protected = re.replace_all(template, |caps: &regex::Captures| {
        let index = placeholders.len();
        placeholders.push(caps[0].to_string());
        format!("{}{}__", PLACEHOLDER_SENTINEL, index)
    });
    Ok((protected.into_owned(), placeholders))
}

fn restore_placeholders(mut rendered: String, placeholders: &[String]) -> String {
    for (index, original) in placeholders.iter().enumerate() {
        rendered = rendered.replace(&format!("{}{}__", PLACEHOLDER_SENTINEL, index), original);
    }
    rendered
}

/// KDLファイルから変数定義を抽出
///
/// variables { ... } ブロックを探してマップに変換。
/// 正規表現でブロックを切り出すことで、他の場所にある
/// テンプレート変数 {{ ... }} によるパースエラーを回避します。
pub fn extract_variables(kdl_content: &str) -> Result<Variables> {
    let re = Regex::new(r"(?s)variables\s*\{(?P<content>.*?)\}")
        .map_err(|e| StackError::InvalidConfig(format!("正規表現のコンパイルエラー: {}", e)))?;

    let mut all_vars = Variables::new();

    for cap in re.captures_iter(kdl_content) {
        let Some(var_content) = cap.name("content") else {
            continue;
        };
        let dummy_kdl = format!("extracted {{\n{}\n}}", var_content.as_str());
        let doc: kdl::KdlDocument = dummy_kdl.parse().map_err(|e| {
            StackError::InvalidConfig(format!("KDL パースエラー (変数抽出ブロック): {}", e))
        })?;

        if let Some(node) = doc.nodes().first()
            && let Some(children) = node.children()
        {
            for var_node in children.nodes() {
                let key = var_node.name().value().to_string();
                if let Some(entry) = var_node.entries().first() {
                    all_vars.insert(key, kdl_value_to_json(entry.value()));
                }
            }
        }
    }

    Ok(all_vars)
}

/// クォートを除去
fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Teraエラーから詳細情報を抽出
fn extract_tera_error_detail(e: &tera::Error) -> String {
    use std::error::Error;

    let mut details = vec![e.to_string()];
    let mut source = e.source();
    while let Some(err) = source {
        details.push(err.to_string());
        source = err.source();
    }

    let full_error = details.join(" | ");

    if full_error.contains("not found in context")
        && let Some(start) = full_error.find("Variable `")
        && let Some(end) = full_error[start..].find("` not found")
    {
        let var_name = &full_error[start + 10..start + end];
        return format!(
            "未定義の変数: `{}`\nヒント: variables ブロックで定義するか、.env ファイルに追加してください",
            var_name
        );
    }

    full_error
}

/// KDL値をJSON値に変換
fn kdl_value_to_json(value: &kdl::KdlValue) -> serde_json::Value {
    if let Some(s) = value.as_string() {
        serde_json::Value::String(s.to_string())
    } else if let Some(i) = value.as_integer() {
        serde_json::Value::Number((i as i64).into())
    } else if let Some(f) = value.as_float() {
        serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    } else if let Some(b) = value.as_bool() {
        serde_json::Value::Bool(b)
    } else {
        serde_json::Value::Null
    }
}
