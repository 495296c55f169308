//! 統合ローダー
//!
//! ファイル発見、テンプレート展開、パースを統合

use crate::discovery::{DiscoveredFiles, discover_files_with_stage, find_project_root};
use crate::error::{Result, StackError};
use crate::model::StackDefinition;
use crate::parser::parse_kdl_string;
use crate::template::{TemplateProcessor, Variables, extract_variables};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// ロード結果
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub root: PathBuf,
    pub stage: Option<String>,
    /// 読み込んだKDLファイル（読み込み順）
    pub files: Vec<PathBuf>,
    pub stack: StackDefinition,
}

/// プロジェクト全体をロードしてStackDefinitionを生成
///
/// 1. プロジェクトルートの検出
/// 2. ファイルの自動発見
/// 3. 変数の収集
/// 4. テンプレート展開
/// 5. KDLパース
#[instrument]
pub fn load_project(stage: Option<&str>) -> Result<LoadedProject> {
    info!("Starting project load");
    let project_root = find_project_root()?;
    load_project_from_root_with_stage(&project_root, stage)
}

/// 指定されたルートディレクトリからプロジェクトをロード
pub fn load_project_from_root(project_root: &Path) -> Result<LoadedProject> {
    load_project_from_root_with_stage(project_root, None)
}

/// ステージ指定でプロジェクトをロード
///
/// 読み込み順序: stack.kdl → resources/ → stack.{stage}.kdl → stack.local.kdl
#[instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn load_project_from_root_with_stage(
    project_root: &Path,
    stage: Option<&str>,
) -> Result<LoadedProject> {
    debug!("Step 1: Discovering files");
    let discovered = discover_files_with_stage(project_root, stage)?;
    if discovered.root.is_none() {
        return Err(StackError::DiscoveryError {
            path: project_root.to_path_buf(),
            message: "stack.kdl が見つかりません".to_string(),
        });
    }

    debug!("Step 2: Preparing template processor");
    let mut processor = prepare_template_processor(&discovered, project_root, stage)?;

    debug!("Step 3: Expanding templates");
    let files = discovered.kdl_files();
    let expanded_content = processor.render_files(&files)?;
    info!(
        content_size = expanded_content.len(),
        file_count = files.len(),
        "Template expansion complete"
    );

    debug!("Step 4: Parsing KDL");
    let name = project_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    let stack = parse_kdl_string(&expanded_content, name)?;
    info!(
        stack = %stack.name,
        user_pools = stack.user_pools.len(),
        networks = stack.networks.len(),
        load_balancers = stack.load_balancers.len(),
        "Project loaded successfully"
    );

    Ok(LoadedProject {
        root: project_root.to_path_buf(),
        stage: stage.map(str::to_string),
        files,
        stack,
    })
}

/// テンプレートプロセッサを準備
///
/// 優先度（低 → 高）: ビルトイン変数, .env, .env.{stage}, 環境変数, variables ブロック
fn prepare_template_processor(
    discovered: &DiscoveredFiles,
    project_root: &Path,
    stage: Option<&str>,
) -> Result<TemplateProcessor> {
    let mut processor = TemplateProcessor::new();

    processor.add_variable(
        "PROJECT_ROOT",
        serde_json::Value::String(project_root.to_string_lossy().to_string()),
    );
    processor.add_variable(
        "STAGE",
        stage
            .map(|s| serde_json::Value::String(s.to_string()))
            .unwrap_or(serde_json::Value::Null),
    );

    if let Some(env_file) = &discovered.env_file {
        processor.add_env_file_variables(env_file)?;
    }
    if let Some(stage_env_file) = &discovered.stage_env_file {
        processor.add_env_file_variables(stage_env_file)?;
    }

    processor.add_env_variables();

    let mut all_variables = Variables::new();
    let sources = discovered
        .root
        .iter()
        .chain(discovered.variables.iter())
        .chain(discovered.stage_override.iter())
        .chain(discovered.local_override.iter());
    for path in sources {
        let content = std::fs::read_to_string(path).map_err(|e| StackError::IoError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        all_variables.extend(extract_variables(&content)?);
    }

    debug!(vars = ?all_variables, "Adding all collected variables to processor");
    processor.add_variables(all_variables);

    Ok(processor)
}
