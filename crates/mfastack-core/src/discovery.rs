//! ファイル自動発見機能
//!
//! 規約ベースのディレクトリ構造からスタック定義ファイルを発見します。
//!
//! ```text
//! project/
//! ├── stack.kdl            (または .mfastack/stack.kdl)
//! ├── stack.{stage}.kdl
//! ├── stack.local.kdl
//! ├── resources/**/*.kdl
//! ├── variables/**/*.kdl
//! ├── .env
//! └── .env.{stage}
//! ```

use crate::error::{Result, StackError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// ルートファイル名
pub const ROOT_FILE: &str = "stack.kdl";

/// 代替配置ディレクトリ
pub const PROJECT_DIR: &str = ".mfastack";

/// 発見されたファイル群
#[derive(Debug, Clone, Default)]
pub struct DiscoveredFiles {
    /// ルートファイル (stack.kdl)
    pub root: Option<PathBuf>,
    /// リソース定義ファイル (resources/**/*.kdl)
    pub resources: Vec<PathBuf>,
    /// 変数定義ファイル (variables/**/*.kdl)
    pub variables: Vec<PathBuf>,
    /// ステージ固有オーバーライドファイル (stack.{stage}.kdl)
    pub stage_override: Option<PathBuf>,
    /// ローカルオーバーライドファイル (stack.local.kdl)
    pub local_override: Option<PathBuf>,
    /// 環境変数ファイル (.env)
    pub env_file: Option<PathBuf>,
    /// ステージ固有の環境変数ファイル (.env.{stage})
    pub stage_env_file: Option<PathBuf>,
}

impl DiscoveredFiles {
    /// 読み込み順に並べたKDLファイル
    ///
    /// root → resources → stage override → local override
    pub fn kdl_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        files.extend(self.root.iter().cloned());
        files.extend(self.resources.iter().cloned());
        files.extend(self.stage_override.iter().cloned());
        files.extend(self.local_override.iter().cloned());
        files
    }
}

/// プロジェクトルートを検出
///
/// 以下の優先順位で検索:
/// 1. 環境変数 MFASTACK_PROJECT_ROOT
/// 2. カレントディレクトリから上に向かって stack.kdl または .mfastack/stack.kdl を探す
#[tracing::instrument]
pub fn find_project_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var("MFASTACK_PROJECT_ROOT") {
        let path = PathBuf::from(&root);
        debug!(env_root = %root, "Checking MFASTACK_PROJECT_ROOT");
        if has_root_file(&path) {
            info!(project_root = %path.display(), "Found project root from environment variable");
            return Ok(path);
        }
        warn!(env_root = %root, "MFASTACK_PROJECT_ROOT does not contain stack.kdl, ignoring");
    }

    let start_dir = std::env::current_dir()?;
    find_project_root_from(&start_dir)
}

/// 指定ディレクトリから上に向かってプロジェクトルートを探す
pub fn find_project_root_from(start_dir: &Path) -> Result<PathBuf> {
    let mut current = start_dir.to_path_buf();
    debug!(start_dir = %start_dir.display(), "Searching for project root");

    loop {
        if has_root_file(&current) {
            info!(project_root = %current.display(), "Found project root");
            return Ok(current);
        }

        if !current.pop() {
            break;
        }
    }

    warn!(start_dir = %start_dir.display(), "Project root not found");
    Err(StackError::ProjectRootNotFound(start_dir.to_path_buf()))
}

fn has_root_file(dir: &Path) -> bool {
    dir.join(ROOT_FILE).exists() || dir.join(PROJECT_DIR).join(ROOT_FILE).exists()
}

/// `<root>/<name>` を優先し、なければ `<root>/.mfastack/<name>` を返す
fn find_file(project_root: &Path, name: &str) -> Option<PathBuf> {
    let direct = project_root.join(name);
    if direct.is_file() {
        debug!(file = %direct.display(), "Found file");
        return Some(direct);
    }
    let nested = project_root.join(PROJECT_DIR).join(name);
    if nested.is_file() {
        debug!(file = %nested.display(), "Found file in .mfastack/");
        return Some(nested);
    }
    None
}

/// プロジェクトルートからファイルを自動発見
pub fn discover_files(project_root: &Path) -> Result<DiscoveredFiles> {
    discover_files_with_stage(project_root, None)
}

/// ステージ指定でプロジェクトルートからファイルを自動発見
///
/// stage が指定されている場合、stack.{stage}.kdl と .env.{stage} も検出します。
#[tracing::instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn discover_files_with_stage(
    project_root: &Path,
    stage: Option<&str>,
) -> Result<DiscoveredFiles> {
    debug!("Starting file discovery");

    let mut discovered = DiscoveredFiles {
        root: find_file(project_root, ROOT_FILE),
        local_override: find_file(project_root, "stack.local.kdl"),
        env_file: find_file(project_root, ".env"),
        ..Default::default()
    };

    for (dir_name, target) in [
        ("resources", &mut discovered.resources),
        ("variables", &mut discovered.variables),
    ] {
        let dir = project_root.join(dir_name);
        if dir.is_dir() {
            *target = discover_kdl_files(&dir)?;
            info!(
                dir = dir_name,
                file_count = target.len(),
                "Discovered definition files"
            );
        }
    }

    if let Some(stage_name) = stage {
        discovered.stage_override = find_file(project_root, &format!("stack.{}.kdl", stage_name));
        discovered.stage_env_file = find_file(project_root, &format!(".env.{}", stage_name));
        if discovered.stage_override.is_some() {
            debug!(stage = %stage_name, "Found stage override file");
        }
    }

    Ok(discovered)
}

/// ディレクトリ配下の .kdl ファイルを再帰的に発見
///
/// アルファベット順にソートして返す
fn discover_kdl_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut visited = HashSet::new();

    visit_dir(dir, &mut files, &mut visited)?;
    files.sort();

    Ok(files)
}

/// ディレクトリを再帰的に走査
fn visit_dir(dir: &Path, files: &mut Vec<PathBuf>, visited: &mut HashSet<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    let canonical_dir = dir.canonicalize().map_err(|e| StackError::DiscoveryError {
        path: dir.to_path_buf(),
        message: format!("パスの正規化に失敗: {}", e),
    })?;

    // シンボリックリンクのループ
    if !visited.insert(canonical_dir.clone()) {
        warn!(dir = %canonical_dir.display(), "Symlink loop detected, skipping");
        return Ok(());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| StackError::DiscoveryError {
        path: dir.to_path_buf(),
        message: format!("ディレクトリの読み込みに失敗: {}", e),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| StackError::DiscoveryError {
            path: dir.to_path_buf(),
            message: format!("ディレクトリエントリの読み込みに失敗: {}", e),
        })?;
        let path = entry.path();

        if path.is_dir() {
            visit_dir(&path, files, visited)?;
        } else if path.extension().and_then(|s| s.to_str()) == Some("kdl") {
            files.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    fn create_test_project(base: &Path) -> Result<()> {
        fs::write(base.join("stack.kdl"), "// root")?;

        fs::create_dir_all(base.join("resources/network"))?;
        fs::write(base.join("resources/pool.kdl"), "user-pool \"pool\" {}")?;
        fs::write(base.join("resources/alb.kdl"), "load-balancer \"alb\" {}")?;
        fs::write(base.join("resources/network/vpc.kdl"), "network \"vpc\" {}")?;
        fs::write(base.join("resources/README.md"), "not kdl")?;

        fs::create_dir_all(base.join("variables"))?;
        fs::write(base.join("variables/common.kdl"), "variables {}")?;

        fs::write(base.join("stack.prod.kdl"), "// prod override")?;
        fs::write(base.join("stack.local.kdl"), "// local override")?;
        fs::write(base.join(".env"), "A=1")?;
        fs::write(base.join(".env.prod"), "A=2")?;

        Ok(())
    }

    #[test]
    fn test_discover_files() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();
        create_test_project(project_root)?;

        let discovered = discover_files(project_root)?;

        assert!(discovered.root.is_some());
        assert_eq!(discovered.resources.len(), 3);
        assert!(discovered.resources[0].ends_with("resources/alb.kdl"));
        assert!(discovered.resources[1].ends_with("resources/network/vpc.kdl"));
        assert!(discovered.resources[2].ends_with("resources/pool.kdl"));
        assert_eq!(discovered.variables.len(), 1);
        assert!(discovered.local_override.is_some());
        assert!(discovered.env_file.is_some());

        // ステージ未指定ならステージ固有ファイルは拾わない
        assert!(discovered.stage_override.is_none());
        assert!(discovered.stage_env_file.is_none());

        Ok(())
    }

    #[test]
    fn test_discover_files_with_stage() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();
        create_test_project(project_root)?;

        let discovered = discover_files_with_stage(project_root, Some("prod"))?;
        assert!(
            discovered
                .stage_override
                .as_ref()
                .unwrap()
                .ends_with("stack.prod.kdl")
        );
        assert!(
            discovered
                .stage_env_file
                .as_ref()
                .unwrap()
                .ends_with(".env.prod")
        );

        let other = discover_files_with_stage(project_root, Some("dev"))?;
        assert!(other.stage_override.is_none());

        Ok(())
    }

    #[test]
    fn test_kdl_files_order() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();
        create_test_project(project_root)?;

        let discovered = discover_files_with_stage(project_root, Some("prod"))?;
        let files = discovered.kdl_files();

        assert_eq!(files.len(), 6);
        assert!(files[0].ends_with("stack.kdl"));
        assert!(files[4].ends_with("stack.prod.kdl"));
        assert!(files[5].ends_with("stack.local.kdl"));

        Ok(())
    }

    #[test]
    fn test_discover_files_in_project_dir() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();

        fs::create_dir_all(project_root.join(".mfastack"))?;
        fs::write(project_root.join(".mfastack/stack.kdl"), "// root")?;
        fs::write(project_root.join(".mfastack/stack.local.kdl"), "// local")?;

        let discovered = discover_files(project_root)?;

        assert!(
            discovered
                .root
                .as_ref()
                .unwrap()
                .ends_with(".mfastack/stack.kdl")
        );
        assert!(
            discovered
                .local_override
                .as_ref()
                .unwrap()
                .ends_with(".mfastack/stack.local.kdl")
        );

        Ok(())
    }

    #[test]
    fn test_root_file_priority_over_project_dir() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();

        fs::write(project_root.join("stack.kdl"), "// root")?;
        fs::create_dir_all(project_root.join(".mfastack"))?;
        fs::write(project_root.join(".mfastack/stack.kdl"), "// nested")?;

        let discovered = discover_files(project_root)?;
        assert_eq!(discovered.root, Some(project_root.join("stack.kdl")));

        Ok(())
    }

    #[test]
    fn test_find_project_root_from_subdirectory() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path().canonicalize()?;
        fs::write(project_root.join("stack.kdl"), "// root")?;
        let nested = project_root.join("resources/deep");
        fs::create_dir_all(&nested)?;

        let found = find_project_root_from(&nested)?;
        assert_eq!(found, project_root);

        Ok(())
    }

    #[test]
    fn test_find_project_root_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = find_project_root_from(temp_dir.path());
        assert!(matches!(result, Err(StackError::ProjectRootNotFound(_))));
    }

    #[test]
    #[serial]
    fn test_find_project_root_from_env() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("stack.kdl"), "// root").unwrap();
        let root = temp_dir.path().to_string_lossy().to_string();

        temp_env::with_var("MFASTACK_PROJECT_ROOT", Some(&root), || {
            let found = find_project_root().unwrap();
            assert_eq!(found, temp_dir.path());
        });
    }
}
