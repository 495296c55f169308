use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_stack_kdl(&self, content: &str) {
        self.write_file("stack.kdl", content);
    }

    pub fn write_file(&self, name: &str, content: &str) {
        let path = self.root.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// プロジェクトディレクトリで実行するコマンド
    ///
    /// ユーザー設定と環境変数の影響を受けないようにする
    #[allow(deprecated)]
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("mfastack").unwrap();
        cmd.current_dir(self.path())
            .env("MFASTACK_SETTINGS_PATH", self.path().join("no-settings.yaml"))
            .env_remove("MFASTACK_STAGE")
            .env_remove("MFASTACK_PROJECT_ROOT")
            .env_remove("RUST_LOG");
        cmd
    }
}
