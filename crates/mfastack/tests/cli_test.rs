#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
mod common;
use common::TestProject;
use std::fs;

const MINIMAL_STACK: &str = r#"
stack "cli-test"

user-pool "pool" {
    name "{{ MFASTACK_POOL_NAME | default(value="cli-pool") }}"
    password-policy {
        min-length 8
    }
    mfa "optional"
    mfa-second-factor "otp"
}
"#;

fn synth_json(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("mfastack").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("synth"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("diff"))
        .stdout(predicate::str::contains("graph"))
        .stdout(predicate::str::contains("init"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("mfastack").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mfastack"));
}

/// synthコマンドのヘルプに位置引数のステージが表示されることを確認
#[test]
fn test_synth_help() {
    let mut cmd = Command::cargo_bin("mfastack").unwrap();
    cmd.arg("synth")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[STAGE]"))
        .stdout(predicate::str::contains("--preset"))
        .stdout(predicate::str::contains("--format"));
}

/// 不正なコマンドでエラーになることを確認
#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("mfastack").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

/// フルプリセットのコールバックURLがロードバランサーのDNS名への参照になることを確認
#[test]
fn test_synth_full_preset() {
    let project = TestProject::new();
    let template = synth_json(project.command().args(["synth", "--preset", "full"]));

    let client = &template["Resources"]["MfaTestUserPoolMfaTestAppClient"]["Properties"];
    assert_eq!(
        client["CallbackURLs"][0],
        serde_json::json!({
            "Fn::Join": ["", ["https://", { "Fn::GetAtt": ["Alb", "DNSName"] }, "/auth2/idpresponse"]]
        })
    );
    assert_eq!(
        template["Resources"]["Vpc"]["Properties"]["CidrBlock"],
        "10.0.0.0/16"
    );
    assert_eq!(
        template["Resources"]["AlbListenerTargetGroup"]["Properties"]["Port"],
        80
    );
}

/// 同じ定義から2回生成した結果がバイト単位で一致することを確認
#[test]
fn test_synth_is_deterministic() {
    let project = TestProject::new();
    let first = project
        .command()
        .args(["synth", "--preset", "full"])
        .output()
        .unwrap();
    let second = project
        .command()
        .args(["synth", "--preset", "full"])
        .output()
        .unwrap();

    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

/// YAML形式で出力できることを確認
#[test]
fn test_synth_yaml() {
    let project = TestProject::new();
    project
        .command()
        .args(["synth", "--preset", "directory", "--format", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("AWSTemplateFormatVersion:"))
        .stdout(predicate::str::contains("AWS::Cognito::UserPool"))
        .stdout(predicate::str::contains("MfaConfiguration: 'ON'"));
}

/// 設定ファイルの出力形式が既定値として使われることを確認
#[test]
fn test_synth_format_from_settings() {
    let project = TestProject::new();
    project.write_file("settings.yaml", "format: yaml\n");

    project
        .command()
        .env("MFASTACK_SETTINGS_PATH", project.path().join("settings.yaml"))
        .args(["synth", "--preset", "directory"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("AWSTemplateFormatVersion:"));
}

/// 不明な出力形式はエラーになることを確認
#[test]
fn test_synth_unknown_format() {
    let project = TestProject::new();
    project
        .command()
        .args(["synth", "--preset", "directory", "--format", "toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("toml"));
}

/// 不明なプリセットはエラーになることを確認
#[test]
fn test_unknown_preset() {
    let project = TestProject::new();
    project
        .command()
        .args(["synth", "--preset", "everything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("不明なプリセット"));
}

/// プロジェクトの stack.kdl から生成できることを確認（テンプレート変数込み）
#[test]
fn test_synth_project() {
    let project = TestProject::new();
    project.write_stack_kdl(MINIMAL_STACK);

    let template = synth_json(project.command().arg("synth"));
    let pool = &template["Resources"]["Pool"]["Properties"];
    assert_eq!(pool["UserPoolName"], "cli-pool");
    assert_eq!(pool["MfaConfiguration"], "OPTIONAL");
    assert_eq!(pool["EnabledMfas"], serde_json::json!(["SOFTWARE_TOKEN_MFA"]));

    let template = synth_json(
        project
            .command()
            .env("MFASTACK_POOL_NAME", "from-env")
            .arg("synth"),
    );
    assert_eq!(
        template["Resources"]["Pool"]["Properties"]["UserPoolName"],
        "from-env"
    );
}

/// ステージ固有ファイルが位置引数・フラグ・環境変数のいずれでも適用されることを確認
#[test]
fn test_synth_stage_override() {
    let project = TestProject::new();
    project.write_stack_kdl(MINIMAL_STACK);
    project.write_file(
        "stack.prod.kdl",
        r#"
user-pool "pool" {
    password-policy {
        min-length 12
    }
}
"#,
    );

    let min_length = |template: &Value| {
        template["Resources"]["Pool"]["Properties"]["Policies"]["PasswordPolicy"]["MinimumLength"]
            .clone()
    };

    let positional = synth_json(project.command().args(["synth", "prod"]));
    assert_eq!(min_length(&positional), 12);

    let flag = synth_json(project.command().args(["synth", "-s", "prod"]));
    assert_eq!(min_length(&flag), 12);

    let env = synth_json(project.command().env("MFASTACK_STAGE", "prod").arg("synth"));
    assert_eq!(min_length(&env), 12);

    let base = synth_json(project.command().arg("synth"));
    assert_eq!(min_length(&base), 8);
}

/// 位置引数と-sフラグの同時指定はエラーになることを確認
#[test]
fn test_stage_conflict() {
    let project = TestProject::new();
    project
        .command()
        .args(["synth", "prod", "-s", "dev"])
        .assert()
        .failure();
}

/// -o でファイルに書き出せることを確認
#[test]
fn test_synth_output_file() {
    let project = TestProject::new();
    let output = project.path().join("out").join("template.json");

    project
        .command()
        .args(["synth", "--preset", "client", "-o"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("テンプレートを書き出しました"));

    let template: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(
        template["Resources"]["MfaTestUserPoolMfaTestAppClient"]["Properties"]["GenerateSecret"],
        false
    );
}

/// プロジェクト外でvalidateを実行するとエラーになることを確認
#[test]
fn test_validate_without_project() {
    let project = TestProject::new();
    project.command().arg("validate").assert().failure();
}

/// validateがサマリーを表示することを確認
#[test]
fn test_validate_preset() {
    let project = TestProject::new();
    project
        .command()
        .args(["validate", "--preset", "full"])
        .assert()
        .success()
        .stdout(predicate::str::contains("設定ファイルは正常です"))
        .stdout(predicate::str::contains("mfaTestUserPool"))
        .stdout(predicate::str::contains("10.0.0.0/16"))
        .stdout(predicate::str::contains("AWS::EC2::Subnet × 4"))
        .stdout(predicate::str::contains("クライアント: 1個"));
}

/// 検証ルール違反はvalidateで報告されることを確認
#[test]
fn test_validate_reports_render_error() {
    let project = TestProject::new();
    project.write_stack_kdl(
        r#"
user-pool "pool" {
    verification {
        email-body "no placeholder here"
    }
}
"#,
    );

    project
        .command()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("レンダリングエラー"));
}

/// リソースのないスタックは警告付きで生成されることを確認
#[test]
fn test_synth_empty_stack_warns() {
    let project = TestProject::new();
    project.write_stack_kdl("stack \"empty\"\n");

    project
        .command()
        .arg("synth")
        .assert()
        .success()
        .stderr(predicate::str::contains("リソースが1つも定義されていません"));
}

/// 日本語のみのIDは論理IDにできずエラーになることを確認
#[test]
fn test_synth_rejects_non_ascii_id() {
    let project = TestProject::new();
    project.write_stack_kdl("user-pool \"ユーザー\" {\n    mfa \"off\"\n}\n");

    project
        .command()
        .arg("synth")
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty logical id"));
}

/// graphが作成順序を表示することを確認
#[test]
fn test_graph() {
    let project = TestProject::new();
    project
        .command()
        .args(["graph", "--preset", "full"])
        .assert()
        .success()
        .stdout(predicate::str::contains("作成順序"))
        .stdout(predicate::str::contains("削除順序"))
        .stdout(predicate::str::contains("MfaTestUserPoolMfaTestAppClient"))
        .stdout(predicate::str::contains("Alb"));
}

/// initがプリセットを書き出し、既存ファイルは --force なしで上書きしないことを確認
#[test]
fn test_init() {
    let project = TestProject::new();

    project
        .command()
        .args(["init", "--variant", "client"])
        .assert()
        .success();
    let content = fs::read_to_string(project.path().join("stack.kdl")).unwrap();
    assert!(content.contains("mfa-test-app-client"));
    assert!(!content.contains("load-balancer"));

    project
        .command()
        .args(["init", "--variant", "full"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    project
        .command()
        .args(["init", "--variant", "full", "--force"])
        .assert()
        .success();

    // 生成した stack.kdl からそのまま synth できる
    let template = synth_json(project.command().arg("synth"));
    assert!(template["Resources"]["Alb"].is_object());
}

/// diffが変更されたプロパティだけを表示することを確認
#[test]
fn test_diff() {
    let project = TestProject::new();
    project.write_stack_kdl(MINIMAL_STACK);
    let previous = project.path().join("previous.json");

    project
        .command()
        .args(["synth", "-o"])
        .arg(&previous)
        .assert()
        .success();

    project
        .command()
        .arg("diff")
        .arg(&previous)
        .assert()
        .success()
        .stdout(predicate::str::contains("変更はありません"));

    project.write_stack_kdl(&MINIMAL_STACK.replace("min-length 8", "min-length 10"));

    project
        .command()
        .arg("diff")
        .arg(&previous)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Properties.Policies.PasswordPolicy.MinimumLength",
        ))
        .stdout(predicate::str::contains(
            "0 to create, 1 to update, 0 to delete",
        ));
}
