use colored::Colorize;
use mfastack_core::Variant;

pub fn handle(variant: &str, force: bool) -> anyhow::Result<()> {
    let variant = Variant::parse(variant)?;
    let path = std::env::current_dir()?.join("stack.kdl");

    if path.exists() && !force {
        anyhow::bail!(
            "{} は既に存在します（上書きする場合は --force を指定してください）",
            path.display()
        );
    }

    std::fs::write(&path, variant.kdl())?;

    println!("{}", "✓ 設定ファイルを作成しました！".green());
    println!("  {} ({})", path.display().to_string().cyan(), variant);
    println!();
    println!("{}", "次のコマンドでテンプレートを生成できます:".bold());
    println!("  {} synth", "mfastack".cyan());
    Ok(())
}
