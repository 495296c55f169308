use super::{Source, load_settings};
use colored::Colorize;
use mfastack_cloud::OutputFormat;
use std::path::Path;

pub fn handle(
    source: &Source,
    format: Option<&str>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let settings = load_settings()?;
    let format = OutputFormat::parse(format.unwrap_or(&settings.format))?;

    let stack = source.load(&settings)?;
    let template = mfastack_cloud::render(&stack)?;
    let rendered = template.to_format(format)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &rendered)?;
            println!(
                "{} {} ({}個のリソース)",
                "✓ テンプレートを書き出しました:".green(),
                path.display().to_string().cyan(),
                template.resources.len()
            );
        }
        None => {
            print!("{}", rendered);
            if !rendered.ends_with('\n') {
                println!();
            }
        }
    }

    Ok(())
}
