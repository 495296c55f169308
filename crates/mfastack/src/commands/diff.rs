use super::{Source, load_settings};
use colored::Colorize;
use mfastack_cloud::{ActionType, Plan, Template};
use std::path::Path;

pub fn handle(source: &Source, previous: &Path) -> anyhow::Result<()> {
    let old = Template::from_file(previous)?;
    let settings = load_settings()?;
    let stack = source.load(&settings)?;
    let new = mfastack_cloud::render(&stack)?;

    let plan = Plan::between(&old, &new);
    if !plan.has_changes {
        println!("{}", "✓ 変更はありません".green());
        return Ok(());
    }

    for action in &plan.actions {
        match action.action_type {
            ActionType::Create => println!(
                "{} {} ({})",
                "+".green().bold(),
                action.resource_id.green(),
                action.resource_type
            ),
            ActionType::Delete => println!(
                "{} {} ({})",
                "-".red().bold(),
                action.resource_id.red(),
                action.resource_type
            ),
            ActionType::Update => {
                println!(
                    "{} {} ({})",
                    "~".yellow().bold(),
                    action.resource_id.yellow(),
                    action.resource_type
                );
                for path in &action.changes {
                    let detail = &action.details[path];
                    println!(
                        "      {}: {} → {}",
                        path,
                        detail["before"].to_string().red(),
                        detail["after"].to_string().green()
                    );
                }
            }
            ActionType::NoOp => {}
        }
    }

    println!();
    println!("{}", plan.summary().to_string().bold());
    Ok(())
}
