use super::{Source, load_settings};
use colored::Colorize;
use mfastack_cloud::ResourceGraph;

pub fn handle(source: &Source) -> anyhow::Result<()> {
    let settings = load_settings()?;
    let stack = source.load(&settings)?;
    let template = mfastack_cloud::render(&stack)?;
    let graph = ResourceGraph::from_template(&template)?;

    println!("{} ({}リソース)", "作成順序:".bold(), graph.len());
    for (i, id) in graph.creation_order()?.iter().enumerate() {
        let resource_type = &template.resources[id].resource_type;
        println!(
            "{:>3}. {} {}",
            i + 1,
            id.cyan(),
            format!("({})", resource_type).dimmed()
        );
        if let Some(deps) = graph.dependencies(id)
            && !deps.is_empty()
        {
            let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
            println!("       ← {}", deps.join(", "));
        }
    }

    println!();
    let deletion_order = graph.deletion_order()?;
    println!("{}", "削除順序:".bold());
    println!("  {}", deletion_order.join(" → ").dimmed());

    Ok(())
}
