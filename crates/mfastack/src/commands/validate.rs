use super::{Source, load_settings};
use colored::Colorize;
use std::collections::BTreeMap;

pub fn handle(source: &Source) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let settings = load_settings()?;
    let stack = match source.load(&settings) {
        Ok(stack) => stack,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let template = match mfastack_cloud::render(&stack) {
        Ok(template) => template,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ レンダリングエラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  スタック: {}", stack.name.cyan());
    println!(
        "  ユーザープール: {}個 (クライアント: {}個)",
        stack.user_pools.len(),
        stack.client_count()
    );
    for (name, pool) in &stack.user_pools {
        println!(
            "    - {} (mfa: {}, {}個のクライアント)",
            name.cyan(),
            pool.mfa.as_str(),
            pool.clients.len()
        );
        for (client_name, client) in &pool.clients {
            let oauth = if client.oauth.is_some() { ", oauth" } else { "" };
            println!(
                "        - {} ({}個の認証フロー{})",
                client_name,
                client.auth_flows.enabled_count(),
                oauth
            );
        }
    }
    if !stack.networks.is_empty() {
        println!("  ネットワーク: {}個", stack.networks.len());
        for (name, network) in &stack.networks {
            println!(
                "    - {} ({}, {} AZ)",
                name.cyan(),
                network.cidr,
                network.max_azs
            );
        }
    }
    if !stack.load_balancers.is_empty() {
        println!("  ロードバランサー: {}個", stack.load_balancers.len());
        for (name, lb) in &stack.load_balancers {
            let ports: Vec<String> = lb.listeners.values().map(|l| l.port.to_string()).collect();
            println!(
                "    - {} (network: {}, ports: {})",
                name.cyan(),
                lb.network,
                ports.join(", ")
            );
        }
    }

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for resource in template.resources.values() {
        *by_type.entry(resource.resource_type.as_str()).or_default() += 1;
    }
    println!("  リソース: {}個", template.resources.len());
    for (resource_type, count) in by_type {
        println!("    - {} × {}", resource_type, count);
    }

    Ok(())
}
