//! KDLパーサー
//!
//! スタック定義のKDLファイルをパースします。
//! 各ノードタイプのパース処理はモジュールに分離されています。
//!
//! 同じIDのノードが複数回現れた場合は、既存の定義に対して
//! 後から現れたノードに書かれたフィールドだけを上書きします。

mod client;
mod load_balancer;
mod network;
mod user_pool;
mod value;

pub use client::apply_client;
pub use load_balancer::apply_load_balancer;
pub use network::apply_network;
pub use user_pool::apply_user_pool;

use crate::error::Result;
use crate::model::StackDefinition;
use kdl::KdlDocument;
use tracing::debug;
use value::{first_string, required_name};

/// KDL文字列をパース
pub fn parse_kdl_string(content: &str, default_name: String) -> Result<StackDefinition> {
    let mut stack = StackDefinition::new(default_name);
    apply_kdl_string(&mut stack, content)?;
    Ok(stack)
}

/// 既存のスタック定義にKDL文字列の内容を適用
pub fn apply_kdl_string(stack: &mut StackDefinition, content: &str) -> Result<()> {
    let doc: KdlDocument = content.parse()?;

    for node in doc.nodes() {
        match node.name().value() {
            "stack" => {
                // stackノードから名前を取得
                if let Some(name) = first_string(node) {
                    stack.name = name;
                }
            }
            "description" => {
                stack.description = first_string(node);
            }
            "user-pool" | "user_pool" | "userpool" => {
                let id = required_name(node, "user-pool")?;
                let pool = stack.user_pools.entry(id.clone()).or_default();
                apply_user_pool(node, pool)?;
                debug!(user_pool = %id, "Parsed user pool");
            }
            "network" | "vpc" => {
                let id = required_name(node, "network")?;
                let network = stack.networks.entry(id.clone()).or_default();
                apply_network(node, network)?;
                debug!(network = %id, "Parsed network");
            }
            "load-balancer" | "load_balancer" | "alb" => {
                let id = required_name(node, "load-balancer")?;
                let lb = stack.load_balancers.entry(id.clone()).or_default();
                apply_load_balancer(node, lb)?;
                debug!(load_balancer = %id, "Parsed load balancer");
            }
            "variables" => {
                // テンプレート展開時に処理済み
            }
            other => {
                // 不明なノードはスキップ
                debug!(node = %other, "Skipping unknown node");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
