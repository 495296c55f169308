//! スタック定義

use super::{LoadBalancer, Network, UserPool};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// スタック定義（1デプロイ単位のリソースグラフ）
///
/// 順序付きマップを使い、同じ定義から常に同じ順序でリソースを列挙する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDefinition {
    /// スタック名
    pub name: String,
    /// 説明
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_pools: BTreeMap<String, UserPool>,
    #[serde(default)]
    pub networks: BTreeMap<String, Network>,
    #[serde(default)]
    pub load_balancers: BTreeMap<String, LoadBalancer>,
}

impl StackDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 定義されているクライアントの総数
    pub fn client_count(&self) -> usize {
        self.user_pools.values().map(|p| p.clients.len()).sum()
    }

    /// リソース定義が1つもないかどうか
    pub fn is_empty(&self) -> bool {
        self.user_pools.is_empty() && self.networks.is_empty() && self.load_balancers.is_empty()
    }
}
