//! ロードバランサー / リスナー / ターゲットグループ定義

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// アプリケーションロードバランサー
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    /// 配置先ネットワーク名
    pub network: String,
    /// インターネット向けかどうか
    #[serde(default)]
    pub internet_facing: bool,
    /// リスナー
    #[serde(default)]
    pub listeners: BTreeMap<String, Listener>,
}

/// リスナー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub port: u16,
    pub protocol: Protocol,
    /// 全てのアドレスからの接続を許可するか
    pub open: bool,
    /// 転送先ターゲットグループ
    #[serde(default)]
    pub target_groups: BTreeMap<String, TargetGroup>,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            port: 80,
            protocol: Protocol::Http,
            open: true,
            target_groups: BTreeMap::new(),
        }
    }
}

/// ターゲットグループ
///
/// 登録ターゲットを持たないプレースホルダー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub port: u16,
    pub protocol: Protocol,
}

impl Default for TargetGroup {
    fn default() -> Self {
        Self {
            port: 80,
            protocol: Protocol::Http,
        }
    }
}

/// アプリケーションプロトコル
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            _ => None,
        }
    }

    /// プロバイダー表記（大文字）
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "HTTP",
            Self::Https => "HTTPS",
        }
    }

    /// ポート未指定時の既定値
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}
