//! URL定義
//!
//! ロードバランサーのホスト名はデプロイ時に決まるため、
//! 文字列ではなく遅延参照として保持する。

use serde::{Deserialize, Serialize};

/// URL指定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UrlSpec {
    /// そのままの文字列
    Literal(String),
    /// `<scheme>://<ロードバランサーのDNS名><path>`
    LoadBalancer {
        load_balancer: String,
        scheme: String,
        path: String,
    },
}

impl UrlSpec {
    /// ロードバランサー参照を作成（scheme は https）
    pub fn load_balancer(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::LoadBalancer {
            load_balancer: name.into(),
            scheme: "https".to_string(),
            path: path.into(),
        }
    }
}

impl std::fmt::Display for UrlSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(url) => write!(f, "{}", url),
            Self::LoadBalancer {
                load_balancer,
                scheme,
                path,
            } => write!(f, "{}://<{}.dns>{}", scheme, load_balancer, path),
        }
    }
}
