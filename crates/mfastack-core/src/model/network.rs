//! ネットワーク（VPC）定義

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// デフォルトのネットワークアドレス範囲
pub const DEFAULT_CIDR: &str = "10.0.0.0/16";

/// ネットワークセグメント
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// 表示名（Nameタグ）
    pub name: Option<String>,
    /// アドレス範囲
    pub cidr: Ipv4Net,
    /// 使用するアベイラビリティゾーンの最大数
    pub max_azs: u8,
    /// NATゲートウェイ数（未指定時はAZごとに1つ）
    pub nat_gateways: Option<u8>,
    /// サブネットグループ
    pub subnets: Vec<SubnetGroup>,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            name: None,
            cidr: Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, 0), 16),
            max_azs: 3,
            nat_gateways: None,
            subnets: vec![
                SubnetGroup::new("Public", SubnetKind::Public),
                SubnetGroup::new("Private", SubnetKind::Private),
            ],
        }
    }
}

impl Network {
    /// 実際に作成するNATゲートウェイ数
    ///
    /// privateサブネットがない、またはpublicサブネットがない場合は0
    pub fn effective_nat_gateways(&self) -> u8 {
        let has_public = self.subnets.iter().any(|s| s.kind == SubnetKind::Public);
        let has_private = self.subnets.iter().any(|s| s.kind == SubnetKind::Private);
        if !has_public || !has_private {
            return 0;
        }
        self.nat_gateways.unwrap_or(self.max_azs).min(self.max_azs)
    }
}

/// サブネットグループ（AZごとに1つずつ作成される）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetGroup {
    pub name: String,
    pub kind: SubnetKind,
    /// プレフィックス長（未指定時は残りの空間を均等割り）
    pub cidr_mask: Option<u8>,
}

impl SubnetGroup {
    pub fn new(name: impl Into<String>, kind: SubnetKind) -> Self {
        Self {
            name: name.into(),
            kind,
            cidr_mask: None,
        }
    }
}

/// サブネット種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubnetKind {
    /// インターネットゲートウェイへの経路を持つ
    Public,
    /// NATゲートウェイ経由で外部に出る
    Private,
    /// 外部への経路なし
    Isolated,
}

impl SubnetKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "public" => Some(Self::Public),
            "private" | "private-with-egress" => Some(Self::Private),
            "isolated" | "private-isolated" => Some(Self::Isolated),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Private => "Private",
            Self::Isolated => "Isolated",
        }
    }
}
