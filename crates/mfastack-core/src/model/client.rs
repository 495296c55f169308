//! アプリケーションクライアント定義

use super::url::UrlSpec;
use serde::{Deserialize, Serialize};

/// アプリケーションクライアント
///
/// 必ず1つのユーザープールに属する（`UserPool::clients` の要素として定義される）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPoolClient {
    /// クライアント名
    pub client_name: Option<String>,
    /// クライアントシークレットを生成するかどうか
    #[serde(default)]
    pub generate_secret: bool,
    /// 認証フロー
    #[serde(default)]
    pub auth_flows: AuthFlows,
    /// OAuth設定
    #[serde(default)]
    pub oauth: Option<OAuthSettings>,
}

/// クライアントが使用する認証フロー
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthFlows {
    pub admin_user_password: bool,
    pub custom: bool,
    pub user_password: bool,
    pub user_srp: bool,
}

impl AuthFlows {
    /// 有効なフローの数
    pub fn enabled_count(&self) -> usize {
        [
            self.admin_user_password,
            self.custom,
            self.user_password,
            self.user_srp,
        ]
        .iter()
        .filter(|enabled| **enabled)
        .count()
    }
}

/// OAuth設定
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthSettings {
    #[serde(default)]
    pub flows: OAuthFlows,
    #[serde(default)]
    pub scopes: Vec<OAuthScope>,
    #[serde(default)]
    pub callback_urls: Vec<UrlSpec>,
    #[serde(default)]
    pub logout_urls: Vec<UrlSpec>,
}

/// OAuthグラントタイプ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthFlows {
    pub authorization_code: bool,
    pub implicit: bool,
    pub client_credentials: bool,
}

impl OAuthFlows {
    /// フロー名を設定（"authorization-code" など）
    ///
    /// 不明なフロー名の場合は false を返す
    pub fn enable(&mut self, name: &str) -> bool {
        match name.to_lowercase().replace('_', "-").as_str() {
            "authorization-code" | "code" => self.authorization_code = true,
            "implicit" => self.implicit = true,
            "client-credentials" => self.client_credentials = true,
            _ => return false,
        }
        true
    }
}

/// OAuthスコープ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OAuthScope {
    Openid,
    Email,
    Phone,
    Profile,
    CognitoAdmin,
    /// リソースサーバー定義のカスタムスコープ
    Custom(String),
}

impl OAuthScope {
    pub fn parse(s: &str) -> Self {
        match s {
            "openid" => Self::Openid,
            "email" => Self::Email,
            "phone" => Self::Phone,
            "profile" => Self::Profile,
            "aws.cognito.signin.user.admin" | "cognito-admin" => Self::CognitoAdmin,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Openid => "openid",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Profile => "profile",
            Self::CognitoAdmin => "aws.cognito.signin.user.admin",
            Self::Custom(scope) => scope,
        }
    }
}
