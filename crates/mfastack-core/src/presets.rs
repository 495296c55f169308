//! ビルトインプリセット
//!
//! スタック定義の3つの段階（ディレクトリのみ / クライアント追加 /
//! ネットワークとロードバランサーまで含む完全版）をKDLとして提供します。
//! `mfastack init` はこのKDLをそのまま stack.kdl として書き出します。

use crate::error::{Result, StackError};
use crate::model::StackDefinition;
use crate::parser::parse_kdl_string;

/// プリセットの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// ユーザープールのみ
    Directory,
    /// ユーザープール + アプリケーションクライアント
    Client,
    /// ユーザープール + クライアント(OAuth) + ネットワーク + ロードバランサー
    Full,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Directory, Variant::Client, Variant::Full];

    /// 文字列からパース
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "directory" | "pool" | "minimal" => Ok(Self::Directory),
            "client" => Ok(Self::Client),
            "full" => Ok(Self::Full),
            other => Err(StackError::UnknownPreset(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Client => "client",
            Self::Full => "full",
        }
    }

    /// プリセットのKDLソース
    pub fn kdl(&self) -> String {
        let mut source = String::from(HEADER);
        source.push_str(USER_POOL_OPEN);
        match self {
            Self::Directory => {}
            Self::Client => source.push_str(CLIENT),
            Self::Full => source.push_str(CLIENT_WITH_OAUTH),
        }
        source.push_str("}\n");
        if *self == Self::Full {
            source.push_str(NETWORK_AND_LOAD_BALANCER);
        }
        source
    }

    /// プリセットをパースしてスタック定義を得る
    pub fn definition(&self) -> Result<StackDefinition> {
        parse_kdl_string(&self.kdl(), STACK_NAME.to_string())
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const STACK_NAME: &str = "CognitoMfaTestStack";

const HEADER: &str = r#"stack "CognitoMfaTestStack"
description "MFA-enabled user directory"

"#;

const USER_POOL_OPEN: &str = r#"user-pool "mfaTestUserPool" {
    name "mfa-test-userpool"
    // 4種8桁
    password-policy {
        min-length 8
        require-lowercase #true
        require-digits #true
        require-uppercase #false
        require-symbols #false
        temp-password-validity-days 7
    }
    self-sign-up #true
    standard-attribute "email" required=#true mutable=#true
    standard-attribute "fullname" required=#true mutable=#true
    auto-verify "email"
    sign-in-aliases "email" "username"
    sign-in-case-sensitive #true
    account-recovery "email-only"
    verification {
        email-subject "Your verification code"
        email-body "Your verification code is {####}"
        email-style "code"
    }
    mfa "required"
    mfa-second-factor "sms" "otp"
"#;

const CLIENT: &str = r#"
    client "mfa-test-app-client" {
        name "mfa-test-app-client"
        generate-secret #false
        auth-flows {
            admin-user-password #false
            custom #true
            user-password #false
            user-srp #true
        }
    }
"#;

const CLIENT_WITH_OAUTH: &str = r#"
    client "mfa-test-app-client" {
        name "mfa-test-app-client"
        generate-secret #false
        auth-flows {
            admin-user-password #false
            custom #true
            user-password #false
            user-srp #true
        }
        oauth {
            flows "authorization-code"
            scopes "openid"
            callback-url load-balancer="Alb" path="/auth2/idpresponse"
            logout-url load-balancer="Alb" path="/dummy"
        }
    }
"#;

const NETWORK_AND_LOAD_BALANCER: &str = r#"
network "Vpc" {
    name "mfa-test-vpc"
    cidr "10.0.0.0/16"
    max-azs 2
}

load-balancer "Alb" {
    network "Vpc"
    internet-facing #true
    listener "Listener" port=80 open=#true {
        // バックエンドなしのプレースホルダー
        target-group "TargetGroup" port=80 protocol="http"
    }
}
"#;
