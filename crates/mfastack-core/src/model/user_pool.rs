//! ユーザープール（Identity Pool）定義

use super::client::UserPoolClient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ユーザープール定義
///
/// KDL形式：
/// ```kdl
/// user-pool "mfaTestUserPool" {
///     name "mfa-test-userpool"
///     password-policy {
///         min-length 8
///     }
///     mfa "required"
///     mfa-second-factor "sms" "otp"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPool {
    /// ユーザープール名（未指定時はプロバイダー側で自動生成）
    pub pool_name: Option<String>,
    /// パスワードポリシー
    #[serde(default)]
    pub password_policy: PasswordPolicy,
    /// ユーザー自身によるサインアップを許可するか
    #[serde(default)]
    pub self_sign_up_enabled: bool,
    /// 標準属性（必須/変更可否）
    #[serde(default)]
    pub standard_attributes: BTreeMap<StandardAttribute, AttributeSpec>,
    /// サインアップ時に自動確認する属性
    #[serde(default)]
    pub auto_verify: AutoVerify,
    /// サインインに使える識別子
    #[serde(default)]
    pub sign_in_aliases: SignInAliases,
    /// サインインエイリアスの大文字小文字を区別するか
    #[serde(default = "default_true")]
    pub sign_in_case_sensitive: bool,
    /// アカウント回復方法
    #[serde(default)]
    pub account_recovery: AccountRecovery,
    /// 確認メッセージ設定
    #[serde(default)]
    pub user_verification: UserVerification,
    /// MFAの要求レベル
    #[serde(default)]
    pub mfa: Mfa,
    /// 使用可能なMFAの種類
    #[serde(default)]
    pub mfa_second_factor: MfaSecondFactor,
    /// スタック削除時の扱い
    #[serde(default)]
    pub removal_policy: RemovalPolicy,
    /// このプールに属するアプリケーションクライアント
    #[serde(default)]
    pub clients: BTreeMap<String, UserPoolClient>,
}

fn default_true() -> bool {
    true
}

impl Default for UserPool {
    fn default() -> Self {
        Self {
            pool_name: None,
            password_policy: PasswordPolicy::default(),
            self_sign_up_enabled: false,
            standard_attributes: BTreeMap::new(),
            auto_verify: AutoVerify::default(),
            sign_in_aliases: SignInAliases::default(),
            sign_in_case_sensitive: true,
            account_recovery: AccountRecovery::default(),
            user_verification: UserVerification::default(),
            mfa: Mfa::default(),
            mfa_second_factor: MfaSecondFactor::default(),
            removal_policy: RemovalPolicy::default(),
            clients: BTreeMap::new(),
        }
    }
}

impl UserPool {
    /// SMS送信（MFAまたは電話番号確認）が必要かどうか
    pub fn uses_sms(&self) -> bool {
        let sms_mfa = self.mfa != Mfa::Off && self.mfa_second_factor.sms;
        sms_mfa || self.auto_verify.phone
    }
}

/// パスワードポリシー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: u32,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_digits: bool,
    pub require_symbols: bool,
    /// 仮パスワードの有効期限（日）
    pub temp_password_validity_days: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_lowercase: true,
            require_uppercase: true,
            require_digits: true,
            require_symbols: true,
            temp_password_validity_days: 7,
        }
    }
}

/// 標準属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StandardAttribute {
    Address,
    Birthdate,
    Email,
    FamilyName,
    Gender,
    GivenName,
    Locale,
    MiddleName,
    Fullname,
    Nickname,
    PhoneNumber,
    ProfilePicture,
    PreferredUsername,
    ProfilePage,
    Timezone,
    LastUpdateTime,
    Website,
}

impl StandardAttribute {
    /// 文字列からパース（kebab-case / snake_case / camelCase を許容）
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "address" => Some(Self::Address),
            "birthdate" => Some(Self::Birthdate),
            "email" => Some(Self::Email),
            "familyname" => Some(Self::FamilyName),
            "gender" => Some(Self::Gender),
            "givenname" => Some(Self::GivenName),
            "locale" => Some(Self::Locale),
            "middlename" => Some(Self::MiddleName),
            "fullname" | "name" => Some(Self::Fullname),
            "nickname" => Some(Self::Nickname),
            "phonenumber" | "phone" => Some(Self::PhoneNumber),
            "profilepicture" | "picture" => Some(Self::ProfilePicture),
            "preferredusername" => Some(Self::PreferredUsername),
            "profilepage" | "profile" => Some(Self::ProfilePage),
            "timezone" | "zoneinfo" => Some(Self::Timezone),
            "lastupdatetime" | "updatedat" => Some(Self::LastUpdateTime),
            "website" => Some(Self::Website),
            _ => None,
        }
    }

    /// プロバイダー側の属性名
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Birthdate => "birthdate",
            Self::Email => "email",
            Self::FamilyName => "family_name",
            Self::Gender => "gender",
            Self::GivenName => "given_name",
            Self::Locale => "locale",
            Self::MiddleName => "middle_name",
            Self::Fullname => "name",
            Self::Nickname => "nickname",
            Self::PhoneNumber => "phone_number",
            Self::ProfilePicture => "picture",
            Self::PreferredUsername => "preferred_username",
            Self::ProfilePage => "profile",
            Self::Timezone => "zoneinfo",
            Self::LastUpdateTime => "updated_at",
            Self::Website => "website",
        }
    }
}

/// 属性の必須/変更可否
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub required: bool,
    pub mutable: bool,
}

impl Default for AttributeSpec {
    fn default() -> Self {
        Self {
            required: false,
            mutable: true,
        }
    }
}

/// 自動確認する属性
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoVerify {
    pub email: bool,
    pub phone: bool,
}

/// サインインエイリアス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInAliases {
    pub username: bool,
    pub email: bool,
    pub phone: bool,
    pub preferred_username: bool,
}

impl Default for SignInAliases {
    fn default() -> Self {
        Self {
            username: true,
            email: false,
            phone: false,
            preferred_username: false,
        }
    }
}

/// アカウント回復方法
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountRecovery {
    EmailOnly,
    PhoneOnlyWithoutMfa,
    #[default]
    PhoneWithoutMfaAndEmail,
    EmailAndPhoneWithoutMfa,
    PhoneAndEmail,
    None,
}

impl AccountRecovery {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "email-only" => Some(Self::EmailOnly),
            "phone-only-without-mfa" => Some(Self::PhoneOnlyWithoutMfa),
            "phone-without-mfa-and-email" => Some(Self::PhoneWithoutMfaAndEmail),
            "email-and-phone-without-mfa" => Some(Self::EmailAndPhoneWithoutMfa),
            "phone-and-email" => Some(Self::PhoneAndEmail),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// 回復手段を優先度順に返す
    ///
    /// `PhoneAndEmail` はプロバイダーの既定動作に任せるため空を返す
    pub fn mechanisms(&self) -> Vec<&'static str> {
        match self {
            Self::EmailOnly => vec!["verified_email"],
            Self::PhoneOnlyWithoutMfa => vec!["verified_phone_number"],
            Self::PhoneWithoutMfaAndEmail => vec!["verified_phone_number", "verified_email"],
            Self::EmailAndPhoneWithoutMfa => vec!["verified_email", "verified_phone_number"],
            Self::PhoneAndEmail => vec![],
            Self::None => vec!["admin_only"],
        }
    }
}

/// 確認メールのスタイル
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationEmailStyle {
    #[default]
    Code,
    Link,
}

impl VerificationEmailStyle {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "code" => Some(Self::Code),
            "link" => Some(Self::Link),
            _ => None,
        }
    }
}

/// 確認メッセージ設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVerification {
    pub email_subject: String,
    pub email_body: String,
    pub email_style: VerificationEmailStyle,
    pub sms_message: String,
}

/// 確認コードのプレースホルダー
pub const VERIFICATION_CODE_PLACEHOLDER: &str = "{####}";

impl Default for UserVerification {
    fn default() -> Self {
        Self {
            email_subject: "Verify your new account".to_string(),
            email_body: format!(
                "The verification code to your new account is {}",
                VERIFICATION_CODE_PLACEHOLDER
            ),
            email_style: VerificationEmailStyle::Code,
            sms_message: format!(
                "The verification code to your new account is {}",
                VERIFICATION_CODE_PLACEHOLDER
            ),
        }
    }
}

/// MFAの要求レベル
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mfa {
    #[default]
    Off,
    Optional,
    Required,
}

impl Mfa {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" => Some(Self::Off),
            "optional" => Some(Self::Optional),
            "required" | "on" => Some(Self::Required),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Optional => "optional",
            Self::Required => "required",
        }
    }
}

/// 使用可能なMFAの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MfaSecondFactor {
    pub sms: bool,
    pub otp: bool,
}

impl Default for MfaSecondFactor {
    fn default() -> Self {
        Self {
            sms: true,
            otp: false,
        }
    }
}

/// スタック削除時の扱い
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovalPolicy {
    /// スタックと一緒に削除
    #[default]
    Destroy,
    /// スタック削除後も残す
    Retain,
}

impl RemovalPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "destroy" | "delete" => Some(Self::Destroy),
            "retain" => Some(Self::Retain),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_omitted_fields_match_default() {
        let pool: UserPool = serde_json::from_str("{}").unwrap();
        assert!(pool.sign_in_case_sensitive);
        assert_eq!(pool, UserPool::default());

        let pool: UserPool =
            serde_json::from_str(r#"{ "sign_in_case_sensitive": false }"#).unwrap();
        assert!(!pool.sign_in_case_sensitive);
    }

    #[test]
    fn test_standard_attribute_parse_aliases() {
        assert_eq!(
            StandardAttribute::parse("fullname"),
            Some(StandardAttribute::Fullname)
        );
        assert_eq!(
            StandardAttribute::parse("family-name"),
            Some(StandardAttribute::FamilyName)
        );
        assert_eq!(
            StandardAttribute::parse("phone_number"),
            Some(StandardAttribute::PhoneNumber)
        );
        assert_eq!(
            StandardAttribute::parse("preferredUsername"),
            Some(StandardAttribute::PreferredUsername)
        );
        assert_eq!(StandardAttribute::parse("favorite-color"), None);
    }

    #[test]
    fn test_fullname_maps_to_name() {
        assert_eq!(StandardAttribute::Fullname.provider_name(), "name");
        assert_eq!(StandardAttribute::Timezone.provider_name(), "zoneinfo");
    }

    #[test]
    fn test_account_recovery_mechanisms() {
        assert_eq!(
            AccountRecovery::EmailOnly.mechanisms(),
            vec!["verified_email"]
        );
        assert_eq!(
            AccountRecovery::parse("phone_without_mfa_and_email"),
            Some(AccountRecovery::PhoneWithoutMfaAndEmail)
        );
        assert!(AccountRecovery::PhoneAndEmail.mechanisms().is_empty());
        assert_eq!(AccountRecovery::None.mechanisms(), vec!["admin_only"]);
    }

    #[test]
    fn test_uses_sms() {
        let mut pool = UserPool::default();
        // デフォルトはMFA無効
        assert!(!pool.uses_sms());

        pool.mfa = Mfa::Required;
        assert!(pool.uses_sms());

        pool.mfa_second_factor = MfaSecondFactor {
            sms: false,
            otp: true,
        };
        assert!(!pool.uses_sms());

        pool.auto_verify.phone = true;
        assert!(pool.uses_sms());
    }

    #[test]
    fn test_mfa_parse() {
        assert_eq!(Mfa::parse("REQUIRED"), Some(Mfa::Required));
        assert_eq!(Mfa::parse("optional"), Some(Mfa::Optional));
        assert_eq!(Mfa::parse("sometimes"), None);
    }
}
