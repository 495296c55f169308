//! user-pool ノードのパース

use super::client::apply_client;
use super::value::{
    bool_prop, first_integer, first_string, flag, normalized_name, parse_enum, required_name,
    string_args,
};
use crate::error::{Result, StackError};
use crate::model::{
    AccountRecovery, AttributeSpec, AutoVerify, Mfa, MfaSecondFactor, PasswordPolicy,
    RemovalPolicy, SignInAliases, StandardAttribute, UserPool, UserVerification,
    VerificationEmailStyle,
};
use kdl::{KdlDocument, KdlNode};

/// user-pool ノードを既存の定義に適用
pub fn apply_user_pool(node: &KdlNode, pool: &mut UserPool) -> Result<()> {
    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        match normalized_name(child).as_str() {
            "name" | "pool-name" => {
                pool.pool_name = first_string(child);
            }
            "password-policy" => {
                if let Some(doc) = child.children() {
                    apply_password_policy(doc, &mut pool.password_policy)?;
                }
            }
            "self-sign-up" | "self-sign-up-enabled" => {
                pool.self_sign_up_enabled = flag(child)?;
            }
            "standard-attribute" => {
                let name = required_name(child, "standard-attribute")?;
                apply_standard_attribute(child, &name, pool)?;
            }
            "standard-attributes" => {
                // standard-attributes { email required=#true mutable=#true }
                if let Some(attrs) = child.children() {
                    for attr in attrs.nodes() {
                        let name = attr.name().value().to_string();
                        apply_standard_attribute(attr, &name, pool)?;
                    }
                }
            }
            "auto-verify" => {
                pool.auto_verify = parse_auto_verify(child)?;
            }
            "sign-in-aliases" | "sign-in-alias" => {
                pool.sign_in_aliases = parse_sign_in_aliases(child)?;
            }
            "sign-in-case-sensitive" => {
                pool.sign_in_case_sensitive = flag(child)?;
            }
            "account-recovery" => {
                pool.account_recovery = parse_enum(child, AccountRecovery::parse)?;
            }
            "verification" | "user-verification" => {
                if let Some(doc) = child.children() {
                    apply_verification(doc, &mut pool.user_verification)?;
                }
            }
            "mfa" => {
                pool.mfa = parse_enum(child, Mfa::parse)?;
            }
            "mfa-second-factor" => {
                pool.mfa_second_factor = parse_second_factor(child)?;
            }
            "removal-policy" => {
                pool.removal_policy = parse_enum(child, RemovalPolicy::parse)?;
            }
            "client" | "app-client" => {
                let id = required_name(child, "client")?;
                let client = pool.clients.entry(id).or_default();
                apply_client(child, client)?;
            }
            _ => {}
        }
    }

    Ok(())
}

fn apply_password_policy(doc: &KdlDocument, policy: &mut PasswordPolicy) -> Result<()> {
    for node in doc.nodes() {
        match normalized_name(node).as_str() {
            "min-length" | "minimum-length" => policy.min_length = first_integer(node)?,
            "require-lowercase" => policy.require_lowercase = flag(node)?,
            "require-uppercase" => policy.require_uppercase = flag(node)?,
            "require-digits" | "require-numbers" => policy.require_digits = flag(node)?,
            "require-symbols" => policy.require_symbols = flag(node)?,
            "temp-password-validity-days" | "temp-password-validity" => {
                policy.temp_password_validity_days = first_integer(node)?
            }
            _ => {}
        }
    }
    Ok(())
}

fn apply_standard_attribute(node: &KdlNode, name: &str, pool: &mut UserPool) -> Result<()> {
    let attribute = StandardAttribute::parse(name).ok_or_else(|| {
        StackError::InvalidConfig(format!("不明な標準属性: '{}'", name))
    })?;
    let spec = pool
        .standard_attributes
        .entry(attribute)
        .or_insert_with(AttributeSpec::default);
    if let Some(required) = bool_prop(node, "required")? {
        spec.required = required;
    }
    if let Some(mutable) = bool_prop(node, "mutable")? {
        spec.mutable = mutable;
    }
    Ok(())
}

fn parse_auto_verify(node: &KdlNode) -> Result<AutoVerify> {
    let mut verify = AutoVerify::default();
    for name in string_args(node) {
        match name.as_str() {
            "email" => verify.email = true,
            "phone" | "phone-number" => verify.phone = true,
            other => {
                return Err(StackError::InvalidConfig(format!(
                    "auto-verify: 不明な属性 '{}'",
                    other
                )));
            }
        }
    }
    Ok(verify)
}

fn parse_sign_in_aliases(node: &KdlNode) -> Result<SignInAliases> {
    let mut aliases = SignInAliases {
        username: false,
        email: false,
        phone: false,
        preferred_username: false,
    };
    for name in string_args(node) {
        match name.replace('_', "-").as_str() {
            "username" => aliases.username = true,
            "email" => aliases.email = true,
            "phone" => aliases.phone = true,
            "preferred-username" => aliases.preferred_username = true,
            other => {
                return Err(StackError::InvalidConfig(format!(
                    "sign-in-aliases: 不明なエイリアス '{}'",
                    other
                )));
            }
        }
    }
    Ok(aliases)
}

fn parse_second_factor(node: &KdlNode) -> Result<MfaSecondFactor> {
    let mut factor = MfaSecondFactor {
        sms: false,
        otp: false,
    };
    for name in string_args(node) {
        match name.as_str() {
            "sms" => factor.sms = true,
            "otp" | "totp" => factor.otp = true,
            other => {
                return Err(StackError::InvalidConfig(format!(
                    "mfa-second-factor: 不明な種類 '{}'",
                    other
                )));
            }
        }
    }
    Ok(factor)
}

fn apply_verification(doc: &KdlDocument, verification: &mut UserVerification) -> Result<()> {
    for node in doc.nodes() {
        match normalized_name(node).as_str() {
            "email-subject" => {
                if let Some(subject) = first_string(node) {
                    verification.email_subject = subject;
                }
            }
            "email-body" => {
                if let Some(body) = first_string(node) {
                    verification.email_body = body;
                }
            }
            "email-style" => {
                verification.email_style = parse_enum(node, VerificationEmailStyle::parse)?;
            }
            "sms-message" => {
                if let Some(message) = first_string(node) {
                    verification.sms_message = message;
                }
            }
            _ => {}
        }
    }
    Ok(())
}
