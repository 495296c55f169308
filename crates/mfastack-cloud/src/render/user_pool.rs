//! User pool and app client rendering

use super::{Renderer, logical_id, pascal_case};
use crate::error::{CloudError, Result};
use crate::template::{Output, Resource};
use crate::token::Token;
use mfastack_core::{
    Mfa, OAuthFlows, OAuthScope, RemovalPolicy, UserPool, UserPoolClient,
    VERIFICATION_CODE_PLACEHOLDER, VerificationEmailStyle,
};
use serde_json::{Map, Value, json};
use tracing::debug;

pub(crate) fn render_user_pool(
    renderer: &mut Renderer<'_>,
    id: &str,
    pool: &UserPool,
) -> Result<()> {
    validate_verification(id, pool)?;

    let pool_id = logical_id(&[id])?;
    let mut resource = Resource::new("AWS::Cognito::UserPool")
        .optional_property("UserPoolName", pool.pool_name.clone())
        .property("Policies", password_policy(pool))
        .property(
            "AdminCreateUserConfig",
            json!({ "AllowAdminCreateUserOnly": !pool.self_sign_up_enabled }),
        )
        .property(
            "UsernameConfiguration",
            json!({ "CaseSensitive": pool.sign_in_case_sensitive }),
        )
        .property("MfaConfiguration", mfa_configuration(pool.mfa))
        .property("SmsVerificationMessage", pool.user_verification.sms_message.clone())
        .property("VerificationMessageTemplate", verification_template(pool))
        .removal_policy(removal_policy(pool.removal_policy));

    if !pool.standard_attributes.is_empty() {
        let schema: Vec<Value> = pool
            .standard_attributes
            .iter()
            .map(|(attribute, spec)| {
                json!({
                    "Mutable": spec.mutable,
                    "Name": attribute.provider_name(),
                    "Required": spec.required,
                })
            })
            .collect();
        resource = resource.property("Schema", schema);
    }

    let mut auto_verified = Vec::new();
    if pool.auto_verify.email {
        auto_verified.push("email");
    }
    if pool.auto_verify.phone {
        auto_verified.push("phone_number");
    }
    if !auto_verified.is_empty() {
        resource = resource.property("AutoVerifiedAttributes", auto_verified);
    }

    resource = apply_sign_in_aliases(id, pool, resource)?;

    let mechanisms = pool.account_recovery.mechanisms();
    if !mechanisms.is_empty() {
        let mechanisms: Vec<Value> = mechanisms
            .iter()
            .enumerate()
            .map(|(i, name)| json!({ "Name": name, "Priority": i + 1 }))
            .collect();
        resource = resource.property(
            "AccountRecoverySetting",
            json!({ "RecoveryMechanisms": mechanisms }),
        );
    }

    if pool.user_verification.email_style == VerificationEmailStyle::Code {
        resource = resource
            .property("EmailVerificationMessage", pool.user_verification.email_body.clone())
            .property("EmailVerificationSubject", pool.user_verification.email_subject.clone());
    }

    if pool.mfa != Mfa::Off {
        let mut enabled = Vec::new();
        if pool.mfa_second_factor.sms {
            enabled.push("SMS_MFA");
        }
        if pool.mfa_second_factor.otp {
            enabled.push("SOFTWARE_TOKEN_MFA");
        }
        if enabled.is_empty() {
            return Err(CloudError::InvalidConfig(format!(
                "user pool '{}': mfa is {} but no second factor is enabled",
                id,
                pool.mfa.as_str()
            )));
        }
        resource = resource.property("EnabledMfas", enabled);
    }

    if pool.uses_sms() {
        let role_id = format!("{}SmsRole", pool_id);
        let external_id = format!("{}{}", pascal_case(&[&renderer.stack.name]), pool_id);
        renderer
            .template
            .add_resource(role_id.clone(), sms_role(&external_id))?;
        resource = resource.property(
            "SmsConfiguration",
            json!({
                "ExternalId": external_id,
                "SnsCallerArn": Token::get_att(role_id, "Arn"),
            }),
        );
    }

    renderer.template.add_resource(pool_id.clone(), resource)?;
    renderer.template.add_output(
        format!("{}Id", pool_id),
        Output::new(
            format!("Id of user pool {}", id),
            Token::reference(pool_id.clone()),
        ),
    )?;

    for (client_key, client) in &pool.clients {
        render_client(renderer, id, &pool_id, client_key, client)?;
    }

    debug!(
        user_pool = %id,
        clients = pool.clients.len(),
        sms = pool.uses_sms(),
        "Rendered user pool"
    );

    Ok(())
}

fn password_policy(pool: &UserPool) -> Value {
    let policy = &pool.password_policy;
    json!({
        "PasswordPolicy": {
            "MinimumLength": policy.min_length,
            "RequireLowercase": policy.require_lowercase,
            "RequireNumbers": policy.require_digits,
            "RequireSymbols": policy.require_symbols,
            "RequireUppercase": policy.require_uppercase,
            "TemporaryPasswordValidityDays": policy.temp_password_validity_days,
        }
    })
}

fn mfa_configuration(mfa: Mfa) -> &'static str {
    match mfa {
        Mfa::Off => "OFF",
        Mfa::Optional => "OPTIONAL",
        Mfa::Required => "ON",
    }
}

fn removal_policy(policy: RemovalPolicy) -> &'static str {
    match policy {
        RemovalPolicy::Destroy => "Delete",
        RemovalPolicy::Retain => "Retain",
    }
}

fn verification_template(pool: &UserPool) -> Value {
    let verification = &pool.user_verification;
    let mut template = Map::new();
    match verification.email_style {
        VerificationEmailStyle::Code => {
            template.insert("DefaultEmailOption".into(), "CONFIRM_WITH_CODE".into());
            template.insert("EmailMessage".into(), verification.email_body.clone().into());
            template.insert("EmailSubject".into(), verification.email_subject.clone().into());
        }
        VerificationEmailStyle::Link => {
            template.insert("DefaultEmailOption".into(), "CONFIRM_WITH_LINK".into());
            template.insert(
                "EmailMessageByLink".into(),
                verification.email_body.clone().into(),
            );
            template.insert(
                "EmailSubjectByLink".into(),
                verification.email_subject.clone().into(),
            );
        }
    }
    template.insert("SmsMessage".into(), verification.sms_message.clone().into());
    Value::Object(template)
}

/// Verification messages must carry the provider's placeholders
fn validate_verification(id: &str, pool: &UserPool) -> Result<()> {
    let verification = &pool.user_verification;
    let email_ok = match verification.email_style {
        VerificationEmailStyle::Code => {
            verification.email_body.contains(VERIFICATION_CODE_PLACEHOLDER)
        }
        VerificationEmailStyle::Link => has_link_placeholder(&verification.email_body),
    };
    if !email_ok {
        return Err(CloudError::InvalidConfig(format!(
            "user pool '{}': verification email body must contain {}",
            id,
            match verification.email_style {
                VerificationEmailStyle::Code => VERIFICATION_CODE_PLACEHOLDER,
                VerificationEmailStyle::Link => "{##...##}",
            }
        )));
    }
    if !verification.sms_message.contains(VERIFICATION_CODE_PLACEHOLDER) {
        return Err(CloudError::InvalidConfig(format!(
            "user pool '{}': verification SMS must contain {}",
            id, VERIFICATION_CODE_PLACEHOLDER
        )));
    }
    Ok(())
}

/// `{##Verify Email##}`
fn has_link_placeholder(body: &str) -> bool {
    body.find("{##")
        .and_then(|start| body[start + 3..].find("##}"))
        .is_some_and(|len| len > 0)
}

/// Username with aliases, or email/phone used as the username itself
fn apply_sign_in_aliases(id: &str, pool: &UserPool, resource: Resource) -> Result<Resource> {
    let aliases = &pool.sign_in_aliases;
    let mut attributes = Vec::new();
    if aliases.email {
        attributes.push("email");
    }
    if aliases.phone {
        attributes.push("phone_number");
    }

    if aliases.username {
        if aliases.preferred_username {
            attributes.push("preferred_username");
        }
        if attributes.is_empty() {
            return Ok(resource);
        }
        return Ok(resource.property("AliasAttributes", attributes));
    }

    if aliases.preferred_username {
        return Err(CloudError::InvalidConfig(format!(
            "user pool '{}': preferred-username sign-in requires username sign-in",
            id
        )));
    }
    if attributes.is_empty() {
        return Err(CloudError::InvalidConfig(format!(
            "user pool '{}': at least one sign-in alias is required",
            id
        )));
    }
    Ok(resource.property("UsernameAttributes", attributes))
}

fn sms_role(external_id: &str) -> Resource {
    Resource::new("AWS::IAM::Role")
        .property(
            "AssumeRolePolicyDocument",
            json!({
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Condition": { "StringEquals": { "sts:ExternalId": external_id } },
                    "Effect": "Allow",
                    "Principal": { "Service": "cognito-idp.amazonaws.com" },
                }],
                "Version": "2012-10-17",
            }),
        )
        .property(
            "Policies",
            json!([{
                "PolicyDocument": {
                    "Statement": [{
                        "Action": "sns:Publish",
                        "Effect": "Allow",
                        "Resource": "*",
                    }],
                    "Version": "2012-10-17",
                },
                "PolicyName": "sns-publish",
            }]),
        )
}

fn render_client(
    renderer: &mut Renderer<'_>,
    pool_key: &str,
    pool_id: &str,
    client_key: &str,
    client: &UserPoolClient,
) -> Result<()> {
    let client_id = logical_id(&[pool_key, client_key])?;
    let mut resource = Resource::new("AWS::Cognito::UserPoolClient")
        .property("UserPoolId", Token::reference(pool_id))
        .optional_property("ClientName", client.client_name.clone())
        .property("GenerateSecret", client.generate_secret);

    // 有効にしたフローだけを列挙する
    let flows = &client.auth_flows;
    let mut explicit = Vec::new();
    if flows.admin_user_password {
        explicit.push("ALLOW_ADMIN_USER_PASSWORD_AUTH");
    }
    if flows.custom {
        explicit.push("ALLOW_CUSTOM_AUTH");
    }
    if flows.user_password {
        explicit.push("ALLOW_USER_PASSWORD_AUTH");
    }
    if flows.user_srp {
        explicit.push("ALLOW_USER_SRP_AUTH");
    }
    if !explicit.is_empty() {
        resource = resource.property("ExplicitAuthFlows", explicit);
    }

    if let Some(oauth) = &client.oauth {
        let referenced_by = format!("client '{}'", client_key);
        let flows = effective_oauth_flows(&oauth.flows);
        if flows.client_credentials && (flows.authorization_code || flows.implicit) {
            return Err(CloudError::InvalidConfig(format!(
                "{}: client-credentials cannot be combined with authorization-code or implicit",
                referenced_by
            )));
        }
        if (flows.authorization_code || flows.implicit) && oauth.callback_urls.is_empty() {
            return Err(CloudError::InvalidConfig(format!(
                "{}: callback-url is required for authorization-code and implicit flows",
                referenced_by
            )));
        }

        let mut flow_names = Vec::new();
        if flows.authorization_code {
            flow_names.push("code");
        }
        if flows.implicit {
            flow_names.push("implicit");
        }
        if flows.client_credentials {
            flow_names.push("client_credentials");
        }

        let scopes: Vec<String> = if oauth.scopes.is_empty() {
            default_scopes().iter().map(|s| s.as_str().to_string()).collect()
        } else {
            oauth.scopes.iter().map(|s| s.as_str().to_string()).collect()
        };

        let callback_tokens = oauth
            .callback_urls
            .iter()
            .map(|url| renderer.url_token(url, &referenced_by))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            client = %client_id,
            deferred = callback_tokens.iter().filter(|t| t.is_deferred()).count(),
            "Resolved callback URLs"
        );
        let callback_urls: Vec<Value> = callback_tokens.into_iter().map(Value::from).collect();
        let logout_urls = oauth
            .logout_urls
            .iter()
            .map(|url| renderer.url_token(url, &referenced_by).map(Value::from))
            .collect::<Result<Vec<_>>>()?;

        resource = resource
            .property("AllowedOAuthFlows", flow_names)
            .property("AllowedOAuthFlowsUserPoolClient", true)
            .property("AllowedOAuthScopes", scopes)
            .property("SupportedIdentityProviders", vec!["COGNITO"]);
        if !callback_urls.is_empty() {
            resource = resource.property("CallbackURLs", callback_urls);
        }
        if !logout_urls.is_empty() {
            resource = resource.property("LogoutURLs", logout_urls);
        }
    }

    renderer.template.add_resource(client_id.clone(), resource)?;
    renderer.template.add_output(
        format!("{}Id", client_id),
        Output::new(
            format!("Id of app client {}", client_key),
            Token::reference(client_id),
        ),
    )?;

    Ok(())
}

/// No flow selected means authorization code and implicit grants
fn effective_oauth_flows(flows: &OAuthFlows) -> OAuthFlows {
    if flows.authorization_code || flows.implicit || flows.client_credentials {
        *flows
    } else {
        OAuthFlows {
            authorization_code: true,
            implicit: true,
            client_credentials: false,
        }
    }
}

/// Scopes granted when none are listed
fn default_scopes() -> [OAuthScope; 5] {
    [
        OAuthScope::Phone,
        OAuthScope::Email,
        OAuthScope::Openid,
        OAuthScope::Profile,
        OAuthScope::CognitoAdmin,
    ]
}
