use super::*;
use crate::error::StackError;
use crate::model::{
    AccountRecovery, Mfa, OAuthScope, RemovalPolicy, StandardAttribute, SubnetKind, UrlSpec,
    VerificationEmailStyle,
};

#[test]
fn test_parse_stack_name() {
    let kdl = r#"
        stack "my-stack"
        description "test stack"
    "#;

    let stack = parse_kdl_string(kdl, "default".to_string()).unwrap();
    assert_eq!(stack.name, "my-stack");
    assert_eq!(stack.description.as_deref(), Some("test stack"));
    assert!(stack.is_empty());
}

#[test]
fn test_default_name_without_stack_node() {
    let stack = parse_kdl_string("", "from-dir".to_string()).unwrap();
    assert_eq!(stack.name, "from-dir");
}

#[test]
fn test_parse_user_pool() {
    let kdl = r#"
        user-pool "pool" {
            name "my-pool"
            password-policy {
                min-length 12
                require-symbols #false
                temp-password-validity-days 3
            }
            self-sign-up
            standard-attribute "email" required=#true mutable=#false
            auto-verify "email" "phone"
            sign-in-aliases "email"
            sign-in-case-sensitive #false
            account-recovery "email-only"
            mfa "optional"
            mfa-second-factor "otp"
            removal-policy "retain"
        }
    "#;

    let stack = parse_kdl_string(kdl, "test".to_string()).unwrap();
    let pool = &stack.user_pools["pool"];

    assert_eq!(pool.pool_name.as_deref(), Some("my-pool"));
    assert_eq!(pool.password_policy.min_length, 12);
    assert!(!pool.password_policy.require_symbols);
    // 未指定のフィールドはデフォルトのまま
    assert!(pool.password_policy.require_uppercase);
    assert_eq!(pool.password_policy.temp_password_validity_days, 3);
    assert!(pool.self_sign_up_enabled);

    let email = &pool.standard_attributes[&StandardAttribute::Email];
    assert!(email.required);
    assert!(!email.mutable);

    assert!(pool.auto_verify.email);
    assert!(pool.auto_verify.phone);
    assert!(pool.sign_in_aliases.email);
    assert!(!pool.sign_in_aliases.username);
    assert!(!pool.sign_in_case_sensitive);
    assert_eq!(pool.account_recovery, AccountRecovery::EmailOnly);
    assert_eq!(pool.mfa, Mfa::Optional);
    assert!(pool.mfa_second_factor.otp);
    assert!(!pool.mfa_second_factor.sms);
    assert_eq!(pool.removal_policy, RemovalPolicy::Retain);
}

#[test]
fn test_parse_standard_attributes_block() {
    let kdl = r#"
        user-pool "pool" {
            standard-attributes {
                email required=#true mutable=#true
                fullname required=#true
                phone_number
            }
        }
    "#;

    let stack = parse_kdl_string(kdl, "test".to_string()).unwrap();
    let attrs = &stack.user_pools["pool"].standard_attributes;

    assert_eq!(attrs.len(), 3);
    assert!(attrs[&StandardAttribute::Fullname].required);
    // mutable は既定で true
    assert!(attrs[&StandardAttribute::Fullname].mutable);
    assert!(!attrs[&StandardAttribute::PhoneNumber].required);
}

#[test]
fn test_parse_verification_block() {
    let kdl = r#"
        user_pool "pool" {
            verification {
                email-subject "Hello"
                email-body "Click {##Verify##}"
                email-style "link"
                sms-message "Code {####}"
            }
        }
    "#;

    let stack = parse_kdl_string(kdl, "test".to_string()).unwrap();
    let verification = &stack.user_pools["pool"].user_verification;

    assert_eq!(verification.email_subject, "Hello");
    assert_eq!(verification.email_body, "Click {##Verify##}");
    assert_eq!(verification.email_style, VerificationEmailStyle::Link);
    assert_eq!(verification.sms_message, "Code {####}");
}

#[test]
fn test_parse_client_with_literal_urls() {
    let kdl = r#"
        user-pool "pool" {
            client "web" {
                generate-secret #true
                auth-flows {
                    user-password #true
                }
                oauth {
                    flows "authorization-code" "implicit"
                    scopes "openid" "email" "api/read"
                    callback-url "https://example.com/callback" "https://example.com/alt"
                    logout-url "https://example.com/bye"
                }
            }
        }
    "#;

    let stack = parse_kdl_string(kdl, "test".to_string()).unwrap();
    let client = &stack.user_pools["pool"].clients["web"];

    assert!(client.generate_secret);
    assert!(client.auth_flows.user_password);
    assert_eq!(client.auth_flows.enabled_count(), 1);

    let oauth = client.oauth.as_ref().unwrap();
    assert!(oauth.flows.authorization_code);
    assert!(oauth.flows.implicit);
    assert_eq!(
        oauth.scopes,
        vec![
            OAuthScope::Openid,
            OAuthScope::Email,
            OAuthScope::Custom("api/read".to_string())
        ]
    );
    assert_eq!(oauth.callback_urls.len(), 2);
    assert_eq!(
        oauth.logout_urls,
        vec![UrlSpec::Literal("https://example.com/bye".to_string())]
    );
}

#[test]
fn test_parse_client_with_load_balancer_url() {
    let kdl = r#"
        user-pool "pool" {
            client "web" {
                oauth {
                    callback-url load-balancer="alb" scheme="http" path="/cb"
                }
            }
        }
    "#;

    let stack = parse_kdl_string(kdl, "test".to_string()).unwrap();
    let oauth = stack.user_pools["pool"].clients["web"].oauth.clone().unwrap();

    assert_eq!(
        oauth.callback_urls,
        vec![UrlSpec::LoadBalancer {
            load_balancer: "alb".to_string(),
            scheme: "http".to_string(),
            path: "/cb".to_string(),
        }]
    );
}

#[test]
fn test_parse_url_path_must_be_absolute() {
    let kdl = r#"
        user-pool "pool" {
            client "web" {
                oauth {
                    callback-url load-balancer="alb" path="cb"
                }
            }
        }
    "#;

    let result = parse_kdl_string(kdl, "test".to_string());
    assert!(matches!(result, Err(StackError::InvalidConfig(_))));
}

#[test]
fn test_parse_network() {
    let kdl = r#"
        network "vpc" {
            cidr "172.16.0.0/20"
            max-azs 2
            nat-gateways 1
            subnet "Ingress" type="public" cidr-mask=24
            subnet "Data" type="isolated"
        }
    "#;

    let stack = parse_kdl_string(kdl, "test".to_string()).unwrap();
    let network = &stack.networks["vpc"];

    assert_eq!(network.cidr.to_string(), "172.16.0.0/20");
    assert_eq!(network.max_azs, 2);
    assert_eq!(network.nat_gateways, Some(1));
    assert_eq!(network.subnets.len(), 2);
    assert_eq!(network.subnets[0].cidr_mask, Some(24));
    assert_eq!(network.subnets[1].kind, SubnetKind::Isolated);
}

#[test]
fn test_parse_malformed_cidr() {
    let kdl = r#"
        network "vpc" {
            cidr "10.0.0.0/99"
        }
    "#;

    let result = parse_kdl_string(kdl, "test".to_string());
    assert!(matches!(result, Err(StackError::InvalidConfig(_))));
}

#[test]
fn test_override_updates_only_given_fields() {
    let kdl = r#"
        user-pool "pool" {
            name "base"
            password-policy {
                min-length 8
                require-digits #true
            }
            mfa "required"
        }

        // 後から現れた同名ノードは既存の定義を上書きする
        user-pool "pool" {
            password-policy {
                min-length 16
            }
        }
    "#;

    let stack = parse_kdl_string(kdl, "test".to_string()).unwrap();
    let pool = &stack.user_pools["pool"];

    assert_eq!(pool.password_policy.min_length, 16);
    assert!(pool.password_policy.require_digits);
    assert_eq!(pool.pool_name.as_deref(), Some("base"));
    assert_eq!(pool.mfa, Mfa::Required);
}

#[test]
fn test_override_client_keeps_oauth_urls() {
    let kdl = r#"
        user-pool "pool" {
            client "web" {
                oauth {
                    scopes "openid"
                    callback-url load-balancer="alb" path="/cb"
                }
            }
        }
        user-pool "pool" {
            client "web" {
                oauth {
                    scopes "openid" "profile"
                }
            }
        }
    "#;

    let stack = parse_kdl_string(kdl, "test".to_string()).unwrap();
    let oauth = stack.user_pools["pool"].clients["web"].oauth.clone().unwrap();

    assert_eq!(oauth.scopes.len(), 2);
    assert_eq!(oauth.callback_urls.len(), 1);
}

#[test]
fn test_string_bool_is_accepted() {
    let kdl = r#"
        user-pool "pool" {
            self-sign-up "true"
        }
    "#;

    let stack = parse_kdl_string(kdl, "test".to_string()).unwrap();
    assert!(stack.user_pools["pool"].self_sign_up_enabled);
}

#[test]
fn test_invalid_bool_is_error() {
    let kdl = r#"
        user-pool "pool" {
            self-sign-up "yes"
        }
    "#;

    let result = parse_kdl_string(kdl, "test".to_string());
    assert!(matches!(result, Err(StackError::InvalidConfig(_))));
}

#[test]
fn test_unknown_enum_values_are_errors() {
    for kdl in [
        r#"user-pool "p" { mfa "always" }"#,
        r#"user-pool "p" { account-recovery "carrier-pigeon" }"#,
        r#"user-pool "p" { standard-attribute "shoe-size" }"#,
        r#"user-pool "p" { mfa-second-factor "email" }"#,
        r#"user-pool "p" { client "c" { auth-flows { magic #true } } }"#,
    ] {
        let result = parse_kdl_string(kdl, "test".to_string());
        assert!(
            matches!(result, Err(StackError::InvalidConfig(_))),
            "expected error for {}",
            kdl
        );
    }
}

#[test]
fn test_user_pool_requires_name() {
    let result = parse_kdl_string("user-pool {}", "test".to_string());
    assert!(matches!(result, Err(StackError::InvalidConfig(_))));
}

#[test]
fn test_unknown_nodes_are_skipped() {
    let kdl = r#"
        variables {
            region "ap-northeast-1"
        }
        dashboard "ops" {}
        user-pool "pool" {}
    "#;

    let stack = parse_kdl_string(kdl, "test".to_string()).unwrap();
    assert_eq!(stack.user_pools.len(), 1);
}

#[test]
fn test_invalid_kdl_syntax() {
    let result = parse_kdl_string("user-pool \"pool\" {", "test".to_string());
    assert!(matches!(result, Err(StackError::KdlParse(_))));
}
