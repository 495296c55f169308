//! client ノードのパース

use super::value::{first_string, flag, normalized_name, string_args, string_prop};
use crate::error::{Result, StackError};
use crate::model::{AuthFlows, OAuthFlows, OAuthScope, OAuthSettings, UrlSpec, UserPoolClient};
use kdl::{KdlDocument, KdlNode};

/// client ノードを既存の定義に適用
pub fn apply_client(node: &KdlNode, client: &mut UserPoolClient) -> Result<()> {
    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        match normalized_name(child).as_str() {
            "name" | "client-name" => {
                client.client_name = first_string(child);
            }
            "generate-secret" => {
                client.generate_secret = flag(child)?;
            }
            "auth-flows" => {
                if let Some(doc) = child.children() {
                    apply_auth_flows(doc, &mut client.auth_flows)?;
                }
            }
            "oauth" => {
                let oauth = client.oauth.get_or_insert_with(OAuthSettings::default);
                if let Some(doc) = child.children() {
                    apply_oauth(doc, oauth)?;
                }
            }
            "disable-oauth" => {
                if flag(child)? {
                    client.oauth = None;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn apply_auth_flows(doc: &KdlDocument, flows: &mut AuthFlows) -> Result<()> {
    for node in doc.nodes() {
        match normalized_name(node).as_str() {
            "admin-user-password" => flows.admin_user_password = flag(node)?,
            "custom" => flows.custom = flag(node)?,
            "user-password" => flows.user_password = flag(node)?,
            "user-srp" => flows.user_srp = flag(node)?,
            other => {
                return Err(StackError::InvalidConfig(format!(
                    "auth-flows: 不明なフロー '{}'",
                    other
                )));
            }
        }
    }
    Ok(())
}

fn apply_oauth(doc: &KdlDocument, oauth: &mut OAuthSettings) -> Result<()> {
    let mut callback_urls = Vec::new();
    let mut logout_urls = Vec::new();

    for node in doc.nodes() {
        match normalized_name(node).as_str() {
            "flows" | "flow" => {
                let mut flows = OAuthFlows::default();
                for name in string_args(node) {
                    if !flows.enable(&name) {
                        return Err(StackError::InvalidConfig(format!(
                            "oauth: 不明なフロー '{}'",
                            name
                        )));
                    }
                }
                oauth.flows = flows;
            }
            "scopes" | "scope" => {
                oauth.scopes = string_args(node)
                    .iter()
                    .map(|s| OAuthScope::parse(s))
                    .collect();
            }
            "callback-url" | "callback-urls" => {
                callback_urls.extend(parse_urls(node)?);
            }
            "logout-url" | "logout-urls" => {
                logout_urls.extend(parse_urls(node)?);
            }
            _ => {}
        }
    }

    // このブロックで指定されたURLだけを置き換える
    if !callback_urls.is_empty() {
        oauth.callback_urls = callback_urls;
    }
    if !logout_urls.is_empty() {
        oauth.logout_urls = logout_urls;
    }

    Ok(())
}

/// URLノードをパース
///
/// - `callback-url "https://example.com/callback"`
/// - `callback-url load-balancer="alb" path="/auth2/idpresponse"`
fn parse_urls(node: &KdlNode) -> Result<Vec<UrlSpec>> {
    if let Some(load_balancer) = string_prop(node, "load-balancer") {
        let scheme = string_prop(node, "scheme").unwrap_or_else(|| "https".to_string());
        let path = string_prop(node, "path").unwrap_or_default();
        if !path.is_empty() && !path.starts_with('/') {
            return Err(StackError::InvalidConfig(format!(
                "{}: path は '/' で始めてください: '{}'",
                node.name().value(),
                path
            )));
        }
        return Ok(vec![UrlSpec::LoadBalancer {
            load_balancer,
            scheme,
            path,
        }]);
    }

    let urls: Vec<UrlSpec> = string_args(node).into_iter().map(UrlSpec::Literal).collect();
    if urls.is_empty() {
        return Err(StackError::InvalidConfig(format!(
            "{}: URL または load-balancer を指定してください",
            node.name().value()
        )));
    }
    Ok(urls)
}
