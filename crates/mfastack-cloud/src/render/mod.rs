//! Stack definition → CloudFormation template
//!
//! Rendering order follows the data flow between resources:
//! networks first, then load balancers (which need subnets), then user pools
//! and their clients (whose OAuth URLs may point at a load balancer).
//! The finished template is checked for dangling references and cycles.

mod load_balancer;
mod network;
mod user_pool;

pub use network::{AllocatedSubnet, allocate_subnets};

use crate::error::{CloudError, Result};
use crate::graph::ResourceGraph;
use crate::template::Template;
use crate::token::Token;
use mfastack_core::{StackDefinition, UrlSpec};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Logical ids of the resources rendered for one network
#[derive(Debug, Clone, Default)]
pub(crate) struct NetworkRefs {
    pub vpc: String,
    pub public_subnets: Vec<String>,
    pub private_subnets: Vec<String>,
    pub isolated_subnets: Vec<String>,
    /// Default routes of public subnets (internet reachability)
    pub public_routes: Vec<String>,
}

/// Rendering context shared by the per-resource renderers
pub(crate) struct Renderer<'a> {
    pub stack: &'a StackDefinition,
    pub template: Template,
    pub networks: BTreeMap<String, NetworkRefs>,
    pub load_balancers: BTreeMap<String, String>,
}

impl<'a> Renderer<'a> {
    fn new(stack: &'a StackDefinition) -> Self {
        Self {
            stack,
            template: Template::new(stack.description.clone()),
            networks: BTreeMap::new(),
            load_balancers: BTreeMap::new(),
        }
    }

    /// Resolve a URL into a literal or a deferred token
    pub fn url_token(&self, url: &UrlSpec, referenced_by: &str) -> Result<Token> {
        match url {
            UrlSpec::Literal(value) => Ok(Token::literal(value.clone())),
            UrlSpec::LoadBalancer {
                load_balancer,
                scheme,
                path,
            } => {
                let logical_id = self.load_balancers.get(load_balancer).ok_or_else(|| {
                    CloudError::UnknownLoadBalancer {
                        load_balancer: load_balancer.clone(),
                        referenced_by: referenced_by.to_string(),
                    }
                })?;
                let mut parts = vec![
                    Token::literal(format!("{}://", scheme)),
                    Token::get_att(logical_id.clone(), "DNSName"),
                ];
                if !path.is_empty() {
                    parts.push(Token::literal(path.clone()));
                }
                Ok(Token::concat(parts))
            }
        }
    }
}

/// Render a stack definition
#[tracing::instrument(skip(stack), fields(stack = %stack.name))]
pub fn render(stack: &StackDefinition) -> Result<Template> {
    let mut renderer = Renderer::new(stack);

    for (id, definition) in &stack.networks {
        let refs = network::render_network(&mut renderer, id, definition)?;
        renderer.networks.insert(id.clone(), refs);
    }

    for (id, definition) in &stack.load_balancers {
        let logical_id = load_balancer::render_load_balancer(&mut renderer, id, definition)?;
        renderer.load_balancers.insert(id.clone(), logical_id);
    }

    for (id, definition) in &stack.user_pools {
        user_pool::render_user_pool(&mut renderer, id, definition)?;
    }

    let template = renderer.template;
    let graph = ResourceGraph::from_template(&template)?;
    let order = graph.creation_order()?;
    debug!(order = ?order, "Resolved creation order");
    info!(
        resources = template.resources.len(),
        outputs = template.outputs.len(),
        "Rendered template"
    );

    Ok(template)
}

/// Logical id from a construct path
///
/// Each segment is split on non-alphanumeric characters and the pieces are
/// joined in PascalCase: `["mfaTestUserPool", "mfa-test-app-client"]` →
/// `MfaTestUserPoolMfaTestAppClient`. Every segment must contribute at least
/// one ASCII alphanumeric character.
pub fn logical_id(path: &[&str]) -> Result<String> {
    if let Some(segment) = path.iter().find(|s| pascal_case(&[**s]).is_empty()) {
        return Err(CloudError::InvalidConfig(format!(
            "'{}' yields an empty logical id; ids need at least one ASCII letter or digit",
            segment
        )));
    }
    Ok(pascal_case(path))
}

pub(crate) fn pascal_case(path: &[&str]) -> String {
    let mut id = String::new();
    for segment in path {
        for piece in segment.split(|c: char| !c.is_ascii_alphanumeric()) {
            let mut chars = piece.chars();
            if let Some(first) = chars.next() {
                id.push(first.to_ascii_uppercase());
                id.push_str(chars.as_str());
            }
        }
    }
    id
}
