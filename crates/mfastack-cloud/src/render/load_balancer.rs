//! Load balancer rendering

use super::{Renderer, logical_id};
use crate::error::{CloudError, Result};
use crate::template::{Output, Resource};
use crate::token::Token;
use mfastack_core::{LoadBalancer, Protocol};
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Render a load balancer with its security group, listeners and target groups.
/// Returns the load balancer's logical id.
pub(crate) fn render_load_balancer(
    renderer: &mut Renderer<'_>,
    id: &str,
    lb: &LoadBalancer,
) -> Result<String> {
    let network = renderer
        .networks
        .get(&lb.network)
        .cloned()
        .ok_or_else(|| CloudError::UnknownNetwork {
            network: lb.network.clone(),
            load_balancer: id.to_string(),
        })?;

    let (subnets, depends_on) = if lb.internet_facing {
        (network.public_subnets.clone(), network.public_routes.clone())
    } else if !network.private_subnets.is_empty() {
        (network.private_subnets.clone(), Vec::new())
    } else {
        (network.isolated_subnets.clone(), Vec::new())
    };
    if subnets.is_empty() {
        return Err(CloudError::InvalidConfig(format!(
            "load balancer '{}': network '{}' has no {} subnets",
            id,
            lb.network,
            if lb.internet_facing { "public" } else { "private" }
        )));
    }

    let lb_id = logical_id(&[id])?;
    let sg_id = format!("{}SecurityGroup", lb_id);

    let ingress: Vec<Value> = lb
        .listeners
        .values()
        .filter(|listener| listener.open)
        .map(|listener| {
            json!({
                "CidrIp": "0.0.0.0/0",
                "Description": format!("Allow from anyone on port {}", listener.port),
                "FromPort": listener.port,
                "IpProtocol": "tcp",
                "ToPort": listener.port,
            })
        })
        .collect();

    let mut security_group = Resource::new("AWS::EC2::SecurityGroup")
        .property(
            "GroupDescription",
            format!(
                "Automatically created Security Group for ELB {}/{}",
                renderer.stack.name, id
            ),
        )
        .property(
            "SecurityGroupEgress",
            json!([{
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": "-1",
            }]),
        )
        .property("VpcId", Token::reference(network.vpc.clone()));
    if !ingress.is_empty() {
        security_group = security_group.property("SecurityGroupIngress", ingress);
    }
    renderer.template.add_resource(sg_id.clone(), security_group)?;

    let subnet_refs: Vec<Value> = subnets
        .into_iter()
        .map(|s| Token::reference(s).into())
        .collect();
    renderer.template.add_resource(
        lb_id.clone(),
        Resource::new("AWS::ElasticLoadBalancingV2::LoadBalancer")
            .property(
                "LoadBalancerAttributes",
                json!([{ "Key": "deletion_protection.enabled", "Value": "false" }]),
            )
            .property(
                "Scheme",
                if lb.internet_facing {
                    "internet-facing"
                } else {
                    "internal"
                },
            )
            .property(
                "SecurityGroups",
                vec![Value::from(Token::get_att(sg_id, "GroupId"))],
            )
            .property("Subnets", subnet_refs)
            .property("Type", "application")
            .depends_on(depends_on),
    )?;

    for (listener_key, listener) in &lb.listeners {
        let listener_id = logical_id(&[id, listener_key])?;
        let mut target_group_ids = Vec::new();

        for (tg_key, target_group) in &listener.target_groups {
            let tg_id = logical_id(&[id, listener_key, tg_key])?;
            // Placeholder: no registered targets
            renderer.template.add_resource(
                tg_id.clone(),
                Resource::new("AWS::ElasticLoadBalancingV2::TargetGroup")
                    .property("Port", target_group.port)
                    .property("Protocol", target_group.protocol.as_str())
                    .property("VpcId", Token::reference(network.vpc.clone())),
            )?;
            target_group_ids.push(tg_id);
        }

        let default_action = match target_group_ids.as_slice() {
            [] => json!({
                "FixedResponseConfig": { "StatusCode": "503" },
                "Type": "fixed-response",
            }),
            [single] => json!({
                "TargetGroupArn": Token::reference(single.clone()),
                "Type": "forward",
            }),
            many => {
                let groups: Vec<Value> = many
                    .iter()
                    .map(|tg| {
                        json!({ "TargetGroupArn": Token::reference(tg.clone()), "Weight": 1 })
                    })
                    .collect();
                json!({
                    "ForwardConfig": { "TargetGroups": groups },
                    "Type": "forward",
                })
            }
        };

        if listener.protocol == Protocol::Https {
            warn!(listener = %listener_key, "HTTPS listener rendered without certificates");
        }

        renderer.template.add_resource(
            listener_id,
            Resource::new("AWS::ElasticLoadBalancingV2::Listener")
                .property("DefaultActions", vec![default_action])
                .property("LoadBalancerArn", Token::reference(lb_id.clone()))
                .property("Port", listener.port)
                .property("Protocol", listener.protocol.as_str()),
        )?;
    }

    renderer.template.add_output(
        format!("{}DnsName", lb_id),
        Output::new(
            format!("DNS name of load balancer {}", id),
            Token::get_att(lb_id.clone(), "DNSName"),
        ),
    )?;

    debug!(
        load_balancer = %id,
        listeners = lb.listeners.len(),
        "Rendered load balancer"
    );

    Ok(lb_id)
}
