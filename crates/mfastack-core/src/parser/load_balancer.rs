//! load-balancer ノードのパース

use super::value::{
    bool_prop, first_string, flag, integer_prop, normalized_name, required_name, string_prop,
};
use crate::error::{Result, StackError};
use crate::model::{Listener, LoadBalancer, Protocol, TargetGroup};
use kdl::KdlNode;

/// load-balancer ノードを既存の定義に適用
pub fn apply_load_balancer(node: &KdlNode, lb: &mut LoadBalancer) -> Result<()> {
    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        match normalized_name(child).as_str() {
            "network" | "vpc" => {
                lb.network = first_string(child).unwrap_or_default();
            }
            "internet-facing" => {
                lb.internet_facing = flag(child)?;
            }
            "listener" => {
                let id = required_name(child, "listener")?;
                let listener = lb.listeners.entry(id).or_default();
                apply_listener(child, listener)?;
            }
            _ => {}
        }
    }

    Ok(())
}

/// listener "web" port=80 open=#true { target-group "tg" port=80 }
fn apply_listener(node: &KdlNode, listener: &mut Listener) -> Result<()> {
    if let Some(protocol) = parse_protocol(node)? {
        listener.protocol = protocol;
        listener.port = protocol.default_port();
    }
    if let Some(port) = integer_prop(node, "port")? {
        listener.port = port;
    }
    if let Some(open) = bool_prop(node, "open")? {
        listener.open = open;
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            if normalized_name(child) == "target-group" {
                let id = required_name(child, "target-group")?;
                let target_group = listener.target_groups.entry(id).or_default();
                apply_target_group(child, target_group)?;
            }
        }
    }

    Ok(())
}

fn apply_target_group(node: &KdlNode, target_group: &mut TargetGroup) -> Result<()> {
    if let Some(protocol) = parse_protocol(node)? {
        target_group.protocol = protocol;
        target_group.port = protocol.default_port();
    }
    if let Some(port) = integer_prop(node, "port")? {
        target_group.port = port;
    }
    Ok(())
}

fn parse_protocol(node: &KdlNode) -> Result<Option<Protocol>> {
    match string_prop(node, "protocol") {
        Some(raw) => Protocol::parse(&raw).map(Some).ok_or_else(|| {
            StackError::InvalidConfig(format!(
                "{}: 不明なプロトコル '{}'",
                node.name().value(),
                raw
            ))
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(kdl: &str) -> LoadBalancer {
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        let mut lb = LoadBalancer::default();
        apply_load_balancer(doc.nodes().first().unwrap(), &mut lb).unwrap();
        lb
    }

    #[test]
    fn test_parse_load_balancer() {
        let lb = parse(
            r#"
            load-balancer "alb" {
                network "vpc"
                internet-facing #true
                listener "listener" port=80 open=#true {
                    target-group "tg" port=80 protocol="http"
                }
            }
        "#,
        );
        assert_eq!(lb.network, "vpc");
        assert!(lb.internet_facing);

        let listener = &lb.listeners["listener"];
        assert_eq!(listener.port, 80);
        assert!(listener.open);
        assert_eq!(listener.protocol, Protocol::Http);

        let tg = &listener.target_groups["tg"];
        assert_eq!(tg.port, 80);
        assert_eq!(tg.protocol, Protocol::Http);
    }

    #[test]
    fn test_https_listener_default_port() {
        let lb = parse(
            r#"
            load-balancer "alb" {
                listener "secure" protocol="https"
            }
        "#,
        );
        assert_eq!(lb.listeners["secure"].port, 443);
        assert_eq!(lb.listeners["secure"].protocol, Protocol::Https);
    }

    #[test]
    fn test_unknown_protocol_is_error() {
        let doc: kdl::KdlDocument = r#"
            load-balancer "alb" {
                listener "l" protocol="gopher"
            }
        "#
        .parse()
        .unwrap();
        let mut lb = LoadBalancer::default();
        let result = apply_load_balancer(doc.nodes().first().unwrap(), &mut lb);
        assert!(matches!(result, Err(StackError::InvalidConfig(_))));
    }

    #[test]
    fn test_port_out_of_range_is_error() {
        let doc: kdl::KdlDocument = r#"
            load-balancer "alb" {
                listener "l" port=70000
            }
        "#
        .parse()
        .unwrap();
        let mut lb = LoadBalancer::default();
        let result = apply_load_balancer(doc.nodes().first().unwrap(), &mut lb);
        assert!(result.is_err());
    }
}
