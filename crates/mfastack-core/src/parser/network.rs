//! network ノードのパース

use super::value::{
    first_integer, first_string, integer_prop, normalized_name, required_name, string_prop,
};
use crate::error::{Result, StackError};
use crate::model::{Network, SubnetGroup, SubnetKind};
use ipnet::Ipv4Net;
use kdl::KdlNode;

/// network ノードを既存の定義に適用
pub fn apply_network(node: &KdlNode, network: &mut Network) -> Result<()> {
    let Some(children) = node.children() else {
        return Ok(());
    };

    let mut subnets = Vec::new();

    for child in children.nodes() {
        match normalized_name(child).as_str() {
            "name" => {
                network.name = first_string(child);
            }
            "cidr" | "ip-addresses" => {
                let raw = required_name(child, "cidr")?;
                network.cidr = parse_cidr(&raw)?;
            }
            "max-azs" => {
                let max_azs: u8 = first_integer(child)?;
                if max_azs == 0 {
                    return Err(StackError::InvalidConfig(
                        "max-azs は1以上を指定してください".to_string(),
                    ));
                }
                network.max_azs = max_azs;
            }
            "nat-gateways" => {
                network.nat_gateways = Some(first_integer(child)?);
            }
            "subnet" => {
                subnets.push(parse_subnet(child)?);
            }
            _ => {}
        }
    }

    // サブネット指定があればグループ全体を置き換える
    if !subnets.is_empty() {
        network.subnets = subnets;
    }

    Ok(())
}

/// CIDR文字列をパース
///
/// ホスト部が0でないアドレス（10.0.0.1/16 など）は拒否する
fn parse_cidr(raw: &str) -> Result<Ipv4Net> {
    let net: Ipv4Net = raw
        .parse()
        .map_err(|e| StackError::InvalidConfig(format!("無効なCIDR '{}': {}", raw, e)))?;
    if net.trunc() != net {
        return Err(StackError::InvalidConfig(format!(
            "無効なCIDR '{}': ネットワークアドレスを指定してください（{}）",
            raw,
            net.trunc()
        )));
    }
    Ok(net)
}

/// subnet "Public" type="public" cidr-mask=24
fn parse_subnet(node: &KdlNode) -> Result<SubnetGroup> {
    let name = required_name(node, "subnet")?;
    let kind_raw = string_prop(node, "type").unwrap_or_else(|| name.to_lowercase());
    let kind = SubnetKind::parse(&kind_raw).ok_or_else(|| {
        StackError::InvalidConfig(format!("subnet '{}': 不明な種別 '{}'", name, kind_raw))
    })?;
    let cidr_mask: Option<u8> = integer_prop(node, "cidr-mask")?;
    if let Some(mask) = cidr_mask
        && !(16..=28).contains(&mask)
    {
        return Err(StackError::InvalidConfig(format!(
            "subnet '{}': cidr-mask は16から28の範囲で指定してください",
            name
        )));
    }

    Ok(SubnetGroup {
        name,
        kind,
        cidr_mask,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cidr() {
        let net = parse_cidr("10.0.0.0/16").unwrap();
        assert_eq!(net.prefix_len(), 16);
    }

    #[test]
    fn test_parse_cidr_rejects_host_bits() {
        assert!(parse_cidr("10.0.0.1/16").is_err());
    }

    #[test]
    fn test_parse_cidr_rejects_garbage() {
        assert!(parse_cidr("10.0.0.0/33").is_err());
        assert!(parse_cidr("not-a-cidr").is_err());
    }

    #[test]
    fn test_parse_subnet_kind_from_name() {
        let doc: kdl::KdlDocument = r#"subnet "Private""#.parse().unwrap();
        let subnet = parse_subnet(doc.nodes().first().unwrap()).unwrap();
        assert_eq!(subnet.kind, SubnetKind::Private);
        assert_eq!(subnet.cidr_mask, None);
    }

    #[test]
    fn test_parse_subnet_with_mask() {
        let doc: kdl::KdlDocument = r#"subnet "Web" type="public" cidr-mask=24"#.parse().unwrap();
        let subnet = parse_subnet(doc.nodes().first().unwrap()).unwrap();
        assert_eq!(subnet.name, "Web");
        assert_eq!(subnet.kind, SubnetKind::Public);
        assert_eq!(subnet.cidr_mask, Some(24));
    }
}
