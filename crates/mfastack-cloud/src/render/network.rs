//! Network rendering
//!
//! One VPC, an internet gateway when any public subnet group exists, and per
//! availability zone and subnet group: a subnet, a route table, its
//! association and the default route. Public subnets host the NAT gateways
//! used by private subnets in the same position.

use super::{NetworkRefs, Renderer, logical_id};
use crate::error::{CloudError, Result};
use crate::template::Resource;
use crate::token::Token;
use ipnet::Ipv4Net;
use mfastack_core::{Network, SubnetKind};
use serde_json::json;
use std::net::Ipv4Addr;
use tracing::debug;

/// Smallest subnet the provider accepts
const MAX_SUBNET_PREFIX: u8 = 28;

/// A subnet with its allocated address range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedSubnet {
    /// Subnet group name
    pub group: String,
    pub kind: SubnetKind,
    /// Zero-based availability zone index
    pub az_index: usize,
    pub cidr: Ipv4Net,
}

impl AllocatedSubnet {
    /// Construct id, `PublicSubnet1` etc.
    pub fn construct_id(&self) -> String {
        format!("{}Subnet{}", self.group, self.az_index + 1)
    }
}

/// Carve the network's address range into subnets
///
/// Groups with an explicit mask get exactly that size. The space left over is
/// split evenly between the remaining groups, each getting the largest power
/// of two that fits. Blocks are laid out in declaration order, one per
/// availability zone, each aligned to its own size.
pub fn allocate_subnets(name: &str, network: &Network) -> Result<Vec<AllocatedSubnet>> {
    let allocation_error = |message: String| CloudError::SubnetAllocation {
        network: name.to_string(),
        message,
    };

    let azs = usize::from(network.max_azs);
    let prefix = network.cidr.prefix_len();
    let start = u64::from(u32::from(network.cidr.network()));
    let end = start + (1u64 << (32 - prefix));

    let reserved: u64 = network
        .subnets
        .iter()
        .filter_map(|group| group.cidr_mask)
        .map(|mask| (1u64 << (32 - mask)) * azs as u64)
        .sum();
    let unmasked = network
        .subnets
        .iter()
        .filter(|group| group.cidr_mask.is_none())
        .count()
        * azs;

    let remaining_mask = if unmasked > 0 {
        let total = end - start;
        let per_subnet = total.saturating_sub(reserved) / unmasked as u64;
        if per_subnet == 0 {
            return Err(allocation_error(
                "no address space left for subnets without cidr-mask".to_string(),
            ));
        }
        let mask = 32 - per_subnet.ilog2() as u8;
        if mask > MAX_SUBNET_PREFIX {
            return Err(allocation_error(format!(
                "subnets would be /{}, smaller than /{}",
                mask, MAX_SUBNET_PREFIX
            )));
        }
        Some(mask)
    } else {
        None
    };

    let mut cursor = start;
    let mut subnets = Vec::with_capacity(network.subnets.len() * azs);

    for group in &network.subnets {
        let mask = match group.cidr_mask.or(remaining_mask) {
            Some(mask) => mask,
            None => continue,
        };
        if mask < prefix {
            return Err(allocation_error(format!(
                "subnet group '{}' (/{}) is larger than the network (/{})",
                group.name, mask, prefix
            )));
        }
        let size = 1u64 << (32 - mask);

        for az_index in 0..azs {
            let aligned = cursor.div_ceil(size) * size;
            if aligned + size > end {
                return Err(allocation_error(format!(
                    "address space exhausted while placing '{}' in AZ {}",
                    group.name,
                    az_index + 1
                )));
            }
            let cidr = Ipv4Net::new(Ipv4Addr::from(aligned as u32), mask)
                .map_err(|e| allocation_error(e.to_string()))?;
            subnets.push(AllocatedSubnet {
                group: group.name.clone(),
                kind: group.kind,
                az_index,
                cidr,
            });
            cursor = aligned + size;
        }
    }

    Ok(subnets)
}

pub(crate) fn render_network(
    renderer: &mut Renderer<'_>,
    id: &str,
    network: &Network,
) -> Result<NetworkRefs> {
    let subnets = allocate_subnets(id, network)?;
    let vpc_id = logical_id(&[id])?;
    let display_name = network
        .name
        .clone()
        .unwrap_or_else(|| format!("{}/{}", renderer.stack.name, id));

    renderer.template.add_resource(
        vpc_id.clone(),
        Resource::new("AWS::EC2::VPC")
            .property("CidrBlock", network.cidr.to_string())
            .property("EnableDnsHostnames", true)
            .property("EnableDnsSupport", true)
            .property("InstanceTenancy", "default")
            .property("Tags", json!([{ "Key": "Name", "Value": display_name }])),
    )?;

    let mut refs = NetworkRefs {
        vpc: vpc_id.clone(),
        ..Default::default()
    };

    let has_public = subnets.iter().any(|s| s.kind == SubnetKind::Public);
    let igw_id = format!("{}IGW", vpc_id);
    let attachment_id = format!("{}VPCGW", vpc_id);
    if has_public {
        renderer.template.add_resource(
            igw_id.clone(),
            Resource::new("AWS::EC2::InternetGateway")
                .property("Tags", json!([{ "Key": "Name", "Value": display_name }])),
        )?;
        renderer.template.add_resource(
            attachment_id.clone(),
            Resource::new("AWS::EC2::VPCGatewayAttachment")
                .property("InternetGatewayId", Token::reference(igw_id.clone()))
                .property("VpcId", Token::reference(vpc_id.clone())),
        )?;
    }

    // NAT gateways live in the first public group, one per AZ up to the requested count
    let nat_count = usize::from(network.effective_nat_gateways());
    let first_public_group = subnets
        .iter()
        .find(|s| s.kind == SubnetKind::Public)
        .map(|s| s.group.clone());
    let mut nat_gateways: Vec<String> = Vec::new();

    for subnet in subnets.iter().filter(|s| s.kind == SubnetKind::Public) {
        let base = logical_id(&[id, &subnet.construct_id()])?;
        let route_table =
            render_subnet(renderer, &base, &vpc_id, &display_name, subnet, &mut refs)?;

        let route_id = format!("{}DefaultRoute", base);
        renderer.template.add_resource(
            route_id.clone(),
            Resource::new("AWS::EC2::Route")
                .property("DestinationCidrBlock", "0.0.0.0/0")
                .property("GatewayId", Token::reference(igw_id.clone()))
                .property("RouteTableId", Token::reference(route_table))
                .depends_on([attachment_id.clone()]),
        )?;
        refs.public_routes.push(route_id);

        let in_first_group = first_public_group.as_deref() == Some(subnet.group.as_str());
        if in_first_group && subnet.az_index < nat_count {
            let name_tag = json!([{ "Key": "Name", "Value": subnet_name(&display_name, subnet) }]);
            let eip_id = format!("{}EIP", base);
            let nat_id = format!("{}NATGateway", base);
            renderer.template.add_resource(
                eip_id.clone(),
                Resource::new("AWS::EC2::EIP")
                    .property("Domain", "vpc")
                    .property("Tags", name_tag.clone()),
            )?;
            renderer.template.add_resource(
                nat_id.clone(),
                Resource::new("AWS::EC2::NatGateway")
                    .property("AllocationId", Token::get_att(eip_id, "AllocationId"))
                    .property("SubnetId", Token::reference(format!("{}Subnet", base)))
                    .property("Tags", name_tag)
                    .depends_on([
                        format!("{}DefaultRoute", base),
                        format!("{}RouteTableAssociation", base),
                    ]),
            )?;
            nat_gateways.push(nat_id);
        }
    }

    for subnet in subnets.iter().filter(|s| s.kind != SubnetKind::Public) {
        let base = logical_id(&[id, &subnet.construct_id()])?;
        let route_table =
            render_subnet(renderer, &base, &vpc_id, &display_name, subnet, &mut refs)?;

        if subnet.kind == SubnetKind::Private {
            if nat_gateways.is_empty() {
                return Err(CloudError::InvalidConfig(format!(
                    "network '{}': private subnets need a public subnet group \
                     and at least one NAT gateway",
                    id
                )));
            }
            let nat = &nat_gateways[subnet.az_index % nat_gateways.len()];
            renderer.template.add_resource(
                format!("{}DefaultRoute", base),
                Resource::new("AWS::EC2::Route")
                    .property("DestinationCidrBlock", "0.0.0.0/0")
                    .property("NatGatewayId", Token::reference(nat.clone()))
                    .property("RouteTableId", Token::reference(route_table)),
            )?;
        }
    }

    debug!(
        network = %id,
        subnets = subnets.len(),
        nat_gateways = nat_gateways.len(),
        "Rendered network"
    );

    Ok(refs)
}

fn subnet_name(display_name: &str, subnet: &AllocatedSubnet) -> String {
    format!("{}/{}", display_name, subnet.construct_id())
}

/// Subnet, route table and association. Returns the route table's logical id.
fn render_subnet(
    renderer: &mut Renderer<'_>,
    base: &str,
    vpc_id: &str,
    display_name: &str,
    subnet: &AllocatedSubnet,
    refs: &mut NetworkRefs,
) -> Result<String> {
    let subnet_id = format!("{}Subnet", base);
    let route_table_id = format!("{}RouteTable", base);
    let name = subnet_name(display_name, subnet);

    renderer.template.add_resource(
        subnet_id.clone(),
        Resource::new("AWS::EC2::Subnet")
            .property("AvailabilityZone", Token::availability_zone(subnet.az_index))
            .property("CidrBlock", subnet.cidr.to_string())
            .property("MapPublicIpOnLaunch", subnet.kind == SubnetKind::Public)
            .property(
                "Tags",
                json!([
                    { "Key": "aws-cdk:subnet-name", "Value": subnet.group },
                    { "Key": "aws-cdk:subnet-type", "Value": subnet.kind.as_str() },
                    { "Key": "Name", "Value": name },
                ]),
            )
            .property("VpcId", Token::reference(vpc_id)),
    )?;
    renderer.template.add_resource(
        route_table_id.clone(),
        Resource::new("AWS::EC2::RouteTable")
            .property("Tags", json!([{ "Key": "Name", "Value": name }]))
            .property("VpcId", Token::reference(vpc_id)),
    )?;
    renderer.template.add_resource(
        format!("{}RouteTableAssociation", base),
        Resource::new("AWS::EC2::SubnetRouteTableAssociation")
            .property("RouteTableId", Token::reference(route_table_id.clone()))
            .property("SubnetId", Token::reference(subnet_id.clone())),
    )?;

    match subnet.kind {
        SubnetKind::Public => refs.public_subnets.push(subnet_id),
        SubnetKind::Private => refs.private_subnets.push(subnet_id),
        SubnetKind::Isolated => refs.isolated_subnets.push(subnet_id),
    }

    Ok(route_table_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mfastack_core::SubnetGroup;

    fn network(cidr: &str, max_azs: u8, subnets: Vec<SubnetGroup>) -> Network {
        Network {
            cidr: cidr.parse().unwrap(),
            max_azs,
            subnets,
            ..Default::default()
        }
    }

    fn cidrs(subnets: &[AllocatedSubnet]) -> Vec<String> {
        subnets.iter().map(|s| s.cidr.to_string()).collect()
    }

    #[test]
    fn test_default_groups_two_azs() {
        let net = Network {
            max_azs: 2,
            ..Default::default()
        };
        let subnets = allocate_subnets("Vpc", &net).unwrap();

        assert_eq!(
            cidrs(&subnets),
            vec!["10.0.0.0/18", "10.0.64.0/18", "10.0.128.0/18", "10.0.192.0/18"]
        );
        assert_eq!(subnets[0].construct_id(), "PublicSubnet1");
        assert_eq!(subnets[3].construct_id(), "PrivateSubnet2");
        assert_eq!(subnets[3].kind, SubnetKind::Private);
    }

    #[test]
    fn test_default_groups_three_azs() {
        let subnets = allocate_subnets("Vpc", &Network::default()).unwrap();

        // 65536 / 6 = 10922 → /19
        assert_eq!(subnets.len(), 6);
        assert_eq!(subnets[0].cidr.to_string(), "10.0.0.0/19");
        assert_eq!(subnets[5].cidr.to_string(), "10.0.160.0/19");
    }

    #[test]
    fn test_explicit_masks() {
        let mut public = SubnetGroup::new("Public", SubnetKind::Public);
        public.cidr_mask = Some(24);
        let mut data = SubnetGroup::new("Data", SubnetKind::Isolated);
        data.cidr_mask = Some(24);
        let net = network("10.1.0.0/16", 2, vec![public, data]);

        let subnets = allocate_subnets("Vpc", &net).unwrap();
        assert_eq!(
            cidrs(&subnets),
            vec!["10.1.0.0/24", "10.1.1.0/24", "10.1.2.0/24", "10.1.3.0/24"]
        );
    }

    #[test]
    fn test_mixed_masks_are_aligned() {
        let mut public = SubnetGroup::new("Public", SubnetKind::Public);
        public.cidr_mask = Some(24);
        let private = SubnetGroup::new("Private", SubnetKind::Private);
        let net = network("10.0.0.0/16", 2, vec![public, private]);

        let subnets = allocate_subnets("Vpc", &net).unwrap();
        // (65536 - 512) / 2 = 32512 → /18, aligned after the two /24 blocks
        assert_eq!(
            cidrs(&subnets),
            vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.64.0/18", "10.0.128.0/18"]
        );
    }

    #[test]
    fn test_network_too_small() {
        let net = network(
            "10.0.0.0/28",
            3,
            vec![
                SubnetGroup::new("Public", SubnetKind::Public),
                SubnetGroup::new("Private", SubnetKind::Private),
            ],
        );
        assert!(matches!(
            allocate_subnets("Vpc", &net),
            Err(CloudError::SubnetAllocation { .. })
        ));
    }

    #[test]
    fn test_explicit_masks_exhaust_space() {
        let mut big = SubnetGroup::new("Public", SubnetKind::Public);
        big.cidr_mask = Some(17);
        let net = network("10.0.0.0/16", 3, vec![big]);
        assert!(matches!(
            allocate_subnets("Vpc", &net),
            Err(CloudError::SubnetAllocation { .. })
        ));
    }
}
