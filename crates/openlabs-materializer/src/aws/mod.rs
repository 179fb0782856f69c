mod maps;

use openlabs_core::models::BlueprintRange;
use serde_json::{json, Value};
use uuid::Uuid;

const JUMPBOX_VPC_CIDR: &str = "10.255.0.0/16";
const JUMPBOX_PUBLIC_SUBNET_CIDR: &str = "10.255.99.0/24";
const JUMPBOX_PRIVATE_SUBNET_CIDR: &str = "10.255.98.0/24";

/// Builds the full `cdk.tf.json` tree for an AWS range, following the
/// reference topology: a jumpbox VPC wired via Transit Gateway to one
/// cloud VPC per blueprint VPC.
pub fn build_plan(
    range: &BlueprintRange,
    deployed_range_id: Uuid,
    stack_name: &str,
    jumpbox_public_key: &str,
) -> Value {
    let mut resources = serde_json::Map::new();
    let mut outputs = serde_json::Map::new();

    resources.insert(
        "aws_key_pair".to_string(),
        json!({
            "jumpbox": {
                "key_name": format!("{stack_name}-jumpbox"),
                "public_key": jumpbox_public_key,
            }
        }),
    );

    insert_jumpbox_network(&mut resources, &mut outputs);

    resources.insert(
        "aws_ec2_transit_gateway".to_string(),
        json!({ "main": { "description": format!("{stack_name} transit gateway") } }),
    );
    resources.insert(
        "aws_ec2_transit_gateway_vpc_attachment".to_string(),
        json!({
            "jumpbox": {
                "transit_gateway_id": "${aws_ec2_transit_gateway.main.id}",
                "vpc_id": "${aws_vpc.jumpbox.id}",
                "subnet_ids": ["${aws_subnet.jumpbox_public.id}"],
                "transit_gateway_default_route_table_association": true,
                "transit_gateway_default_route_table_propagation": true,
            }
        }),
    );
    resources.insert(
        "aws_route".to_string(),
        json!({
            "jumpbox_tgw_internet": {
                "route_table_id": "${aws_route_table.jumpbox_public.id}",
                "destination_cidr_block": "0.0.0.0/0",
                "transit_gateway_id": "${aws_ec2_transit_gateway.main.id}",
            }
        }),
    );

    let mut vpc_route_entries = serde_json::Map::new();
    let mut nat_route_entries = serde_json::Map::new();

    for (idx, vpc) in range.vpcs.iter().enumerate() {
        insert_blueprint_vpc(&mut resources, &mut outputs, idx, vpc);
        vpc_route_entries.insert(
            format!("to_vpc_{idx}"),
            json!({
                "route_table_id": "${aws_route_table.jumpbox_public.id}",
                "destination_cidr_block": vpc.cidr.to_string(),
                "transit_gateway_id": "${aws_ec2_transit_gateway.main.id}",
            }),
        );
        nat_route_entries.insert(
            format!("to_vpc_{idx}"),
            json!({
                "route_table_id": "${aws_route_table.jumpbox_private.id}",
                "destination_cidr_block": vpc.cidr.to_string(),
                "transit_gateway_id": "${aws_ec2_transit_gateway.main.id}",
            }),
        );
    }

    if let Some(Value::Object(route)) = resources.get_mut("aws_route") {
        for (k, v) in vpc_route_entries {
            route.insert(k, v);
        }
        for (k, v) in nat_route_entries {
            route.insert(k, v);
        }
    }

    json!({
        "terraform": {
            "backend": {
                "local": { "path": format!("terraform.{stack_name}.tfstate") }
            }
        },
        "provider": {
            "aws": [{ "region": range.region }]
        },
        "locals": {
            "deployed_range_id": deployed_range_id.to_string(),
            "stack_name": stack_name,
        },
        "resource": Value::Object(resources),
        "output": Value::Object(outputs),
    })
}

fn insert_jumpbox_network(resources: &mut serde_json::Map<String, Value>, outputs: &mut serde_json::Map<String, Value>) {
    resources.insert(
        "aws_vpc".to_string(),
        json!({ "jumpbox": { "cidr_block": JUMPBOX_VPC_CIDR, "enable_dns_support": true, "enable_dns_hostnames": true } }),
    );
    resources.insert(
        "aws_subnet".to_string(),
        json!({
            "jumpbox_public": {
                "vpc_id": "${aws_vpc.jumpbox.id}",
                "cidr_block": JUMPBOX_PUBLIC_SUBNET_CIDR,
                "map_public_ip_on_launch": true,
            },
            "jumpbox_private": {
                "vpc_id": "${aws_vpc.jumpbox.id}",
                "cidr_block": JUMPBOX_PRIVATE_SUBNET_CIDR,
            }
        }),
    );
    resources.insert(
        "aws_internet_gateway".to_string(),
        json!({ "jumpbox": { "vpc_id": "${aws_vpc.jumpbox.id}" } }),
    );
    resources.insert(
        "aws_eip".to_string(),
        json!({ "nat": { "domain": "vpc" } }),
    );
    resources.insert(
        "aws_nat_gateway".to_string(),
        json!({
            "jumpbox": {
                "allocation_id": "${aws_eip.nat.id}",
                "subnet_id": "${aws_subnet.jumpbox_public.id}",
            }
        }),
    );
    resources.insert(
        "aws_route_table".to_string(),
        json!({
            "jumpbox_public": {
                "vpc_id": "${aws_vpc.jumpbox.id}",
                "route": [{
                    "cidr_block": "0.0.0.0/0",
                    "gateway_id": "${aws_internet_gateway.jumpbox.id}",
                }],
            },
            "jumpbox_private": {
                "vpc_id": "${aws_vpc.jumpbox.id}",
                "route": [{
                    "cidr_block": "0.0.0.0/0",
                    "nat_gateway_id": "${aws_nat_gateway.jumpbox.id}",
                }],
            },
        }),
    );
    resources.insert(
        "aws_route_table_association".to_string(),
        json!({
            "jumpbox_public": {
                "subnet_id": "${aws_subnet.jumpbox_public.id}",
                "route_table_id": "${aws_route_table.jumpbox_public.id}",
            },
            "jumpbox_private": {
                "subnet_id": "${aws_subnet.jumpbox_private.id}",
                "route_table_id": "${aws_route_table.jumpbox_private.id}",
            },
        }),
    );
    resources.insert(
        "aws_security_group".to_string(),
        json!({
            "jumpbox": {
                "vpc_id": "${aws_vpc.jumpbox.id}",
                "ingress": [{
                    "from_port": 22, "to_port": 22, "protocol": "tcp",
                    "cidr_blocks": ["0.0.0.0/0"],
                }],
                "egress": [{
                    "from_port": 0, "to_port": 0, "protocol": "-1",
                    "cidr_blocks": ["0.0.0.0/0"],
                }],
            }
        }),
    );
    resources.insert(
        "aws_instance".to_string(),
        json!({
            "jumpbox": {
                "ami": maps::JUMPBOX_AMI,
                "instance_type": maps::JUMPBOX_INSTANCE_TYPE,
                "subnet_id": "${aws_subnet.jumpbox_public.id}",
                "vpc_security_group_ids": ["${aws_security_group.jumpbox.id}"],
                "key_name": "${aws_key_pair.jumpbox.key_name}",
            }
        }),
    );

    outputs.insert(
        "jumpbox_public_ip".to_string(),
        json!({ "value": "${aws_instance.jumpbox.public_ip}" }),
    );
    outputs.insert(
        "jumpbox_instance_id".to_string(),
        json!({ "value": "${aws_instance.jumpbox.id}" }),
    );
}

fn insert_blueprint_vpc(
    resources: &mut serde_json::Map<String, Value>,
    outputs: &mut serde_json::Map<String, Value>,
    idx: usize,
    vpc: &openlabs_core::models::BlueprintVpc,
) {
    let vpc_key = format!("vpc_{idx}");

    merge_into(resources, "aws_vpc", &vpc_key, json!({ "cidr_block": vpc.cidr.to_string() }));

    // Shared security group: all traffic from the jumpbox public subnet
    // and from the other private VPC CIDRs in this range, egress-any.
    let mut ingress = vec![json!({
        "from_port": 0, "to_port": 0, "protocol": "-1",
        "cidr_blocks": [JUMPBOX_PUBLIC_SUBNET_CIDR],
    })];
    ingress.push(json!({
        "from_port": 0, "to_port": 0, "protocol": "-1",
        "cidr_blocks": [vpc.cidr.to_string()],
    }));
    merge_into(
        resources,
        "aws_security_group",
        &vpc_key,
        json!({
            "vpc_id": format!("${{aws_vpc.{vpc_key}.id}}"),
            "ingress": ingress,
            "egress": [{
                "from_port": 0, "to_port": 0, "protocol": "-1",
                "cidr_blocks": ["0.0.0.0/0"],
            }],
        }),
    );

    merge_into(
        resources,
        "aws_route_table",
        &vpc_key,
        json!({
            "vpc_id": format!("${{aws_vpc.{vpc_key}.id}}"),
            "route": [{
                "cidr_block": "0.0.0.0/0",
                "transit_gateway_id": "${aws_ec2_transit_gateway.main.id}",
            }],
        }),
    );

    let mut attachment_subnet_ids = Vec::new();

    for (s_idx, subnet) in vpc.subnets.iter().enumerate() {
        let subnet_key = format!("{vpc_key}_subnet_{s_idx}");
        merge_into(
            resources,
            "aws_subnet",
            &subnet_key,
            json!({
                "vpc_id": format!("${{aws_vpc.{vpc_key}.id}}"),
                "cidr_block": subnet.cidr.to_string(),
            }),
        );
        merge_into(
            resources,
            "aws_route_table_association",
            &subnet_key,
            json!({
                "subnet_id": format!("${{aws_subnet.{subnet_key}.id}}"),
                "route_table_id": format!("${{aws_route_table.{vpc_key}.id}}"),
            }),
        );
        attachment_subnet_ids.push(format!("${{aws_subnet.{subnet_key}.id}}"));

        for (h_idx, host) in subnet.hosts.iter().enumerate() {
            let host_key = format!("{subnet_key}_host_{h_idx}");
            merge_into(
                resources,
                "aws_instance",
                &host_key,
                json!({
                    "ami": maps::ami_for_os(&host.os),
                    "instance_type": maps::instance_type_for_spec(&host.spec),
                    "subnet_id": format!("${{aws_subnet.{subnet_key}.id}}"),
                    "vpc_security_group_ids": [format!("${{aws_security_group.{vpc_key}.id}}")],
                    "key_name": "${aws_key_pair.jumpbox.key_name}",
                    "root_block_device": [{ "volume_size": host.disk_size_gb }],
                    "tags": tags_map(&host.tags),
                }),
            );
            outputs.insert(
                format!("{host_key}_private_ip"),
                json!({ "value": format!("${{aws_instance.{host_key}.private_ip}}") }),
            );
        }
    }

    merge_into(
        resources,
        "aws_ec2_transit_gateway_vpc_attachment",
        &vpc_key,
        json!({
            "transit_gateway_id": "${aws_ec2_transit_gateway.main.id}",
            "vpc_id": format!("${{aws_vpc.{vpc_key}.id}}"),
            "subnet_ids": attachment_subnet_ids,
        }),
    );
}

fn tags_map(tags: &[String]) -> Value {
    let mut map = serde_json::Map::new();
    for (i, tag) in tags.iter().enumerate() {
        map.insert(format!("tag{i}"), json!(tag));
    }
    Value::Object(map)
}

fn merge_into(resources: &mut serde_json::Map<String, Value>, resource_type: &str, name: &str, body: Value) {
    let entry = resources
        .entry(resource_type.to_string())
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    if let Value::Object(map) = entry {
        map.insert(name.to_string(), body);
    }
}
