use ipnet::Ipv4Net;
use openlabs_core::models::{BlueprintHost, BlueprintRange, BlueprintSubnet, BlueprintVpc, Provider};
use openlabs_store::blueprints;
use uuid::Uuid;

async fn seed_owner(pool: &sqlx::PgPool) -> Uuid {
    let user = openlabs_store::users::create_user(
        pool,
        "owner@example.com",
        "Owner",
        "bcrypt-hash",
        "salt",
        "public-key-pem",
        b"encrypted",
        false,
    )
    .await
    .unwrap();
    user.id
}

fn sample_range(owner_id: Uuid) -> BlueprintRange {
    let vpc_cidr: Ipv4Net = "10.0.0.0/16".parse().unwrap();
    let subnet_cidr: Ipv4Net = "10.0.1.0/24".parse().unwrap();

    BlueprintRange {
        id: Uuid::nil(),
        name: "range-1".to_string(),
        provider: Provider::Aws,
        region: "us_east_1".to_string(),
        vnc: false,
        vpn: false,
        owner_id,
        vpcs: vec![BlueprintVpc {
            id: Uuid::nil(),
            name: "vpc-1".to_string(),
            cidr: vpc_cidr,
            parent_range_id: None,
            subnets: vec![BlueprintSubnet {
                id: Uuid::nil(),
                name: "subnet-1".to_string(),
                cidr: subnet_cidr,
                parent_vpc_id: None,
                hosts: vec![BlueprintHost {
                    id: Uuid::nil(),
                    hostname: "h1".to_string(),
                    os: "debian_11".to_string(),
                    spec: "tiny".to_string(),
                    disk_size_gb: 8,
                    tags: vec!["linux".to_string()],
                    parent_subnet_id: None,
                }],
            }],
        }],
    }
}

#[sqlx::test]
async fn create_then_get_returns_the_same_graph(pool: sqlx::PgPool) {
    openlabs_store::run_migrations(&pool).await.unwrap();
    let owner_id = seed_owner(&pool).await;
    let range = sample_range(owner_id);

    let created = blueprints::create_range(&pool, &range).await.unwrap();
    let fetched = blueprints::get_blueprint_range(&pool, created.id, Some(owner_id))
        .await
        .unwrap()
        .expect("range should exist");

    assert_eq!(fetched.name, "range-1");
    assert_eq!(fetched.vpcs.len(), 1);
    assert_eq!(fetched.vpcs[0].subnets.len(), 1);
    assert_eq!(fetched.vpcs[0].subnets[0].hosts[0].hostname, "h1");
}

#[sqlx::test]
async fn get_range_owned_by_someone_else_is_hidden(pool: sqlx::PgPool) {
    openlabs_store::run_migrations(&pool).await.unwrap();
    let owner_id = seed_owner(&pool).await;
    let range = sample_range(owner_id);
    let created = blueprints::create_range(&pool, &range).await.unwrap();

    let other = Uuid::new_v4();
    let fetched = blueprints::get_blueprint_range(&pool, created.id, Some(other))
        .await
        .unwrap();
    assert!(fetched.is_none());
}

#[sqlx::test]
async fn delete_cascades_to_vpcs_subnets_and_hosts(pool: sqlx::PgPool) {
    openlabs_store::run_migrations(&pool).await.unwrap();
    let owner_id = seed_owner(&pool).await;
    let range = sample_range(owner_id);
    let created = blueprints::create_range(&pool, &range).await.unwrap();

    let deleted = blueprints::delete_blueprint_range(&pool, created.id, Some(owner_id))
        .await
        .unwrap();
    assert!(deleted);

    let vpc_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blueprint_vpcs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(vpc_count.0, 0);
}
