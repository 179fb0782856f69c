//! CRUD over the blueprint sub-graph: ranges, and the standalone VPC/
//! subnet/host sub-graphs that exist outside any range. Every handler
//! scopes reads/writes to the caller unless they are an admin, via a
//! `State(state)` + `Path`/`Json` extractor shape with an ownership
//! check in front of the store call.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use openlabs_core::models::{BlueprintHost, BlueprintRange, BlueprintSubnet, BlueprintVpc};
use openlabs_core::validators;
use openlabs_store::blueprints::{
    self, BlueprintHostHeader, BlueprintRangeHeader, BlueprintSubnetHeader, BlueprintVpcHeader,
};

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct StandaloneQuery {
    #[serde(default)]
    pub standalone_only: bool,
}

fn scope(user: &openlabs_core::models::User) -> Option<Uuid> {
    if user.is_admin {
        None
    } else {
        Some(user.id)
    }
}

pub async fn list_ranges(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<BlueprintRangeHeader>>, ApiError> {
    let headers = blueprints::list_blueprint_range_headers(&state.pool, scope(&user)).await?;
    Ok(Json(headers))
}

pub async fn get_range(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BlueprintRange>, ApiError> {
    let range = blueprints::get_blueprint_range(&state.pool, id, scope(&user))
        .await?
        .ok_or(ApiError::Forbidden)?;
    Ok(Json(range))
}

pub async fn create_range(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(mut range): Json<BlueprintRange>,
) -> Result<(StatusCode, Json<BlueprintRange>), ApiError> {
    range.owner_id = user.id;
    validators::validate_range_vpc_names(&range.vpcs)?;
    for vpc in &range.vpcs {
        validators::validate_vpc(vpc)?;
    }
    let created = blueprints::create_range(&state.pool, &range).await?;
    Ok((StatusCode::OK, Json(created)))
}

pub async fn delete_range(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = blueprints::delete_blueprint_range(&state.pool, id, scope(&user)).await?;
    if !deleted {
        return Err(ApiError::Forbidden);
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_vpcs(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<StandaloneQuery>,
) -> Result<Json<Vec<BlueprintVpcHeader>>, ApiError> {
    let headers = blueprints::list_blueprint_vpc_headers(&state.pool, scope(&user), q.standalone_only).await?;
    Ok(Json(headers))
}

pub async fn get_vpc(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BlueprintVpc>, ApiError> {
    let vpc = blueprints::get_blueprint_vpc(&state.pool, id, scope(&user))
        .await?
        .ok_or(ApiError::Forbidden)?;
    Ok(Json(vpc))
}

pub async fn create_vpc(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(vpc): Json<BlueprintVpc>,
) -> Result<(StatusCode, Json<BlueprintVpc>), ApiError> {
    for subnet in &vpc.subnets {
        validators::validate_subnet(subnet, vpc.cidr)?;
    }
    let created = blueprints::create_standalone_vpc(&state.pool, user.id, &vpc).await?;
    Ok((StatusCode::OK, Json(created)))
}

pub async fn list_subnets(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<StandaloneQuery>,
) -> Result<Json<Vec<BlueprintSubnetHeader>>, ApiError> {
    let headers =
        blueprints::list_blueprint_subnet_headers(&state.pool, scope(&user), q.standalone_only).await?;
    Ok(Json(headers))
}

pub async fn get_subnet(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BlueprintSubnet>, ApiError> {
    let subnet = blueprints::get_blueprint_subnet(&state.pool, id, scope(&user))
        .await?
        .ok_or(ApiError::Forbidden)?;
    Ok(Json(subnet))
}

pub async fn create_subnet(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(subnet): Json<BlueprintSubnet>,
) -> Result<(StatusCode, Json<BlueprintSubnet>), ApiError> {
    for host in &subnet.hosts {
        validators::validate_host(host)?;
    }
    let created = blueprints::create_standalone_subnet(&state.pool, user.id, &subnet).await?;
    Ok((StatusCode::OK, Json(created)))
}

pub async fn list_hosts(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<StandaloneQuery>,
) -> Result<Json<Vec<BlueprintHostHeader>>, ApiError> {
    let headers = blueprints::list_blueprint_host_headers(&state.pool, scope(&user), q.standalone_only).await?;
    Ok(Json(headers))
}

pub async fn get_host(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BlueprintHost>, ApiError> {
    let host = blueprints::get_blueprint_host(&state.pool, id, scope(&user))
        .await?
        .ok_or(ApiError::Forbidden)?;
    Ok(Json(host))
}

pub async fn create_host(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(host): Json<BlueprintHost>,
) -> Result<(StatusCode, Json<BlueprintHost>), ApiError> {
    validators::validate_host(&host)?;
    let created = blueprints::create_standalone_host(&state.pool, user.id, &host).await?;
    Ok((StatusCode::OK, Json(created)))
}
