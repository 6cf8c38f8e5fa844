use buildinfra::errors::{InfraError, InfraResult};
use buildinfra::payload::{ApiResponse, ProfilePayload};
use buildinfra::service::memory::InMemoryProfileService;
use buildinfra::service::ProfileService;
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};
use warp::http::StatusCode;
use warp::reply::{json, with_status, Json, WithStatus};
use warp::Filter;

type Service = Arc<InMemoryProfileService>;

fn with_service(service: Service) -> impl Filter<Extract = (Service,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

fn error_reply(err: &InfraError) -> WithStatus<Json> {
    let status = match err {
        InfraError::NotFound(_) => StatusCode::NOT_FOUND,
        InfraError::Api { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        InfraError::InvalidInput(_) | InfraError::Decode(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(%status, "request failed: {}", err);
    let body = ApiResponse::<Value>::error(
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        &err.user_message(),
    );
    with_status(json(&body), status)
}

fn reply<T: Serialize>(result: InfraResult<T>) -> Result<WithStatus<Json>, Infallible> {
    Ok(match result {
        Ok(result) => with_status(json(&ApiResponse::ok(result)), StatusCode::OK),
        Err(err) => error_reply(&err),
    })
}

async fn list_profiles(service: Service) -> Result<WithStatus<Json>, Infallible> {
    reply(service.list_profiles().await)
}

async fn get_profile(name: String, service: Service) -> Result<WithStatus<Json>, Infallible> {
    reply(service.get_profile(Some(&name)).await)
}

async fn create_profile(
    payload: ProfilePayload,
    service: Service,
) -> Result<WithStatus<Json>, Infallible> {
    debug!(name = %payload.name, "create");
    reply(service.create_profile(&payload).await.map(|_| Value::Null))
}

async fn update_profile(
    name: String,
    payload: ProfilePayload,
    service: Service,
) -> Result<WithStatus<Json>, Infallible> {
    debug!(name, "update");
    reply(service.update_profile(&name, &payload).await.map(|_| Value::Null))
}

async fn delete_profile(name: String, service: Service) -> Result<WithStatus<Json>, Infallible> {
    reply(service.delete_profile(&name).await.map(|_| Value::Null))
}

/// The infra-config routes under `/orchestrator/infra-config/profile`.
pub fn routes(
    service: Service,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let profile = || warp::path!("orchestrator" / "infra-config" / "profile" / ..);

    let list = profile()
        .and(warp::path!("list"))
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(list_profiles);

    let get = profile()
        .and(warp::path!(String))
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(get_profile);

    let create = profile()
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_service(service.clone()))
        .and_then(create_profile);

    let update = profile()
        .and(warp::path!(String))
        .and(warp::put())
        .and(warp::body::json())
        .and(with_service(service.clone()))
        .and_then(update_profile);

    let delete = profile()
        .and(warp::path!(String))
        .and(warp::delete())
        .and(with_service(service))
        .and_then(delete_profile);

    list.or(get)
        .unify()
        .or(create)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .with(warp::trace::request())
}
