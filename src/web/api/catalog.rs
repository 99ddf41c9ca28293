use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::dates::resolve_request_date;
use crate::catalogue::{Aggregate, AzElResult, KindFailure, Observer, PositionResult};
use crate::web::api::error::{ApiError, ApiResult, ErrorBody};
use crate::web::server::AppState;

/// Response header listing the kinds missing from a partial result.
pub const FAILED_KINDS_HEADER: &str = "x-catalogue-errors";

const BULK_MIN_ELEVATION_DEG: f64 = 0.0;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub alt: f64,
    #[serde(default, alias = "elevation")]
    pub ele: f64,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PositionQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkAzElRequest {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub alt: f64,
    /// ISO-8601 timestamps
    pub dates: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkAzElResponse {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub dates: Vec<String>,
    /// One `/catalog`-shaped list per entry of `dates`; empty for a date
    /// no catalogue could serve
    pub az_el: Vec<Vec<AzElResult>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<DateFailures>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DateFailures {
    pub date: String,
    pub failures: Vec<KindFailure>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub message: String,
    pub docs: String,
}

#[utoipa::path(
    get,
    path = "/catalog",
    tag = "catalog",
    params(
        ("lat" = f64, Query, description = "Latitude in decimal degrees of observer"),
        ("lon" = f64, Query, description = "Longitude in decimal degrees of observer"),
        ("alt" = Option<f64>, Query, description = "Altitude in metres of observer"),
        ("ele" = Option<f64>, Query, description = "Ignore objects below this elevation (degrees)"),
        ("date" = Option<String>, Query, description = "UTC date (ISO-8601, defaults to now)")
    ),
    responses(
        (status = 200, description = "Objects in local horizontal coordinates", body = Vec<AzElResult>),
        (status = 400, description = "Invalid parameters", body = ErrorBody),
        (status = 503, description = "No catalogue available", body = ErrorBody)
    )
)]
pub async fn get_catalog(
    State(state): State<AppState>,
    query: Result<Query<CatalogQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let date = resolve_request_date(query.date.as_deref(), Utc::now(), state.max_future)?;
    let observer = Observer::new(
        required(query.lat, "lat")?,
        required(query.lon, "lon")?,
        query.alt,
    )?;

    let aggregate = state
        .registry
        .aggregate_az_el(date, &observer, query.ele)
        .await?;
    Ok(annotated(aggregate))
}

#[utoipa::path(
    get,
    path = "/position",
    tag = "catalog",
    params(
        ("date" = Option<String>, Query, description = "UTC date (ISO-8601, defaults to now)")
    ),
    responses(
        (status = 200, description = "Satellite positions in ECEF", body = Vec<PositionResult>),
        (status = 400, description = "Invalid parameters", body = ErrorBody),
        (status = 503, description = "No catalogue available", body = ErrorBody)
    )
)]
pub async fn get_position(
    State(state): State<AppState>,
    query: Result<Query<PositionQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let date = resolve_request_date(query.date.as_deref(), Utc::now(), state.max_future)?;
    let aggregate = state.registry.aggregate_positions(date).await?;
    Ok(annotated(aggregate))
}

#[utoipa::path(
    post,
    path = "/bulk_az_el",
    tag = "catalog",
    request_body = BulkAzElRequest,
    responses(
        (status = 200, description = "Horizontal coordinates for every date", body = BulkAzElResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 503, description = "No catalogue available", body = ErrorBody)
    )
)]
pub async fn bulk_az_el(
    State(state): State<AppState>,
    body: Result<Json<BulkAzElRequest>, JsonRejection>,
) -> ApiResult<Json<BulkAzElResponse>> {
    let Json(request) = body?;
    let observer = Observer::new(request.lat, request.lon, request.alt)?;

    let now = Utc::now();
    let dates = request
        .dates
        .iter()
        .map(|d| resolve_request_date(Some(d), now, state.max_future))
        .collect::<Result<Vec<_>, _>>()?;

    let mut az_el = Vec::with_capacity(dates.len());
    let mut errors = Vec::new();
    let mut failed_dates = 0;
    for date in &dates {
        let (results, failures) = match state
            .registry
            .aggregate_az_el(*date, &observer, BULK_MIN_ELEVATION_DEG)
            .await
        {
            Ok(aggregate) => (aggregate.results, aggregate.failures),
            Err(e) => {
                log::warn!("No catalogues for {}: {}", date.to_rfc3339(), e);
                failed_dates += 1;
                (Vec::new(), e.into_failures())
            }
        };
        if !failures.is_empty() {
            errors.push(DateFailures {
                date: date.to_rfc3339(),
                failures,
            });
        }
        az_el.push(results);
    }

    if failed_dates > 0 && failed_dates == dates.len() {
        return Err(ApiError::Unavailable(
            "no catalogue available for any requested date".to_string(),
        ));
    }

    Ok(Json(BulkAzElResponse {
        lat: observer.latitude_deg,
        lon: observer.longitude_deg,
        alt: observer.altitude_m,
        dates: dates.iter().map(|d| d.to_rfc3339()).collect(),
        az_el,
        errors,
    }))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "catalog",
    responses((status = 200, description = "Service information", body = ServiceInfo))
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Object Position Server API".to_string(),
        docs: "/docs".to_string(),
    })
}

pub async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    let body = ErrorBody {
        error: "not_found".to_string(),
        message: None,
    };
    (StatusCode::NOT_FOUND, Json(body))
}

fn required(value: Option<f64>, name: &str) -> ApiResult<f64> {
    value.ok_or_else(|| ApiError::Input(format!("Missing Required Parameter '{}'", name)))
}

fn annotated<T: Serialize>(aggregate: Aggregate<T>) -> Response {
    let failed = aggregate
        .failures
        .iter()
        .map(|f| f.kind.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let mut response = Json(aggregate.results).into_response();
    if !failed.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&failed) {
            response.headers_mut().insert(FAILED_KINDS_HEADER, value);
        }
    }
    response
}
