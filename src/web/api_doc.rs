use utoipa::OpenApi;

use super::api::catalog::{BulkAzElRequest, BulkAzElResponse, DateFailures, ServiceInfo};
use super::api::error::ErrorBody;
use crate::catalogue::{AzElResult, CatalogueKind, KindFailure, PositionResult};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::catalog::root,
        super::api::catalog::get_catalog,
        super::api::catalog::get_position,
        super::api::catalog::bulk_az_el,
    ),
    components(
        schemas(
            AzElResult,
            PositionResult,
            BulkAzElRequest,
            BulkAzElResponse,
            DateFailures,
            KindFailure,
            CatalogueKind,
            ServiceInfo,
            ErrorBody,
        )
    ),
    info(
        title = "Object Position Server API",
        description = "Positions of navigation satellites and the Sun from cached TLE catalogues",
        version = "0.1.0"
    ),
    tags(
        (name = "catalog", description = "Satellite and solar positions")
    )
)]
pub struct ApiDoc;
