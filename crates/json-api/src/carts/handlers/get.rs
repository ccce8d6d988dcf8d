//! Get Cart Handler

use std::sync::Arc;

use salvo::{
    oapi::{
        ToSchema,
        extract::{PathParam, QueryParam},
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    carts::{
        errors::into_status_error,
        responses::{CartResponse, ValidationResponse},
    },
    extensions::*,
    state::State,
};

/// Get Cart Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct GetCartResponse {
    pub cart: CartResponse,

    /// Present when `validate=true` was requested
    pub validation: Option<ValidationResponse>,
}

/// Get Cart Handler
///
/// Returns a customer's cart, optionally validating it against the catalog
/// first.
#[endpoint(
    tags("carts"),
    summary = "Get Cart",
    responses(
        (status_code = StatusCode::OK, description = "Cart found"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart not found"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    customer: PathParam<Uuid>,
    validate: QueryParam<bool, false>,
    depot: &mut Depot,
) -> Result<Json<GetCartResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.tenant_uuid_or_400()?;
    let customer = customer.into_inner().into();

    let validation = if validate.into_inner().unwrap_or(false) {
        let result = state
            .app
            .validator
            .validate(tenant, customer)
            .await
            .map_err(into_status_error)?;

        Some(ValidationResponse::from(result))
    } else {
        None
    };

    let cart = state
        .app
        .carts
        .get_cart(tenant, customer)
        .await
        .map_err(into_status_error)?;

    Ok(Json(GetCartResponse {
        cart: cart.into(),
        validation,
    }))
}
