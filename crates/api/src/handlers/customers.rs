//! Handlers for the `/customers` resource and its consent history.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use salon_core::checkout::{normalize_email, normalize_phone};
use salon_core::consent::{current_consents, ConsentAction, ConsentType};
use salon_core::error::CoreError;
use salon_core::types::DbId;
use salon_db::models::customer::{ConsentRecord, CreateCustomer, Customer, UpdateCustomer};
use salon_db::repositories::customer_repo::DEFAULT_SEARCH_LIMIT;
use salon_db::repositories::{ConsentRepo, CustomerRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthStaff;
use crate::query::SearchParams;
use crate::response::DataResponse;
use crate::state::AppState;

const MAX_SEARCH_LIMIT: i64 = 200;

/// `source` for consents recorded by staff.
const BACKOFFICE_SOURCE: &str = "backoffice";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /customers`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Body of `PATCH /customers/{id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Body of `POST /customers/{id}/consents`.
#[derive(Debug, Deserialize)]
pub struct RecordConsentRequest {
    pub consent_type: ConsentType,
    pub action: ConsentAction,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConsentState {
    /// Latest action per type, `true` when granted.
    pub current: BTreeMap<ConsentType, bool>,
    pub history: Vec<ConsentRecord>,
}

impl ConsentState {
    fn from_history(history: Vec<ConsentRecord>) -> Self {
        let events: Vec<_> = history.iter().filter_map(ConsentRecord::event).collect();
        Self {
            current: current_consents(&events),
            history,
        }
    }
}

fn normalized_phone(raw: Option<&str>) -> AppResult<Option<String>> {
    match raw {
        None => Ok(None),
        Some(raw) => normalize_phone(raw).map(Some).ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!("Invalid phone number: {raw}")))
        }),
    }
}

async fn load_customer(state: &AppState, auth: &AuthStaff, id: DbId) -> AppResult<Customer> {
    CustomerRepo::find_at_location(&state.pool, auth.location_id, id, state.memberships.customers)
        .await?
        .ok_or(AppError::not_found("Customer", id))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/customers?q=&limit=
pub async fn list(
    auth: AuthStaff,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<DataResponse<Vec<Customer>>>> {
    let q = params.q.as_deref().map(str::trim).unwrap_or_default();
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    let customers = CustomerRepo::search(
        &state.pool,
        auth.location_id,
        q,
        limit,
        state.memberships.customers,
    )
    .await?;
    Ok(Json(DataResponse { data: customers }))
}

/// POST /api/v1/customers
pub async fn create(
    auth: AuthStaff,
    State(state): State<AppState>,
    Json(input): Json<CreateCustomerRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Customer>>)> {
    input.validate()?;
    let create = CreateCustomer {
        first_name: input.first_name.trim().to_string(),
        last_name: input.last_name.trim().to_string(),
        email: input.email.as_deref().and_then(normalize_email),
        phone: normalized_phone(input.phone.as_deref())?,
        notes: input.notes,
        metadata: input.metadata,
    };

    let mut conn = state.pool.acquire().await?;
    let customer = CustomerRepo::create(&mut *conn, auth.location_id, &create).await?;
    tracing::info!(customer_id = customer.id, location_id = auth.location_id, "Customer created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: customer })))
}

/// GET /api/v1/customers/{id}
pub async fn get_by_id(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Customer>>> {
    let customer = load_customer(&state, &auth, id).await?;
    Ok(Json(DataResponse { data: customer }))
}

/// PATCH /api/v1/customers/{id}
pub async fn update(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCustomerRequest>,
) -> AppResult<Json<DataResponse<Customer>>> {
    input.validate()?;
    load_customer(&state, &auth, id).await?;

    let update = UpdateCustomer {
        first_name: input.first_name.map(|s| s.trim().to_string()),
        last_name: input.last_name.map(|s| s.trim().to_string()),
        email: input.email.as_deref().and_then(normalize_email),
        phone: normalized_phone(input.phone.as_deref())?,
        notes: input.notes,
        metadata: input.metadata,
    };
    let customer = CustomerRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(AppError::not_found("Customer", id))?;
    Ok(Json(DataResponse { data: customer }))
}

/// GET /api/v1/customers/{id}/consents
pub async fn list_consents(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ConsentState>>> {
    load_customer(&state, &auth, id).await?;
    let history = ConsentRepo::list_for_customer(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: ConsentState::from_history(history),
    }))
}

/// POST /api/v1/customers/{id}/consents
///
/// Append a GRANTED or REVOKED event and return the resulting state.
pub async fn record_consent(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RecordConsentRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ConsentState>>)> {
    load_customer(&state, &auth, id).await?;
    let source = input
        .source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(BACKOFFICE_SOURCE);

    let mut conn = state.pool.acquire().await?;
    ConsentRepo::record(&mut *conn, id, input.consent_type, input.action, source).await?;
    drop(conn);

    tracing::info!(
        customer_id = id,
        staff_id = auth.staff_id,
        consent_type = input.consent_type.as_str(),
        action = input.action.as_str(),
        "Consent recorded"
    );
    let history = ConsentRepo::list_for_customer(&state.pool, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ConsentState::from_history(history),
        }),
    ))
}
