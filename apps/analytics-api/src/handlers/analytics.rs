//! Analytics endpoints.
//!
//! ```text
//! GET /analytics/profit-breakdown?date_from&date_to&staff_id[&company_id]
//! GET /analytics/metrics?date_from&date_to[&company_id]
//! GET /analytics/staff-activity?date_from&date_to[&company_id]
//! GET /analytics/activity?limit[&company_id]
//! ```
//!
//! `company_id` is honoured for system admins only; everyone else reports
//! on their own company.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use tally_core::report::{PeriodBucket, ReportTotals};
use tally_core::types::{Identity, ReportPolicy, RequestContext};
use tally_core::validation::{validate_identifier, validate_limit};
use tally_core::{DateRange, ValidationError};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::activity::{recent_activity, ActivityItem};
use crate::services::cost_resolver::CostResolver;
use crate::services::metrics::{metrics as build_metrics, MetricsReport};
use crate::services::reconciler::profit_report;
use crate::services::staff::{staff_activity as build_staff_activity, StaffActivity};
use crate::services::ReportSession;
use crate::AppState;

// =============================================================================
// Query Parameters
// =============================================================================

/// Query string shared by the range reports. Dates that do not parse fall
/// back to the default range rather than failing.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub staff_id: Option<String>,
    pub company_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<String>,
    pub company_id: Option<String>,
}

/// Turns identity and query string into the request context.
pub fn request_context(
    identity: &Identity,
    query: &ReportQuery,
    policy: &ReportPolicy,
) -> ApiResult<RequestContext> {
    let requested = validate_identifier("company_id", query.company_id.as_deref())?;
    let company_id = identity.resolve_company(requested.as_deref())?;
    let staff_filter = validate_identifier("staff_id", query.staff_id.as_deref())?;

    let range = DateRange::resolve(
        query.date_from.as_deref(),
        query.date_to.as_deref(),
        Utc::now().date_naive(),
        policy.default_range_days,
    )?;

    Ok(RequestContext {
        company_id,
        role: identity.role,
        range,
        staff_filter,
    })
}

fn parse_limit(raw: Option<&str>, default: i64) -> ApiResult<i64> {
    let limit = match raw.map(str::trim).filter(|l| !l.is_empty()) {
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| ValidationError::InvalidFormat {
            field: "limit".to_string(),
            reason: "must be a whole number".to_string(),
        })?),
        None => None,
    };
    Ok(validate_limit(limit, default)?)
}

async fn open_session(state: &AppState, identity: &Identity, query: &ReportQuery) -> ApiResult<ReportSession> {
    let policy = state.config.policy;
    let ctx = request_context(identity, query, &policy)?;
    Ok(ReportSession::open(&state.db, ctx, policy).await?)
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ProfitBreakdownResponse {
    pub success: bool,
    pub daily: Vec<PeriodBucket>,
    pub weekly: Vec<PeriodBucket>,
    pub monthly: Vec<PeriodBucket>,
    pub totals: ReportTotals,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub metrics: MetricsReport,
}

#[derive(Debug, Serialize)]
pub struct StaffActivityResponse {
    pub success: bool,
    #[serde(flatten)]
    pub activity: StaffActivity,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub success: bool,
    pub activities: Vec<ActivityItem>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Daily, weekly and monthly profit with reconciled totals.
pub async fn profit_breakdown(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<ProfitBreakdownResponse>> {
    let session = open_session(&state, &identity, &query).await?;
    let resolver = CostResolver::load(&session).await;
    let report = profit_report(&session, &resolver).await?;

    Ok(Json(ProfitBreakdownResponse {
        success: true,
        daily: report.breakdown.daily,
        weekly: report.breakdown.weekly,
        monthly: report.breakdown.monthly,
        totals: report.totals,
    }))
}

/// Module sections and the reconciled profit.
pub async fn metrics(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<MetricsResponse>> {
    let query = ReportQuery {
        staff_id: None,
        ..query
    };
    let session = open_session(&state, &identity, &query).await?;
    let metrics = build_metrics(&session).await?;

    Ok(Json(MetricsResponse {
        success: true,
        metrics,
    }))
}

/// Per-cashier and per-technician figures.
pub async fn staff_activity(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<StaffActivityResponse>> {
    let session = open_session(&state, &identity, &query).await?;
    let activity = build_staff_activity(&session).await?;

    Ok(Json(StaffActivityResponse {
        success: true,
        activity,
    }))
}

/// Latest sales, repairs and swaps.
pub async fn activity(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<ActivityResponse>> {
    let limit = parse_limit(query.limit.as_deref(), state.config.activity_limit)?;
    let report_query = ReportQuery {
        company_id: query.company_id,
        ..ReportQuery::default()
    };
    let session = open_session(&state, &identity, &report_query).await?;
    let activities = recent_activity(&session, limit).await?;

    Ok(Json(ActivityResponse {
        success: true,
        activities,
    }))
}
