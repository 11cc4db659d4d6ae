//! Report services.
//!
//! Each service reads through tally-db and prices through tally-core. A
//! [`ReportSession`] is opened once per request and carries everything the
//! services share: the probed schema, the module flags and the request
//! context.
//!
//! ```text
//! handler ──► ReportSession::open ──┬── CostResolver   (catalogue, once)
//!                                   ├── Bucketizer     (daily/weekly/monthly)
//!                                   ├── Reconciler     (totals)
//!                                   ├── metrics / staff / activity
//!                                   └── degraded()     (optional sub-queries)
//! ```

pub mod activity;
pub mod bucketizer;
pub mod cost_resolver;
pub mod metrics;
pub mod reconciler;
pub mod staff;

use tracing::{debug, warn};

use tally_core::types::{ModuleKey, ModuleSet, ReportPolicy, RequestContext};
use tally_db::{Database, DbResult, SalesScope, SchemaCapabilities};

/// Per-request reporting state.
#[derive(Debug, Clone)]
pub struct ReportSession {
    pub db: Database,
    pub caps: SchemaCapabilities,
    pub ctx: RequestContext,
    pub modules: ModuleSet,
    pub policy: ReportPolicy,
}

impl ReportSession {
    /// Probes the schema and resolves module flags for the request's company.
    ///
    /// A system admin sees every module regardless of the company's flags.
    pub async fn open(db: &Database, ctx: RequestContext, policy: ReportPolicy) -> DbResult<Self> {
        let caps = db.capabilities().await?;

        let modules = if ctx.role.is_system_admin() {
            ModuleSet::all()
        } else {
            degraded(
                "module_flags",
                db.modules().enabled_modules(&ctx.company_id, &caps).await,
            )
        };

        debug!(
            company_id = %ctx.company_id,
            from = %ctx.range.from,
            to = %ctx.range.to,
            staff_id = ?ctx.staff_filter,
            ?modules,
            "Report session opened"
        );

        Ok(ReportSession {
            db: db.clone(),
            caps,
            ctx,
            modules,
            policy,
        })
    }

    /// Pure sales of the whole range, narrowed to the staff filter if any.
    pub fn scope(&self) -> SalesScope {
        SalesScope::new(
            self.ctx.company_id.clone(),
            self.ctx.range.window(),
            self.ctx.staff_filter.clone(),
        )
    }

    pub fn module_enabled(&self, key: ModuleKey) -> bool {
        self.modules.is_enabled(key)
    }

    pub fn company_id(&self) -> &str {
        &self.ctx.company_id
    }
}

/// Unwraps an optional sub-aggregate, falling back to its empty value.
///
/// Only the primary sales query may fail a report; everything else lands
/// here.
pub fn degraded<T: Default>(stage: &'static str, result: DbResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(error) => {
            warn!(stage, %error, "Sub-aggregate failed, using empty value");
            T::default()
        }
    }
}
