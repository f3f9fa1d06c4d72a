use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, QuerySelect};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    entities::{
        sewing_order::{self, Entity as SewingOrderEntity},
        variant::{self, Entity as VariantEntity},
    },
    errors::ServiceError,
    services::{order_aggregator::OrderAggregator, recalculation::RecalculationCoordinator},
};

/// Result of a full scan. Divergences are reported, never repaired.
#[derive(Debug, Default, Serialize)]
pub struct AuditReport {
    pub variants_checked: usize,
    pub orders_checked: usize,
    pub issues: Vec<ServiceError>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Read-only scan for cached prices and totals that drifted from their inputs.
#[derive(Clone)]
pub struct ConsistencyAuditor {
    db: Arc<DatabaseConnection>,
}

impl ConsistencyAuditor {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Checks every variant and order. Database failures abort the scan;
    /// consistency and validation problems are collected into the report.
    #[instrument(skip(self))]
    pub async fn audit(&self) -> Result<AuditReport, ServiceError> {
        let db = &*self.db;
        let mut report = AuditReport::default();

        let variant_ids: Vec<i32> = VariantEntity::find()
            .select_only()
            .column(variant::Column::Id)
            .order_by_asc(variant::Column::Id)
            .into_tuple()
            .all(db)
            .await?;
        for id in variant_ids {
            report.variants_checked += 1;
            match RecalculationCoordinator::verify_variant_in(db, id).await {
                Ok(_) => {}
                Err(e @ ServiceError::DatabaseError(_)) => return Err(e),
                Err(e) => report.issues.push(e),
            }
        }

        let order_ids: Vec<i32> = SewingOrderEntity::find()
            .select_only()
            .column(sewing_order::Column::Id)
            .order_by_asc(sewing_order::Column::Id)
            .into_tuple()
            .all(db)
            .await?;
        for id in order_ids {
            report.orders_checked += 1;
            match OrderAggregator::verify_order_in(db, id).await {
                Ok(_) => {}
                Err(e @ ServiceError::DatabaseError(_)) => return Err(e),
                Err(e) => report.issues.push(e),
            }
        }

        if report.is_clean() {
            info!(
                variants = report.variants_checked,
                orders = report.orders_checked,
                "Consistency audit clean"
            );
        } else {
            warn!(
                variants = report.variants_checked,
                orders = report.orders_checked,
                issues = report.issues.len(),
                "Consistency audit found divergent totals"
            );
        }
        Ok(report)
    }
}
