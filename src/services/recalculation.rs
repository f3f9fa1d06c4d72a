use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    entities::{
        product::Entity as ProductEntity,
        variant::{self, Entity as VariantEntity},
    },
    errors::ServiceError,
    models::AuditContext,
    services::costing::{round_money, CostBreakdown, CostEngine, PricingInputs, VariantCostInputs},
};

/// What a recompute did to the cached price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecalcStatus {
    /// The cached price already matched.
    Unchanged,
    Updated,
    /// The computed price was negative and zero was stored instead.
    ClampedToZero,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recalculation {
    pub variant_id: i32,
    pub previous: Decimal,
    pub current: Decimal,
    pub status: RecalcStatus,
    /// Whether `unit_price` was written.
    pub written: bool,
}

/// Keeps `variants.unit_price` equal to the engine's result.
///
/// The associated functions taking a connection run inside the caller's
/// transaction; the methods open their own.
#[derive(Clone)]
pub struct RecalculationCoordinator {
    db: Arc<DatabaseConnection>,
}

impl RecalculationCoordinator {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Recomputes one variant after one of its cost lines changed.
    #[instrument(skip(self, ctx))]
    pub async fn on_cost_line_changed(
        &self,
        ctx: &AuditContext,
        variant_id: i32,
    ) -> Result<Recalculation, ServiceError> {
        let txn = self.db.begin().await?;
        let result = Self::recalculate_variant(&txn, ctx, variant_id).await?;
        txn.commit().await?;
        Ok(result)
    }

    /// Recomputes every variant of a product after its pricing fields changed.
    #[instrument(skip(self, ctx))]
    pub async fn on_product_pricing_changed(
        &self,
        ctx: &AuditContext,
        product_id: i32,
    ) -> Result<Vec<Recalculation>, ServiceError> {
        let txn = self.db.begin().await?;
        let results = Self::recalculate_product(&txn, ctx, product_id).await?;
        txn.commit().await?;
        Ok(results)
    }

    /// Checks a variant's cached price against a fresh computation without
    /// touching it. A mismatch means some write skipped its recompute.
    #[instrument(skip(self))]
    pub async fn verify_variant(&self, variant_id: i32) -> Result<CostBreakdown, ServiceError> {
        Self::verify_variant_in(&*self.db, variant_id).await
    }

    pub async fn verify_variant_in<C: ConnectionTrait>(
        conn: &C,
        variant_id: i32,
    ) -> Result<CostBreakdown, ServiceError> {
        let variant = VariantEntity::find_by_id(variant_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Variant", variant_id))?;

        let inputs = VariantCostInputs::load(conn, &variant).await?;
        inputs.validate()?;
        let breakdown = CostEngine::compute(&inputs);

        if round_money(variant.unit_price) != breakdown.unit_price {
            warn!(
                variant_id,
                cached = %variant.unit_price,
                recomputed = %breakdown.unit_price,
                "Variant price diverged from its cost lines"
            );
            return Err(ServiceError::ConsistencyError {
                entity: "variant",
                id: variant_id,
                cached: variant.unit_price.to_string(),
                recomputed: breakdown.unit_price.to_string(),
            });
        }

        Ok(breakdown)
    }

    /// Locks the variant row, recomputes its price and writes `unit_price`
    /// alone when it changed.
    pub async fn recalculate_variant<C: ConnectionTrait>(
        conn: &C,
        ctx: &AuditContext,
        variant_id: i32,
    ) -> Result<Recalculation, ServiceError> {
        let variant = VariantEntity::find_by_id(variant_id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| {
                error!(variant_id, error = %e, "Failed to lock variant for recompute");
                ServiceError::db_error(e)
            })?
            .ok_or_else(|| ServiceError::not_found("Variant", variant_id))?;

        let inputs = VariantCostInputs::load(conn, &variant).await?;
        Self::apply(conn, ctx, &variant, &inputs).await
    }

    /// Recomputes all variants of a product, loading the product once.
    pub async fn recalculate_product<C: ConnectionTrait>(
        conn: &C,
        ctx: &AuditContext,
        product_id: i32,
    ) -> Result<Vec<Recalculation>, ServiceError> {
        let product = ProductEntity::find_by_id(product_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;
        let pricing = PricingInputs::from(&product);
        pricing.validate()?;

        let variants = VariantEntity::find()
            .filter(variant::Column::ProductId.eq(product.id))
            .order_by_asc(variant::Column::Id)
            .lock_exclusive()
            .all(conn)
            .await?;

        let mut results = Vec::with_capacity(variants.len());
        for variant in &variants {
            let inputs = VariantCostInputs::load_with_pricing(conn, variant.id, pricing).await?;
            results.push(Self::apply(conn, ctx, variant, &inputs).await?);
        }

        let updated = results.iter().filter(|r| r.written).count();
        info!(
            product_id,
            variants = results.len(),
            updated,
            "Product pricing propagated to variants"
        );
        Ok(results)
    }

    async fn apply<C: ConnectionTrait>(
        conn: &C,
        ctx: &AuditContext,
        variant: &variant::Model,
        inputs: &VariantCostInputs,
    ) -> Result<Recalculation, ServiceError> {
        inputs.validate()?;
        let breakdown = CostEngine::compute(inputs);
        let previous = variant.unit_price;
        let current = breakdown.unit_price;

        let written = round_money(previous) != current;
        if written {
            Self::write_unit_price(conn, variant.id, current).await?;
        }

        let status = if breakdown.clamped {
            warn!(
                variant_id = variant.id,
                gross = %breakdown.gross,
                discount = %breakdown.discount,
                "Discount exceeds gross price; unit price clamped to zero"
            );
            RecalcStatus::ClampedToZero
        } else if written {
            RecalcStatus::Updated
        } else {
            RecalcStatus::Unchanged
        };

        if written {
            info!(
                variant_id = variant.id,
                previous = %previous,
                current = %current,
                user_id = ?ctx.user_id,
                "Variant unit price updated"
            );
        } else {
            debug!(variant_id = variant.id, price = %current, "Variant unit price unchanged");
        }

        Ok(Recalculation {
            variant_id: variant.id,
            previous,
            current,
            status,
            written,
        })
    }

    /// Field-only update: touches `unit_price` and nothing else, so no other
    /// write-path logic runs for it.
    async fn write_unit_price<C: ConnectionTrait>(
        conn: &C,
        variant_id: i32,
        price: Decimal,
    ) -> Result<(), ServiceError> {
        VariantEntity::update_many()
            .col_expr(variant::Column::UnitPrice, Expr::value(price))
            .filter(variant::Column::Id.eq(variant_id))
            .exec(conn)
            .await
            .map_err(|e| {
                error!(variant_id, error = %e, "Failed to write variant unit price");
                ServiceError::db_error(e)
            })?;
        Ok(())
    }
}
