use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::Validate;

use crate::{
    entities::{
        product::{self, Entity as ProductEntity},
        sewing_order_item::{self, Entity as SewingOrderItemEntity},
        variant::{self, Entity as VariantEntity},
    },
    errors::ServiceError,
    models::AuditContext,
    services::{
        costing::PricingInputs,
        recalculation::{Recalculation, RecalculationCoordinator},
        variant_lines::delete_variant_lines,
    },
};

/// Base costs and percentages of a product. `None` clears a field, which the
/// engine then reads as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ProductPricing {
    pub cutting_price: Option<Decimal>,
    pub transfer_price: Option<Decimal>,
    pub print_price: Option<Decimal>,
    pub embroidery_price: Option<Decimal>,
    pub sewing_loss_percent: Option<Decimal>,
    pub other_expenses_percent: Option<Decimal>,
    pub profitability_percent: Option<Decimal>,
    pub commission_percent: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
}

impl ProductPricing {
    fn as_inputs(&self) -> PricingInputs {
        PricingInputs {
            cutting: self.cutting_price.unwrap_or_default(),
            transfer: self.transfer_price.unwrap_or_default(),
            print: self.print_price.unwrap_or_default(),
            embroidery: self.embroidery_price.unwrap_or_default(),
            sewing_loss_percent: self.sewing_loss_percent.unwrap_or_default(),
            other_expenses_percent: self.other_expenses_percent.unwrap_or_default(),
            profitability_percent: self.profitability_percent.unwrap_or_default(),
            commission_percent: self.commission_percent.unwrap_or_default(),
            discount_percent: self.discount_percent.unwrap_or_default(),
        }
    }

    fn apply(&self, active: &mut product::ActiveModel) {
        active.cutting_price = Set(self.cutting_price);
        active.transfer_price = Set(self.transfer_price);
        active.print_price = Set(self.print_price);
        active.embroidery_price = Set(self.embroidery_price);
        active.sewing_loss_percent = Set(self.sewing_loss_percent);
        active.other_expenses_percent = Set(self.other_expenses_percent);
        active.profitability_percent = Set(self.profitability_percent);
        active.commission_percent = Set(self.commission_percent);
        active.discount_percent = Set(self.discount_percent);
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub vendor_code: String,
    #[validate(length(max = 32))]
    #[serde(default)]
    pub season: String,
    pub category_id: Option<i32>,
    #[serde(flatten)]
    pub pricing: ProductPricing,
}

/// Result of a pricing change: the stored product and what happened to each variant.
#[derive(Debug, Clone)]
pub struct PricingChange {
    pub product: product::Model,
    pub recalculations: Vec<Recalculation>,
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: i32) -> Result<product::Model, ServiceError> {
        ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))
    }

    #[instrument(skip(self, ctx, input), fields(vendor_code = %input.vendor_code))]
    pub async fn create_product(
        &self,
        ctx: &AuditContext,
        input: NewProduct,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        input.pricing.as_inputs().validate()?;

        let now = ctx.now();
        let mut active = product::ActiveModel {
            name: Set(input.name),
            vendor_code: Set(input.vendor_code),
            season: Set(input.season),
            category_id: Set(input.category_id),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(ctx.user_id),
            updated_by: Set(ctx.user_id),
            ..Default::default()
        };
        input.pricing.apply(&mut active);

        let created = active.insert(&*self.db).await.map_err(|e| {
            error!("Failed to create product: {}", e);
            ServiceError::db_error(e)
        })?;

        info!(product_id = created.id, "Product created");
        Ok(created)
    }

    /// Stores new pricing and re-prices every variant of the product in the
    /// same transaction. Negative fields are rejected before anything is written.
    #[instrument(skip(self, ctx, pricing))]
    pub async fn update_pricing(
        &self,
        ctx: &AuditContext,
        product_id: i32,
        pricing: ProductPricing,
    ) -> Result<PricingChange, ServiceError> {
        pricing.as_inputs().validate()?;

        let txn = self.db.begin().await?;
        let existing = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;

        let mut active: product::ActiveModel = existing.into();
        pricing.apply(&mut active);
        active.updated_at = Set(ctx.now());
        active.updated_by = Set(ctx.user_id);
        let product = active.update(&txn).await.map_err(|e| {
            error!(product_id, error = %e, "Failed to update product pricing");
            ServiceError::db_error(e)
        })?;

        let recalculations = RecalculationCoordinator::recalculate_product(&txn, ctx, product_id).await?;
        txn.commit().await?;

        Ok(PricingChange {
            product,
            recalculations,
        })
    }

    /// Deletes a product with its variants. Refused while any variant is on an order.
    #[instrument(skip(self, ctx))]
    pub async fn delete_product(&self, ctx: &AuditContext, product_id: i32) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let existing = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;

        let variants = existing.find_related(VariantEntity).all(&txn).await?;
        let variant_ids: Vec<i32> = variants.iter().map(|v| v.id).collect();

        if !variant_ids.is_empty() {
            let referenced = SewingOrderItemEntity::find()
                .filter(sewing_order_item::Column::VariantId.is_in(variant_ids.clone()))
                .count(&txn)
                .await?;
            if referenced > 0 {
                return Err(ServiceError::Conflict(format!(
                    "product {} has variants used by {} order item(s)",
                    product_id, referenced
                )));
            }
        }

        for variant_id in &variant_ids {
            delete_variant_lines(&txn, *variant_id).await?;
        }
        VariantEntity::delete_many()
            .filter(variant::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
        existing.delete(&txn).await?;
        txn.commit().await?;

        info!(product_id, variants = variant_ids.len(), user_id = ?ctx.user_id, "Product deleted");
        Ok(())
    }
}
