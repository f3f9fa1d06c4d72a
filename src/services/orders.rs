use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    EntityTrait, ModelTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::Validate;

use crate::{
    entities::{
        order_size_count::{self, Entity as OrderSizeCountEntity},
        sewing_order::{self, Entity as SewingOrderEntity},
        sewing_order_item::{self, Entity as SewingOrderItemEntity},
        variant::Entity as VariantEntity,
    },
    errors::ServiceError,
    models::{AuditContext, OrderStatus, OrderType},
    services::{
        costing::{check_range, round_money, MAX_MONEY},
        order_aggregator::{OrderAggregator, OrderTotals},
    },
};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewOrder {
    pub customer_id: i32,
    pub buyer_id: Option<i32>,
    pub shipment_date: Option<NaiveDate>,
    #[serde(default)]
    pub order_type: OrderType,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewOrderItem {
    pub variant_id: i32,
    /// Left empty (or zero) to snapshot the variant's current price.
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub status: OrderStatus,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct OrderItemUpdate {
    pub unit_price: Option<Decimal>,
    pub status: Option<OrderStatus>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// A written order item together with the order totals it produced.
#[derive(Debug, Clone)]
pub struct ItemChange {
    pub item: sewing_order_item::Model,
    pub totals: OrderTotals,
}

fn check_price(price: Option<Decimal>) -> Result<(), ServiceError> {
    price.map_or(Ok(()), |p| check_range("unit price", p, MAX_MONEY))
}

/// Write path for sewing orders, their items and per-size counts. Every
/// mutation recomputes the order totals in the same transaction.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i32) -> Result<sewing_order::Model, ServiceError> {
        SewingOrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))
    }

    #[instrument(skip(self))]
    pub async fn items(&self, order_id: i32) -> Result<Vec<sewing_order_item::Model>, ServiceError> {
        Ok(SewingOrderItemEntity::find()
            .filter(sewing_order_item::Column::OrderId.eq(order_id))
            .order_by_asc(sewing_order_item::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn size_counts(&self, item_id: i32) -> Result<Vec<order_size_count::Model>, ServiceError> {
        Ok(OrderSizeCountEntity::find()
            .filter(order_size_count::Column::ItemId.eq(item_id))
            .order_by_asc(order_size_count::Column::SizeId)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, ctx, input), fields(customer_id = input.customer_id))]
    pub async fn create_order(
        &self,
        ctx: &AuditContext,
        input: NewOrder,
    ) -> Result<sewing_order::Model, ServiceError> {
        input.validate()?;

        let now = ctx.now();
        let created = sewing_order::ActiveModel {
            customer_id: Set(input.customer_id),
            buyer_id: Set(input.buyer_id),
            shipment_date: Set(input.shipment_date),
            order_type: Set(input.order_type),
            status: Set(OrderStatus::New),
            total_qty: Set(0),
            total_amount: Set(Decimal::ZERO),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(ctx.user_id),
            updated_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            error!("Failed to create order: {}", e);
            ServiceError::db_error(e)
        })?;

        info!(order_id = created.id, "Order created");
        Ok(created)
    }

    #[instrument(skip(self, ctx))]
    pub async fn set_status(
        &self,
        ctx: &AuditContext,
        order_id: i32,
        status: OrderStatus,
    ) -> Result<sewing_order::Model, ServiceError> {
        let existing = self.get_order(order_id).await?;
        let previous = existing.status;

        let mut active: sewing_order::ActiveModel = existing.into();
        active.status = Set(status);
        active.updated_at = Set(ctx.now());
        active.updated_by = Set(ctx.user_id);
        let updated = active.update(&*self.db).await?;

        info!(order_id, from = %previous, to = %status, "Order status changed");
        Ok(updated)
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete_order(&self, ctx: &AuditContext, order_id: i32) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let existing = SewingOrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))?;

        let items = existing.find_related(SewingOrderItemEntity).all(&txn).await?;
        let item_ids: Vec<i32> = items.iter().map(|i| i.id).collect();
        if !item_ids.is_empty() {
            OrderSizeCountEntity::delete_many()
                .filter(order_size_count::Column::ItemId.is_in(item_ids.clone()))
                .exec(&txn)
                .await?;
            SewingOrderItemEntity::delete_many()
                .filter(sewing_order_item::Column::OrderId.eq(order_id))
                .exec(&txn)
                .await?;
        }
        existing.delete(&txn).await?;
        txn.commit().await?;

        info!(order_id, items = item_ids.len(), user_id = ?ctx.user_id, "Order deleted");
        Ok(())
    }

    /// Adds a variant to an order. Without an explicit price the item takes a
    /// snapshot of the variant's current unit price, which later variant
    /// repricing does not touch.
    #[instrument(skip(self, ctx, input), fields(variant_id = input.variant_id))]
    pub async fn add_item(
        &self,
        ctx: &AuditContext,
        order_id: i32,
        input: NewOrderItem,
    ) -> Result<ItemChange, ServiceError> {
        input.validate()?;
        check_price(input.unit_price)?;

        let txn = self.db.begin().await?;
        SewingOrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))?;
        let variant = VariantEntity::find_by_id(input.variant_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Variant", input.variant_id))?;

        let unit_price = match input.unit_price {
            Some(price) if !price.is_zero() => round_money(price),
            _ => round_money(variant.unit_price),
        };

        let now = ctx.now();
        let item = sewing_order_item::ActiveModel {
            order_id: Set(order_id),
            variant_id: Set(variant.id),
            quantity: Set(0),
            unit_price: Set(unit_price),
            status: Set(input.status),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let totals = OrderAggregator::recompute_order_in(&txn, order_id).await?;
        txn.commit().await?;

        info!(order_id, item_id = item.id, unit_price = %unit_price, "Order item added");
        Ok(ItemChange { item, totals })
    }

    #[instrument(skip(self, ctx, update))]
    pub async fn update_item(
        &self,
        ctx: &AuditContext,
        item_id: i32,
        update: OrderItemUpdate,
    ) -> Result<ItemChange, ServiceError> {
        update.validate()?;
        check_price(update.unit_price)?;

        let txn = self.db.begin().await?;
        let existing = SewingOrderItemEntity::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order item", item_id))?;
        let order_id = existing.order_id;

        let mut active: sewing_order_item::ActiveModel = existing.into();
        if let Some(price) = update.unit_price {
            active.unit_price = Set(round_money(price));
        }
        if let Some(status) = update.status {
            active.status = Set(status);
        }
        if let Some(notes) = update.notes {
            active.notes = Set(Some(notes));
        }
        active.updated_at = Set(ctx.now());
        active.update(&txn).await?;

        let totals = OrderAggregator::recompute_order_in(&txn, order_id).await?;
        let item = reload_item(&txn, item_id).await?;
        txn.commit().await?;
        Ok(ItemChange { item, totals })
    }

    /// Re-snapshots an item's price from its variant. The only path by which
    /// a variant price change reaches an existing order.
    #[instrument(skip(self, ctx))]
    pub async fn refresh_item_price(&self, ctx: &AuditContext, item_id: i32) -> Result<ItemChange, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = SewingOrderItemEntity::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order item", item_id))?;
        let variant = VariantEntity::find_by_id(existing.variant_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Variant", existing.variant_id))?;
        let order_id = existing.order_id;
        let previous = existing.unit_price;
        let current = round_money(variant.unit_price);

        if round_money(previous) != current {
            SewingOrderItemEntity::update_many()
                .col_expr(sewing_order_item::Column::UnitPrice, Expr::value(current))
                .col_expr(sewing_order_item::Column::UpdatedAt, Expr::value(ctx.now()))
                .filter(sewing_order_item::Column::Id.eq(item_id))
                .exec(&txn)
                .await?;
            info!(item_id, previous = %previous, current = %current, "Order item price refreshed");
        }

        let totals = OrderAggregator::recompute_order_in(&txn, order_id).await?;
        let item = reload_item(&txn, item_id).await?;
        txn.commit().await?;
        Ok(ItemChange { item, totals })
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete_item(&self, ctx: &AuditContext, item_id: i32) -> Result<OrderTotals, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = SewingOrderItemEntity::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order item", item_id))?;
        let order_id = existing.order_id;

        OrderSizeCountEntity::delete_many()
            .filter(order_size_count::Column::ItemId.eq(item_id))
            .exec(&txn)
            .await?;
        existing.delete(&txn).await?;

        let totals = OrderAggregator::recompute_order_in(&txn, order_id).await?;
        txn.commit().await?;

        info!(order_id, item_id, user_id = ?ctx.user_id, "Order item deleted");
        Ok(totals)
    }

    /// Sets the quantity of one size on an item. Zero removes the row.
    #[instrument(skip(self, ctx))]
    pub async fn set_size_count(
        &self,
        ctx: &AuditContext,
        item_id: i32,
        size_id: i32,
        quantity: i32,
    ) -> Result<OrderTotals, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(format!(
                "size quantity must not be negative, got {}",
                quantity
            )));
        }

        let txn = self.db.begin().await?;
        let item = SewingOrderItemEntity::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order item", item_id))?;

        let existing = OrderSizeCountEntity::find()
            .filter(order_size_count::Column::ItemId.eq(item_id))
            .filter(order_size_count::Column::SizeId.eq(size_id))
            .one(&txn)
            .await?;

        match (existing, quantity) {
            (Some(row), 0) => {
                row.delete(&txn).await?;
            }
            (None, 0) => {}
            (Some(row), qty) => {
                let mut active: order_size_count::ActiveModel = row.into();
                active.quantity = Set(qty);
                active.update(&txn).await?;
            }
            (None, qty) => {
                order_size_count::ActiveModel {
                    item_id: Set(item_id),
                    size_id: Set(size_id),
                    quantity: Set(qty),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }

        let totals = OrderAggregator::recompute_order_in(&txn, item.order_id).await?;
        txn.commit().await?;

        info!(item_id, size_id, quantity, user_id = ?ctx.user_id, "Size count set");
        Ok(totals)
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete_size_count(
        &self,
        ctx: &AuditContext,
        item_id: i32,
        size_id: i32,
    ) -> Result<OrderTotals, ServiceError> {
        self.set_size_count(ctx, item_id, size_id, 0).await
    }
}

async fn reload_item<C: sea_orm::ConnectionTrait>(
    conn: &C,
    item_id: i32,
) -> Result<sewing_order_item::Model, ServiceError> {
    SewingOrderItemEntity::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Order item", item_id))
}
