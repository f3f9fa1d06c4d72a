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
        order_size_count::{self, Entity as OrderSizeCountEntity},
        sewing_order::{self, Entity as SewingOrderEntity},
        sewing_order_item::{self, Entity as SewingOrderItemEntity},
    },
    errors::ServiceError,
    services::costing::round_money,
};

/// Derived totals of one order item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemTotals {
    pub item_id: i32,
    pub qty: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Derived totals of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub order_id: i32,
    pub total_qty: i32,
    pub total_amount: Decimal,
    pub items: Vec<ItemTotals>,
    /// Whether the cached totals on the order row were rewritten.
    pub written: bool,
}

/// Sums size counts into item quantities and items into order totals.
pub fn item_totals(item_id: i32, unit_price: Decimal, quantities: &[i32]) -> Result<ItemTotals, ServiceError> {
    let qty = checked_sum(quantities.iter().map(|q| i64::from(*q)), "item", item_id)?;
    Ok(ItemTotals {
        item_id,
        qty,
        unit_price,
        line_total: Decimal::from(qty) * unit_price,
    })
}

pub fn order_totals(order_id: i32, items: &[ItemTotals]) -> Result<(i32, Decimal), ServiceError> {
    let total_qty = checked_sum(items.iter().map(|i| i64::from(i.qty)), "order", order_id)?;
    let total_amount: Decimal = items.iter().map(|i| i.line_total).sum();
    if total_qty < 0 || total_amount < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "order {} totals must not be negative (qty {}, amount {})",
            order_id, total_qty, total_amount
        )));
    }
    Ok((total_qty, total_amount))
}

fn checked_sum(
    values: impl Iterator<Item = i64>,
    entity: &str,
    id: i32,
) -> Result<i32, ServiceError> {
    let sum: i64 = values.sum();
    i32::try_from(sum).map_err(|_| {
        ServiceError::ValidationError(format!("{} {} quantity {} is out of range", entity, id, sum))
    })
}

/// Keeps `sewing_order_items.quantity` and the order totals in step with size counts.
#[derive(Clone)]
pub struct OrderAggregator {
    db: Arc<DatabaseConnection>,
}

impl OrderAggregator {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Recomputes one item, then its order.
    #[instrument(skip(self))]
    pub async fn recompute_item(&self, item_id: i32) -> Result<ItemTotals, ServiceError> {
        let txn = self.db.begin().await?;
        let item = SewingOrderItemEntity::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order item", item_id))?;
        let totals = Self::recompute_order_in(&txn, item.order_id).await?;
        txn.commit().await?;

        totals
            .items
            .into_iter()
            .find(|i| i.item_id == item_id)
            .ok_or_else(|| ServiceError::not_found("Order item", item_id))
    }

    #[instrument(skip(self))]
    pub async fn recompute_order(&self, order_id: i32) -> Result<OrderTotals, ServiceError> {
        let txn = self.db.begin().await?;
        let totals = Self::recompute_order_in(&txn, order_id).await?;
        txn.commit().await?;
        Ok(totals)
    }

    /// Compares cached quantities and totals with the size counts, without writing.
    #[instrument(skip(self))]
    pub async fn verify_order(&self, order_id: i32) -> Result<OrderTotals, ServiceError> {
        Self::verify_order_in(&*self.db, order_id).await
    }

    pub async fn verify_order_in<C: ConnectionTrait>(
        conn: &C,
        order_id: i32,
    ) -> Result<OrderTotals, ServiceError> {
        let order = SewingOrderEntity::find_by_id(order_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))?;
        let items = load_items(conn, order_id).await?;

        let mut totals = Vec::with_capacity(items.len());
        for item in &items {
            let item_totals = compute_item(conn, item).await?;
            if item.quantity != item_totals.qty {
                warn!(item_id = item.id, cached = item.quantity, recomputed = item_totals.qty, "Order item quantity diverged");
                return Err(ServiceError::ConsistencyError {
                    entity: "order_item",
                    id: item.id,
                    cached: item.quantity.to_string(),
                    recomputed: item_totals.qty.to_string(),
                });
            }
            totals.push(item_totals);
        }

        let (total_qty, total_amount) = order_totals(order_id, &totals)?;
        if order.total_qty != total_qty || round_money(order.total_amount) != total_amount {
            warn!(
                order_id,
                cached_qty = order.total_qty,
                cached_amount = %order.total_amount,
                total_qty,
                total_amount = %total_amount,
                "Order totals diverged"
            );
            return Err(ServiceError::ConsistencyError {
                entity: "order",
                id: order_id,
                cached: format!("{} / {}", order.total_qty, order.total_amount),
                recomputed: format!("{} / {}", total_qty, total_amount),
            });
        }

        Ok(OrderTotals {
            order_id,
            total_qty,
            total_amount,
            items: totals,
            written: false,
        })
    }

    /// Locks the order, refreshes every item's cached quantity from its size
    /// counts and rewrites the order totals when they changed.
    pub async fn recompute_order_in<C: ConnectionTrait>(
        conn: &C,
        order_id: i32,
    ) -> Result<OrderTotals, ServiceError> {
        let order = SewingOrderEntity::find_by_id(order_id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| {
                error!(order_id, error = %e, "Failed to lock order for recompute");
                ServiceError::db_error(e)
            })?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))?;

        let items = load_items(conn, order_id).await?;
        let mut totals = Vec::with_capacity(items.len());
        for item in &items {
            let item_totals = compute_item(conn, item).await?;
            if item.quantity != item_totals.qty {
                SewingOrderItemEntity::update_many()
                    .col_expr(sewing_order_item::Column::Quantity, Expr::value(item_totals.qty))
                    .filter(sewing_order_item::Column::Id.eq(item.id))
                    .exec(conn)
                    .await?;
                debug!(item_id = item.id, qty = item_totals.qty, "Order item quantity updated");
            }
            totals.push(item_totals);
        }

        let (total_qty, total_amount) = order_totals(order_id, &totals)?;
        let written =
            order.total_qty != total_qty || round_money(order.total_amount) != total_amount;
        if written {
            SewingOrderEntity::update_many()
                .col_expr(sewing_order::Column::TotalQty, Expr::value(total_qty))
                .col_expr(sewing_order::Column::TotalAmount, Expr::value(total_amount))
                .filter(sewing_order::Column::Id.eq(order_id))
                .exec(conn)
                .await
                .map_err(|e| {
                    error!(order_id, error = %e, "Failed to write order totals");
                    ServiceError::db_error(e)
                })?;
            info!(order_id, total_qty, total_amount = %total_amount, "Order totals updated");
        } else {
            debug!(order_id, "Order totals unchanged");
        }

        Ok(OrderTotals {
            order_id,
            total_qty,
            total_amount,
            items: totals,
            written,
        })
    }
}

async fn load_items<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<Vec<sewing_order_item::Model>, ServiceError> {
    Ok(SewingOrderItemEntity::find()
        .filter(sewing_order_item::Column::OrderId.eq(order_id))
        .order_by_asc(sewing_order_item::Column::Id)
        .all(conn)
        .await?)
}

async fn compute_item<C: ConnectionTrait>(
    conn: &C,
    item: &sewing_order_item::Model,
) -> Result<ItemTotals, ServiceError> {
    let quantities: Vec<i32> = OrderSizeCountEntity::find()
        .select_only()
        .column(order_size_count::Column::Quantity)
        .filter(order_size_count::Column::ItemId.eq(item.id))
        .into_tuple::<i32>()
        .all(conn)
        .await?;
    item_totals(item.id, round_money(item.unit_price), &quantities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn item_quantity_is_sum_of_sizes() {
        let totals = item_totals(1, dec!(22.54), &[5, 3]).unwrap();
        assert_eq!(totals.qty, 8);
        assert_eq!(totals.line_total, dec!(180.32));
    }

    #[test]
    fn item_without_sizes_is_zero() {
        let totals = item_totals(1, dec!(22.54), &[]).unwrap();
        assert_eq!(totals.qty, 0);
        assert_eq!(totals.line_total, Decimal::ZERO);
    }

    #[test]
    fn order_sums_items() {
        let a = item_totals(1, dec!(22.54), &[5, 3]).unwrap();
        let b = item_totals(2, dec!(22.54), &[5, 3]).unwrap();
        assert_eq!(order_totals(9, &[a, b]).unwrap(), (16, dec!(360.64)));
    }

    #[test]
    fn negative_totals_are_rejected() {
        let bad = ItemTotals {
            item_id: 1,
            qty: 2,
            unit_price: dec!(-1),
            line_total: dec!(-2),
        };
        assert!(matches!(order_totals(1, &[bad]), Err(ServiceError::ValidationError(_))));
    }

    #[test]
    fn quantity_overflow_is_rejected() {
        assert!(item_totals(1, dec!(1), &[i32::MAX, 1]).is_err());
    }
}
