use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{OrderStatus, OrderType};

/// A sewing order. `total_qty` and `total_amount` cache the aggregate of its
/// items and are maintained by the order aggregator.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sewing_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub customer_id: i32,
    pub buyer_id: Option<i32>,
    pub shipment_date: Option<Date>,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub total_qty: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub created_by: Option<i32>,
    pub updated_by: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sewing_order_item::Entity")]
    Items,
}

impl Related<super::sewing_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
