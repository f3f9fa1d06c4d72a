use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::OrderStatus;

/// One variant line on a sewing order.
///
/// `unit_price` is a snapshot of the variant's price taken when the item is
/// created; `quantity` caches the sum of the item's size counts.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sewing_order_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub order_id: i32,
    pub variant_id: i32,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub unit_price: Decimal,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sewing_order::Entity",
        from = "Column::OrderId",
        to = "super::sewing_order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::variant::Entity",
        from = "Column::VariantId",
        to = "super::variant::Column::Id",
        on_delete = "Restrict"
    )]
    Variant,
    #[sea_orm(has_many = "super::order_size_count::Entity")]
    SizeCounts,
}

impl Related<super::sewing_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variant.def()
    }
}

impl Related<super::order_size_count::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SizeCounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
