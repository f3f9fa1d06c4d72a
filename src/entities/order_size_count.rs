use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ordered quantity of one size on an order item. Unique per (item, size);
/// a zero quantity is represented by the absence of a row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_size_counts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub item_id: i32,
    pub size_id: i32,
    pub quantity: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sewing_order_item::Entity",
        from = "Column::ItemId",
        to = "super::sewing_order_item::Column::Id",
        on_delete = "Cascade"
    )]
    Item,
}

impl Related<super::sewing_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
