use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::VariantKind;

/// A concrete, priceable version of a product.
///
/// `unit_price` is a cache of the cost engine's result. It is only ever
/// written through the recalculation coordinator's field-only update.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "variants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    pub kind: VariantKind,
    pub name: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))", nullable)]
    pub loss: Option<Decimal>,
    pub work_type_id: Option<i32>,
    pub design_code: Option<String>,
    pub cloned: bool,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub unit_price: Decimal,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub created_by: Option<i32>,
    pub updated_by: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
    #[sea_orm(has_many = "super::variant_material::Entity")]
    Materials,
    #[sea_orm(has_many = "super::variant_accessory::Entity")]
    Accessories,
    #[sea_orm(has_many = "super::variant_size::Entity")]
    Sizes,
    #[sea_orm(has_many = "super::variant_operation::Entity")]
    Operations,
    #[sea_orm(has_many = "super::sewing_order_item::Entity")]
    OrderItems,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::variant_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Materials.def()
    }
}

impl Related<super::variant_accessory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accessories.def()
    }
}

impl Related<super::variant_size::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sizes.def()
    }
}

impl Related<super::variant_operation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Operations.def()
    }
}

impl Related<super::sewing_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
