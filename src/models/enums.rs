use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What a variant is produced for. Samples share one canonical name.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VariantKind {
    #[sea_orm(string_value = "marketing")]
    Marketing,
    #[sea_orm(string_value = "sample")]
    Sample,
    #[sea_orm(string_value = "planned")]
    Planned,
}

impl Default for VariantKind {
    fn default() -> Self {
        VariantKind::Marketing
    }
}

impl VariantKind {
    /// Samples and planned variants carry sizes and labor operations.
    pub fn has_sizes_and_operations(&self) -> bool {
        matches!(self, VariantKind::Sample | VariantKind::Planned)
    }
}

/// Lifecycle status shared by sewing orders and their items.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "done")]
    Done,
    #[sea_orm(string_value = "canceled")]
    Canceled,
    #[sea_orm(string_value = "in_development")]
    InDevelopment,
    #[sea_orm(string_value = "in_agreement")]
    InAgreement,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "aborted")]
    Aborted,
    #[sea_orm(string_value = "accepted")]
    Accepted,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::New
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderType {
    #[sea_orm(string_value = "sample")]
    Sample,
    #[sea_orm(string_value = "production")]
    Production,
    #[sea_orm(string_value = "marketing")]
    Marketing,
    #[sea_orm(string_value = "other")]
    Other,
}

impl Default for OrderType {
    fn default() -> Self {
        OrderType::Production
    }
}

/// Edge label in the process adjacency relation.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProcessRelation {
    /// `to` may be performed instead of `from`.
    #[sea_orm(string_value = "replaceable")]
    Replaceable,
    /// `to` must be performed before `from`.
    #[sea_orm(string_value = "required")]
    Required,
}

/// Collections that can be copied between variants with fill-from.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LineKind {
    Accessories,
    Operations,
}

impl LineKind {
    /// Only accessory lines feed the unit price.
    pub fn affects_cost(&self) -> bool {
        matches!(self, LineKind::Accessories)
    }
}
