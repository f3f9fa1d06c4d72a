use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::ProcessRelation;

/// A directed edge between two production processes. Processes themselves
/// live outside this crate; only the id pairs are stored.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "process_links")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub from_process_id: i32,
    pub to_process_id: i32,
    pub relation: ProcessRelation,
    pub created_at: DateTimeUtc,
    pub created_by: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
