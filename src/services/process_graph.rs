use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    entities::process_link::{self, Entity as ProcessLinkEntity},
    errors::ServiceError,
    models::{AuditContext, ProcessRelation},
};

/// Replaceable/required links between production processes, stored as plain
/// id pairs. Links own nothing and removing one never cascades.
#[derive(Clone)]
pub struct ProcessGraphService {
    db: Arc<DatabaseConnection>,
}

impl ProcessGraphService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, ctx))]
    pub async fn link(
        &self,
        ctx: &AuditContext,
        from_process_id: i32,
        to_process_id: i32,
        relation: ProcessRelation,
    ) -> Result<process_link::Model, ServiceError> {
        if from_process_id == to_process_id {
            return Err(ServiceError::ValidationError(format!(
                "process {} cannot be linked to itself",
                from_process_id
            )));
        }

        let db = &*self.db;
        let existing = ProcessLinkEntity::find()
            .filter(process_link::Column::FromProcessId.eq(from_process_id))
            .filter(process_link::Column::ToProcessId.eq(to_process_id))
            .filter(process_link::Column::Relation.eq(relation))
            .count(db)
            .await?;
        if existing > 0 {
            return Err(ServiceError::Conflict(format!(
                "process {} is already {} for {}",
                to_process_id, relation, from_process_id
            )));
        }

        let link = process_link::ActiveModel {
            from_process_id: Set(from_process_id),
            to_process_id: Set(to_process_id),
            relation: Set(relation),
            created_at: Set(ctx.now()),
            created_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(from_process_id, to_process_id, %relation, "Process link added");
        Ok(link)
    }

    #[instrument(skip(self, _ctx))]
    pub async fn unlink(
        &self,
        _ctx: &AuditContext,
        from_process_id: i32,
        to_process_id: i32,
        relation: ProcessRelation,
    ) -> Result<(), ServiceError> {
        let res = ProcessLinkEntity::delete_many()
            .filter(process_link::Column::FromProcessId.eq(from_process_id))
            .filter(process_link::Column::ToProcessId.eq(to_process_id))
            .filter(process_link::Column::Relation.eq(relation))
            .exec(&*self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "no {} link from process {} to {}",
                relation, from_process_id, to_process_id
            )));
        }
        Ok(())
    }

    /// Processes reachable in one step from `process_id`, optionally filtered by relation.
    #[instrument(skip(self))]
    pub async fn links_from(
        &self,
        process_id: i32,
        relation: Option<ProcessRelation>,
    ) -> Result<Vec<process_link::Model>, ServiceError> {
        let mut query =
            ProcessLinkEntity::find().filter(process_link::Column::FromProcessId.eq(process_id));
        if let Some(relation) = relation {
            query = query.filter(process_link::Column::Relation.eq(relation));
        }
        Ok(query
            .order_by_asc(process_link::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Processes that point at `process_id`.
    #[instrument(skip(self))]
    pub async fn links_to(
        &self,
        process_id: i32,
        relation: Option<ProcessRelation>,
    ) -> Result<Vec<process_link::Model>, ServiceError> {
        let mut query =
            ProcessLinkEntity::find().filter(process_link::Column::ToProcessId.eq(process_id));
        if let Some(relation) = relation {
            query = query.filter(process_link::Column::Relation.eq(relation));
        }
        Ok(query
            .order_by_asc(process_link::Column::Id)
            .all(&*self.db)
            .await?)
    }
}
