use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    entities::{
        variant::{self, Entity as VariantEntity},
        variant_accessory::{self, Entity as VariantAccessoryEntity},
        variant_operation::{self, Entity as VariantOperationEntity},
    },
    errors::ServiceError,
    models::{AuditContext, LineKind},
    services::recalculation::{Recalculation, RecalculationCoordinator},
};

/// How a successful fill-from went, for callers that render different messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillOutcome {
    /// Every source line was copied.
    Copied,
    /// Some lines were copied, others were already on the target.
    Partial,
    /// The source had no lines of this kind.
    NothingToCopy,
}

#[derive(Debug, Clone, Serialize)]
pub struct FillFromReport {
    pub target_variant_id: i32,
    pub source_variant_id: i32,
    pub kind: LineKind,
    pub replace: bool,
    pub created: u64,
    pub skipped: u64,
    /// Present when the kind feeds the unit price.
    pub recalculation: Option<Recalculation>,
}

impl FillFromReport {
    pub fn outcome(&self) -> FillOutcome {
        match (self.created, self.skipped) {
            (0, 0) => FillOutcome::NothingToCopy,
            (_, 0) => FillOutcome::Copied,
            _ => FillOutcome::Partial,
        }
    }
}

/// Copies accessory or operation lines from one variant onto another.
#[derive(Clone)]
pub struct FillFromService {
    db: Arc<DatabaseConnection>,
}

impl FillFromService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// With `replace` the target's lines of `kind` are dropped first and every
    /// source line is copied. Otherwise source lines whose accessory or
    /// operation is already on the target are skipped; if that skips all of
    /// them the call fails with [`ServiceError::DuplicateConflict`] and
    /// nothing is written.
    #[instrument(skip(self, ctx))]
    pub async fn fill_from(
        &self,
        ctx: &AuditContext,
        target_variant_id: i32,
        source_variant_id: i32,
        kind: LineKind,
        replace: bool,
    ) -> Result<FillFromReport, ServiceError> {
        let txn = self.db.begin().await?;
        let report =
            Self::fill_from_in(&txn, ctx, target_variant_id, source_variant_id, kind, replace)
                .await?;
        txn.commit().await?;
        Ok(report)
    }

    pub async fn fill_from_in<C: ConnectionTrait>(
        conn: &C,
        ctx: &AuditContext,
        target_variant_id: i32,
        source_variant_id: i32,
        kind: LineKind,
        replace: bool,
    ) -> Result<FillFromReport, ServiceError> {
        if target_variant_id == source_variant_id {
            return Err(ServiceError::ValidationError(format!(
                "variant {} cannot be filled from itself",
                target_variant_id
            )));
        }

        lock_variant(conn, target_variant_id).await?;
        VariantEntity::find_by_id(source_variant_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Variant", source_variant_id))?;

        let (created, skipped) = match kind {
            LineKind::Accessories => {
                fill_accessories(conn, ctx, target_variant_id, source_variant_id, replace).await?
            }
            LineKind::Operations => {
                fill_operations(conn, ctx, target_variant_id, source_variant_id, replace).await?
            }
        };

        if !replace && created == 0 && skipped > 0 {
            warn!(
                target_variant_id,
                source_variant_id,
                %kind,
                skipped,
                "Fill-from found nothing new to copy"
            );
            return Err(ServiceError::DuplicateConflict {
                kind,
                target_variant_id,
                skipped,
            });
        }

        let recalculation = if kind.affects_cost() {
            Some(RecalculationCoordinator::recalculate_variant(conn, ctx, target_variant_id).await?)
        } else {
            None
        };

        info!(
            target_variant_id,
            source_variant_id,
            %kind,
            replace,
            created,
            skipped,
            "Fill-from completed"
        );

        Ok(FillFromReport {
            target_variant_id,
            source_variant_id,
            kind,
            replace,
            created,
            skipped,
            recalculation,
        })
    }
}

async fn lock_variant<C: ConnectionTrait>(
    conn: &C,
    variant_id: i32,
) -> Result<variant::Model, ServiceError> {
    VariantEntity::find_by_id(variant_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Variant", variant_id))
}

async fn fill_accessories<C: ConnectionTrait>(
    conn: &C,
    ctx: &AuditContext,
    target: i32,
    source: i32,
    replace: bool,
) -> Result<(u64, u64), ServiceError> {
    let existing: HashSet<i32> = if replace {
        VariantAccessoryEntity::delete_many()
            .filter(variant_accessory::Column::VariantId.eq(target))
            .exec(conn)
            .await?;
        HashSet::new()
    } else {
        VariantAccessoryEntity::find()
            .select_only()
            .column(variant_accessory::Column::AccessoryId)
            .filter(variant_accessory::Column::VariantId.eq(target))
            .into_tuple::<i32>()
            .all(conn)
            .await?
            .into_iter()
            .collect()
    };

    let source_lines = VariantAccessoryEntity::find()
        .filter(variant_accessory::Column::VariantId.eq(source))
        .order_by_asc(variant_accessory::Column::Id)
        .all(conn)
        .await?;

    let now = ctx.now();
    let mut skipped = 0u64;
    let mut copies = Vec::with_capacity(source_lines.len());
    for line in source_lines {
        if existing.contains(&line.accessory_id) {
            skipped += 1;
            continue;
        }
        copies.push(variant_accessory::ActiveModel {
            variant_id: Set(target),
            accessory_id: Set(line.accessory_id),
            count: Set(line.count),
            price: Set(line.price),
            local_produce: Set(line.local_produce),
            notes: Set(line.notes),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(ctx.user_id),
            updated_by: Set(ctx.user_id),
            ..Default::default()
        });
    }

    let created = copies.len() as u64;
    if !copies.is_empty() {
        VariantAccessoryEntity::insert_many(copies).exec(conn).await?;
    }
    Ok((created, skipped))
}

async fn fill_operations<C: ConnectionTrait>(
    conn: &C,
    ctx: &AuditContext,
    target: i32,
    source: i32,
    replace: bool,
) -> Result<(u64, u64), ServiceError> {
    let existing: HashSet<i32> = if replace {
        VariantOperationEntity::delete_many()
            .filter(variant_operation::Column::VariantId.eq(target))
            .exec(conn)
            .await?;
        HashSet::new()
    } else {
        VariantOperationEntity::find()
            .select_only()
            .column(variant_operation::Column::OperationId)
            .filter(variant_operation::Column::VariantId.eq(target))
            .into_tuple::<i32>()
            .all(conn)
            .await?
            .into_iter()
            .collect()
    };

    let source_lines = VariantOperationEntity::find()
        .filter(variant_operation::Column::VariantId.eq(source))
        .order_by_asc(variant_operation::Column::Id)
        .all(conn)
        .await?;

    let now = ctx.now();
    let mut skipped = 0u64;
    let mut copies = Vec::with_capacity(source_lines.len());
    for line in source_lines {
        if existing.contains(&line.operation_id) {
            skipped += 1;
            continue;
        }
        copies.push(variant_operation::ActiveModel {
            variant_id: Set(target),
            operation_id: Set(line.operation_id),
            seconds: Set(line.seconds),
            price: Set(line.price),
            notes: Set(line.notes),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(ctx.user_id),
            updated_by: Set(ctx.user_id),
            ..Default::default()
        });
    }

    let created = copies.len() as u64;
    if !copies.is_empty() {
        VariantOperationEntity::insert_many(copies).exec(conn).await?;
    }
    Ok((created, skipped))
}
