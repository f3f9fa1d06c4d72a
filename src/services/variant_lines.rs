use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::Validate;

use crate::{
    entities::{
        product::Entity as ProductEntity,
        sewing_order_item::{self, Entity as SewingOrderItemEntity},
        variant::{self, Entity as VariantEntity},
        variant_accessory::{self, Entity as VariantAccessoryEntity},
        variant_material::{self, Entity as VariantMaterialEntity},
        variant_operation::{self, Entity as VariantOperationEntity},
        variant_size::{self, Entity as VariantSizeEntity},
    },
    errors::ServiceError,
    models::{AuditContext, VariantKind},
    services::{
        costing::{check_range, MAX_COUNT, MAX_MONEY, MAX_PERCENT},
        recalculation::{Recalculation, RecalculationCoordinator},
    },
};

/// Capacity of the `decimal(8,2)` material dimension columns.
const MAX_DIMENSION: Decimal = dec!(999999.99);
/// Capacity of the `decimal(10,2)` operation price column.
const MAX_OPERATION_PRICE: Decimal = dec!(99999999.99);

fn in_range(field: &str, value: Option<Decimal>, max: Decimal) -> Result<(), ServiceError> {
    value.map_or(Ok(()), |v| check_range(field, v, max))
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewVariant {
    pub product_id: i32,
    #[serde(default)]
    pub kind: VariantKind,
    /// Blank names are allowed for samples, which get the canonical sample name.
    #[validate(length(max = 255))]
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub loss: Option<Decimal>,
    pub work_type_id: Option<i32>,
    #[validate(length(max = 64))]
    pub design_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct VariantUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub loss: Option<Decimal>,
    pub work_type_id: Option<i32>,
    #[validate(length(max = 64))]
    pub design_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MaterialLineInput {
    pub material_id: i32,
    pub count: Option<Decimal>,
    pub price: Option<Decimal>,
    pub loss: Option<Decimal>,
    pub color_id: Option<i32>,
    pub packing_type: Option<i32>,
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
    pub density: Option<Decimal>,
    #[serde(default)]
    pub main: bool,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl MaterialLineInput {
    fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        in_range("count", self.count, MAX_COUNT)?;
        in_range("price", self.price, MAX_MONEY)?;
        in_range("loss", self.loss, MAX_PERCENT)?;
        in_range("width", self.width, MAX_DIMENSION)?;
        in_range("height", self.height, MAX_DIMENSION)?;
        in_range("density", self.density, MAX_DIMENSION)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AccessoryLineInput {
    pub accessory_id: i32,
    pub count: Option<Decimal>,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub local_produce: bool,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl AccessoryLineInput {
    fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        in_range("count", self.count, MAX_COUNT)?;
        in_range("price", self.price, MAX_MONEY)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct OperationLineInput {
    pub operation_id: i32,
    #[validate(range(min = 0))]
    pub seconds: i32,
    pub price: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl OperationLineInput {
    fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        in_range("price", self.price, MAX_OPERATION_PRICE)
    }
}

/// A written cost line together with the recompute it triggered.
#[derive(Debug, Clone)]
pub struct LineChange<T> {
    pub line: T,
    pub recalculation: Recalculation,
}

/// Write path for variants and their lines. Every mutation of a material or
/// accessory line recomputes the owning variant in the same transaction.
#[derive(Clone)]
pub struct VariantLineService {
    db: Arc<DatabaseConnection>,
    sample_name: String,
}

impl VariantLineService {
    pub fn new(db: Arc<DatabaseConnection>, sample_name: impl Into<String>) -> Self {
        Self {
            db,
            sample_name: sample_name.into(),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_variant(&self, variant_id: i32) -> Result<variant::Model, ServiceError> {
        VariantEntity::find_by_id(variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Variant", variant_id))
    }

    #[instrument(skip(self))]
    pub async fn list_variants(&self, product_id: i32) -> Result<Vec<variant::Model>, ServiceError> {
        Ok(VariantEntity::find()
            .filter(variant::Column::ProductId.eq(product_id))
            .order_by_asc(variant::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Creates a variant and prices it from its product's fixed costs.
    #[instrument(skip(self, ctx, input), fields(product_id = input.product_id, kind = %input.kind))]
    pub async fn create_variant(
        &self,
        ctx: &AuditContext,
        input: NewVariant,
    ) -> Result<variant::Model, ServiceError> {
        input.validate()?;
        in_range("loss", input.loss, MAX_PERCENT)?;

        let name = match (input.kind, input.name.trim()) {
            (VariantKind::Sample, "") => self.sample_name.clone(),
            (_, "") => {
                return Err(ServiceError::ValidationError(
                    "variant name must not be blank".to_string(),
                ))
            }
            (_, name) => name.to_string(),
        };

        let txn = self.db.begin().await?;
        ProductEntity::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", input.product_id))?;

        let now = ctx.now();
        let created = variant::ActiveModel {
            product_id: Set(input.product_id),
            kind: Set(input.kind),
            name: Set(name),
            description: Set(input.description),
            loss: Set(input.loss),
            work_type_id: Set(input.work_type_id),
            design_code: Set(input.design_code),
            cloned: Set(false),
            unit_price: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(ctx.user_id),
            updated_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!("Failed to create variant: {}", e);
            ServiceError::db_error(e)
        })?;

        let recalculation = RecalculationCoordinator::recalculate_variant(&txn, ctx, created.id).await?;
        txn.commit().await?;

        info!(variant_id = created.id, name = %created.name, "Variant created");
        Ok(variant::Model {
            unit_price: recalculation.current,
            ..created
        })
    }

    /// Updates descriptive fields. None of them feed the price, but the
    /// variant is re-priced anyway so the row is left consistent.
    #[instrument(skip(self, ctx, update))]
    pub async fn update_variant(
        &self,
        ctx: &AuditContext,
        variant_id: i32,
        update: VariantUpdate,
    ) -> Result<variant::Model, ServiceError> {
        update.validate()?;
        in_range("loss", update.loss, MAX_PERCENT)?;

        let txn = self.db.begin().await?;
        let existing = VariantEntity::find_by_id(variant_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Variant", variant_id))?;

        let mut active: variant::ActiveModel = existing.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(description) = update.description {
            active.description = Set(Some(description));
        }
        if let Some(loss) = update.loss {
            active.loss = Set(Some(loss));
        }
        if let Some(work_type_id) = update.work_type_id {
            active.work_type_id = Set(Some(work_type_id));
        }
        if let Some(design_code) = update.design_code {
            active.design_code = Set(Some(design_code));
        }
        active.updated_at = Set(ctx.now());
        active.updated_by = Set(ctx.user_id);

        let updated = active.update(&txn).await?;
        let recalculation = RecalculationCoordinator::recalculate_variant(&txn, ctx, variant_id).await?;
        txn.commit().await?;

        Ok(variant::Model {
            unit_price: recalculation.current,
            ..updated
        })
    }

    /// Deletes a variant and its lines. Variants referenced by order items are kept.
    #[instrument(skip(self, ctx))]
    pub async fn delete_variant(&self, ctx: &AuditContext, variant_id: i32) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let existing = VariantEntity::find_by_id(variant_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Variant", variant_id))?;

        let referenced = SewingOrderItemEntity::find()
            .filter(sewing_order_item::Column::VariantId.eq(variant_id))
            .count(&txn)
            .await?;
        if referenced > 0 {
            return Err(ServiceError::Conflict(format!(
                "variant {} is used by {} order item(s)",
                variant_id, referenced
            )));
        }

        delete_variant_lines(&txn, variant_id).await?;
        existing.delete(&txn).await?;
        txn.commit().await?;

        info!(variant_id, user_id = ?ctx.user_id, "Variant deleted");
        Ok(())
    }

    // Materials

    pub async fn materials(&self, variant_id: i32) -> Result<Vec<variant_material::Model>, ServiceError> {
        Ok(VariantMaterialEntity::find()
            .filter(variant_material::Column::VariantId.eq(variant_id))
            .order_by_asc(variant_material::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, ctx, input), fields(material_id = input.material_id))]
    pub async fn add_material(
        &self,
        ctx: &AuditContext,
        variant_id: i32,
        input: MaterialLineInput,
    ) -> Result<LineChange<variant_material::Model>, ServiceError> {
        input.check()?;
        let txn = self.db.begin().await?;
        ensure_variant(&txn, variant_id).await?;

        let now = ctx.now();
        let line = variant_material::ActiveModel {
            variant_id: Set(variant_id),
            material_id: Set(input.material_id),
            count: Set(input.count),
            color_id: Set(input.color_id),
            packing_type: Set(input.packing_type),
            width: Set(input.width),
            height: Set(input.height),
            density: Set(input.density),
            loss: Set(input.loss),
            price: Set(input.price),
            main: Set(input.main),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(ctx.user_id),
            updated_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let recalculation = RecalculationCoordinator::recalculate_variant(&txn, ctx, variant_id).await?;
        txn.commit().await?;
        Ok(LineChange { line, recalculation })
    }

    #[instrument(skip(self, ctx, input))]
    pub async fn update_material(
        &self,
        ctx: &AuditContext,
        line_id: i32,
        input: MaterialLineInput,
    ) -> Result<LineChange<variant_material::Model>, ServiceError> {
        input.check()?;
        let txn = self.db.begin().await?;
        let existing = VariantMaterialEntity::find_by_id(line_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Material line", line_id))?;
        let variant_id = existing.variant_id;

        let mut active: variant_material::ActiveModel = existing.into();
        active.material_id = Set(input.material_id);
        active.count = Set(input.count);
        active.color_id = Set(input.color_id);
        active.packing_type = Set(input.packing_type);
        active.width = Set(input.width);
        active.height = Set(input.height);
        active.density = Set(input.density);
        active.loss = Set(input.loss);
        active.price = Set(input.price);
        active.main = Set(input.main);
        active.notes = Set(input.notes);
        active.updated_at = Set(ctx.now());
        active.updated_by = Set(ctx.user_id);
        let line = active.update(&txn).await?;

        let recalculation = RecalculationCoordinator::recalculate_variant(&txn, ctx, variant_id).await?;
        txn.commit().await?;
        Ok(LineChange { line, recalculation })
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete_material(&self, ctx: &AuditContext, line_id: i32) -> Result<Recalculation, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = VariantMaterialEntity::find_by_id(line_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Material line", line_id))?;
        let variant_id = existing.variant_id;
        existing.delete(&txn).await?;

        let recalculation = RecalculationCoordinator::recalculate_variant(&txn, ctx, variant_id).await?;
        txn.commit().await?;
        Ok(recalculation)
    }

    // Accessories

    pub async fn accessories(&self, variant_id: i32) -> Result<Vec<variant_accessory::Model>, ServiceError> {
        Ok(VariantAccessoryEntity::find()
            .filter(variant_accessory::Column::VariantId.eq(variant_id))
            .order_by_asc(variant_accessory::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, ctx, input), fields(accessory_id = input.accessory_id))]
    pub async fn add_accessory(
        &self,
        ctx: &AuditContext,
        variant_id: i32,
        input: AccessoryLineInput,
    ) -> Result<LineChange<variant_accessory::Model>, ServiceError> {
        input.check()?;
        let txn = self.db.begin().await?;
        ensure_variant(&txn, variant_id).await?;

        let now = ctx.now();
        let line = variant_accessory::ActiveModel {
            variant_id: Set(variant_id),
            accessory_id: Set(input.accessory_id),
            count: Set(input.count),
            price: Set(input.price),
            local_produce: Set(input.local_produce),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(ctx.user_id),
            updated_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let recalculation = RecalculationCoordinator::recalculate_variant(&txn, ctx, variant_id).await?;
        txn.commit().await?;
        Ok(LineChange { line, recalculation })
    }

    #[instrument(skip(self, ctx, input))]
    pub async fn update_accessory(
        &self,
        ctx: &AuditContext,
        line_id: i32,
        input: AccessoryLineInput,
    ) -> Result<LineChange<variant_accessory::Model>, ServiceError> {
        input.check()?;
        let txn = self.db.begin().await?;
        let existing = VariantAccessoryEntity::find_by_id(line_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Accessory line", line_id))?;
        let variant_id = existing.variant_id;

        let mut active: variant_accessory::ActiveModel = existing.into();
        active.accessory_id = Set(input.accessory_id);
        active.count = Set(input.count);
        active.price = Set(input.price);
        active.local_produce = Set(input.local_produce);
        active.notes = Set(input.notes);
        active.updated_at = Set(ctx.now());
        active.updated_by = Set(ctx.user_id);
        let line = active.update(&txn).await?;

        let recalculation = RecalculationCoordinator::recalculate_variant(&txn, ctx, variant_id).await?;
        txn.commit().await?;
        Ok(LineChange { line, recalculation })
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete_accessory(&self, ctx: &AuditContext, line_id: i32) -> Result<Recalculation, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = VariantAccessoryEntity::find_by_id(line_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Accessory line", line_id))?;
        let variant_id = existing.variant_id;
        existing.delete(&txn).await?;

        let recalculation = RecalculationCoordinator::recalculate_variant(&txn, ctx, variant_id).await?;
        txn.commit().await?;
        Ok(recalculation)
    }

    // Sizes

    pub async fn sizes(&self, variant_id: i32) -> Result<Vec<variant_size::Model>, ServiceError> {
        Ok(VariantSizeEntity::find()
            .filter(variant_size::Column::VariantId.eq(variant_id))
            .order_by_asc(variant_size::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, ctx, notes))]
    pub async fn add_size(
        &self,
        ctx: &AuditContext,
        variant_id: i32,
        size_id: i32,
        notes: Option<String>,
    ) -> Result<variant_size::Model, ServiceError> {
        let txn = self.db.begin().await?;
        ensure_variant(&txn, variant_id).await?;

        let duplicate = VariantSizeEntity::find()
            .filter(variant_size::Column::VariantId.eq(variant_id))
            .filter(variant_size::Column::SizeId.eq(size_id))
            .count(&txn)
            .await?;
        if duplicate > 0 {
            return Err(ServiceError::Conflict(format!(
                "size {} is already on variant {}",
                size_id, variant_id
            )));
        }

        let now = ctx.now();
        let line = variant_size::ActiveModel {
            variant_id: Set(variant_id),
            size_id: Set(size_id),
            notes: Set(notes),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(ctx.user_id),
            updated_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(line)
    }

    #[instrument(skip(self, _ctx))]
    pub async fn delete_size(&self, _ctx: &AuditContext, line_id: i32) -> Result<(), ServiceError> {
        let res = VariantSizeEntity::delete_by_id(line_id).exec(&*self.db).await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::not_found("Size line", line_id));
        }
        Ok(())
    }

    // Operations

    pub async fn operations(&self, variant_id: i32) -> Result<Vec<variant_operation::Model>, ServiceError> {
        Ok(VariantOperationEntity::find()
            .filter(variant_operation::Column::VariantId.eq(variant_id))
            .order_by_asc(variant_operation::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Operations do not feed the price, so no recompute follows.
    #[instrument(skip(self, ctx, input), fields(operation_id = input.operation_id))]
    pub async fn add_operation(
        &self,
        ctx: &AuditContext,
        variant_id: i32,
        input: OperationLineInput,
    ) -> Result<variant_operation::Model, ServiceError> {
        input.check()?;
        let txn = self.db.begin().await?;
        ensure_variant(&txn, variant_id).await?;
        ensure_operation_free(&txn, variant_id, input.operation_id, None).await?;

        let now = ctx.now();
        let line = variant_operation::ActiveModel {
            variant_id: Set(variant_id),
            operation_id: Set(input.operation_id),
            seconds: Set(input.seconds),
            price: Set(input.price),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(ctx.user_id),
            updated_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(line)
    }

    #[instrument(skip(self, ctx, input))]
    pub async fn update_operation(
        &self,
        ctx: &AuditContext,
        line_id: i32,
        input: OperationLineInput,
    ) -> Result<variant_operation::Model, ServiceError> {
        input.check()?;
        let txn = self.db.begin().await?;
        let existing = VariantOperationEntity::find_by_id(line_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Operation line", line_id))?;
        ensure_operation_free(&txn, existing.variant_id, input.operation_id, Some(line_id)).await?;

        let mut active: variant_operation::ActiveModel = existing.into();
        active.operation_id = Set(input.operation_id);
        active.seconds = Set(input.seconds);
        active.price = Set(input.price);
        active.notes = Set(input.notes);
        active.updated_at = Set(ctx.now());
        active.updated_by = Set(ctx.user_id);
        let line = active.update(&txn).await?;
        txn.commit().await?;
        Ok(line)
    }

    #[instrument(skip(self, _ctx))]
    pub async fn delete_operation(&self, _ctx: &AuditContext, line_id: i32) -> Result<(), ServiceError> {
        let res = VariantOperationEntity::delete_by_id(line_id).exec(&*self.db).await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::not_found("Operation line", line_id));
        }
        Ok(())
    }
}

/// Conflict when the variant already has a line for `operation_id`, other than `except`.
async fn ensure_operation_free<C: ConnectionTrait>(
    conn: &C,
    variant_id: i32,
    operation_id: i32,
    except: Option<i32>,
) -> Result<(), ServiceError> {
    let mut query = VariantOperationEntity::find()
        .filter(variant_operation::Column::VariantId.eq(variant_id))
        .filter(variant_operation::Column::OperationId.eq(operation_id));
    if let Some(line_id) = except {
        query = query.filter(variant_operation::Column::Id.ne(line_id));
    }
    if query.count(conn).await? > 0 {
        return Err(ServiceError::Conflict(format!(
            "operation {} is already on variant {}",
            operation_id, variant_id
        )));
    }
    Ok(())
}

async fn ensure_variant<C: ConnectionTrait>(conn: &C, variant_id: i32) -> Result<(), ServiceError> {
    VariantEntity::find_by_id(variant_id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::not_found("Variant", variant_id))
}

/// Removes every line owned by a variant, ahead of deleting the variant itself.
pub(crate) async fn delete_variant_lines<C: ConnectionTrait>(
    conn: &C,
    variant_id: i32,
) -> Result<(), ServiceError> {
    VariantMaterialEntity::delete_many()
        .filter(variant_material::Column::VariantId.eq(variant_id))
        .exec(conn)
        .await?;
    VariantAccessoryEntity::delete_many()
        .filter(variant_accessory::Column::VariantId.eq(variant_id))
        .exec(conn)
        .await?;
    VariantSizeEntity::delete_many()
        .filter(variant_size::Column::VariantId.eq(variant_id))
        .exec(conn)
        .await?;
    VariantOperationEntity::delete_many()
        .filter(variant_operation::Column::VariantId.eq(variant_id))
        .exec(conn)
        .await?;
    Ok(())
}
