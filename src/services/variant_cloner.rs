use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::{
    config::CostingConfig,
    entities::{
        variant::{self, Entity as VariantEntity},
        variant_accessory::{self, Entity as VariantAccessoryEntity},
        variant_material::{self, Entity as VariantMaterialEntity},
        variant_operation::{self, Entity as VariantOperationEntity},
        variant_size::{self, Entity as VariantSizeEntity},
    },
    errors::ServiceError,
    models::{AuditContext, VariantKind},
    services::recalculation::RecalculationCoordinator,
};

/// Name rules for clones: samples share one name, everything else gets a
/// numbered "(copy N)" suffix unique within its product.
#[derive(Debug, Clone)]
pub struct CloneNaming {
    sample_name: String,
    copy_label: String,
    suffix: Regex,
}

impl CloneNaming {
    pub fn new(sample_name: &str, copy_label: &str) -> Result<Self, ServiceError> {
        let pattern = format!(r"(?i)\s*\({}(?:\s*\d+)?\)\s*$", regex::escape(copy_label));
        let suffix = Regex::new(&pattern).map_err(|e| {
            ServiceError::ConfigurationError(format!("invalid copy label {:?}: {}", copy_label, e))
        })?;
        Ok(Self {
            sample_name: sample_name.to_string(),
            copy_label: copy_label.to_string(),
            suffix,
        })
    }

    pub fn from_config(config: &CostingConfig) -> Result<Self, ServiceError> {
        Self::new(&config.sample_variant_name, &config.copy_label)
    }

    pub fn sample_name(&self) -> &str {
        &self.sample_name
    }

    /// Trims surrounding whitespace and removes every trailing "(copy)" / "(copy N)" suffix.
    pub fn strip_copy_suffixes<'a>(&self, name: &'a str) -> &'a str {
        let mut base = name.trim();
        while let Some(m) = self.suffix.find(base) {
            base = base[..m.start()].trim_end();
        }
        base
    }

    /// `n == 1` gives "{base} (copy)", later attempts "{base} (copy n)".
    pub fn candidate(&self, base: &str, n: usize) -> String {
        if n <= 1 {
            format!("{} ({})", base, self.copy_label)
        } else {
            format!("{} ({} {})", base, self.copy_label, n)
        }
    }

    /// First free candidate for `source_name`. `taken` holds the names already
    /// used in the product, so at most `taken.len() + 1` candidates are tried.
    pub fn next_clone_name(&self, source_name: &str, taken: &HashSet<String>) -> String {
        let base = self.strip_copy_suffixes(source_name);
        let mut n = 1;
        loop {
            let candidate = self.candidate(base, n);
            if !taken.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn clone_name(&self, source: &variant::Model, taken: &HashSet<String>) -> String {
        match source.kind {
            VariantKind::Sample => self.sample_name.clone(),
            _ => self.next_clone_name(&source.name, taken),
        }
    }
}

/// Deep-copies variants together with their cost, size and operation lines.
#[derive(Clone)]
pub struct VariantCloner {
    db: Arc<DatabaseConnection>,
    naming: CloneNaming,
}

impl VariantCloner {
    pub fn new(db: Arc<DatabaseConnection>, naming: CloneNaming) -> Self {
        Self { db, naming }
    }

    pub fn naming(&self) -> &CloneNaming {
        &self.naming
    }

    /// Clones a variant in one transaction and returns the priced copy.
    #[instrument(skip(self, ctx))]
    pub async fn clone_variant(
        &self,
        ctx: &AuditContext,
        variant_id: i32,
    ) -> Result<variant::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let cloned = self.clone_in(&txn, ctx, variant_id).await?;
        txn.commit().await.map_err(|e| {
            error!(variant_id, error = %e, "Failed to commit variant clone");
            ServiceError::db_error(e)
        })?;
        Ok(cloned)
    }

    pub async fn clone_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        ctx: &AuditContext,
        variant_id: i32,
    ) -> Result<variant::Model, ServiceError> {
        // The source row lock serialises concurrent clones of one variant,
        // which would otherwise pick the same free name.
        let source = VariantEntity::find_by_id(variant_id)
            .lock_exclusive()
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Variant", variant_id))?;

        let taken: HashSet<String> = VariantEntity::find()
            .select_only()
            .column(variant::Column::Name)
            .filter(variant::Column::ProductId.eq(source.product_id))
            .into_tuple::<String>()
            .all(conn)
            .await?
            .into_iter()
            .collect();
        let name = self.naming.clone_name(&source, &taken);

        let now = ctx.now();
        let copy = variant::ActiveModel {
            product_id: Set(source.product_id),
            kind: Set(source.kind),
            name: Set(name),
            description: Set(source.description.clone()),
            loss: Set(source.loss),
            work_type_id: Set(source.work_type_id),
            design_code: Set(source.design_code.clone()),
            cloned: Set(true),
            unit_price: Set(rust_decimal::Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(ctx.user_id),
            updated_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(|e| {
            error!(variant_id, error = %e, "Failed to insert cloned variant");
            ServiceError::db_error(e)
        })?;

        let counts = copy_lines(conn, ctx, source.id, copy.id).await?;
        let recalculation = RecalculationCoordinator::recalculate_variant(conn, ctx, copy.id).await?;

        info!(
            source_id = source.id,
            clone_id = copy.id,
            name = %copy.name,
            materials = counts.materials,
            accessories = counts.accessories,
            sizes = counts.sizes,
            operations = counts.operations,
            unit_price = %recalculation.current,
            "Variant cloned"
        );

        Ok(variant::Model {
            unit_price: recalculation.current,
            ..copy
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CopiedLines {
    materials: usize,
    accessories: usize,
    sizes: usize,
    operations: usize,
}

async fn copy_lines<C: ConnectionTrait>(
    conn: &C,
    ctx: &AuditContext,
    from: i32,
    to: i32,
) -> Result<CopiedLines, ServiceError> {
    let now = ctx.now();

    let materials: Vec<variant_material::ActiveModel> = VariantMaterialEntity::find()
        .filter(variant_material::Column::VariantId.eq(from))
        .order_by_asc(variant_material::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(|line| variant_material::ActiveModel {
            variant_id: Set(to),
            material_id: Set(line.material_id),
            count: Set(line.count),
            color_id: Set(line.color_id),
            packing_type: Set(line.packing_type),
            width: Set(line.width),
            height: Set(line.height),
            density: Set(line.density),
            loss: Set(line.loss),
            price: Set(line.price),
            main: Set(line.main),
            notes: Set(line.notes),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(ctx.user_id),
            updated_by: Set(ctx.user_id),
            ..Default::default()
        })
        .collect();

    let accessories: Vec<variant_accessory::ActiveModel> = VariantAccessoryEntity::find()
        .filter(variant_accessory::Column::VariantId.eq(from))
        .order_by_asc(variant_accessory::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(|line| variant_accessory::ActiveModel {
            variant_id: Set(to),
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
        })
        .collect();

    let sizes: Vec<variant_size::ActiveModel> = VariantSizeEntity::find()
        .filter(variant_size::Column::VariantId.eq(from))
        .order_by_asc(variant_size::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(|line| variant_size::ActiveModel {
            variant_id: Set(to),
            size_id: Set(line.size_id),
            notes: Set(line.notes),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(ctx.user_id),
            updated_by: Set(ctx.user_id),
            ..Default::default()
        })
        .collect();

    let operations: Vec<variant_operation::ActiveModel> = VariantOperationEntity::find()
        .filter(variant_operation::Column::VariantId.eq(from))
        .order_by_asc(variant_operation::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(|line| variant_operation::ActiveModel {
            variant_id: Set(to),
            operation_id: Set(line.operation_id),
            seconds: Set(line.seconds),
            price: Set(line.price),
            notes: Set(line.notes),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(ctx.user_id),
            updated_by: Set(ctx.user_id),
            ..Default::default()
        })
        .collect();

    let counts = CopiedLines {
        materials: materials.len(),
        accessories: accessories.len(),
        sizes: sizes.len(),
        operations: operations.len(),
    };

    // insert_many rejects an empty batch
    if !materials.is_empty() {
        VariantMaterialEntity::insert_many(materials).exec(conn).await?;
    }
    if !accessories.is_empty() {
        VariantAccessoryEntity::insert_many(accessories).exec(conn).await?;
    }
    if !sizes.is_empty() {
        VariantSizeEntity::insert_many(sizes).exec(conn).await?;
    }
    if !operations.is_empty() {
        VariantOperationEntity::insert_many(operations).exec(conn).await?;
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn naming() -> CloneNaming {
        CloneNaming::new("Sample", "copy").unwrap()
    }

    fn taken(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[rstest]
    #[case("Model A", "Model A")]
    #[case("Model A (copy)", "Model A")]
    #[case("Model A (copy 2)", "Model A")]
    #[case("Model A (Copy 7) (copy)", "Model A")]
    #[case("Model A (copy3)", "Model A")]
    #[case("Model A (draft)", "Model A (draft)")]
    #[case("copy", "copy")]
    #[case("  Model A", "Model A")]
    #[case("  Model A (copy)  ", "Model A")]
    fn strips_trailing_copy_suffixes(#[case] name: &str, #[case] base: &str) {
        assert_eq!(naming().strip_copy_suffixes(name), base);
    }

    #[test]
    fn first_clone_gets_plain_copy_suffix() {
        let name = naming().next_clone_name("Model A", &taken(&["Model A"]));
        assert_eq!(name, "Model A (copy)");
    }

    #[test]
    fn leading_whitespace_is_dropped_from_the_clone_name() {
        let name = naming().next_clone_name("  Model A", &taken(&["  Model A"]));
        assert_eq!(name, "Model A (copy)");
    }

    #[test]
    fn existing_copy_pushes_to_copy_two() {
        let name = naming().next_clone_name("Model A", &taken(&["Model A", "Model A (copy)"]));
        assert_eq!(name, "Model A (copy 2)");
    }

    #[test]
    fn cloning_a_copy_reuses_the_base_name() {
        let used = taken(&["Model A", "Model A (copy)", "Model A (copy 2)"]);
        assert_eq!(naming().next_clone_name("Model A (copy 2)", &used), "Model A (copy 3)");
    }

    #[test]
    fn gaps_are_filled_first() {
        let used = taken(&["Model A", "Model A (copy 2)"]);
        assert_eq!(naming().next_clone_name("Model A", &used), "Model A (copy)");
    }

    #[test]
    fn custom_copy_label() {
        let naming = CloneNaming::new("Образец", "копия").unwrap();
        let used = taken(&["Платье", "Платье (копия)"]);
        assert_eq!(naming.next_clone_name("Платье (копия)", &used), "Платье (копия 2)");
        assert_eq!(naming.sample_name(), "Образец");
    }
}
