use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_products_and_variants::Migration),
            Box::new(m20240301_000002_create_variant_lines::Migration),
            Box::new(m20240301_000003_create_sewing_orders::Migration),
            Box::new(m20240301_000004_create_process_links::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_products_and_variants {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_products_and_variants"
        }
    }

    fn money(col: impl IntoIden) -> ColumnDef {
        ColumnDef::new(col).decimal_len(12, 2).null().to_owned()
    }

    fn percent(col: impl IntoIden) -> ColumnDef {
        ColumnDef::new(col).decimal_len(5, 2).null().to_owned()
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::VendorCode).string().not_null())
                        .col(ColumnDef::new(Products::Season).string().not_null())
                        .col(ColumnDef::new(Products::CategoryId).integer().null())
                        .col(&mut money(Products::CuttingPrice))
                        .col(&mut money(Products::TransferPrice))
                        .col(&mut money(Products::PrintPrice))
                        .col(&mut money(Products::EmbroideryPrice))
                        .col(&mut percent(Products::SewingLossPercent))
                        .col(&mut percent(Products::OtherExpensesPercent))
                        .col(&mut percent(Products::ProfitabilityPercent))
                        .col(&mut percent(Products::CommissionPercent))
                        .col(&mut percent(Products::DiscountPercent))
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::CreatedBy).integer().null())
                        .col(ColumnDef::new(Products::UpdatedBy).integer().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Variants::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Variants::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Variants::ProductId).integer().not_null())
                        .col(ColumnDef::new(Variants::Kind).string_len(16).not_null())
                        .col(ColumnDef::new(Variants::Name).string().not_null())
                        .col(ColumnDef::new(Variants::Description).text().null())
                        .col(&mut percent(Variants::Loss))
                        .col(ColumnDef::new(Variants::WorkTypeId).integer().null())
                        .col(ColumnDef::new(Variants::DesignCode).string().null())
                        .col(
                            ColumnDef::new(Variants::Cloned)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Variants::UnitPrice)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Variants::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Variants::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Variants::CreatedBy).integer().null())
                        .col(ColumnDef::new(Variants::UpdatedBy).integer().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_variants_product_id")
                                .from(Variants::Table, Variants::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_variants_product_name")
                        .table(Variants::Table)
                        .col(Variants::ProductId)
                        .col(Variants::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Variants::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Name,
        VendorCode,
        Season,
        CategoryId,
        CuttingPrice,
        TransferPrice,
        PrintPrice,
        EmbroideryPrice,
        SewingLossPercent,
        OtherExpensesPercent,
        ProfitabilityPercent,
        CommissionPercent,
        DiscountPercent,
        CreatedAt,
        UpdatedAt,
        CreatedBy,
        UpdatedBy,
    }

    #[derive(DeriveIden)]
    pub(super) enum Variants {
        Table,
        Id,
        ProductId,
        Kind,
        Name,
        Description,
        Loss,
        WorkTypeId,
        DesignCode,
        Cloned,
        UnitPrice,
        CreatedAt,
        UpdatedAt,
        CreatedBy,
        UpdatedBy,
    }
}

mod m20240301_000002_create_variant_lines {
    use super::m20240301_000001_create_products_and_variants::Variants;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_variant_lines"
        }
    }

    /// Primary key, owning variant and audit columns shared by every line table.
    fn line_table(
        table: impl IntoIden + Copy + 'static,
        variant_id: impl IntoIden + Copy + 'static,
    ) -> TableCreateStatement {
        Table::create()
            .table(table)
            .if_not_exists()
            .col(
                ColumnDef::new(Alias::new("id"))
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(variant_id).integer().not_null())
            .foreign_key(
                ForeignKey::create()
                    .from(table, variant_id)
                    .to(Variants::Table, Variants::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .on_update(ForeignKeyAction::Cascade),
            )
            .to_owned()
    }

    fn audit_columns(table: &mut TableCreateStatement) -> TableCreateStatement {
        table
            .col(
                ColumnDef::new(Alias::new("created_at"))
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .col(
                ColumnDef::new(Alias::new("updated_at"))
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .col(ColumnDef::new(Alias::new("created_by")).integer().null())
            .col(ColumnDef::new(Alias::new("updated_by")).integer().null())
            .to_owned()
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut materials = line_table(VariantMaterials::Table, VariantMaterials::VariantId);
            materials
                .col(ColumnDef::new(VariantMaterials::MaterialId).integer().not_null())
                .col(ColumnDef::new(VariantMaterials::Count).decimal_len(12, 3).null())
                .col(ColumnDef::new(VariantMaterials::ColorId).integer().null())
                .col(ColumnDef::new(VariantMaterials::PackingType).integer().null())
                .col(ColumnDef::new(VariantMaterials::Width).decimal_len(8, 2).null())
                .col(ColumnDef::new(VariantMaterials::Height).decimal_len(8, 2).null())
                .col(ColumnDef::new(VariantMaterials::Density).decimal_len(8, 2).null())
                .col(ColumnDef::new(VariantMaterials::Loss).decimal_len(5, 2).null())
                .col(ColumnDef::new(VariantMaterials::Price).decimal_len(12, 2).null())
                .col(
                    ColumnDef::new(VariantMaterials::Main)
                        .boolean()
                        .not_null()
                        .default(false),
                )
                .col(ColumnDef::new(VariantMaterials::Notes).text().null());
            manager.create_table(audit_columns(&mut materials)).await?;

            let mut accessories =
                line_table(VariantAccessories::Table, VariantAccessories::VariantId);
            accessories
                .col(
                    ColumnDef::new(VariantAccessories::AccessoryId)
                        .integer()
                        .not_null(),
                )
                .col(ColumnDef::new(VariantAccessories::Count).decimal_len(12, 3).null())
                .col(ColumnDef::new(VariantAccessories::Price).decimal_len(12, 2).null())
                .col(
                    ColumnDef::new(VariantAccessories::LocalProduce)
                        .boolean()
                        .not_null()
                        .default(false),
                )
                .col(ColumnDef::new(VariantAccessories::Notes).text().null());
            manager.create_table(audit_columns(&mut accessories)).await?;

            let mut sizes = line_table(VariantSizes::Table, VariantSizes::VariantId);
            sizes
                .col(ColumnDef::new(VariantSizes::SizeId).integer().not_null())
                .col(ColumnDef::new(VariantSizes::Notes).text().null());
            manager.create_table(audit_columns(&mut sizes)).await?;

            let mut operations = line_table(VariantOperations::Table, VariantOperations::VariantId);
            operations
                .col(
                    ColumnDef::new(VariantOperations::OperationId)
                        .integer()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(VariantOperations::Seconds)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .col(ColumnDef::new(VariantOperations::Price).decimal_len(10, 2).null())
                .col(ColumnDef::new(VariantOperations::Notes).text().null());
            manager.create_table(audit_columns(&mut operations)).await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_variant_materials_variant_id")
                        .table(VariantMaterials::Table)
                        .col(VariantMaterials::VariantId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_variant_accessories_variant_id")
                        .table(VariantAccessories::Table)
                        .col(VariantAccessories::VariantId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uniq_size_per_variant")
                        .table(VariantSizes::Table)
                        .col(VariantSizes::VariantId)
                        .col(VariantSizes::SizeId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uniq_operation_per_variant")
                        .table(VariantOperations::Table)
                        .col(VariantOperations::VariantId)
                        .col(VariantOperations::OperationId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(VariantOperations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(VariantSizes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(VariantAccessories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(VariantMaterials::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden, Clone, Copy)]
    enum VariantMaterials {
        Table,
        VariantId,
        MaterialId,
        Count,
        ColorId,
        PackingType,
        Width,
        Height,
        Density,
        Loss,
        Price,
        Main,
        Notes,
    }

    #[derive(DeriveIden, Clone, Copy)]
    enum VariantAccessories {
        Table,
        VariantId,
        AccessoryId,
        Count,
        Price,
        LocalProduce,
        Notes,
    }

    #[derive(DeriveIden, Clone, Copy)]
    enum VariantSizes {
        Table,
        VariantId,
        SizeId,
        Notes,
    }

    #[derive(DeriveIden, Clone, Copy)]
    enum VariantOperations {
        Table,
        VariantId,
        OperationId,
        Seconds,
        Price,
        Notes,
    }
}

mod m20240301_000003_create_sewing_orders {
    use super::m20240301_000001_create_products_and_variants::Variants;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_sewing_orders"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SewingOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SewingOrders::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SewingOrders::CustomerId).integer().not_null())
                        .col(ColumnDef::new(SewingOrders::BuyerId).integer().null())
                        .col(ColumnDef::new(SewingOrders::ShipmentDate).date().null())
                        .col(
                            ColumnDef::new(SewingOrders::OrderType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(SewingOrders::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(SewingOrders::TotalQty)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SewingOrders::TotalAmount)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(SewingOrders::Notes).text().null())
                        .col(
                            ColumnDef::new(SewingOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SewingOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SewingOrders::CreatedBy).integer().null())
                        .col(ColumnDef::new(SewingOrders::UpdatedBy).integer().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SewingOrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SewingOrderItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SewingOrderItems::OrderId).integer().not_null())
                        .col(
                            ColumnDef::new(SewingOrderItems::VariantId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SewingOrderItems::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SewingOrderItems::UnitPrice)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SewingOrderItems::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(SewingOrderItems::Notes).text().null())
                        .col(
                            ColumnDef::new(SewingOrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SewingOrderItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sewing_order_items_order_id")
                                .from(SewingOrderItems::Table, SewingOrderItems::OrderId)
                                .to(SewingOrders::Table, SewingOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sewing_order_items_variant_id")
                                .from(SewingOrderItems::Table, SewingOrderItems::VariantId)
                                .to(Variants::Table, Variants::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderSizeCounts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderSizeCounts::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderSizeCounts::ItemId).integer().not_null())
                        .col(ColumnDef::new(OrderSizeCounts::SizeId).integer().not_null())
                        .col(
                            ColumnDef::new(OrderSizeCounts::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_size_counts_item_id")
                                .from(OrderSizeCounts::Table, OrderSizeCounts::ItemId)
                                .to(SewingOrderItems::Table, SewingOrderItems::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sewing_order_items_order_id")
                        .table(SewingOrderItems::Table)
                        .col(SewingOrderItems::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uniq_item_size")
                        .table(OrderSizeCounts::Table)
                        .col(OrderSizeCounts::ItemId)
                        .col(OrderSizeCounts::SizeId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderSizeCounts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SewingOrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SewingOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SewingOrders {
        Table,
        Id,
        CustomerId,
        BuyerId,
        ShipmentDate,
        OrderType,
        Status,
        TotalQty,
        TotalAmount,
        Notes,
        CreatedAt,
        UpdatedAt,
        CreatedBy,
        UpdatedBy,
    }

    #[derive(DeriveIden)]
    enum SewingOrderItems {
        Table,
        Id,
        OrderId,
        VariantId,
        Quantity,
        UnitPrice,
        Status,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderSizeCounts {
        Table,
        Id,
        ItemId,
        SizeId,
        Quantity,
    }
}

mod m20240301_000004_create_process_links {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_process_links"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProcessLinks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProcessLinks::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ProcessLinks::FromProcessId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProcessLinks::ToProcessId).integer().not_null())
                        .col(ColumnDef::new(ProcessLinks::Relation).string_len(16).not_null())
                        .col(
                            ColumnDef::new(ProcessLinks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProcessLinks::CreatedBy).integer().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uniq_process_link")
                        .table(ProcessLinks::Table)
                        .col(ProcessLinks::FromProcessId)
                        .col(ProcessLinks::ToProcessId)
                        .col(ProcessLinks::Relation)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProcessLinks::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ProcessLinks {
        Table,
        Id,
        FromProcessId,
        ToProcessId,
        Relation,
        CreatedAt,
        CreatedBy,
    }
}
