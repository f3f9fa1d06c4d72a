#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sewing_costing::{
    config::CostingConfig,
    db::{self, DbConfig},
    entities::{product, sewing_order, sewing_order_item, variant},
    models::{AuditContext, VariantKind},
    services::{
        costing::round_money,
        orders::{NewOrder, NewOrderItem},
        products::{NewProduct, ProductPricing},
        variant_lines::{AccessoryLineInput, MaterialLineInput, NewVariant, OperationLineInput},
        ServiceFactory,
    },
};

/// Services wired to a fresh, migrated in-memory SQLite database.
pub struct TestApp {
    pub services: ServiceFactory,
    pub ctx: AuditContext,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_costing(CostingConfig::default()).await
    }

    pub async fn with_costing(costing: CostingConfig) -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::in_memory())
            .await
            .expect("failed to open in-memory database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let services =
            ServiceFactory::new(Arc::new(pool), costing).expect("failed to build services");
        Self {
            services,
            ctx: AuditContext::user(1),
        }
    }

    pub async fn product(&self, pricing: ProductPricing) -> product::Model {
        self.services
            .products()
            .create_product(
                &self.ctx,
                NewProduct {
                    name: "Basic tee".to_string(),
                    vendor_code: "TEE-001".to_string(),
                    season: "SS24".to_string(),
                    category_id: None,
                    pricing,
                },
            )
            .await
            .expect("failed to create product")
    }

    pub async fn variant(&self, product_id: i32, name: &str) -> variant::Model {
        self.variant_of_kind(product_id, name, VariantKind::Marketing)
            .await
    }

    pub async fn variant_of_kind(
        &self,
        product_id: i32,
        name: &str,
        kind: VariantKind,
    ) -> variant::Model {
        self.services
            .variants()
            .create_variant(
                &self.ctx,
                NewVariant {
                    product_id,
                    kind,
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect("failed to create variant")
    }

    pub async fn material(&self, variant_id: i32, price: Decimal, count: Decimal, loss: Decimal) {
        self.services
            .variants()
            .add_material(
                &self.ctx,
                variant_id,
                MaterialLineInput {
                    material_id: 100,
                    price: Some(price),
                    count: Some(count),
                    loss: Some(loss),
                    main: true,
                    ..Default::default()
                },
            )
            .await
            .expect("failed to add material line");
    }

    pub async fn accessory(&self, variant_id: i32, accessory_id: i32, price: Decimal, count: Decimal) {
        self.services
            .variants()
            .add_accessory(
                &self.ctx,
                variant_id,
                AccessoryLineInput {
                    accessory_id,
                    price: Some(price),
                    count: Some(count),
                    ..Default::default()
                },
            )
            .await
            .expect("failed to add accessory line");
    }

    pub async fn operation(&self, variant_id: i32, operation_id: i32, seconds: i32) {
        self.services
            .variants()
            .add_operation(
                &self.ctx,
                variant_id,
                OperationLineInput {
                    operation_id,
                    seconds,
                    price: Some(dec!(0.10)),
                    notes: None,
                },
            )
            .await
            .expect("failed to add operation line");
    }

    pub async fn stored_price(&self, variant_id: i32) -> Decimal {
        let variant = self
            .services
            .variants()
            .get_variant(variant_id)
            .await
            .expect("variant should exist");
        round_money(variant.unit_price)
    }

    pub async fn order(&self) -> sewing_order::Model {
        self.services
            .orders()
            .create_order(
                &self.ctx,
                NewOrder {
                    customer_id: 7,
                    ..Default::default()
                },
            )
            .await
            .expect("failed to create order")
    }

    /// Adds an item priced by snapshot of the variant and fills in size counts.
    pub async fn order_item(
        &self,
        order_id: i32,
        variant_id: i32,
        sizes: &[(i32, i32)],
    ) -> sewing_order_item::Model {
        let change = self
            .services
            .orders()
            .add_item(
                &self.ctx,
                order_id,
                NewOrderItem {
                    variant_id,
                    ..Default::default()
                },
            )
            .await
            .expect("failed to add order item");
        for (size_id, qty) in sizes {
            self.services
                .orders()
                .set_size_count(&self.ctx, change.item.id, *size_id, *qty)
                .await
                .expect("failed to set size count");
        }
        change.item
    }
}

/// Product pricing shared by the worked examples: 18 in fixed costs and a 17% markup.
pub fn reference_pricing() -> ProductPricing {
    ProductPricing {
        cutting_price: Some(dec!(10)),
        transfer_price: Some(dec!(5)),
        print_price: Some(dec!(2)),
        embroidery_price: Some(dec!(1)),
        sewing_loss_percent: Some(dec!(2.5)),
        other_expenses_percent: Some(dec!(1.5)),
        profitability_percent: Some(dec!(10)),
        commission_percent: Some(dec!(3)),
        discount_percent: Some(Decimal::ZERO),
    }
}
