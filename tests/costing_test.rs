mod common;

use assert_matches::assert_matches;
use common::{reference_pricing, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sewing_costing::{
    errors::ServiceError,
    services::{products::ProductPricing, CostEngine, RecalcStatus},
};

#[tokio::test]
async fn variant_without_lines_is_priced_from_fixed_costs() {
    let app = TestApp::new().await;
    let product = app.product(reference_pricing()).await;
    let variant = app.variant(product.id, "Model A").await;

    assert_eq!(variant.unit_price, dec!(21.06));
    assert_eq!(app.stored_price(variant.id).await, dec!(21.06));

    let breakdown = CostEngine::compute_for_variant(&**app.services.db_pool(), variant.id)
        .await
        .unwrap();
    assert_eq!(breakdown.base, dec!(18));
    assert_eq!(breakdown.markup, dec!(3.06));
    assert!(!breakdown.clamped);
}

#[tokio::test]
async fn adding_a_material_line_reprices_the_variant() {
    let app = TestApp::new().await;
    let product = app.product(reference_pricing()).await;
    let variant = app.variant(product.id, "Model A").await;

    app.material(variant.id, dec!(5), dec!(0.25), dec!(1.5)).await;

    assert_eq!(app.stored_price(variant.id).await, dec!(22.54));
    let breakdown = CostEngine::compute_for_variant(&**app.services.db_pool(), variant.id)
        .await
        .unwrap();
    assert_eq!(breakdown.materials_cost, dec!(1.26875));
}

#[tokio::test]
async fn removing_the_only_line_restores_the_base_price() {
    let app = TestApp::new().await;
    let product = app.product(reference_pricing()).await;
    let variant = app.variant(product.id, "Model A").await;
    let variants = app.services.variants();

    let change = variants
        .add_accessory(
            &app.ctx,
            variant.id,
            sewing_costing::services::variant_lines::AccessoryLineInput {
                accessory_id: 3,
                price: Some(dec!(2)),
                count: Some(dec!(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(change.recalculation.status, RecalcStatus::Updated);
    assert_eq!(change.recalculation.current, dec!(23.40));

    let recalculation = variants.delete_accessory(&app.ctx, change.line.id).await.unwrap();
    assert_eq!(recalculation.current, dec!(21.06));
    assert_eq!(app.stored_price(variant.id).await, dec!(21.06));
}

#[tokio::test]
async fn product_pricing_change_reprices_every_variant() {
    let app = TestApp::new().await;
    let product = app.product(reference_pricing()).await;
    let a = app.variant(product.id, "Model A").await;
    let b = app.variant(product.id, "Model B").await;
    app.material(b.id, dec!(5), dec!(0.25), dec!(1.5)).await;

    let mut pricing = reference_pricing();
    pricing.cutting_price = Some(dec!(20));
    let change = app
        .services
        .products()
        .update_pricing(&app.ctx, product.id, pricing)
        .await
        .unwrap();

    assert_eq!(change.recalculations.len(), 2);
    assert!(change.recalculations.iter().all(|r| r.written));
    // base 28 * 1.17
    assert_eq!(app.stored_price(a.id).await, dec!(32.76));
    // base 29.26875 * 1.17 = 34.2444375
    assert_eq!(app.stored_price(b.id).await, dec!(34.24));
}

#[tokio::test]
async fn negative_pricing_is_rejected_and_nothing_changes() {
    let app = TestApp::new().await;
    let product = app.product(reference_pricing()).await;
    let variant = app.variant(product.id, "Model A").await;

    let mut pricing = reference_pricing();
    pricing.print_price = Some(dec!(-2));
    let err = app
        .services
        .products()
        .update_pricing(&app.ctx, product.id, pricing)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let stored = app.services.products().get_product(product.id).await.unwrap();
    assert_eq!(stored.print_price.map(sewing_costing::services::costing::round_money), Some(dec!(2)));
    assert_eq!(app.stored_price(variant.id).await, dec!(21.06));
}

#[tokio::test]
async fn discount_above_gross_clamps_the_price_to_zero() {
    let app = TestApp::new().await;
    let product = app.product(reference_pricing()).await;
    let variant = app.variant(product.id, "Model A").await;

    let mut pricing = reference_pricing();
    pricing.discount_percent = Some(dec!(150));
    let change = app
        .services
        .products()
        .update_pricing(&app.ctx, product.id, pricing)
        .await
        .unwrap();

    assert_eq!(change.recalculations[0].status, RecalcStatus::ClampedToZero);
    assert_eq!(app.stored_price(variant.id).await, Decimal::ZERO);
}

#[tokio::test]
async fn missing_pricing_fields_count_as_zero() {
    let app = TestApp::new().await;
    let product = app.product(ProductPricing::default()).await;
    let variant = app.variant(product.id, "Blank").await;
    assert_eq!(variant.unit_price, Decimal::ZERO);

    app.accessory(variant.id, 1, dec!(1.25), dec!(2)).await;
    assert_eq!(app.stored_price(variant.id).await, dec!(2.50));
}

#[tokio::test]
async fn repeated_recompute_is_a_no_op() {
    let app = TestApp::new().await;
    let product = app.product(reference_pricing()).await;
    let variant = app.variant(product.id, "Model A").await;

    let first = app
        .services
        .coordinator()
        .on_cost_line_changed(&app.ctx, variant.id)
        .await
        .unwrap();
    assert_eq!(first.status, RecalcStatus::Unchanged);
    assert!(!first.written);
    assert_eq!(first.previous, first.current);
}

#[tokio::test]
async fn unknown_variant_is_not_found() {
    let app = TestApp::new().await;
    let err = app
        .services
        .coordinator()
        .on_cost_line_changed(&app.ctx, 404)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
