mod common;

use assert_matches::assert_matches;
use common::{reference_pricing, TestApp};
use rust_decimal_macros::dec;
use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, QueryFilter};
use sewing_costing::{
    entities::{sewing_order, variant, SewingOrder, Variant},
    errors::{ErrorKind, ServiceError},
};

#[tokio::test]
async fn clean_database_audits_clean() {
    let app = TestApp::new().await;
    let product = app.product(reference_pricing()).await;
    let variant = app.variant(product.id, "Model A").await;
    app.material(variant.id, dec!(5), dec!(0.25), dec!(1.5)).await;
    let order = app.order().await;
    app.order_item(order.id, variant.id, &[(1, 5), (2, 3)]).await;

    let report = app.services.auditor().audit().await.unwrap();
    assert!(report.is_clean(), "unexpected issues: {:?}", report.issues);
    assert_eq!(report.variants_checked, 1);
    assert_eq!(report.orders_checked, 1);
}

#[tokio::test]
async fn stale_variant_price_is_reported_not_repaired() {
    let app = TestApp::new().await;
    let product = app.product(reference_pricing()).await;
    let variant = app.variant(product.id, "Model A").await;

    Variant::update_many()
        .col_expr(variant::Column::UnitPrice, Expr::value(dec!(99.99)))
        .filter(variant::Column::Id.eq(variant.id))
        .exec(&**app.services.db_pool())
        .await
        .unwrap();

    let err = app
        .services
        .coordinator()
        .verify_variant(variant.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);

    let report = app.services.auditor().audit().await.unwrap();
    assert_eq!(report.issues.len(), 1);
    assert_matches!(
        report.issues[0],
        ServiceError::ConsistencyError { entity: "variant", id, .. } if id == variant.id
    );
    assert_eq!(app.stored_price(variant.id).await, dec!(99.99));

    // an explicit recompute heals it
    app.services
        .coordinator()
        .on_cost_line_changed(&app.ctx, variant.id)
        .await
        .unwrap();
    assert!(app.services.auditor().audit().await.unwrap().is_clean());
}

#[tokio::test]
async fn stale_order_totals_are_reported() {
    let app = TestApp::new().await;
    let product = app.product(reference_pricing()).await;
    let variant = app.variant(product.id, "Model A").await;
    let order = app.order().await;
    app.order_item(order.id, variant.id, &[(1, 2)]).await;

    SewingOrder::update_many()
        .col_expr(sewing_order::Column::TotalQty, Expr::value(50))
        .filter(sewing_order::Column::Id.eq(order.id))
        .exec(&**app.services.db_pool())
        .await
        .unwrap();

    let err = app
        .services
        .aggregator()
        .verify_order(order.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ConsistencyError { entity: "order", .. });

    let totals = app
        .services
        .aggregator()
        .recompute_order(order.id)
        .await
        .unwrap();
    assert!(totals.written);
    assert_eq!(totals.total_qty, 2);
    assert!(app.services.aggregator().verify_order(order.id).await.is_ok());
}
