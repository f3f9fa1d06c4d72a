mod common;

use assert_matches::assert_matches;
use common::{reference_pricing, TestApp};
use rust_decimal_macros::dec;
use sewing_costing::{config::CostingConfig, errors::ServiceError, models::VariantKind};

#[tokio::test]
async fn clone_skips_names_already_taken() {
    let app = TestApp::new().await;
    let product = app.product(reference_pricing()).await;
    let source = app.variant(product.id, "Model A").await;
    app.variant(product.id, "Model A (copy)").await;

    let cloned = app
        .services
        .cloner()
        .clone_variant(&app.ctx, source.id)
        .await
        .unwrap();

    assert_eq!(cloned.name, "Model A (copy 2)");
    assert_eq!(cloned.product_id, product.id);
    assert!(cloned.cloned);
    assert_ne!(cloned.id, source.id);
}

#[tokio::test]
async fn successive_clones_get_distinct_names() {
    let app = TestApp::new().await;
    let product = app.product(reference_pricing()).await;
    let source = app.variant(product.id, "Model A").await;
    let cloner = app.services.cloner();

    let first = cloner.clone_variant(&app.ctx, source.id).await.unwrap();
    let second = cloner.clone_variant(&app.ctx, source.id).await.unwrap();
    let of_copy = cloner.clone_variant(&app.ctx, first.id).await.unwrap();

    assert_eq!(first.name, "Model A (copy)");
    assert_eq!(second.name, "Model A (copy 2)");
    assert_eq!(of_copy.name, "Model A (copy 3)");
}

#[tokio::test]
async fn clone_copies_every_line_and_matches_the_source_price() {
    let app = TestApp::new().await;
    let product = app.product(reference_pricing()).await;
    let source = app
        .variant_of_kind(product.id, "Planned tee", VariantKind::Planned)
        .await;
    app.material(source.id, dec!(5), dec!(0.25), dec!(1.5)).await;
    app.accessory(source.id, 1, dec!(0.30), dec!(4)).await;
    app.accessory(source.id, 2, dec!(0.05), dec!(10)).await;
    app.operation(source.id, 11, 45).await;
    app.services
        .variants()
        .add_size(&app.ctx, source.id, 3, None)
        .await
        .unwrap();

    let source_price = app.stored_price(source.id).await;
    let cloned = app
        .services
        .cloner()
        .clone_variant(&app.ctx, source.id)
        .await
        .unwrap();

    let variants = app.services.variants();
    assert_eq!(variants.materials(cloned.id).await.unwrap().len(), 1);
    let accessories = variants.accessories(cloned.id).await.unwrap();
    assert_eq!(
        accessories.iter().map(|a| a.accessory_id).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(variants.sizes(cloned.id).await.unwrap().len(), 1);
    let operations = variants.operations(cloned.id).await.unwrap();
    assert_eq!(operations.len(), 1);
    assert_eq!(operations[0].seconds, 45);

    assert_eq!(cloned.unit_price, source_price);
    assert_eq!(app.stored_price(cloned.id).await, source_price);
    assert_eq!(cloned.kind, VariantKind::Planned);

    // source untouched
    assert_eq!(variants.accessories(source.id).await.unwrap().len(), 2);
    assert_eq!(app.stored_price(source.id).await, source_price);
}

#[tokio::test]
async fn sample_clone_keeps_the_canonical_sample_name() {
    let app = TestApp::new().await;
    let product = app.product(reference_pricing()).await;
    let sample = app.variant_of_kind(product.id, "", VariantKind::Sample).await;
    assert_eq!(sample.name, "Sample");

    let cloned = app
        .services
        .cloner()
        .clone_variant(&app.ctx, sample.id)
        .await
        .unwrap();
    assert_eq!(cloned.name, "Sample");
    assert_eq!(cloned.kind, VariantKind::Sample);
}

#[tokio::test]
async fn configured_labels_drive_clone_names() {
    let app = TestApp::with_costing(CostingConfig {
        sample_variant_name: "Prototype".to_string(),
        copy_label: "dup".to_string(),
    })
    .await;
    let product = app.product(reference_pricing()).await;
    let source = app.variant(product.id, "Hoodie").await;

    let cloned = app
        .services
        .cloner()
        .clone_variant(&app.ctx, source.id)
        .await
        .unwrap();
    assert_eq!(cloned.name, "Hoodie (dup)");
}

#[tokio::test]
async fn cloning_a_missing_variant_is_not_found() {
    let app = TestApp::new().await;
    let err = app
        .services
        .cloner()
        .clone_variant(&app.ctx, 999)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
