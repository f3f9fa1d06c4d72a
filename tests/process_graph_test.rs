mod common;

use assert_matches::assert_matches;
use common::TestApp;
use sewing_costing::{errors::ServiceError, models::ProcessRelation};

#[tokio::test]
async fn links_are_queryable_in_both_directions() {
    let app = TestApp::new().await;
    let graph = app.services.processes();

    graph
        .link(&app.ctx, 1, 2, ProcessRelation::Replaceable)
        .await
        .unwrap();
    graph
        .link(&app.ctx, 1, 3, ProcessRelation::Required)
        .await
        .unwrap();
    let back = graph
        .link(&app.ctx, 2, 1, ProcessRelation::Replaceable)
        .await
        .unwrap();
    assert_eq!(back.created_by, Some(1));

    let from_one = graph.links_from(1, None).await.unwrap();
    assert_eq!(from_one.len(), 2);

    let required = graph
        .links_from(1, Some(ProcessRelation::Required))
        .await
        .unwrap();
    assert_eq!(required.len(), 1);
    assert_eq!(required[0].to_process_id, 3);

    let into_one = graph.links_to(1, None).await.unwrap();
    assert_eq!(into_one.len(), 1);
    assert_eq!(into_one[0].from_process_id, 2);
}

#[tokio::test]
async fn duplicate_and_self_links_are_rejected() {
    let app = TestApp::new().await;
    let graph = app.services.processes();
    graph
        .link(&app.ctx, 4, 5, ProcessRelation::Required)
        .await
        .unwrap();

    assert_matches!(
        graph.link(&app.ctx, 4, 5, ProcessRelation::Required).await,
        Err(ServiceError::Conflict(_))
    );
    assert_matches!(
        graph.link(&app.ctx, 6, 6, ProcessRelation::Replaceable).await,
        Err(ServiceError::ValidationError(_))
    );
    // same pair, different relation
    assert!(graph
        .link(&app.ctx, 4, 5, ProcessRelation::Replaceable)
        .await
        .is_ok());
}

#[tokio::test]
async fn unlink_removes_only_the_named_edge() {
    let app = TestApp::new().await;
    let graph = app.services.processes();
    graph
        .link(&app.ctx, 7, 8, ProcessRelation::Required)
        .await
        .unwrap();
    graph
        .link(&app.ctx, 7, 9, ProcessRelation::Required)
        .await
        .unwrap();

    graph
        .unlink(&app.ctx, 7, 8, ProcessRelation::Required)
        .await
        .unwrap();
    let remaining = graph.links_from(7, None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].to_process_id, 9);

    assert_matches!(
        graph.unlink(&app.ctx, 7, 8, ProcessRelation::Required).await,
        Err(ServiceError::NotFound(_))
    );
}
