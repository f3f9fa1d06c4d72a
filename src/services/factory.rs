use std::sync::Arc;

use crate::{
    config::CostingConfig,
    db::DbPool,
    errors::ServiceError,
    services::{
        consistency::ConsistencyAuditor, fill_from::FillFromService,
        order_aggregator::OrderAggregator, orders::OrderService, process_graph::ProcessGraphService,
        products::ProductService, recalculation::RecalculationCoordinator,
        variant_cloner::{CloneNaming, VariantCloner},
        variant_lines::VariantLineService,
    },
};

/// Factory for creating service instances with shared dependencies
#[derive(Clone)]
pub struct ServiceFactory {
    db_pool: Arc<DbPool>,
    costing: CostingConfig,
    naming: CloneNaming,
}

impl ServiceFactory {
    /// Fails when the configured copy label cannot be turned into a suffix pattern.
    pub fn new(db_pool: Arc<DbPool>, costing: CostingConfig) -> Result<Self, ServiceError> {
        let naming = CloneNaming::from_config(&costing)?;
        Ok(Self {
            db_pool,
            costing,
            naming,
        })
    }

    pub fn coordinator(&self) -> RecalculationCoordinator {
        RecalculationCoordinator::new(self.db_pool.clone())
    }

    pub fn cloner(&self) -> VariantCloner {
        VariantCloner::new(self.db_pool.clone(), self.naming.clone())
    }

    pub fn fill_from(&self) -> FillFromService {
        FillFromService::new(self.db_pool.clone())
    }

    pub fn aggregator(&self) -> OrderAggregator {
        OrderAggregator::new(self.db_pool.clone())
    }

    pub fn products(&self) -> ProductService {
        ProductService::new(self.db_pool.clone())
    }

    pub fn variants(&self) -> VariantLineService {
        VariantLineService::new(self.db_pool.clone(), self.costing.sample_variant_name.clone())
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(self.db_pool.clone())
    }

    pub fn processes(&self) -> ProcessGraphService {
        ProcessGraphService::new(self.db_pool.clone())
    }

    pub fn auditor(&self) -> ConsistencyAuditor {
        ConsistencyAuditor::new(self.db_pool.clone())
    }

    /// Gets a reference to the database pool
    pub fn db_pool(&self) -> &Arc<DbPool> {
        &self.db_pool
    }
}
