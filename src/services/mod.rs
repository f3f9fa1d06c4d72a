// Pricing core
pub mod costing;
pub mod recalculation;

// Variant copying
pub mod fill_from;
pub mod variant_cloner;

// Order totals
pub mod order_aggregator;

// Write path used by the surrounding CRUD layer
pub mod orders;
pub mod products;
pub mod variant_lines;

// Adjacent plumbing
pub mod consistency;
pub mod process_graph;

// Service factory for dependency injection
pub mod factory;

pub use costing::{CostBreakdown, CostEngine};
pub use factory::ServiceFactory;
pub use fill_from::{FillFromReport, FillFromService, FillOutcome};
pub use order_aggregator::{ItemTotals, OrderAggregator, OrderTotals};
pub use recalculation::{RecalcStatus, Recalculation, RecalculationCoordinator};
pub use variant_cloner::{CloneNaming, VariantCloner};
