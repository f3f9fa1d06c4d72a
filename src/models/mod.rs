//! Domain value types shared by entities and services.

pub mod audit;
pub mod enums;

pub use audit::AuditContext;
pub use enums::{LineKind, OrderStatus, OrderType, ProcessRelation, VariantKind};
