//! sea-orm entities for the costing and order tables.

pub mod order_size_count;
pub mod process_link;
pub mod product;
pub mod sewing_order;
pub mod sewing_order_item;
pub mod variant;
pub mod variant_accessory;
pub mod variant_material;
pub mod variant_operation;
pub mod variant_size;

pub use order_size_count::Entity as OrderSizeCount;
pub use process_link::Entity as ProcessLink;
pub use product::Entity as Product;
pub use sewing_order::Entity as SewingOrder;
pub use sewing_order_item::Entity as SewingOrderItem;
pub use variant::Entity as Variant;
pub use variant_accessory::Entity as VariantAccessory;
pub use variant_material::Entity as VariantMaterial;
pub use variant_operation::Entity as VariantOperation;
pub use variant_size::Entity as VariantSize;
