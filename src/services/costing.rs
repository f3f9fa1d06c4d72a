use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::{error, instrument};

use crate::{
    entities::{
        product::{self, Entity as ProductEntity},
        variant::{self, Entity as VariantEntity},
        variant_accessory::{self, Entity as VariantAccessoryEntity},
        variant_material::{self, Entity as VariantMaterialEntity},
    },
    errors::ServiceError,
};

/// Rounds a money amount to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Capacity of the `decimal(12,2)` money columns.
pub const MAX_MONEY: Decimal = dec!(9999999999.99);
/// Capacity of the `decimal(12,3)` line count columns.
pub const MAX_COUNT: Decimal = dec!(999999999.999);
/// Capacity of the `decimal(5,2)` percentage columns.
pub const MAX_PERCENT: Decimal = dec!(999.99);

/// Rejects a value below zero or above `max`. Inside these bounds no price
/// term can overflow `Decimal`.
pub fn check_range(field: &str, value: Decimal, max: Decimal) -> Result<(), ServiceError> {
    if value < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{} must not be negative, got {}",
            field, value
        )));
    }
    if value > max {
        return Err(ServiceError::ValidationError(format!(
            "{} must not exceed {}, got {}",
            field, max, value
        )));
    }
    Ok(())
}

/// Prefixes a line validation message with the line's kind and 1-based position.
fn in_line(kind: &'static str, idx: usize) -> impl FnOnce(ServiceError) -> ServiceError {
    move |err| match err {
        ServiceError::ValidationError(msg) => {
            ServiceError::ValidationError(format!("{} line {}: {}", kind, idx + 1, msg))
        }
        other => other,
    }
}

fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    amount * percent / Decimal::ONE_HUNDRED
}

/// Product-level prices and percentages, with absent values read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PricingInputs {
    pub cutting: Decimal,
    pub transfer: Decimal,
    pub print: Decimal,
    pub embroidery: Decimal,
    pub sewing_loss_percent: Decimal,
    pub other_expenses_percent: Decimal,
    pub profitability_percent: Decimal,
    pub commission_percent: Decimal,
    pub discount_percent: Decimal,
}

impl From<&product::Model> for PricingInputs {
    fn from(p: &product::Model) -> Self {
        Self {
            cutting: p.cutting_price.unwrap_or_default(),
            transfer: p.transfer_price.unwrap_or_default(),
            print: p.print_price.unwrap_or_default(),
            embroidery: p.embroidery_price.unwrap_or_default(),
            sewing_loss_percent: p.sewing_loss_percent.unwrap_or_default(),
            other_expenses_percent: p.other_expenses_percent.unwrap_or_default(),
            profitability_percent: p.profitability_percent.unwrap_or_default(),
            commission_percent: p.commission_percent.unwrap_or_default(),
            discount_percent: p.discount_percent.unwrap_or_default(),
        }
    }
}

impl PricingInputs {
    pub fn fixed_costs(&self) -> Decimal {
        self.cutting + self.transfer + self.print + self.embroidery
    }

    pub fn markup_percent(&self) -> Decimal {
        self.sewing_loss_percent
            + self.other_expenses_percent
            + self.profitability_percent
            + self.commission_percent
    }

    /// Rejects negative or out-of-range money and percentage fields.
    pub fn validate(&self) -> Result<(), ServiceError> {
        let fields = [
            ("cutting_price", self.cutting, MAX_MONEY),
            ("transfer_price", self.transfer, MAX_MONEY),
            ("print_price", self.print, MAX_MONEY),
            ("embroidery_price", self.embroidery, MAX_MONEY),
            ("sewing_loss_percent", self.sewing_loss_percent, MAX_PERCENT),
            ("other_expenses_percent", self.other_expenses_percent, MAX_PERCENT),
            ("profitability_percent", self.profitability_percent, MAX_PERCENT),
            ("commission_percent", self.commission_percent, MAX_PERCENT),
            ("discount_percent", self.discount_percent, MAX_PERCENT),
        ];
        fields
            .iter()
            .try_for_each(|(name, value, max)| check_range(name, *value, *max))
    }
}

/// One material line as seen by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaterialCost {
    pub price: Decimal,
    pub count: Decimal,
    /// Loss, percent.
    pub loss: Decimal,
}

impl MaterialCost {
    pub fn new(price: Decimal, count: Decimal, loss: Decimal) -> Self {
        Self { price, count, loss }
    }

    pub fn cost(&self) -> Decimal {
        self.price * self.count * (Decimal::ONE + self.loss / Decimal::ONE_HUNDRED)
    }
}

impl From<&variant_material::Model> for MaterialCost {
    fn from(line: &variant_material::Model) -> Self {
        Self {
            price: line.price.unwrap_or_default(),
            count: line.count.unwrap_or_default(),
            loss: line.loss.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccessoryCost {
    pub price: Decimal,
    pub count: Decimal,
}

impl AccessoryCost {
    pub fn new(price: Decimal, count: Decimal) -> Self {
        Self { price, count }
    }

    pub fn cost(&self) -> Decimal {
        self.price * self.count
    }
}

impl From<&variant_accessory::Model> for AccessoryCost {
    fn from(line: &variant_accessory::Model) -> Self {
        Self {
            price: line.price.unwrap_or_default(),
            count: line.count.unwrap_or_default(),
        }
    }
}

/// Everything the engine needs to price one variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariantCostInputs {
    pub pricing: PricingInputs,
    pub materials: Vec<MaterialCost>,
    pub accessories: Vec<AccessoryCost>,
}

impl VariantCostInputs {
    /// Reads the variant's product and cost lines through `conn`, so that a
    /// caller inside a transaction sees its own uncommitted line writes.
    pub async fn load<C: ConnectionTrait>(
        conn: &C,
        variant: &variant::Model,
    ) -> Result<Self, ServiceError> {
        let product = ProductEntity::find_by_id(variant.product_id)
            .one(conn)
            .await
            .map_err(|e| {
                error!(variant_id = variant.id, error = %e, "Failed to load product for variant");
                ServiceError::db_error(e)
            })?
            .ok_or_else(|| ServiceError::not_found("Product", variant.product_id))?;

        Self::load_with_pricing(conn, variant.id, PricingInputs::from(&product)).await
    }

    /// Same as [`VariantCostInputs::load`] with the product pricing already in hand.
    pub async fn load_with_pricing<C: ConnectionTrait>(
        conn: &C,
        variant_id: i32,
        pricing: PricingInputs,
    ) -> Result<Self, ServiceError> {
        let materials = VariantMaterialEntity::find()
            .filter(variant_material::Column::VariantId.eq(variant_id))
            .order_by_asc(variant_material::Column::Id)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?;

        let accessories = VariantAccessoryEntity::find()
            .filter(variant_accessory::Column::VariantId.eq(variant_id))
            .order_by_asc(variant_accessory::Column::Id)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(Self {
            pricing,
            materials: materials.iter().map(MaterialCost::from).collect(),
            accessories: accessories.iter().map(AccessoryCost::from).collect(),
        })
    }

    /// Negative prices, counts or percentages make the price meaningless, and
    /// values past the column capacity could overflow the computation.
    pub fn validate(&self) -> Result<(), ServiceError> {
        self.pricing.validate()?;
        for (idx, line) in self.materials.iter().enumerate() {
            check_range("price", line.price, MAX_MONEY)
                .and_then(|_| check_range("count", line.count, MAX_COUNT))
                .and_then(|_| check_range("loss", line.loss, MAX_PERCENT))
                .map_err(in_line("material", idx))?;
        }
        for (idx, line) in self.accessories.iter().enumerate() {
            check_range("price", line.price, MAX_MONEY)
                .and_then(|_| check_range("count", line.count, MAX_COUNT))
                .map_err(in_line("accessory", idx))?;
        }
        Ok(())
    }
}

/// Every intermediate term of a price computation. Only `unit_price` is rounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostBreakdown {
    pub materials_cost: Decimal,
    pub accessories_cost: Decimal,
    pub fixed_costs: Decimal,
    pub base: Decimal,
    pub sewing_loss: Decimal,
    pub other_expenses: Decimal,
    pub profitability: Decimal,
    pub commission: Decimal,
    pub markup: Decimal,
    pub gross: Decimal,
    pub discount: Decimal,
    pub unit_price: Decimal,
    /// The discounted price came out negative and was clamped to zero.
    pub clamped: bool,
}

/// Pure unit-price computation for variants.
pub struct CostEngine;

impl CostEngine {
    /// Computes the full breakdown. Each percentage applies to `base` on its
    /// own; markups do not compound.
    pub fn compute(inputs: &VariantCostInputs) -> CostBreakdown {
        let pricing = &inputs.pricing;

        let materials_cost: Decimal = inputs.materials.iter().map(MaterialCost::cost).sum();
        let accessories_cost: Decimal = inputs.accessories.iter().map(AccessoryCost::cost).sum();
        let fixed_costs = pricing.fixed_costs();
        let base = materials_cost + accessories_cost + fixed_costs;

        let sewing_loss = percent_of(base, pricing.sewing_loss_percent);
        let other_expenses = percent_of(base, pricing.other_expenses_percent);
        let profitability = percent_of(base, pricing.profitability_percent);
        let commission = percent_of(base, pricing.commission_percent);
        let markup = sewing_loss + other_expenses + profitability + commission;

        let gross = base + markup;
        let discount = percent_of(gross, pricing.discount_percent);

        let rounded = round_money(gross - discount);
        let clamped = rounded < Decimal::ZERO;
        let unit_price = if clamped { Decimal::ZERO } else { rounded };

        CostBreakdown {
            materials_cost,
            accessories_cost,
            fixed_costs,
            base,
            sewing_loss,
            other_expenses,
            profitability,
            commission,
            markup,
            gross,
            discount,
            unit_price,
            clamped,
        }
    }

    pub fn unit_price(inputs: &VariantCostInputs) -> Decimal {
        Self::compute(inputs).unit_price
    }

    /// Loads a variant's inputs through `conn` and prices it without writing anything.
    #[instrument(skip(conn))]
    pub async fn compute_for_variant<C: ConnectionTrait>(
        conn: &C,
        variant_id: i32,
    ) -> Result<CostBreakdown, ServiceError> {
        let variant = VariantEntity::find_by_id(variant_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Variant", variant_id))?;

        let inputs = VariantCostInputs::load(conn, &variant).await?;
        inputs.validate()?;
        Ok(Self::compute(&inputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_pricing() -> PricingInputs {
        PricingInputs {
            cutting: dec!(10),
            transfer: dec!(5),
            print: dec!(2),
            embroidery: dec!(1),
            sewing_loss_percent: dec!(2.5),
            other_expenses_percent: dec!(1.5),
            profitability_percent: dec!(10),
            commission_percent: dec!(3),
            discount_percent: Decimal::ZERO,
        }
    }

    #[test]
    fn fixed_costs_only() {
        let inputs = VariantCostInputs {
            pricing: scenario_pricing(),
            ..Default::default()
        };

        let breakdown = CostEngine::compute(&inputs);
        assert_eq!(breakdown.base, dec!(18));
        assert_eq!(breakdown.markup, dec!(3.06));
        assert_eq!(breakdown.unit_price, dec!(21.06));
        assert!(!breakdown.clamped);
    }

    #[test]
    fn material_line_with_loss() {
        let inputs = VariantCostInputs {
            pricing: scenario_pricing(),
            materials: vec![MaterialCost::new(dec!(5), dec!(0.25), dec!(1.5))],
            accessories: vec![],
        };

        let breakdown = CostEngine::compute(&inputs);
        assert_eq!(breakdown.materials_cost, dec!(1.26875));
        assert_eq!(breakdown.base, dec!(19.26875));
        assert_eq!(breakdown.markup, dec!(3.2756875));
        assert_eq!(breakdown.unit_price, dec!(22.54));
    }

    #[test]
    fn markups_do_not_compound() {
        let inputs = VariantCostInputs {
            pricing: PricingInputs {
                cutting: dec!(100),
                sewing_loss_percent: dec!(10),
                profitability_percent: dec!(10),
                ..Default::default()
            },
            ..Default::default()
        };

        let breakdown = CostEngine::compute(&inputs);
        assert_eq!(breakdown.sewing_loss, dec!(10));
        assert_eq!(breakdown.profitability, dec!(10));
        assert_eq!(breakdown.unit_price, dec!(120));
    }

    #[test]
    fn discount_applies_to_gross() {
        let inputs = VariantCostInputs {
            pricing: PricingInputs {
                cutting: dec!(100),
                commission_percent: dec!(20),
                discount_percent: dec!(10),
                ..Default::default()
            },
            accessories: vec![AccessoryCost::new(dec!(2.5), dec!(4))],
            ..Default::default()
        };

        let breakdown = CostEngine::compute(&inputs);
        assert_eq!(breakdown.accessories_cost, dec!(10));
        assert_eq!(breakdown.gross, dec!(132));
        assert_eq!(breakdown.discount, dec!(13.2));
        assert_eq!(breakdown.unit_price, dec!(118.8));
    }

    #[test]
    fn rounds_half_up_once() {
        // 0.125 rounds to 0.13, not banker's 0.12
        let inputs = VariantCostInputs {
            pricing: PricingInputs::default(),
            accessories: vec![AccessoryCost::new(dec!(0.05), dec!(2.5))],
            ..Default::default()
        };
        assert_eq!(CostEngine::unit_price(&inputs), dec!(0.13));
    }

    #[test]
    fn discount_over_hundred_percent_clamps() {
        let inputs = VariantCostInputs {
            pricing: PricingInputs {
                cutting: dec!(10),
                discount_percent: dec!(150),
                ..Default::default()
            },
            ..Default::default()
        };

        let breakdown = CostEngine::compute(&inputs);
        assert_eq!(breakdown.unit_price, Decimal::ZERO);
        assert!(breakdown.clamped);
    }

    #[test]
    fn empty_inputs_price_to_zero() {
        let breakdown = CostEngine::compute(&VariantCostInputs::default());
        assert_eq!(breakdown.unit_price, Decimal::ZERO);
        assert!(!breakdown.clamped);
    }

    #[test]
    fn negative_fields_fail_validation() {
        let mut inputs = VariantCostInputs {
            pricing: scenario_pricing(),
            ..Default::default()
        };
        assert!(inputs.validate().is_ok());

        inputs.pricing.print = dec!(-1);
        assert!(matches!(inputs.validate(), Err(ServiceError::ValidationError(msg)) if msg.contains("print_price")));

        inputs.pricing.print = dec!(2);
        inputs.materials.push(MaterialCost::new(dec!(1), dec!(-0.5), Decimal::ZERO));
        assert!(inputs.validate().is_err());
    }

    #[test]
    fn values_past_column_capacity_fail_validation() {
        let mut inputs = VariantCostInputs {
            pricing: scenario_pricing(),
            ..Default::default()
        };
        inputs.pricing.discount_percent = dec!(1000);
        assert!(matches!(inputs.validate(), Err(ServiceError::ValidationError(msg)) if msg.contains("discount_percent")));

        inputs.pricing.discount_percent = Decimal::ZERO;
        inputs.materials.push(MaterialCost::new(dec!(100000000000000), dec!(100000000000000), Decimal::ZERO));
        assert!(matches!(
            inputs.validate(),
            Err(ServiceError::ValidationError(msg)) if msg == "material line 1: price must not exceed 9999999999.99, got 100000000000000"
        ));
    }

    #[test]
    fn largest_accepted_inputs_compute_without_overflow() {
        let pricing = PricingInputs {
            cutting: MAX_MONEY,
            transfer: MAX_MONEY,
            print: MAX_MONEY,
            embroidery: MAX_MONEY,
            sewing_loss_percent: MAX_PERCENT,
            other_expenses_percent: MAX_PERCENT,
            profitability_percent: MAX_PERCENT,
            commission_percent: MAX_PERCENT,
            discount_percent: Decimal::ZERO,
        };
        let inputs = VariantCostInputs {
            pricing,
            materials: vec![MaterialCost::new(MAX_MONEY, MAX_COUNT, MAX_PERCENT); 50],
            accessories: vec![AccessoryCost::new(MAX_MONEY, MAX_COUNT); 50],
        };
        assert!(inputs.validate().is_ok());
        assert!(CostEngine::unit_price(&inputs) > Decimal::ZERO);
    }

    #[test]
    fn absent_product_fields_read_as_zero() {
        let now = chrono::Utc::now();
        let product = product::Model {
            id: 1,
            name: "Hoodie".into(),
            vendor_code: "H-1".into(),
            season: "AW24".into(),
            category_id: None,
            cutting_price: Some(dec!(7)),
            transfer_price: None,
            print_price: None,
            embroidery_price: None,
            sewing_loss_percent: None,
            other_expenses_percent: None,
            profitability_percent: Some(dec!(10)),
            commission_percent: None,
            discount_percent: None,
            created_at: now,
            updated_at: now,
            created_by: None,
            updated_by: None,
        };

        let pricing = PricingInputs::from(&product);
        assert_eq!(pricing.fixed_costs(), dec!(7));
        assert_eq!(pricing.markup_percent(), dec!(10));
        assert_eq!(pricing.discount_percent, Decimal::ZERO);
    }
}
