//! Property-based tests for the pricing engine and the pure helpers around it.
//!
//! These run against in-process values only, no database.

use proptest::prelude::*;
use rust_decimal::Decimal;
use sewing_costing::services::{
    costing::{round_money, AccessoryCost, MaterialCost, PricingInputs, VariantCostInputs},
    order_aggregator::{item_totals, order_totals},
    CloneNaming, CostEngine,
};
use std::collections::HashSet;

fn money_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn percent_strategy() -> impl Strategy<Value = Decimal> {
    // 0.0% .. 50.0%
    (0i64..500).prop_map(|tenths| Decimal::new(tenths, 1))
}

fn count_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000).prop_map(|thousandths| Decimal::new(thousandths, 3))
}

fn pricing_strategy() -> impl Strategy<Value = PricingInputs> {
    (
        (money_strategy(), money_strategy(), money_strategy(), money_strategy()),
        (
            percent_strategy(),
            percent_strategy(),
            percent_strategy(),
            percent_strategy(),
        ),
    )
        .prop_map(|((cutting, transfer, print, embroidery), (loss, other, profit, commission))| {
            PricingInputs {
                cutting,
                transfer,
                print,
                embroidery,
                sewing_loss_percent: loss,
                other_expenses_percent: other,
                profitability_percent: profit,
                commission_percent: commission,
                discount_percent: Decimal::ZERO,
            }
        })
}

fn inputs_strategy() -> impl Strategy<Value = VariantCostInputs> {
    (
        pricing_strategy(),
        prop::collection::vec(
            (money_strategy(), count_strategy(), percent_strategy())
                .prop_map(|(p, c, l)| MaterialCost::new(p, c, l)),
            0..6,
        ),
        prop::collection::vec(
            (money_strategy(), count_strategy()).prop_map(|(p, c)| AccessoryCost::new(p, c)),
            0..6,
        ),
    )
        .prop_map(|(pricing, materials, accessories)| VariantCostInputs {
            pricing,
            materials,
            accessories,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn price_is_non_negative_and_in_cents(
        inputs in inputs_strategy(),
        discount in (0i64..3000).prop_map(|tenths| Decimal::new(tenths, 1)),
    ) {
        let mut inputs = inputs;
        inputs.pricing.discount_percent = discount;
        let breakdown = CostEngine::compute(&inputs);
        prop_assert!(breakdown.unit_price >= Decimal::ZERO);
        prop_assert_eq!(breakdown.unit_price, round_money(breakdown.unit_price));
        if discount <= Decimal::ONE_HUNDRED {
            prop_assert!(!breakdown.clamped);
        }
    }

    #[test]
    fn undiscounted_price_is_base_times_markup(inputs in inputs_strategy()) {
        let breakdown = CostEngine::compute(&inputs);
        let factor = Decimal::ONE + inputs.pricing.markup_percent() / Decimal::ONE_HUNDRED;
        prop_assert_eq!(breakdown.unit_price, round_money(breakdown.base * factor));
    }

    #[test]
    fn line_order_does_not_change_the_price(inputs in inputs_strategy()) {
        let mut reversed = inputs.clone();
        reversed.materials.reverse();
        reversed.accessories.reverse();
        prop_assert_eq!(CostEngine::unit_price(&inputs), CostEngine::unit_price(&reversed));
    }

    #[test]
    fn another_accessory_never_lowers_the_price(
        inputs in inputs_strategy(),
        price in money_strategy(),
        count in count_strategy(),
    ) {
        let before = CostEngine::unit_price(&inputs);
        let mut more = inputs;
        more.accessories.push(AccessoryCost::new(price, count));
        prop_assert!(CostEngine::unit_price(&more) >= before);
    }

    #[test]
    fn item_and_order_totals_add_up(
        price in money_strategy(),
        sizes in prop::collection::vec(prop::collection::vec(0i32..500, 0..6), 0..5),
    ) {
        let items: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(i, q)| item_totals(i as i32, price, q).unwrap())
            .collect();
        let (qty, amount) = order_totals(1, &items).unwrap();

        let expected_qty: i32 = sizes.iter().flatten().sum();
        prop_assert_eq!(qty, expected_qty);
        prop_assert_eq!(amount, Decimal::from(expected_qty) * price);
    }

    #[test]
    fn clone_name_is_always_free(
        base in "[A-Z][a-z]{2,8}( [A-Z][a-z]{1,5})?",
        existing in 0usize..6,
    ) {
        let naming = CloneNaming::new("Sample", "copy").unwrap();
        let mut taken: HashSet<String> = HashSet::new();
        taken.insert(base.clone());
        for n in 1..=existing {
            taken.insert(naming.candidate(&base, n));
        }

        let name = naming.next_clone_name(&base, &taken);
        prop_assert!(!taken.contains(&name));
        prop_assert_eq!(naming.strip_copy_suffixes(&name), base.as_str());
        prop_assert_eq!(naming.next_clone_name(&name, &taken), name.clone());
    }
}
