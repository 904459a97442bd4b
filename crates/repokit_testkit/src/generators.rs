//! Property-based test generators using proptest.

use crate::fixtures::{Customer, OrderLine};
use proptest::prelude::*;
use repokit_core::QueryOptions;

/// Strategy for customer names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{0,11}").expect("Invalid regex")
}

/// Strategy for city names drawn from a small set, so groups repeat.
pub fn city_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["Lisbon", "Porto", "Braga", "Faro"]).prop_map(str::to_string)
}

/// Strategy for a single customer.
pub fn customer_strategy() -> impl Strategy<Value = Customer> {
    (1i64..10_000, name_strategy(), city_strategy())
        .prop_map(|(id, name, city)| Customer::in_city(id, &name, &city))
}

/// Strategy for up to `max` customers with distinct ids.
pub fn customers_strategy(max: usize) -> impl Strategy<Value = Vec<Customer>> {
    prop::collection::btree_map(1i64..10_000, (name_strategy(), city_strategy()), 0..=max)
        .prop_map(|rows| {
            rows.into_iter()
                .map(|(id, (name, city))| Customer::in_city(id, &name, &city))
                .collect()
        })
}

/// Strategy for up to `max` order lines with distinct keys.
pub fn order_lines_strategy(max: usize) -> impl Strategy<Value = Vec<OrderLine>> {
    prop::collection::btree_map((1i64..50, 1i64..10), (name_strategy(), 1u32..100), 0..=max)
        .prop_map(|rows| {
            rows.into_iter()
                .map(|((order_id, line), (sku, quantity))| {
                    OrderLine::new(order_id, line, &sku, quantity)
                })
                .collect()
        })
}

/// A predicate selecting customers whose id leaves `remainder` when
/// divided by `modulus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdPredicate {
    /// Divisor, at least 1.
    pub modulus: i64,
    /// Expected remainder.
    pub remainder: i64,
}

impl IdPredicate {
    /// Evaluates the predicate.
    pub fn matches(&self, customer: &Customer) -> bool {
        customer.id % self.modulus == self.remainder
    }

    /// Query options filtering by this predicate.
    pub fn options(&self) -> QueryOptions<Customer> {
        let predicate = *self;
        QueryOptions::new().with_filter(move |customer: &Customer| predicate.matches(customer))
    }
}

/// Strategy for id predicates.
pub fn id_predicate_strategy() -> impl Strategy<Value = IdPredicate> {
    (1i64..6).prop_flat_map(|modulus| {
        (0..modulus).prop_map(move |remainder| IdPredicate { modulus, remainder })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    proptest! {
        #[test]
        fn customer_ids_are_distinct(customers in customers_strategy(30)) {
            let ids: HashSet<i64> = customers.iter().map(|c| c.id).collect();
            prop_assert_eq!(ids.len(), customers.len());
        }

        #[test]
        fn predicate_remainder_is_in_range(predicate in id_predicate_strategy()) {
            prop_assert!(predicate.remainder < predicate.modulus);
        }
    }
}
