/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Update-versus-subscription matching.

use crate::message::{OperationKey, SubscriptionFilter};
use crate::routing::domain_filter::domain_matches;
use crate::routing::update_key_values::UpdateKeyValues;

/// The parts of a subscription that decide whether an update matches it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MatchCriteria<'a> {
    pub(crate) operation: OperationKey,
    pub(crate) domain: Option<&'a [String]>,
    pub(crate) filters: Option<&'a [SubscriptionFilter]>,
}

/// Whether `update` is delivered to a subscription with `criteria`.
///
/// Filters combine with AND, the accepted values of one filter with OR. A filter whose
/// key does not occur in the update does not block the match. A null key value never
/// equals an accepted value.
pub(crate) fn matches(criteria: &MatchCriteria<'_>, update: &UpdateKeyValues) -> bool {
    if criteria.operation != update.operation {
        return false;
    }

    if let Some(domain) = criteria.domain {
        if !domain_matches(domain, &update.domain) {
            return false;
        }
    }

    let Some(filters) = criteria.filters else {
        return true;
    };

    if update.keys.is_empty() {
        return true;
    }

    filters.iter().all(|filter| {
        update
            .keys
            .iter()
            .filter(|key| key.name == filter.name)
            .all(|key| {
                key.value
                    .as_ref()
                    .is_some_and(|value| filter.values.contains(value))
            })
    })
}

#[cfg(test)]
mod tests {
    use super::{matches, MatchCriteria};
    use crate::message::{AttributeValue, NamedValue, OperationKey, SubscriptionFilter};
    use crate::routing::update_key_values::UpdateKeyValues;

    const OPERATION: OperationKey = OperationKey {
        area: 5,
        service: 1,
        operation: 2,
    };

    fn id(value: &str) -> AttributeValue {
        AttributeValue::identifier(value)
    }

    fn update(keys: &[(&str, Option<AttributeValue>)]) -> UpdateKeyValues {
        UpdateKeyValues {
            domain: vec!["esa".to_string(), "mission".to_string()],
            operation: OPERATION,
            keys: keys
                .iter()
                .map(|(name, value)| NamedValue {
                    name: name.to_string(),
                    value: value.clone(),
                })
                .collect(),
        }
    }

    fn filters() -> Vec<SubscriptionFilter> {
        vec![
            SubscriptionFilter::new("K1", vec![id("A"), id("B")]),
            SubscriptionFilter::new("K2", vec![id("X")]),
        ]
    }

    fn criteria(filters: Option<&[SubscriptionFilter]>) -> MatchCriteria<'_> {
        MatchCriteria {
            operation: OPERATION,
            domain: None,
            filters,
        }
    }

    #[test]
    fn and_across_filters_or_within_values() {
        let filters = filters();
        let criteria = criteria(Some(&filters));

        assert!(matches(
            &criteria,
            &update(&[("K1", Some(id("B"))), ("K2", Some(id("X")))])
        ));
        assert!(!matches(
            &criteria,
            &update(&[("K1", Some(id("C"))), ("K2", Some(id("X")))])
        ));
    }

    #[test]
    fn absent_filter_key_is_vacuous() {
        let filters = filters();
        assert!(matches(
            &criteria(Some(&filters)),
            &update(&[("K2", Some(id("X")))])
        ));
    }

    #[test]
    fn null_key_value_never_matches_a_filter() {
        let filters = filters();
        assert!(!matches(
            &criteria(Some(&filters)),
            &update(&[("K1", None), ("K2", Some(id("X")))])
        ));
    }

    #[test]
    fn update_without_key_values_and_subscription_without_filters_match() {
        let filters = filters();
        assert!(matches(&criteria(Some(&filters)), &update(&[])));
        assert!(matches(&criteria(None), &update(&[("K1", Some(id("Z")))])));
    }

    #[test]
    fn operation_and_domain_are_checked_first() {
        let filters = filters();
        let mut other_operation = criteria(Some(&filters));
        other_operation.operation.operation = 3;
        assert!(!matches(&other_operation, &update(&[])));

        let domain = vec!["esa".to_string(), "*".to_string()];
        let mut scoped = criteria(None);
        scoped.domain = Some(&domain);
        assert!(matches(&scoped, &update(&[])));

        let foreign = vec!["nasa".to_string()];
        scoped.domain = Some(&foreign);
        assert!(!matches(&scoped, &update(&[])));
    }
}
