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

//! Per-consumer subscription state held by the broker.

use crate::broker::notify::NotifyMessage;
use crate::message::{
    MalErrorCode, MalStatus, NotifiedUpdate, NotifiedUpdateHeader, OperationId, OperationKey,
    Subscription, SubscriptionFilter, Update, Uri,
};
use crate::routing::subscription_matcher::{matches, MatchCriteria};
use crate::routing::update_key_values::UpdateKeyValues;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// One accepted REGISTER, scoped to the operation and transaction it arrived on.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SubscriptionDetails {
    pub(crate) subscription_id: String,
    pub(crate) operation: OperationId,
    pub(crate) transaction_id: u64,
    pub(crate) domain: Option<Vec<String>>,
    pub(crate) filters: Option<Vec<SubscriptionFilter>>,
    pub(crate) selected_keys: Option<Vec<String>>,
}

impl SubscriptionDetails {
    pub(crate) fn new(operation: OperationId, transaction_id: u64, subscription: Subscription) -> Self {
        Self {
            subscription_id: subscription.subscription_id,
            operation,
            transaction_id,
            domain: subscription.domain,
            filters: subscription.filters,
            selected_keys: subscription.selected_keys,
        }
    }

    pub(crate) fn criteria(&self) -> MatchCriteria<'_> {
        MatchCriteria {
            operation: self.operation.key(),
            domain: self.domain.as_deref(),
            filters: self.filters.as_deref(),
        }
    }
}

/// Interest a consumer has expressed for one operation and domain.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct RequiredInterest {
    pub operation: OperationKey,
    pub domain: Option<Vec<String>>,
    pub keys: BTreeSet<String>,
}

/// Rejects subscriptions the matcher cannot evaluate meaningfully.
pub(crate) fn validate_subscription(subscription: &Subscription) -> Result<(), MalStatus> {
    fn rejected(reason: &str) -> Result<(), MalStatus> {
        Err(MalStatus::fail_with_code(MalErrorCode::Unknown, reason))
    }

    if subscription.subscription_id.is_empty() {
        return rejected("subscription id must not be empty");
    }

    if let Some(domain) = &subscription.domain {
        if domain.iter().any(|segment| segment.is_empty()) {
            return rejected("subscription domain contains an empty segment");
        }
    }

    if let Some(filters) = &subscription.filters {
        let mut names = HashSet::new();
        for filter in filters {
            if filter.name.is_empty() {
                return rejected("subscription filter has an empty key name");
            }
            if filter.values.is_empty() {
                return rejected("subscription filter has no accepted values");
            }
            if !names.insert(filter.name.as_str()) {
                return rejected("subscription filter key names repeat");
            }
        }
    }

    if let Some(keys) = &subscription.selected_keys {
        if keys.iter().any(|key| key.is_empty()) {
            return rejected("subscription selects an empty key name");
        }
    }

    Ok(())
}

/// Subscriptions of one consumer endpoint, keyed by subscription id.
#[derive(Clone, Debug)]
pub(crate) struct SubscriptionSource {
    consumer: Uri,
    subscriptions: BTreeMap<String, SubscriptionDetails>,
    required: Vec<RequiredInterest>,
}

impl SubscriptionSource {
    pub(crate) fn new(consumer: Uri) -> Self {
        Self {
            consumer,
            subscriptions: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub(crate) fn consumer(&self) -> &Uri {
        &self.consumer
    }

    pub(crate) fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub(crate) fn get(&self, subscription_id: &str) -> Option<&SubscriptionDetails> {
        self.subscriptions.get(subscription_id)
    }

    /// Adds or replaces the subscription with the same id.
    pub(crate) fn register(
        &mut self,
        operation: OperationId,
        transaction_id: u64,
        subscription: Subscription,
    ) -> Result<(), MalStatus> {
        validate_subscription(&subscription)?;

        let details = SubscriptionDetails::new(operation, transaction_id, subscription);
        self.subscriptions
            .insert(details.subscription_id.clone(), details);
        self.recompute_required();
        Ok(())
    }

    /// Removes the listed ids and returns how many existed. Unknown ids are ignored.
    pub(crate) fn deregister(&mut self, subscription_ids: &[String]) -> usize {
        let removed = subscription_ids
            .iter()
            .filter(|id| self.subscriptions.remove(id.as_str()).is_some())
            .count();
        if removed > 0 {
            self.recompute_required();
        }
        removed
    }

    pub(crate) fn required(&self) -> &[RequiredInterest] {
        &self.required
    }

    /// One [`NotifyMessage`] per subscription matching at least one of `views`.
    ///
    /// `views` and `updates` are parallel; matched updates keep their PUBLISH order.
    pub(crate) fn collect_notifications(
        &self,
        views: &[UpdateKeyValues],
        updates: &[Update],
    ) -> Vec<NotifyMessage> {
        self.subscriptions
            .values()
            .filter_map(|subscription| {
                let criteria = subscription.criteria();
                let matched: Vec<NotifiedUpdate> = views
                    .iter()
                    .zip(updates.iter())
                    .filter(|(view, _)| matches(&criteria, view))
                    .map(|(view, update)| NotifiedUpdate {
                        header: NotifiedUpdateHeader {
                            domain: view.domain.clone(),
                            key_values: view.selected(subscription.selected_keys.as_deref()),
                        },
                        value: update.value.clone(),
                    })
                    .collect();

                (!matched.is_empty()).then(|| NotifyMessage {
                    subscription_id: subscription.subscription_id.clone(),
                    transaction_id: subscription.transaction_id,
                    operation: subscription.operation,
                    updates: matched,
                })
            })
            .collect()
    }

    fn recompute_required(&mut self) {
        let mut interest: BTreeMap<(OperationKey, Option<Vec<String>>), BTreeSet<String>> =
            BTreeMap::new();

        for subscription in self.subscriptions.values() {
            let keys = interest
                .entry((subscription.operation.key(), subscription.domain.clone()))
                .or_default();
            if let Some(filters) = &subscription.filters {
                keys.extend(filters.iter().map(|filter| filter.name.clone()));
            }
        }

        self.required = interest
            .into_iter()
            .map(|((operation, domain), keys)| RequiredInterest {
                operation,
                domain,
                keys,
            })
            .collect();
    }
}
