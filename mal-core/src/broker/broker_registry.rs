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

//! Broker-owned registry of consumer subscriptions and publisher registrations.

use crate::broker::notify::NotifyMessageSet;
use crate::broker::publisher_source::PublisherSource;
use crate::broker::subscription_source::{RequiredInterest, SubscriptionSource};
use crate::message::{
    MalErrorCode, MalStatus, OperationId, OperationKey, PublishBody, Subscription, Uri,
};
use crate::routing::update_key_values::UpdateKeyValues;
use arc_swap::ArcSwap;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// One consumer's subscriptions: mutations serialize on `mutation`, readers load `source`.
struct ConsumerSlot {
    mutation: Arc<Mutex<()>>,
    source: ArcSwap<SubscriptionSource>,
}

impl ConsumerSlot {
    fn new(consumer: Uri) -> Self {
        Self {
            mutation: Arc::new(Mutex::new(())),
            source: ArcSwap::from_pointee(SubscriptionSource::new(consumer)),
        }
    }
}

/// What [`BrokerRegistry::handle_consumer_lost`] removed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct LostEndpointSummary {
    pub(crate) subscriptions: usize,
    pub(crate) publisher_operations: usize,
}

/// Result of matching one PUBLISH.
#[derive(Debug)]
pub(crate) struct PublishOutcome {
    pub(crate) snapshot_version: u64,
    pub(crate) notify_sets: Vec<NotifyMessageSet>,
}

/// Consumer and publisher maps for one broker, created at start and cleared at shutdown.
pub(crate) struct BrokerRegistry {
    consumers: RwLock<HashMap<Uri, Arc<ConsumerSlot>>>,
    publishers: RwLock<HashMap<Uri, PublisherSource>>,
    version: AtomicU64,
}

impl Default for BrokerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            consumers: RwLock::new(HashMap::new()),
            publishers: RwLock::new(HashMap::new()),
            version: AtomicU64::new(0),
        }
    }

    /// Bumped on every accepted subscription change.
    pub(crate) fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    async fn slot(&self, consumer: &Uri) -> Arc<ConsumerSlot> {
        if let Some(slot) = self.consumers.read().await.get(consumer) {
            return slot.clone();
        }

        self.consumers
            .write()
            .await
            .entry(consumer.clone())
            .or_insert_with(|| Arc::new(ConsumerSlot::new(consumer.clone())))
            .clone()
    }

    /// Locks the live slot of `consumer`, retrying when the slot was removed meanwhile.
    async fn lock_slot(&self, consumer: &Uri) -> (Arc<ConsumerSlot>, OwnedMutexGuard<()>) {
        loop {
            let slot = self.slot(consumer).await;
            let guard = slot.mutation.clone().lock_owned().await;

            let is_live = self
                .consumers
                .read()
                .await
                .get(consumer)
                .is_some_and(|current| Arc::ptr_eq(current, &slot));
            if is_live {
                return (slot, guard);
            }
        }
    }

    /// Adds or replaces one subscription of `consumer`.
    pub(crate) async fn register(
        &self,
        consumer: &Uri,
        operation: OperationId,
        transaction_id: u64,
        subscription: Subscription,
    ) -> Result<(), MalStatus> {
        let (slot, _guard) = self.lock_slot(consumer).await;

        let mut next = SubscriptionSource::clone(&slot.source.load());
        next.register(operation, transaction_id, subscription)?;
        slot.source.store(Arc::new(next));
        self.version.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Removes subscriptions of `consumer` by id and returns how many existed.
    pub(crate) async fn deregister(&self, consumer: &Uri, subscription_ids: &[String]) -> usize {
        if !self.consumers.read().await.contains_key(consumer) {
            return 0;
        }

        let (slot, _guard) = self.lock_slot(consumer).await;
        let mut next = SubscriptionSource::clone(&slot.source.load());
        let removed = next.deregister(subscription_ids);
        if removed > 0 {
            slot.source.store(Arc::new(next));
            self.version.fetch_add(1, Ordering::AcqRel);
        }
        removed
    }

    pub(crate) async fn publish_register(
        &self,
        publisher: &Uri,
        operation: OperationKey,
        transaction_id: u64,
        key_names: Vec<String>,
    ) -> Result<(), MalStatus> {
        let mut publishers = self.publishers.write().await;
        let source = publishers
            .entry(publisher.clone())
            .or_insert_with(|| PublisherSource::new(publisher.clone()));

        let result = source.register(operation, transaction_id, key_names);
        if source.is_empty() {
            publishers.remove(publisher);
        }
        result
    }

    pub(crate) async fn publish_deregister(&self, publisher: &Uri, operation: OperationKey) -> bool {
        let mut publishers = self.publishers.write().await;
        let Some(source) = publishers.get_mut(publisher) else {
            return false;
        };

        let removed = source.deregister(operation);
        if source.is_empty() {
            publishers.remove(publisher);
        }
        removed
    }

    /// Validates a PUBLISH and matches it against a snapshot of every consumer.
    ///
    /// Registry locks are released before matching starts. The result is ordered by
    /// consumer URI and holds no set for consumers without matches.
    pub(crate) async fn publish(
        &self,
        publisher: &Uri,
        operation: OperationId,
        body: &PublishBody,
    ) -> Result<PublishOutcome, MalStatus> {
        let key_names = {
            let publishers = self.publishers.read().await;
            let source = publishers.get(publisher).ok_or_else(|| {
                MalStatus::fail_with_code(
                    MalErrorCode::Unknown,
                    "publisher is not registered for this operation",
                )
            })?;
            source.validate_publish(operation.key(), body)?
        };

        let views: Vec<UpdateKeyValues> = body
            .updates
            .iter()
            .map(|update| UpdateKeyValues::new(operation.key(), &key_names, &update.header))
            .collect();

        let (snapshot_version, mut sources) = {
            let consumers = self.consumers.read().await;
            let sources: Vec<Arc<SubscriptionSource>> = consumers
                .values()
                .map(|slot| slot.source.load_full())
                .collect();
            (self.version(), sources)
        };
        sources.sort_by(|a, b| a.consumer().cmp(b.consumer()));

        let notify_sets = sources
            .iter()
            .filter_map(|source| {
                let messages = source.collect_notifications(&views, &body.updates);
                (!messages.is_empty()).then(|| NotifyMessageSet {
                    consumer: source.consumer().clone(),
                    messages,
                })
            })
            .collect();

        Ok(PublishOutcome {
            snapshot_version,
            notify_sets,
        })
    }

    /// Drops every subscription and publisher registration held for `endpoint`.
    pub(crate) async fn handle_consumer_lost(&self, endpoint: &Uri) -> LostEndpointSummary {
        let mut summary = LostEndpointSummary::default();

        let slot = self.consumers.read().await.get(endpoint).cloned();
        if let Some(slot) = slot {
            let _guard = slot.mutation.lock().await;
            let mut consumers = self.consumers.write().await;
            if consumers
                .get(endpoint)
                .is_some_and(|current| Arc::ptr_eq(current, &slot))
            {
                consumers.remove(endpoint);
                summary.subscriptions = slot.source.load().len();
                self.version.fetch_add(1, Ordering::AcqRel);
            }
        }

        if let Some(source) = self.publishers.write().await.remove(endpoint) {
            summary.publisher_operations = source.len();
        }

        summary
    }

    /// Union of every consumer's required interest, merged per operation and domain.
    pub(crate) async fn required_interest(&self) -> Vec<RequiredInterest> {
        let sources: Vec<Arc<SubscriptionSource>> = self
            .consumers
            .read()
            .await
            .values()
            .map(|slot| slot.source.load_full())
            .collect();

        let mut merged: BTreeMap<(OperationKey, Option<Vec<String>>), BTreeSet<String>> =
            BTreeMap::new();
        for interest in sources.iter().flat_map(|source| source.required()) {
            merged
                .entry((interest.operation, interest.domain.clone()))
                .or_default()
                .extend(interest.keys.iter().cloned());
        }

        merged
            .into_iter()
            .map(|((operation, domain), keys)| RequiredInterest {
                operation,
                domain,
                keys,
            })
            .collect()
    }

    pub(crate) async fn subscription_count(&self) -> usize {
        self.consumers
            .read()
            .await
            .values()
            .map(|slot| slot.source.load().len())
            .sum()
    }

    pub(crate) async fn publisher_count(&self) -> usize {
        self.publishers.read().await.len()
    }

    pub(crate) async fn clear(&self) {
        self.consumers.write().await.clear();
        self.publishers.write().await.clear();
        self.version.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::BrokerRegistry;
    use crate::message::{
        AttributeValue, MalErrorCode, OperationId, PublishBody, Subscription, SubscriptionFilter,
        Update, UpdateHeader, Uri,
    };
    use bytes::Bytes;
    use std::sync::Arc;

    const OPERATION: OperationId = OperationId {
        area: 4,
        area_version: 1,
        service: 2,
        operation: 1,
    };

    fn id(value: &str) -> AttributeValue {
        AttributeValue::identifier(value)
    }

    fn update(mode: &str, payload: &str) -> Update {
        Update {
            header: UpdateHeader {
                domain: vec!["esa".to_string(), "mission".to_string()],
                key_values: vec![Some(id(mode))],
            },
            value: Bytes::from(payload.to_string()),
        }
    }

    fn mode_subscription(subscription_id: &str, modes: &[&str]) -> Subscription {
        Subscription::new(subscription_id).with_filter(SubscriptionFilter::new(
            "mode",
            modes.iter().map(|mode| id(mode)).collect(),
        ))
    }

    async fn registry_with_publisher() -> BrokerRegistry {
        let registry = BrokerRegistry::new();
        registry
            .publish_register(&Uri::new("provider"), OPERATION.key(), 1, vec!["mode".to_string()])
            .await
            .expect("publisher registration");
        registry
    }

    #[tokio::test]
    async fn fan_out_sends_each_consumer_only_its_matches() {
        let registry = registry_with_publisher().await;
        registry
            .register(&Uri::new("consumer-a"), OPERATION, 10, mode_subscription("SA", &["SAFE"]))
            .await
            .expect("consumer-a");
        registry
            .register(&Uri::new("consumer-b"), OPERATION, 20, mode_subscription("SB", &["NOMINAL"]))
            .await
            .expect("consumer-b");
        registry
            .register(&Uri::new("consumer-c"), OPERATION, 30, mode_subscription("SC", &["SCIENCE"]))
            .await
            .expect("consumer-c");

        let body = PublishBody {
            updates: vec![
                update("SAFE", "a1"),
                update("NOMINAL", "b1"),
                update("SAFE", "a2"),
                update("NOMINAL", "b2"),
                update("SAFE", "a3"),
            ],
        };

        let outcome = registry
            .publish(&Uri::new("provider"), OPERATION, &body)
            .await
            .expect("publish accepted");

        assert_eq!(outcome.notify_sets.len(), 2);
        let consumer_a = &outcome.notify_sets[0];
        assert_eq!(consumer_a.consumer, Uri::new("consumer-a"));
        assert_eq!(consumer_a.messages.len(), 1);
        assert_eq!(consumer_a.messages[0].transaction_id, 10);
        let payloads: Vec<&[u8]> = consumer_a.messages[0]
            .updates
            .iter()
            .map(|u| u.value.as_ref())
            .collect();
        assert_eq!(payloads, vec![b"a1".as_slice(), b"a2".as_slice(), b"a3".as_slice()]);

        let consumer_b = &outcome.notify_sets[1];
        assert_eq!(consumer_b.consumer, Uri::new("consumer-b"));
        assert_eq!(consumer_b.update_count(), 2);
    }

    #[tokio::test]
    async fn publish_from_unregistered_publisher_is_rejected() {
        let registry = BrokerRegistry::new();
        let err = registry
            .publish(
                &Uri::new("provider"),
                OPERATION,
                &PublishBody {
                    updates: vec![update("SAFE", "x")],
                },
            )
            .await
            .expect_err("unregistered publisher");
        assert_eq!(err.code(), MalErrorCode::Unknown);
    }

    #[tokio::test]
    async fn consumer_lost_removes_subscriptions_and_publisher_records() {
        let registry = registry_with_publisher().await;
        registry
            .register(&Uri::new("provider"), OPERATION, 3, mode_subscription("S1", &["SAFE"]))
            .await
            .expect("register");
        let version_before = registry.version();

        let summary = registry.handle_consumer_lost(&Uri::new("provider")).await;

        assert_eq!(summary.subscriptions, 1);
        assert_eq!(summary.publisher_operations, 1);
        assert_eq!(registry.subscription_count().await, 0);
        assert_eq!(registry.publisher_count().await, 0);
        assert!(registry.version() > version_before);
    }

    #[tokio::test]
    async fn required_interest_merges_consumers_with_same_scope() {
        let registry = BrokerRegistry::new();
        registry
            .register(&Uri::new("consumer-a"), OPERATION, 1, mode_subscription("S1", &["SAFE"]))
            .await
            .expect("consumer-a");
        registry
            .register(
                &Uri::new("consumer-b"),
                OPERATION,
                2,
                Subscription::new("S1").with_filter(SubscriptionFilter::new(
                    "apid",
                    vec![AttributeValue::UInteger(3)],
                )),
            )
            .await
            .expect("consumer-b");

        let interest = registry.required_interest().await;
        assert_eq!(interest.len(), 1);
        let keys: Vec<&str> = interest[0].keys.iter().map(String::as_str).collect();
        assert_eq!(keys, vec!["apid", "mode"]);
    }

    #[tokio::test]
    async fn deregister_of_unknown_consumer_is_a_noop() {
        let registry = BrokerRegistry::new();
        assert_eq!(
            registry
                .deregister(&Uri::new("nobody"), &["S1".to_string()])
                .await,
            0
        );
        assert_eq!(registry.version(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registration_and_publish_stay_consistent() {
        let registry = Arc::new(registry_with_publisher().await);
        let mut tasks = Vec::new();

        for n in 0..16 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let consumer = Uri::new(format!("consumer-{n:02}"));
                for round in 0..10u64 {
                    registry
                        .register(&consumer, OPERATION, round, mode_subscription("S1", &["SAFE"]))
                        .await
                        .expect("register");
                    let body = PublishBody {
                        updates: vec![update("SAFE", "x")],
                    };
                    registry
                        .publish(&Uri::new("provider"), OPERATION, &body)
                        .await
                        .expect("publish");
                }
            }));
        }

        for task in tasks {
            task.await.expect("task should not panic");
        }

        assert_eq!(registry.subscription_count().await, 16);
        let outcome = registry
            .publish(
                &Uri::new("provider"),
                OPERATION,
                &PublishBody {
                    updates: vec![update("SAFE", "final")],
                },
            )
            .await
            .expect("final publish");
        assert_eq!(outcome.notify_sets.len(), 16);
        assert!(outcome
            .notify_sets
            .iter()
            .all(|set| set.messages[0].transaction_id == 9));
    }
}
