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

//! Deterministic benchmark fixtures for the Criterion harness.

use crate::broker::broker_registry::BrokerRegistry;
use crate::broker::subscription_source::SubscriptionDetails;
use crate::data_plane::egress_worker::EgressWorker;
use crate::endpoint::MessageSender;
use crate::message::{
    AttributeValue, InteractionStage, MalMessage, MalStatus, MessageBody, MessageHeader,
    OperationId, PublishBody, QosProperties, Subscription, SubscriptionFilter, Update,
    UpdateHeader, Uri,
};
use crate::routing::subscription_matcher::matches;
use crate::routing::update_key_values::UpdateKeyValues;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

const OPERATION: OperationId = OperationId {
    area: 10,
    area_version: 1,
    service: 3,
    operation: 1,
};

const MODES: [&str; 4] = ["SAFE", "NOMINAL", "SCIENCE", "DOWNLINK"];

fn key_names() -> Vec<String> {
    vec!["mode".to_string(), "apid".to_string()]
}

fn update(index: usize) -> Update {
    Update {
        header: UpdateHeader {
            domain: vec![
                "esa".to_string(),
                "mission".to_string(),
                format!("unit{}", index % 8),
            ],
            key_values: vec![
                Some(AttributeValue::identifier(MODES[index % MODES.len()])),
                Some(AttributeValue::UInteger((index % 32) as u64)),
            ],
        },
        value: Bytes::from(vec![0u8; 64]),
    }
}

fn subscription(index: usize) -> Subscription {
    let mut subscription = Subscription::new(format!("S{index}"))
        .with_domain(["esa", "*"])
        .with_filter(SubscriptionFilter::new(
            "mode",
            vec![AttributeValue::identifier(MODES[index % MODES.len()])],
        ));
    if index % 2 == 0 {
        subscription = subscription.with_filter(SubscriptionFilter::new(
            "apid",
            (0..8)
                .map(|apid| AttributeValue::UInteger(((index + apid) % 32) as u64))
                .collect(),
        ));
    }
    subscription
}

/// Fixed fixture for `matcher/*` benchmark IDs.
pub struct MatcherFixture {
    subscriptions: Vec<SubscriptionDetails>,
    views: Vec<UpdateKeyValues>,
}

impl MatcherFixture {
    pub fn new(subscriptions: usize, updates: usize) -> Self {
        let names = key_names();
        Self {
            subscriptions: (0..subscriptions.max(1))
                .map(|index| SubscriptionDetails::new(OPERATION, index as u64, subscription(index)))
                .collect(),
            views: (0..updates.max(1))
                .map(|index| UpdateKeyValues::new(OPERATION.key(), &names, &update(index).header))
                .collect(),
        }
    }

    /// Number of (subscription, update) pairs that match.
    pub fn match_count(&self) -> usize {
        self.subscriptions
            .iter()
            .map(|subscription| {
                let criteria = subscription.criteria();
                self.views
                    .iter()
                    .filter(|view| matches(&criteria, view))
                    .count()
            })
            .sum()
    }
}

/// Fixed fixture for `broker_fanout/*` benchmark IDs.
pub struct FanoutFixture {
    registry: BrokerRegistry,
    publisher: Uri,
    body: PublishBody,
}

impl FanoutFixture {
    pub async fn new(consumers: usize, updates: usize) -> Result<Self, MalStatus> {
        let registry = BrokerRegistry::new();
        let publisher = Uri::new("bench/provider");
        registry
            .publish_register(&publisher, OPERATION.key(), 1, key_names())
            .await?;

        for index in 0..consumers.max(1) {
            registry
                .register(
                    &Uri::new(format!("bench/consumer-{index:04}")),
                    OPERATION,
                    index as u64,
                    subscription(index),
                )
                .await?;
        }

        Ok(Self {
            registry,
            publisher,
            body: PublishBody {
                updates: (0..updates.max(1)).map(update).collect(),
            },
        })
    }

    /// Runs one PUBLISH through the registry and returns the number of notified consumers.
    pub async fn publish_once(&self) -> Result<usize, MalStatus> {
        let outcome = self
            .registry
            .publish(&self.publisher, OPERATION, &self.body)
            .await?;
        Ok(outcome.notify_sets.len())
    }
}

struct CountingSender {
    uri: Uri,
    send_count: AtomicUsize,
}

#[async_trait]
impl MessageSender for CountingSender {
    fn uri(&self) -> &Uri {
        &self.uri
    }

    async fn send_message(
        &self,
        header: MessageHeader,
        body: MessageBody,
        qos: QosProperties,
    ) -> Result<MalMessage, MalStatus> {
        self.send_count.fetch_add(1, Ordering::Relaxed);
        Ok(MalMessage { header, body, qos })
    }
}

/// Drains `messages` NOTIFY messages through one egress dispatch loop and returns the send count.
pub async fn run_egress_dispatch_once(messages: usize) -> usize {
    let sender = Arc::new(CountingSender {
        uri: Uri::new("bench/broker"),
        send_count: AtomicUsize::new(0),
    });
    let total = messages.max(1);
    let (queue, receiver) = mpsc::channel(total);

    for index in 0..total {
        let notify = MalMessage::new(
            MessageHeader::initiating(
                Uri::new("bench/broker"),
                Uri::new("bench/consumer"),
                InteractionStage::Notify,
                index as u64,
                OPERATION,
            ),
            MessageBody::Empty,
        );
        if queue.send(notify).await.is_err() {
            break;
        }
    }
    drop(queue);

    EgressWorker::dispatch_loop(
        "benchmark-egress-dispatch".to_string(),
        sender.clone(),
        receiver,
    )
    .await;

    sender.send_count.load(Ordering::Relaxed)
}
