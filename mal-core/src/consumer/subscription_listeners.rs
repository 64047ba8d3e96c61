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

//! Listener bindings for traffic that arrives outside an active transaction: NOTIFY for
//! registered subscriptions and PUBLISH errors for registered publishers.

use crate::consumer::InteractionListener;
use crate::message::{
    InteractionStage, MalMessage, MalStatus, MessageBody, MessageHeader, OperationId,
    QosProperties, Uri,
};
use crate::observability::{events, fields};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const COMPONENT: &str = "subscription_listeners";

#[derive(Clone)]
pub(crate) struct NotifyBinding {
    consumer: Uri,
    transaction_id: u64,
    operation: OperationId,
    listener: Arc<dyn InteractionListener>,
}

#[derive(Clone)]
struct PublisherBinding {
    broker: Uri,
    publisher: Uri,
    operation: OperationId,
    listener: Arc<dyn InteractionListener>,
}

#[derive(Default)]
pub(crate) struct SubscriptionListeners {
    notify: RwLock<HashMap<(Uri, String), NotifyBinding>>,
    publishers: RwLock<HashMap<u64, PublisherBinding>>,
}

impl SubscriptionListeners {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn bind_notify(
        &self,
        broker: Uri,
        subscription_id: String,
        consumer: Uri,
        transaction_id: u64,
        operation: OperationId,
        listener: Arc<dyn InteractionListener>,
    ) -> Option<NotifyBinding> {
        self.notify.write().await.insert(
            (broker, subscription_id),
            NotifyBinding {
                consumer,
                transaction_id,
                operation,
                listener,
            },
        )
    }

    /// Undoes the binding installed by the REGISTER on `transaction_id`, putting back the
    /// binding it replaced. A binding installed by a later REGISTER is left alone.
    pub(crate) async fn restore_notify(
        &self,
        broker: &Uri,
        subscription_id: &str,
        transaction_id: u64,
        previous: Option<NotifyBinding>,
    ) {
        let key = (broker.clone(), subscription_id.to_string());
        let mut notify = self.notify.write().await;
        if notify
            .get(&key)
            .is_some_and(|current| current.transaction_id != transaction_id)
        {
            return;
        }
        match previous {
            Some(previous) => {
                notify.insert(key, previous);
            }
            None => {
                notify.remove(&key);
            }
        }
    }

    pub(crate) async fn unbind_notify(&self, broker: &Uri, subscription_id: &str) {
        self.notify
            .write()
            .await
            .remove(&(broker.clone(), subscription_id.to_string()));
    }

    pub(crate) async fn bind_publisher(
        &self,
        transaction_id: u64,
        broker: Uri,
        publisher: Uri,
        operation: OperationId,
        listener: Arc<dyn InteractionListener>,
    ) {
        self.publishers.write().await.insert(
            transaction_id,
            PublisherBinding {
                broker,
                publisher,
                operation,
                listener,
            },
        );
    }

    pub(crate) async fn unbind_publisher(&self, transaction_id: u64) {
        self.publishers.write().await.remove(&transaction_id);
    }

    /// Routes a NOTIFY, or a NOTIFY error, from a broker to the subscription's listener.
    pub(crate) async fn deliver_notify(&self, message: MalMessage) {
        let MalMessage { header, body, qos } = message;

        if header.is_error {
            let targets: Vec<NotifyBinding> = self
                .notify
                .read()
                .await
                .iter()
                .filter(|((broker, _), binding)| {
                    broker == &header.from && binding.transaction_id == header.transaction_id
                })
                .map(|(_, binding)| binding.clone())
                .collect();
            if targets.is_empty() {
                warn!(
                    event = events::NOTIFY_UNROUTED,
                    component = COMPONENT,
                    transaction_id = header.transaction_id,
                    src = %header.from,
                    "notify error for unknown registration; dropping"
                );
            }
            let error = body.error_status();
            for binding in targets {
                binding
                    .listener
                    .notify_error_received(&header, &error, &qos)
                    .await;
            }
            return;
        }

        let MessageBody::Notify(sections) = body else {
            warn!(
                event = events::NOTIFY_UNROUTED,
                component = COMPONENT,
                transaction_id = header.transaction_id,
                src = %header.from,
                "notify without notify body; dropping"
            );
            return;
        };

        for section in sections {
            let binding = self
                .notify
                .read()
                .await
                .get(&(header.from.clone(), section.subscription_id.clone()))
                .cloned();
            match binding {
                Some(binding) => {
                    debug!(
                        event = events::NOTIFY_RECEIVED,
                        component = COMPONENT,
                        transaction_id = header.transaction_id,
                        subscription_id = section.subscription_id.as_str(),
                        src = %header.from,
                        updates = section.updates.len(),
                        "notify received"
                    );
                    binding
                        .listener
                        .notify_received(&header, &section, &qos)
                        .await;
                }
                None => {
                    warn!(
                        event = events::NOTIFY_UNROUTED,
                        component = COMPONENT,
                        transaction_id = header.transaction_id,
                        subscription_id = section.subscription_id.as_str(),
                        src = %header.from,
                        "notify for unknown subscription; dropping"
                    );
                }
            }
        }
    }

    /// Routes a PUBLISH rejection to the publisher registered under that transaction.
    pub(crate) async fn deliver_publish_error(&self, message: MalMessage) {
        let header = &message.header;
        let binding = self
            .publishers
            .read()
            .await
            .get(&header.transaction_id)
            .filter(|binding| binding.broker == header.from)
            .cloned();

        match binding {
            Some(binding) => {
                binding
                    .listener
                    .publish_error_received(header, &message.body.error_status(), &message.qos)
                    .await;
            }
            None => {
                warn!(
                    event = events::PUBLISH_ERROR_UNROUTED,
                    component = COMPONENT,
                    transaction_id = header.transaction_id,
                    src = %header.from,
                    stage = %fields::format_stage(header),
                    "publish error for unknown publisher; dropping"
                );
            }
        }
    }

    /// Reports loss of `broker` (all brokers when `None`) to every bound listener.
    pub(crate) async fn fail_broker(&self, broker: Option<&Uri>, error: &MalStatus) {
        let notify_targets: Vec<(Uri, NotifyBinding)> = self
            .notify
            .read()
            .await
            .iter()
            .filter(|((bound, _), _)| broker.map_or(true, |lost| lost == bound))
            .map(|((bound, _), binding)| (bound.clone(), binding.clone()))
            .collect();
        let publisher_targets: Vec<(u64, PublisherBinding)> = self
            .publishers
            .read()
            .await
            .iter()
            .filter(|(_, binding)| broker.map_or(true, |lost| lost == &binding.broker))
            .map(|(tx, binding)| (*tx, binding.clone()))
            .collect();

        let qos = QosProperties::new();
        for (bound, binding) in notify_targets {
            let header = synthesized_header(
                bound,
                binding.consumer,
                InteractionStage::Notify,
                binding.transaction_id,
                binding.operation,
            );
            binding
                .listener
                .notify_error_received(&header, error, &qos)
                .await;
        }
        for (transaction_id, binding) in publisher_targets {
            let header = synthesized_header(
                binding.broker,
                binding.publisher,
                InteractionStage::Publish,
                transaction_id,
                binding.operation,
            );
            binding
                .listener
                .publish_error_received(&header, error, &qos)
                .await;
        }
    }

    #[cfg(test)]
    pub(crate) async fn notify_binding_count(&self) -> usize {
        self.notify.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn notify_transaction(
        &self,
        broker: &Uri,
        subscription_id: &str,
    ) -> Option<u64> {
        self.notify
            .read()
            .await
            .get(&(broker.clone(), subscription_id.to_string()))
            .map(|binding| binding.transaction_id)
    }
}

fn synthesized_header(
    from: Uri,
    to: Uri,
    stage: InteractionStage,
    transaction_id: u64,
    operation: OperationId,
) -> MessageHeader {
    let mut header = MessageHeader::initiating(from, to, stage, transaction_id, operation);
    header.is_error = true;
    header
}
