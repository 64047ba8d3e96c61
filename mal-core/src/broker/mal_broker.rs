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

//! Broker role: answers PubSub initiating stages and fans PUBLISH out as NOTIFY.

use crate::broker::broker_registry::BrokerRegistry;
use crate::broker::subscription_source::RequiredInterest;
use crate::config::BrokerConfig;
use crate::data_plane::egress_worker::EgressWorker;
use crate::data_plane::inbound_router::InboundRouter;
use crate::endpoint::{MalEndpoint, MessageSender};
use crate::message::{
    InteractionStage, MalErrorCode, MalMessage, MalStatus, MessageBody, MessageHeader,
    QosProperties, Uri,
};
use crate::observability::{events, fields};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

const COMPONENT: &str = "mal_broker";

///
/// [`MalBroker`] hosts the publish/subscribe registry on one endpoint.
///
/// REGISTER, DEREGISTER, PUBLISH_REGISTER and PUBLISH_DEREGISTER are acknowledged directly.
/// Accepted PUBLISH messages are matched against every consumer and the resulting NOTIFY
/// messages are handed to a dedicated egress worker, so a slow consumer does not stall the
/// publisher.
///
pub struct MalBroker {
    uri: Uri,
    sender: Arc<dyn MessageSender>,
    registry: BrokerRegistry,
    egress: EgressWorker,
    router: Weak<InboundRouter>,
}

impl MalBroker {
    /// Creates the registry and egress worker and attaches the broker to `endpoint`.
    ///
    /// Fails with INCORRECT_STATE when the endpoint already hosts a broker.
    pub fn start(endpoint: &MalEndpoint, config: BrokerConfig) -> Result<Arc<Self>, MalStatus> {
        let sender = endpoint.sender();
        let broker = Arc::new(Self {
            uri: endpoint.uri().clone(),
            egress: EgressWorker::new(sender.clone(), config.egress_queue_size),
            sender,
            registry: BrokerRegistry::new(),
            router: Arc::downgrade(endpoint.router()),
        });

        if let Err(err) = endpoint.router().attach_broker(broker.clone()) {
            broker.egress.stop();
            return Err(err);
        }

        info!(
            event = events::BROKER_STARTED,
            component = COMPONENT,
            broker = broker.uri.as_str(),
            worker_id = broker.egress.worker_id(),
            worker_thread = broker.egress.runtime_thread(),
            "broker started"
        );
        Ok(broker)
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Aggregated interest of every registered consumer.
    pub async fn required_interest(&self) -> Vec<RequiredInterest> {
        self.registry.required_interest().await
    }

    pub async fn subscription_count(&self) -> usize {
        self.registry.subscription_count().await
    }

    pub async fn publisher_count(&self) -> usize {
        self.registry.publisher_count().await
    }

    /// Handles one initiating PubSub message addressed to this broker.
    pub(crate) async fn handle_message(&self, message: MalMessage) {
        let MalMessage { header, body, qos } = message;

        match (header.stage, body) {
            (InteractionStage::Register, MessageBody::Register(subscription)) => {
                let subscription_id = subscription.subscription_id.clone();
                let result = self
                    .registry
                    .register(
                        &header.from,
                        header.operation,
                        header.transaction_id,
                        subscription,
                    )
                    .await;
                match &result {
                    Ok(()) => debug!(
                        event = events::BROKER_REGISTER_OK,
                        component = COMPONENT,
                        consumer = header.from.as_str(),
                        transaction_id = header.transaction_id,
                        subscription_id = subscription_id.as_str(),
                        "subscription registered"
                    ),
                    Err(err) => warn!(
                        event = events::BROKER_REGISTER_REJECTED,
                        component = COMPONENT,
                        consumer = header.from.as_str(),
                        transaction_id = header.transaction_id,
                        subscription_id = subscription_id.as_str(),
                        err = %err,
                        "subscription rejected"
                    ),
                }
                self.reply(&header, InteractionStage::RegisterAck, result)
                    .await;
            }
            (InteractionStage::Deregister, MessageBody::Deregister(subscription_ids)) => {
                let removed = self
                    .registry
                    .deregister(&header.from, &subscription_ids)
                    .await;
                debug!(
                    event = events::BROKER_DEREGISTER_OK,
                    component = COMPONENT,
                    consumer = header.from.as_str(),
                    transaction_id = header.transaction_id,
                    requested = subscription_ids.len(),
                    removed,
                    "subscriptions deregistered"
                );
                self.reply(&header, InteractionStage::DeregisterAck, Ok(()))
                    .await;
            }
            (InteractionStage::PublishRegister, MessageBody::PublishRegister(key_names)) => {
                let result = self
                    .registry
                    .publish_register(
                        &header.from,
                        header.operation.key(),
                        header.transaction_id,
                        key_names,
                    )
                    .await;
                match &result {
                    Ok(()) => debug!(
                        event = events::BROKER_PUBLISH_REGISTER_OK,
                        component = COMPONENT,
                        publisher = header.from.as_str(),
                        operation = %header.operation,
                        transaction_id = header.transaction_id,
                        "publisher registered"
                    ),
                    Err(err) => warn!(
                        event = events::BROKER_PUBLISH_REGISTER_REJECTED,
                        component = COMPONENT,
                        publisher = header.from.as_str(),
                        operation = %header.operation,
                        transaction_id = header.transaction_id,
                        err = %err,
                        "publisher registration rejected"
                    ),
                }
                self.reply(&header, InteractionStage::PublishRegisterAck, result)
                    .await;
            }
            (InteractionStage::PublishDeregister, _) => {
                let removed = self
                    .registry
                    .publish_deregister(&header.from, header.operation.key())
                    .await;
                debug!(
                    event = events::BROKER_PUBLISH_DEREGISTER_OK,
                    component = COMPONENT,
                    publisher = header.from.as_str(),
                    operation = %header.operation,
                    removed,
                    "publisher deregistered"
                );
                self.reply(&header, InteractionStage::PublishDeregisterAck, Ok(()))
                    .await;
            }
            (InteractionStage::Publish, MessageBody::Publish(publish)) => {
                match self
                    .registry
                    .publish(&header.from, header.operation, &publish)
                    .await
                {
                    Ok(outcome) => {
                        let consumers = outcome.notify_sets.len();
                        let mut notified_updates = 0usize;
                        for set in outcome.notify_sets {
                            notified_updates += set.update_count();
                            let notify = set.into_message(&self.uri, header.operation, &qos);
                            if let Err(err) = self.egress.enqueue(notify).await {
                                warn!(
                                    event = events::BROKER_EGRESS_ENQUEUE_FAILED,
                                    component = COMPONENT,
                                    publisher = header.from.as_str(),
                                    err = %err,
                                    "dropping notify; egress unavailable"
                                );
                            }
                        }
                        debug!(
                            event = events::BROKER_FANOUT_SUMMARY,
                            component = COMPONENT,
                            publisher = header.from.as_str(),
                            operation = %header.operation,
                            snapshot_version = outcome.snapshot_version,
                            updates = publish.updates.len(),
                            consumers,
                            notified_updates,
                            "publish fanned out"
                        );
                    }
                    Err(err) => {
                        warn!(
                            event = events::BROKER_PUBLISH_REJECTED,
                            component = COMPONENT,
                            publisher = header.from.as_str(),
                            operation = %header.operation,
                            transaction_id = header.transaction_id,
                            err = %err,
                            "publish rejected"
                        );
                        self.reply(&header, InteractionStage::Publish, Err(err))
                            .await;
                    }
                }
            }
            (stage, body) => {
                warn!(
                    event = events::BROKER_UNEXPECTED_STAGE,
                    component = COMPONENT,
                    stage = %fields::format_stage(&header),
                    route = %fields::format_route(&header),
                    "broker cannot handle message"
                );
                if let Some(reply_stage) = ack_stage(stage) {
                    let err = if matches!(body, MessageBody::Error(_)) || header.is_error {
                        MalStatus::fail_with_code(
                            MalErrorCode::IncorrectState,
                            "unexpected error stage",
                        )
                    } else {
                        MalStatus::fail_with_code(MalErrorCode::BadEncoding, "unexpected body")
                    };
                    self.reply(&header, reply_stage, Err(err)).await;
                }
            }
        }
    }

    /// Drops state held for `remote`, or for everyone when the whole connection is gone.
    pub(crate) async fn handle_connection_lost(&self, remote: Option<&Uri>) {
        match remote {
            Some(remote) => {
                let summary = self.registry.handle_consumer_lost(remote).await;
                info!(
                    event = events::BROKER_CONSUMER_LOST,
                    component = COMPONENT,
                    remote = remote.as_str(),
                    subscriptions = summary.subscriptions,
                    publisher_operations = summary.publisher_operations,
                    "removed registry state of lost endpoint"
                );
            }
            None => {
                self.registry.clear().await;
                info!(
                    event = events::BROKER_CONSUMER_LOST,
                    component = COMPONENT,
                    remote = fields::NONE,
                    "connection lost; registry cleared"
                );
            }
        }
    }

    /// Detaches from the endpoint, clears the registry and stops the egress worker.
    ///
    /// NOTIFY messages already queued are still delivered.
    pub async fn shutdown(self: &Arc<Self>) {
        if let Some(router) = self.router.upgrade() {
            router.detach_broker(self);
        }
        self.registry.clear().await;
        self.egress.stop();

        info!(
            event = events::BROKER_SHUTDOWN,
            component = COMPONENT,
            broker = self.uri.as_str(),
            "broker stopped"
        );
    }

    async fn reply(
        &self,
        source: &MessageHeader,
        stage: InteractionStage,
        result: Result<(), MalStatus>,
    ) {
        let sent = match result {
            Ok(()) => {
                self.sender
                    .return_response(source, stage, MessageBody::Empty, QosProperties::new())
                    .await
            }
            Err(err) => self.sender.send_error(source, stage, err).await,
        };

        if let Err(err) = sent {
            warn!(
                event = events::BROKER_REPLY_FAILED,
                component = COMPONENT,
                transaction_id = source.transaction_id,
                route = %fields::format_route(source),
                err = %err,
                "broker reply failed"
            );
        }
    }
}

fn ack_stage(stage: InteractionStage) -> Option<InteractionStage> {
    match stage {
        InteractionStage::Register => Some(InteractionStage::RegisterAck),
        InteractionStage::Deregister => Some(InteractionStage::DeregisterAck),
        InteractionStage::PublishRegister => Some(InteractionStage::PublishRegisterAck),
        InteractionStage::PublishDeregister => Some(InteractionStage::PublishDeregisterAck),
        InteractionStage::Publish => Some(InteractionStage::Publish),
        _ => None,
    }
}
