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

//! Inbound router installed as the transport receiver of every endpoint.

use crate::broker::MalBroker;
use crate::endpoint::{EndpointShared, MessageSender};
use crate::message::{
    first_reply_stage, InteractionStage, InteractionType, MalErrorCode, MalMessage, MalStatus,
    Uri,
};
use crate::observability::{events, fields};
use crate::provider::MalProvider;
use crate::transport::MessageReceiver;
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn, Level};

const COMPONENT: &str = "inbound_router";

/// Routes each inbound message to the role that owns it.
///
/// Initiating stages go to the provider, or to the broker for PubSub. NOTIFY and PUBLISH
/// errors go to the subscription listeners. Every other stage is a reply and goes to the
/// transaction table.
pub(crate) struct InboundRouter {
    shared: Arc<EndpointShared>,
    provider: ArcSwapOption<MalProvider>,
    broker: ArcSwapOption<MalBroker>,
}

impl InboundRouter {
    pub(crate) fn new(shared: Arc<EndpointShared>) -> Self {
        Self {
            shared,
            provider: ArcSwapOption::empty(),
            broker: ArcSwapOption::empty(),
        }
    }

    /// Installs `provider`, replacing any previous one.
    pub(crate) fn attach_provider(&self, provider: Arc<MalProvider>) {
        self.provider.store(Some(provider));
    }

    /// Installs `broker` unless one is already attached.
    pub(crate) fn attach_broker(&self, broker: Arc<MalBroker>) -> Result<(), MalStatus> {
        let previous = self
            .broker
            .compare_and_swap(&None::<Arc<MalBroker>>, Some(broker));
        if previous.is_some() {
            return Err(MalStatus::fail_with_code(
                MalErrorCode::IncorrectState,
                "endpoint already hosts a broker",
            ));
        }
        Ok(())
    }

    /// Removes `broker` if it is the attached one.
    pub(crate) fn detach_broker(&self, broker: &Arc<MalBroker>) {
        self.broker.compare_and_swap(broker, None::<Arc<MalBroker>>);
    }

    async fn reject_unattached(&self, message: &MalMessage, role: &'static str) {
        let header = &message.header;
        warn!(
            event = events::INBOUND_ROLE_NOT_ATTACHED,
            component = COMPONENT,
            role,
            transaction_id = header.transaction_id,
            stage = %fields::format_stage(header),
            route = %fields::format_route(header),
            "no role attached for initiating message"
        );

        let Some(reply_stage) = first_reply_stage(header.stage) else {
            return;
        };

        let err = MalStatus::fail_with_code(
            MalErrorCode::UnsupportedOperation,
            format!("endpoint {} has no {role}", self.shared.uri),
        );
        if let Err(send_err) = self.shared.sender.send_error(header, reply_stage, err).await {
            warn!(
                event = events::PROVIDER_REPLY_FAILED,
                component = COMPONENT,
                transaction_id = header.transaction_id,
                err = %send_err,
                "failed to reject message for missing role"
            );
        }
    }
}

#[async_trait]
impl MessageReceiver for InboundRouter {
    async fn on_message(&self, message: MalMessage) {
        let header = &message.header;

        if tracing::enabled!(Level::DEBUG) {
            debug!(
                event = events::INBOUND_RECEIVE,
                component = COMPONENT,
                endpoint = self.shared.uri.as_str(),
                transaction_id = header.transaction_id,
                stage = %fields::format_stage(header),
                route = %fields::format_route(header),
                "inbound message"
            );
        }

        if !header.has_consistent_stage() {
            warn!(
                event = events::INBOUND_INCONSISTENT_STAGE,
                component = COMPONENT,
                transaction_id = header.transaction_id,
                interaction_type = %header.interaction_type,
                stage = %header.stage,
                "stage does not belong to interaction type; dropping"
            );
            return;
        }

        match header.stage {
            InteractionStage::Publish if header.is_error => {
                self.shared
                    .subscription_listeners
                    .deliver_publish_error(message)
                    .await;
            }
            InteractionStage::Notify => {
                self.shared
                    .subscription_listeners
                    .deliver_notify(message)
                    .await;
            }
            stage
                if stage.is_initiating() && header.interaction_type == InteractionType::PubSub =>
            {
                match self.broker.load_full() {
                    Some(broker) => broker.handle_message(message).await,
                    None => self.reject_unattached(&message, "broker").await,
                }
            }
            stage if stage.is_initiating() => match self.provider.load_full() {
                Some(provider) => provider.dispatch(message).await,
                None => self.reject_unattached(&message, "provider").await,
            },
            _ => self.shared.transactions.deliver(message).await,
        }
    }

    async fn on_transport_error(&self, remote: Option<&Uri>, error: MalStatus) {
        warn!(
            event = events::INBOUND_TRANSPORT_ERROR,
            component = COMPONENT,
            endpoint = self.shared.uri.as_str(),
            remote = remote.map_or(fields::NONE, Uri::as_str),
            err = %error,
            "transport reported delivery loss"
        );

        let failed = self
            .shared
            .transactions
            .fail_where(
                |transaction| remote.map_or(true, |remote| transaction.peer() == remote),
                error.clone(),
            )
            .await;
        debug!(
            event = events::TRANSACTION_FORCED_ERROR,
            component = COMPONENT,
            failed,
            "transport error injected into transactions"
        );

        self.shared
            .subscription_listeners
            .fail_broker(remote, &error)
            .await;

        if let Some(broker) = self.broker.load_full() {
            broker.handle_connection_lost(remote).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::InteractionConfig;
    use crate::endpoint::MalEndpoint;
    use crate::message::{
        InteractionStage, MalErrorCode, MalMessage, MalStatus, MessageBody, MessageHeader,
        OperationId, Uri,
    };
    use crate::transport::{MalTransport, MessageReceiver};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct LoopbackTransport {
        sent: Mutex<Vec<MalMessage>>,
        receiver: Mutex<Option<Arc<dyn MessageReceiver>>>,
    }

    impl LoopbackTransport {
        fn sent(&self) -> Vec<MalMessage> {
            self.sent.lock().expect("sent lock").clone()
        }

        fn receiver(&self) -> Arc<dyn MessageReceiver> {
            self.receiver
                .lock()
                .expect("receiver lock")
                .clone()
                .expect("receiver registered")
        }
    }

    #[async_trait]
    impl MalTransport for LoopbackTransport {
        async fn send(&self, message: MalMessage) -> Result<(), MalStatus> {
            self.sent.lock().expect("sent lock").push(message);
            Ok(())
        }

        async fn register_receiver(
            &self,
            _uri: &Uri,
            receiver: Arc<dyn MessageReceiver>,
        ) -> Result<(), MalStatus> {
            *self.receiver.lock().expect("receiver lock") = Some(receiver);
            Ok(())
        }

        async fn unregister_receiver(&self, _uri: &Uri) -> Result<(), MalStatus> {
            Ok(())
        }
    }

    const OPERATION: OperationId = OperationId {
        area: 9,
        area_version: 1,
        service: 1,
        operation: 1,
    };

    fn inbound(stage: InteractionStage) -> MalMessage {
        MalMessage::new(
            MessageHeader::initiating(
                Uri::new("remote"),
                Uri::new("local"),
                stage,
                77,
                OPERATION,
            ),
            MessageBody::Empty,
        )
    }

    async fn endpoint() -> (MalEndpoint, Arc<LoopbackTransport>) {
        let transport = Arc::new(LoopbackTransport::default());
        let endpoint = MalEndpoint::new(
            "local",
            transport.clone(),
            InteractionConfig {
                sync_timeout_ms: Some(2_000),
            },
        )
        .await
        .expect("endpoint");
        (endpoint, transport)
    }

    #[tokio::test]
    async fn initiating_message_without_provider_is_rejected() {
        let (_endpoint, transport) = endpoint().await;

        transport
            .receiver()
            .on_message(inbound(InteractionStage::Request))
            .await;

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].header.stage, InteractionStage::RequestResponse);
        assert!(sent[0].header.is_error);
        assert_eq!(
            sent[0].body.error_status().code(),
            MalErrorCode::UnsupportedOperation
        );
    }

    #[tokio::test]
    async fn send_without_provider_is_dropped_silently() {
        let (_endpoint, transport) = endpoint().await;

        transport
            .receiver()
            .on_message(inbound(InteractionStage::Send))
            .await;

        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn register_without_broker_is_answered_on_register_ack() {
        let (_endpoint, transport) = endpoint().await;

        transport
            .receiver()
            .on_message(inbound(InteractionStage::Register))
            .await;

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].header.stage, InteractionStage::RegisterAck);
        assert!(sent[0].header.is_error);
    }

    #[tokio::test]
    async fn inconsistent_stage_is_dropped() {
        let (_endpoint, transport) = endpoint().await;
        let mut message = inbound(InteractionStage::Request);
        message.header.stage = InteractionStage::InvokeAck;

        transport.receiver().on_message(message).await;

        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn transport_error_fails_transactions_to_that_peer() {
        let (endpoint, transport) = endpoint().await;
        let consumer = Arc::new(endpoint.create_consumer("remote"));

        let pending = tokio::spawn({
            let consumer = consumer.clone();
            async move { consumer.request(OPERATION, MessageBody::Empty).await }
        });

        for _ in 0..100 {
            if endpoint.active_transactions().await == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        transport
            .receiver()
            .on_transport_error(
                Some(&Uri::new("somebody-else")),
                MalStatus::from_code(MalErrorCode::DestinationLost),
            )
            .await;
        assert_eq!(endpoint.active_transactions().await, 1);

        transport
            .receiver()
            .on_transport_error(
                Some(&Uri::new("remote")),
                MalStatus::from_code(MalErrorCode::DestinationLost),
            )
            .await;

        let err = pending
            .await
            .expect("task should not panic")
            .expect_err("request should fail");
        assert_eq!(err.code(), MalErrorCode::DestinationLost);
        assert_eq!(endpoint.active_transactions().await, 0);
    }
}
