/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
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

use crate::config::InteractionConfig;
use crate::consumer::subscription_listeners::SubscriptionListeners;
use crate::consumer::transaction_table::TransactionTable;
use crate::consumer::MalConsumer;
use crate::data_plane::inbound_router::InboundRouter;
use crate::message::{
    InteractionStage, MalErrorCode, MalMessage, MalStatus, MessageBody, MessageHeader,
    OperationId, QosProperties, Uri,
};
use crate::provider::{MalProvider, MalPublisher, ProviderHandler};
use crate::transport::MalTransport;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// Outbound half of the boundary: everything the interaction layers use to transmit.
///
/// Header fields are preserved verbatim except for stage, error flag and timestamp, which
/// the sender computes.
#[async_trait]
pub trait MessageSender: Send + Sync {
    fn uri(&self) -> &Uri;

    /// Stamps and transmits one message, returning what was sent.
    async fn send_message(
        &self,
        header: MessageHeader,
        body: MessageBody,
        qos: QosProperties,
    ) -> Result<MalMessage, MalStatus>;

    /// Answers `source` with an error on `stage`.
    async fn send_error(
        &self,
        source: &MessageHeader,
        stage: InteractionStage,
        error: MalStatus,
    ) -> Result<MalMessage, MalStatus> {
        self.send_message(
            source.reply(stage, true),
            MessageBody::Error(error),
            QosProperties::new(),
        )
        .await
    }

    /// Answers `source` with a successful `stage`.
    async fn return_response(
        &self,
        source: &MessageHeader,
        stage: InteractionStage,
        body: MessageBody,
        qos: QosProperties,
    ) -> Result<MalMessage, MalStatus> {
        self.send_message(source.reply(stage, false), body, qos)
            .await
    }
}

/// [`MessageSender`] bound to one endpoint URI and its transport.
pub struct EndpointSender {
    uri: Uri,
    transport: Arc<dyn MalTransport>,
}

impl EndpointSender {
    pub fn new(uri: Uri, transport: Arc<dyn MalTransport>) -> Self {
        Self { uri, transport }
    }

    pub(crate) fn transport(&self) -> Arc<dyn MalTransport> {
        self.transport.clone()
    }
}

#[async_trait]
impl MessageSender for EndpointSender {
    fn uri(&self) -> &Uri {
        &self.uri
    }

    async fn send_message(
        &self,
        mut header: MessageHeader,
        body: MessageBody,
        qos: QosProperties,
    ) -> Result<MalMessage, MalStatus> {
        header.timestamp = SystemTime::now();
        let message = MalMessage { header, body, qos };
        self.transport.send(message.clone()).await?;
        Ok(message)
    }
}

/// State shared by the endpoint, its router, and every consumer/publisher created on it.
pub(crate) struct EndpointShared {
    pub(crate) uri: Uri,
    pub(crate) sender: Arc<EndpointSender>,
    pub(crate) transactions: Arc<TransactionTable>,
    pub(crate) subscription_listeners: Arc<SubscriptionListeners>,
    pub(crate) config: InteractionConfig,
    next_transaction_id: AtomicU64,
    next_owner_id: AtomicU64,
}

impl EndpointShared {
    pub(crate) fn next_transaction_id(&self) -> u64 {
        self.next_transaction_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_owner_id(&self) -> u64 {
        self.next_owner_id.fetch_add(1, Ordering::Relaxed)
    }
}

///
/// [`MalEndpoint`] binds a URI to a [`MalTransport`] and hosts the roles that use it:
/// consumers, publishers, at most one provider and at most one broker.
///
/// Transaction identifiers are allocated per endpoint, so every consumer created on the
/// same endpoint shares one identifier space.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use mal_core::{
///     InteractionConfig, MalEndpoint, MalMessage, MalStatus, MalTransport, MessageReceiver, Uri,
/// };
///
/// struct NoopTransport;
///
/// #[async_trait]
/// impl MalTransport for NoopTransport {
///     async fn send(&self, _message: MalMessage) -> Result<(), MalStatus> {
///         Ok(())
///     }
///
///     async fn register_receiver(
///         &self,
///         _uri: &Uri,
///         _receiver: Arc<dyn MessageReceiver>,
///     ) -> Result<(), MalStatus> {
///         Ok(())
///     }
///
///     async fn unregister_receiver(&self, _uri: &Uri) -> Result<(), MalStatus> {
///         Ok(())
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let transport: Arc<dyn MalTransport> = Arc::new(NoopTransport);
/// let endpoint = MalEndpoint::new("ground/consumer", transport, InteractionConfig::default())
///     .await
///     .unwrap();
/// let _consumer = endpoint.create_consumer(Uri::new("ground/provider"));
/// endpoint.close().await.unwrap();
/// # });
/// ```
pub struct MalEndpoint {
    shared: Arc<EndpointShared>,
    router: Arc<InboundRouter>,
}

impl MalEndpoint {
    pub async fn new(
        uri: impl Into<Uri>,
        transport: Arc<dyn MalTransport>,
        config: InteractionConfig,
    ) -> Result<Self, MalStatus> {
        let uri = uri.into();
        let shared = Arc::new(EndpointShared {
            uri: uri.clone(),
            sender: Arc::new(EndpointSender::new(uri.clone(), transport.clone())),
            transactions: Arc::new(TransactionTable::new()),
            subscription_listeners: Arc::new(SubscriptionListeners::new()),
            config,
            next_transaction_id: AtomicU64::new(1),
            next_owner_id: AtomicU64::new(1),
        });
        let router = Arc::new(InboundRouter::new(shared.clone()));
        transport.register_receiver(&uri, router.clone()).await?;

        Ok(Self { shared, router })
    }

    pub fn uri(&self) -> &Uri {
        &self.shared.uri
    }

    pub fn sender(&self) -> Arc<dyn MessageSender> {
        self.shared.sender.clone()
    }

    pub fn transport(&self) -> Arc<dyn MalTransport> {
        self.shared.sender.transport()
    }

    /// Creates a consumer bound to `provider_uri`.
    pub fn create_consumer(&self, provider_uri: impl Into<Uri>) -> MalConsumer {
        MalConsumer::new(self.shared.clone(), provider_uri.into())
    }

    /// Creates a publisher for `operation` on the broker at `broker_uri`.
    pub fn create_publisher(
        &self,
        broker_uri: impl Into<Uri>,
        operation: OperationId,
    ) -> MalPublisher {
        MalPublisher::new(self.shared.clone(), broker_uri.into(), operation)
    }

    /// Installs the application handler serving initiating messages for this endpoint.
    pub fn set_provider(&self, handler: Arc<dyn ProviderHandler>) {
        let provider = MalProvider::new(self.shared.sender.clone(), handler);
        self.router.attach_provider(Arc::new(provider));
    }

    pub(crate) fn router(&self) -> &Arc<InboundRouter> {
        &self.router
    }

    /// Number of transactions still waiting for a reply.
    pub async fn active_transactions(&self) -> usize {
        self.shared.transactions.len().await
    }

    /// Forces SHUTDOWN into every outstanding transaction and leaves the transport.
    pub async fn close(&self) -> Result<(), MalStatus> {
        self.shared
            .transactions
            .fail_where(
                |_| true,
                MalStatus::fail_with_code(MalErrorCode::Shutdown, "endpoint closed"),
            )
            .await;
        self.shared
            .sender
            .transport()
            .unregister_receiver(&self.shared.uri)
            .await
    }
}
