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

use crate::consumer::handlers::{
    AckHandler, AckHook, AckKind, InteractionHandler, InvokeHandler, NotifyRelease,
    NotifyRestore, ProgressHandler, Reply, RequestHandler,
};
use crate::consumer::response_holder::{response_channel, ResponseWaiter};
use crate::consumer::InteractionListener;
use crate::endpoint::{EndpointShared, MessageSender};
use crate::message::{
    InteractionStage, MalErrorCode, MalMessage, MalStatus, MessageBody, MessageHeader,
    OperationId, QosProperties, Subscription, Uri,
};
use crate::observability::events;
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "mal_consumer";

/// Initiates interactions towards one provider (or broker) URI.
///
/// Synchronous methods wait for the first reply stage, bounded by the endpoint's
/// `sync_timeout_ms`. The `async_` variants return as soon as the initiating message is
/// handed to the transport and report every later stage to the listener.
pub struct MalConsumer {
    shared: Arc<EndpointShared>,
    provider_uri: Uri,
    owner_id: u64,
    qos: QosProperties,
}

impl MalConsumer {
    pub(crate) fn new(shared: Arc<EndpointShared>, provider_uri: Uri) -> Self {
        let owner_id = shared.next_owner_id();
        Self {
            shared,
            provider_uri,
            owner_id,
            qos: QosProperties::new(),
        }
    }

    /// QoS properties attached to every initiating message of this consumer.
    pub fn with_qos(mut self, qos: QosProperties) -> Self {
        self.qos = qos;
        self
    }

    pub fn uri(&self) -> &Uri {
        &self.shared.uri
    }

    pub fn provider_uri(&self) -> &Uri {
        &self.provider_uri
    }

    /// SEND: fire and forget, no transaction is kept.
    pub async fn send(
        &self,
        operation: OperationId,
        body: MessageBody,
    ) -> Result<MalMessage, MalStatus> {
        let header = self.initiating_header(
            InteractionStage::Send,
            self.shared.next_transaction_id(),
            operation,
        );
        self.shared
            .sender
            .send_message(header, body, self.qos.clone())
            .await
    }

    pub async fn submit(
        &self,
        operation: OperationId,
        body: MessageBody,
    ) -> Result<MalMessage, MalStatus> {
        let transaction_id = self.shared.next_transaction_id();
        self.sync_ack(
            AckKind::Submit,
            transaction_id,
            operation,
            body,
            AckHook::None,
        )
        .await
    }

    pub async fn async_submit(
        &self,
        operation: OperationId,
        body: MessageBody,
        listener: Arc<dyn InteractionListener>,
    ) -> Result<MalMessage, MalStatus> {
        let transaction_id = self.shared.next_transaction_id();
        let handler = AckHandler::new(AckKind::Submit, Reply::Async(listener));
        self.initiate(
            InteractionStage::Submit,
            transaction_id,
            operation,
            body,
            Box::new(handler),
        )
        .await
    }

    /// REQUEST: returns the RESPONSE message.
    pub async fn request(
        &self,
        operation: OperationId,
        body: MessageBody,
    ) -> Result<MalMessage, MalStatus> {
        let transaction_id = self.shared.next_transaction_id();
        let (signal, waiter) = response_channel(transaction_id);
        let handler = RequestHandler::new(Reply::Sync(signal));
        self.initiate(
            InteractionStage::Request,
            transaction_id,
            operation,
            body,
            Box::new(handler),
        )
        .await?;
        self.wait(transaction_id, waiter).await
    }

    pub async fn async_request(
        &self,
        operation: OperationId,
        body: MessageBody,
        listener: Arc<dyn InteractionListener>,
    ) -> Result<MalMessage, MalStatus> {
        let transaction_id = self.shared.next_transaction_id();
        let handler = RequestHandler::new(Reply::Async(listener));
        self.initiate(
            InteractionStage::Request,
            transaction_id,
            operation,
            body,
            Box::new(handler),
        )
        .await
    }

    /// INVOKE: returns the ACK; the RESPONSE is delivered to `listener`.
    pub async fn invoke(
        &self,
        operation: OperationId,
        body: MessageBody,
        listener: Arc<dyn InteractionListener>,
    ) -> Result<MalMessage, MalStatus> {
        let transaction_id = self.shared.next_transaction_id();
        let (signal, waiter) = response_channel(transaction_id);
        let handler = InvokeHandler::new(Some(signal), listener);
        self.initiate(
            InteractionStage::Invoke,
            transaction_id,
            operation,
            body,
            Box::new(handler),
        )
        .await?;
        self.wait(transaction_id, waiter).await
    }

    pub async fn async_invoke(
        &self,
        operation: OperationId,
        body: MessageBody,
        listener: Arc<dyn InteractionListener>,
    ) -> Result<MalMessage, MalStatus> {
        let transaction_id = self.shared.next_transaction_id();
        let handler = InvokeHandler::new(None, listener);
        self.initiate(
            InteractionStage::Invoke,
            transaction_id,
            operation,
            body,
            Box::new(handler),
        )
        .await
    }

    /// PROGRESS: returns the ACK; UPDATEs and the RESPONSE are delivered to `listener`.
    pub async fn progress(
        &self,
        operation: OperationId,
        body: MessageBody,
        listener: Arc<dyn InteractionListener>,
    ) -> Result<MalMessage, MalStatus> {
        let transaction_id = self.shared.next_transaction_id();
        let (signal, waiter) = response_channel(transaction_id);
        let handler = ProgressHandler::new(Some(signal), listener);
        self.initiate(
            InteractionStage::Progress,
            transaction_id,
            operation,
            body,
            Box::new(handler),
        )
        .await?;
        self.wait(transaction_id, waiter).await
    }

    pub async fn async_progress(
        &self,
        operation: OperationId,
        body: MessageBody,
        listener: Arc<dyn InteractionListener>,
    ) -> Result<MalMessage, MalStatus> {
        let transaction_id = self.shared.next_transaction_id();
        let handler = ProgressHandler::new(None, listener);
        self.initiate(
            InteractionStage::Progress,
            transaction_id,
            operation,
            body,
            Box::new(handler),
        )
        .await
    }

    /// REGISTER: binds `listener` to NOTIFYs for the subscription and waits for the ACK.
    pub async fn register(
        &self,
        operation: OperationId,
        subscription: Subscription,
        listener: Arc<dyn InteractionListener>,
    ) -> Result<MalMessage, MalStatus> {
        let transaction_id = self.shared.next_transaction_id();
        let (signal, waiter) = response_channel(transaction_id);
        self.open_register(
            transaction_id,
            operation,
            subscription,
            listener,
            Reply::Sync(signal),
        )
        .await?;
        self.wait(transaction_id, waiter).await
    }

    pub async fn async_register(
        &self,
        operation: OperationId,
        subscription: Subscription,
        listener: Arc<dyn InteractionListener>,
    ) -> Result<MalMessage, MalStatus> {
        let transaction_id = self.shared.next_transaction_id();
        self.open_register(
            transaction_id,
            operation,
            subscription,
            listener.clone(),
            Reply::Async(listener),
        )
        .await
    }

    /// DEREGISTER: removes the given subscription ids and their NOTIFY bindings.
    pub async fn deregister(
        &self,
        operation: OperationId,
        subscription_ids: Vec<String>,
    ) -> Result<MalMessage, MalStatus> {
        let hook = AckHook::ReleaseOnSuccess(self.notify_release(subscription_ids.clone()));
        self.sync_ack(
            AckKind::Deregister,
            self.shared.next_transaction_id(),
            operation,
            MessageBody::Deregister(subscription_ids),
            hook,
        )
        .await
    }

    pub async fn async_deregister(
        &self,
        operation: OperationId,
        subscription_ids: Vec<String>,
        listener: Arc<dyn InteractionListener>,
    ) -> Result<MalMessage, MalStatus> {
        let hook = AckHook::ReleaseOnSuccess(self.notify_release(subscription_ids.clone()));
        self.async_ack(
            AckKind::Deregister,
            self.shared.next_transaction_id(),
            operation,
            MessageBody::Deregister(subscription_ids),
            listener,
            hook,
        )
        .await
    }

    /// Forces SHUTDOWN into every transaction this consumer still has open.
    pub async fn close(&self) -> usize {
        let owner_id = self.owner_id;
        let failed = self
            .shared
            .transactions
            .fail_where(
                |entry| entry.owner() == owner_id,
                MalStatus::fail_with_code(MalErrorCode::Shutdown, "consumer closed"),
            )
            .await;
        debug!(
            event = events::CONSUMER_CLOSED,
            component = COMPONENT,
            dst = %self.provider_uri,
            failed,
            "consumer closed"
        );
        failed
    }

    pub(crate) async fn sync_ack(
        &self,
        kind: AckKind,
        transaction_id: u64,
        operation: OperationId,
        body: MessageBody,
        hook: AckHook,
    ) -> Result<MalMessage, MalStatus> {
        let (signal, waiter) = response_channel(transaction_id);
        let handler = AckHandler::new(kind, Reply::Sync(signal)).with_hook(hook);
        self.initiate(
            kind.initiating_stage(),
            transaction_id,
            operation,
            body,
            Box::new(handler),
        )
        .await?;
        self.wait(transaction_id, waiter).await
    }

    pub(crate) async fn async_ack(
        &self,
        kind: AckKind,
        transaction_id: u64,
        operation: OperationId,
        body: MessageBody,
        listener: Arc<dyn InteractionListener>,
        hook: AckHook,
    ) -> Result<MalMessage, MalStatus> {
        let handler = AckHandler::new(kind, Reply::Async(listener)).with_hook(hook);
        self.initiate(
            kind.initiating_stage(),
            transaction_id,
            operation,
            body,
            Box::new(handler),
        )
        .await
    }

    /// Sends a message that opens no transaction, reusing `transaction_id`.
    pub(crate) async fn send_untracked(
        &self,
        stage: InteractionStage,
        transaction_id: u64,
        operation: OperationId,
        body: MessageBody,
    ) -> Result<MalMessage, MalStatus> {
        let header = self.initiating_header(stage, transaction_id, operation);
        self.shared
            .sender
            .send_message(header, body, self.qos.clone())
            .await
    }

    pub(crate) fn shared(&self) -> &Arc<EndpointShared> {
        &self.shared
    }

    async fn open_register(
        &self,
        transaction_id: u64,
        operation: OperationId,
        subscription: Subscription,
        listener: Arc<dyn InteractionListener>,
        reply: Reply,
    ) -> Result<MalMessage, MalStatus> {
        let subscription_id = subscription.subscription_id.clone();
        let previous = self
            .shared
            .subscription_listeners
            .bind_notify(
                self.provider_uri.clone(),
                subscription_id.clone(),
                self.shared.uri.clone(),
                transaction_id,
                operation,
                listener,
            )
            .await;

        let restore = NotifyRestore::new(
            self.shared.subscription_listeners.clone(),
            self.provider_uri.clone(),
            subscription_id,
            transaction_id,
            previous,
        );
        let handler = AckHandler::new(AckKind::Register, reply)
            .with_hook(AckHook::RestoreOnError(restore.clone()));
        let sent = self
            .initiate(
                InteractionStage::Register,
                transaction_id,
                operation,
                MessageBody::Register(subscription),
                Box::new(handler),
            )
            .await;

        if sent.is_err() {
            restore.restore().await;
        }
        sent
    }

    fn notify_release(&self, subscription_ids: Vec<String>) -> NotifyRelease {
        NotifyRelease::new(
            self.shared.subscription_listeners.clone(),
            self.provider_uri.clone(),
            subscription_ids,
        )
    }

    fn initiating_header(
        &self,
        stage: InteractionStage,
        transaction_id: u64,
        operation: OperationId,
    ) -> MessageHeader {
        MessageHeader::initiating(
            self.shared.uri.clone(),
            self.provider_uri.clone(),
            stage,
            transaction_id,
            operation,
        )
    }

    /// Opens the transaction, then transmits. A transmission failure closes it again.
    async fn initiate(
        &self,
        stage: InteractionStage,
        transaction_id: u64,
        operation: OperationId,
        body: MessageBody,
        handler: Box<dyn InteractionHandler>,
    ) -> Result<MalMessage, MalStatus> {
        let header = self.initiating_header(stage, transaction_id, operation);
        self.shared
            .transactions
            .open(self.owner_id, header.clone(), handler)
            .await;

        match self
            .shared
            .sender
            .send_message(header, body, self.qos.clone())
            .await
        {
            Ok(sent) => Ok(sent),
            Err(err) => {
                warn!(
                    event = events::TRANSACTION_SEND_FAILED,
                    component = COMPONENT,
                    transaction_id,
                    interaction_type = %stage.interaction_type(),
                    dst = %self.provider_uri,
                    err = %err,
                    "failed to send initiating message"
                );
                self.shared.transactions.discard(transaction_id).await;
                Err(err)
            }
        }
    }

    async fn wait(
        &self,
        transaction_id: u64,
        waiter: ResponseWaiter,
    ) -> Result<MalMessage, MalStatus> {
        let result = waiter.wait(self.shared.config.sync_timeout()).await;
        if let Err(err) = &result {
            if err.code == MalErrorCode::DeliveryTimedout {
                warn!(
                    event = events::TRANSACTION_TIMED_OUT,
                    component = COMPONENT,
                    transaction_id,
                    dst = %self.provider_uri,
                    "synchronous call timed out"
                );
                self.shared
                    .transactions
                    .fail_where(|entry| entry.transaction_id() == transaction_id, err.clone())
                    .await;
            }
        }
        result
    }
}
