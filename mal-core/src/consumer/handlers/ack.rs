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

//! Ack-only handler shared by SUBMIT and the PUBSUB register/deregister exchanges.

use super::{incorrect_state, InteractionHandler, Reply, StageCheck, StageTracker};
use crate::consumer::subscription_listeners::{NotifyBinding, SubscriptionListeners};
use crate::consumer::InteractionListener;
use crate::message::{InteractionStage, MalMessage, MalStatus, MessageHeader, QosProperties, Uri};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Which ack-only exchange a handler tracks.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum AckKind {
    Submit,
    Register,
    Deregister,
    PublishRegister,
    PublishDeregister,
}

impl AckKind {
    pub(crate) fn initiating_stage(self) -> InteractionStage {
        match self {
            AckKind::Submit => InteractionStage::Submit,
            AckKind::Register => InteractionStage::Register,
            AckKind::Deregister => InteractionStage::Deregister,
            AckKind::PublishRegister => InteractionStage::PublishRegister,
            AckKind::PublishDeregister => InteractionStage::PublishDeregister,
        }
    }

    async fn ack_received(
        self,
        listener: &dyn InteractionListener,
        header: &MessageHeader,
        qos: &QosProperties,
    ) {
        match self {
            AckKind::Submit => listener.submit_ack_received(header, qos).await,
            AckKind::Register => listener.register_ack_received(header, qos).await,
            AckKind::Deregister => listener.deregister_ack_received(header, qos).await,
            AckKind::PublishRegister => listener.publish_register_ack_received(header, qos).await,
            AckKind::PublishDeregister => {
                listener.publish_deregister_ack_received(header, qos).await
            }
        }
    }

    async fn error_received(
        self,
        listener: &dyn InteractionListener,
        header: &MessageHeader,
        error: &MalStatus,
        qos: &QosProperties,
    ) {
        match self {
            AckKind::Submit => listener.submit_error_received(header, error, qos).await,
            AckKind::Register => listener.register_error_received(header, error, qos).await,
            AckKind::Deregister => listener.deregister_error_received(header, error, qos).await,
            AckKind::PublishRegister => {
                listener
                    .publish_register_error_received(header, error, qos)
                    .await
            }
            AckKind::PublishDeregister => {
                listener
                    .publish_deregister_error_received(header, error, qos)
                    .await
            }
        }
    }
}

/// Notify listener bindings to drop once the exchange settles.
pub(crate) struct NotifyRelease {
    listeners: Arc<SubscriptionListeners>,
    broker: Uri,
    subscription_ids: Vec<String>,
}

impl NotifyRelease {
    pub(crate) fn new(
        listeners: Arc<SubscriptionListeners>,
        broker: Uri,
        subscription_ids: Vec<String>,
    ) -> Self {
        Self {
            listeners,
            broker,
            subscription_ids,
        }
    }

    async fn release(self) {
        for subscription_id in &self.subscription_ids {
            self.listeners
                .unbind_notify(&self.broker, subscription_id)
                .await;
        }
    }
}

/// Notify binding a REGISTER replaced, put back if the broker refuses the REGISTER.
#[derive(Clone)]
pub(crate) struct NotifyRestore {
    listeners: Arc<SubscriptionListeners>,
    broker: Uri,
    subscription_id: String,
    transaction_id: u64,
    previous: Option<NotifyBinding>,
}

impl NotifyRestore {
    pub(crate) fn new(
        listeners: Arc<SubscriptionListeners>,
        broker: Uri,
        subscription_id: String,
        transaction_id: u64,
        previous: Option<NotifyBinding>,
    ) -> Self {
        Self {
            listeners,
            broker,
            subscription_id,
            transaction_id,
            previous,
        }
    }

    pub(crate) async fn restore(self) {
        self.listeners
            .restore_notify(
                &self.broker,
                &self.subscription_id,
                self.transaction_id,
                self.previous,
            )
            .await;
    }
}

/// Publisher registration opened by a PUBLISH_REGISTER, dropped if the broker refuses it.
#[derive(Clone)]
pub(crate) struct PublisherRelease {
    listeners: Arc<SubscriptionListeners>,
    registration: Arc<Mutex<Option<u64>>>,
    transaction_id: u64,
}

impl PublisherRelease {
    pub(crate) fn new(
        listeners: Arc<SubscriptionListeners>,
        registration: Arc<Mutex<Option<u64>>>,
        transaction_id: u64,
    ) -> Self {
        Self {
            listeners,
            registration,
            transaction_id,
        }
    }

    pub(crate) async fn release(self) {
        {
            let mut registration = self.registration.lock().await;
            if *registration == Some(self.transaction_id) {
                *registration = None;
            }
        }
        self.listeners.unbind_publisher(self.transaction_id).await;
    }
}

/// Side effect applied on the ack outcome.
pub(crate) enum AckHook {
    None,
    /// A failed REGISTER leaves the notify bindings as they were before it.
    RestoreOnError(NotifyRestore),
    /// A successful DEREGISTER drops the bindings of the removed ids.
    ReleaseOnSuccess(NotifyRelease),
    /// A refused PUBLISH_REGISTER leaves the publisher unregistered.
    ReleasePublisherOnError(PublisherRelease),
}

pub(crate) struct AckHandler {
    kind: AckKind,
    tracker: StageTracker,
    reply: Reply,
    hook: AckHook,
}

impl AckHandler {
    pub(crate) fn new(kind: AckKind, reply: Reply) -> Self {
        Self {
            kind,
            tracker: StageTracker::new(kind.initiating_stage()),
            reply,
            hook: AckHook::None,
        }
    }

    pub(crate) fn with_hook(mut self, hook: AckHook) -> Self {
        self.hook = hook;
        self
    }

    async fn settle_hook(&mut self, success: bool) {
        match std::mem::replace(&mut self.hook, AckHook::None) {
            AckHook::RestoreOnError(restore) if !success => restore.restore().await,
            AckHook::ReleaseOnSuccess(release) if success => release.release().await,
            AckHook::ReleasePublisherOnError(release) if !success => release.release().await,
            _ => {}
        }
    }

    async fn deliver_error(&mut self, header: &MessageHeader, error: MalStatus, qos: &QosProperties) {
        self.tracker.finish();
        self.settle_hook(false).await;
        match &mut self.reply {
            Reply::Sync(signal) => signal.signal_error(error),
            Reply::Async(listener) => {
                self.kind
                    .error_received(listener.as_ref(), header, &error, qos)
                    .await
            }
        }
    }
}

#[async_trait]
impl InteractionHandler for AckHandler {
    async fn handle_stage(&mut self, message: MalMessage) {
        let last_seen = self.tracker.last_seen();
        match self.tracker.check(&message.header) {
            StageCheck::AfterTerminal => return,
            StageCheck::Unexpected => {
                let error = incorrect_state(&message.header, last_seen);
                self.deliver_error(&message.header, error, &message.qos)
                    .await;
                return;
            }
            StageCheck::Accepted => {}
        }

        if message.header.is_error {
            let error = message.body.error_status();
            self.deliver_error(&message.header, error, &message.qos)
                .await;
            return;
        }

        self.tracker.finish();
        self.settle_hook(true).await;
        match &mut self.reply {
            Reply::Sync(signal) => signal.signal_response(message),
            Reply::Async(listener) => {
                self.kind
                    .ack_received(listener.as_ref(), &message.header, &message.qos)
                    .await
            }
        }
    }

    async fn handle_error(&mut self, header: &MessageHeader, error: MalStatus, qos: &QosProperties) {
        if self.tracker.is_finished() {
            return;
        }
        self.deliver_error(header, error, qos).await;
    }

    fn finished(&self) -> bool {
        self.tracker.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::{AckHandler, AckHook, AckKind, NotifyRestore, PublisherRelease};
    use crate::consumer::handlers::test_support::{error_reply, initiating, reply, CallLog};
    use crate::consumer::handlers::{InteractionHandler, Reply};
    use crate::consumer::response_holder::response_channel;
    use crate::consumer::subscription_listeners::{NotifyBinding, SubscriptionListeners};
    use crate::message::{
        InteractionStage, MalErrorCode, MalStatus, MessageHeader, OperationId, QosProperties, Uri,
    };
    use tokio::sync::Mutex;
    use std::sync::Arc;

    #[tokio::test]
    async fn async_submit_reports_ack_once() {
        let log = Arc::new(CallLog::default());
        let submit = initiating(InteractionStage::Submit);
        let mut handler = AckHandler::new(AckKind::Submit, Reply::Async(log.clone()));

        handler
            .handle_stage(reply(&submit, InteractionStage::SubmitAck))
            .await;
        assert!(handler.finished());

        handler
            .handle_stage(reply(&submit, InteractionStage::SubmitAck))
            .await;
        handler
            .handle_error(
                &submit,
                MalStatus::from_code(MalErrorCode::DestinationLost),
                &QosProperties::new(),
            )
            .await;

        assert_eq!(log.calls(), vec!["submit_ack"]);
    }

    #[tokio::test]
    async fn sync_submit_unblocks_caller_with_peer_error() {
        let submit = initiating(InteractionStage::Submit);
        let (signal, waiter) = response_channel(submit.transaction_id);
        let mut handler = AckHandler::new(AckKind::Submit, Reply::Sync(signal));

        handler
            .handle_stage(error_reply(
                &submit,
                InteractionStage::SubmitAck,
                MalErrorCode::UnsupportedOperation,
            ))
            .await;

        let error = waiter.wait(None).await.expect_err("ack error");
        assert_eq!(error.code, MalErrorCode::UnsupportedOperation);
        assert!(handler.finished());
    }

    #[tokio::test]
    async fn wrong_stage_forces_incorrect_state() {
        let log = Arc::new(CallLog::default());
        let register = initiating(InteractionStage::Register);
        let mut handler = AckHandler::new(AckKind::Register, Reply::Async(log.clone()));

        handler
            .handle_stage(reply(&register, InteractionStage::DeregisterAck))
            .await;

        assert!(handler.finished());
        assert_eq!(log.calls(), vec!["register_error:INCORRECT_STATE"]);
    }

    async fn refused_register(
        listeners: &Arc<SubscriptionListeners>,
        log: Arc<CallLog>,
        register: &MessageHeader,
        previous: Option<NotifyBinding>,
    ) {
        let mut handler = AckHandler::new(AckKind::Register, Reply::Async(log))
            .with_hook(AckHook::RestoreOnError(NotifyRestore::new(
                listeners.clone(),
                register.to.clone(),
                "S1".to_string(),
                register.transaction_id,
                previous,
            )));
        handler
            .handle_stage(error_reply(
                register,
                InteractionStage::RegisterAck,
                MalErrorCode::Unknown,
            ))
            .await;
    }

    async fn bind_s1(
        listeners: &SubscriptionListeners,
        log: Arc<CallLog>,
        transaction_id: u64,
    ) -> Option<NotifyBinding> {
        listeners
            .bind_notify(
                Uri::new("provider"),
                "S1".to_string(),
                Uri::new("consumer"),
                transaction_id,
                OperationId::new(2, 1, 3, 4),
                log,
            )
            .await
    }

    #[tokio::test]
    async fn failed_first_register_leaves_no_notify_binding() {
        let log = Arc::new(CallLog::default());
        let listeners = Arc::new(SubscriptionListeners::new());
        let register = initiating(InteractionStage::Register);
        let previous = bind_s1(&listeners, log.clone(), register.transaction_id).await;
        assert!(previous.is_none());

        refused_register(&listeners, log.clone(), &register, previous).await;

        assert_eq!(listeners.notify_binding_count().await, 0);
        assert_eq!(log.calls(), vec!["register_error:UNKNOWN"]);
    }

    #[tokio::test]
    async fn failed_reregister_keeps_the_accepted_binding() {
        let log = Arc::new(CallLog::default());
        let listeners = Arc::new(SubscriptionListeners::new());
        let register = initiating(InteractionStage::Register);
        bind_s1(&listeners, log.clone(), 3).await;
        let previous = bind_s1(&listeners, log.clone(), register.transaction_id).await;
        assert!(previous.is_some());

        refused_register(&listeners, log.clone(), &register, previous).await;

        assert_eq!(
            listeners
                .notify_transaction(&Uri::new("provider"), "S1")
                .await,
            Some(3)
        );
    }

    #[tokio::test]
    async fn refused_publish_register_drops_the_registration() {
        let log = Arc::new(CallLog::default());
        let listeners = Arc::new(SubscriptionListeners::new());
        let publish_register = initiating(InteractionStage::PublishRegister);
        let registration = Arc::new(Mutex::new(Some(publish_register.transaction_id)));
        listeners
            .bind_publisher(
                publish_register.transaction_id,
                publish_register.to.clone(),
                publish_register.from.clone(),
                publish_register.operation,
                log.clone(),
            )
            .await;

        let mut handler = AckHandler::new(AckKind::PublishRegister, Reply::Async(log.clone()))
            .with_hook(AckHook::ReleasePublisherOnError(PublisherRelease::new(
                listeners.clone(),
                registration.clone(),
                publish_register.transaction_id,
            )));
        handler
            .handle_stage(error_reply(
                &publish_register,
                InteractionStage::PublishRegisterAck,
                MalErrorCode::Unknown,
            ))
            .await;

        assert_eq!(*registration.lock().await, None);
        assert_eq!(log.calls(), vec!["publish_register_error:UNKNOWN"]);
    }
}
