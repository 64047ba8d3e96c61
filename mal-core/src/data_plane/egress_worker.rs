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

//! Egress worker that ships queued NOTIFY messages off the publish path.

use crate::endpoint::MessageSender;
use crate::message::{MalErrorCode, MalMessage, MalStatus, MessageHeader};
use crate::observability::events;
use crate::observability::fields::{self, WorkerContext};
use crate::runtime::worker_runtime::{
    spawn_dispatch_loop, DispatchLoopHandle, DEFAULT_EGRESS_RUNTIME_THREAD_NAME,
};
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn, Level};
use uuid::Uuid;

const EGRESS_RUNTIME_THREAD_NAME_PREFIX: &str = "mal-egress-";
const EGRESS_RUNTIME_THREAD_NAME_MAX_LEN: usize = 15;
const COMPONENT: &str = "egress_worker";

struct FormattedMessageFields {
    transaction_id: u64,
    stage: String,
    route: String,
}

impl FormattedMessageFields {
    fn from_header(header: &MessageHeader) -> Self {
        Self {
            transaction_id: header.transaction_id,
            stage: fields::format_stage(header),
            route: fields::format_route(header),
        }
    }
}

/// Bounded queue plus the dedicated thread draining it into a [`MessageSender`].
pub(crate) struct EgressWorker {
    worker_id: String,
    queue: ArcSwapOption<Sender<MalMessage>>,
    dispatch_handle: DispatchLoopHandle,
}

impl EgressWorker {
    /// Spawns the dispatch thread with a queue of `queue_size` messages.
    pub(crate) fn new(sender: Arc<dyn MessageSender>, queue_size: usize) -> Self {
        let (queue, receiver) = mpsc::channel(queue_size.max(1));
        let worker_id = Uuid::new_v4().simple().to_string();
        let runtime_thread_name = Self::build_runtime_thread_name(&worker_id);
        let worker_id_for_loop = worker_id.clone();

        let dispatch_handle = spawn_dispatch_loop(
            runtime_thread_name,
            (sender, receiver),
            move |(sender, receiver)| async move {
                Self::dispatch_loop(worker_id_for_loop, sender, receiver).await;
            },
        );

        debug!(
            event = events::EGRESS_WORKER_CREATE,
            component = COMPONENT,
            worker_id = worker_id.as_str(),
            worker_thread = dispatch_handle.worker_thread(),
            queue_size,
            "egress worker created"
        );

        Self {
            worker_id,
            queue: ArcSwapOption::from_pointee(queue),
            dispatch_handle,
        }
    }

    pub(crate) fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub(crate) fn runtime_thread(&self) -> &str {
        self.dispatch_handle.worker_thread()
    }

    /// Queues one message, waiting for room when the queue is full.
    pub(crate) async fn enqueue(&self, message: MalMessage) -> Result<(), MalStatus> {
        let Some(queue) = self.queue.load_full() else {
            return Err(MalStatus::fail_with_code(
                MalErrorCode::Shutdown,
                "egress worker stopped",
            ));
        };

        queue.send(message).await.map_err(|_| {
            MalStatus::fail_with_code(MalErrorCode::Internal, "egress queue closed")
        })
    }

    /// Closes the queue. Messages already queued are still sent.
    pub(crate) fn stop(&self) {
        self.queue.store(None);
    }

    fn build_runtime_thread_name(worker_id: &str) -> String {
        let suffix_len = EGRESS_RUNTIME_THREAD_NAME_MAX_LEN - EGRESS_RUNTIME_THREAD_NAME_PREFIX.len();
        let suffix: String = worker_id
            .chars()
            .filter(|ch| ch.is_ascii_hexdigit())
            .take(suffix_len)
            .collect();

        if suffix.len() == suffix_len {
            format!("{EGRESS_RUNTIME_THREAD_NAME_PREFIX}{suffix}")
        } else {
            DEFAULT_EGRESS_RUNTIME_THREAD_NAME.to_string()
        }
    }

    /// Sends every received message until the queue closes.
    pub(crate) async fn dispatch_loop(
        worker_id: String,
        sender: Arc<dyn MessageSender>,
        mut receiver: Receiver<MalMessage>,
    ) {
        let worker_context = WorkerContext::with_current_thread(worker_id);

        while let Some(MalMessage { header, body, qos }) = receiver.recv().await {
            let mut message_fields = tracing::enabled!(Level::DEBUG)
                .then(|| FormattedMessageFields::from_header(&header));

            if let Some(fields) = message_fields.as_ref() {
                debug!(
                    event = events::EGRESS_SEND_ATTEMPT,
                    component = COMPONENT,
                    worker_id = worker_context.worker_id.as_str(),
                    worker_thread = worker_context.worker_thread.as_str(),
                    transaction_id = fields.transaction_id,
                    stage = fields.stage.as_str(),
                    route = fields.route.as_str(),
                    "attempting egress send"
                );
            }

            match sender.send_message(header.clone(), body, qos).await {
                Ok(_) => {
                    if let Some(fields) = message_fields.as_ref() {
                        debug!(
                            event = events::EGRESS_SEND_OK,
                            component = COMPONENT,
                            worker_id = worker_context.worker_id.as_str(),
                            worker_thread = worker_context.worker_thread.as_str(),
                            transaction_id = fields.transaction_id,
                            stage = fields.stage.as_str(),
                            route = fields.route.as_str(),
                            "egress send succeeded"
                        );
                    }
                }
                Err(err) => {
                    if tracing::enabled!(Level::WARN) {
                        let fields = message_fields
                            .get_or_insert_with(|| FormattedMessageFields::from_header(&header));

                        warn!(
                            event = events::EGRESS_SEND_FAILED,
                            component = COMPONENT,
                            worker_id = worker_context.worker_id.as_str(),
                            worker_thread = worker_context.worker_thread.as_str(),
                            transaction_id = fields.transaction_id,
                            stage = fields.stage.as_str(),
                            route = fields.route.as_str(),
                            err = %err,
                            "egress send failed"
                        );
                    }
                }
            }
        }

        info!(
            event = events::EGRESS_RECV_CLOSED,
            component = COMPONENT,
            worker_id = worker_context.worker_id.as_str(),
            worker_thread = worker_context.worker_thread.as_str(),
            reason = fields::REASON_CHANNEL_CLOSED,
            "queue closed; stopping dispatch loop"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{EgressWorker, EGRESS_RUNTIME_THREAD_NAME_MAX_LEN, EGRESS_RUNTIME_THREAD_NAME_PREFIX};
    use crate::endpoint::MessageSender;
    use crate::message::{
        InteractionStage, MalErrorCode, MalMessage, MalStatus, MessageBody, MessageHeader,
        OperationId, QosProperties, Uri,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct CountingSender {
        uri: Uri,
        send_count: AtomicUsize,
        fail: bool,
    }

    impl CountingSender {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                uri: Uri::new("broker"),
                send_count: AtomicUsize::new(0),
                fail,
            })
        }

        fn sent_count(&self) -> usize {
            self.send_count.load(Ordering::Relaxed)
        }
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
            if self.fail {
                return Err(MalStatus::fail_with_code(
                    MalErrorCode::DestinationUnknown,
                    "no route",
                ));
            }
            Ok(MalMessage { header, body, qos })
        }
    }

    fn notify(transaction_id: u64) -> MalMessage {
        MalMessage::new(
            MessageHeader::initiating(
                Uri::new("broker"),
                Uri::new("consumer"),
                InteractionStage::Notify,
                transaction_id,
                OperationId::new(1, 1, 1, 1),
            ),
            MessageBody::Empty,
        )
    }

    #[tokio::test]
    async fn dispatch_loop_exits_on_closed_queue() {
        let sender = CountingSender::new(false);
        let (queue, receiver) = mpsc::channel(8);
        drop(queue);

        EgressWorker::dispatch_loop("closed-loop".to_string(), sender.clone(), receiver).await;

        assert_eq!(sender.sent_count(), 0);
    }

    #[tokio::test]
    async fn dispatch_loop_drains_messages_queued_before_close() {
        let sender = CountingSender::new(false);
        let (queue, receiver) = mpsc::channel(8);
        queue.send(notify(1)).await.expect("queue accepts first");
        queue.send(notify(2)).await.expect("queue accepts second");
        drop(queue);

        EgressWorker::dispatch_loop("drain-loop".to_string(), sender.clone(), receiver).await;

        assert_eq!(sender.sent_count(), 2);
    }

    #[tokio::test]
    async fn dispatch_loop_continues_after_send_failure() {
        let sender = CountingSender::new(true);
        let (queue, receiver) = mpsc::channel(8);
        queue.send(notify(1)).await.expect("queue accepts first");
        queue.send(notify(2)).await.expect("queue accepts second");
        drop(queue);

        EgressWorker::dispatch_loop("failing-loop".to_string(), sender.clone(), receiver).await;

        assert_eq!(sender.sent_count(), 2);
    }

    #[tokio::test]
    async fn stopped_worker_rejects_new_messages() {
        let sender = CountingSender::new(false);
        let worker = EgressWorker::new(sender.clone(), 4);
        assert!(!worker.worker_id().is_empty());

        worker.enqueue(notify(5)).await.expect("running worker accepts");
        worker.stop();

        let err = worker.enqueue(notify(6)).await.expect_err("stopped worker rejects");
        assert_eq!(err.code(), MalErrorCode::Shutdown);

        for _ in 0..50 {
            if sender.sent_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(sender.sent_count(), 1);
    }

    #[test]
    fn build_runtime_thread_name_keeps_prefix_and_linux_safe_length() {
        let thread_name = EgressWorker::build_runtime_thread_name("abcdef0123456789");

        assert!(thread_name.starts_with(EGRESS_RUNTIME_THREAD_NAME_PREFIX));
        assert_eq!(thread_name.len(), EGRESS_RUNTIME_THREAD_NAME_MAX_LEN);
    }

    #[test]
    fn build_runtime_thread_name_uses_fallback_for_short_non_hex_ids() {
        let thread_name = EgressWorker::build_runtime_thread_name("zzz");

        assert_eq!(
            thread_name,
            crate::runtime::worker_runtime::DEFAULT_EGRESS_RUNTIME_THREAD_NAME
        );
    }
}
