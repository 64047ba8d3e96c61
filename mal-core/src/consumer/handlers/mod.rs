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

//! Consumer-side interaction state machines, one variant per pattern shape.

pub(crate) mod ack;
pub(crate) mod invoke;
pub(crate) mod progress;
pub(crate) mod request;

use crate::consumer::response_holder::ResponseSignal;
use crate::consumer::InteractionListener;
use crate::message::{
    accepts_transition, InteractionStage, InteractionType, MalErrorCode, MalMessage, MalStatus,
    MessageHeader, QosProperties,
};
use crate::observability::{events, fields};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub(crate) use ack::{AckHandler, AckHook, AckKind, NotifyRelease, NotifyRestore, PublisherRelease};
pub(crate) use invoke::InvokeHandler;
pub(crate) use progress::ProgressHandler;
pub(crate) use request::RequestHandler;

const COMPONENT: &str = "interaction_handler";

/// Where a single-reply handler delivers its outcome.
pub(crate) enum Reply {
    Sync(ResponseSignal),
    Async(Arc<dyn InteractionListener>),
}

/// State machine owning one outstanding transaction.
///
/// Calls are serialized by the transaction table. Once [`InteractionHandler::finished`]
/// returns true, later calls change nothing observable.
#[async_trait]
pub(crate) trait InteractionHandler: Send {
    /// Consumes a reply stage sent by the peer.
    async fn handle_stage(&mut self, message: MalMessage);

    /// Injects a locally synthesized failure, mapped onto the stage still awaited.
    async fn handle_error(&mut self, header: &MessageHeader, error: MalStatus, qos: &QosProperties);

    fn finished(&self) -> bool;
}

/// Outcome of checking an incoming stage against the stage table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum StageCheck {
    Accepted,
    Unexpected,
    AfterTerminal,
}

/// Last-seen stage plus terminal flag shared by every handler variant.
pub(crate) struct StageTracker {
    interaction_type: InteractionType,
    last_seen: InteractionStage,
    finished: bool,
}

impl StageTracker {
    pub(crate) fn new(initiating: InteractionStage) -> Self {
        Self {
            interaction_type: initiating.interaction_type(),
            last_seen: initiating,
            finished: false,
        }
    }

    pub(crate) fn check(&mut self, header: &MessageHeader) -> StageCheck {
        if self.finished {
            warn!(
                event = events::STAGE_IGNORED_AFTER_TERMINAL,
                component = COMPONENT,
                transaction_id = header.transaction_id,
                stage = %fields::format_stage(header),
                "stage received after transaction finished; ignoring"
            );
            return StageCheck::AfterTerminal;
        }

        if header.interaction_type != self.interaction_type
            || !accepts_transition(self.interaction_type, self.last_seen, header.stage)
        {
            warn!(
                event = events::STAGE_UNEXPECTED_TRANSITION,
                component = COMPONENT,
                transaction_id = header.transaction_id,
                last_seen = %self.last_seen,
                stage = %fields::format_stage(header),
                "unexpected stage transition"
            );
            return StageCheck::Unexpected;
        }

        self.last_seen = header.stage;
        StageCheck::Accepted
    }

    pub(crate) fn last_seen(&self) -> InteractionStage {
        self.last_seen
    }

    pub(crate) fn finish(&mut self) {
        self.finished = true;
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }
}

pub(crate) fn incorrect_state(header: &MessageHeader, expected_after: InteractionStage) -> MalStatus {
    MalStatus::fail_with_code(
        MalErrorCode::IncorrectState,
        format!(
            "unexpected {} after {} in transaction {}",
            header.stage, expected_after, header.transaction_id
        ),
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::consumer::InteractionListener;
    use crate::message::{
        InteractionStage, MalErrorCode, MalMessage, MalStatus, MessageBody, MessageHeader,
        NotifyBody, OperationId, QosProperties, Uri,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records callback names in arrival order, with the error code for error callbacks.
    #[derive(Default)]
    pub(crate) struct CallLog {
        calls: Mutex<Vec<String>>,
    }

    impl CallLog {
        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("call log lock").clone()
        }

        fn push(&self, name: &str) {
            self.calls.lock().expect("call log lock").push(name.to_string());
        }

        fn push_error(&self, name: &str, error: &MalStatus) {
            self.push(&format!("{name}:{}", error.code.name()));
        }
    }

    #[async_trait]
    impl InteractionListener for CallLog {
        async fn submit_ack_received(&self, _h: &MessageHeader, _q: &QosProperties) {
            self.push("submit_ack");
        }
        async fn submit_error_received(&self, _h: &MessageHeader, e: &MalStatus, _q: &QosProperties) {
            self.push_error("submit_error", e);
        }
        async fn request_response_received(
            &self,
            _h: &MessageHeader,
            _b: &MessageBody,
            _q: &QosProperties,
        ) {
            self.push("request_response");
        }
        async fn request_error_received(&self, _h: &MessageHeader, e: &MalStatus, _q: &QosProperties) {
            self.push_error("request_error", e);
        }
        async fn invoke_ack_received(&self, _h: &MessageHeader, _b: &MessageBody, _q: &QosProperties) {
            self.push("invoke_ack");
        }
        async fn invoke_ack_error_received(
            &self,
            _h: &MessageHeader,
            e: &MalStatus,
            _q: &QosProperties,
        ) {
            self.push_error("invoke_ack_error", e);
        }
        async fn invoke_response_received(
            &self,
            _h: &MessageHeader,
            _b: &MessageBody,
            _q: &QosProperties,
        ) {
            self.push("invoke_response");
        }
        async fn invoke_response_error_received(
            &self,
            _h: &MessageHeader,
            e: &MalStatus,
            _q: &QosProperties,
        ) {
            self.push_error("invoke_response_error", e);
        }
        async fn progress_ack_received(
            &self,
            _h: &MessageHeader,
            _b: &MessageBody,
            _q: &QosProperties,
        ) {
            self.push("progress_ack");
        }
        async fn progress_ack_error_received(
            &self,
            _h: &MessageHeader,
            e: &MalStatus,
            _q: &QosProperties,
        ) {
            self.push_error("progress_ack_error", e);
        }
        async fn progress_update_received(
            &self,
            _h: &MessageHeader,
            _b: &MessageBody,
            _q: &QosProperties,
        ) {
            self.push("progress_update");
        }
        async fn progress_update_error_received(
            &self,
            _h: &MessageHeader,
            e: &MalStatus,
            _q: &QosProperties,
        ) {
            self.push_error("progress_update_error", e);
        }
        async fn progress_response_received(
            &self,
            _h: &MessageHeader,
            _b: &MessageBody,
            _q: &QosProperties,
        ) {
            self.push("progress_response");
        }
        async fn progress_response_error_received(
            &self,
            _h: &MessageHeader,
            e: &MalStatus,
            _q: &QosProperties,
        ) {
            self.push_error("progress_response_error", e);
        }
        async fn register_ack_received(&self, _h: &MessageHeader, _q: &QosProperties) {
            self.push("register_ack");
        }
        async fn register_error_received(
            &self,
            _h: &MessageHeader,
            e: &MalStatus,
            _q: &QosProperties,
        ) {
            self.push_error("register_error", e);
        }
        async fn deregister_ack_received(&self, _h: &MessageHeader, _q: &QosProperties) {
            self.push("deregister_ack");
        }
        async fn publish_register_error_received(
            &self,
            _h: &MessageHeader,
            e: &MalStatus,
            _q: &QosProperties,
        ) {
            self.push_error("publish_register_error", e);
        }
        async fn notify_received(&self, _h: &MessageHeader, b: &NotifyBody, _q: &QosProperties) {
            self.push(&format!("notify:{}", b.subscription_id));
        }
        async fn notify_error_received(&self, _h: &MessageHeader, e: &MalStatus, _q: &QosProperties) {
            self.push_error("notify_error", e);
        }
        async fn publish_error_received(
            &self,
            _h: &MessageHeader,
            e: &MalStatus,
            _q: &QosProperties,
        ) {
            self.push_error("publish_error", e);
        }
    }

    pub(crate) fn initiating(stage: InteractionStage) -> MessageHeader {
        MessageHeader::initiating(
            Uri::new("consumer"),
            Uri::new("provider"),
            stage,
            11,
            OperationId::new(2, 1, 3, 4),
        )
    }

    pub(crate) fn reply(initiating: &MessageHeader, stage: InteractionStage) -> MalMessage {
        MalMessage::new(
            initiating.reply(stage, false),
            MessageBody::Encoded(bytes::Bytes::from_static(b"payload")),
        )
    }

    pub(crate) fn error_reply(
        initiating: &MessageHeader,
        stage: InteractionStage,
        code: MalErrorCode,
    ) -> MalMessage {
        MalMessage::new(
            initiating.reply(stage, true),
            MessageBody::Error(MalStatus::fail_with_code(code, "peer error")),
        )
    }
}
