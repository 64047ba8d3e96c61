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

//! Canonical structured field keys and value-format helpers.

use crate::message::{MalMessage, MessageHeader};

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const WORKER_ID: &str = "worker_id";
pub const WORKER_THREAD: &str = "worker_thread";

pub const TRANSACTION_ID: &str = "transaction_id";
pub const INTERACTION_TYPE: &str = "interaction_type";
pub const STAGE: &str = "stage";
pub const SRC: &str = "src";
pub const DST: &str = "dst";
pub const OPERATION: &str = "operation";
pub const SUBSCRIPTION_ID: &str = "subscription_id";
pub const REASON: &str = "reason";
pub const ERR: &str = "err";

pub const NONE: &str = "none";
pub const REASON_CHANNEL_CLOSED: &str = "channel_closed";
pub const DEFAULT_WORKER_THREAD: &str = "unknown-thread";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkerContext {
    pub worker_id: String,
    pub worker_thread: String,
}

impl WorkerContext {
    pub fn new(worker_id: impl Into<String>, worker_thread: Option<&str>) -> Self {
        Self {
            worker_id: worker_id.into(),
            worker_thread: thread_name_or_default(worker_thread),
        }
    }

    pub fn with_current_thread(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            worker_thread: current_thread_name_or_default(),
        }
    }
}

pub fn thread_name_or_default(thread_name: Option<&str>) -> String {
    thread_name.unwrap_or(DEFAULT_WORKER_THREAD).to_string()
}

pub fn current_thread_name_or_default() -> String {
    thread_name_or_default(std::thread::current().name())
}

/// Compact `TYPE/STAGE` label, with an `!` suffix on error stages.
pub fn format_stage(header: &MessageHeader) -> String {
    let marker = if header.is_error { "!" } else { "" };
    format!("{}/{}{}", header.interaction_type, header.stage, marker)
}

pub fn format_message_stage(message: &MalMessage) -> String {
    format_stage(&message.header)
}

pub fn format_route(header: &MessageHeader) -> String {
    format!("{}->{}", header.from, header.to)
}

#[cfg(test)]
mod tests {
    use super::{format_route, format_stage, thread_name_or_default, DEFAULT_WORKER_THREAD};
    use crate::message::{InteractionStage, MessageHeader, OperationId, Uri};

    fn header(stage: InteractionStage) -> MessageHeader {
        MessageHeader::initiating(
            Uri::new("consumer-a"),
            Uri::new("provider-b"),
            stage,
            7,
            OperationId::new(1, 1, 1, 1),
        )
    }

    #[test]
    fn format_stage_marks_error_stages() {
        let submit = header(InteractionStage::Submit);
        assert_eq!(format_stage(&submit), "SUBMIT/Submit");

        let ack = submit.reply(InteractionStage::SubmitAck, true);
        assert_eq!(format_stage(&ack), "SUBMIT/SubmitAck!");
    }

    #[test]
    fn format_route_is_stable_compact_path() {
        assert_eq!(
            format_route(&header(InteractionStage::Invoke)),
            "consumer-a->provider-b"
        );
    }

    #[test]
    fn missing_thread_name_falls_back_to_default() {
        assert_eq!(thread_name_or_default(None), DEFAULT_WORKER_THREAD);
        assert_eq!(thread_name_or_default(Some("named-thread")), "named-thread");
    }
}
