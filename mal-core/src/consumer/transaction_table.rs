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

//! Active consumer transactions keyed by transaction id.

use crate::consumer::handlers::InteractionHandler;
use crate::message::{MalMessage, MalStatus, MessageHeader, QosProperties, Uri};
use crate::observability::{events, fields};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const COMPONENT: &str = "transaction_table";

/// One outstanding transaction. The handler lock is scoped to this transaction only.
pub(crate) struct ActiveTransaction {
    owner: u64,
    initiating: MessageHeader,
    handler: Mutex<Box<dyn InteractionHandler>>,
}

impl ActiveTransaction {
    pub(crate) fn owner(&self) -> u64 {
        self.owner
    }

    pub(crate) fn transaction_id(&self) -> u64 {
        self.initiating.transaction_id
    }

    pub(crate) fn peer(&self) -> &Uri {
        &self.initiating.to
    }

    async fn inject_error(&self, error: MalStatus) {
        debug!(
            event = events::TRANSACTION_FORCED_ERROR,
            component = COMPONENT,
            transaction_id = self.initiating.transaction_id,
            stage = %fields::format_stage(&self.initiating),
            err = %error,
            "injecting error into transaction"
        );
        let mut handler = self.handler.lock().await;
        handler
            .handle_error(&self.initiating, error, &QosProperties::new())
            .await;
    }
}

#[derive(Default)]
pub(crate) struct TransactionTable {
    entries: Mutex<HashMap<u64, Arc<ActiveTransaction>>>,
}

impl TransactionTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn open(
        &self,
        owner: u64,
        initiating: MessageHeader,
        handler: Box<dyn InteractionHandler>,
    ) {
        let transaction_id = initiating.transaction_id;
        debug!(
            event = events::TRANSACTION_OPEN,
            component = COMPONENT,
            transaction_id,
            stage = %fields::format_stage(&initiating),
            dst = %initiating.to,
            "transaction opened"
        );
        let entry = Arc::new(ActiveTransaction {
            owner,
            initiating,
            handler: Mutex::new(handler),
        });
        self.entries.lock().await.insert(transaction_id, entry);
    }

    /// Hands a reply stage to its transaction, closing it once the handler is finished.
    pub(crate) async fn deliver(&self, message: MalMessage) {
        let transaction_id = message.header.transaction_id;
        let entry = self.entries.lock().await.get(&transaction_id).cloned();

        let Some(entry) = entry.filter(|entry| entry.peer() == &message.header.from) else {
            warn!(
                event = events::TRANSACTION_UNKNOWN,
                component = COMPONENT,
                transaction_id,
                stage = %fields::format_message_stage(&message),
                src = %message.header.from,
                "no active transaction for reply; dropping"
            );
            return;
        };

        let finished = {
            let mut handler = entry.handler.lock().await;
            handler.handle_stage(message).await;
            handler.finished()
        };

        if finished {
            self.remove_entry(transaction_id, &entry).await;
        }
    }

    /// Removes the transaction without notifying anybody.
    pub(crate) async fn discard(&self, transaction_id: u64) {
        if self.entries.lock().await.remove(&transaction_id).is_some() {
            debug!(
                event = events::TRANSACTION_CLOSED,
                component = COMPONENT,
                transaction_id,
                reason = "discarded",
                "transaction discarded"
            );
        }
    }

    /// Fails every transaction matching `predicate`; returns how many were failed.
    pub(crate) async fn fail_where<P>(&self, predicate: P, error: MalStatus) -> usize
    where
        P: Fn(&ActiveTransaction) -> bool,
    {
        let failed: Vec<Arc<ActiveTransaction>> = {
            let mut entries = self.entries.lock().await;
            let ids: Vec<u64> = entries
                .iter()
                .filter(|(_, entry)| predicate(entry))
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| entries.remove(id)).collect()
        };

        for entry in &failed {
            entry.inject_error(error.clone()).await;
        }
        failed.len()
    }

    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    async fn remove_entry(&self, transaction_id: u64, entry: &Arc<ActiveTransaction>) {
        let mut entries = self.entries.lock().await;
        if entries
            .get(&transaction_id)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
        {
            entries.remove(&transaction_id);
            debug!(
                event = events::TRANSACTION_CLOSED,
                component = COMPONENT,
                transaction_id,
                "transaction finished"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TransactionTable;
    use crate::consumer::handlers::test_support::{initiating, reply, CallLog};
    use crate::consumer::handlers::{AckHandler, AckKind, InvokeHandler, Reply};
    use crate::message::{InteractionStage, MalErrorCode, MalStatus, Uri};
    use std::sync::Arc;

    #[tokio::test]
    async fn finished_transactions_are_removed() {
        let log = Arc::new(CallLog::default());
        let table = TransactionTable::new();
        let submit = initiating(InteractionStage::Submit);
        table
            .open(
                1,
                submit.clone(),
                Box::new(AckHandler::new(AckKind::Submit, Reply::Async(log.clone()))),
            )
            .await;
        assert_eq!(table.len().await, 1);

        table
            .deliver(reply(&submit, InteractionStage::SubmitAck))
            .await;
        assert_eq!(table.len().await, 0);

        table
            .deliver(reply(&submit, InteractionStage::SubmitAck))
            .await;
        assert_eq!(log.calls(), vec!["submit_ack"]);
    }

    #[tokio::test]
    async fn replies_from_other_peers_are_dropped() {
        let log = Arc::new(CallLog::default());
        let table = TransactionTable::new();
        let invoke = initiating(InteractionStage::Invoke);
        table
            .open(1, invoke.clone(), Box::new(InvokeHandler::new(None, log.clone())))
            .await;

        let mut spoofed = reply(&invoke, InteractionStage::InvokeAck);
        spoofed.header.from = Uri::new("somebody-else");
        table.deliver(spoofed).await;

        assert!(log.calls().is_empty());
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn fail_where_only_touches_matching_owner() {
        let log_a = Arc::new(CallLog::default());
        let log_b = Arc::new(CallLog::default());
        let table = TransactionTable::new();

        let mut first = initiating(InteractionStage::Invoke);
        first.transaction_id = 1;
        let mut second = initiating(InteractionStage::Invoke);
        second.transaction_id = 2;
        table
            .open(7, first, Box::new(InvokeHandler::new(None, log_a.clone())))
            .await;
        table
            .open(8, second, Box::new(InvokeHandler::new(None, log_b.clone())))
            .await;

        let failed = table
            .fail_where(
                |entry| entry.owner() == 7,
                MalStatus::from_code(MalErrorCode::Shutdown),
            )
            .await;

        assert_eq!(failed, 1);
        assert_eq!(log_a.calls(), vec!["invoke_ack_error:SHUTDOWN"]);
        assert!(log_b.calls().is_empty());
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_deliveries_for_one_transaction_are_serialized() {
        let log = Arc::new(CallLog::default());
        let table = Arc::new(TransactionTable::new());
        let progress = initiating(InteractionStage::Progress);
        table
            .open(
                1,
                progress.clone(),
                Box::new(crate::consumer::handlers::ProgressHandler::new(
                    None,
                    log.clone(),
                )),
            )
            .await;
        table
            .deliver(reply(&progress, InteractionStage::ProgressAck))
            .await;

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let table = table.clone();
            let update = reply(&progress, InteractionStage::ProgressUpdate);
            tasks.push(tokio::spawn(async move { table.deliver(update).await }));
        }
        for task in tasks {
            task.await.expect("delivery task");
        }

        let calls = log.calls();
        assert_eq!(calls.len(), 17);
        assert!(calls[1..].iter().all(|call| call == "progress_update"));
    }
}
