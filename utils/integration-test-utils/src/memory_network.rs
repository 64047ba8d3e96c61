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

use async_trait::async_trait;
use mal_core::{MalErrorCode, MalMessage, MalStatus, MalTransport, MessageReceiver, Uri};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

enum Delivery {
    Message(MalMessage),
    PeerLost(Uri),
}

struct Mailbox {
    queue: mpsc::UnboundedSender<Delivery>,
    task: JoinHandle<()>,
}

/// In-process transport connecting every endpoint registered on it.
///
/// Each endpoint gets a FIFO mailbox drained by its own task, so replies never run on the
/// sender's stack and per-destination ordering is preserved.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    mailboxes: Arc<Mutex<HashMap<Uri, Mailbox>>>,
    sent: Arc<AtomicUsize>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares this network as a transport handle.
    pub fn transport(&self) -> Arc<dyn MalTransport> {
        Arc::new(self.clone())
    }

    /// Number of messages accepted by [`MalTransport::send`] so far.
    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    pub async fn is_registered(&self, uri: &Uri) -> bool {
        self.mailboxes.lock().await.contains_key(uri)
    }

    /// Removes `uri` from the network and tells every other endpoint it is gone.
    pub async fn disconnect(&self, uri: &Uri) {
        let mut mailboxes = self.mailboxes.lock().await;
        if let Some(mailbox) = mailboxes.remove(uri) {
            mailbox.task.abort();
        }
        for mailbox in mailboxes.values() {
            let _ = mailbox.queue.send(Delivery::PeerLost(uri.clone()));
        }
        debug!(endpoint = uri.as_str(), "memory network disconnected endpoint");
    }
}

async fn drain(receiver: Arc<dyn MessageReceiver>, mut queue: mpsc::UnboundedReceiver<Delivery>) {
    while let Some(delivery) = queue.recv().await {
        match delivery {
            Delivery::Message(message) => receiver.on_message(message).await,
            Delivery::PeerLost(remote) => {
                receiver
                    .on_transport_error(
                        Some(&remote),
                        MalStatus::fail_with_code(
                            MalErrorCode::DestinationLost,
                            format!("{remote} left the network"),
                        ),
                    )
                    .await
            }
        }
    }
}

#[async_trait]
impl MalTransport for MemoryNetwork {
    async fn send(&self, message: MalMessage) -> Result<(), MalStatus> {
        let mailboxes = self.mailboxes.lock().await;
        let Some(mailbox) = mailboxes.get(&message.header.to) else {
            return Err(MalStatus::fail_with_code(
                MalErrorCode::DestinationUnknown,
                format!("no endpoint registered for {}", message.header.to),
            ));
        };
        mailbox
            .queue
            .send(Delivery::Message(message))
            .map_err(|_| MalStatus::fail_with_code(MalErrorCode::DestinationLost, "mailbox closed"))?;
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn register_receiver(
        &self,
        uri: &Uri,
        receiver: Arc<dyn MessageReceiver>,
    ) -> Result<(), MalStatus> {
        let mut mailboxes = self.mailboxes.lock().await;
        if mailboxes.contains_key(uri) {
            return Err(MalStatus::fail_with_code(
                MalErrorCode::IncorrectState,
                format!("{uri} is already registered"),
            ));
        }
        let (queue, inbox) = mpsc::unbounded_channel();
        let task = tokio::spawn(drain(receiver, inbox));
        mailboxes.insert(uri.clone(), Mailbox { queue, task });
        Ok(())
    }

    async fn unregister_receiver(&self, uri: &Uri) -> Result<(), MalStatus> {
        if let Some(mailbox) = self.mailboxes.lock().await.remove(uri) {
            mailbox.task.abort();
        }
        Ok(())
    }
}
