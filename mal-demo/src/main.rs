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
use bytes::Bytes;
use clap::Parser;
use integration_test_utils::{parameter_key_names, parameter_operation, parameter_update};
use integration_test_utils::{wait_until, MemoryNetwork};
use mal_core::{
    AttributeValue, Interaction, InteractionListener, InvokeInteraction, MalBroker, MalConfig,
    MalEndpoint, MalErrorCode, MalStatus, MessageBody, MessageHeader, NotifyBody, OperationId,
    ProgressInteraction, ProviderHandler, QosProperties, RequestInteraction, SubmitInteraction,
    Subscription, SubscriptionFilter, Uri,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const MODES: [&str; 4] = ["SAFE", "NOMINAL", "SCIENCE", "DOWNLINK"];
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command()]
struct DemoArgs {
    /// JSON5 configuration file; defaults apply when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Number of updates published by the demo publisher.
    #[arg(short, long, default_value_t = 8)]
    updates: usize,
}

/// Logs the callbacks it receives and counts delivered NOTIFY updates.
struct DemoListener {
    name: &'static str,
    updates: AtomicUsize,
}

impl DemoListener {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            updates: AtomicUsize::new(0),
        })
    }

    fn received(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InteractionListener for DemoListener {
    async fn notify_received(
        &self,
        header: &MessageHeader,
        body: &NotifyBody,
        _qos: &QosProperties,
    ) {
        self.updates.fetch_add(body.updates.len(), Ordering::SeqCst);
        for update in &body.updates {
            info!(
                listener = self.name,
                subscription_id = %body.subscription_id,
                broker = %header.from,
                domain = %update.header.domain.join("."),
                keys = ?update.header.key_values,
                bytes = update.value.len(),
                "notify received"
            );
        }
    }

    async fn notify_error_received(
        &self,
        _header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        warn!(listener = self.name, err = %error, "notify error");
    }

    async fn publish_error_received(
        &self,
        _header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        warn!(listener = self.name, err = %error, "publish rejected by broker");
    }

    async fn invoke_response_received(
        &self,
        header: &MessageHeader,
        body: &MessageBody,
        _qos: &QosProperties,
    ) {
        info!(
            listener = self.name,
            transaction_id = header.transaction_id,
            body = ?body,
            "invoke response"
        );
    }

    async fn progress_update_received(
        &self,
        header: &MessageHeader,
        body: &MessageBody,
        _qos: &QosProperties,
    ) {
        info!(
            listener = self.name,
            transaction_id = header.transaction_id,
            body = ?body,
            "progress update"
        );
    }

    async fn progress_response_received(
        &self,
        header: &MessageHeader,
        body: &MessageBody,
        _qos: &QosProperties,
    ) {
        info!(
            listener = self.name,
            transaction_id = header.transaction_id,
            body = ?body,
            "progress response"
        );
    }
}

fn payload(text: &'static str) -> MessageBody {
    MessageBody::Encoded(Bytes::from_static(text.as_bytes()))
}

/// Serves one housekeeping operation in every provider pattern.
struct HousekeepingProvider;

#[async_trait]
impl ProviderHandler for HousekeepingProvider {
    async fn handle_send(&self, interaction: Interaction) -> Result<(), MalStatus> {
        info!(src = %interaction.header().from, body = ?interaction.body(), "send received");
        Ok(())
    }

    async fn handle_submit(&self, interaction: SubmitInteraction) -> Result<(), MalStatus> {
        interaction.ack().await
    }

    async fn handle_request(&self, interaction: RequestInteraction) -> Result<(), MalStatus> {
        interaction.reply(payload("all systems nominal")).await
    }

    async fn handle_invoke(&self, interaction: InvokeInteraction) -> Result<(), MalStatus> {
        let acknowledged = interaction.ack(MessageBody::Empty).await?;
        acknowledged.response(payload("heater switched on")).await
    }

    async fn handle_progress(&self, interaction: ProgressInteraction) -> Result<(), MalStatus> {
        let acknowledged = interaction.ack(MessageBody::Empty).await?;
        for step in ["dump 1/2", "dump 2/2"] {
            acknowledged.update(payload(step)).await?;
        }
        acknowledged.response(payload("memory dump complete")).await
    }
}

fn load_config(path: Option<&str>) -> Result<MalConfig, MalStatus> {
    match path {
        Some(path) => MalConfig::from_file(path).map_err(|e| {
            MalStatus::fail_with_code(MalErrorCode::Internal, format!("{path}: {e}"))
        }),
        None => Ok(MalConfig::default()),
    }
}

fn mode_subscription(id: &str, mode: &str) -> Subscription {
    Subscription::new(id)
        .with_domain(["esa", "*"])
        .with_filter(SubscriptionFilter::new(
            "mode",
            vec![AttributeValue::identifier(mode)],
        ))
}

async fn endpoint(
    network: &MemoryNetwork,
    uri: &str,
    config: &MalConfig,
) -> Result<MalEndpoint, MalStatus> {
    MalEndpoint::new(uri, network.transport(), config.interaction.clone()).await
}

#[tokio::main]
async fn main() -> Result<(), MalStatus> {
    let _ = tracing_subscriber::fmt::try_init();

    let args = DemoArgs::parse();
    let config = load_config(args.config.as_deref())?;
    info!(
        sync_timeout_ms = ?config.interaction.sync_timeout_ms,
        egress_queue_size = config.broker.egress_queue_size,
        "Started mal-demo"
    );

    let network = MemoryNetwork::new();
    let broker_endpoint = endpoint(&network, "ground/broker", &config).await?;
    let broker = MalBroker::start(&broker_endpoint, config.broker.clone())?;

    let safe_endpoint = endpoint(&network, "ground/safe-watch", &config).await?;
    let safe_listener = DemoListener::new("safe-watch");
    safe_endpoint
        .create_consumer(broker.uri().clone())
        .register(
            parameter_operation(),
            mode_subscription("safe", "SAFE"),
            safe_listener.clone(),
        )
        .await?;

    let science_endpoint = endpoint(&network, "ground/science-watch", &config).await?;
    let science_listener = DemoListener::new("science-watch");
    science_endpoint
        .create_consumer(broker.uri().clone())
        .register(
            parameter_operation(),
            mode_subscription("science", "SCIENCE").with_selected_keys(["apid"]),
            science_listener.clone(),
        )
        .await?;

    for interest in broker.required_interest().await {
        info!(
            operation = ?interest.operation,
            domain = ?interest.domain,
            keys = ?interest.keys,
            "broker interest"
        );
    }

    let provider_endpoint = endpoint(&network, "space/payload", &config).await?;
    provider_endpoint.set_provider(Arc::new(HousekeepingProvider));
    let publisher = provider_endpoint.create_publisher(broker.uri().clone(), parameter_operation());
    let publisher_listener = DemoListener::new("publisher");
    publisher
        .register(parameter_key_names(), publisher_listener)
        .await?;

    let updates: Vec<_> = (0..args.updates)
        .map(|index| {
            parameter_update(
                &["esa", "mission"],
                MODES[index % MODES.len()],
                index as u64,
                b"telemetry",
            )
        })
        .collect();
    let expected_safe = (0..args.updates).filter(|index| index % MODES.len() == 0).count();
    let expected_science = (0..args.updates).filter(|index| index % MODES.len() == 2).count();
    publisher.publish(updates).await?;

    let settled = wait_until(SETTLE_TIMEOUT, || {
        let safe = safe_listener.clone();
        let science = science_listener.clone();
        async move { safe.received() == expected_safe && science.received() == expected_science }
    })
    .await;
    info!(
        settled,
        safe = safe_listener.received(),
        science = science_listener.received(),
        "fan-out complete"
    );

    let housekeeping = OperationId::new(parameter_operation().area, 1, 9, 1);
    let operator = safe_endpoint.create_consumer(Uri::new("space/payload"));
    let operator_listener = DemoListener::new("operator");

    operator.send(housekeeping, payload("ping")).await?;
    let ack = operator.submit(housekeeping, MessageBody::Empty).await?;
    info!(stage = %ack.header.stage, "submit acknowledged");
    let response = operator.request(housekeeping, MessageBody::Empty).await?;
    info!(stage = %response.header.stage, body = ?response.body, "request answered");
    let ack = operator
        .invoke(housekeeping, payload("heater on"), operator_listener.clone())
        .await?;
    info!(stage = %ack.header.stage, "invoke acknowledged");
    let ack = operator
        .progress(housekeeping, payload("dump memory"), operator_listener.clone())
        .await?;
    info!(stage = %ack.header.stage, "progress acknowledged");
    tokio::time::sleep(Duration::from_millis(100)).await;

    publisher.deregister().await?;
    broker.shutdown().await;
    for closing in [
        &provider_endpoint,
        &science_endpoint,
        &safe_endpoint,
        &broker_endpoint,
    ] {
        closing.close().await?;
    }

    info!("mal-demo finished");
    Ok(())
}
