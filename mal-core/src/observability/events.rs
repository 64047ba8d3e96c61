//! Canonical structured event names used across `mal-core`.

// Consumer-side transaction events.
pub const TRANSACTION_OPEN: &str = "transaction_open";
pub const TRANSACTION_CLOSED: &str = "transaction_closed";
pub const TRANSACTION_UNKNOWN: &str = "transaction_unknown";
pub const TRANSACTION_SEND_FAILED: &str = "transaction_send_failed";
pub const TRANSACTION_TIMED_OUT: &str = "transaction_timed_out";
pub const TRANSACTION_FORCED_ERROR: &str = "transaction_forced_error";
pub const STAGE_UNEXPECTED_TRANSITION: &str = "stage_unexpected_transition";
pub const STAGE_IGNORED_AFTER_TERMINAL: &str = "stage_ignored_after_terminal";
pub const RESPONSE_ALREADY_SIGNALED: &str = "response_already_signaled";
pub const CONSUMER_CLOSED: &str = "consumer_closed";
pub const NOTIFY_RECEIVED: &str = "notify_received";
pub const NOTIFY_UNROUTED: &str = "notify_unrouted";
pub const PUBLISH_ERROR_UNROUTED: &str = "publish_error_unrouted";

// Provider-side events.
pub const PROVIDER_DISPATCH: &str = "provider_dispatch";
pub const PROVIDER_HANDLER_FAILED: &str = "provider_handler_failed";
pub const PROVIDER_REJECT_STAGE: &str = "provider_reject_stage";
pub const PROVIDER_REPLY_FAILED: &str = "provider_reply_failed";

// Inbound routing events.
pub const INBOUND_RECEIVE: &str = "inbound_receive";
pub const INBOUND_INCONSISTENT_STAGE: &str = "inbound_inconsistent_stage";
pub const INBOUND_ROLE_NOT_ATTACHED: &str = "inbound_role_not_attached";
pub const INBOUND_TRANSPORT_ERROR: &str = "inbound_transport_error";

// Broker events.
pub const BROKER_STARTED: &str = "broker_started";
pub const BROKER_REGISTER_OK: &str = "broker_register_ok";
pub const BROKER_REGISTER_REJECTED: &str = "broker_register_rejected";
pub const BROKER_DEREGISTER_OK: &str = "broker_deregister_ok";
pub const BROKER_PUBLISH_REGISTER_OK: &str = "broker_publish_register_ok";
pub const BROKER_PUBLISH_REGISTER_REJECTED: &str = "broker_publish_register_rejected";
pub const BROKER_PUBLISH_DEREGISTER_OK: &str = "broker_publish_deregister_ok";
pub const BROKER_PUBLISH_REJECTED: &str = "broker_publish_rejected";
pub const BROKER_FANOUT_SUMMARY: &str = "broker_fanout_summary";
pub const BROKER_CONSUMER_LOST: &str = "broker_consumer_lost";
pub const BROKER_EGRESS_ENQUEUE_FAILED: &str = "broker_egress_enqueue_failed";
pub const BROKER_REPLY_FAILED: &str = "broker_reply_failed";
pub const BROKER_UNEXPECTED_STAGE: &str = "broker_unexpected_stage";
pub const BROKER_SHUTDOWN: &str = "broker_shutdown";

// Egress worker events.
pub const EGRESS_SEND_ATTEMPT: &str = "egress_send_attempt";
pub const EGRESS_SEND_OK: &str = "egress_send_ok";
pub const EGRESS_SEND_FAILED: &str = "egress_send_failed";
pub const EGRESS_RECV_CLOSED: &str = "egress_recv_closed";
pub const EGRESS_WORKER_CREATE: &str = "egress_worker_create";

// Runtime events.
pub const RUNTIME_SPAWN_START: &str = "runtime_spawn_start";
pub const RUNTIME_SPAWN_OK: &str = "runtime_spawn_ok";
