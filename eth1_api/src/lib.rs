pub use crate::{
    auth::{Auth, Options as AuthOptions},
    deposit_event::{DepositEvent, Log},
    error::Error,
    eth1_api::Eth1Api,
    eth1_block::{ExecutionBlock, HeaderInfo},
    health::{ServiceError, ServiceErrorKind, ServiceHealth},
    reconstruct::{
        payload_body_source, BulkPayloadBodies, PayloadBodySource, PerHashPayloadBodies,
        RetrievedBody,
    },
    tasks::{check_transition_configuration, spawn_transition_configuration_task},
    transport::{HttpTransport, Transport},
};

mod auth;
mod deposit_event;
mod error;
mod eth1_api;
mod eth1_block;
mod health;
mod reconstruct;
mod tasks;
mod transport;
