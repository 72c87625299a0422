use core::time::Duration;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::time::{interval, MissedTickBehavior};

use crate::{
    error::Error,
    eth1_api::Eth1Api,
    health::{ServiceErrorKind, ServiceHealth},
};

const TRANSITION_CONFIGURATION_CHECK_INTERVAL: Duration = Duration::from_secs(60);

pub fn spawn_transition_configuration_task(eth1_api: Arc<Eth1Api>, health: Arc<ServiceHealth>) {
    tokio::spawn(async move {
        let mut ticks = interval(TRANSITION_CONFIGURATION_CHECK_INTERVAL);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticks.tick().await;
            check_transition_configuration(&eth1_api, &health).await;
        }
    });
}

/// Compares transition configuration with the execution client and records the outcome in `health`.
///
/// Only a mismatch sets the service error.
/// Other failures are logged and leave `health` unchanged.
pub async fn check_transition_configuration(eth1_api: &Eth1Api, health: &ServiceHealth) {
    let Err(error) = eth1_api.exchange_transition_configuration().await else {
        if health.has_error(ServiceErrorKind::ConfigurationMismatch) {
            info!("transition configuration of execution client matches again");
        }

        health.clear_error(ServiceErrorKind::ConfigurationMismatch);
        return;
    };

    match error.downcast_ref() {
        Some(Error::ConfigurationMismatch { .. }) => {
            error!("{error}");
            health.set_error(ServiceErrorKind::ConfigurationMismatch, error.to_string());
        }
        Some(Error::MethodNotFound { .. }) => {
            error!(
                "execution client does not support engine_exchangeTransitionConfigurationV1; \
                 the Engine API URL probably points to the wrong port: {error}",
            );
        }
        _ => warn!("unable to check transition configuration: {error:?}"),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use httpmock::{Method, MockServer};
    use log::Level;
    use reqwest::Client;
    use serde_json::{json, Value};
    use types::config::Config;

    use crate::transport::HttpTransport;

    use super::*;

    fn eth1_api(server: &MockServer) -> Result<Eth1Api> {
        let transport = HttpTransport::new(Client::new(), server.url("/").parse()?, Arc::default());

        Ok(Eth1Api::new(
            Arc::new(Config::mainnet()),
            Arc::new(transport),
            None,
        ))
    }

    fn respond_with(server: &MockServer, response: Value) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(Method::POST).path("/");
            then.status(200).json_body(response);
        })
    }

    fn transition_configuration(terminal_total_difficulty: &str) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "terminalTotalDifficulty": terminal_total_difficulty,
                "terminalBlockHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
                "terminalBlockNumber": "0x0",
            },
        })
    }

    // 58750000000000000000000 in hexadecimal.
    const MAINNET_TERMINAL_TOTAL_DIFFICULTY: &str = "0xc70d808a128d7380000";

    #[tokio::test]
    async fn mismatch_is_sticky_until_next_successful_check() -> Result<()> {
        let server = MockServer::start();
        let eth1_api = eth1_api(&server)?;
        let health = ServiceHealth::default();

        let mut mock = respond_with(&server, transition_configuration("0x1"));

        check_transition_configuration(&eth1_api, &health).await;

        assert_eq!(
            health.error().map(|error| error.kind),
            Some(ServiceErrorKind::ConfigurationMismatch),
        );

        mock.delete();
        mock = respond_with(&server, json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32603, "message": "busy"}}));

        check_transition_configuration(&eth1_api, &health).await;

        assert_eq!(
            health.error().map(|error| error.kind),
            Some(ServiceErrorKind::ConfigurationMismatch),
        );

        mock.delete();
        respond_with(&server, transition_configuration(MAINNET_TERMINAL_TOTAL_DIFFICULTY));

        check_transition_configuration(&eth1_api, &health).await;

        assert_eq!(health.error(), None);

        Ok(())
    }

    #[tokio::test]
    async fn successful_check_leaves_unrelated_errors() -> Result<()> {
        let server = MockServer::start();
        let eth1_api = eth1_api(&server)?;
        let health = ServiceHealth::default();

        health.set_error(ServiceErrorKind::DepositSynchronization, "deposit gap");

        respond_with(&server, transition_configuration(MAINNET_TERMINAL_TOTAL_DIFFICULTY));

        check_transition_configuration(&eth1_api, &health).await;

        assert_eq!(
            health.error().map(|error| error.kind),
            Some(ServiceErrorKind::DepositSynchronization),
        );

        Ok(())
    }

    #[tokio::test]
    async fn resolved_mismatch_leaves_earlier_deposit_error() -> Result<()> {
        let server = MockServer::start();
        let eth1_api = eth1_api(&server)?;
        let health = ServiceHealth::default();

        health.set_error(ServiceErrorKind::DepositSynchronization, "deposit gap");

        let mut mock = respond_with(&server, transition_configuration("0x1"));

        check_transition_configuration(&eth1_api, &health).await;

        assert!(health.has_error(ServiceErrorKind::ConfigurationMismatch));

        mock.delete();
        respond_with(&server, transition_configuration(MAINNET_TERMINAL_TOTAL_DIFFICULTY));

        check_transition_configuration(&eth1_api, &health).await;

        assert_eq!(
            health.error().map(|error| error.kind),
            Some(ServiceErrorKind::DepositSynchronization),
        );

        Ok(())
    }

    #[tokio::test]
    async fn missing_method_suggests_wrong_port() -> Result<()> {
        testing_logger::setup();

        let server = MockServer::start();
        let eth1_api = eth1_api(&server)?;
        let health = ServiceHealth::default();

        respond_with(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32601, "message": "the method does not exist"},
            }),
        );

        check_transition_configuration(&eth1_api, &health).await;

        assert_eq!(health.error(), None);

        testing_logger::validate(|captured_logs| {
            assert!(captured_logs.iter().any(|log| {
                log.level == Level::Error && log.body.contains("probably points to the wrong port")
            }));
        });

        Ok(())
    }
}
