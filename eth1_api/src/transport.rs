use core::time::Duration;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{auth::Auth, error::Error};

const JSONRPC_VERSION: &str = "2.0";
const STATIC_ID: u64 = 1;

// Some proxies in front of execution clients turn authentication failures into generic errors.
// The status line is the only trace left of the original response.
const UNAUTHORIZED_MARKERS: &[&str] = &["401 Unauthorized", "403 Forbidden"];

/// JSON-RPC connection to an execution client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: &'static str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, Error>;

    /// Sends one JSON-RPC batch with a request per element of `params`.
    ///
    /// The outer error means the whole batch failed.
    /// Errors of individual requests are returned in the corresponding positions.
    async fn batch_request(
        &self,
        method: &'static str,
        params: Vec<Value>,
        timeout: Duration,
    ) -> Result<Vec<Result<Value, Error>>, Error>;
}

#[derive(Serialize)]
struct JsonRequestBody<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct JsonResponseBody {
    #[serde(default)]
    error: Option<JsonError>,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    id: Option<u64>,
}

impl JsonResponseBody {
    fn into_result(self, method: &str) -> Result<Value, Error> {
        match self.error {
            Some(JsonError {
                code,
                message,
                data,
            }) => Err(Error::from_rpc(method, code, message, data.as_ref())),
            None => Ok(self.result),
        }
    }
}

pub struct HttpTransport {
    client: Client,
    url: Url,
    auth: Arc<Auth>,
}

impl HttpTransport {
    #[must_use]
    pub const fn new(client: Client, url: Url, auth: Arc<Auth>) -> Self {
        Self { client, url, auth }
    }

    fn post(&self, timeout: Duration) -> Result<RequestBuilder, Error> {
        let mut builder = self
            .client
            .post(self.url.clone())
            .timeout(timeout)
            .header(CONTENT_TYPE, "application/json");

        let headers = self
            .auth
            .headers()
            .map_err(|error| Error::Authentication {
                message: error.to_string(),
            })?;

        if let Some(headers) = headers {
            builder = builder.headers(headers);
        }

        Ok(builder)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: &'static str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, Error> {
        features::log!(LogEngineRequests, "sending {method} request: {params}");

        let body = JsonRequestBody {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id: STATIC_ID,
        };

        let response = self
            .post(timeout)?
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(classify)?
            .json::<JsonResponseBody>()
            .await
            .map_err(classify)?;

        let result = response.into_result(method);

        features::log!(LogEngineRequests, "received {method} response: {result:?}");

        result
    }

    async fn batch_request(
        &self,
        method: &'static str,
        params: Vec<Value>,
        timeout: Duration,
    ) -> Result<Vec<Result<Value, Error>>, Error> {
        if params.is_empty() {
            return Ok(vec![]);
        }

        let count = params.len();

        features::log!(LogEngineRequests, "sending batch of {count} {method} requests");

        let bodies = params
            .into_iter()
            .zip(0..)
            .map(|(params, id)| JsonRequestBody {
                jsonrpc: JSONRPC_VERSION,
                method,
                params,
                id,
            })
            .collect::<Vec<_>>();

        let responses = self
            .post(timeout)?
            .json(&bodies)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(classify)?
            .json::<Vec<JsonResponseBody>>()
            .await
            .map_err(classify)?;

        // Responses to a batch may arrive in any order.
        let mut results = (0..count).map(|_| None).collect::<Vec<_>>();

        for response in responses {
            let slot = response
                .id
                .and_then(|id| usize::try_from(id).ok())
                .and_then(|id| results.get_mut(id))
                .ok_or_else(|| Error::InvalidResponse {
                    message: format!("batch response has unexpected id {:?}", response.id),
                })?;

            *slot = Some(response.into_result(method));
        }

        results
            .into_iter()
            .enumerate()
            .map(|(id, result)| {
                result.ok_or_else(|| Error::InvalidResponse {
                    message: format!("batch response is missing id {id}"),
                })
            })
            .collect()
    }
}

fn classify(error: reqwest::Error) -> Error {
    if let Some(status) = error.status() {
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Error::Unauthorized {
                status: status.as_u16(),
            };
        }
    }

    if error.is_timeout() {
        return Error::Timeout;
    }

    let message = error.to_string();

    if let Some(error) = unauthorized_from_message(&message) {
        return error;
    }

    if error.is_decode() {
        return Error::InvalidResponse { message };
    }

    Error::Connection { message }
}

fn unauthorized_from_message(message: &str) -> Option<Error> {
    UNAUTHORIZED_MARKERS
        .iter()
        .find(|marker| message.contains(*marker))
        .map(|marker| {
            let status = if marker.starts_with("401") { 401 } else { 403 };
            Error::Unauthorized { status }
        })
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use httpmock::{Method, MockServer};
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn transport(server: &MockServer) -> Result<HttpTransport> {
        Ok(HttpTransport::new(
            Client::new(),
            server.url("/").parse()?,
            Arc::default(),
        ))
    }

    #[test_case(401)]
    #[test_case(403)]
    #[tokio::test]
    async fn authentication_failures_are_distinct(status: u16) -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::POST).path("/");
            then.status(status).body("{}");
        });

        let error = transport(&server)?
            .request("eth_blockNumber", json!([]), TIMEOUT)
            .await
            .expect_err("request should fail");

        assert_eq!(error, Error::Unauthorized { status });

        Ok(())
    }

    #[tokio::test]
    async fn server_errors_are_connection_errors() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::POST).path("/");
            then.status(500).body("{}");
        });

        let error = transport(&server)?
            .request("eth_blockNumber", json!([]), TIMEOUT)
            .await
            .expect_err("request should fail");

        assert!(matches!(error, Error::Connection { .. }));
        assert!(error.is_retryable());

        Ok(())
    }

    #[tokio::test]
    async fn json_rpc_errors_are_classified() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::POST).path("/");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -38001, "message": "Unknown payload"},
            }));
        });

        let error = transport(&server)?
            .request("engine_getPayloadV1", json!(["0x0000000000000001"]), TIMEOUT)
            .await
            .expect_err("request should fail");

        assert_eq!(
            error,
            Error::UnknownPayload {
                message: "Unknown payload".to_owned(),
            },
        );

        Ok(())
    }

    #[tokio::test]
    async fn batch_results_follow_request_order() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::POST).path("/");
            then.status(200).json_body(json!([
                {"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "not found"}},
                {"jsonrpc": "2.0", "id": 0, "result": "0x01"},
            ]));
        });

        let results = transport(&server)?
            .batch_request(
                "eth_getRawTransactionByHash",
                vec![json!(["0x01"]), json!(["0x02"])],
                TIMEOUT,
            )
            .await?;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0], Ok(json!("0x01")));
        assert!(matches!(results[1], Err(Error::ServerError { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn batch_fails_as_a_whole_when_transport_fails() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::POST).path("/");
            then.status(502);
        });

        transport(&server)?
            .batch_request("eth_getBlockByHash", vec![json!([])], TIMEOUT)
            .await
            .expect_err("batch should fail");

        Ok(())
    }

    #[test_case("HTTP status client error (401 Unauthorized) for url" => Some(Error::Unauthorized { status: 401 }))]
    #[test_case("upstream said 403 Forbidden" => Some(Error::Unauthorized { status: 403 }))]
    #[test_case("connection refused" => None)]
    fn unauthorized_is_recognized_in_messages(message: &str) -> Option<Error> {
        unauthorized_from_message(message)
    }
}
