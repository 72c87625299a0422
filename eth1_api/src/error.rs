use execution_engine::TransitionConfigurationV1;
use serde_json::Value;
use thiserror::Error;
use types::{
    nonstandard::Phase,
    phase0::primitives::{ExecutionBlockHash, H256},
};

// Codes defined by JSON-RPC 2.0 and the Engine API.
// See <https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/common.md#errors>.
const PARSE_ERROR_CODE: i64 = -32700;
const INVALID_REQUEST_CODE: i64 = -32600;
const METHOD_NOT_FOUND_CODE: i64 = -32601;
const INVALID_PARAMS_CODE: i64 = -32602;
const INTERNAL_ERROR_CODE: i64 = -32603;
const SERVER_ERROR_CODE: i64 = -32000;
const UNKNOWN_PAYLOAD_CODE: i64 = -38001;
const INVALID_FORKCHOICE_STATE_CODE: i64 = -38002;
const INVALID_PAYLOAD_ATTRIBUTES_CODE: i64 = -38003;
const TOO_LARGE_REQUEST_CODE: i64 = -38004;

// Returned by Infura and some other providers when `eth_getLogs` matches too many logs.
const LIMIT_EXCEEDED_CODE: i64 = -32005;

const LOG_QUERY_METHOD: &str = "eth_getLogs";

// Providers that reuse generic codes only signal oversized log queries in the message.
const LOG_QUERY_TOO_LARGE_MESSAGES: &[&str] = &[
    "query returned more than",
    "response size exceeded",
    "exceed maximum block range",
];

/// Failures of execution client requests.
///
/// Transport errors and protocol error codes are passed to callers unchanged.
/// Payload status errors let callers tell apart a rejected payload from one not yet validated.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("request to execution client timed out")]
    Timeout,
    #[error("unable to reach execution client: {message}")]
    Connection { message: String },
    #[error(
        "execution client rejected request with HTTP status {status}; \
         check that both clients use the same JWT secret"
    )]
    Unauthorized { status: u16 },
    #[error("unable to sign request to execution client: {message}")]
    Authentication { message: String },
    #[error("execution client responded with malformed data: {message}")]
    InvalidResponse { message: String },

    #[error("execution client could not parse request: {message}")]
    ParseError { message: String },
    #[error("execution client received invalid request: {message}")]
    InvalidRequest { message: String },
    #[error("execution client does not support method: {message}")]
    MethodNotFound { message: String },
    #[error("execution client received invalid parameters: {message}")]
    InvalidParams { message: String },
    #[error("execution client internal error: {message}")]
    Internal { message: String },
    #[error("execution client does not know requested payload: {message}")]
    UnknownPayload { message: String },
    #[error("execution client received invalid fork choice state: {message}")]
    InvalidForkchoiceState { message: String },
    #[error("execution client received invalid payload attributes: {message}")]
    InvalidPayloadAttributes { message: String },
    #[error("request to execution client was too large: {message}")]
    RequestTooLarge { message: String },
    #[error("execution client server error: {message} (data: {data:?})")]
    ServerError {
        message: String,
        data: Option<String>,
    },
    #[error("execution client returned error code {code}: {message}")]
    UnknownCode { code: i64, message: String },

    #[error("payload is invalid (latest valid hash: {latest_valid_hash:?})")]
    InvalidPayloadStatus {
        latest_valid_hash: Option<ExecutionBlockHash>,
    },
    #[error("payload has invalid block hash")]
    InvalidBlockHashPayloadStatus,
    #[error("payload has not been validated because execution client is syncing")]
    AcceptedSyncingPayloadStatus,
    #[error("execution client returned unknown payload status")]
    UnknownPayloadStatus,
    #[error("execution client returned no payload status")]
    NilPayloadStatus,

    #[error("log query matched too many logs")]
    LogQueryTooLarge,

    #[error(
        "reconstructed payload has block hash {actual:?} \
         but execution client returned block {expected:?}"
    )]
    BlockHashMismatch {
        expected: ExecutionBlockHash,
        actual: ExecutionBlockHash,
    },
    #[error("payload reconstructed for block {block_hash:?} does not match its header")]
    ReconstructedPayloadMismatch { block_hash: ExecutionBlockHash },
    #[error("block is already full")]
    AlreadyFull,
    #[error("blinded block has zero execution block hash")]
    ZeroBlockHash,
    #[error("execution client does not have block {block_hash:?}")]
    MissingExecutionBlock { block_hash: ExecutionBlockHash },
    #[error("execution client does not have transaction {transaction_hash:?}")]
    MissingTransaction { transaction_hash: H256 },
    #[error("{method} is not supported in {phase}")]
    UnsupportedPhase { method: &'static str, phase: Phase },

    #[error(
        "transition configuration differs \
         (local: {local:?}, execution client: {remote:?})"
    )]
    ConfigurationMismatch {
        local: TransitionConfigurationV1,
        remote: TransitionConfigurationV1,
    },
}

impl Error {
    /// Classifies a JSON-RPC error object returned for a request to `method`.
    #[must_use]
    pub fn from_rpc(method: &str, code: i64, message: String, data: Option<&Value>) -> Self {
        if method == LOG_QUERY_METHOD && is_log_query_too_large(code, &message) {
            return Self::LogQueryTooLarge;
        }

        match code {
            PARSE_ERROR_CODE => Self::ParseError { message },
            INVALID_REQUEST_CODE => Self::InvalidRequest { message },
            METHOD_NOT_FOUND_CODE => Self::MethodNotFound { message },
            INVALID_PARAMS_CODE => Self::InvalidParams { message },
            INTERNAL_ERROR_CODE => Self::Internal { message },
            UNKNOWN_PAYLOAD_CODE => Self::UnknownPayload { message },
            INVALID_FORKCHOICE_STATE_CODE => Self::InvalidForkchoiceState { message },
            INVALID_PAYLOAD_ATTRIBUTES_CODE => Self::InvalidPayloadAttributes { message },
            TOO_LARGE_REQUEST_CODE => Self::RequestTooLarge { message },
            SERVER_ERROR_CODE => Self::ServerError {
                message,
                data: data.map(ToString::to_string),
            },
            _ => Self::UnknownCode { code, message },
        }
    }

    /// Whether repeating the same request later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Connection { .. } | Self::AcceptedSyncingPayloadStatus,
        )
    }
}

fn is_log_query_too_large(code: i64, message: &str) -> bool {
    let lowercase = message.to_lowercase();

    code == LIMIT_EXCEEDED_CODE
        || LOG_QUERY_TOO_LARGE_MESSAGES
            .iter()
            .any(|pattern| lowercase.contains(pattern))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    #[test_case(-32700 => matches Error::ParseError { .. })]
    #[test_case(-32600 => matches Error::InvalidRequest { .. })]
    #[test_case(-32601 => matches Error::MethodNotFound { .. })]
    #[test_case(-32602 => matches Error::InvalidParams { .. })]
    #[test_case(-32603 => matches Error::Internal { .. })]
    #[test_case(-38001 => matches Error::UnknownPayload { .. })]
    #[test_case(-38002 => matches Error::InvalidForkchoiceState { .. })]
    #[test_case(-38003 => matches Error::InvalidPayloadAttributes { .. })]
    #[test_case(-38004 => matches Error::RequestTooLarge { .. })]
    #[test_case(-32005 => Error::UnknownCode { code: -32005, message: "failure".to_owned() })]
    #[test_case(-1 => Error::UnknownCode { code: -1, message: "failure".to_owned() })]
    fn from_rpc_maps_codes(code: i64) -> Error {
        Error::from_rpc("engine_newPayloadV3", code, "failure".to_owned(), None)
    }

    #[test]
    fn server_error_keeps_data() {
        let data = json!({"err": "nonce too low"});

        assert_eq!(
            Error::from_rpc("eth_call", -32000, "failure".to_owned(), Some(&data)),
            Error::ServerError {
                message: "failure".to_owned(),
                data: Some(r#"{"err":"nonce too low"}"#.to_owned()),
            },
        );
    }

    #[test_case("query returned more than 10000 results")]
    #[test_case("Query Returned More Than 20000 results")]
    #[test_case("exceed maximum block range: 5000")]
    fn oversized_log_queries_are_recognized_by_message(message: &str) {
        assert_eq!(
            Error::from_rpc("eth_getLogs", -32000, message.to_owned(), None),
            Error::LogQueryTooLarge,
        );
    }

    #[test]
    fn limit_exceeded_code_means_oversized_log_query() {
        assert_eq!(
            Error::from_rpc("eth_getLogs", -32005, "limit exceeded".to_owned(), None),
            Error::LogQueryTooLarge,
        );
    }

    #[test]
    fn log_query_messages_are_ignored_for_other_methods() {
        assert_eq!(
            Error::from_rpc("engine_getPayloadV3", -32000, "response size exceeded".to_owned(), None),
            Error::ServerError {
                message: "response size exceeded".to_owned(),
                data: None,
            },
        );
    }
}
