pub use crate::{
    execution_engine::{ExecutionEngine, MockExecutionEngine, NullExecutionEngine},
    types::{
        BlobsBundleV1, EngineGetPayloadV1Response, EngineGetPayloadV2Response,
        EngineGetPayloadV3Response, EngineGetPayloadV4Response, Error, ExecutionPayloadBodyV1,
        ExecutionPayloadV1, ExecutionPayloadV2, ExecutionPayloadV3, ForkChoiceStateV1,
        ForkChoiceUpdatedResponse, PayloadAttributes, PayloadAttributesV1, PayloadAttributesV2,
        PayloadAttributesV3, PayloadId, PayloadStatusV1, PayloadValidationStatus,
        TransitionConfigurationV1, WithdrawalV1,
    },
};

mod execution_engine;
mod types;
