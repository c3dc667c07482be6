//! ABI bindings for the messaging contracts.
//!
//! One module per contract kind (and per historical on-ramp version). Calls are `SolCall`
//! types and events are `SolEvent` types; the rest of the crate only relies on those traits.
//! Struct layouts are positional, so field order here must match the deployed contract exactly.

/// Shared by every contract kind.
pub mod common {
    alloy::sol! {
        function typeAndVersion() external view returns (string);
    }
}

/// Current on-ramp (1.5.0).
pub mod onramp {
    alloy::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct DynamicConfig {
            address router;
            uint16 maxNumberOfTokensPerMsg;
            uint32 destGasOverhead;
            uint16 destGasPerPayloadByte;
            uint32 destDataAvailabilityOverheadGas;
            uint16 destGasPerDataAvailabilityByte;
            uint16 destDataAvailabilityMultiplierBps;
            address priceRegistry;
            uint32 maxDataBytes;
            uint32 maxPerMsgGasLimit;
            uint16 defaultTokenFeeUSDCents;
            uint32 defaultTokenDestGasOverhead;
            uint32 defaultTokenDestBytesOverhead;
            bool enforceOutOfOrder;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct EVMTokenAmount {
            address token;
            uint256 amount;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct EVM2EVMMessage {
            uint64 sourceChainSelector;
            address sender;
            address receiver;
            uint64 sequenceNumber;
            uint256 gasLimit;
            bool strict;
            uint64 nonce;
            address feeToken;
            uint256 feeTokenAmount;
            bytes data;
            EVMTokenAmount[] tokenAmounts;
            bytes[] sourceTokenData;
            bytes32 messageId;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct TokenBucket {
            uint128 tokens;
            uint32 lastUpdated;
            bool isEnabled;
            uint128 capacity;
            uint128 rate;
        }

        #[derive(Debug, PartialEq, Eq)]
        event CCIPSendRequested(EVM2EVMMessage message);

        function getDynamicConfig() external view returns (DynamicConfig);
        function getPoolBySourceToken(uint64 destChainSelector, address sourceToken) external view returns (address);
        function getSupportedTokens(uint64 destChainSelector) external view returns (address[]);
        function currentRateLimiterState() external view returns (TokenBucket);
    }
}

/// On-ramp 1.0.0. Message fields are ordered differently from the current release, so the
/// send event has its own topic.
pub mod onramp_v1_0_0 {
    alloy::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct DynamicConfig {
            address router;
            uint16 maxTokensLength;
            uint32 destGasOverhead;
            uint16 destGasPerPayloadByte;
            address priceRegistry;
            uint32 maxDataSize;
            uint64 maxGasLimit;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct EVMTokenAmount {
            address token;
            uint256 amount;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct EVM2EVMMessage {
            uint64 sourceChainSelector;
            uint64 sequenceNumber;
            uint256 feeTokenAmount;
            address sender;
            uint64 nonce;
            uint256 gasLimit;
            bool strict;
            address receiver;
            bytes data;
            EVMTokenAmount[] tokenAmounts;
            address feeToken;
            bytes32 messageId;
        }

        #[derive(Debug, PartialEq, Eq)]
        event CCIPSendRequested(EVM2EVMMessage message);

        function getDynamicConfig() external view returns (DynamicConfig);
    }
}

/// On-ramp 1.1.0. Dynamic config is laid out as in 1.0.0.
pub mod onramp_v1_1_0 {
    alloy::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct DynamicConfig {
            address router;
            uint16 maxTokensLength;
            uint32 destGasOverhead;
            uint16 destGasPerPayloadByte;
            address priceRegistry;
            uint32 maxDataSize;
            uint64 maxGasLimit;
        }

        function getDynamicConfig() external view returns (DynamicConfig);
    }
}

pub mod offramp {
    alloy::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct TokenBucket {
            uint128 tokens;
            uint32 lastUpdated;
            bool isEnabled;
            uint128 capacity;
            uint128 rate;
        }

        #[derive(Debug, PartialEq, Eq)]
        event ExecutionStateChanged(uint64 indexed sequenceNumber, bytes32 indexed messageId, uint8 state, bytes returnData);

        function getSupportedTokens() external view returns (address[]);
        function getDestinationToken(address sourceToken) external view returns (address);
        function currentRateLimiterState() external view returns (TokenBucket);
        function getSenderNonce(address sender) external view returns (uint64);
        function getExecutionState(uint64 sequenceNumber) external view returns (uint8);
    }
}

pub mod commit_store {
    alloy::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct TokenPriceUpdate {
            address sourceToken;
            uint224 usdPerToken;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct GasPriceUpdate {
            uint64 destChainSelector;
            uint224 usdPerUnitGas;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct PriceUpdates {
            TokenPriceUpdate[] tokenPriceUpdates;
            GasPriceUpdate[] gasPriceUpdates;
        }

        /// Inclusive sequence number range covered by a merkle root.
        #[derive(Debug, PartialEq, Eq)]
        struct Interval {
            uint64 min;
            uint64 max;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct CommitReport {
            PriceUpdates priceUpdates;
            Interval interval;
            bytes32 merkleRoot;
        }

        #[derive(Debug, PartialEq, Eq)]
        event ReportAccepted(CommitReport report);

        function getExpectedNextSequenceNumber() external view returns (uint64);
        function paused() external view returns (bool);
        function isBlessed(bytes32 root) external view returns (bool);
        function isUnpausedAndARMHealthy() external view returns (bool);
    }
}

pub mod price_registry {
    alloy::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct TimestampedPackedUint224 {
            uint224 value;
            uint32 timestamp;
        }

        #[derive(Debug, PartialEq, Eq)]
        event UsdPerTokenUpdated(address indexed token, uint256 value, uint256 timestamp);

        #[derive(Debug, PartialEq, Eq)]
        event UsdPerUnitGasUpdated(uint64 indexed destChain, uint256 value, uint256 timestamp);

        function getTokenPrices(address[] tokens) external view returns (TimestampedPackedUint224[]);
        function getFeeTokens() external view returns (address[]);
    }
}
