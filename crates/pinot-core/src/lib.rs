//! Core types for the Pinot query client
//!
//! - [`value`]: result cells with text-preserving numbers
//! - [`response`]: broker response shapes and result table accessors
//! - [`request`]: a single query request and its query options
//! - [`config`]: client, ZooKeeper, controller and gRPC configuration
//! - [`error`]: the error type shared by every client crate

pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod value;

pub use config::{ClientConfig, ControllerConfig, GrpcConfig, GrpcTlsConfig, ZookeeperConfig};
pub use error::{PinotError, Result};
pub use request::{QueryFormat, Request};
pub use response::{
    AggregationResult, BrokerResponse, Exception, GroupValue, RespSchema, ResultTable,
    SelectionResults,
};
pub use value::{decode_json, Number, Value};
