//! Query transports for the Pinot client
//!
//! A [`ClientTransport`] sends one [`pinot_core::Request`] to one broker:
//!
//! - [`JsonHttpTransport`]: `POST /query/sql` with a JSON body
//! - [`GrpcTransport`]: `PinotQueryBroker/Submit` server streaming, with JSON
//!   or Arrow row blocks and per-block compression
//!
//! [`decompress`] is exposed for tools that inspect raw response blocks.

pub mod compression;
pub mod grpc;
pub mod http;
pub mod tls;
pub mod transport;

pub use compression::decompress;
pub use grpc::codec::BlockDecoder;
pub use grpc::GrpcTransport;
pub use http::JsonHttpTransport;
pub use transport::ClientTransport;
