//! Apache Pinot query client
//!
//! A [`Connection`] pairs a broker selector with a query transport. Build one
//! from a broker list, ZooKeeper, the controller or a [`ClientConfig`]:
//!
//! ```ignore
//! use pinot_client::Connection;
//!
//! let conn = Connection::from_broker_list(vec!["localhost:8000".to_string()]).await?;
//! let resp = conn
//!     .execute_sql("baseballStats", "select count(*) from baseballStats")
//!     .await?;
//! if let Some(table) = &resp.result_table {
//!     println!("count = {}", table.get_long(0, 0));
//! }
//!
//! let stmt = conn.prepare("baseballStats", "select * from baseballStats where teamID = ?")?;
//! stmt.set_string(1, "OAK")?;
//! let resp = stmt.execute().await?;
//! ```

pub mod connection;
pub mod factory;
pub mod format;
pub mod prepared;

pub use connection::Connection;
pub use format::{format_query, Param};
pub use prepared::PreparedStatement;

pub use pinot_broker::BrokerSelector;
pub use pinot_core::{
    BrokerResponse, ClientConfig, ControllerConfig, GrpcConfig, GrpcTlsConfig, PinotError,
    Result, ResultTable, Value, ZookeeperConfig,
};
pub use pinot_transport::ClientTransport;
