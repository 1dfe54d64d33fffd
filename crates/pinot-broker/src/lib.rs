//! Broker discovery for the Pinot client
//!
//! A [`BrokerSelector`] turns a table name into the address of a broker that
//! can serve it. Three strategies are provided:
//!
//! - **Static**: [`SimpleBrokerSelector`] picks from a fixed list
//! - **ZooKeeper**: [`DynamicBrokerSelector`] follows the broker resource
//!   external view through data watches
//! - **Controller**: [`ControllerBasedSelector`] polls the controller's
//!   broker listing API
//!
//! # Example
//!
//! ```ignore
//! use pinot_broker::{BrokerSelector, SimpleBrokerSelector};
//!
//! let selector = SimpleBrokerSelector::new(vec!["localhost:8000".to_string()]);
//! selector.init().await?;
//! let broker = selector.select_broker("baseballStats")?;
//! ```

pub mod controller;
pub mod dynamic;
pub mod external_view;
pub mod refresh;
pub mod selector;
pub mod simple;

pub use controller::{controller_request_url, BrokerDto, ControllerBasedSelector, ControllerResponse};
pub use dynamic::{DynamicBrokerSelector, ExternalViewSource, ViewWatch, WatchEvent, ZookeeperSource};
pub use external_view::ExternalView;
pub use refresh::RefreshHandle;
pub use selector::{extract_table_name, BrokerMap, BrokerSelector, SharedBrokerMap};
pub use simple::SimpleBrokerSelector;
