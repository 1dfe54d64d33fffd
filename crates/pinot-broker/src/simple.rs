use async_trait::async_trait;
use pinot_core::{PinotError, Result};
use rand::seq::SliceRandom;

use crate::selector::BrokerSelector;

const NO_BROKERS: &str = "no pre-configured broker lists set in simpleBrokerSelector";

/// Selects from a fixed broker list, ignoring the table name
#[derive(Debug, Clone)]
pub struct SimpleBrokerSelector {
    broker_list: Vec<String>,
}

impl SimpleBrokerSelector {
    pub fn new(broker_list: Vec<String>) -> Self {
        Self { broker_list }
    }

    pub fn broker_list(&self) -> &[String] {
        &self.broker_list
    }
}

#[async_trait]
impl BrokerSelector for SimpleBrokerSelector {
    async fn init(&self) -> Result<()> {
        if self.broker_list.is_empty() {
            return Err(PinotError::Configuration(NO_BROKERS.to_string()));
        }
        Ok(())
    }

    fn select_broker(&self, _table: &str) -> Result<String> {
        self.broker_list
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| PinotError::Configuration(NO_BROKERS.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_list_fails() {
        let selector = SimpleBrokerSelector::new(Vec::new());
        let init_err = selector.init().await.unwrap_err();
        assert!(matches!(init_err, PinotError::Configuration(_)));
        let select_err = selector.select_broker("").unwrap_err();
        assert!(matches!(select_err, PinotError::Configuration(_)));
        let init_err = init_err.to_string();
        let select_err = select_err.to_string();
        assert_eq!(init_err, select_err);
        assert_eq!(
            selector.select_broker("baseballStats").unwrap_err().to_string(),
            init_err
        );
        assert!(init_err.contains("simpleBrokerSelector"));
    }

    #[tokio::test]
    async fn test_selects_from_list() {
        let brokers = vec!["localhost:8000".to_string(), "localhost:8001".to_string()];
        let selector = SimpleBrokerSelector::new(brokers.clone());
        selector.init().await.unwrap();
        for _ in 0..20 {
            let broker = selector.select_broker("anyTable").unwrap();
            assert!(brokers.contains(&broker));
        }
        selector.close().await;
        assert!(selector.select_broker("").is_ok());
    }
}
