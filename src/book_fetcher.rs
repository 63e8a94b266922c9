//! Book fetcher (§4.4): parallel per-contract order book retrieval, the
//! engine's one genuine concurrency need, expressed as bounded fan-out + join.

use std::collections::HashMap;

use futures::future::join_all;
use tracing::warn;

use crate::domain::{Contract, MarketBook};
use crate::port::ExchangeClient;

/// Fetches one book per contract concurrently; a contract whose fetch fails
/// is dropped from the result (logged, not propagated) so the rest of the
/// batch still returns.
pub async fn fetch_books(exchange: &dyn ExchangeClient, contracts: &[Contract]) -> HashMap<String, MarketBook> {
    let fetches = contracts.iter().map(|contract| async move {
        let result = exchange.get_orderbook(&contract.ticker).await;
        (contract, result)
    });

    let results = join_all(fetches).await;

    let mut books = HashMap::with_capacity(results.len());
    for (contract, result) in results {
        match result {
            Ok(book) => {
                books.insert(contract.ticker.clone(), MarketBook::from_book(&book, contract.seconds_until_close));
            }
            Err(err) => {
                warn!(ticker = %contract.ticker, error = %err, "order book fetch failed, dropping contract for this cycle");
            }
        }
    }
    books
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Book;
    use crate::error::{Error, Result};
    use crate::port::exchange::ExchangeOrderAck;
    use crate::port::{CancelOutcome, ExchangeMarket, NewOrder};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap as StdHashMap;

    struct StubExchange {
        books: StdHashMap<String, Book>,
    }

    #[async_trait]
    impl ExchangeClient for StubExchange {
        async fn list_markets(&self, _series_ticker: &str, _status: &str, _limit: u32) -> Result<Vec<ExchangeMarket>> {
            unimplemented!()
        }

        async fn get_orderbook(&self, ticker: &str) -> Result<Book> {
            self.books
                .get(ticker)
                .cloned()
                .ok_or_else(|| Error::TransientIo(format!("no book for {ticker}")))
        }

        async fn place_order(&self, _order: &NewOrder) -> Result<ExchangeOrderAck> {
            unimplemented!()
        }

        async fn cancel_order(&self, _exchange_order_id: &str) -> Result<CancelOutcome> {
            unimplemented!()
        }
    }

    fn contract(ticker: &str) -> Contract {
        let now = Utc::now();
        Contract::new(ticker, "BTC", now + chrono::Duration::seconds(10_000), now)
    }

    #[tokio::test]
    async fn fetches_all_contracts_that_succeed() {
        let mut books = StdHashMap::new();
        books.insert(
            "BTC-1".to_string(),
            Book {
                yes_bids: vec![(48, 50)],
                no_bids: vec![(49, 60)],
            },
        );
        let exchange = StubExchange { books };

        let contracts = vec![contract("BTC-1"), contract("BTC-2")];
        let result = fetch_books(&exchange, &contracts).await;

        assert_eq!(result.len(), 1);
        assert!(result.contains_key("BTC-1"));
        assert!(!result.contains_key("BTC-2"));
    }

    #[tokio::test]
    async fn a_failed_fetch_does_not_block_the_rest_of_the_batch() {
        let mut books = StdHashMap::new();
        books.insert("BTC-1".to_string(), Book::default());
        books.insert("BTC-3".to_string(), Book::default());
        let exchange = StubExchange { books };

        let contracts = vec![contract("BTC-1"), contract("BTC-2"), contract("BTC-3")];
        let result = fetch_books(&exchange, &contracts).await;

        assert_eq!(result.len(), 2);
    }
}
