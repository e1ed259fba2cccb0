//! Implements the `Remote` trait with `reqwest` against the ledger server's REST endpoints.

use crate::api::{FetchQuery, MonthBody, MonthResponse, Remote};
use crate::error::TransportError;
use crate::model::{NewTransaction, Period, Transaction, TransactionId};
use crate::Result;
use anyhow::{anyhow, Context};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::trace;
use url::Url;

const TRANSACTIONS: &str = "transactions";

/// Talks to the ledger server over HTTP.
///
/// - `GET {base}/transactions?{query}&month=M&year=Y`
/// - `POST {base}/transactions`
/// - `PATCH {base}/transactions/{id}`
/// - `DELETE {base}/transactions/{id}`
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: Url,
}

impl HttpRemote {
    /// Creates an `HttpRemote` for the server at `base_url`. Every request is abandoned with a
    /// transport error after `timeout`.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Unable to build the HTTP client")?;
        Ok(Self { client, base_url })
    }

    /// `{base}/transactions`, or `{base}/transactions/{id}` when `id` is given.
    fn transactions_url(&self, id: Option<&TransactionId>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("The base URL '{}' cannot have a path", self.base_url))?;
            segments.pop_if_empty().push(TRANSACTIONS);
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        Ok(url)
    }

    fn month_url(&self, query: &FetchQuery, period: Option<Period>) -> Result<Url> {
        let mut url = self.transactions_url(None)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.extend_pairs(query.iter());
            if let Some(period) = period {
                pairs
                    .append_pair("month", &period.month().to_string())
                    .append_pair("year", &period.year().to_string());
            }
        }
        Ok(url)
    }
}

#[async_trait::async_trait]
impl Remote for HttpRemote {
    async fn get_month_data(
        &mut self,
        query: &FetchQuery,
        period: Option<Period>,
    ) -> Result<MonthResponse> {
        let url = self.month_url(query, period)?;
        trace!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(TransportError::from)
            .context("Failed to request month data")?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(MonthResponse::NoContent);
        }
        let body = success(response)
            .await
            .context("Failed to get month data")?
            .json::<MonthBody>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
            .context("Failed to parse month data")?;
        Ok(MonthResponse::Data(body))
    }

    async fn post_transaction(&mut self, transaction: &NewTransaction) -> Result<()> {
        let url = self.transactions_url(None)?;
        trace!("POST {url}");
        let response = self
            .client
            .post(url)
            .json(transaction)
            .send()
            .await
            .map_err(TransportError::from)
            .context("Failed to send the new transaction")?;
        success(response)
            .await
            .context("Failed to create the transaction")?;
        Ok(())
    }

    async fn update_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        let url = self.transactions_url(Some(transaction.id()))?;
        trace!("PATCH {url}");
        let response = self
            .client
            .patch(url)
            .json(transaction)
            .send()
            .await
            .map_err(TransportError::from)
            .with_context(|| format!("Failed to send the update for {}", transaction.id()))?;
        success(response)
            .await
            .with_context(|| format!("Failed to update transaction {}", transaction.id()))?;
        Ok(())
    }

    async fn delete_transaction(&mut self, id: &TransactionId) -> Result<()> {
        let url = self.transactions_url(Some(id))?;
        trace!("DELETE {url}");
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(TransportError::from)
            .with_context(|| format!("Failed to send the delete for {id}"))?;
        success(response)
            .await
            .with_context(|| format!("Failed to delete transaction {id}"))?;
        Ok(())
    }
}

/// Passes a 2xx `response` through and turns anything else into `TransportError::Status`.
async fn success(response: Response) -> std::result::Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response body".to_string());
    Err(TransportError::Status {
        code: status.as_u16(),
        body,
    })
}
