//! Thin `PostgREST` client: table selects, remote procedure calls, and
//! inserts.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::{StoreConfig, StoreError, retry};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Filter, projection, and ordering of a table select.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    select: String,
    filters: Vec<(String, String)>,
    order: Option<String>,
}

impl Query {
    /// Starts a query projecting the given comma-separated columns.
    #[must_use]
    pub fn select(columns: &str) -> Self {
        Self {
            select: columns.to_string(),
            ..Self::default()
        }
    }

    /// Adds a `column = value` filter.
    #[must_use]
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Adds a `column IN (values)` filter. Values are quoted, so they may
    /// contain commas.
    #[must_use]
    pub fn in_list<S: AsRef<str>>(mut self, column: &str, values: &[S]) -> Self {
        let quoted = values
            .iter()
            .map(|v| format!("\"{}\"", v.as_ref().replace('\\', "\\\\").replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(",");
        self.filters.push((column.to_string(), format!("in.({quoted})")));
        self
    }

    /// Orders by `column`.
    #[must_use]
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order = Some(format!("{column}.{direction}"));
        self
    }

    /// URL query parameters for this query.
    #[must_use]
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.clone())];
        params.extend(self.filters.iter().cloned());
        if let Some(order) = &self.order {
            params.push(("order".to_string(), order.clone()));
        }
        params
    }
}

/// Authenticated HTTP access to one `PostgREST` endpoint.
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl PostgrestClient {
    /// Creates a client for the configured store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{function}", self.base_url)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    /// Selects rows from a table or view.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the request fails or the rows do not match
    /// `T`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Vec<T>, StoreError> {
        let url = self.table_url(table);
        let params = query.params();
        log::debug!("select {table} {params:?}");
        let body = retry::send_json(|| self.authorized(self.http.get(&url)).query(&params)).await?;
        rows_from(body)
    }

    /// Calls a remote procedure that returns a set of rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the call fails or the rows do not match `T`.
    pub async fn rpc<T: DeserializeOwned>(
        &self,
        function: &str,
        args: &serde_json::Value,
    ) -> Result<Vec<T>, StoreError> {
        let url = self.rpc_url(function);
        log::debug!("rpc {function} {args}");
        let body = retry::send_json(|| self.authorized(self.http.post(&url)).json(args)).await?;
        rows_from(body)
    }

    /// Inserts one row and returns the `returning` columns of the stored
    /// row. The insert is sent exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert is rejected or the store returns
    /// no row.
    pub async fn insert<T: DeserializeOwned>(
        &self,
        table: &str,
        row: &serde_json::Value,
        returning: &str,
    ) -> Result<T, StoreError> {
        let url = self.table_url(table);
        let params = [("select", returning)];
        let body = retry::send_json_once(|| {
            self.authorized(self.http.post(&url))
                .header("Prefer", "return=representation")
                .query(&params)
                .json(row)
        })
        .await?;

        rows_from::<T>(body)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Remote {
                status: 201,
                code: None,
                message: format!("insert into {table} returned no row"),
            })
    }
}

/// Decodes a row array. A bare object is treated as a single row and
/// `null` as no rows.
fn rows_from<T: DeserializeOwned>(body: serde_json::Value) -> Result<Vec<T>, StoreError> {
    let rows = match body {
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::Array(rows) => rows,
        other => vec![other],
    };
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(StoreError::from))
        .collect()
}
