//! # Remote Record Store
//!
//! The interface to the remote tabular service, and its HTTP client.
//!
//! ## Interface Boundary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Remote Record Store Boundary                         │
//! │                                                                         │
//! │  The core treats the remote store purely as a fallible async           │
//! │  function over JSON-serializable rows:                                  │
//! │                                                                         │
//! │    get_records(range)            -> rows                                │
//! │    append_records(range, rows)   -> ()                                  │
//! │    update_records(range, rows)   -> ()                                  │
//! │    clear_records(range)          -> ()                                  │
//! │                                                                         │
//! │  HTTP mapping (HttpRecordStore):                                        │
//! │    GET  {base}/values?range=R             read rows                     │
//! │    POST {base}/values/append?range=R      append rows                   │
//! │    POST {base}/values/update?range=R      overwrite rows                │
//! │    POST {base}/values/clear?range=R       clear rows                    │
//! │                                                                         │
//! │  The active tenant travels in the X-Tenant-Id header on every call.    │
//! │  Every failure leaves this module already classified.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

use yatai_core::{PosError, PosResult, RecordRange, TenantId, WriteMethod};

use crate::error::{classify_status, classify_transport_error};

/// Header carrying the tenant identifier on every request.
pub const TENANT_HEADER: &str = "X-Tenant-Id";

// =============================================================================
// Trait
// =============================================================================

/// Abstract remote record store.
///
/// Production uses [`HttpRecordStore`]; tests use scripted in-memory
/// implementations. Implementations classify their own failures - callers
/// only ever see [`PosError`].
pub trait RemoteRecordStore: Send + Sync {
    /// Reads the rows of a range.
    fn get_records(
        &self,
        tenant: &TenantId,
        range: &RecordRange,
    ) -> impl Future<Output = PosResult<Vec<Vec<Value>>>> + Send;

    /// Appends rows after the last row of a range.
    fn append_records(
        &self,
        tenant: &TenantId,
        range: &RecordRange,
        rows: &[Vec<Value>],
    ) -> impl Future<Output = PosResult<()>> + Send;

    /// Overwrites the rows of a range.
    fn update_records(
        &self,
        tenant: &TenantId,
        range: &RecordRange,
        rows: &[Vec<Value>],
    ) -> impl Future<Output = PosResult<()>> + Send;

    /// Clears the rows of a range.
    fn clear_records(
        &self,
        tenant: &TenantId,
        range: &RecordRange,
    ) -> impl Future<Output = PosResult<()>> + Send;

    /// Dispatches a queued write to the matching operation.
    fn write(
        &self,
        tenant: &TenantId,
        method: WriteMethod,
        range: &RecordRange,
        rows: &[Vec<Value>],
    ) -> impl Future<Output = PosResult<()>> + Send {
        async move {
            match method {
                WriteMethod::Append => self.append_records(tenant, range, rows).await,
                WriteMethod::Update => self.update_records(tenant, range, rows).await,
                WriteMethod::Clear => self.clear_records(tenant, range).await,
            }
        }
    }
}

/// Forwarding impl so a shared handle (`Arc<R>`) is itself a remote store.
impl<T: RemoteRecordStore + ?Sized> RemoteRecordStore for std::sync::Arc<T> {
    fn get_records(
        &self,
        tenant: &TenantId,
        range: &RecordRange,
    ) -> impl Future<Output = PosResult<Vec<Vec<Value>>>> + Send {
        (**self).get_records(tenant, range)
    }

    fn append_records(
        &self,
        tenant: &TenantId,
        range: &RecordRange,
        rows: &[Vec<Value>],
    ) -> impl Future<Output = PosResult<()>> + Send {
        (**self).append_records(tenant, range, rows)
    }

    fn update_records(
        &self,
        tenant: &TenantId,
        range: &RecordRange,
        rows: &[Vec<Value>],
    ) -> impl Future<Output = PosResult<()>> + Send {
        (**self).update_records(tenant, range, rows)
    }

    fn clear_records(
        &self,
        tenant: &TenantId,
        range: &RecordRange,
    ) -> impl Future<Output = PosResult<()>> + Send {
        (**self).clear_records(tenant, range)
    }
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// Wire shape of a read response.
#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// HTTP client for the remote tabular service.
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRecordStore {
    /// Creates a client for the given base URL.
    ///
    /// The per-request timeout is the only timeout in the system: the
    /// retry executor adds attempts, never additional clocks.
    pub fn new(base_url: &str, timeout: Duration) -> PosResult<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| PosError::validation(format!("invalid record store URL: {e}")))?;

        // Url::join treats a path without a trailing slash as a file and
        // would replace its last segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PosError::unknown(format!("failed to build HTTP client: {e}")))?;

        Ok(HttpRecordStore { client, base_url })
    }

    /// Builds the endpoint URL for a values operation.
    fn endpoint(&self, action: Option<&str>) -> PosResult<Url> {
        let path = match action {
            Some(action) => format!("values/{action}"),
            None => "values".to_string(),
        };
        self.base_url
            .join(&path)
            .map_err(|e| PosError::validation(format!("invalid record store path: {e}")))
    }

    /// Sends a write and maps the outcome into the taxonomy.
    async fn send_write(
        &self,
        tenant: &TenantId,
        action: &str,
        range: &RecordRange,
        rows: &[Vec<Value>],
    ) -> PosResult<()> {
        let url = self.endpoint(Some(action))?;
        let context = format!("{action} {range}");

        let response = self
            .client
            .post(url)
            .query(&[("range", range.as_str())])
            .header(TENANT_HEADER, tenant.as_str())
            .json(&serde_json::json!({ "values": rows }))
            .send()
            .await
            .map_err(|e| classify_transport_error(&e).with_context(context.clone()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &context));
        }

        debug!(%range, action, rows = rows.len(), "Write delivered");
        Ok(())
    }
}

impl RemoteRecordStore for HttpRecordStore {
    async fn get_records(
        &self,
        tenant: &TenantId,
        range: &RecordRange,
    ) -> PosResult<Vec<Vec<Value>>> {
        let url = self.endpoint(None)?;
        let context = format!("get {range}");

        let response = self
            .client
            .get(url)
            .query(&[("range", range.as_str())])
            .header(TENANT_HEADER, tenant.as_str())
            .send()
            .await
            .map_err(|e| classify_transport_error(&e).with_context(context.clone()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &context));
        }

        let body: ValuesResponse = response
            .json()
            .await
            .map_err(|e| classify_transport_error(&e).with_context(context))?;

        debug!(%range, rows = body.values.len(), "Rows fetched");
        Ok(body.values)
    }

    async fn append_records(
        &self,
        tenant: &TenantId,
        range: &RecordRange,
        rows: &[Vec<Value>],
    ) -> PosResult<()> {
        self.send_write(tenant, "append", range, rows).await
    }

    async fn update_records(
        &self,
        tenant: &TenantId,
        range: &RecordRange,
        rows: &[Vec<Value>],
    ) -> PosResult<()> {
        self.send_write(tenant, "update", range, rows).await
    }

    async fn clear_records(&self, tenant: &TenantId, range: &RecordRange) -> PosResult<()> {
        self.send_write(tenant, "clear", range, &[]).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_base_url() {
        let err = HttpRecordStore::new("not a url", Duration::from_secs(5)).unwrap_err();
        assert_eq!(err.code, yatai_core::ErrorCode::ValidationError);
    }

    #[test]
    fn test_endpoint_paths() {
        let store =
            HttpRecordStore::new("https://records.example/api/", Duration::from_secs(5)).unwrap();

        assert_eq!(
            store.endpoint(None).unwrap().as_str(),
            "https://records.example/api/values"
        );
        assert_eq!(
            store.endpoint(Some("append")).unwrap().as_str(),
            "https://records.example/api/values/append"
        );

        // A base without a trailing slash keeps its last path segment.
        let store =
            HttpRecordStore::new("https://records.example/api", Duration::from_secs(5)).unwrap();
        assert_eq!(
            store.endpoint(None).unwrap().as_str(),
            "https://records.example/api/values"
        );
    }
}
