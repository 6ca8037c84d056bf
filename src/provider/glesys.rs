use std::fmt;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{DnsDirectory, Record};
use crate::error::{Error, Result};

pub const GLESYS_API_BASE: &str = "https://api.glesys.com";

const LIST_RECORDS: &str = "domain/listrecords";
const UPDATE_RECORD: &str = "domain/updaterecord";

pub struct GlesysClient {
    client: Client,
    base_url: String,
    api_user: String,
    api_key: String,
}

impl fmt::Debug for GlesysClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlesysClient")
            .field("base_url", &self.base_url)
            .field("api_user", &self.api_user)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl GlesysClient {
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_user: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_user: api_user.into(),
            api_key: api_key.into(),
        }
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.api_user, Some(&self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::transport(path, e))?;

        if !response.status().is_success() {
            return Err(Error::Provider {
                path: path.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl DnsDirectory for GlesysClient {
    async fn list_records(&self, domain: &str) -> Result<Vec<Record>> {
        let body = ListRecordsRequest { domainname: domain };

        let response: GlesysResponse<RecordList> = self
            .post(LIST_RECORDS, &body)
            .await?
            .json()
            .await
            .map_err(|e| Error::transport(LIST_RECORDS, e))?;

        debug!(
            "Fetched {} record(s) for {}",
            response.response.records.len(),
            domain
        );
        Ok(response.response.records)
    }

    async fn update_record(&self, record: &Record) -> Result<()> {
        self.post(UPDATE_RECORD, record).await?;
        Ok(())
    }
}

// GleSYS API types

#[derive(Debug, Serialize)]
struct ListRecordsRequest<'a> {
    domainname: &'a str,
}

#[derive(Debug, Deserialize)]
struct GlesysResponse<T> {
    response: T,
}

#[derive(Debug, Deserialize)]
struct RecordList {
    records: Vec<Record>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    const AUTH: &str = "Basic dXNlcjprZXk=";

    #[derive(Clone, Default)]
    struct FakeApi {
        requests: Arc<Mutex<Vec<(String, Value)>>>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some(AUTH)
    }

    async fn list_records(
        State(api): State<FakeApi>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        api.requests
            .lock()
            .unwrap()
            .push((LIST_RECORDS.to_string(), body));

        Json(json!({
            "response": {
                "status": { "code": 200, "text": "OK" },
                "records": [
                    {
                        "recordid": 1001,
                        "domainname": "example.com",
                        "host": "home",
                        "type": "A",
                        "data": "1.1.1.1",
                        "ttl": 300
                    },
                    {
                        "recordid": 1002,
                        "domainname": "example.com",
                        "host": "home",
                        "type": "AAAA",
                        "data": "::1",
                        "ttl": 300
                    }
                ]
            }
        }))
        .into_response()
    }

    async fn update_record(
        State(api): State<FakeApi>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        api.requests
            .lock()
            .unwrap()
            .push((UPDATE_RECORD.to_string(), body));

        Json(json!({ "response": { "status": { "code": 200 } } })).into_response()
    }

    async fn serve(api: FakeApi) -> String {
        let app = Router::new()
            .route("/domain/listrecords", post(list_records))
            .route("/domain/updaterecord", post(update_record))
            .with_state(api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_list_records() {
        let api = FakeApi::default();
        let client = GlesysClient::with_base_url(serve(api.clone()).await, "user", "key");

        let records = client.list_records("example.com").await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            Record {
                record_id: 1001,
                host: "home".into(),
                record_type: "A".into(),
                data: "1.1.1.1".into(),
                ttl: 300,
            }
        );
        assert_eq!(records[1].record_type, "AAAA");

        let requests = api.requests.lock().unwrap();
        assert_eq!(requests[0].1, json!({ "domainname": "example.com" }));
    }

    #[tokio::test]
    async fn test_update_record_sends_full_record() {
        let api = FakeApi::default();
        let client = GlesysClient::with_base_url(serve(api.clone()).await, "user", "key");

        let record = Record {
            record_id: 1001,
            host: "home".into(),
            record_type: "A".into(),
            data: "2.2.2.2".into(),
            ttl: 300,
        };
        client.update_record(&record).await.unwrap();

        let requests = api.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, UPDATE_RECORD);
        assert_eq!(
            requests[0].1,
            json!({
                "recordid": 1001,
                "host": "home",
                "type": "A",
                "data": "2.2.2.2",
                "ttl": 300
            })
        );
    }

    #[tokio::test]
    async fn test_rejected_credentials_surface_status_and_path() {
        let api = FakeApi::default();
        let client = GlesysClient::with_base_url(serve(api.clone()).await, "user", "wrong");

        let err = client.list_records("example.com").await.unwrap_err();

        match err {
            Error::Provider { path, status } => {
                assert_eq!(path, LIST_RECORDS);
                assert_eq!(status, 401);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(api.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = GlesysClient::with_base_url(format!("http://{}", addr), "user", "key");
        let err = client.list_records("example.com").await.unwrap_err();

        assert!(matches!(err, Error::Transport { .. }));
        assert!(!err.is_usage());
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = GlesysClient::with_base_url(GLESYS_API_BASE, "cl12345", "secret-key");
        let debug = format!("{:?}", client);

        assert!(debug.contains("cl12345"));
        assert!(!debug.contains("secret-key"));
    }
}
