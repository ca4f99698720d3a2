//! Rest API interface for Segment
//!

mod error;

pub use error::SegmentError;

use std::time::Duration;

use jetty_core::logging::debug;
use reqwest::{Method, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::{DeserializeOwned, Error as _};
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use crate::{consts, creds::SegmentCredentials};

/// Result of one page of a collection: the items and the upstream cursor for
/// the next page (empty when there is none).
pub(crate) type Listing<T> = (Vec<T>, String);

pub(crate) struct SegmentRestConfig {
    /// Items requested per page.
    pub(crate) page_size: u32,
    /// Transient-failure retries; 0 disables the retry middleware.
    pub(crate) retries: u32,
    /// Per-request timeout.
    pub(crate) timeout: Duration,
}

impl Default for SegmentRestConfig {
    fn default() -> Self {
        Self {
            page_size: consts::DEFAULT_PAGE_SIZE,
            retries: consts::DEFAULT_RETRIES,
            timeout: Duration::from_secs(consts::DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Wrapper struct for http functionality
pub(crate) struct SegmentRestClient {
    /// The credentials used to authenticate into Segment.
    credentials: SegmentCredentials,
    base_url: Url,
    page_size: u32,
    http_client: ClientWithMiddleware,
}

impl SegmentRestClient {
    pub(crate) fn new(
        credentials: SegmentCredentials,
        config: SegmentRestConfig,
    ) -> Result<Self, SegmentError> {
        credentials
            .validate()
            .map_err(|e| SegmentError::Config(e.to_string()))?;
        let base_url = Url::parse(
            credentials
                .url
                .as_deref()
                .unwrap_or(consts::DEFAULT_BASE_URL),
        )?;
        if base_url.cannot_be_a_base() {
            return Err(SegmentError::Config(format!(
                "{base_url} cannot be used as a base url"
            )));
        }

        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SegmentError::Config(e.to_string()))?;
        let mut client_builder = ClientBuilder::new(inner);
        if config.retries > 0 {
            let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.retries);
            client_builder =
                client_builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(Self {
            credentials,
            base_url,
            page_size: config.page_size,
            http_client: client_builder.build(),
        })
    }

    /// The base URL with `segments` appended as path segments.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn page_query(&self, cursor: &str) -> Vec<(&'static str, String)> {
        let mut query = vec![(consts::PAGE_COUNT_PARAM, self.page_size.to_string())];
        if !cursor.is_empty() {
            query.push((consts::PAGE_CURSOR_PARAM, cursor.to_owned()));
        }
        query
    }

    /// Send a request and unwrap the response envelope's `data`.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: Option<Value>,
        context: &str,
    ) -> Result<T, SegmentError> {
        debug!("{} {}", method, url.path());
        let mut request = self
            .http_client
            .request(method, url)
            .header(consts::AUTH_HEADER, format!["Bearer {}", self.credentials.token])
            .header(consts::ACCEPT_HEADER, "application/json")
            .header(consts::CONTENT_TYPE_HEADER, consts::SEGMENT_CONTENT_TYPE);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request
            .send()
            .await
            .map_err(|source| SegmentError::Transport {
                context: context.to_owned(),
                source,
            })?;
        let status = response.status();
        let raw = response
            .bytes()
            .await
            .map_err(|e| SegmentError::Transport {
                context: context.to_owned(),
                source: e.into(),
            })?;
        parse_envelope(context, status, &raw)
    }

    /// Fetch one page of a collection. `key` names the array inside `data`.
    pub(crate) async fn list_page<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        key: &str,
        cursor: &str,
        extra_query: &[(&str, String)],
        context: &str,
    ) -> Result<Listing<T>, SegmentError> {
        let mut query = self.page_query(cursor);
        query.extend(extra_query.iter().cloned());

        let mut data: Map<String, Value> = self
            .send(Method::GET, self.endpoint(segments), &query, None, context)
            .await?;
        let items = match data.remove(key) {
            Some(Value::Null) | None => vec![],
            Some(raw) => decode(context, raw)?,
        };
        let next = data
            .get("pagination")
            .and_then(|p| p.get("next"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Ok((items, next))
    }

    /// Fetch a single object found under one of `keys` inside `data`.
    pub(crate) async fn fetch_one<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        keys: &[&str],
        context: &str,
    ) -> Result<T, SegmentError> {
        let data: Map<String, Value> = self
            .send(Method::GET, self.endpoint(segments), &[], None, context)
            .await?;
        take_field(context, data, keys)
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Errors in the body win over the status code: the upstream reports some
/// failures with a 200.
pub(crate) fn parse_envelope<T: DeserializeOwned>(
    context: &str,
    status: StatusCode,
    raw: &[u8],
) -> Result<T, SegmentError> {
    let status_error = || SegmentError::Status {
        context: context.to_owned(),
        status: status.as_u16(),
        body: String::from_utf8_lossy(raw).into_owned(),
    };

    let envelope: Envelope = match serde_json::from_slice(raw) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => return Err(status_error()),
        Err(source) => {
            return Err(SegmentError::Decode {
                context: context.to_owned(),
                source,
            })
        }
    };

    if let Some(first) = envelope.errors.into_iter().next() {
        return Err(SegmentError::Upstream {
            context: context.to_owned(),
            kind: first.kind,
            message: first.message,
        });
    }
    if !status.is_success() {
        return Err(status_error());
    }

    decode(context, envelope.data.unwrap_or(Value::Null))
}

pub(crate) fn decode<T: DeserializeOwned>(context: &str, raw: Value) -> Result<T, SegmentError> {
    serde_json::from_value(raw).map_err(|source| SegmentError::Decode {
        context: context.to_owned(),
        source,
    })
}

/// Pull the first present key out of a `data` object.
pub(crate) fn take_field<T: DeserializeOwned>(
    context: &str,
    mut data: Map<String, Value>,
    keys: &[&str],
) -> Result<T, SegmentError> {
    let raw = keys
        .iter()
        .find_map(|k| data.remove(*k))
        .ok_or_else(|| SegmentError::Decode {
            context: context.to_owned(),
            source: serde_json::Error::custom(format!("response has none of {keys:?}")),
        })?;
    decode(context, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

    struct NoCursor;

    impl Match for NoCursor {
        fn matches(&self, request: &Request) -> bool {
            !request
                .url
                .query_pairs()
                .any(|(k, _)| k == consts::PAGE_CURSOR_PARAM)
        }
    }

    fn client_for(url: Option<String>) -> SegmentRestClient {
        SegmentRestClient::new(
            SegmentCredentials {
                token: "secret".to_owned(),
                url,
            },
            SegmentRestConfig {
                retries: 0,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn empty_creds_fail_to_load() {
        let res = SegmentRestClient::new(
            SegmentCredentials::default(),
            SegmentRestConfig::default(),
        );
        assert!(matches!(res, Err(SegmentError::Config(_))));
    }

    #[test]
    fn endpoints_append_to_base_url() {
        let client = client_for(None);
        assert_eq!(
            client.endpoint(&["groups", "g1", "users"]).as_str(),
            "https://api.segmentapis.com/groups/g1/users"
        );
        assert_eq!(client.endpoint(&[]).as_str(), "https://api.segmentapis.com/");

        let client = client_for(Some("http://localhost:9999/api".to_owned()));
        assert_eq!(
            client.endpoint(&["users"]).as_str(),
            "http://localhost:9999/api/users"
        );
    }

    #[test]
    fn errors_in_a_200_body_fail_the_call() {
        let body = json!({"data": {}, "errors": [{"type": "unauthorized", "message": "bad token"}]});
        let err = parse_envelope::<Value>("listing users", StatusCode::OK, body.to_string().as_bytes())
            .unwrap_err();
        match err {
            SegmentError::Upstream { kind, message, .. } => {
                assert_eq!(kind, "unauthorized");
                assert_eq!(message, "bad token");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn non_success_without_errors_is_a_status_error() {
        let err = parse_envelope::<Value>("listing users", StatusCode::BAD_GATEWAY, b"<html>")
            .unwrap_err();
        assert!(matches!(err, SegmentError::Status { status: 502, .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn garbage_success_body_is_a_decode_error() {
        let err = parse_envelope::<Value>("listing users", StatusCode::OK, b"not json").unwrap_err();
        assert!(matches!(err, SegmentError::Decode { .. }));
    }

    #[test]
    fn missing_keys_are_decode_errors() {
        let data = json!({"other": 1}).as_object().cloned().unwrap_or_default();
        let err = take_field::<Value>("getting group", data, &["group", "userGroup"]).unwrap_err();
        assert!(matches!(err, SegmentError::Decode { .. }));
    }

    #[tokio::test]
    async fn first_page_omits_cursor_and_later_pages_send_it() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/roles"))
            .and(header("Authorization", "Bearer secret"))
            .and(header("Content-Type", consts::SEGMENT_CONTENT_TYPE))
            .and(query_param("pagination[count]", "200"))
            .and(NoCursor)
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"roles": [{"id": "r1"}], "pagination": {"current": "", "next": "c2"}}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/roles"))
            .and(query_param("pagination[cursor]", "c2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"roles": [{"id": "r2"}], "pagination": {"current": "c2"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(Some(server.uri()));
        let (first, next): Listing<Value> = client
            .list_page(&["roles"], "roles", "", &[], "listing roles")
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(next, "c2");

        let (second, next): Listing<Value> = client
            .list_page(&["roles"], "roles", &next, &[], "listing roles")
            .await
            .unwrap();
        assert_eq!(second[0]["id"], "r2");
        assert!(next.is_empty());
    }

    #[tokio::test]
    async fn unreachable_upstream_is_retryable() {
        let client = client_for(Some("http://127.0.0.1:9".to_owned()));
        let err = client
            .fetch_one::<Value>(&[], &["workspace"], "getting workspace")
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "{err}");
    }
}
