use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::instrument;

use astro_core::{Observation, OrbitalElements};

use super::{ComputationError, OrbitComputation};

/// Upper bound on how much of an error body is kept for diagnostics.
const ERROR_BODY_LIMIT: usize = 512;

/// Largest response body read from the service; an element set is a few hundred bytes.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// reqwest client for the orbit computation service.
///
/// Holds a fixed endpoint and a request timeout; an unresponsive service
/// surfaces as [`ComputationError::Unavailable`] once the timeout elapses.
#[derive(Debug, Clone)]
pub struct HttpOrbitComputationClient {
    client: reqwest::Client,
    endpoint: String,
    max_response_bytes: usize,
}

impl HttpOrbitComputationClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        })
    }

    /// Override the response body cap (default [`DEFAULT_MAX_RESPONSE_BYTES`]).
    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Serialize)]
struct ComputationRequest<'a> {
    observations: Vec<WireObservation<'a>>,
}

#[derive(Serialize)]
struct WireObservation<'a> {
    #[serde(rename = "directAscension")]
    right_ascension: &'a str,
    #[serde(rename = "celestialDeclination")]
    declination: &'a str,
    date: &'a str,
}

impl<'a> From<&'a Observation> for WireObservation<'a> {
    fn from(o: &'a Observation) -> Self {
        Self {
            right_ascension: &o.right_ascension,
            declination: &o.declination,
            date: &o.date,
        }
    }
}

#[async_trait]
impl OrbitComputation for HttpOrbitComputationClient {
    #[instrument(
        skip(self, observations),
        fields(endpoint = %self.endpoint, observation_count = observations.len()),
        err
    )]
    async fn compute(
        &self,
        observations: &[Observation],
    ) -> Result<OrbitalElements, ComputationError> {
        let payload = ComputationRequest {
            observations: observations.iter().map(WireObservation::from).collect(),
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|e| ComputationError::Serialization(e.to_string()))?;

        let mut response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ComputationError::Unavailable(e.to_string()))?;

        let status = response.status();

        let (bytes, truncated) = read_capped(&mut response, self.max_response_bytes)
            .await
            .map_err(|e| ComputationError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes)
                .chars()
                .take(ERROR_BODY_LIMIT)
                .collect();
            return Err(ComputationError::Failed {
                status: status.as_u16(),
                body,
            });
        }

        if truncated {
            return Err(ComputationError::Decoding(format!(
                "response body exceeds {} bytes",
                self.max_response_bytes
            )));
        }

        serde_json::from_slice(&bytes).map_err(|e| ComputationError::Decoding(e.to_string()))
    }
}

/// Read at most `limit` bytes of the body. The flag is set when more was on offer;
/// the rest is never buffered.
async fn read_capped(
    response: &mut reqwest::Response,
    limit: usize,
) -> Result<(Vec<u8>, bool), reqwest::Error> {
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Ok((Vec::new(), true));
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - bytes.len();
        if chunk.len() > room {
            bytes.extend_from_slice(&chunk[..room]);
            return Ok((bytes, true));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok((bytes, false))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

    use astro_core::{CometSkeleton, ObservationInput, validate_observations};

    use super::*;

    struct MockService {
        base_url: String,
        handle: tokio::task::JoinHandle<()>,
    }

    impl MockService {
        async fn spawn(app: Router) -> Self {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("failed to bind ephemeral port");
            let addr = listener.local_addr().unwrap();
            let handle = tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            Self {
                base_url: format!("http://{addr}"),
                handle,
            }
        }

        fn endpoint(&self) -> String {
            format!("{}/get_orbit", self.base_url)
        }
    }

    impl Drop for MockService {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    fn observations() -> Vec<Observation> {
        let inputs = (0..5)
            .map(|i| ObservationInput {
                right_ascension: format!("{}.25", 100 + i),
                declination: format!("-{i}.75"),
                date: format!("2024-02-{:02}T21:30:00", i + 10),
            })
            .collect();
        CometSkeleton::assemble(validate_observations(inputs).unwrap(), None)
            .observations()
            .to_vec()
    }

    fn elements_json() -> serde_json::Value {
        serde_json::json!({
            "largeSemiAxis": 3.46,
            "eccentricity": 0.64,
            "inclination": 7.04,
            "longitude": 50.1,
            "pericenter": 12.8,
            "trueAnomaly": 330.2,
            "minDistance": 0.52,
            "minApproximationDate": "2026-08-12T04:00:00"
        })
    }

    fn client(endpoint: String) -> HttpOrbitComputationClient {
        HttpOrbitComputationClient::new(endpoint, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn decodes_elements_and_sends_wire_payload() {
        let received: Arc<Mutex<Vec<serde_json::Value>>> = Arc::default();
        let app = Router::new()
            .route(
                "/get_orbit",
                post(
                    |State(received): State<Arc<Mutex<Vec<serde_json::Value>>>>,
                     Json(body): Json<serde_json::Value>| async move {
                        received.lock().unwrap().push(body);
                        Json(elements_json())
                    },
                ),
            )
            .with_state(received.clone());
        let mock = MockService::spawn(app).await;

        let observations = observations();
        let elements = client(mock.endpoint()).compute(&observations).await.unwrap();

        assert_eq!(elements.semi_major_axis, 3.46);
        assert_eq!(elements.true_anomaly, 330.2);
        assert_eq!(elements.min_distance, Some(0.52));
        assert_eq!(elements.min_approach_date.as_deref(), Some("2026-08-12T04:00:00"));

        let bodies = received.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        let sent = bodies[0]["observations"].as_array().unwrap();
        assert_eq!(sent.len(), 5);
        assert_eq!(sent[0]["directAscension"], "100.25");
        assert_eq!(sent[0]["celestialDeclination"], "-0.75");
        assert_eq!(sent[0]["date"], "2024-02-10T21:30:00");
        assert!(sent[0].get("id").is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_computation_failure() {
        let app = Router::new().route(
            "/get_orbit",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "solver diverged") }),
        );
        let mock = MockService::spawn(app).await;

        let err = client(mock.endpoint()).compute(&observations()).await.unwrap_err();
        match err {
            ComputationError::Failed { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "solver diverged");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_decoding_error() {
        let app = Router::new().route(
            "/get_orbit",
            post(|| async { Json(serde_json::json!({ "largeSemiAxis": "wide" })) }),
        );
        let mock = MockService::spawn(app).await;

        let err = client(mock.endpoint()).compute(&observations()).await.unwrap_err();
        assert!(matches!(err, ComputationError::Decoding(_)));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_without_buffering_it() {
        let padding = "x".repeat(64 * 1024);
        let app = Router::new().route(
            "/get_orbit",
            post(move || {
                let padding = padding.clone();
                async move {
                    let mut body = elements_json();
                    body["padding"] = serde_json::Value::String(padding);
                    Json(body)
                }
            }),
        );
        let mock = MockService::spawn(app).await;

        let err = client(mock.endpoint())
            .with_max_response_bytes(4 * 1024)
            .compute(&observations())
            .await
            .unwrap_err();
        match err {
            ComputationError::Decoding(msg) => assert!(msg.contains("4096 bytes"), "{msg}"),
            other => panic!("expected Decoding, got {other:?}"),
        }

        // The same body fits under the default cap and decodes (unknown fields are ignored).
        let elements = client(mock.endpoint()).compute(&observations()).await.unwrap();
        assert_eq!(elements.semi_major_axis, 3.46);
    }

    #[tokio::test]
    async fn oversized_error_body_keeps_status() {
        let app = Router::new().route(
            "/get_orbit",
            post(|| async { (StatusCode::BAD_GATEWAY, "e".repeat(32 * 1024)) }),
        );
        let mock = MockService::spawn(app).await;

        let err = client(mock.endpoint())
            .with_max_response_bytes(1024)
            .compute(&observations())
            .await
            .unwrap_err();
        assert!(matches!(err, ComputationError::Failed { status: 502, .. }));
    }

    #[tokio::test]
    async fn refused_connection_is_unavailable() {
        // Grab a free port and release it so nothing is listening there.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{addr}/get_orbit"))
            .compute(&observations())
            .await
            .unwrap_err();
        assert!(matches!(err, ComputationError::Unavailable(_)));
    }

    #[tokio::test]
    async fn slow_service_hits_timeout() {
        let app = Router::new().route(
            "/get_orbit",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(elements_json())
            }),
        );
        let mock = MockService::spawn(app).await;

        let client =
            HttpOrbitComputationClient::new(mock.endpoint(), Duration::from_millis(100)).unwrap();
        let err = client.compute(&observations()).await.unwrap_err();
        assert!(matches!(err, ComputationError::Unavailable(_)));
    }
}
