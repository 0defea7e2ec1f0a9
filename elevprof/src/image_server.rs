//! Point sampling against an ArcGIS ImageServer `getSamples` endpoint.

use crate::{
    source::{PointSampler, Sample},
    Coordinate, SourceError,
};
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Esri's global terrain service.
pub const WORLD_ELEVATION_URL: &str =
    "https://elevation.arcgis.com/arcgis/rest/services/WorldElevation/Terrain/ImageServer/getSamples";

pub struct ImageServer {
    client: Client,
    url: String,
    token: Option<String>,
}

impl ImageServer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            token: None,
        })
    }

    /// Authenticates requests with `token`. Without one, the service
    /// is called anonymously.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|t: &String| !t.is_empty());
        self
    }
}

impl PointSampler for ImageServer {
    fn supports_batch(&self) -> bool {
        true
    }

    fn sample(&self, coord: &Coordinate, surface: &str) -> Result<Sample, SourceError> {
        self.sample_batch(std::slice::from_ref(coord), surface)?
            .pop()
            .ok_or(SourceError::Length {
                expected: 1,
                actual: 0,
            })
    }

    /// Issues a single multipoint request for every coordinate.
    ///
    /// The service is addressed by URL, so `surface` only appears in
    /// logs.
    fn sample_batch(
        &self,
        coords: &[Coordinate],
        surface: &str,
    ) -> Result<Vec<Sample>, SourceError> {
        let geometry = json!({
            "points": coords
                .iter()
                .map(|c| [c.longitude, c.latitude])
                .collect::<Vec<_>>(),
            "spatialReference": { "wkid": 4326 },
        });
        let mut params = vec![
            ("geometry", geometry.to_string()),
            ("geometryType", "esriGeometryMultipoint".to_owned()),
            ("returnFirstValueOnly", "false".to_owned()),
            ("interpolation", "RSP_BilinearInterpolation".to_owned()),
            ("f", "json".to_owned()),
        ];
        if let Some(token) = &self.token {
            params.push(("token", token.clone()));
        }

        debug!("sampling {} points from {surface} at {}", coords.len(), self.url);
        let response = self.client.post(&self.url).form(&params).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        samples_from_response(&response.text()?, coords.len())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetSamplesResponse {
    samples: Option<Vec<RawSample>>,
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSample {
    location_id: Option<usize>,
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    message: Option<String>,
}

/// Parses a `getSamples` response body into one sample per requested
/// point, in request order.
fn samples_from_response(body: &str, expected: usize) -> Result<Vec<Sample>, SourceError> {
    let response: GetSamplesResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::Response(format!("unparsable response: {e}")))?;

    let mut raw = match (response.samples, response.error) {
        (Some(samples), _) => samples,
        (None, Some(ServiceError { message })) => {
            return Err(SourceError::Response(
                message.unwrap_or_else(|| "unknown error".to_owned()),
            ))
        }
        (None, None) => return Err(SourceError::Response("no samples in response".to_owned())),
    };

    if raw.len() != expected {
        return Err(SourceError::Length {
            expected,
            actual: raw.len(),
        });
    }
    if raw.iter().all(|s| s.location_id.is_some()) {
        raw.sort_by_key(|s| s.location_id);
    }

    Ok(raw
        .into_iter()
        .map(|s| match s.value {
            Some(Value::Number(n)) => n.as_f64().map_or(Sample::NoData, Sample::Value),
            Some(Value::String(text)) => Sample::Text(text),
            _ => Sample::NoData,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{samples_from_response, ImageServer, WORLD_ELEVATION_URL};
    use crate::{source::Sample, SourceError};
    use std::time::Duration;

    #[test]
    fn test_samples_in_request_order() {
        let body = r#"{"samples": [
            {"locationId": 2, "value": "NoData"},
            {"locationId": 0, "value": "512,25"},
            {"locationId": 1, "value": 530.5}
        ]}"#;
        let samples = samples_from_response(body, 3).unwrap();
        assert_eq!(
            samples,
            vec![
                Sample::Text("512,25".into()),
                Sample::Value(530.5),
                Sample::Text("NoData".into()),
            ]
        );
        let elevations: Vec<Option<f64>> = samples.iter().map(Sample::elevation).collect();
        assert_eq!(elevations, vec![Some(512.25), Some(530.5), None]);
    }

    #[test]
    fn test_missing_value_is_no_data() {
        let body = r#"{"samples": [{"value": null}, {}]}"#;
        assert_eq!(
            samples_from_response(body, 2).unwrap(),
            vec![Sample::NoData, Sample::NoData]
        );
    }

    #[test]
    fn test_count_mismatch() {
        let body = r#"{"samples": [{"locationId": 0, "value": "1"}]}"#;
        assert!(matches!(
            samples_from_response(body, 2),
            Err(SourceError::Length {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_service_error() {
        let body = r#"{"error": {"code": 498, "message": "Invalid token.", "details": []}}"#;
        match samples_from_response(body, 1) {
            Err(SourceError::Response(message)) => assert_eq!(message, "Invalid token."),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            samples_from_response("<html>", 1),
            Err(SourceError::Response(_))
        ));
    }

    #[test]
    fn test_empty_token_is_anonymous() {
        let server = ImageServer::new(WORLD_ELEVATION_URL, Duration::from_secs(30))
            .unwrap()
            .token("");
        assert!(server.token.is_none());
    }
}
