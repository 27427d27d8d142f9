//! HTTP+JSON catalog client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{AlbumRecord, AudioFormat, Catalog, SearchEntity, TrackRecord};
use super::{UpstreamError, UpstreamResult};
use crate::config::FsConfig;

/// Catalog API client.
///
/// Every request carries the `client_id` credential and `format=json`.
#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    api_base: String,
    client_id: String,
    album_limit: u32,
    autocomplete_limit: u32,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("api_base", &self.api_base)
            .field("client_id", &"<redacted>")
            .finish()
    }
}

impl CatalogClient {
    /// Create a client from process configuration.
    pub fn new(config: &FsConfig) -> UpstreamResult<Self> {
        let mut headers = HeaderMap::new();
        if let Ok(agent) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, agent);
        }
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            album_limit: config.album_limit,
            autocomplete_limit: config.autocomplete_limit,
        })
    }

    /// Base URL of the catalog API.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// GET `{api_base}/{endpoint}/` and return the `results` member.
    #[instrument(skip(self, params), fields(endpoint = %endpoint))]
    async fn get_results(&self, endpoint: &str, params: &[(&str, String)]) -> UpstreamResult<Value> {
        let url = format!("{}/{}/", self.api_base, endpoint);
        debug!("GET {} {:?}", url, params);

        let response = self
            .http
            .get(&url)
            .query(&[("client_id", self.client_id.as_str()), ("format", "json")])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::status(url, status.as_u16()));
        }

        let body = response.bytes().await?;
        let envelope: Envelope = serde_json::from_slice(&body)
            .map_err(|e| UpstreamError::decode(&url, e.to_string()))?;

        if let Some(headers) = envelope.headers {
            if headers.status.as_deref() == Some("failed") {
                return Err(UpstreamError::Api {
                    code: headers.code.as_i64().unwrap_or(-1),
                    message: headers.error_message.unwrap_or_default(),
                });
            }
        }

        Ok(envelope.results)
    }

    /// First `results[].id` of a name search against `endpoint`.
    async fn id_by_name(&self, endpoint: &str, name: &str) -> UpstreamResult<Option<String>> {
        let results = self
            .get_results(endpoint, &[("name", name.to_string())])
            .await?;
        Ok(results
            .as_array()
            .and_then(|items| items.first())
            .and_then(|item| item.get("id"))
            .and_then(lenient_value))
    }
}

#[async_trait]
impl Catalog for CatalogClient {
    async fn albums_by_artist(&self, artist_id: &str) -> UpstreamResult<Vec<AlbumRecord>> {
        let results = self
            .get_results(
                "albums",
                &[
                    ("artist_id", artist_id.to_string()),
                    ("limit", self.album_limit.to_string()),
                ],
            )
            .await?;

        Ok(records::<AlbumJson>(&results)
            .into_iter()
            .map(|a| AlbumRecord {
                id: a.id,
                name: a.name,
                release_date: a.releasedate,
            })
            .collect())
    }

    async fn album_tracks(
        &self,
        album_id: &str,
        format: AudioFormat,
    ) -> UpstreamResult<Vec<TrackRecord>> {
        let results = self
            .get_results(
                "albums/tracks",
                &[
                    ("id", album_id.to_string()),
                    ("audioformat", format.as_str().to_string()),
                ],
            )
            .await?;

        let tracks = results
            .as_array()
            .and_then(|albums| albums.first())
            .and_then(|album| album.get("tracks"))
            .cloned()
            .unwrap_or(Value::Null);

        Ok(records::<TrackJson>(&tracks)
            .into_iter()
            .map(|t| TrackRecord {
                id: t.id,
                name: t.name,
                audio: t.audio,
                position: t.position.as_deref().map(leading_number),
            })
            .collect())
    }

    async fn artist_id_by_name(&self, name: &str) -> UpstreamResult<Option<String>> {
        self.id_by_name("artists", name).await
    }

    async fn album_id_by_name(&self, name: &str) -> UpstreamResult<Option<String>> {
        self.id_by_name("albums", name).await
    }

    async fn autocomplete(
        &self,
        prefix: &str,
        entity: SearchEntity,
    ) -> UpstreamResult<Vec<String>> {
        let results = self
            .get_results(
                "autocomplete",
                &[
                    ("prefix", prefix.to_string()),
                    ("entity", entity.as_str().to_string()),
                    ("limit", self.autocomplete_limit.to_string()),
                ],
            )
            .await?;

        let matches = results
            .get(entity.as_str())
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::Object(obj) => obj
                            .get("match")
                            .or_else(|| obj.get("name"))
                            .and_then(lenient_value),
                        other => lenient_value(other),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(matches)
    }
}

/// Top-level response shape shared by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    headers: Option<ResponseHeaders>,
    #[serde(default)]
    results: Value,
}

#[derive(Debug, Deserialize)]
struct ResponseHeaders {
    #[serde(default, deserialize_with = "lenient_string")]
    status: Option<String>,
    #[serde(default)]
    code: Value,
    #[serde(default, deserialize_with = "lenient_string")]
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AlbumJson {
    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    releasedate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TrackJson {
    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    audio: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    position: Option<String>,
}

/// Decode each element of a JSON array; elements of the wrong shape become
/// all-`None` records rather than failing the whole list.
fn records<T>(value: &Value) -> Vec<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| serde_json::from_value(item.clone()).unwrap_or_default())
                .collect()
        })
        .unwrap_or_default()
}

/// Strings pass through, numbers are stringified, anything else is absent.
fn lenient_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_value(&value))
}

/// Leading decimal digits of `s`, or 0 when there are none. Runs too long
/// for a `u32` saturate.
fn leading_number(s: &str) -> u32 {
    let digits: String = s
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("7"), 7);
        assert_eq!(leading_number(" 12abc"), 12);
        assert_eq!(leading_number("x1"), 0);
        assert_eq!(leading_number(""), 0);
        assert_eq!(leading_number("99999999999"), u32::MAX);
        assert_eq!(leading_number("4294967295 bonus"), u32::MAX);
    }

    #[test]
    fn test_records_are_lenient() {
        let value = json!([
            {"id": 42, "name": "First", "releasedate": "2020-01-31"},
            {"id": "43", "name": null},
            "not an object",
        ]);
        let albums: Vec<AlbumJson> = records(&value);
        assert_eq!(albums.len(), 3);
        assert_eq!(albums[0].id.as_deref(), Some("42"));
        assert_eq!(albums[0].releasedate.as_deref(), Some("2020-01-31"));
        assert_eq!(albums[1].id.as_deref(), Some("43"));
        assert!(albums[1].name.is_none());
        assert!(albums[2].id.is_none());
    }

    #[test]
    fn test_records_of_non_array() {
        let albums: Vec<AlbumJson> = records(&json!({"oops": true}));
        assert!(albums.is_empty());
    }
}
