use crate::plate::Plate;
use async_trait::async_trait;
use log::{debug, info};
use regex::Regex;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use url::Url;

/// Raw key/value pairs as the upstream names them.
pub type Fields = BTreeMap<String, String>;

#[derive(Debug, Fail)]
pub enum UpstreamError {
    #[fail(display = "upstream has no record of the plate")]
    NotFound,
    #[fail(display = "upstream responded with status {}", _0)]
    Status(u16),
    #[fail(display = "upstream request failed: {}", _0)]
    Request(String),
    #[fail(display = "unable to parse upstream response: {}", _0)]
    Parse(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Request(e.to_string())
    }
}

#[async_trait]
pub trait PlateSource: Send + Sync {
    /// One attempt, no retries.
    async fn fetch(&self, plate: &Plate) -> Result<Fields, UpstreamError>;
}

fn plate_url(base: &Url, plate: &Plate) -> Result<Url, UpstreamError> {
    base.join(plate.as_str())
        .map_err(|e| UpstreamError::Request(format!("bad upstream url: {}", e)))
}

/// Issues a single GET. A new client per call, nothing is pooled between
/// lookups.
async fn get(url: Url, user_agent: &str) -> Result<reqwest::Response, UpstreamError> {
    info!("Querying upstream {}", url);
    let client = reqwest::Client::builder().user_agent(user_agent).build()?;
    let response = client.get(url).send().await?;
    match response.status() {
        s if s.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(UpstreamError::NotFound),
        s => Err(UpstreamError::Status(s.as_u16())),
    }
}

/// Scrapes the public results page and reads its key/value table.
pub struct HtmlSource {
    base: Url,
    user_agent: String,
}

impl HtmlSource {
    pub fn new(base: Url, user_agent: String) -> Self {
        HtmlSource { base, user_agent }
    }
}

#[async_trait]
impl PlateSource for HtmlSource {
    async fn fetch(&self, plate: &Plate) -> Result<Fields, UpstreamError> {
        let url = plate_url(&self.base, plate)?;
        let body = get(url, &self.user_agent).await?.text().await?;
        let fields = parse_table(&body);
        debug!("Scraped {} fields for {}: {:?}", fields.len(), plate, fields);
        Ok(fields)
    }
}

/// Talks to a plate API that answers with a flat JSON object.
pub struct JsonSource {
    base: Url,
    user_agent: String,
}

impl JsonSource {
    pub fn new(base: Url, user_agent: String) -> Self {
        JsonSource { base, user_agent }
    }
}

#[async_trait]
impl PlateSource for JsonSource {
    async fn fetch(&self, plate: &Plate) -> Result<Fields, UpstreamError> {
        let url = plate_url(&self.base, plate)?;
        let value: Value = get(url, &self.user_agent)
            .await?
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;
        let fields = json_fields(&value)?;
        debug!(
            "Upstream returned {} fields for {}: {:?}",
            fields.len(),
            plate,
            fields
        );
        Ok(fields)
    }
}

/// Strings and numbers are kept; nulls, arrays and objects are skipped.
pub fn json_fields(value: &Value) -> Result<Fields, UpstreamError> {
    let object = value
        .as_object()
        .ok_or_else(|| UpstreamError::Parse(format!("expected a JSON object, got {}", value)))?;
    Ok(object
        .iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k.clone(), s.clone())),
            Value::Number(n) => Some((k.clone(), n.to_string())),
            _ => None,
        })
        .collect())
}

static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").unwrap());

static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<t[dh]\b[^>]*>(.*?)</t[dh]>").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Reads table cells pairwise as `key -> value`, row by row. A trailing odd
/// cell is ignored, so single-cell rows yield nothing. The first occurrence
/// of a key wins.
pub fn parse_table(html: &str) -> Fields {
    let mut fields = Fields::new();
    for row in ROW_RE.captures_iter(html) {
        let cells: Vec<String> = CELL_RE
            .captures_iter(&row[1])
            .map(|cell| cell_text(&cell[1]))
            .collect();
        for pair in cells.chunks_exact(2) {
            let key = pair[0].trim_end_matches(':').trim_end();
            if key.is_empty() {
                continue;
            }
            fields
                .entry(key.to_string())
                .or_insert_with(|| pair[1].clone());
        }
    }
    fields
}

fn cell_text(cell: &str) -> String {
    let text = TAG_RE.replace_all(cell, " ");
    let text = decode_entities(&text);
    SPACE_RE.replace_all(&text, " ").trim().to_string()
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
