use crate::region::RegionTable;
use crate::upstream::{HtmlSource, JsonSource, PlateSource};
use failure::Error;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_UPSTREAM_URL: &str = "https://www.keplaca.com/placa/";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Scrape the public results page.
    Html,
    /// Call a JSON plate API.
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub source: SourceKind,
    pub upstream_url: Url,
    pub user_agent: String,
    pub state_table: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Config, Error> {
        Config::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Config, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match var("PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| format_err!("PORT must be a port number, got {:?}", p))?,
            None => DEFAULT_PORT,
        };
        let ip = match var("BIND_ADDR") {
            Some(a) => a
                .parse::<IpAddr>()
                .map_err(|_| format_err!("BIND_ADDR must be an IP address, got {:?}", a))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };
        let source = match var("PLATE_SOURCE").as_deref() {
            None | Some("html") => SourceKind::Html,
            Some("json") => SourceKind::Json,
            Some(x) => bail!("PLATE_SOURCE must be 'html' or 'json', got {:?}", x),
        };
        let raw_url =
            var("PLATE_UPSTREAM_URL").unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        let mut upstream_url = Url::parse(&raw_url)
            .map_err(|e| format_err!("Invalid PLATE_UPSTREAM_URL {:?}: {}", raw_url, e))?;
        // The plate is joined onto the URL as a final path segment.
        if !upstream_url.path().ends_with('/') {
            let path = format!("{}/", upstream_url.path());
            upstream_url.set_path(&path);
        }

        Ok(Config {
            addr: SocketAddr::new(ip, port),
            source,
            upstream_url,
            user_agent: var("PLATE_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            state_table: var("STATE_TABLE").map(PathBuf::from),
        })
    }

    pub fn plate_source(&self) -> Arc<dyn PlateSource> {
        let base = self.upstream_url.clone();
        let user_agent = self.user_agent.clone();
        match self.source {
            SourceKind::Html => Arc::new(HtmlSource::new(base, user_agent)),
            SourceKind::Json => Arc::new(JsonSource::new(base, user_agent)),
        }
    }

    pub fn region_table(&self) -> Result<RegionTable, Error> {
        match &self.state_table {
            Some(path) => RegionTable::load(path),
            None => Ok(RegionTable::southern()?),
        }
    }
}
