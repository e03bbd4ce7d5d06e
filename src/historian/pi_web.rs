//! Blocking client for a PI Web API style historian endpoint.

use anyhow::{Result, anyhow};
use chrono::NaiveDateTime;
use std::time::Duration;

use super::{Historian, SeriesHandle};

pub struct PiWebHistorian {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl PiWebHistorian {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| anyhow!("historian request to {url} failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("historian returned status {status}: {body}"));
        }

        response
            .json()
            .map_err(|e| anyhow!("historian response from {url} was not JSON: {e}"))
    }
}

impl Historian for PiWebHistorian {
    fn lookup(&self, series: &str) -> Result<Option<SeriesHandle>> {
        let json = self.get_json("/points", &[("nameFilter", series)])?;

        let Some(item) = json["Items"].as_array().and_then(|items| items.first()) else {
            return Ok(None);
        };

        let id = item["WebId"]
            .as_str()
            .ok_or_else(|| anyhow!("point entry for '{series}' has no WebId"))?
            .to_string();
        let name = item["Name"].as_str().unwrap_or(series).to_string();

        Ok(Some(SeriesHandle { id, name }))
    }

    fn read(&self, handle: &SeriesHandle, at: NaiveDateTime) -> Result<f64> {
        let time = at.format("%Y-%m-%dT%H:%M:%S").to_string();
        let json = self.get_json(
            &format!("/streams/{}/recordedattime", handle.id),
            &[("time", time.as_str())],
        )?;

        // Digital states come back as objects; only numeric samples are usable.
        json["Value"]
            .as_f64()
            .ok_or_else(|| anyhow!("series '{}' value at {time} is not numeric", handle.name))
    }
}
