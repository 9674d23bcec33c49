use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::{Cruise, FileRecord};
use crate::error::AuditError;

/// Read-only access to the two catalog collections. Fetch failures here are
/// fatal for the whole run; no report is produced from partial metadata.
pub trait CatalogClient: Send + Sync {
    fn fetch_cruises(&self) -> Result<Vec<Cruise>, AuditError>;
    fn fetch_files(&self) -> Result<Vec<FileRecord>, AuditError>;
}

#[derive(Clone)]
pub struct CatalogHttpClient {
    client: Client,
    base_url: String,
}

impl CatalogHttpClient {
    pub fn new(base_url: &str) -> Result<Self, AuditError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("hydro-audit/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| AuditError::CatalogHttp(err.to_string()))?,
        );

        if let Ok(token) = std::env::var("CCHDO_API_TOKEN") {
            if !token.trim().is_empty() {
                let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                    .map_err(|err| AuditError::CatalogHttp(err.to_string()))?;
                headers.insert(reqwest::header::AUTHORIZATION, value);
            }
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| AuditError::CatalogHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AuditError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "catalog request");
        let response = self.send_with_retries(&url)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "catalog request failed".to_string());
            return Err(AuditError::CatalogStatus { status, message });
        }
        response
            .json::<T>()
            .map_err(|err| AuditError::CatalogDecode(err.to_string()))
    }

    fn send_with_retries(&self, url: &str) -> Result<reqwest::blocking::Response, AuditError> {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(AuditError::CatalogHttp(err.to_string()));
                }
            }
        }
    }
}

impl CatalogClient for CatalogHttpClient {
    fn fetch_cruises(&self) -> Result<Vec<Cruise>, AuditError> {
        self.get_json("/api/v1/cruise/all")
    }

    fn fetch_files(&self) -> Result<Vec<FileRecord>, AuditError> {
        self.get_json("/api/v1/file/all")
    }
}

pub fn cruises_by_id(cruises: Vec<Cruise>) -> BTreeMap<u64, Cruise> {
    cruises.into_iter().map(|c| (c.id, c)).collect()
}

pub fn files_by_id(files: Vec<FileRecord>) -> BTreeMap<u64, FileRecord> {
    files.into_iter().map(|f| (f.id, f)).collect()
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataFormat, DataType, FileRole};

    #[test]
    fn maps_are_keyed_by_id() {
        let cruises = vec![
            Cruise {
                id: 3,
                expocode: "318M20130321".to_string(),
                start_date: "2013-03-21".to_string(),
            },
            Cruise {
                id: 1,
                expocode: "33RR20160208".to_string(),
                start_date: "2016-02-08".to_string(),
            },
        ];
        let map = cruises_by_id(cruises);
        assert_eq!(map.len(), 2);
        assert_eq!(map[&1].expocode, "33RR20160208");

        let files = vec![FileRecord {
            id: 9,
            data_type: DataType::Bottle,
            data_format: DataFormat::Exchange,
            role: FileRole::Dataset,
            file_name: "a_hy1.csv".to_string(),
            cruises: vec![1],
        }];
        assert_eq!(files_by_id(files)[&9].file_name, "a_hy1.csv");
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(200));
    }
}
