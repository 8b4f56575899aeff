//! Where raw records come from: the collection service's download endpoint
//! or the CSV files it leaves in its output directory.

use csv::ReaderBuilder;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::record::{Category, RawRecord, ReportingZone, DOWNLOAD_CATEGORIES};
use crate::stats::CategorizedIndex;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("dataset not found: {0}")]
    NotFound(String),
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("'{0}' cannot be used as an API base URL")]
    InvalidBase(String),
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },
}

/// A collection request for the remote pipeline. Validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub search_word: String,
    pub days_back: u8,
}

pub trait RecordSource: Sync {
    fn fetch(&self, search_word: &str, category: Category) -> Result<Vec<RawRecord>, SourceError>;
}

/// Parse a downloaded dataset. Rows that fail to decode are skipped.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<RawRecord>, SourceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    // Surface a broken header row instead of returning nothing.
    reader.headers()?;

    let mut records = Vec::new();
    for (line_num, row) in reader.deserialize::<RawRecord>().enumerate() {
        match row {
            Ok(record) => records.push(record),
            Err(e) => warn!(
                action = "parse",
                component = "csv_reader",
                line_number = line_num + 2,
                error = %e,
                "Skipping unreadable row"
            ),
        }
    }
    Ok(records)
}

pub fn read_records_from_path(path: &Path) -> Result<Vec<RawRecord>, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_records(file)
}

/// Reads `{search_word}_{Category}.csv` from a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dataset_path(&self, search_word: &str, label: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", search_word, label))
    }
}

impl RecordSource for DirectorySource {
    fn fetch(&self, search_word: &str, category: Category) -> Result<Vec<RawRecord>, SourceError> {
        let path = self.dataset_path(search_word, category.name());
        if !path.exists() {
            return Err(SourceError::NotFound(path.display().to_string()));
        }
        let records = read_records_from_path(&path)?;
        info!(action = "load", component = "directory_source", file_path = ?path, record_count = records.len(), "Loaded dataset");
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct ServerReply {
    message: Option<String>,
    error: Option<String>,
}

/// Talks to the collection service's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base: Url,
    client: Client,
}

impl HttpSource {
    pub fn new(base: &str) -> Result<Self, SourceError> {
        let base = Url::parse(base)?;
        if base.cannot_be_a_base() {
            return Err(SourceError::InvalidBase(base.to_string()));
        }
        Ok(Self {
            base,
            client: Client::new(),
        })
    }

    /// Trigger the remote collect-classify-export job and wait for it.
    pub fn collect(&self, submission: &Submission) -> Result<String, SourceError> {
        let start_time = Instant::now();
        let url = endpoint(&self.base, &["api", "news"])?;
        info!(action = "start", component = "collection", url = %url, search_word = %submission.search_word, days_back = submission.days_back, "Submitting collection job");

        let response = self.client.post(url).json(submission).send()?;
        let status = response.status();
        let message = collection_reply(status, &response.text()?)?;

        info!(
            action = "complete",
            component = "collection",
            duration_ms = start_time.elapsed().as_millis(),
            "Collection job finished"
        );
        Ok(message)
    }
}

impl RecordSource for HttpSource {
    fn fetch(&self, search_word: &str, category: Category) -> Result<Vec<RawRecord>, SourceError> {
        let start_time = Instant::now();
        let url = download_url(&self.base, search_word, category.name())?;
        let response = self.client.get(url.clone()).send()?;
        let status = response.status();
        let records = download_reply(status, &response.text()?)?;
        info!(
            action = "download",
            component = "http_source",
            url = %url,
            record_count = records.len(),
            duration_ms = start_time.elapsed().as_millis(),
            "Downloaded dataset"
        );
        Ok(records)
    }
}

const COLLECT_SUCCESS: &str = "Success: Process completed successfully.";
const COLLECT_FAILURE: &str = "Error: An error occurred.";

fn reply_field(body: &str, field: impl FnOnce(ServerReply) -> Option<String>) -> Option<String> {
    serde_json::from_str::<ServerReply>(body).ok().and_then(field)
}

/// The server's `message` on success, its `error` on failure. A body
/// without the field falls back to a fixed notice.
fn collection_reply(status: StatusCode, body: &str) -> Result<String, SourceError> {
    if !status.is_success() {
        return Err(SourceError::Server {
            status: status.as_u16(),
            message: reply_field(body, |r| r.error).unwrap_or_else(|| COLLECT_FAILURE.to_string()),
        });
    }
    Ok(reply_field(body, |r| r.message).unwrap_or_else(|| COLLECT_SUCCESS.to_string()))
}

/// CSV rows on success. On failure the server's `error` field, or the
/// status line when the body carries none.
fn download_reply(status: StatusCode, body: &str) -> Result<Vec<RawRecord>, SourceError> {
    if !status.is_success() {
        return Err(SourceError::Server {
            status: status.as_u16(),
            message: reply_field(body, |r| r.error).unwrap_or_else(|| status.to_string()),
        });
    }
    read_records(body.as_bytes())
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, SourceError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SourceError::InvalidBase(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// `{base}/api/download/{search_word}?category={label}`, with the search word
/// encoded as a single path segment.
pub fn download_url(base: &Url, search_word: &str, label: &str) -> Result<Url, SourceError> {
    let mut url = endpoint(base, &["api", "download", search_word])?;
    url.query_pairs_mut().append_pair("category", label);
    Ok(url)
}

/// Download URL for every dataset the collection job exports.
pub fn download_links(base: &Url, search_word: &str) -> Result<Vec<(&'static str, Url)>, SourceError> {
    DOWNLOAD_CATEGORIES
        .iter()
        .map(|&label| Ok((label, download_url(base, search_word, label)?)))
        .collect()
}

/// Fetch both tracked categories concurrently and aggregate them. Either
/// failure fails the whole delivery so the chart never sees half a dataset.
pub fn fetch_categorized<S: RecordSource + ?Sized>(
    source: &S,
    search_word: &str,
    zone: ReportingZone,
) -> Result<CategorizedIndex, SourceError> {
    let start_time = Instant::now();
    let (world, business) = rayon::join(
        || source.fetch(search_word, Category::World),
        || source.fetch(search_word, Category::Business),
    );
    let (world, business) = (world?, business?);

    let index = CategorizedIndex::from_records(&world, &business, zone);
    info!(
        action = "complete",
        component = "fetch",
        search_word,
        world_records = world.len(),
        business_records = business.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Fetched and aggregated both categories"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use tempfile::TempDir;

    /// Answer one request on a loopback port with a canned response and
    /// return the base URL to reach it.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            )
            .unwrap();
        });
        format!("http://{}", addr)
    }

    fn submission() -> Submission {
        Submission {
            search_word: "rates".to_string(),
            days_back: 2,
        }
    }

    const CSV: &str = "title,datetime,link,search_word,category,sentiment\n\
Rates rise,2024-03-01 10:00:00,https://a.example/1,rates,World,negative\n\
\"Markets, calm\",2024-03-02 11:00:00,https://a.example/2,rates,World,neutral\n";

    #[test]
    fn test_read_records_ignores_extra_columns() {
        let records = read_records(CSV.as_bytes()).unwrap();
        assert_eq!(
            records,
            vec![
                RawRecord::new("2024-03-01 10:00:00", "World", "negative"),
                RawRecord::new("2024-03-02 11:00:00", "World", "neutral"),
            ]
        );
    }

    #[test]
    fn test_read_records_missing_column_defaults_to_empty() {
        let csv = "datetime,category\n2024-03-01,World\n";
        let records = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records, vec![RawRecord::new("2024-03-01", "World", "")]);
    }

    #[test]
    fn test_read_records_header_only() {
        let csv = "title,datetime,link,search_word,category,sentiment\n";
        assert!(read_records(csv.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_download_url_encodes_search_word() {
        let base = Url::parse("http://localhost:5000").unwrap();
        let url = download_url(&base, "AI / chips", "World").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/download/AI%20%2F%20chips?category=World"
        );
    }

    #[test]
    fn test_download_url_keeps_base_path() {
        let base = Url::parse("http://example.com/news/").unwrap();
        let url = download_url(&base, "rates", "Business").unwrap();
        assert_eq!(
            url.as_str(),
            "http://example.com/news/api/download/rates?category=Business"
        );
    }

    #[test]
    fn test_download_links_cover_every_export() {
        let base = Url::parse("http://localhost:5000").unwrap();
        let links = download_links(&base, "rates").unwrap();
        let labels: Vec<&str> = links.iter().map(|(label, _)| *label).collect();
        assert_eq!(labels, DOWNLOAD_CATEGORIES.to_vec());
        assert!(links[1].1.as_str().ends_with("?category=All"));
    }

    #[test]
    fn test_http_source_rejects_non_base_url() {
        assert!(matches!(
            HttpSource::new("mailto:news@example.com"),
            Err(SourceError::InvalidBase(_))
        ));
    }

    #[test]
    fn test_collection_reply_uses_server_message() {
        let message = collection_reply(StatusCode::OK, r#"{"message": "Collected 40 articles"}"#);
        assert_eq!(message.unwrap(), "Collected 40 articles");

        let message = collection_reply(StatusCode::OK, "done");
        assert_eq!(message.unwrap(), COLLECT_SUCCESS);
    }

    #[test]
    fn test_collection_reply_maps_failures() {
        let err = collection_reply(
            StatusCode::BAD_REQUEST,
            r#"{"error": "Error: Search word is required."}"#,
        )
        .unwrap_err();
        match err {
            SourceError::Server { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Error: Search word is required.");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = collection_reply(StatusCode::INTERNAL_SERVER_ERROR, "<html>boom</html>").unwrap_err();
        match err {
            SourceError::Server { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, COLLECT_FAILURE);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_download_reply_maps_failures() {
        let err = download_reply(StatusCode::NOT_FOUND, r#"{"error": "File not found"}"#).unwrap_err();
        match err {
            SourceError::Server { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "File not found");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = download_reply(StatusCode::BAD_GATEWAY, "").unwrap_err();
        match err {
            SourceError::Server { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, StatusCode::BAD_GATEWAY.to_string());
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(download_reply(StatusCode::OK, CSV).unwrap().len(), 2);
    }

    #[test]
    fn test_http_collect_round_trip() {
        let base = serve_once("200 OK", r#"{"message": "Success: Process completed successfully."}"#);
        let source = HttpSource::new(&base).unwrap();
        assert_eq!(
            source.collect(&submission()).unwrap(),
            "Success: Process completed successfully."
        );

        let base = serve_once("500 Internal Server Error", r#"{"error": "scraper crashed"}"#);
        let source = HttpSource::new(&base).unwrap();
        match source.collect(&submission()) {
            Err(SourceError::Server { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "scraper crashed");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_http_fetch_round_trip() {
        let base = serve_once("200 OK", CSV);
        let source = HttpSource::new(&base).unwrap();
        assert_eq!(source.fetch("rates", Category::World).unwrap().len(), 2);

        let base = serve_once("404 Not Found", r#"{"error": "File not found"}"#);
        let source = HttpSource::new(&base).unwrap();
        match source.fetch("rates", Category::Business) {
            Err(SourceError::Server { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "File not found");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_directory_source_reads_category_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("rates_World.csv"), CSV).unwrap();
        let source = DirectorySource::new(dir.path());

        let records = source.fetch("rates", Category::World).unwrap();
        assert_eq!(records.len(), 2);

        let missing = source.fetch("rates", Category::Business);
        assert!(matches!(missing, Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_fetch_categorized_requires_both() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("rates_World.csv"), CSV).unwrap();
        let source = DirectorySource::new(dir.path());
        assert!(fetch_categorized(&source, "rates", ReportingZone::Utc).is_err());

        fs::write(
            dir.path().join("rates_Business.csv"),
            "datetime,category,sentiment\n2023-07-04 08:00:00,Business,positive\n",
        )
        .unwrap();
        let index = fetch_categorized(&source, "rates", ReportingZone::Utc).unwrap();
        assert_eq!(index.world.years(), vec!["2024"]);
        assert_eq!(index.business.years(), vec!["2023"]);
    }
}
