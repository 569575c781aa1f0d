//! Client for the schedule solver server.
//!
//! All calls are blocking and meant to run on a worker thread. The server
//! answers JSON envelopes of the form `{"status": "success", ...}` or
//! `{"error": "..."}`; progress of a calculation is reported as server-sent
//! events on `/api/stream`.

use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::csv_import::{parse_csv, parse_schedule};
use crate::error::RemoteError;
use crate::model::flight::parse_int;
use crate::model::{ColumnMap, Disruption, FlightRecord, SourceTable};

/// File the solver writes its result to.
pub const SOLUTION_FILE: &str = "new_schedule.csv";

/// Reply envelope shared by every endpoint.
#[derive(Debug, Default, Deserialize)]
struct Reply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl Reply {
    fn summary(self) -> String {
        self.message
            .or(self.status)
            .unwrap_or_else(|| "ok".to_string())
    }
}

fn parse_reply(status: u16, body: &str) -> Result<Reply, RemoteError> {
    let parsed: Option<Reply> = serde_json::from_str(body).ok();
    if !(200..300).contains(&status) {
        let message = parsed
            .and_then(|r| r.error)
            .unwrap_or_else(|| body.trim().to_string());
        return Err(RemoteError::Status { status, message });
    }
    let reply = parsed.ok_or_else(|| {
        RemoteError::Server(format!("unexpected response: {}", body.trim()))
    })?;
    if let Some(error) = reply.error {
        return Err(RemoteError::Server(error));
    }
    Ok(reply)
}

#[derive(Serialize)]
struct UploadBody<'a> {
    file: &'a str,
    #[serde(rename = "dataModified")]
    data_modified: Vec<Map<String, Value>>,
}

#[derive(Serialize)]
struct CalculateBody<'a> {
    file: &'a str,
    is_modified: bool,
}

/// Rows as column → value maps. Integer columns become JSON numbers.
pub fn upload_rows(
    records: &[FlightRecord],
    order: &[String],
    columns: &ColumnMap,
) -> Vec<Map<String, Value>> {
    let integer = |name: &str| {
        name == columns.number
            || name == columns.aircraft
            || name == columns.departure
            || name == columns.arrival
            || columns.numeric.iter().any(|n| n == name)
    };
    records
        .iter()
        .map(|record| {
            order
                .iter()
                .map(|name| {
                    let text = record.field(name, columns).unwrap_or_default();
                    let value = match parse_int(&text) {
                        Some(n) if integer(name) => Value::from(n),
                        _ => Value::String(text),
                    };
                    (name.clone(), value)
                })
                .collect()
        })
        .collect()
}

/// Progress of a running calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverEvent {
    Status(String),
    Completed,
}

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

impl SseEvent {
    /// Map the event onto solver progress. Unparseable messages are skipped.
    pub fn interpret(&self) -> Option<SolverEvent> {
        if self.event == "end" {
            return Some(SolverEvent::Completed);
        }
        if self.event != "message" {
            return None;
        }
        let value: Value = match serde_json::from_str(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(data = %self.data, "skipping malformed progress event: {}", e);
                return None;
            }
        };
        match value.get("status") {
            Some(Value::String(s)) => Some(SolverEvent::Status(s.clone())),
            Some(other) => Some(SolverEvent::Status(other.to_string())),
            None => None,
        }
    }
}

/// Incremental `text/event-stream` parser.
pub struct SseReader<R> {
    inner: R,
    line: String,
}

impl<R: BufRead> SseReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: String::new(),
        }
    }

    /// Next complete event, or `None` at end of stream.
    pub fn next_event(&mut self) -> Result<Option<SseEvent>, RemoteError> {
        let mut event = String::new();
        let mut data: Vec<String> = Vec::new();
        loop {
            self.line.clear();
            if self.inner.read_line(&mut self.line)? == 0 {
                // A trailing event without a blank line is dropped.
                return Ok(None);
            }
            let line = self.line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if data.is_empty() && event.is_empty() {
                    continue;
                }
                return Ok(Some(SseEvent {
                    event: if event.is_empty() {
                        "message".to_string()
                    } else {
                        event
                    },
                    data: data.join("\n"),
                }));
            }
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => event = value.to_string(),
                "data" => data.push(value.to_string()),
                _ => {}
            }
        }
    }
}

/// Blocking HTTP client for the solver server.
#[derive(Debug, Clone)]
pub struct SolverClient {
    base: String,
    http: reqwest::blocking::Client,
}

impl SolverClient {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(None)
            .build()?;
        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn reply(response: reqwest::blocking::Response) -> Result<Reply, RemoteError> {
        let status = response.status().as_u16();
        let body = response.text()?;
        parse_reply(status, &body)
    }

    /// Raw CSV text of a data file.
    pub fn fetch_csv(&self, file: &str) -> Result<String, RemoteError> {
        let response = self
            .http
            .get(self.url("/api/get_data"))
            .query(&[("file", file)])
            .send()?;
        Self::reply(response)?
            .data
            .ok_or_else(|| RemoteError::Server(format!("no data returned for {}", file)))
    }

    pub fn fetch_schedule(&self, file: &str) -> Result<SourceTable, RemoteError> {
        let table = parse_csv(&self.fetch_csv(file)?)?;
        tracing::info!(file, rows = table.rows.len(), "fetched schedule");
        Ok(table)
    }

    /// The solved schedule of the last calculation.
    pub fn fetch_solution(&self, columns: &ColumnMap) -> Result<Vec<FlightRecord>, RemoteError> {
        Ok(parse_schedule(&self.fetch_csv(SOLUTION_FILE)?, columns)?)
    }

    /// Upload the modified track. Returns the server's message.
    pub fn upload_modification(
        &self,
        file: &str,
        records: &[FlightRecord],
        order: &[String],
        columns: &ColumnMap,
    ) -> Result<String, RemoteError> {
        let body = UploadBody {
            file,
            data_modified: upload_rows(records, order, columns),
        };
        let response = self
            .http
            .post(self.url("/api/upload_modification"))
            .json(&body)
            .send()?;
        let summary = Self::reply(response)?.summary();
        tracing::info!(file, flights = records.len(), "uploaded modifications");
        Ok(summary)
    }

    pub fn submit_disruption(&self, disruption: &Disruption) -> Result<String, RemoteError> {
        let response = self
            .http
            .post(self.url("/api/submit_disturbance"))
            .json(disruption)
            .send()?;
        let summary = Self::reply(response)?.summary();
        tracing::info!(kind = disruption.kind.label(), index = %disruption.index, "submitted disruption");
        Ok(summary)
    }

    pub fn start_calculation(&self, file: &str, is_modified: bool) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(self.url("/api/calculate"))
            .json(&CalculateBody { file, is_modified })
            .send()?;
        Self::reply(response)?;
        tracing::info!(file, is_modified, "calculation started");
        Ok(())
    }

    /// Follow the progress stream until the calculation completes or
    /// `cancel` is set. Returns whether the calculation completed.
    pub fn stream_progress(
        &self,
        cancel: &AtomicBool,
        mut on_event: impl FnMut(SolverEvent),
    ) -> Result<bool, RemoteError> {
        let response = self.http.get(self.url("/api/stream")).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("").to_string(),
            });
        }
        follow(SseReader::new(BufReader::new(response)), cancel, &mut on_event)
    }
}

fn follow<R: BufRead>(
    mut reader: SseReader<R>,
    cancel: &AtomicBool,
    on_event: &mut impl FnMut(SolverEvent),
) -> Result<bool, RemoteError> {
    while !cancel.load(Ordering::Relaxed) {
        let Some(event) = reader.next_event()? else {
            return Err(RemoteError::Stream(
                "stream closed before the calculation finished".to_string(),
            ));
        };
        match event.interpret() {
            Some(SolverEvent::Completed) => {
                on_event(SolverEvent::Completed);
                return Ok(true);
            }
            Some(progress) => on_event(progress),
            None => {}
        }
    }
    tracing::info!("stopped listening to calculation progress");
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::tests::table;
    use crate::model::{RecordStore, Track};
    use std::io::Cursor;

    fn reader(text: &str) -> SseReader<Cursor<Vec<u8>>> {
        SseReader::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn test_sse_events() {
        let mut r = reader(
            ": keep-alive\n\ndata: {\"status\": \"running\"}\n\nevent: end\ndata: done\r\n\r\n",
        );
        let first = r.next_event().unwrap().unwrap();
        assert_eq!(first.event, "message");
        assert_eq!(first.interpret(), Some(SolverEvent::Status("running".into())));
        let second = r.next_event().unwrap().unwrap();
        assert_eq!(second.event, "end");
        assert_eq!(second.data, "done");
        assert_eq!(r.next_event().unwrap(), None);
    }

    #[test]
    fn test_sse_multiline_data() {
        let mut r = reader("data: a\ndata:b\nid: 7\n\n");
        assert_eq!(r.next_event().unwrap().unwrap().data, "a\nb");
    }

    #[test]
    fn test_malformed_progress_is_skipped() {
        let event = SseEvent {
            event: "message".into(),
            data: "not json".into(),
        };
        assert_eq!(event.interpret(), None);
        let numeric = SseEvent {
            event: "message".into(),
            data: "{\"status\": 42}".into(),
        };
        assert_eq!(numeric.interpret(), Some(SolverEvent::Status("42".into())));
    }

    #[test]
    fn test_follow_until_end() {
        let cancel = AtomicBool::new(false);
        let mut seen = Vec::new();
        let done = follow(
            reader("data: {\"status\":\"a\"}\n\ndata: oops\n\nevent: end\ndata:\n\n"),
            &cancel,
            &mut |e| seen.push(e),
        )
        .unwrap();
        assert!(done);
        assert_eq!(
            seen,
            vec![SolverEvent::Status("a".into()), SolverEvent::Completed]
        );
    }

    #[test]
    fn test_follow_stream_closed_early() {
        let cancel = AtomicBool::new(false);
        let err = follow(reader("data: {\"status\":\"a\"}\n\n"), &cancel, &mut |_| {}).unwrap_err();
        assert!(matches!(err, RemoteError::Stream(_)));
    }

    #[test]
    fn test_follow_cancelled() {
        let cancel = AtomicBool::new(true);
        let done = follow(reader("event: end\ndata:\n\n"), &cancel, &mut |_| {}).unwrap();
        assert!(!done);
    }

    #[test]
    fn test_parse_reply() {
        let ok = parse_reply(200, r#"{"status":"success","data":"a,b\n1,2"}"#).unwrap();
        assert_eq!(ok.data.as_deref(), Some("a,b\n1,2"));

        let err = parse_reply(404, r#"{"error":"Data file not found"}"#).unwrap_err();
        assert!(matches!(
            err,
            RemoteError::Status { status: 404, ref message } if message == "Data file not found"
        ));

        let err = parse_reply(200, r#"{"error":"boom"}"#).unwrap_err();
        assert!(matches!(err, RemoteError::Server(ref m) if m == "boom"));

        let err = parse_reply(502, "Bad Gateway").unwrap_err();
        assert!(matches!(err, RemoteError::Status { status: 502, ref message } if message == "Bad Gateway"));

        let summary = parse_reply(200, r#"{"status":"success","message":"saved"}"#)
            .unwrap()
            .summary();
        assert_eq!(summary, "saved");
    }

    #[test]
    fn test_upload_rows_types() {
        let mut store = RecordStore::new(ColumnMap::default());
        store.load(&table(&[("CA", 1, 3, 0, 60)])).unwrap();
        let rows = upload_rows(
            store.records(Track::Modified),
            &store.export_order(),
            store.columns(),
        );
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["TYPE"], Value::from("CA"));
        assert_eq!(row["Flight"], Value::from(1));
        assert_eq!(row["AC"], Value::from(3));
        assert_eq!(row["ART"], Value::from(60));
        assert_eq!(row["DEP"], Value::from("PEK"));
        assert_eq!(row["COST"], Value::from(100));
        assert_eq!(row.keys().count(), 8);
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = SolverClient::new("http://localhost:5000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.url("/api/stream"), "http://localhost:5000/api/stream");
    }
}
