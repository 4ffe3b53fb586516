//! Row-level log output keeps cell contents out unless data logging is on.
//!
//! Lives in its own test binary so the process-wide data logging flag stays
//! at its default.

use std::fs;
use std::io;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

use cts_cli::logging::{REDACTED_VALUE, log_data_enabled};
use cts_cli::pipeline::ingest_events;
use cts_model::PipelineConfig;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn rejected_rows_are_logged_once_without_cell_contents() {
    assert!(!log_data_enabled());
    let dir = TempDir::new().unwrap();
    let events = dir.path().join("lab_data.csv");
    fs::write(
        &events,
        "pseudoid_pid,lab_name,lab_req_date,lab_nval\n\
         P1,Glucose,2021-01-01,5\n\
         P1,CRP,2021-01-02,pos.weakly-7731\n\
         P2,Glucose,date-8842-unknown,9\n",
    )
    .unwrap();
    let mut config = PipelineConfig::default();
    config.events.path = Some(events);

    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let normalized =
        tracing::subscriber::with_default(subscriber, || ingest_events(&config)).unwrap();

    assert_eq!(normalized.events.len(), 2);
    assert_eq!(normalized.rejected.len(), 1);

    let text = logs.text();
    assert_eq!(text.matches("event row rejected").count(), 1, "{text}");
    assert!(text.contains("unparseable_date"), "{text}");
    assert!(text.contains("event value not numeric"), "{text}");
    assert!(text.contains(REDACTED_VALUE), "{text}");
    assert!(!text.contains("date-8842-unknown"), "{text}");
    assert!(!text.contains("pos.weakly-7731"), "{text}");
}
