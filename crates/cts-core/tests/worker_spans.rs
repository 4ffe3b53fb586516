//! Events emitted on pool workers carry the stage span.
//!
//! Installs a global subscriber, so it lives in its own test binary.

use std::io;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

use cts_core::{WorkerPool, pivot_cohort};
use cts_model::{Aggregation, AnchorTimeline, ClinicalEvent, HospitalStay, NumericValue, PatientId};

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

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
fn pivot_worker_events_are_inside_the_pivot_span() {
    let logs = CapturedLogs::default();
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .with_writer(logs.clone())
        .with_ansi(false)
        .init();

    let admission = NaiveDate::from_ymd_opt(2021, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let ids: Vec<PatientId> = (0..8)
        .map(|n| PatientId::new(format!("P{n}")).unwrap())
        .collect();
    let timeline = AnchorTimeline::from_stays(ids.iter().map(|id| HospitalStay {
        patient_id: id.clone(),
        admission,
        discharge: None,
        discharge_type: None,
        death_date: None,
    }));
    let events: Vec<ClinicalEvent> = ids
        .iter()
        .map(|id| ClinicalEvent::new(id.clone(), "CRP", admission, "1", NumericValue::Value(1.0)))
        .collect();

    let pool = WorkerPool::new(4).unwrap();
    let outcome = pivot_cohort(&events, &timeline, Aggregation::Mean, &pool);
    assert_eq!(outcome.pivots.len(), 8);

    let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| line.contains("patient pivoted"))
        .collect();
    assert_eq!(lines.len(), 8, "{text}");
    for line in lines {
        assert!(line.contains("pivot{"), "{line}");
    }
}
