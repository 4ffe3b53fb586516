//! End-to-end tests of the core stages.

use std::fs;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use tempfile::TempDir;

use cts_core::{
    MatrixDirectory, NearestDay, WorkerPool, assemble, day_offset, pivot_cohort, pivot_patient,
};
use cts_ingest::load_events;
use cts_model::{
    Aggregation, AnchorTimeline, ClinicalEvent, DayOffset, DayWindow, EventTableOptions,
    FailureKind, HospitalStay, NumericValue, PatientId,
};

fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn admitted(id: &str, at: NaiveDateTime) -> HospitalStay {
    HospitalStay {
        patient_id: PatientId::new(id).unwrap(),
        admission: at,
        discharge: None,
        discharge_type: None,
        death_date: None,
    }
}

#[test]
fn glucose_events_pivot_to_daily_means() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lab_data.csv");
    fs::write(
        &path,
        "pseudoid_pid,lab_name,lab_req_date,lab_nval\n\
         P1,Glucose,2021-01-01,5.5\n\
         P1,Glucose,2021-01-01,6.5\n\
         P1,Glucose,2021-01-11,7.0\n",
    )
    .unwrap();
    let normalized = load_events(&path, &EventTableOptions::default()).unwrap();
    let timeline = AnchorTimeline::from_stays([admitted("P1", midnight(2021, 1, 1))]);
    let pool = WorkerPool::new(2).unwrap();

    let outcome = pivot_cohort(&normalized.events, &timeline, Aggregation::Mean, &pool);

    assert!(outcome.failures.is_empty());
    let matrix = &outcome.pivots[0].matrix;
    assert_eq!(matrix.features().collect::<Vec<_>>(), vec!["Glucose"]);
    assert_eq!(matrix.value("Glucose", DayOffset::new(0)), Some(6.0));
    assert_eq!(matrix.value("Glucose", DayOffset::new(10)), Some(7.0));
    assert_eq!(matrix.days().len(), 2);
}

#[test]
fn offset_before_anchor_is_negative() {
    let event = ClinicalEvent::new(
        PatientId::new("P1").unwrap(),
        "CRP",
        midnight(2021, 1, 5),
        "1",
        NumericValue::Value(1.0),
    );
    assert_eq!(day_offset(&event, midnight(2021, 1, 10)), DayOffset::new(-5));
}

#[test]
fn window_excludes_days_outside_bounds() {
    let id = PatientId::new("P1").unwrap();
    let anchor = midnight(2021, 1, 1);
    let events: Vec<ClinicalEvent> = [-1, 0, 60, 61]
        .into_iter()
        .map(|day| {
            ClinicalEvent::new(
                id.clone(),
                "CRP",
                anchor + Duration::days(day),
                "1",
                NumericValue::Value(1.0),
            )
        })
        .collect();
    let matrix = pivot_patient(&id, &events, anchor, Aggregation::Mean)
        .restrict(DayWindow::new(0, 60).unwrap());
    let days: Vec<i64> = matrix.days().iter().map(|day| day.get()).collect();
    assert_eq!(days, vec![0, 60]);
}

#[test]
fn missing_patient_files_do_not_stop_assembly() {
    let dir = TempDir::new().unwrap();
    let ids: Vec<PatientId> = (0..10)
        .map(|i| PatientId::new(format!("P{i}")).unwrap())
        .collect();
    for id in ids.iter().filter(|id| !matches!(id.as_str(), "P3" | "P7")) {
        fs::write(
            dir.path().join(id.matrix_file_name()),
            "days,CRP\n0,10\n4,\n10,20\n",
        )
        .unwrap();
    }
    let pool = WorkerPool::new(4).unwrap();

    let outcome = assemble(
        &ids,
        &MatrixDirectory::new(dir.path()),
        DayWindow::new(0, 60).unwrap(),
        &NearestDay::default(),
        &pool,
    );

    assert_eq!(outcome.dataset.len(), 8);
    let failed: Vec<&str> = outcome
        .failures
        .iter()
        .map(|failure| failure.patient_id.as_str())
        .collect();
    assert_eq!(failed, vec!["P3", "P7"]);
    assert!(
        outcome
            .failures
            .iter()
            .all(|failure| failure.kind == FailureKind::MissingPatientFile)
    );
    // day 4 has no value in any file, so it is not a slot
    assert_eq!(outcome.imputed_cells, 0);
}

proptest! {
    #[test]
    fn day_offset_matches_calendar_days(
        anchor_days in 0i64..3000,
        delta in -400i64..400,
        seconds in 0i64..86_400,
    ) {
        let anchor = midnight(2015, 1, 1) + Duration::days(anchor_days);
        let event = ClinicalEvent::new(
            PatientId::new("P").unwrap(),
            "CRP",
            anchor + Duration::days(delta) + Duration::seconds(seconds),
            "",
            NumericValue::Value(0.0),
        );
        prop_assert_eq!(day_offset(&event, anchor).get(), delta);
    }
}
