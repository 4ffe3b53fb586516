//! Integration tests for loading the source tables.

use std::fs;
use std::path::PathBuf;

use cts_ingest::{IngestError, load_catalog, load_events, load_patient_list, load_timeline};
use cts_model::{
    CatalogOptions, DatasetKind, EventTableOptions, NumericValue, PatientId, TimelineOptions,
};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

#[test]
fn lab_table_loads_and_sorts() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "lab_data.csv",
        "pseudoid_pid,lab_name,lab_req_date,lab_nval,lab_unit\n\
         P1,Glucose,2021-01-11 07:00:00,7.0,mmol/l\n\
         P1,Glucose,2021-01-01 08:00:00,5.5,mmol/l\n\
         P1,Glucose,2021-01-01 16:00:00,6.5,mmol/l\n\
         P2,CRP,unknown,3,mg/l\n",
    );
    let normalized = load_events(&path, &EventTableOptions::preset(DatasetKind::Lab)).unwrap();
    assert_eq!(normalized.events.len(), 3);
    assert_eq!(normalized.rejected.len(), 1);
    let values: Vec<NumericValue> = normalized.events.iter().map(|e| e.value).collect();
    assert_eq!(
        values,
        vec![
            NumericValue::Value(5.5),
            NumericValue::Value(6.5),
            NumericValue::Value(7.0)
        ]
    );
}

#[test]
fn medication_table_uses_semicolon_preset() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "medication_data.csv",
        "pseudoid_pid;med_atc;med_medication;med_date;med_given_dose;med_dose\n\
         7;B01AB05;Clexane;2021-02-01;;40\n",
    );
    let normalized =
        load_events(&path, &EventTableOptions::preset(DatasetKind::Medication)).unwrap();
    assert_eq!(normalized.events[0].value, NumericValue::Value(40.0));
    assert_eq!(normalized.events[0].label.as_deref(), Some("Clexane"));
}

#[test]
fn missing_required_column_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "lab.csv", "pseudoid_pid,lab_name,lab_req_date\nP1,CRP,2021-01-01\n");
    let err = load_events(&path, &EventTableOptions::default()).unwrap_err();
    assert!(
        matches!(err, IngestError::MissingColumn { ref column, .. } if column == "lab_nval"),
        "{err}"
    );
}

#[test]
fn reference_tables_load() {
    let dir = TempDir::new().unwrap();
    let timeline = write(
        &dir,
        "general_data.csv",
        "pseudoid_pid;date_admission_hosp;discharge_type;date_death\nP1;2021-01-01;Entlassung;\n",
    );
    let catalog = write(&dir, "catalog.csv", "category,feature\nMetabolism,Glucose\n");
    let patients = write(&dir, "patients.csv", "pseudoid_pid\nP1\nP2\nP1\n");

    let timeline = load_timeline(&timeline, &TimelineOptions::default()).unwrap();
    assert!(timeline.timeline.contains(&PatientId::new("P1").unwrap()));

    let catalog = load_catalog(&catalog, &CatalogOptions::default()).unwrap();
    assert_eq!(catalog.category_of("Glucose"), "Metabolism");

    let ids = load_patient_list(&patients, b',', "pseudoid_pid").unwrap();
    assert_eq!(ids.len(), 2);
}
