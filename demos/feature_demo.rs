//! Demonstration of the patient feature functions.
//!
//! This example shows how to:
//! 1. Build small event and lab tables in memory
//! 2. Run the as-of join, sliding-window aggregates and event-window collector
//! 3. Inspect the resulting feature tables
//! 4. Wrap a table in an export envelope with run statistics
//!
//! Run with: cargo run --example feature_demo

use chrono::{DateTime, TimeZone, Utc};

use patient_features::{
    stats::create_shared_stats, AggFunc, AsOfParams, EventWindowParams, ExportBuilder,
    FeatureEngine, FeatureTable, PatientEvent, PatientLab, SlidingWindowParams,
};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn print_table(title: &str, table: &FeatureTable) {
    println!("=== {title} ===");
    println!("  Columns: {}", table.schema.column_names().join(", "));
    for record in table.records() {
        match serde_json::to_string(&record) {
            Ok(line) => println!("    {line}"),
            Err(e) => println!("    <unserializable row: {e}>"),
        }
    }
    println!();
}

fn main() {
    println!("Patient Features - Demo");
    println!("=======================");
    println!();

    let events = vec![
        PatientEvent::new("P1", at(10, 12)).with_attribute("encounter", "ER"),
        PatientEvent::new("P1", at(12, 8)).with_attribute("encounter", "ward"),
        PatientEvent::new("P2", at(11, 9)),
    ];

    let labs = vec![
        PatientLab::new("P1", "glucose", at(9, 6), 5.4),
        PatientLab::new("P1", "glucose", at(10, 11), 7.9),
        PatientLab::new("P1", "glucose", at(11, 20), "6.1"),
        PatientLab::new("P1", "sodium", at(3, 9), 138.0),
        PatientLab::new("P1", "sodium", at(12, 7), "hemolyzed"),
        PatientLab::new("P2", "glucose", at(11, 10), 4.8),
    ];

    println!("Input: {} events, {} labs", events.len(), labs.len());
    println!();

    let lab_types = vec!["glucose".to_string(), "sodium".to_string()];
    let stats = create_shared_stats();
    let engine = FeatureEngine::new(2).with_stats(stats.clone());

    let as_of = match engine.lab_as_of_features(&events, &labs, &AsOfParams::new(lab_types.clone()))
    {
        Ok(table) => table,
        Err(e) => {
            eprintln!("as-of join failed: {e}");
            return;
        }
    };
    print_table("As-of join", &as_of);

    let sliding_params = SlidingWindowParams::new(
        vec![AggFunc::Count, AggFunc::Mean, AggFunc::Max],
        lab_types.clone(),
        vec![1, 7],
    );
    let sliding = match engine.sliding_window_numeric_aggregates(&events, &labs, &sliding_params) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("sliding window failed: {e}");
            return;
        }
    };
    print_table("Sliding window (1d, 7d)", &sliding);

    let window_params = EventWindowParams::new(lab_types, 2 * 86_400);
    let collected = match engine.events_based_lab_features(&events, &labs, &window_params) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("event window failed: {e}");
            return;
        }
    };
    print_table("Event window (48h)", &collected);

    // Show snippet of the export envelope
    let export = ExportBuilder::new().build(&as_of, Some(stats.snapshot()));
    match serde_json::to_string_pretty(&export) {
        Ok(json) => {
            println!("Export envelope (truncated):");
            for line in json.lines().take(20) {
                println!("    {line}");
            }
            println!("    ...");
        }
        Err(e) => eprintln!("failed to serialize export: {e}"),
    }

    println!();
    println!("{}", stats.summary());
    println!();
    println!("Demo complete!");
}
