//! Patient-partitioned evaluation of per-event work.
//!
//! Every feature is a function of one event and that patient's labs, so
//! events can be split by patient and computed independently. Results are
//! put back in input order, making the output identical to a sequential run.

use crate::table::PatientEvent;
use crossbeam_channel::unbounded;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

/// Bucket event positions by a stable hash of the patient id.
pub fn partition_by_patient(events: &[PatientEvent], partitions: usize) -> Vec<Vec<usize>> {
    let partitions = partitions.max(1);
    let mut buckets = vec![Vec::new(); partitions];
    for (i, event) in events.iter().enumerate() {
        let mut hasher = DefaultHasher::new();
        event.patient_id.hash(&mut hasher);
        buckets[(hasher.finish() % partitions as u64) as usize].push(i);
    }
    buckets
}

/// Apply `f` to every event, spreading patients over `workers` threads.
///
/// With `workers <= 1` this is a plain sequential map.
pub fn map_events<T, F>(events: &[PatientEvent], workers: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&PatientEvent) -> T + Sync,
{
    if workers <= 1 || events.len() < 2 {
        return events.iter().map(&f).collect();
    }

    let buckets = partition_by_patient(events, workers);
    let (tx, rx) = unbounded::<Vec<(usize, T)>>();

    thread::scope(|scope| {
        for bucket in buckets.iter().filter(|b| !b.is_empty()) {
            let tx = tx.clone();
            let f = &f;
            scope.spawn(move || {
                let results = bucket.iter().map(|&i| (i, f(&events[i]))).collect();
                // The receiver lives until after the scope joins.
                let _ = tx.send(results);
            });
        }
    });
    drop(tx);

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(events.len()).collect();
    for batch in rx.iter() {
        for (i, result) in batch {
            slots[i] = Some(result);
        }
    }

    tracing::debug!(
        workers,
        partitions = buckets.iter().filter(|b| !b.is_empty()).count(),
        "partitioned evaluation complete"
    );

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn events() -> Vec<PatientEvent> {
        (0..50)
            .map(|i| {
                PatientEvent::new(format!("P{}", i % 7), Utc.timestamp_opt(i, 0).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_partition_keeps_patients_together() {
        let events = events();
        let buckets = partition_by_patient(&events, 3);

        assert_eq!(buckets.iter().map(Vec::len).sum::<usize>(), events.len());

        let mut owner: HashMap<&str, usize> = HashMap::new();
        for (b, bucket) in buckets.iter().enumerate() {
            for &i in bucket {
                let prev = owner.insert(events[i].patient_id.as_str(), b);
                assert!(prev.map_or(true, |p| p == b));
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let events = events();
        let f = |e: &PatientEvent| format!("{}@{}", e.patient_id, e.event_ts.timestamp());

        let sequential = map_events(&events, 1, f);
        let parallel = map_events(&events, 4, f);

        assert_eq!(sequential, parallel);
        assert_eq!(parallel.len(), events.len());
    }
}
