//! Cross-run aggregation of parallel analyzer results.
//!
//! When several analyzer runs (different model variants) scan the same
//! video with identical segment/step parameters, their stores are merged
//! into one averaged timeline: reference times by arithmetic mean, action
//! series by per-timestamp mean vote.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::observation::round1;
use crate::store::ObservationStore;

/// Errors from the aggregation step.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("No observation stores to aggregate")]
    NoStores,
}

/// One reference point's averaged slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedReference {
    pub description: String,
    /// Mean reference time over the stores that committed this key.
    pub reference_time: f64,
    /// How many stores contributed to the mean.
    pub contributing_runs: usize,
}

/// One action step's merged timeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregatedAction {
    pub description: String,
    /// (time, merged score) pairs; score averaged across runs at the same
    /// timestamp, then thresholded at >= 0.5.
    pub score_series: Vec<(f64, u8)>,
    /// (time, mean confidence) pairs; absent confidences count as 0.5.
    pub confidence_series: Vec<(f64, f64)>,
}

/// Averaged view over N observation stores. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStore {
    pub reference_time_registry: BTreeMap<String, AggregatedReference>,
    pub action_registry: BTreeMap<String, AggregatedAction>,
}

/// Merge N stores into one averaged store.
///
/// Reference keys present in only some stores are averaged over the stores
/// that have them (exclude-missing); a warning names the key and the store
/// that lacked it. Action series merge by exact timestamp identity, which
/// assumes all runs used the same segment/step parameters; timestamps seen
/// by only one run are kept with that run's value.
pub fn aggregate(stores: &[ObservationStore]) -> Result<AggregatedStore, AggregateError> {
    if stores.is_empty() {
        return Err(AggregateError::NoStores);
    }

    let mut reference_time_registry = BTreeMap::new();
    let reference_keys: BTreeSet<&String> = stores
        .iter()
        .flat_map(|s| s.reference_time_registry.keys())
        .collect();

    for key in reference_keys {
        let mut times = Vec::new();
        let mut description = String::new();
        for (idx, store) in stores.iter().enumerate() {
            match store.reference_time_registry.get(key) {
                Some(slot) => {
                    times.push(slot.reference_time);
                    if description.is_empty() {
                        description = slot.description.clone();
                    }
                }
                None => warn!(
                    reference_key = %key,
                    store_index = idx,
                    "Store missing reference key; excluded from its average"
                ),
            }
        }

        let mean = round1(times.iter().sum::<f64>() / times.len() as f64);
        reference_time_registry.insert(
            key.clone(),
            AggregatedReference {
                description,
                reference_time: mean,
                contributing_runs: times.len(),
            },
        );
    }

    let mut action_registry = BTreeMap::new();
    let action_keys: BTreeSet<&String> = stores
        .iter()
        .flat_map(|s| s.action_registry.keys())
        .collect();

    for key in action_keys {
        let mut description = String::new();
        // Timestamp (rounded to 0.1s) -> all (score, confidence) pairs
        // contributed by any store at that exact timestamp. Keyed on the
        // 0.1s tick as an integer so float identity is well defined.
        let mut by_tick: BTreeMap<i64, Vec<(u8, f64)>> = BTreeMap::new();

        for store in stores {
            let Some(slot) = store.action_registry.get(key) else {
                continue;
            };
            if description.is_empty() {
                description = slot.description.clone();
            }

            let confidences: BTreeMap<i64, f64> = slot
                .confidence_series
                .iter()
                .map(|&(t, c)| (tick(t), c))
                .collect();

            for &(t, score) in &slot.score_series {
                let tick = tick(t);
                let confidence = confidences.get(&tick).copied().unwrap_or(0.5);
                by_tick.entry(tick).or_default().push((score, confidence));
            }
        }

        let mut score_series = Vec::with_capacity(by_tick.len());
        let mut confidence_series = Vec::with_capacity(by_tick.len());
        for (tick, pairs) in by_tick {
            let t = tick as f64 / 10.0;
            let mean_score =
                pairs.iter().map(|&(s, _)| s as f64).sum::<f64>() / pairs.len() as f64;
            let mean_confidence =
                pairs.iter().map(|&(_, c)| c).sum::<f64>() / pairs.len() as f64;

            score_series.push((t, if mean_score >= 0.5 { 1 } else { 0 }));
            confidence_series.push((t, (mean_confidence * 100.0).round() / 100.0));
        }

        action_registry.insert(
            key.clone(),
            AggregatedAction {
                description,
                score_series,
                confidence_series,
            },
        );
    }

    Ok(AggregatedStore {
        reference_time_registry,
        action_registry,
    })
}

fn tick(t: f64) -> i64 {
    (t * 10.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ActionCatalog, ReferenceCatalog};
    use crate::observation::{Answer, Observation};
    use crate::store::QuestionMap;
    use std::collections::BTreeMap;

    fn store_with(
        reference_time: f64,
        observations: Vec<Observation>,
    ) -> ObservationStore {
        let mut store =
            ObservationStore::new(&ReferenceCatalog::inhaler(), &ActionCatalog::inhaler());
        let mut accumulated = BTreeMap::new();
        accumulated.insert(1, observations);
        let mut map = QuestionMap::new();
        map.insert(1, "sit_stand".to_string());
        store.commit("inhaler_in", reference_time, &accumulated, &map);
        store
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(aggregate(&[]), Err(AggregateError::NoStores)));
    }

    #[test]
    fn test_reference_time_average() {
        let a = store_with(4.0, vec![]);
        let b = store_with(6.0, vec![]);
        let merged = aggregate(&[a, b]).unwrap();
        assert_eq!(
            merged.reference_time_registry["inhaler_in"].reference_time,
            5.0
        );
        assert_eq!(
            merged.reference_time_registry["inhaler_in"].contributing_runs,
            2
        );
    }

    #[test]
    fn test_split_vote_meets_threshold() {
        // Scores 1 and 0 at the same timestamp average to 0.5, which meets
        // the >= 0.5 threshold and merges to 1.
        let a = store_with(0.0, vec![Observation::new(2.0, Answer::Yes, Some(0.9))]);
        let b = store_with(0.0, vec![Observation::new(2.0, Answer::No, Some(0.7))]);
        let merged = aggregate(&[a, b]).unwrap();

        let slot = &merged.action_registry["sit_stand"];
        assert_eq!(slot.score_series, vec![(2.0, 1)]);
        assert_eq!(slot.confidence_series, vec![(2.0, 0.8)]);
    }

    #[test]
    fn test_majority_no_merges_to_zero() {
        let a = store_with(0.0, vec![Observation::new(2.0, Answer::No, None)]);
        let b = store_with(0.0, vec![Observation::new(2.0, Answer::No, None)]);
        let c = store_with(0.0, vec![Observation::new(2.0, Answer::Yes, None)]);
        let merged = aggregate(&[a, b, c]).unwrap();

        let slot = &merged.action_registry["sit_stand"];
        assert_eq!(slot.score_series, vec![(2.0, 0)]);
    }

    #[test]
    fn test_missing_confidence_defaults_to_half() {
        let a = store_with(0.0, vec![Observation::new(1.0, Answer::Yes, None)]);
        let b = store_with(0.0, vec![Observation::new(1.0, Answer::Yes, Some(1.0))]);
        let merged = aggregate(&[a, b]).unwrap();

        let slot = &merged.action_registry["sit_stand"];
        assert_eq!(slot.confidence_series, vec![(1.0, 0.75)]);
    }

    #[test]
    fn test_lone_timestamp_kept() {
        let a = store_with(0.0, vec![Observation::new(1.0, Answer::Yes, Some(0.9))]);
        let b = store_with(0.0, vec![Observation::new(3.0, Answer::No, Some(0.6))]);
        let merged = aggregate(&[a, b]).unwrap();

        let slot = &merged.action_registry["sit_stand"];
        assert_eq!(slot.score_series, vec![(1.0, 1), (3.0, 0)]);
        assert_eq!(slot.confidence_series, vec![(1.0, 0.9), (3.0, 0.6)]);
    }

    #[test]
    fn test_single_store_passthrough() {
        let a = store_with(7.5, vec![Observation::new(0.0, Answer::No, Some(0.4))]);
        let merged = aggregate(&[a]).unwrap();
        assert_eq!(
            merged.reference_time_registry["inhaler_in"].reference_time,
            7.5
        );
        assert_eq!(
            merged.action_registry["sit_stand"].score_series,
            vec![(0.0, 0)]
        );
    }
}
