//! The observation store ("prompt bank").
//!
//! Each analyzer run owns one store. Reference times are written once per
//! key when a scan halts; action observations accumulate batch-by-batch as
//! scans commit their accumulated question answers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::{ActionCatalog, ReferenceCatalog};
use crate::observation::Observation;

/// Reference time meaning "not found in this video".
pub const REFERENCE_TIME_NOT_FOUND: f64 = -1.0;

/// Mapping from sub-question index (Q1..Qn) to an action catalogue key.
///
/// Different scan stages map different subsets of the catalogue, so the map
/// is expected to be partial relative to the accumulated answers.
pub type QuestionMap = BTreeMap<u32, String>;

/// One reference point's slot in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSlot {
    pub description: String,
    /// Seconds; 0.0 until committed, -1.0 when the scan found nothing.
    pub reference_time: f64,
}

/// One action step's accumulated series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionSlot {
    pub description: String,
    /// (time, score) pairs, score 1 for YES and 0 for NO.
    pub score_series: Vec<(f64, u8)>,
    /// (time, confidence) pairs; only present where the model reported one.
    pub confidence_series: Vec<(f64, f64)>,
}

/// Keyed store of reference times and action observations for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationStore {
    pub reference_time_registry: BTreeMap<String, ReferenceSlot>,
    pub action_registry: BTreeMap<String, ActionSlot>,
}

impl ObservationStore {
    /// Create a store with slots for every catalogue entry.
    pub fn new(references: &ReferenceCatalog, actions: &ActionCatalog) -> Self {
        let reference_time_registry = references
            .entries()
            .iter()
            .map(|e| {
                (
                    e.key.clone(),
                    ReferenceSlot {
                        description: e.description.clone(),
                        reference_time: 0.0,
                    },
                )
            })
            .collect();

        let action_registry = actions
            .entries()
            .iter()
            .map(|e| {
                (
                    e.key.clone(),
                    ActionSlot {
                        description: e.description.clone(),
                        ..Default::default()
                    },
                )
            })
            .collect();

        Self {
            reference_time_registry,
            action_registry,
        }
    }

    /// Commit one completed scan into the store.
    ///
    /// Writes the reference time (last writer wins) and appends every
    /// accumulated observation whose question index appears in the map.
    /// Unmapped question indices are dropped: stages only map the subset of
    /// the catalogue they ask about. A mapped index pointing at a key the
    /// catalogue does not know is dropped with a warning.
    pub fn commit(
        &mut self,
        reference_key: &str,
        reference_time: f64,
        accumulated: &BTreeMap<u32, Vec<Observation>>,
        question_map: &QuestionMap,
    ) {
        match self.reference_time_registry.get_mut(reference_key) {
            Some(slot) => slot.reference_time = reference_time,
            None => {
                warn!(
                    reference_key = %reference_key,
                    "Commit for unknown reference key; reference time dropped"
                );
            }
        }

        for (question, action_key) in question_map {
            let Some(observations) = accumulated.get(question) else {
                continue;
            };

            let Some(slot) = self.action_registry.get_mut(action_key) else {
                warn!(
                    question = question,
                    action_key = %action_key,
                    "Question mapped to unknown action key; observations dropped"
                );
                continue;
            };

            for obs in observations {
                slot.score_series.push((obs.time, obs.answer.score()));
                if let Some(confidence) = obs.confidence {
                    slot.confidence_series.push((obs.time, confidence));
                }
            }
        }
    }

    /// Reference time for a key, if the key exists.
    pub fn reference_time(&self, key: &str) -> Option<f64> {
        self.reference_time_registry
            .get(key)
            .map(|s| s.reference_time)
    }
}
