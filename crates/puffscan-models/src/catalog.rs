//! Clinical action and reference-point catalogues.
//!
//! The catalogue is an immutable value injected into scanners and stores at
//! construction time. Scan stages reference subsets of it by key, so one
//! catalogue serves every stage instead of per-stage copies.

use serde::{Deserialize, Serialize};

/// One action step: a stable key plus the question text shown to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub key: String,
    pub description: String,
}

/// The fixed catalogue of fine-grained clinical action steps.
///
/// Order is meaningful for reporting, so entries are kept as an ordered
/// sequence and looked up linearly (the catalogue has ~13 entries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCatalog {
    entries: Vec<ActionEntry>,
}

impl ActionCatalog {
    pub fn new(entries: Vec<ActionEntry>) -> Self {
        Self { entries }
    }

    /// The canonical inhaler-usage catalogue.
    pub fn inhaler() -> Self {
        let entries = [
            (
                "sit_stand",
                "Is the user sitting or standing upright? (Consider the user upright even if they are sitting with a slight forward lean.)",
            ),
            (
                "load_dose",
                "Is the user loading the medication? (Consider the user loading the medication if they are manipulating, twisting, or opening the inhaler.)",
            ),
            (
                "remove_cover",
                "Has the user removed the mouthpiece cover? (Consider the user removing the cover if the mouthpiece is visible when the inhaler is positioned near the mouth.)",
            ),
            (
                "inspect_mouthpiece",
                "Is the user inspecting the mouthpiece? (Consider the user inspecting if they are gazing toward the mouthpiece.)",
            ),
            (
                "shake_inhaler",
                "Is the user shaking the inhaler? (Consider the inhaler shaken whenever the hand holding the inhaler shows movement across successive frames.)",
            ),
            ("hold_inhaler", "Is the user holding the inhaler upright?"),
            (
                "exhale_before",
                "Is the user exhaling away from the inhaler? (Consider exhaling if the mouth moves, the head lowers, or the eyes gaze downward.)",
            ),
            (
                "seal_lips",
                "Is the user placing their mouth on the mouthpiece of the inhaler?",
            ),
            (
                "inhale_deeply",
                "Is the user inhaling from the inhaler? (Consider the user inhaling if the inhaler is in their mouth and they appear to be sucking on it.)",
            ),
            (
                "remove_inhaler",
                "Is the user removing the inhaler from their mouth?",
            ),
            (
                "hold_breath",
                "Is the user holding their breath? (Consider the user holding their breath if their mouth stays closed for a while.)",
            ),
            (
                "exhale_after",
                "Is the user exhaling away from the inhaler? (Consider the user exhaling if lips are tighter than in the previous frames.)",
            ),
            (
                "remove_capsule",
                "Is the user removing the capsule? (Consider the user removing the capsule if they are manipulating and focusing on the inhaler as if trying to remove it.)",
            ),
        ];

        Self::new(
            entries
                .iter()
                .map(|(key, description)| ActionEntry {
                    key: key.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        )
    }

    pub fn entries(&self) -> &[ActionEntry] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&ActionEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Question text for a key, if the key exists.
    pub fn description(&self, key: &str) -> Option<&str> {
        self.get(key).map(|e| e.description.as_str())
    }
}

/// One reference point: a stable key plus the question that detects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub key: String,
    pub description: String,
}

/// The catalogue of reference timestamps to locate in a video's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCatalog {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceCatalog {
    pub fn new(entries: Vec<ReferenceEntry>) -> Self {
        Self { entries }
    }

    /// The canonical three reference points of the inhaler workflow.
    pub fn inhaler() -> Self {
        let entries = [
            (
                "inhaler_in",
                "Is the inhaler visible at any point throughout the images?",
            ),
            (
                "face_on_inhaler",
                "Is the person holding an object to the mouth as if using an inhaler?",
            ),
            (
                "inhaler_out",
                "Is the inhaler invisible at any point throughout the images?",
            ),
        ];

        Self::new(
            entries
                .iter()
                .map(|(key, description)| ReferenceEntry {
                    key: key.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        )
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&ReferenceEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn description(&self, key: &str) -> Option<&str> {
        self.get(key).map(|e| e.description.as_str())
    }
}
