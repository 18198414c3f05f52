//! A minimal document type shared by the unit tests.

use chrono::{DateTime, Utc};

use crate::SyncDocument;

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub(crate) struct TestDoc {
    pub label: String,
    pub notes: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub(crate) struct TestDocPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
}

impl SyncDocument for TestDoc {
    type Patch = TestDocPatch;

    fn prepare_for_sync(&self, _now: DateTime<Utc>) -> TestDocPatch {
        TestDocPatch {
            label: Some(self.label.clone()),
            notes: Some(self.notes.clone()),
        }
    }

    fn apply_patch(&mut self, patch: TestDocPatch) {
        if let Some(label) = patch.label {
            self.label = label;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }
}
