//! Session persistence (§3.3/§6.3, SPEC_FULL A.4): round-trips a
//! [`WaveformSession`] through a human-readable YAML document, the same way
//! `original_source/scout.py` persists a session to disk between runs.
//!
//! The document additionally stores the waveform file path the session was
//! opened against, since a session alone (tree + viewport + markers) is
//! meaningless without knowing which waveform to re-open it over.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{InputError, WaveScoutError, WaveScoutResult};
use crate::session::WaveformSession;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveformSessionDocument {
    /// Schema version, bumped whenever a breaking field change is made, so
    /// `load` can refuse (rather than silently misinterpret) an
    /// incompatible older file.
    pub version: u32,
    pub waveform_path: String,
    pub session: WaveformSession,
}

const CURRENT_VERSION: u32 = 1;

impl WaveformSessionDocument {
    pub fn new(waveform_path: String, session: WaveformSession) -> Self {
        Self {
            version: CURRENT_VERSION,
            waveform_path,
            session,
        }
    }

    pub fn to_yaml(&self) -> WaveScoutResult<String> {
        serde_yaml::to_string(self).map_err(|e| {
            WaveScoutError::Input(InputError::MalformedDocument(format!(
                "cannot serialize session: {e}"
            )))
        })
    }

    pub fn from_yaml(text: &str) -> WaveScoutResult<Self> {
        let mut doc: Self = serde_yaml::from_str(text).map_err(|e| {
            WaveScoutError::Input(InputError::MalformedDocument(format!(
                "invalid session document: {e}"
            )))
        })?;
        if doc.version > CURRENT_VERSION {
            return Err(WaveScoutError::Input(InputError::MalformedDocument(format!(
                "session document version {} is newer than supported version {}",
                doc.version, CURRENT_VERSION
            ))));
        }
        // id_source is #[serde(skip)] and would otherwise restart at 0,
        // colliding with ids already present in the loaded tree.
        doc.session.reseed_id_source();
        Ok(doc)
    }

    pub fn save(&self, path: &Path) -> WaveScoutResult<()> {
        let text = self.to_yaml()?;
        fs::write(path, text).map_err(|e| WaveScoutError::Resource(e.into()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> WaveScoutResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            WaveScoutError::Input(InputError::FileNotFound(format!("{}: {e}", path.display())))
        })?;
        Self::from_yaml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_round_trips_through_yaml() {
        let mut session = WaveformSession::new();
        session.add_root_signal("top.clk".into(), 7);
        let doc = WaveformSessionDocument::new("trace.vcd".into(), session);
        let yaml = doc.to_yaml().unwrap();
        let loaded = WaveformSessionDocument::from_yaml(&yaml).unwrap();
        assert_eq!(loaded.waveform_path, "trace.vcd");
        assert_eq!(loaded.session.root_nodes.len(), 1);
    }

    #[test]
    fn reloaded_session_allocates_ids_past_existing_ones() {
        let mut session = WaveformSession::new();
        session.add_root_signal("top.a".into(), 1);
        session.add_root_signal("top.b".into(), 2);
        let doc = WaveformSessionDocument::new("trace.vcd".into(), session);
        let yaml = doc.to_yaml().unwrap();
        let mut loaded = WaveformSessionDocument::from_yaml(&yaml).unwrap();

        let existing_ids: std::collections::HashSet<_> = loaded.session.nodes.keys().copied().collect();
        let new_id = loaded.session.add_root_signal("top.c".into(), 3);

        assert!(!existing_ids.contains(&new_id), "new id {new_id} collided with a loaded id");
        assert_eq!(loaded.session.nodes.len(), 3);
    }

    #[test]
    fn future_version_is_rejected() {
        let mut session = WaveformSession::new();
        session.add_root_signal("x".into(), 1);
        let mut doc = WaveformSessionDocument::new("x.vcd".into(), session);
        doc.version = CURRENT_VERSION + 1;
        let yaml = doc.to_yaml().unwrap();
        let err = WaveformSessionDocument::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, WaveScoutError::Input(InputError::MalformedDocument(_))));
    }

    #[test]
    fn missing_file_is_input_error() {
        let err = WaveformSessionDocument::load(Path::new("/no/such/session.yaml")).unwrap_err();
        assert!(matches!(err, WaveScoutError::Input(InputError::FileNotFound(_))));
    }
}
