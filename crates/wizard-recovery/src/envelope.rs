//! Recovery envelope
//!
//! The persisted unit of workflow state. Step states go on the wire as an
//! ordered list of `[id, state]` pairs so declaration order survives any
//! round trip:
//!
//! ```json
//! {
//!   "currentStep": 2,
//!   "stepStates": [["article-selection", {"id": "article-selection", "isValid": true, ...}]],
//!   "wizardState": {},
//!   "timestamp": 1718000000000,
//!   "version": "1.0.0",
//!   "sessionId": "wizard-1718000000000-k3j9x0a1b"
//! }
//! ```

use crate::config::RecoveryConfig;
use crate::error::RecoveryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wizard_kernel::{StepId, StepState, StepStates, Wizard};

/// Envelope schema version written by this build
pub const ENVELOPE_VERSION: &str = "1.0.0";

/// Versioned, timestamped snapshot of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryEnvelope {
    /// 1-based active step
    pub current_step: usize,
    /// Every step state, in declaration order
    #[serde(with = "state_pairs")]
    pub step_states: StepStates,
    /// Host-owned blob, never interpreted here
    pub wizard_state: Value,
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
    /// Schema version
    pub version: String,
    /// Session that produced the envelope
    pub session_id: String,
}

impl RecoveryEnvelope {
    /// Envelope of the current schema version
    #[must_use]
    pub fn new(
        snapshot: WorkflowSnapshot,
        session_id: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            current_step: snapshot.current_step,
            step_states: snapshot.step_states,
            wizard_state: snapshot.wizard_state,
            timestamp,
            version: ENVELOPE_VERSION.to_string(),
            session_id: session_id.into(),
        }
    }

    /// Serialize to the wire form
    ///
    /// # Errors
    /// Only if the host blob cannot be represented as JSON text
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse stored text, requiring every mandatory field
    ///
    /// Does not check version, age or step bounds; see [`RecoveryEnvelope::check`].
    ///
    /// # Errors
    /// `RecoveryError::Malformed` for invalid JSON, `MissingField` for an
    /// absent or null mandatory field.
    pub fn parse(raw: &str) -> Result<Self, RecoveryError> {
        let wire: WireEnvelope = serde_json::from_str(raw)?;

        let version = wire.version.ok_or(RecoveryError::MissingField("version"))?;
        if version != ENVELOPE_VERSION {
            return Err(RecoveryError::VersionMismatch {
                found: version,
                expected: ENVELOPE_VERSION,
            });
        }
        let current_step = wire
            .current_step
            .ok_or(RecoveryError::MissingField("currentStep"))?;
        let step_states = wire
            .step_states
            .ok_or(RecoveryError::MissingField("stepStates"))?;
        let wizard_state = wire
            .wizard_state
            .ok_or(RecoveryError::MissingField("wizardState"))?;
        let timestamp = wire.timestamp.ok_or(RecoveryError::MissingField("timestamp"))?;

        // Negative or absurd step numbers surface as out of range in `check`
        let current_step = usize::try_from(current_step).unwrap_or(0);

        Ok(Self {
            current_step,
            step_states: step_states.into_iter().collect(),
            wizard_state,
            timestamp,
            version,
            session_id: wire.session_id.unwrap_or_default(),
        })
    }

    /// Acceptance rules: version, age and step bounds
    ///
    /// # Errors
    /// The first rule violated, as a rejection error.
    pub fn check(&self, config: &RecoveryConfig, now_ms: i64) -> Result<(), RecoveryError> {
        if self.version != ENVELOPE_VERSION {
            return Err(RecoveryError::VersionMismatch {
                found: self.version.clone(),
                expected: ENVELOPE_VERSION,
            });
        }

        let age_ms = now_ms.saturating_sub(self.timestamp);
        let max_age_ms = i64::try_from(config.max_age_ms).unwrap_or(i64::MAX);
        if age_ms > max_age_ms {
            return Err(RecoveryError::Expired {
                age_ms,
                max_age_ms: config.max_age_ms,
            });
        }

        if self.current_step == 0 || self.current_step > config.total_steps {
            return Err(RecoveryError::StepOutOfRange {
                step: i64::try_from(self.current_step).unwrap_or(i64::MAX),
                total: config.total_steps,
            });
        }

        Ok(())
    }

    /// Parse and check in one go
    ///
    /// # Errors
    /// Any error of [`RecoveryEnvelope::parse`] or [`RecoveryEnvelope::check`]
    pub fn decode(raw: &str, config: &RecoveryConfig, now_ms: i64) -> Result<Self, RecoveryError> {
        let envelope = Self::parse(raw)?;
        envelope.check(config, now_ms)?;
        Ok(envelope)
    }

    /// Creation time
    #[must_use]
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Split back into the parts a workflow is restored from
    #[must_use]
    pub fn into_snapshot(self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            current_step: self.current_step,
            step_states: self.step_states,
            wizard_state: self.wizard_state,
        }
    }
}

/// Lenient wire shape; absent and null fields both read as `None`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    current_step: Option<i64>,
    step_states: Option<Vec<(StepId, StepState)>>,
    wizard_state: Option<Value>,
    timestamp: Option<i64>,
    version: Option<String>,
    session_id: Option<String>,
}

mod state_pairs {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};
    use wizard_kernel::{StepId, StepState, StepStates};

    pub(super) fn serialize<S: Serializer>(states: &StepStates, s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(states.len()))?;
        for pair in states {
            seq.serialize_element(&pair)?;
        }
        seq.end()
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<StepStates, D::Error> {
        let pairs = Vec::<(StepId, StepState)>::deserialize(d)?;
        Ok(pairs.into_iter().collect())
    }
}

/// Current position, step states and host blob of a running workflow
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSnapshot {
    /// 1-based active step
    pub current_step: usize,
    /// Every step state, in declaration order
    pub step_states: StepStates,
    /// Host-owned blob
    pub wizard_state: Value,
}

impl WorkflowSnapshot {
    /// Snapshot parts directly
    #[inline]
    #[must_use]
    pub fn new(current_step: usize, step_states: StepStates, wizard_state: Value) -> Self {
        Self {
            current_step,
            step_states,
            wizard_state,
        }
    }

    /// Capture a live workflow together with the host's blob
    #[must_use]
    pub fn of(wizard: &Wizard, wizard_state: Value) -> Self {
        let (current_step, step_states) = wizard.snapshot_parts();
        Self::new(current_step, step_states, wizard_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn states() -> StepStates {
        ["b", "a", "c"]
            .into_iter()
            .map(|id| (StepId::from(id), StepState::new(id)))
            .collect()
    }

    fn envelope(timestamp: i64) -> RecoveryEnvelope {
        let snapshot = WorkflowSnapshot::new(2, states(), json!({"mode": "quick"}));
        RecoveryEnvelope::new(snapshot, "wizard-1-abc", timestamp)
    }

    #[test]
    fn step_states_are_written_as_ordered_pairs() {
        let wire: Value = serde_json::from_str(&envelope(0).encode().unwrap()).unwrap();
        let ids: Vec<&str> = wire["stepStates"]
            .as_array()
            .unwrap()
            .iter()
            .map(|pair| pair[0].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(wire["stepStates"][0][1]["lastValidated"], Value::Null);
        assert_eq!(wire["version"], "1.0.0");
    }

    #[test]
    fn parse_reverses_encode() {
        let original = envelope(42);
        let parsed = RecoveryEnvelope::parse(&original.encode().unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn null_wizard_state_counts_as_missing() {
        let mut wire: Value = serde_json::from_str(&envelope(0).encode().unwrap()).unwrap();
        wire["wizardState"] = Value::Null;
        let err = RecoveryEnvelope::parse(&wire.to_string()).unwrap_err();
        assert!(matches!(err, RecoveryError::MissingField("wizardState")));
    }

    #[test]
    fn expiry_boundary() {
        let config = RecoveryConfig::default();
        let max = i64::try_from(config.max_age_ms).unwrap();
        let now = 10 * max;

        assert!(envelope(now - max).check(&config, now).is_ok());
        assert!(matches!(
            envelope(now - max - 1).check(&config, now),
            Err(RecoveryError::Expired { .. })
        ));
    }

    #[test]
    fn step_bounds() {
        let config = RecoveryConfig::default().with_total_steps(3);
        let mut env = envelope(0);
        for (step, ok) in [(0, false), (1, true), (3, true), (4, false)] {
            env.current_step = step;
            assert_eq!(env.check(&config, 0).is_ok(), ok, "step {step}");
        }
    }

    #[test]
    fn version_gate_applies_before_other_fields() {
        let raw = json!({"version": "0.9.0"}).to_string();
        assert!(matches!(
            RecoveryEnvelope::parse(&raw),
            Err(RecoveryError::VersionMismatch { .. })
        ));
    }
}
