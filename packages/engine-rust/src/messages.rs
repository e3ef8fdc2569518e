//! Advisory messages for the notification sink.
//!
//! This is the only wire format the engine defines, and it is a display
//! contract, not a persisted schema. Absence of adaptation data produces an
//! empty list, never an error.

use serde::{Deserialize, Serialize};

use codemaster_algo::escape_hatch::EscapeHatchReport;
use codemaster_algo::guard_rails::GuardRailOutcome;
use codemaster_algo::thresholds::ThresholdAdjustment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    ThresholdAdaptation,
    EscapeHatch,
    GuardRail,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThresholdAdaptation => "threshold_adaptation",
            Self::EscapeHatch => "escape_hatch",
            Self::GuardRail => "guard_rail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Encouragement,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptationMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub level: MessageLevel,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

pub fn generate_adaptation_messages(adjustment: &ThresholdAdjustment) -> Vec<AdaptationMessage> {
    adjustment
        .adaptations
        .iter()
        .map(|note| AdaptationMessage {
            kind: MessageKind::ThresholdAdaptation,
            level: MessageLevel::Encouragement,
            title: "Thresholds adjusted to match your pace".to_string(),
            message: note.clone(),
            reason: Some(adjustment.reason.clone()),
            action: None,
        })
        .collect()
}

pub fn generate_escape_hatch_messages(report: &EscapeHatchReport) -> Vec<AdaptationMessage> {
    let mut messages = Vec::new();

    if let Some(session) = &report.session_based {
        messages.push(AdaptationMessage {
            kind: MessageKind::EscapeHatch,
            level: MessageLevel::Encouragement,
            title: "Promotion bar lowered".to_string(),
            message: format!(
                "After {} sessions at this difficulty, promotion now needs {:.0}% accuracy.",
                session.sessions_at_current_difficulty,
                session.adjusted_threshold * 100.0
            ),
            reason: Some("sustained time at the current difficulty".to_string()),
            action: Some("keep practicing; the next promotion check is easier".to_string()),
        });
    }

    for hatch in &report.attempt_based {
        messages.push(AdaptationMessage {
            kind: MessageKind::EscapeHatch,
            level: MessageLevel::Encouragement,
            title: format!("Mastery bar lowered for {}", hatch.tag),
            message: format!(
                "{} failed attempts at {:.0}% accuracy; mastery now needs {:.0}%.",
                hatch.failed_attempts,
                hatch.success_rate * 100.0,
                hatch.adjusted_threshold * 100.0
            ),
            reason: Some("high effort without a mastery breakthrough".to_string()),
            action: Some(format!("review one more {} problem to lock it in", hatch.tag)),
        });
    }

    for hatch in &report.time_based {
        messages.push(AdaptationMessage {
            kind: MessageKind::EscapeHatch,
            level: MessageLevel::Info,
            title: format!("{} has gone quiet", hatch.tag),
            message: format!(
                "No attempts in two weeks at {:.0}% accuracy; mastery now needs {:.0}%.",
                hatch.success_rate * 100.0,
                hatch.adjusted_threshold * 100.0
            ),
            reason: Some("two weeks without progress on this tag".to_string()),
            action: Some(format!("resurface a {} problem this session", hatch.tag)),
        });
    }

    messages
}

pub fn generate_guard_rail_message(outcome: &GuardRailOutcome) -> Option<AdaptationMessage> {
    if !outcome.needs_rebalance {
        return None;
    }
    Some(AdaptationMessage {
        kind: MessageKind::GuardRail,
        level: MessageLevel::Info,
        title: "Session rebalanced".to_string(),
        message: outcome
            .message
            .clone()
            .unwrap_or_else(|| "difficulty mix adjusted".to_string()),
        reason: outcome.guard_rail.map(|rail| rail.as_str().to_string()),
        action: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemaster_algo::escape_hatch::{detect_applicable_escape_hatches, EscapeHatchState};
    use codemaster_algo::thresholds::{
        calculate_adaptive_thresholds, BaseThresholds, MasteryThresholds, StruggleHistory,
    };

    #[test]
    fn no_adaptation_yields_no_messages() {
        let base = BaseThresholds::Mastery(MasteryThresholds::default());
        let adjustment = calculate_adaptive_thresholds(&base, None);
        assert!(generate_adaptation_messages(&adjustment).is_empty());

        let report =
            detect_applicable_escape_hatches(&EscapeHatchState::default(), &[], &[]);
        assert!(generate_escape_hatch_messages(&report).is_empty());

        assert!(generate_guard_rail_message(&GuardRailOutcome::default()).is_none());
    }

    #[test]
    fn each_adaptation_note_becomes_one_message() {
        let base = BaseThresholds::Mastery(MasteryThresholds::default());
        let history = StruggleHistory {
            total_attempts: 16,
            consecutive_struggles: 6,
            ..Default::default()
        };
        let adjustment = calculate_adaptive_thresholds(&base, Some(&history));
        let messages = generate_adaptation_messages(&adjustment);
        assert_eq!(messages.len(), adjustment.adaptations.len());
        assert!(messages
            .iter()
            .all(|m| m.kind == MessageKind::ThresholdAdaptation));
    }

    #[test]
    fn session_hatch_message_carries_the_relaxed_bar() {
        let state = EscapeHatchState {
            sessions_at_current_difficulty: 11,
            ..Default::default()
        };
        let report = detect_applicable_escape_hatches(&state, &[], &[]);
        let messages = generate_escape_hatch_messages(&report);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].message.contains("80%"));
        assert!(messages[0].action.is_some());
    }

    #[test]
    fn serialized_message_uses_the_display_contract_field_names() {
        let message = AdaptationMessage {
            kind: MessageKind::GuardRail,
            level: MessageLevel::Warning,
            title: "t".to_string(),
            message: "m".to_string(),
            reason: Some("r".to_string()),
            action: None,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "guard_rail");
        assert_eq!(json["level"], "warning");
        assert!(json.get("action").is_none());
    }
}
