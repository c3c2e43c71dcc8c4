use std::fmt;

use poise::serenity_prelude::{ChannelId, UserId};

/// Voice-state change applied to every target of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Disconnect,
    Move,
    Mute,
    Unmute,
    Deafen,
    Undeafen,
}

impl OperationKind {
    /// Title used in audit log entries
    pub fn title(self) -> &'static str {
        match self {
            OperationKind::Disconnect => "Voice Disconnect",
            OperationKind::Move => "Voice Move",
            OperationKind::Mute => "Server Mute",
            OperationKind::Unmute => "Server Unmute",
            OperationKind::Deafen => "Server Deafen",
            OperationKind::Undeafen => "Server Undeafen",
        }
    }

    /// Past tense used in per-target success lines
    pub fn past_tense(self) -> &'static str {
        match self {
            OperationKind::Disconnect => "disconnected",
            OperationKind::Move => "moved",
            OperationKind::Mute => "muted",
            OperationKind::Unmute => "unmuted",
            OperationKind::Deafen => "deafened",
            OperationKind::Undeafen => "undeafened",
        }
    }

    pub fn needs_destination(self) -> bool {
        self == OperationKind::Move
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Disconnect => "disconnect",
            OperationKind::Move => "move",
            OperationKind::Mute => "mute",
            OperationKind::Unmute => "unmute",
            OperationKind::Deafen => "deafen",
            OperationKind::Undeafen => "undeafen",
        };
        f.write_str(name)
    }
}

/// How the targets of an operation were addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetScope {
    /// One member named by the invoker
    Single,
    /// Up to [`crate::constants::MAX_BULK_TARGETS`] members named by the invoker
    Bulk,
    /// Every member connected to the source channel at validation time
    Channel(ChannelId),
}

/// A validated moderation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    pub scope: TargetScope,
    pub invoker: UserId,
    /// In request order, duplicates kept
    pub targets: Vec<UserId>,
    /// Only set for moves
    pub destination: Option<ChannelId>,
    pub reason: Option<String>,
}

impl Operation {
    /// Multi-target requests acknowledge the interaction before iterating
    pub fn should_defer(&self) -> bool {
        !matches!(self.scope, TargetScope::Single)
    }
}

/// Result for a single target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    /// Nothing to do, no call was made
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub target: UserId,
    pub status: OutcomeStatus,
}

impl TargetOutcome {
    pub fn success(target: UserId) -> Self {
        Self {
            target,
            status: OutcomeStatus::Success,
        }
    }

    pub fn skipped(target: UserId, reason: impl Into<String>) -> Self {
        Self {
            target,
            status: OutcomeStatus::Skipped(reason.into()),
        }
    }

    pub fn failed(target: UserId, cause: impl Into<String>) -> Self {
        Self {
            target,
            status: OutcomeStatus::Failed(cause.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Aggregated result of an executed operation, one outcome per target in order
#[derive(Debug, Clone)]
pub struct OperationReport {
    pub operation: Operation,
    pub outcomes: Vec<TargetOutcome>,
    /// Destination name at execution time, for messages
    pub destination_name: Option<String>,
}

impl OperationReport {
    pub fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| *s == OutcomeStatus::Success)
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Failed(_)))
    }

    /// One `<@id> -> result` line per target
    pub fn lines(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .map(|outcome| {
                let result = match &outcome.status {
                    OutcomeStatus::Success => match &self.destination_name {
                        Some(dest) if self.operation.kind == OperationKind::Move => {
                            format!("moved to {}", dest)
                        }
                        _ => self.operation.kind.past_tense().to_string(),
                    },
                    OutcomeStatus::Skipped(reason) => format!("skipped: {}", reason),
                    OutcomeStatus::Failed(cause) => format!("error: {}", cause),
                };
                format!("<@{}> -> {}", outcome.target, result)
            })
            .collect()
    }

    /// Short tally, e.g. `2 succeeded, 1 skipped, 0 failed`
    pub fn tally(&self) -> String {
        format!(
            "{} succeeded, {} skipped, {} failed",
            self.succeeded(),
            self.skipped(),
            self.failed()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(kind: OperationKind, outcomes: Vec<TargetOutcome>) -> OperationReport {
        OperationReport {
            operation: Operation {
                kind,
                scope: TargetScope::Bulk,
                invoker: UserId::new(1),
                targets: outcomes.iter().map(|o| o.target).collect(),
                destination: None,
                reason: None,
            },
            outcomes,
            destination_name: Some("Music".to_string()),
        }
    }

    #[test]
    fn test_lines_follow_outcome_order() {
        let r = report(
            OperationKind::Move,
            vec![
                TargetOutcome::success(UserId::new(3)),
                TargetOutcome::skipped(UserId::new(2), "already there"),
                TargetOutcome::failed(UserId::new(5), "Missing Permissions"),
            ],
        );

        assert_eq!(
            r.lines(),
            vec![
                "<@3> -> moved to Music",
                "<@2> -> skipped: already there",
                "<@5> -> error: Missing Permissions",
            ]
        );
        assert_eq!(r.tally(), "1 succeeded, 1 skipped, 1 failed");
    }

    #[test]
    fn test_lines_use_past_tense_for_other_kinds() {
        let r = report(
            OperationKind::Mute,
            vec![TargetOutcome::success(UserId::new(3))],
        );
        assert_eq!(r.lines(), vec!["<@3> -> muted"]);
    }

    #[test]
    fn test_should_defer_only_multi_target() {
        let mut op = report(OperationKind::Mute, vec![]).operation;
        assert!(op.should_defer());
        op.scope = TargetScope::Single;
        assert!(!op.should_defer());
        op.scope = TargetScope::Channel(ChannelId::new(4));
        assert!(op.should_defer());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(OperationKind::Undeafen.to_string(), "undeafen");
        assert!(OperationKind::Move.needs_destination());
        assert!(!OperationKind::Mute.needs_destination());
    }
}
