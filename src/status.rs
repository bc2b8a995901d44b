use crate::clock;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const BILL_STAGES: &[&str] = &["draft", "submitted", "approved", "paid"];
pub const WORKORDER_STAGES: &[&str] = &["draft", "issued", "in-progress", "completed"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub status: String,
    pub changed_at: String,
    pub actor: String,
    pub note: String,
}

// Implemented by workflow-bearing records. set_stage_time must ignore
// stages the record has no timestamp field for (the initial stage).
pub trait StatusBearing {
    fn status(&self) -> &str;
    fn set_status(&mut self, status: &str);
    fn set_stage_time(&mut self, stage: &str, at: Option<String>);
    fn history_mut(&mut self) -> &mut Vec<StatusHistoryEntry>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransitionKind {
    Noop,
    Forward,
    Rollback,
}

#[derive(Debug, Clone, Copy)]
pub struct StatusFlow {
    stages: &'static [&'static str],
}

impl StatusFlow {
    pub fn new(stages: &'static [&'static str]) -> Self {
        Self { stages }
    }

    pub fn initial(&self) -> &'static str {
        self.stages[0]
    }

    pub fn stages(&self) -> &'static [&'static str] {
        self.stages
    }

    fn index_of(&self, status: &str) -> AppResult<usize> {
        self.stages
            .iter()
            .position(|stage| *stage == status)
            .ok_or_else(|| {
                AppError::InvalidTransition(format!(
                    "status '{}' is not in the flow [{}]",
                    status,
                    self.stages.join(", ")
                ))
            })
    }

    // Single forward steps only; rollback to any earlier stage, but only
    // with the caller's explicit confirmation bit. Invalid moves mutate
    // nothing.
    pub fn transition<T: StatusBearing>(
        &self,
        entity: &mut T,
        target: &str,
        actor: &str,
        confirm_rollback: bool,
    ) -> AppResult<()> {
        let from = self.index_of(entity.status())?;
        let to = self.index_of(target)?;

        let kind = if to == from {
            TransitionKind::Noop
        } else if to == from + 1 {
            TransitionKind::Forward
        } else if to < from {
            if !confirm_rollback {
                return Err(AppError::InvalidTransition(format!(
                    "rollback from '{}' to '{}' requires confirmation",
                    self.stages[from], target
                )));
            }
            TransitionKind::Rollback
        } else {
            return Err(AppError::InvalidTransition(format!(
                "cannot skip from '{}' to '{}'",
                self.stages[from], target
            )));
        };

        let now = clock::now_stamp();
        match kind {
            TransitionKind::Noop => {}
            TransitionKind::Forward => {
                entity.set_stage_time(target, Some(now.clone()));
            }
            TransitionKind::Rollback => {
                for stage in &self.stages[to + 1..] {
                    entity.set_stage_time(stage, None);
                }
            }
        }

        entity.set_status(target);
        let note = match kind {
            TransitionKind::Rollback => "Rollback",
            _ => "Status update",
        };
        entity.history_mut().push(StatusHistoryEntry {
            status: target.to_string(),
            changed_at: now,
            actor: actor.to_string(),
            note: note.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Card {
        status: String,
        submitted_at: Option<String>,
        approved_at: Option<String>,
        paid_at: Option<String>,
        history: Vec<StatusHistoryEntry>,
    }

    impl Card {
        fn new() -> Self {
            Self {
                status: "draft".to_string(),
                ..Self::default()
            }
        }
    }

    impl StatusBearing for Card {
        fn status(&self) -> &str {
            &self.status
        }

        fn set_status(&mut self, status: &str) {
            self.status = status.to_string();
        }

        fn set_stage_time(&mut self, stage: &str, at: Option<String>) {
            match stage {
                "submitted" => self.submitted_at = at,
                "approved" => self.approved_at = at,
                "paid" => self.paid_at = at,
                _ => {}
            }
        }

        fn history_mut(&mut self) -> &mut Vec<StatusHistoryEntry> {
            &mut self.history
        }
    }

    fn flow() -> StatusFlow {
        StatusFlow::new(BILL_STAGES)
    }

    fn advance_to_paid(card: &mut Card) {
        for stage in ["submitted", "approved", "paid"] {
            flow().transition(card, stage, "clerk", false).expect(stage);
        }
    }

    #[test]
    fn draft_allows_only_noop_and_submit() {
        let mut card = Card::new();
        flow()
            .transition(&mut card, "draft", "clerk", false)
            .expect("noop");
        flow()
            .transition(&mut card, "submitted", "clerk", false)
            .expect("forward");
        assert_eq!(card.status, "submitted");
        assert!(card.submitted_at.is_some());
    }

    #[test]
    fn forward_jump_is_rejected_without_mutation() {
        let mut card = Card::new();
        let result = flow().transition(&mut card, "approved", "clerk", false);
        assert!(matches!(result, Err(AppError::InvalidTransition(_))));
        assert_eq!(card.status, "draft");
        assert!(card.history.is_empty());
        assert!(card.approved_at.is_none());
    }

    #[test]
    fn rollback_to_draft_clears_every_stage_stamp() {
        let mut card = Card::new();
        advance_to_paid(&mut card);
        assert!(card.paid_at.is_some());

        flow()
            .transition(&mut card, "draft", "auditor", true)
            .expect("rollback");
        assert_eq!(card.status, "draft");
        assert!(card.submitted_at.is_none());
        assert!(card.approved_at.is_none());
        assert!(card.paid_at.is_none());
        assert_eq!(card.history.last().expect("entry").note, "Rollback");
    }

    #[test]
    fn partial_rollback_keeps_stamps_at_or_below_the_target() {
        let mut card = Card::new();
        advance_to_paid(&mut card);

        flow()
            .transition(&mut card, "submitted", "auditor", true)
            .expect("rollback");
        assert!(card.submitted_at.is_some());
        assert!(card.approved_at.is_none());
        assert!(card.paid_at.is_none());
    }

    #[test]
    fn rollback_without_confirmation_is_refused() {
        let mut card = Card::new();
        advance_to_paid(&mut card);
        let result = flow().transition(&mut card, "draft", "auditor", false);
        assert!(matches!(result, Err(AppError::InvalidTransition(_))));
        assert_eq!(card.status, "paid");
    }

    #[test]
    fn history_grows_by_one_per_valid_transition_including_noops() {
        let mut card = Card::new();
        flow()
            .transition(&mut card, "draft", "clerk", false)
            .expect("noop");
        flow()
            .transition(&mut card, "submitted", "clerk", false)
            .expect("submit");
        flow()
            .transition(&mut card, "submitted", "clerk", false)
            .expect("noop");
        flow()
            .transition(&mut card, "approved", "head", false)
            .expect("approve");

        assert_eq!(card.history.len(), 4);
        assert_eq!(card.history.last().expect("entry").status, card.status);
    }

    #[test]
    fn unknown_status_is_invalid() {
        let mut card = Card::new();
        let result = flow().transition(&mut card, "archived", "clerk", false);
        assert!(matches!(result, Err(AppError::InvalidTransition(_))));
    }

    #[test]
    fn workorder_flow_enforces_the_same_rules() {
        #[derive(Default)]
        struct Order {
            status: String,
            history: Vec<StatusHistoryEntry>,
        }
        impl StatusBearing for Order {
            fn status(&self) -> &str {
                &self.status
            }
            fn set_status(&mut self, status: &str) {
                self.status = status.to_string();
            }
            fn set_stage_time(&mut self, _stage: &str, _at: Option<String>) {}
            fn history_mut(&mut self) -> &mut Vec<StatusHistoryEntry> {
                &mut self.history
            }
        }

        let flow = StatusFlow::new(WORKORDER_STAGES);
        let mut order = Order {
            status: flow.initial().to_string(),
            history: Vec::new(),
        };
        flow.transition(&mut order, "issued", "engineer", false)
            .expect("issue");
        assert!(flow
            .transition(&mut order, "completed", "engineer", false)
            .is_err());
    }
}
