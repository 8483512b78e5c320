//! Wizard position: which phase the user is in, and which question.

use serde::{Deserialize, Serialize};

/// Where the user is in the wizard.
///
/// Progresses: Questioning(0..N) → CapturingContact → ShowingResult.
/// The question index only exists while questioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum WizardPosition {
    Questioning { index: usize },
    CapturingContact,
    ShowingResult,
}

impl WizardPosition {
    pub fn initial() -> Self {
        Self::Questioning { index: 0 }
    }

    pub fn questioning(index: usize) -> Self {
        Self::Questioning { index }
    }

    pub fn question_index(&self) -> Option<usize> {
        match self {
            Self::Questioning { index } => Some(*index),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ShowingResult)
    }

    /// Anything past the first question counts as progress.
    pub fn has_progress(&self) -> bool {
        *self != Self::initial()
    }

    /// Whether this position can exist in a wizard with `total` questions.
    pub fn is_valid_for(&self, total: usize) -> bool {
        match self {
            Self::Questioning { index } => *index < total,
            _ => true,
        }
    }

    /// Position after answering the current question. `None` unless questioning.
    pub fn advance(&self, total: usize) -> Option<WizardPosition> {
        match self {
            Self::Questioning { index } if index + 1 < total => {
                Some(Self::Questioning { index: index + 1 })
            }
            Self::Questioning { .. } => Some(Self::CapturingContact),
            _ => None,
        }
    }

    /// Position after going back. `None` when back is disabled.
    pub fn back(&self, total: usize) -> Option<WizardPosition> {
        match self {
            Self::Questioning { index } if *index > 0 => {
                Some(Self::Questioning { index: index - 1 })
            }
            Self::CapturingContact if total > 0 => Some(Self::Questioning { index: total - 1 }),
            _ => None,
        }
    }

    /// Step number reported when the wizard is closed.
    pub fn close_step(&self, total: usize) -> usize {
        match self {
            Self::Questioning { index } => *index,
            Self::CapturingContact => total,
            Self::ShowingResult => total + 1,
        }
    }

    /// Progress bar percentage. Questions make up the first 80%.
    pub fn progress_percent(&self, total: usize) -> u8 {
        match self {
            Self::Questioning { index } if total > 0 => (((index + 1) * 80) / total) as u8,
            Self::Questioning { .. } => 0,
            Self::CapturingContact => 90,
            Self::ShowingResult => 100,
        }
    }
}

impl Default for WizardPosition {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for WizardPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Questioning { index } => write!(f, "questioning({index})"),
            Self::CapturingContact => write!(f, "capturing_contact"),
            Self::ShowingResult => write!(f, "showing_result"),
        }
    }
}
