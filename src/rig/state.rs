/// Evaluation lifecycle of a node.
///
/// Input changes always return to `Stale`; drawing is only meaningful after an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvalState {
    #[default]
    Stale,
    Evaluated,
    Drawn,
}

impl EvalState {
    #[must_use]
    pub const fn on_input_changed(self) -> Self {
        Self::Stale
    }

    #[must_use]
    pub const fn on_evaluate(self) -> Self {
        Self::Evaluated
    }

    /// Drawing a stale node leaves it stale.
    #[must_use]
    pub const fn on_draw(self) -> Self {
        match self {
            Self::Stale => Self::Stale,
            Self::Evaluated | Self::Drawn => Self::Drawn,
        }
    }

    #[must_use]
    pub const fn needs_evaluation(self) -> bool {
        matches!(self, Self::Stale)
    }

    #[must_use]
    pub const fn needs_draw(self) -> bool {
        matches!(self, Self::Evaluated)
    }
}
