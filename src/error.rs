use thiserror::Error;

pub type BindingResult<T> = Result<T, BindingError>;

/// Kind of engine object a binding owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Chart,
    Series,
    PriceLine,
}

impl std::fmt::Display for HandleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Chart => "chart",
            Self::Series => "series",
            Self::PriceLine => "price line",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum BindingError {
    /// The handle was already removed, usually by a parent tearing down first.
    #[error("{kind} handle was already removed")]
    DoubleRemoval { kind: HandleKind },

    #[error("cannot create {kind}: owning handle is not available yet")]
    NotReady { kind: HandleKind },

    #[error("engine failure: {0}")]
    Engine(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl BindingError {
    #[must_use]
    pub fn is_double_removal(&self) -> bool {
        matches!(self, Self::DoubleRemoval { .. })
    }

    #[must_use]
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}

/// Absorbs the double-removal class and hands every other error back.
pub(crate) fn swallow_double_removal(result: BindingResult<()>) -> BindingResult<()> {
    match result {
        Err(err) if err.is_double_removal() => {
            tracing::debug!(error = %err, "ignoring removal of an already removed handle");
            Ok(())
        }
        other => other,
    }
}
