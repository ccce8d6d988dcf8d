//! State

use std::sync::Arc;

use cartkeeper_app::context::AppContext;

use crate::background::Background;

#[derive(Debug, Clone)]
pub(crate) struct State {
    pub(crate) app: AppContext,

    /// Absent when workers are disabled for this process.
    pub(crate) background: Option<Arc<Background>>,
}

impl State {
    #[must_use]
    pub(crate) fn new(app: AppContext, background: Option<Arc<Background>>) -> Self {
        Self { app, background }
    }
}
