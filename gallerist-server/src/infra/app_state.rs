use std::{fmt, ops::Deref, sync::Arc};

use crate::infra::app_context::AppContext;

/// Router state. Cheap to clone; every handler sees the same context.
#[derive(Clone)]
pub struct AppState {
    context: Arc<AppContext>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(context: AppContext) -> Self {
        Self {
            context: Arc::new(context),
        }
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}
