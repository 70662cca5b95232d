use std::sync::Arc;

use crate::resume::generator::ResumeGenerator;
use crate::resume::store::ResumeStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<ResumeGenerator>,
    /// Same store the generator writes to; read paths go straight here.
    pub store: Arc<dyn ResumeStore>,
}
