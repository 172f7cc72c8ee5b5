use services::AppServices;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub services: AppServices,
    /// Threshold applied to new assessments that do not name one.
    pub default_passing_score: u32,
}

impl AppState {
    #[must_use]
    pub fn new(services: AppServices, default_passing_score: u32) -> Self {
        Self {
            services,
            default_passing_score,
        }
    }
}
