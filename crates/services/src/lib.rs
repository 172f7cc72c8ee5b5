#![forbid(unsafe_code)]

pub mod activity_service;
pub mod app_services;
pub mod assessment_service;
pub mod auth_service;
pub mod badge_service;
pub mod dashboard_service;
pub mod error;
pub mod leaderboard_service;
pub mod module_service;
pub mod progress_service;
pub mod seed;

pub use aware_core::Clock;

pub use activity_service::{ActivityResult, ActivityService};
pub use app_services::{AppServices, ServiceSettings};
pub use assessment_service::{AssessmentService, Submission, SubmissionResult};
pub use auth_service::{AuthClaims, AuthService, AuthSession, Registration};
pub use badge_service::{BadgeDraft, BadgeService};
pub use dashboard_service::{DashboardService, DashboardSummary};
pub use error::{
    ActivityServiceError, AppServicesError, AssessmentServiceError, AuthError,
    BadgeServiceError, ModuleServiceError, ProgressServiceError, SeedError,
};
pub use leaderboard_service::LeaderboardService;
pub use module_service::{AssessmentSummary, ModuleDetail, ModuleService};
pub use progress_service::{ProgressService, ProgressUpdate};
pub use seed::{SeedReport, seed_catalog};
