#![forbid(unsafe_code)]

pub mod app_services;
pub mod dashboard_service;
pub mod error;
pub mod note_service;
pub mod pomodoro_service;
pub mod subject_service;
pub mod task_service;
pub mod topic_service;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use dashboard_service::DashboardService;
pub use error::{
    AppServicesError, DashboardError, NoteServiceError, PomodoroServiceError,
    SubjectServiceError, TaskServiceError, TopicServiceError,
};
pub use note_service::NoteService;
pub use pomodoro_service::{DEFAULT_SESSION_LIMIT, MAX_SESSION_LIMIT, PomodoroService};
pub use subject_service::SubjectService;
pub use task_service::TaskService;
pub use study_core::{TopicChange, TopicRemoval};
pub use topic_service::TopicService;
