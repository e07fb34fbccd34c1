pub mod dashboard;
pub mod health;
pub mod notes;
pub mod pomodoro;
pub mod subjects;
pub mod tasks;
pub mod topics;
