mod ids;
mod note;
mod pomodoro;
mod subject;
mod task;
mod topic;

pub use ids::{NoteId, ParseIdError, PomodoroSessionId, SubjectId, TaskId, TopicId, UserId};

pub use note::{CreateNote, Note, NoteError, UpdateNote};
pub use pomodoro::{
    CreatePomodoroSession, PomodoroError, PomodoroSession, SessionKind, UpdatePomodoroSession,
};
pub use subject::{CreateSubject, Subject, SubjectError, UpdateSubject};
pub use task::{
    CreateTask, Task, TaskError, TaskParts, TaskPriority, TaskStatus, UpdateTask,
};
pub use topic::{CreateTopic, Topic, TopicError, UpdateTopic, next_topic_order, sort_topics};
