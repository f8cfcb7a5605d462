//! Course authoring core for LearnHub.
//!
//! Courses are stored as `courses/{course}/sections/{section}/lessons/{lesson}`
//! in a document store. Instructors edit a course locally through a
//! [`ChangeTracker`]; on save, [`reconcile`] diffs those edits against the
//! last fetched tree and [`execute`] writes the result back in order.
//!
//! ```rust,no_run
//! use learnhub_course_sync::{CourseEditor, CourseStore, MemoryStore};
//!
//! # async fn example() -> learnhub_course_sync::Result<()> {
//! let store = CourseStore::new(MemoryStore::new());
//! let mut editor = CourseEditor::open(&store, "course-id").await?;
//!
//! let intro = editor.tracker_mut().add_section("Introduction");
//! let outcome = editor.save_draft().await;
//! # let _ = (intro, outcome);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod data;
pub mod editor;
pub mod enrollment;
pub mod error;
pub mod id;
pub mod operation;
pub mod pending;
pub mod raw_data;
pub mod reconcile;
pub mod store;
pub mod sync;

pub use catalog::Catalog;
pub use data::{
    CourseData, CourseDetails, CourseType, CourseUpdate, DocumentRef, LessonContent, LessonData,
    LessonKind, QuizData, QuizQuestion, SectionData,
};
pub use editor::{CourseEditor, SaveMode, SaveOutcome};
pub use enrollment::{Enrollment, Enrollments};
pub use error::{Error, Result};
pub use id::EntityId;
pub use operation::{Operation, OperationKind, Plan};
pub use pending::{ChangeTracker, LessonKey, PendingChanges, SectionChange};
pub use reconcile::{reconcile, ReconcileOptions};
pub use store::{CourseStore, DocumentStore, MemoryStore};
pub use sync::{execute, SyncError, SyncReport};
