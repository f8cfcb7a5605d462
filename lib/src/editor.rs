//! Course editing session.
//!
//! A [`CourseEditor`] is opened on a stored course, collects local edits in a
//! [`ChangeTracker`] and writes them back on [`CourseEditor::save_draft`] or
//! [`CourseEditor::publish`]. Save failures never escape as errors: they end
//! up in the returned [`SaveOutcome`] and in [`CourseEditor::last_error`],
//! with the pending edits kept for a retry.

use tracing::{error, info, warn};

use crate::data::{CourseData, CourseDetails};
use crate::error::{Error, Result};
use crate::pending::ChangeTracker;
use crate::reconcile::{reconcile, ReconcileOptions};
use crate::store::{CourseStore, DocumentStore};
use crate::sync::{execute, SyncReport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveMode {
    Draft,
    Publish,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(SyncReport),
    /// Rejected before anything was sent to the store.
    Invalid(String),
    /// The store failed part way. Earlier writes are not undone.
    Failed(String),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }
}

pub struct CourseEditor<'a, S> {
    store: &'a CourseStore<S>,
    server: CourseData,
    tracker: ChangeTracker,
    details: Option<CourseDetails>,
    error: Option<String>,
    closed: bool,
}

impl<'a, S: DocumentStore> CourseEditor<'a, S> {
    pub async fn open(store: &'a CourseStore<S>, course_id: &str) -> Result<CourseEditor<'a, S>> {
        let server = store.load_course(course_id).await?;
        let tracker = ChangeTracker::open(&server);

        Ok(Self {
            store,
            server,
            tracker,
            details: None,
            error: None,
            closed: false,
        })
    }

    /// Validates `details` and stores a new, empty, unpublished course.
    pub async fn create_course(
        store: &CourseStore<S>,
        instructor_id: &str,
        details: CourseDetails,
    ) -> Result<CourseData> {
        if instructor_id.trim().is_empty() {
            return Err(Error::validation("a course needs an instructor"));
        }
        details.check()?;

        let course = store.create_course(instructor_id, details).await?;
        info!(course_id = %course.id, instructor_id, "course created");

        Ok(course)
    }

    /// The course as last read from the store.
    pub fn course(&self) -> &CourseData {
        &self.server
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.tracker
    }

    /// Course details as currently edited.
    pub fn details(&self) -> &CourseDetails {
        self.details.as_ref().unwrap_or(&self.server.details)
    }

    pub fn edit_details(&mut self, details: CourseDetails) {
        self.details = (details != self.server.details).then_some(details);
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.tracker.is_empty() || self.details.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Set once a save went through; the editor has nothing left to show.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Leaves without saving. Pending edits are dropped.
    pub fn close(&mut self) {
        if self.has_unsaved_changes() {
            info!(course_id = %self.server.id, "discarding unsaved changes");
        }

        self.tracker.reset();
        self.details = None;
        self.closed = true;
    }

    pub async fn save_draft(&mut self) -> SaveOutcome {
        self.save(SaveMode::Draft).await
    }

    pub async fn publish(&mut self) -> SaveOutcome {
        self.save(SaveMode::Publish).await
    }

    pub async fn save(&mut self, mode: SaveMode) -> SaveOutcome {
        if let Err(err) = self.validate() {
            warn!(course_id = %self.server.id, %err, "save rejected");
            self.error = Some(err.to_string());

            return SaveOutcome::Invalid(err.to_string());
        }

        let options = ReconcileOptions {
            details: self.details.clone(),
            publish: mode == SaveMode::Publish,
        };
        let plan = reconcile(&self.server, self.tracker.pending(), &options);

        match execute(self.store, &self.server.id, &plan).await {
            Ok(report) => {
                info!(course_id = %self.server.id, ?mode, operations = report.applied, "course saved");
                self.error = None;
                self.details = None;
                self.tracker.reset();
                if self.reload().await {
                    self.tracker.rebase(&self.server);
                }
                self.closed = true;

                SaveOutcome::Saved(report)
            }
            Err(err) => {
                error!(course_id = %self.server.id, ?mode, %err, "saving course failed");
                let message = format!("Failed to save course: {}", err.source);
                self.error = Some(message.clone());

                // Writes that went through stay, so the retry plans against them.
                if err.report.applied > 0 {
                    self.tracker.adopt(&err.report.assigned);
                    self.reload().await;
                }

                SaveOutcome::Failed(message)
            }
        }
    }

    fn validate(&self) -> Result<()> {
        self.details().check()?;

        for section in self.tracker.working_sections() {
            section.check()?;
        }

        Ok(())
    }

    /// Re-reads the stored course, keeping the old snapshot on failure.
    async fn reload(&mut self) -> bool {
        match self.store.load_course(&self.server.id).await {
            Ok(course) => {
                self.server = course;
                true
            }
            Err(err) => {
                warn!(course_id = %self.server.id, %err, "reloading course failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn details(title: &str) -> CourseDetails {
        CourseDetails {
            title: title.into(),
            description: "All about it".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_course_validates_first() {
        let store = CourseStore::new(MemoryStore::new());

        let result = CourseEditor::create_course(&store, "inst", details("")).await;

        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(store.inner().is_empty().await);
    }

    #[tokio::test]
    async fn blank_section_title_blocks_save() {
        let store = CourseStore::new(MemoryStore::new());
        let course = CourseEditor::create_course(&store, "inst", details("Rust"))
            .await
            .unwrap();
        let mut editor = CourseEditor::open(&store, &course.id).await.unwrap();
        editor.tracker_mut().add_section(" ");

        let outcome = editor.save_draft().await;

        assert!(matches!(outcome, SaveOutcome::Invalid(_)));
        assert!(editor.last_error().is_some());
        assert!(editor.has_unsaved_changes());
        assert!(store.list_sections(&course.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn publish_sets_the_flag_and_details() {
        let store = CourseStore::new(MemoryStore::new());
        let course = CourseEditor::create_course(&store, "inst", details("Rust"))
            .await
            .unwrap();
        let mut editor = CourseEditor::open(&store, &course.id).await.unwrap();
        editor.edit_details(details("Rust in Practice"));
        editor.tracker_mut().add_section("Getting started");

        let outcome = editor.publish().await;

        assert!(outcome.is_saved());
        assert!(editor.is_closed());
        assert!(!editor.has_unsaved_changes());
        let stored = store.load_course(&course.id).await.unwrap();
        assert!(stored.is_published);
        assert_eq!(stored.details.title, "Rust in Practice");
        assert_eq!(stored.section_count, 1);
        assert_eq!(stored.sections[0].title, "Getting started");
        assert_eq!(editor.course(), &stored);
    }

    #[tokio::test]
    async fn unchanged_details_are_not_pending() {
        let store = CourseStore::new(MemoryStore::new());
        let course = CourseEditor::create_course(&store, "inst", details("Rust"))
            .await
            .unwrap();
        let mut editor = CourseEditor::open(&store, &course.id).await.unwrap();

        editor.edit_details(details("Rust"));

        assert!(!editor.has_unsaved_changes());
    }

    #[tokio::test]
    async fn clearing_the_thumbnail_is_saved() {
        let store = CourseStore::new(MemoryStore::new());
        let with_thumbnail = CourseDetails {
            thumbnail: Some("thumb.png".into()),
            ..details("Rust")
        };
        let course = CourseEditor::create_course(&store, "inst", with_thumbnail)
            .await
            .unwrap();
        let mut editor = CourseEditor::open(&store, &course.id).await.unwrap();

        editor.edit_details(details("Rust"));
        assert!(editor.has_unsaved_changes());
        assert!(editor.save_draft().await.is_saved());

        let stored = store.get_course(&course.id).await.unwrap().unwrap();
        assert_eq!(stored.details.thumbnail, None);
    }

    #[tokio::test]
    async fn close_discards_edits() {
        let store = CourseStore::new(MemoryStore::new());
        let course = CourseEditor::create_course(&store, "inst", details("Rust"))
            .await
            .unwrap();
        let mut editor = CourseEditor::open(&store, &course.id).await.unwrap();
        editor.tracker_mut().add_section("Dropped");

        editor.close();

        assert!(editor.is_closed());
        assert!(!editor.has_unsaved_changes());
        assert!(store.list_sections(&course.id).await.unwrap().is_empty());
    }
}
