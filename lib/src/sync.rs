use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::id::EntityId;
use crate::operation::{Operation, Plan};
use crate::store::{CourseStore, DocumentStore};

/// Store id assigned to an entity that only had a draft id locally.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IdAssignment {
    pub local: EntityId,
    pub id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SyncReport {
    pub applied: usize,
    pub assigned: Vec<IdAssignment>,
}

impl SyncReport {
    /// The store id for `entity`, whether it was persisted already or was
    /// created by this run.
    pub fn resolve<'a>(&'a self, entity: &'a EntityId) -> Option<&'a str> {
        entity.persisted_id().or_else(|| {
            self.assigned
                .iter()
                .find(|assignment| &assignment.local == entity)
                .map(|assignment| assignment.id.as_str())
        })
    }
}

/// A plan stopped at `operation`. Everything before it was written and
/// stays written.
#[derive(Error, Debug, Clone)]
#[error(
    "{operation} failed after {applied} completed operation(s): {source}",
    applied = .report.applied
)]
pub struct SyncError {
    pub operation: Operation,
    pub report: SyncReport,
    #[source]
    pub source: Error,
}

/// Runs `plan` against the store, one operation at a time, and stops at the
/// first failure. Nothing is rolled back.
pub async fn execute<S: DocumentStore>(
    store: &CourseStore<S>,
    course_id: &str,
    plan: &Plan,
) -> std::result::Result<SyncReport, SyncError> {
    let mut report = SyncReport::default();

    for operation in plan.iter() {
        debug!(course_id, %operation, "applying");

        if let Err(source) = apply(store, course_id, operation, &mut report).await {
            return Err(SyncError {
                operation: operation.clone(),
                report,
                source,
            });
        }

        report.applied += 1;
    }

    if !plan.is_empty() {
        info!(course_id, applied = report.applied, "course synced");
    }

    Ok(report)
}

async fn apply<S: DocumentStore>(
    store: &CourseStore<S>,
    course_id: &str,
    operation: &Operation,
    report: &mut SyncReport,
) -> Result<()> {
    match operation {
        Operation::DeleteLesson {
            section_id,
            lesson_id,
        } => store.delete_lesson(course_id, section_id, lesson_id).await,
        Operation::DeleteSection { section_id } => {
            store.delete_section(course_id, section_id).await
        }
        Operation::UpdateSection {
            section_id,
            title,
            order,
        } => {
            store
                .update_section(course_id, section_id, title, *order)
                .await
        }
        Operation::CreateSection {
            section,
            title,
            order,
        } => {
            let id = store.create_section(course_id, title, *order).await?;
            report.assigned.push(IdAssignment {
                local: section.clone(),
                id,
            });

            Ok(())
        }
        Operation::CreateLesson {
            section,
            lesson,
            title,
            order,
            content,
        } => {
            let section_id = report
                .resolve(section)
                .map(str::to_owned)
                .ok_or_else(|| Error::not_found(format!("section {section} was never created")))?;
            let id = store
                .create_lesson(course_id, &section_id, title, *order, content)
                .await?;
            report.assigned.push(IdAssignment {
                local: lesson.clone(),
                id,
            });

            Ok(())
        }
        Operation::UpdateLesson {
            section_id,
            lesson_id,
            title,
            order,
            content,
        } => {
            store
                .update_lesson(course_id, section_id, lesson_id, title, *order, content)
                .await
        }
        Operation::UpdateCourse { update } => store.update_course(course_id, update).await,
    }
}
