//! Turns pending edits into an ordered list of store writes.
//!
//! [`reconcile`] is pure: it compares the last fetched server tree with the
//! pending edits and returns a [`Plan`]. Running the plan is the job of
//! [`crate::sync::execute`].
//!
//! Phases, in plan order:
//!
//! 1. Deletions. A deleted section's stored lessons go before the section.
//! 2. Section upserts, in pending order. New sections are numbered after the
//!    highest order among the sections that survive phase 1.
//! 3. Lesson upserts, section by section in final order. New lessons are
//!    numbered after the highest surviving lesson order of their section.
//! 4. The course document, when its details changed or it is being published.

use std::collections::BTreeSet;

use tracing::warn;

use crate::data::{CourseData, CourseDetails, CourseUpdate, LessonData, SectionData};
use crate::id::EntityId;
use crate::operation::{Operation, Plan};
use crate::pending::{LessonKey, PendingChanges};

#[derive(Clone, Debug, Default)]
pub struct ReconcileOptions {
    /// Edited course details, if any.
    pub details: Option<CourseDetails>,
    pub publish: bool,
}

impl ReconcileOptions {
    pub fn publish() -> Self {
        Self {
            details: None,
            publish: true,
        }
    }
}

/// A section as it will stand once the plan has run.
struct Placement<'a> {
    id: EntityId,
    order: u32,
    stored: Option<&'a SectionData>,
}

pub fn reconcile(
    server: &CourseData,
    pending: &PendingChanges,
    options: &ReconcileOptions,
) -> Plan {
    let mut plan = Plan::default();

    plan_deletions(server, pending, &mut plan);
    let placements = plan_sections(server, pending, &mut plan);
    plan_lessons(&placements, pending, &mut plan);

    if options.details.is_some() || options.publish {
        plan.push(Operation::UpdateCourse {
            update: CourseUpdate {
                details: options.details.clone(),
                is_published: options.publish.then_some(true),
                section_count: Some(placements.len() as u32),
                enrollment_count: None,
            },
        });
    }

    plan
}

fn plan_deletions(server: &CourseData, pending: &PendingChanges, plan: &mut Plan) {
    for section_id in &pending.deleted_sections {
        if server.section(&EntityId::persisted(section_id.as_str())).is_none() {
            warn!(section_id = %section_id, "deleted section is not stored, skipping");
        }
    }

    for section in &server.sections {
        let Some(section_id) = section.id.persisted_id() else {
            continue;
        };
        if !pending.deleted_sections.contains(section_id) {
            continue;
        }

        for lesson in &section.lessons {
            if let Some(lesson_id) = lesson.id.persisted_id() {
                plan.push(Operation::DeleteLesson {
                    section_id: section_id.to_owned(),
                    lesson_id: lesson_id.to_owned(),
                });
            }
        }

        plan.push(Operation::DeleteSection {
            section_id: section_id.to_owned(),
        });
    }

    for key in &pending.deleted_lessons {
        if pending.deleted_sections.contains(&key.section_id) {
            continue;
        }

        let stored = server
            .section(&EntityId::persisted(key.section_id.as_str()))
            .and_then(|section| section.lesson(&EntityId::persisted(key.lesson_id.as_str())))
            .is_some();

        if !stored {
            warn!(
                section_id = %key.section_id,
                lesson_id = %key.lesson_id,
                "deleted lesson is not stored, skipping"
            );
            continue;
        }

        plan.push(Operation::DeleteLesson {
            section_id: key.section_id.clone(),
            lesson_id: key.lesson_id.clone(),
        });
    }
}

fn plan_sections<'a>(
    server: &'a CourseData,
    pending: &PendingChanges,
    plan: &mut Plan,
) -> Vec<Placement<'a>> {
    let mut placements = server
        .sections
        .iter()
        .filter_map(|section| {
            let id = section.id.persisted_id()?;
            if pending.deleted_sections.contains(id) {
                return None;
            }

            let order = pending
                .sections
                .iter()
                .find(|change| change.id == section.id)
                .map_or(section.order, |change| change.order);

            Some(Placement {
                id: section.id.clone(),
                order,
                stored: Some(section),
            })
        })
        .collect::<Vec<_>>();

    let mut next_order = placements
        .iter()
        .map(|placement| placement.order)
        .max()
        .unwrap_or(0);

    for change in &pending.sections {
        match change.id.persisted_id() {
            Some(section_id) => {
                if pending.deleted_sections.contains(section_id) {
                    continue;
                }
                if !placements.iter().any(|placement| placement.id == change.id) {
                    warn!(section_id, "edited section is not stored, skipping");
                    continue;
                }

                plan.push(Operation::UpdateSection {
                    section_id: section_id.to_owned(),
                    title: change.title.clone(),
                    order: change.order,
                });
            }
            None => {
                next_order += 1;

                plan.push(Operation::CreateSection {
                    section: change.id.clone(),
                    title: change.title.clone(),
                    order: next_order,
                });
                placements.push(Placement {
                    id: change.id.clone(),
                    order: next_order,
                    stored: None,
                });
            }
        }
    }

    // Stable, so equal orders keep server order followed by pending order.
    placements.sort_by_key(|placement| placement.order);

    placements
}

fn plan_lessons(placements: &[Placement<'_>], pending: &PendingChanges, plan: &mut Plan) {
    for lesson in &pending.lessons {
        let placed = placements
            .iter()
            .any(|placement| placement.id == lesson.section_id);
        let deleted = lesson
            .section_id
            .persisted_id()
            .map_or(false, |id| pending.deleted_sections.contains(id));

        if !placed && !deleted {
            warn!(section = %lesson.section_id, lesson = %lesson.id, "lesson belongs to an unknown section, skipping");
        }
    }

    for placement in placements {
        let deleted_keys = deleted_lessons_of(&placement.id, &pending.deleted_lessons);

        let (new, existing): (Vec<&LessonData>, Vec<&LessonData>) = pending
            .lessons
            .iter()
            .filter(|lesson| lesson.section_id == placement.id)
            .filter(|lesson| {
                lesson
                    .id
                    .persisted_id()
                    .map_or(true, |id| !deleted_keys.contains(id))
            })
            .partition(|lesson| !lesson.id.is_persisted());

        let existing = existing
            .into_iter()
            .filter(|lesson| {
                let stored = placement
                    .stored
                    .map_or(false, |section| section.lesson(&lesson.id).is_some());
                if !stored {
                    warn!(section = %placement.id, lesson = %lesson.id, "edited lesson is not stored, skipping");
                }
                stored
            })
            .collect::<Vec<_>>();

        let max_order = placement
            .stored
            .map(|section| {
                section
                    .lessons
                    .iter()
                    .filter(|lesson| {
                        lesson
                            .id
                            .persisted_id()
                            .map_or(false, |id| !deleted_keys.contains(id))
                    })
                    .map(|lesson| {
                        existing
                            .iter()
                            .find(|edited| edited.id == lesson.id)
                            .map_or(lesson.order, |edited| edited.order)
                    })
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);

        for (index, lesson) in new.into_iter().enumerate() {
            plan.push(Operation::CreateLesson {
                section: placement.id.clone(),
                lesson: lesson.id.clone(),
                title: lesson.title.clone(),
                order: max_order + index as u32 + 1,
                content: lesson.content.clone(),
            });
        }

        let Some(section_id) = placement.id.persisted_id() else {
            continue;
        };
        for lesson in existing {
            let Some(lesson_id) = lesson.id.persisted_id() else {
                continue;
            };

            plan.push(Operation::UpdateLesson {
                section_id: section_id.to_owned(),
                lesson_id: lesson_id.to_owned(),
                title: lesson.title.clone(),
                order: lesson.order,
                content: lesson.content.clone(),
            });
        }
    }
}

fn deleted_lessons_of<'a>(section: &EntityId, deleted: &'a BTreeSet<LessonKey>) -> BTreeSet<&'a str> {
    let Some(section_id) = section.persisted_id() else {
        return BTreeSet::new();
    };

    deleted
        .iter()
        .filter(|key| key.section_id == section_id)
        .map(|key| key.lesson_id.as_str())
        .collect()
}
