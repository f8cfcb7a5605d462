//! Local, unsaved edits to a course's sections and lessons.
//!
//! Nothing in here touches the store. [`ChangeTracker`] keeps the working
//! tree the editor renders and records every mutation into
//! [`PendingChanges`], which the reconciler later turns into store calls.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::{by_order_then_title, renumber, CourseData, LessonContent, LessonData, SectionData};
use crate::id::EntityId;
use crate::sync::IdAssignment;

/// A section edit or addition. Lessons are tracked separately.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SectionChange {
    pub id: EntityId,
    pub title: String,
    pub order: u32,
}

impl From<&SectionData> for SectionChange {
    fn from(section: &SectionData) -> Self {
        Self {
            id: section.id.clone(),
            title: section.title.clone(),
            order: section.order,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LessonKey {
    pub section_id: String,
    pub lesson_id: String,
}

impl LessonKey {
    pub fn new(section_id: impl Into<String>, lesson_id: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            lesson_id: lesson_id.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PendingChanges {
    #[serde(default)]
    pub sections: Vec<SectionChange>,
    #[serde(default)]
    pub deleted_sections: BTreeSet<String>,
    #[serde(default)]
    pub lessons: Vec<LessonData>,
    #[serde(default)]
    pub deleted_lessons: BTreeSet<LessonKey>,
}

impl PendingChanges {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
            && self.deleted_sections.is_empty()
            && self.lessons.is_empty()
            && self.deleted_lessons.is_empty()
    }

    /// Upserts by id. A later change overwrites the fields of an earlier one.
    pub fn record_section_change(&mut self, change: SectionChange) {
        match self.sections.iter_mut().find(|pending| pending.id == change.id) {
            Some(pending) => {
                pending.title = change.title;
                pending.order = change.order;
            }
            None => self.sections.push(change),
        }
    }

    /// Upserts by `(section_id, lesson_id)`.
    pub fn record_lesson_change(&mut self, section_id: &EntityId, mut lesson: LessonData) {
        lesson.section_id = section_id.clone();

        match self
            .lessons
            .iter_mut()
            .find(|pending| pending.section_id == lesson.section_id && pending.id == lesson.id)
        {
            Some(pending) => *pending = lesson,
            None => self.lessons.push(lesson),
        }
    }

    /// Lessons that were never stored are simply forgotten; stored ones are
    /// queued for deletion. Lesson orders are left as they are.
    pub fn record_lesson_deletion(&mut self, section_id: &EntityId, lesson_id: &EntityId) {
        match (section_id.persisted_id(), lesson_id.persisted_id()) {
            (Some(section_id), Some(lesson_id)) => {
                self.deleted_lessons
                    .insert(LessonKey::new(section_id, lesson_id));
            }
            _ => self
                .lessons
                .retain(|lesson| !(&lesson.section_id == section_id && &lesson.id == lesson_id)),
        }
    }

    pub fn reset(&mut self) {
        self.sections.clear();
        self.deleted_sections.clear();
        self.lessons.clear();
        self.deleted_lessons.clear();
    }
}

/// Working copy of a course's sections plus the edits made to it.
#[derive(Clone, Debug, Default)]
pub struct ChangeTracker {
    course_id: String,
    working: Vec<SectionData>,
    pending: PendingChanges,
}

impl ChangeTracker {
    /// Starts from the stored tree, sorted but with its stored orders kept.
    /// Gaps in those orders are closed by the next add, which records every
    /// entity it shifts.
    pub fn open(course: &CourseData) -> Self {
        let mut working = course.sections.clone();
        working.sort_by(|a, b| by_order_then_title(a.order, &a.title, b.order, &b.title));
        for section in working.iter_mut() {
            section
                .lessons
                .sort_by(|a, b| by_order_then_title(a.order, &a.title, b.order, &b.title));
        }

        Self {
            course_id: course.id.clone(),
            working,
            pending: PendingChanges::default(),
        }
    }

    pub fn pending(&self) -> &PendingChanges {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn working_sections(&self) -> &[SectionData] {
        &self.working
    }

    /// Lessons of a section as rendered: sorted, with orders reindexed to
    /// `1..=M` even when deletions left gaps.
    pub fn working_lessons(&self, section_id: &EntityId) -> Vec<LessonData> {
        let mut lessons = self
            .working
            .iter()
            .find(|section| &section.id == section_id)
            .map(|section| section.lessons.clone())
            .unwrap_or_default();

        lessons.sort_by(|a, b| a.order.cmp(&b.order));
        renumber(&mut lessons, |lesson, order| lesson.order = order);

        lessons
    }

    /// Appends a draft section at the end of the working order, renumbering
    /// the sections before it to `1..=N` first.
    pub fn add_section(&mut self, title: impl Into<String>) -> EntityId {
        self.renumber_sections();
        let id = EntityId::draft();

        self.record_section_change(SectionChange {
            id: id.clone(),
            title: title.into(),
            order: self.working.len() as u32 + 1,
        });

        id
    }

    pub fn record_section_change(&mut self, change: SectionChange) {
        match self.working.iter_mut().find(|section| section.id == change.id) {
            Some(section) => {
                section.title = change.title.clone();
                section.order = change.order;
            }
            None => self.working.push(SectionData::new(
                change.id.clone(),
                self.course_id.clone(),
                change.title.clone(),
                change.order,
            )),
        }
        self.working.sort_by(|a, b| a.order.cmp(&b.order));

        self.pending.record_section_change(change);
    }

    /// Removes the section from the working order and renumbers the rest to
    /// `1..=N`. Unknown ids are ignored.
    pub fn record_section_deletion(&mut self, section_id: &EntityId) {
        let Some(index) = self
            .working
            .iter()
            .position(|section| &section.id == section_id)
        else {
            return;
        };

        self.working.remove(index);
        self.pending.sections.retain(|pending| &pending.id != section_id);
        self.pending
            .lessons
            .retain(|lesson| &lesson.section_id != section_id);

        if let Some(id) = section_id.persisted_id() {
            self.pending.deleted_sections.insert(id.to_owned());
        }

        self.renumber_sections();
    }

    /// Appends a draft lesson to a section. Returns `None` if the section is
    /// not part of the working tree.
    ///
    /// Gaps left by earlier lesson deletions are closed here, so the new
    /// lesson lands right after the last visible one.
    pub fn add_lesson(
        &mut self,
        section_id: &EntityId,
        title: impl Into<String>,
        content: LessonContent,
    ) -> Option<EntityId> {
        let lessons = self.working_lessons(section_id);
        self.section_mut(section_id)?;

        for lesson in &lessons {
            let moved = self
                .section_mut(section_id)
                .and_then(|section| section.lesson(&lesson.id))
                .map_or(false, |current| current.order != lesson.order);

            if moved {
                self.record_lesson_change(section_id, lesson.clone());
            }
        }

        let id = EntityId::draft();
        let lesson = LessonData::new(
            id.clone(),
            section_id.clone(),
            title.into(),
            lessons.len() as u32 + 1,
            content,
        );
        self.record_lesson_change(section_id, lesson);

        Some(id)
    }

    /// Upserts a lesson in a section of the working tree. Unknown sections
    /// are ignored.
    pub fn record_lesson_change(&mut self, section_id: &EntityId, lesson: LessonData) {
        let Some(section) = self.section_mut(section_id) else {
            return;
        };

        let mut lesson = lesson;
        lesson.section_id = section_id.clone();

        match section.lessons.iter_mut().find(|current| current.id == lesson.id) {
            Some(current) => *current = lesson.clone(),
            None => section.lessons.push(lesson.clone()),
        }

        self.pending.record_lesson_change(section_id, lesson);
    }

    pub fn record_lesson_deletion(&mut self, section_id: &EntityId, lesson_id: &EntityId) {
        let Some(section) = self.section_mut(section_id) else {
            return;
        };
        let before = section.lessons.len();
        section.lessons.retain(|lesson| &lesson.id != lesson_id);

        if section.lessons.len() != before {
            self.pending.record_lesson_deletion(section_id, lesson_id);
        }
    }

    pub fn reset(&mut self) {
        self.pending.reset();
    }

    /// Swaps draft ids for the store ids a partly failed save assigned, so a
    /// retry updates those entities instead of creating them again.
    pub fn adopt(&mut self, assigned: &[IdAssignment]) {
        let resolve = |id: &mut EntityId| {
            if let Some(assignment) = assigned.iter().find(|assignment| &assignment.local == id) {
                *id = EntityId::persisted(assignment.id.as_str());
            }
        };

        for section in self.working.iter_mut() {
            resolve(&mut section.id);
            for lesson in section.lessons.iter_mut() {
                resolve(&mut lesson.section_id);
                resolve(&mut lesson.id);
            }
        }
        for change in self.pending.sections.iter_mut() {
            resolve(&mut change.id);
        }
        for lesson in self.pending.lessons.iter_mut() {
            resolve(&mut lesson.section_id);
            resolve(&mut lesson.id);
        }
    }

    /// Starts over from a fresh server snapshot, dropping all pending edits.
    pub fn rebase(&mut self, course: &CourseData) {
        *self = Self::open(course);
    }

    /// Records a change for every section whose order is not its position.
    fn renumber_sections(&mut self) {
        let renumbered = self
            .working
            .iter()
            .enumerate()
            .filter(|(index, section)| section.order != *index as u32 + 1)
            .map(|(index, section)| SectionChange {
                order: index as u32 + 1,
                ..SectionChange::from(section)
            })
            .collect::<Vec<_>>();

        for change in renumbered {
            self.record_section_change(change);
        }
    }

    fn section_mut(&mut self, section_id: &EntityId) -> Option<&mut SectionData> {
        self.working
            .iter_mut()
            .find(|section| &section.id == section_id)
    }
}
