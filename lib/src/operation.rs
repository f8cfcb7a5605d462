use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::{CourseUpdate, LessonContent};
use crate::id::EntityId;

/// A single store write produced by the reconciler.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    DeleteLesson {
        section_id: String,
        lesson_id: String,
    },
    DeleteSection {
        section_id: String,
    },
    UpdateSection {
        section_id: String,
        title: String,
        order: u32,
    },
    /// `section` is the draft id the section had locally.
    CreateSection {
        section: EntityId,
        title: String,
        order: u32,
    },
    /// `section` may be a draft created earlier in the same plan.
    CreateLesson {
        section: EntityId,
        lesson: EntityId,
        title: String,
        order: u32,
        content: LessonContent,
    },
    UpdateLesson {
        section_id: String,
        lesson_id: String,
        title: String,
        order: u32,
        content: LessonContent,
    },
    UpdateCourse {
        update: CourseUpdate,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::CreateSection { .. } | Self::CreateLesson { .. } => OperationKind::Create,
            Self::UpdateSection { .. } | Self::UpdateLesson { .. } | Self::UpdateCourse { .. } => {
                OperationKind::Update
            }
            Self::DeleteLesson { .. } | Self::DeleteSection { .. } => OperationKind::Delete,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteLesson {
                section_id,
                lesson_id,
            } => write!(f, "delete lesson {section_id}/{lesson_id}"),
            Self::DeleteSection { section_id } => write!(f, "delete section {section_id}"),
            Self::UpdateSection {
                section_id, order, ..
            } => write!(f, "update section {section_id} (order {order})"),
            Self::CreateSection { section, order, .. } => {
                write!(f, "create section {section} (order {order})")
            }
            Self::CreateLesson {
                section,
                lesson,
                order,
                ..
            } => write!(f, "create lesson {section}/{lesson} (order {order})"),
            Self::UpdateLesson {
                section_id,
                lesson_id,
                order,
                ..
            } => write!(f, "update lesson {section_id}/{lesson_id} (order {order})"),
            Self::UpdateCourse { .. } => write!(f, "update course"),
        }
    }
}

/// Ordered list of store writes. Runs front to back.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Plan {
    pub operations: Vec<Operation>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        self.iter().filter(|op| op.kind() == kind).count()
    }

    pub(crate) fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }
}

impl IntoIterator for Plan {
    type Item = Operation;
    type IntoIter = std::vec::IntoIter<Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.into_iter()
    }
}
