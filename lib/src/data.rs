use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::id::EntityId;

pub const QUIZ_OPTION_COUNT: usize = 4;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CourseType {
    #[default]
    Free,
    Paid,
}

/// The instructor-editable fields of a course.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CourseDetails {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub course_type: CourseType,
    pub requirements: Vec<String>,
    pub thumbnail: Option<String>,
}

impl CourseDetails {
    pub fn check(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("course title is required"));
        }

        if !self.price.is_finite() || self.price < 0.0 {
            return Err(Error::validation(format!(
                "course price {} is not a valid amount",
                self.price
            )));
        }

        if self.course_type == CourseType::Paid && self.price == 0.0 {
            return Err(Error::validation("a paid course needs a price"));
        }

        if self.requirements.iter().any(|req| req.trim().is_empty()) {
            return Err(Error::validation("course requirements cannot be blank"));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CourseData {
    pub id: String,
    pub instructor_id: String,

    #[serde(flatten)]
    pub details: CourseDetails,

    pub enrollment_count: u32,
    pub section_count: u32,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub sections: Vec<SectionData>,
}

impl CourseData {
    pub fn new(id: String, instructor_id: String, details: CourseDetails) -> Self {
        let now = Utc::now();

        Self {
            id,
            instructor_id,
            details,
            enrollment_count: 0,
            section_count: 0,
            is_published: false,
            created_at: now,
            updated_at: now,
            sections: Vec::new(),
        }
    }

    pub fn section(&self, id: &EntityId) -> Option<&SectionData> {
        self.sections.iter().find(|section| &section.id == id)
    }

    pub fn check(&self) -> Result<()> {
        self.details.check()?;

        for section in &self.sections {
            section.check()?;
        }

        Ok(())
    }

    /// Sorts sections and lessons by order and rewrites the orders to `1..=N`.
    /// Entries sharing an order keep their relative position.
    pub fn normalize(&mut self) {
        self.sections.sort_by(|a, b| a.order.cmp(&b.order));
        renumber(&mut self.sections, |section, order| section.order = order);

        for section in self.sections.iter_mut() {
            section.normalize();
        }

        self.section_count = self.sections.len() as u32;
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SectionData {
    pub id: EntityId,
    pub course_id: String,
    pub title: String,
    pub order: u32,

    #[serde(default)]
    pub lessons: Vec<LessonData>,
}

impl SectionData {
    pub fn new(id: EntityId, course_id: String, title: String, order: u32) -> Self {
        Self {
            id,
            course_id,
            title,
            order,
            lessons: Vec::new(),
        }
    }

    pub fn lesson(&self, id: &EntityId) -> Option<&LessonData> {
        self.lessons.iter().find(|lesson| &lesson.id == id)
    }

    pub fn check(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::validation(format!(
                "section {} needs a title",
                self.order
            )));
        }

        for lesson in &self.lessons {
            lesson.check()?;
        }

        Ok(())
    }

    pub fn normalize(&mut self) {
        self.lessons.sort_by(|a, b| a.order.cmp(&b.order));
        renumber(&mut self.lessons, |lesson, order| lesson.order = order);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LessonData {
    pub id: EntityId,
    pub section_id: EntityId,
    pub title: String,
    pub order: u32,
    pub content: LessonContent,
}

impl LessonData {
    pub fn new(
        id: EntityId,
        section_id: EntityId,
        title: String,
        order: u32,
        content: LessonContent,
    ) -> Self {
        Self {
            id,
            section_id,
            title,
            order,
            content,
        }
    }

    pub fn check(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::validation(format!(
                "lesson {} needs a title",
                self.order
            )));
        }

        self.content
            .check()
            .map_err(|err| Error::validation(format!("lesson \"{}\": {err}", self.title)))
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LessonKind {
    Document,
    Video,
    Quiz,
}

impl fmt::Display for LessonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Video => write!(f, "video"),
            Self::Quiz => write!(f, "quiz"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "lesson_type", rename_all = "snake_case")]
pub enum LessonContent {
    Document {
        document: DocumentRef,
    },
    Video {
        video_url: Url,
        duration_minutes: u32,
    },
    Quiz(QuizData),
}

impl LessonContent {
    pub fn kind(&self) -> LessonKind {
        match self {
            Self::Document { .. } => LessonKind::Document,
            Self::Video { .. } => LessonKind::Video,
            Self::Quiz(_) => LessonKind::Quiz,
        }
    }

    fn check(&self) -> std::result::Result<(), String> {
        match self {
            Self::Document {
                document: DocumentRef::Upload { file_name, .. },
            } if file_name.trim().is_empty() => Err("uploaded document has no file name".into()),
            Self::Document { .. } => Ok(()),
            Self::Video {
                duration_minutes, ..
            } if *duration_minutes == 0 => Err("video duration must be at least a minute".into()),
            Self::Video { .. } => Ok(()),
            Self::Quiz(quiz) => quiz.check(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRef {
    Url(Url),
    Upload {
        file_name: String,
        storage_path: String,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QuizData {
    pub title: String,
    pub question_count: u32,
    pub questions: Vec<QuizQuestion>,
}

impl QuizData {
    pub fn new(title: String, questions: Vec<QuizQuestion>) -> Self {
        Self {
            title,
            question_count: questions.len() as u32,
            questions,
        }
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("quiz needs a title".into());
        }

        if self.questions.is_empty() {
            return Err(format!("quiz \"{}\" has no questions", self.title));
        }

        if self.question_count as usize != self.questions.len() {
            return Err(format!(
                "quiz \"{}\" declares {} questions but has {}",
                self.title,
                self.question_count,
                self.questions.len()
            ));
        }

        for (index, question) in self.questions.iter().enumerate() {
            question.check().map_err(|err| format!("question {}: {err}", index + 1))?;
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct QuizQuestion {
    pub text: String,
    pub options: [String; QUIZ_OPTION_COUNT],
    pub correct_option: usize,
    pub explanation: Option<String>,
}

impl QuizQuestion {
    fn check(&self) -> std::result::Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("question text is empty".into());
        }

        if self.options.iter().any(|option| option.trim().is_empty()) {
            return Err(format!(
                "all {QUIZ_OPTION_COUNT} options need text"
            ));
        }

        if self.correct_option >= QUIZ_OPTION_COUNT {
            return Err(format!(
                "correct option {} is out of range",
                self.correct_option
            ));
        }

        Ok(())
    }
}

/// Partial update of the course document. Unset fields are left untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CourseUpdate {
    pub details: Option<CourseDetails>,
    pub is_published: Option<bool>,
    pub section_count: Option<u32>,
    pub enrollment_count: Option<u32>,
}

impl CourseUpdate {
    pub fn is_empty(&self) -> bool {
        self.details.is_none()
            && self.is_published.is_none()
            && self.section_count.is_none()
            && self.enrollment_count.is_none()
    }
}

/// Rewrites orders to `1..=N` following the current slice order.
pub(crate) fn renumber<T>(items: &mut [T], mut set_order: impl FnMut(&mut T, u32)) {
    for (index, item) in items.iter_mut().enumerate() {
        set_order(item, index as u32 + 1);
    }
}

/// Orders by position number first, falling back to the title so listings
/// read back from the store are deterministic.
pub(crate) fn by_order_then_title(
    a_order: u32,
    a_title: &str,
    b_order: u32,
    b_title: &str,
) -> Ordering {
    match a_order.cmp(&b_order) {
        Ordering::Equal => a_title.cmp(b_title),
        ordering => ordering,
    }
}
