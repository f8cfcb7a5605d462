use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::data::{
    CourseData, CourseDetails, CourseType, CourseUpdate, DocumentRef, LessonContent, LessonData,
    LessonKind, QuizData, QuizQuestion, SectionData, QUIZ_OPTION_COUNT,
};
use crate::error::{Error, Result};
use crate::id::EntityId;
use crate::store::Document;

pub fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(Error::decode(format!("expected an object, got {other}"))),
    }
}

pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T> {
    Ok(serde_json::from_value(serde_json::Value::Object(document))?)
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RawCourseDocument {
    pub instructor_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub course_type: CourseType,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub enrollment_count: u32,
    #[serde(default)]
    pub section_count: u32,
    #[serde(default)]
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RawCourseDocument {
    pub fn into_course(self, id: String) -> CourseData {
        CourseData {
            id,
            instructor_id: self.instructor_id,
            details: CourseDetails {
                title: self.title,
                description: self.description,
                price: self.price,
                course_type: self.course_type,
                requirements: self.requirements,
                thumbnail: self.thumbnail,
            },
            enrollment_count: self.enrollment_count,
            section_count: self.section_count,
            is_published: self.is_published,
            created_at: self.created_at,
            updated_at: self.updated_at,
            sections: Vec::new(),
        }
    }
}

impl From<&CourseData> for RawCourseDocument {
    fn from(data: &CourseData) -> Self {
        Self {
            instructor_id: data.instructor_id.clone(),
            title: data.details.title.clone(),
            description: data.details.description.clone(),
            price: data.details.price,
            course_type: data.details.course_type,
            requirements: data.details.requirements.clone(),
            thumbnail: data.details.thumbnail.clone(),
            enrollment_count: data.enrollment_count,
            section_count: data.section_count,
            is_published: data.is_published,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }
}

/// Fields written by a partial course update; `updated_at` is always set.
#[derive(Serialize, Debug)]
pub struct RawCourseUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_type: Option<CourseType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<String>>,
    /// Written as `null` to clear a stored thumbnail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_count: Option<u32>,
    pub updated_at: DateTime<Utc>,
}

impl RawCourseUpdate {
    pub fn new(update: &CourseUpdate, updated_at: DateTime<Utc>) -> Self {
        let details = update.details.clone();
        let (title, description, price, course_type, requirements, thumbnail) = match details {
            Some(details) => (
                Some(details.title),
                Some(details.description),
                Some(details.price),
                Some(details.course_type),
                Some(details.requirements),
                Some(details.thumbnail),
            ),
            None => (None, None, None, None, None, None),
        };

        Self {
            title,
            description,
            price,
            course_type,
            requirements,
            thumbnail,
            is_published: update.is_published,
            section_count: update.section_count,
            enrollment_count: update.enrollment_count,
            updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RawSectionDocument {
    pub section_title: String,
    pub section_order: u32,
    pub course_id: String,
}

impl RawSectionDocument {
    pub fn into_section(self, id: String) -> SectionData {
        SectionData::new(
            EntityId::Persisted(id),
            self.course_id,
            self.section_title,
            self.section_order,
        )
    }
}

#[derive(Serialize, Debug)]
pub struct RawSectionUpdate<'a> {
    pub section_title: &'a str,
    pub section_order: u32,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RawLessonDocument {
    pub section_id: String,
    pub lesson_title: String,
    pub lesson_order: u32,
    pub lesson_type: LessonKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_file: Option<RawUpload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<RawQuiz>,
}

impl RawLessonDocument {
    /// Type-specific fields. Only the ones matching `lesson_type` are set.
    pub const PAYLOAD_FIELDS: [&'static str; 5] =
        ["document_url", "document_file", "video_url", "duration", "quiz"];

    pub fn new(section_id: &str, title: &str, order: u32, content: &LessonContent) -> Self {
        let mut raw = Self {
            section_id: section_id.to_owned(),
            lesson_title: title.to_owned(),
            lesson_order: order,
            lesson_type: content.kind(),
            document_url: None,
            document_file: None,
            video_url: None,
            duration: None,
            quiz: None,
        };

        match content {
            LessonContent::Document {
                document: DocumentRef::Url(url),
            } => raw.document_url = Some(url.clone()),
            LessonContent::Document {
                document:
                    DocumentRef::Upload {
                        file_name,
                        storage_path,
                    },
            } => {
                raw.document_file = Some(RawUpload {
                    file_name: file_name.clone(),
                    storage_path: storage_path.clone(),
                })
            }
            LessonContent::Video {
                video_url,
                duration_minutes,
            } => {
                raw.video_url = Some(video_url.clone());
                raw.duration = Some(*duration_minutes);
            }
            LessonContent::Quiz(quiz) => raw.quiz = Some(quiz.into()),
        }

        raw
    }

    pub fn into_lesson(self, id: String) -> Result<LessonData> {
        let content = match self.lesson_type {
            LessonKind::Document => {
                let document = match (self.document_url, self.document_file) {
                    (Some(url), _) => DocumentRef::Url(url),
                    (None, Some(upload)) => DocumentRef::Upload {
                        file_name: upload.file_name,
                        storage_path: upload.storage_path,
                    },
                    (None, None) => {
                        return Err(Error::decode(format!(
                            "document lesson {id} has no document reference"
                        )))
                    }
                };

                LessonContent::Document { document }
            }
            LessonKind::Video => match self.video_url {
                Some(video_url) => LessonContent::Video {
                    video_url,
                    duration_minutes: self.duration.unwrap_or_default(),
                },
                None => {
                    return Err(Error::decode(format!(
                        "video lesson {id} has no video url"
                    )))
                }
            },
            LessonKind::Quiz => match self.quiz {
                Some(quiz) => LessonContent::Quiz(quiz.try_into()?),
                None => return Err(Error::decode(format!("quiz lesson {id} has no quiz"))),
            },
        };

        Ok(LessonData::new(
            EntityId::Persisted(id),
            EntityId::Persisted(self.section_id),
            self.lesson_title,
            self.lesson_order,
            content,
        ))
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RawUpload {
    pub file_name: String,
    pub storage_path: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RawQuiz {
    pub title: String,
    pub question_count: u32,
    pub questions: Vec<RawQuizQuestion>,
}

impl From<&QuizData> for RawQuiz {
    fn from(data: &QuizData) -> Self {
        Self {
            title: data.title.clone(),
            question_count: data.question_count,
            questions: data.questions.iter().map(Into::into).collect(),
        }
    }
}

impl TryFrom<RawQuiz> for QuizData {
    type Error = Error;

    fn try_from(raw: RawQuiz) -> Result<Self> {
        let questions = raw
            .questions
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<QuizQuestion>>>()?;

        Ok(Self {
            title: raw.title,
            question_count: raw.question_count,
            questions,
        })
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RawQuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl From<&QuizQuestion> for RawQuizQuestion {
    fn from(data: &QuizQuestion) -> Self {
        Self {
            question: data.text.clone(),
            options: data.options.to_vec(),
            correct_answer: data.correct_option,
            explanation: data.explanation.clone(),
        }
    }
}

impl TryFrom<RawQuizQuestion> for QuizQuestion {
    type Error = Error;

    fn try_from(raw: RawQuizQuestion) -> Result<Self> {
        let option_count = raw.options.len();
        let options: [String; QUIZ_OPTION_COUNT] = raw.options.try_into().map_err(|_| {
            Error::decode(format!(
                "question \"{}\" has {option_count} options",
                raw.question
            ))
        })?;

        Ok(Self {
            text: raw.question,
            options,
            correct_option: raw.correct_answer,
            explanation: raw.explanation,
        })
    }
}
