//! Document store adapter.
//!
//! Courses live in a three-level nested collection:
//!
//! ```text
//! courses/{course_id}
//! courses/{course_id}/sections/{section_id}
//! courses/{course_id}/sections/{section_id}/lessons/{lesson_id}
//! ```
//!
//! [`DocumentStore`] is the raw CRUD contract a backend has to provide.
//! [`CourseStore`] maps domain values onto it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::data::{
    by_order_then_title, CourseData, CourseDetails, CourseUpdate, LessonContent, LessonData,
    SectionData,
};
use crate::error::{Error, Result};
use crate::raw_data::{
    from_document, to_document, RawCourseDocument, RawCourseUpdate, RawLessonDocument,
    RawSectionDocument, RawSectionUpdate,
};

pub type Document = serde_json::Map<String, serde_json::Value>;

pub const COURSES: &str = "courses";
pub const SECTIONS: &str = "sections";
pub const LESSONS: &str = "lessons";
pub const ENROLLMENTS: &str = "enrollments";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn root(name: &str) -> Self {
        Self(name.to_owned())
    }

    pub fn doc(&self, id: &str) -> DocumentPath {
        DocumentPath(format!("{}/{id}", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl DocumentPath {
    pub fn collection(&self, name: &str) -> CollectionPath {
        CollectionPath(format!("{}/{name}", self.0))
    }

    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub mod paths {
    use super::{CollectionPath, DocumentPath, COURSES, ENROLLMENTS, LESSONS, SECTIONS};

    pub fn courses() -> CollectionPath {
        CollectionPath::root(COURSES)
    }

    pub fn course(course_id: &str) -> DocumentPath {
        courses().doc(course_id)
    }

    pub fn sections(course_id: &str) -> CollectionPath {
        course(course_id).collection(SECTIONS)
    }

    pub fn section(course_id: &str, section_id: &str) -> DocumentPath {
        sections(course_id).doc(section_id)
    }

    pub fn lessons(course_id: &str, section_id: &str) -> CollectionPath {
        section(course_id, section_id).collection(LESSONS)
    }

    pub fn lesson(course_id: &str, section_id: &str, lesson_id: &str) -> DocumentPath {
        lessons(course_id, section_id).doc(lesson_id)
    }

    pub fn enrollments() -> CollectionPath {
        CollectionPath::root(ENROLLMENTS)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

/// Asynchronous CRUD over a hierarchical document store.
///
/// Every call may fail. There are no multi-document transactions: a caller
/// issuing several writes sees each one land or fail on its own.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Adds a document under `parent` and returns its generated id.
    async fn create(&self, parent: &CollectionPath, data: Document) -> Result<String>;

    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>>;

    /// Direct children of `parent`. Nested collections are not included.
    async fn list(&self, parent: &CollectionPath) -> Result<Vec<StoredDocument>>;

    /// Merges `data` into an existing document.
    async fn update(&self, path: &DocumentPath, data: Document) -> Result<()>;

    /// Removes a single document. Nested collections are left alone.
    async fn delete(&self, path: &DocumentPath) -> Result<()>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    async fn create(&self, parent: &CollectionPath, data: Document) -> Result<String> {
        (**self).create(parent, data).await
    }

    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>> {
        (**self).get(path).await
    }

    async fn list(&self, parent: &CollectionPath) -> Result<Vec<StoredDocument>> {
        (**self).list(parent).await
    }

    async fn update(&self, path: &DocumentPath, data: Document) -> Result<()> {
        (**self).update(path, data).await
    }

    async fn delete(&self, path: &DocumentPath) -> Result<()> {
        (**self).delete(path).await
    }
}

/// Documents keyed by their full path.
pub type Snapshot = BTreeMap<String, Document>;

/// In-process [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(documents: Snapshot) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.documents.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, parent: &CollectionPath, data: Document) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        let path = parent.doc(&id);

        self.documents.write().await.insert(path.0, data);

        Ok(id)
    }

    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>> {
        Ok(self.documents.read().await.get(path.as_str()).cloned())
    }

    async fn list(&self, parent: &CollectionPath) -> Result<Vec<StoredDocument>> {
        let prefix = format!("{}/", parent.as_str());
        let documents = self.documents.read().await;

        Ok(documents
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, data)| {
                let id = &key[prefix.len()..];

                (!id.contains('/')).then(|| StoredDocument {
                    id: id.to_owned(),
                    data: data.clone(),
                })
            })
            .collect())
    }

    async fn update(&self, path: &DocumentPath, data: Document) -> Result<()> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(path.as_str())
            .ok_or_else(|| Error::not_found(path.to_string()))?;

        document.extend(data);

        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<()> {
        self.documents.write().await.remove(path.as_str());

        Ok(())
    }
}

/// Typed access to courses, sections and lessons.
#[derive(Debug, Clone)]
pub struct CourseStore<S> {
    inner: S,
}

impl<S: DocumentStore> CourseStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub async fn create_course(
        &self,
        instructor_id: &str,
        details: CourseDetails,
    ) -> Result<CourseData> {
        let mut course = CourseData::new(String::new(), instructor_id.to_owned(), details);
        let document = to_document(&RawCourseDocument::from(&course))?;

        course.id = self.inner.create(&paths::courses(), document).await?;
        debug!(course_id = %course.id, "created course");

        Ok(course)
    }

    /// The course document alone, without its sections.
    pub async fn get_course(&self, course_id: &str) -> Result<Option<CourseData>> {
        match self.inner.get(&paths::course(course_id)).await? {
            Some(document) => {
                let raw: RawCourseDocument = from_document(document)?;
                Ok(Some(raw.into_course(course_id.to_owned())))
            }
            None => Ok(None),
        }
    }

    /// The course with every section and lesson, sorted by order.
    pub async fn load_course(&self, course_id: &str) -> Result<CourseData> {
        let mut course = self
            .get_course(course_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("course {course_id}")))?;

        let mut sections = self.list_sections(course_id).await?;
        for section in sections.iter_mut() {
            if let Some(section_id) = section.id.persisted_id() {
                section.lessons = self.list_lessons(course_id, section_id).await?;
            }
        }
        course.sections = sections;

        Ok(course)
    }

    /// Every course document, without sections.
    pub async fn list_courses(&self) -> Result<Vec<CourseData>> {
        self.inner
            .list(&paths::courses())
            .await?
            .into_iter()
            .map(|stored| {
                let raw: RawCourseDocument = from_document(stored.data)?;
                Ok(raw.into_course(stored.id))
            })
            .collect()
    }

    pub async fn update_course(&self, course_id: &str, update: &CourseUpdate) -> Result<()> {
        let document = to_document(&RawCourseUpdate::new(update, Utc::now()))?;

        self.inner.update(&paths::course(course_id), document).await
    }

    /// Deletes the course together with all of its sections and lessons,
    /// children first.
    pub async fn delete_course(&self, course_id: &str) -> Result<()> {
        for section in self.inner.list(&paths::sections(course_id)).await? {
            self.delete_section_cascade(course_id, &section.id).await?;
        }

        self.inner.delete(&paths::course(course_id)).await?;
        debug!(course_id, "deleted course");

        Ok(())
    }

    pub async fn list_sections(&self, course_id: &str) -> Result<Vec<SectionData>> {
        let mut sections = self
            .inner
            .list(&paths::sections(course_id))
            .await?
            .into_iter()
            .map(|stored| {
                let raw: RawSectionDocument = from_document(stored.data)?;
                Ok(raw.into_section(stored.id))
            })
            .collect::<Result<Vec<_>>>()?;

        sections.sort_by(|a, b| by_order_then_title(a.order, &a.title, b.order, &b.title));

        Ok(sections)
    }

    pub async fn create_section(&self, course_id: &str, title: &str, order: u32) -> Result<String> {
        let raw = RawSectionDocument {
            section_title: title.to_owned(),
            section_order: order,
            course_id: course_id.to_owned(),
        };

        self.inner
            .create(&paths::sections(course_id), to_document(&raw)?)
            .await
    }

    pub async fn update_section(
        &self,
        course_id: &str,
        section_id: &str,
        title: &str,
        order: u32,
    ) -> Result<()> {
        let raw = RawSectionUpdate {
            section_title: title,
            section_order: order,
        };

        self.inner
            .update(&paths::section(course_id, section_id), to_document(&raw)?)
            .await
    }

    /// Removes the section document only. Callers delete the lessons first.
    pub async fn delete_section(&self, course_id: &str, section_id: &str) -> Result<()> {
        self.inner.delete(&paths::section(course_id, section_id)).await
    }

    async fn delete_section_cascade(&self, course_id: &str, section_id: &str) -> Result<()> {
        for lesson in self.inner.list(&paths::lessons(course_id, section_id)).await? {
            self.delete_lesson(course_id, section_id, &lesson.id).await?;
        }

        self.delete_section(course_id, section_id).await
    }

    pub async fn list_lessons(&self, course_id: &str, section_id: &str) -> Result<Vec<LessonData>> {
        let mut lessons = self
            .inner
            .list(&paths::lessons(course_id, section_id))
            .await?
            .into_iter()
            .map(|stored| from_document::<RawLessonDocument>(stored.data)?.into_lesson(stored.id))
            .collect::<Result<Vec<_>>>()?;

        lessons.sort_by(|a, b| by_order_then_title(a.order, &a.title, b.order, &b.title));

        Ok(lessons)
    }

    pub async fn create_lesson(
        &self,
        course_id: &str,
        section_id: &str,
        title: &str,
        order: u32,
        content: &LessonContent,
    ) -> Result<String> {
        let raw = RawLessonDocument::new(section_id, title, order, content);

        self.inner
            .create(&paths::lessons(course_id, section_id), to_document(&raw)?)
            .await
    }

    pub async fn update_lesson(
        &self,
        course_id: &str,
        section_id: &str,
        lesson_id: &str,
        title: &str,
        order: u32,
        content: &LessonContent,
    ) -> Result<()> {
        let raw = RawLessonDocument::new(section_id, title, order, content);
        let mut document = to_document(&raw)?;
        for field in RawLessonDocument::PAYLOAD_FIELDS {
            document.entry(field).or_insert(serde_json::Value::Null);
        }

        self.inner
            .update(&paths::lesson(course_id, section_id, lesson_id), document)
            .await
    }

    pub async fn delete_lesson(
        &self,
        course_id: &str,
        section_id: &str,
        lesson_id: &str,
    ) -> Result<()> {
        self.inner
            .delete(&paths::lesson(course_id, section_id, lesson_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::data::DocumentRef;

    fn details(title: &str) -> CourseDetails {
        CourseDetails {
            title: title.into(),
            ..Default::default()
        }
    }

    fn document_lesson() -> LessonContent {
        LessonContent::Document {
            document: DocumentRef::Url(Url::parse("https://docs.example.com/a.pdf").unwrap()),
        }
    }

    #[tokio::test]
    async fn list_returns_direct_children_only() {
        let store = MemoryStore::new();
        let course_id = store.create(&paths::courses(), Document::new()).await.unwrap();
        let section_id = store
            .create(&paths::sections(&course_id), Document::new())
            .await
            .unwrap();
        store
            .create(&paths::lessons(&course_id, &section_id), Document::new())
            .await
            .unwrap();

        let courses = store.list(&paths::courses()).await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].id, course_id);

        let sections = store.list(&paths::sections(&course_id)).await.unwrap();
        assert_eq!(sections.len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let store = MemoryStore::new();
        let result = store.update(&paths::course("nope"), Document::new()).await;

        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn load_course_builds_sorted_tree() {
        let store = CourseStore::new(MemoryStore::new());
        let course = store.create_course("inst", details("Rust")).await.unwrap();

        let second = store.create_section(&course.id, "Second", 2).await.unwrap();
        let first = store.create_section(&course.id, "First", 1).await.unwrap();
        store
            .create_lesson(&course.id, &first, "B", 2, &document_lesson())
            .await
            .unwrap();
        store
            .create_lesson(&course.id, &first, "A", 1, &document_lesson())
            .await
            .unwrap();

        let loaded = store.load_course(&course.id).await.unwrap();

        assert_eq!(loaded.details.title, "Rust");
        assert_eq!(loaded.sections[0].id.persisted_id(), Some(first.as_str()));
        assert_eq!(loaded.sections[1].id.persisted_id(), Some(second.as_str()));
        let titles: Vec<_> = loaded.sections[0]
            .lessons
            .iter()
            .map(|lesson| lesson.title.as_str())
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn delete_course_removes_everything() {
        let store = CourseStore::new(MemoryStore::new());
        let course = store.create_course("inst", details("Rust")).await.unwrap();
        let section = store.create_section(&course.id, "One", 1).await.unwrap();
        store
            .create_lesson(&course.id, &section, "L", 1, &document_lesson())
            .await
            .unwrap();

        store.delete_course(&course.id).await.unwrap();

        assert!(store.inner().is_empty().await);
    }

    #[tokio::test]
    async fn course_update_merges_fields() {
        let store = CourseStore::new(MemoryStore::new());
        let course = store.create_course("inst", details("Rust")).await.unwrap();

        store
            .update_course(
                &course.id,
                &CourseUpdate {
                    is_published: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let loaded = store.get_course(&course.id).await.unwrap().unwrap();
        assert!(loaded.is_published);
        assert_eq!(loaded.details.title, "Rust");
    }

    #[tokio::test]
    async fn details_update_clears_the_thumbnail() {
        let store = CourseStore::new(MemoryStore::new());
        let course = store
            .create_course(
                "inst",
                CourseDetails {
                    thumbnail: Some("thumb.png".into()),
                    ..details("Rust")
                },
            )
            .await
            .unwrap();

        store
            .update_course(
                &course.id,
                &CourseUpdate {
                    details: Some(details("Rust")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let loaded = store.get_course(&course.id).await.unwrap().unwrap();
        assert_eq!(loaded.details.thumbnail, None);
    }

    #[tokio::test]
    async fn lesson_update_replaces_the_payload() {
        let store = CourseStore::new(MemoryStore::new());
        let course = store.create_course("inst", details("Rust")).await.unwrap();
        let section = store.create_section(&course.id, "One", 1).await.unwrap();
        let lesson = store
            .create_lesson(&course.id, &section, "Notes", 1, &document_lesson())
            .await
            .unwrap();

        let upload = LessonContent::Document {
            document: DocumentRef::Upload {
                file_name: "notes.pdf".into(),
                storage_path: "lessons/notes.pdf".into(),
            },
        };
        store
            .update_lesson(&course.id, &section, &lesson, "Notes", 1, &upload)
            .await
            .unwrap();
        assert_eq!(
            store.list_lessons(&course.id, &section).await.unwrap()[0].content,
            upload
        );

        let video = LessonContent::Video {
            video_url: Url::parse("https://cdn.example.com/notes.mp4").unwrap(),
            duration_minutes: 9,
        };
        store
            .update_lesson(&course.id, &section, &lesson, "Notes", 1, &video)
            .await
            .unwrap();
        store
            .update_lesson(&course.id, &section, &lesson, "Notes", 1, &document_lesson())
            .await
            .unwrap();

        let stored = store
            .inner()
            .get(&paths::lesson(&course.id, &section, &lesson))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["video_url"], serde_json::Value::Null);
        assert_eq!(stored["duration"], serde_json::Value::Null);
        assert_eq!(stored["document_file"], serde_json::Value::Null);
        assert_eq!(
            store.list_lessons(&course.id, &section).await.unwrap()[0].content,
            document_lesson()
        );
    }
}
