use std::cmp::Ordering;

use crate::data::CourseData;
use crate::error::Result;
use crate::store::{CourseStore, DocumentStore};

/// Read-only browsing over stored courses. Results carry no sections.
pub struct Catalog<'a, S> {
    store: &'a CourseStore<S>,
}

impl<'a, S: DocumentStore> Catalog<'a, S> {
    pub fn new(store: &'a CourseStore<S>) -> Self {
        Self { store }
    }

    /// Published courses, most enrolled first.
    pub async fn published(&self) -> Result<Vec<CourseData>> {
        let mut courses = self
            .store
            .list_courses()
            .await?
            .into_iter()
            .filter(|course| course.is_published)
            .collect::<Vec<_>>();

        sort_by_popularity(&mut courses);

        Ok(courses)
    }

    /// Published courses matching every word of `query`, case-insensitively,
    /// in the title, description or requirements. A blank query matches all.
    pub async fn search(&self, query: &str) -> Result<Vec<CourseData>> {
        let terms = query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>();

        Ok(self
            .published()
            .await?
            .into_iter()
            .filter(|course| matches_terms(course, &terms))
            .collect())
    }

    /// Every course of an instructor, drafts included, newest first.
    pub async fn by_instructor(&self, instructor_id: &str) -> Result<Vec<CourseData>> {
        let mut courses = self
            .store
            .list_courses()
            .await?
            .into_iter()
            .filter(|course| course.instructor_id == instructor_id)
            .collect::<Vec<_>>();

        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(courses)
    }
}

fn matches_terms(course: &CourseData, terms: &[String]) -> bool {
    let haystack = [
        course.details.title.as_str(),
        course.details.description.as_str(),
    ]
    .into_iter()
    .chain(course.details.requirements.iter().map(String::as_str))
    .collect::<Vec<_>>()
    .join("\n")
    .to_lowercase();

    terms.iter().all(|term| haystack.contains(term.as_str()))
}

fn sort_by_popularity(courses: &mut [CourseData]) {
    courses.sort_by(|a, b| match b.enrollment_count.cmp(&a.enrollment_count) {
        Ordering::Equal => a.details.title.cmp(&b.details.title),
        ordering => ordering,
    });
}
