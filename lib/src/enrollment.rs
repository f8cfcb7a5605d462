use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{CourseData, CourseUpdate};
use crate::error::{Error, Result};
use crate::raw_data::{from_document, to_document};
use crate::store::{paths, CourseStore, DocumentStore};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Enrollment {
    #[serde(skip)]
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub enrolled_at: DateTime<Utc>,
}

pub struct Enrollments<'a, S> {
    store: &'a CourseStore<S>,
}

impl<'a, S: DocumentStore> Enrollments<'a, S> {
    pub fn new(store: &'a CourseStore<S>) -> Self {
        Self { store }
    }

    /// Enrolls a user in a published course and bumps its enrollment count.
    pub async fn enroll(&self, user_id: &str, course_id: &str) -> Result<Enrollment> {
        let course = self
            .store
            .get_course(course_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("course {course_id}")))?;

        if !course.is_published {
            return Err(Error::validation(format!(
                "course {course_id} is not published"
            )));
        }

        if self.find(user_id, course_id).await?.is_some() {
            return Err(Error::AlreadyEnrolled {
                user_id: user_id.to_owned(),
                course_id: course_id.to_owned(),
            });
        }

        let mut enrollment = Enrollment {
            id: String::new(),
            user_id: user_id.to_owned(),
            course_id: course_id.to_owned(),
            enrolled_at: Utc::now(),
        };
        enrollment.id = self
            .store
            .inner()
            .create(&paths::enrollments(), to_document(&enrollment)?)
            .await?;

        self.store
            .update_course(
                course_id,
                &CourseUpdate {
                    enrollment_count: Some(course.enrollment_count + 1),
                    ..Default::default()
                },
            )
            .await?;

        info!(user_id, course_id, "user enrolled");

        Ok(enrollment)
    }

    pub async fn is_enrolled(&self, user_id: &str, course_id: &str) -> Result<bool> {
        Ok(self.find(user_id, course_id).await?.is_some())
    }

    /// Courses the user is enrolled in, skipping ones deleted since.
    pub async fn courses_for(&self, user_id: &str) -> Result<Vec<CourseData>> {
        let mut courses = Vec::new();

        for enrollment in self.list().await? {
            if enrollment.user_id != user_id {
                continue;
            }
            if let Some(course) = self.store.get_course(&enrollment.course_id).await? {
                courses.push(course);
            }
        }

        Ok(courses)
    }

    async fn find(&self, user_id: &str, course_id: &str) -> Result<Option<Enrollment>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|enrollment| enrollment.user_id == user_id && enrollment.course_id == course_id))
    }

    async fn list(&self) -> Result<Vec<Enrollment>> {
        self.store
            .inner()
            .list(&paths::enrollments())
            .await?
            .into_iter()
            .map(|stored| {
                let mut enrollment: Enrollment = from_document(stored.data)?;
                enrollment.id = stored.id;
                Ok(enrollment)
            })
            .collect()
    }
}
