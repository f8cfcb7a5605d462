use std::path::Path;

use anyhow::Result;
use learnhub_course_sync::{Catalog, CourseData, CourseStore};

use crate::helpers::load_store;

pub async fn search(store_path: &Path, query: &str) -> Result<Vec<CourseData>> {
    let store = CourseStore::new(load_store(store_path)?);

    Ok(Catalog::new(&store).search(query).await?)
}

pub fn describe(course: &CourseData) -> String {
    format!(
        "{}\t{}\t{} enrolled\t{:.2}",
        course.id, course.details.title, course.enrollment_count, course.details.price
    )
}
