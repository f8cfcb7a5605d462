use std::fs::DirEntry;
use std::path::PathBuf;

use anyhow::{Context, Result};
use learnhub_course_sync::CourseData;
use tracing::info;

use crate::helpers::{read_data_dir, read_dir_entry_data, write_data};

/// Validates every course tree file in `data_path` and rewrites it with
/// contiguous orders, pretty-printed.
pub fn format(data_path: PathBuf) -> Result<()> {
    let entries = read_data_dir(data_path)?;

    for dir_entry in entries {
        let course = load_and_write_formatted(dir_entry?)?;
        info!(course_id = %course.id, sections = course.sections.len(), "formatted");
    }

    Ok(())
}

fn load_and_write_formatted(dir_entry: DirEntry) -> Result<CourseData> {
    let path = dir_entry.path();
    let raw_data = read_dir_entry_data(&dir_entry)?;
    let mut course: CourseData = serde_json::from_slice(&raw_data)
        .with_context(|| format!("{} is not a course file", path.display()))?;

    course.normalize();
    course
        .check()
        .with_context(|| format!("{} is invalid", path.display()))?;

    write_data(&path, serde_json::to_string_pretty(&course)?)?;

    Ok(course)
}
