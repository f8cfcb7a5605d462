use std::path::Path;

use anyhow::{bail, Context, Result};
use learnhub_course_sync::{
    execute, reconcile, CourseStore, DocumentStore, PendingChanges, Plan, ReconcileOptions,
};
use tracing::{info, warn};

use crate::helpers::{load_store, read_changes, save_store};

#[derive(Clone, Copy)]
pub struct SyncArgs<'a> {
    pub store_path: &'a Path,
    pub course_id: &'a str,
    pub changes_path: &'a Path,
    pub publish: bool,
}

/// Computes the store writes for a pending-changes file without running them.
pub async fn plan(args: SyncArgs<'_>) -> Result<Plan> {
    let store = CourseStore::new(load_store(args.store_path)?);
    let pending = read_changes(args.changes_path)?;

    build_plan(&store, &args, &pending).await
}

/// Applies a pending-changes file to the store and writes the store back.
///
/// On failure the snapshot still receives the writes that went through, the
/// same way a remote store would keep them.
pub async fn apply(args: SyncArgs<'_>) -> Result<Plan> {
    let store = CourseStore::new(load_store(args.store_path)?);
    let pending = read_changes(args.changes_path)?;
    check_changes(&pending)?;

    let plan = build_plan(&store, &args, &pending).await?;
    let result = execute(&store, args.course_id, &plan).await;
    save_store(args.store_path, store.inner()).await?;

    match result {
        Ok(report) => {
            info!(course_id = args.course_id, applied = report.applied, "changes applied");
            Ok(plan)
        }
        Err(err) => {
            warn!(course_id = args.course_id, applied = err.report.applied, "sync stopped");
            Err(err).context("applying pending changes")
        }
    }
}

async fn build_plan<S: DocumentStore>(
    store: &CourseStore<S>,
    args: &SyncArgs<'_>,
    pending: &PendingChanges,
) -> Result<Plan> {
    let server = store
        .load_course(args.course_id)
        .await
        .with_context(|| format!("loading course {}", args.course_id))?;
    let options = ReconcileOptions {
        details: None,
        publish: args.publish,
    };

    Ok(reconcile(&server, pending, &options))
}

fn check_changes(pending: &PendingChanges) -> Result<()> {
    for section in &pending.sections {
        if section.title.trim().is_empty() {
            bail!("section {} needs a title", section.id);
        }
    }

    for lesson in &pending.lessons {
        lesson.check()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use learnhub_course_sync::{CourseDetails, EntityId, SectionChange};

    use super::*;

    #[tokio::test]
    async fn apply_persists_new_sections() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("store.json");
        let changes_path = dir.path().join("changes.json");

        let store = CourseStore::new(load_store(&store_path).unwrap());
        let course = store
            .create_course(
                "inst",
                CourseDetails {
                    title: "Rust".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        save_store(&store_path, store.inner()).await.unwrap();

        let mut pending = PendingChanges::default();
        pending.record_section_change(SectionChange {
            id: EntityId::draft(),
            title: "Intro".into(),
            order: 1,
        });
        std::fs::write(&changes_path, serde_json::to_vec(&pending).unwrap()).unwrap();

        let args = SyncArgs {
            store_path: &store_path,
            course_id: &course.id,
            changes_path: &changes_path,
            publish: true,
        };
        let planned = plan(args).await.unwrap();
        assert_eq!(planned.len(), 2);

        apply(args).await.unwrap();

        let reopened = CourseStore::new(load_store(&store_path).unwrap());
        let loaded = reopened.load_course(&course.id).await.unwrap();
        assert!(loaded.is_published);
        assert_eq!(loaded.sections.len(), 1);
        assert_eq!(loaded.sections[0].title, "Intro");
    }

    #[test]
    fn blank_section_titles_are_rejected() {
        let mut pending = PendingChanges::default();
        pending.record_section_change(SectionChange {
            id: EntityId::draft(),
            title: "".into(),
            order: 1,
        });

        assert!(check_changes(&pending).is_err());
    }
}
