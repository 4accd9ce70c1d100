//! Cross-environment job reconciliation.
//!
//! Jobs are visited in environment order, then project order, then job
//! order. Each one is matched against the records already emitted in the
//! pass; a match makes the earlier record its parent. Later environments
//! therefore always point back at earlier ones.

use runduck_core::{Job, JobRecord, Project};
use runduck_schedule::{to_cron, CronDescriber};
use tracing::{info, warn};

use crate::reader::EnvironmentSnapshot;

/// Build the combined listing from environment snapshots, already in
/// precedence order.
///
/// The result is stably sorted by `sortkey`, so the same snapshots always
/// give the same order and the same parent links.
pub fn reconcile(snapshots: &[EnvironmentSnapshot], describer: &dyn CronDescriber) -> Vec<JobRecord> {
    let mut emitted: Vec<JobRecord> = Vec::new();

    for snapshot in snapshots {
        let before = emitted.len();
        for project in &snapshot.projects {
            for job in &project.jobs {
                let mut record = project_job(&snapshot.env, snapshot.env_order, project, job);
                let (cron, description) = schedule_fields(job, project, describer);
                record.cron = cron;
                record.schedule_description = description;

                let (key, parent_id) = match find_parent(&emitted, &record) {
                    Some(parent) => (sortkey(&record, &parent.name), Some(parent.id.clone())),
                    None => (sortkey(&record, &record.name), None),
                };
                record.sortkey = key;
                record.parent_id = parent_id;
                emitted.push(record);
            }
        }
        info!(env = %snapshot.env, jobs = emitted.len() - before, "environment reconciled");
    }

    emitted.sort_by(|a, b| a.sortkey.cmp(&b.sortkey));
    emitted
}

/// Copy the whitelisted fields of `job` into a fresh record.
///
/// `cron`, `schedule_description`, `parent_id` and `sortkey` are left empty
/// for the caller to fill in.
pub fn project_job(env: &str, env_order: usize, project: &Project, job: &Job) -> JobRecord {
    JobRecord {
        id: format!("{env}.{}", job.id),
        uuid: job.uuid.clone(),
        group: job.group.clone(),
        name: job.name.clone(),
        schedule_enabled: job.schedule_enabled,
        execution_enabled: job.execution_enabled,
        description: job.description.clone(),
        permalink: job.permalink.clone(),
        project_name: project.name.clone(),
        project_description: project.description.clone(),
        project_url: project.url.clone(),
        env: env.to_string(),
        env_order,
        cron: String::new(),
        schedule_description: String::new(),
        parent_id: None,
        sortkey: String::new(),
    }
}

/// First emitted record that is the same logical job as `candidate`.
///
/// A record matches on equal `uuid` (both present) or on the same
/// `(project_name, group, name)`. Records are checked in emission order and
/// the first one that matches either way wins.
pub fn find_parent<'a>(emitted: &'a [JobRecord], candidate: &JobRecord) -> Option<&'a JobRecord> {
    emitted.iter().find(|record| {
        let same_uuid = matches!(
            (&record.uuid, &candidate.uuid),
            (Some(a), Some(b)) if a == b
        );
        same_uuid
            || (record.project_name == candidate.project_name
                && record.group == candidate.group
                && record.name == candidate.name)
    })
}

/// `"{project_name} {group} {canonical_name} {env_order}"`.
pub fn sortkey(record: &JobRecord, canonical_name: &str) -> String {
    format!(
        "{} {} {} {}",
        record.project_name, record.group, canonical_name, record.env_order
    )
}

/// Cron expression and its description for one job.
///
/// A description failure is logged and the raw cron stands in for it; it
/// never fails the pass.
pub fn schedule_fields(job: &Job, project: &Project, describer: &dyn CronDescriber) -> (String, String) {
    let cron = to_cron(job.schedule.as_ref());
    if cron.is_empty() {
        return (cron, String::new());
    }
    match describer.describe(&cron) {
        Ok(text) => (cron, text),
        Err(e) => {
            warn!(
                project = %project.name,
                group = %job.group,
                name = %job.name,
                %cron,
                error = %e,
                "cannot describe job schedule"
            );
            let raw = cron.clone();
            (cron, raw)
        }
    }
}
