//! Post-fetch filtering of task listings.

use chrono::{DateTime, Duration, Utc};

use taskbot_models::{Project, Task};

/// Drops closed tasks last updated at or before `now - window`.
///
/// Open tasks are kept regardless of age.
pub fn filter_recent(tasks: Vec<Task>, now: DateTime<Utc>, window: Duration) -> Vec<Task> {
    let cutoff = now - window;
    tasks
        .into_iter()
        .filter(|task| !task.status.is_closed() || task.updated_at > cutoff)
        .collect()
}

/// Applies the project's display preference on top of the recency filter.
pub fn visible_tasks(
    project: &Project,
    tasks: Vec<Task>,
    now: DateTime<Utc>,
    window: Duration,
) -> Vec<Task> {
    if project.hide_completed {
        tasks
            .into_iter()
            .filter(|task| !task.status.is_closed())
            .collect()
    } else {
        filter_recent(tasks, now, window)
    }
}
