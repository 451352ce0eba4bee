//! Task lifecycle. Transition legality is an explicit permission table
//! keyed by role and current status, checked together with the comment
//! gate before anything is persisted. Status changes by non-admin actors
//! broadcast to all admins; the broadcast records are written in the same
//! transaction as the status row.

use tracing::debug;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Role, Task, TaskStatus, User};
use crate::notify::{Channel, ChannelOutcome, ChannelRequest, Notifier};

const MEMBER_TARGETS: [TaskStatus; 5] = [
    TaskStatus::New,
    TaskStatus::Opened,
    TaskStatus::InProgress,
    TaskStatus::Completed,
    TaskStatus::Reopened,
];

/// The states an actor may move a task into from its current status.
/// Admins may select any state. Members may select anything but Closed,
/// and get nothing at all on a Closed task (read-only from their side).
pub fn allowed_targets(role: Role, current: TaskStatus) -> &'static [TaskStatus] {
    match role {
        Role::Admin => &TaskStatus::ALL,
        Role::Member => match current {
            TaskStatus::Closed => &[],
            _ => &MEMBER_TARGETS,
        },
    }
}

fn role_permits(role: Role, current: TaskStatus, target: TaskStatus) -> bool {
    allowed_targets(role, current).contains(&target)
}

/// Creates a task in status New and notifies the assignee over the
/// requested channels. Channel outcomes are returned alongside the task;
/// delivery failures do not fail the creation.
pub fn create_task(
    db: &Database,
    notifier: &Notifier<'_>,
    project_id: i64,
    name: &str,
    description: &str,
    assignee_id: i64,
    requested: ChannelRequest,
) -> Result<(Task, Vec<(Channel, ChannelOutcome)>)> {
    db.get_project(project_id)?
        .ok_or(Error::ProjectNotFound(project_id))?;
    db.get_user(assignee_id)?
        .ok_or(Error::UserNotFound(assignee_id))?;

    let id = db.create_task(project_id, name, description, assignee_id)?;
    let message = format!("New task assigned: {name}");
    let outcomes = notifier.dispatch(assignee_id, "New Task Assigned", &message, requested)?;

    let task = db.get_task(id)?.ok_or(Error::TaskNotFound(id))?;
    Ok((task, outcomes))
}

/// Applies the comment gate, then the role gate, then persists. The
/// comment gate counts only comments existing before this call. A
/// successful change by a non-admin actor broadcasts to all admins.
pub fn update_status(
    db: &Database,
    task_id: i64,
    new_status: TaskStatus,
    acting_user_id: i64,
) -> Result<Task> {
    let task = db.get_task(task_id)?.ok_or(Error::TaskNotFound(task_id))?;
    let actor = db
        .get_user(acting_user_id)?
        .ok_or(Error::UserNotFound(acting_user_id))?;

    if new_status.is_done() && db.comment_count(task_id)? == 0 {
        return Err(Error::CommentRequired(new_status));
    }
    check_role_gate(&actor, &task, new_status)?;

    if actor.role.is_admin() {
        db.set_task_status(task_id, new_status)?;
    } else {
        let admins = db.admin_ids()?;
        let message = format!(
            "Task '{}' status updated to {} by {}",
            task.name, new_status, actor.username
        );
        db.set_task_status_notifying(task_id, new_status, &admins, &message)?;
        debug!(task = task_id, admins = admins.len(), "status change broadcast");
    }

    db.get_task(task_id)?.ok_or(Error::TaskNotFound(task_id))
}

fn check_role_gate(actor: &User, task: &Task, target: TaskStatus) -> Result<()> {
    // Members act only on their own tasks; the picker never offers
    // anything else, and the operation must not either.
    if !actor.role.is_admin() && task.assigned_to != actor.id {
        return Err(Error::Forbidden);
    }
    if !role_permits(actor.role, task.status, target) {
        return Err(Error::Forbidden);
    }
    Ok(())
}

/// Free-text replace; no history is kept.
pub fn update_description(db: &Database, task_id: i64, description: &str) -> Result<()> {
    if !db.set_task_description(task_id, description)? {
        return Err(Error::TaskNotFound(task_id));
    }
    Ok(())
}

/// Irreversible; the task's comments go with it.
pub fn delete_task(db: &Database, task_id: i64) -> Result<()> {
    if !db.delete_task(task_id)? {
        return Err(Error::TaskNotFound(task_id));
    }
    Ok(())
}

/// Admins see every task in the project; members see only tasks assigned
/// to them. Enforced in the query, not by the caller.
pub fn list_tasks(db: &Database, project_id: i64, acting_user_id: i64) -> Result<Vec<Task>> {
    db.get_project(project_id)?
        .ok_or(Error::ProjectNotFound(project_id))?;
    let actor = db
        .get_user(acting_user_id)?
        .ok_or(Error::UserNotFound(acting_user_id))?;

    let visible_to = if actor.role.is_admin() {
        None
    } else {
        Some(actor.id)
    };
    db.list_tasks(project_id, visible_to)
}
