use anyhow::Result;

use taskdeck::comments;
use taskdeck::db::Database;
use taskdeck::notify::Notifier;

use crate::commands::user::resolve;

pub fn add(db: &Database, task_id: i64, text: &str, actor: &str) -> Result<()> {
    let author = resolve(db, actor)?;
    let notifier = Notifier::with_stubs(db);

    let comment = comments::post_comment(db, &notifier, task_id, author.id, text)?;
    println!("Added comment #{} to task #{}", comment.id, task_id);
    Ok(())
}

pub fn list(db: &Database, task_id: i64) -> Result<()> {
    let all = comments::list_comments(db, task_id)?;

    if all.is_empty() {
        println!("No comments.");
        return Ok(());
    }

    for comment in all {
        println!(
            "{} ({}): {}",
            comment.author,
            comment.created_at.format("%Y-%m-%d %H:%M"),
            comment.content
        );
    }

    Ok(())
}
