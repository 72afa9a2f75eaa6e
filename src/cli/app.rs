use super::{Cli, Command};
use anyhow::{Context, Result, bail};
use blogdb::report::{self, TextTable};
use blogdb::{BlogDb, DbConfig, Drift, RecordId, Record, seed_sample_data};
use serde::Serialize;

pub fn run(cli: Cli) -> Result<()> {
    let db = open(&cli)?;
    let json = cli.json;

    match cli.command {
        Command::Demo => demo(&db, json),
        Command::Seed => {
            let summary = db.with_transaction(seed_sample_data)?;
            emit(json, &summary, || {
                format!(
                    "Seeded {} users, {} posts, {} comments\n",
                    summary.users.len(),
                    summary.posts.len(),
                    summary.comments.len()
                )
            })
        }
        Command::Posts { user } => {
            let report = db
                .user_posts_with_comments(RecordId(user))
                .with_context(|| format!("Failed to load posts of user {}", user))?;
            emit(json, &report, || {
                format!(
                    "{} <{}>: {} live post(s)\n{}",
                    report.user.username,
                    report.user.email,
                    report.user.post_count,
                    report.to_table()
                )
            })
        }
        Command::Top => {
            let top = db.most_commented_posts()?;
            emit(json, &top, || report::rankings_table(&top).render())
        }
        Command::RemoveComment { id } => {
            let removed = db
                .remove_comment(RecordId(id))
                .with_context(|| format!("Failed to remove comment {}", id))?;
            let post = db.post(removed.post_id)?;
            emit(json, &post, || {
                format!(
                    "Removed comment {}; post {} now has {} comment(s), {}\n",
                    removed.id(),
                    post.id(),
                    post.comment_count,
                    post.comment_status
                )
            })
        }
        Command::RemovePost { id } => {
            let cascade = db
                .remove_post(RecordId(id))
                .with_context(|| format!("Failed to remove post {}", id))?;
            emit(json, &cascade, || {
                format!(
                    "Post {}: {:?}, {} comment(s) removed\n",
                    cascade.post_id, cascade.outcome, cascade.comments_removed
                )
            })
        }
        Command::Audit => {
            let drifts = db.audit_counters()?;
            emit(json, &drifts, || drift_table(&drifts))?;
            if !drifts.is_empty() {
                bail!("{} counter drift(s) found", drifts.len());
            }
            Ok(())
        }
    }
}

fn open(cli: &Cli) -> Result<BlogDb> {
    let mut config = DbConfig::from_env().context("Invalid environment configuration")?;
    if let Some(path) = &cli.snapshot {
        config = config.snapshot_path(path);
    }
    if let Some(cost) = cli.bcrypt_cost {
        config = config.password_cost(cost);
    }
    BlogDb::open(config).context("Failed to open database")
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}

fn drift_table(drifts: &[Drift]) -> String {
    if drifts.is_empty() {
        return "All counters consistent\n".to_string();
    }
    let mut table = TextTable::new(["drift"]);
    for drift in drifts {
        table.push_row([drift]);
    }
    table.render()
}

#[derive(Serialize)]
struct DemoStep<'a, T: Serialize> {
    step: &'a str,
    result: T,
}

fn demo(db: &BlogDb, json: bool) -> Result<()> {
    let seeded = db.with_transaction(seed_sample_data)?;
    step(json, "seed", &seeded, || {
        format!("{} users, {} posts, {} comments", seeded.users.len(), seeded.posts.len(), seeded.comments.len())
    })?;

    for user_id in &seeded.users {
        let posts = db.user_posts_with_comments(*user_id)?;
        step(json, "posts", &posts, || {
            format!("{} ({} live post(s))\n{}", posts.user.username, posts.user.post_count, posts.to_table())
        })?;
    }

    let top = db.most_commented_posts()?;
    step(json, "top", &top, || report::rankings_table(&top).render())?;

    // Remove one comment of the first post, then cascade the post.
    let (Some(&first_user), Some(&first_post)) = (seeded.users.first(), seeded.posts.first()) else {
        bail!("Seed created no posts");
    };
    let first_comment = db
        .user_posts_with_comments(first_user)?
        .posts
        .into_iter()
        .find(|entry| entry.post.id() == first_post)
        .and_then(|entry| entry.comments.into_iter().next())
        .context("First post has no comments")?;
    db.remove_comment(first_comment.id())?;
    let post = db.post(first_post)?;
    step(json, "remove-comment", &post, || {
        format!(
            "post {}: {} comment(s), {}",
            post.id(),
            post.comment_count,
            post.comment_status
        )
    })?;

    let cascade = db.remove_post(first_post)?;
    step(json, "remove-post", &cascade, || {
        format!("post {}: {:?}, {} comment(s) removed", cascade.post_id, cascade.outcome, cascade.comments_removed)
    })?;

    let top = db.most_commented_posts()?;
    step(json, "top", &top, || report::rankings_table(&top).render())?;

    let drifts = db.audit_counters()?;
    step(json, "audit", &drifts, || drift_table(&drifts))?;
    if !drifts.is_empty() {
        bail!("{} counter drift(s) found", drifts.len());
    }
    Ok(())
}

fn step<T: Serialize>(json: bool, name: &str, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        let line = serde_json::to_string(&DemoStep { step: name, result: value })?;
        println!("{}", line);
    } else {
        println!("== {} ==", name);
        println!("{}", text().trim_end());
        println!();
    }
    Ok(())
}
