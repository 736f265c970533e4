use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;

use clipcast::dispatcher::{Job, SubmitOutcome};
use clipcast::gallery::{Artifact, ArtifactEdit};
use clipcast::sanitize::redact_token;
use clipcast::scheduler::{format_slots, TargetOutcome};
use clipcast::targets::NewTarget;
use clipcast::publish::TitleBackfill;
use clipcast::{ClipcastError, ConfigError, Result};

use crate::app::App;
use crate::{ArtifactCommand, CategoryCommand, Commands, GalleryCommand, TargetCommand};

pub async fn execute(app: &App, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Run => run(app).await,
        Commands::Tick => tick(app, json).await,
        Commands::Submit { url, link, chat } => submit(app, url, link, chat, json).await,
        Commands::Cancel { id } => {
            if app.dispatcher.cancel(&id).await? {
                println!("Cancelled job {id}");
            } else {
                println!("No job {id}");
            }
            Ok(())
        }
        Commands::Jobs => jobs(app, json).await,
        Commands::QueueNext => match app.dispatcher.drain_next().await? {
            Some((job, handle)) => {
                println!("Started job {} ({})", job.id, job.source_url);
                wait(handle).await;
                report_job(app, &job.id).await
            }
            None => {
                println!("Nothing to start");
                Ok(())
            }
        },
        Commands::ForcePost { target, skip_comment } => {
            match app.scheduler.force_post(&target, skip_comment, Utc::now()).await? {
                Some(outcome) if json => print_json(&outcome),
                Some(outcome) => {
                    println!(
                        "Published record {} as post {} (comment: {:?})",
                        outcome.record_id, outcome.external_post_id, outcome.comment
                    );
                    Ok(())
                }
                None => {
                    println!("No eligible artifact for {target}");
                    Ok(())
                }
            }
        }
        Commands::Gallery(cmd) => gallery(app, cmd, json).await,
        Commands::Artifact(cmd) => artifact(app, cmd, json).await,
        Commands::Target(cmd) => target(app, cmd, json),
        Commands::Categories(cmd) => categories(app, cmd, json).await,
        Commands::History { target, limit } => {
            let records = match target {
                Some(target) => app.ledger.for_target(&target, limit)?,
                None => app.ledger.recent(limit)?,
            };
            if json {
                return print_json(&records);
            }
            for r in records {
                println!(
                    "{:>6}  {}  {:<10} {:<16} {:<10} {}",
                    r.id,
                    r.posted_at.format("%Y-%m-%d %H:%M"),
                    r.status,
                    r.target_id,
                    r.artifact_id,
                    r.external_post_id.or(r.error_message).unwrap_or_default()
                );
            }
            Ok(())
        }
        Commands::Withdraw { record } => {
            if app.scheduler.publisher().withdraw(record).await? {
                println!("Withdrew record {record}");
            } else {
                println!("Record {record} was already withdrawn");
            }
            Ok(())
        }
    }
}

async fn run(app: &App) -> Result<()> {
    let (tx, rx) = watch::channel(false);
    let scheduler = app.scheduler.clone();
    let task = tokio::spawn(async move { scheduler.run(rx).await });

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
    }
    log::info!("Shutting down");
    let _ = tx.send(true);
    if let Err(e) = task.await {
        log::error!("Scheduler task ended abnormally: {}", e);
    }
    Ok(())
}

async fn tick(app: &App, json: bool) -> Result<()> {
    let report = app.scheduler.tick(Utc::now()).await?;
    if json {
        return print_json(&report);
    }
    println!(
        "Comments: {} posted, {} failed, {} waiting",
        report.comments.posted, report.comments.failed, report.comments.waiting
    );
    for r in &report.targets {
        let line = match &r.outcome {
            TargetOutcome::Idle => "idle".to_string(),
            TargetOutcome::ClaimHeld { slot } => format!("slot {slot} already claimed"),
            TargetOutcome::NoArtifact { slot } => format!("slot {slot}: no eligible artifact"),
            TargetOutcome::Published {
                slot,
                record_id,
                external_post_id,
            } => format!("slot {slot}: published record {record_id} as {external_post_id}"),
            TargetOutcome::Failed { slot, error } => match slot {
                Some(slot) => format!("slot {slot}: failed: {error}"),
                None => format!("failed: {error}"),
            },
        };
        println!("{:<16} {}", r.target_id, line);
    }
    Ok(())
}

async fn submit(app: &App, url: String, link: Option<String>, chat: Option<i64>, json: bool) -> Result<()> {
    match app.dispatcher.submit(Job::new(url, link, chat)).await? {
        SubmitOutcome::Started { job, handle } => {
            println!("Started job {}", job.id);
            // The run lives in this process; wait for it and whatever it promotes.
            wait(handle).await;
            if json {
                return print_json(&app.artifacts.get(&job.id).await?);
            }
            report_job(app, &job.id).await
        }
        SubmitOutcome::Queued { job, position } => {
            if json {
                return print_json(&job);
            }
            println!("Queued job {} at position {}", job.id, position);
            Ok(())
        }
    }
}

async fn wait(handle: tokio::task::JoinHandle<()>) {
    if let Err(e) = handle.await {
        log::error!("Pipeline task ended abnormally: {}", e);
    }
}

async fn report_job(app: &App, job_id: &str) -> Result<()> {
    if let Some(artifact) = app.artifacts.get(job_id).await? {
        print_artifact(&artifact);
        return Ok(());
    }
    match app.dispatcher.queue().get(job_id).await? {
        Some(job) => println!(
            "Job {} {}: {}",
            job.id,
            job.status,
            job.error_message.unwrap_or_default()
        ),
        None => println!("Job {job_id} finished without an artifact"),
    }
    Ok(())
}

async fn jobs(app: &App, json: bool) -> Result<()> {
    #[derive(Serialize)]
    struct Listing {
        processing: Vec<Job>,
        queued: Vec<Job>,
        failed: Vec<Job>,
    }
    let listing = Listing {
        processing: app.dispatcher.processing().await?,
        queued: app.dispatcher.queued().await?,
        failed: app.dispatcher.failed().await?,
    };
    if json {
        return print_json(&listing);
    }
    for (label, jobs) in [
        ("processing", &listing.processing),
        ("queued", &listing.queued),
        ("failed", &listing.failed),
    ] {
        for job in jobs {
            println!(
                "{:<10} {}  {}  {}{}",
                label,
                job.id,
                job.created_at.format("%Y-%m-%d %H:%M:%S"),
                job.source_url,
                job.error_message
                    .as_deref()
                    .map(|e| format!("  ({e})"))
                    .unwrap_or_default()
            );
        }
    }
    Ok(())
}

async fn gallery(app: &App, cmd: GalleryCommand, json: bool) -> Result<()> {
    let gallery = app.artifacts.gallery();
    let artifacts = match cmd {
        GalleryCommand::List => gallery.read().await?.artifacts,
        GalleryCommand::Rebuild => {
            let snapshot = gallery.rebuild().await?;
            println!("Rebuilt gallery with {} artifacts", snapshot.artifacts.len());
            return Ok(());
        }
        GalleryCommand::Used => gallery.used(&app.ledger).await?,
    };
    if json {
        return print_json(&artifacts);
    }
    for a in &artifacts {
        println!(
            "{}  {}  {:<14} {}",
            a.id,
            a.created_at.format("%Y-%m-%d %H:%M"),
            a.category.as_deref().unwrap_or("-"),
            a.title.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn artifact(app: &App, cmd: ArtifactCommand, json: bool) -> Result<()> {
    match cmd {
        ArtifactCommand::Show { id } => {
            let artifact = app.artifacts.require(&id).await?;
            if json {
                return print_json(&artifact);
            }
            print_artifact(&artifact);
        }
        ArtifactCommand::Edit {
            id,
            title,
            category,
            link,
        } => {
            let edit = ArtifactEdit {
                title,
                category,
                affiliate_link: link,
            };
            if edit.is_empty() {
                println!("Nothing to change");
                return Ok(());
            }
            let artifact = app.artifacts.edit(&id, edit).await?;
            print_artifact(&artifact);
        }
        ArtifactCommand::Delete { id } => {
            if !app.artifacts.delete(&id).await? {
                return Err(ClipcastError::ArtifactNotFound(id));
            }
            println!("Deleted artifact {id}");
        }
        ArtifactCommand::GenerateTitle { id } => {
            let artifact = titles(app)?.generate(&id).await?;
            if json {
                return print_json(&artifact);
            }
            println!("{}: {}", artifact.id, artifact.title.as_deref().unwrap_or(""));
        }
        ArtifactCommand::GenerateTitles => {
            let report = titles(app)?.generate_pending().await?;
            if json {
                return print_json(&report);
            }
            for t in &report.titled {
                println!("{}: {}", t.id, t.title);
            }
            for f in &report.failed {
                println!("{}: failed: {}", f.id, f.error);
            }
            println!("{} titled, {} failed", report.titled.len(), report.failed.len());
        }
        ArtifactCommand::PendingTitles => {
            let pending = app.artifacts.untitled().await?;
            if json {
                return print_json(&pending);
            }
            for a in &pending {
                println!("{}  {}", a.id, a.created_at.format("%Y-%m-%d %H:%M"));
            }
            println!("{} without a title", pending.len());
        }
    }
    Ok(())
}

fn titles(app: &App) -> Result<&TitleBackfill> {
    app.titles.as_ref().ok_or_else(|| {
        ConfigError::Validation {
            message: "title generation needs an AI API key".to_string(),
        }
        .into()
    })
}

async fn categories(app: &App, cmd: CategoryCommand, json: bool) -> Result<()> {
    let list = match cmd {
        CategoryCommand::List => app.categories.get().await?,
        CategoryCommand::Set { categories } => {
            app.categories
                .set(categories.split(',').map(str::to_string).collect())
                .await?
        }
        CategoryCommand::Reset => {
            if !app.categories.reset().await? {
                println!("Already using the configured categories");
            }
            app.categories.get().await?
        }
    };
    if json {
        return print_json(&list);
    }
    for category in &list {
        println!("{category}");
    }
    Ok(())
}

fn target(app: &App, cmd: TargetCommand, json: bool) -> Result<()> {
    let now = Utc::now();
    match cmd {
        TargetCommand::Add {
            id,
            name,
            credential,
            comment_credential,
            slots,
            timezone,
            image_url,
        } => {
            let target = app.targets.upsert(
                NewTarget {
                    id,
                    display_name: name,
                    credential,
                    comment_credential,
                    image_url,
                    slots,
                    timezone,
                },
                now,
            )?;
            println!("Saved target {} ({})", target.id, target.display_name);
        }
        TargetCommand::List => {
            let targets = app.targets.list(false)?;
            if json {
                #[derive(Serialize)]
                struct Row<'a> {
                    id: &'a str,
                    display_name: &'a str,
                    credential: String,
                    slots: String,
                    timezone: String,
                    active: bool,
                    last_posted_at: Option<chrono::DateTime<Utc>>,
                }
                let rows: Vec<Row<'_>> = targets
                    .iter()
                    .map(|t| Row {
                        id: &t.id,
                        display_name: &t.display_name,
                        credential: redact_token(&t.credential),
                        slots: format_slots(&t.slots),
                        timezone: app.targets.timezone_of(t).to_string(),
                        active: t.active,
                        last_posted_at: t.last_posted_at,
                    })
                    .collect();
                return print_json(&rows);
            }
            for t in &targets {
                let stats = app.ledger.stats(&t.id, now, app.targets.timezone_of(t))?;
                println!(
                    "{:<16} {:<20} {:<8} [{}] {}  today={} week={} total={}",
                    t.id,
                    t.display_name,
                    if t.active { "active" } else { "inactive" },
                    format_slots(&t.slots),
                    app.targets.timezone_of(t),
                    stats.today,
                    stats.week,
                    stats.total
                );
            }
        }
        TargetCommand::Activate { id } => app.targets.set_active(&id, true, now)?,
        TargetCommand::Deactivate { id } => app.targets.set_active(&id, false, now)?,
        TargetCommand::Slots { id, spec } => {
            let slots = app.targets.set_slots(&id, &spec, now)?;
            println!("Target {id} slots: [{}]", format_slots(&slots));
        }
        TargetCommand::Remove { id } => {
            app.targets.remove(&id)?;
            println!("Removed target {id}");
        }
    }
    Ok(())
}

fn print_artifact(a: &Artifact) {
    println!("id:        {}", a.id);
    println!("title:     {}", a.title.as_deref().unwrap_or(""));
    println!("category:  {}", a.category.as_deref().unwrap_or(""));
    println!("link:      {}", a.affiliate_link.as_deref().unwrap_or(""));
    println!("media:     {}", a.public_url);
    println!("duration:  {:.1}s", a.duration_seconds);
    println!("created:   {}", a.created_at.to_rfc3339());
    if let Some(script) = &a.script {
        println!("script:\n{script}");
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).map_err(ClipcastError::Output)?;
    println!("{out}");
    Ok(())
}
