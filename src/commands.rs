use std::fmt;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};

use tdo_core::{FilterSelection, Task, TaskDraft, TaskEngine, TaskView, ViewStats};

use crate::cli::{AddArgs, CliCommand, DeleteArgs, ListArgs, ShowArgs, ToggleArgs};

/// Execute a CLI command against the engine, writing output to `writer`.
pub async fn execute<W: Write>(
    engine: &mut TaskEngine,
    command: CliCommand,
    mut writer: W,
) -> Result<()> {
    match command {
        CliCommand::List(args) => handle_list(engine, &args, &mut writer).await,
        CliCommand::Show(args) => handle_show(engine, &args, &mut writer).await,
        CliCommand::Add(args) => handle_add(engine, args, &mut writer).await,
        CliCommand::Toggle(args) => handle_toggle(engine, &args, &mut writer).await,
        CliCommand::Delete(args) => handle_delete(engine, &args, &mut writer).await,
    }
}

async fn handle_list<W: Write>(
    engine: &mut TaskEngine,
    args: &ListArgs,
    writer: &mut W,
) -> Result<()> {
    let selection = FilterSelection {
        status: args.status,
        period: args.period,
        order: args.order,
    };
    match engine.change_filter(selection).await {
        Ok(view) => render_view(&view, &selection, writer),
        Err(err) if !engine.snapshot().is_empty() => {
            // read failure: report it and keep the stale list on screen
            writeln!(writer, "Could not refresh from the service: {err}")?;
            writeln!(writer, "Showing the last known list.")?;
            render_view(&engine.view(), &selection, writer)
        }
        Err(err) => Err(err.into()),
    }
}

async fn handle_show<W: Write>(engine: &TaskEngine, args: &ShowArgs, writer: &mut W) -> Result<()> {
    let task = engine.fetch(&args.id).await?;
    writeln!(writer, "Id:        {}", task.id)?;
    writeln!(writer, "Title:     {}", task.title)?;
    if let Some(message) = task.message.as_ref().filter(|m| !m.trim().is_empty()) {
        writeln!(writer, "Message:   {message}")?;
    }
    writeln!(writer, "Priority:  {}", task.priority)?;
    if let Some(deadline) = task.deadline {
        writeln!(writer, "Deadline:  {}", deadline.format("%Y-%m-%d %H:%M"))?;
    }
    writeln!(writer, "Created:   {}", task.created_at.format("%Y-%m-%d %H:%M"))?;
    writeln!(
        writer,
        "Status:    {}",
        if task.complete { "complete" } else { "active" }
    )?;
    if let Some(completed_at) = task.completed_at {
        writeln!(writer, "Completed: {}", completed_at.format("%Y-%m-%d %H:%M"))?;
    }
    Ok(())
}

async fn handle_add<W: Write>(engine: &mut TaskEngine, args: AddArgs, writer: &mut W) -> Result<()> {
    let deadline = args.deadline.as_deref().map(parse_deadline).transpose()?;
    let draft = TaskDraft {
        title: args.text.join(" ").trim().to_string(),
        message: args.message.filter(|m| !m.trim().is_empty()),
        deadline,
        priority: args.priority,
    };
    let outcome = engine.submit(draft).await?;
    writeln!(
        writer,
        "Added {}: {}",
        outcome.created.id, outcome.created.title
    )?;
    writeln!(writer, "{}", StatsLine(&outcome.view.stats))?;
    Ok(())
}

async fn handle_toggle<W: Write>(
    engine: &mut TaskEngine,
    args: &ToggleArgs,
    writer: &mut W,
) -> Result<()> {
    let mut summary = ToggleSummary::default();
    for id in &args.ids {
        match engine.toggle(id).await {
            Ok(_) => summary.toggled += 1,
            Err(err) if err.is_not_found() => summary.missing.push(id.clone()),
            Err(err) => summary.failed.push((id.clone(), err.to_string())),
        }
    }
    summary.write_to(writer)?;
    writeln!(writer, "{}", StatsLine(&engine.view().stats))?;
    Ok(())
}

async fn handle_delete<W: Write>(
    engine: &mut TaskEngine,
    args: &DeleteArgs,
    writer: &mut W,
) -> Result<()> {
    let mut summary = DeleteSummary::default();
    for id in &args.ids {
        engine.request_delete(id);
        let confirmed = args.yes || prompt_confirm(id, writer)?;
        if !confirmed {
            engine.cancel_delete();
            summary.skipped.push(id.clone());
            continue;
        }
        match engine.confirm_delete().await {
            Ok(_) => summary.deleted += 1,
            Err(err) if err.is_not_found() => summary.missing.push(id.clone()),
            Err(err) => summary.failed.push((id.clone(), err.to_string())),
        }
    }
    summary.write_to(writer)
}

fn prompt_confirm<W: Write>(id: &str, writer: &mut W) -> Result<bool> {
    write!(writer, "Delete task {id}? [y/N] ")?;
    writer.flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn render_view<W: Write>(
    view: &TaskView,
    selection: &FilterSelection,
    writer: &mut W,
) -> Result<()> {
    if view.is_empty {
        writeln!(writer, "No tasks yet. Add one with `tdo add <title>`.")?;
        return Ok(());
    }

    let now = Utc::now();
    writeln!(writer, "Tasks ({}) [{}]", view.stats.total, selection.summary())?;
    writeln!(writer, "Active ({}):", view.stats.active_count)?;
    write_section(&view.active, now, writer)?;
    writeln!(writer, "Completed ({}):", view.stats.completed_count)?;
    write_section(&view.completed, now, writer)?;
    writeln!(writer, "{}", StatsLine(&view.stats))?;
    Ok(())
}

fn write_section<W: Write>(tasks: &[Task], now: DateTime<Utc>, writer: &mut W) -> Result<()> {
    if tasks.is_empty() {
        writeln!(writer, "  (none)")?;
        return Ok(());
    }
    for task in tasks {
        writeln!(writer, "{}", TaskLine { task, now })?;
    }
    Ok(())
}

struct TaskLine<'a> {
    task: &'a Task,
    now: DateTime<Utc>,
}

impl fmt::Display for TaskLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.task.complete { "x" } else { " " };
        write!(
            f,
            "  [{}] {}  {} ({})",
            mark, self.task.id, self.task.title, self.task.priority
        )?;
        if let Some(deadline) = self.task.deadline {
            write!(f, " due {}", deadline.format("%Y-%m-%d %H:%M"))?;
        }
        if self.task.is_overdue(self.now) {
            write!(f, " !overdue")?;
        }
        Ok(())
    }
}

struct StatsLine<'a>(&'a ViewStats);

impl fmt::Display for StatsLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Active: {} | Completed: {}",
            self.0.active_count, self.0.completed_count
        )?;
        if let Some(rate) = self.0.completion_rate {
            write!(f, " | Progress: {rate}%")?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct ToggleSummary {
    toggled: usize,
    missing: Vec<String>,
    failed: Vec<(String, String)>,
}

impl ToggleSummary {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(
            writer,
            "Toggled {} task{}",
            self.toggled,
            if self.toggled == 1 { "" } else { "s" }
        )?;
        if !self.missing.is_empty() {
            writeln!(writer, "Not found: {}", self.missing.join(", "))?;
        }
        for (id, reason) in &self.failed {
            writeln!(writer, "Failed {id}: {reason}")?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct DeleteSummary {
    deleted: usize,
    skipped: Vec<String>,
    missing: Vec<String>,
    failed: Vec<(String, String)>,
}

impl DeleteSummary {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        if self.deleted > 0 {
            writeln!(
                writer,
                "Deleted {} task{}",
                self.deleted,
                if self.deleted == 1 { "" } else { "s" }
            )?;
        } else {
            writeln!(writer, "No tasks deleted")?;
        }
        if !self.skipped.is_empty() {
            writeln!(writer, "Skipped: {}", self.skipped.join(", "))?;
        }
        if !self.missing.is_empty() {
            writeln!(writer, "Not found: {}", self.missing.join(", "))?;
        }
        for (id, reason) in &self.failed {
            writeln!(writer, "Failed {id}: {reason}")?;
        }
        Ok(())
    }
}

/// Accept RFC 3339 instants, or a bare date meaning end of that day in
/// local time.
fn parse_deadline(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid deadline '{raw}': expected RFC 3339 or YYYY-MM-DD"))?;
    let end_of_day = date
        .and_hms_opt(23, 59, 59)
        .context("end-of-day is not a valid time")?;
    let local = end_of_day
        .and_local_timezone(Local)
        .earliest()
        .with_context(|| format!("Deadline '{raw}' is not representable in local time"))?;
    Ok(local.with_timezone(&Utc))
}
