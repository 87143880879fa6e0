use std::io::Write;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use taskmark_core::filter::TaskFilterState;
use taskmark_core::model::FilterSelection;
use taskmark_core::parser::{parse_title, ParseResult};
use taskmark_core::services::TasksService;
use taskmark_core::status::resolve_status;

use crate::cli::{Cli, CliCommand, ListArgs, ParseArgs, StatusArgs};
use crate::config;

pub fn execute<W: Write>(cli: &Cli, command: CliCommand, mut writer: W) -> Result<()> {
    match command {
        CliCommand::Parse(args) => handle_parse(&args, &mut writer),
        CliCommand::Status(args) => handle_status(&args, &mut writer),
        CliCommand::List(args) => {
            let config = config::from_cli(cli)?;
            let service = TasksService::new(&config)?;
            handle_list(&service, &args, &mut writer)
        }
        CliCommand::Mcp(_) => Err(anyhow!("launch the MCP server directly")),
    }
}

fn handle_parse<W: Write>(args: &ParseArgs, mut writer: W) -> Result<()> {
    let now = parse_timestamp(args.now.as_deref())?.unwrap_or_else(Utc::now);
    let raw = args.text.join(" ");
    let result = parse_title(&raw, now);

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&result)?)?;
    } else {
        write_parse_result(&result, &mut writer)?;
    }

    if !result.is_valid() {
        bail!(
            "{} invalid directive{}",
            result.errors.len(),
            if result.errors.len() == 1 { "" } else { "s" }
        );
    }
    Ok(())
}

fn write_parse_result<W: Write>(result: &ParseResult, mut writer: W) -> Result<()> {
    writeln!(writer, "Title: {}", result.title)?;
    if let Some(priority) = result.priority {
        writeln!(writer, "Priority: {}", priority)?;
    }
    if let Some(deadline) = result.deadline {
        writeln!(
            writer,
            "Deadline: {}",
            deadline.with_timezone(&Local).format("%d.%m.%Y %H:%M %:z")
        )?;
    }
    for error in &result.errors {
        writeln!(writer, "Error: {}", error)?;
    }
    Ok(())
}

fn handle_status<W: Write>(args: &StatusArgs, mut writer: W) -> Result<()> {
    let deadline = parse_timestamp(args.deadline.as_deref())?;
    let completed_at = parse_timestamp(args.completed_at.as_deref())?;
    let now = parse_timestamp(args.now.as_deref())?.unwrap_or_else(Utc::now);
    if completed_at.is_some() && !args.completed {
        bail!("--completed-at requires --completed");
    }

    let status = resolve_status(deadline, args.completed, completed_at, now);
    writeln!(writer, "{}", status)?;
    Ok(())
}

fn handle_list<W: Write>(service: &TasksService, args: &ListArgs, mut writer: W) -> Result<()> {
    let mut state = TaskFilterState::new(service.page_size());
    let ticket = state.replace(FilterSelection {
        status: args.status,
        priority: args.priority,
        sort_field: args.sort_field,
        sort_order: args.sort_order,
    });

    let mut total = 0;
    let mut next = Some(ticket);
    while let Some(ticket) = next.take() {
        let page = service
            .fetch_page(&ticket.query)
            .with_context(|| format!("failed to load page {}", ticket.query.page))?;
        total = page.meta.total;
        state.receive(&ticket, page);
        if state.loaded_pages() < args.pages {
            next = state.next_page();
        }
    }

    if let Some(summary) = state.summary() {
        writeln!(writer, "Filters: {}", summary)?;
    }
    for resolved in service.resolve_all(state.tasks()) {
        let deadline = resolved
            .task
            .deadline
            .map(|d| d.with_timezone(&Local).format("%d.%m.%Y").to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            writer,
            "{:<9} {:<8} {:<10} {}",
            resolved.display_status.as_str(),
            resolved.task.priority.as_str(),
            deadline,
            resolved.task.title
        )?;
    }
    writeln!(
        writer,
        "Showing {} of {} task{}",
        state.tasks().len(),
        total,
        if total == 1 { "" } else { "s" }
    )?;
    Ok(())
}

fn parse_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|_| anyhow!("invalid RFC3339 timestamp: {}", raw))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use taskmark_core::model::{DisplayStatus, SortField, SortOrder};
    use tempfile::TempDir;

    fn run(cli: &Cli, command: CliCommand) -> (Result<()>, String) {
        let mut output = Vec::new();
        let result = execute(cli, command, &mut output);
        (result, String::from_utf8(output).expect("utf8"))
    }

    fn cli_for(dir: &TempDir) -> Cli {
        Cli {
            data_dir: Some(dir.path().to_path_buf()),
            command: CliCommand::Mcp(crate::cli::McpArgs { log_filter: None }),
        }
    }

    fn parse_args(text: &str) -> ParseArgs {
        ParseArgs {
            text: text.split(' ').map(str::to_string).collect(),
            now: Some("2026-04-10T12:00:00Z".into()),
            json: false,
        }
    }

    #[test]
    fn parse_prints_clean_title_and_priority() {
        let dir = TempDir::new().expect("temp dir");
        let (result, output) = run(
            &cli_for(&dir),
            CliCommand::Parse(parse_args("Call Anna !2 tomorrow")),
        );
        result.expect("parse succeeds");
        assert_eq!(output, "Title: Call Anna tomorrow\nPriority: HIGH\n");
    }

    #[test]
    fn parse_fails_on_invalid_directive_after_printing() {
        let dir = TempDir::new().expect("temp dir");
        let (result, output) = run(
            &cli_for(&dir),
            CliCommand::Parse(parse_args("Задача !before 01.01.2000")),
        );
        assert!(result.is_err());
        assert!(output.starts_with("Title: Задача !before 01.01.2000\n"));
        assert!(output.contains("Error: deadline directive '!before 01.01.2000'"));
    }

    #[test]
    fn parse_json_includes_directives() {
        let dir = TempDir::new().expect("temp dir");
        let mut args = parse_args("Report !4");
        args.json = true;
        let (result, output) = run(&cli_for(&dir), CliCommand::Parse(args));
        result.expect("parse succeeds");

        let value: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(value["title"].as_str(), Some("Report"));
        assert_eq!(value["priority"].as_str(), Some("LOW"));
        assert_eq!(value["directives"][0]["kind"].as_str(), Some("priority"));
    }

    #[test]
    fn status_resolves_late_completion() {
        let dir = TempDir::new().expect("temp dir");
        let args = StatusArgs {
            deadline: Some("2026-04-24T00:00:00Z".into()),
            completed: true,
            completed_at: Some("2026-04-25T09:00:00Z".into()),
            now: Some("2026-05-01T00:00:00Z".into()),
        };
        let (result, output) = run(&cli_for(&dir), CliCommand::Status(args));
        result.expect("status");
        assert_eq!(output, "LATE\n");
    }

    #[test]
    fn status_rejects_completed_at_without_completion() {
        let dir = TempDir::new().expect("temp dir");
        let args = StatusArgs {
            deadline: None,
            completed: false,
            completed_at: Some("2026-04-25T09:00:00Z".into()),
            now: None,
        };
        let (result, _) = run(&cli_for(&dir), CliCommand::Status(args));
        assert!(result.is_err());
    }

    #[test]
    fn list_applies_filters_to_seed() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(
            dir.path().join("tasks.json"),
            r#"[
                {"id": "1", "title": "Renew visa", "priority": "CRITICAL", "deadline": "2000-01-01T00:00:00Z", "created_at": "1999-12-01T00:00:00Z"},
                {"id": "2", "title": "Plan garden", "priority": "LOW", "deadline": "2099-01-01T00:00:00Z", "created_at": "1999-12-02T00:00:00Z"},
                {"id": "3", "title": "Old report", "priority": "HIGH", "deadline": "1999-06-01T00:00:00Z", "created_at": "1999-12-03T00:00:00Z"}
            ]"#,
        )
        .expect("write seed");

        let args = ListArgs {
            status: Some(DisplayStatus::Overdue),
            priority: None,
            sort_field: Some(SortField::Deadline),
            sort_order: Some(SortOrder::Asc),
            pages: 1,
        };
        let (result, output) = run(&cli_for(&dir), CliCommand::List(args));
        result.expect("list");

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Filters: status:overdue | sort:deadline asc");
        assert!(lines[1].ends_with("Old report"));
        assert!(lines[2].ends_with("Renew visa"));
        assert_eq!(lines[3], "Showing 2 of 2 tasks");
    }
}
