use std::path::PathBuf;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::dashboard::Dashboard;
use crate::io::config_io::{self, Workspace};
use crate::io::fetch::fetch_and_build;
use crate::telemetry::{self, LogTarget};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Directory to start workspace discovery from: `-C` when given, else cwd
pub fn resolve_start(project_dir: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match project_dir {
        Some(dir) => Ok(std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?),
        None => Ok(std::env::current_dir()?),
    }
}

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let level = telemetry::level_from_verbosity(cli.verbose).to_string();
    if let Err(err) = telemetry::init(LogTarget::Stderr, &level) {
        eprintln!("warning: {err}");
    }

    let start = resolve_start(cli.project_dir.as_deref())?;
    let workspace = config_io::open_workspace(&start)?;

    match cli.command {
        None => Err("no command given".into()),
        Some(Commands::Tree(args)) => cmd_tree(&workspace, args, json),
        Some(Commands::Stats(args)) => cmd_stats(&workspace, args, json),
        Some(Commands::Check) => cmd_check(&workspace, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_dashboard(workspace: &Workspace) -> Result<Dashboard, Box<dyn std::error::Error>> {
    let source = workspace.issue_source();
    let graph = fetch_and_build(source.as_ref())?;
    tracing::debug!(source = %source.describe(), issues = graph.len(), "graph built");
    Ok(Dashboard::new(graph, None, workspace.config.inject.clone()))
}

fn apply_view(dashboard: &mut Dashboard, view: &ViewArgs) {
    dashboard.set_view_mode(view.mode);
    if let Some(text) = &view.filter {
        dashboard.set_filter_text(text);
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_tree(
    workspace: &Workspace,
    args: TreeArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut dashboard = load_dashboard(workspace)?;
    if args.expand_all {
        dashboard.expand_all();
    }
    apply_view(&mut dashboard, &args.view);

    let graph = dashboard.graph();
    if json {
        let out = TreeJson {
            mode: args.view.mode,
            filter: args.view.filter.clone(),
            rows: dashboard
                .rows()
                .iter()
                .map(|row| row_to_json(graph, row))
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if dashboard.rows().is_empty() {
        if dashboard.filter().is_active() {
            println!("no matching issues");
        } else {
            println!("no issues");
        }
    } else {
        for row in dashboard.rows() {
            println!("{}", format_row_line(graph, row));
        }
    }
    Ok(())
}

fn cmd_stats(
    workspace: &Workspace,
    args: StatsArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut dashboard = load_dashboard(workspace)?;
    // Counts cover every issue that passes the view, not just expanded rows
    dashboard.expand_all();
    apply_view(&mut dashboard, &args.view);
    let stats = dashboard.stats();

    if json {
        let out = StatsJson {
            mode: args.view.mode,
            filter: args.view.filter,
            stats,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", format_stats(&stats));
    }
    Ok(())
}

fn cmd_check(workspace: &Workspace, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let source = workspace.issue_source();
    let describe = source.describe();
    let issues = source.export()?;
    let count = issues.len();

    match crate::graph::build(issues) {
        Ok(graph) => {
            let roots = graph.roots().len();
            let multi = graph.iter().filter(|(_, n)| n.is_multi_parent()).count();
            let blocked = graph
                .iter()
                .filter(|(_, n)| n.is_blocked && !n.status().is_closed())
                .count();
            if json {
                let out = CheckJson {
                    ok: true,
                    source: describe,
                    issues: count,
                    roots: Some(roots),
                    multi_parent: Some(multi),
                    error: None,
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("\u{2713} {} issues, {} roots", count, roots);
                if multi > 0 {
                    println!("  {} under more than one parent", multi);
                }
                if blocked > 0 {
                    println!("  {} blocked", blocked);
                }
            }
            Ok(())
        }
        Err(err) => {
            tracing::warn!(%err, "graph check failed");
            if json {
                let out = CheckJson {
                    ok: false,
                    source: describe,
                    issues: count,
                    roots: None,
                    multi_parent: None,
                    error: Some(err.to_string()),
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("\u{2717} {}", err);
            }
            Err("check failed".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_start_rejects_missing_directories() {
        let err = resolve_start(Some("/definitely/not/here")).unwrap_err();
        assert!(err.to_string().contains("cannot resolve -C path"));
    }

    #[test]
    fn resolve_start_canonicalizes() {
        let dir = tempfile::tempdir().unwrap();
        let got = resolve_start(dir.path().to_str()).unwrap();
        assert_eq!(got, dir.path().canonicalize().unwrap());
    }
}
