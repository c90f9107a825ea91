use crate::claude::{claude_info, launch_session};
use crate::cli::{Commands, HookCommand, InitArgs, WorkspaceCommand};
use crate::config::Config;
use crate::constants::NOTIFY_ERROR_SOUND;
use crate::context::copy_context;
use crate::context_info::render_context_info;
use crate::git::repo_root;
use crate::hook::{AutoCommit, HookInput, auto_commit, read_hook_input};
use crate::init::{InitOptions, InitTarget, install};
use crate::manager::WorkspaceManager;
use crate::notify::{
    Backend, Notification, clock_time, final_response, project_name, send_best_effort,
};
use crate::ui::{CommandResult, OutputMode, emit, print_json, print_table, progress};
use anyhow::{Context, Result};
use std::env;
use std::path::Path;
use tracing::{debug, warn};

pub(crate) fn run(
    command: Commands,
    config: &Config,
    mode: OutputMode,
    verbose: bool,
) -> Result<()> {
    match command {
        Commands::Version => cmd_version(mode),
        Commands::Status => cmd_status(config, mode),
        Commands::Init(args) => cmd_init(&args, config, mode, verbose),
        Commands::Workspace(command) => run_workspace(command, config, mode),
        Commands::Hook(command) => {
            run_hook(command, config);
            Ok(())
        }
    }
}

fn cmd_version(mode: OutputMode) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    if mode.is_json() {
        let result = CommandResult::ok(format!("claudectl {version}")).with("version", version);
        return emit(mode, &result);
    }
    println!("claudectl {version}");
    Ok(())
}

fn cmd_status(config: &Config, mode: OutputMode) -> Result<()> {
    let info = claude_info(config);
    if mode.is_json() {
        let result = if info.installed {
            CommandResult::ok("Claude CLI installed")
        } else {
            CommandResult::failure("Claude CLI not found")
        };
        return emit(mode, &result.with("claude", &info));
    }

    if info.installed {
        let version = info.version.as_deref().unwrap_or("unknown version");
        emit(mode, &CommandResult::ok(format!("Claude CLI: {version}")))?;
        if let Some(path) = &info.path {
            println!("  Path: {path}");
        }
    } else {
        let message = format!("Claude CLI `{}` not found on PATH", config.claude_bin);
        emit(mode, &CommandResult::failure(message))?;
    }
    Ok(())
}

fn cmd_init(args: &InitArgs, config: &Config, mode: OutputMode, verbose: bool) -> Result<()> {
    let target = if args.global {
        let home = dirs::home_dir().context("could not determine home directory")?;
        InitTarget::global(&home)
    } else {
        InitTarget::project(&repo_root()?)
    };
    let options = InitOptions {
        force: args.force,
        index: !args.no_index && !args.global,
    };
    debug!(root = %target.root.display(), ?options, "initializing");

    let report = install(&target, options, config, mode)?;
    let message = if verbose {
        report.detailed()
    } else {
        report.summary()
    };
    let result = CommandResult::ok(message)
        .with("installed", &report.installed)
        .with("skipped", &report.skipped)
        .with("overwritten", &report.overwritten)
        .with("merged", &report.merged)
        .with("indexed", report.indexed);
    emit(mode, &result)
}

fn run_workspace(command: WorkspaceCommand, config: &Config, mode: OutputMode) -> Result<()> {
    let manager = WorkspaceManager::new()?;
    match command {
        WorkspaceCommand::Create { branch, base } => {
            cmd_workspace_create(&manager, &branch, base.as_deref(), mode)
        }
        WorkspaceCommand::Open { branch } => cmd_workspace_open(&manager, &branch, config, mode),
        WorkspaceCommand::Show { branch } => cmd_workspace_show(&manager, &branch, mode),
        WorkspaceCommand::List => cmd_workspace_list(&manager, mode),
        WorkspaceCommand::Delete { branch, force } => {
            manager.delete_workspace(&branch, force)?;
            emit(
                mode,
                &CommandResult::ok(format!("Deleted workspace for branch: {branch}"))
                    .with("branch", &branch),
            )
        }
        WorkspaceCommand::Clean => cmd_workspace_clean(&manager, mode),
        WorkspaceCommand::Status { branch } => cmd_workspace_status(&manager, &branch, mode),
        WorkspaceCommand::Diff { branch, target } => {
            let target = target.unwrap_or_else(|| config.diff_target.clone());
            cmd_workspace_diff(&manager, &branch, &target, mode)
        }
    }
}

fn cmd_workspace_create(
    manager: &WorkspaceManager,
    branch: &str,
    base: Option<&str>,
    mode: OutputMode,
) -> Result<()> {
    progress(mode, &format!("create: preparing workspace for `{branch}`"));
    let workspace = manager.create_workspace(branch, base)?;
    progress(
        mode,
        &format!("create: worktree ready at {}", workspace.path.display()),
    );

    let copied = match copy_context(&workspace, &workspace.repo_root) {
        Ok(copied) => copied,
        Err(err) => {
            warn!("failed to copy context files: {err:#}");
            Vec::new()
        }
    };
    if !copied.is_empty() {
        progress(mode, &format!("create: copied context {}", copied.join(", ")));
    }

    let result = CommandResult::ok(format!(
        "Created workspace for {branch} at {}",
        workspace.path.display()
    ))
    .with("path", workspace.path.display().to_string())
    .with("branch", &workspace.branch)
    .with("commit", &workspace.commit)
    .with("copied_files", &copied);
    emit(mode, &result)?;
    if !mode.is_json() {
        println!("  Open with: claudectl workspace open {branch}");
    }
    Ok(())
}

fn cmd_workspace_open(
    manager: &WorkspaceManager,
    branch: &str,
    config: &Config,
    mode: OutputMode,
) -> Result<()> {
    let workspace = manager.get_workspace(branch)?;
    progress(
        mode,
        &format!("open: launching {} in {}", config.claude_bin, workspace.path.display()),
    );
    launch_session(config, &workspace.path)
}

fn cmd_workspace_show(manager: &WorkspaceManager, branch: &str, mode: OutputMode) -> Result<()> {
    let workspace = manager.get_workspace(branch)?;
    if mode.is_json() {
        let result = CommandResult::data()
            .with("path", workspace.path.display().to_string())
            .with("branch", &workspace.branch);
        return emit(mode, &result);
    }
    // Bare path so `cd $(claudectl workspace show <branch>)` works.
    println!("{}", workspace.path.display());
    Ok(())
}

fn cmd_workspace_list(manager: &WorkspaceManager, mode: OutputMode) -> Result<()> {
    let workspaces = manager.list_workspaces(true);
    if mode.is_json() {
        let rows: Vec<_> = workspaces.iter().map(|workspace| workspace.to_json()).collect();
        return print_json(&rows);
    }

    if workspaces.is_empty() {
        println!("No managed workspaces found.");
        println!("Create one with: claudectl workspace create <branch>");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = workspaces
        .iter()
        .map(|workspace| {
            let (clean, status) = workspace.is_clean();
            let icon = if clean { "✓" } else { "●" };
            vec![
                workspace.display_branch().to_string(),
                workspace.path.display().to_string(),
                format!("{icon} {status}"),
            ]
        })
        .collect();
    print_table(
        mode,
        &["Branch", "Path", "Status"],
        &rows,
        Some("Managed Workspaces"),
    )
}

fn cmd_workspace_clean(manager: &WorkspaceManager, mode: OutputMode) -> Result<()> {
    progress(mode, "clean: scanning managed workspaces");
    let removed = manager.clean_workspaces(true);
    let result = if removed.is_empty() {
        CommandResult::ok("No clean workspaces to remove")
    } else {
        CommandResult::ok(format!("Removed {} workspace(s)", removed.len())).with("removed", &removed)
    };
    emit(mode, &result)
}

fn cmd_workspace_status(manager: &WorkspaceManager, branch: &str, mode: OutputMode) -> Result<()> {
    let workspace = manager.get_workspace(branch)?;
    let status = manager.workspace_status(&workspace);

    if mode.is_json() {
        let result = CommandResult::data()
            .with("branch", &workspace.branch)
            .with("path", workspace.path.display().to_string())
            .with("commit", &workspace.commit)
            .with("is_clean", status.is_clean)
            .with("status", &status.status)
            .with("ahead_behind", status.ahead_behind);
        return emit(mode, &result);
    }

    println!("Workspace: {}", workspace.display_branch());
    println!("Path:      {}", workspace.path.display());
    println!("Commit:    {}", workspace.commit);
    println!("Status:    {}", status.status);
    if let Some(sync) = status.ahead_behind {
        println!(
            "Sync:      {} ahead, {} behind origin",
            sync.ahead, sync.behind
        );
    }
    Ok(())
}

fn cmd_workspace_diff(
    manager: &WorkspaceManager,
    branch: &str,
    target: &str,
    mode: OutputMode,
) -> Result<()> {
    let workspace = manager.get_workspace(branch)?;
    let diff = manager.workspace_diff(&workspace, target)?;
    if mode.is_json() {
        let result = CommandResult::data()
            .with("branch", branch)
            .with("target", target)
            .with("diff", &diff);
        return emit(mode, &result);
    }
    print!("{diff}");
    Ok(())
}

/// Hooks never fail the assistant: every error is logged and swallowed.
fn run_hook(command: HookCommand, config: &Config) {
    let outcome = match command {
        HookCommand::PostEdit => hook_auto_commit(AutoCommit::Edit),
        HookCommand::PostWrite => hook_auto_commit(AutoCommit::NewFile),
        HookCommand::NotifyInput { message } => {
            hook_notify_input(message);
            Ok(())
        }
        HookCommand::NotifyStop => {
            hook_notify_stop();
            Ok(())
        }
        HookCommand::NotifyError { message } => {
            hook_notify_error(message);
            Ok(())
        }
        HookCommand::NotifyTest => {
            hook_notify_test();
            Ok(())
        }
        HookCommand::ContextInfo => hook_context_info(config),
    };
    if let Err(err) = outcome {
        debug!("hook failed: {err:#}");
    }
}

fn hook_auto_commit(kind: AutoCommit) -> Result<()> {
    let Some(input) = read_hook_input() else {
        return Ok(());
    };
    let Some(file_path) = input.file_path() else {
        return Ok(());
    };
    auto_commit(Path::new(file_path), kind)?;
    Ok(())
}

/// Message for an input notification: stdin first, then the argument.
pub(crate) fn input_message(input: Option<&HookInput>, arg: Option<&str>) -> String {
    if let Some(input) = input {
        if input.notification_type.as_deref() == Some("permission_prompt") {
            return input.message().unwrap_or("Permission required").to_string();
        }
        if let Some(message) = input.message() {
            return message.to_string();
        }
    }
    arg.filter(|value| !value.is_empty())
        .unwrap_or("Claude needs your input to continue")
        .to_string()
}

fn hook_notify_input(arg: Option<String>) {
    let input = read_hook_input();
    let message = input_message(input.as_ref(), arg.as_deref());
    send_best_effort(&Notification::for_project("🔔", &project_name(), message));
}

fn hook_notify_stop() {
    let input = read_hook_input();
    let message = input
        .as_ref()
        .and_then(HookInput::transcript_path)
        .and_then(|path| final_response(Path::new(path)))
        .unwrap_or_else(|| format!("Completed at {}", clock_time()));
    send_best_effort(&Notification::for_project("✅", &project_name(), message));
}

fn hook_notify_error(arg: Option<String>) {
    let input = read_hook_input();
    let message = input
        .as_ref()
        .and_then(HookInput::message)
        .or(arg.as_deref().filter(|value| !value.is_empty()))
        .unwrap_or("An error occurred during task execution")
        .to_string();
    send_best_effort(
        &Notification::for_project("❌", &project_name(), message)
            .with_sound(NOTIFY_ERROR_SOUND),
    );
}

fn hook_notify_test() {
    let notification =
        Notification::for_project("🧪", &project_name(), "Notifications are working!");
    let backend = send_best_effort(&notification);
    println!("✓ Test notification sent (using {backend})");
    if backend == Backend::OsaScript {
        println!();
        println!("  Tip: Install terminal-notifier for more reliable notifications:");
        println!("       brew install terminal-notifier");
    }
}

fn hook_context_info(config: &Config) -> Result<()> {
    // Drain stdin so the assistant does not block on a full pipe.
    let _ = read_hook_input();
    let cwd = env::current_dir().context("failed to read current directory")?;
    let home = dirs::home_dir();
    println!("{}", render_context_info(&cwd, home.as_deref(), config));
    Ok(())
}
