use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "claudectl",
    version,
    about = "Git worktree workspaces, lifecycle hooks and project setup for Claude Code"
)]
pub(crate) struct Cli {
    /// Print machine-readable JSON instead of human output.
    #[arg(short = 'j', long, global = true)]
    pub(crate) json: bool,
    /// Show detailed output and log debug diagnostics to stderr.
    #[arg(short = 'v', long, global = true)]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Print the claudectl version.
    Version,
    /// Show whether the Claude CLI is installed.
    Status,
    /// Install CLAUDE.md, agents, skills, settings and MCP servers.
    Init(InitArgs),
    /// Manage isolated git worktree workspaces.
    #[command(subcommand, alias = "ws")]
    Workspace(WorkspaceCommand),
    /// Entry points called by Claude Code lifecycle hooks.
    #[command(subcommand)]
    Hook(HookCommand),
}

#[derive(Debug, Args)]
pub(crate) struct InitArgs {
    /// Install to $HOME/.claude instead of the current repository.
    #[arg(short = 'g', long)]
    pub(crate) global: bool,
    /// Overwrite existing files.
    #[arg(short = 'f', long)]
    pub(crate) force: bool,
    /// Skip repository indexing via the Claude CLI.
    #[arg(long)]
    pub(crate) no_index: bool,
}

#[derive(Debug, Subcommand)]
pub(crate) enum WorkspaceCommand {
    /// Create a workspace for a branch, creating the branch if needed.
    #[command(alias = "new")]
    Create {
        branch: String,
        /// Revision the new branch starts from.
        #[arg(short = 'b', long)]
        base: Option<String>,
    },
    /// Launch Claude inside a workspace.
    Open { branch: String },
    /// Show details of one workspace.
    Show { branch: String },
    /// List workspaces of the current repository.
    #[command(alias = "ls")]
    List,
    /// Remove a workspace.
    #[command(alias = "rm")]
    Delete {
        branch: String,
        /// Remove even with uncommitted changes.
        #[arg(short = 'f', long)]
        force: bool,
    },
    /// Remove every clean managed workspace.
    Clean,
    /// Show cleanliness and ahead/behind counts of a workspace.
    Status { branch: String },
    /// Diff a workspace against a target branch.
    Diff {
        branch: String,
        /// Branch or revision to diff against.
        #[arg(short = 't', long)]
        target: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum HookCommand {
    /// PostToolUse hook for Edit: commit the edited file on feature branches.
    PostEdit,
    /// PostToolUse hook for Write: commit the new file on feature branches.
    PostWrite,
    /// Notification hook: Claude is waiting for input.
    NotifyInput { message: Option<String> },
    /// Stop hook: Claude finished a task.
    NotifyStop,
    /// Send an error notification.
    NotifyError { message: Option<String> },
    /// Send a test notification.
    NotifyTest,
    /// UserPromptSubmit hook: print live repository context.
    ContextInfo,
}
