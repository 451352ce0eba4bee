mod commands;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use taskdeck::auth;
use taskdeck::db::Database;

#[derive(Parser)]
#[command(name = "taskdeck")]
#[command(about = "A small multi-user project and task tracker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize taskdeck in the current directory
    Init,

    /// Verify a username and password
    Login {
        username: String,
        password: String,
    },

    /// User management
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Project management
    Project {
        #[command(subcommand)]
        action: ProjectCommands,
    },

    /// Task management
    Task {
        #[command(subcommand)]
        action: TaskCommands,
    },

    /// Comments on a task
    Comment {
        #[command(subcommand)]
        action: CommentCommands,
    },

    /// Show a user's in-app notifications, newest first
    Inbox {
        /// Recipient username
        username: String,
    },

    /// Dump all projects, tasks, and comments as JSON (admin only)
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
        /// Acting username
        #[arg(long = "as")]
        actor: String,
    },

    /// Global notification channel settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user (admin only)
    Create {
        username: String,
        password: String,
        /// Email address for the email channel
        #[arg(long)]
        email: Option<String>,
        /// Phone number for the SMS channel
        #[arg(long)]
        phone: Option<String>,
        /// Grant the admin role
        #[arg(long)]
        admin: bool,
        /// Acting username
        #[arg(long = "as")]
        actor: String,
    },
    /// List member accounts
    List,
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Create a project (admin only)
    Create {
        name: String,
        description: String,
        /// Acting username
        #[arg(long = "as")]
        actor: String,
    },
    /// List projects
    List,
    /// Show a project with its progress
    Show {
        /// Project ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Create a task in a project (admin only)
    Create {
        /// Project ID
        project: i64,
        name: String,
        description: String,
        /// Assignee username
        #[arg(long)]
        assign: String,
        /// Request an email notification for the assignee
        #[arg(long)]
        notify_email: bool,
        /// Request an in-app notification for the assignee
        #[arg(long)]
        notify_in_app: bool,
        /// Request an SMS notification for the assignee
        #[arg(long)]
        notify_sms: bool,
        /// Acting username
        #[arg(long = "as")]
        actor: String,
    },
    /// List tasks in a project visible to the acting user
    List {
        /// Project ID
        project: i64,
        /// Acting username
        #[arg(long = "as")]
        actor: String,
    },
    /// Show a task with its comments and the statuses the actor may set
    Show {
        /// Task ID
        id: i64,
        /// Acting username
        #[arg(long = "as")]
        actor: String,
    },
    /// Change a task's status
    Status {
        /// Task ID
        id: i64,
        /// New status (New, Opened, In-Progress, Completed, Re-Opened, Closed)
        status: String,
        /// Acting username
        #[arg(long = "as")]
        actor: String,
    },
    /// Replace a task's description
    Describe {
        /// Task ID
        id: i64,
        description: String,
    },
    /// Delete a task and its comments (admin only)
    Delete {
        /// Task ID
        id: i64,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
        /// Acting username
        #[arg(long = "as")]
        actor: String,
    },
}

#[derive(Subcommand)]
enum CommentCommands {
    /// Post a comment on a task
    Add {
        /// Task ID
        task: i64,
        text: String,
        /// Acting username
        #[arg(long = "as")]
        actor: String,
    },
    /// List a task's comments, newest first
    List {
        /// Task ID
        task: i64,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show the global channel toggles
    Show,
    /// Update the global channel toggles (admin only)
    Set {
        #[arg(long)]
        email: Option<bool>,
        #[arg(long)]
        in_app: Option<bool>,
        #[arg(long)]
        sms: Option<bool>,
        /// Acting username
        #[arg(long = "as")]
        actor: String,
    },
}

fn find_taskdeck_dir() -> Result<PathBuf> {
    let mut current = env::current_dir()?;

    loop {
        let candidate = current.join(".taskdeck");
        if candidate.exists() && candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            bail!("Not a taskdeck directory (or any parent). Run 'taskdeck init' first.");
        }
    }
}

fn get_db() -> Result<Database> {
    let taskdeck_dir = find_taskdeck_dir()?;
    let db_path = taskdeck_dir.join("taskdeck.db");
    let db = Database::open(&db_path).context("Failed to open database")?;
    if auth::ensure_default_admin(&db)? {
        println!(
            "Created default admin (username: {}, password: {}). Change the password.",
            auth::DEFAULT_ADMIN_USERNAME,
            auth::DEFAULT_ADMIN_PASSWORD
        );
    }
    Ok(db)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let cwd = env::current_dir()?;
            commands::init::run(&cwd)
        }

        Commands::Login { username, password } => {
            let db = get_db()?;
            commands::user::login(&db, &username, &password)
        }

        Commands::User { action } => {
            let db = get_db()?;
            match action {
                UserCommands::Create {
                    username,
                    password,
                    email,
                    phone,
                    admin,
                    actor,
                } => commands::user::create(
                    &db,
                    &username,
                    &password,
                    email.as_deref(),
                    phone.as_deref(),
                    admin,
                    &actor,
                ),
                UserCommands::List => commands::user::list(&db),
            }
        }

        Commands::Project { action } => {
            let db = get_db()?;
            match action {
                ProjectCommands::Create {
                    name,
                    description,
                    actor,
                } => commands::project::create(&db, &name, &description, &actor),
                ProjectCommands::List => commands::project::list(&db),
                ProjectCommands::Show { id } => commands::project::show(&db, id),
            }
        }

        Commands::Task { action } => {
            let db = get_db()?;
            match action {
                TaskCommands::Create {
                    project,
                    name,
                    description,
                    assign,
                    notify_email,
                    notify_in_app,
                    notify_sms,
                    actor,
                } => commands::task::create(
                    &db,
                    project,
                    &name,
                    &description,
                    &assign,
                    notify_email,
                    notify_in_app,
                    notify_sms,
                    &actor,
                ),
                TaskCommands::List { project, actor } => {
                    commands::task::list(&db, project, &actor)
                }
                TaskCommands::Show { id, actor } => commands::task::show(&db, id, &actor),
                TaskCommands::Status { id, status, actor } => {
                    commands::task::status(&db, id, &status, &actor)
                }
                TaskCommands::Describe { id, description } => {
                    commands::task::describe(&db, id, &description)
                }
                TaskCommands::Delete { id, force, actor } => {
                    commands::task::delete(&db, id, force, &actor)
                }
            }
        }

        Commands::Comment { action } => {
            let db = get_db()?;
            match action {
                CommentCommands::Add { task, text, actor } => {
                    commands::comment::add(&db, task, &text, &actor)
                }
                CommentCommands::List { task } => commands::comment::list(&db, task),
            }
        }

        Commands::Inbox { username } => {
            let db = get_db()?;
            commands::user::inbox(&db, &username)
        }

        Commands::Export { output, actor } => {
            let db = get_db()?;
            commands::export::run_json(&db, output.as_deref(), &actor)
        }

        Commands::Settings { action } => {
            let db = get_db()?;
            match action {
                SettingsCommands::Show => commands::settings::show(&db),
                SettingsCommands::Set {
                    email,
                    in_app,
                    sms,
                    actor,
                } => commands::settings::set(&db, email, in_app, sms, &actor),
            }
        }
    }
}
