//! Command parsing and dispatch.
//!
//! Each command maps onto one view of the board and passes through the same
//! route guard the browser client used.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};

use simpleboard_core::api::ApiError;
use simpleboard_core::models::{
    ApprovalStatus, NewPost, Post, PostUpdate, RegistrationDecision, RegistrationRequest,
    RoleUpdate, UserRole, ViewMode,
};
use simpleboard_core::routes::Route;

use crate::app::{prompt, App};

/// Length of the content preview in post listings.
const EXCERPT_CHARS: usize = 60;

pub const USAGE: &str = "\
Usage: simpleboard <command>

  login [email]                   Log in (prompts for the password)
  logout                          End the session
  whoami                          Show the current session
  register                        Request an account
  boards [--posts]                List boards
  posts [board_id] [--view card|list]
  post <post_id>                  Show a post
  new-post <board_id> --title <t> --content <c> [--view card|list]
  edit-post <post_id> [--title <t>] [--content <c>]
  admin access                    Show board access per user
  admin grant <user_id> <board_ids>   Replace a user's boards (comma separated)
  admin registrations             List registration requests
  admin approve|reject <id> [memo]
  admin users                     List users
  admin role <user_id> <basic|premium|admin> [--premium-until <rfc3339>]
  shell                           Interactive session with idle timeout
";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { email: Option<String> },
    Logout,
    WhoAmI,
    Register,
    Boards { with_posts: bool },
    Posts { board_id: Option<i64>, view: Option<ViewMode> },
    Post { post_id: i64 },
    NewPost { board_id: i64, title: String, content: String, view: ViewMode },
    EditPost { post_id: i64, title: Option<String>, content: Option<String> },
    AdminAccess,
    AdminGrant { user_id: i64, board_ids: Vec<i64> },
    AdminRegistrations,
    AdminDecide { registration_id: i64, status: ApprovalStatus, memo: Option<String> },
    AdminUsers,
    AdminRole { user_id: i64, role: UserRole, premium_until: Option<DateTime<Utc>> },
    Shell,
    Help,
}

fn parse_id(value: Option<&String>, what: &str) -> Result<i64> {
    let value = value.ok_or_else(|| anyhow!("Missing {}", what))?;
    value
        .parse()
        .with_context(|| format!("Invalid {}: {}", what, value))
}

/// Value following `--name`, if the flag is present.
fn flag_value(args: &[String], name: &str) -> Result<Option<String>> {
    match args.iter().position(|a| a == name) {
        Some(i) => args
            .get(i + 1)
            .cloned()
            .map(Some)
            .ok_or_else(|| anyhow!("{} needs a value", name)),
        None => Ok(None),
    }
}

fn parse_view(args: &[String]) -> Result<Option<ViewMode>> {
    flag_value(args, "--view")?
        .map(|v| ViewMode::parse(&v).ok_or_else(|| anyhow!("View must be card or list")))
        .transpose()
}

impl Command {
    /// Parse the arguments after the program name.
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some(name) = args.first() else {
            return Ok(Command::Help);
        };
        let rest = &args[1..];

        let command = match name.as_str() {
            "login" => Command::Login {
                email: rest.first().filter(|a| !a.starts_with("--")).cloned(),
            },
            "logout" => Command::Logout,
            "whoami" => Command::WhoAmI,
            "register" => Command::Register,
            "boards" => Command::Boards {
                with_posts: rest.iter().any(|a| a == "--posts"),
            },
            "posts" => Command::Posts {
                board_id: match rest.first().filter(|a| !a.starts_with("--")) {
                    Some(id) => Some(parse_id(Some(id), "board id")?),
                    None => None,
                },
                view: parse_view(rest)?,
            },
            "post" => Command::Post {
                post_id: parse_id(rest.first(), "post id")?,
            },
            "new-post" => Command::NewPost {
                board_id: parse_id(rest.first(), "board id")?,
                title: flag_value(rest, "--title")?.unwrap_or_default(),
                content: flag_value(rest, "--content")?.unwrap_or_default(),
                view: parse_view(rest)?.unwrap_or_default(),
            },
            "edit-post" => Command::EditPost {
                post_id: parse_id(rest.first(), "post id")?,
                title: flag_value(rest, "--title")?,
                content: flag_value(rest, "--content")?,
            },
            "admin" => Self::parse_admin(rest)?,
            "shell" => Command::Shell,
            "help" | "--help" | "-h" => Command::Help,
            other => bail!("Unknown command: {}", other),
        };
        Ok(command)
    }

    fn parse_admin(args: &[String]) -> Result<Self> {
        let sub = args.first().map(String::as_str).unwrap_or("");
        let rest = args.get(1..).unwrap_or(&[]);
        let command = match sub {
            "access" => Command::AdminAccess,
            "grant" => {
                let user_id = parse_id(rest.first(), "user id")?;
                let board_ids = match rest.get(1).map(String::as_str) {
                    None | Some("") => Vec::new(),
                    Some(list) => list
                        .split(',')
                        .map(|id| id.trim().parse().with_context(|| format!("Invalid board id: {}", id)))
                        .collect::<Result<Vec<i64>>>()?,
                };
                Command::AdminGrant { user_id, board_ids }
            }
            "registrations" => Command::AdminRegistrations,
            "approve" | "reject" => Command::AdminDecide {
                registration_id: parse_id(rest.first(), "registration id")?,
                status: if sub == "approve" {
                    ApprovalStatus::Approved
                } else {
                    ApprovalStatus::Rejected
                },
                memo: (rest.len() > 1).then(|| rest[1..].join(" ")),
            },
            "users" => Command::AdminUsers,
            "role" => {
                let user_id = parse_id(rest.first(), "user id")?;
                let role = rest
                    .get(1)
                    .and_then(|r| UserRole::parse(r))
                    .ok_or_else(|| anyhow!("Role must be basic, premium or admin"))?;
                let premium_until = flag_value(rest, "--premium-until")?
                    .map(|v| {
                        DateTime::parse_from_rfc3339(&v)
                            .map(|d| d.with_timezone(&Utc))
                            .with_context(|| format!("Invalid --premium-until: {}", v))
                    })
                    .transpose()?;
                Command::AdminRole { user_id, role, premium_until }
            }
            other => bail!("Unknown admin command: {}", other),
        };
        Ok(command)
    }

    /// The view this command shows, for the route guard.
    pub fn location(&self) -> Option<String> {
        let route = match self {
            // Login keeps the current location so its redirect parameter survives.
            Command::Login { .. }
            | Command::Logout
            | Command::Help
            | Command::WhoAmI
            | Command::Shell => return None,
            Command::Register => Route::Register,
            Command::Boards { .. } | Command::Posts { .. } => Route::Boards,
            Command::Post { post_id } | Command::EditPost { post_id, .. } => Route::Post(*post_id),
            Command::NewPost { .. } => Route::NewPost,
            Command::AdminAccess | Command::AdminGrant { .. } => Route::BoardAccess,
            Command::AdminRegistrations
            | Command::AdminDecide { .. }
            | Command::AdminUsers
            | Command::AdminRole { .. } => Route::Admin,
        };
        Some(route.path())
    }
}

/// Run one command. API failures are reported and do not abort the caller.
pub async fn run(app: &mut App, command: Command) -> Result<()> {
    if let Some(location) = command.location() {
        if !app.enter(&location) {
            return Ok(());
        }
    }

    let result = match command {
        Command::Help => {
            print!("{}", USAGE);
            Ok(())
        }
        Command::Login { email } => return app.login_interactive(email).await,
        Command::Logout => {
            app.logout();
            Ok(())
        }
        Command::WhoAmI => {
            who_am_i(app);
            Ok(())
        }
        Command::Register => register(app).await?,
        Command::Boards { with_posts } => boards(app, with_posts).await,
        Command::Posts { board_id, view } => posts(app, board_id, view).await,
        Command::Post { post_id } => app.client.get_post(post_id).await.map(|p| print_post(&p)),
        Command::NewPost { board_id, title, content, view } => {
            let post = NewPost { title, content, view_type: view };
            app.client.create_post(board_id, &post).await.map(|p| {
                app.prefs.set_selected_board(board_id);
                println!("Post #{} created.", p.id);
            })
        }
        Command::EditPost { post_id, title, content } => edit_post(app, post_id, title, content).await,
        Command::AdminAccess => admin_access(app).await,
        Command::AdminGrant { user_id, board_ids } => app
            .client
            .update_board_access(user_id, board_ids)
            .await
            .map(|_| println!("Board access updated.")),
        Command::AdminRegistrations => app.client.list_registrations().await.map(|list| {
            for r in list {
                println!(
                    "#{:<4} {:<9} {:<28} {} ({})",
                    r.id,
                    r.status.as_str(),
                    r.email,
                    r.name,
                    r.submitted_at.format("%Y-%m-%d")
                );
            }
        }),
        Command::AdminDecide { registration_id, status, memo } => {
            let decision = RegistrationDecision { status, memo };
            app.client
                .decide_registration(registration_id, &decision)
                .await
                .map(|r| println!("Registration #{} is now {}.", r.id, r.status.as_str()))
        }
        Command::AdminUsers => app.client.list_users().await.map(|users| {
            for u in users {
                println!("#{:<4} {:<8} {:<9} {}", u.id, u.role, u.status, u.display_name());
            }
        }),
        Command::AdminRole { user_id, role, premium_until } => {
            let update = RoleUpdate { role: Some(role), premium_until };
            app.client
                .update_user_role(user_id, &update)
                .await
                .map(|u| println!("{} is now {}.", u.email, u.role))
        }
        Command::Shell => {
            println!("Already in an interactive shell.");
            Ok(())
        }
    };

    if let Err(e) = result {
        app.report(&e);
    }
    Ok(())
}

fn who_am_i(app: &App) {
    match app.session.access_token() {
        Some(_) if app.session.is_authenticated() => {
            let remaining = app
                .session
                .time_until_expiry()
                .map(|d| d.num_minutes())
                .unwrap_or_default();
            println!(
                "{} ({}), session expires in {} min",
                app.session.email().unwrap_or_else(|| "unknown".to_string()),
                app.session.role().map(|r| r.as_str()).unwrap_or("member"),
                remaining
            );
        }
        _ => {
            app.render_login_notice();
            println!("Not logged in.");
        }
    }
}

async fn register(app: &App) -> Result<Result<(), ApiError>> {
    let request = RegistrationRequest {
        name: prompt("Name: ")?,
        email: prompt("Email: ")?,
        organization: prompt("Organization (optional): ")?,
        purpose: prompt("Purpose (optional): ")?,
        accepted_terms: prompt("Accept the terms of use? [y/N]: ")?.to_lowercase() == "y",
    };
    Ok(app.client.register(&request).await.map(|_| {
        println!("Registration submitted. An administrator will review it.");
    }))
}

async fn boards(app: &App, with_posts: bool) -> Result<(), ApiError> {
    if with_posts {
        for overview in app.client.list_boards_with_posts().await? {
            println!("#{} {} ({} posts)", overview.board.id, overview.board.name, overview.posts.len());
            for post in &overview.posts {
                print_post_line(post);
            }
        }
        return Ok(());
    }

    let selected = app.prefs.selected_board();
    for board in app.client.list_boards().await? {
        let marker = if Some(board.id) == selected { "*" } else { " " };
        println!("{}#{:<4} {:<24} {}", marker, board.id, board.name, board.display_description());
    }
    Ok(())
}

async fn posts(app: &App, board_id: Option<i64>, view: Option<ViewMode>) -> Result<(), ApiError> {
    let board_id = match board_id.or_else(|| app.prefs.selected_board()) {
        Some(id) => id,
        None => match app.client.list_boards().await?.first() {
            Some(board) => board.id,
            None => {
                println!("No boards available.");
                return Ok(());
            }
        },
    };
    app.prefs.set_selected_board(board_id);
    if let Some(view) = view {
        app.prefs.set_view_mode(view);
    }

    let posts = app.client.list_posts(board_id, view).await?;
    if posts.is_empty() {
        println!("No posts yet.");
    }
    match app.prefs.view_mode() {
        ViewMode::List => posts.iter().for_each(print_post_line),
        ViewMode::Card => posts.iter().for_each(|p| {
            println!("#{} {}", p.id, p.title);
            println!("   {}", p.excerpt(EXCERPT_CHARS));
            println!("   by {} on {}\n", p.author_display(), p.created_at.format("%Y-%m-%d %H:%M"));
        }),
    }
    Ok(())
}

async fn edit_post(
    app: &App,
    post_id: i64,
    title: Option<String>,
    content: Option<String>,
) -> Result<(), ApiError> {
    let (title, content) = match (title, content) {
        (Some(title), Some(content)) => (title, content),
        (title, content) => {
            let current = app.client.get_post(post_id).await?;
            (title.unwrap_or(current.title), content.unwrap_or(current.content))
        }
    };
    let post = app
        .client
        .update_post(post_id, &PostUpdate { title, content })
        .await?;
    println!("Post #{} updated.", post.id);
    Ok(())
}

async fn admin_access(app: &App) -> Result<(), ApiError> {
    let map = app.client.board_access().await?;
    for user in &map.users {
        let names: Vec<&str> = map
            .boards_for(user.id)
            .iter()
            .filter_map(|id| map.boards.iter().find(|b| b.id == *id))
            .map(|b| b.name.as_str())
            .collect();
        println!("#{:<4} {:<28} {}", user.id, user.email, names.join(", "));
    }
    Ok(())
}

fn print_post_line(post: &Post) {
    println!(
        "  #{:<5} {:<40} {:<20} {}",
        post.id,
        post.title,
        post.author_display(),
        post.created_at.format("%Y-%m-%d")
    );
}

fn print_post(post: &Post) {
    println!("{}", post.title);
    println!(
        "by {} on {}{}",
        post.author_display(),
        post.created_at.format("%Y-%m-%d %H:%M"),
        post.board_name
            .as_deref()
            .map(|b| format!(" in {}", b))
            .unwrap_or_default()
    );
    println!();
    println!("{}", post.content);
    for attachment in &post.attachments {
        println!("[attachment] {} ({} bytes)", attachment.original_name, attachment.file_size);
    }
    for embed in &post.youtube_embeds {
        println!("[video] https://youtu.be/{}", embed.video_id);
    }
}
