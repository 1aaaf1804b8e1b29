//! Terminal front end for the SchoolHub client core.
//!
//! ```text
//! schoolhub login --identifier anna --password secret
//! schoolhub schedule --week
//! schoolhub clubs join 7
//! ```

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use schoolhub::prelude::*;
use schoolhub::{FileTokenStorage, HttpTransport, telemetry};
use url::Url;

type Client = SchoolHubClient<HttpTransport, FileTokenStorage>;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "schoolhub", about = "SchoolHub from the terminal")]
struct Cli {
    /// API root; overrides SCHOOLHUB_API_URL.
    #[arg(long, global = true)]
    api_url: Option<Url>,

    /// Where the session token is kept. Defaults to the platform data
    /// directory.
    #[arg(long, global = true, env = "SCHOOLHUB_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with login or email and password.
    Login(LoginArgs),
    /// Sign in by confirming in the Telegram bot.
    TelegramLogin,
    /// Forget the stored session.
    Logout,
    /// Lessons for a day (today by default).
    Schedule(ScheduleArgs),
    /// One of the news feeds: achievements, events, olympiads.
    News { feed: NewsFeed },
    #[command(subcommand)]
    Clubs(ClubsCommand),
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Set a new password without signing in.
    ResetPassword {
        #[arg(long)]
        identifier: String,
        #[arg(long, env = "SCHOOLHUB_NEW_PASSWORD")]
        new_password: String,
    },
}

#[derive(Args)]
struct LoginArgs {
    #[arg(long)]
    identifier: String,
    #[arg(long, env = "SCHOOLHUB_PASSWORD")]
    password: String,
}

#[derive(Args)]
struct ScheduleArgs {
    /// Day as YYYY-MM-DD.
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Print the whole week around the day.
    #[arg(long)]
    week: bool,
}

#[derive(Subcommand)]
enum ClubsCommand {
    List,
    Show { id: u64 },
    Join { id: u64 },
    Leave { id: u64 },
    CheckTitle { title: String },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        direction: String,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    Show,
    SetLogin { login: String },
    LinkEmail { email: String },
    Password {
        #[arg(long, env = "SCHOOLHUB_PASSWORD")]
        current: String,
        #[arg(long, env = "SCHOOLHUB_NEW_PASSWORD")]
        new: String,
    },
    TelegramConnect,
    TelegramDisconnect,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = telemetry::init() {
        eprintln!("warning: logging disabled: {e}");
    }

    let client = match build_client(&cli) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = run(&client, cli.command).await;
    print_notices(&client);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if e.is_unauthorized() {
                eprintln!("hint: the session has expired, run `schoolhub login` again");
            }
            ExitCode::FAILURE
        }
    }
}

fn build_client(cli: &Cli) -> Result<Client, ClientError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config.base_url = url.clone();
    }
    let builder = SchoolHubClient::builder().config(config);
    match &cli.session_file {
        Some(path) => builder.build_with_storage(FileTokenStorage::new(path)),
        None => builder.build(),
    }
}

async fn run(client: &Client, command: Command) -> Result<(), ClientError> {
    match command {
        Command::Login(args) => {
            // A rejection leaves a notice; print_notices shows it.
            client
                .credential_login()
                .submit(Credentials::new(args.identifier, args.password))
                .await?;
            println!("Signed in.");
            Ok(())
        }
        Command::TelegramLogin => telegram_login(client).await,
        Command::Logout => {
            client.sign_out()?;
            println!("Signed out.");
            Ok(())
        }
        Command::Schedule(args) => schedule(client, args).await,
        Command::News { feed } => {
            for item in client.news(feed).await? {
                let day = item
                    .published_on()
                    .map(|d| d.to_string())
                    .unwrap_or_default();
                println!("{day:<10}  {}\n            {}", item.title, item.preview());
                if let Some(image) = item.image_url(&client.config().base_url) {
                    println!("            image: {image}");
                }
            }
            Ok(())
        }
        Command::Clubs(command) => clubs(client, command).await,
        Command::Profile(command) => profile(client, command).await,
        Command::ResetPassword {
            identifier,
            new_password,
        } => client.reset_password(&identifier, &new_password).await,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Prints the deep link instead of launching a browser; the user opens it
/// on whichever device has Telegram.
fn print_link(url: &Url) -> io::Result<()> {
    println!("Open this link and confirm the login in Telegram:\n  {url}");
    Ok(())
}

async fn telegram_login(client: &Client) -> Result<(), ClientError> {
    let flow = client.external_login(print_link);
    let mut progress = flow.subscribe();
    let watcher = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = progress.borrow_and_update().clone();
            if let ExternalLoginState::Polling { attempt, remaining } = state {
                eprintln!("waiting for confirmation (attempt {attempt}, {remaining} left)");
            }
        }
    });

    let outcome = tokio::select! {
        outcome = flow.run() => outcome,
        _ = tokio::signal::ctrl_c() => {
            flow.cancel();
            Ok(LoginOutcome::Cancelled)
        }
    };
    watcher.abort();

    match outcome? {
        LoginOutcome::Succeeded => println!("Signed in."),
        LoginOutcome::TimedOut => println!("No confirmation received. Try again."),
        LoginOutcome::Cancelled => println!("Cancelled."),
    }
    Ok(())
}

async fn schedule(client: &Client, args: ScheduleArgs) -> Result<(), ClientError> {
    let day = args.date.unwrap_or_else(|| Local::now().date_naive());
    let days = if args.week {
        week_of(day).to_vec()
    } else {
        vec![day]
    };
    for day in days {
        println!("{}", day.format("%A, %d %B"));
        let lessons = client.schedule(day).await?;
        if lessons.is_empty() {
            println!("  no lessons");
        }
        for lesson in lessons {
            println!(
                "  {}  {:<24} {}",
                lesson.time_range(),
                lesson.subject(),
                lesson.rooms()
            );
        }
    }
    Ok(())
}

async fn clubs(client: &Client, command: ClubsCommand) -> Result<(), ClientError> {
    let directory = client.clubs();
    match command {
        ClubsCommand::List => {
            for club in directory.refresh().await? {
                print_club(&club);
            }
        }
        ClubsCommand::Show { id } => {
            let club = directory.detail(ClubId(id)).await?;
            print_club(&club);
            if !club.description.is_empty() {
                println!("    {}", club.description);
            }
            if let Some(admin) = &club.administration {
                println!("    run by {admin}");
            }
        }
        ClubsCommand::Join { id } => {
            directory.refresh().await?;
            print_club(&directory.join(ClubId(id)).await?);
        }
        ClubsCommand::Leave { id } => {
            directory.refresh().await?;
            print_club(&directory.leave(ClubId(id)).await?);
        }
        ClubsCommand::CheckTitle { title } => {
            if directory.check_title(&title).await? {
                println!("'{title}' is available.");
            } else {
                println!("'{title}' is already taken.");
            }
        }
        ClubsCommand::Create {
            title,
            description,
            direction,
        } => {
            let club = directory
                .create(NewClub {
                    title,
                    description,
                    direction,
                })
                .await?;
            print_club(&club);
        }
    }
    Ok(())
}

fn print_club(club: &Club) {
    let mark = if club.joined { "*" } else { " " };
    let grades = club
        .grade_range()
        .map(|(min, max)| format!("grades {min}-{max}"))
        .unwrap_or_default();
    println!(
        "{mark} {:>4}  {:<28} {:>3} members  {grades}",
        club.id.0, club.title, club.members_count
    );
}

async fn profile(client: &Client, command: ProfileCommand) -> Result<(), ClientError> {
    let settings = client.profile();
    match command {
        ProfileCommand::Show => {
            let profile = settings.load().await?;
            println!("{}", profile.display_name());
            if let Some(class) = profile.class_label() {
                println!("  class     {class}");
            }
            println!("  login     {}", profile.login);
            println!("  email     {}", profile.email.as_deref().unwrap_or("-"));
            println!(
                "  telegram  {}",
                profile.telegram_name.as_deref().unwrap_or("-")
            );
        }
        ProfileCommand::SetLogin { login } => {
            let current = settings.load().await?;
            let edit = ProfileEdit {
                login,
                ..ProfileEdit::from(&current)
            };
            if let SaveOutcome::Saved(profile) = settings.save(edit).await? {
                println!("Login is now {}.", profile.login);
            }
        }
        ProfileCommand::LinkEmail { email } => {
            settings.load().await?;
            settings.link_email(&email).await?;
        }
        ProfileCommand::Password { current, new } => {
            settings.change_password(&current, &new).await?;
        }
        ProfileCommand::TelegramConnect => {
            let url = settings.connect_telegram().await?;
            println!("Open this link to connect Telegram:\n  {url}");
        }
        ProfileCommand::TelegramDisconnect => {
            settings.load().await?;
            settings.disconnect_telegram().await?;
        }
    }
    Ok(())
}

fn print_notices(client: &Client) {
    for notice in client.notices() {
        let tag = match notice.kind {
            NoticeKind::Error => "!",
            NoticeKind::Success => "+",
            NoticeKind::Info => "i",
        };
        eprintln!("[{tag}] {}", notice.message);
    }
}
