use clap::{Parser, Subcommand};
use fadmin_client::cache::ResourceCaches;
use fadmin_client::config::ClientConfig;
use fadmin_client::credentials::FileCredentialStore;
use fadmin_client::error::LogErrExt;
use fadmin_client::navigation::Navigator;
use fadmin_client::{ApiClient, Error};
use fadmin_protocol::Id;
use fadmin_protocol::http::auth::UserProfile;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fadmin", version, about = "Franchise admin dashboard client")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory containing an optional config.toml.
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Print raw JSON instead of one line per entry.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the issued tokens.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "FADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored tokens.
    Logout,
    /// Show the logged in user.
    Whoami,
    /// List locations.
    Locations,
    /// List menu categories of a location.
    Categories {
        #[arg(long)]
        location: Id,
    },
    /// List menu items of a location.
    Items {
        #[arg(long)]
        location: Id,
    },
    /// List staff of a location.
    Staff {
        #[arg(long)]
        location: Id,
    },
    /// List orders of a location.
    Orders {
        #[arg(long)]
        location: Id,
        /// Only orders that are neither completed nor cancelled.
        #[arg(long, default_value_t = false)]
        open: bool,
    },
    /// List customer feedback of a location.
    Feedback {
        #[arg(long)]
        location: Id,
    },
}

/// Reports an expired session on the terminal, there is no page to redirect to.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, _path: &str) {
        tracing::warn!("Session expired, run `fadmin login` to sign in again");
    }

    fn token_refreshed(&self) {
        tracing::debug!("Access token refreshed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("{}=info,fadmin_client=info", env!("CARGO_CRATE_NAME")).into()
        }))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::parse(cli.config_dir.as_deref())?;
    let store = Arc::new(FileCredentialStore::new(config.session.credentials_path()?));

    let api = ApiClient::builder(config)
        .with_credentials(store)
        .with_navigator(Arc::new(TerminalNavigator))
        .build()?;

    run(&api, cli.command, cli.json).await.log_err()?;
    Ok(())
}

async fn run(api: &ApiClient, command: Command, json: bool) -> Result<(), Error> {
    let caches = ResourceCaches::new(api);

    match command {
        Command::Login { email, password } => {
            let user = api.login(&email, &password).await?;
            println!("Logged in as {}", describe_user(&user));
        }
        Command::Logout => {
            api.logout();
            caches.clear();
            println!("Logged out");
        }
        Command::Whoami => {
            ensure_logged_in(api)?;
            let user = api.fetch_profile().await?;
            print(json, &user, describe_user)?;
        }
        Command::Locations => {
            ensure_logged_in(api)?;
            let locations = caches.locations.fetch().await?;
            print_all(json, &locations, |location| {
                format!("{:>6}  {}  {}", location.id, location.name, location.address)
            })?;
        }
        Command::Categories { location } => {
            ensure_logged_in(api)?;
            caches.menu_categories.fetch(location).await?;
            let categories = caches.menu_categories.ordered(location).unwrap_or_default();
            print_all(json, &categories, |category| {
                format!("{:>6}  {}", category.id, category.name)
            })?;
        }
        Command::Items { location } => {
            ensure_logged_in(api)?;
            let items = caches.menu_items.fetch(location).await?;
            print_all(json, &items, |item| {
                let availability = if item.is_available { "" } else { "  (unavailable)" };
                format!("{:>6}  {}  {}{availability}", item.id, item.name, item.price)
            })?;
        }
        Command::Staff { location } => {
            ensure_logged_in(api)?;
            let staff = caches.staff.fetch(location).await?;
            print_all(json, &staff, |member| {
                format!(
                    "{:>6}  {} {}  {:?}",
                    member.id, member.first_name, member.last_name, member.role
                )
            })?;
        }
        Command::Orders { location, open } => {
            ensure_logged_in(api)?;
            let mut orders = caches.orders.fetch(location).await?;
            if open {
                orders = caches.orders.open(location);
            }
            print_all(json, &orders, |order| {
                format!("{:>6}  {:?}  {}", order.id, order.status, order.total)
            })?;
        }
        Command::Feedback { location } => {
            ensure_logged_in(api)?;
            let feedback = caches.feedback.fetch(location).await?;
            print_all(json, &feedback, |entry| {
                format!(
                    "{:>6}  {}/5  {}",
                    entry.id,
                    entry.rating,
                    entry.comment.as_deref().unwrap_or_default()
                )
            })?;
        }
    }

    Ok(())
}

fn ensure_logged_in(api: &ApiClient) -> Result<(), Error> {
    if api.is_logged_in() {
        Ok(())
    } else {
        Err(Error::Unauthorized)
    }
}

fn describe_user(user: &UserProfile) -> String {
    format!("{} <{}> ({:?})", user.full_name(), user.email, user.role)
}

fn print<T: Serialize>(json: bool, value: &T, line: impl Fn(&T) -> String) -> Result<(), Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", line(value));
    }
    Ok(())
}

fn print_all<T: Serialize>(
    json: bool,
    values: &[T],
    line: impl Fn(&T) -> String,
) -> Result<(), Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(values)?);
    } else {
        values.iter().for_each(|value| println!("{}", line(value)));
    }
    Ok(())
}
