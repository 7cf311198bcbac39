use anyhow::Context;
use blog_aggregator::commands::{self, Session, DEFAULT_BROWSE_LIMIT};
use blog_aggregator::{parse_interval, Config, FeedManager, FetchConfig, Fetcher, Poller, RssAggregator};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gator", version, about = "Follow RSS feeds and browse their posts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a user and log in as them
    Register { name: String },
    /// Switch the current user
    Login { name: String },
    /// List all users
    Users,
    /// Delete every user, feed, follow and post
    Reset,
    /// Add a feed and follow it
    #[command(name = "addfeed")]
    AddFeed { name: String, url: String },
    /// List all feeds
    Feeds,
    /// Follow an existing feed by URL
    Follow { url: String },
    /// List the feeds the current user follows
    Following,
    /// Stop following a feed
    Unfollow { url: String },
    /// Show the newest posts from followed feeds
    Browse {
        #[arg(default_value_t = DEFAULT_BROWSE_LIMIT)]
        limit: i64,
    },
    /// Poll feeds forever, one feed per interval (e.g. `1m`, `30s`)
    Agg { time_between_reqs: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let cli = Cli::parse();

    // Reject a bad interval before touching the database.
    let interval = match &cli.command {
        Command::Agg { time_between_reqs } => Some(parse_interval(time_between_reqs)?),
        _ => None,
    };

    let mut config = Config::read().context("error reading config")?;

    info!("Connecting to database");
    let store = Arc::new(
        FeedManager::new(&config.database_url())
            .await
            .context("unable to connect to the database")?,
    );
    store.migrate().await?;

    match cli.command {
        Command::Register { name } => {
            let user = commands::register(store.as_ref(), &mut config, &name)
                .await
                .context("couldn't create user")?;
            println!("User created successfully:");
            commands::print_user(&user);
        }
        Command::Login { name } => {
            commands::login(store.as_ref(), &mut config, &name).await?;
            println!("User switched successfully!");
        }
        Command::Users => {
            let users = commands::users(store.as_ref()).await?;
            commands::print_users(&users, config.current_user_name.as_deref());
        }
        Command::Reset => {
            commands::reset(store.as_ref()).await.context("error resetting db")?;
            println!("Database reset complete");
        }
        Command::AddFeed { name, url } => {
            let session = Session::resolve(store.as_ref(), &config).await?;
            let (feed, _) = commands::add_feed(store.as_ref(), &session, &name, &url)
                .await
                .context("couldn't create feed")?;
            println!("Feed created successfully:");
            commands::print_feed(&feed);
            println!();
            println!("=====================================");
        }
        Command::Feeds => {
            let feeds = commands::feeds(store.as_ref()).await?;
            commands::print_feed_listing(&feeds);
        }
        Command::Follow { url } => {
            let session = Session::resolve(store.as_ref(), &config).await?;
            let feed = commands::follow(store.as_ref(), &session, &url)
                .await
                .context("unable to follow feed")?;
            println!("Follow successful!");
            println!("User: {}\nFeed: {}", session.user.name, feed.name);
        }
        Command::Following => {
            let session = Session::resolve(store.as_ref(), &config).await?;
            let follows = commands::following(store.as_ref(), &session).await?;
            commands::print_following(&session.user, &follows);
        }
        Command::Unfollow { url } => {
            let session = Session::resolve(store.as_ref(), &config).await?;
            commands::unfollow(store.as_ref(), &session, &url).await?;
            println!("{} unfollowed", url);
        }
        Command::Browse { limit } => {
            let session = Session::resolve(store.as_ref(), &config).await?;
            let posts = commands::browse(store.as_ref(), &session, limit)
                .await
                .context("couldn't get posts for user")?;
            commands::print_posts(&session.user, &posts);
        }
        Command::Agg { .. } => {
            let interval = interval.context("missing polling interval")?;
            let fetcher = Arc::new(Fetcher::new(FetchConfig::default())?);
            let aggregator = Arc::new(RssAggregator::new(store, fetcher));
            Poller::new(aggregator, interval).run().await;
        }
    }

    Ok(())
}
