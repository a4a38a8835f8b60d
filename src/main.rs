//! xhs - Xiaohongshu e-commerce open platform CLI
//!
//! Tokens obtained with `xhs login` are persisted and refreshed
//! automatically by every later command.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "xhs")]
#[command(about = "Xiaohongshu e-commerce open platform client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this profile instead of the default config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Save app credentials and token settings to the profile
    Configure {
        #[arg(long)]
        app_id: String,

        #[arg(long)]
        app_secret: String,

        /// Open platform base URL
        #[arg(long)]
        base_url: Option<String>,

        /// API version sent with every request
        #[arg(long = "api-version")]
        api_version: Option<String>,

        /// Refresh tokens this many seconds before expiry
        #[arg(long)]
        refresh_buffer: Option<i64>,

        /// Token file location
        #[arg(long)]
        token_file: Option<PathBuf>,
    },

    /// Exchange an authorization code for tokens
    Login {
        /// Authorization code from the seller authorization redirect
        #[arg(short, long)]
        code: String,
    },

    /// Install a token pair obtained elsewhere
    SetTokens {
        #[arg(long)]
        access_token: String,

        #[arg(long)]
        refresh_token: String,

        /// Access token expiry (epoch milliseconds)
        #[arg(long)]
        access_expires_at: i64,

        /// Refresh token expiry (epoch milliseconds)
        #[arg(long)]
        refresh_expires_at: i64,

        #[arg(long)]
        seller_id: String,

        #[arg(long, default_value = "")]
        seller_name: String,
    },

    /// Show current token status
    Status,

    /// Refresh the access token now
    Refresh,

    /// Clear stored tokens
    Logout,

    /// List SKUs
    Products {
        #[arg(long, default_value = "1")]
        page_no: u32,

        #[arg(long, default_value = "20")]
        page_size: u32,

        /// Only buyable SKUs
        #[arg(long)]
        buyable: bool,
    },

    /// List orders
    Orders {
        #[arg(long, default_value = "1")]
        page_no: u32,

        #[arg(long, default_value = "20")]
        page_size: u32,

        /// Start of the time window (unix seconds)
        #[arg(long, requires = "end_time")]
        start_time: Option<i64>,

        /// End of the time window (unix seconds)
        #[arg(long, requires = "start_time")]
        end_time: Option<i64>,
    },

    /// Show one order
    Order {
        order_id: String,
    },

    /// Decrypt a buyer data field
    Decrypt {
        /// Data tag, e.g. phone or address
        #[arg(long)]
        tag: String,

        /// Encrypted value
        data: String,

        #[arg(long, default_value = "1")]
        action_type: String,

        #[arg(long)]
        app_user_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let profile = cli.config.as_deref();

    match cli.command {
        Commands::Configure {
            app_id,
            app_secret,
            base_url,
            api_version,
            refresh_buffer,
            token_file,
        } => {
            commands::configure(
                profile,
                xhs_ecommerce::config::Config {
                    app_id: Some(app_id),
                    app_secret: Some(app_secret),
                    base_url,
                    version: api_version,
                    refresh_buffer_seconds: refresh_buffer,
                    token_file,
                },
            )?;
        }
        Commands::Login { code } => {
            tracing::info!("Starting authorization...");
            commands::login(profile, &code).await?;
        }
        Commands::SetTokens {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
            seller_id,
            seller_name,
        } => {
            let tokens = xhs_ecommerce::TokenInfo::new(
                access_token,
                refresh_token,
                access_expires_at,
                refresh_expires_at,
                seller_id,
                seller_name,
            );
            commands::set_tokens(profile, tokens).await?;
        }
        Commands::Status => {
            commands::status(profile).await?;
        }
        Commands::Refresh => {
            commands::refresh(profile).await?;
        }
        Commands::Logout => {
            commands::logout(profile).await?;
        }
        Commands::Products {
            page_no,
            page_size,
            buyable,
        } => {
            tracing::info!("Fetching SKUs...");
            commands::list_products(profile, page_no, page_size, buyable.then_some(true)).await?;
        }
        Commands::Orders {
            page_no,
            page_size,
            start_time,
            end_time,
        } => {
            tracing::info!("Fetching orders...");
            let mut query = xhs_ecommerce::models::OrderListQuery::page(page_no, page_size);
            if let (Some(start), Some(end)) = (start_time, end_time) {
                query = query.between(start, end);
            }
            commands::list_orders(profile, &query).await?;
        }
        Commands::Order { order_id } => {
            commands::show_order(profile, &order_id).await?;
        }
        Commands::Decrypt {
            tag,
            data,
            action_type,
            app_user_id,
        } => {
            commands::decrypt(profile, &tag, &data, &action_type, &app_user_id).await?;
        }
    }

    Ok(())
}
