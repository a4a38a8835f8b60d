//! Command handlers for the `xhs` binary

use std::path::Path;

use anyhow::{bail, Context, Result};

use xhs_ecommerce::config::Config;
use xhs_ecommerce::models::{DecryptItem, OrderListQuery};
use xhs_ecommerce::{BaseResponse, TokenInfo, TokenManagerError, XhsClient};

fn load_profile(profile: Option<&Path>) -> Result<Config> {
    match profile {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn build_client(profile: Option<&Path>) -> Result<XhsClient> {
    let config = load_profile(profile)?.to_client_config()?;
    XhsClient::new(config).context("Failed to build API client")
}

/// Turn token failures into actionable messages.
fn explain(err: TokenManagerError) -> anyhow::Error {
    if err.requires_reauthorization() {
        anyhow::anyhow!("{}. Run 'xhs login --code <CODE>'.", err)
    } else {
        anyhow::Error::new(err)
    }
}

fn unwrap_response<T>(method: &str, resp: BaseResponse<T>) -> Result<Option<T>> {
    if !resp.success {
        bail!(
            "{} failed (code {}): {}",
            method,
            resp.code.as_deref().unwrap_or("?"),
            resp.msg.as_deref().unwrap_or("no message")
        );
    }
    Ok(resp.data)
}

fn print_tokens(tokens: &TokenInfo) {
    println!("Seller:        {} ({})", tokens.seller_name, tokens.seller_id);
    println!(
        "Access token:  {}, expires in {}s",
        if tokens.is_access_token_valid() {
            "valid"
        } else {
            "expired"
        },
        tokens.access_token_expires_in_seconds()
    );
    println!(
        "Refresh token: {}, expires in {}s",
        if tokens.is_refresh_token_expired() {
            "expired"
        } else {
            "valid"
        },
        tokens.refresh_token_expires_in_seconds()
    );
}

/// Overlay `update` onto `config`. Credentials always replace; optional
/// settings replace only when given.
fn merge_profile(config: &mut Config, update: Config) {
    config.app_id = update.app_id;
    config.app_secret = update.app_secret;
    if update.base_url.is_some() {
        config.base_url = update.base_url;
    }
    if update.version.is_some() {
        config.version = update.version;
    }
    if update.refresh_buffer_seconds.is_some() {
        config.refresh_buffer_seconds = update.refresh_buffer_seconds;
    }
    if update.token_file.is_some() {
        config.token_file = update.token_file;
    }
}

/// Write app credentials to the profile, keeping unspecified settings
pub fn configure(profile: Option<&Path>, update: Config) -> Result<()> {
    let mut config = load_profile(profile)?;
    merge_profile(&mut config, update);

    match profile {
        Some(path) => config.save_to(path)?,
        None => config.save()?,
    }
    println!("Configuration saved.");
    Ok(())
}

pub async fn login(profile: Option<&Path>, code: &str) -> Result<()> {
    let client = build_client(profile)?;
    let tokens = client
        .set_tokens_from_auth_code(code)
        .await
        .context("Authorization failed")?;
    println!("Login successful.");
    print_tokens(&tokens);
    Ok(())
}

pub async fn set_tokens(profile: Option<&Path>, tokens: TokenInfo) -> Result<()> {
    let client = build_client(profile)?;
    let tokens = client
        .set_tokens_manually(
            tokens.access_token,
            tokens.refresh_token,
            tokens.access_token_expires_at,
            tokens.refresh_token_expires_at,
            tokens.seller_id,
            tokens.seller_name,
        )
        .await?;
    println!("Tokens installed.");
    print_tokens(&tokens);
    Ok(())
}

pub async fn status(profile: Option<&Path>) -> Result<()> {
    let client = build_client(profile)?;
    match client.get_current_tokens().await {
        Some(tokens) => {
            print_tokens(&tokens);
            if tokens.should_refresh(client.token_manager().refresh_buffer_seconds()) {
                println!("\nAccess token is due for refresh; the next API call will refresh it.");
            }
        }
        None => {
            println!("No tokens stored.");
            println!("\nRun 'xhs login --code <CODE>' to authorize.");
        }
    }
    Ok(())
}

pub async fn refresh(profile: Option<&Path>) -> Result<()> {
    let client = build_client(profile)?;
    let tokens = client.force_refresh().await.map_err(explain)?;
    println!("Token refreshed.");
    print_tokens(&tokens);
    Ok(())
}

pub async fn logout(profile: Option<&Path>) -> Result<()> {
    let client = build_client(profile)?;
    client.clear_tokens().await?;
    println!("Logged out.");
    Ok(())
}

pub async fn list_products(
    profile: Option<&Path>,
    page_no: u32,
    page_size: u32,
    buyable: Option<bool>,
) -> Result<()> {
    let client = build_client(profile)?;
    let resp = client
        .product()
        .get_detail_sku_list(page_no, page_size, buyable)
        .await
        .map_err(api_error)?;
    let page = unwrap_response("product.getDetailSkuList", resp)?.unwrap_or_default();

    println!("\nSKUs (page {}, {} total):", page_no, page.total);
    println!("{:-<60}", "");
    if page.data.is_empty() {
        println!("  (no SKUs found)");
    }
    for sku in &page.data {
        println!(
            "  {:<24} {:<30} stock={}",
            sku.id.as_deref().unwrap_or("-"),
            sku.name.as_deref().unwrap_or("(unnamed)"),
            sku.stock.map_or_else(|| "-".to_string(), |s| s.to_string())
        );
    }
    Ok(())
}

pub async fn list_orders(profile: Option<&Path>, query: &OrderListQuery) -> Result<()> {
    let client = build_client(profile)?;
    let resp = client
        .order()
        .get_order_list(query)
        .await
        .map_err(api_error)?;
    let page = unwrap_response("order.getOrderList", resp)?.unwrap_or_default();
    let orders = page.order_list.unwrap_or_default();

    println!("\nOrders (page {}/{}, {} total):", query.page_no, page.max_page_no, page.total);
    println!("{:-<60}", "");
    if orders.is_empty() {
        println!("  (no orders found)");
    }
    for order in &orders {
        println!(
            "  {:<28} status={:<4} created={}",
            order.order_id,
            order.order_status.map_or_else(|| "-".to_string(), |s| s.to_string()),
            order.created_time.unwrap_or_default()
        );
    }
    Ok(())
}

pub async fn show_order(profile: Option<&Path>, order_id: &str) -> Result<()> {
    let client = build_client(profile)?;
    let resp = client
        .order()
        .get_order_detail(order_id)
        .await
        .map_err(api_error)?;
    let detail = unwrap_response("order.getOrderDetail", resp)?
        .context("Order detail response was empty")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&detail).context("Failed to format order")?
    );
    Ok(())
}

pub async fn decrypt(
    profile: Option<&Path>,
    tag: &str,
    data: &str,
    action_type: &str,
    app_user_id: &str,
) -> Result<()> {
    let client = build_client(profile)?;
    let items = [DecryptItem::new(tag, data)];
    let resp = client
        .data()
        .batch_decrypt(&items, action_type, app_user_id)
        .await
        .map_err(api_error)?;
    let result = unwrap_response("data.batchDecrypt", resp)?.unwrap_or_default();

    for info in &result.data_info_list {
        match &info.decrypted_data {
            Some(plain) if info.error_code == 0 => println!("{}: {}", info.data_tag, plain),
            _ => println!(
                "{}: error {} {}",
                info.data_tag, info.error_code, info.error_msg
            ),
        }
    }
    Ok(())
}

fn api_error(err: xhs_ecommerce::ApiError) -> anyhow::Error {
    match err {
        xhs_ecommerce::ApiError::Token(e) => explain(e),
        other => anyhow::Error::new(other),
    }
}
