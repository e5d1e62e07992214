/// Terminal watcher for a running scanboard server
///
/// Connects to the WebSocket endpoint, requests the full token list, keeps a
/// local store in sync with the event stream and logs the current view.
///
/// Usage:
///   cargo run --bin scan_watch
///   cargo run --bin scan_watch -- --url ws://127.0.0.1:3003/ws --sort holders --top 20
///   cargo run --bin scan_watch -- --hide-honeypots --min-holders 50 --query pepe
use anyhow::{bail, Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use scanboard::{
    arguments::{get_arg_value, has_arg},
    client::{ClientStore, SortDirection, SortKey, TokenView, ViewOptions},
    logger::{self, LogTag},
    records::TokenRecord,
    webserver::ws::{ClientMessage, ServerMessage},
};

const DEFAULT_URL: &str = "ws://127.0.0.1:3003/ws";
const PING_INTERVAL: Duration = Duration::from_secs(30);
/// Events arriving within this window produce one view summary
const SUMMARY_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_TOP: usize = 10;

fn print_usage() {
    println!("Usage: scan_watch [OPTIONS]\n");
    println!("Options:");
    println!("  --url <ws-url>          Server WebSocket endpoint (default: {})", DEFAULT_URL);
    println!("  --sort <key>            creationTime | holders | liquidity | safetyScore | age | records");
    println!("  --dir <asc|desc>        Sort direction (default: desc)");
    println!("  --hide-honeypots        Hide tokens flagged as honeypots");
    println!("  --min-holders <n>       Only tokens with at least n holders");
    println!("  --query <text>          Match address, name or symbol");
    println!("  --top <n>               Rows to log per update (default: {})", DEFAULT_TOP);
    println!("  --help                  Show this help message");
}

fn parse_options() -> Result<(Url, ViewOptions, usize)> {
    let raw_url = get_arg_value("--url").unwrap_or_else(|| DEFAULT_URL.to_string());
    let url = Url::parse(&raw_url).with_context(|| format!("Invalid --url '{}'", raw_url))?;
    if url.scheme() != "ws" && url.scheme() != "wss" {
        bail!("--url must use ws:// or wss://, got '{}'", url.scheme());
    }

    let mut options = ViewOptions {
        hide_honeypots: has_arg("--hide-honeypots"),
        query: get_arg_value("--query").unwrap_or_default(),
        ..Default::default()
    };
    if let Some(key) = get_arg_value("--sort") {
        options.sort_key = key.parse::<SortKey>().map_err(anyhow::Error::msg)?;
    }
    if let Some(dir) = get_arg_value("--dir") {
        options.direction = dir.parse::<SortDirection>().map_err(anyhow::Error::msg)?;
    }
    if let Some(min) = get_arg_value("--min-holders") {
        options.min_holders = Some(
            min.parse()
                .with_context(|| format!("Invalid --min-holders '{}'", min))?,
        );
    }

    let top = match get_arg_value("--top") {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid --top '{}'", raw))?,
        None => DEFAULT_TOP,
    };

    Ok((url, options, top))
}

fn log_view(rows: &[TokenRecord], total: usize, options: &ViewOptions, top: usize) {
    logger::info(
        LogTag::Client,
        &format!(
            "{} tokens ({} shown by filters), sorted by {} {:?}",
            total,
            rows.len(),
            options.sort_key,
            options.direction
        ),
    );

    for record in rows.iter().take(top) {
        logger::info(
            LogTag::Client,
            &format!(
                "  {:<10} {}  holders={:<6} liq=${:<12.2} safety={:<3}{}",
                record.label(),
                record.address,
                record.gp_holder_count.unwrap_or(0),
                record.primary_liquidity(),
                record.safety_score.unwrap_or(0),
                if record.flagged_honeypot() { "  HONEYPOT" } else { "" }
            ),
        );
    }
}

async fn watch(url: Url, options: ViewOptions, top: usize) -> Result<()> {
    logger::info(LogTag::Client, &format!("Connecting to {}", url));
    let (stream, _) = connect_async(url.as_str())
        .await
        .with_context(|| format!("Failed to connect to {}", url))?;
    let (mut ws_tx, mut ws_rx) = stream.split();

    ws_tx
        .send(Message::Text(ClientMessage::GetTokens.to_json()?))
        .await
        .context("Failed to request token list")?;

    let mut ping = interval(PING_INTERVAL);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await;

    let mut summary = interval(SUMMARY_INTERVAL);
    summary.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut store = ClientStore::new();
    let mut view = TokenView::new();
    let mut ping_sent_at: Option<i64> = None;
    let mut changed = false;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                logger::info(LogTag::Client, "Stopping watcher");
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }

            _ = summary.tick(), if changed => {
                changed = false;
                let rows = view.rows(&store, &options);
                log_view(rows, store.len(), &options, top);
            }

            _ = ping.tick() => {
                ping_sent_at = Some(chrono::Utc::now().timestamp_millis());
                ws_tx
                    .send(Message::Text(ClientMessage::Ping.to_json()?))
                    .await
                    .context("Failed to send PING")?;
            }

            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let message = match ServerMessage::parse(&text) {
                        Ok(message) => message,
                        Err(e) => {
                            logger::warning(LogTag::Client, &format!("Ignoring frame: {}", e));
                            continue;
                        }
                    };
                    let event = message.event_name();
                    let is_pong = matches!(message, ServerMessage::Pong { .. });

                    if store.apply(message) {
                        logger::debug(LogTag::Client, &format!("Applied {}", event));
                        changed = true;
                    } else if is_pong {
                        if let Some(sent) = ping_sent_at.take() {
                            let rtt = chrono::Utc::now().timestamp_millis() - sent;
                            logger::debug(LogTag::Client, &format!("PONG after {}ms", rtt));
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    logger::warning(LogTag::Client, "Server closed the connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => bail!("WebSocket error: {}", e),
            }
        }
    }

    if changed {
        log_view(view.rows(&store, &options), store.len(), &options, top);
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if has_arg("--help") || has_arg("-h") {
        print_usage();
        return;
    }

    logger::init();

    let result = match parse_options() {
        Ok((url, options, top)) => watch(url, options, top).await,
        Err(e) => Err(e),
    };

    let exit_code = match result {
        Ok(()) => 0,
        Err(e) => {
            logger::error(LogTag::Client, &format!("{:#}", e));
            1
        }
    };

    logger::flush();
    std::process::exit(exit_code);
}
