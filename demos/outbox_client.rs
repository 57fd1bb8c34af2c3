// ABOUTME: Command-line client for the SMS daemon's database demonstrating the query adapter
// ABOUTME: Queues a message, lists or deletes inbox rows and follows connection state changes

//! # Outbox client
//!
//! Connects to the SMS daemon's MySQL database and runs one operation:
//!
//! ```bash
//! # Queue a message and poll until the daemon has picked it up
//! cargo run --example outbox_client -- \
//!   --user smsd --password secret --database smsd \
//!   --to 612345678 --text "GPS?"
//!
//! # List the inbox, optionally for one sender
//! cargo run --example outbox_client -- --user smsd --database smsd --list --from +612345678
//!
//! # Delete an inbox row / check whether an outbox row is still pending
//! cargo run --example outbox_client -- --user smsd --database smsd --delete 42
//! cargo run --example outbox_client -- --user smsd --database smsd --check 17
//! ```

use argh::FromArgs;
use smsd_bridge::client::{ConnectionState, GatewayConnectionConfig, SmsCommand};
use smsd_bridge::{AdapterBuilder, QueryAdapter};
use smsd_bridge::store::MySqlBackend;
use std::error::Error;
use std::time::Duration;
use tokio::time::{interval, sleep};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exchange messages with an SMS daemon through its database
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// adapter verbosity: 0 state changes at debug, 1 state changes at info, 2 also query text (default: 0)
    #[argh(option)]
    verbosity: Option<u8>,

    /// the hostname or IP address of the database server (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the database port (default: 3306)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// the database user
    #[argh(option)]
    user: Option<String>,

    /// the database password
    #[argh(option)]
    password: Option<String>,

    /// the database holding the daemon's tables
    #[argh(option)]
    database: Option<String>,

    /// request delivery reports for queued messages
    #[argh(switch)]
    report: bool,

    /// maximum inbox rows to list (default: 10)
    #[argh(option)]
    limit: Option<u32>,

    /// seconds between reconnect attempts (default: 10)
    #[argh(option)]
    delay: Option<u64>,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: Option<String>,

    /// the message text to queue
    #[argh(option)]
    text: Option<String>,

    /// list inbox rows
    #[argh(switch)]
    list: bool,

    /// only list messages from this sender
    #[argh(option, short = 'f')]
    from: Option<String>,

    /// delete the inbox row with this ID
    #[argh(option)]
    delete: Option<u64>,

    /// check whether the outbox row with this ID is still pending
    #[argh(option)]
    check: Option<u64>,

    /// how long to wait for the daemon to pick up a queued message in seconds (default: 60)
    #[argh(option)]
    wait: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging { Level::DEBUG } else { Level::INFO })
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut config = GatewayConnectionConfig::new(
        cli_args.host.clone().unwrap_or_else(|| "localhost".to_owned()),
        cli_args.user.clone().unwrap_or_default(),
        cli_args.database.clone().unwrap_or_default(),
        cli_args.password.clone().unwrap_or_default(),
    )
    .with_debug(cli_args.verbosity.unwrap_or(0))
    .with_report(cli_args.report);

    if let Some(port) = cli_args.port {
        config = config.with_port(port);
    }
    if let Some(limit) = cli_args.limit {
        config = config.with_limit(limit);
    }
    if let Some(delay) = cli_args.delay {
        config = config.with_delay(Duration::from_secs(delay));
    }

    info!("Connecting to {}", config.uid());
    let adapter = AdapterBuilder::new(config).mysql()?;

    // Follow state changes for the whole run
    let mut events = adapter.manager().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!("Connection {} -> {}", event.from, event.to);
        }
    });

    tokio::select! {
        fatal = adapter.manager().fatal() => {
            error!("Giving up: {fatal}");
            return Err(fatal.into());
        }
        result = run(&adapter, &cli_args) => result?,
    }

    let status = adapter.manager().status();
    info!("Final connection statistics:");
    info!("  Connect attempts: {}", status.connect_attempts);
    info!("  Reconnects scheduled: {}", status.reconnects_scheduled);

    Ok(())
}

async fn run(adapter: &QueryAdapter<MySqlBackend>, cli_args: &CliArgs) -> Result<(), Box<dyn Error>> {
    let mut state = adapter.manager().watch_state();
    state.wait_for(|s| *s == ConnectionState::Connected).await?;

    if let (Some(to), Some(text)) = (&cli_args.to, &cli_args.text) {
        let queued = adapter.send_to(&SmsCommand::new(to, text)).await?;
        info!("Queued message as outbox row {}", queued.id);

        let wait = Duration::from_secs(cli_args.wait.unwrap_or(60));
        let mut poll = interval(Duration::from_secs(2));
        tokio::select! {
            _ = sleep(wait) => warn!("Outbox row {} still pending after {}s", queued.id, wait.as_secs()),
            _ = async {
                loop {
                    poll.tick().await;
                    match adapter.check_by_id(queued.id).await {
                        Ok(false) => break,
                        Ok(true) => {}
                        Err(e) => warn!("Check failed: {e}"),
                    }
                }
            } => info!("Daemon picked up outbox row {}", queued.id),
        }
    }

    if cli_args.list {
        let rows = match &cli_args.from {
            Some(sender) => adapter.get_from(sender, None).await?,
            None => adapter.get_all(None).await?,
        };
        info!("{} inbox rows", rows.len());
        for row in rows {
            info!(
                "#{} {} from {} via {}: {}",
                row.id, row.receiving_date_time, row.sender_number, row.smsc_number, row.text_decoded
            );
        }
    }

    if let Some(id) = cli_args.delete {
        let affected = adapter.del_by_id(id).await?;
        if affected == 0 {
            warn!("No inbox row {id}");
        } else {
            info!("Deleted inbox row {id}");
        }
    }

    if let Some(id) = cli_args.check {
        let pending = adapter.check_by_id(id).await?;
        info!("Outbox row {id} {}", if pending { "is pending" } else { "has been sent" });
    }

    Ok(())
}
