//! Connects to a lobby server, logs in, and prints every event as a
//! JSON line until authentication settles.
//!
//! ```text
//! cargo run -p login-probe -- 127.0.0.1 4125 alice secret
//! RTYPE_CLIENT_CONFIG='{"session":{"heartbeat_timeout_ms":3000}}' cargo run -p login-probe -- ...
//! ```

use std::process::ExitCode;
use std::time::{Duration, Instant};

use rtype_client::prelude::*;

const TICK: Duration = Duration::from_millis(16);
const GIVE_UP_AFTER: Duration = Duration::from_secs(30);

struct Args {
    host: String,
    port: u16,
    username: String,
    password: String,
}

fn parse_args() -> Option<Args> {
    let mut args = std::env::args().skip(1);
    Some(Args {
        host: args.next()?,
        port: args.next()?.parse().ok()?,
        username: args.next()?,
        password: args.next()?,
    })
}

fn load_config() -> Result<ClientConfig, ClientError> {
    match std::env::var("RTYPE_CLIENT_CONFIG") {
        Ok(json) => ClientConfig::from_json_str(&json),
        Err(_) => Ok(ClientConfig::default()),
    }
}

fn main() -> ExitCode {
    rtype_client::init_tracing("rtype_client=info,login_probe=info");

    let Some(args) = parse_args() else {
        eprintln!("usage: login-probe <host> <port> <username> <password>");
        return ExitCode::from(2);
    };
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid RTYPE_CLIENT_CONFIG: {e}");
            return ExitCode::from(2);
        }
    };

    let client = SessionClient::new(config);
    client.set_login_credentials(&args.username, &args.password);
    client.connect(&args.host, args.port);
    tracing::info!(host = %args.host, port = args.port, "probe started");

    let started = Instant::now();
    loop {
        while let Some(event) = client.poll_event() {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "event not serializable"),
            }
            match event {
                ClientEvent::AuthSuccess { .. } => {
                    client.disconnect();
                    return ExitCode::SUCCESS;
                }
                ClientEvent::AuthFailed { .. } | ClientEvent::Disconnected => {
                    return ExitCode::FAILURE;
                }
                ClientEvent::Error { kind: ErrorKind::Connect, .. } => return ExitCode::FAILURE,
                _ => {}
            }
        }
        if started.elapsed() > GIVE_UP_AFTER {
            tracing::warn!("no authentication result, giving up");
            return ExitCode::FAILURE;
        }
        std::thread::sleep(TICK);
    }
}
