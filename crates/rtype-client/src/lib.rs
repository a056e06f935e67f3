//! # rtype-client
//!
//! Authenticated TCP session client for the R-Type lobby server.
//!
//! A game loop owns one [`SessionClient`]. The client keeps a TCP
//! connection alive with heartbeats, answers the server's login prompts
//! with cached credentials, and turns inbound frames into
//! [`ClientEvent`]s that the game drains once per tick with
//! [`SessionClient::poll_event`]. All socket I/O happens on a dedicated
//! background thread; nothing on the public API blocks on the network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rtype_client::prelude::*;
//!
//! rtype_client::init_tracing("rtype_client=info");
//!
//! let client = SessionClient::new(ClientConfig::default());
//! client.set_login_credentials("alice", "secret");
//! client.connect("127.0.0.1", 4125);
//!
//! loop {
//!     while let Some(event) = client.poll_event() {
//!         match event {
//!             ClientEvent::AuthSuccess { .. } => client.quick_join(),
//!             ClientEvent::Disconnected => return,
//!             _ => {}
//!         }
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! ```

mod client;
mod config;
mod error;
mod events;
mod logging;
mod shared;
mod worker;

pub use client::SessionClient;
pub use config::ClientConfig;
pub use error::{ClientError, ErrorKind};
pub use events::{ClientEvent, EventQueue};
pub use logging::init_tracing;
pub use shared::RoomStatus;

pub use rtype_protocol::{Frame, MessageType, SessionToken, VersionInfo};
pub use rtype_session::{ConnectionState, SessionConfig};
pub use rtype_transport::{Dialer, TcpDialer};

/// Everything a game loop usually needs.
pub mod prelude {
    pub use crate::{
        ClientConfig, ClientError, ClientEvent, ConnectionState, ErrorKind, RoomStatus,
        SessionClient, VersionInfo,
    };
}
