use clap::Parser;
use couchlink_client::{MasterPolicy, Role};
use tracing::Level;

/// Couchlink demo session
#[derive(Parser, Debug)]
#[command(author, version, about = "Plays a scripted couchlink session against an in-process relay", long_about = None)]
pub struct Args {
    /// Role of the local device (screen or controller)
    #[arg(short, long, default_value = "screen")]
    pub role: Role,

    /// Number of controllers joining the session
    #[arg(short, long, default_value_t = 3)]
    pub controllers: u32,

    /// Maximum number of active players the screen assigns
    #[arg(long, default_value_t = 2)]
    pub max_players: usize,

    /// Master controller policy (arrival-order or premium-first)
    #[arg(long, default_value = "arrival-order")]
    pub master_policy: MasterPolicy,

    /// Server time offset reported by the relay, in milliseconds.
    /// Enables time synchronization when set.
    #[arg(long)]
    pub server_time_offset: Option<i64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: Level,
}
