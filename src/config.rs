//! Server configuration
//!
//! All tunables live in one explicit `Config` value passed to the server
//! at construction: bind address, frame ceiling, connection deadlines and
//! the room capacity table. Environment variables override the defaults.

use std::env;
use std::time::Duration;

use crate::room::RoomKind;

/// Default bind address
const DEFAULT_ADDR: &str = "127.0.0.1:9050";

/// Maximum inbound frame size in bytes
const DEFAULT_MAX_FRAME_BYTES: usize = 512;

/// Time allowed without any inbound frame before the connection is
/// considered dead
const DEFAULT_READ_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Time allowed to write one outbound frame
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Member limit for audio-only rooms
const DEFAULT_AUDIO_CAPACITY: usize = 20;

/// Member limit for audio+video rooms
const DEFAULT_AUDIO_VIDEO_CAPACITY: usize = 4;

/// Runtime configuration for the signaling server
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the TCP listener binds to
    pub bind_addr: String,
    /// Maximum inbound frame size in bytes
    pub max_frame_bytes: usize,
    /// Read-idle deadline; renewed by every inbound frame, pongs included
    pub read_idle_timeout: Duration,
    /// Deadline for writing a single outbound frame or ping
    pub write_timeout: Duration,
    /// Member limit for audio-only rooms
    pub audio_capacity: usize,
    /// Member limit for audio+video rooms
    pub audio_video_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            read_idle_timeout: DEFAULT_READ_IDLE_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            audio_capacity: DEFAULT_AUDIO_CAPACITY,
            audio_video_capacity: DEFAULT_AUDIO_VIDEO_CAPACITY,
        }
    }
}

impl Config {
    /// Build a configuration from the environment.
    ///
    /// `HUDDLE_ADDR` (or the first command line argument) overrides the
    /// bind address; everything else keeps its default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = env::var("HUDDLE_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(addr) = env::args().nth(1) {
            config.bind_addr = addr;
        }

        config
    }

    /// Keepalive ping period: 9/10 of the read-idle timeout, so a healthy
    /// peer's pong lands before the reader's deadline expires.
    pub fn ping_period(&self) -> Duration {
        self.read_idle_timeout * 9 / 10
    }

    /// Member limit for a room of the given kind.
    pub fn capacity(&self, kind: RoomKind) -> usize {
        match kind {
            RoomKind::Audio => self.audio_capacity,
            RoomKind::AudioVideo => self.audio_video_capacity,
        }
    }
}
