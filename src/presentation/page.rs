//! Embedded browser client served at `/`

/// Single-page client: microphone capture, typed input, transcript
pub const INDEX_HTML: &str = include_str!("index.html");
