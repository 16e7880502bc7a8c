//! Utility functions

pub mod atomic;
pub mod m3u;
pub mod path;
mod sanitize;

pub use m3u::{generate_m3u, parse_m3u, track_line, write_playlist_content};
#[cfg(test)]
pub use m3u::{read_m3u, write_m3u};
pub use path::{expand_home, normalize_bytes, normalize_path};
pub use sanitize::{playlist_file_name, sanitize_filename};
