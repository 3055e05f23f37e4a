//! Compile-time build information.

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
