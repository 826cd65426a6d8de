//! HTTP adapter for the remote timeline service.

mod client;
mod multipart;

pub use client::MirrorClient;
