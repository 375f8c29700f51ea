mod camera;
mod client;
mod frame_loop;
mod gate;
mod geometry;
mod routes;
mod server;
mod session;
mod stream;
mod telemetry;

pub mod app;
pub mod config;

pub use app::start_app;
