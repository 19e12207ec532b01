//! OBD SmartScan terminal client: a navigation shell around the vehicle data
//! dashboard, an assistant chat and a CSV upload form.

pub mod app;
pub mod chat;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod picker;
pub mod shell;
pub mod transport;
pub mod tui;
pub mod ui;
pub mod upload;

pub use app::App;
pub use config::Config;
pub use error::TransportError;
pub use shell::{Panel, ViewState, Viewport};
pub use transport::TransportClient;
