//! Printer Notify - 通过 Gotify 推送 3D 打印机主机事件

pub mod cli;
pub mod engine;
pub mod event;
pub mod gcode;
pub mod notification;
pub mod poller;
pub mod printer;
pub mod settings;
pub mod state;

pub use engine::NotifyEngine;
pub use event::{EventKind, EventPayload};
pub use notification::{
    GotifyChannel, GotifyConfig, NotificationChannel, NotificationDispatcher, OutboundPayload,
    SendResult,
};
pub use poller::PeriodicTask;
pub use printer::{Disconnected, HeaterReading, PrinterSnapshot, PrinterState, SharedPrinter, Temperatures};
pub use settings::{EventRule, LooseInt, Settings};
pub use state::{SessionState, SharedSession};
