pub mod client;
pub mod message;
pub mod rich_menu;
pub mod signature;
pub mod webhook;

pub use client::LineClient;
