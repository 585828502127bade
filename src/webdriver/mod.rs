//! WebDriver implementation of the browser interface

mod client;
pub mod types;

pub use client::WebDriverClient;
