#![deny(unsafe_code)]

pub mod app;
pub mod config;
pub mod constants;
pub mod controller;
pub mod document;
pub mod event_handler;
pub mod logging;
pub mod models;
pub mod network;
pub mod persistence;
pub mod region;
pub mod renderer;
pub mod rich_text;
pub mod session;
pub mod toast;
pub mod ui;
