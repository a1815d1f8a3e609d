//! Commute ticket watcher.
//!
//! Polls rail ticket availability for a user's morning and evening
//! trains over the coming working days, and hands chosen legs to an
//! external purchase automation service.

pub mod cache;
pub mod calendar;
pub mod config;
pub mod domain;
pub mod poller;
pub mod purchase;
pub mod query;
pub mod stations;
pub mod web;
