//! # checkin-slack
//!
//! Slack implementation of [`checkin_core::ChatPlatform`]: a Web API client,
//! a Socket Mode listener feeding [`checkin_core::ChatEvent`]s into a channel,
//! and [`mock::MockPlatform`] for tests.

#![deny(unsafe_code)]

pub mod client;
pub mod mock;
pub mod socket;

pub use client::{SlackClient, SlackConfig};
pub use mock::{MockPlatform, PlatformCall};
pub use socket::SocketModeListener;
