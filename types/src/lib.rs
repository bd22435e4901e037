//! Core domain types for Atelier.
//!
//! This crate is deliberately free of IO and async: everything here is a
//! plain value that the gateway, engine, and TUI crates agree on.
//!
//! The central type is [`Turn`], a real sum type over user and model
//! turns. Model turns carry a [`ModelReply`] variant per response mode,
//! so "a research report without citations storage" or "a generated
//! image on a plain chat reply" are unrepresentable rather than merely
//! unpopulated.

pub mod image;
pub mod mode;
pub mod text;
pub mod turn;

pub use image::{AttachmentError, GeneratedImage, ImageAttachment};
pub use mode::{ModeParseError, ResponseMode};
pub use text::{EmptyStringError, NonEmptyString};
pub use turn::{Citation, ModelReply, ModelTurn, Speaker, Turn, UserTurn};
