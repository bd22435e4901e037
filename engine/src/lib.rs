//! Atelier's core: the conversation store, the turn composer, and the
//! mode-dispatch session state machine.
//!
//! # Turn lifecycle
//!
//! ```text
//! Composer::compose(mode) ──▶ Submission ──▶ Session::submit
//!                                               │ append user turn (optimistic)
//!                                               │ spawn gateway call
//!                                               ▼
//!                                          Submitting ── Session::poll_settled
//!                                               │ append exactly one model turn
//!                                               ▼
//!                                             Idle
//! ```
//!
//! Submissions are strictly serialized: `submit` while `Submitting`
//! returns [`SubmitError::Busy`] and leaves the conversation untouched.
//! Every submitted user turn is answered by exactly one model turn -
//! a gateway failure settles as a plain turn carrying the error text.

pub mod composer;
pub mod session;
pub mod store;

pub use composer::{ComposeError, Composer, Submission};
pub use session::{Session, SubmitError};
pub use store::Conversation;
