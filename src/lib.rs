//! # cinefav
//!
//! Client core for a movie browsing application: a signed-in user browses a
//! remote movie catalog, bookmarks favorites and shares a read-only list via a
//! public link.
//!
//! SYSTEM CONTEXT
//! ==============
//! Identity is delegated to an external provider (`identity`, `session`), data
//! lives behind a remote REST API (`gateway`). The only stateful piece with
//! real transition logic is the favorites cache (`favorites`), which applies
//! optimistic updates and rolls them back on failure. `guard` gates routes on
//! session state; `catalog`, `share` and `login` hold the view-level logic the
//! presentation layer renders.

pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod favorites;
pub mod gateway;
pub mod guard;
pub mod identity;
pub mod login;
pub mod models;
pub mod session;
pub mod share;
