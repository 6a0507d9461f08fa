//! Rust client core for the GigPass ticket marketplace.
//!
//! This crate implements the ticket lifecycle and client-cache
//! consistency layer of the marketplace: a typed mutation service over
//! a hosted data platform, a process-wide observable collection cache,
//! a shared preview-selection slot, and a confirmation-gated delete
//! workflow. Presentation surfaces (grids, tables, dialogs) consume
//! these pieces and never talk to the platform directly.
//!
//! # Example
//!
//! ```
//! use gigpass_rs::backend::InMemoryBackend;
//! use gigpass_rs::marketplace::GigPass;
//! use gigpass_rs::models::{TicketDraft, UserId};
//!
//! # async fn demo() -> gigpass_rs::error::Result<()> {
//! let backend = InMemoryBackend::new();
//! backend.sign_in(UserId::new("seller".to_owned()))?;
//!
//! let client = GigPass::builder().backend(backend).build()?;
//! let ticket = client
//!     .add_ticket(TicketDraft::new("Two stalls seats", 45.0, 2))
//!     .await?;
//! assert_eq!(ticket.price, 90.0);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod error;
pub mod marketplace;
pub mod models;
pub mod selection;
pub mod service;
pub mod session;
pub mod workflow;
