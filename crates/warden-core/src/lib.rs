// crates/warden-core/src/lib.rs
// ============================================================================
// Module: Warden Core Library
// Description: Public API surface for the Warden trust-boundary core.
// Purpose: Expose the action model, signing protocol, audit chain, and interfaces.
// Dependencies: crate::{core, interfaces, memory}
// ============================================================================

//! ## Overview
//! Warden core defines the contract between the data-holding Core process and
//! the network-holding Gateway process: typed action requests, the canonical
//! signing protocol, the hash-chained audit record, and the interfaces the
//! gateway consumes. It performs no I/O; hosts supply stores and adapters
//! through the interfaces module.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod memory;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AdapterError;
pub use interfaces::AddedBy;
pub use interfaces::AllowedService;
pub use interfaces::AllowlistStore;
pub use interfaces::AllowlistStoreError;
pub use interfaces::AuditQuery;
pub use interfaces::AuditStore;
pub use interfaces::AuditStoreError;
pub use interfaces::CredentialKind;
pub use interfaces::CredentialRecord;
pub use interfaces::CredentialStore;
pub use interfaces::CredentialStoreError;
pub use interfaces::ReminderRecord;
pub use interfaces::ReminderStatus;
pub use interfaces::ReminderStore;
pub use interfaces::ReminderStoreError;
pub use interfaces::ServiceAdapter;
pub use memory::InMemoryAllowlistStore;
pub use memory::InMemoryAuditStore;
pub use memory::InMemoryCredentialStore;
pub use memory::InMemoryReminderStore;
