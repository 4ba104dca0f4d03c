// crates/warden-adapters/src/lib.rs
// ============================================================================
// Module: Warden Adapters Library
// Description: Service adapters dispatched by the gateway registry.
// Purpose: Expose the adapter family and its configuration types.
// Dependencies: crate::{connector, model, reminders, stub, web}
// ============================================================================

//! ## Overview
//! Adapters execute validated requests after the pipeline has authorized
//! them. They are synchronous and run on the blocking pool; each adapter
//! owns its internal concurrency. Credentialed adapters resolve secrets from
//! an injected credential store and never surface them in results.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod connector;
pub mod model;
pub mod reminders;
pub mod stub;
pub mod web;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use connector::ConnectorAdapter;
pub use connector::ConnectorAdapterConfig;
pub use model::ModelAdapter;
pub use model::ModelAdapterConfig;
pub use reminders::ReminderAdapter;
pub use stub::StubAdapter;
pub use web::WebAdapter;
pub use web::WebAdapterConfig;
