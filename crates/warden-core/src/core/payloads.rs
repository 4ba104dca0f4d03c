// crates/warden-core/src/core/payloads.rs
// ============================================================================
// Module: Warden Payload Registry
// Description: Strict per-kind payload records and the action payload sum type.
// Purpose: Bind every action kind to exactly one payload shape, rejecting extras.
// Dependencies: crate::core::{actions, identifiers}, serde, serde_json, url
// ============================================================================

//! ## Overview
//! Each action kind owns one payload record. Records deny unknown fields, so a
//! payload carrying anything outside its schema fails validation instead of
//! silently passing through to an adapter. [`ActionPayload`] is the closed sum
//! over all records; selecting the record by discriminator happens in
//! [`ActionPayload::parse`]. Outward-targeted payloads expose their
//! authorization domain through [`ActionPayload::target_domain`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::core::actions::ActionKind;
use crate::core::identifiers::Domain;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while validating a payload against its per-kind schema.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Payload does not match the schema bound to the action kind.
    #[error("payload does not match schema for {kind}: {message}")]
    Shape {
        /// Action kind whose schema was violated.
        kind: ActionKind,
        /// Underlying schema violation.
        message: String,
    },
    /// Payload target (domain, URL host) cannot be derived or is invalid.
    #[error("payload target for {kind} is invalid: {message}")]
    Target {
        /// Action kind whose target was invalid.
        kind: ActionKind,
        /// Underlying target problem.
        message: String,
    },
}

// ============================================================================
// SECTION: Shared Value Types
// ============================================================================

/// HTTP method for connector and service calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    /// HTTP GET.
    #[serde(rename = "GET")]
    Get,
    /// HTTP POST.
    #[serde(rename = "POST")]
    Post,
    /// HTTP PUT.
    #[serde(rename = "PUT")]
    Put,
    /// HTTP PATCH.
    #[serde(rename = "PATCH")]
    Patch,
    /// HTTP DELETE.
    #[serde(rename = "DELETE")]
    Delete,
}

impl HttpMethod {
    /// Returns the method as its wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response to a calendar invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteResponse {
    /// Accept the invitation.
    Accept,
    /// Decline the invitation.
    Decline,
    /// Tentatively accept the invitation.
    Tentative,
}

// ============================================================================
// SECTION: Email Payloads
// ============================================================================

/// Payload for `email.send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EmailSendPayload {
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Carbon-copy addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<String>>,
    /// Blind carbon-copy addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcc: Option<Vec<String>>,
    /// Message subject.
    pub subject: String,
    /// Message body.
    pub body: String,
}

/// Payload for `email.reply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EmailReplyPayload {
    /// Identifier of the message being replied to.
    pub message_id: String,
    /// Reply body.
    pub body: String,
    /// Reply to all recipients instead of only the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_all: Option<bool>,
}

/// Payload for `email.draft`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EmailDraftPayload {
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Draft subject.
    pub subject: String,
    /// Draft body.
    pub body: String,
}

/// Payload for `email.fetch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EmailFetchPayload {
    /// Mailbox name; the account default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailbox: Option<String>,
    /// Maximum number of messages to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Restrict to unread messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread_only: Option<bool>,
}

/// Payload for `email.search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EmailSearchPayload {
    /// Search query.
    pub query: String,
    /// Mailbox name; all mailboxes when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailbox: Option<String>,
    /// Maximum number of results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Payload for `email.archive`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EmailArchivePayload {
    /// Identifier of the message to archive.
    pub message_id: String,
}

/// Payload for `email.delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EmailDeletePayload {
    /// Identifier of the message to delete.
    pub message_id: String,
}

/// Payload for `email.unsubscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EmailUnsubscribePayload {
    /// Identifier of the message carrying the unsubscribe target.
    pub message_id: String,
}

// ============================================================================
// SECTION: Calendar Payloads
// ============================================================================

/// Payload for `calendar.create_event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CalendarCreateEventPayload {
    /// Event title.
    pub title: String,
    /// Event start, RFC 3339.
    pub start: String,
    /// Event end, RFC 3339.
    pub end: String,
    /// Optional location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Optional attendee addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<String>>,
    /// Optional notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Payload for `calendar.update_event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CalendarUpdateEventPayload {
    /// Identifier of the event to update.
    pub event_id: String,
    /// New title, when changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New start, when changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// New end, when changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// New location, when changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// New notes, when changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Payload for `calendar.delete_event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CalendarDeleteEventPayload {
    /// Identifier of the event to delete.
    pub event_id: String,
}

/// Payload for `calendar.list_events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CalendarListEventsPayload {
    /// Range start, RFC 3339.
    pub from: String,
    /// Range end, RFC 3339.
    pub to: String,
    /// Calendar name; the default calendar when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<String>,
}

/// Payload for `calendar.find_slots`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CalendarFindSlotsPayload {
    /// Range start, RFC 3339.
    pub from: String,
    /// Range end, RFC 3339.
    pub to: String,
    /// Required slot duration in minutes.
    pub duration_minutes: u32,
    /// Optional attendees whose availability is considered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<String>>,
}

/// Payload for `calendar.respond`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CalendarRespondPayload {
    /// Identifier of the invitation event.
    pub event_id: String,
    /// Invitation response.
    pub response: InviteResponse,
}

// ============================================================================
// SECTION: Finance Payloads
// ============================================================================

/// Payload for `finance.fetch_transactions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FinanceFetchTransactionsPayload {
    /// Linked account identifier.
    pub account_id: String,
    /// Earliest transaction timestamp, RFC 3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    /// Latest transaction timestamp, RFC 3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
    /// Maximum number of transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Payload for `finance.fetch_balances`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FinanceFetchBalancesPayload {
    /// Linked account identifier; all accounts when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

/// Payload for `finance.refresh_accounts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FinanceRefreshAccountsPayload {
    /// Linked account identifier; all accounts when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

// ============================================================================
// SECTION: Web Payloads
// ============================================================================

/// Payload for `web.search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct WebSearchPayload {
    /// Search query.
    pub query: String,
    /// Maximum number of results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}

/// Payload for `web.fetch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct WebFetchPayload {
    /// Resource URL; must be http(s) with a named host.
    pub url: String,
    /// Maximum response size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
}

// ============================================================================
// SECTION: Reminder Payloads
// ============================================================================

/// Payload for `reminder.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ReminderCreatePayload {
    /// Reminder title.
    pub title: String,
    /// Due timestamp, RFC 3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    /// Optional notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Payload for `reminder.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ReminderListPayload {
    /// Include completed reminders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_completed: Option<bool>,
}

/// Payload for `reminder.update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ReminderUpdatePayload {
    /// Identifier of the reminder to update.
    pub reminder_id: String,
    /// New title, when changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New due timestamp, when changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    /// New notes, when changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Payload for `reminder.complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ReminderCompletePayload {
    /// Identifier of the reminder to complete.
    pub reminder_id: String,
}

/// Payload for `reminder.snooze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ReminderSnoozePayload {
    /// Identifier of the reminder to snooze.
    pub reminder_id: String,
    /// New due timestamp, RFC 3339.
    pub until: String,
}

/// Payload for `reminder.delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ReminderDeletePayload {
    /// Identifier of the reminder to delete.
    pub reminder_id: String,
}

// ============================================================================
// SECTION: Contacts Payloads
// ============================================================================

/// Payload for `contacts.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ContactsCreatePayload {
    /// Display name.
    pub name: String,
    /// Email addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<String>>,
    /// Phone numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phones: Option<Vec<String>>,
}

/// Payload for `contacts.update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ContactsUpdatePayload {
    /// Identifier of the contact to update.
    pub contact_id: String,
    /// New display name, when changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New email addresses, when changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<String>>,
    /// New phone numbers, when changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phones: Option<Vec<String>>,
}

/// Payload for `contacts.search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ContactsSearchPayload {
    /// Search query.
    pub query: String,
    /// Maximum number of results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Payload for `contacts.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ContactsListPayload {
    /// Maximum number of contacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Offset into the contact list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

/// Payload for `contacts.delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ContactsDeletePayload {
    /// Identifier of the contact to delete.
    pub contact_id: String,
}

// ============================================================================
// SECTION: Messaging Payloads
// ============================================================================

/// Payload for `messaging.send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MessagingSendPayload {
    /// Conversation identifier.
    pub conversation_id: String,
    /// Message body.
    pub body: String,
}

/// Payload for `messaging.fetch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MessagingFetchPayload {
    /// Conversation identifier.
    pub conversation_id: String,
    /// Maximum number of messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Payload for `messaging.search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MessagingSearchPayload {
    /// Search query.
    pub query: String,
    /// Maximum number of results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

// ============================================================================
// SECTION: Clipboard Payloads
// ============================================================================

/// Payload for `clipboard.read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClipboardReadPayload {}

/// Payload for `clipboard.write`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ClipboardWritePayload {
    /// Content to place on the clipboard.
    pub content: String,
}

// ============================================================================
// SECTION: Location Payloads
// ============================================================================

/// Payload for `location.current`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationCurrentPayload {}

/// Payload for `location.history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct LocationHistoryPayload {
    /// Range start, RFC 3339.
    pub from: String,
    /// Range end, RFC 3339.
    pub to: String,
}

// ============================================================================
// SECTION: Voice Payloads
// ============================================================================

/// Payload for `voice.transcribe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct VoiceTranscribePayload {
    /// Reference to locally stored audio.
    pub audio_ref: String,
    /// Expected language code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Payload for `voice.synthesize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct VoiceSynthesizePayload {
    /// Text to synthesize.
    pub text: String,
    /// Voice preset name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

// ============================================================================
// SECTION: Cloud Payloads
// ============================================================================

/// Payload for `cloud.upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CloudUploadPayload {
    /// Service domain of the storage provider.
    pub provider: String,
    /// Reference to the local file.
    pub local_ref: String,
    /// Destination path at the provider.
    pub remote_path: String,
    /// Upload size in bytes, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Payload for `cloud.download`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CloudDownloadPayload {
    /// Service domain of the storage provider.
    pub provider: String,
    /// Source path at the provider.
    pub remote_path: String,
}

/// Payload for `cloud.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CloudListPayload {
    /// Service domain of the storage provider.
    pub provider: String,
    /// Path to list; the root when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
}

/// Payload for `cloud.delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CloudDeletePayload {
    /// Service domain of the storage provider.
    pub provider: String,
    /// Path to delete at the provider.
    pub remote_path: String,
}

/// Payload for `cloud.share`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CloudSharePayload {
    /// Service domain of the storage provider.
    pub provider: String,
    /// Path to share at the provider.
    pub remote_path: String,
    /// Link expiry, RFC 3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
}

/// Payload for `cloud.sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CloudSyncPayload {
    /// Service domain of the storage provider.
    pub provider: String,
    /// Remote folder path.
    pub remote_path: String,
    /// Reference to the local folder.
    pub local_ref: String,
}

// ============================================================================
// SECTION: Connector Payloads
// ============================================================================

/// Payload for `connector.authorize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ConnectorAuthorizePayload {
    /// Service domain of the connector provider.
    pub provider: String,
    /// Requested OAuth scopes.
    pub scopes: Vec<String>,
}

/// Payload for `connector.refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ConnectorRefreshPayload {
    /// Service domain of the connector provider.
    pub provider: String,
}

/// Payload for `connector.revoke`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ConnectorRevokePayload {
    /// Service domain of the connector provider.
    pub provider: String,
}

/// Payload for `connector.call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ConnectorCallPayload {
    /// Service domain of the connector provider.
    pub provider: String,
    /// Endpoint path relative to the provider root.
    pub endpoint: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Optional JSON request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Payload for `connector.status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ConnectorStatusPayload {
    /// Service domain of the connector provider.
    pub provider: String,
}

// ============================================================================
// SECTION: Import Payloads
// ============================================================================

/// Payload for `import.file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ImportFilePayload {
    /// Local path of the file to import.
    pub path: String,
    /// Declared format; inferred when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Payload for `import.mailbox`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ImportMailboxPayload {
    /// Local path of the mailbox archive.
    pub path: String,
}

/// Payload for `import.calendar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ImportCalendarPayload {
    /// Local path of the calendar export.
    pub path: String,
}

/// Payload for `import.contacts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ImportContactsPayload {
    /// Local path of the contacts export.
    pub path: String,
}

// ============================================================================
// SECTION: Model Payloads
// ============================================================================

/// Payload for `model.download`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ModelDownloadPayload {
    /// Artifact URL; must be http(s) with a named host.
    pub url: String,
    /// Local artifact name.
    pub name: String,
    /// Expected SHA-256 digest, lowercase hex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Payload for `model.verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ModelVerifyPayload {
    /// Local artifact name.
    pub name: String,
    /// Expected SHA-256 digest, lowercase hex.
    pub sha256: String,
}

/// Payload for `model.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelListPayload {}

// ============================================================================
// SECTION: Network Payloads
// ============================================================================

/// Payload for `network.status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkStatusPayload {}

/// Payload for `network.probe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct NetworkProbePayload {
    /// Host to probe.
    pub host: String,
    /// Port to probe; 443 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

// ============================================================================
// SECTION: Service Payloads
// ============================================================================

/// Payload for `service.api_call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ServiceApiCallPayload {
    /// Service domain being called.
    pub service: String,
    /// Endpoint path relative to the service root.
    pub endpoint: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Optional JSON request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

// ============================================================================
// SECTION: Action Payload Sum
// ============================================================================

/// Closed sum over all per-kind payload records.
///
/// # Invariants
/// - The variant always matches the [`ActionKind`] it was parsed for.
/// - Constructed only through [`ActionPayload::parse`] or variant literals in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPayload {
    /// `email.send` payload.
    EmailSend(EmailSendPayload),
    /// `email.reply` payload.
    EmailReply(EmailReplyPayload),
    /// `email.draft` payload.
    EmailDraft(EmailDraftPayload),
    /// `email.fetch` payload.
    EmailFetch(EmailFetchPayload),
    /// `email.search` payload.
    EmailSearch(EmailSearchPayload),
    /// `email.archive` payload.
    EmailArchive(EmailArchivePayload),
    /// `email.delete` payload.
    EmailDelete(EmailDeletePayload),
    /// `email.unsubscribe` payload.
    EmailUnsubscribe(EmailUnsubscribePayload),
    /// `calendar.create_event` payload.
    CalendarCreateEvent(CalendarCreateEventPayload),
    /// `calendar.update_event` payload.
    CalendarUpdateEvent(CalendarUpdateEventPayload),
    /// `calendar.delete_event` payload.
    CalendarDeleteEvent(CalendarDeleteEventPayload),
    /// `calendar.list_events` payload.
    CalendarListEvents(CalendarListEventsPayload),
    /// `calendar.find_slots` payload.
    CalendarFindSlots(CalendarFindSlotsPayload),
    /// `calendar.respond` payload.
    CalendarRespond(CalendarRespondPayload),
    /// `finance.fetch_transactions` payload.
    FinanceFetchTransactions(FinanceFetchTransactionsPayload),
    /// `finance.fetch_balances` payload.
    FinanceFetchBalances(FinanceFetchBalancesPayload),
    /// `finance.refresh_accounts` payload.
    FinanceRefreshAccounts(FinanceRefreshAccountsPayload),
    /// `web.search` payload.
    WebSearch(WebSearchPayload),
    /// `web.fetch` payload.
    WebFetch(WebFetchPayload),
    /// `reminder.create` payload.
    ReminderCreate(ReminderCreatePayload),
    /// `reminder.list` payload.
    ReminderList(ReminderListPayload),
    /// `reminder.update` payload.
    ReminderUpdate(ReminderUpdatePayload),
    /// `reminder.complete` payload.
    ReminderComplete(ReminderCompletePayload),
    /// `reminder.snooze` payload.
    ReminderSnooze(ReminderSnoozePayload),
    /// `reminder.delete` payload.
    ReminderDelete(ReminderDeletePayload),
    /// `contacts.create` payload.
    ContactsCreate(ContactsCreatePayload),
    /// `contacts.update` payload.
    ContactsUpdate(ContactsUpdatePayload),
    /// `contacts.search` payload.
    ContactsSearch(ContactsSearchPayload),
    /// `contacts.list` payload.
    ContactsList(ContactsListPayload),
    /// `contacts.delete` payload.
    ContactsDelete(ContactsDeletePayload),
    /// `messaging.send` payload.
    MessagingSend(MessagingSendPayload),
    /// `messaging.fetch` payload.
    MessagingFetch(MessagingFetchPayload),
    /// `messaging.search` payload.
    MessagingSearch(MessagingSearchPayload),
    /// `clipboard.read` payload.
    ClipboardRead(ClipboardReadPayload),
    /// `clipboard.write` payload.
    ClipboardWrite(ClipboardWritePayload),
    /// `location.current` payload.
    LocationCurrent(LocationCurrentPayload),
    /// `location.history` payload.
    LocationHistory(LocationHistoryPayload),
    /// `voice.transcribe` payload.
    VoiceTranscribe(VoiceTranscribePayload),
    /// `voice.synthesize` payload.
    VoiceSynthesize(VoiceSynthesizePayload),
    /// `cloud.upload` payload.
    CloudUpload(CloudUploadPayload),
    /// `cloud.download` payload.
    CloudDownload(CloudDownloadPayload),
    /// `cloud.list` payload.
    CloudList(CloudListPayload),
    /// `cloud.delete` payload.
    CloudDelete(CloudDeletePayload),
    /// `cloud.share` payload.
    CloudShare(CloudSharePayload),
    /// `cloud.sync` payload.
    CloudSync(CloudSyncPayload),
    /// `connector.authorize` payload.
    ConnectorAuthorize(ConnectorAuthorizePayload),
    /// `connector.refresh` payload.
    ConnectorRefresh(ConnectorRefreshPayload),
    /// `connector.revoke` payload.
    ConnectorRevoke(ConnectorRevokePayload),
    /// `connector.call` payload.
    ConnectorCall(ConnectorCallPayload),
    /// `connector.status` payload.
    ConnectorStatus(ConnectorStatusPayload),
    /// `import.file` payload.
    ImportFile(ImportFilePayload),
    /// `import.mailbox` payload.
    ImportMailbox(ImportMailboxPayload),
    /// `import.calendar` payload.
    ImportCalendar(ImportCalendarPayload),
    /// `import.contacts` payload.
    ImportContacts(ImportContactsPayload),
    /// `model.download` payload.
    ModelDownload(ModelDownloadPayload),
    /// `model.verify` payload.
    ModelVerify(ModelVerifyPayload),
    /// `model.list` payload.
    ModelList(ModelListPayload),
    /// `network.status` payload.
    NetworkStatus(NetworkStatusPayload),
    /// `network.probe` payload.
    NetworkProbe(NetworkProbePayload),
    /// `service.api_call` payload.
    ServiceApiCall(ServiceApiCallPayload),
}

/// Parses a typed payload record from a JSON value.
fn parse_record<T: for<'de> Deserialize<'de>>(
    kind: ActionKind,
    value: &Value,
) -> Result<T, PayloadError> {
    serde_json::from_value(value.clone()).map_err(|err| PayloadError::Shape {
        kind,
        message: err.to_string(),
    })
}

impl ActionPayload {
    /// Selects the schema bound to `kind` and validates `value` against it.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Shape`] when the value does not conform to the
    /// per-kind record, including when it carries unknown fields.
    pub fn parse(kind: ActionKind, value: &Value) -> Result<Self, PayloadError> {
        let payload = match kind {
            ActionKind::EmailSend => Self::EmailSend(parse_record(kind, value)?),
            ActionKind::EmailReply => Self::EmailReply(parse_record(kind, value)?),
            ActionKind::EmailDraft => Self::EmailDraft(parse_record(kind, value)?),
            ActionKind::EmailFetch => Self::EmailFetch(parse_record(kind, value)?),
            ActionKind::EmailSearch => Self::EmailSearch(parse_record(kind, value)?),
            ActionKind::EmailArchive => Self::EmailArchive(parse_record(kind, value)?),
            ActionKind::EmailDelete => Self::EmailDelete(parse_record(kind, value)?),
            ActionKind::EmailUnsubscribe => Self::EmailUnsubscribe(parse_record(kind, value)?),
            ActionKind::CalendarCreateEvent => {
                Self::CalendarCreateEvent(parse_record(kind, value)?)
            }
            ActionKind::CalendarUpdateEvent => {
                Self::CalendarUpdateEvent(parse_record(kind, value)?)
            }
            ActionKind::CalendarDeleteEvent => {
                Self::CalendarDeleteEvent(parse_record(kind, value)?)
            }
            ActionKind::CalendarListEvents => Self::CalendarListEvents(parse_record(kind, value)?),
            ActionKind::CalendarFindSlots => Self::CalendarFindSlots(parse_record(kind, value)?),
            ActionKind::CalendarRespond => Self::CalendarRespond(parse_record(kind, value)?),
            ActionKind::FinanceFetchTransactions => {
                Self::FinanceFetchTransactions(parse_record(kind, value)?)
            }
            ActionKind::FinanceFetchBalances => {
                Self::FinanceFetchBalances(parse_record(kind, value)?)
            }
            ActionKind::FinanceRefreshAccounts => {
                Self::FinanceRefreshAccounts(parse_record(kind, value)?)
            }
            ActionKind::WebSearch => Self::WebSearch(parse_record(kind, value)?),
            ActionKind::WebFetch => Self::WebFetch(parse_record(kind, value)?),
            ActionKind::ReminderCreate => Self::ReminderCreate(parse_record(kind, value)?),
            ActionKind::ReminderList => Self::ReminderList(parse_record(kind, value)?),
            ActionKind::ReminderUpdate => Self::ReminderUpdate(parse_record(kind, value)?),
            ActionKind::ReminderComplete => Self::ReminderComplete(parse_record(kind, value)?),
            ActionKind::ReminderSnooze => Self::ReminderSnooze(parse_record(kind, value)?),
            ActionKind::ReminderDelete => Self::ReminderDelete(parse_record(kind, value)?),
            ActionKind::ContactsCreate => Self::ContactsCreate(parse_record(kind, value)?),
            ActionKind::ContactsUpdate => Self::ContactsUpdate(parse_record(kind, value)?),
            ActionKind::ContactsSearch => Self::ContactsSearch(parse_record(kind, value)?),
            ActionKind::ContactsList => Self::ContactsList(parse_record(kind, value)?),
            ActionKind::ContactsDelete => Self::ContactsDelete(parse_record(kind, value)?),
            ActionKind::MessagingSend => Self::MessagingSend(parse_record(kind, value)?),
            ActionKind::MessagingFetch => Self::MessagingFetch(parse_record(kind, value)?),
            ActionKind::MessagingSearch => Self::MessagingSearch(parse_record(kind, value)?),
            ActionKind::ClipboardRead => Self::ClipboardRead(parse_record(kind, value)?),
            ActionKind::ClipboardWrite => Self::ClipboardWrite(parse_record(kind, value)?),
            ActionKind::LocationCurrent => Self::LocationCurrent(parse_record(kind, value)?),
            ActionKind::LocationHistory => Self::LocationHistory(parse_record(kind, value)?),
            ActionKind::VoiceTranscribe => Self::VoiceTranscribe(parse_record(kind, value)?),
            ActionKind::VoiceSynthesize => Self::VoiceSynthesize(parse_record(kind, value)?),
            ActionKind::CloudUpload => Self::CloudUpload(parse_record(kind, value)?),
            ActionKind::CloudDownload => Self::CloudDownload(parse_record(kind, value)?),
            ActionKind::CloudList => Self::CloudList(parse_record(kind, value)?),
            ActionKind::CloudDelete => Self::CloudDelete(parse_record(kind, value)?),
            ActionKind::CloudShare => Self::CloudShare(parse_record(kind, value)?),
            ActionKind::CloudSync => Self::CloudSync(parse_record(kind, value)?),
            ActionKind::ConnectorAuthorize => Self::ConnectorAuthorize(parse_record(kind, value)?),
            ActionKind::ConnectorRefresh => Self::ConnectorRefresh(parse_record(kind, value)?),
            ActionKind::ConnectorRevoke => Self::ConnectorRevoke(parse_record(kind, value)?),
            ActionKind::ConnectorCall => Self::ConnectorCall(parse_record(kind, value)?),
            ActionKind::ConnectorStatus => Self::ConnectorStatus(parse_record(kind, value)?),
            ActionKind::ImportFile => Self::ImportFile(parse_record(kind, value)?),
            ActionKind::ImportMailbox => Self::ImportMailbox(parse_record(kind, value)?),
            ActionKind::ImportCalendar => Self::ImportCalendar(parse_record(kind, value)?),
            ActionKind::ImportContacts => Self::ImportContacts(parse_record(kind, value)?),
            ActionKind::ModelDownload => Self::ModelDownload(parse_record(kind, value)?),
            ActionKind::ModelVerify => Self::ModelVerify(parse_record(kind, value)?),
            ActionKind::ModelList => Self::ModelList(parse_record(kind, value)?),
            ActionKind::NetworkStatus => Self::NetworkStatus(parse_record(kind, value)?),
            ActionKind::NetworkProbe => Self::NetworkProbe(parse_record(kind, value)?),
            ActionKind::ServiceApiCall => Self::ServiceApiCall(parse_record(kind, value)?),
        };
        Ok(payload)
    }

    /// Returns the action kind this payload belongs to.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::EmailSend(_) => ActionKind::EmailSend,
            Self::EmailReply(_) => ActionKind::EmailReply,
            Self::EmailDraft(_) => ActionKind::EmailDraft,
            Self::EmailFetch(_) => ActionKind::EmailFetch,
            Self::EmailSearch(_) => ActionKind::EmailSearch,
            Self::EmailArchive(_) => ActionKind::EmailArchive,
            Self::EmailDelete(_) => ActionKind::EmailDelete,
            Self::EmailUnsubscribe(_) => ActionKind::EmailUnsubscribe,
            Self::CalendarCreateEvent(_) => ActionKind::CalendarCreateEvent,
            Self::CalendarUpdateEvent(_) => ActionKind::CalendarUpdateEvent,
            Self::CalendarDeleteEvent(_) => ActionKind::CalendarDeleteEvent,
            Self::CalendarListEvents(_) => ActionKind::CalendarListEvents,
            Self::CalendarFindSlots(_) => ActionKind::CalendarFindSlots,
            Self::CalendarRespond(_) => ActionKind::CalendarRespond,
            Self::FinanceFetchTransactions(_) => ActionKind::FinanceFetchTransactions,
            Self::FinanceFetchBalances(_) => ActionKind::FinanceFetchBalances,
            Self::FinanceRefreshAccounts(_) => ActionKind::FinanceRefreshAccounts,
            Self::WebSearch(_) => ActionKind::WebSearch,
            Self::WebFetch(_) => ActionKind::WebFetch,
            Self::ReminderCreate(_) => ActionKind::ReminderCreate,
            Self::ReminderList(_) => ActionKind::ReminderList,
            Self::ReminderUpdate(_) => ActionKind::ReminderUpdate,
            Self::ReminderComplete(_) => ActionKind::ReminderComplete,
            Self::ReminderSnooze(_) => ActionKind::ReminderSnooze,
            Self::ReminderDelete(_) => ActionKind::ReminderDelete,
            Self::ContactsCreate(_) => ActionKind::ContactsCreate,
            Self::ContactsUpdate(_) => ActionKind::ContactsUpdate,
            Self::ContactsSearch(_) => ActionKind::ContactsSearch,
            Self::ContactsList(_) => ActionKind::ContactsList,
            Self::ContactsDelete(_) => ActionKind::ContactsDelete,
            Self::MessagingSend(_) => ActionKind::MessagingSend,
            Self::MessagingFetch(_) => ActionKind::MessagingFetch,
            Self::MessagingSearch(_) => ActionKind::MessagingSearch,
            Self::ClipboardRead(_) => ActionKind::ClipboardRead,
            Self::ClipboardWrite(_) => ActionKind::ClipboardWrite,
            Self::LocationCurrent(_) => ActionKind::LocationCurrent,
            Self::LocationHistory(_) => ActionKind::LocationHistory,
            Self::VoiceTranscribe(_) => ActionKind::VoiceTranscribe,
            Self::VoiceSynthesize(_) => ActionKind::VoiceSynthesize,
            Self::CloudUpload(_) => ActionKind::CloudUpload,
            Self::CloudDownload(_) => ActionKind::CloudDownload,
            Self::CloudList(_) => ActionKind::CloudList,
            Self::CloudDelete(_) => ActionKind::CloudDelete,
            Self::CloudShare(_) => ActionKind::CloudShare,
            Self::CloudSync(_) => ActionKind::CloudSync,
            Self::ConnectorAuthorize(_) => ActionKind::ConnectorAuthorize,
            Self::ConnectorRefresh(_) => ActionKind::ConnectorRefresh,
            Self::ConnectorRevoke(_) => ActionKind::ConnectorRevoke,
            Self::ConnectorCall(_) => ActionKind::ConnectorCall,
            Self::ConnectorStatus(_) => ActionKind::ConnectorStatus,
            Self::ImportFile(_) => ActionKind::ImportFile,
            Self::ImportMailbox(_) => ActionKind::ImportMailbox,
            Self::ImportCalendar(_) => ActionKind::ImportCalendar,
            Self::ImportContacts(_) => ActionKind::ImportContacts,
            Self::ModelDownload(_) => ActionKind::ModelDownload,
            Self::ModelVerify(_) => ActionKind::ModelVerify,
            Self::ModelList(_) => ActionKind::ModelList,
            Self::NetworkStatus(_) => ActionKind::NetworkStatus,
            Self::NetworkProbe(_) => ActionKind::NetworkProbe,
            Self::ServiceApiCall(_) => ActionKind::ServiceApiCall,
        }
    }

    /// Derives the external domain this payload targets, when it names one.
    ///
    /// Kinds whose outward target is account configuration rather than
    /// payload data (mail, calendar, finance, messaging) return `None` and
    /// are authorized at the adapter boundary instead of the allowlist stage.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Target`] when a named target is present but
    /// not a valid domain or http(s) URL.
    pub fn target_domain(&self) -> Result<Option<Domain>, PayloadError> {
        let kind = self.kind();
        match self {
            Self::WebFetch(payload) => url_host(kind, &payload.url).map(Some),
            Self::ModelDownload(payload) => url_host(kind, &payload.url).map(Some),
            Self::CloudUpload(payload) => named_domain(kind, &payload.provider).map(Some),
            Self::CloudDownload(payload) => named_domain(kind, &payload.provider).map(Some),
            Self::CloudList(payload) => named_domain(kind, &payload.provider).map(Some),
            Self::CloudDelete(payload) => named_domain(kind, &payload.provider).map(Some),
            Self::CloudShare(payload) => named_domain(kind, &payload.provider).map(Some),
            Self::CloudSync(payload) => named_domain(kind, &payload.provider).map(Some),
            Self::ConnectorAuthorize(payload) => named_domain(kind, &payload.provider).map(Some),
            Self::ConnectorRefresh(payload) => named_domain(kind, &payload.provider).map(Some),
            Self::ConnectorRevoke(payload) => named_domain(kind, &payload.provider).map(Some),
            Self::ConnectorCall(payload) => named_domain(kind, &payload.provider).map(Some),
            Self::ConnectorStatus(payload) => named_domain(kind, &payload.provider).map(Some),
            Self::NetworkProbe(payload) => named_domain(kind, &payload.host).map(Some),
            Self::ServiceApiCall(payload) => named_domain(kind, &payload.service).map(Some),
            _ => Ok(None),
        }
    }
}

/// Validates a payload field holding a bare domain name.
fn named_domain(kind: ActionKind, value: &str) -> Result<Domain, PayloadError> {
    Domain::new(value).map_err(|err| PayloadError::Target {
        kind,
        message: err.to_string(),
    })
}

/// Extracts and validates the host of an http(s) URL field.
fn url_host(kind: ActionKind, value: &str) -> Result<Domain, PayloadError> {
    let url = Url::parse(value).map_err(|err| PayloadError::Target {
        kind,
        message: err.to_string(),
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(PayloadError::Target {
            kind,
            message: format!("unsupported url scheme: {}", url.scheme()),
        });
    }
    let host = url.host_str().ok_or_else(|| PayloadError::Target {
        kind,
        message: "url has no host".to_string(),
    })?;
    Domain::new(host).map_err(|err| PayloadError::Target {
        kind,
        message: err.to_string(),
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use serde_json::json;

    use super::ActionPayload;
    use crate::core::actions::ActionKind;

    /// Tests a conforming payload parses into its record.
    #[test]
    fn test_conforming_payload_parses() {
        let value = json!({"to": ["a@b.com"], "subject": "Hi", "body": "Hello"});
        let payload = ActionPayload::parse(ActionKind::EmailSend, &value).unwrap();
        match payload {
            ActionPayload::EmailSend(record) => {
                assert_eq!(record.to, vec!["a@b.com".to_string()]);
                assert_eq!(record.subject, "Hi");
            }
            other => panic!("unexpected payload variant: {other:?}"),
        }
    }

    /// Tests unknown fields are rejected.
    #[test]
    fn test_unknown_field_rejected() {
        let value = json!({"to": ["a@b.com"], "subject": "Hi", "body": "Hello", "exfil": true});
        assert!(ActionPayload::parse(ActionKind::EmailSend, &value).is_err());
    }

    /// Tests missing required fields are rejected.
    #[test]
    fn test_missing_field_rejected() {
        let value = json!({"to": ["a@b.com"], "subject": "Hi"});
        assert!(ActionPayload::parse(ActionKind::EmailSend, &value).is_err());
    }

    /// Tests wrong field types are rejected.
    #[test]
    fn test_wrong_type_rejected() {
        let value = json!({"to": "a@b.com", "subject": "Hi", "body": "Hello"});
        assert!(ActionPayload::parse(ActionKind::EmailSend, &value).is_err());
    }

    /// Tests service call target derivation.
    #[test]
    fn test_service_call_target_domain() {
        let value = json!({
            "service": "API.Example.com",
            "endpoint": "/v1/items",
            "method": "GET"
        });
        let payload = ActionPayload::parse(ActionKind::ServiceApiCall, &value).unwrap();
        let domain = payload.target_domain().unwrap().unwrap();
        assert_eq!(domain.as_str(), "api.example.com");
    }

    /// Tests url-bearing kinds derive the host as target.
    #[test]
    fn test_web_fetch_target_domain() {
        let value = json!({"url": "https://news.example.org/today"});
        let payload = ActionPayload::parse(ActionKind::WebFetch, &value).unwrap();
        let domain = payload.target_domain().unwrap().unwrap();
        assert_eq!(domain.as_str(), "news.example.org");
    }

    /// Tests non-http url schemes are rejected as targets.
    #[test]
    fn test_web_fetch_rejects_file_scheme() {
        let value = json!({"url": "file:///etc/passwd"});
        let payload = ActionPayload::parse(ActionKind::WebFetch, &value).unwrap();
        assert!(payload.target_domain().is_err());
    }

    /// Tests local kinds have no target domain.
    #[test]
    fn test_local_kinds_have_no_target() {
        let value = json!({"title": "water plants"});
        let payload = ActionPayload::parse(ActionKind::ReminderCreate, &value).unwrap();
        assert!(payload.target_domain().unwrap().is_none());
    }

    /// Tests email send has no payload-derived target.
    #[test]
    fn test_email_send_has_no_payload_target() {
        let value = json!({"to": ["a@b.com"], "subject": "Hi", "body": "Hello"});
        let payload = ActionPayload::parse(ActionKind::EmailSend, &value).unwrap();
        assert!(payload.target_domain().unwrap().is_none());
    }

    /// Tests empty-record payloads reject extra fields.
    #[test]
    fn test_empty_record_rejects_extras() {
        assert!(ActionPayload::parse(ActionKind::ClipboardRead, &json!({})).is_ok());
        assert!(ActionPayload::parse(ActionKind::ClipboardRead, &json!({"x": 1})).is_err());
    }
}
