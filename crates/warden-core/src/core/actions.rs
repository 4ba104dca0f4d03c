// crates/warden-core/src/core/actions.rs
// ============================================================================
// Module: Warden Action Kinds
// Description: Closed discriminator set for Core-to-Gateway action requests.
// Purpose: Give every requestable operation a stable wire name and family.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Action kinds form a closed enumeration; an unrecognized discriminator is a
//! schema violation, never a fall-through. Kinds are grouped into families
//! that share an adapter binding, and each kind declares whether it can ever
//! touch the network.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

// ============================================================================
// SECTION: Action Families
// ============================================================================

/// Service family grouping action kinds that share an adapter binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionFamily {
    /// Mail operations.
    Email,
    /// Calendar operations.
    Calendar,
    /// Financial account operations.
    Finance,
    /// Web search and retrieval.
    Web,
    /// Local reminder store.
    Reminder,
    /// Local contact store.
    Contacts,
    /// Messaging operations.
    Messaging,
    /// Local clipboard access.
    Clipboard,
    /// Device location access.
    Location,
    /// Local voice processing.
    Voice,
    /// Cloud storage operations.
    Cloud,
    /// OAuth connector lifecycle and calls.
    Connector,
    /// Local data imports.
    Import,
    /// Model artifact management.
    Model,
    /// Network diagnostics.
    Network,
    /// Generic authorized API calls.
    Service,
}

// ============================================================================
// SECTION: Action Kinds
// ============================================================================

/// Closed set of action kinds Core may request.
///
/// # Invariants
/// - Wire names are stable `family.operation` strings.
/// - The set is closed; parsing an unknown name fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    /// Send an email.
    EmailSend,
    /// Reply to an existing email thread.
    EmailReply,
    /// Store an email draft.
    EmailDraft,
    /// Fetch messages from a mailbox.
    EmailFetch,
    /// Search messages in a mailbox.
    EmailSearch,
    /// Archive a message.
    EmailArchive,
    /// Delete a message.
    EmailDelete,
    /// Unsubscribe from a mailing list.
    EmailUnsubscribe,
    /// Create a calendar event.
    CalendarCreateEvent,
    /// Update a calendar event.
    CalendarUpdateEvent,
    /// Delete a calendar event.
    CalendarDeleteEvent,
    /// List calendar events in a range.
    CalendarListEvents,
    /// Find free slots in a range.
    CalendarFindSlots,
    /// Respond to an event invitation.
    CalendarRespond,
    /// Fetch account transactions.
    FinanceFetchTransactions,
    /// Fetch account balances.
    FinanceFetchBalances,
    /// Refresh linked financial accounts.
    FinanceRefreshAccounts,
    /// Search the web through the configured provider.
    WebSearch,
    /// Fetch a single web resource.
    WebFetch,
    /// Create a reminder.
    ReminderCreate,
    /// List reminders.
    ReminderList,
    /// Update a reminder.
    ReminderUpdate,
    /// Mark a reminder complete.
    ReminderComplete,
    /// Snooze a reminder.
    ReminderSnooze,
    /// Delete a reminder.
    ReminderDelete,
    /// Create a contact.
    ContactsCreate,
    /// Update a contact.
    ContactsUpdate,
    /// Search contacts.
    ContactsSearch,
    /// List contacts.
    ContactsList,
    /// Delete a contact.
    ContactsDelete,
    /// Send a message.
    MessagingSend,
    /// Fetch messages from a conversation.
    MessagingFetch,
    /// Search message history.
    MessagingSearch,
    /// Read the clipboard.
    ClipboardRead,
    /// Write the clipboard.
    ClipboardWrite,
    /// Read the current device location.
    LocationCurrent,
    /// Read location history.
    LocationHistory,
    /// Transcribe audio locally.
    VoiceTranscribe,
    /// Synthesize speech locally.
    VoiceSynthesize,
    /// Upload a file to cloud storage.
    CloudUpload,
    /// Download a file from cloud storage.
    CloudDownload,
    /// List cloud storage entries.
    CloudList,
    /// Delete a cloud storage entry.
    CloudDelete,
    /// Create a sharing link.
    CloudShare,
    /// Synchronize a cloud folder.
    CloudSync,
    /// Begin an OAuth authorization flow.
    ConnectorAuthorize,
    /// Refresh connector tokens.
    ConnectorRefresh,
    /// Revoke connector access.
    ConnectorRevoke,
    /// Invoke a connector endpoint.
    ConnectorCall,
    /// Report connector status.
    ConnectorStatus,
    /// Import a local file.
    ImportFile,
    /// Import a local mailbox archive.
    ImportMailbox,
    /// Import a local calendar export.
    ImportCalendar,
    /// Import a local contacts export.
    ImportContacts,
    /// Download a model artifact.
    ModelDownload,
    /// Verify a downloaded model artifact.
    ModelVerify,
    /// List downloaded model artifacts.
    ModelList,
    /// Report local network status.
    NetworkStatus,
    /// Probe reachability of a host.
    NetworkProbe,
    /// Generic authorized API call to a named service.
    ServiceApiCall,
}

/// All action kinds in wire-name order, for registration and iteration.
pub const ALL_ACTION_KINDS: [ActionKind; 60] = [
    ActionKind::EmailSend,
    ActionKind::EmailReply,
    ActionKind::EmailDraft,
    ActionKind::EmailFetch,
    ActionKind::EmailSearch,
    ActionKind::EmailArchive,
    ActionKind::EmailDelete,
    ActionKind::EmailUnsubscribe,
    ActionKind::CalendarCreateEvent,
    ActionKind::CalendarUpdateEvent,
    ActionKind::CalendarDeleteEvent,
    ActionKind::CalendarListEvents,
    ActionKind::CalendarFindSlots,
    ActionKind::CalendarRespond,
    ActionKind::FinanceFetchTransactions,
    ActionKind::FinanceFetchBalances,
    ActionKind::FinanceRefreshAccounts,
    ActionKind::WebSearch,
    ActionKind::WebFetch,
    ActionKind::ReminderCreate,
    ActionKind::ReminderList,
    ActionKind::ReminderUpdate,
    ActionKind::ReminderComplete,
    ActionKind::ReminderSnooze,
    ActionKind::ReminderDelete,
    ActionKind::ContactsCreate,
    ActionKind::ContactsUpdate,
    ActionKind::ContactsSearch,
    ActionKind::ContactsList,
    ActionKind::ContactsDelete,
    ActionKind::MessagingSend,
    ActionKind::MessagingFetch,
    ActionKind::MessagingSearch,
    ActionKind::ClipboardRead,
    ActionKind::ClipboardWrite,
    ActionKind::LocationCurrent,
    ActionKind::LocationHistory,
    ActionKind::VoiceTranscribe,
    ActionKind::VoiceSynthesize,
    ActionKind::CloudUpload,
    ActionKind::CloudDownload,
    ActionKind::CloudList,
    ActionKind::CloudDelete,
    ActionKind::CloudShare,
    ActionKind::CloudSync,
    ActionKind::ConnectorAuthorize,
    ActionKind::ConnectorRefresh,
    ActionKind::ConnectorRevoke,
    ActionKind::ConnectorCall,
    ActionKind::ConnectorStatus,
    ActionKind::ImportFile,
    ActionKind::ImportMailbox,
    ActionKind::ImportCalendar,
    ActionKind::ImportContacts,
    ActionKind::ModelDownload,
    ActionKind::ModelVerify,
    ActionKind::ModelList,
    ActionKind::NetworkStatus,
    ActionKind::NetworkProbe,
    ActionKind::ServiceApiCall,
];

impl ActionKind {
    /// Returns the stable wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailSend => "email.send",
            Self::EmailReply => "email.reply",
            Self::EmailDraft => "email.draft",
            Self::EmailFetch => "email.fetch",
            Self::EmailSearch => "email.search",
            Self::EmailArchive => "email.archive",
            Self::EmailDelete => "email.delete",
            Self::EmailUnsubscribe => "email.unsubscribe",
            Self::CalendarCreateEvent => "calendar.create_event",
            Self::CalendarUpdateEvent => "calendar.update_event",
            Self::CalendarDeleteEvent => "calendar.delete_event",
            Self::CalendarListEvents => "calendar.list_events",
            Self::CalendarFindSlots => "calendar.find_slots",
            Self::CalendarRespond => "calendar.respond",
            Self::FinanceFetchTransactions => "finance.fetch_transactions",
            Self::FinanceFetchBalances => "finance.fetch_balances",
            Self::FinanceRefreshAccounts => "finance.refresh_accounts",
            Self::WebSearch => "web.search",
            Self::WebFetch => "web.fetch",
            Self::ReminderCreate => "reminder.create",
            Self::ReminderList => "reminder.list",
            Self::ReminderUpdate => "reminder.update",
            Self::ReminderComplete => "reminder.complete",
            Self::ReminderSnooze => "reminder.snooze",
            Self::ReminderDelete => "reminder.delete",
            Self::ContactsCreate => "contacts.create",
            Self::ContactsUpdate => "contacts.update",
            Self::ContactsSearch => "contacts.search",
            Self::ContactsList => "contacts.list",
            Self::ContactsDelete => "contacts.delete",
            Self::MessagingSend => "messaging.send",
            Self::MessagingFetch => "messaging.fetch",
            Self::MessagingSearch => "messaging.search",
            Self::ClipboardRead => "clipboard.read",
            Self::ClipboardWrite => "clipboard.write",
            Self::LocationCurrent => "location.current",
            Self::LocationHistory => "location.history",
            Self::VoiceTranscribe => "voice.transcribe",
            Self::VoiceSynthesize => "voice.synthesize",
            Self::CloudUpload => "cloud.upload",
            Self::CloudDownload => "cloud.download",
            Self::CloudList => "cloud.list",
            Self::CloudDelete => "cloud.delete",
            Self::CloudShare => "cloud.share",
            Self::CloudSync => "cloud.sync",
            Self::ConnectorAuthorize => "connector.authorize",
            Self::ConnectorRefresh => "connector.refresh",
            Self::ConnectorRevoke => "connector.revoke",
            Self::ConnectorCall => "connector.call",
            Self::ConnectorStatus => "connector.status",
            Self::ImportFile => "import.file",
            Self::ImportMailbox => "import.mailbox",
            Self::ImportCalendar => "import.calendar",
            Self::ImportContacts => "import.contacts",
            Self::ModelDownload => "model.download",
            Self::ModelVerify => "model.verify",
            Self::ModelList => "model.list",
            Self::NetworkStatus => "network.status",
            Self::NetworkProbe => "network.probe",
            Self::ServiceApiCall => "service.api_call",
        }
    }

    /// Parses a wire name into an action kind.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        ALL_ACTION_KINDS.iter().copied().find(|kind| kind.as_str() == name)
    }

    /// Returns the service family of the kind.
    #[must_use]
    pub const fn family(self) -> ActionFamily {
        match self {
            Self::EmailSend
            | Self::EmailReply
            | Self::EmailDraft
            | Self::EmailFetch
            | Self::EmailSearch
            | Self::EmailArchive
            | Self::EmailDelete
            | Self::EmailUnsubscribe => ActionFamily::Email,
            Self::CalendarCreateEvent
            | Self::CalendarUpdateEvent
            | Self::CalendarDeleteEvent
            | Self::CalendarListEvents
            | Self::CalendarFindSlots
            | Self::CalendarRespond => ActionFamily::Calendar,
            Self::FinanceFetchTransactions
            | Self::FinanceFetchBalances
            | Self::FinanceRefreshAccounts => ActionFamily::Finance,
            Self::WebSearch | Self::WebFetch => ActionFamily::Web,
            Self::ReminderCreate
            | Self::ReminderList
            | Self::ReminderUpdate
            | Self::ReminderComplete
            | Self::ReminderSnooze
            | Self::ReminderDelete => ActionFamily::Reminder,
            Self::ContactsCreate
            | Self::ContactsUpdate
            | Self::ContactsSearch
            | Self::ContactsList
            | Self::ContactsDelete => ActionFamily::Contacts,
            Self::MessagingSend | Self::MessagingFetch | Self::MessagingSearch => {
                ActionFamily::Messaging
            }
            Self::ClipboardRead | Self::ClipboardWrite => ActionFamily::Clipboard,
            Self::LocationCurrent | Self::LocationHistory => ActionFamily::Location,
            Self::VoiceTranscribe | Self::VoiceSynthesize => ActionFamily::Voice,
            Self::CloudUpload
            | Self::CloudDownload
            | Self::CloudList
            | Self::CloudDelete
            | Self::CloudShare
            | Self::CloudSync => ActionFamily::Cloud,
            Self::ConnectorAuthorize
            | Self::ConnectorRefresh
            | Self::ConnectorRevoke
            | Self::ConnectorCall
            | Self::ConnectorStatus => ActionFamily::Connector,
            Self::ImportFile | Self::ImportMailbox | Self::ImportCalendar | Self::ImportContacts => {
                ActionFamily::Import
            }
            Self::ModelDownload | Self::ModelVerify | Self::ModelList => ActionFamily::Model,
            Self::NetworkStatus | Self::NetworkProbe => ActionFamily::Network,
            Self::ServiceApiCall => ActionFamily::Service,
        }
    }

    /// Returns true when the kind never targets the network.
    ///
    /// Local-only kinds skip allowlist enforcement and never contribute to
    /// the anomaly detector's domain state.
    #[must_use]
    pub const fn is_local_only(self) -> bool {
        matches!(
            self.family(),
            ActionFamily::Reminder
                | ActionFamily::Contacts
                | ActionFamily::Clipboard
                | ActionFamily::Location
                | ActionFamily::Voice
                | ActionFamily::Import
        ) || matches!(self, Self::ModelVerify | Self::ModelList | Self::NetworkStatus)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::parse(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown action kind: {name}")))
    }
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

    use std::collections::BTreeSet;

    use super::ALL_ACTION_KINDS;
    use super::ActionFamily;
    use super::ActionKind;

    /// Tests every kind round-trips through its wire name.
    #[test]
    fn test_wire_names_round_trip() {
        for kind in ALL_ACTION_KINDS {
            assert_eq!(ActionKind::parse(kind.as_str()), Some(kind));
        }
    }

    /// Tests wire names are unique.
    #[test]
    fn test_wire_names_are_unique() {
        let names: BTreeSet<&str> = ALL_ACTION_KINDS.iter().map(|kind| kind.as_str()).collect();
        assert_eq!(names.len(), ALL_ACTION_KINDS.len());
    }

    /// Tests unknown names fail to parse.
    #[test]
    fn test_unknown_name_rejected() {
        assert_eq!(ActionKind::parse("email.exfiltrate"), None);
        assert_eq!(ActionKind::parse(""), None);
    }

    /// Tests family assignment for representative kinds.
    #[test]
    fn test_family_assignment() {
        assert_eq!(ActionKind::EmailSend.family(), ActionFamily::Email);
        assert_eq!(ActionKind::ServiceApiCall.family(), ActionFamily::Service);
        assert_eq!(ActionKind::ReminderSnooze.family(), ActionFamily::Reminder);
    }

    /// Tests local-only classification.
    #[test]
    fn test_local_only_classification() {
        assert!(ActionKind::ReminderCreate.is_local_only());
        assert!(ActionKind::ClipboardWrite.is_local_only());
        assert!(ActionKind::ModelList.is_local_only());
        assert!(!ActionKind::EmailSend.is_local_only());
        assert!(!ActionKind::ServiceApiCall.is_local_only());
        assert!(!ActionKind::NetworkProbe.is_local_only());
    }
}
