//! Participant directory resolution: which roster members a broadcast mentions.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::transport::TransportPort;
use crate::types::Participant;

/// Which participants to select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every participant.
    All,
    /// Admins and super-admins.
    AdminOnly,
    /// Participants whose display name contains the fragment, ignoring case.
    NameMatch(String),
}

/// Selected participants, numbered in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Participant ids to mention.
    pub mention_ids: Vec<String>,
    /// One `N. @handle` line per mention.
    pub lines: Vec<String>,
}

impl Resolution {
    /// Whether nobody matched.
    pub fn is_empty(&self) -> bool {
        self.mention_ids.is_empty()
    }

    /// Broadcast text: header, blank line, numbered handles.
    pub fn render(&self, header: &str) -> String {
        let mut text = format!("{header}\n\n");
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    fn push(&mut self, participant: &Participant) {
        self.mention_ids.push(participant.id.clone());
        let number = self.mention_ids.len();
        self.lines
            .push(format!("{number}. @{}", participant.display_handle));
    }
}

/// Select participants from a roster snapshot.
///
/// `NameMatch` looks up each participant's contact through `contacts`; a
/// failed lookup skips that participant and the rest are still resolved.
/// Ids repeated in the roster are selected once.
pub async fn resolve(
    roster: &[Participant],
    filter: &Filter,
    contacts: &dyn TransportPort,
) -> Resolution {
    let mut resolution = Resolution::default();
    let mut seen = HashSet::new();
    let needle = match filter {
        Filter::NameMatch(fragment) => Some(fragment.to_lowercase()),
        _ => None,
    };

    for participant in roster {
        if seen.contains(participant.id.as_str()) {
            continue;
        }
        let selected = match (filter, needle.as_deref()) {
            (Filter::All, _) => true,
            (Filter::AdminOnly, _) => participant.has_admin_role(),
            (Filter::NameMatch(_), Some(needle)) => {
                name_matches(participant, needle, contacts).await
            }
            (Filter::NameMatch(_), None) => false,
        };
        if selected {
            seen.insert(participant.id.as_str());
            resolution.push(participant);
        }
    }

    debug!(
        ?filter,
        roster = roster.len(),
        selected = resolution.mention_ids.len(),
        "participants resolved"
    );
    resolution
}

async fn name_matches(participant: &Participant, needle: &str, contacts: &dyn TransportPort) -> bool {
    match contacts.get_contact(&participant.id).await {
        Ok(contact) => contact
            .display_name()
            .is_some_and(|name| name.to_lowercase().contains(needle)),
        Err(e) => {
            warn!(participant = %participant.id, error = %e, "contact lookup failed, skipping");
            false
        }
    }
}
