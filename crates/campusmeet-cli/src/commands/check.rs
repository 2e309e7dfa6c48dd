//! Check command.

use std::collections::BTreeSet;
use std::path::PathBuf;

use campusmeet_service::{MeetingStore, Snapshot};
use tracing::info;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Validates every record of a snapshot and reports all problems found.
pub fn run(config: &ClientConfig, snapshot: Option<PathBuf>) -> ClientResult<()> {
    let path = super::snapshot_path(snapshot, config)?;
    let snapshot = Snapshot::load(&path)?;

    let problems = check_snapshot(&snapshot);
    for problem in &problems {
        println!("{problem}");
    }
    if !problems.is_empty() {
        return Err(ClientError::InvalidSnapshot {
            problems: problems.len(),
        });
    }

    let organizations = snapshot.organizations.len();
    let store = MeetingStore::from_snapshot(snapshot)?;
    info!(path = %path.display(), meetings = store.len(), "Snapshot is valid");
    println!(
        "{} meeting(s) in {} organization(s) are valid.",
        store.len(),
        organizations
    );
    Ok(())
}

/// Returns one line per invalid record.
pub fn check_snapshot(snapshot: &Snapshot) -> Vec<String> {
    let mut problems = Vec::new();

    let mut organization_ids = BTreeSet::new();
    let mut names = BTreeSet::new();
    for organization in &snapshot.organizations {
        let label = format!("organization {}", organization.id);
        if !organization_ids.insert(organization.id) {
            problems.push(format!("{label}: duplicate id"));
        }
        if !names.insert(organization.name.as_str()) {
            problems.push(format!("{label}: duplicate name {:?}", organization.name));
        }
        if let Err(err) = organization.validate() {
            problems.push(format!("{label}: {err}"));
        }
    }

    let mut memberships = BTreeSet::new();
    for member in &snapshot.members {
        let label = format!(
            "member {} of organization {}",
            member.user_id, member.organization_id
        );
        if !organization_ids.contains(&member.organization_id) {
            problems.push(format!("{label}: unknown organization"));
        }
        if !memberships.insert((member.organization_id, member.user_id)) {
            problems.push(format!("{label}: duplicate membership"));
        }
    }

    let mut meeting_ids = BTreeSet::new();
    for meeting in &snapshot.meetings {
        let label = format!("meeting {} ({})", meeting.id, meeting.title);
        if !meeting_ids.insert(meeting.id) {
            problems.push(format!("{label}: duplicate id"));
        }
        if !organization_ids.contains(&meeting.organization_id) {
            problems.push(format!(
                "{label}: unknown organization {}",
                meeting.organization_id
            ));
        }
        if let Err(err) = meeting.validate() {
            problems.push(format!("{label}: {err}"));
        }
    }

    problems
}
