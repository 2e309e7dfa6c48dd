//! In-memory meeting store.
//!
//! Holds organizations, their members and their meetings. Every mutation is
//! applied to a copy of the meeting, validated, and only then committed, so
//! the store never holds a meeting that would fail to expand.

use std::collections::BTreeMap;
use std::path::Path;

use campusmeet_core::{
    Meeting, MeetingException, MeetingId, OccurrenceOverride, Organization, OrganizationId,
    OrganizationMember, RecurrenceRule, ScheduleError, UserId,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ServiceError, ServiceResult};

/// Serialized form of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub members: Vec<OrganizationMember>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
}

impl Snapshot {
    /// Parses a snapshot from JSON text.
    pub fn from_json(json: &str) -> ServiceResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&text)?;
        debug!(
            path = %path.display(),
            organizations = snapshot.organizations.len(),
            meetings = snapshot.meetings.len(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }
}

/// Organizations, members and meetings.
#[derive(Debug, Default)]
pub struct MeetingStore {
    organizations: BTreeMap<OrganizationId, Organization>,
    members: BTreeMap<(OrganizationId, UserId), OrganizationMember>,
    meetings: BTreeMap<MeetingId, Meeting>,
    next_meeting_id: MeetingId,
}

impl MeetingStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            next_meeting_id: 1,
            ..Default::default()
        }
    }

    /// Builds a store from a snapshot, validating every record.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid record, duplicate key, or reference to an
    /// unknown organization.
    pub fn from_snapshot(snapshot: Snapshot) -> ServiceResult<Self> {
        let mut store = Self::new();
        for organization in snapshot.organizations {
            store.add_organization(organization)?;
        }
        for member in snapshot.members {
            store.add_member(member)?;
        }
        for meeting in snapshot.meetings {
            store.insert_meeting(meeting)?;
        }
        info!(
            organizations = store.organizations.len(),
            members = store.members.len(),
            meetings = store.meetings.len(),
            "Store loaded"
        );
        Ok(store)
    }

    /// Serializes the store.
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            organizations: self.organizations.values().cloned().collect(),
            members: self.members.values().cloned().collect(),
            meetings: self.meetings.values().cloned().collect(),
        }
    }

    /// Adds an organization.
    pub fn add_organization(&mut self, organization: Organization) -> ServiceResult<()> {
        organization.validate()?;
        if self.organizations.contains_key(&organization.id) {
            return Err(ServiceError::conflict(format!(
                "organization {} already exists",
                organization.id
            )));
        }
        if self.organizations.values().any(|o| o.name == organization.name) {
            return Err(ServiceError::conflict(format!(
                "organization name {:?} is taken",
                organization.name
            )));
        }
        self.organizations.insert(organization.id, organization);
        Ok(())
    }

    /// Adds a membership. A user holds at most one role per organization.
    pub fn add_member(&mut self, member: OrganizationMember) -> ServiceResult<()> {
        self.organization(member.organization_id)?;
        let key = (member.organization_id, member.user_id);
        if self.members.contains_key(&key) {
            return Err(ServiceError::conflict(format!(
                "user {} is already a member of organization {}",
                member.user_id, member.organization_id
            )));
        }
        self.members.insert(key, member);
        Ok(())
    }

    /// Stores an already identified meeting, as found in a snapshot.
    fn insert_meeting(&mut self, meeting: Meeting) -> ServiceResult<()> {
        self.organization(meeting.organization_id)?;
        if self.meetings.contains_key(&meeting.id) {
            return Err(ServiceError::conflict(format!(
                "meeting {} already exists",
                meeting.id
            )));
        }
        meeting.validate()?;
        self.next_meeting_id = self.next_meeting_id.max(meeting.id.saturating_add(1));
        self.meetings.insert(meeting.id, meeting);
        Ok(())
    }

    pub fn organization(&self, id: OrganizationId) -> ServiceResult<&Organization> {
        self.organizations
            .get(&id)
            .ok_or_else(|| ServiceError::organization_not_found(id))
    }

    pub fn meeting(&self, id: MeetingId) -> ServiceResult<&Meeting> {
        self.meetings
            .get(&id)
            .ok_or_else(|| ServiceError::meeting_not_found(id))
    }

    /// Meetings ordered by id, optionally restricted to one organization.
    pub fn meetings(&self, organization_id: Option<OrganizationId>) -> Vec<&Meeting> {
        self.meetings
            .values()
            .filter(|m| organization_id.is_none_or(|id| m.organization_id == id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.meetings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty()
    }

    /// Checks that `actor` leads or sits on the board of the organization.
    pub fn ensure_can_manage(
        &self,
        actor: UserId,
        organization_id: OrganizationId,
    ) -> ServiceResult<()> {
        self.organization(organization_id)?;
        let allowed = self
            .members
            .get(&(organization_id, actor))
            .is_some_and(OrganizationMember::can_manage_meetings);
        if !allowed {
            return Err(ServiceError::forbidden(actor, organization_id));
        }
        Ok(())
    }

    /// Creates a meeting and returns its assigned id.
    pub fn create_meeting(&mut self, actor: UserId, mut meeting: Meeting) -> ServiceResult<MeetingId> {
        self.ensure_can_manage(actor, meeting.organization_id)?;
        meeting.id = self.next_meeting_id;
        meeting.validate()?;

        let now = Utc::now();
        meeting.created_at = Some(now);
        meeting.updated_at = Some(now);

        let id = meeting.id;
        self.meetings.insert(id, meeting);
        self.next_meeting_id = id.saturating_add(1);
        info!(meeting_id = id, actor, "Created meeting");
        Ok(id)
    }

    /// Replaces a meeting's own fields, keeping its rule and creation time.
    pub fn update_meeting(&mut self, actor: UserId, update: Meeting) -> ServiceResult<()> {
        let organization_id = self.meeting(update.id)?.organization_id;
        if update.organization_id != organization_id {
            return Err(ScheduleError::invalid_request(format!(
                "meeting {} cannot move to organization {}",
                update.id, update.organization_id
            ))
            .into());
        }
        self.modify(actor, update.id, |meeting| {
            meeting.title = update.title;
            meeting.description = update.description;
            meeting.location = update.location;
            meeting.room = update.room;
            meeting.start_date = update.start_date;
            meeting.start_time = update.start_time;
            meeting.end_time = update.end_time;
            Ok(())
        })
    }

    /// Deletes a meeting with its rule, exceptions and overrides.
    pub fn delete_meeting(&mut self, actor: UserId, id: MeetingId) -> ServiceResult<Meeting> {
        let organization_id = self.meeting(id)?.organization_id;
        self.ensure_can_manage(actor, organization_id)?;
        let meeting = self
            .meetings
            .remove(&id)
            .ok_or_else(|| ServiceError::meeting_not_found(id))?;
        info!(meeting_id = id, actor, "Deleted meeting");
        Ok(meeting)
    }

    /// Sets or clears the recurrence rule. Clearing it drops the rule's
    /// exceptions and overrides.
    pub fn set_recurrence(
        &mut self,
        actor: UserId,
        id: MeetingId,
        rule: Option<RecurrenceRule>,
    ) -> ServiceResult<()> {
        self.modify(actor, id, |meeting| {
            meeting.recurrence = rule;
            Ok(())
        })
    }

    /// Suppresses one date of a recurring meeting.
    pub fn add_exception(
        &mut self,
        actor: UserId,
        id: MeetingId,
        exception: MeetingException,
    ) -> ServiceResult<()> {
        self.modify(actor, id, |meeting| {
            let rule = recurring(meeting)?;
            if rule.is_exception(exception.date) {
                return Err(ServiceError::conflict(format!(
                    "meeting {id} already has an exception on {}",
                    exception.date
                )));
            }
            rule.exceptions.push(exception);
            rule.exceptions.sort_by_key(|e| e.date);
            Ok(())
        })
    }

    /// Restores a suppressed date.
    pub fn remove_exception(
        &mut self,
        actor: UserId,
        id: MeetingId,
        date: NaiveDate,
    ) -> ServiceResult<()> {
        self.modify(actor, id, |meeting| {
            let rule = recurring(meeting)?;
            let before = rule.exceptions.len();
            rule.exceptions.retain(|e| e.date != date);
            if rule.exceptions.len() == before {
                return Err(ServiceError::not_found("exception", date));
            }
            Ok(())
        })
    }

    /// Adds an override for one original date.
    pub fn add_override(
        &mut self,
        actor: UserId,
        id: MeetingId,
        occurrence: OccurrenceOverride,
    ) -> ServiceResult<()> {
        self.modify(actor, id, |meeting| {
            let rule = recurring(meeting)?;
            if rule.override_for(occurrence.original_date).is_some() {
                return Err(ServiceError::conflict(format!(
                    "meeting {id} already has an override for {}",
                    occurrence.original_date
                )));
            }
            rule.overrides.push(occurrence);
            rule.overrides.sort_by_key(|o| o.original_date);
            Ok(())
        })
    }

    /// Removes the override for an original date.
    pub fn remove_override(
        &mut self,
        actor: UserId,
        id: MeetingId,
        original_date: NaiveDate,
    ) -> ServiceResult<()> {
        self.modify(actor, id, |meeting| {
            let rule = recurring(meeting)?;
            let before = rule.overrides.len();
            rule.overrides.retain(|o| o.original_date != original_date);
            if rule.overrides.len() == before {
                return Err(ServiceError::not_found("override", original_date));
            }
            Ok(())
        })
    }

    /// Applies `change` to a copy of the meeting and commits it if the
    /// result validates.
    fn modify<F>(&mut self, actor: UserId, id: MeetingId, change: F) -> ServiceResult<()>
    where
        F: FnOnce(&mut Meeting) -> ServiceResult<()>,
    {
        let current = self.meeting(id)?;
        self.ensure_can_manage(actor, current.organization_id)?;

        let mut updated = current.clone();
        change(&mut updated)?;
        updated.validate()?;
        updated.updated_at = Some(Utc::now());

        self.meetings.insert(id, updated);
        debug!(meeting_id = id, actor, "Updated meeting");
        Ok(())
    }
}

fn recurring(meeting: &mut Meeting) -> ServiceResult<&mut RecurrenceRule> {
    let id = meeting.id;
    meeting.recurrence.as_mut().ok_or_else(|| {
        ScheduleError::invalid_request(format!("meeting {id} does not recur")).into()
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveTime;

    pub(crate) const LEADER: UserId = 10;
    pub(crate) const BOARD: UserId = 11;
    pub(crate) const MEMBER: UserId = 12;
    pub(crate) const OUTSIDER: UserId = 99;

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    /// Weekly Monday meeting with count 3 and an exception on 2024-01-15.
    pub(crate) fn chess_club() -> Meeting {
        Meeting::new(1, 1, "Chess Club", "Student Union", date(2024, 1, 1), time(18, 0), time(20, 0))
            .with_recurrence(
                RecurrenceRule::weekly()
                    .with_weekdays(["MO"])
                    .with_count(3)
                    .with_exception(MeetingException::new(date(2024, 1, 15))),
            )
    }

    pub(crate) fn snapshot() -> Snapshot {
        Snapshot {
            organizations: vec![
                Organization::new(1, "Chess Society").verified(),
                Organization::new(2, "Hiking Club"),
            ],
            members: vec![
                OrganizationMember::leader(1, LEADER),
                OrganizationMember::new(1, BOARD).with_board_member(true),
                OrganizationMember::new(1, MEMBER),
            ],
            meetings: vec![
                chess_club(),
                Meeting::new(2, 1, "Open Play", "Library", date(2024, 2, 3), time(10, 0), time(12, 0))
                    .with_recurrence(RecurrenceRule::weekly()),
                Meeting::new(5, 2, "Trail Day", "North Gate", date(2024, 4, 6), time(8, 0), time(16, 0)),
            ],
        }
    }

    pub(crate) fn store() -> MeetingStore {
        MeetingStore::from_snapshot(snapshot()).unwrap()
    }

    fn new_meeting(organization_id: OrganizationId) -> Meeting {
        Meeting::new(0, organization_id, "Blitz Night", "Cafe", date(2024, 3, 1), time(19, 0), time(21, 0))
    }

    mod loading {
        use super::*;

        #[test]
        fn from_snapshot() {
            let store = store();
            assert_eq!(store.len(), 3);
            assert_eq!(store.meetings(Some(1)).len(), 2);
            assert_eq!(store.meetings(None).len(), 3);
            assert_eq!(store.organization(2).unwrap().name, "Hiking Club");
        }

        #[test]
        fn snapshot_roundtrip() {
            let store = store();
            let again = MeetingStore::from_snapshot(store.to_snapshot()).unwrap();
            assert_eq!(again.to_snapshot(), store.to_snapshot());
        }

        #[test]
        fn rejects_invalid_meeting() {
            let mut snapshot = snapshot();
            snapshot.meetings[0].recurrence = Some(RecurrenceRule::daily().with_interval(0));
            let err = MeetingStore::from_snapshot(snapshot).unwrap_err();
            assert!(matches!(err, ServiceError::Schedule(ScheduleError::InvalidRule { .. })));
        }

        #[test]
        fn rejects_unknown_organization() {
            let mut snapshot = snapshot();
            snapshot.meetings[0].organization_id = 42;
            let err = MeetingStore::from_snapshot(snapshot).unwrap_err();
            assert!(matches!(err, ServiceError::NotFound { kind: "organization", .. }));
        }

        #[test]
        fn rejects_duplicate_names() {
            let mut snapshot = snapshot();
            snapshot.organizations.push(Organization::new(3, "Hiking Club"));
            assert!(matches!(
                MeetingStore::from_snapshot(snapshot),
                Err(ServiceError::Conflict { .. })
            ));
        }

        #[test]
        fn rejects_duplicate_membership() {
            let mut snapshot = snapshot();
            snapshot.members.push(OrganizationMember::new(1, LEADER));
            assert!(matches!(
                MeetingStore::from_snapshot(snapshot),
                Err(ServiceError::Conflict { .. })
            ));

            let mut store = store();
            assert!(matches!(
                store.add_member(OrganizationMember::new(1, BOARD)),
                Err(ServiceError::Conflict { .. })
            ));
            assert!(store.ensure_can_manage(BOARD, 1).is_ok());
        }

        #[test]
        fn load_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("snapshot.json");
            std::fs::write(&path, serde_json::to_string(&snapshot()).unwrap()).unwrap();
            assert_eq!(Snapshot::load(&path).unwrap(), snapshot());

            std::fs::write(&path, "{ not json").unwrap();
            assert!(matches!(
                Snapshot::load(&path),
                Err(ServiceError::InvalidSnapshot(_))
            ));
            assert!(matches!(
                Snapshot::load(dir.path().join("missing.json")),
                Err(ServiceError::Io(_))
            ));
        }
    }

    mod permissions {
        use super::*;

        #[test]
        fn leaders_and_board_members_manage() {
            let store = store();
            assert!(store.ensure_can_manage(LEADER, 1).is_ok());
            assert!(store.ensure_can_manage(BOARD, 1).is_ok());
        }

        #[test]
        fn others_are_forbidden() {
            let store = store();
            for user in [MEMBER, OUTSIDER] {
                assert!(matches!(
                    store.ensure_can_manage(user, 1),
                    Err(ServiceError::Forbidden { .. })
                ));
            }
            assert!(matches!(
                store.ensure_can_manage(LEADER, 2),
                Err(ServiceError::Forbidden { .. })
            ));
        }

        #[test]
        fn forbidden_mutation_changes_nothing() {
            let mut store = store();
            let before = store.to_snapshot();
            assert!(store.delete_meeting(MEMBER, 1).is_err());
            assert!(store.create_meeting(OUTSIDER, new_meeting(1)).is_err());
            assert_eq!(store.to_snapshot(), before);
        }
    }

    mod meetings {
        use super::*;

        #[test]
        fn create_assigns_next_id() {
            let mut store = store();
            let id = store.create_meeting(BOARD, new_meeting(1)).unwrap();
            assert_eq!(id, 6);
            let meeting = store.meeting(id).unwrap();
            assert_eq!(meeting.title, "Blitz Night");
            assert!(meeting.created_at.is_some());
            assert_eq!(store.create_meeting(BOARD, new_meeting(1)).unwrap(), 7);
        }

        #[test]
        fn create_rejects_invalid_meeting() {
            let mut store = store();
            let mut meeting = new_meeting(1);
            meeting.end_time = time(18, 0);
            let err = store.create_meeting(LEADER, meeting).unwrap_err();
            assert!(matches!(
                err,
                ServiceError::Schedule(ScheduleError::InvalidMeeting { .. })
            ));
            assert_eq!(store.len(), 3);
        }

        #[test]
        fn update_keeps_rule() {
            let mut store = store();
            let mut update = chess_club();
            update.recurrence = None;
            update.location = "Great Hall".to_string();
            store.update_meeting(LEADER, update).unwrap();

            let meeting = store.meeting(1).unwrap();
            assert_eq!(meeting.location, "Great Hall");
            assert!(meeting.is_recurring());
            assert!(meeting.updated_at.is_some());
        }

        #[test]
        fn update_cannot_change_organization() {
            let mut store = store();
            let mut update = chess_club();
            update.organization_id = 2;
            assert!(matches!(
                store.update_meeting(LEADER, update),
                Err(ServiceError::Schedule(ScheduleError::InvalidRequest { .. }))
            ));
        }

        #[test]
        fn delete_cascades() {
            let mut store = store();
            let deleted = store.delete_meeting(LEADER, 1).unwrap();
            assert_eq!(deleted.recurrence.unwrap().exceptions.len(), 1);
            assert!(matches!(store.meeting(1), Err(ServiceError::NotFound { .. })));
            assert!(matches!(
                store.add_exception(LEADER, 1, MeetingException::new(date(2024, 1, 8))),
                Err(ServiceError::NotFound { .. })
            ));
        }
    }

    mod rules {
        use super::*;

        #[test]
        fn invalid_rule_is_not_stored() {
            let mut store = store();
            let err = store
                .set_recurrence(LEADER, 1, Some(RecurrenceRule::weekly().with_weekdays(["XX"])))
                .unwrap_err();
            assert!(matches!(err, ServiceError::Schedule(ScheduleError::InvalidRule { .. })));
            assert_eq!(store.meeting(1).unwrap(), &chess_club());
        }

        #[test]
        fn clearing_rule_drops_children() {
            let mut store = store();
            store.set_recurrence(LEADER, 1, None).unwrap();
            assert!(!store.meeting(1).unwrap().is_recurring());
        }

        #[test]
        fn exceptions() {
            let mut store = store();
            store
                .add_exception(LEADER, 1, MeetingException::new(date(2024, 1, 8)).with_note("Exams"))
                .unwrap();
            let rule = store.meeting(1).unwrap().recurrence.clone().unwrap();
            assert_eq!(
                rule.exceptions.iter().map(|e| e.date).collect::<Vec<_>>(),
                vec![date(2024, 1, 8), date(2024, 1, 15)]
            );

            assert!(matches!(
                store.add_exception(LEADER, 1, MeetingException::new(date(2024, 1, 8))),
                Err(ServiceError::Conflict { .. })
            ));

            store.remove_exception(LEADER, 1, date(2024, 1, 15)).unwrap();
            assert!(matches!(
                store.remove_exception(LEADER, 1, date(2024, 1, 15)),
                Err(ServiceError::NotFound { kind: "exception", .. })
            ));
        }

        #[test]
        fn exception_requires_recurrence() {
            let mut store = store();
            store.add_member(OrganizationMember::leader(2, LEADER)).unwrap();
            assert!(matches!(
                store.add_exception(LEADER, 5, MeetingException::new(date(2024, 4, 6))),
                Err(ServiceError::Schedule(ScheduleError::InvalidRequest { .. }))
            ));
        }

        #[test]
        fn overrides() {
            let mut store = store();
            let change = OccurrenceOverride::new(date(2024, 1, 8)).with_location("Gym");
            store.add_override(BOARD, 1, change.clone()).unwrap();
            assert!(matches!(
                store.add_override(BOARD, 1, change),
                Err(ServiceError::Conflict { .. })
            ));

            let inverted = OccurrenceOverride::new(date(2024, 1, 22)).with_times(
                date(2024, 1, 22).and_time(time(20, 0)),
                date(2024, 1, 22).and_time(time(19, 0)),
            );
            assert!(matches!(
                store.add_override(BOARD, 1, inverted),
                Err(ServiceError::Schedule(ScheduleError::InvalidMeeting { .. }))
            ));

            store.remove_override(BOARD, 1, date(2024, 1, 8)).unwrap();
            assert!(matches!(
                store.remove_override(BOARD, 1, date(2024, 1, 8)),
                Err(ServiceError::NotFound { kind: "override", .. })
            ));
        }
    }
}
