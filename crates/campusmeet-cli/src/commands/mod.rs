//! Subcommand implementations.

pub mod check;
pub mod config;
pub mod expand;
pub mod request;

use std::path::{Path, PathBuf};

use campusmeet_service::{
    MeetingStore, RequestHandler, ServiceConfig, Snapshot, new_shared_store,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Picks the snapshot given on the command line, falling back to the config.
pub fn snapshot_path(arg: Option<PathBuf>, config: &ClientConfig) -> ClientResult<PathBuf> {
    arg.or_else(|| config.snapshot.path.clone())
        .ok_or(ClientError::MissingSnapshot)
}

/// Loads a snapshot into a fresh store and wraps it in a handler.
pub fn load_handler(path: &Path, config: ServiceConfig) -> ClientResult<RequestHandler> {
    let snapshot = Snapshot::load(path)?;
    let store = MeetingStore::from_snapshot(snapshot)?;
    Ok(RequestHandler::with_config(new_shared_store(store), config))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::NamedTempFile;

    /// Chess Society with a leader (user 10) and three meetings:
    /// 1 is weekly on Mondays from 2024-01-01, count 3, exception 2024-01-15;
    /// 2 is weekly from Saturday 2024-02-03, unbounded;
    /// 3 is a single meeting on 2024-04-20.
    pub const SNAPSHOT: &str = r#"{
        "organizations": [{"id": 1, "name": "Chess Society", "is_verified": true}],
        "members": [{"organization_id": 1, "user_id": 10, "is_leader": true}],
        "meetings": [
            {
                "id": 1, "organization_id": 1, "title": "Weekly Blitz",
                "location": "Student Union", "start_date": "2024-01-01",
                "start_time": "18:00:00", "end_time": "20:00:00",
                "recurrence": {
                    "frequency": "WEEKLY", "byweekday": ["MO"], "count": 3,
                    "exceptions": [{"date": "2024-01-15", "note": "Exam week"}]
                }
            },
            {
                "id": 2, "organization_id": 1, "title": "Open Play",
                "location": "Library", "start_date": "2024-02-03",
                "start_time": "14:00:00", "end_time": "17:00:00",
                "recurrence": {"frequency": "WEEKLY"}
            },
            {
                "id": 3, "organization_id": 1, "title": "Annual Tournament",
                "location": "Main Hall", "room": "Great Hall",
                "start_date": "2024-04-20",
                "start_time": "09:00:00", "end_time": "18:00:00"
            }
        ]
    }"#;

    pub fn write_snapshot(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn snapshot_path_prefers_argument() {
        let mut config = ClientConfig::default();
        config.snapshot.path = Some(PathBuf::from("from-config.json"));

        let path = snapshot_path(Some(PathBuf::from("from-arg.json")), &config).unwrap();
        assert_eq!(path, PathBuf::from("from-arg.json"));

        let path = snapshot_path(None, &config).unwrap();
        assert_eq!(path, PathBuf::from("from-config.json"));

        let result = snapshot_path(None, &ClientConfig::default());
        assert!(matches!(result, Err(ClientError::MissingSnapshot)));
    }

    #[tokio::test]
    async fn load_handler_from_file() {
        let file = write_snapshot(SNAPSHOT);
        let handler = load_handler(file.path(), ServiceConfig::default()).unwrap();
        assert_eq!(handler.store().read().await.len(), 3);
    }

    #[test]
    fn load_handler_rejects_invalid_json() {
        let file = write_snapshot("{ not json");
        let result = load_handler(file.path(), ServiceConfig::default());
        assert!(matches!(result, Err(ClientError::Service(_))));
    }
}
