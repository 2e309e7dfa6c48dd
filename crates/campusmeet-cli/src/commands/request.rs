//! Request command.
//!
//! Reads request envelopes, one per line, answers each with the handler and
//! writes the response envelopes to stdout in the same order.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use campusmeet_protocol::{
    Envelope, ErrorCode, LineReader, LineWriter, ProtocolError, Response,
};
use campusmeet_service::RequestHandler;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Answers the requests read from `input` (stdin if `None`).
pub async fn run(
    config: &ClientConfig,
    snapshot: Option<PathBuf>,
    input: Option<PathBuf>,
    save: bool,
) -> ClientResult<()> {
    let path = super::snapshot_path(snapshot, config)?;
    let handler = super::load_handler(&path, config.service_config()?)?;

    let stdout = std::io::stdout().lock();
    let processed = match input {
        Some(input) => serve(&handler, BufReader::new(File::open(input)?), stdout).await?,
        None => serve(&handler, std::io::stdin().lock(), stdout).await?,
    };
    debug!(processed, "Requests processed");

    if save {
        save_snapshot(&handler, &path).await?;
    }
    Ok(())
}

/// Answers every message from `reader`, returning how many were handled.
///
/// Malformed messages and responses too large to send get an error
/// response; only I/O failures and oversized input lines stop the loop.
pub async fn serve<R: BufRead, W: Write>(
    handler: &RequestHandler,
    reader: R,
    writer: W,
) -> ClientResult<usize> {
    let mut reader = LineReader::new(reader);
    let mut writer = LineWriter::new(writer);
    let mut processed = 0;
    while let Some(line) = reader.read_line()? {
        let response = handler.handle_message(&line).await;
        match writer.write_message(&response) {
            Err(ProtocolError::MessageTooLarge { size, max }) => {
                warn!(request_id = %response.request_id, size, "Response too large");
                let error = Response::error(
                    ErrorCode::InvalidRequest,
                    format!("response of {size} bytes exceeds the limit of {max} bytes; request a shorter window"),
                );
                writer.write_message(&Envelope::response(response.request_id, error))?;
            }
            result => result?,
        }
        writer.flush()?;
        processed += 1;
    }
    Ok(processed)
}

/// Writes the handler's store back to `path` as pretty JSON.
pub async fn save_snapshot(handler: &RequestHandler, path: &Path) -> ClientResult<()> {
    let snapshot = handler.store().read().await.to_snapshot();
    let mut json = serde_json::to_string_pretty(&snapshot)?;
    json.push('\n');
    std::fs::write(path, json)?;
    info!(path = %path.display(), meetings = snapshot.meetings.len(), "Snapshot saved");
    Ok(())
}
