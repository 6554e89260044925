//! One-shot room download over HTTP.

use log::info;
use reqwest::Url;
use shared::{GridError, Room};
use std::fmt;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum RoomError {
    /// The server address cannot carry a room path.
    Url(String),
    Request(reqwest::Error),
    Grid(GridError),
    /// The download task ended without reporting back.
    Aborted,
}

impl fmt::Display for RoomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomError::Url(e) => write!(f, "bad room url: {}", e),
            RoomError::Request(e) => write!(f, "room request failed: {}", e),
            RoomError::Grid(e) => write!(f, "invalid room: {}", e),
            RoomError::Aborted => write!(f, "room download was aborted"),
        }
    }
}

impl std::error::Error for RoomError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RoomError::Url(_) | RoomError::Aborted => None,
            RoomError::Request(e) => Some(e),
            RoomError::Grid(e) => Some(e),
        }
    }
}

impl From<reqwest::Error> for RoomError {
    fn from(e: reqwest::Error) -> Self {
        RoomError::Request(e)
    }
}

impl From<GridError> for RoomError {
    fn from(e: GridError) -> Self {
        RoomError::Grid(e)
    }
}

pub fn room_url(base: &Url, room_id: &str) -> Result<Url, RoomError> {
    let mut url = base
        .join("api/room/")
        .map_err(|e| RoomError::Url(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| RoomError::Url(format!("{} cannot be a base", base)))?
        .pop_if_empty()
        .push(room_id);
    Ok(url)
}

/// Fetches `room_id` and validates it into a [`Room`].
///
/// Non-2xx answers, bodies that are not a JSON array of strings and grids
/// the loader rejects all come back as errors.
pub async fn fetch_room(base: &Url, room_id: &str) -> Result<Room, RoomError> {
    let url = room_url(base, room_id)?;
    info!("Fetching room from {}", url);

    let rows: Vec<String> = reqwest::get(url)
        .await?
        .error_for_status()?
        .json()
        .await?;
    let room = Room::from_rows(&rows)?;

    info!("Loaded room {} ({}x{})", room_id, room.rows(), room.cols());
    Ok(room)
}

/// A room download running on a tokio runtime, polled once per frame.
pub struct RoomLoader {
    result: Option<oneshot::Receiver<Result<Room, RoomError>>>,
}

impl RoomLoader {
    pub fn spawn(runtime: &Handle, base: Url, room_id: String) -> Self {
        let (tx, rx) = oneshot::channel();
        runtime.spawn(async move {
            let _ = tx.send(fetch_room(&base, &room_id).await);
        });

        RoomLoader { result: Some(rx) }
    }

    /// `None` while the download is still running. The outcome is handed
    /// out once; later polls return `None`.
    pub fn poll(&mut self) -> Option<Result<Room, RoomError>> {
        let outcome = match self.result.as_mut()?.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Err(RoomError::Aborted),
        };

        self.result = None;
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_room_url() {
        let base = Url::parse("http://127.0.0.1:8080").unwrap();
        assert_eq!(
            room_url(&base, "room1").unwrap().as_str(),
            "http://127.0.0.1:8080/api/room/room1"
        );
    }

    #[test]
    fn test_room_url_escapes_id() {
        let base = Url::parse("http://localhost:8080/").unwrap();
        assert_eq!(
            room_url(&base, "a b/c").unwrap().as_str(),
            "http://localhost:8080/api/room/a%20b%2Fc"
        );
    }

    #[test]
    fn test_grid_error_converts() {
        let err: RoomError = GridError::Empty.into();
        assert!(matches!(err, RoomError::Grid(GridError::Empty)));
        assert!(err.to_string().starts_with("invalid room"));
    }

    #[tokio::test]
    async fn test_loader_reports_unreachable_server() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let base = Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap();
        let mut loader = RoomLoader::spawn(&Handle::current(), base, "room1".to_string());

        let outcome = loop {
            if let Some(outcome) = loader.poll() {
                break outcome;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        };

        assert!(matches!(outcome, Err(RoomError::Request(_))));
        assert!(loader.poll().is_none());
    }
}
