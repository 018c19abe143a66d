use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Route '{0}' produced no segments")]
    EmptyRoute(String),
    #[error("Invalid coordinate: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },
    #[error("Invalid input data: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
