use crate::config::ConfigError;
use crate::ranking::RankingError;
use crate::sources::CombineError;
use crate::telemetry::TelemetryError;
use crate::trends::{ImportError, PaletteError, WindowError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Import(ImportError),
    Window(WindowError),
    Palette(PaletteError),
    Ranking(RankingError),
    Sources(CombineError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Import(_) | AppError::Window(_) | AppError::Palette(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Ranking(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Sources(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Window(err) => write!(f, "invalid reporting window: {}", err),
            AppError::Palette(err) => write!(f, "invalid palette: {}", err),
            AppError::Ranking(err) => write!(f, "ranking error: {}", err),
            AppError::Sources(err) => write!(f, "market data error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Window(err) => Some(err),
            AppError::Palette(err) => Some(err),
            AppError::Ranking(err) => Some(err),
            AppError::Sources(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ImportError> for AppError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<WindowError> for AppError {
    fn from(value: WindowError) -> Self {
        Self::Window(value)
    }
}

impl From<PaletteError> for AppError {
    fn from(value: PaletteError) -> Self {
        Self::Palette(value)
    }
}

impl From<RankingError> for AppError {
    fn from(value: RankingError) -> Self {
        Self::Ranking(value)
    }
}

impl From<CombineError> for AppError {
    fn from(value: CombineError) -> Self {
        Self::Sources(value)
    }
}
