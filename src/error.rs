use crate::data::UnmatchedRequest;
use hyper::http;
use std::{fmt::Display, io, sync};

#[derive(Debug)]
pub enum Error {
    Bind(hyper::Error),
    NoMatch(Vec<UnmatchedRequest>),
    IncompleteContract(Vec<String>),
    Callback(Box<dyn std::error::Error + Send + Sync>),
    DrainTimeout,
    IncompleteDeclaration(String),
    InvalidBody,
    InvalidHeaderName,
    InvalidHeaderValue,
    PoisonedLock,
    HttpError(http::Error),
    IoError(io::Error),
    JsonError(serde_json::Error),
    SinkError(Box<dyn std::error::Error + Send + Sync>),
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Bind(e) => write!(f, "Could not bind the mock server socket: {}", e),
            Error::NoMatch(unmatched) => {
                write!(
                    f,
                    "{} request(s) did not match any registered interaction",
                    unmatched.len()
                )?;

                for entry in unmatched {
                    write!(f, "\n  {} {}", entry.request.method, entry.request.path)?;
                    if let Some(closest) = &entry.closest {
                        write!(f, " - closest: {:?}", closest.description)?;
                        if let Some(mismatch) = closest.mismatches.first() {
                            write!(
                                f,
                                " ({}: expected {}, found {})",
                                mismatch.field, mismatch.expected, mismatch.found
                            )?;
                        }
                    }
                }

                Ok(())
            }
            Error::IncompleteContract(descriptions) => write!(
                f,
                "Interactions never invoked: {}",
                descriptions.join(", ")
            ),
            Error::Callback(e) => write!(f, "Consumer callback error: {}", e),
            Error::DrainTimeout => {
                write!(f, "In-flight requests outlived the drain deadline")
            }
            Error::IncompleteDeclaration(what) => {
                write!(f, "Incomplete interaction declaration: {}", what)
            }
            Error::InvalidBody => write!(f, "Invalid body"),
            Error::InvalidHeaderName => write!(f, "Invalid header name"),
            Error::InvalidHeaderValue => write!(f, "Invalid header value"),
            Error::PoisonedLock => write!(f, "The lock was poisoned"),
            Error::HttpError(e) => write!(f, "Http Error: {}", e),
            Error::IoError(e) => write!(f, "IoError: {}", e),
            Error::JsonError(e) => write!(f, "Json error: {}", e),
            Error::SinkError(e) => write!(f, "Contract sink error: {}", e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::IoError(e)
    }
}

impl<T> From<sync::PoisonError<T>> for Error {
    fn from(_: sync::PoisonError<T>) -> Self {
        Error::PoisonedLock
    }
}

impl From<hyper::header::InvalidHeaderName> for Error {
    fn from(_: hyper::header::InvalidHeaderName) -> Self {
        Error::InvalidHeaderName
    }
}

impl From<hyper::header::InvalidHeaderValue> for Error {
    fn from(_: hyper::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeaderValue
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::HttpError(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::JsonError(e)
    }
}
