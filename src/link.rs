use serde::{Deserialize, Serialize};

use crate::safe_filename::safe_filename;

/// Size of the buffer the session renders links into, terminator included.
pub const MAX_LINK_LEN: usize = 100;

pub const URI_SCHEME: &str = "spotify";

pub const DEFAULT_LINK_BASE_URL: &str = "http://open.spotify.com";

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("Link is {len} bytes, does not fit in a {max} byte buffer")]
    BufferTooSmall { len: usize, max: usize },

    #[error("Link `{uri}` is not a spotify: URI")]
    UnexpectedScheme { uri: String },
}

/// Opaque reference to a playlist or track, as handed out by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Link {
    uri: String,
}

impl Link {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    /// Render the link in its URI form, e.g.
    /// `spotify:user:alsuren:playlist:1ruXh4qLoLj8GDWpSbYFsf`.
    pub fn as_uri(&self) -> Result<&str, LinkError> {
        if self.uri.len() >= MAX_LINK_LEN {
            return Err(LinkError::BufferTooSmall {
                len: self.uri.len(),
                max: MAX_LINK_LEN,
            });
        }
        Ok(&self.uri)
    }

    /// Render the link as a resolvable URL below `base_url`, e.g.
    /// `http://open.spotify.com/user/alsuren/playlist/1ruXh4qLoLj8GDWpSbYFsf`.
    pub fn to_http_url(&self, base_url: &str) -> Result<String, LinkError> {
        let uri = self.as_uri()?;
        let path = uri
            .strip_prefix(URI_SCHEME)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| LinkError::UnexpectedScheme {
                uri: uri.to_string(),
            })?;

        Ok(format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.replace(':', "/")
        ))
    }

    /// URI form with path-hostile characters replaced, for use in file names.
    pub fn to_safe_string(&self) -> Result<String, LinkError> {
        self.as_uri().map(safe_filename)
    }
}
