use std::collections::HashMap;

use cid::Cid;
use url::Url;

use super::legacy::LegacyLink;
use super::LinkError;
use crate::token::EncodedToken;

pub const DEFAULT_FILENAME: &str = "file";
pub const DEFAULT_MIME: &str = "application/octet-stream";

pub(crate) const CID_PARAM: &str = "cid";
pub(crate) const TOKEN_PARAM: &str = "d";
pub(crate) const FILENAME_PARAM: &str = "filename";
pub(crate) const TYPE_PARAM: &str = "type";

/// Locator, token and display metadata of one share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub locator: Cid,
    pub token: EncodedToken,
    pub filename: String,
    pub mime: String,
}

impl ShareLink {
    pub fn new(locator: Cid, token: EncodedToken) -> Self {
        Self {
            locator,
            token,
            filename: DEFAULT_FILENAME.to_string(),
            mime: DEFAULT_MIME.to_string(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    /// Append the share to `base` as query parameters.
    ///
    /// Existing query parameters on `base` are dropped. Nothing is validated
    /// here; the token is checked when the link is viewed.
    pub fn compose(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair(CID_PARAM, &self.locator.to_string())
            .append_pair(TOKEN_PARAM, self.token.as_str())
            .append_pair(FILENAME_PARAM, &self.filename)
            .append_pair(TYPE_PARAM, &self.mime);
        url
    }
}

/// A non-empty query value
pub(crate) fn param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

/// A link as found in the wild
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLink {
    Delegated(ShareLink),
    Legacy(LegacyLink),
}

impl ParsedLink {
    /// Read a share out of `url`.
    ///
    /// A `d` parameter wins over legacy `key`/`iv` when both are present.
    pub fn parse(url: &Url) -> Result<Self, LinkError> {
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let get = |name: &str| param(&params, name);

        let locator = get(CID_PARAM).ok_or_else(|| LinkError::missing(CID_PARAM))?;
        let locator = Cid::try_from(locator.trim()).map_err(|_| LinkError::missing(CID_PARAM))?;
        let filename = get(FILENAME_PARAM).unwrap_or(DEFAULT_FILENAME).to_string();
        let mime = get(TYPE_PARAM).unwrap_or(DEFAULT_MIME).to_string();

        if let Some(token) = get(TOKEN_PARAM) {
            let token = token
                .parse::<EncodedToken>()
                .map_err(|_| LinkError::missing(TOKEN_PARAM))?;
            return Ok(ParsedLink::Delegated(ShareLink {
                locator,
                token,
                filename,
                mime,
            }));
        }

        let legacy = LegacyLink::from_params(locator, &params)?;
        Ok(ParsedLink::Legacy(LegacyLink {
            filename,
            mime,
            ..legacy
        }))
    }

    pub fn locator(&self) -> &Cid {
        match self {
            ParsedLink::Delegated(link) => &link.locator,
            ParsedLink::Legacy(link) => &link.locator,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            ParsedLink::Delegated(link) => &link.filename,
            ParsedLink::Legacy(link) => &link.filename,
        }
    }

    pub fn mime(&self) -> &str {
        match self {
            ParsedLink::Delegated(link) => &link.mime,
            ParsedLink::Legacy(link) => &link.mime,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, ParsedLink::Legacy(_))
    }
}

impl std::str::FromStr for ParsedLink {
    type Err = LinkError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s.trim()).map_err(|_| LinkError::missing("url"))?;
        Self::parse(&url)
    }
}
