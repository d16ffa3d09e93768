use url::Url;

use crate::{
    error::{CdioError, Result},
    types::Watch,
};

/// Label names matching the values returned by [`derive_labels`].
pub const WATCH_LABELS: [&str; 2] = ["title", "source"];

/// Derives the `title` and `source` label values for a watch.
///
/// The title is checked first, then the URL, which must be absolute and carry
/// a host. `source` is the host as normalised by URL parsing (lowercased,
/// IDNA-encoded), followed by the port whenever the URL spells one out, even
/// the scheme's default.
pub fn derive_labels(watch: &Watch) -> Result<Vec<String>> {
    if watch.title.is_empty() {
        return Err(CdioError::EmptyTitle);
    }

    Ok(vec![watch.title.clone(), source_host(&watch.url)?])
}

fn source_host(raw: &str) -> Result<String> {
    let url = Url::parse(raw).map_err(|err| match err {
        url::ParseError::EmptyHost => CdioError::MissingHost(raw.to_string()),
        other => CdioError::InvalidUrl {
            url: raw.to_string(),
            reason: other.to_string(),
        },
    })?;

    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| CdioError::MissingHost(raw.to_string()))?;

    // `Url` drops a written default port, so look at the raw authority.
    let port = url
        .port()
        .or_else(|| has_written_port(raw).then(|| url.port_or_known_default()).flatten());

    Ok(match port {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn has_written_port(raw: &str) -> bool {
    let Some((_, rest)) = raw.split_once("://") else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    // Skip past an IPv6 literal so its colons are not read as a port.
    let after_host = host_port.rsplit(']').next().unwrap_or_default();

    after_host.rsplit_once(':').is_some_and(|(_, port)| {
        !port.is_empty() && port.bytes().all(|byte| byte.is_ascii_digit())
    })
}
