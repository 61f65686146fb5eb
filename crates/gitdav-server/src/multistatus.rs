//! `207 Multi-Status` bodies for PROPFIND.

use gitdav_types::RepositoryLocator;
use gitdav_vfs::{InternalPath, Metadata, PathGrammar};

/// Format a timestamp as an HTTP date (RFC 7231 IMF-fixdate).
pub fn http_date(time: &chrono::DateTime<chrono::Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub fn etag(metadata: &Metadata) -> String {
    format!("\"{}\"", metadata.object_id.to_hex())
}

/// Percent-encoded href for an entry. Collections end with `/`.
pub fn href(
    grammar: &PathGrammar,
    locator: &RepositoryLocator,
    internal: &InternalPath,
    is_directory: bool,
) -> String {
    let raw = grammar.request_path(locator, internal);
    let mut out: String = raw
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if is_directory {
        out.push('/');
    }
    out
}

pub struct MultiStatus {
    body: String,
}

impl MultiStatus {
    pub fn new() -> Self {
        Self {
            body: String::from(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<D:multistatus xmlns:D=\"DAV:\">\n",
            ),
        }
    }

    pub fn push(&mut self, href: &str, metadata: &Metadata) {
        let b = &mut self.body;
        b.push_str("<D:response><D:href>");
        b.push_str(&escape(href));
        b.push_str("</D:href><D:propstat><D:prop>");
        b.push_str(&format!(
            "<D:displayname>{}</D:displayname>",
            escape(&metadata.name)
        ));
        if metadata.is_directory {
            b.push_str("<D:resourcetype><D:collection/></D:resourcetype>");
        } else {
            b.push_str("<D:resourcetype/>");
            b.push_str(&format!(
                "<D:getcontentlength>{}</D:getcontentlength>",
                metadata.size
            ));
        }
        b.push_str(&format!(
            "<D:getlastmodified>{}</D:getlastmodified><D:getetag>{}</D:getetag>",
            http_date(&metadata.mod_time),
            escape(&etag(metadata))
        ));
        b.push_str("</D:prop><D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response>\n");
    }

    pub fn finish(mut self) -> String {
        self.body.push_str("</D:multistatus>\n");
        self.body
    }
}

impl Default for MultiStatus {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
