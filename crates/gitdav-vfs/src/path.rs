//! Request path decomposition.
//!
//! A request path has the fixed shape
//! `<mount-prefix>/<owner>/<repository>/<browse-marker>/<internal-path>`.
//! [`PathGrammar::resolve`] walks those positions left to right and names the
//! first one that does not fit. It is a pure function of its input.

use std::fmt;

use gitdav_types::RepositoryLocator;

use crate::error::{PathDefect, VfsError, VfsResult};

/// Slash-separated location inside a snapshot. Empty means the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct InternalPath(Vec<String>);

impl InternalPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Final segment, or `None` at the root.
    pub fn file_name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// The path joined with `/`, without leading or trailing slash.
    pub fn as_storage_path(&self) -> String {
        self.0.join("/")
    }

    pub fn join(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }
}

impl fmt::Display for InternalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

/// A fully decomposed request path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestPath {
    pub locator: RepositoryLocator,
    pub internal: InternalPath,
}

/// The fixed segments that frame every request path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathGrammar {
    mount_prefix: Vec<String>,
    browse_marker: String,
}

impl PathGrammar {
    pub fn new(mount_prefix: &str, browse_marker: &str) -> VfsResult<Self> {
        if browse_marker.is_empty() || browse_marker.contains('/') {
            return Err(VfsError::Config(format!(
                "browse marker {browse_marker:?} must be a single non-empty segment"
            )));
        }
        if matches!(browse_marker, "." | "..") {
            return Err(VfsError::Config("browse marker cannot be . or ..".into()));
        }
        let mount_prefix: Vec<String> = mount_prefix
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if mount_prefix.iter().any(|s| s == "." || s == "..") {
            return Err(VfsError::Config(
                "mount prefix cannot contain . or .. segments".into(),
            ));
        }
        Ok(Self {
            mount_prefix,
            browse_marker: browse_marker.to_string(),
        })
    }

    pub fn browse_marker(&self) -> &str {
        &self.browse_marker
    }

    /// Decompose `raw` into owner, repository, and internal path.
    ///
    /// Repeated slashes, `.` segments and a trailing slash are ignored. Any
    /// `..` segment is rejected so no path can climb out of the snapshot.
    pub fn resolve(&self, raw: &str) -> VfsResult<RequestPath> {
        let fail = |defect| VfsError::malformed(raw, defect);

        if !raw.starts_with('/') {
            return Err(fail(PathDefect::NotAbsolute));
        }
        let mut segments = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(fail(PathDefect::ParentTraversal)),
                s if s.contains('\0') => return Err(fail(PathDefect::InvalidSegment)),
                s => segments.push(s),
            }
        }

        let mut segments = segments.into_iter();
        for expected in &self.mount_prefix {
            if segments.next() != Some(expected.as_str()) {
                return Err(fail(PathDefect::MountPrefixMismatch));
            }
        }
        let owner = segments.next().ok_or_else(|| fail(PathDefect::MissingOwner))?;
        let name = segments
            .next()
            .ok_or_else(|| fail(PathDefect::MissingRepository))?;
        if segments.next() != Some(self.browse_marker.as_str()) {
            return Err(fail(PathDefect::MissingBrowseMarker));
        }

        Ok(RequestPath {
            locator: RepositoryLocator::new(owner, name),
            internal: InternalPath(segments.map(str::to_string).collect()),
        })
    }

    /// Render the request path that `resolve` maps back to `locator` and `internal`.
    pub fn request_path(&self, locator: &RepositoryLocator, internal: &InternalPath) -> String {
        let mut out = String::new();
        for segment in self
            .mount_prefix
            .iter()
            .chain([&locator.owner, &locator.name, &self.browse_marker])
            .chain(internal.segments())
        {
            out.push('/');
            out.push_str(segment);
        }
        out
    }
}
