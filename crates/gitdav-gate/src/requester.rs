use std::fmt;

/// The identity a request acts as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requester {
    name: Option<String>,
    is_admin: bool,
}

impl Requester {
    pub fn anonymous() -> Self {
        Self { name: None, is_admin: false }
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), is_admin: false }
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), is_admin: true }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or("anonymous"))
    }
}
