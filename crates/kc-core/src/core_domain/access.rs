use crate::core::{AccessError, Passphrase};

// ---------------------------------------------------------------------------
// AccessLevel
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessLevel {
    Viewer,
    Admin,
}

// ---------------------------------------------------------------------------
// AccessGate — UI-level passphrase check, not a security boundary
// ---------------------------------------------------------------------------

/// Client-side gate in front of the console views.
///
/// The backend enforces nothing here; this only keeps casual users out of
/// destructive actions. With no passphrases configured the gate is open.
pub struct AccessGate {
    admin: Option<Passphrase>,
    viewer: Option<Passphrase>,
}

impl AccessGate {
    pub fn new(admin: Option<Passphrase>, viewer: Option<Passphrase>) -> Self {
        Self { admin, viewer }
    }

    pub fn open() -> Self {
        Self::new(None, None)
    }

    pub fn is_open(&self) -> bool {
        self.admin.is_none() && self.viewer.is_none()
    }

    /// Resolves the level granted by `supplied`.
    ///
    /// Both stored passphrases are compared every time so the check takes the
    /// same path whichever one matches.
    pub fn check(&self, supplied: Option<&Passphrase>) -> Result<AccessLevel, AccessError> {
        if self.is_open() {
            return Ok(AccessLevel::Admin);
        }
        let Some(supplied) = supplied else {
            return Err(AccessError::Denied);
        };

        let admin_match = self.admin.as_ref().is_some_and(|p| p == supplied);
        let viewer_match = self.viewer.as_ref().is_some_and(|p| p == supplied);

        if admin_match {
            Ok(AccessLevel::Admin)
        } else if viewer_match {
            Ok(AccessLevel::Viewer)
        } else {
            Err(AccessError::Denied)
        }
    }

    /// Destructive actions need the admin level. When no admin passphrase is
    /// configured, any level that passed [`check`](Self::check) suffices.
    pub fn require_admin(&self, supplied: Option<&Passphrase>) -> Result<(), AccessError> {
        let level = self.check(supplied)?;
        if self.admin.is_some() && level != AccessLevel::Admin {
            return Err(AccessError::AdminRequired);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
