//! Signed-in viewer tracking.

use crate::domain::UserSummary;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

/// Supplies the current viewer, if any.
pub trait Identity {
    fn viewer(&self) -> Option<UserSummary>;

    fn is_signed_in(&self) -> bool {
        self.viewer().is_some()
    }
}

/// The local session. Shared by handle (`Rc<Session>`) between the views that
/// need it; sign-in and sign-out are visible to every holder immediately.
#[derive(Debug, Default)]
pub struct Session {
    viewer: RefCell<Option<UserSummary>>,
}

impl Session {
    pub fn signed_in(user: UserSummary) -> Self {
        Self {
            viewer: RefCell::new(Some(user)),
        }
    }

    pub fn sign_in(&self, user: UserSummary) {
        info!(user_id = %user.id, "viewer signed in");
        self.viewer.replace(Some(user));
    }

    pub fn sign_out(&self) {
        if let Some(user) = self.viewer.take() {
            info!(user_id = %user.id, "viewer signed out");
        }
    }
}

impl Identity for Session {
    fn viewer(&self) -> Option<UserSummary> {
        self.viewer.borrow().clone()
    }
}

impl<T: Identity + ?Sized> Identity for Rc<T> {
    fn viewer(&self) -> Option<UserSummary> {
        (**self).viewer()
    }
}

impl<T: Identity + ?Sized> Identity for &T {
    fn viewer(&self) -> Option<UserSummary> {
        (**self).viewer()
    }
}
