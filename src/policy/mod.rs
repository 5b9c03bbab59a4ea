//! Client-side authorization gating.
//!
//! These checks decide which controls to show and nothing more. The server
//! enforces the real policy on every request; a viewer who slips past these
//! checks gets a 401/403 and a torn-down session.

use crate::identity::Viewer;

pub const ADMIN_ROLE: &str = "admin";

/// Whether `viewer` may edit or delete a resource owned by `owner_id`.
///
/// True for admins, or when both the viewer id and the owner id are present
/// and equal. An unowned resource never matches by id: two absent ids are
/// not a match. Edit and delete share this one policy; there is no
/// finer-grained split.
pub fn can_modify(viewer: &Viewer, owner_id: Option<&str>) -> bool {
    if viewer.role.as_deref() == Some(ADMIN_ROLE) {
        return true;
    }
    match (viewer.id.as_deref(), owner_id) {
        (Some(viewer_id), Some(owner)) => viewer_id == owner,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer(id: Option<&str>, role: Option<&str>) -> Viewer {
        Viewer {
            id: id.map(String::from),
            role: role.map(String::from),
        }
    }

    #[test]
    fn test_admin_can_modify_anything() {
        let admin = viewer(Some("u9"), Some("admin"));
        assert!(can_modify(&admin, Some("u1")));
        assert!(can_modify(&admin, None));
    }

    #[test]
    fn test_owner_can_modify_own_resource() {
        let owner = viewer(Some("u1"), Some("user"));
        assert!(can_modify(&owner, Some("u1")));
    }

    #[test]
    fn test_non_owner_cannot_modify() {
        let other = viewer(Some("u2"), Some("user"));
        assert!(!can_modify(&other, Some("u1")));
    }

    #[test]
    fn test_anonymous_cannot_modify() {
        let anon = Viewer::anonymous();
        assert!(!can_modify(&anon, Some("u1")));
    }

    #[test]
    fn test_unowned_resource_never_matches_by_id() {
        // Both ids absent must not authorize
        assert!(!can_modify(&Viewer::anonymous(), None));
        let signed_in = viewer(Some("u1"), Some("user"));
        assert!(!can_modify(&signed_in, None));
    }

    #[test]
    fn test_role_other_than_admin_grants_nothing() {
        let moderator = viewer(Some("u2"), Some("moderator"));
        assert!(!can_modify(&moderator, Some("u1")));
    }
}
