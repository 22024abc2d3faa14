// src/utils/access.rs

use crate::{models::user::Role, utils::jwt::Claims};

/// What a role is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// User management and all content CRUD.
    Administer,
    /// Starting attempts and recording responses.
    TakeExams,
}

impl Role {
    pub fn grants(&self, capability: Capability) -> bool {
        match (self, capability) {
            (Role::Admin, _) => true,
            (Role::Creator | Role::Student, Capability::TakeExams) => true,
            (Role::Creator | Role::Student, Capability::Administer) => false,
        }
    }
}

/// Gate for every admin-only operation. An unauthenticated caller is never
/// an admin.
pub fn is_admin(caller: Option<&Claims>) -> bool {
    caller.is_some_and(|claims| claims.role.grants(Capability::Administer))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role) -> Claims {
        Claims {
            sub: "1".to_string(),
            role,
            exp: usize::MAX,
        }
    }

    #[test]
    fn unauthenticated_caller_is_not_admin() {
        assert!(!is_admin(None));
    }

    #[test]
    fn only_admin_role_passes() {
        assert!(is_admin(Some(&claims(Role::Admin))));
        assert!(!is_admin(Some(&claims(Role::Creator))));
        assert!(!is_admin(Some(&claims(Role::Student))));
    }

    #[test]
    fn every_role_may_take_exams() {
        for role in [Role::Admin, Role::Creator, Role::Student] {
            assert!(role.grants(Capability::TakeExams));
        }
    }
}
