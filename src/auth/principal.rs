use crate::database::models::{Household, Member, User};
use crate::services::ServiceError;
use crate::types::PrincipalKind;

/// The authenticated caller: a parent account or a member account
#[derive(Debug, Clone)]
pub enum Principal {
    Parent(User),
    Member(Member),
}

impl Principal {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::Parent(_) => PrincipalKind::User,
            Principal::Member(_) => PrincipalKind::Member,
        }
    }

    pub fn require_parent(&self) -> Result<&User, ServiceError> {
        match self {
            Principal::Parent(user) => Ok(user),
            Principal::Member(_) => Err(ServiceError::Forbidden),
        }
    }

    pub fn require_member(&self) -> Result<&Member, ServiceError> {
        match self {
            Principal::Member(member) => Ok(member),
            Principal::Parent(_) => Err(ServiceError::Forbidden),
        }
    }

    /// Parents have rights over households they own, members over the one they belong to
    pub fn can_access(&self, household: &Household) -> bool {
        match self {
            Principal::Parent(user) => household.user_id == user.id,
            Principal::Member(member) => member.household_id == household.id,
        }
    }
}
