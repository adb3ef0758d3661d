use crate::core::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Numeric identifier of a participating organization, unique within its role.
pub type PartyId = u32;

/// Functional category of a party in a federated job.
///
/// The guest initiates jobs and usually holds labels, hosts contribute
/// label-blind features, and the arbiter coordinates the protocol steps that
/// need a neutral third party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    Host,
    Arbiter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Host => "host",
            Role::Arbiter => "arbiter",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Role::Guest),
            "host" => Ok(Role::Host),
            "arbiter" => Ok(Role::Arbiter),
            other => Err(PipelineError::InvalidRoleConfiguration(format!(
                "unknown role '{other}'"
            ))),
        }
    }
}

/// One participating organization: a role plus a party id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Party {
    pub role: Role,
    pub party_id: PartyId,
}

impl Party {
    pub fn new(role: Role, party_id: PartyId) -> Self {
        Self { role, party_id }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.role, self.party_id)
    }
}

/// The identities taking part in a job, grouped by role, plus the single
/// designated initiator.
///
/// The initiator and the role map may be set in either order (the classic
/// build script sets the initiator first), so the cross-check between them
/// runs as soon as both halves are present and again from
/// [`RoleRegistry::validate`] at compile time.
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    roles: BTreeMap<Role, Vec<PartyId>>,
    initiator: Option<Party>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the role map. Fails if the map is empty or any role has an
    /// empty party list; a rejected map leaves the previous one in place.
    pub fn set_roles(&mut self, roles: BTreeMap<Role, Vec<PartyId>>) -> Result<(), PipelineError> {
        if roles.is_empty() {
            return Err(PipelineError::InvalidRoleConfiguration(
                "party map must not be empty".to_string(),
            ));
        }
        for (role, parties) in &roles {
            if parties.is_empty() {
                return Err(PipelineError::InvalidRoleConfiguration(format!(
                    "role '{role}' has no parties"
                )));
            }
        }
        Self::check_initiator(self.initiator, &roles)?;
        self.roles = roles;
        Ok(())
    }

    /// Designates the job initiator. A rejected party leaves the previous
    /// initiator in place.
    pub fn set_initiator(&mut self, role: Role, party_id: PartyId) -> Result<(), PipelineError> {
        let initiator = Party::new(role, party_id);
        // With no role map yet, the cross-check runs at the other setter
        // and again at compile.
        if !self.roles.is_empty() {
            Self::check_initiator(Some(initiator), &self.roles)?;
        }
        self.initiator = Some(initiator);
        Ok(())
    }

    fn check_initiator(
        initiator: Option<Party>,
        roles: &BTreeMap<Role, Vec<PartyId>>,
    ) -> Result<(), PipelineError> {
        let Some(initiator) = initiator else {
            return Ok(());
        };
        let Some(parties) = roles.get(&initiator.role) else {
            return Err(PipelineError::InvalidRoleConfiguration(format!(
                "initiator role '{}' is not among the declared roles",
                initiator.role
            )));
        };
        if !parties.contains(&initiator.party_id) {
            return Err(PipelineError::InvalidRoleConfiguration(format!(
                "initiator {initiator} is not listed under role '{}'",
                initiator.role
            )));
        }
        Ok(())
    }

    pub fn contains(&self, role: Role, party_id: PartyId) -> bool {
        self.roles
            .get(&role)
            .is_some_and(|parties| parties.contains(&party_id))
    }

    pub fn initiator(&self) -> Option<Party> {
        self.initiator
    }

    pub fn roles(&self) -> &BTreeMap<Role, Vec<PartyId>> {
        &self.roles
    }

    /// All registered parties in deterministic order (by role, then list order).
    pub fn parties(&self) -> impl Iterator<Item = Party> + '_ {
        self.roles.iter().flat_map(|(role, parties)| {
            parties.iter().map(move |id| Party::new(*role, *id))
        })
    }

    /// Full well-formedness check, run again at compile time: roles declared,
    /// initiator designated, initiator present in its own role's list.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.roles.is_empty() {
            return Err(PipelineError::InvalidRoleConfiguration(
                "party map must not be empty".to_string(),
            ));
        }
        if self.initiator.is_none() {
            return Err(PipelineError::InvalidRoleConfiguration(
                "no initiator designated".to_string(),
            ));
        }
        Self::check_initiator(self.initiator, &self.roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(guest: &[PartyId], host: &[PartyId]) -> BTreeMap<Role, Vec<PartyId>> {
        let mut map = BTreeMap::new();
        map.insert(Role::Guest, guest.to_vec());
        map.insert(Role::Host, host.to_vec());
        map
    }

    #[test]
    fn empty_role_map_is_rejected() {
        let mut registry = RoleRegistry::new();
        let err = registry.set_roles(BTreeMap::new()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRoleConfiguration(_)));
    }

    #[test]
    fn role_with_no_parties_is_rejected() {
        let mut registry = RoleRegistry::new();
        let err = registry.set_roles(roles(&[9999], &[])).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRoleConfiguration(_)));
    }

    #[test]
    fn initiator_may_be_set_before_roles() {
        let mut registry = RoleRegistry::new();
        registry.set_initiator(Role::Guest, 9999).unwrap();
        registry.set_roles(roles(&[9999], &[10000, 10001])).unwrap();
        registry.validate().unwrap();
        assert_eq!(registry.initiator(), Some(Party::new(Role::Guest, 9999)));
    }

    #[test]
    fn initiator_outside_its_role_list_fails() {
        let mut registry = RoleRegistry::new();
        registry.set_roles(roles(&[9999], &[10000])).unwrap();
        let err = registry.set_initiator(Role::Guest, 1234).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRoleConfiguration(_)));
    }

    #[test]
    fn validate_requires_an_initiator() {
        let mut registry = RoleRegistry::new();
        registry.set_roles(roles(&[9999], &[10000])).unwrap();
        assert!(registry.validate().is_err());
    }

    #[test]
    fn rejected_setters_leave_prior_state_untouched() {
        let mut registry = RoleRegistry::new();
        registry.set_roles(roles(&[9999], &[10000])).unwrap();
        registry.set_initiator(Role::Guest, 9999).unwrap();

        // A role map that orphans the initiator is rejected wholesale.
        let err = registry
            .set_roles(BTreeMap::from([(Role::Host, vec![10000])]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRoleConfiguration(_)));
        assert!(registry.contains(Role::Guest, 9999));

        // An initiator outside the role map is rejected without replacing
        // the current one.
        let err = registry.set_initiator(Role::Arbiter, 1).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRoleConfiguration(_)));
        assert_eq!(registry.initiator(), Some(Party::new(Role::Guest, 9999)));
        registry.validate().unwrap();
    }

    #[test]
    fn role_names_parse_and_round_trip() {
        for role in [Role::Guest, Role::Host, Role::Arbiter] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!(matches!(
            "coordinator".parse::<Role>(),
            Err(PipelineError::InvalidRoleConfiguration(_))
        ));
    }

    #[test]
    fn parties_iterate_in_deterministic_order() {
        let mut registry = RoleRegistry::new();
        let mut map = roles(&[9999], &[10000, 10001]);
        map.insert(Role::Arbiter, vec![10000]);
        registry.set_roles(map).unwrap();

        let listed: Vec<Party> = registry.parties().collect();
        assert_eq!(
            listed,
            vec![
                Party::new(Role::Guest, 9999),
                Party::new(Role::Host, 10000),
                Party::new(Role::Host, 10001),
                Party::new(Role::Arbiter, 10000),
            ]
        );
    }
}
