//! Role authorization policy.
//!
//! Decides which role, if any, a principal is bound to after a successful
//! external login. The decision is pure: every input is fetched by the caller.
//!
//! # Selection order
//!
//! 1. Candidates come from the registry's overlapping list when it is present
//!    and non-empty, otherwise from the plain list. The registry sends both
//!    shapes and the overlapping one wins.
//! 2. The first candidate whose code is in the allow-set is selected.
//!    Registry order is authoritative.
//! 3. Otherwise a local role with code 0 (GIPE) or 1 (PONTO FOCAL DRE) is kept.
//!    These roles are granted by hand and never come from the registry.
//! 4. Otherwise a `DIRETOR DE ESCOLA` profile from the identity system yields
//!    the director role. Indirect and partner network directors only exist there.
//! 5. Otherwise nothing is selected and the caller rejects the login.
//!
//! # Example
//!
//! ```
//! use gipe_auth::integration::{RoleEntry, RoleRegistryPayload};
//! use gipe_auth::policy::{RoleAuthorizationPolicy, RoleSource};
//!
//! let registry = RoleRegistryPayload::with_roles(vec![
//!     RoleEntry::new(1234, "PROFESSOR"),
//!     RoleEntry::new(3360, "DIRETOR DE ESCOLA"),
//! ]);
//! let selection = RoleAuthorizationPolicy::select_authorized_role(&registry, None, []).unwrap();
//! assert_eq!(selection.role.codigo, 3360);
//! assert_eq!(selection.source, RoleSource::Registry);
//! ```

use std::fmt;

use crate::integration::{RoleEntry, RoleRegistryPayload};
use crate::types::Role;

/// Registry profile that grants the director role.
pub const DIRECTOR_PROFILE_MARKER: &str = "DIRETOR DE ESCOLA";

/// Local role codes kept even though the registry never returns them.
pub const LOCAL_ESCAPE_CODES: [i32; 2] = [0, 1];

/// Registry role codes allowed to use the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum AuthorizedRoleCode {
    /// Diretor de escola.
    DiretorEscola = 3360,
    /// Assistente de Direção.
    AssistenteDirecao = 3085,
}

impl AuthorizedRoleCode {
    /// Maps a registry code into the allow-set.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            3360 => Some(Self::DiretorEscola),
            3085 => Some(Self::AssistenteDirecao),
            _ => None,
        }
    }

    /// Registry code.
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Catalogue display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::DiretorEscola => "Diretor de escola",
            Self::AssistenteDirecao => "Assistente de Direção",
        }
    }
}

impl fmt::Display for AuthorizedRoleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Which rule produced the selected role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSource {
    /// An allowed code in the registry.
    Registry,
    /// A hand-granted local role.
    LocalFallback,
    /// A director profile in the identity system.
    ProfileMarker,
}

/// A selected role and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSelection {
    /// The role to bind.
    pub role: Role,
    /// The rule that matched.
    pub source: RoleSource,
}

/// Role selection rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAuthorizationPolicy;

impl RoleAuthorizationPolicy {
    /// Selects the role to bind, or `None` when the principal is not allowed in.
    ///
    /// `local_role` is the role currently stored for the login, if the
    /// principal exists locally. `profiles` are the profile names returned by
    /// the identity system.
    pub fn select_authorized_role<'a, I>(
        registry: &RoleRegistryPayload,
        local_role: Option<&Role>,
        profiles: I,
    ) -> Option<RoleSelection>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if let Some(role) = Self::candidates(registry).iter().find_map(Self::allowed) {
            return Some(RoleSelection {
                role,
                source: RoleSource::Registry,
            });
        }

        if let Some(role) = local_role.filter(|r| LOCAL_ESCAPE_CODES.contains(&r.codigo)) {
            return Some(RoleSelection {
                role: role.clone(),
                source: RoleSource::LocalFallback,
            });
        }

        profiles
            .into_iter()
            .any(|name| name.trim().eq_ignore_ascii_case(DIRECTOR_PROFILE_MARKER))
            .then(|| RoleSelection {
                role: Role::new(AuthorizedRoleCode::DiretorEscola.code(), DIRECTOR_PROFILE_MARKER),
                source: RoleSource::ProfileMarker,
            })
    }

    /// Returns the candidate list, honoring the overlapping-list precedence.
    #[must_use]
    pub fn candidates(registry: &RoleRegistryPayload) -> &[RoleEntry] {
        match registry.cargos_sobre_posto.as_deref() {
            Some(overlapping) if !overlapping.is_empty() => overlapping,
            _ => registry.cargos.as_deref().unwrap_or_default(),
        }
    }

    fn allowed(entry: &RoleEntry) -> Option<Role> {
        let code = AuthorizedRoleCode::from_code(entry.codigo)?;
        let name = entry.name().unwrap_or(code.display_name());
        Some(Role::new(code.code(), name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(
        registry: &RoleRegistryPayload,
        local: Option<&Role>,
        profiles: &[&str],
    ) -> Option<RoleSelection> {
        RoleAuthorizationPolicy::select_authorized_role(registry, local, profiles.iter().copied())
    }

    #[test]
    fn test_first_allowed_code_in_registry_order() {
        let registry = RoleRegistryPayload::with_roles(vec![
            RoleEntry::new(9999, "OUTRO"),
            RoleEntry::new(3085, "ASSISTENTE DE DIRETOR DE ESCOLA"),
            RoleEntry::new(3360, "DIRETOR DE ESCOLA"),
        ]);
        let selection = select(&registry, None, &[]).unwrap();
        assert_eq!(selection.role.codigo, 3085);
        assert_eq!(selection.role.nome, "ASSISTENTE DE DIRETOR DE ESCOLA");
        assert_eq!(selection.source, RoleSource::Registry);
    }

    #[test]
    fn test_overlapping_list_takes_precedence() {
        let registry = RoleRegistryPayload {
            cargos_sobre_posto: Some(vec![RoleEntry::new(3360, "DIRETOR DE ESCOLA")]),
            cargos: Some(vec![RoleEntry::new(3085, "ASSISTENTE")]),
        };
        assert_eq!(select(&registry, None, &[]).unwrap().role.codigo, 3360);
    }

    #[test]
    fn test_overlapping_list_without_allowed_code_does_not_fall_through() {
        let registry = RoleRegistryPayload {
            cargos_sobre_posto: Some(vec![RoleEntry::new(9999, "OUTRO")]),
            cargos: Some(vec![RoleEntry::new(3360, "DIRETOR DE ESCOLA")]),
        };
        assert_eq!(select(&registry, None, &[]), None);
    }

    #[test]
    fn test_empty_overlapping_list_uses_plain_list() {
        let registry = RoleRegistryPayload {
            cargos_sobre_posto: Some(vec![]),
            cargos: Some(vec![RoleEntry::new(3360, "DIRETOR DE ESCOLA")]),
        };
        assert_eq!(select(&registry, None, &[]).unwrap().role.codigo, 3360);
    }

    #[test]
    fn test_missing_name_uses_catalogue_name() {
        let registry = RoleRegistryPayload::with_roles(vec![RoleEntry {
            codigo: 3360,
            descricao: None,
            nome: None,
        }]);
        assert_eq!(
            select(&registry, None, &[]).unwrap().role.nome,
            "Diretor de escola"
        );
    }

    #[test]
    fn test_local_escape_role_is_kept() {
        let registry = RoleRegistryPayload::with_roles(vec![RoleEntry::new(9999, "OUTRO")]);
        let local = Role::new(1, "PONTO FOCAL DRE");
        let selection = select(&registry, Some(&local), &[]).unwrap();
        assert_eq!(selection.role, local);
        assert_eq!(selection.source, RoleSource::LocalFallback);
    }

    #[test]
    fn test_other_local_roles_are_ignored() {
        let registry = RoleRegistryPayload::default();
        let local = Role::new(3085, "Assistente de Direção");
        assert_eq!(select(&registry, Some(&local), &[]), None);
    }

    #[test]
    fn test_registry_wins_over_local_escape_role() {
        let registry = RoleRegistryPayload::with_roles(vec![RoleEntry::new(3360, "DIRETOR")]);
        let local = Role::new(0, "GIPE");
        assert_eq!(select(&registry, Some(&local), &[]).unwrap().role.codigo, 3360);
    }

    #[test]
    fn test_director_profile_marker() {
        let registry = RoleRegistryPayload::default();
        let selection = select(&registry, None, &["PROFESSOR", "  diretor de escola "]).unwrap();
        assert_eq!(selection.role, Role::new(3360, "DIRETOR DE ESCOLA"));
        assert_eq!(selection.source, RoleSource::ProfileMarker);
    }

    #[test]
    fn test_nothing_matches() {
        let registry = RoleRegistryPayload::with_roles(vec![RoleEntry::new(9999, "OUTRO")]);
        assert_eq!(select(&registry, None, &["PROFESSOR"]), None);
    }

    #[test]
    fn test_authorized_role_code() {
        assert_eq!(
            AuthorizedRoleCode::from_code(3360),
            Some(AuthorizedRoleCode::DiretorEscola)
        );
        assert_eq!(AuthorizedRoleCode::from_code(1), None);
        assert_eq!(AuthorizedRoleCode::AssistenteDirecao.code(), 3085);
        assert_eq!(
            AuthorizedRoleCode::AssistenteDirecao.to_string(),
            "Assistente de Direção"
        );
    }
}
