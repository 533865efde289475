//! Domain types shared by the login and credential flows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Role
// =============================================================================

/// A role (cargo) as known by the external role registry.
///
/// The code is the registry's own identifier and doubles as the primary key
/// of the local table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    /// Registry code.
    pub codigo: i32,
    /// Display name.
    pub nome: String,
}

impl Role {
    /// Creates a new role.
    #[must_use]
    pub fn new(codigo: i32, nome: impl Into<String>) -> Self {
        Self {
            codigo,
            nome: nome.into(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.codigo, self.nome)
    }
}

// =============================================================================
// Network
// =============================================================================

/// Management network of a unit or principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Network {
    /// Directly managed.
    #[default]
    Direta,
    /// Indirectly managed or partner network.
    Indireta,
}

impl Network {
    /// Stored representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direta => "DIRETA",
            Self::Indireta => "INDIRETA",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Direta => "Direta",
            Self::Indireta => "Indireta ou parceira",
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DIRETA" => Ok(Self::Direta),
            "INDIRETA" => Ok(Self::Indireta),
            other => Err(format!("unknown network '{other}'")),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Principal
// =============================================================================

/// Local projection of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable surrogate key, independent of the external system.
    pub id: Uuid,
    /// Login identifier (RF or CPF digits).
    pub username: String,
    /// Display name.
    pub name: String,
    /// Taxpayer document.
    pub cpf: String,
    /// E-mail address, if known.
    pub email: Option<String>,
    /// Argon2 PHC string. Never plaintext.
    pub password_hash: String,
    /// Bound role.
    pub role: Role,
    /// Management network.
    pub network: Network,
    /// Whether the account was validated.
    pub is_validated: bool,
    /// Whether the principal exists in the external identity system.
    pub is_externally_provisioned: bool,
    /// Last successful login.
    pub last_login: Option<OffsetDateTime>,
}

impl Principal {
    /// Starts building a principal with the given login.
    #[must_use]
    pub fn builder(username: impl Into<String>) -> PrincipalBuilder {
        PrincipalBuilder::new(username)
    }

    /// Returns the first word of the display name, or `"Usuário"` when empty.
    #[must_use]
    pub fn first_name(&self) -> String {
        first_name_of(&self.name)
    }
}

/// Returns the first space-separated word of a display name.
#[must_use]
pub fn first_name_of(name: &str) -> String {
    name.split(' ')
        .find(|part| !part.is_empty())
        .unwrap_or("Usuário")
        .to_string()
}

/// Builder for `Principal` values.
pub struct PrincipalBuilder {
    principal: Principal,
}

impl PrincipalBuilder {
    fn new(username: impl Into<String>) -> Self {
        Self {
            principal: Principal {
                id: Uuid::new_v4(),
                username: username.into(),
                name: String::new(),
                cpf: String::new(),
                email: None,
                password_hash: String::new(),
                role: Role::new(3085, "Assistente de Direção"),
                network: Network::Direta,
                is_validated: false,
                is_externally_provisioned: false,
                last_login: None,
            },
        }
    }

    /// Sets the surrogate key.
    #[must_use]
    pub fn id(mut self, id: Uuid) -> Self {
        self.principal.id = id;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.principal.name = name.into();
        self
    }

    /// Sets the CPF.
    #[must_use]
    pub fn cpf(mut self, cpf: impl Into<String>) -> Self {
        self.principal.cpf = cpf.into();
        self
    }

    /// Sets the e-mail.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.principal.email = Some(email.into());
        self
    }

    /// Sets an already hashed password.
    #[must_use]
    pub fn password_hash(mut self, hash: impl Into<String>) -> Self {
        self.principal.password_hash = hash.into();
        self
    }

    /// Sets the role.
    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.principal.role = role;
        self
    }

    /// Sets the network.
    #[must_use]
    pub fn network(mut self, network: Network) -> Self {
        self.principal.network = network;
        self
    }

    /// Marks the principal as validated.
    #[must_use]
    pub fn validated(mut self, validated: bool) -> Self {
        self.principal.is_validated = validated;
        self
    }

    /// Marks the principal as present in the external identity system.
    #[must_use]
    pub fn externally_provisioned(mut self, provisioned: bool) -> Self {
        self.principal.is_externally_provisioned = provisioned;
        self
    }

    /// Builds the principal.
    #[must_use]
    pub fn build(self) -> Principal {
        self.principal
    }
}

// =============================================================================
// Reconciled identity
// =============================================================================

/// Fields written to the local store after a successful external login.
#[derive(Debug, Clone)]
pub struct ReconciledIdentity {
    /// Login identifier (RF).
    pub username: String,
    /// Display name from the external payload.
    pub name: String,
    /// Document id from the external payload.
    pub cpf: String,
    /// E-mail from the external payload.
    pub email: Option<String>,
    /// Hash of the submitted password.
    pub password_hash: String,
    /// Role selected by the policy.
    pub role: Role,
}

// =============================================================================
// Organizational units
// =============================================================================

/// Kind of organizational unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitType {
    #[default]
    #[serde(rename = "ADM")]
    Adm,
    #[serde(rename = "DRE")]
    Dre,
    #[serde(rename = "IFSP")]
    Ifsp,
    #[serde(rename = "CMCT")]
    Cmct,
    #[serde(rename = "CECI")]
    Ceci,
    #[serde(rename = "CEI")]
    Cei,
    #[serde(rename = "CEMEI")]
    Cemei,
    #[serde(rename = "CIEJA")]
    Cieja,
    #[serde(rename = "EMEBS")]
    Emebs,
    #[serde(rename = "EMEF")]
    Emef,
    #[serde(rename = "EMEFM")]
    Emefm,
    #[serde(rename = "EMEI")]
    Emei,
    #[serde(rename = "CEU")]
    Ceu,
    #[serde(rename = "CEU CEI")]
    CeuCei,
    #[serde(rename = "CEU EMEF")]
    CeuEmef,
    #[serde(rename = "CEU EMEI")]
    CeuEmei,
    #[serde(rename = "CEU CEMEI")]
    CeuCemei,
    #[serde(rename = "CEI DIRET")]
    CeiDiret,
}

impl UnitType {
    const ALL: [UnitType; 18] = [
        Self::Adm,
        Self::Dre,
        Self::Ifsp,
        Self::Cmct,
        Self::Ceci,
        Self::Cei,
        Self::Cemei,
        Self::Cieja,
        Self::Emebs,
        Self::Emef,
        Self::Emefm,
        Self::Emei,
        Self::Ceu,
        Self::CeuCei,
        Self::CeuEmef,
        Self::CeuEmei,
        Self::CeuCemei,
        Self::CeiDiret,
    ];

    /// Stored representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adm => "ADM",
            Self::Dre => "DRE",
            Self::Ifsp => "IFSP",
            Self::Cmct => "CMCT",
            Self::Ceci => "CECI",
            Self::Cei => "CEI",
            Self::Cemei => "CEMEI",
            Self::Cieja => "CIEJA",
            Self::Emebs => "EMEBS",
            Self::Emef => "EMEF",
            Self::Emefm => "EMEFM",
            Self::Emei => "EMEI",
            Self::Ceu => "CEU",
            Self::CeuCei => "CEU CEI",
            Self::CeuEmef => "CEU EMEF",
            Self::CeuEmei => "CEU EMEI",
            Self::CeuCemei => "CEU CEMEI",
            Self::CeiDiret => "CEI DIRET",
        }
    }
}

impl FromStr for UnitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown unit type '{s}'"))
    }
}

/// Errors raised by [`Unit::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitValidationError {
    /// The institutional code is not exactly six characters long.
    #[error("O código EOL deve ter 6 caracteres.")]
    InvalidCode,

    /// The acronym is longer than four characters.
    #[error("A sigla deve ter no máximo 4 caracteres.")]
    InvalidSigla,

    /// A DRE references another DRE.
    #[error("Unidades do tipo DRE não devem referenciar outra DRE.")]
    DreWithParent,

    /// The referenced parent is not DRE-typed.
    #[error("A unidade associada como DRE deve ser do tipo DRE.")]
    ParentNotDre,

    /// The referenced parent does not exist.
    #[error("DRE {0} não encontrada.")]
    ParentNotFound(String),
}

/// An organizational unit: a district (DRE) or a school-level unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Fixed-length institutional code.
    pub codigo_eol: String,
    /// Unit name.
    pub nome: String,
    /// Unit kind.
    pub tipo_unidade: UnitType,
    /// Management network.
    pub rede: Network,
    /// Code of the owning DRE.
    pub dre: Option<String>,
    /// Short acronym.
    #[serde(default)]
    pub sigla: String,
}

impl Unit {
    /// Checks the unit against its referenced parent.
    ///
    /// `parent` must be the unit referenced by `self.dre`, if any.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self, parent: Option<&Unit>) -> Result<(), UnitValidationError> {
        if self.codigo_eol.chars().count() != 6 {
            return Err(UnitValidationError::InvalidCode);
        }
        if self.sigla.chars().count() > 4 {
            return Err(UnitValidationError::InvalidSigla);
        }
        let Some(dre_code) = self.dre.as_deref() else {
            return Ok(());
        };
        if self.tipo_unidade == UnitType::Dre {
            return Err(UnitValidationError::DreWithParent);
        }
        match parent {
            None => Err(UnitValidationError::ParentNotFound(dre_code.to_string())),
            Some(p) if p.tipo_unidade != UnitType::Dre => Err(UnitValidationError::ParentNotDre),
            Some(_) => Ok(()),
        }
    }

    /// Returns `true` for district-level units.
    #[must_use]
    pub fn is_dre(&self) -> bool {
        self.tipo_unidade == UnitType::Dre
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.nome, self.codigo_eol)
    }
}

/// Unit summary embedded in the login response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSummary {
    /// Institutional code.
    pub codigo: String,
    /// Unit name.
    #[serde(rename = "nomeUnidade")]
    pub nome_unidade: String,
}

// =============================================================================
// Authentication outcome
// =============================================================================

/// Access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access: String,
    /// Longer-lived refresh token.
    pub refresh: String,
}

/// Result of a successful login. Lives for one request only.
#[derive(Debug, Clone)]
pub struct AuthenticationOutcome {
    /// Display name.
    pub name: String,
    /// E-mail, empty when unknown.
    pub email: String,
    /// Taxpayer document.
    pub cpf: String,
    /// Normalized login.
    pub login: String,
    /// Bound role.
    pub role: Role,
    /// Units assigned to the principal.
    pub units: Vec<UnitSummary>,
    /// Issued tokens.
    pub tokens: TokenPair,
}
