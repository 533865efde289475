//! Wire types returned by the external identity and role registry endpoints.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::first_name_of;

/// Body returned by the credential-check endpoint on success.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalAuthPayload {
    /// Full name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub nome: String,

    /// E-mail, when registered.
    #[serde(default)]
    pub email: Option<String>,

    /// Taxpayer document.
    #[serde(default, rename = "numeroDocumento")]
    pub numero_documento: Option<String>,

    /// Older responses carry the document here instead.
    #[serde(default)]
    pub cpf: Option<String>,

    /// Login echoed back by the identity system.
    #[serde(default)]
    pub login: Option<String>,

    /// Profiles granted in the identity system.
    #[serde(default, deserialize_with = "null_as_default")]
    pub perfis: Vec<Value>,

    /// Views granted in the identity system.
    #[serde(default, deserialize_with = "null_as_default")]
    pub visoes: Vec<Value>,
}

impl ExternalAuthPayload {
    /// Returns the document id, preferring `numeroDocumento`.
    #[must_use]
    pub fn document(&self) -> &str {
        self.numero_documento
            .as_deref()
            .or(self.cpf.as_deref())
            .unwrap_or_default()
    }

    /// Returns the first name for greetings.
    #[must_use]
    pub fn first_name(&self) -> String {
        first_name_of(&self.nome)
    }

    /// Returns the profile names, accepting plain strings or objects with a
    /// `nome`/`descricao` field.
    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.perfis.iter().filter_map(|perfil| match perfil {
            Value::String(name) => Some(name.as_str()),
            Value::Object(map) => map
                .get("nome")
                .or_else(|| map.get("descricao"))
                .and_then(Value::as_str),
            _ => None,
        })
    }
}

/// One role entry in the registry response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    /// Registry code.
    #[serde(deserialize_with = "deserialize_code")]
    pub codigo: i32,

    /// Description, as sent by the current registry.
    #[serde(default)]
    pub descricao: Option<String>,

    /// Name, as sent by older registry versions.
    #[serde(default)]
    pub nome: Option<String>,
}

impl RoleEntry {
    /// Creates an entry with a description.
    #[must_use]
    pub fn new(codigo: i32, descricao: impl Into<String>) -> Self {
        Self {
            codigo,
            descricao: Some(descricao.into()),
            nome: None,
        }
    }

    /// Returns the entry name, if any was sent.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.descricao
            .as_deref()
            .or(self.nome.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Body returned by the role registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRegistryPayload {
    /// Overlapping roles. Takes precedence over `cargos` when non-empty.
    #[serde(default, rename = "cargosSobrePosto")]
    pub cargos_sobre_posto: Option<Vec<RoleEntry>>,

    /// Plain role list.
    #[serde(default)]
    pub cargos: Option<Vec<RoleEntry>>,
}

impl RoleRegistryPayload {
    /// Builds a payload with only the plain list.
    #[must_use]
    pub fn with_roles(cargos: Vec<RoleEntry>) -> Self {
        Self {
            cargos_sobre_posto: None,
            cargos: Some(cargos),
        }
    }

    /// Builds a payload with only the overlapping list.
    #[must_use]
    pub fn with_overlapping(cargos: Vec<RoleEntry>) -> Self {
        Self {
            cargos_sobre_posto: Some(cargos),
            cargos: None,
        }
    }
}

/// Profile data for the forgot-password flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryProfile {
    /// Full name.
    #[serde(default)]
    pub nome: Option<String>,

    /// Registered e-mail.
    #[serde(default)]
    pub email: Option<String>,
}

impl DirectoryProfile {
    /// Returns the e-mail when present and not blank.
    #[must_use]
    pub fn registered_email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Reads an explicit `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts role codes sent either as numbers or numeric strings.
fn deserialize_code<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| D::Error::custom(format!("role code out of range: {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid role code: {s}"))),
        other => Err(D::Error::custom(format!("invalid role code: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_payload_document_fallback() {
        let payload: ExternalAuthPayload = serde_json::from_value(json!({
            "nome": "Maria Silva",
            "cpf": "12345678901"
        }))
        .unwrap();
        assert_eq!(payload.document(), "12345678901");

        let payload: ExternalAuthPayload = serde_json::from_value(json!({
            "nome": "Maria Silva",
            "numeroDocumento": "98765432100",
            "cpf": "12345678901"
        }))
        .unwrap();
        assert_eq!(payload.document(), "98765432100");
        assert_eq!(payload.first_name(), "Maria");
    }

    #[test]
    fn test_auth_payload_accepts_null_fields() {
        let payload: ExternalAuthPayload = serde_json::from_value(json!({
            "nome": "Maria Silva",
            "numeroDocumento": "12345678901",
            "perfis": null,
            "visoes": null
        }))
        .unwrap();
        assert!(payload.perfis.is_empty());
        assert!(payload.visoes.is_empty());
        assert_eq!(payload.profile_names().count(), 0);

        let payload: ExternalAuthPayload = serde_json::from_value(json!({
            "nome": null,
            "numeroDocumento": "12345678901"
        }))
        .unwrap();
        assert_eq!(payload.nome, "");
        assert_eq!(payload.document(), "12345678901");
    }

    #[test]
    fn test_profile_names_accept_strings_and_objects() {
        let payload: ExternalAuthPayload = serde_json::from_value(json!({
            "nome": "Ana",
            "perfis": ["DIRETOR DE ESCOLA", {"nome": "PROFESSOR"}, {"descricao": "ADM"}, 42]
        }))
        .unwrap();
        let names: Vec<&str> = payload.profile_names().collect();
        assert_eq!(names, vec!["DIRETOR DE ESCOLA", "PROFESSOR", "ADM"]);
    }

    #[test]
    fn test_role_entry_accepts_string_codes_and_either_name_field() {
        let payload: RoleRegistryPayload = serde_json::from_value(json!({
            "cargos": [
                {"codigo": "3360", "descricao": "DIRETOR DE ESCOLA"},
                {"codigo": 3085, "nome": "ASSISTENTE DE DIRETOR DE ESCOLA"}
            ]
        }))
        .unwrap();
        let cargos = payload.cargos.unwrap();
        assert_eq!(cargos[0].codigo, 3360);
        assert_eq!(cargos[0].name(), Some("DIRETOR DE ESCOLA"));
        assert_eq!(cargos[1].name(), Some("ASSISTENTE DE DIRETOR DE ESCOLA"));
        assert!(payload.cargos_sobre_posto.is_none());
    }

    #[test]
    fn test_directory_profile_blank_email() {
        let profile = DirectoryProfile {
            nome: Some("Ana".to_string()),
            email: Some("  ".to_string()),
        };
        assert_eq!(profile.registered_email(), None);
    }
}
