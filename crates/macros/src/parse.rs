//! Attribute parsing for the CmpiProvider derive macro

use darling::FromDeriveInput;
use syn::{DeriveInput, Generics, Ident};

/// Parsed #[cmpi(...)] attributes on the provider type
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(cmpi), supports(struct_any))]
pub struct CmpiProviderArgs {
    /// Type identifier
    pub ident: Ident,

    pub generics: Generics,

    /// Provider name used in the factory symbols (defaults to the type name)
    #[darling(default)]
    pub name: Option<String>,

    #[darling(default)]
    pub instance: bool,

    #[darling(default)]
    pub association: bool,

    #[darling(default)]
    pub method: bool,

    #[darling(default)]
    pub property: bool,

    #[darling(default)]
    pub indication: bool,
}

/// A provider kind by its `MiKind` variant name
pub struct Kind {
    pub variant: &'static str,
    pub enabled: bool,
}

impl CmpiProviderArgs {
    /// Provider name, validated for use in a symbol
    pub fn provider_name(&self) -> darling::Result<String> {
        let name = self.name.clone().unwrap_or_else(|| self.ident.to_string());
        let valid = !name.is_empty()
            && !name.starts_with(|c: char| c.is_ascii_digit())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(name)
        } else {
            Err(darling::Error::custom(format!(
                "provider name `{name}` must be a C identifier"
            ))
            .with_span(&self.ident))
        }
    }

    pub fn kinds(&self) -> [Kind; 5] {
        [
            Kind { variant: "Instance", enabled: self.instance },
            Kind { variant: "Association", enabled: self.association },
            Kind { variant: "Method", enabled: self.method },
            Kind { variant: "Property", enabled: self.property },
            Kind { variant: "Indication", enabled: self.indication },
        ]
    }
}

/// Parse a DeriveInput into CmpiProviderArgs
pub fn parse_cmpi_provider(input: &DeriveInput) -> darling::Result<CmpiProviderArgs> {
    CmpiProviderArgs::from_derive_input(input)
}
