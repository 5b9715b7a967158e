//! Provider kinds and their factory symbols

use std::fmt;

use cmpi_sdk::versions;

/// The five provider kinds a module can export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MiKind {
    Instance,
    Association,
    Method,
    Property,
    Indication,
}

impl MiKind {
    pub const ALL: [MiKind; 5] = [
        MiKind::Instance,
        MiKind::Association,
        MiKind::Method,
        MiKind::Property,
        MiKind::Indication,
    ];

    /// Factory symbol suffix, e.g. `_Create_InstanceMI`
    pub const fn suffix(self) -> &'static str {
        match self {
            MiKind::Instance => versions::INSTANCE_MI_SUFFIX,
            MiKind::Association => versions::ASSOCIATION_MI_SUFFIX,
            MiKind::Method => versions::METHOD_MI_SUFFIX,
            MiKind::Property => versions::PROPERTY_MI_SUFFIX,
            MiKind::Indication => versions::INDICATION_MI_SUFFIX,
        }
    }

    /// Symbol exported for a named provider: `<name>_Create_<Kind>MI`
    pub fn symbol_for(self, provider_name: &str) -> String {
        format!("{provider_name}{}", self.suffix())
    }

    /// Generic entry point: `_Generic_Create_<Kind>MI`
    pub fn generic_symbol(self) -> String {
        format!("{}{}", versions::GENERIC_MI_PREFIX, self.suffix())
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MiKind::Instance => "instance",
            MiKind::Association => "association",
            MiKind::Method => "method",
            MiKind::Property => "property",
            MiKind::Indication => "indication",
        }
    }

    /// Parse a kind name as written in configuration (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        MiKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for MiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_names() {
        assert_eq!(
            MiKind::Instance.symbol_for("Sample"),
            "Sample_Create_InstanceMI"
        );
        assert_eq!(
            MiKind::Association.symbol_for("Sample"),
            "Sample_Create_AssociationMI"
        );
        assert_eq!(MiKind::Method.symbol_for("X"), "X_Create_MethodMI");
        assert_eq!(MiKind::Property.symbol_for("X"), "X_Create_PropertyMI");
        assert_eq!(
            MiKind::Indication.symbol_for("X"),
            "X_Create_IndicationMI"
        );
    }

    #[test]
    fn test_generic_symbol() {
        assert_eq!(
            MiKind::Instance.generic_symbol(),
            "_Generic_Create_InstanceMI"
        );
        assert_eq!(
            MiKind::Indication.generic_symbol(),
            "_Generic_Create_IndicationMI"
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(MiKind::parse("Instance"), Some(MiKind::Instance));
        assert_eq!(MiKind::parse("method"), Some(MiKind::Method));
        assert_eq!(MiKind::parse("query"), None);
    }
}
