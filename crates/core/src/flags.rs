//! Typed views over CMPI bitmasks

use bitflags::bitflags;

use crate::sdk::*;

bitflags! {
    /// Value of the `CMPIInvocationFlags` context entry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InvocationFlags: u32 {
        const LOCAL_ONLY = CMPI_FLAG_LocalOnly;
        const DEEP_INHERITANCE = CMPI_FLAG_DeepInheritance;
        const INCLUDE_QUALIFIERS = CMPI_FLAG_IncludeQualifiers;
        const INCLUDE_CLASS_ORIGIN = CMPI_FLAG_IncludeClassOrigin;
    }
}

bitflags! {
    /// Broker capability mask (`CMPIBrokerFT::brokerCapabilities`)
    ///
    /// Several capabilities share bits: `BASIC_WRITE` implies `BASIC_READ`,
    /// `INSTANCE_MANIPULATION` implies `BASIC_WRITE`, and so on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        const BASIC_READ = CMPI_MB_BasicRead;
        const BASIC_WRITE = CMPI_MB_BasicWrite;
        const INSTANCE_MANIPULATION = CMPI_MB_InstanceManipulation;
        const ASSOCIATION_TRAVERSAL = CMPI_MB_AssociationTraversal;
        const QUERY_EXECUTION = CMPI_MB_QueryExecution;
        const QUERY_NORMALIZATION = CMPI_MB_QueryNormalization;
        const INDICATIONS = CMPI_MB_Indications;
        const BASIC_QUALIFIER_SUPPORT = CMPI_MB_BasicQualifierSupport;
        const OS_ENCAPSULATION_SUPPORT = CMPI_MB_OSEncapsulationSupport;
        const SUPPORTS_EXTENDED_ERROR = CMPI_MB_Supports_Extended_Error;
        const LOGGING = CMPI_MB_Logging;
        const TRACING = CMPI_MB_Tracing;
        const PROPERTY_FILTERING = CMPI_MB_PropertyFiltering;
        const CODEPAGE_CONVERSION = CMPI_MB_CodepageConversion;
    }
}

/// Configuration names of the capabilities, matched case-insensitively
const CAPABILITY_NAMES: &[(&str, Capabilities)] = &[
    ("BasicRead", Capabilities::BASIC_READ),
    ("BasicWrite", Capabilities::BASIC_WRITE),
    ("InstanceManipulation", Capabilities::INSTANCE_MANIPULATION),
    ("AssociationTraversal", Capabilities::ASSOCIATION_TRAVERSAL),
    ("QueryExecution", Capabilities::QUERY_EXECUTION),
    ("QueryNormalization", Capabilities::QUERY_NORMALIZATION),
    ("Indications", Capabilities::INDICATIONS),
    ("BasicQualifierSupport", Capabilities::BASIC_QUALIFIER_SUPPORT),
    ("OSEncapsulationSupport", Capabilities::OS_ENCAPSULATION_SUPPORT),
    ("Supports_Extended_Error", Capabilities::SUPPORTS_EXTENDED_ERROR),
    ("Logging", Capabilities::LOGGING),
    ("Tracing", Capabilities::TRACING),
    ("PropertyFiltering", Capabilities::PROPERTY_FILTERING),
    ("CodepageConversion", Capabilities::CODEPAGE_CONVERSION),
];

impl Capabilities {
    /// What the reference broker actually implements
    pub fn reference_broker() -> Self {
        Capabilities::INSTANCE_MANIPULATION
            | Capabilities::ASSOCIATION_TRAVERSAL
            | Capabilities::INDICATIONS
            | Capabilities::OS_ENCAPSULATION_SUPPORT
            | Capabilities::SUPPORTS_EXTENDED_ERROR
            | Capabilities::LOGGING
            | Capabilities::TRACING
            | Capabilities::PROPERTY_FILTERING
            | Capabilities::CODEPAGE_CONVERSION
    }

    /// Parse one capability name (`BasicRead`, `CMPI_MB_BasicRead`, ...)
    pub fn parse_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("CMPI_MB_").unwrap_or(name);
        CAPABILITY_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, c)| *c)
    }

    /// Union of the named capabilities; returns the first unknown name on error
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        names.iter().try_fold(Capabilities::empty(), |acc, n| {
            Self::parse_name(n.as_ref())
                .map(|c| acc | c)
                .ok_or_else(|| n.as_ref().to_string())
        })
    }
}

bitflags! {
    /// Validity state of a `CMPIData`
    ///
    /// Independent of the type tag: a key value can also be null.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ValueState: u16 {
        const NULL = CMPI_nullValue;
        const KEY = CMPI_keyValue;
        const NOT_FOUND = CMPI_notFound;
        const BAD = CMPI_badValue;
    }
}

impl ValueState {
    pub const GOOD: ValueState = ValueState::empty();

    /// Whether the payload must not be inspected
    pub const fn has_no_payload(self) -> bool {
        self.intersects(ValueState::NULL.union(ValueState::NOT_FOUND))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_flag_values() {
        assert_eq!(InvocationFlags::LOCAL_ONLY.bits(), 1);
        assert_eq!(InvocationFlags::DEEP_INHERITANCE.bits(), 2);
        assert_eq!(InvocationFlags::INCLUDE_QUALIFIERS.bits(), 4);
        assert_eq!(InvocationFlags::INCLUDE_CLASS_ORIGIN.bits(), 8);
    }

    #[test]
    fn test_capability_bits() {
        assert_eq!(Capabilities::BASIC_READ.bits(), 0x1);
        assert_eq!(Capabilities::INDICATIONS.bits(), 0x81);
        assert_eq!(Capabilities::CODEPAGE_CONVERSION.bits(), 0x2000);
        assert!(Capabilities::INSTANCE_MANIPULATION.contains(Capabilities::BASIC_WRITE));
        assert!(Capabilities::BASIC_WRITE.contains(Capabilities::BASIC_READ));
        assert_eq!(CMPI_MB_Class_1, CMPI_MB_BasicWrite);
        assert_eq!(CMPI_MB_Supports_Schema, 0x3000);
    }

    #[test]
    fn test_capabilities_from_names() {
        let caps = Capabilities::from_names(&["BasicRead", "cmpi_mb_logging"]);
        assert_eq!(caps, Err("cmpi_mb_logging".to_string()));

        let caps = Capabilities::from_names(&["basicread", "CMPI_MB_Logging"]).unwrap();
        assert_eq!(caps, Capabilities::BASIC_READ | Capabilities::LOGGING);

        assert_eq!(
            Capabilities::from_names(&["Teleportation"]),
            Err("Teleportation".to_string())
        );
    }

    #[test]
    fn test_value_state_independent_bits() {
        let s = ValueState::KEY | ValueState::NULL;
        assert!(s.contains(ValueState::KEY));
        assert!(s.contains(ValueState::NULL));
        assert!(s.has_no_payload());
        assert!(!ValueState::KEY.has_no_payload());
        assert_eq!(ValueState::NULL.bits(), 0x100);
        assert_eq!(ValueState::KEY.bits(), 0x200);
        assert_eq!(ValueState::NOT_FOUND.bits(), 0x400);
        assert_eq!(ValueState::BAD.bits(), 0x8000);
    }
}
