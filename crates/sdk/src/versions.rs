//! Interface versions and factory symbol naming
//!
//! A provider module exports one symbol per provider kind, named by
//! concatenating the registered provider name with the kind's suffix, e.g.
//! `Sample_Create_InstanceMI`. A module may instead export the generic entry
//! point `_Generic_Create_InstanceMI`, which receives the provider name.

use crate::types::CMPIVersion;

pub const CMPIVersion100: CMPIVersion = 100;
pub const CMPIVersion200: CMPIVersion = 200;
pub const CMPIVersion210: CMPIVersion = 210;

/// Version implemented by this SDK
pub const CMPICurrentVersion: CMPIVersion = CMPIVersion210;

/// `ftVersion` written into every function table
pub const CMPI_VERSION: CMPIVersion = CMPICurrentVersion;

pub const INSTANCE_MI_SUFFIX: &str = "_Create_InstanceMI";
pub const ASSOCIATION_MI_SUFFIX: &str = "_Create_AssociationMI";
pub const METHOD_MI_SUFFIX: &str = "_Create_MethodMI";
pub const PROPERTY_MI_SUFFIX: &str = "_Create_PropertyMI";
pub const INDICATION_MI_SUFFIX: &str = "_Create_IndicationMI";

/// Prefix of the generic factory entry points
pub const GENERIC_MI_PREFIX: &str = "_Generic";

/// Collected factory suffixes for iteration
pub const MI_FACTORY_SUFFIXES: &[(&str, &str)] = &[
    ("Instance", INSTANCE_MI_SUFFIX),
    ("Association", ASSOCIATION_MI_SUFFIX),
    ("Method", METHOD_MI_SUFFIX),
    ("Property", PROPERTY_MI_SUFFIX),
    ("Indication", INDICATION_MI_SUFFIX),
];
