//! Provider framework
//!
//! Write a provider as a Rust type, implement [`Provider`] plus one trait per
//! kind it serves, and derive [`CmpiProvider`](crate::CmpiProvider) to export
//! the factory symbols:
//!
//! ```ignore
//! use cmpi_core::handles::{BrokerHandle, ContextRef, ObjectPathRef, ResultRef};
//! use cmpi_core::provider::{InstanceProvider, Provider};
//! use cmpi_core::{CmpiProvider, CmpiResult, ObjectPathData};
//!
//! #[derive(CmpiProvider)]
//! #[cmpi(name = "ACME_Fan", instance, method)]
//! struct Fans {
//!     broker: BrokerHandle,
//! }
//!
//! impl Provider for Fans {
//!     fn initialize(broker: BrokerHandle, _ctx: &ContextRef) -> CmpiResult<Self> {
//!         Ok(Self { broker })
//!     }
//! }
//!
//! impl InstanceProvider for Fans {
//!     fn enumerate_instance_names(
//!         &self,
//!         _ctx: &ContextRef,
//!         rslt: &ResultRef,
//!         class_path: &ObjectPathRef,
//!     ) -> CmpiResult<()> {
//!         let ns = class_path.namespace()?;
//!         rslt.return_path_data(&ObjectPathData::new(&ns, "ACME_Fan").with_key("Id", 1u32))?;
//!         rslt.return_done()
//!     }
//! }
//! ```
//!
//! Every kind trait method defaults to `CMPI_RC_ERR_NOT_SUPPORTED`, so a
//! provider only writes the operations it supports.
//!
//! # Lifecycle
//!
//! [`Provider::initialize`] runs once per process, on the first factory call
//! of any kind. A failed initialization is reported to the broker through the
//! factory's status and retried on the next factory call. Each MI is then
//! cleaned up separately; see [`Provider::cleanup`].

mod base;
mod tables;

use std::ffi::CStr;

use crate::broker::AssocFilter;
use crate::engine::{MiKind, StaticFactories};
use crate::handles::{
    ArgsRef, BrokerHandle, ContextRef, InstanceRef, ObjectPathRef, ResultRef, SelectExpRef,
};
use crate::status::{CleanupOutcome, CmpiError, CmpiResult};
use crate::value::Data;

pub use base::{
    association_factory, create_association_mi, create_indication_mi, create_instance_mi,
    create_method_mi, create_property_mi, indication_factory, instance_factory, method_factory,
    property_factory, ProviderBase,
};

/// Provider state and its one-time initialization
pub trait Provider: Sized + Send + Sync + 'static {
    /// Build the provider state
    ///
    /// Called once, from whichever factory the broker calls first.
    fn initialize(broker: BrokerHandle, ctx: &ContextRef) -> CmpiResult<Self>;

    /// Called once per MI when the broker wants to unload it
    ///
    /// Returning [`CleanupOutcome::DoNotUnload`] or
    /// [`CleanupOutcome::NeverUnload`] keeps the MI loaded, except when
    /// `terminating` is set: the broker is shutting down and the MI is
    /// unloaded regardless.
    fn cleanup(&self, _ctx: &ContextRef, _terminating: bool) -> CmpiResult<CleanupOutcome> {
        Ok(CleanupOutcome::Unload)
    }
}

/// Export glue generated by `#[derive(CmpiProvider)]`
pub trait ProviderExport: Provider {
    /// Name used in the factory symbols and as `miName`
    const NAME: &'static CStr;

    /// Kinds with an exported factory
    const KINDS: &'static [MiKind];

    /// The process-wide state of this provider
    fn base() -> &'static ProviderBase<Self>;

    /// Add this provider's factories to a table of linked-in providers
    fn register_static(table: &mut StaticFactories);

    fn name() -> &'static str {
        Self::NAME.to_str().unwrap_or_default()
    }
}

/// Query filter of the `*Filtered` operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    pub query: Option<String>,
    pub language: Option<String>,
    pub continue_on_error: bool,
}

impl QueryFilter {
    /// No query: the filtered operation behaves like the plain one
    pub fn is_empty(&self) -> bool {
        self.query.is_none()
    }
}

pub trait InstanceProvider: ProviderExport {
    fn enumerate_instance_names(
        &self,
        _ctx: &ContextRef,
        _rslt: &ResultRef,
        _class_path: &ObjectPathRef,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn enumerate_instances(
        &self,
        _ctx: &ContextRef,
        _rslt: &ResultRef,
        _class_path: &ObjectPathRef,
        _properties: Option<&[String]>,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn get_instance(
        &self,
        _ctx: &ContextRef,
        _rslt: &ResultRef,
        _path: &ObjectPathRef,
        _properties: Option<&[String]>,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn create_instance(
        &self,
        _ctx: &ContextRef,
        _rslt: &ResultRef,
        _class_path: &ObjectPathRef,
        _instance: &InstanceRef,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn modify_instance(
        &self,
        _ctx: &ContextRef,
        _rslt: &ResultRef,
        _path: &ObjectPathRef,
        _instance: &InstanceRef,
        _properties: Option<&[String]>,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn delete_instance(&self, _ctx: &ContextRef, _rslt: &ResultRef, _path: &ObjectPathRef) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn exec_query(
        &self,
        _ctx: &ContextRef,
        _rslt: &ResultRef,
        _class_path: &ObjectPathRef,
        _query: &str,
        _language: &str,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn enumerate_instances_filtered(
        &self,
        ctx: &ContextRef,
        rslt: &ResultRef,
        class_path: &ObjectPathRef,
        properties: Option<&[String]>,
        filter: &QueryFilter,
    ) -> CmpiResult<()> {
        if filter.is_empty() {
            return self.enumerate_instances(ctx, rslt, class_path, properties);
        }
        Err(CmpiError::not_supported())
    }
}

pub trait AssociationProvider: ProviderExport {
    fn associators(
        &self,
        _ctx: &ContextRef,
        _rslt: &ResultRef,
        _path: &ObjectPathRef,
        _filter: &AssocFilter,
        _properties: Option<&[String]>,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn associator_names(
        &self,
        _ctx: &ContextRef,
        _rslt: &ResultRef,
        _path: &ObjectPathRef,
        _filter: &AssocFilter,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn references(
        &self,
        _ctx: &ContextRef,
        _rslt: &ResultRef,
        _path: &ObjectPathRef,
        _result_class: Option<&str>,
        _role: Option<&str>,
        _properties: Option<&[String]>,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn reference_names(
        &self,
        _ctx: &ContextRef,
        _rslt: &ResultRef,
        _path: &ObjectPathRef,
        _result_class: Option<&str>,
        _role: Option<&str>,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn associators_filtered(
        &self,
        ctx: &ContextRef,
        rslt: &ResultRef,
        path: &ObjectPathRef,
        filter: &AssocFilter,
        properties: Option<&[String]>,
        query: &QueryFilter,
    ) -> CmpiResult<()> {
        if query.is_empty() {
            return self.associators(ctx, rslt, path, filter, properties);
        }
        Err(CmpiError::not_supported())
    }

    #[allow(clippy::too_many_arguments)]
    fn references_filtered(
        &self,
        ctx: &ContextRef,
        rslt: &ResultRef,
        path: &ObjectPathRef,
        result_class: Option<&str>,
        role: Option<&str>,
        properties: Option<&[String]>,
        query: &QueryFilter,
    ) -> CmpiResult<()> {
        if query.is_empty() {
            return self.references(ctx, rslt, path, result_class, role, properties);
        }
        Err(CmpiError::not_supported())
    }
}

pub trait MethodProvider: ProviderExport {
    /// Return the method's value through `rslt` and output arguments through `out`
    fn invoke_method(
        &self,
        _ctx: &ContextRef,
        _rslt: &ResultRef,
        _path: &ObjectPathRef,
        _method: &str,
        _in_args: &ArgsRef,
        _out: &ArgsRef,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }
}

pub trait PropertyProvider: ProviderExport {
    fn set_property(
        &self,
        _ctx: &ContextRef,
        _rslt: &ResultRef,
        _path: &ObjectPathRef,
        _name: &str,
        _data: &Data,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn get_property(&self, _ctx: &ContextRef, _rslt: &ResultRef, _path: &ObjectPathRef, _name: &str) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    /// Defaults to [`set_property`](Self::set_property), dropping the origin
    fn set_property_with_origin(
        &self,
        ctx: &ContextRef,
        rslt: &ResultRef,
        path: &ObjectPathRef,
        name: &str,
        data: &Data,
        _origin: Option<&str>,
    ) -> CmpiResult<()> {
        self.set_property(ctx, rslt, path, name, data)
    }
}

/// Indication provider
///
/// `enable_indications` and `disable_indications` are notifications and
/// succeed by default; everything else is `NOT_SUPPORTED` until implemented.
pub trait IndicationProvider: ProviderExport {
    fn authorize_filter(
        &self,
        _ctx: &ContextRef,
        _filter: &SelectExpRef,
        _class_name: &str,
        _path: &ObjectPathRef,
        _owner: Option<&str>,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn must_poll(
        &self,
        _ctx: &ContextRef,
        _filter: &SelectExpRef,
        _class_name: &str,
        _path: &ObjectPathRef,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn activate_filter(
        &self,
        _ctx: &ContextRef,
        _filter: &SelectExpRef,
        _class_name: &str,
        _path: &ObjectPathRef,
        _first_activation: bool,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn deactivate_filter(
        &self,
        _ctx: &ContextRef,
        _filter: &SelectExpRef,
        _class_name: &str,
        _path: &ObjectPathRef,
        _last_activation: bool,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn enable_indications(&self, _ctx: &ContextRef) -> CmpiResult<()> {
        Ok(())
    }

    fn disable_indications(&self, _ctx: &ContextRef) -> CmpiResult<()> {
        Ok(())
    }

    fn authorize_filter_collection(&self, _ctx: &ContextRef, _collection: &InstanceRef) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn activate_filter_collection(
        &self,
        _ctx: &ContextRef,
        _collection: &InstanceRef,
        _first_activation: bool,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }

    fn deactivate_filter_collection(
        &self,
        _ctx: &ContextRef,
        _collection: &InstanceRef,
        _last_activation: bool,
    ) -> CmpiResult<()> {
        Err(CmpiError::not_supported())
    }
}
