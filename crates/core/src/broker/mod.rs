//! Reference broker
//!
//! Hosts providers in-process: hands them a `CMPIBroker` with all four tables,
//! routes host requests and provider up-calls to the registered provider, and
//! collects indications.
//!
//! # Architecture
//!
//! A [`Broker`] owns one heap-pinned `BrokerShared`. Its `CMPIBroker`
//! envelope's `hdl` points back at it, which is how the service table finds the
//! registry, the thread registry and the indication queue from `mb` alone.
//!
//! Every call into a provider runs inside a fresh memory arena (see
//! [`memory`]); request-scoped context and result objects are destroyed when
//! the call returns.

pub(crate) mod convert;
pub(crate) mod encaps;
pub(crate) mod ext;
pub(crate) mod indications;
pub mod memory;
pub(crate) mod native;
pub(crate) mod objects;
pub(crate) mod registry;
pub(crate) mod request;
pub(crate) mod services;
pub(crate) mod threads;

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::{c_void, CString};
use std::ptr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{BrokerConfig, ConfigError, ConfigResult};
use crate::engine::{MiKind, ProviderFactory, ProviderLibrary, StaticFactories};
use crate::flags::Capabilities;
use crate::handles::BrokerHandle;
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult, ReturnCode};
use crate::value::{Data, InstanceData, NamedData, ObjectPathData, SelectExpData, Value};

use self::convert::to_cmpi;
use self::indications::Indications;
use self::native::Scope;
use self::objects::args::NativeArgs;
use self::objects::context::NativeContext;
use self::objects::{args, context, instance, object_path, query};
use self::registry::LoadedMi;
use self::request::{dispatch, OptCStr, Target};
use self::threads::{CallMark, ThreadRegistry};
use crate::value::raw::PropertyNames;

pub use indications::{IndicationEvent, DEFAULT_QUEUE_CAPACITY};
pub use memory::ArenaGuard;
pub use registry::{ProviderKey, ProviderRegistration, ProviderRegistry};
pub use request::{AssocFilter, MethodOutput, RequestContext};

/// State reachable from the `CMPIBroker` handed to providers
pub(crate) struct BrokerShared {
    envelope: CMPIBroker,
    _bft: Box<CMPIBrokerFT>,
    _name: CString,
    capabilities: Capabilities,
    pub(crate) registry: ProviderRegistry,
    pub(crate) indications: Indications,
    pub(crate) threads: ThreadRegistry,
}

// SAFETY: the envelope only points at immutable tables and at the
// BrokerShared itself; all mutable state is behind locks.
unsafe impl Send for BrokerShared {}
unsafe impl Sync for BrokerShared {}

impl BrokerShared {
    pub(crate) fn as_ptr(&self) -> *const CMPIBroker {
        &self.envelope
    }
}

/// Builder for a [`Broker`]
#[derive(Debug, Clone)]
pub struct BrokerBuilder {
    name: String,
    capabilities: Capabilities,
    indication_queue: usize,
}

impl Default for BrokerBuilder {
    fn default() -> Self {
        Self {
            name: "cmpi-rs".to_string(),
            capabilities: Capabilities::all(),
            indication_queue: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl BrokerBuilder {
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn indication_queue(mut self, capacity: usize) -> Self {
        self.indication_queue = capacity;
        self
    }

    pub fn build(self) -> Broker {
        let name = string_lossy(&self.name);
        let bft = Box::new(services::broker_ft(self.capabilities.bits(), name.as_ptr()));
        let mut shared = Box::new(BrokerShared {
            envelope: CMPIBroker {
                hdl: ptr::null_mut(),
                bft: &*bft,
                eft: &encaps::ENC_FT,
                xft: &ext::EXT_FT,
                mft: &memory::MEM_FT,
            },
            _bft: bft,
            _name: name,
            capabilities: self.capabilities,
            registry: ProviderRegistry::new(),
            indications: Indications::new(self.indication_queue),
            threads: ThreadRegistry::new(),
        });
        let hdl: *mut BrokerShared = &mut *shared;
        shared.envelope.hdl = hdl.cast::<c_void>();
        tracing::info!("Broker {} created", self.name);
        Broker { shared }
    }
}

fn string_lossy(s: &str) -> CString {
    objects::string::c_lossy(s)
}

/// The reference broker
///
/// Dropping the broker cleans up every loaded provider.
pub struct Broker {
    shared: Box<BrokerShared>,
}

impl Default for Broker {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("name", &self.name())
            .field("providers", &self.shared.registry.len())
            .finish()
    }
}

impl Broker {
    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::default()
    }

    /// Broker with the providers a config file lists
    ///
    /// Providers with a `module` are loaded from shared libraries found in
    /// `provider_dir`; the rest must be present in `statics`.
    pub fn from_config(config: &BrokerConfig, statics: Option<Arc<StaticFactories>>) -> ConfigResult<Self> {
        let broker = Self::builder()
            .name(&config.name)
            .capabilities(config.capability_flags()?)
            .indication_queue(config.indication_queue)
            .build();

        let dir = config.provider_dir();
        let mut libraries: HashMap<String, Arc<ProviderLibrary>> = HashMap::new();
        for provider in &config.providers {
            let load_err = |source| ConfigError::Provider {
                provider: provider.name.clone(),
                source,
            };
            let factory = match &provider.module {
                Some(module) => {
                    let library = match libraries.get(module) {
                        Some(lib) => Arc::clone(lib),
                        None => {
                            let lib = Arc::new(ProviderLibrary::open(module, dir.as_deref()).map_err(load_err)?);
                            libraries.insert(module.clone(), Arc::clone(&lib));
                            lib
                        }
                    };
                    ProviderFactory::from_library(&provider.name, library).map_err(load_err)?
                }
                None => {
                    let table = statics.clone().unwrap_or_default();
                    ProviderFactory::from_static(&provider.name, table).map_err(load_err)?
                }
            };

            let mut registration = ProviderRegistration::new(factory);
            registration.namespaces = provider.namespaces.clone();
            registration.classes = provider.classes.clone();
            for kind in provider.mi_kinds()? {
                registration = registration.kind(kind);
            }
            broker.register(registration);
        }
        Ok(broker)
    }

    /// The broker envelope handed to providers
    pub fn as_ptr(&self) -> *const CMPIBroker {
        self.shared.as_ptr()
    }

    /// Typed handle for calling this broker's tables directly
    pub fn handle(&self) -> CmpiResult<BrokerHandle> {
        // SAFETY: the envelope and its tables live as long as the broker
        unsafe { BrokerHandle::from_raw(self.as_ptr()) }
    }

    pub fn name(&self) -> &str {
        self.shared._name.to_str().unwrap_or_default()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.shared.capabilities
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.shared.registry
    }

    pub fn register(&self, registration: ProviderRegistration) -> ProviderKey {
        self.shared.registry.register(registration)
    }

    /// Remove a provider, cleaning up its loaded MIs
    pub fn unregister(&self, key: ProviderKey) -> bool {
        let Some(mis) = self.shared.registry.unregister(key) else {
            return false;
        };
        self.shared.indications.forget(key);
        with_call_context(|ctx| unsafe { self.shared.registry.cleanup_removed(mis, ctx) });
        true
    }

    /// Offer idle providers a chance to unload; returns how many did
    pub fn unload_idle(&self) -> usize {
        with_call_context(|ctx| unsafe { self.shared.registry.cleanup(ctx, false) })
    }

    /// Clean up every loaded provider; they cannot refuse
    pub fn shutdown(&self) {
        let unloaded = with_call_context(|ctx| unsafe { self.shared.registry.cleanup(ctx, true) });
        self.shared.threads.clear();
        tracing::info!("Broker {} shut down, {} MIs unloaded", self.name(), unloaded);
    }

    // ========================================================================
    // Instance requests
    // ========================================================================

    /// Route a request for `path` to its provider
    fn call<F>(
        &self,
        req: &RequestContext,
        path: &ObjectPathData,
        class_name: Option<&str>,
        kind: MiKind,
        call: F,
    ) -> CmpiResult<Vec<Data>>
    where
        F: FnOnce(&LoadedMi, *const CMPIContext, *const CMPIResult, *const CMPIObjectPath) -> CmpiResult<CMPIStatus>,
    {
        if path.namespace.is_empty() {
            return Err(CmpiError::with_message(ReturnCode::ErrInvalidNamespace, "path has no namespace"));
        }
        let target = Target {
            namespace: &path.namespace,
            class_name: class_name.unwrap_or(&path.class_name),
            kind,
        };
        // SAFETY: every handle passed to the provider is created inside the call's arena
        unsafe {
            dispatch(&self.shared, target, req.entries(&path.namespace), |mi, ctx, rslt| {
                let op = object_path::create(path.clone(), Scope::Tracked);
                call(mi, ctx, rslt, op)
            })
        }
    }

    #[tracing::instrument(skip(self, req), fields(class = %class_path.class_name))]
    pub fn enumerate_instance_names(
        &self,
        req: &RequestContext,
        class_path: &ObjectPathData,
    ) -> CmpiResult<Vec<ObjectPathData>> {
        let items = self.call(req, class_path, None, MiKind::Instance, |mi, ctx, rslt, op| unsafe {
            let m = mi.envelope::<CMPIInstanceMI>();
            Ok(((*(*m).ft).enumerateInstanceNames)(m, ctx, rslt, op))
        })?;
        Ok(paths(items))
    }

    #[tracing::instrument(skip(self, req, properties), fields(class = %class_path.class_name))]
    pub fn enumerate_instances(
        &self,
        req: &RequestContext,
        class_path: &ObjectPathData,
        properties: Option<&[String]>,
    ) -> CmpiResult<Vec<InstanceData>> {
        let names = PropertyNames::new(properties)?;
        let items = self.call(req, class_path, None, MiKind::Instance, |mi, ctx, rslt, op| unsafe {
            let m = mi.envelope::<CMPIInstanceMI>();
            Ok(((*(*m).ft).enumerateInstances)(m, ctx, rslt, op, names.as_ptr()))
        })?;
        Ok(instances(items))
    }

    #[tracing::instrument(skip(self, req, properties), fields(path = %path))]
    pub fn get_instance(
        &self,
        req: &RequestContext,
        path: &ObjectPathData,
        properties: Option<&[String]>,
    ) -> CmpiResult<InstanceData> {
        let names = PropertyNames::new(properties)?;
        let items = self.call(req, path, None, MiKind::Instance, |mi, ctx, rslt, op| unsafe {
            let m = mi.envelope::<CMPIInstanceMI>();
            Ok(((*(*m).ft).getInstance)(m, ctx, rslt, op, names.as_ptr()))
        })?;
        instances(items)
            .into_iter()
            .next()
            .ok_or_else(|| CmpiError::not_found(path.to_string()))
    }

    /// Create `instance`; returns the path the provider assigned
    #[tracing::instrument(skip(self, req, instance), fields(class = %instance.path.class_name))]
    pub fn create_instance(&self, req: &RequestContext, instance: &InstanceData) -> CmpiResult<ObjectPathData> {
        let class_path = instance.path.class_path();
        let items = self.call(req, &class_path, None, MiKind::Instance, |mi, ctx, rslt, op| unsafe {
            let inst = instance::create(instance.clone(), Scope::Tracked);
            let m = mi.envelope::<CMPIInstanceMI>();
            Ok(((*(*m).ft).createInstance)(m, ctx, rslt, op, inst))
        })?;
        Ok(paths(items).into_iter().next().unwrap_or_else(|| instance.path.clone()))
    }

    /// Replace the instance at `instance.path`, limited to `properties` when given
    #[tracing::instrument(skip(self, req, instance, properties), fields(path = %instance.path))]
    pub fn modify_instance(
        &self,
        req: &RequestContext,
        instance: &InstanceData,
        properties: Option<&[String]>,
    ) -> CmpiResult<()> {
        let names = PropertyNames::new(properties)?;
        self.call(req, &instance.path, None, MiKind::Instance, |mi, ctx, rslt, op| unsafe {
            let inst = instance::create(instance.clone(), Scope::Tracked);
            let m = mi.envelope::<CMPIInstanceMI>();
            Ok(((*(*m).ft).modifyInstance)(m, ctx, rslt, op, inst, names.as_ptr()))
        })
        .map(drop)
    }

    #[tracing::instrument(skip(self, req), fields(path = %path))]
    pub fn delete_instance(&self, req: &RequestContext, path: &ObjectPathData) -> CmpiResult<()> {
        self.call(req, path, None, MiKind::Instance, |mi, ctx, rslt, op| unsafe {
            let m = mi.envelope::<CMPIInstanceMI>();
            Ok(((*(*m).ft).deleteInstance)(m, ctx, rslt, op))
        })
        .map(drop)
    }

    #[tracing::instrument(skip(self, req), fields(class = %class_path.class_name))]
    pub fn exec_query(
        &self,
        req: &RequestContext,
        class_path: &ObjectPathData,
        query: &str,
        language: &str,
    ) -> CmpiResult<Vec<InstanceData>> {
        let query = OptCStr::new(Some(query))?;
        let language = OptCStr::new(Some(language))?;
        let items = self.call(req, class_path, None, MiKind::Instance, |mi, ctx, rslt, op| unsafe {
            let m = mi.envelope::<CMPIInstanceMI>();
            Ok(((*(*m).ft).execQuery)(m, ctx, rslt, op, query.as_ptr(), language.as_ptr()))
        })?;
        Ok(instances(items))
    }

    // ========================================================================
    // Association requests
    //
    // Routed by the association class when one is given, else by the class
    // of the source object.
    // ========================================================================

    #[tracing::instrument(skip(self, req, filter, properties), fields(path = %path))]
    pub fn associators(
        &self,
        req: &RequestContext,
        path: &ObjectPathData,
        filter: &AssocFilter,
        properties: Option<&[String]>,
    ) -> CmpiResult<Vec<InstanceData>> {
        let (assoc_class, result_class) = (OptCStr::new(filter.assoc_class.as_deref())?, OptCStr::new(filter.result_class.as_deref())?);
        let (role, result_role) = (OptCStr::new(filter.role.as_deref())?, OptCStr::new(filter.result_role.as_deref())?);
        let names = PropertyNames::new(properties)?;
        let items = self.call(req, path, filter.assoc_class.as_deref(), MiKind::Association, |mi, ctx, rslt, op| unsafe {
            let m = mi.envelope::<CMPIAssociationMI>();
            Ok(((*(*m).ft).associators)(
                m,
                ctx,
                rslt,
                op,
                assoc_class.as_ptr(),
                result_class.as_ptr(),
                role.as_ptr(),
                result_role.as_ptr(),
                names.as_ptr(),
            ))
        })?;
        Ok(instances(items))
    }

    #[tracing::instrument(skip(self, req, filter), fields(path = %path))]
    pub fn associator_names(
        &self,
        req: &RequestContext,
        path: &ObjectPathData,
        filter: &AssocFilter,
    ) -> CmpiResult<Vec<ObjectPathData>> {
        let (assoc_class, result_class) = (OptCStr::new(filter.assoc_class.as_deref())?, OptCStr::new(filter.result_class.as_deref())?);
        let (role, result_role) = (OptCStr::new(filter.role.as_deref())?, OptCStr::new(filter.result_role.as_deref())?);
        let items = self.call(req, path, filter.assoc_class.as_deref(), MiKind::Association, |mi, ctx, rslt, op| unsafe {
            let m = mi.envelope::<CMPIAssociationMI>();
            Ok(((*(*m).ft).associatorNames)(
                m,
                ctx,
                rslt,
                op,
                assoc_class.as_ptr(),
                result_class.as_ptr(),
                role.as_ptr(),
                result_role.as_ptr(),
            ))
        })?;
        Ok(paths(items))
    }

    /// Association instances referring to `path`; `result_class` names the association class
    #[tracing::instrument(skip(self, req, properties), fields(path = %path))]
    pub fn references(
        &self,
        req: &RequestContext,
        path: &ObjectPathData,
        result_class: Option<&str>,
        role: Option<&str>,
        properties: Option<&[String]>,
    ) -> CmpiResult<Vec<InstanceData>> {
        let (c_result_class, c_role) = (OptCStr::new(result_class)?, OptCStr::new(role)?);
        let names = PropertyNames::new(properties)?;
        let items = self.call(req, path, result_class, MiKind::Association, |mi, ctx, rslt, op| unsafe {
            let m = mi.envelope::<CMPIAssociationMI>();
            Ok(((*(*m).ft).references)(m, ctx, rslt, op, c_result_class.as_ptr(), c_role.as_ptr(), names.as_ptr()))
        })?;
        Ok(instances(items))
    }

    #[tracing::instrument(skip(self, req), fields(path = %path))]
    pub fn reference_names(
        &self,
        req: &RequestContext,
        path: &ObjectPathData,
        result_class: Option<&str>,
        role: Option<&str>,
    ) -> CmpiResult<Vec<ObjectPathData>> {
        let (c_result_class, c_role) = (OptCStr::new(result_class)?, OptCStr::new(role)?);
        let items = self.call(req, path, result_class, MiKind::Association, |mi, ctx, rslt, op| unsafe {
            let m = mi.envelope::<CMPIAssociationMI>();
            Ok(((*(*m).ft).referenceNames)(m, ctx, rslt, op, c_result_class.as_ptr(), c_role.as_ptr()))
        })?;
        Ok(paths(items))
    }

    // ========================================================================
    // Methods and properties
    // ========================================================================

    #[tracing::instrument(skip(self, req, in_args), fields(path = %path))]
    pub fn invoke_method(
        &self,
        req: &RequestContext,
        path: &ObjectPathData,
        method: &str,
        in_args: &NamedData,
    ) -> CmpiResult<MethodOutput> {
        let c_method = OptCStr::new(Some(method))?;
        let out_args = args::create(NamedData::new(), Scope::Request);
        let items = self.call(req, path, None, MiKind::Method, |mi, ctx, rslt, op| unsafe {
            let in_handle = args::create(in_args.clone(), Scope::Tracked);
            let m = mi.envelope::<CMPIMethodMI>();
            Ok(((*(*m).ft).invokeMethod)(m, ctx, rslt, op, c_method.as_ptr(), in_handle, out_args))
        });
        // SAFETY: created above with Request scope; providers cannot release it
        let out = unsafe {
            let out = NativeArgs::try_from_handle(out_args, &args::ARGS_FT)
                .map(|o| std::mem::take(&mut *o.lock()))
                .unwrap_or_default();
            NativeArgs::destroy(out_args);
            out
        };
        Ok(MethodOutput {
            value: items?.into_iter().next(),
            out,
        })
    }

    #[tracing::instrument(skip(self, req), fields(path = %path))]
    pub fn get_property(&self, req: &RequestContext, path: &ObjectPathData, name: &str) -> CmpiResult<Data> {
        let c_name = OptCStr::new(Some(name))?;
        let items = self.call(req, path, None, MiKind::Property, |mi, ctx, rslt, op| unsafe {
            let m = mi.envelope::<CMPIPropertyMI>();
            Ok(((*(*m).ft).getProperty)(m, ctx, rslt, op, c_name.as_ptr()))
        })?;
        items.into_iter().next().ok_or_else(|| CmpiError::no_such_property(name))
    }

    /// Set a property; `origin` selects `setPropertyWithOrigin`
    #[tracing::instrument(skip(self, req, data), fields(path = %path))]
    pub fn set_property(
        &self,
        req: &RequestContext,
        path: &ObjectPathData,
        name: &str,
        data: &Data,
        origin: Option<&str>,
    ) -> CmpiResult<()> {
        let c_name = OptCStr::new(Some(name))?;
        let c_origin = OptCStr::new(origin)?;
        self.call(req, path, None, MiKind::Property, |mi, ctx, rslt, op| unsafe {
            let raw = to_cmpi(data);
            let m = mi.envelope::<CMPIPropertyMI>();
            let ft = &*(*m).ft;
            Ok(match origin {
                Some(_) => (ft.setPropertyWithOrigin)(m, ctx, rslt, op, c_name.as_ptr(), raw, c_origin.as_ptr()),
                None => (ft.setProperty)(m, ctx, rslt, op, c_name.as_ptr(), raw),
            })
        })
        .map(drop)
    }

    // ========================================================================
    // Indications
    // ========================================================================

    /// Activate `filter` on the indication provider for `class_name`
    ///
    /// The provider is asked to authorize the filter first; a provider that
    /// does not implement `authorizeFilter` accepts every filter. The first
    /// active filter of a provider also enables its indications.
    #[tracing::instrument(skip(self, req, filter), fields(query = %filter.query))]
    pub fn activate_filter(
        &self,
        req: &RequestContext,
        namespace: &str,
        class_name: &str,
        filter: &SelectExpData,
        owner: Option<&str>,
    ) -> CmpiResult<()> {
        let key = self.indication_provider(namespace, class_name)?;
        let transition = self.shared.indications.activate(key, &filter.query, class_name);
        let c_class = OptCStr::new(Some(class_name))?;
        let c_owner = OptCStr::new(owner)?;
        let class_path = ObjectPathData::new(namespace, class_name);

        let out = self.call(req, &class_path, None, MiKind::Indication, |mi, ctx, _rslt, op| unsafe {
            let se = query::create_select_exp(filter.clone(), Scope::Tracked);
            let m = mi.envelope::<CMPIIndicationMI>();
            let ft = &*(*m).ft;
            match CmpiError::check((ft.authorizeFilter)(m, ctx, se, c_class.as_ptr(), op, c_owner.as_ptr())) {
                Err(err) if !err.is(ReturnCode::ErrNotSupported) => return Err(err),
                _ => {}
            }
            CmpiError::check((ft.activateFilter)(m, ctx, se, c_class.as_ptr(), op, u8::from(transition.filter_edge)))?;
            if transition.provider_edge {
                tracing::debug!("enabling indications of {}", mi.provider());
                if let Err(err) = CmpiError::check((ft.enableIndications)(m, ctx)) {
                    // the provider holds the filter now; take it back before the count is rolled back
                    let undo = (ft.deActivateFilter)(m, ctx, se, c_class.as_ptr(), op, u8::from(transition.filter_edge));
                    if let Err(undo_err) = CmpiError::check(undo) {
                        tracing::warn!("{} kept filter after failed enable: {}", mi.provider(), undo_err);
                    }
                    return Err(err);
                }
            }
            Ok(CMPIStatus::ok())
        });
        if out.is_err() {
            self.shared.indications.rollback(key, &filter.query, class_name);
        }
        out.map(drop)
    }

    /// Deactivate `filter`; the last active filter of a provider disables its indications
    #[tracing::instrument(skip(self, req, filter), fields(query = %filter.query))]
    pub fn deactivate_filter(
        &self,
        req: &RequestContext,
        namespace: &str,
        class_name: &str,
        filter: &SelectExpData,
    ) -> CmpiResult<()> {
        let key = self.indication_provider(namespace, class_name)?;
        let transition = self.shared.indications.deactivate(key, &filter.query, class_name)?;
        let c_class = OptCStr::new(Some(class_name))?;
        let class_path = ObjectPathData::new(namespace, class_name);
        let deactivated = Cell::new(false);

        let out = self.call(req, &class_path, None, MiKind::Indication, |mi, ctx, _rslt, op| unsafe {
            let se = query::create_select_exp(filter.clone(), Scope::Tracked);
            let m = mi.envelope::<CMPIIndicationMI>();
            let ft = &*(*m).ft;
            CmpiError::check((ft.deActivateFilter)(m, ctx, se, c_class.as_ptr(), op, u8::from(transition.filter_edge)))?;
            deactivated.set(true);
            if transition.provider_edge {
                tracing::debug!("disabling indications of {}", mi.provider());
                return Ok((ft.disableIndications)(m, ctx));
            }
            Ok(CMPIStatus::ok())
        });
        if out.is_err() && !deactivated.get() {
            // the provider still has the filter
            self.shared.indications.restore(key, &filter.query, class_name);
        }
        out.map(drop)
    }

    fn indication_provider(&self, namespace: &str, class_name: &str) -> CmpiResult<ProviderKey> {
        self.shared
            .registry
            .find(namespace, class_name, MiKind::Indication)
            .ok_or_else(|| {
                CmpiError::with_message(
                    ReturnCode::ErrInvalidClass,
                    format!("no indication provider for {namespace}:{class_name}"),
                )
            })
    }

    /// Every indication delivered so far
    pub fn drain_indications(&self) -> Vec<IndicationEvent> {
        self.shared.indications.drain()
    }

    /// Wait up to `timeout` for the next indication
    pub fn next_indication(&self, timeout: Duration) -> Option<IndicationEvent> {
        self.shared.indications.recv_timeout(timeout)
    }

    pub fn queued_indications(&self) -> usize {
        self.shared.indications.queued()
    }

    /// Threads currently attached through `attachThread`
    pub fn attached_threads(&self) -> usize {
        self.shared.threads.attached_count()
    }
}

impl Drop for Broker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run `f` with a throwaway request context, as during a provider call
fn with_call_context<R>(f: impl FnOnce(*const CMPIContext) -> R) -> R {
    let depth = memory::push();
    let _mark = CallMark::enter();
    let ctx = context::create(NamedData::new(), Scope::Request);
    let out = f(ctx);
    // SAFETY: request-scoped and not used after this
    unsafe { NativeContext::destroy(ctx) };
    memory::pop_to(depth);
    out
}

fn paths(items: Vec<Data>) -> Vec<ObjectPathData> {
    items
        .into_iter()
        .filter_map(|d| match d.into_value() {
            Some(Value::Ref(path)) => Some(path),
            other => {
                tracing::warn!("ignoring non-reference result item: {:?}", other);
                None
            }
        })
        .collect()
}

fn instances(items: Vec<Data>) -> Vec<InstanceData> {
    items
        .into_iter()
        .filter_map(|d| match d.into_value() {
            Some(Value::Instance(inst)) => Some(*inst),
            other => {
                tracing::warn!("ignoring non-instance result item: {:?}", other);
                None
            }
        })
        .collect()
}

/// Owned context for calling MI slots directly in tests
#[cfg(test)]
pub(crate) fn test_context() -> *mut CMPIContext {
    context::create(NamedData::new().with(CMPIInitNameSpace, "root/test"), Scope::Owned)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::handles::{ArgsRef, ContextRef, InstanceRef, ObjectPathRef, ResultRef, SelectExpRef};
    use crate::provider::{
        AssociationProvider, IndicationProvider, InstanceProvider, MethodProvider, PropertyProvider, Provider,
        ProviderExport,
    };
    use crate::value::{PredOp, PredicateData};
    use crate::CmpiProvider;

    const NS: &str = "root/test";

    fn broker_with<P: ProviderExport>(class: &str) -> Broker {
        let mut table = StaticFactories::default();
        P::register_static(&mut table);
        let factory = ProviderFactory::from_static(P::name(), Arc::new(table)).unwrap();
        let mut registration = ProviderRegistration::new(factory).namespace(NS).class(class);
        for kind in P::KINDS {
            registration = registration.kind(*kind);
        }
        let broker = Broker::default();
        broker.register(registration);
        broker
    }

    fn int_key(path: &ObjectPathData, name: &str) -> Option<i128> {
        path.key(name).and_then(Data::value).and_then(Value::as_integer)
    }

    fn fan(id: u32, rpm: u32) -> InstanceData {
        InstanceData::new(ObjectPathData::new(NS, "TestFan_Fan").with_key("Id", id))
            .with_property("Id", id)
            .with_property("Rpm", rpm)
    }

    // ------------------------------------------------------------------------
    // Instance, method and property provider
    // ------------------------------------------------------------------------

    #[derive(CmpiProvider)]
    #[cmpi(name = "TestFan", instance, method, property)]
    struct Fans {
        fans: Mutex<Vec<InstanceData>>,
    }

    impl Fans {
        fn id(path: &ObjectPathRef) -> CmpiResult<i128> {
            path.key("Id")?
                .value()
                .and_then(Value::as_integer)
                .ok_or_else(|| CmpiError::invalid_parameter("Id"))
        }

        fn with_fan<T>(&self, path: &ObjectPathRef, f: impl FnOnce(&mut InstanceData) -> T) -> CmpiResult<T> {
            let id = Self::id(path)?;
            let mut fans = self.fans.lock();
            let fan = fans
                .iter_mut()
                .find(|f| int_key(&f.path, "Id") == Some(id))
                .ok_or_else(|| CmpiError::not_found(format!("no fan {id}")))?;
            Ok(f(fan))
        }
    }

    impl Provider for Fans {
        fn initialize(_broker: BrokerHandle, _ctx: &ContextRef) -> CmpiResult<Self> {
            Ok(Fans {
                fans: Mutex::new(vec![fan(1, 1000), fan(2, 1500)]),
            })
        }
    }

    impl InstanceProvider for Fans {
        fn enumerate_instance_names(
            &self,
            _ctx: &ContextRef,
            rslt: &ResultRef,
            _class_path: &ObjectPathRef,
        ) -> CmpiResult<()> {
            for fan in self.fans.lock().iter() {
                rslt.return_path_data(&fan.path)?;
            }
            rslt.return_done()
        }

        fn enumerate_instances(
            &self,
            _ctx: &ContextRef,
            rslt: &ResultRef,
            _class_path: &ObjectPathRef,
            properties: Option<&[String]>,
        ) -> CmpiResult<()> {
            for fan in self.fans.lock().iter() {
                rslt.return_instance_data(&fan.projected(properties))?;
            }
            rslt.return_done()
        }

        fn get_instance(
            &self,
            _ctx: &ContextRef,
            rslt: &ResultRef,
            path: &ObjectPathRef,
            properties: Option<&[String]>,
        ) -> CmpiResult<()> {
            let fan = self.with_fan(path, |f| f.projected(properties))?;
            rslt.return_instance_data(&fan)?;
            rslt.return_done()
        }

        fn create_instance(
            &self,
            _ctx: &ContextRef,
            rslt: &ResultRef,
            _class_path: &ObjectPathRef,
            instance: &InstanceRef,
        ) -> CmpiResult<()> {
            let new = instance.to_data()?;
            let id = int_key(&new.path, "Id");
            let mut fans = self.fans.lock();
            if fans.iter().any(|f| int_key(&f.path, "Id") == id) {
                return Err(CmpiError::new(ReturnCode::ErrAlreadyExists));
            }
            rslt.return_path_data(&new.path)?;
            fans.push(new);
            rslt.return_done()
        }

        fn modify_instance(
            &self,
            _ctx: &ContextRef,
            rslt: &ResultRef,
            path: &ObjectPathRef,
            instance: &InstanceRef,
            properties: Option<&[String]>,
        ) -> CmpiResult<()> {
            let update = instance.to_data()?.projected(properties);
            self.with_fan(path, |fan| {
                for p in &update.properties {
                    fan.set_property(&p.name, p.data.clone(), None);
                }
            })?;
            rslt.return_done()
        }

        fn delete_instance(&self, _ctx: &ContextRef, rslt: &ResultRef, path: &ObjectPathRef) -> CmpiResult<()> {
            let id = Self::id(path)?;
            let mut fans = self.fans.lock();
            let before = fans.len();
            fans.retain(|f| int_key(&f.path, "Id") != Some(id));
            if fans.len() == before {
                return Err(CmpiError::not_found(format!("no fan {id}")));
            }
            rslt.return_done()
        }
    }

    impl MethodProvider for Fans {
        fn invoke_method(
            &self,
            _ctx: &ContextRef,
            rslt: &ResultRef,
            path: &ObjectPathRef,
            method: &str,
            in_args: &ArgsRef,
            out: &ArgsRef,
        ) -> CmpiResult<()> {
            if method != "SetRpm" {
                return Err(CmpiError::new(ReturnCode::ErrMethodNotFound));
            }
            let rpm = in_args.arg("Rpm")?;
            let previous = self.with_fan(path, |fan| {
                let previous = fan.property("Rpm").cloned();
                fan.set_property("Rpm", rpm, None);
                previous
            })?;
            if let Some(previous) = previous {
                out.add_arg("Previous", &previous)?;
            }
            rslt.return_data(&Data::new(0u32))?;
            rslt.return_done()
        }
    }

    impl PropertyProvider for Fans {
        fn set_property(
            &self,
            _ctx: &ContextRef,
            rslt: &ResultRef,
            path: &ObjectPathRef,
            name: &str,
            data: &Data,
        ) -> CmpiResult<()> {
            self.with_fan(path, |fan| fan.set_property(name, data.clone(), None))?;
            rslt.return_done()
        }

        fn get_property(&self, _ctx: &ContextRef, rslt: &ResultRef, path: &ObjectPathRef, name: &str) -> CmpiResult<()> {
            let data = self
                .with_fan(path, |fan| fan.property(name).cloned())?
                .ok_or_else(|| CmpiError::no_such_property(name))?;
            rslt.return_data(&data)?;
            rslt.return_done()
        }
    }

    #[test]
    fn test_instance_lifecycle() {
        let broker = broker_with::<Fans>("TestFan_Fan");
        let req = RequestContext::new().principal("admin");
        let class = ObjectPathData::new(NS, "TestFan_Fan");

        let names = broker.enumerate_instance_names(&req, &class).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names[0].namespace, NS);

        let only_rpm = ["Rpm".to_string()];
        let all = broker.enumerate_instances(&req, &class, Some(&only_rpm)).unwrap();
        assert_eq!(all.len(), 2);
        let second = broker.get_instance(&req, &names[1], None).unwrap();
        assert_eq!(second.property("Rpm").and_then(Data::value), Some(&Value::Uint32(1500)));

        let created = broker.create_instance(&req, &fan(3, 800)).unwrap();
        assert_eq!(int_key(&created, "Id"), Some(3));
        let dup = broker.create_instance(&req, &fan(3, 800)).unwrap_err();
        assert!(dup.is(ReturnCode::ErrAlreadyExists));

        broker.modify_instance(&req, &fan(3, 900), None).unwrap();
        let third = broker.get_instance(&req, &created, None).unwrap();
        assert_eq!(third.property("Rpm").and_then(Data::value), Some(&Value::Uint32(900)));

        broker.delete_instance(&req, &created).unwrap();
        let gone = broker.delete_instance(&req, &created).unwrap_err();
        assert!(gone.is(ReturnCode::ErrNotFound));
        assert_eq!(gone.text(), Some("no fan 3"));

        // not implemented by the provider
        let err = broker.exec_query(&req, &class, "SELECT * FROM TestFan_Fan", "WQL").unwrap_err();
        assert!(err.is(ReturnCode::ErrNotSupported));
    }

    #[test]
    fn test_method_and_properties() {
        let broker = broker_with::<Fans>("TestFan_Fan");
        let req = RequestContext::new();
        let first = ObjectPathData::new(NS, "TestFan_Fan").with_key("Id", 1u32);

        let out = broker
            .invoke_method(&req, &first, "SetRpm", &NamedData::new().with("Rpm", 1200u32))
            .unwrap();
        assert_eq!(out.value.as_ref().and_then(Data::value), Some(&Value::Uint32(0)));
        assert_eq!(out.out.get("Previous").and_then(Data::value), Some(&Value::Uint32(1000)));

        let err = broker.invoke_method(&req, &first, "Explode", &NamedData::new()).unwrap_err();
        assert!(err.is(ReturnCode::ErrMethodNotFound));

        let rpm = broker.get_property(&req, &first, "Rpm").unwrap();
        assert_eq!(rpm.value(), Some(&Value::Uint32(1200)));

        broker
            .set_property(&req, &first, "Rpm", &Data::new(700u32), Some("TestFan_Fan"))
            .unwrap();
        let rpm = broker.get_property(&req, &first, "Rpm").unwrap();
        assert_eq!(rpm.value(), Some(&Value::Uint32(700)));

        let err = broker.get_property(&req, &first, "Color").unwrap_err();
        assert!(err.is(ReturnCode::ErrNoSuchProperty));
    }

    #[test]
    fn test_routing_errors() {
        let broker = broker_with::<Fans>("TestFan_Fan");
        let req = RequestContext::new();

        let err = broker
            .enumerate_instance_names(&req, &ObjectPathData::new(NS, "TestFan_Other"))
            .unwrap_err();
        assert!(err.is(ReturnCode::ErrInvalidClass));

        let err = broker
            .enumerate_instance_names(&req, &ObjectPathData::new("root/elsewhere", "TestFan_Fan"))
            .unwrap_err();
        assert!(err.is(ReturnCode::ErrInvalidClass));

        let err = broker
            .enumerate_instance_names(&req, &ObjectPathData::new("", "TestFan_Fan"))
            .unwrap_err();
        assert!(err.is(ReturnCode::ErrInvalidNamespace));
    }

    // ------------------------------------------------------------------------
    // Association provider
    // ------------------------------------------------------------------------

    #[derive(CmpiProvider)]
    #[cmpi(name = "TestRack", association)]
    struct Racks;

    impl Provider for Racks {
        fn initialize(_broker: BrokerHandle, _ctx: &ContextRef) -> CmpiResult<Self> {
            Ok(Racks)
        }
    }

    impl Racks {
        fn rack(ns: &str) -> InstanceData {
            InstanceData::new(ObjectPathData::new(ns, "TestFan_Rack").with_key("Name", "A")).with_property("Name", "A")
        }

        fn link(source: &ObjectPathData) -> InstanceData {
            let rack = Self::rack(&source.namespace).path;
            InstanceData::new(
                ObjectPathData::new(&source.namespace, "TestFan_FanInRack")
                    .with_key("Fan", source.clone())
                    .with_key("Rack", rack.clone()),
            )
            .with_property("Fan", source.clone())
            .with_property("Rack", rack)
        }

        fn wants_rack(filter: &AssocFilter) -> bool {
            filter
                .result_class
                .as_deref()
                .map_or(true, |c| c.eq_ignore_ascii_case("TestFan_Rack"))
        }
    }

    impl AssociationProvider for Racks {
        fn associators(
            &self,
            _ctx: &ContextRef,
            rslt: &ResultRef,
            path: &ObjectPathRef,
            filter: &AssocFilter,
            properties: Option<&[String]>,
        ) -> CmpiResult<()> {
            if Self::wants_rack(filter) {
                rslt.return_instance_data(&Self::rack(&path.namespace()?).projected(properties))?;
            }
            rslt.return_done()
        }

        fn associator_names(
            &self,
            _ctx: &ContextRef,
            rslt: &ResultRef,
            path: &ObjectPathRef,
            filter: &AssocFilter,
        ) -> CmpiResult<()> {
            if Self::wants_rack(filter) {
                rslt.return_path_data(&Self::rack(&path.namespace()?).path)?;
            }
            rslt.return_done()
        }

        fn references(
            &self,
            _ctx: &ContextRef,
            rslt: &ResultRef,
            path: &ObjectPathRef,
            _result_class: Option<&str>,
            _role: Option<&str>,
            properties: Option<&[String]>,
        ) -> CmpiResult<()> {
            rslt.return_instance_data(&Self::link(&path.to_data()?).projected(properties))?;
            rslt.return_done()
        }

        fn reference_names(
            &self,
            _ctx: &ContextRef,
            rslt: &ResultRef,
            path: &ObjectPathRef,
            _result_class: Option<&str>,
            _role: Option<&str>,
        ) -> CmpiResult<()> {
            rslt.return_path_data(&Self::link(&path.to_data()?).path)?;
            rslt.return_done()
        }
    }

    #[test]
    fn test_association_traversal() {
        let broker = broker_with::<Racks>("TestFan_FanInRack");
        let req = RequestContext::new();
        let fan = ObjectPathData::new(NS, "TestFan_Fan").with_key("Id", 1u32);
        let via_link = AssocFilter {
            assoc_class: Some("TestFan_FanInRack".to_string()),
            ..AssocFilter::default()
        };

        let racks = broker.associator_names(&req, &fan, &via_link).unwrap();
        assert_eq!(racks.len(), 1);
        assert_eq!(racks[0].class_name, "TestFan_Rack");

        let shelves = AssocFilter {
            result_class: Some("TestFan_Shelf".to_string()),
            ..via_link.clone()
        };
        assert!(broker.associators(&req, &fan, &shelves, None).unwrap().is_empty());

        let links = broker.references(&req, &fan, Some("TestFan_FanInRack"), None, None).unwrap();
        assert_eq!(links.len(), 1);
        let linked = links[0].property("Fan").and_then(Data::value).and_then(Value::as_ref_path).unwrap();
        assert_eq!(linked.class_name, "TestFan_Fan");
        assert_eq!(int_key(linked, "Id"), Some(1));

        let names = broker.reference_names(&req, &fan, Some("TestFan_FanInRack"), None).unwrap();
        assert_eq!(names[0].class_name, "TestFan_FanInRack");

        // no association class: routed by TestFan_Fan, which nobody serves
        let err = broker.associator_names(&req, &fan, &AssocFilter::default()).unwrap_err();
        assert!(err.is(ReturnCode::ErrInvalidClass));
    }

    // ------------------------------------------------------------------------
    // Indication provider
    // ------------------------------------------------------------------------

    #[derive(CmpiProvider)]
    #[cmpi(name = "TestAlarm", indication, method)]
    struct Alarms {
        broker: BrokerHandle,
        enabled: AtomicBool,
        activations: Mutex<Vec<(String, bool)>>,
    }

    impl Provider for Alarms {
        fn initialize(broker: BrokerHandle, _ctx: &ContextRef) -> CmpiResult<Self> {
            Ok(Alarms {
                broker,
                enabled: AtomicBool::new(false),
                activations: Mutex::new(Vec::new()),
            })
        }
    }

    impl IndicationProvider for Alarms {
        fn authorize_filter(
            &self,
            _ctx: &ContextRef,
            filter: &SelectExpRef,
            _class_name: &str,
            _path: &ObjectPathRef,
            _owner: Option<&str>,
        ) -> CmpiResult<()> {
            if filter.query()?.contains("Secret") {
                return Err(CmpiError::new(ReturnCode::ErrAccessDenied));
            }
            Ok(())
        }

        fn activate_filter(
            &self,
            _ctx: &ContextRef,
            filter: &SelectExpRef,
            _class_name: &str,
            _path: &ObjectPathRef,
            first_activation: bool,
        ) -> CmpiResult<()> {
            self.activations.lock().push((filter.query()?, first_activation));
            Ok(())
        }

        fn deactivate_filter(
            &self,
            _ctx: &ContextRef,
            _filter: &SelectExpRef,
            _class_name: &str,
            _path: &ObjectPathRef,
            _last_activation: bool,
        ) -> CmpiResult<()> {
            Ok(())
        }

        fn enable_indications(&self, _ctx: &ContextRef) -> CmpiResult<()> {
            self.enabled.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn disable_indications(&self, _ctx: &ContextRef) -> CmpiResult<()> {
            self.enabled.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    impl MethodProvider for Alarms {
        /// `Fire` delivers one alarm from a provider-owned thread
        fn invoke_method(
            &self,
            ctx: &ContextRef,
            rslt: &ResultRef,
            path: &ObjectPathRef,
            _method: &str,
            _in_args: &ArgsRef,
            _out: &ArgsRef,
        ) -> CmpiResult<()> {
            let namespace = path.namespace()?;
            let thread_ctx = self.broker.prepare_attach_thread(ctx)?;
            let broker = self.broker;
            let worker = std::thread::spawn(move || -> CmpiResult<()> {
                broker.attach_thread(&thread_ctx)?;
                let alarm = InstanceData::new(ObjectPathData::new(&namespace, "TestFan_Alarm")).with_property("Severity", 3u16);
                let delivered = broker
                    .new_instance_from(&alarm)
                    .and_then(|ind| broker.deliver_indication(&thread_ctx, &namespace, &ind));
                broker.detach_thread(&thread_ctx)?;
                delivered
            });
            worker.join().map_err(|_| CmpiError::failed("alarm thread panicked"))??;
            rslt.return_done()
        }
    }

    #[test]
    fn test_filter_activation_and_delivery() {
        let broker = broker_with::<Alarms>("TestFan_Alarm");
        let req = RequestContext::new();
        let filter = SelectExpData::all_of(
            "TestFan_Alarm",
            vec![PredicateData::new("Severity", PredOp::GreaterThanOrEquals, "2", CMPI_integerString)],
        );

        broker.activate_filter(&req, NS, "TestFan_Alarm", &filter, Some("admin")).unwrap();
        broker.activate_filter(&req, NS, "TestFan_Alarm", &filter, None).unwrap();
        let alarms = Alarms::base().state().unwrap();
        assert!(alarms.enabled.load(Ordering::SeqCst));
        assert_eq!(
            *alarms.activations.lock(),
            vec![(filter.query.clone(), true), (filter.query.clone(), false)]
        );

        let secret = SelectExpData::new("WQL", "SELECT * FROM TestFan_Alarm WHERE Secret = 1", Vec::new());
        let err = broker.activate_filter(&req, NS, "TestFan_Alarm", &secret, None).unwrap_err();
        assert!(err.is(ReturnCode::ErrAccessDenied));
        assert!(broker.deactivate_filter(&req, NS, "TestFan_Alarm", &secret).is_err());

        let path = ObjectPathData::new(NS, "TestFan_Alarm");
        broker.invoke_method(&req, &path, "Fire", &NamedData::new()).unwrap();
        let event = broker.next_indication(Duration::from_secs(5)).unwrap();
        assert_eq!(event.namespace, NS);
        assert_eq!(event.indication.class_name(), "TestFan_Alarm");
        assert!(filter.evaluate(&event.indication));
        assert_eq!(broker.attached_threads(), 0);

        broker.deactivate_filter(&req, NS, "TestFan_Alarm", &filter).unwrap();
        assert!(alarms.enabled.load(Ordering::SeqCst));
        broker.deactivate_filter(&req, NS, "TestFan_Alarm", &filter).unwrap();
        assert!(!alarms.enabled.load(Ordering::SeqCst));
        let err = broker.deactivate_filter(&req, NS, "TestFan_Alarm", &filter).unwrap_err();
        assert!(err.is(ReturnCode::ErrNotFound));

        let err = broker
            .activate_filter(&req, NS, "TestFan_Unknown", &filter, None)
            .unwrap_err();
        assert!(err.is(ReturnCode::ErrInvalidClass));
    }

    // ------------------------------------------------------------------------
    // Indication provider that refuses transitions
    // ------------------------------------------------------------------------

    #[derive(CmpiProvider)]
    #[cmpi(name = "TestSiren", indication)]
    struct Sirens {
        refuse_enable: AtomicBool,
        calls: Mutex<Vec<(&'static str, String, bool)>>,
    }

    impl Provider for Sirens {
        fn initialize(_broker: BrokerHandle, _ctx: &ContextRef) -> CmpiResult<Self> {
            Ok(Sirens {
                refuse_enable: AtomicBool::new(true),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl IndicationProvider for Sirens {
        fn activate_filter(
            &self,
            _ctx: &ContextRef,
            filter: &SelectExpRef,
            _class_name: &str,
            _path: &ObjectPathRef,
            first_activation: bool,
        ) -> CmpiResult<()> {
            self.calls.lock().push(("activate", filter.query()?, first_activation));
            Ok(())
        }

        /// Filters on `Sticky` cannot be deactivated
        fn deactivate_filter(
            &self,
            _ctx: &ContextRef,
            filter: &SelectExpRef,
            _class_name: &str,
            _path: &ObjectPathRef,
            last_activation: bool,
        ) -> CmpiResult<()> {
            let query = filter.query()?;
            let sticky = query.contains("Sticky");
            self.calls.lock().push(("deactivate", query, last_activation));
            if sticky {
                return Err(CmpiError::failed("filter is sticky"));
            }
            Ok(())
        }

        fn enable_indications(&self, _ctx: &ContextRef) -> CmpiResult<()> {
            if self.refuse_enable.load(Ordering::SeqCst) {
                return Err(CmpiError::failed("siren offline"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_refused_transitions_keep_counts() {
        let broker = broker_with::<Sirens>("TestFan_Siren");
        let req = RequestContext::new();
        let plain = SelectExpData::new("WQL", "SELECT * FROM TestFan_Siren", Vec::new());
        let sticky = SelectExpData::new("WQL", "SELECT * FROM TestFan_Siren WHERE Sticky = 1", Vec::new());

        // enable fails: the provider is told to drop the filter again
        let err = broker.activate_filter(&req, NS, "TestFan_Siren", &plain, None).unwrap_err();
        assert!(err.is(ReturnCode::ErrFailed));
        let sirens = Sirens::base().state().unwrap();
        assert_eq!(
            sirens.calls.lock().drain(..).collect::<Vec<_>>(),
            vec![("activate", plain.query.clone(), true), ("deactivate", plain.query.clone(), true)]
        );
        let err = broker.deactivate_filter(&req, NS, "TestFan_Siren", &plain).unwrap_err();
        assert!(err.is(ReturnCode::ErrNotFound));

        sirens.refuse_enable.store(false, Ordering::SeqCst);
        broker.activate_filter(&req, NS, "TestFan_Siren", &plain, None).unwrap();
        broker.activate_filter(&req, NS, "TestFan_Siren", &sticky, None).unwrap();

        // a refused deactivation leaves the filter active
        for _ in 0..2 {
            let err = broker.deactivate_filter(&req, NS, "TestFan_Siren", &sticky).unwrap_err();
            assert!(err.is(ReturnCode::ErrFailed));
        }
        broker.activate_filter(&req, NS, "TestFan_Siren", &sticky, None).unwrap();
        assert_eq!(
            sirens.calls.lock().drain(..).collect::<Vec<_>>(),
            vec![
                ("activate", plain.query.clone(), true),
                ("activate", sticky.query.clone(), true),
                ("deactivate", sticky.query.clone(), true),
                ("deactivate", sticky.query.clone(), true),
                ("activate", sticky.query.clone(), false),
            ]
        );

        broker.deactivate_filter(&req, NS, "TestFan_Siren", &plain).unwrap();
        assert!(broker.deactivate_filter(&req, NS, "TestFan_Siren", &plain).is_err());
    }
}
