//! Process-wide provider state and the MI factories

use std::any::Any;
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;

use super::tables::Tables;
use super::{
    AssociationProvider, IndicationProvider, InstanceProvider, MethodProvider, PropertyProvider,
    ProviderExport,
};
use crate::engine::MiKind;
use crate::handles::{BrokerHandle, ContextRef};
use crate::sdk::*;
use crate::status::{CleanupOutcome, CmpiError, CmpiResult};

/// Everything a provider type shares across its MIs
///
/// One `static` per provider type, created by `#[derive(CmpiProvider)]`.
/// Every MI envelope the factories hand out points its `hdl` here.
pub struct ProviderBase<P> {
    broker: AtomicPtr<CMPIBroker>,
    state: OnceLock<P>,
    init: Mutex<()>,
}

impl<P: ProviderExport> ProviderBase<P> {
    pub const fn new() -> Self {
        Self {
            broker: AtomicPtr::new(ptr::null_mut()),
            state: OnceLock::new(),
            init: parking_lot::const_mutex(()),
        }
    }

    /// The broker of the latest successful factory call
    pub fn broker(&self) -> Option<BrokerHandle> {
        let mb = self.broker.load(Ordering::Acquire);
        // SAFETY: only ever set from a validated broker, which outlives its MIs
        unsafe { BrokerHandle::from_raw(mb).ok() }
    }

    /// Provider state, once initialized
    pub fn state(&self) -> Option<&P> {
        self.state.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }

    /// Run [`Provider::initialize`](super::Provider::initialize) unless it already succeeded
    ///
    /// The broker of the latest factory call is the one MIs call back into.
    unsafe fn initialize(&self, mb: *const CMPIBroker, ctx: *const CMPIContext) -> CmpiResult<&P> {
        let broker = BrokerHandle::from_raw(mb)?;
        let _guard = self.init.lock();
        let state = match self.state.get() {
            Some(state) => state,
            None => {
                let ctx = ContextRef::from_raw(ctx, broker)?;
                let state = P::initialize(broker, &ctx)?;
                tracing::info!("Provider {} initialized", P::name());
                self.state.get_or_init(|| state)
            }
        };
        self.broker.store(mb as *mut CMPIBroker, Ordering::Release);
        Ok(state)
    }

    /// Shared body of the `create_<kind>_mi` factories
    unsafe fn create<M>(
        &'static self,
        kind: MiKind,
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        rc: *mut CMPIStatus,
        envelope: impl FnOnce(*mut c_void) -> M,
    ) -> *mut M {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.initialize(mb, ctx).map(drop)))
            .unwrap_or_else(|panic| Err(panicked("initialize", &*panic)));
        match outcome {
            Ok(()) => {
                set_status(rc, CMPIStatus::ok());
                let hdl = self as *const Self as *mut c_void;
                tracing::debug!("Created {} MI for {}", kind, P::name());
                Box::into_raw(Box::new(envelope(hdl)))
            }
            Err(err) => {
                tracing::error!("Provider {} failed to initialize: {}", P::name(), err);
                let broker = BrokerHandle::from_raw(mb).ok();
                set_status(rc, err.to_status(broker.as_ref()));
                ptr::null_mut()
            }
        }
    }

    /// # Safety
    /// `hdl` must be the handle of an MI created by this provider's factories.
    pub(crate) unsafe fn from_hdl<'a>(hdl: *mut c_void) -> Option<&'a Self> {
        (hdl as *const Self).as_ref()
    }
}

impl<P: ProviderExport> Default for ProviderBase<P> {
    fn default() -> Self {
        Self::new()
    }
}

unsafe fn set_status(rc: *mut CMPIStatus, status: CMPIStatus) {
    if !rc.is_null() {
        *rc = status;
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

pub(crate) fn panicked(slot: &str, panic: &(dyn Any + Send)) -> CmpiError {
    CmpiError::failed(format!("provider panicked in {slot}: {}", panic_message(panic)))
}

// ============================================================================
// MI envelopes
// ============================================================================

/// An MI envelope whose `hdl` points at a [`ProviderBase`]
pub(crate) trait MiEnvelope {
    fn hdl(&self) -> *mut c_void;
}

macro_rules! mi_envelope {
    ($($mi:ty),*) => {
        $(
            impl MiEnvelope for $mi {
                fn hdl(&self) -> *mut c_void {
                    self.hdl
                }
            }
        )*
    };
}

mi_envelope!(CMPIInstanceMI, CMPIAssociationMI, CMPIMethodMI, CMPIPropertyMI, CMPIIndicationMI);

/// Run one MI slot against the provider state
///
/// Panics and errors become the returned status; an error message is
/// allocated through the broker so the caller can release it.
pub(crate) unsafe fn invoke<P, M>(
    mi: *mut M,
    slot: &'static str,
    f: impl FnOnce(&P, BrokerHandle) -> CmpiResult<()>,
) -> CMPIStatus
where
    P: ProviderExport,
    M: MiEnvelope,
{
    let Some(base) = mi.as_ref().and_then(|m| ProviderBase::<P>::from_hdl(m.hdl())) else {
        return CmpiError::invalid_handle("MI").to_status(None);
    };
    let (Some(state), Some(broker)) = (base.state(), base.broker()) else {
        return CmpiError::failed(format!("provider {} is not initialized", P::name())).to_status(None);
    };
    let outcome = catch_unwind(AssertUnwindSafe(|| f(state, broker))).unwrap_or_else(|panic| {
        let err = panicked(slot, &*panic);
        tracing::error!(provider = P::name(), "{}", err);
        Err(err)
    });
    match outcome {
        Ok(()) => CMPIStatus::ok(),
        Err(err) => {
            tracing::debug!(provider = P::name(), "{} failed: {}", slot, err);
            err.to_status(Some(&broker))
        }
    }
}

/// `cleanup` slot shared by every kind
///
/// The envelope is freed when the answer is to unload; a terminating cleanup
/// always unloads.
pub(crate) unsafe extern "C" fn cleanup<P, M>(
    mi: *mut M,
    ctx: *const CMPIContext,
    terminating: CMPIBoolean,
) -> CMPIStatus
where
    P: ProviderExport,
    M: MiEnvelope,
{
    let terminating = terminating != 0;
    let Some(base) = mi.as_ref().and_then(|m| ProviderBase::<P>::from_hdl(m.hdl())) else {
        return CmpiError::invalid_handle("MI").to_status(None);
    };
    let broker = base.broker();
    let outcome = match (base.state(), broker) {
        (Some(state), Some(broker)) => catch_unwind(AssertUnwindSafe(|| {
            let ctx = ContextRef::from_raw(ctx, broker)?;
            state.cleanup(&ctx, terminating)
        }))
        .unwrap_or_else(|panic| Err(panicked("cleanup", &*panic))),
        _ => Ok(CleanupOutcome::Unload),
    };

    let status = match outcome {
        Ok(answer) => {
            let answer = answer.when_terminating(terminating);
            if answer != CleanupOutcome::Unload {
                tracing::debug!("Provider {} stays loaded: {:?}", P::name(), answer);
                return CMPIStatus::rc(answer.as_raw());
            }
            CMPIStatus::ok()
        }
        Err(err) => {
            tracing::warn!("Provider {} cleanup failed: {}", P::name(), err);
            err.to_status(broker.as_ref())
        }
    };
    drop(Box::from_raw(mi));
    status
}

// ============================================================================
// Factories
// ============================================================================

/// Body of `<name>_Create_InstanceMI`
///
/// # Safety
/// `mb` and `ctx` must be the broker and context of the factory call; `rc`
/// must be null or writable.
pub unsafe fn create_instance_mi<P: InstanceProvider>(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut CMPIInstanceMI {
    P::base().create(MiKind::Instance, mb, ctx, rc, |hdl| CMPIInstanceMI {
        hdl,
        ft: Tables::<P>::INSTANCE,
    })
}

/// Body of `<name>_Create_AssociationMI`
///
/// # Safety
/// See [`create_instance_mi`].
pub unsafe fn create_association_mi<P: AssociationProvider>(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut CMPIAssociationMI {
    P::base().create(MiKind::Association, mb, ctx, rc, |hdl| CMPIAssociationMI {
        hdl,
        ft: Tables::<P>::ASSOCIATION,
    })
}

/// Body of `<name>_Create_MethodMI`
///
/// # Safety
/// See [`create_instance_mi`].
pub unsafe fn create_method_mi<P: MethodProvider>(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut CMPIMethodMI {
    P::base().create(MiKind::Method, mb, ctx, rc, |hdl| CMPIMethodMI {
        hdl,
        ft: Tables::<P>::METHOD,
    })
}

/// Body of `<name>_Create_PropertyMI`
///
/// # Safety
/// See [`create_instance_mi`].
pub unsafe fn create_property_mi<P: PropertyProvider>(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut CMPIPropertyMI {
    P::base().create(MiKind::Property, mb, ctx, rc, |hdl| CMPIPropertyMI {
        hdl,
        ft: Tables::<P>::PROPERTY,
    })
}

/// Body of `<name>_Create_IndicationMI`
///
/// # Safety
/// See [`create_instance_mi`].
pub unsafe fn create_indication_mi<P: IndicationProvider>(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut CMPIIndicationMI {
    P::base().create(MiKind::Indication, mb, ctx, rc, |hdl| CMPIIndicationMI {
        hdl,
        ft: Tables::<P>::INDICATION,
    })
}

// Kind-erased factories for the static factory table

pub unsafe extern "C" fn instance_factory<P: InstanceProvider>(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut c_void {
    create_instance_mi::<P>(mb, ctx, rc).cast()
}

pub unsafe extern "C" fn association_factory<P: AssociationProvider>(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut c_void {
    create_association_mi::<P>(mb, ctx, rc).cast()
}

pub unsafe extern "C" fn method_factory<P: MethodProvider>(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut c_void {
    create_method_mi::<P>(mb, ctx, rc).cast()
}

pub unsafe extern "C" fn property_factory<P: PropertyProvider>(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut c_void {
    create_property_mi::<P>(mb, ctx, rc).cast()
}

pub unsafe extern "C" fn indication_factory<P: IndicationProvider>(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut c_void {
    create_indication_mi::<P>(mb, ctx, rc).cast()
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::Arc;

    use super::*;
    use crate::broker::{test_context, Broker, ProviderRegistration, RequestContext};
    use crate::engine::{ProviderFactory, StaticFactories};
    use crate::handles::{ObjectPathRef, ResultRef};
    use crate::provider::Provider;
    use crate::broker::memory::ArenaGuard;
    use crate::broker::native::Scope;
    use crate::broker::objects::{args, object_path, result};
    use crate::value::{NamedData, ObjectPathData};

    static INITS: AtomicUsize = AtomicUsize::new(0);
    static FAIL_INIT: AtomicBool = AtomicBool::new(true);

    /// Fails its first initialization
    struct Flaky;

    impl Provider for Flaky {
        fn initialize(_broker: BrokerHandle, _ctx: &ContextRef) -> CmpiResult<Self> {
            INITS.fetch_add(1, Ordering::SeqCst);
            if FAIL_INIT.swap(false, Ordering::SeqCst) {
                return Err(CmpiError::failed("disk not ready"));
            }
            Ok(Flaky)
        }

        fn cleanup(&self, _ctx: &ContextRef, _terminating: bool) -> CmpiResult<CleanupOutcome> {
            Ok(CleanupOutcome::NeverUnload)
        }
    }

    impl ProviderExport for Flaky {
        const NAME: &'static CStr = c"Flaky";
        const KINDS: &'static [MiKind] = &[MiKind::Instance, MiKind::Method];

        fn base() -> &'static ProviderBase<Self> {
            static BASE: ProviderBase<Flaky> = ProviderBase::new();
            &BASE
        }

        fn register_static(table: &mut StaticFactories) {
            table.register("Flaky", MiKind::Instance, instance_factory::<Self>);
            table.register("Flaky", MiKind::Method, method_factory::<Self>);
        }
    }

    impl InstanceProvider for Flaky {}
    impl MethodProvider for Flaky {}

    struct Exploding;

    impl Provider for Exploding {
        fn initialize(_broker: BrokerHandle, _ctx: &ContextRef) -> CmpiResult<Self> {
            Ok(Exploding)
        }
    }

    impl ProviderExport for Exploding {
        const NAME: &'static CStr = c"Exploding";
        const KINDS: &'static [MiKind] = &[MiKind::Instance];

        fn base() -> &'static ProviderBase<Self> {
            static BASE: ProviderBase<Exploding> = ProviderBase::new();
            &BASE
        }

        fn register_static(table: &mut StaticFactories) {
            table.register("Exploding", MiKind::Instance, instance_factory::<Self>);
        }
    }

    impl InstanceProvider for Exploding {
        fn enumerate_instance_names(
            &self,
            _ctx: &ContextRef,
            _rslt: &ResultRef,
            _class_path: &ObjectPathRef,
        ) -> CmpiResult<()> {
            panic!("sensor exploded");
        }
    }

    #[test]
    fn test_init_retried_then_shared_across_kinds() {
        let broker = Broker::default();
        let ctx = test_context();
        unsafe {
            let mut rc = CMPIStatus::ok();
            let mi = create_instance_mi::<Flaky>(broker.as_ptr(), ctx, &mut rc);
            assert!(mi.is_null());
            assert_eq!(CmpiError::check(rc).unwrap_err().text(), Some("disk not ready"));
            assert!(!Flaky::base().is_initialized());

            let inst = create_instance_mi::<Flaky>(broker.as_ptr(), ctx, &mut rc);
            assert!(!inst.is_null());
            assert_eq!(rc.rc, CMPI_RC_OK);
            let meth = create_method_mi::<Flaky>(broker.as_ptr(), ctx, &mut rc);
            assert!(!meth.is_null());
            assert_eq!(INITS.load(Ordering::SeqCst), 2);
            assert_eq!(CStr::from_ptr((*(*inst).ft).miName), c"Flaky");

            // NeverUnload is overridden by a terminating cleanup
            let st = ((*(*inst).ft).cleanup)(inst, ctx, 0);
            assert_eq!(st.rc, CMPI_RC_NEVER_UNLOAD);
            let st = ((*(*inst).ft).cleanup)(inst, ctx, 1);
            assert_eq!(st.rc, CMPI_RC_OK);

            let _arena = ArenaGuard::push();
            let rslt = result::create(Scope::Tracked);
            let op = object_path::create(ObjectPathData::new("root/test", "Flaky_Thing"), Scope::Tracked);
            let in_args = args::create(NamedData::new(), Scope::Tracked);
            let out_args = args::create(NamedData::new(), Scope::Tracked);
            let st = ((*(*meth).ft).invokeMethod)(meth, ctx, rslt, op, c"Go".as_ptr(), in_args, out_args);
            assert_eq!(CmpiError::check(st).unwrap_err().rc(), CMPI_RC_ERR_NOT_SUPPORTED);
            let st = ((*(*meth).ft).cleanup)(meth, ctx, 1);
            assert_eq!(st.rc, CMPI_RC_OK);
        }
    }

    #[test]
    fn test_panic_becomes_failed_status() {
        let mut table = StaticFactories::new();
        Exploding::register_static(&mut table);
        let factory = ProviderFactory::from_static("Exploding", Arc::new(table)).unwrap();
        let broker = Broker::default();
        broker.register(
            ProviderRegistration::new(factory)
                .class("Exploding_Thing")
                .kind(MiKind::Instance),
        );

        let err = broker
            .enumerate_instance_names(&RequestContext::new(), &ObjectPathData::new("root/test", "Exploding_Thing"))
            .unwrap_err();
        assert_eq!(err.rc(), CMPI_RC_ERR_FAILED);
        assert!(err.text().unwrap_or_default().contains("sensor exploded"));
    }
}
