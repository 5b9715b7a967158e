//! Provider registry
//!
//! Maps (namespace, class, kind) to a registered provider and holds the MI
//! handles created for it. MIs are created on first use through the engine
//! factory and live until a cleanup lets them go.

use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use slotmap::{new_key_type, SlotMap};

use crate::engine::{MiKind, ProviderFactory};
use crate::sdk::*;
use crate::status::{CleanupOutcome, CmpiError, CmpiResult};

new_key_type! {
    /// Handle for a registered provider
    pub struct ProviderKey;
}

/// A provider and what it serves
#[derive(Clone)]
pub struct ProviderRegistration {
    pub factory: ProviderFactory,
    /// Empty serves every namespace
    pub namespaces: Vec<String>,
    pub classes: Vec<String>,
    pub kinds: Vec<MiKind>,
}

impl ProviderRegistration {
    pub fn new(factory: ProviderFactory) -> Self {
        Self {
            factory,
            namespaces: Vec::new(),
            classes: Vec::new(),
            kinds: Vec::new(),
        }
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespaces.push(namespace.to_string());
        self
    }

    pub fn class(mut self, class_name: &str) -> Self {
        self.classes.push(class_name.to_string());
        self
    }

    pub fn kind(mut self, kind: MiKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    fn serves(&self, namespace: &str, class_name: &str, kind: MiKind) -> bool {
        self.kinds.contains(&kind)
            && (self.namespaces.is_empty() || self.namespaces.iter().any(|n| n.eq_ignore_ascii_case(namespace)))
            && self.classes.iter().any(|c| c.eq_ignore_ascii_case(class_name))
    }
}

/// An MI handle returned by a provider factory
pub(crate) struct LoadedMi {
    kind: MiKind,
    mi: NonNull<c_void>,
    provider: String,
    /// The provider answered NEVER_UNLOAD
    pinned: AtomicBool,
}

// SAFETY: MI handles are called from any thread; providers must be reentrant.
unsafe impl Send for LoadedMi {}
unsafe impl Sync for LoadedMi {}

impl LoadedMi {
    pub(crate) fn kind(&self) -> MiKind {
        self.kind
    }

    pub(crate) fn provider(&self) -> &str {
        &self.provider
    }

    /// The MI envelope as its kind's type
    pub(crate) fn envelope<M>(&self) -> *mut M {
        self.mi.as_ptr().cast()
    }

    /// # Safety
    /// The MI must still be loaded.
    unsafe fn cleanup(&self, ctx: *const CMPIContext, terminating: bool) -> CMPIStatus {
        let t = u8::from(terminating);
        match self.kind {
            MiKind::Instance => {
                let mi = self.envelope::<CMPIInstanceMI>();
                ((*(*mi).ft).cleanup)(mi, ctx, t)
            }
            MiKind::Association => {
                let mi = self.envelope::<CMPIAssociationMI>();
                ((*(*mi).ft).cleanup)(mi, ctx, t)
            }
            MiKind::Method => {
                let mi = self.envelope::<CMPIMethodMI>();
                ((*(*mi).ft).cleanup)(mi, ctx, t)
            }
            MiKind::Property => {
                let mi = self.envelope::<CMPIPropertyMI>();
                ((*(*mi).ft).cleanup)(mi, ctx, t)
            }
            MiKind::Indication => {
                let mi = self.envelope::<CMPIIndicationMI>();
                ((*(*mi).ft).cleanup)(mi, ctx, t)
            }
        }
    }
}

struct ProviderEntry {
    registration: ProviderRegistration,
    loaded: Mutex<HashMap<MiKind, Arc<LoadedMi>>>,
}

/// Registered providers, owned by the broker
pub struct ProviderRegistry {
    entries: RwLock<SlotMap<ProviderKey, ProviderEntry>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(SlotMap::with_key()),
        }
    }

    /// Register a provider; kinds without a factory entry point are dropped
    pub fn register(&self, mut registration: ProviderRegistration) -> ProviderKey {
        let name = registration.factory.name().to_string();
        registration.kinds.retain(|kind| {
            let ok = registration.factory.supports(*kind);
            if !ok {
                tracing::warn!("provider {} has no {} entry point", name, kind);
            }
            ok
        });
        let key = self.entries.write().insert(ProviderEntry {
            registration,
            loaded: Mutex::new(HashMap::new()),
        });
        tracing::debug!("Registered provider: {}", name);
        key
    }

    /// Remove a provider, returning its loaded MIs for cleanup
    pub(crate) fn unregister(&self, key: ProviderKey) -> Option<Vec<Arc<LoadedMi>>> {
        let entry = self.entries.write().remove(key)?;
        tracing::debug!("Unregistered provider: {}", entry.registration.factory.name());
        Some(entry.loaded.into_inner().into_values().collect())
    }

    /// Provider serving `class_name` in `namespace` for `kind`
    pub fn find(&self, namespace: &str, class_name: &str, kind: MiKind) -> Option<ProviderKey> {
        self.entries
            .read()
            .iter()
            .find(|(_, e)| e.registration.serves(namespace, class_name, kind))
            .map(|(key, _)| key)
    }

    pub fn name(&self, key: ProviderKey) -> Option<String> {
        self.entries
            .read()
            .get(key)
            .map(|e| e.registration.factory.name().to_string())
    }

    /// Registered providers with their kinds
    pub fn providers(&self) -> Vec<(ProviderKey, String, Vec<MiKind>)> {
        self.entries
            .read()
            .iter()
            .map(|(key, e)| (key, e.registration.factory.name().to_string(), e.registration.kinds.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of MI handles currently loaded
    pub fn loaded_count(&self) -> usize {
        self.entries.read().values().map(|e| e.loaded.lock().len()).sum()
    }

    /// The MI for `kind`, calling the factory the first time
    ///
    /// No lock is held while the factory runs, so a provider may call back
    /// into the broker from its initialization.
    ///
    /// # Safety
    /// `mb` and `ctx` must be valid for the call and `mb` must outlive the MI.
    pub(crate) unsafe fn mi(
        &self,
        key: ProviderKey,
        kind: MiKind,
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
    ) -> CmpiResult<Arc<LoadedMi>> {
        let factory = {
            let entries = self.entries.read();
            let entry = entries
                .get(key)
                .ok_or_else(|| CmpiError::not_found("provider is no longer registered"))?;
            if let Some(mi) = entry.loaded.lock().get(&kind) {
                return Ok(Arc::clone(mi));
            }
            entry.registration.factory.clone()
        };

        let raw = factory.create(kind, mb, ctx)?;
        // every MI envelope is { hdl, ft }
        if (*raw.as_ptr().cast::<CMPIInstanceMI>()).ft.is_null() {
            return Err(CmpiError::failed(format!("{} returned an MI without a table", kind.symbol_for(factory.name()))));
        }
        let created = Arc::new(LoadedMi {
            kind,
            mi: raw,
            provider: factory.name().to_string(),
            pinned: AtomicBool::new(false),
        });

        let existing = {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) => {
                    let mut loaded = entry.loaded.lock();
                    match loaded.get(&kind) {
                        Some(mi) => Some(Arc::clone(mi)),
                        None => {
                            loaded.insert(kind, Arc::clone(&created));
                            None
                        }
                    }
                }
                None => None,
            }
        };
        match existing {
            Some(winner) => {
                // another thread loaded it first; the duplicate may not veto
                let status = created.cleanup(ctx, true);
                if let Err(err) = CmpiError::check(status) {
                    tracing::warn!("{} {} duplicate MI cleanup failed: {}", created.provider, kind, err);
                }
                Ok(winner)
            }
            None => Ok(created),
        }
    }

    /// Offer idle MIs to `cleanup`
    ///
    /// Without `terminating`, MIs in use or pinned by NEVER_UNLOAD are skipped
    /// and a DO_NOT_UNLOAD answer keeps the MI. With it, every MI is cleaned up
    /// and dropped. Returns how many MIs were unloaded.
    ///
    /// # Safety
    /// `ctx` must be valid for the duration of the call.
    pub(crate) unsafe fn cleanup(&self, ctx: *const CMPIContext, terminating: bool) -> usize {
        let candidates: Vec<(ProviderKey, Arc<LoadedMi>)> = {
            let entries = self.entries.read();
            let mut out = Vec::new();
            for (key, entry) in entries.iter() {
                let mut loaded = entry.loaded.lock();
                let kinds: Vec<MiKind> = loaded
                    .iter()
                    .filter(|(_, mi)| terminating || (Arc::strong_count(mi) == 1 && !mi.pinned.load(Ordering::Acquire)))
                    .map(|(kind, _)| *kind)
                    .collect();
                for kind in kinds {
                    if let Some(mi) = loaded.remove(&kind) {
                        out.push((key, mi));
                    }
                }
            }
            out
        };

        let mut unloaded = 0;
        for (key, mi) in candidates {
            unloaded += usize::from(self.cleanup_one(key, mi, ctx, terminating));
        }
        unloaded
    }

    /// Clean up MIs removed with [`Self::unregister`]
    ///
    /// # Safety
    /// As [`Self::cleanup`].
    pub(crate) unsafe fn cleanup_removed(&self, mis: Vec<Arc<LoadedMi>>, ctx: *const CMPIContext) {
        for mi in mis {
            let status = mi.cleanup(ctx, true);
            if let Err(err) = CmpiError::check(status) {
                tracing::warn!("{} {} cleanup failed: {}", mi.provider, mi.kind, err);
            }
        }
    }

    unsafe fn cleanup_one(&self, key: ProviderKey, mi: Arc<LoadedMi>, ctx: *const CMPIContext, terminating: bool) -> bool {
        let status = mi.cleanup(ctx, terminating);
        let answer = CleanupOutcome::from_raw(status.rc);
        let outcome = answer.when_terminating(terminating);
        // check() also releases the status message
        if let Err(err) = CmpiError::check(status) {
            if answer == CleanupOutcome::Unload {
                tracing::warn!("{} {} cleanup failed: {}", mi.provider, mi.kind, err);
            }
        }

        match outcome {
            CleanupOutcome::Unload => {
                tracing::info!("unloaded {} {} MI", mi.provider, mi.kind);
                true
            }
            CleanupOutcome::DoNotUnload | CleanupOutcome::NeverUnload => {
                if outcome == CleanupOutcome::NeverUnload {
                    mi.pinned.store(true, Ordering::Release);
                }
                tracing::debug!("{} {} MI stays loaded ({:?})", mi.provider, mi.kind, outcome);
                let entries = self.entries.read();
                if let Some(entry) = entries.get(key) {
                    entry.loaded.lock().entry(mi.kind).or_insert(mi);
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StaticFactories;
    use std::sync::atomic::AtomicUsize;

    static CLEANUPS: AtomicUsize = AtomicUsize::new(0);
    static ANSWER: std::sync::atomic::AtomicI32 = std::sync::atomic::AtomicI32::new(CMPI_RC_OK);

    unsafe extern "C" fn method_cleanup(_mi: *mut CMPIMethodMI, _ctx: *const CMPIContext, _t: CMPIBoolean) -> CMPIStatus {
        CLEANUPS.fetch_add(1, Ordering::SeqCst);
        CMPIStatus::rc(ANSWER.load(Ordering::SeqCst))
    }

    unsafe extern "C" fn invoke(
        _mi: *mut CMPIMethodMI,
        _ctx: *const CMPIContext,
        _rslt: *const CMPIResult,
        _op: *const CMPIObjectPath,
        _method: *const std::ffi::c_char,
        _in: *const CMPIArgs,
        _out: *mut CMPIArgs,
    ) -> CMPIStatus {
        CMPIStatus::ok()
    }

    static METHOD_FT: CMPIMethodMIFT = CMPIMethodMIFT {
        ftVersion: CMPICurrentVersion,
        miVersion: CMPICurrentVersion,
        miName: c"Fan".as_ptr(),
        cleanup: method_cleanup,
        invokeMethod: invoke,
    };

    struct StaticMi(CMPIMethodMI);
    unsafe impl Sync for StaticMi {}

    static METHOD_MI: StaticMi = StaticMi(CMPIMethodMI {
        hdl: std::ptr::null_mut(),
        ft: &METHOD_FT,
    });

    unsafe extern "C" fn factory(_mb: *const CMPIBroker, _ctx: *const CMPIContext, rc: *mut CMPIStatus) -> *mut c_void {
        *rc = CMPIStatus::ok();
        std::ptr::from_ref(&METHOD_MI.0).cast_mut().cast()
    }

    fn registry() -> (ProviderRegistry, ProviderKey) {
        let table = Arc::new(StaticFactories::new().with("Fan", MiKind::Method, factory));
        let factory = ProviderFactory::from_static("Fan", table).unwrap();
        let registry = ProviderRegistry::new();
        let key = registry.register(
            ProviderRegistration::new(factory)
                .namespace("root/cimv2")
                .class("ACME_Fan")
                .kind(MiKind::Method)
                .kind(MiKind::Instance),
        );
        (registry, key)
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let (registry, key) = registry();
        assert_eq!(registry.find("ROOT/cimv2", "acme_fan", MiKind::Method), Some(key));
        assert_eq!(registry.find("root/other", "ACME_Fan", MiKind::Method), None);
        // no instance entry point, so the kind was dropped
        assert_eq!(registry.find("root/cimv2", "ACME_Fan", MiKind::Instance), None);
        assert_eq!(registry.providers()[0].2, vec![MiKind::Method]);
    }

    // one test drives the shared cleanup counters
    #[test]
    fn test_lazy_load_and_cleanup_outcomes() {
        let (registry, key) = registry();
        let mb = std::ptr::null::<CMPIBroker>();
        let null = std::ptr::null::<CMPIContext>();
        unsafe {
            let mi = registry.mi(key, MiKind::Method, mb, null).unwrap();
            let again = registry.mi(key, MiKind::Method, mb, null).unwrap();
            assert!(Arc::ptr_eq(&mi, &again));
            assert_eq!(mi.provider(), "Fan");

            // in use: skipped
            let before = CLEANUPS.load(Ordering::SeqCst);
            assert_eq!(registry.cleanup(null, false), 0);
            assert_eq!(CLEANUPS.load(Ordering::SeqCst), before);
            drop((mi, again));

            ANSWER.store(CMPI_RC_DO_NOT_UNLOAD, Ordering::SeqCst);
            assert_eq!(registry.cleanup(null, false), 0);
            assert_eq!(registry.loaded_count(), 1);

            ANSWER.store(CMPI_RC_NEVER_UNLOAD, Ordering::SeqCst);
            assert_eq!(registry.cleanup(null, false), 0);
            let before = CLEANUPS.load(Ordering::SeqCst);
            assert_eq!(registry.cleanup(null, false), 0);
            assert_eq!(CLEANUPS.load(Ordering::SeqCst), before, "pinned MI is not asked again");

            // shutdown cannot be vetoed
            assert_eq!(registry.cleanup(null, true), 1);
            assert_eq!(registry.loaded_count(), 0);
            ANSWER.store(CMPI_RC_OK, Ordering::SeqCst);
        }
    }

    static DUPLICATE_CLEANUPS: AtomicUsize = AtomicUsize::new(0);
    static DUPLICATE_TERMINATING: AtomicBool = AtomicBool::new(false);

    thread_local! {
        static REENTER: std::cell::Cell<Option<(*const ProviderRegistry, ProviderKey)>> =
            const { std::cell::Cell::new(None) };
    }

    unsafe extern "C" fn pinned_cleanup(_mi: *mut CMPIMethodMI, _ctx: *const CMPIContext, t: CMPIBoolean) -> CMPIStatus {
        DUPLICATE_CLEANUPS.fetch_add(1, Ordering::SeqCst);
        DUPLICATE_TERMINATING.store(t != 0, Ordering::SeqCst);
        if t != 0 {
            CMPIStatus::ok()
        } else {
            CMPIStatus::rc(CMPI_RC_NEVER_UNLOAD)
        }
    }

    static PINNED_FT: CMPIMethodMIFT = CMPIMethodMIFT {
        ftVersion: CMPICurrentVersion,
        miVersion: CMPICurrentVersion,
        miName: c"Pinned".as_ptr(),
        cleanup: pinned_cleanup,
        invokeMethod: invoke,
    };

    static PINNED_MI: StaticMi = StaticMi(CMPIMethodMI {
        hdl: std::ptr::null_mut(),
        ft: &PINNED_FT,
    });

    /// Loads the same MI again from inside the factory, so the outer call loses
    unsafe extern "C" fn reentrant_factory(mb: *const CMPIBroker, ctx: *const CMPIContext, rc: *mut CMPIStatus) -> *mut c_void {
        if let Some((registry, key)) = REENTER.with(|r| r.take()) {
            (*registry).mi(key, MiKind::Method, mb, ctx).unwrap();
        }
        *rc = CMPIStatus::ok();
        std::ptr::from_ref(&PINNED_MI.0).cast_mut().cast()
    }

    #[test]
    fn test_duplicate_mi_is_terminated() {
        let table = Arc::new(StaticFactories::new().with("Pinned", MiKind::Method, reentrant_factory));
        let factory = ProviderFactory::from_static("Pinned", table).unwrap();
        let registry = ProviderRegistry::new();
        let key = registry.register(
            ProviderRegistration::new(factory)
                .namespace("root/cimv2")
                .class("ACME_Pinned")
                .kind(MiKind::Method),
        );

        REENTER.with(|r| r.set(Some((&registry as *const ProviderRegistry, key))));
        let mi = unsafe { registry.mi(key, MiKind::Method, std::ptr::null(), std::ptr::null()) }.unwrap();
        assert_eq!(mi.provider(), "Pinned");
        assert_eq!(registry.loaded_count(), 1);
        assert_eq!(DUPLICATE_CLEANUPS.load(Ordering::SeqCst), 1);
        assert!(DUPLICATE_TERMINATING.load(Ordering::SeqCst));
    }

    #[test]
    fn test_unregistered_provider_not_found() {
        let (registry, key) = registry();
        assert!(registry.unregister(key).is_some());
        let err = unsafe { registry.mi(key, MiKind::Method, std::ptr::null(), std::ptr::null()) }.err().unwrap();
        assert_eq!(err.rc(), CMPI_RC_ERR_NOT_FOUND);
        assert!(registry.is_empty());
    }
}
