//! Provider module loading via the `<name>_Create_<Kind>MI` factory pattern

use std::collections::HashMap;
use std::ffi::{c_void, CStr, CString};
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use std::sync::Arc;

use cmpi_sdk::{
    CMPIBroker, CMPIContext, CMPIGenericMIFactory, CMPIMIFactory, CMPIStatus, CMPIString,
    CMPI_RC_OK,
};

use crate::error::LoadError;
use crate::kind::MiKind;

/// Platform file name for a provider module
///
/// A bare module name `Sample` becomes `libSample.so` (per platform prefix and
/// suffix). Anything that already looks like a path or file name is kept.
pub fn library_file_name(module: &str) -> String {
    let suffix = std::env::consts::DLL_SUFFIX;
    if module.contains('/') || module.ends_with(suffix) {
        module.to_string()
    } else {
        format!("{}{module}{suffix}", std::env::consts::DLL_PREFIX)
    }
}

/// A `dlopen`ed provider module
///
/// The module stays loaded until the value is dropped. MI handles obtained
/// from its factories must not outlive it.
pub struct ProviderLibrary {
    handle: NonNull<c_void>,
    path: PathBuf,
}

// SAFETY: a dlopen handle is process-global; dlsym/dlclose are thread-safe.
unsafe impl Send for ProviderLibrary {}
unsafe impl Sync for ProviderLibrary {}

impl ProviderLibrary {
    /// Open a provider module by name, searching `dir` first when given
    #[tracing::instrument(skip(dir), fields(dir = ?dir))]
    pub fn open(module: &str, dir: Option<&Path>) -> Result<Self, LoadError> {
        if module.is_empty() {
            return Err(LoadError::InvalidName(module.to_string()));
        }

        let file = library_file_name(module);
        let path = match dir {
            Some(dir) if !file.contains('/') => dir.join(&file),
            _ => PathBuf::from(&file),
        };

        let c_path = CString::new(path.to_string_lossy().as_bytes())
            .map_err(|_| LoadError::InvalidName(module.to_string()))?;

        // SAFETY: c_path is NUL-terminated; dlopen runs module constructors.
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };

        match NonNull::new(handle) {
            Some(handle) => {
                tracing::info!("Loaded provider module {}", path.display());
                Ok(Self { handle, path })
            }
            None => Err(LoadError::LibraryNotFound {
                path: path.display().to_string(),
                reason: last_dl_error(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a symbol by name
    ///
    /// # Safety
    /// `T` must be a pointer-sized type matching the symbol's real type.
    pub unsafe fn symbol<T: Copy>(&self, name: &str) -> Option<T> {
        debug_assert_eq!(std::mem::size_of::<T>(), std::mem::size_of::<*mut c_void>());

        let c_name = CString::new(name).ok()?;
        let sym = libc::dlsym(self.handle.as_ptr(), c_name.as_ptr());
        if sym.is_null() {
            None
        } else {
            Some(std::mem::transmute_copy::<*mut c_void, T>(&sym))
        }
    }
}

impl Drop for ProviderLibrary {
    fn drop(&mut self) {
        // SAFETY: handle came from dlopen and is closed exactly once.
        let rc = unsafe { libc::dlclose(self.handle.as_ptr()) };
        if rc != 0 {
            tracing::warn!("dlclose({}) failed: {}", self.path.display(), last_dl_error());
        } else {
            tracing::debug!("Unloaded provider module {}", self.path.display());
        }
    }
}

fn last_dl_error() -> String {
    // SAFETY: dlerror returns a thread-local string or null.
    unsafe {
        let err = libc::dlerror();
        if err.is_null() {
            "unknown error".to_string()
        } else {
            CStr::from_ptr(err).to_string_lossy().into_owned()
        }
    }
}

/// Factory table for providers linked into the host process
#[derive(Default, Clone)]
pub struct StaticFactories {
    named: HashMap<(String, MiKind), CMPIMIFactory>,
    generic: HashMap<MiKind, CMPIGenericMIFactory>,
}

impl StaticFactories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `<name>_Create_<Kind>MI`
    pub fn register(&mut self, name: &str, kind: MiKind, factory: CMPIMIFactory) {
        tracing::debug!("Static factory {}", kind.symbol_for(name));
        self.named.insert((name.to_ascii_lowercase(), kind), factory);
    }

    /// Register `_Generic_Create_<Kind>MI`
    pub fn register_generic(&mut self, kind: MiKind, factory: CMPIGenericMIFactory) {
        self.generic.insert(kind, factory);
    }

    pub fn with(mut self, name: &str, kind: MiKind, factory: CMPIMIFactory) -> Self {
        self.register(name, kind, factory);
        self
    }

    pub fn get(&self, name: &str, kind: MiKind) -> Option<CMPIMIFactory> {
        self.named.get(&(name.to_ascii_lowercase(), kind)).copied()
    }

    pub fn get_generic(&self, kind: MiKind) -> Option<CMPIGenericMIFactory> {
        self.generic.get(&kind).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.generic.is_empty()
    }

    /// Provider names with at least one static factory
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.named.keys().map(|(n, _)| n.clone()).collect();
        names.sort();
        names.dedup();
        names
    }
}

#[derive(Clone)]
enum FactorySource {
    Library(Arc<ProviderLibrary>),
    Static(Arc<StaticFactories>),
}

/// Resolved entry point for one provider kind
#[derive(Clone, Copy)]
enum Entry {
    Named(CMPIMIFactory),
    Generic(CMPIGenericMIFactory),
}

/// Wrapper around the factory entry points of one registered provider
#[derive(Clone)]
pub struct ProviderFactory {
    name: String,
    c_name: CString,
    source: FactorySource,
}

impl ProviderFactory {
    /// Factories exported by a loaded module
    pub fn from_library(name: &str, library: Arc<ProviderLibrary>) -> Result<Self, LoadError> {
        Self::new(name, FactorySource::Library(library))
    }

    /// Factories linked into the host
    pub fn from_static(name: &str, table: Arc<StaticFactories>) -> Result<Self, LoadError> {
        Self::new(name, FactorySource::Static(table))
    }

    fn new(name: &str, source: FactorySource) -> Result<Self, LoadError> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(LoadError::InvalidName(name.to_string()));
        }
        let c_name = CString::new(name).map_err(|_| LoadError::InvalidName(name.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            c_name,
            source,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether an entry point exists for `kind`
    pub fn supports(&self, kind: MiKind) -> bool {
        self.resolve(kind).is_ok()
    }

    fn resolve(&self, kind: MiKind) -> Result<Entry, LoadError> {
        match &self.source {
            FactorySource::Library(lib) => {
                // SAFETY: factory symbols have the CMPI factory signatures.
                unsafe {
                    if let Some(f) = lib.symbol::<CMPIMIFactory>(&kind.symbol_for(&self.name)) {
                        return Ok(Entry::Named(f));
                    }
                    if let Some(f) = lib.symbol::<CMPIGenericMIFactory>(&kind.generic_symbol()) {
                        return Ok(Entry::Generic(f));
                    }
                }
            }
            FactorySource::Static(table) => {
                if let Some(f) = table.get(&self.name, kind) {
                    return Ok(Entry::Named(f));
                }
                if let Some(f) = table.get_generic(kind) {
                    return Ok(Entry::Generic(f));
                }
            }
        }
        Err(LoadError::SymbolNotFound(kind.symbol_for(&self.name)))
    }

    /// Call the factory for `kind` and return its MI envelope
    ///
    /// The pointer refers to the kind's MI envelope (`CMPIInstanceMI` etc.).
    ///
    /// # Safety
    /// `broker` and `ctx` must be valid for the duration of the call, and the
    /// broker must outlive the returned MI.
    #[tracing::instrument(skip(self, broker, ctx), fields(provider = %self.name))]
    pub unsafe fn create(
        &self,
        kind: MiKind,
        broker: *const CMPIBroker,
        ctx: *const CMPIContext,
    ) -> Result<NonNull<c_void>, LoadError> {
        let entry = self.resolve(kind)?;
        let mut rc = CMPIStatus::ok();

        let (symbol, mi) = match entry {
            Entry::Named(f) => (kind.symbol_for(&self.name), f(broker, ctx, &mut rc)),
            Entry::Generic(f) => (
                kind.generic_symbol(),
                f(broker, ctx, self.c_name.as_ptr(), &mut rc),
            ),
        };

        match NonNull::new(mi) {
            Some(mi) if rc.rc == CMPI_RC_OK => {
                tracing::info!("{} -> {:p}", symbol, mi.as_ptr());
                Ok(mi)
            }
            _ => {
                let message = take_status_message(rc.msg);
                Err(LoadError::FactoryFailed {
                    symbol,
                    rc: if rc.rc == CMPI_RC_OK {
                        cmpi_sdk::CMPI_RC_ERR_FAILED
                    } else {
                        rc.rc
                    },
                    message,
                })
            }
        }
    }
}

/// Read and release a status message string
unsafe fn take_status_message(msg: *mut CMPIString) -> String {
    if msg.is_null() || (*msg).ft.is_null() {
        return String::new();
    }
    let ft = &*(*msg).ft;
    let chars = (ft.getCharPtr)(msg, ptr::null_mut());
    let text = if chars.is_null() {
        String::new()
    } else {
        CStr::from_ptr(chars).to_string_lossy().into_owned()
    };
    (ft.release)(msg);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmpi_sdk::CMPI_RC_ERR_NOT_SUPPORTED;
    use std::ffi::c_char;

    static mut MARKER: u8 = 0;

    unsafe extern "C" fn ok_factory(
        _mb: *const CMPIBroker,
        _ctx: *const CMPIContext,
        rc: *mut CMPIStatus,
    ) -> *mut c_void {
        *rc = CMPIStatus::ok();
        ptr::addr_of_mut!(MARKER).cast()
    }

    unsafe extern "C" fn failing_factory(
        _mb: *const CMPIBroker,
        _ctx: *const CMPIContext,
        rc: *mut CMPIStatus,
    ) -> *mut c_void {
        *rc = CMPIStatus::rc(CMPI_RC_ERR_NOT_SUPPORTED);
        ptr::null_mut()
    }

    unsafe extern "C" fn generic_factory(
        _mb: *const CMPIBroker,
        _ctx: *const CMPIContext,
        name: *const c_char,
        rc: *mut CMPIStatus,
    ) -> *mut c_void {
        if CStr::from_ptr(name).to_bytes() == b"Gen" {
            *rc = CMPIStatus::ok();
            ptr::addr_of_mut!(MARKER).cast()
        } else {
            *rc = CMPIStatus::rc(CMPI_RC_ERR_NOT_SUPPORTED);
            ptr::null_mut()
        }
    }

    #[test]
    fn test_library_file_name() {
        let name = library_file_name("Sample");
        assert!(name.contains("Sample"));
        assert!(name.ends_with(std::env::consts::DLL_SUFFIX));
        assert_eq!(library_file_name("/opt/p/libX.so"), "/opt/p/libX.so");
    }

    #[test]
    fn test_open_missing_library() {
        let err = ProviderLibrary::open("cmpi_definitely_missing", None)
            .err()
            .map(|e| e.to_string());
        assert!(matches!(err, Some(s) if s.contains("Library not found")));
    }

    #[test]
    fn test_static_factory_create() {
        let table = Arc::new(
            StaticFactories::new()
                .with("Good", MiKind::Instance, ok_factory)
                .with("Bad", MiKind::Instance, failing_factory),
        );

        let good = ProviderFactory::from_static("Good", table.clone()).unwrap();
        assert!(good.supports(MiKind::Instance));
        assert!(!good.supports(MiKind::Method));
        let mi = unsafe { good.create(MiKind::Instance, ptr::null(), ptr::null()) }.unwrap();
        assert_eq!(mi.as_ptr(), unsafe { ptr::addr_of_mut!(MARKER) }.cast());

        let bad = ProviderFactory::from_static("Bad", table).unwrap();
        let err = unsafe { bad.create(MiKind::Instance, ptr::null(), ptr::null()) }.unwrap_err();
        assert!(matches!(
            err,
            LoadError::FactoryFailed { rc, .. } if rc == CMPI_RC_ERR_NOT_SUPPORTED
        ));
    }

    #[test]
    fn test_missing_kind_is_symbol_not_found() {
        let table = Arc::new(StaticFactories::new().with("Good", MiKind::Instance, ok_factory));
        let good = ProviderFactory::from_static("Good", table).unwrap();
        let err = unsafe { good.create(MiKind::Method, ptr::null(), ptr::null()) }.unwrap_err();
        assert!(matches!(err, LoadError::SymbolNotFound(s) if s == "Good_Create_MethodMI"));
    }

    #[test]
    fn test_generic_fallback_receives_name() {
        let mut table = StaticFactories::new();
        table.register_generic(MiKind::Method, generic_factory);
        let table = Arc::new(table);

        let gen = ProviderFactory::from_static("Gen", table.clone()).unwrap();
        assert!(unsafe { gen.create(MiKind::Method, ptr::null(), ptr::null()) }.is_ok());

        let other = ProviderFactory::from_static("Other", table).unwrap();
        assert!(unsafe { other.create(MiKind::Method, ptr::null(), ptr::null()) }.is_err());
    }

    #[test]
    fn test_invalid_provider_name() {
        let table = Arc::new(StaticFactories::new());
        assert!(ProviderFactory::from_static("", table.clone()).is_err());
        assert!(ProviderFactory::from_static("bad name", table).is_err());
    }

    #[test]
    fn test_static_lookup_is_case_insensitive() {
        let table = StaticFactories::new().with("Sample", MiKind::Instance, ok_factory);
        assert!(table.get("sample", MiKind::Instance).is_some());
        assert_eq!(table.names(), vec!["sample".to_string()]);
    }
}
