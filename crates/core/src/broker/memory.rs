//! Per-thread memory arenas
//!
//! Objects a provider creates through the encapsulation table are tracked in
//! the calling thread's innermost arena and freed when that arena is popped.
//! The broker pushes an arena around every provider call; `CMPIBrokerMemFT`
//! `mark`/`release` let a provider nest its own.
//!
//! The bottom arena is never popped by a request. It collects objects created
//! outside any request and is freed when the thread exits.

use std::cell::RefCell;
use std::ffi::{c_char, c_void};

use crate::sdk::*;
use crate::status::CmpiError;

/// Destructor for a tracked allocation
pub(crate) type FreeFn = unsafe fn(*mut c_void);

#[derive(Default)]
struct Arena {
    entries: Vec<(*mut c_void, FreeFn)>,
}

impl Drop for Arena {
    fn drop(&mut self) {
        // newest first, so containers go after anything created from them
        while let Some((p, free)) = self.entries.pop() {
            // SAFETY: every entry was registered with its own destructor
            unsafe { free(p) };
        }
    }
}

thread_local! {
    static ARENAS: RefCell<Vec<Arena>> = RefCell::new(vec![Arena::default()]);
}

/// Register `p` with the innermost arena
///
/// Returns false when the thread is shutting down; the allocation then leaks.
pub(crate) fn track(p: *mut c_void, free: FreeFn) -> bool {
    ARENAS
        .try_with(|arenas| {
            let mut arenas = arenas.borrow_mut();
            if arenas.is_empty() {
                arenas.push(Arena::default());
            }
            if let Some(top) = arenas.last_mut() {
                top.entries.push((p, free));
            }
        })
        .is_ok()
}

/// Forget `p` without freeing it
///
/// Returns false when `p` is not tracked by this thread.
pub(crate) fn untrack(p: *mut c_void) -> bool {
    ARENAS
        .try_with(|arenas| {
            let mut arenas = arenas.borrow_mut();
            for arena in arenas.iter_mut().rev() {
                if let Some(i) = arena.entries.iter().rposition(|(q, _)| *q == p) {
                    arena.entries.remove(i);
                    return true;
                }
            }
            false
        })
        .unwrap_or(false)
}

/// Number of open arenas on this thread
pub fn depth() -> usize {
    ARENAS.try_with(|a| a.borrow().len()).unwrap_or(0)
}

/// Open a nested arena; returns the depth to pass to [`pop_to`]
pub fn push() -> usize {
    ARENAS
        .try_with(|arenas| {
            let mut arenas = arenas.borrow_mut();
            let depth = arenas.len();
            arenas.push(Arena::default());
            depth
        })
        .unwrap_or(0)
}

/// Free every arena above `depth` (never the bottom one)
pub fn pop_to(depth: usize) {
    let keep = depth.max(1);
    // take the arenas out first: freeing an object may create or release others
    let popped = ARENAS
        .try_with(|arenas| {
            let mut arenas = arenas.borrow_mut();
            if arenas.len() > keep {
                arenas.split_off(keep)
            } else {
                Vec::new()
            }
        })
        .unwrap_or_default();
    for arena in popped.into_iter().rev() {
        drop(arena);
    }
}

/// Arena that lives for a scope
#[must_use = "the arena is popped when the guard is dropped"]
pub struct ArenaGuard {
    depth: usize,
}

impl ArenaGuard {
    pub fn push() -> Self {
        Self { depth: push() }
    }
}

impl Drop for ArenaGuard {
    fn drop(&mut self) {
        pop_to(self.depth);
    }
}

// ============================================================================
// CMPIBrokerMemFT
// ============================================================================

unsafe fn free_libc(p: *mut c_void) {
    libc::free(p);
}

/// Tracked `malloc` copy of `bytes`, for buffers the caller frees with `freeChars`
pub(crate) fn tracked_copy(bytes: &[u8]) -> *mut c_void {
    // SAFETY: the destination is freshly allocated with at least `bytes.len()` bytes
    unsafe {
        let p = libc::malloc(bytes.len().max(1));
        if !p.is_null() {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), p.cast::<u8>(), bytes.len());
            track(p, free_libc);
        }
        p
    }
}

unsafe extern "C" fn mark(_mb: *const CMPIBroker, rc: *mut CMPIStatus) -> *mut CMPIGcStat {
    let depth = push();
    super::objects::set_rc(rc, CMPIStatus::ok());
    // depth is at least 1, so the token is never null
    depth as *mut CMPIGcStat
}

unsafe extern "C" fn release(_mb: *const CMPIBroker, gc: *const CMPIGcStat) -> CMPIStatus {
    let depth = gc as usize;
    if depth == 0 || depth >= self::depth() {
        return super::objects::status(&CmpiError::invalid_parameter("unknown gc mark"));
    }
    pop_to(depth);
    CMPIStatus::ok()
}

unsafe extern "C" fn cmpi_malloc(_mb: *const CMPIBroker, size: usize) -> *mut c_void {
    let p = libc::malloc(size.max(1));
    if !p.is_null() {
        track(p, free_libc);
    }
    p
}

unsafe extern "C" fn cmpi_calloc(_mb: *const CMPIBroker, n: usize, size: usize) -> *mut c_void {
    let p = libc::calloc(n.max(1), size.max(1));
    if !p.is_null() {
        track(p, free_libc);
    }
    p
}

unsafe extern "C" fn cmpi_realloc(_mb: *const CMPIBroker, p: *mut c_void, size: usize) -> *mut c_void {
    if !p.is_null() && !untrack(p) {
        tracing::warn!("cmpiRealloc of a pointer not tracked on this thread");
    }
    let q = libc::realloc(p, size.max(1));
    if q.is_null() {
        // the old block is still valid
        if !p.is_null() {
            track(p, free_libc);
        }
    } else {
        track(q, free_libc);
    }
    q
}

unsafe extern "C" fn cmpi_strdup(_mb: *const CMPIBroker, s: *const c_char) -> *mut c_char {
    if s.is_null() {
        return std::ptr::null_mut();
    }
    let p = libc::strdup(s);
    if !p.is_null() {
        track(p.cast(), free_libc);
    }
    p
}

unsafe extern "C" fn cmpi_free(_mb: *const CMPIBroker, p: *mut c_void) {
    if p.is_null() {
        return;
    }
    if untrack(p) {
        libc::free(p);
    } else {
        tracing::warn!("cmpiFree of a pointer not tracked on this thread, left to its arena");
    }
}

unsafe extern "C" fn free_chars(mb: *const CMPIBroker, p: *mut c_char) {
    cmpi_free(mb, p.cast());
}

macro_rules! free_object {
    ($($fn_name:ident: $ty:ty;)*) => {
        $(
            unsafe extern "C" fn $fn_name(_mb: *const CMPIBroker, obj: *mut $ty) {
                if obj.is_null() || (*obj).ft.is_null() {
                    return;
                }
                let status = ((*(*obj).ft).release)(obj);
                let _ = CmpiError::check(status);
            }
        )*
    };
}

free_object! {
    free_instance: CMPIInstance;
    free_object_path: CMPIObjectPath;
    free_args: CMPIArgs;
    free_string: CMPIString;
    free_array: CMPIArray;
    free_datetime: CMPIDateTime;
    free_select_exp: CMPISelectExp;
}

pub(crate) static MEM_FT: CMPIBrokerMemFT = CMPIBrokerMemFT {
    ftVersion: CMPICurrentVersion,
    mark,
    release,
    cmpiMalloc: cmpi_malloc,
    cmpiCalloc: cmpi_calloc,
    cmpiRealloc: cmpi_realloc,
    cmpiStrDup: cmpi_strdup,
    cmpiFree: cmpi_free,
    freeInstance: free_instance,
    freeObjectPath: free_object_path,
    freeArgs: free_args,
    freeString: free_string,
    freeArray: free_array,
    freeDateTime: free_datetime,
    freeSelectExp: free_select_exp,
    freeChars: free_chars,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static FREED: AtomicUsize = AtomicUsize::new(0);

    unsafe fn count_free(p: *mut c_void) {
        FREED.fetch_add(1, Ordering::SeqCst);
        drop(Box::from_raw(p as *mut u32));
    }

    fn boxed() -> *mut c_void {
        Box::into_raw(Box::new(7u32)).cast()
    }

    #[test]
    fn test_nested_arenas() {
        // run on a fresh thread so the counter is not shared with other tests
        std::thread::spawn(|| {
            FREED.store(0, Ordering::SeqCst);
            let base = depth();
            assert_eq!(base, 1);

            let outer = push();
            track(boxed(), count_free);
            let inner = push();
            track(boxed(), count_free);
            track(boxed(), count_free);
            assert_eq!(depth(), 3);

            pop_to(inner);
            assert_eq!(FREED.load(Ordering::SeqCst), 2);
            pop_to(outer);
            assert_eq!(FREED.load(Ordering::SeqCst), 3);
            assert_eq!(depth(), 1);

            // the bottom arena survives
            pop_to(0);
            assert_eq!(depth(), 1);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_untrack_keeps_allocation() {
        let p = boxed();
        {
            let _guard = ArenaGuard::push();
            track(p, count_free);
            assert!(untrack(p));
            assert!(!untrack(p));
        }
        // still ours
        unsafe { drop(Box::from_raw(p as *mut u32)) };
    }

    #[test]
    fn test_malloc_tracked_and_freed_with_arena() {
        unsafe {
            let guard = ArenaGuard::push();
            let p = cmpi_malloc(std::ptr::null(), 16);
            assert!(!p.is_null());
            let q = cmpi_realloc(std::ptr::null(), p, 64);
            assert!(!q.is_null());
            assert!(untrack(q));
            track(q, free_libc);
            let s = cmpi_strdup(std::ptr::null(), c"abc".as_ptr());
            assert_eq!(std::ffi::CStr::from_ptr(s).to_bytes(), b"abc");
            cmpi_free(std::ptr::null(), s.cast());
            assert!(!untrack(s.cast()));
            drop(guard);
        }
    }

    #[test]
    fn test_mark_and_release() {
        unsafe {
            let mut rc = CMPIStatus::ok();
            let before = depth();
            let gc = mark(std::ptr::null(), &mut rc);
            assert_eq!(rc.rc, CMPI_RC_OK);
            assert_eq!(depth(), before + 1);
            let status = release(std::ptr::null(), gc);
            assert_eq!(status.rc, CMPI_RC_OK);
            assert_eq!(depth(), before);

            let status = release(std::ptr::null(), std::ptr::null());
            let _ = CmpiError::check(status);
        }
    }
}
