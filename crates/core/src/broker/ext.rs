//! `CMPIBrokerExtFT`: OS encapsulation over pthreads

use std::ffi::{c_char, c_int, c_void, CStr};
use std::ptr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use super::memory::tracked_copy;
use crate::engine::library_file_name;
use crate::sdk::*;

unsafe extern "C" fn resolve_file_name(filename: *const c_char) -> *mut c_char {
    if filename.is_null() {
        return ptr::null_mut();
    }
    let name = CStr::from_ptr(filename).to_string_lossy();
    let mut bytes = library_file_name(&name).into_bytes();
    bytes.push(0);
    tracked_copy(&bytes).cast()
}

type StartRoutine = unsafe extern "C" fn(*mut c_void) -> CMPI_THREAD_RETURN;

unsafe extern "C" fn new_thread(start: StartRoutine, parm: *mut c_void, detached: c_int) -> CMPI_THREAD_TYPE {
    // SAFETY: same ABI, libc only spells the pointer without `unsafe`
    let start: extern "C" fn(*mut c_void) -> *mut c_void = std::mem::transmute(start);
    let mut thread: libc::pthread_t = std::mem::zeroed();
    let err = libc::pthread_create(&mut thread, ptr::null(), start, parm);
    if err != 0 {
        tracing::error!("pthread_create failed: {}", err);
        return ptr::null_mut();
    }
    if detached != 0 {
        libc::pthread_detach(thread);
    }
    thread as usize as CMPI_THREAD_TYPE
}

unsafe extern "C" fn join_thread(thread: CMPI_THREAD_TYPE, retval: *mut CMPI_THREAD_RETURN) -> c_int {
    libc::pthread_join(thread as usize as libc::pthread_t, retval)
}

unsafe extern "C" fn exit_thread(return_code: CMPI_THREAD_RETURN) -> c_int {
    libc::pthread_exit(return_code)
}

unsafe extern "C" fn cancel_thread(thread: CMPI_THREAD_TYPE) -> c_int {
    libc::pthread_cancel(thread as usize as libc::pthread_t)
}

unsafe extern "C" fn thread_sleep(msec: CMPIUint32) -> c_int {
    std::thread::sleep(Duration::from_millis(u64::from(msec)));
    0
}

const ONCE_NEW: i32 = 0;
const ONCE_RUNNING: i32 = 1;
const ONCE_DONE: i32 = 2;

/// `pthread_once` over a caller-owned, zero-initialized `int`
unsafe extern "C" fn thread_once(once: *mut c_int, init: unsafe extern "C" fn()) -> c_int {
    if once.is_null() {
        return libc::EINVAL;
    }
    let state = AtomicI32::from_ptr(once);
    match state.compare_exchange(ONCE_NEW, ONCE_RUNNING, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
            init();
            state.store(ONCE_DONE, Ordering::Release);
        }
        Err(_) => {
            while state.load(Ordering::Acquire) != ONCE_DONE {
                std::thread::yield_now();
            }
        }
    }
    0
}

unsafe extern "C" fn create_thread_key(
    key: *mut CMPI_THREAD_KEY_TYPE,
    cleanup: Option<unsafe extern "C" fn(*mut c_void)>,
) -> c_int {
    if key.is_null() {
        return libc::EINVAL;
    }
    let mut k: libc::pthread_key_t = 0;
    let err = libc::pthread_key_create(&mut k, cleanup);
    if err == 0 {
        *key = k as CMPI_THREAD_KEY_TYPE;
    }
    err
}

unsafe extern "C" fn destroy_thread_key(key: CMPI_THREAD_KEY_TYPE) -> c_int {
    libc::pthread_key_delete(key as libc::pthread_key_t)
}

unsafe extern "C" fn get_thread_specific(key: CMPI_THREAD_KEY_TYPE) -> *mut c_void {
    libc::pthread_getspecific(key as libc::pthread_key_t)
}

unsafe extern "C" fn set_thread_specific(key: CMPI_THREAD_KEY_TYPE, value: *mut c_void) -> c_int {
    libc::pthread_setspecific(key as libc::pthread_key_t, value)
}

/// Recursive mutex; `opt` is reserved
unsafe extern "C" fn new_mutex(_opt: c_int) -> CMPI_MUTEX_TYPE {
    let m = Box::into_raw(Box::new(libc::PTHREAD_MUTEX_INITIALIZER));
    let mut attr: libc::pthread_mutexattr_t = std::mem::zeroed();
    libc::pthread_mutexattr_init(&mut attr);
    libc::pthread_mutexattr_settype(&mut attr, libc::PTHREAD_MUTEX_RECURSIVE);
    let err = libc::pthread_mutex_init(m, &attr);
    libc::pthread_mutexattr_destroy(&mut attr);
    if err != 0 {
        tracing::error!("pthread_mutex_init failed: {}", err);
        drop(Box::from_raw(m));
        return ptr::null_mut();
    }
    m.cast()
}

unsafe extern "C" fn destroy_mutex(m: CMPI_MUTEX_TYPE) {
    if m.is_null() {
        return;
    }
    let m = m as *mut libc::pthread_mutex_t;
    libc::pthread_mutex_destroy(m);
    drop(Box::from_raw(m));
}

unsafe extern "C" fn lock_mutex(m: CMPI_MUTEX_TYPE) {
    if !m.is_null() {
        libc::pthread_mutex_lock(m.cast());
    }
}

unsafe extern "C" fn unlock_mutex(m: CMPI_MUTEX_TYPE) {
    if !m.is_null() {
        libc::pthread_mutex_unlock(m.cast());
    }
}

unsafe extern "C" fn new_condition(_opt: c_int) -> CMPI_COND_TYPE {
    let c = Box::into_raw(Box::new(libc::PTHREAD_COND_INITIALIZER));
    let err = libc::pthread_cond_init(c, ptr::null());
    if err != 0 {
        tracing::error!("pthread_cond_init failed: {}", err);
        drop(Box::from_raw(c));
        return ptr::null_mut();
    }
    c.cast()
}

unsafe extern "C" fn destroy_condition(c: CMPI_COND_TYPE) {
    if c.is_null() {
        return;
    }
    let c = c as *mut libc::pthread_cond_t;
    libc::pthread_cond_destroy(c);
    drop(Box::from_raw(c));
}

unsafe extern "C" fn cond_wait(c: CMPI_COND_TYPE, m: CMPI_MUTEX_TYPE) -> c_int {
    if c.is_null() || m.is_null() {
        return libc::EINVAL;
    }
    libc::pthread_cond_wait(c.cast(), m.cast())
}

/// Wait until the absolute `CLOCK_REALTIME` deadline `wait`
unsafe extern "C" fn timed_cond_wait(c: CMPI_COND_TYPE, m: CMPI_MUTEX_TYPE, wait: *mut CMPITimespec) -> c_int {
    if c.is_null() || m.is_null() || wait.is_null() {
        return libc::EINVAL;
    }
    let deadline = libc::timespec {
        tv_sec: (*wait).tv_sec as libc::time_t,
        tv_nsec: (*wait).tv_nsec as libc::c_long,
    };
    libc::pthread_cond_timedwait(c.cast(), m.cast(), &deadline)
}

unsafe extern "C" fn signal_condition(c: CMPI_COND_TYPE) -> c_int {
    if c.is_null() {
        return libc::EINVAL;
    }
    libc::pthread_cond_signal(c.cast())
}

pub(crate) static EXT_FT: CMPIBrokerExtFT = CMPIBrokerExtFT {
    ftVersion: CMPICurrentVersion,
    resolveFileName: resolve_file_name,
    newThread: new_thread,
    joinThread: join_thread,
    exitThread: exit_thread,
    cancelThread: cancel_thread,
    threadSleep: thread_sleep,
    threadOnce: thread_once,
    createThreadKey: create_thread_key,
    destroyThreadKey: destroy_thread_key,
    getThreadSpecific: get_thread_specific,
    setThreadSpecific: set_thread_specific,
    newMutex: new_mutex,
    destroyMutex: destroy_mutex,
    lockMutex: lock_mutex,
    unlockMutex: unlock_mutex,
    newCondition: new_condition,
    destroyCondition: destroy_condition,
    condWait: cond_wait,
    timedCondWait: timed_cond_wait,
    signalCondition: signal_condition,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::ArenaGuard;
    use std::sync::atomic::AtomicUsize;

    static ONCE_CALLS: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn count_once() {
        ONCE_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    unsafe extern "C" fn double(parm: *mut c_void) -> CMPI_THREAD_RETURN {
        (parm as usize * 2) as CMPI_THREAD_RETURN
    }

    #[test]
    fn test_resolve_file_name() {
        let _arena = ArenaGuard::push();
        unsafe {
            let p = resolve_file_name(c"Fan".as_ptr());
            assert_eq!(CStr::from_ptr(p).to_str().unwrap(), library_file_name("Fan"));
            assert!(resolve_file_name(ptr::null()).is_null());
        }
    }

    #[test]
    fn test_thread_once_runs_once() {
        let mut once: c_int = 0;
        unsafe {
            assert_eq!(thread_once(&mut once, count_once), 0);
            assert_eq!(thread_once(&mut once, count_once), 0);
        }
        assert_eq!(ONCE_CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_thread_join_returns_value() {
        unsafe {
            let t = new_thread(double, 21 as *mut c_void, 0);
            assert!(!t.is_null());
            let mut ret: CMPI_THREAD_RETURN = ptr::null_mut();
            assert_eq!(join_thread(t, &mut ret), 0);
            assert_eq!(ret as usize, 42);
        }
    }

    #[test]
    fn test_thread_keys() {
        unsafe {
            let mut key: CMPI_THREAD_KEY_TYPE = 0;
            assert_eq!(create_thread_key(&mut key, None), 0);
            assert!(get_thread_specific(key).is_null());
            assert_eq!(set_thread_specific(key, 7 as *mut c_void), 0);
            assert_eq!(get_thread_specific(key) as usize, 7);
            assert_eq!(destroy_thread_key(key), 0);
        }
    }

    #[test]
    fn test_recursive_mutex_and_timed_wait() {
        unsafe {
            let m = new_mutex(0);
            let c = new_condition(0);
            lock_mutex(m);
            lock_mutex(m);
            unlock_mutex(m);

            let mut now: libc::timespec = std::mem::zeroed();
            libc::clock_gettime(libc::CLOCK_REALTIME, &mut now);
            let mut deadline = CMPITimespec {
                tv_sec: now.tv_sec as i64,
                tv_nsec: now.tv_nsec as i64 + 1_000_000,
            };
            if deadline.tv_nsec >= 1_000_000_000 {
                deadline.tv_sec += 1;
                deadline.tv_nsec -= 1_000_000_000;
            }
            assert_eq!(timed_cond_wait(c, m, &mut deadline), libc::ETIMEDOUT);
            unlock_mutex(m);
            destroy_condition(c);
            destroy_mutex(m);
        }
    }
}
