//! C ABI for hosts that load the store as a shared library
//!
//! Mirrors the plugin factory and the [`History`] capability set over an
//! opaque handle. Functions return `PRUN_HISTORY_OK` or a negative error
//! code; keys and values are NUL-terminated UTF-8.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::path::Path;
use std::ptr;

use crate::{create_history, destroy_history, History, HistoryError};

pub const PRUN_HISTORY_OK: c_int = 0;
pub const PRUN_HISTORY_INVALID_ARGUMENT: c_int = -1;
pub const PRUN_HISTORY_CONFIG_ERROR: c_int = -2;
pub const PRUN_HISTORY_CONNECTION_ERROR: c_int = -3;
pub const PRUN_HISTORY_PREPARATION_ERROR: c_int = -4;
pub const PRUN_HISTORY_WRITE_ERROR: c_int = -5;
pub const PRUN_HISTORY_DELETE_ERROR: c_int = -6;
pub const PRUN_HISTORY_READ_ERROR: c_int = -7;

/// Row callback: key and value pointers are valid only during the call
pub type PrunHistoryRowCallback = extern "C" fn(
    key: *const c_char,
    key_len: usize,
    value: *const c_char,
    value_len: usize,
    user_data: *mut c_void,
);

/// Opaque store handle
pub struct PrunHistory {
    inner: Box<dyn History>,
}

fn error_code(err: &HistoryError) -> c_int {
    match err {
        HistoryError::Config(_) => PRUN_HISTORY_CONFIG_ERROR,
        HistoryError::Connection(_) => PRUN_HISTORY_CONNECTION_ERROR,
        HistoryError::Preparation(_) => PRUN_HISTORY_PREPARATION_ERROR,
        HistoryError::Write(_) => PRUN_HISTORY_WRITE_ERROR,
        HistoryError::Delete(_) => PRUN_HISTORY_DELETE_ERROR,
        HistoryError::Read(_) => PRUN_HISTORY_READ_ERROR,
    }
}

fn status(result: crate::Result<()>) -> c_int {
    match result {
        Ok(()) => PRUN_HISTORY_OK,
        Err(e) => error_code(&e),
    }
}

unsafe fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

unsafe fn handle_arg<'a>(handle: *const PrunHistory) -> Option<&'a dyn History> {
    handle.as_ref().map(|h| h.inner.as_ref())
}

/// Create a store, or null on interface version mismatch
#[no_mangle]
pub extern "C" fn prun_history_create(interface_version: u32) -> *mut PrunHistory {
    match create_history(interface_version) {
        Some(inner) => Box::into_raw(Box::new(PrunHistory { inner })),
        None => ptr::null_mut(),
    }
}

/// # Safety
///
/// `handle` must be null or come from [`prun_history_create`], and must not
/// be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn prun_history_destroy(handle: *mut PrunHistory) {
    if !handle.is_null() {
        let handle = Box::from_raw(handle);
        destroy_history(handle.inner);
    }
}

/// # Safety
///
/// `handle` must be live; `config_path` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn prun_history_initialize(
    handle: *const PrunHistory,
    config_path: *const c_char,
) -> c_int {
    match (handle_arg(handle), str_arg(config_path)) {
        (Some(history), Some(path)) => status(history.initialize(Path::new(path))),
        _ => PRUN_HISTORY_INVALID_ARGUMENT,
    }
}

/// # Safety
///
/// `handle` must be null or live.
#[no_mangle]
pub unsafe extern "C" fn prun_history_shutdown(handle: *const PrunHistory) {
    if let Some(history) = handle_arg(handle) {
        history.shutdown();
    }
}

/// # Safety
///
/// `handle` must be live; `key` and `value` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn prun_history_put(
    handle: *const PrunHistory,
    key: *const c_char,
    value: *const c_char,
) -> c_int {
    match (handle_arg(handle), str_arg(key), str_arg(value)) {
        (Some(history), Some(key), Some(value)) => status(history.put(key, value)),
        _ => PRUN_HISTORY_INVALID_ARGUMENT,
    }
}

/// # Safety
///
/// `handle` must be live; `key` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn prun_history_delete(
    handle: *const PrunHistory,
    key: *const c_char,
) -> c_int {
    match (handle_arg(handle), str_arg(key)) {
        (Some(history), Some(key)) => status(history.delete(key)),
        _ => PRUN_HISTORY_INVALID_ARGUMENT,
    }
}

/// # Safety
///
/// `handle` must be live. `user_data` is passed through untouched.
#[no_mangle]
pub unsafe extern "C" fn prun_history_get_all(
    handle: *const PrunHistory,
    callback: Option<PrunHistoryRowCallback>,
    user_data: *mut c_void,
) -> c_int {
    let (Some(history), Some(callback)) = (handle_arg(handle), callback) else {
        return PRUN_HISTORY_INVALID_ARGUMENT;
    };
    status(history.get_all(&mut |key, value| {
        callback(
            key.as_ptr().cast(),
            key.len(),
            value.as_ptr().cast(),
            value.len(),
            user_data,
        )
    }))
}
