//! FFI bindings for Spread Pulse
//!
//! This module provides C-compatible functions for calling Pulse from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `pulse_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, Utc};

use crate::error::ComputeError;
use crate::schema::{EventRow, IngestAdapter};
use crate::stats::{rows_to_stats_json, InMemoryEventStore, StatsProcessor, StatsWindow};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a JSON result to C, recording the error on failure
fn result_to_cstr(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Convert a payload (or array of payloads) into event rows.
///
/// Fails as a whole if any payload is invalid.
fn payloads_to_rows(json: &str, received_at: DateTime<Utc>) -> Result<Vec<EventRow>, ComputeError> {
    let mut rows = Vec::new();
    for payload in IngestAdapter::parse_payloads(json)? {
        rows.extend(IngestAdapter::to_rows(&payload, received_at)?);
    }
    Ok(rows)
}

/// Convert a payload (or array of payloads) into event rows, one JSON row per line
fn payloads_to_rows_ndjson(json: &str) -> Result<String, ComputeError> {
    let lines = payloads_to_rows(json, Utc::now())?
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute a stats report from event rows (NDJSON).
///
/// # Safety
/// - `rows_ndjson` must be a valid null-terminated C string.
/// - `window_days` must be 7, 14 or 30.
/// - Returns a newly allocated string that must be freed with `pulse_free_string`.
/// - Returns NULL on error; call `pulse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pulse_stats_from_rows(
    rows_ndjson: *const c_char,
    window_days: u32,
) -> *mut c_char {
    clear_last_error();

    let rows = match cstr_to_string(rows_ndjson) {
        Some(s) => s,
        None => {
            set_last_error("Invalid rows string pointer");
            return ptr::null_mut();
        }
    };

    result_to_cstr(rows_to_stats_json(&rows, window_days))
}

/// Validate an ingestion payload and convert it to event rows (NDJSON).
///
/// # Safety
/// - `payload_json` must be a valid null-terminated C string holding one
///   payload object or an array of payloads.
/// - Returns a newly allocated string that must be freed with `pulse_free_string`.
/// - Returns NULL on error; call `pulse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pulse_ingest_payload(payload_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json = match cstr_to_string(payload_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid payload string pointer");
            return ptr::null_mut();
        }
    };

    result_to_cstr(payloads_to_rows_ndjson(&json))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a StatsProcessor backed by an in-memory store
pub struct PulseProcessorHandle {
    processor: StatsProcessor<InMemoryEventStore>,
}

/// Create a new processor with an empty event store.
///
/// # Safety
/// - Returns a pointer to a newly allocated processor.
/// - Must be freed with `pulse_processor_free`.
#[no_mangle]
pub unsafe extern "C" fn pulse_processor_new() -> *mut PulseProcessorHandle {
    clear_last_error();

    let handle = Box::new(PulseProcessorHandle {
        processor: StatsProcessor::default(),
    });
    Box::into_raw(handle)
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `pulse_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pulse_processor_free(processor: *mut PulseProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Ingest a payload (or array of payloads) into the processor's store.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `pulse_processor_new`.
/// - `payload_json` must be a valid null-terminated C string.
/// - Returns the number of rows stored, or -1 on error.
/// - On error, call `pulse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pulse_processor_ingest(
    processor: *mut PulseProcessorHandle,
    payload_json: *const c_char,
) -> i64 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &*processor;

    let json = match cstr_to_string(payload_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid payload string pointer");
            return -1;
        }
    };

    // Convert everything before storing anything; one bad payload rejects the call.
    let rows = match payloads_to_rows(&json, Utc::now()) {
        Ok(rows) => rows,
        Err(e) => {
            set_last_error(&e.to_string());
            return -1;
        }
    };

    let stored = rows.len();
    handle.processor.store().insert_rows(rows);
    stored as i64
}

/// Compute a stats report for the trailing window over everything ingested.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `pulse_processor_new`.
/// - Returns a newly allocated string that must be freed with `pulse_free_string`.
/// - Returns NULL on error; call `pulse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pulse_processor_report(
    processor: *mut PulseProcessorHandle,
    window_days: u32,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    let result = StatsWindow::try_from(window_days)
        .and_then(|window| handle.processor.report_json(window, Utc::now()));
    result_to_cstr(result)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Pulse functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Pulse function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pulse_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Pulse function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn pulse_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Pulse library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn pulse_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
