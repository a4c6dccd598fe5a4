//! C ABI for the mobile bindings.
//!
//! - Strings cross as NUL-terminated UTF-8.
//! - Returned strings are owned by Rust; release them with
//!   [`xbridge_string_free`].
//! - Null or non-UTF-8 input is invalid input: init returns `0`, fetches
//!   return an error envelope.
//! - Panics are caught here and never unwind into the caller.

use std::ffi::{c_char, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{error_envelope, GatewayError};
use crate::mobile::MobileGateway;
use crate::registry::{Handle, INVALID_HANDLE};

/// Borrow a C string as `&str`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Hand a string to the caller.
fn into_c_string(value: String) -> *mut c_char {
    match CString::new(value) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            let mut bytes = e.into_vec();
            bytes.retain(|b| *b != 0);
            // Interior NULs were removed above.
            unsafe { CString::from_vec_unchecked(bytes) }.into_raw()
        }
    }
}

fn guard_string(operation: &str, call: impl FnOnce() -> String) -> *mut c_char {
    let json = catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|_| {
        error!(operation, "Panic caught at FFI boundary");
        error_envelope(&format!("Internal error in {}", operation))
    });
    into_c_string(json)
}

/// Create an exchange session.
///
/// Returns the session handle, or `0` if the config is not a JSON object,
/// the exchange is unknown, or construction failed.
///
/// # Safety
/// `name` and `config` must be null or valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn xbridge_init_exchange(name: *const c_char, config: *const c_char) -> Handle {
    let (Some(name), Some(config)) = (read_str(name), read_str(config)) else {
        return INVALID_HANDLE;
    };
    catch_unwind(|| MobileGateway.init_exchange(name, config)).unwrap_or_else(|_| {
        error!(operation = "init_exchange", "Panic caught at FFI boundary");
        INVALID_HANDLE
    })
}

/// Markets for a session as JSON, or an error envelope.
#[no_mangle]
pub extern "C" fn xbridge_fetch_markets(handle: Handle) -> *mut c_char {
    guard_string("fetch_markets", || MobileGateway.fetch_markets(handle))
}

/// Currencies for a session as JSON, or an error envelope.
#[no_mangle]
pub extern "C" fn xbridge_fetch_currencies(handle: Handle) -> *mut c_char {
    guard_string("fetch_currencies", || MobileGateway.fetch_currencies(handle))
}

/// Ticker for `symbol` as JSON, or an error envelope.
///
/// An unknown handle is reported as `Invalid handle` even when `symbol` is
/// also unreadable.
///
/// # Safety
/// `symbol` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn xbridge_fetch_ticker(handle: Handle, symbol: *const c_char) -> *mut c_char {
    let Some(symbol) = read_str(symbol) else {
        return guard_string("fetch_ticker", || {
            if MobileGateway.is_open(handle) {
                error_envelope("Symbol must be a UTF-8 string")
            } else {
                GatewayError::InvalidHandle.envelope(false)
            }
        });
    };
    guard_string("fetch_ticker", || MobileGateway.fetch_ticker(handle, symbol))
}

/// Close a session. Returns `1` if it was open, `0` otherwise.
#[no_mangle]
pub extern "C" fn xbridge_close_exchange(handle: Handle) -> i32 {
    catch_unwind(|| MobileGateway.close_exchange(handle))
        .map(i32::from)
        .unwrap_or(0)
}

/// Supported exchange ids as a JSON array.
#[no_mangle]
pub extern "C" fn xbridge_list_exchanges() -> *mut c_char {
    guard_string("list_exchanges", || MobileGateway.list_exchanges())
}

/// Close every session. Returns how many were open.
#[no_mangle]
pub extern "C" fn xbridge_shutdown() -> u64 {
    catch_unwind(|| MobileGateway.shutdown() as u64).unwrap_or(0)
}

/// Release a string returned by this library. Null is ignored.
///
/// # Safety
/// `ptr` must be null or a pointer returned by one of the `xbridge_*`
/// functions, not already freed.
#[no_mangle]
pub unsafe extern "C" fn xbridge_string_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Install a stderr log subscriber. `RUST_LOG` wins over `level`; a null
/// `level` means `info`.
///
/// Returns `0` on success, `-1` if a subscriber was already installed.
///
/// # Safety
/// `level` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn xbridge_init_logging(level: *const c_char) -> i32 {
    let level = read_str(level).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    match fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
    {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    /// Take ownership of a returned string and parse it.
    fn take_json(ptr: *mut c_char) -> Value {
        assert!(!ptr.is_null());
        let text = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        unsafe { xbridge_string_free(ptr) };
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_ffi_round_trip() {
        let name = CString::new("simulated").unwrap();
        let config = CString::new(r#"{"options": {"prices": {"ETH/USD": "2500.5"}}}"#).unwrap();
        let handle = unsafe { xbridge_init_exchange(name.as_ptr(), config.as_ptr()) };
        assert_ne!(handle, INVALID_HANDLE);

        let markets = take_json(xbridge_fetch_markets(handle));
        assert_eq!(markets.as_array().map(Vec::len), Some(3));

        let currencies = take_json(xbridge_fetch_currencies(handle));
        assert!(currencies.get("BTC").is_some());

        let symbol = CString::new("ETH/USD").unwrap();
        let ticker = take_json(unsafe { xbridge_fetch_ticker(handle, symbol.as_ptr()) });
        assert_eq!(ticker["last"], "2500.5");

        assert_eq!(xbridge_close_exchange(handle), 1);
        assert_eq!(xbridge_close_exchange(handle), 0);
        assert_eq!(
            take_json(xbridge_fetch_markets(handle)),
            serde_json::json!({"error": "Invalid handle"})
        );
    }

    #[test]
    fn test_ffi_invalid_input() {
        let name = CString::new("simulated").unwrap();
        let bad_utf8 = CString::new(vec![0xff, 0xfe, b'{', b'}']).unwrap();
        unsafe {
            assert_eq!(xbridge_init_exchange(std::ptr::null(), name.as_ptr()), INVALID_HANDLE);
            assert_eq!(xbridge_init_exchange(name.as_ptr(), std::ptr::null()), INVALID_HANDLE);
            assert_eq!(xbridge_init_exchange(name.as_ptr(), bad_utf8.as_ptr()), INVALID_HANDLE);
        }

        let config = CString::new("{}").unwrap();
        let handle = unsafe { xbridge_init_exchange(name.as_ptr(), config.as_ptr()) };
        assert_ne!(handle, INVALID_HANDLE);
        let body = take_json(unsafe { xbridge_fetch_ticker(handle, std::ptr::null()) });
        assert_eq!(body["error"], "Symbol must be a UTF-8 string");
        let body = take_json(unsafe { xbridge_fetch_ticker(handle, bad_utf8.as_ptr()) });
        assert_eq!(body["error"], "Symbol must be a UTF-8 string");
        assert_eq!(xbridge_close_exchange(handle), 1);

        // The handle is checked before the symbol.
        for handle in [INVALID_HANDLE, handle] {
            assert_eq!(
                take_json(unsafe { xbridge_fetch_ticker(handle, std::ptr::null()) }),
                serde_json::json!({"error": "Invalid handle"})
            );
        }

        assert_eq!(
            take_json(xbridge_fetch_currencies(0)),
            serde_json::json!({"error": "Invalid handle"})
        );
        unsafe { xbridge_string_free(std::ptr::null_mut()) };
    }

    #[test]
    fn test_ffi_list_exchanges() {
        let ids = take_json(xbridge_list_exchanges());
        assert_eq!(ids, serde_json::json!(["binance", "kraken", "luno", "simulated"]));
    }

    #[test]
    fn test_into_c_string_strips_nul() {
        let ptr = into_c_string("a\0b".to_string());
        let text = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        unsafe { xbridge_string_free(ptr) };
        assert_eq!(text, "ab");
    }
}
