//! Dynamic library interface for C ABI exports.
//!
//! The host loads a destination as a dynamic library (`.so`, `.dylib` or
//! `.dll`) and drives it through a small set of C functions exchanging JSON
//! strings. Use the [`export_destination!`] macro to generate them.

/// Macro to export a destination plugin with a C ABI interface.
///
/// **Requirements**: the plugin type must:
/// - Implement the `SyncDestinationPlugin` trait
/// - Have a `const fn new() -> Self` constructor
/// - Be in scope at the macro call site
///
/// **Generated Functions** (inside a `destination_abi` module):
/// - `destination_name()` - The plugin's display name
/// - `destination_key()` - The plugin's unique identifier
/// - `destination_description()` - JSON array of description paragraphs
/// - `destination_config_arguments()` - JSON array of argument declarations
/// - `destination_endpoint_url()` - The connected endpoint, or null
/// - `destination_initialize(config_json)` - Connect using the host's configuration
/// - `destination_publish(change_json)` - Deliver one change event
/// - `destination_finalize()` - Release the connection
/// - `destination_cleanup_string(ptr)` - Free a string returned by any of the above
///
/// `destination_initialize` and `destination_publish` return a
/// `CallResultMessage` as JSON. The host decides whether to retry a failed
/// publish from its `retryable` flag.
///
/// # Memory Management
///
/// - Strings returned to the host are allocated with `CString::into_raw()`
/// - The host must hand each of them back to `destination_cleanup_string()`
/// - Strings passed in by the host stay owned by the host
///
/// # State
///
/// The connected destination lives in a process-wide `RwLock` slot. Publishes
/// take the read side, so concurrent publishes from several host threads
/// never wait on each other. Initialize and finalize take the write side.
///
/// # Usage
///
/// ```rust,ignore
/// use sync_destination_protocol::export_destination;
///
/// export_destination!(MyDestinationPlugin);
/// ```
///
/// Your `Cargo.toml` must build a `cdylib`:
///
/// ```toml
/// [lib]
/// crate-type = ["cdylib", "rlib"]
/// ```
#[macro_export]
macro_rules! export_destination {
    ($plugin_type:ty) => {
        pub mod destination_abi {
            use super::*;

            use std::ffi::{CStr, CString};
            use std::os::raw::c_char;
            use std::sync::{PoisonError, RwLock};

            use $crate::__private::{serde, serde_json};
            use $crate::{
                CallResultMessage, DestinationError, DestinationResult, SyncDestination,
                SyncDestinationPlugin,
            };

            type Destination = <$plugin_type as SyncDestinationPlugin>::Destination;

            static PLUGIN: $plugin_type = <$plugin_type>::new();
            static DESTINATION: RwLock<Option<Destination>> = RwLock::new(None);

            fn into_c_string(value: String) -> *const c_char {
                match CString::new(value) {
                    Ok(cstr) => cstr.into_raw(),
                    Err(_) => std::ptr::null(),
                }
            }

            fn to_json<T: serde::Serialize>(value: &T) -> *const c_char {
                match serde_json::to_string(value) {
                    Ok(json) => into_c_string(json),
                    Err(_) => std::ptr::null(),
                }
            }

            fn parse_request<T: serde::de::DeserializeOwned>(
                ptr: *const c_char,
            ) -> DestinationResult<T> {
                if ptr.is_null() {
                    return Err(DestinationError::InvalidRequest(
                        "request pointer is null".to_string(),
                    ));
                }

                let json = unsafe { CStr::from_ptr(ptr) }.to_str().map_err(|_| {
                    DestinationError::InvalidRequest("request is not valid UTF-8".to_string())
                })?;

                Ok(serde_json::from_str(json)?)
            }

            fn respond(result: DestinationResult<()>) -> *const c_char {
                to_json(&CallResultMessage::from(result))
            }

            fn initialize_safe(config_ptr: *const c_char) -> DestinationResult<()> {
                $crate::init_logging(false);
                let config: $crate::DestinationConfig = parse_request(config_ptr)?;

                let mut slot = DESTINATION.write().unwrap_or_else(PoisonError::into_inner);
                if slot.is_some() {
                    return Err(DestinationError::AlreadyInitialized);
                }

                *slot = Some(PLUGIN.initialize(&$crate::TracingServerContext, &config)?);
                Ok(())
            }

            fn publish_safe(change_ptr: *const c_char) -> DestinationResult<()> {
                let change: $crate::ChangeEvent = parse_request(change_ptr)?;

                let slot = DESTINATION.read().unwrap_or_else(PoisonError::into_inner);
                slot.as_ref()
                    .ok_or(DestinationError::NotInitialized)?
                    .publish(&change)
            }

            #[no_mangle]
            pub extern "C" fn destination_name() -> *const c_char {
                into_c_string(PLUGIN.name().to_string())
            }

            #[no_mangle]
            pub extern "C" fn destination_key() -> *const c_char {
                into_c_string(PLUGIN.key().to_string())
            }

            #[no_mangle]
            pub extern "C" fn destination_description() -> *const c_char {
                to_json(&PLUGIN.description())
            }

            #[no_mangle]
            pub extern "C" fn destination_config_arguments() -> *const c_char {
                to_json(&PLUGIN.config_arguments())
            }

            #[no_mangle]
            pub extern "C" fn destination_endpoint_url() -> *const c_char {
                let slot = DESTINATION.read().unwrap_or_else(PoisonError::into_inner);
                match slot.as_ref().and_then(SyncDestination::current_endpoint_url) {
                    Some(url) => into_c_string(url),
                    None => std::ptr::null(),
                }
            }

            #[no_mangle]
            pub extern "C" fn destination_initialize(config_ptr: *const c_char) -> *const c_char {
                respond(initialize_safe(config_ptr))
            }

            #[no_mangle]
            pub extern "C" fn destination_publish(change_ptr: *const c_char) -> *const c_char {
                respond(publish_safe(change_ptr))
            }

            #[no_mangle]
            pub extern "C" fn destination_finalize() {
                let taken = DESTINATION
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                if let Some(mut destination) = taken {
                    destination.finalize();
                }
            }

            #[no_mangle]
            pub extern "C" fn destination_cleanup_string(ptr: *const c_char) {
                if !ptr.is_null() {
                    unsafe {
                        drop(CString::from_raw(ptr as *mut c_char));
                    }
                }
            }
        }
    };
}

pub use export_destination;
