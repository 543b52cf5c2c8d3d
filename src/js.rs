//! The JavaScript host interface (§6). The interpreter itself is an
//! external collaborator (§1's Non-goals), so this crate only defines
//! the trait boundary a real engine would implement and a no-op stand-in
//! for headless use and tests.

use crate::error::JsRuntimeError;

/// An opaque handle to a DOM node as seen from JS, stable for the
/// lifetime of one page load.
pub type JsHandle = u64;

pub trait JsHost {
    fn evaluate(&self, script_name: &str, source: &str) -> Result<(), JsRuntimeError>;

    fn query_selector_all(&self, selector: &str) -> Vec<JsHandle>;
    fn get_attribute(&self, handle: JsHandle, name: &str) -> Option<String>;
    fn set_inner_html(&self, handle: JsHandle, html: &str);
    fn set_style(&self, handle: JsHandle, css: &str);
    fn xhr_send(&self, method: &str, url: &str, body: Option<&str>, is_async: bool, handle: JsHandle);
    fn set_timeout(&self, handle: JsHandle, millis: u64);
    fn now(&self) -> f64;
    fn request_animation_frame(&self);

    /// Evaluates the fixed event-dispatch snippet for `event_type` on
    /// `handle`, returning whether the default action was prevented.
    fn dispatch_event(&self, event_type: &str, handle: JsHandle) -> bool;
}

/// Documents that the JS engine is external (§1): does nothing, used
/// when constructing a `Tab` without a real interpreter linked in.
#[derive(Default)]
pub struct NullJsHost;

impl JsHost for NullJsHost {
    fn evaluate(&self, _script_name: &str, _source: &str) -> Result<(), JsRuntimeError> {
        Ok(())
    }

    fn query_selector_all(&self, _selector: &str) -> Vec<JsHandle> {
        Vec::new()
    }

    fn get_attribute(&self, _handle: JsHandle, _name: &str) -> Option<String> {
        None
    }

    fn set_inner_html(&self, _handle: JsHandle, _html: &str) {}
    fn set_style(&self, _handle: JsHandle, _css: &str) {}
    fn xhr_send(&self, _method: &str, _url: &str, _body: Option<&str>, _is_async: bool, _handle: JsHandle) {}
    fn set_timeout(&self, _handle: JsHandle, _millis: u64) {}

    fn now(&self) -> f64 {
        0.0
    }

    fn request_animation_frame(&self) {}

    fn dispatch_event(&self, _event_type: &str, _handle: JsHandle) -> bool {
        false
    }
}
