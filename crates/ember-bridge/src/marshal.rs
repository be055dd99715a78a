//! C string plumbing for the exports.

use std::ffi::{c_char, CStr};

use ember_abi::ffi::EmberString;

/// Borrow a caller-owned, NUL-terminated UTF-8 argument.
///
/// # Safety
/// `p` must be null or point to a NUL-terminated string that outlives `'a`.
pub unsafe fn str_arg<'a>(p: *const c_char, what: &str) -> Result<&'a str, String> {
    if p.is_null() {
        return Err(format!("null {what}"));
    }
    CStr::from_ptr(p)
        .to_str()
        .map_err(|e| format!("invalid UTF-8 in {what}: {e}"))
}

/// Copy `n` caller-owned strings out of a C array.
///
/// # Safety
/// When `n > 0`, `arr` must point to `n` valid [`str_arg`] pointers.
pub unsafe fn str_array(arr: *const *const c_char, n: usize, what: &str) -> Result<Vec<String>, String> {
    if n == 0 {
        return Ok(Vec::new());
    }
    if arr.is_null() {
        return Err(format!("null {what} array"));
    }
    std::slice::from_raw_parts(arr, n)
        .iter()
        .enumerate()
        .map(|(i, &p)| str_arg(p, &format!("{what}[{i}]")).map(str::to_owned))
        .collect()
}

/// Hand `s` to the caller as a NUL-terminated copy; release with
/// [`free_string`].
pub fn make_string(s: &str) -> EmberString {
    let len = s.len();
    let mut bytes = Vec::with_capacity(len + 1);
    bytes.extend_from_slice(s.as_bytes());
    bytes.push(0u8);
    let raw = Box::into_raw(bytes.into_boxed_slice()) as *mut u8;
    EmberString {
        ptr: raw as *mut c_char,
        len,
    }
}

/// # Safety
/// `s` must come from [`make_string`] and not have been freed.
pub unsafe fn free_string(s: EmberString) {
    if s.is_null() {
        return;
    }
    let slice = std::ptr::slice_from_raw_parts_mut(s.ptr as *mut u8, s.len + 1);
    drop(Box::from_raw(slice));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn make_and_free() {
        let s = make_string("héllo");
        assert_eq!(s.len, "héllo".len());
        let back = unsafe { CStr::from_ptr(s.ptr) }.to_str().unwrap();
        assert_eq!(back, "héllo");
        unsafe { free_string(s) };
        unsafe { free_string(EmberString::null()) };
    }

    #[test]
    fn str_arg_rejects_null_and_bad_utf8() {
        assert!(unsafe { str_arg(std::ptr::null(), "path") }
            .unwrap_err()
            .contains("null path"));
        let bad = [0xFFu8, 0];
        let e = unsafe { str_arg(bad.as_ptr() as *const c_char, "prompt") }.unwrap_err();
        assert!(e.contains("invalid UTF-8 in prompt"));
    }

    #[test]
    fn str_array_copies_in_order() {
        let owned = [CString::new("system").unwrap(), CString::new("user").unwrap()];
        let ptrs: Vec<*const c_char> = owned.iter().map(|c| c.as_ptr()).collect();
        let v = unsafe { str_array(ptrs.as_ptr(), ptrs.len(), "roles") }.unwrap();
        assert_eq!(v, ["system", "user"]);
        assert!(unsafe { str_array(std::ptr::null(), 0, "roles") }
            .unwrap()
            .is_empty());
        assert!(unsafe { str_array(std::ptr::null(), 2, "roles") }.is_err());
    }
}
